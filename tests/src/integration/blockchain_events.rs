//! # Blockchain Events
//!
//! Payment and balance listeners over the per-account stream: fan-out,
//! ordering, removal, resubscription and redispatch.

#[cfg(test)]
mod tests {
    use super::super::harness::{assert_quiet, next_event, TestLedger, EVENT_TIMEOUT};
    use kin_core::{ChannelDispatcher, KinAccount, KinAccountApi, ListenerRegistration};
    use kin_types::{Address, Balance, PaymentInfo};
    use parking_lot::Mutex;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc::{self, UnboundedReceiver};
    use tokio::time::timeout;

    fn watch_payments(account: &KinAccount) -> (ListenerRegistration, UnboundedReceiver<PaymentInfo>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let registration = account.add_payment_listener(move |payment| {
            let _ = tx.send(payment.clone());
        });
        (registration, rx)
    }

    fn watch_balances(account: &KinAccount) -> (ListenerRegistration, UnboundedReceiver<Balance>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let registration = account.add_balance_listener(move |balance| {
            let _ = tx.send(*balance);
        });
        (registration, rx)
    }

    #[tokio::test]
    async fn test_send_is_observed_by_both_parties() {
        let fixture = TestLedger::new();
        let sender = fixture.activated_account().await;
        let receiver = fixture.activated_account().await;

        let (_sender_payments_reg, mut sender_payments) = watch_payments(&sender);
        let (_sender_balances_reg, mut sender_balances) = watch_balances(&sender);
        let (_receiver_payments_reg, mut receiver_payments) = watch_payments(&receiver);
        let (_receiver_balances_reg, mut receiver_balances) = watch_balances(&receiver);
        fixture.wait_for_streams(2).await;

        let funding_id = fixture.ledger.fund(&sender.address(), dec!(100)).unwrap();
        let funding = next_event(&mut sender_payments).await;
        assert_eq!(funding.transaction_id, funding_id);
        assert_eq!(funding.source, fixture.ledger.issuer_address());
        assert_eq!(funding.destination, sender.address());
        assert_eq!(next_event(&mut sender_balances).await.value(), dec!(100));

        let id = sender
            .send_transaction(&receiver.address(), dec!(21.123), Some("fake memo"))
            .await
            .unwrap();

        let outgoing = next_event(&mut sender_payments).await;
        let incoming = next_event(&mut receiver_payments).await;
        for payment in [&outgoing, &incoming] {
            assert_eq!(payment.transaction_id, id);
            assert_eq!(payment.source, sender.address());
            assert_eq!(payment.destination, receiver.address());
            assert_eq!(payment.amount.to_decimal(), dec!(21.123));
            assert_eq!(payment.memo.as_deref(), Some("fake memo"));
        }
        assert_eq!(
            next_event(&mut sender_balances).await.to_string(),
            "78.8770000"
        );
        assert_eq!(
            next_event(&mut receiver_balances).await.to_string(),
            "21.1230000"
        );

        assert_quiet(&mut sender_payments).await;
        assert_quiet(&mut sender_balances).await;
        assert_quiet(&mut receiver_payments).await;
        assert_quiet(&mut receiver_balances).await;
    }

    #[tokio::test]
    async fn test_every_listener_gets_every_event_in_order() {
        let fixture = TestLedger::new();
        let account = fixture.activated_account().await;
        let (_first_reg, mut first) = watch_payments(&account);
        let (_second_reg, mut second) = watch_payments(&account);
        fixture.wait_for_streams(1).await;

        let amounts = [dec!(1), dec!(2), dec!(3)];
        for amount in amounts {
            fixture.ledger.fund(&account.address(), amount).unwrap();
        }

        for rx in [&mut first, &mut second] {
            for amount in amounts {
                assert_eq!(next_event(rx).await.amount.to_decimal(), amount);
            }
        }
    }

    #[tokio::test]
    async fn test_stream_starts_at_now() {
        let fixture = TestLedger::new();
        let account = fixture.funded_account(dec!(7)).await;

        let (_registration, mut payments) = watch_payments(&account);
        fixture.wait_for_streams(1).await;

        assert_quiet(&mut payments).await;
    }

    #[tokio::test]
    async fn test_idle_and_streaming_transitions() {
        let fixture = TestLedger::new();
        let account = fixture.activated_account().await;
        let events = account.blockchain_events();
        assert!(!events.is_streaming());

        let payments = account.add_payment_listener(|_| {});
        let balances = account.add_balance_listener(|_| {});
        assert!(events.is_streaming());
        assert_eq!(events.listener_count(), 2);
        fixture.wait_for_streams(1).await;

        payments.remove();
        assert!(events.is_streaming());
        balances.remove();
        assert!(!events.is_streaming());
        fixture.wait_for_streams(0).await;

        let _again = account.add_balance_listener(|_| {});
        assert!(events.is_streaming());
        fixture.wait_for_streams(1).await;
    }

    #[tokio::test]
    async fn test_removed_listener_is_not_called() {
        let fixture = TestLedger::new();
        let sender = fixture.funded_account(dec!(10)).await;
        let receiver = fixture.activated_account().await;

        let (registration, mut payments) = watch_payments(&receiver);
        let (_kept, mut balances) = watch_balances(&receiver);
        fixture.wait_for_streams(1).await;

        registration.remove();
        assert!(!registration.is_active());
        registration.remove();

        sender
            .send_transaction(&receiver.address(), dec!(1), None)
            .await
            .unwrap();

        // The other listener keeps the stream alive and still sees the change.
        assert_eq!(next_event(&mut balances).await.value(), dec!(1));
        assert_quiet(&mut payments).await;
    }

    #[tokio::test]
    async fn test_listener_can_remove_itself() {
        let fixture = TestLedger::new();
        let account = fixture.activated_account().await;
        let (tx, mut rx) = mpsc::unbounded_channel::<Decimal>();

        let slot: Arc<Mutex<Option<ListenerRegistration>>> = Arc::default();
        let own = slot.clone();
        let registration = account.add_payment_listener(move |payment| {
            let _ = tx.send(payment.amount.to_decimal());
            if let Some(registration) = own.lock().as_ref() {
                registration.remove();
            }
        });
        *slot.lock() = Some(registration);
        fixture.wait_for_streams(1).await;

        fixture.ledger.fund(&account.address(), dec!(1)).unwrap();
        fixture.ledger.fund(&account.address(), dec!(2)).unwrap();

        assert_eq!(next_event(&mut rx).await, dec!(1));
        assert_quiet(&mut rx).await;
        assert!(!account.blockchain_events().is_streaming());
    }

    #[tokio::test]
    async fn test_listener_can_register_another() {
        let fixture = TestLedger::new();
        let account = fixture.activated_account().await;
        let (tx, mut rx) = mpsc::unbounded_channel::<&'static str>();

        let added: Arc<Mutex<Vec<ListenerRegistration>>> = Arc::default();
        let sink = added.clone();
        let events = account.blockchain_events().clone();
        let first_tx = tx.clone();
        let _first = account.add_payment_listener(move |_| {
            let _ = first_tx.send("first");
            let mut added = sink.lock();
            if added.is_empty() {
                let tx = tx.clone();
                added.push(events.add_payment_listener(move |_| {
                    let _ = tx.send("second");
                }));
            }
        });
        fixture.wait_for_streams(1).await;

        fixture.ledger.fund(&account.address(), dec!(1)).unwrap();
        assert_eq!(next_event(&mut rx).await, "first");
        assert_quiet(&mut rx).await;

        fixture.ledger.fund(&account.address(), dec!(1)).unwrap();
        let mut seen = vec![next_event(&mut rx).await, next_event(&mut rx).await];
        seen.sort_unstable();
        assert_eq!(seen, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_stream_resumes_after_reset_without_gap() {
        let fixture = TestLedger::new();
        let account = fixture.activated_account().await;
        let (_registration, mut payments) = watch_payments(&account);
        fixture.wait_for_streams(1).await;

        fixture.ledger.fund(&account.address(), dec!(1)).unwrap();
        assert_eq!(next_event(&mut payments).await.amount.to_decimal(), dec!(1));

        fixture.ledger.reset_streams();
        fixture.ledger.fund(&account.address(), dec!(2)).unwrap();
        fixture.ledger.fund(&account.address(), dec!(3)).unwrap();

        assert_eq!(next_event(&mut payments).await.amount.to_decimal(), dec!(2));
        assert_eq!(next_event(&mut payments).await.amount.to_decimal(), dec!(3));
        assert_quiet(&mut payments).await;
        assert!(account.blockchain_events().is_streaming());
    }

    #[tokio::test]
    async fn test_stream_survives_outage() {
        let fixture = TestLedger::new();
        let account = fixture.activated_account().await;
        let (_registration, mut payments) = watch_payments(&account);
        fixture.wait_for_streams(1).await;

        fixture.ledger.fund(&account.address(), dec!(1)).unwrap();
        next_event(&mut payments).await;

        fixture.ledger.set_offline(true);
        fixture.wait_for_streams(0).await;
        fixture.ledger.fund(&account.address(), dec!(4)).unwrap();
        fixture.ledger.set_offline(false);

        assert_eq!(next_event(&mut payments).await.amount.to_decimal(), dec!(4));
    }

    #[tokio::test]
    async fn test_channel_dispatcher_defers_callbacks() {
        let (dispatcher, mut queue) = ChannelDispatcher::new();
        let fixture = TestLedger::with_dispatcher(Arc::new(dispatcher));
        let account = fixture.activated_account().await;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let _registration = account.add_payment_listener(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        fixture.wait_for_streams(1).await;

        fixture.ledger.fund(&account.address(), dec!(1)).unwrap();
        fixture.ledger.fund(&account.address(), dec!(2)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        for expected in 1..=2 {
            assert!(timeout(EVENT_TIMEOUT, queue.run_next()).await.unwrap());
            assert_eq!(calls.load(Ordering::SeqCst), expected);
        }
    }

    #[tokio::test]
    async fn test_removal_before_queued_delivery_wins() {
        let (dispatcher, mut queue) = ChannelDispatcher::new();
        let fixture = TestLedger::with_dispatcher(Arc::new(dispatcher));
        let account = fixture.activated_account().await;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let registration = account.add_payment_listener(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        // Keeps the stream open after the first listener goes away.
        let _balances = account.add_balance_listener(|_| {});
        fixture.wait_for_streams(1).await;

        fixture.ledger.fund(&account.address(), dec!(1)).unwrap();
        // Payment job, then balance job.
        let first = timeout(EVENT_TIMEOUT, queue.run_next()).await.unwrap();
        assert!(first);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(timeout(EVENT_TIMEOUT, queue.run_next()).await.unwrap());

        fixture.ledger.fund(&account.address(), dec!(1)).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        registration.remove();
        queue.run_pending();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_payment_sent_right_after_registering_is_observed() {
        let fixture = TestLedger::new();
        let sender = fixture.funded_account(dec!(50)).await;
        let receiver = fixture.activated_account().await;

        let (_payments_reg, mut payments) = watch_payments(&receiver);
        let (_balances_reg, mut balances) = watch_balances(&receiver);
        let id = sender
            .send_transaction(&receiver.address(), dec!(21.123), None)
            .await
            .unwrap();

        let payment = next_event(&mut payments).await;
        assert_eq!(payment.transaction_id, id);
        assert_eq!(payment.amount.to_decimal(), dec!(21.123));
        assert_eq!(next_event(&mut balances).await.to_string(), "21.1230000");
        assert_quiet(&mut payments).await;
    }

    #[tokio::test]
    async fn test_account_creation_listener() {
        let fixture = TestLedger::new();
        let account = fixture.new_account();
        let (tx, mut rx) = mpsc::unbounded_channel::<Address>();

        let registration = account
            .blockchain_events()
            .add_account_creation_listener(move |address| {
                let _ = tx.send(*address);
            });
        assert!(!account.blockchain_events().is_streaming());
        assert_quiet(&mut rx).await;

        fixture.ledger.create_account(&account.address()).unwrap();
        assert_eq!(next_event(&mut rx).await, account.address());
        assert!(!registration.is_active());
    }
}
