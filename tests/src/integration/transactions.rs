//! # Transactions
//!
//! Payment submission: exact balance movement, memo round-trip, the order
//! of precondition checks and the mapping of ledger rejections.

#[cfg(test)]
mod tests {
    use super::super::harness::TestLedger;
    use kin_core::{KinAccountApi, KinError, LedgerGateway};
    use kin_telemetry::metrics::{gather_metrics, TRANSACTIONS_REJECTED, TRANSACTIONS_SUBMITTED};
    use kin_types::{AmountError, MemoError, Operation};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_send_moves_exact_amounts() {
        let fixture = TestLedger::new();
        let sender = fixture.funded_account(dec!(100)).await;
        let receiver = fixture.activated_account().await;

        let id = sender
            .send_transaction(&receiver.address(), dec!(21.123), Some("fake memo"))
            .await
            .unwrap();

        assert_eq!(sender.balance().await.unwrap().to_string(), "78.8770000");
        assert_eq!(receiver.balance().await.unwrap().to_string(), "21.1230000");

        let record = fixture
            .client
            .gateway()
            .fetch_transaction(&id)
            .await
            .unwrap()
            .expect("submitted transaction is retrievable");
        assert_eq!(record.id, id);
        assert_eq!(record.memo_text(), Some("fake memo"));
        assert_eq!(*record.source(), sender.address());
        assert!(record.successful);
        assert!(matches!(
            record.operations(),
            [Operation::Payment { destination, .. }] if *destination == receiver.address()
        ));
    }

    #[tokio::test]
    async fn test_send_without_memo() {
        let fixture = TestLedger::new();
        let sender = fixture.funded_account(dec!(10)).await;
        let receiver = fixture.activated_account().await;

        let id = sender
            .send_transaction(&receiver.address(), dec!(1), None)
            .await
            .unwrap();
        let record = fixture
            .client
            .gateway()
            .fetch_transaction(&id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.memo_text(), None);
    }

    #[tokio::test]
    async fn test_sender_not_created() {
        let fixture = TestLedger::new();
        let sender = fixture.new_account();
        let receiver = fixture.activated_account().await;

        assert_eq!(
            sender
                .send_transaction(&receiver.address(), dec!(1), None)
                .await,
            Err(KinError::AccountNotFound {
                address: sender.address()
            })
        );
    }

    #[tokio::test]
    async fn test_sender_not_activated() {
        let fixture = TestLedger::new();
        let sender = fixture.created_account();
        let receiver = fixture.activated_account().await;

        assert_eq!(
            sender
                .send_transaction(&receiver.address(), dec!(1), None)
                .await,
            Err(KinError::AccountNotActivated {
                address: sender.address()
            })
        );
    }

    #[tokio::test]
    async fn test_receiver_not_created() {
        let fixture = TestLedger::new();
        let sender = fixture.funded_account(dec!(10)).await;
        let receiver = fixture.new_account();

        assert_eq!(
            sender
                .send_transaction(&receiver.address(), dec!(1), None)
                .await,
            Err(KinError::AccountNotFound {
                address: receiver.address()
            })
        );
    }

    #[tokio::test]
    async fn test_receiver_not_activated() {
        let fixture = TestLedger::new();
        let sender = fixture.funded_account(dec!(10)).await;
        let receiver = fixture.created_account();

        assert_eq!(
            sender
                .send_transaction(&receiver.address(), dec!(1), None)
                .await,
            Err(KinError::AccountNotActivated {
                address: receiver.address()
            })
        );
    }

    #[tokio::test]
    async fn test_overdraft_is_insufficient_kin() {
        let fixture = TestLedger::new();
        let sender = fixture.funded_account(dec!(10)).await;
        let receiver = fixture.activated_account().await;

        assert_eq!(
            sender
                .send_transaction(&receiver.address(), dec!(10.0000001), None)
                .await,
            Err(KinError::InsufficientKin)
        );
        assert_eq!(sender.balance().await.unwrap().value(), dec!(10));
        assert_eq!(receiver.balance().await.unwrap().value(), dec!(0));
    }

    #[tokio::test]
    async fn test_submissions_are_counted() {
        let fixture = TestLedger::new();
        let sender = fixture.funded_account(dec!(10)).await;
        let receiver = fixture.activated_account().await;
        let underfunded = TRANSACTIONS_REJECTED.with_label_values(&["op_underfunded"]);
        let submitted_before = TRANSACTIONS_SUBMITTED.get();
        let rejected_before = underfunded.get();

        sender
            .send_transaction(&receiver.address(), dec!(4), None)
            .await
            .unwrap();
        assert!(sender
            .send_transaction(&receiver.address(), dec!(7), None)
            .await
            .is_err());

        assert!(TRANSACTIONS_SUBMITTED.get() >= submitted_before + 2.0);
        assert!(underfunded.get() >= rejected_before + 1.0);
        let text = gather_metrics().unwrap();
        assert!(text.contains("kin_transactions_submitted_total"));
        assert!(text.contains("op_underfunded"));
    }

    #[tokio::test]
    async fn test_invalid_amounts_are_rejected_before_submission() {
        let fixture = TestLedger::new();
        let sender = fixture.funded_account(dec!(10)).await;
        let receiver = fixture.activated_account().await;
        let count = fixture.ledger.transaction_count();

        assert_eq!(
            sender
                .send_transaction(&receiver.address(), dec!(0), None)
                .await,
            Err(KinError::InvalidAmount(AmountError::NotPositive))
        );
        assert!(matches!(
            sender
                .send_transaction(&receiver.address(), dec!(1.00000001), None)
                .await,
            Err(KinError::InvalidAmount(AmountError::TooPrecise { .. }))
        ));
        assert!(matches!(
            sender
                .send_transaction(&receiver.address(), dec!(-3), None)
                .await,
            Err(KinError::InvalidAmount(AmountError::Negative(_)))
        ));
        assert_eq!(fixture.ledger.transaction_count(), count);
    }

    #[tokio::test]
    async fn test_account_checks_precede_amount_check() {
        let fixture = TestLedger::new();
        let sender = fixture.funded_account(dec!(10)).await;
        let receiver = fixture.new_account();

        assert_eq!(
            sender
                .send_transaction(&receiver.address(), dec!(0), None)
                .await,
            Err(KinError::AccountNotFound {
                address: receiver.address()
            })
        );
    }

    #[tokio::test]
    async fn test_trailing_zeros_are_not_extra_precision() {
        let fixture = TestLedger::new();
        let sender = fixture.funded_account(dec!(10)).await;
        let receiver = fixture.activated_account().await;

        sender
            .send_transaction(&receiver.address(), dec!(1.500000000), None)
            .await
            .unwrap();
        assert_eq!(receiver.balance().await.unwrap().value(), dec!(1.5));
    }

    #[tokio::test]
    async fn test_oversized_memo_is_rejected() {
        let fixture = TestLedger::new();
        let sender = fixture.funded_account(dec!(10)).await;
        let receiver = fixture.activated_account().await;

        let memo = "x".repeat(29);
        assert!(matches!(
            sender
                .send_transaction(&receiver.address(), dec!(1), Some(&memo))
                .await,
            Err(KinError::InvalidMemo(MemoError::TooLong { len: 29, max: 28 }))
        ));
    }

    #[tokio::test]
    async fn test_transport_failure_is_network_error() {
        let fixture = TestLedger::new();
        let sender = fixture.funded_account(dec!(10)).await;
        let receiver = fixture.activated_account().await;
        fixture.ledger.set_offline(true);

        let err = sender
            .send_transaction(&receiver.address(), dec!(1), None)
            .await
            .unwrap_err();
        assert!(matches!(err, KinError::NetworkError(_)));

        fixture.ledger.set_offline(false);
        assert_eq!(sender.balance().await.unwrap().value(), dec!(10));
    }

    #[test]
    fn test_blocking_send_from_worker_thread() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let (fixture, sender, receiver) = runtime.block_on(async {
            let fixture = TestLedger::new();
            let sender = fixture.funded_account(dec!(5)).await;
            let receiver = fixture.activated_account().await;
            (fixture, sender, receiver)
        });

        let worker = std::thread::spawn(move || {
            sender.send_transaction_sync(&receiver.address(), dec!(2), Some("sync"))
        });
        let id = worker.join().unwrap().unwrap();

        let record = runtime
            .block_on(fixture.client.gateway().fetch_transaction(&id))
            .unwrap()
            .unwrap();
        assert_eq!(record.memo_text(), Some("sync"));
    }
}
