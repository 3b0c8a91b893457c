//! # Account Lifecycle
//!
//! `NotCreated` → `NotActivated` → `Activated`, and the balance reported in
//! each state.

#[cfg(test)]
mod tests {
    use super::super::harness::TestLedger;
    use kin_core::{KinAccountApi, KinError};
    use kin_types::AccountStatus;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_unknown_address_is_not_created() {
        let fixture = TestLedger::new();
        let account = fixture.new_account();

        assert_eq!(account.status().await.unwrap(), AccountStatus::NotCreated);
        assert_eq!(
            account.balance().await,
            Err(KinError::AccountNotFound {
                address: account.address()
            })
        );
    }

    #[tokio::test]
    async fn test_created_account_is_not_activated() {
        let fixture = TestLedger::new();
        let account = fixture.created_account();

        assert_eq!(account.status().await.unwrap(), AccountStatus::NotActivated);
        assert_eq!(
            account.balance().await,
            Err(KinError::AccountNotActivated {
                address: account.address()
            })
        );
    }

    #[tokio::test]
    async fn test_activate_without_record_fails() {
        let fixture = TestLedger::new();
        let account = fixture.new_account();

        assert_eq!(
            account.activate().await,
            Err(KinError::AccountNotFound {
                address: account.address()
            })
        );
        assert_eq!(account.status().await.unwrap(), AccountStatus::NotCreated);
    }

    #[tokio::test]
    async fn test_fresh_activation_has_zero_balance() {
        let fixture = TestLedger::new();
        let account = fixture.activated_account().await;

        assert_eq!(account.status().await.unwrap(), AccountStatus::Activated);
        let balance = account.balance().await.unwrap();
        assert_eq!(balance.value(), dec!(0));
        assert_eq!(balance.to_string(), "0.0000000");
    }

    #[tokio::test]
    async fn test_activating_twice_submits_once() {
        let fixture = TestLedger::new();
        let account = fixture.activated_account().await;
        let count = fixture.ledger.transaction_count();

        account.activate().await.unwrap();
        assert_eq!(fixture.ledger.transaction_count(), count);
    }

    #[tokio::test]
    async fn test_funded_balance_is_exact() {
        let fixture = TestLedger::new();
        let account = fixture.funded_account(dec!(3.1415926)).await;

        let balance = account.balance().await.unwrap();
        assert_eq!(balance.value(), dec!(3.1415926));
        assert_eq!(balance.to_string(), "3.1415926");
    }

    #[tokio::test]
    async fn test_offline_ledger_reports_network_error() {
        let fixture = TestLedger::new();
        let account = fixture.activated_account().await;
        fixture.ledger.set_offline(true);

        let err = account.status().await.unwrap_err();
        assert!(matches!(err, KinError::NetworkError(_)));
        assert!(err.is_retryable());

        fixture.ledger.set_offline(false);
        assert_eq!(account.status().await.unwrap(), AccountStatus::Activated);
    }

    #[test]
    fn test_blocking_calls_from_plain_thread() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let fixture = runtime.block_on(async { TestLedger::new() });
        let account = fixture.created_account();

        assert_eq!(account.status_sync().unwrap(), AccountStatus::NotActivated);
        account.activate_sync().unwrap();
        assert_eq!(account.balance_sync().unwrap().value(), dec!(0));
    }

    #[tokio::test]
    async fn test_blocking_calls_inside_runtime_are_refused() {
        let fixture = TestLedger::new();
        let account = fixture.new_account();

        assert_eq!(account.status_sync(), Err(KinError::BlockingInAsyncContext));
        assert_eq!(account.balance_sync(), Err(KinError::BlockingInAsyncContext));
    }
}
