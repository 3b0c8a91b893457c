//! Shared fixture: an in-memory ledger and a client bound to it.

use kin_core::{
    ClientConfig, EventDispatcher, InMemoryLedger, KinAccount, KinAccountApi, KinClient,
    StreamConfig,
};
use kin_crypto::KeyPair;
use rust_decimal::Decimal;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{sleep, timeout};

/// Upper bound for anything expected to happen.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long to watch for something that must not happen.
pub const QUIET_PERIOD: Duration = Duration::from_millis(300);

pub struct TestLedger {
    pub ledger: Arc<InMemoryLedger>,
    pub client: KinClient,
}

impl TestLedger {
    /// Must be called inside a Tokio runtime.
    pub fn new() -> Self {
        let ledger = Arc::new(InMemoryLedger::new());
        let client = KinClient::new(fast_config(&ledger), ledger.clone(), Handle::current())
            .expect("in-memory client config is valid");
        Self { ledger, client }
    }

    pub fn with_dispatcher(dispatcher: Arc<dyn EventDispatcher>) -> Self {
        let fixture = Self::new();
        Self {
            client: fixture.client.with_dispatcher(dispatcher),
            ledger: fixture.ledger,
        }
    }

    /// Account with no ledger record.
    pub fn new_account(&self) -> KinAccount {
        self.client.account(KeyPair::generate())
    }

    /// Account with a ledger record but no trustline.
    pub fn created_account(&self) -> KinAccount {
        let account = self.new_account();
        self.ledger
            .create_account(&account.address())
            .expect("root account can create accounts");
        account
    }

    pub async fn activated_account(&self) -> KinAccount {
        let account = self.created_account();
        account.activate().await.expect("activation succeeds");
        account
    }

    pub async fn funded_account(&self, amount: Decimal) -> KinAccount {
        let account = self.activated_account().await;
        self.ledger
            .fund(&account.address(), amount)
            .expect("issuer can fund activated accounts");
        account
    }

    /// Wait until exactly `count` ledger streams are subscribed.
    pub async fn wait_for_streams(&self, count: usize) {
        timeout(EVENT_TIMEOUT, async {
            while self.ledger.open_streams() != count {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| {
            panic!(
                "expected {count} open streams, found {}",
                self.ledger.open_streams()
            )
        });
    }
}

/// Short reconnect and poll intervals keep the suite fast.
fn fast_config(ledger: &InMemoryLedger) -> ClientConfig {
    ClientConfig {
        stream: StreamConfig {
            reconnect_delay_ms: 10,
            max_reconnect_delay_ms: 50,
            creation_poll_interval_ms: 10,
        },
        ..ledger.client_config()
    }
}

/// Next item, failing the test after [`EVENT_TIMEOUT`].
pub async fn next_event<T>(rx: &mut UnboundedReceiver<T>) -> T {
    timeout(EVENT_TIMEOUT, rx.recv())
        .await
        .expect("event not delivered in time")
        .expect("event channel closed")
}

/// Assert nothing arrives during [`QUIET_PERIOD`].
pub async fn assert_quiet<T: Debug>(rx: &mut UnboundedReceiver<T>) {
    if let Ok(Some(event)) = timeout(QUIET_PERIOD, rx.recv()).await {
        panic!("unexpected event: {event:?}");
    }
}
