//! Per-account stream registry.

use super::dispatcher::EventDispatcher;
use super::event::BlockchainEvent;
use super::listeners::{Listener, ListenerKind, ListenerRegistration, ListenerSet};
use crate::application::AccountStateResolver;
use crate::config::StreamConfig;
use crate::domain::decode_payment;
use crate::ports::LedgerGateway;
use chrono::Utc;
use dashmap::DashMap;
use futures::StreamExt;
use kin_telemetry::metric_inc;
use kin_telemetry::metrics::{STREAMS_ACTIVE, STREAM_EVENTS_DELIVERED, STREAM_RECONNECTS};
use kin_types::{Address, Asset, Balance, PaymentInfo, StreamCursor, TransactionRecord};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Aborts the task when dropped.
struct TaskHandle(Option<JoinHandle<()>>);

impl TaskHandle {
    fn is_running(&self) -> bool {
        self.0.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Let the task run to completion on its own.
    fn detach(mut self) {
        self.0.take();
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}

#[derive(Default)]
struct ChannelTasks {
    stream: Option<TaskHandle>,
    creation_watch: Option<TaskHandle>,
    /// Set once the channel has left the registry; callers must look it up again.
    retired: bool,
}

/// Listeners and background tasks of one account.
///
/// `tasks` serializes every mutation for the account.
struct AccountChannel {
    address: Address,
    tasks: Mutex<ChannelTasks>,
    listeners: Arc<ListenerSet>,
}

impl AccountChannel {
    fn new(address: Address) -> Self {
        Self {
            address,
            tasks: Mutex::new(ChannelTasks::default()),
            listeners: Arc::new(ListenerSet::default()),
        }
    }
}

pub(crate) struct Registry {
    gateway: Arc<dyn LedgerGateway>,
    resolver: Arc<AccountStateResolver>,
    asset: Asset,
    config: StreamConfig,
    runtime: Handle,
    dispatcher: Arc<dyn EventDispatcher>,
    channels: DashMap<Address, Arc<AccountChannel>>,
    next_id: AtomicU64,
}

impl Registry {
    fn channel(&self, address: &Address) -> Arc<AccountChannel> {
        self.channels
            .entry(*address)
            .or_insert_with(|| Arc::new(AccountChannel::new(*address)))
            .clone()
    }

    fn existing_channel(&self, address: &Address) -> Option<Arc<AccountChannel>> {
        self.channels.get(address).map(|entry| entry.value().clone())
    }

    /// Run `mutate` on the registered channel of `address` under its task lock.
    fn with_channel<R>(
        &self,
        address: &Address,
        mutate: impl FnOnce(&Arc<AccountChannel>, &mut ChannelTasks) -> R,
    ) -> R {
        loop {
            let channel = self.channel(address);
            let mut tasks = channel.tasks.lock();
            if tasks.retired {
                continue;
            }
            return mutate(&channel, &mut tasks);
        }
    }

    /// Drop the channel from the registry once no listener of any kind is left.
    ///
    /// Must be called with the channel's task lock held.
    fn retire_if_empty(&self, channel: &Arc<AccountChannel>, tasks: &mut ChannelTasks) {
        if !channel.listeners.is_empty() {
            return;
        }
        tasks.retired = true;
        self.channels
            .remove_if(&channel.address, |_, current| Arc::ptr_eq(current, channel));
        debug!(address = %channel.address, "Account channel released");
    }

    pub(crate) fn remove_listener(&self, address: &Address, kind: ListenerKind, id: u64) {
        let Some(channel) = self.existing_channel(address) else {
            return;
        };
        let mut tasks = channel.tasks.lock();
        if !channel.listeners.remove(kind, id) {
            return;
        }
        debug!(address = %address, ?kind, id, "Listener removed");

        if !channel.listeners.wants_stream() {
            if let Some(stream) = tasks.stream.take() {
                info!(address = %address, "Closing account stream");
                drop(stream);
            }
        }
        if !channel.listeners.has_creation_listeners() {
            tasks.creation_watch.take();
        }
        self.retire_if_empty(&channel, &mut tasks);
    }
}

/// Owns one ledger stream per account with listeners and fans events out.
///
/// Cheap to clone; clones share the registry.
#[derive(Clone)]
pub struct EventMultiplexer {
    inner: Arc<Registry>,
}

impl EventMultiplexer {
    /// Background tasks are spawned on `runtime`; callbacks run through `dispatcher`.
    pub fn new(
        gateway: Arc<dyn LedgerGateway>,
        resolver: Arc<AccountStateResolver>,
        config: StreamConfig,
        runtime: Handle,
        dispatcher: Arc<dyn EventDispatcher>,
    ) -> Self {
        let asset = resolver.asset().clone();
        Self {
            inner: Arc::new(Registry {
                gateway,
                resolver,
                asset,
                config,
                runtime,
                dispatcher,
                channels: DashMap::new(),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Payments of the tracked asset to or from `address`.
    pub fn add_payment_listener<F>(&self, address: Address, callback: F) -> ListenerRegistration
    where
        F: Fn(&PaymentInfo) + Send + Sync + 'static,
    {
        let listener = Listener::new(self.next_id(), callback);
        let registration = self.registration(address, ListenerKind::Payment, &listener);

        self.inner.with_channel(&address, |channel, tasks| {
            channel.listeners.payments.write().push(listener);
            self.ensure_streaming(channel, tasks);
        });
        registration
    }

    /// Balance of `address` after each ledger change involving it.
    pub fn add_balance_listener<F>(&self, address: Address, callback: F) -> ListenerRegistration
    where
        F: Fn(&Balance) + Send + Sync + 'static,
    {
        let listener = Listener::new(self.next_id(), callback);
        let registration = self.registration(address, ListenerKind::Balance, &listener);

        self.inner.with_channel(&address, |channel, tasks| {
            channel.listeners.balances.write().push(listener);
            self.ensure_streaming(channel, tasks);
        });
        registration
    }

    /// Fires once, when `address` first exists on the ledger.
    ///
    /// Polls the gateway; does not open the transaction stream. Fires
    /// promptly if the account already exists.
    pub fn add_account_creation_listener<F>(
        &self,
        address: Address,
        callback: F,
    ) -> ListenerRegistration
    where
        F: Fn(&Address) + Send + Sync + 'static,
    {
        let listener = Listener::new(self.next_id(), callback);
        let registration = self.registration(address, ListenerKind::AccountCreation, &listener);

        self.inner.with_channel(&address, |channel, tasks| {
            channel.listeners.creations.write().push(listener);
            self.ensure_watching(channel, tasks);
        });
        registration
    }

    /// `true` while the account's transaction stream is open.
    pub fn is_streaming(&self, address: &Address) -> bool {
        let Some(channel) = self.inner.existing_channel(address) else {
            return false;
        };
        let tasks = channel.tasks.lock();
        tasks.stream.as_ref().is_some_and(TaskHandle::is_running)
    }

    /// Registered listeners of every category for `address`.
    pub fn listener_count(&self, address: &Address) -> usize {
        self.inner
            .existing_channel(address)
            .map_or(0, |channel| channel.listeners.len())
    }

    fn next_id(&self) -> u64 {
        self.inner.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn registration<T>(
        &self,
        address: Address,
        kind: ListenerKind,
        listener: &Listener<T>,
    ) -> ListenerRegistration {
        debug!(address = %address, ?kind, id = listener.id, "Listener added");
        ListenerRegistration::new(
            Arc::downgrade(&self.inner),
            address,
            kind,
            listener.id,
            listener.active_flag(),
        )
    }

    /// Start the account stream if it is not running.
    ///
    /// The start position is fixed here, before the caller gets its
    /// registration back, so activity right after registering is not lost
    /// while the connection is still being set up.
    fn ensure_streaming(&self, channel: &AccountChannel, tasks: &mut ChannelTasks) {
        if tasks.stream.as_ref().is_some_and(TaskHandle::is_running) {
            return;
        }
        let start = StreamCursor::Since(Utc::now());
        info!(address = %channel.address, cursor = %start, "Opening account stream");
        let worker = StreamWorker {
            address: channel.address,
            start,
            gateway: self.inner.gateway.clone(),
            resolver: self.inner.resolver.clone(),
            asset: self.inner.asset.clone(),
            dispatcher: self.inner.dispatcher.clone(),
            listeners: channel.listeners.clone(),
            reconnect_delay: self.inner.config.reconnect_delay(),
            max_reconnect_delay: self.inner.config.max_reconnect_delay(),
        };
        tasks.stream = Some(TaskHandle(Some(self.inner.runtime.spawn(worker.run()))));
    }

    fn ensure_watching(&self, channel: &Arc<AccountChannel>, tasks: &mut ChannelTasks) {
        if tasks.creation_watch.as_ref().is_some_and(TaskHandle::is_running) {
            return;
        }
        let watcher = CreationWatcher {
            registry: Arc::downgrade(&self.inner),
            channel: channel.clone(),
            gateway: self.inner.gateway.clone(),
            dispatcher: self.inner.dispatcher.clone(),
            interval: self.inner.config.creation_poll_interval(),
        };
        tasks.creation_watch = Some(TaskHandle(Some(self.inner.runtime.spawn(watcher.run()))));
    }
}

/// Keeps the active-stream gauge in step on every exit path.
struct ActiveStream {
    address: Address,
}

impl ActiveStream {
    fn open(address: Address) -> Self {
        STREAMS_ACTIVE.inc();
        Self { address }
    }
}

impl Drop for ActiveStream {
    fn drop(&mut self) {
        STREAMS_ACTIVE.dec();
        debug!(address = %self.address, "Account stream released");
    }
}

struct StreamWorker {
    address: Address,
    start: StreamCursor,
    gateway: Arc<dyn LedgerGateway>,
    resolver: Arc<AccountStateResolver>,
    asset: Asset,
    dispatcher: Arc<dyn EventDispatcher>,
    listeners: Arc<ListenerSet>,
    reconnect_delay: Duration,
    max_reconnect_delay: Duration,
}

impl StreamWorker {
    /// Read until aborted, resubscribing after the last delivered record.
    async fn run(self) {
        let _active = ActiveStream::open(self.address);
        let mut cursor = self.start.clone();
        let mut delay = self.reconnect_delay;

        loop {
            match self.gateway.open_stream(&self.address, cursor.clone()).await {
                Ok(mut stream) => {
                    while let Some(item) = stream.next().await {
                        match item {
                            Ok(record) => {
                                cursor = StreamCursor::After(record.paging_token.clone());
                                delay = self.reconnect_delay;
                                if record.successful {
                                    self.deliver(&record).await;
                                }
                            }
                            Err(err) => {
                                warn!(address = %self.address, error = %err, "Account stream failed");
                                break;
                            }
                        }
                    }
                }
                Err(err) => {
                    warn!(address = %self.address, error = %err, "Could not open account stream");
                }
            }

            metric_inc!(STREAM_RECONNECTS);
            debug!(
                address = %self.address,
                cursor = %cursor,
                delay_ms = delay.as_millis() as u64,
                "Resubscribing account stream"
            );
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(self.max_reconnect_delay);
        }
    }

    async fn deliver(&self, record: &TransactionRecord) {
        if let Some(payment) = decode_payment(record, &self.asset) {
            publish(&self.listeners, self.dispatcher.as_ref(), BlockchainEvent::Payment(payment));
        }
        if self.listeners.has_balance_listeners() {
            match self.resolver.balance(&self.address).await {
                Ok(balance) => publish(
                    &self.listeners,
                    self.dispatcher.as_ref(),
                    BlockchainEvent::Balance(balance),
                ),
                Err(err) => {
                    debug!(address = %self.address, error = %err, "Balance unavailable for event")
                }
            }
        }
    }
}

/// Route an event to the listeners of its category.
fn publish(listeners: &ListenerSet, dispatcher: &dyn EventDispatcher, event: BlockchainEvent) {
    let kind = event.kind();
    match event {
        BlockchainEvent::Payment(payment) => fan_out(&listeners.payments, dispatcher, kind, payment),
        BlockchainEvent::Balance(balance) => fan_out(&listeners.balances, dispatcher, kind, balance),
        BlockchainEvent::AccountCreated(address) => {
            fan_out(&listeners.creations, dispatcher, kind, address)
        }
    }
}

fn fan_out<T>(
    listeners: &RwLock<Vec<Listener<T>>>,
    dispatcher: &dyn EventDispatcher,
    kind: &'static str,
    value: T,
) where
    T: Send + Sync + 'static,
{
    // Snapshot so callbacks may add or remove listeners.
    let snapshot = listeners.read().clone();
    let value = Arc::new(value);
    for listener in snapshot {
        let value = value.clone();
        dispatcher.dispatch(Box::new(move || {
            if listener.deliver(&value) {
                metric_inc!(STREAM_EVENTS_DELIVERED, &[kind]);
            }
        }));
    }
}

struct CreationWatcher {
    registry: Weak<Registry>,
    channel: Arc<AccountChannel>,
    gateway: Arc<dyn LedgerGateway>,
    dispatcher: Arc<dyn EventDispatcher>,
    interval: Duration,
}

impl CreationWatcher {
    async fn run(self) {
        let address = self.channel.address;
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.gateway.fetch_account(&address).await {
                Ok(Some(_)) => {}
                Ok(None) => continue,
                Err(err) => {
                    debug!(address = %address, error = %err, "Account creation poll failed");
                    continue;
                }
            }

            let fired = std::mem::take(&mut *self.channel.listeners.creations.write());
            info!(address = %address, listeners = fired.len(), "Account created");
            for listener in fired {
                self.dispatcher.dispatch(Box::new(move || {
                    if listener.deliver(&address) {
                        metric_inc!(STREAM_EVENTS_DELIVERED, &["account_created"]);
                    }
                    listener.deactivate();
                }));
            }

            // Listeners added meanwhile fire on the next tick.
            let mut tasks = self.channel.tasks.lock();
            if !self.channel.listeners.has_creation_listeners() {
                if let Some(handle) = tasks.creation_watch.take() {
                    handle.detach();
                }
                if let Some(registry) = self.registry.upgrade() {
                    registry.retire_if_empty(&self.channel, &mut tasks);
                }
                return;
            }
        }
    }
}
