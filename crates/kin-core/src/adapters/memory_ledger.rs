//! # In-Memory Ledger
//!
//! A deterministic single-node ledger implementing [`LedgerGateway`].
//!
//! Each submitted transaction closes its own ledger. Validation follows the
//! Stellar result codes:
//!
//! | Check | Code |
//! |-------|------|
//! | Source account missing | `tx_no_source_account` |
//! | No operations | `tx_missing_operation` |
//! | Sequence is not current + 1 | `tx_bad_seq` |
//! | No valid source signature | `tx_bad_auth` |
//! | Fee below base fee × operations | `tx_insufficient_fee` |
//! | Native balance below fee | `tx_insufficient_balance` |
//!
//! A transaction that passes these checks is included: its fee is charged
//! and its sequence consumed even if an operation then fails, in which case
//! the record is stored with `successful == false` and submission returns
//! `tx_failed` with per-operation codes.
//!
//! Test helpers replace an external funding service: [`InMemoryLedger::create_account`]
//! funds a new account from a root account, [`InMemoryLedger::fund`] pays the
//! tracked asset from its issuer. [`InMemoryLedger::set_offline`] and
//! [`InMemoryLedger::reset_streams`] inject transport faults.

use crate::config::{ClientConfig, DEFAULT_BASE_FEE};
use crate::domain::{GatewayError, KinError, RejectionCode, SubmitError, TransactionBuilder};
use crate::ports::{LedgerGateway, TransactionStream};
use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use kin_crypto::{sha256, KeyPair};
use kin_types::{
    AccountRecord, Address, Amount, Asset, AssetError, BalanceLine, Network, Operation, StreamCursor,
    TransactionEnvelope, TransactionId, TransactionRecord,
};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info};

/// Default network passphrase of the in-memory ledger.
pub const MEMORY_NETWORK_PASSPHRASE: &str = "Kin In-Memory Network";

/// Native balance given to accounts created by [`InMemoryLedger::create_account`].
pub const STARTING_BALANCE_UNITS: i64 = 20;

const ROOT_BALANCE_UNITS: i64 = 100_000_000_000;
const ISSUER_BALANCE_UNITS: i64 = 10_000;
const SIGNAL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
struct Trustline {
    asset: Asset,
    balance: Amount,
    limit: Amount,
}

#[derive(Debug, Clone)]
struct AccountEntry {
    sequence: i64,
    native: Amount,
    trustlines: Vec<Trustline>,
}

impl AccountEntry {
    fn new(sequence: i64, native: Amount) -> Self {
        Self {
            sequence,
            native,
            trustlines: Vec::new(),
        }
    }

    fn trustline_mut(&mut self, asset: &Asset) -> Option<&mut Trustline> {
        self.trustlines.iter_mut().find(|line| &line.asset == asset)
    }

    fn to_record(&self, address: Address) -> AccountRecord {
        let mut balances = vec![BalanceLine {
            asset: Asset::Native,
            amount: self.native,
        }];
        balances.extend(self.trustlines.iter().map(|line| BalanceLine {
            asset: line.asset.clone(),
            amount: line.balance,
        }));
        AccountRecord {
            address,
            sequence: self.sequence,
            balances,
        }
    }
}

#[derive(Debug, Clone)]
enum LedgerSignal {
    Included(Arc<TransactionRecord>),
    Reset,
}

#[derive(Debug, Default)]
struct LedgerState {
    accounts: HashMap<Address, AccountEntry>,
    history: Vec<Arc<TransactionRecord>>,
    by_id: HashMap<TransactionId, usize>,
    ledger_sequence: u32,
}

/// Simulated ledger for tests, demos and offline development.
pub struct InMemoryLedger {
    network: Network,
    asset: Asset,
    base_fee: u32,
    root: KeyPair,
    issuer: KeyPair,
    state: RwLock<LedgerState>,
    signals: broadcast::Sender<LedgerSignal>,
    offline: AtomicBool,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedger {
    /// Ledger with a `KIN` asset on [`MEMORY_NETWORK_PASSPHRASE`].
    pub fn new() -> Self {
        let network = Network::new(MEMORY_NETWORK_PASSPHRASE);
        let issuer = derive_key(&network, "issuer");
        let asset = Asset::Credit {
            code: "KIN".to_string(),
            issuer: Address::from(issuer.public_key()),
        };
        Self::build(network, issuer, asset)
    }

    /// Ledger on `network` whose tracked asset has `asset_code`.
    ///
    /// The root and issuer keys are derived from the passphrase, so two
    /// ledgers on the same network share them.
    pub fn with_network(network: Network, asset_code: &str) -> Result<Self, AssetError> {
        let issuer = derive_key(&network, "issuer");
        let asset = Asset::credit(asset_code, Address::from(issuer.public_key()))?;
        Ok(Self::build(network, issuer, asset))
    }

    fn build(network: Network, issuer: KeyPair, asset: Asset) -> Self {
        let root = derive_key(&network, "root");

        let mut state = LedgerState::default();
        state.accounts.insert(
            Address::from(root.public_key()),
            AccountEntry::new(0, units(ROOT_BALANCE_UNITS)),
        );
        state.accounts.insert(
            Address::from(issuer.public_key()),
            AccountEntry::new(0, units(ISSUER_BALANCE_UNITS)),
        );
        state.ledger_sequence = 1;

        let (signals, _) = broadcast::channel(SIGNAL_CAPACITY);
        Self {
            network,
            asset,
            base_fee: DEFAULT_BASE_FEE,
            root,
            issuer,
            state: RwLock::new(state),
            signals,
            offline: AtomicBool::new(false),
        }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// The tracked asset.
    pub fn asset(&self) -> &Asset {
        &self.asset
    }

    pub fn issuer_address(&self) -> Address {
        Address::from(self.issuer.public_key())
    }

    /// Client configuration matching this ledger's network and asset.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            horizon_url: "memory://".to_string(),
            network_passphrase: self.network.passphrase().to_string(),
            asset_code: match &self.asset {
                Asset::Credit { code, .. } => code.clone(),
                Asset::Native => String::new(),
            },
            asset_issuer: self.issuer_address().as_account_id(),
            base_fee: self.base_fee,
            ..ClientConfig::default()
        }
    }

    /// Number of included transactions, failed ones included.
    pub fn transaction_count(&self) -> usize {
        self.state.read().history.len()
    }

    /// Make every gateway call fail with a connection error.
    ///
    /// Going offline also terminates open streams.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
        if offline {
            self.reset_streams();
        }
        info!(offline, "In-memory ledger connectivity changed");
    }

    /// Streams currently subscribed to ledger changes.
    pub fn open_streams(&self) -> usize {
        self.signals.receiver_count()
    }

    /// Terminate every open stream with a connection error.
    pub fn reset_streams(&self) {
        let _ = self.signals.send(LedgerSignal::Reset);
    }

    /// Create `address` with [`STARTING_BALANCE_UNITS`] of native currency.
    pub fn create_account(&self, address: &Address) -> Result<TransactionId, KinError> {
        let operation = Operation::CreateAccount {
            destination: *address,
            starting_balance: units(STARTING_BALANCE_UNITS),
        };
        self.submit_from(&self.root, operation)
    }

    /// Pay `amount` of the tracked asset from the issuer to `address`.
    pub fn fund(&self, address: &Address, amount: Decimal) -> Result<TransactionId, KinError> {
        let operation = Operation::Payment {
            destination: *address,
            asset: self.asset.clone(),
            amount: Amount::from_decimal(amount)?,
        };
        self.submit_from(&self.issuer, operation)
    }

    fn submit_from(&self, keypair: &KeyPair, operation: Operation) -> Result<TransactionId, KinError> {
        let source = Address::from(keypair.public_key());
        let sequence = self
            .state
            .read()
            .accounts
            .get(&source)
            .map(|entry| entry.sequence)
            .unwrap_or_default();
        let envelope = TransactionBuilder::new(source, sequence, self.base_fee)
            .operation(operation)
            .build()?
            .sign(keypair, &self.network)?;
        self.apply(&envelope)
            .map(|record| record.id.clone())
            .map_err(KinError::from_rejection)
    }

    fn ensure_online(&self) -> Result<(), GatewayError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(GatewayError::Connection("ledger is offline".into()));
        }
        Ok(())
    }

    /// Validate and include an envelope.
    fn apply(&self, envelope: &TransactionEnvelope) -> Result<Arc<TransactionRecord>, RejectionCode> {
        let tx = &envelope.tx;
        let id = envelope
            .transaction_id(&self.network)
            .map_err(|_| RejectionCode::transaction("tx_malformed"))?;

        let mut state = self.state.write();
        let Some(source) = state.accounts.get(&tx.source) else {
            return Err(RejectionCode::transaction("tx_no_source_account"));
        };
        if tx.operations.is_empty() {
            return Err(RejectionCode::transaction("tx_missing_operation"));
        }
        if tx.sequence != source.sequence + 1 {
            return Err(RejectionCode::transaction("tx_bad_seq"));
        }
        if !envelope.is_signed_by(tx.source.public_key(), &self.network) {
            return Err(RejectionCode::transaction("tx_bad_auth"));
        }
        let min_fee = u64::from(self.base_fee) * tx.operations.len() as u64;
        if u64::from(tx.fee) < min_fee {
            return Err(RejectionCode::transaction("tx_insufficient_fee"));
        }
        let fee = Amount::from_stroops(i64::from(tx.fee))
            .map_err(|_| RejectionCode::transaction("tx_malformed"))?;
        let Some(remaining) = source.native.checked_sub(fee) else {
            return Err(RejectionCode::transaction("tx_insufficient_balance"));
        };

        let ledger = state.ledger_sequence + 1;
        state.ledger_sequence = ledger;
        if let Some(source) = state.accounts.get_mut(&tx.source) {
            source.sequence = tx.sequence;
            source.native = remaining;
        }

        let mut scratch = state.accounts.clone();
        let mut codes = Vec::with_capacity(tx.operations.len());
        let mut successful = true;
        for operation in &tx.operations {
            match apply_operation(&mut scratch, &tx.source, operation, ledger) {
                Ok(()) => codes.push("op_success".to_string()),
                Err(code) => {
                    codes.push(code.to_string());
                    successful = false;
                    break;
                }
            }
        }
        if successful {
            state.accounts = scratch;
        }

        let index = state.history.len();
        let record = Arc::new(TransactionRecord {
            id: id.clone(),
            ledger,
            paging_token: index.to_string(),
            created_at: Utc::now(),
            successful,
            envelope: envelope.clone(),
        });
        state.history.push(record.clone());
        state.by_id.insert(id, index);

        // Sent under the write lock so streams see records in history order.
        let _ = self.signals.send(LedgerSignal::Included(record.clone()));
        drop(state);

        debug!(
            tx_id = %record.id,
            ledger,
            successful,
            operations = tx.operations.len(),
            "Transaction included"
        );
        if successful {
            Ok(record)
        } else {
            Err(RejectionCode::operations(codes))
        }
    }
}

fn derive_key(network: &Network, role: &str) -> KeyPair {
    KeyPair::from_seed(sha256(format!("{}/{role}", network.passphrase()).as_bytes()))
}

fn units(whole: i64) -> Amount {
    Amount::from_stroops(whole.saturating_mul(kin_types::STROOPS_PER_UNIT)).unwrap_or(Amount::MAX)
}

fn apply_operation(
    accounts: &mut HashMap<Address, AccountEntry>,
    source: &Address,
    operation: &Operation,
    ledger: u32,
) -> Result<(), &'static str> {
    match operation {
        Operation::CreateAccount {
            destination,
            starting_balance,
        } => {
            if starting_balance.is_zero() {
                return Err("op_malformed");
            }
            if accounts.contains_key(destination) {
                return Err("op_already_exists");
            }
            let payer = accounts.get_mut(source).ok_or("op_no_source")?;
            payer.native = payer
                .native
                .checked_sub(*starting_balance)
                .ok_or("op_underfunded")?;
            accounts.insert(
                *destination,
                AccountEntry::new(i64::from(ledger) << 32, *starting_balance),
            );
            Ok(())
        }

        Operation::Payment {
            destination,
            asset,
            amount,
        } => {
            if amount.is_zero() {
                return Err("op_malformed");
            }
            if !accounts.contains_key(destination) {
                return Err("op_no_destination");
            }
            match asset {
                Asset::Native => {
                    let payer = accounts.get_mut(source).ok_or("op_no_source")?;
                    payer.native = payer.native.checked_sub(*amount).ok_or("op_underfunded")?;
                    let payee = accounts.get_mut(destination).ok_or("op_no_destination")?;
                    payee.native = payee.native.checked_add(*amount).ok_or("op_line_full")?;
                }
                Asset::Credit { issuer, .. } => {
                    if source != issuer {
                        let payer = accounts.get_mut(source).ok_or("op_no_source")?;
                        let line = payer.trustline_mut(asset).ok_or("op_src_no_trust")?;
                        line.balance = line.balance.checked_sub(*amount).ok_or("op_underfunded")?;
                    }
                    if destination != issuer {
                        let payee = accounts.get_mut(destination).ok_or("op_no_destination")?;
                        let line = payee.trustline_mut(asset).ok_or("op_no_trust")?;
                        let credited = line
                            .balance
                            .checked_add(*amount)
                            .filter(|credited| *credited <= line.limit)
                            .ok_or("op_line_full")?;
                        line.balance = credited;
                    }
                }
            }
            Ok(())
        }

        Operation::ChangeTrust { asset, limit } => {
            let Asset::Credit { issuer, .. } = asset else {
                return Err("op_malformed");
            };
            if issuer == source {
                return Err("op_self_not_allowed");
            }
            if !accounts.contains_key(issuer) {
                return Err("op_no_issuer");
            }
            let account = accounts.get_mut(source).ok_or("op_no_source")?;
            match account.trustline_mut(asset) {
                Some(line) => {
                    if *limit < line.balance {
                        return Err("op_invalid_limit");
                    }
                    if limit.is_zero() {
                        account.trustlines.retain(|line| &line.asset != asset);
                    } else {
                        line.limit = *limit;
                    }
                }
                None => {
                    if limit.is_zero() {
                        return Err("op_invalid_limit");
                    }
                    account.trustlines.push(Trustline {
                        asset: asset.clone(),
                        balance: Amount::ZERO,
                        limit: *limit,
                    });
                }
            }
            Ok(())
        }
    }
}

#[async_trait]
impl LedgerGateway for InMemoryLedger {
    async fn fetch_account(
        &self,
        address: &Address,
    ) -> Result<Option<AccountRecord>, GatewayError> {
        self.ensure_online()?;
        Ok(self
            .state
            .read()
            .accounts
            .get(address)
            .map(|entry| entry.to_record(*address)))
    }

    async fn submit(&self, envelope: &TransactionEnvelope) -> Result<TransactionId, SubmitError> {
        self.ensure_online()?;
        self.apply(envelope)
            .map(|record| record.id.clone())
            .map_err(SubmitError::Rejected)
    }

    async fn fetch_transaction(
        &self,
        id: &TransactionId,
    ) -> Result<Option<TransactionRecord>, GatewayError> {
        self.ensure_online()?;
        let state = self.state.read();
        Ok(state
            .by_id
            .get(id)
            .and_then(|index| state.history.get(*index))
            .map(|record| record.as_ref().clone()))
    }

    async fn open_stream(
        &self,
        address: &Address,
        cursor: StreamCursor,
    ) -> Result<TransactionStream, GatewayError> {
        self.ensure_online()?;
        let address = *address;

        // Subscribe while holding the read lock: everything before is in the
        // backlog snapshot, everything after arrives on the receiver.
        let state = self.state.read();
        let receiver = self.signals.subscribe();
        let backlog: Vec<Arc<TransactionRecord>> = match &cursor {
            StreamCursor::Now => Vec::new(),
            StreamCursor::Since(since) => state
                .history
                .iter()
                .filter(|record| record.created_at >= *since && record.involves(&address))
                .cloned()
                .collect(),
            StreamCursor::After(token) => {
                let after: usize = token.parse().map_err(|_| GatewayError::Http {
                    status: 400,
                    body: format!("invalid cursor {token:?}"),
                })?;
                state
                    .history
                    .iter()
                    .skip(after.saturating_add(1))
                    .filter(|record| record.involves(&address))
                    .cloned()
                    .collect()
            }
        };
        drop(state);

        debug!(address = %address, cursor = %cursor, backlog = backlog.len(), "Stream opened");

        let live = BroadcastStream::new(receiver).filter_map(move |signal| {
            let item = match signal {
                Ok(LedgerSignal::Included(record)) if record.involves(&address) => Some(Ok(record)),
                Ok(LedgerSignal::Included(_)) => None,
                Ok(LedgerSignal::Reset) => {
                    Some(Err(GatewayError::Connection("stream reset by ledger".into())))
                }
                Err(BroadcastStreamRecvError::Lagged(skipped)) => Some(Err(
                    GatewayError::Connection(format!("stream lagged by {skipped} records")),
                )),
            };
            futures::future::ready(item)
        });

        Ok(stream::iter(backlog.into_iter().map(Ok))
            .chain(live)
            .map(|item| item.map(|record: Arc<TransactionRecord>| record.as_ref().clone()))
            .boxed())
    }
}
