//! Horizon-style HTTP gateway.
//!
//! Endpoints:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | fetch_account | `GET /accounts/{id}` (404 → `None`) |
//! | submit | `POST /transactions`, form field `tx` |
//! | fetch_transaction | `GET /transactions/{id}` (404 → `None`) |
//! | open_stream | `GET /accounts/{id}/transactions?cursor=…` as `text/event-stream` |
//!
//! A [`StreamCursor::Since`] start is resolved by first reading the newest
//! page of the account's transactions (`order=desc`): records that closed
//! at or after the instant are yielded first, then the event stream resumes
//! after the newest paging token. Close times have whole-second precision,
//! so a transaction closing in the same second just before the instant is
//! included as well.
//!
//! ## Wire format
//!
//! The endpoints and JSON shapes follow Horizon, but the envelope payload is
//! this client's own: the `tx` form field and the `envelope_xdr` field carry
//! the base64 bincode form of [`TransactionEnvelope::to_base64`], not Stellar
//! XDR, and transaction ids are the SHA-256 of that encoding. The gateway
//! therefore talks to ledgers speaking the same format; a stock Horizon
//! rejects these envelopes.

use crate::domain::{GatewayError, RejectionCode, SubmitError};
use crate::ports::{LedgerGateway, TransactionStream};
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use eventsource_stream::{EventStreamError, Eventsource};
use futures::future;
use futures::stream::{self, StreamExt};
use kin_telemetry::metrics::GATEWAY_ERRORS;
use kin_types::{
    AccountRecord, Address, Amount, Asset, BalanceLine, StreamCursor, TransactionEnvelope,
    TransactionId, TransactionRecord,
};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Records read when resolving a [`StreamCursor::Since`] start.
const CATCH_UP_LIMIT: usize = 200;

/// HTTP client for a Horizon-style ledger API.
#[derive(Debug, Clone)]
pub struct HorizonGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HorizonGateway {
    pub fn new(base_url: impl Into<String>, connect_timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(transport_error)?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// GET returning `None` on 404.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, GatewayError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Http {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout(err.to_string())
    } else if err.is_decode() {
        GatewayError::Decode(err.to_string())
    } else {
        GatewayError::Connection(err.to_string())
    }
}

fn count_failure(operation: &'static str) {
    kin_telemetry::metric_inc!(GATEWAY_ERRORS, &[operation]);
}

impl HorizonGateway {
    async fn load_account(&self, address: &Address) -> Result<Option<AccountRecord>, GatewayError> {
        let dto: Option<AccountDto> = self.get_json(&format!("accounts/{address}")).await?;
        dto.map(AccountDto::into_record).transpose()
    }

    async fn post_envelope(
        &self,
        envelope: &TransactionEnvelope,
    ) -> Result<TransactionId, SubmitError> {
        let encoded = envelope
            .to_base64()
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        let response = self
            .client
            .post(self.url("transactions"))
            .form(&[("tx", encoded)])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if status.is_success() {
            let accepted: SubmitResponseDto =
                serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()))?;
            let id = TransactionId::from_hex(&accepted.hash)
                .map_err(|e| GatewayError::Decode(e.to_string()))?;
            return Ok(id);
        }
        if status == StatusCode::BAD_REQUEST {
            if let Some(code) = parse_rejection(&body) {
                debug!(code = %code, "Transaction rejected by ledger");
                return Err(SubmitError::Rejected(code));
            }
        }
        Err(SubmitError::Transport(GatewayError::Http {
            status: status.as_u16(),
            body,
        }))
    }

    async fn load_transaction(
        &self,
        id: &TransactionId,
    ) -> Result<Option<TransactionRecord>, GatewayError> {
        let dto: Option<TransactionDto> = self.get_json(&format!("transactions/{id}")).await?;
        dto.map(TransactionDto::into_record).transpose()
    }

    async fn connect_stream(
        &self,
        address: &Address,
        cursor: &StreamCursor,
    ) -> Result<TransactionStream, GatewayError> {
        let (backlog, token) = match cursor {
            StreamCursor::Since(since) => self.catch_up(address, *since).await?,
            other => (Vec::new(), other.as_query_value().unwrap_or("now").to_string()),
        };

        let response = self
            .client
            .get(self.url(&format!("accounts/{address}/transactions")))
            .query(&[("cursor", token.as_str())])
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Http {
                status: status.as_u16(),
                body,
            });
        }

        debug!(address = %address, cursor = %token, backlog = backlog.len(), "Event stream opened");
        let live = response
            .bytes_stream()
            .eventsource()
            .filter_map(|item| {
                future::ready(match item {
                    Ok(event) => decode_event(&event.id, &event.data).map(Ok),
                    Err(err) => Some(Err(stream_error(err))),
                })
            });
        let closed = stream::once(future::ready(Err(GatewayError::Connection(
            "event stream closed by server".into(),
        ))));

        Ok(stream::iter(backlog.into_iter().map(Ok))
            .chain(live)
            .chain(closed)
            .boxed())
    }

    /// Transactions closed since `since`, oldest first, and the token to stream after.
    async fn catch_up(
        &self,
        address: &Address,
        since: DateTime<Utc>,
    ) -> Result<(Vec<TransactionRecord>, String), GatewayError> {
        let path = format!("accounts/{address}/transactions?order=desc&limit={CATCH_UP_LIMIT}");
        let page: Option<PageDto<TransactionDto>> = self.get_json(&path).await?;
        let records = page.map(|page| page.embedded.records).unwrap_or_default();
        catch_up_from(records, since)
    }
}

#[async_trait]
impl LedgerGateway for HorizonGateway {
    async fn fetch_account(
        &self,
        address: &Address,
    ) -> Result<Option<AccountRecord>, GatewayError> {
        let result = self.load_account(address).await;
        if result.is_err() {
            count_failure("fetch_account");
        }
        result
    }

    async fn submit(&self, envelope: &TransactionEnvelope) -> Result<TransactionId, SubmitError> {
        let result = self.post_envelope(envelope).await;
        if matches!(result, Err(SubmitError::Transport(_))) {
            count_failure("submit");
        }
        result
    }

    async fn fetch_transaction(
        &self,
        id: &TransactionId,
    ) -> Result<Option<TransactionRecord>, GatewayError> {
        let result = self.load_transaction(id).await;
        if result.is_err() {
            count_failure("fetch_transaction");
        }
        result
    }

    async fn open_stream(
        &self,
        address: &Address,
        cursor: StreamCursor,
    ) -> Result<TransactionStream, GatewayError> {
        let result = self.connect_stream(address, &cursor).await;
        if result.is_err() {
            count_failure("stream");
        }
        result
    }
}

fn stream_error(err: EventStreamError<reqwest::Error>) -> GatewayError {
    match err {
        EventStreamError::Transport(err) => transport_error(err),
        other => GatewayError::Decode(other.to_string()),
    }
}

/// Transaction carried by an SSE event; keepalives and undecodable payloads yield `None`.
fn decode_event(id: &str, data: &str) -> Option<TransactionRecord> {
    // "hello" / "byebye" keepalives are bare JSON strings
    if serde_json::from_str::<String>(data).is_ok() {
        return None;
    }
    let decoded = serde_json::from_str::<TransactionDto>(data)
        .map_err(|e| GatewayError::Decode(e.to_string()))
        .and_then(TransactionDto::into_record);
    match decoded {
        Ok(record) => Some(record),
        Err(err) => {
            warn!(id, error = %err, "Skipping undecodable stream event");
            None
        }
    }
}

/// Split a newest-first page into the records closed since `since`
/// (oldest first) and the paging token to stream after.
fn catch_up_from(
    records: Vec<TransactionDto>,
    since: DateTime<Utc>,
) -> Result<(Vec<TransactionRecord>, String), GatewayError> {
    let Some(token) = records.first().map(|newest| newest.paging_token.clone()) else {
        return Ok((Vec::new(), "now".to_string()));
    };
    let floor = since.trunc_subsecs(0);
    let mut backlog = records
        .into_iter()
        .take_while(|dto| dto.created_at >= floor)
        .map(TransactionDto::into_record)
        .collect::<Result<Vec<_>, _>>()?;
    backlog.reverse();
    Ok((backlog, token))
}

fn parse_rejection(body: &str) -> Option<RejectionCode> {
    let problem: ProblemDto = serde_json::from_str(body).ok()?;
    let codes = problem.extras?.result_codes?;
    Some(RejectionCode {
        transaction: codes.transaction,
        operations: codes.operations,
    })
}

// ============================================================================
// Wire DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
struct AccountDto {
    account_id: String,
    sequence: String,
    #[serde(default)]
    balances: Vec<BalanceDto>,
}

#[derive(Debug, Deserialize)]
struct BalanceDto {
    balance: String,
    asset_type: String,
    #[serde(default)]
    asset_code: Option<String>,
    #[serde(default)]
    asset_issuer: Option<String>,
}

impl AccountDto {
    fn into_record(self) -> Result<AccountRecord, GatewayError> {
        let address: Address = self
            .account_id
            .parse()
            .map_err(|e: kin_types::AddressError| GatewayError::Decode(e.to_string()))?;
        let sequence = self
            .sequence
            .parse()
            .map_err(|_| GatewayError::Decode(format!("bad sequence {:?}", self.sequence)))?;
        let balances = self
            .balances
            .into_iter()
            .map(BalanceDto::into_line)
            .collect::<Result<_, _>>()?;
        Ok(AccountRecord {
            address,
            sequence,
            balances,
        })
    }
}

impl BalanceDto {
    fn into_line(self) -> Result<BalanceLine, GatewayError> {
        let amount: Amount = self
            .balance
            .parse()
            .map_err(|e: kin_types::AmountError| GatewayError::Decode(e.to_string()))?;
        let asset = match (self.asset_type.as_str(), self.asset_code, self.asset_issuer) {
            ("native", _, _) => Asset::Native,
            (_, Some(code), Some(issuer)) => {
                let issuer: Address = issuer
                    .parse()
                    .map_err(|e: kin_types::AddressError| GatewayError::Decode(e.to_string()))?;
                Asset::credit(code, issuer).map_err(|e| GatewayError::Decode(e.to_string()))?
            }
            (other, _, _) => {
                return Err(GatewayError::Decode(format!(
                    "balance of type {other} without code and issuer"
                )))
            }
        };
        Ok(BalanceLine { asset, amount })
    }
}

fn default_successful() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct TransactionDto {
    hash: String,
    ledger: u32,
    paging_token: String,
    created_at: DateTime<Utc>,
    #[serde(default = "default_successful")]
    successful: bool,
    envelope_xdr: String,
}

impl TransactionDto {
    fn into_record(self) -> Result<TransactionRecord, GatewayError> {
        let id =
            TransactionId::from_hex(&self.hash).map_err(|e| GatewayError::Decode(e.to_string()))?;
        let envelope = TransactionEnvelope::from_base64(&self.envelope_xdr)
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        Ok(TransactionRecord {
            id,
            ledger: self.ledger,
            paging_token: self.paging_token,
            created_at: self.created_at,
            successful: self.successful,
            envelope,
        })
    }
}

#[derive(Debug, Deserialize)]
struct PageDto<T> {
    #[serde(rename = "_embedded")]
    embedded: EmbeddedDto<T>,
}

#[derive(Debug, Deserialize)]
struct EmbeddedDto<T> {
    records: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct SubmitResponseDto {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct ProblemDto {
    #[serde(default)]
    extras: Option<ProblemExtras>,
}

#[derive(Debug, Deserialize)]
struct ProblemExtras {
    #[serde(default)]
    result_codes: Option<ResultCodes>,
}

#[derive(Debug, Deserialize)]
struct ResultCodes {
    transaction: String,
    #[serde(default)]
    operations: Vec<String>,
}
