//! HTTP client for a toncenter-style transaction index.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tonmine_core::payment_match::CandidateTx;

/// How many transactions to request per lookup. The verification window is
/// short, so a small page is enough.
const DEFAULT_PAGE_SIZE: u32 = 32;

/// A transaction observed on chain, normalized for the verifier.
#[derive(Debug, Clone)]
pub struct ChainTransaction {
    /// Transaction hash as reported by the indexer.
    pub hash: String,
    /// Value moved into the destination account, in nanotons.
    pub value_nano: i64,
    /// Unix timestamp of the transaction.
    pub utime: i64,
    /// Sender address, if the indexer reports one.
    pub source: Option<String>,
    /// Receiving address.
    pub destination: String,
}

impl From<&ChainTransaction> for CandidateTx {
    fn from(tx: &ChainTransaction) -> Self {
        CandidateTx {
            hash: tx.hash.clone(),
            value_nano: tx.value_nano,
            utime: tx.utime,
        }
    }
}

/// Errors from the indexer client.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The indexer returned a non-2xx status code.
    #[error("Indexer returned HTTP {0}")]
    HttpStatus(u16),

    /// The indexer answered but the payload was not usable.
    #[error("Malformed indexer response: {0}")]
    Malformed(String),
}

/// Read-only source of recent transactions to an address.
///
/// The production implementation is [`TonIndexClient`]; tests substitute an
/// in-memory fake.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// List recent transactions into `address`, newest first.
    async fn recent_transactions(&self, address: &str)
        -> Result<Vec<ChainTransaction>, ChainError>;
}

// ---------------------------------------------------------------------------
// Toncenter wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GetTransactionsResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<RawTransaction>,
}

#[derive(Debug, Deserialize)]
struct RawTransaction {
    transaction_id: RawTransactionId,
    utime: i64,
    in_msg: Option<RawMessage>,
}

#[derive(Debug, Deserialize)]
struct RawTransactionId {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    /// Nanoton value as a decimal string.
    value: String,
    #[serde(default)]
    source: Option<String>,
    destination: String,
}

impl RawTransaction {
    /// Keep only transactions with an inbound value transfer.
    fn normalize(self) -> Option<ChainTransaction> {
        let msg = self.in_msg?;
        let value_nano: i64 = msg.value.parse().ok()?;
        if value_nano <= 0 {
            return None;
        }
        Some(ChainTransaction {
            hash: self.transaction_id.hash,
            value_nano,
            utime: self.utime,
            source: msg.source.filter(|s| !s.is_empty()),
            destination: msg.destination,
        })
    }
}

// ---------------------------------------------------------------------------
// TonIndexClient
// ---------------------------------------------------------------------------

/// reqwest-backed [`TransactionSource`] for a toncenter-style API.
pub struct TonIndexClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl TonIndexClient {
    /// Create a client with a bounded per-request timeout.
    ///
    /// * `base_url` - API base, e.g. `https://toncenter.com`.
    /// * `api_key`  - optional key sent as the `X-API-Key` header.
    pub fn new(base_url: String, api_key: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            client,
            base_url,
            api_key,
        }
    }
}

#[async_trait]
impl TransactionSource for TonIndexClient {
    async fn recent_transactions(
        &self,
        address: &str,
    ) -> Result<Vec<ChainTransaction>, ChainError> {
        let url = format!("{}/api/v2/getTransactions", self.base_url);

        let mut request = self.client.get(&url).query(&[
            ("address", address),
            ("limit", &DEFAULT_PAGE_SIZE.to_string()),
            ("archival", "false"),
        ]);
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ChainError::HttpStatus(response.status().as_u16()));
        }

        let body: GetTransactionsResponse = response.json().await?;
        if !body.ok {
            return Err(ChainError::Malformed("indexer reported ok=false".into()));
        }

        let transactions: Vec<ChainTransaction> = body
            .result
            .into_iter()
            .filter_map(RawTransaction::normalize)
            .collect();

        tracing::debug!(
            address,
            count = transactions.len(),
            "Fetched recent transactions from indexer"
        );

        Ok(transactions)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Trimmed toncenter `getTransactions` payload.
    const FIXTURE: &str = r#"{
        "ok": true,
        "result": [
            {
                "transaction_id": { "hash": "b64hash-1=" },
                "utime": 1717243800,
                "in_msg": {
                    "value": "3000000000",
                    "source": "EQAsourceaddr",
                    "destination": "EQAdestaddr"
                }
            },
            {
                "transaction_id": { "hash": "b64hash-2=" },
                "utime": 1717243900,
                "in_msg": {
                    "value": "0",
                    "source": "",
                    "destination": "EQAdestaddr"
                }
            },
            {
                "transaction_id": { "hash": "b64hash-3=" },
                "utime": 1717244000,
                "in_msg": null
            }
        ]
    }"#;

    #[test]
    fn normalizes_toncenter_payload() {
        let parsed: GetTransactionsResponse = serde_json::from_str(FIXTURE).unwrap();
        assert!(parsed.ok);

        let txs: Vec<ChainTransaction> = parsed
            .result
            .into_iter()
            .filter_map(RawTransaction::normalize)
            .collect();

        // Zero-value and outbound-only entries are dropped.
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].hash, "b64hash-1=");
        assert_eq!(txs[0].value_nano, 3_000_000_000);
        assert_eq!(txs[0].utime, 1_717_243_800);
        assert_eq!(txs[0].source.as_deref(), Some("EQAsourceaddr"));
        assert_eq!(txs[0].destination, "EQAdestaddr");
    }

    #[test]
    fn missing_result_defaults_to_empty() {
        let parsed: GetTransactionsResponse = serde_json::from_str(r#"{"ok": true}"#).unwrap();
        assert!(parsed.result.is_empty());
    }

    #[test]
    fn unparsable_value_is_dropped() {
        let raw = RawTransaction {
            transaction_id: RawTransactionId {
                hash: "h".into(),
            },
            utime: 1,
            in_msg: Some(RawMessage {
                value: "not-a-number".into(),
                source: None,
                destination: "EQAdest".into(),
            }),
        };
        assert!(raw.normalize().is_none());
    }

    #[test]
    fn candidate_conversion_keeps_match_fields() {
        let tx = ChainTransaction {
            hash: "h".into(),
            value_nano: 42,
            utime: 7,
            source: None,
            destination: "EQAdest".into(),
        };
        let candidate = CandidateTx::from(&tx);
        assert_eq!(candidate.hash, "h");
        assert_eq!(candidate.value_nano, 42);
        assert_eq!(candidate.utime, 7);
    }
}
