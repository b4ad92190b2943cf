//! # EVM JSON-RPC Ledger
//!
//! Records batch fingerprints in the batch registry contract on an
//! EVM-compatible chain (Polygon Amoy by default).
//!
//! ## How It Works
//!
//! 1. `register` sends `registerBatch(string,bytes32)` via
//!    `eth_sendTransaction`. The RPC endpoint signs with its managed `from`
//!    account; this client holds no private keys.
//! 2. It then polls `eth_getTransactionReceipt` at a fixed interval until
//!    the transaction is mined or the attempts run out. This waits
//!    for confirmation; a failed submission is never re-sent.
//! 3. `read_fingerprint` calls `getBatchHash(string)` via `eth_call`
//!    against the latest block.

use std::time::Duration;

use async_trait::async_trait;
use harvest_core::{BatchId, Fingerprint, LedgerAddress, Timestamp};
use serde_json::{json, Value};

use crate::abi;
use crate::{AnchorReceipt, AnchoredFingerprint, LedgerClient, LedgerError};

/// Configuration for [`EvmLedger`].
#[derive(Debug, Clone)]
pub struct EvmLedgerConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,
    /// Batch registry contract.
    pub contract_address: LedgerAddress,
    /// Account whose transactions the RPC endpoint signs.
    pub from_address: LedgerAddress,
    /// Human-readable network name, e.g. `polygon-amoy`.
    pub network: String,
    /// Per-request timeout in seconds (default: 30).
    pub timeout_secs: u64,
    /// Delay between receipt checks (default: 2s).
    pub receipt_poll_interval: Duration,
    /// Receipt checks before giving up (default: 60).
    pub receipt_poll_attempts: u32,
}

impl EvmLedgerConfig {
    pub fn new(
        rpc_url: impl Into<String>,
        contract_address: LedgerAddress,
        from_address: LedgerAddress,
        network: impl Into<String>,
    ) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            contract_address,
            from_address,
            network: network.into(),
            timeout_secs: 30,
            receipt_poll_interval: Duration::from_secs(2),
            receipt_poll_attempts: 60,
        }
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set how confirmation is awaited.
    pub fn with_receipt_polling(mut self, interval: Duration, attempts: u32) -> Self {
        self.receipt_poll_interval = interval;
        self.receipt_poll_attempts = attempts.max(1);
        self
    }
}

/// Ledger client for the batch registry contract.
#[derive(Debug)]
pub struct EvmLedger {
    client: reqwest::Client,
    config: EvmLedgerConfig,
}

impl EvmLedger {
    pub fn new(config: EvmLedgerConfig) -> Result<Self, LedgerError> {
        if config.rpc_url.trim().is_empty() {
            return Err(LedgerError::Configuration("RPC URL is empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LedgerError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &EvmLedgerConfig {
        &self.config
    }

    fn unavailable(&self, reason: impl Into<String>) -> LedgerError {
        LedgerError::Unavailable {
            network: self.config.network.clone(),
            reason: reason.into(),
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> LedgerError {
        LedgerError::InvalidResponse {
            network: self.config.network.clone(),
            reason: reason.into(),
        }
    }

    /// Send a JSON-RPC request and return the `result` field.
    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let resp = self
            .client
            .post(&self.config.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    self.unavailable(format!("{method}: request timed out"))
                } else {
                    self.unavailable(format!("{method}: {e}"))
                }
            })?;

        if !resp.status().is_success() {
            return Err(self.unavailable(format!("{method}: HTTP {}", resp.status())));
        }

        let mut json: Value = resp
            .json()
            .await
            .map_err(|e| self.invalid(format!("{method}: invalid JSON response: {e}")))?;

        if let Some(error) = json.get("error") {
            let msg = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown RPC error");
            return Err(LedgerError::TransactionFailed {
                network: self.config.network.clone(),
                reason: format!("{method}: {msg}"),
            });
        }

        match json.get_mut("result") {
            Some(result) => Ok(result.take()),
            None => Err(self.invalid(format!("{method}: response missing 'result' field"))),
        }
    }

    async fn send_register_tx(&self, id: &BatchId, fingerprint: &Fingerprint) -> Result<String, LedgerError> {
        let tx = json!({
            "from": self.config.from_address.as_str(),
            "to": self.config.contract_address.as_str(),
            "data": abi::encode_register_batch(id.as_str(), fingerprint),
        });
        let result = self.rpc_call("eth_sendTransaction", json!([tx])).await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.invalid("eth_sendTransaction returned a non-string result"))
    }

    /// The registry contract reverts on a second registration of the same
    /// identifier. Turn that revert into [`LedgerError::AlreadyRegistered`]
    /// when the ledger confirms the identifier is taken.
    async fn explain_revert(&self, id: &BatchId, failed: LedgerError) -> LedgerError {
        match self.read_fingerprint(id).await {
            Ok(existing) if existing.is_anchored() => {
                tracing::debug!(batch_id = %id, "revert explained by an existing registration");
                LedgerError::AlreadyRegistered(id.clone())
            }
            _ => failed,
        }
    }

    /// Poll for the receipt of `tx_hash` until it is mined.
    async fn await_receipt(&self, tx_hash: &str) -> Result<Value, LedgerError> {
        for attempt in 1..=self.config.receipt_poll_attempts {
            let receipt = self
                .rpc_call("eth_getTransactionReceipt", json!([tx_hash]))
                .await?;
            if !receipt.is_null() {
                return Ok(receipt);
            }
            tracing::debug!(tx = tx_hash, attempt, "transaction not yet mined");
            if attempt < self.config.receipt_poll_attempts {
                tokio::time::sleep(self.config.receipt_poll_interval).await;
            }
        }
        Err(LedgerError::ConfirmationTimeout {
            network: self.config.network.clone(),
            transaction_ref: tx_hash.to_string(),
            attempts: self.config.receipt_poll_attempts,
        })
    }
}

#[async_trait]
impl LedgerClient for EvmLedger {
    async fn register(
        &self,
        id: &BatchId,
        fingerprint: &Fingerprint,
    ) -> Result<AnchorReceipt, LedgerError> {
        if fingerprint.is_zero() {
            return Err(LedgerError::Rejected(
                "the zero fingerprint cannot be registered".to_string(),
            ));
        }

        let tx_hash = match self.send_register_tx(id, fingerprint).await {
            Ok(tx_hash) => tx_hash,
            Err(e @ LedgerError::TransactionFailed { .. }) if e.to_string().contains("revert") => {
                return Err(self.explain_revert(id, e).await)
            }
            Err(e) => return Err(e),
        };
        tracing::info!(
            batch_id = %id,
            tx = %tx_hash,
            network = %self.config.network,
            "registration transaction sent"
        );

        let receipt = self.await_receipt(&tx_hash).await?;

        let status = receipt.get("status").and_then(Value::as_str).unwrap_or("0x0");
        if abi::parse_quantity(status) != Some(1) {
            let failed = LedgerError::TransactionFailed {
                network: self.config.network.clone(),
                reason: format!("transaction {tx_hash} reverted"),
            };
            return Err(self.explain_revert(id, failed).await);
        }

        let block_number = receipt
            .get("blockNumber")
            .and_then(Value::as_str)
            .and_then(abi::parse_quantity)
            .ok_or_else(|| self.invalid("receipt has no blockNumber"))?;

        let submitter_address = receipt
            .get("from")
            .and_then(Value::as_str)
            .and_then(|s| LedgerAddress::parse(s).ok())
            .or_else(|| Some(self.config.from_address.clone()));

        let transaction_ref = receipt
            .get("transactionHash")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or(tx_hash);

        Ok(AnchorReceipt {
            transaction_ref,
            block_number,
            confirmed_at: Timestamp::now(),
            submitter_address,
            network: self.config.network.clone(),
        })
    }

    async fn read_fingerprint(&self, id: &BatchId) -> Result<AnchoredFingerprint, LedgerError> {
        let call = json!({
            "to": self.config.contract_address.as_str(),
            "data": abi::encode_get_batch_hash(id.as_str()),
        });
        let result = self.rpc_call("eth_call", json!([call, "latest"])).await?;
        let data = result
            .as_str()
            .ok_or_else(|| self.invalid("eth_call returned a non-string result"))?;
        let decoded = abi::decode_get_batch_hash(data).map_err(|e| self.invalid(e.to_string()))?;

        if decoded.fingerprint.is_zero() {
            return Ok(AnchoredFingerprint::not_anchored());
        }

        let anchored_at = match decoded.timestamp {
            0 => None,
            secs => i64::try_from(secs)
                .ok()
                .and_then(|s| Timestamp::from_epoch_secs(s).ok()),
        };

        Ok(AnchoredFingerprint {
            fingerprint: decoded.fingerprint,
            anchored_at,
            submitter_address: decoded.registrar,
        })
    }

    fn network(&self) -> &str {
        &self.config.network
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(last: u8) -> LedgerAddress {
        LedgerAddress::parse(&format!("0x{}{:02x}", "0".repeat(38), last)).unwrap()
    }

    #[test]
    fn config_defaults() {
        let config = EvmLedgerConfig::new("https://rpc.example.com", addr(1), addr(2), "polygon-amoy");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.receipt_poll_attempts, 60);
        assert_eq!(config.receipt_poll_interval, Duration::from_secs(2));
    }

    #[test]
    fn polling_needs_at_least_one_attempt() {
        let config = EvmLedgerConfig::new("https://rpc.example.com", addr(1), addr(2), "n")
            .with_receipt_polling(Duration::from_millis(1), 0);
        assert_eq!(config.receipt_poll_attempts, 1);
    }

    #[test]
    fn rejects_empty_rpc_url() {
        let config = EvmLedgerConfig::new(" ", addr(1), addr(2), "n");
        assert!(matches!(EvmLedger::new(config), Err(LedgerError::Configuration(_))));
    }

    #[test]
    fn builds_with_valid_config() {
        let config = EvmLedgerConfig::new("https://rpc.example.com", addr(1), addr(2), "polygon-amoy");
        let ledger = EvmLedger::new(config).unwrap();
        assert_eq!(ledger.network(), "polygon-amoy");
        assert!(format!("{ledger:?}").contains("EvmLedger"));
    }
}
