//! The store's transactional write surface (spec.md §4.B.1).
//!
//! Writes here are the only writes that trigger the store's subscription
//! events, which is why the public-endpoint discoverer (§4.G) and the
//! heartbeat/health writers all route through this client rather than the
//! CLI reader.

use serde::Deserialize;

use crate::error::TransportError;

/// One SQL statement's result from a transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionResult {
    pub rows_affected: u64,
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub rows: Option<Vec<Vec<serde_json::Value>>>,
}

#[derive(Debug, Deserialize)]
struct TransactionResponse {
    results: Vec<TransactionResult>,
}

/// Posts SQL statements to the store's `/v1/transactions` endpoint.
///
/// Does not retry: a single transport failure is surfaced to the caller
/// as a [`TransportError`] and the calling component decides whether to
/// abandon the operation for this tick.
#[derive(Debug, Clone)]
pub struct TransactionalWriter {
    client: reqwest::Client,
    base_url: String,
}

impl TransactionalWriter {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Executes a batch of SQL statements as a single transaction.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on connection failure or a non-2xx
    /// response.
    pub async fn execute(
        &self,
        statements: &[String],
    ) -> Result<Vec<TransactionResult>, TransportError> {
        let url = format!("{}/v1/transactions", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&statements)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body });
        }

        let parsed: TransactionResponse = response.json().await?;
        Ok(parsed.results)
    }

    /// Executes a single statement and returns its `rows_affected`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on connection failure or a non-2xx
    /// response.
    pub async fn execute_one(&self, statement: String) -> Result<u64, TransportError> {
        let results = self.execute(&[statement]).await?;
        Ok(results.first().map_or(0, |r| r.rows_affected))
    }
}
