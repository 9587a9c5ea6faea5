//! HTTP implementation of the ledger store contract.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{LedgerError, LedgerStore};

/// Default request timeout for ledger calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Row-store ledger client.
///
/// Talks to an append-only table API:
/// `POST {base}/tables/{table}/rows` appends one row,
/// `GET {base}/tables/{table}/rows` returns every row. Authentication and
/// any server-side idempotency are the store's concern.
///
/// # Thread Safety
///
/// The client is safe to clone; clones share the underlying HTTP
/// connection pool.
#[derive(Clone)]
pub struct HttpLedger {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl fmt::Debug for HttpLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpLedger")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl HttpLedger {
    /// Creates a new client for the given base URL and access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty or whitespace-only, or if the
    /// HTTP client fails to build.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, LedgerError> {
        let token = token.into();
        if token.is_empty() {
            return Err(LedgerError::InvalidToken {
                reason: "token cannot be empty",
            });
        }
        if token.trim().is_empty() {
            return Err(LedgerError::InvalidToken {
                reason: "token cannot be whitespace-only",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(LedgerError::ClientBuild)?;

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    fn rows_url(&self, table: &str) -> String {
        format!("{}/tables/{table}/rows", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct AppendRequest<'a> {
    values: &'a [String],
}

#[derive(Debug, Deserialize)]
struct RowsResponse {
    rows: Vec<Vec<String>>,
}

impl LedgerStore for HttpLedger {
    async fn append_row(&self, table: &str, row: &[String]) -> Result<(), LedgerError> {
        let response = self
            .http
            .post(self.rows_url(table))
            .bearer_auth(&self.token)
            .json(&AppendRequest { values: row })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    async fn rows(&self, table: &str) -> Result<Vec<Vec<String>>, LedgerError> {
        let response = self
            .http
            .get(self.rows_url(table))
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(LedgerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: RowsResponse = serde_json::from_str(&body)
            .map_err(|err| LedgerError::InvalidResponse(err.to_string()))?;
        Ok(payload.rows)
    }
}
