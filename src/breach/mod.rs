//! Range-query exposure lookup.
//!
//! A secret is hashed with SHA-1; only the first five hex characters leave the
//! machine. The remote service answers with every known `SUFFIX:COUNT` pair in
//! that range and the match (if any) is resolved locally.

use std::io::BufRead;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

pub const DEFAULT_ENDPOINT: &str = "https://api.pwnedpasswords.com/range/";
pub const PREFIX_LEN: usize = 5;

/// Failures of a lookup or an audit. Always surfaced to the caller.
#[derive(Debug, thiserror::Error)]
pub enum BreachError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("range request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The range service answered with a non-success status code.
    #[error("range service answered with status {0}")]
    Status(u16),

    /// A non-blank response line that is not `SUFFIX:COUNT`.
    #[error("malformed range response line {line}: {content:?}")]
    Malformed { line: usize, content: String },

    /// Reading the credentials input failed.
    #[error("unable to read credentials: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BreachConfig {
    pub endpoint: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for BreachConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(10),
            user_agent: format!("railfence-cli/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// SHA-1 digest of a secret split into the part that is sent and the part
/// that is matched locally. Both halves are uppercase hex.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangeQuery {
    pub prefix: String,
    pub suffix: String,
}

impl RangeQuery {
    pub fn for_secret(secret: &str) -> Self {
        let digest = hex::encode_upper(Sha1::digest(secret.as_bytes()));
        let (prefix, suffix) = digest.split_at(PREFIX_LEN);
        Self {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        }
    }
}

/// Anything able to answer a range query with the raw `SUFFIX:COUNT` body.
pub trait RangeSource {
    fn fetch_range(&self, prefix: &str) -> Result<String, BreachError>;
}

/// Blocking HTTP implementation of [`RangeSource`].
pub struct HttpRangeSource {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpRangeSource {
    pub fn new(config: &BreachConfig) -> Result<Self, BreachError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            endpoint: config.endpoint.clone(),
            client,
        })
    }
}

impl RangeSource for HttpRangeSource {
    fn fetch_range(&self, prefix: &str) -> Result<String, BreachError> {
        let url = format!("{}{}", self.endpoint, prefix);
        tracing::debug!(%url, "querying range");
        let response = self.client.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(BreachError::Status(status.as_u16()));
        }
        Ok(response.text()?)
    }
}

/// Look `suffix` up in a range body. Absent suffix means zero exposures.
pub fn parse_range_body(body: &str, suffix: &str) -> Result<u64, BreachError> {
    for (idx, raw) in body.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let malformed = || BreachError::Malformed {
            line: idx + 1,
            content: line.to_string(),
        };
        let (candidate, count) = line.split_once(':').ok_or_else(malformed)?;
        let count: u64 = count.trim().parse().map_err(|_| malformed())?;
        if candidate.trim().eq_ignore_ascii_case(suffix) {
            return Ok(count);
        }
    }
    Ok(0)
}

/// Resolves exposure counts through any [`RangeSource`].
pub struct BreachChecker<S> {
    source: S,
}

impl<S: RangeSource> BreachChecker<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Number of times `secret` appears in the breach corpus.
    pub fn check(&self, secret: &str) -> Result<u64, BreachError> {
        let query = RangeQuery::for_secret(secret);
        let body = self.source.fetch_range(&query.prefix)?;
        let count = parse_range_body(&body, &query.suffix)?;
        tracing::debug!(prefix = %query.prefix, count, "range lookup complete");
        Ok(count)
    }

    /// Check every `username,password` line of `reader`.
    ///
    /// Blank lines are skipped, lines without a comma are skipped with a
    /// warning. The first failed lookup aborts the audit.
    pub fn audit<R: BufRead>(&self, reader: R) -> Result<Vec<AuditEntry>, BreachError> {
        let mut entries = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((username, password)) = line.split_once(',') else {
                tracing::warn!(line = idx + 1, "skipping malformed credential line");
                continue;
            };
            let count = self.check(password)?;
            entries.push(AuditEntry::new(username.to_string(), count));
        }
        Ok(entries)
    }
}

/// Outcome of a single credential check.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    /// Not present in the breach corpus.
    Ok,
    /// Seen at least once.
    Exposed,
}

/// One audited `username,password` line. The password itself is not kept.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditEntry {
    pub username: String,
    pub count: u64,
    pub status: AuditStatus,
}

impl AuditEntry {
    pub fn new(username: String, count: u64) -> Self {
        let status = if count > 0 {
            AuditStatus::Exposed
        } else {
            AuditStatus::Ok
        };
        Self {
            username,
            count,
            status,
        }
    }

    pub fn summary(&self) -> String {
        match self.status {
            AuditStatus::Ok => format!(
                "[OK] {}: Password NOT found in any known breach.",
                self.username
            ),
            AuditStatus::Exposed => format!(
                "[WARNING] {}: Password found {} times in breaches!",
                self.username, self.count
            ),
        }
    }
}
