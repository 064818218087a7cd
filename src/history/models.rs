use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A commit as listed by the backend. Identity is the hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Commit {
    pub hash: String,
    pub author: String,
    pub date: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl Commit {
    pub fn new(
        hash: impl Into<String>,
        author: impl Into<String>,
        date: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            hash: hash.into(),
            author: author.into(),
            date: date.into(),
            message: message.into(),
            branch: None,
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn short_hash(&self) -> &str {
        self.hash.get(..7).unwrap_or(&self.hash)
    }

    /// 消息的第一行
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// Best-effort timestamp; `None` when the backend's date string is not
    /// one of the formats git commonly emits.
    pub fn parsed_date(&self) -> Option<DateTime<FixedOffset>> {
        let date = self.date.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(date) {
            return Some(parsed);
        }
        if let Ok(parsed) = DateTime::parse_from_rfc2822(date) {
            return Some(parsed);
        }
        if let Ok(parsed) = DateTime::parse_from_str(date, "%Y-%m-%d %H:%M:%S %z") {
            return Some(parsed);
        }
        let utc = FixedOffset::east_opt(0)?;
        if let Ok(naive) = NaiveDateTime::parse_from_str(date, "%Y-%m-%d %H:%M:%S") {
            return naive.and_local_timezone(utc).single();
        }
        if let Ok(naive) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
            return naive.and_hms_opt(0, 0, 0)?.and_local_timezone(utc).single();
        }
        None
    }
}
