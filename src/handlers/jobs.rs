//! Scheduled job payloads.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Trigger for a paged job. `time` defaults to the invocation time and
/// `cursor` to the start of the table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cursor: Option<String>,
}

impl JobRequest {
    pub fn time_or(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.time.unwrap_or(now)
    }
}
