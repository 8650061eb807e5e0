//! Notification port for fired alarms.

mod recording;
mod webhook;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{AlarmType, Interval, Shift};

pub use recording::RecordingNotifier;
pub use webhook::WebhookNotifier;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "recipientProfileID")]
    pub recipient_profile_id: String,
    #[serde(rename = "type")]
    pub alarm_type: AlarmType,
    #[serde(rename = "shiftID")]
    pub shift_id: String,
    #[serde(rename = "profileID")]
    pub profile_id: String,
    pub title: String,
    pub body: String,
    pub occurrence_start: DateTime<Utc>,
    pub occurrence_end: DateTime<Utc>,
}

impl Notification {
    pub fn for_alarm(
        alarm_type: AlarmType,
        recipient_profile_id: &str,
        shift: &Shift,
        occurrence: &Interval,
        staff_name: Option<&str>,
    ) -> Self {
        let who = staff_name.unwrap_or("Someone you follow");
        let (title, body) = match alarm_type {
            AlarmType::StaffAlert => (
                "Shift reminder".to_string(),
                format!(
                    "Your shift starts in {} minutes",
                    shift.alert.unwrap_or_default()
                ),
            ),
            AlarmType::PatronAlert => (
                "Upcoming shift".to_string(),
                format!(
                    "{who} starts a shift in {} minutes",
                    shift.alert.unwrap_or_default()
                ),
            ),
            AlarmType::PatronShiftStart => {
                ("On duty".to_string(), format!("{who} is now on duty"))
            }
            AlarmType::PatronShiftEnd => {
                ("Off duty".to_string(), format!("{who} has finished their shift"))
            }
        };
        Self {
            recipient_profile_id: recipient_profile_id.to_string(),
            alarm_type,
            shift_id: shift.id.clone(),
            profile_id: shift.profile_id.clone(),
            title,
            body,
            occurrence_start: occurrence.start,
            occurrence_end: occurrence.end,
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<()>;
}
