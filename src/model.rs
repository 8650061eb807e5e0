//! Records shared by the recurrence, duty and alarm components.
//!
//! Field names follow the camelCase attribute names stored in DynamoDB, so
//! the same structs decode table rows, stream images and queue payloads.

use chrono::{DateTime, Duration, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize};

/// Legacy rows store `null` where newer writes omit the attribute.
fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeekDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<WeekDay> for Weekday {
    fn from(day: WeekDay) -> Self {
        match day {
            WeekDay::Monday => Weekday::Mon,
            WeekDay::Tuesday => Weekday::Tue,
            WeekDay::Wednesday => Weekday::Wed,
            WeekDay::Thursday => Weekday::Thu,
            WeekDay::Friday => Weekday::Fri,
            WeekDay::Saturday => Weekday::Sat,
            WeekDay::Sunday => Weekday::Sun,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonthName {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl MonthName {
    /// 1-based month number.
    pub fn number(self) -> u32 {
        self as u32 + 1
    }
}

/// "Nth weekday of the month". Negative ordinals count from the month's end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthWeek {
    pub ordinal: i8,
    pub week_day: WeekDay,
}

fn default_every() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repeat {
    pub frequency: Frequency,
    #[serde(default = "default_every")]
    pub every: u32,
    #[serde(
        rename = "weekDay",
        default,
        deserialize_with = "nullable_vec",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub week_days: Vec<WeekDay>,
    #[serde(
        rename = "monthDay",
        default,
        deserialize_with = "nullable_vec",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub month_days: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_week: Option<MonthWeek>,
    #[serde(
        rename = "month",
        default,
        deserialize_with = "nullable_vec",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub months: Vec<MonthName>,
}

impl Repeat {
    pub fn new(frequency: Frequency, every: u32) -> Self {
        Self {
            frequency,
            every,
            week_days: Vec::new(),
            month_days: Vec::new(),
            on_week: None,
            months: Vec::new(),
        }
    }

    pub fn weekly(every: u32, week_days: impl IntoIterator<Item = WeekDay>) -> Self {
        Self {
            week_days: week_days.into_iter().collect(),
            ..Self::new(Frequency::Weekly, every)
        }
    }

    /// Checks that the fields present fit the frequency.
    pub fn validate(&self) -> crate::Result<()> {
        use crate::Error::Validation;

        if self.every == 0 {
            return Err(Validation("every must be at least 1".into()));
        }
        if let Some(day) = self.month_days.iter().find(|d| !(1..=31).contains(*d)) {
            return Err(Validation(format!("day of month {day} out of range")));
        }
        if let Some(on_week) = self.on_week {
            if on_week.ordinal == 0 || !(-5..=5).contains(&on_week.ordinal) {
                return Err(Validation(format!(
                    "week ordinal {} out of range",
                    on_week.ordinal
                )));
            }
        }

        let has_week_days = !self.week_days.is_empty();
        let has_month_days = !self.month_days.is_empty();
        let has_on_week = self.on_week.is_some();
        let has_months = !self.months.is_empty();

        match self.frequency {
            Frequency::Daily => {
                if has_week_days || has_month_days || has_on_week || has_months {
                    return Err(Validation("daily rules take no day or month sets".into()));
                }
            }
            Frequency::Weekly => {
                if !has_week_days {
                    return Err(Validation("weekly rule without week days".into()));
                }
                if has_month_days || has_on_week || has_months {
                    return Err(Validation("weekly rules take only week days".into()));
                }
            }
            Frequency::Monthly | Frequency::Yearly => {
                if has_week_days {
                    return Err(Validation(format!(
                        "{:?} rules take onWeek, not a week day set",
                        self.frequency
                    )));
                }
                if has_month_days == has_on_week {
                    return Err(Validation(
                        "exactly one of monthDay or onWeek is required".into(),
                    ));
                }
                if self.frequency == Frequency::Monthly && has_months {
                    return Err(Validation("monthly rules take no month set".into()));
                }
                if self.frequency == Frequency::Yearly && !has_months {
                    return Err(Validation("yearly rule without months".into()));
                }
            }
        }
        Ok(())
    }
}

/// A half-open `[start, end)` span of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub id: String,
    #[serde(rename = "jobID")]
    pub job_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<Repeat>,
    #[serde(rename = "workplaceID")]
    pub workplace_id: String,
    #[serde(rename = "profileID")]
    pub profile_id: String,
    #[serde(rename = "parentID", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub exceptions: Vec<NaiveDate>,
    /// Minutes before start at which alert alarms fire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_repeat: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iana_tz: Option<String>,
    /// Whether the stored `start` fell in daylight time when last written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_daylight: Option<bool>,
}

impl Shift {
    pub fn interval(&self) -> Interval {
        Interval::new(self.start, self.end)
    }

    /// The zone wall-clock times are interpreted in. Unknown or absent names fall back to UTC.
    pub fn timezone(&self) -> Tz {
        self.iana_tz
            .as_deref()
            .and_then(|name| name.parse::<Tz>().ok())
            .unwrap_or(Tz::UTC)
    }

    /// True when the shift repeats and its repetition has not ended by `now`.
    pub fn has_active_repeat(&self, now: DateTime<Utc>) -> bool {
        self.repeat.is_some() && self.end_repeat.map_or(true, |end| end > now)
    }

    pub fn is_excepted(&self, date: NaiveDate) -> bool {
        self.exceptions.contains(&date)
    }

    /// Splits one occurrence of a recurring shift into its own child shift.
    ///
    /// Returns the parent with `occurrence_date` excepted, and a
    /// non-repeating child spanning `start..end` that points back at it.
    pub fn fork_occurrence(
        &self,
        child_id: impl Into<String>,
        occurrence_date: NaiveDate,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> (Shift, Shift) {
        let mut parent = self.clone();
        if !parent.is_excepted(occurrence_date) {
            parent.exceptions.push(occurrence_date);
            parent.exceptions.sort();
        }

        let child = Shift {
            id: child_id.into(),
            start,
            end,
            repeat: None,
            parent_id: Some(self.id.clone()),
            exceptions: Vec::new(),
            end_repeat: None,
            ..self.clone()
        };
        (parent, child)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmType {
    StaffAlert,
    PatronAlert,
    PatronShiftStart,
    PatronShiftEnd,
}

impl AlarmType {
    pub const PATRON: [AlarmType; 3] = [
        AlarmType::PatronAlert,
        AlarmType::PatronShiftStart,
        AlarmType::PatronShiftEnd,
    ];

    pub fn is_patron(self) -> bool {
        self != AlarmType::StaffAlert
    }

    /// When this alarm fires for `occurrence`. Alert types need a non-zero alert offset.
    pub fn trigger_at(self, occurrence: &Interval, alert: Option<u32>) -> Option<DateTime<Utc>> {
        match self {
            AlarmType::StaffAlert | AlarmType::PatronAlert => alert
                .filter(|minutes| *minutes > 0)
                .map(|minutes| occurrence.start - Duration::minutes(i64::from(minutes))),
            AlarmType::PatronShiftStart => Some(occurrence.start),
            AlarmType::PatronShiftEnd => Some(occurrence.end),
        }
    }
}

/// Opaque reference to a registered delayed execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionHandle {
    pub execution_ref: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftAlarm {
    pub id: String,
    #[serde(rename = "shiftID")]
    pub shift_id: String,
    #[serde(rename = "type")]
    pub alarm_type: AlarmType,
    #[serde(rename = "recipientProfileID")]
    pub recipient_profile_id: String,
    #[serde(rename = "profileSubscriptionID", default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    pub execution: ExecutionHandle,
    /// The occurrence this alarm belongs to.
    pub occurrence_start: DateTime<Utc>,
    pub occurrence_end: DateTime<Utc>,
    pub alarm_date: DateTime<Utc>,
}

impl ShiftAlarm {
    pub fn occurrence(&self) -> Interval {
        Interval::new(self.occurrence_start, self.occurrence_end)
    }
}

/// Body delivered by the external timer when an alarm fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmMessage {
    pub alarm_date: DateTime<Utc>,
    #[serde(rename = "shiftAlarmID")]
    pub shift_alarm_id: String,
    #[serde(rename = "profileSubscriptionID", default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(rename = "type")]
    pub alarm_type: AlarmType,
    #[serde(rename = "recipientProfileID")]
    pub recipient_profile_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    #[serde(rename = "userID")]
    pub user_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub deleted: bool,
}

/// A patron following a staff profile's shifts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSubscription {
    pub id: String,
    #[serde(rename = "profileID")]
    pub profile_id: String,
    #[serde(rename = "subscriberProfileID")]
    pub subscriber_profile_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExploreProfile {
    pub id: String,
    #[serde(rename = "profileID")]
    pub profile_id: String,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub duty_ranges: Vec<Interval>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl ExploreProfile {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}
