use std::env;

use thiserror::Error;

use crate::model::AlarmType;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} has invalid value {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Load `.env` for local runs. Missing file is fine, Lambda injects the environment.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_required(key: &'static str) -> Result<String, ConfigError> {
    env_opt(key).ok_or(ConfigError::Missing(key))
}

fn env_positive(key: &'static str, default: u32) -> Result<u32, ConfigError> {
    match env_opt(key) {
        None => Ok(default),
        Some(raw) => match raw.parse::<u32>() {
            Ok(v) if v > 0 => Ok(v),
            _ => Err(ConfigError::Invalid {
                var: key,
                value: raw,
            }),
        },
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub tables: Tables,
    pub scheduler: SchedulerConfig,
    pub notify_endpoint: String,
    pub alarms: AlarmSettings,
    pub jobs: JobSettings,
    /// Overrides the DynamoDB endpoint, used against DynamoDB local.
    pub dynamodb_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Tables {
    pub shift: String,
    pub shift_alarm: String,
    pub profile: String,
    pub user: String,
    pub subscription: String,
    pub explore_profile: String,
}

/// Where fired schedules deliver their payload.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub target_arn: String,
    pub role_arn: String,
    pub dlq_arn: String,
    pub group: String,
}

/// How many occurrence cycles ahead of the fired anchor each alarm type re-arms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmSettings {
    pub staff_alert_step: u32,
    pub patron_alert_step: u32,
    pub shift_start_step: u32,
    pub shift_end_step: u32,
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            staff_alert_step: 2,
            patron_alert_step: 2,
            shift_start_step: 1,
            shift_end_step: 1,
        }
    }
}

impl AlarmSettings {
    pub fn step(&self, alarm_type: AlarmType) -> usize {
        let step = match alarm_type {
            AlarmType::StaffAlert => self.staff_alert_step,
            AlarmType::PatronAlert => self.patron_alert_step,
            AlarmType::PatronShiftStart => self.shift_start_step,
            AlarmType::PatronShiftEnd => self.shift_end_step,
        };
        step.max(1) as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSettings {
    pub duty_window_days: u32,
    pub scan_page_size: u32,
    pub max_pages_per_invocation: u32,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            duty_window_days: 7,
            scan_page_size: 100,
            max_pages_per_invocation: 10,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();

        let defaults = AlarmSettings::default();
        let job_defaults = JobSettings::default();

        Ok(Self {
            tables: Tables {
                shift: env_required("SHIFT_TABLE")?,
                shift_alarm: env_required("SHIFT_ALARM_TABLE")?,
                profile: env_required("PROFILE_TABLE")?,
                user: env_required("USER_TABLE")?,
                subscription: env_required("SUBSCRIPTION_TABLE")?,
                explore_profile: env_required("EXPLORE_PROFILE_TABLE")?,
            },
            scheduler: SchedulerConfig {
                target_arn: env_required("SCHEDULER_TARGET_ARN")?,
                role_arn: env_required("SCHEDULER_ROLE_ARN")?,
                dlq_arn: env_required("SCHEDULER_DLQ_ARN")?,
                group: env_opt("SCHEDULER_GROUP").unwrap_or_else(|| "default".to_string()),
            },
            notify_endpoint: env_required("NOTIFY_ENDPOINT")?,
            alarms: AlarmSettings {
                staff_alert_step: env_positive("STAFF_ALERT_STEP", defaults.staff_alert_step)?,
                patron_alert_step: env_positive("PATRON_ALERT_STEP", defaults.patron_alert_step)?,
                shift_start_step: env_positive("SHIFT_START_STEP", defaults.shift_start_step)?,
                shift_end_step: env_positive("SHIFT_END_STEP", defaults.shift_end_step)?,
            },
            jobs: JobSettings {
                duty_window_days: env_positive("DUTY_WINDOW_DAYS", job_defaults.duty_window_days)?,
                scan_page_size: env_positive("SCAN_PAGE_SIZE", job_defaults.scan_page_size)?,
                max_pages_per_invocation: env_positive(
                    "MAX_PAGES_PER_INVOCATION",
                    job_defaults.max_pages_per_invocation,
                )?,
            },
            dynamodb_endpoint: env_opt("DYNAMODB_ENDPOINT"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_types_step_two_cycles_by_default() {
        let settings = AlarmSettings::default();
        assert_eq!(settings.step(AlarmType::StaffAlert), 2);
        assert_eq!(settings.step(AlarmType::PatronAlert), 2);
        assert_eq!(settings.step(AlarmType::PatronShiftStart), 1);
        assert_eq!(settings.step(AlarmType::PatronShiftEnd), 1);
    }

    #[test]
    fn zero_step_is_treated_as_one() {
        let settings = AlarmSettings {
            shift_end_step: 0,
            ..AlarmSettings::default()
        };
        assert_eq!(settings.step(AlarmType::PatronShiftEnd), 1);
    }

    // Uses a variable name no other test touches; env is process global.
    #[test]
    fn rejects_non_numeric_setting() {
        env::set_var("SHIFT_ALARMS_TEST_PAGE", "lots");
        let err = env_positive("SHIFT_ALARMS_TEST_PAGE", 5).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                var: "SHIFT_ALARMS_TEST_PAGE",
                value: "lots".into()
            }
        );
        env::set_var("SHIFT_ALARMS_TEST_PAGE", "0");
        assert!(env_positive("SHIFT_ALARMS_TEST_PAGE", 5).is_err());
        env::remove_var("SHIFT_ALARMS_TEST_PAGE");
        assert_eq!(env_positive("SHIFT_ALARMS_TEST_PAGE", 5), Ok(5));
    }
}
