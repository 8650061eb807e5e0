use async_trait::async_trait;
use aws_sdk_scheduler::types::{
    ActionAfterCompletion, DeadLetterConfig, FlexibleTimeWindow, FlexibleTimeWindowMode,
    RetryPolicy, Target,
};
use aws_sdk_scheduler::Client;
use chrono::{DateTime, Utc};

use super::DelayedExecution;
use crate::config::{Config, SchedulerConfig};
use crate::error::{Error, Result};
use crate::model::{AlarmMessage, ExecutionHandle};

/// One-shot EventBridge Scheduler schedules that post the alarm message to the alarm queue.
#[derive(Debug, Clone)]
pub struct EventBridgeTimer {
    client: Client,
    config: SchedulerConfig,
}

fn schedule_expression(at: DateTime<Utc>) -> String {
    format!("at({})", at.format("%Y-%m-%dT%H:%M:%S"))
}

/// Schedule names allow 64 characters of `[0-9a-zA-Z-_.]`.
fn schedule_name(message: &AlarmMessage) -> String {
    let name: String = format!("shift-alarm-{}", message.shift_alarm_id)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '-' })
        .collect();
    name.chars().take(64).collect()
}

impl EventBridgeTimer {
    pub fn new(client: Client, config: SchedulerConfig) -> Self {
        Self { client, config }
    }

    pub async fn from_config(config: &Config) -> Self {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&sdk_config), config.scheduler.clone())
    }
}

#[async_trait]
impl DelayedExecution for EventBridgeTimer {
    async fn schedule(&self, at: DateTime<Utc>, message: &AlarmMessage) -> Result<ExecutionHandle> {
        let name = schedule_name(message);
        let input = serde_json::to_string(message)?;

        let target = Target::builder()
            .arn(&self.config.target_arn)
            .role_arn(&self.config.role_arn)
            .input(input)
            .dead_letter_config(DeadLetterConfig::builder().arn(&self.config.dlq_arn).build())
            .retry_policy(
                RetryPolicy::builder()
                    .maximum_retry_attempts(0)
                    .maximum_event_age_in_seconds(60)
                    .build(),
            )
            .build()
            .map_err(Error::timer)?;
        let window = FlexibleTimeWindow::builder()
            .mode(FlexibleTimeWindowMode::Off)
            .build()
            .map_err(Error::timer)?;

        tracing::debug!(schedule = %name, at = %at, "creating schedule");
        let result = self
            .client
            .create_schedule()
            .name(&name)
            .group_name(&self.config.group)
            .schedule_expression(schedule_expression(at))
            .schedule_expression_timezone("UTC")
            .flexible_time_window(window)
            .target(target)
            .action_after_completion(ActionAfterCompletion::Delete)
            .send()
            .await;
        match result {
            Ok(_) => {}
            // Alarm ids cover the trigger instant, so an existing schedule
            // with this name fires at the same time for the same alarm.
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conflict_exception()) =>
            {
                tracing::info!(schedule = %name, "schedule already exists");
            }
            Err(err) => return Err(Error::timer(err)),
        }

        Ok(ExecutionHandle {
            execution_ref: name,
            started_at: Utc::now(),
        })
    }

    async fn cancel(&self, handle: &ExecutionHandle) -> Result<()> {
        let result = self
            .client
            .delete_schedule()
            .name(&handle.execution_ref)
            .group_name(&self.config.group)
            .send()
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception()) =>
            {
                Ok(())
            }
            Err(err) => Err(Error::timer(err)),
        }
    }
}
