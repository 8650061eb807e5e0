//! Delayed execution port: "deliver this alarm message at time T".

mod eventbridge;
mod virtual_clock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{AlarmMessage, ExecutionHandle};

pub use eventbridge::EventBridgeTimer;
pub use virtual_clock::{PendingExecution, VirtualTimer};

#[async_trait]
pub trait DelayedExecution: Send + Sync {
    /// Registers `message` for delivery at `at` and returns a handle for cancelling it.
    async fn schedule(&self, at: DateTime<Utc>, message: &AlarmMessage) -> Result<ExecutionHandle>;

    /// Cancels a pending delivery. Handles that already fired or were removed are ignored.
    async fn cancel(&self, handle: &ExecutionHandle) -> Result<()>;
}
