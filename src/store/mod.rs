//! Data-access facade over the application tables.
//!
//! Components take a [`DataStore`] instead of reaching for a client, so the
//! same code runs against DynamoDB in Lambda and [`MemoryStore`] in tests.

mod dynamo;
mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{ExploreProfile, Interval, Profile, ProfileSubscription, Shift, ShiftAlarm, User};

pub use dynamo::DynamoStore;
pub use memory::MemoryStore;

/// One page of a table scan. `cursor` is `None` on the last page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub cursor: Option<String>,
}

#[async_trait]
pub trait DataStore: Send + Sync {
    async fn get_shift(&self, id: &str) -> Result<Option<Shift>>;
    async fn put_shift(&self, shift: &Shift) -> Result<()>;
    async fn list_shifts_by_profile(&self, profile_id: &str) -> Result<Vec<Shift>>;
    async fn scan_shifts(&self, cursor: Option<&str>, limit: u32) -> Result<Page<Shift>>;

    async fn get_alarm(&self, id: &str) -> Result<Option<ShiftAlarm>>;
    async fn put_alarm(&self, alarm: &ShiftAlarm) -> Result<()>;
    /// Removes an alarm. Removing one that is already gone succeeds.
    async fn delete_alarm(&self, id: &str) -> Result<()>;
    async fn list_alarms_by_shift(&self, shift_id: &str) -> Result<Vec<ShiftAlarm>>;

    async fn get_profile(&self, id: &str) -> Result<Option<Profile>>;
    async fn get_user(&self, id: &str) -> Result<Option<User>>;
    async fn get_subscription(&self, id: &str) -> Result<Option<ProfileSubscription>>;
    async fn list_subscriptions_by_profile(
        &self,
        profile_id: &str,
    ) -> Result<Vec<ProfileSubscription>>;

    async fn scan_explore_profiles(
        &self,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<Page<ExploreProfile>>;
    /// Overwrites `dutyRanges` of each listed explore profile.
    async fn put_duty_ranges(&self, updates: &[(String, Vec<Interval>)]) -> Result<()>;
}
