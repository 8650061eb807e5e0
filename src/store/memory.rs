use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{DataStore, Page};
use crate::error::{Error, Result};
use crate::model::{ExploreProfile, Interval, Profile, ProfileSubscription, Shift, ShiftAlarm, User};

#[derive(Debug, Default)]
struct Tables {
    shifts: BTreeMap<String, Shift>,
    alarms: BTreeMap<String, ShiftAlarm>,
    profiles: BTreeMap<String, Profile>,
    users: BTreeMap<String, User>,
    subscriptions: BTreeMap<String, ProfileSubscription>,
    explore: BTreeMap<String, ExploreProfile>,
}

/// In-process [`DataStore`]. Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    unavailable: Arc<AtomicBool>,
}

fn page_of<T: Clone>(map: &BTreeMap<String, T>, cursor: Option<&str>, limit: u32) -> Page<T> {
    let lower = match cursor {
        Some(key) => Bound::Excluded(key.to_string()),
        None => Bound::Unbounded,
    };
    let mut rows = map.range((lower, Bound::Unbounded));
    let items: Vec<(String, T)> = rows
        .by_ref()
        .take(limit.max(1) as usize)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let cursor = match rows.next() {
        Some(_) => items.last().map(|(k, _)| k.clone()),
        None => None,
    };
    Page {
        items: items.into_iter().map(|(_, v)| v).collect(),
        cursor,
    }
}

impl MemoryStore {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn available(&self) -> Result<MutexGuard<'_, Tables>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::store("memory store marked unavailable"));
        }
        Ok(self.tables())
    }

    /// Makes every subsequent call fail with a transient store error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn insert_shift(&self, shift: Shift) {
        self.tables().shifts.insert(shift.id.clone(), shift);
    }

    pub fn remove_shift(&self, id: &str) -> Option<Shift> {
        self.tables().shifts.remove(id)
    }

    pub fn insert_alarm(&self, alarm: ShiftAlarm) {
        self.tables().alarms.insert(alarm.id.clone(), alarm);
    }

    pub fn insert_profile(&self, profile: Profile) {
        self.tables().profiles.insert(profile.id.clone(), profile);
    }

    pub fn insert_user(&self, user: User) {
        self.tables().users.insert(user.id.clone(), user);
    }

    pub fn insert_subscription(&self, subscription: ProfileSubscription) {
        self.tables()
            .subscriptions
            .insert(subscription.id.clone(), subscription);
    }

    pub fn remove_subscription(&self, id: &str) -> Option<ProfileSubscription> {
        self.tables().subscriptions.remove(id)
    }

    pub fn insert_explore_profile(&self, explore: ExploreProfile) {
        self.tables().explore.insert(explore.id.clone(), explore);
    }

    pub fn shift(&self, id: &str) -> Option<Shift> {
        self.tables().shifts.get(id).cloned()
    }

    pub fn alarms(&self) -> Vec<ShiftAlarm> {
        self.tables().alarms.values().cloned().collect()
    }

    pub fn explore_profile(&self, id: &str) -> Option<ExploreProfile> {
        self.tables().explore.get(id).cloned()
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn get_shift(&self, id: &str) -> Result<Option<Shift>> {
        Ok(self.available()?.shifts.get(id).cloned())
    }

    async fn put_shift(&self, shift: &Shift) -> Result<()> {
        self.available()?.shifts.insert(shift.id.clone(), shift.clone());
        Ok(())
    }

    async fn list_shifts_by_profile(&self, profile_id: &str) -> Result<Vec<Shift>> {
        Ok(self
            .available()?
            .shifts
            .values()
            .filter(|s| s.profile_id == profile_id)
            .cloned()
            .collect())
    }

    async fn scan_shifts(&self, cursor: Option<&str>, limit: u32) -> Result<Page<Shift>> {
        Ok(page_of(&self.available()?.shifts, cursor, limit))
    }

    async fn get_alarm(&self, id: &str) -> Result<Option<ShiftAlarm>> {
        Ok(self.available()?.alarms.get(id).cloned())
    }

    async fn put_alarm(&self, alarm: &ShiftAlarm) -> Result<()> {
        self.available()?.alarms.insert(alarm.id.clone(), alarm.clone());
        Ok(())
    }

    async fn delete_alarm(&self, id: &str) -> Result<()> {
        self.available()?.alarms.remove(id);
        Ok(())
    }

    async fn list_alarms_by_shift(&self, shift_id: &str) -> Result<Vec<ShiftAlarm>> {
        Ok(self
            .available()?
            .alarms
            .values()
            .filter(|a| a.shift_id == shift_id)
            .cloned()
            .collect())
    }

    async fn get_profile(&self, id: &str) -> Result<Option<Profile>> {
        Ok(self.available()?.profiles.get(id).cloned())
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.available()?.users.get(id).cloned())
    }

    async fn get_subscription(&self, id: &str) -> Result<Option<ProfileSubscription>> {
        Ok(self.available()?.subscriptions.get(id).cloned())
    }

    async fn list_subscriptions_by_profile(
        &self,
        profile_id: &str,
    ) -> Result<Vec<ProfileSubscription>> {
        Ok(self
            .available()?
            .subscriptions
            .values()
            .filter(|s| s.profile_id == profile_id)
            .cloned()
            .collect())
    }

    async fn scan_explore_profiles(
        &self,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<Page<ExploreProfile>> {
        Ok(page_of(&self.available()?.explore, cursor, limit))
    }

    async fn put_duty_ranges(&self, updates: &[(String, Vec<Interval>)]) -> Result<()> {
        let mut tables = self.available()?;
        for (id, ranges) in updates {
            if let Some(explore) = tables.explore.get_mut(id) {
                explore.duty_ranges = ranges.clone();
            }
        }
        Ok(())
    }
}
