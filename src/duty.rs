//! On/off duty answers computed from a profile's shifts.

use chrono::{DateTime, Duration, Utc};

use crate::error::{Error, Result};
use crate::model::{Interval, Shift};
use crate::recurrence::expand_occurrences;
use crate::store::DataStore;

/// Union of every occurrence of `shifts` overlapping `[range_start, range_end)`.
///
/// Overlapping or touching intervals from different shifts collapse into one,
/// so the result is ordered and disjoint.
pub fn duty_ranges(
    shifts: &[Shift],
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
) -> Vec<Interval> {
    let mut occurrences: Vec<Interval> = shifts
        .iter()
        .flat_map(|shift| expand_occurrences(shift, range_start, range_end))
        .collect();
    occurrences.sort_unstable();
    merge_sorted(occurrences)
}

fn merge_sorted(sorted: Vec<Interval>) -> Vec<Interval> {
    let mut merged: Vec<Interval> = Vec::with_capacity(sorted.len());
    for interval in sorted {
        match merged.last_mut() {
            Some(last) if interval.start <= last.end => {
                last.end = last.end.max(interval.end);
            }
            _ => merged.push(interval),
        }
    }
    merged
}

/// Whether `instant` falls inside any occurrence, end-exclusive.
pub fn is_on_duty(shifts: &[Shift], instant: DateTime<Utc>) -> bool {
    duty_ranges(shifts, instant, instant + Duration::milliseconds(1))
        .iter()
        .any(|range| range.contains(instant))
}

/// Duty lookups for read paths that start from a profile id.
pub struct DutyService<S> {
    store: S,
}

impl<S: DataStore> DutyService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Shifts of a live profile. Unknown or deleted profiles are [`Error::NotFound`].
    async fn live_profile_shifts(&self, profile_id: &str) -> Result<Vec<Shift>> {
        match self.store.get_profile(profile_id).await? {
            Some(profile) if !profile.deleted => {}
            _ => return Err(Error::not_found("profile", profile_id)),
        }
        self.store.list_shifts_by_profile(profile_id).await
    }

    /// Fails with [`Error::NotFound`] for an unknown or deleted profile.
    pub async fn is_profile_on_duty(&self, profile_id: &str, now: DateTime<Utc>) -> Result<bool> {
        let shifts = self.live_profile_shifts(profile_id).await?;
        Ok(is_on_duty(&shifts, now))
    }

    /// Fails with [`Error::NotFound`] for an unknown or deleted profile.
    pub async fn profile_duty_ranges(
        &self,
        profile_id: &str,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<Interval>> {
        let shifts = self.live_profile_shifts(profile_id).await?;
        Ok(duty_ranges(&shifts, range_start, range_end))
    }
}
