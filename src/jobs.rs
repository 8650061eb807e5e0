//! Paged batch jobs over whole tables.
//!
//! A single invocation scans at most `max_pages_per_invocation` pages and
//! reports where it stopped; the scheduler re-invokes with that cursor until
//! `done` is set.

use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::OffsetComponents;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::JobSettings;
use crate::duty::duty_ranges;
use crate::error::Result;
use crate::model::{Frequency, Interval, Shift};
use crate::recurrence::Occurrences;
use crate::store::{DataStore, Page};

/// Outcome of one job invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    /// Where the next invocation resumes. `None` once the table is exhausted.
    pub cursor: Option<String>,
    pub processed: usize,
    pub updated: usize,
    pub skipped: usize,
    pub done: bool,
}

/// Drives `visit` over pages of a scan, stopping after the configured page budget.
async fn run_pages<T, Fetch, FetchFut, Visit, VisitFut>(
    settings: &JobSettings,
    cursor: Option<String>,
    mut fetch: Fetch,
    mut visit: Visit,
) -> Result<JobReport>
where
    Fetch: FnMut(Option<String>, u32) -> FetchFut,
    FetchFut: std::future::Future<Output = Result<Page<T>>>,
    Visit: FnMut(Vec<T>) -> VisitFut,
    VisitFut: std::future::Future<Output = Result<(usize, usize)>>,
{
    let mut report = JobReport {
        cursor,
        ..JobReport::default()
    };
    for _ in 0..settings.max_pages_per_invocation {
        let page = fetch(report.cursor.take(), settings.scan_page_size).await?;
        report.processed += page.items.len();
        let (updated, skipped) = visit(page.items).await?;
        report.updated += updated;
        report.skipped += skipped;
        report.cursor = page.cursor;
        if report.cursor.is_none() {
            report.done = true;
            break;
        }
    }
    Ok(report)
}

/// Recomputes `dutyRanges` on explore profiles for the coming window.
pub struct DutySync<S> {
    store: S,
    settings: JobSettings,
}

impl<S: DataStore> DutySync<S> {
    pub fn new(store: S, settings: JobSettings) -> Self {
        Self { store, settings }
    }

    /// The window starts at the beginning of `now`'s UTC day.
    pub fn window(&self, now: DateTime<Utc>) -> Interval {
        let start = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|midnight| Utc.from_utc_datetime(&midnight))
            .unwrap_or(now);
        Interval::new(
            start,
            start + Duration::days(i64::from(self.settings.duty_window_days)),
        )
    }

    pub async fn run(&self, now: DateTime<Utc>, cursor: Option<String>) -> Result<JobReport> {
        let window = self.window(now);
        let store = &self.store;
        let report = run_pages(
            &self.settings,
            cursor,
            |cursor, limit| async move { store.scan_explore_profiles(cursor.as_deref(), limit).await },
            |rows| async move {
                let mut updates = Vec::new();
                let mut skipped = 0;
                for explore in rows {
                    if explore.is_expired(now) {
                        skipped += 1;
                        continue;
                    }
                    let shifts = store.list_shifts_by_profile(&explore.profile_id).await?;
                    let ranges = duty_ranges(&shifts, window.start, window.end);
                    if ranges != explore.duty_ranges {
                        updates.push((explore.id, ranges));
                    }
                }
                store.put_duty_ranges(&updates).await?;
                Ok((updates.len(), skipped))
            },
        )
        .await?;

        info!(
            processed = report.processed,
            updated = report.updated,
            skipped = report.skipped,
            done = report.done,
            "duty ranges synced"
        );
        Ok(report)
    }
}

/// Whether the shift's zone observes daylight time at `instant`.
fn in_daylight(shift: &Shift, instant: DateTime<Utc>) -> bool {
    let tz = shift.timezone();
    !tz.offset_from_utc_datetime(&instant.naive_utc())
        .dst_offset()
        .is_zero()
}

/// Rolls a repeating shift's stored anchor onto the current offset when the
/// zone's daylight status has flipped since the shift was written.
///
/// Returns `None` when the shift needs no rewrite.
pub fn adjust_for_daylight(shift: &Shift, now: DateTime<Utc>) -> Option<Shift> {
    let has_zone = shift
        .iana_tz
        .as_deref()
        .is_some_and(|name| name.parse::<chrono_tz::Tz>().is_ok());
    if !has_zone || !shift.has_active_repeat(now) {
        return None;
    }
    let daylight = in_daylight(shift, now);
    if shift.is_daylight == Some(daylight) {
        return None;
    }

    let latest = latest_on_wall_clock(shift, now);
    let mut adjusted = shift.clone();
    if let Some(occurrence) = latest {
        adjusted.start = occurrence.start;
        adjusted.end = occurrence.end;
    }
    adjusted.is_daylight = Some(daylight);
    Some(adjusted)
}

/// Longest stretch a rule can go between two consecutive dates.
fn repeat_span(shift: &Shift) -> Duration {
    let Some(repeat) = &shift.repeat else {
        return Duration::zero();
    };
    let every = i64::from(repeat.every.max(1));
    match repeat.frequency {
        Frequency::Daily => Duration::days(every),
        Frequency::Weekly => Duration::weeks(every),
        Frequency::Monthly => Duration::days(31 * every),
        Frequency::Yearly => Duration::days(366 * every),
    }
}

/// Latest occurrence starting at or before `now` whose local start and end
/// keep the anchor's wall-clock times.
///
/// Occurrences pushed forward by a spring-forward gap are passed over, so a
/// gap-shifted time never becomes the new anchor. The search looks back one
/// repeat span at a time and widens only when exceptions or gaps leave it
/// empty.
fn latest_on_wall_clock(shift: &Shift, now: DateTime<Utc>) -> Option<Interval> {
    let tz = shift.timezone();
    let wall = |interval: &Interval| {
        (
            interval.start.with_timezone(&tz).time(),
            interval.end.with_timezone(&tz).time(),
        )
    };
    let anchor = wall(&shift.interval());

    let mut lookback = repeat_span(shift) + shift.interval().duration();
    loop {
        let from = now
            .checked_sub_signed(lookback)
            .map_or(shift.start, |from| from.max(shift.start));
        let latest = Occurrences::starting_at(shift, from)
            .take_while(|occurrence| occurrence.start <= now)
            .filter(|occurrence| wall(occurrence) == anchor)
            .last();
        if latest.is_some() || from <= shift.start {
            return latest;
        }
        lookback = lookback + lookback;
    }
}

/// Keeps stored anchors of repeating zoned shifts on the current UTC offset.
pub struct DstAdjuster<S> {
    store: S,
    settings: JobSettings,
}

impl<S: DataStore> DstAdjuster<S> {
    pub fn new(store: S, settings: JobSettings) -> Self {
        Self { store, settings }
    }

    pub async fn run(&self, now: DateTime<Utc>, cursor: Option<String>) -> Result<JobReport> {
        let store = &self.store;
        let report = run_pages(
            &self.settings,
            cursor,
            |cursor, limit| async move { store.scan_shifts(cursor.as_deref(), limit).await },
            |shifts| async move {
                let total = shifts.len();
                let adjusted: Vec<Shift> = shifts
                    .iter()
                    .filter_map(|shift| adjust_for_daylight(shift, now))
                    .collect();
                for shift in &adjusted {
                    debug!(shift_id = %shift.id, start = %shift.start, "anchor moved to current offset");
                }
                try_join_all(adjusted.iter().map(|shift| store.put_shift(shift))).await?;
                Ok((adjusted.len(), total - adjusted.len()))
            },
        )
        .await?;

        info!(
            processed = report.processed,
            updated = report.updated,
            skipped = report.skipped,
            done = report.done,
            "daylight adjustment pass finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExploreProfile, Repeat, WeekDay};
    use crate::recurrence::expand_occurrences;
    use crate::store::MemoryStore;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn shift(id: &str, profile: &str, start: DateTime<Utc>, hours: i64, repeat: Option<Repeat>) -> Shift {
        Shift {
            id: id.into(),
            job_id: "job".into(),
            start,
            end: start + Duration::hours(hours),
            repeat,
            workplace_id: "wp".into(),
            profile_id: profile.into(),
            parent_id: None,
            exceptions: vec![],
            alert: None,
            end_repeat: None,
            iana_tz: None,
            is_daylight: None,
        }
    }

    fn explore(id: &str, profile: &str, expires_at: Option<DateTime<Utc>>) -> ExploreProfile {
        ExploreProfile {
            id: id.into(),
            profile_id: profile.into(),
            duty_ranges: vec![],
            expires_at,
        }
    }

    fn small_pages() -> JobSettings {
        JobSettings {
            duty_window_days: 2,
            scan_page_size: 1,
            max_pages_per_invocation: 2,
        }
    }

    #[tokio::test]
    async fn duty_sync_resumes_from_cursor_until_done() {
        let store = MemoryStore::default();
        store.insert_shift(shift(
            "s1",
            "p1",
            at(2023, 1, 2, 9, 0),
            8,
            Some(Repeat::new(Frequency::Daily, 1)),
        ));
        store.insert_explore_profile(explore("e1", "p1", None));
        store.insert_explore_profile(explore("e2", "p2", None));
        store.insert_explore_profile(explore("e3", "p1", Some(at(2023, 1, 1, 0, 0))));

        let job = DutySync::new(store.clone(), small_pages());
        let now = at(2023, 1, 5, 13, 30);

        let first = job.run(now, None).await.unwrap();
        assert_eq!(first.processed, 2);
        assert!(!first.done);
        assert!(first.cursor.is_some());

        let second = job.run(now, first.cursor).await.unwrap();
        assert_eq!(second.processed, 1);
        assert_eq!(second.skipped, 1);
        assert!(second.done);
        assert_eq!(second.cursor, None);

        assert_eq!(
            store.explore_profile("e1").unwrap().duty_ranges,
            vec![
                Interval::new(at(2023, 1, 5, 9, 0), at(2023, 1, 5, 17, 0)),
                Interval::new(at(2023, 1, 6, 9, 0), at(2023, 1, 6, 17, 0)),
            ]
        );
        assert!(store.explore_profile("e2").unwrap().duty_ranges.is_empty());
        assert!(store.explore_profile("e3").unwrap().duty_ranges.is_empty());
    }

    #[tokio::test]
    async fn duty_sync_leaves_unchanged_rows_alone() {
        let store = MemoryStore::default();
        store.insert_explore_profile(explore("e1", "nobody", None));
        let report = DutySync::new(store, JobSettings::default())
            .run(at(2023, 1, 5, 0, 0), None)
            .await
            .unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.updated, 0);
        assert!(report.done);
    }

    #[tokio::test]
    async fn duty_sync_propagates_store_failure() {
        let store = MemoryStore::default();
        store.set_unavailable(true);
        let err = DutySync::new(store, JobSettings::default())
            .run(at(2023, 1, 5, 0, 0), None)
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    fn new_york_weekly() -> Shift {
        // Mondays 09:00-17:00 New York, written in winter (EST, UTC-5).
        Shift {
            iana_tz: Some("America/New_York".into()),
            is_daylight: Some(false),
            ..shift(
                "ny",
                "p1",
                at(2023, 1, 2, 14, 0),
                8,
                Some(Repeat::weekly(1, [WeekDay::Monday])),
            )
        }
    }

    #[test]
    fn daylight_flip_rolls_anchor_to_latest_occurrence() {
        // Wednesday after the March change; EDT is UTC-4.
        let now = at(2023, 3, 15, 12, 0);
        let adjusted = adjust_for_daylight(&new_york_weekly(), now).unwrap();
        assert_eq!(adjusted.start, at(2023, 3, 13, 13, 0));
        assert_eq!(adjusted.end, at(2023, 3, 13, 21, 0));
        assert_eq!(adjusted.is_daylight, Some(true));
    }

    #[test]
    fn anchor_never_lands_in_a_spring_forward_gap() {
        // Daily 02:30-04:30 New York; 02:30 does not exist on 2023-03-12.
        let night = Shift {
            iana_tz: Some("America/New_York".into()),
            is_daylight: Some(false),
            ..shift(
                "night",
                "p1",
                at(2023, 3, 1, 7, 30),
                2,
                Some(Repeat::new(Frequency::Daily, 1)),
            )
        };
        let adjusted = adjust_for_daylight(&night, at(2023, 3, 12, 12, 0)).unwrap();
        assert_eq!(adjusted.start, at(2023, 3, 11, 7, 30));
        assert_eq!(adjusted.end, at(2023, 3, 11, 9, 30));
        assert_eq!(adjusted.is_daylight, Some(true));

        // 02:30 EDT is 06:30 UTC.
        let later = expand_occurrences(&adjusted, at(2023, 3, 20, 0, 0), at(2023, 3, 21, 0, 0));
        assert_eq!(later, vec![Interval::new(at(2023, 3, 20, 6, 30), at(2023, 3, 20, 8, 30))]);
    }

    #[test]
    fn long_running_shift_rolls_to_recent_occurrence() {
        // Written years ago; the search only walks back from now.
        let old = Shift {
            start: at(2015, 1, 5, 14, 0),
            end: at(2015, 1, 5, 22, 0),
            ..new_york_weekly()
        };
        let adjusted = adjust_for_daylight(&old, at(2023, 3, 15, 12, 0)).unwrap();
        assert_eq!(adjusted.start, at(2023, 3, 13, 13, 0));
    }

    #[test]
    fn exceptions_widen_the_lookback() {
        // The two Mondays before now are excepted.
        let shift = Shift {
            exceptions: vec![
                chrono::NaiveDate::from_ymd_opt(2023, 3, 13).unwrap(),
                chrono::NaiveDate::from_ymd_opt(2023, 3, 6).unwrap(),
            ],
            ..new_york_weekly()
        };
        let adjusted = adjust_for_daylight(&shift, at(2023, 3, 15, 12, 0)).unwrap();
        assert_eq!(adjusted.start, at(2023, 2, 27, 14, 0));
    }

    #[test]
    fn unchanged_daylight_status_is_left_alone() {
        assert!(adjust_for_daylight(&new_york_weekly(), at(2023, 2, 1, 12, 0)).is_none());
    }

    #[test]
    fn missing_marker_is_filled_in() {
        let shift = Shift {
            is_daylight: None,
            ..new_york_weekly()
        };
        let adjusted = adjust_for_daylight(&shift, at(2023, 1, 4, 12, 0)).unwrap();
        assert_eq!(adjusted.start, at(2023, 1, 2, 14, 0));
        assert_eq!(adjusted.is_daylight, Some(false));
    }

    #[test]
    fn zoneless_and_single_shifts_are_skipped() {
        let now = at(2023, 7, 1, 0, 0);
        let zoneless = Shift {
            iana_tz: None,
            ..new_york_weekly()
        };
        let single = Shift {
            repeat: None,
            ..new_york_weekly()
        };
        let unknown_zone = Shift {
            iana_tz: Some("Nowhere/Special".into()),
            ..new_york_weekly()
        };
        assert!(adjust_for_daylight(&zoneless, now).is_none());
        assert!(adjust_for_daylight(&single, now).is_none());
        assert!(adjust_for_daylight(&unknown_zone, now).is_none());
    }

    #[tokio::test]
    async fn dst_job_rewrites_only_flipped_shifts() {
        let store = MemoryStore::default();
        store.insert_shift(new_york_weekly());
        store.insert_shift(shift("plain", "p1", at(2023, 1, 2, 9, 0), 8, None));

        let report = DstAdjuster::new(store.clone(), JobSettings::default())
            .run(at(2023, 3, 15, 12, 0), None)
            .await
            .unwrap();

        assert_eq!(report.processed, 2);
        assert_eq!(report.updated, 1);
        assert_eq!(report.skipped, 1);
        assert!(report.done);
        let stored = store.shift("ny").unwrap();
        assert_eq!(stored.start, at(2023, 3, 13, 13, 0));
        assert_eq!(stored.is_daylight, Some(true));
        assert_eq!(store.shift("plain").unwrap().start, at(2023, 1, 2, 9, 0));
    }
}
