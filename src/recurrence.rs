//! Expansion of a shift's repeat rule into concrete occurrences.
//!
//! Every occurrence keeps the anchor's local wall-clock start and end in the
//! shift's IANA zone, so a 09:00-17:00 shift stays 09:00-17:00 across DST
//! changes while its UTC instants move. Rules that do not fit their
//! frequency expand to nothing.

use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
    Weekday,
};
use chrono_tz::Tz;

use crate::model::{Frequency, Interval, MonthWeek, Repeat, Shift};

/// Consecutive periods allowed to produce no date before the rule is
/// considered unsatisfiable (e.g. every 31 February).
const MAX_EMPTY_PERIODS: u32 = 1_000;

/// All occurrences of `shift` overlapping `[range_start, range_end)`, ordered by start.
pub fn expand_occurrences(
    shift: &Shift,
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
) -> Vec<Interval> {
    if range_start >= range_end {
        return Vec::new();
    }
    Occurrences::starting_at(shift, range_start)
        .take_while(|occurrence| occurrence.start < range_end)
        .collect()
}

/// The `step`-th occurrence (1-based) whose start is strictly after `after`.
pub fn next_occurrence(shift: &Shift, after: DateTime<Utc>, step: usize) -> Option<Interval> {
    Occurrences::starting_at(shift, after)
        .filter(|occurrence| occurrence.start > after)
        .nth(step.max(1) - 1)
}

/// Local calendar date of `instant` in the shift's zone.
pub fn local_date(shift: &Shift, instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&shift.timezone()).date_naive()
}

/// Wall-clock shape of a shift, captured from its anchor.
#[derive(Debug, Clone)]
struct Template {
    tz: Tz,
    anchor_date: NaiveDate,
    start_time: NaiveTime,
    end_day_offset: i64,
    end_time: NaiveTime,
    duration: Duration,
}

impl Template {
    fn of(shift: &Shift) -> Self {
        let tz = shift.timezone();
        let start = shift.start.with_timezone(&tz);
        let end = shift.end.with_timezone(&tz);
        Self {
            tz,
            anchor_date: start.date_naive(),
            start_time: start.time(),
            end_day_offset: (end.date_naive() - start.date_naive()).num_days(),
            end_time: end.time(),
            duration: shift.end - shift.start,
        }
    }

    fn occurrence_on(&self, date: NaiveDate) -> Option<Interval> {
        let start = resolve_local(&self.tz, date.and_time(self.start_time))?;
        let end_date = date + Duration::days(self.end_day_offset);
        let end = resolve_local(&self.tz, end_date.and_time(self.end_time))
            .filter(|end| *end > start)
            .unwrap_or(start + self.duration);
        Some(Interval::new(start, end))
    }
}

/// Maps a local wall-clock time to UTC. Ambiguous times take the earlier
/// instant; times inside a spring-forward gap move forward by the gap.
fn resolve_local(tz: &Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    if let Some(resolved) = tz.from_local_datetime(&local).earliest() {
        return Some(resolved.with_timezone(&Utc));
    }
    let before_gap = tz.offset_from_utc_datetime(&(local - Duration::days(1))).fix();
    let utc = local.checked_sub_signed(Duration::seconds(i64::from(before_gap.local_minus_utc())))?;
    Some(Utc.from_utc_datetime(&utc))
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

fn from_month_index(index: i64) -> Option<(i32, u32)> {
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    Some((year, index.rem_euclid(12) as u32 + 1))
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

fn nth_weekday(year: i32, month: u32, rule: MonthWeek) -> Option<NaiveDate> {
    let weekday: Weekday = rule.week_day.into();
    if rule.ordinal > 0 {
        return NaiveDate::from_weekday_of_month_opt(year, month, weekday, rule.ordinal as u8);
    }
    let last = last_day_of_month(year, month)?;
    let back = (7 + last.weekday().num_days_from_monday() - weekday.num_days_from_monday()) % 7;
    let weeks_back = -i64::from(rule.ordinal) - 1;
    let date = last - Duration::days(i64::from(back) + 7 * weeks_back);
    (date.month() == month).then_some(date)
}

/// Dates a monthly/yearly rule selects within one calendar month.
fn month_dates(repeat: &Repeat, year: i32, month: u32) -> Vec<NaiveDate> {
    match repeat.on_week {
        Some(rule) => nth_weekday(year, month, rule).into_iter().collect(),
        None => repeat
            .month_days
            .iter()
            .filter_map(|day| NaiveDate::from_ymd_opt(year, month, *day))
            .collect(),
    }
}

/// A validated rule plus the arithmetic to walk its periods.
#[derive(Debug, Clone)]
struct Rule {
    repeat: Repeat,
    anchor: NaiveDate,
}

impl Rule {
    fn every(&self) -> i64 {
        i64::from(self.repeat.every)
    }

    /// Index of the period containing `date`, clamped to the anchor's period.
    fn period_of(&self, date: NaiveDate) -> i64 {
        let elapsed = match self.repeat.frequency {
            Frequency::Daily => (date - self.anchor).num_days(),
            Frequency::Weekly => (week_start(date) - week_start(self.anchor)).num_days() / 7,
            Frequency::Monthly => month_index(date) - month_index(self.anchor),
            Frequency::Yearly => i64::from(date.year() - self.anchor.year()),
        };
        elapsed.max(0) / self.every()
    }

    /// First calendar day of period `k`.
    fn period_start(&self, k: i64) -> Option<NaiveDate> {
        let step = k.checked_mul(self.every())?;
        match self.repeat.frequency {
            Frequency::Daily => self.anchor.checked_add_signed(Duration::days(step)),
            Frequency::Weekly => {
                week_start(self.anchor).checked_add_signed(Duration::weeks(step))
            }
            Frequency::Monthly => {
                let (year, month) = from_month_index(month_index(self.anchor) + step)?;
                NaiveDate::from_ymd_opt(year, month, 1)
            }
            Frequency::Yearly => {
                let year = i32::try_from(i64::from(self.anchor.year()) + step).ok()?;
                NaiveDate::from_ymd_opt(year, 1, 1)
            }
        }
    }

    /// Candidate dates of period `k`, ascending, never before the anchor.
    fn period_dates(&self, k: i64) -> Option<Vec<NaiveDate>> {
        let start = self.period_start(k)?;
        let mut dates = match self.repeat.frequency {
            Frequency::Daily => vec![start],
            Frequency::Weekly => self
                .repeat
                .week_days
                .iter()
                .map(|day| {
                    let weekday: Weekday = (*day).into();
                    start + Duration::days(i64::from(weekday.num_days_from_monday()))
                })
                .collect(),
            Frequency::Monthly => month_dates(&self.repeat, start.year(), start.month()),
            Frequency::Yearly => self
                .repeat
                .months
                .iter()
                .flat_map(|month| month_dates(&self.repeat, start.year(), month.number()))
                .collect(),
        };
        dates.retain(|date| *date >= self.anchor);
        dates.sort_unstable();
        dates.dedup();
        Some(dates)
    }
}

/// Lazily evaluated, restartable sequence of a shift's occurrences.
///
/// Cloning yields an independent cursor at the same position.
#[derive(Debug, Clone)]
pub struct Occurrences {
    template: Template,
    rule: Option<Rule>,
    single: Option<Interval>,
    exceptions: Vec<NaiveDate>,
    end_repeat: Option<DateTime<Utc>>,
    from: DateTime<Utc>,
    period: i64,
    pending: Vec<NaiveDate>,
    empty_periods: u32,
    done: bool,
}

impl Occurrences {
    /// Occurrences of `shift` that have not ended by `from`.
    pub fn starting_at(shift: &Shift, from: DateTime<Utc>) -> Self {
        let template = Template::of(shift);
        let mut occurrences = Self {
            rule: None,
            single: None,
            exceptions: shift.exceptions.clone(),
            end_repeat: shift.end_repeat,
            from,
            period: 0,
            pending: Vec::new(),
            empty_periods: 0,
            done: shift.start >= shift.end,
            template,
        };
        if occurrences.done {
            return occurrences;
        }

        match &shift.repeat {
            None => occurrences.single = Some(shift.interval()),
            Some(repeat) => match repeat.validate() {
                Ok(()) => {
                    let rule = Rule {
                        repeat: repeat.clone(),
                        anchor: occurrences.template.anchor_date,
                    };
                    let lookback = occurrences.template.duration + Duration::days(2);
                    let from_local = (from - lookback).with_timezone(&occurrences.template.tz);
                    occurrences.period = rule.period_of(from_local.date_naive());
                    occurrences.rule = Some(rule);
                }
                Err(err) => {
                    tracing::debug!(shift_id = %shift.id, error = %err, "repeat rule expands to nothing");
                    occurrences.done = true;
                }
            },
        }
        occurrences
    }

    fn past_end_repeat(&self, date: NaiveDate) -> bool {
        self.end_repeat
            .is_some_and(|end| date > end.date_naive() + Duration::days(1))
    }

    fn accept(&self, occurrence: &Interval) -> bool {
        occurrence.end > self.from && self.end_repeat.map_or(true, |end| occurrence.start <= end)
    }
}

impl Iterator for Occurrences {
    type Item = Interval;

    fn next(&mut self) -> Option<Interval> {
        if self.done {
            return None;
        }
        if let Some(single) = self.single.take() {
            self.done = true;
            return self.accept(&single).then_some(single);
        }

        loop {
            let rule = self.rule.as_ref()?;

            if self.pending.is_empty() {
                let Some(start) = rule.period_start(self.period) else {
                    self.done = true;
                    return None;
                };
                if self.past_end_repeat(start) || self.empty_periods >= MAX_EMPTY_PERIODS {
                    self.done = true;
                    return None;
                }
                let mut dates = rule.period_dates(self.period).unwrap_or_default();
                dates.retain(|date| !self.exceptions.contains(date));
                self.period += 1;
                if dates.is_empty() {
                    self.empty_periods += 1;
                    continue;
                }
                self.empty_periods = 0;
                dates.reverse();
                self.pending = dates;
            }

            while let Some(date) = self.pending.pop() {
                let Some(occurrence) = self.template.occurrence_on(date) else {
                    continue;
                };
                if self.end_repeat.is_some_and(|end| occurrence.start > end) {
                    self.done = true;
                    return None;
                }
                if self.accept(&occurrence) {
                    return Some(occurrence);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MonthName, WeekDay};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn shift(start: DateTime<Utc>, end: DateTime<Utc>, repeat: Option<Repeat>) -> Shift {
        Shift {
            id: "shift-1".into(),
            job_id: "job-1".into(),
            start,
            end,
            repeat,
            workplace_id: "wp-1".into(),
            profile_id: "profile-1".into(),
            parent_id: None,
            exceptions: vec![],
            alert: None,
            end_repeat: None,
            iana_tz: None,
            is_daylight: None,
        }
    }

    fn starts(occurrences: &[Interval]) -> Vec<DateTime<Utc>> {
        occurrences.iter().map(|o| o.start).collect()
    }

    #[test]
    fn weekly_monday_wednesday() {
        let s = shift(
            utc(2023, 1, 2, 9, 0),
            utc(2023, 1, 2, 17, 0),
            Some(Repeat::weekly(1, [WeekDay::Monday, WeekDay::Wednesday])),
        );
        let out = expand_occurrences(&s, utc(2023, 1, 1, 0, 0), utc(2023, 1, 15, 0, 0));
        assert_eq!(
            starts(&out),
            vec![
                utc(2023, 1, 2, 9, 0),
                utc(2023, 1, 4, 9, 0),
                utc(2023, 1, 9, 9, 0),
                utc(2023, 1, 11, 9, 0),
            ]
        );
        assert!(out.iter().all(|o| o.duration() == Duration::hours(8)));
    }

    #[test]
    fn weekly_exception_is_skipped() {
        let mut s = shift(
            utc(2023, 1, 2, 9, 0),
            utc(2023, 1, 2, 17, 0),
            Some(Repeat::weekly(1, [WeekDay::Monday, WeekDay::Wednesday])),
        );
        s.exceptions = vec![date(2023, 1, 4)];
        let out = expand_occurrences(&s, utc(2023, 1, 1, 0, 0), utc(2023, 1, 15, 0, 0));
        assert_eq!(
            starts(&out),
            vec![
                utc(2023, 1, 2, 9, 0),
                utc(2023, 1, 9, 9, 0),
                utc(2023, 1, 11, 9, 0),
            ]
        );
    }

    #[test]
    fn biweekly_skips_alternate_weeks() {
        let s = shift(
            utc(2023, 1, 4, 9, 0),
            utc(2023, 1, 4, 12, 0),
            Some(Repeat::weekly(2, [WeekDay::Monday, WeekDay::Wednesday])),
        );
        let out = expand_occurrences(&s, utc(2023, 1, 1, 0, 0), utc(2023, 1, 31, 0, 0));
        // Monday Jan 2 precedes the anchor and is not produced.
        assert_eq!(
            starts(&out),
            vec![
                utc(2023, 1, 4, 9, 0),
                utc(2023, 1, 16, 9, 0),
                utc(2023, 1, 18, 9, 0),
                utc(2023, 1, 30, 9, 0),
            ]
        );
    }

    #[test]
    fn daily_every_three_days_keeps_spacing() {
        let s = shift(
            utc(2023, 3, 1, 22, 0),
            utc(2023, 3, 2, 6, 0),
            Some(Repeat::new(Frequency::Daily, 3)),
        );
        let out = expand_occurrences(&s, utc(2023, 3, 10, 0, 0), utc(2023, 3, 25, 0, 0));
        assert!(!out.is_empty());
        for occurrence in &out {
            assert_eq!((occurrence.start - s.start).num_days() % 3, 0);
            assert_eq!(occurrence.duration(), Duration::hours(8));
        }
        assert_eq!(out[0].start, utc(2023, 3, 10, 22, 0));
    }

    #[test]
    fn overnight_occurrence_overlapping_range_start_is_included() {
        let s = shift(
            utc(2023, 3, 1, 22, 0),
            utc(2023, 3, 2, 6, 0),
            Some(Repeat::new(Frequency::Daily, 1)),
        );
        let out = expand_occurrences(&s, utc(2023, 3, 5, 2, 0), utc(2023, 3, 5, 3, 0));
        assert_eq!(out, vec![Interval::new(utc(2023, 3, 4, 22, 0), utc(2023, 3, 5, 6, 0))]);
    }

    #[test]
    fn monthly_second_tuesday() {
        let repeat = Repeat {
            on_week: Some(MonthWeek {
                ordinal: 2,
                week_day: WeekDay::Tuesday,
            }),
            ..Repeat::new(Frequency::Monthly, 1)
        };
        let s = shift(utc(2023, 1, 10, 9, 0), utc(2023, 1, 10, 10, 0), Some(repeat));
        let out = expand_occurrences(&s, utc(2023, 1, 1, 0, 0), utc(2023, 4, 30, 0, 0));
        assert_eq!(
            starts(&out),
            vec![
                utc(2023, 1, 10, 9, 0),
                utc(2023, 2, 14, 9, 0),
                utc(2023, 3, 14, 9, 0),
                utc(2023, 4, 11, 9, 0),
            ]
        );
    }

    #[test]
    fn monthly_last_friday() {
        let repeat = Repeat {
            on_week: Some(MonthWeek {
                ordinal: -1,
                week_day: WeekDay::Friday,
            }),
            ..Repeat::new(Frequency::Monthly, 1)
        };
        let s = shift(utc(2023, 1, 27, 18, 0), utc(2023, 1, 27, 23, 0), Some(repeat));
        let out = expand_occurrences(&s, utc(2023, 1, 1, 0, 0), utc(2023, 4, 1, 0, 0));
        assert_eq!(
            starts(&out),
            vec![
                utc(2023, 1, 27, 18, 0),
                utc(2023, 2, 24, 18, 0),
                utc(2023, 3, 31, 18, 0),
            ]
        );
    }

    #[test]
    fn monthly_day_31_skips_short_months() {
        let repeat = Repeat {
            month_days: vec![31],
            ..Repeat::new(Frequency::Monthly, 1)
        };
        let s = shift(utc(2023, 1, 31, 9, 0), utc(2023, 1, 31, 10, 0), Some(repeat));
        let out = expand_occurrences(&s, utc(2023, 1, 1, 0, 0), utc(2023, 6, 1, 0, 0));
        assert_eq!(
            starts(&out),
            vec![
                utc(2023, 1, 31, 9, 0),
                utc(2023, 3, 31, 9, 0),
                utc(2023, 5, 31, 9, 0),
            ]
        );
    }

    #[test]
    fn yearly_months_and_day() {
        let repeat = Repeat {
            months: vec![MonthName::June, MonthName::December],
            month_days: vec![1],
            ..Repeat::new(Frequency::Yearly, 2)
        };
        let s = shift(utc(2022, 6, 1, 8, 0), utc(2022, 6, 1, 12, 0), Some(repeat));
        let out = expand_occurrences(&s, utc(2022, 1, 1, 0, 0), utc(2026, 12, 31, 0, 0));
        assert_eq!(
            starts(&out),
            vec![
                utc(2022, 6, 1, 8, 0),
                utc(2022, 12, 1, 8, 0),
                utc(2024, 6, 1, 8, 0),
                utc(2024, 12, 1, 8, 0),
                utc(2026, 6, 1, 8, 0),
                utc(2026, 12, 1, 8, 0),
            ]
        );
    }

    #[test]
    fn end_repeat_bounds_output() {
        let mut s = shift(
            utc(2023, 1, 2, 9, 0),
            utc(2023, 1, 2, 17, 0),
            Some(Repeat::new(Frequency::Daily, 1)),
        );
        s.end_repeat = Some(utc(2023, 1, 4, 9, 0));
        let out = expand_occurrences(&s, utc(2023, 1, 1, 0, 0), utc(2023, 2, 1, 0, 0));
        assert_eq!(out.len(), 3);
        assert_eq!(Occurrences::starting_at(&s, utc(2023, 1, 1, 0, 0)).count(), 3);
    }

    #[test]
    fn degenerate_inputs_yield_nothing() {
        let repeating = shift(
            utc(2023, 1, 2, 9, 0),
            utc(2023, 1, 2, 17, 0),
            Some(Repeat::new(Frequency::Daily, 1)),
        );
        let t = utc(2023, 1, 5, 0, 0);
        assert!(expand_occurrences(&repeating, t, t).is_empty());
        assert!(expand_occurrences(&repeating, utc(2022, 1, 1, 0, 0), utc(2022, 2, 1, 0, 0)).is_empty());

        let malformed = shift(
            utc(2023, 1, 2, 9, 0),
            utc(2023, 1, 2, 17, 0),
            Some(Repeat::new(Frequency::Weekly, 1)),
        );
        assert!(expand_occurrences(&malformed, utc(2023, 1, 1, 0, 0), utc(2024, 1, 1, 0, 0)).is_empty());

        let inverted = shift(utc(2023, 1, 2, 17, 0), utc(2023, 1, 2, 9, 0), None);
        assert!(expand_occurrences(&inverted, utc(2023, 1, 1, 0, 0), utc(2024, 1, 1, 0, 0)).is_empty());
    }

    #[test]
    fn unsatisfiable_rule_terminates() {
        let repeat = Repeat {
            months: vec![MonthName::February],
            month_days: vec![31],
            ..Repeat::new(Frequency::Yearly, 1)
        };
        let s = shift(utc(2023, 1, 2, 9, 0), utc(2023, 1, 2, 10, 0), Some(repeat));
        assert_eq!(next_occurrence(&s, utc(2023, 1, 1, 0, 0), 1), None);
    }

    #[test]
    fn non_repeating_shift_is_single_occurrence() {
        let s = shift(utc(2023, 1, 2, 9, 0), utc(2023, 1, 2, 17, 0), None);
        let out = expand_occurrences(&s, utc(2023, 1, 1, 0, 0), utc(2023, 1, 15, 0, 0));
        assert_eq!(out, vec![s.interval()]);
        assert_eq!(next_occurrence(&s, utc(2023, 1, 2, 9, 0), 1), None);
    }

    #[test]
    fn wall_clock_is_kept_across_dst() {
        // 09:00-17:00 in New York; DST starts 2023-03-12.
        let mut s = shift(
            utc(2023, 3, 9, 14, 0),
            utc(2023, 3, 9, 22, 0),
            Some(Repeat::new(Frequency::Daily, 1)),
        );
        s.iana_tz = Some("America/New_York".into());
        let out = expand_occurrences(&s, utc(2023, 3, 10, 0, 0), utc(2023, 3, 14, 0, 0));
        assert_eq!(
            out,
            vec![
                Interval::new(utc(2023, 3, 10, 14, 0), utc(2023, 3, 10, 22, 0)),
                Interval::new(utc(2023, 3, 11, 14, 0), utc(2023, 3, 11, 22, 0)),
                Interval::new(utc(2023, 3, 12, 13, 0), utc(2023, 3, 12, 21, 0)),
                Interval::new(utc(2023, 3, 13, 13, 0), utc(2023, 3, 13, 21, 0)),
            ]
        );
    }

    #[test]
    fn gap_time_moves_forward() {
        // 02:30 local does not exist in New York on 2023-03-12.
        let mut s = shift(
            utc(2023, 3, 11, 7, 30),
            utc(2023, 3, 11, 8, 30),
            Some(Repeat::new(Frequency::Daily, 1)),
        );
        s.iana_tz = Some("America/New_York".into());
        let out = expand_occurrences(&s, utc(2023, 3, 12, 0, 0), utc(2023, 3, 12, 12, 0));
        assert_eq!(out.len(), 1);
        // 03:30 EDT
        assert_eq!(out[0].start, utc(2023, 3, 12, 7, 30));
        assert!(out[0].end > out[0].start);
    }

    #[test]
    fn exceptions_match_local_date() {
        // 08:00 in Sydney is 22:00 UTC on the previous day.
        let mut s = shift(
            utc(2023, 4, 30, 22, 0),
            utc(2023, 5, 1, 2, 0),
            Some(Repeat::new(Frequency::Daily, 1)),
        );
        s.iana_tz = Some("Australia/Sydney".into());
        s.exceptions = vec![date(2023, 5, 3)];
        let out = expand_occurrences(&s, utc(2023, 5, 1, 0, 0), utc(2023, 5, 4, 12, 0));
        let dates: Vec<NaiveDate> = out.iter().map(|o| local_date(&s, o.start)).collect();
        assert_eq!(dates, vec![date(2023, 5, 1), date(2023, 5, 2), date(2023, 5, 4)]);
    }

    #[test]
    fn iterator_is_restartable() {
        let s = shift(
            utc(2023, 1, 2, 9, 0),
            utc(2023, 1, 2, 17, 0),
            Some(Repeat::weekly(1, [WeekDay::Friday])),
        );
        let mut cursor = Occurrences::starting_at(&s, utc(2023, 1, 1, 0, 0));
        let first = cursor.next();
        let fork = cursor.clone();
        let rest: Vec<_> = cursor.take(3).collect();
        let again: Vec<_> = fork.take(3).collect();
        assert_eq!(first.map(|o| o.start), Some(utc(2023, 1, 6, 9, 0)));
        assert_eq!(rest, again);
    }

    #[test]
    fn next_occurrence_steps_past_anchor() {
        let s = shift(
            utc(2023, 1, 2, 9, 0),
            utc(2023, 1, 2, 17, 0),
            Some(Repeat::new(Frequency::Daily, 1)),
        );
        let anchor = utc(2023, 1, 3, 8, 45);
        assert_eq!(next_occurrence(&s, anchor, 1).map(|o| o.start), Some(utc(2023, 1, 3, 9, 0)));
        assert_eq!(next_occurrence(&s, anchor, 2).map(|o| o.start), Some(utc(2023, 1, 4, 9, 0)));
    }
}
