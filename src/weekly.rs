//! Weekly aggregation of logged runs.
//!
//! Runs are grouped into consecutive 7-day buckets counted from the configured anchor date. Each
//! bucket is the half-open window `[end_date - 7 days, end_date)`.

use crate::filter::RunRecord;
use crate::{Error, ReportConfig, Result};
use chrono::{Duration, NaiveDate};

/// Number of days in a bucket.
pub const WEEK_DAYS: i64 = 7;

/// Number of completed weeks averaged by `trailing_average`.
pub const TRAILING_WEEKS: i64 = 4;

/// Total mileage of one week.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekBucket {
    /// Sequential week number, starting at 1.
    pub index: usize,
    /// Exclusive end of the week.
    pub end_date: NaiveDate,
    /// Sum of the distances of all runs within the week.
    pub total_distance: f64,
}

impl WeekBucket {
    /// Inclusive start of the week.
    pub fn start_date(&self) -> NaiveDate {
        self.end_date - Duration::days(WEEK_DAYS)
    }

    /// Returns `true` if `date` falls within the week.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date() && date < self.end_date
    }
}

/// Aggregated statistics over all logged runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Reference date of the report.
    pub today: NaiveDate,
    /// Date the weekly buckets are counted from.
    pub anchor_date: NaiveDate,
    /// All runs, in the order they were logged.
    pub runs: Vec<RunRecord>,
    /// Weekly totals, the last one possibly still in progress.
    pub buckets: Vec<WeekBucket>,
    pub total_distance: f64,
    pub run_count: usize,
    pub first_run_date: NaiveDate,
    /// Average weekly mileage over the previous four complete weeks.
    pub trailing_average: f64,
    /// Average weekly mileage since the first run.
    pub average_weekly: f64,
    pub average_per_run: f64,
}

/// Splits the time from `anchor` to `today` into weekly buckets and sums the runs of each week.
///
/// A bucket is emitted for every week that has started on or before `today`, so the last bucket
/// covers the week in progress and may end after `today`. No buckets are produced if `today` is
/// before `anchor`.
pub fn weekly_buckets(anchor: NaiveDate, today: NaiveDate, runs: &[RunRecord]) -> Vec<WeekBucket> {
    let span = (today - anchor).num_days();
    let mut buckets = Vec::new();
    let mut elapsed = 0;
    let mut cursor = anchor;

    while elapsed <= span {
        elapsed += WEEK_DAYS;
        cursor += Duration::days(WEEK_DAYS);

        let mut bucket = WeekBucket {
            index: buckets.len() + 1,
            end_date: cursor,
            total_distance: 0.0,
        };

        bucket.total_distance = runs
            .iter()
            .filter(|run| bucket.contains(run.date))
            .fold(0.0, |total, run| total + run.distance);

        buckets.push(bucket);
    }

    buckets
}

/// Exclusive end boundaries `[from, until)` of the buckets averaged by `trailing_average`.
///
/// `until` is the start of the week in progress. A bucket qualifies if its end date is strictly
/// before it, and no more than four weeks earlier.
pub fn trailing_window(anchor: NaiveDate, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let days_into_week = (today - anchor).num_days().rem_euclid(WEEK_DAYS);

    let from = today - Duration::days(TRAILING_WEEKS * WEEK_DAYS + days_into_week);
    let until = today - Duration::days(days_into_week);

    (from, until)
}

/// Average weekly mileage of the four most recent weeks selected by `trailing_window`.
///
/// The divisor is always four, so weeks missing at the start of the history count as zero.
pub fn trailing_average(buckets: &[WeekBucket], anchor: NaiveDate, today: NaiveDate) -> f64 {
    let (from, until) = trailing_window(anchor, today);

    // `sum` of an empty f64 iterator is -0.0, which would print as "-0.0".
    let total = buckets
        .iter()
        .filter(|bucket| bucket.end_date >= from && bucket.end_date < until)
        .fold(0.0, |total, bucket| total + bucket.total_distance);

    total / TRAILING_WEEKS as f64
}

/// Aggregates `runs` into a `Report` as of `today`.
///
/// Fails with `Error::EmptyData` if there are no runs and with `Error::ZeroElapsedTime` if no
/// days have passed since the first run.
pub fn summarize(config: &ReportConfig, today: NaiveDate, runs: Vec<RunRecord>) -> Result<Report> {
    let first_run_date = match runs.first() {
        Some(run) => run.date,
        None => return Err(Error::EmptyData),
    };

    let elapsed_days = (today - first_run_date).num_days();
    if elapsed_days <= 0 {
        return Err(Error::ZeroElapsedTime {
            first_run: first_run_date,
            today,
        });
    }

    let anchor = config.anchor_date;
    let buckets = weekly_buckets(anchor, today, &runs);

    let unbucketed = runs
        .iter()
        .filter(|run| !buckets.iter().any(|bucket| bucket.contains(run.date)))
        .count();
    if unbucketed > 0 {
        log::warn!(
            "{} runs fall outside the weeks from {} to {} and are only counted in the totals",
            unbucketed,
            anchor,
            buckets.last().map_or(anchor, |bucket| bucket.end_date)
        );
    }

    // Summed from the runs rather than the buckets, which may not cover every run.
    let total_distance = runs.iter().fold(0.0, |total, run| total + run.distance);
    let run_count = runs.len();

    log::debug!(
        "aggregated {} runs ({:.1} miles) into {} weeks",
        run_count,
        total_distance,
        buckets.len()
    );

    Ok(Report {
        today,
        anchor_date: anchor,
        trailing_average: trailing_average(&buckets, anchor, today),
        average_weekly: total_distance / (elapsed_days as f64 / WEEK_DAYS as f64),
        average_per_run: total_distance / run_count as f64,
        runs,
        buckets,
        total_distance,
        run_count,
        first_run_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! date {
        ($y:expr, $m:expr, $d:expr) => {
            NaiveDate::from_ymd_opt($y, $m, $d).unwrap()
        };
    }

    macro_rules! run {
        ($distance:expr, $y:expr, $m:expr, $d:expr) => {
            RunRecord {
                date: date!($y, $m, $d),
                start: date!($y, $m, $d).to_string(),
                distance: $distance,
            }
        };
    }

    fn bucket(index: usize, end_date: NaiveDate, total_distance: f64) -> WeekBucket {
        WeekBucket {
            index,
            end_date,
            total_distance,
        }
    }

    fn sample_runs() -> Vec<RunRecord> {
        vec![
            run!(3.0, 2020, 5, 20),
            run!(5.0, 2020, 5, 25),
            run!(2.0, 2020, 5, 29),
        ]
    }

    // A few months of runs with uneven distances, several per week.
    fn long_history() -> Vec<RunRecord> {
        let mut runs = Vec::new();
        let mut date = date!(2020, 5, 18);
        let mut distance = 1.3;

        while date < date!(2020, 9, 1) {
            runs.push(RunRecord {
                date,
                start: date.to_string(),
                distance,
            });
            date += Duration::days(2);
            distance = (distance * 1.7) % 9.0 + 0.1;
        }

        runs
    }

    #[test]
    fn scenario_two_weeks() {
        let anchor = date!(2020, 5, 17);
        let today = date!(2020, 5, 31);

        let buckets = weekly_buckets(anchor, today, &sample_runs());

        // The third bucket is the week that started today.
        assert_eq!(
            buckets,
            vec![
                bucket(1, date!(2020, 5, 24), 3.0),
                bucket(2, date!(2020, 5, 31), 7.0),
                bucket(3, date!(2020, 6, 7), 0.0),
            ]
        );
        assert_eq!(buckets[0].start_date(), anchor);

        let report = summarize(&ReportConfig::new(anchor), today, sample_runs()).unwrap();

        assert_eq!(report.total_distance, 10.0);
        assert_eq!(report.run_count, 3);
        assert_eq!(report.first_run_date, date!(2020, 5, 20));
        assert!((report.average_per_run - 10.0 / 3.0).abs() < 1e-9);
        assert!((report.average_weekly - 10.0 / (11.0 / 7.0)).abs() < 1e-9);
    }

    #[test]
    fn in_progress_week_is_included() {
        let anchor = date!(2020, 5, 17);

        let buckets = weekly_buckets(anchor, date!(2020, 5, 19), &[run!(4.0, 2020, 5, 19)]);
        assert_eq!(buckets, vec![bucket(1, date!(2020, 5, 24), 4.0)]);

        let buckets = weekly_buckets(anchor, anchor, &[]);
        assert_eq!(buckets, vec![bucket(1, date!(2020, 5, 24), 0.0)]);

        let buckets = weekly_buckets(anchor, date!(2020, 5, 23), &[]);
        assert_eq!(buckets.len(), 1);

        let buckets = weekly_buckets(anchor, date!(2020, 5, 24), &[]);
        assert_eq!(buckets.len(), 2);
    }

    #[test]
    fn no_buckets_before_anchor() {
        let buckets = weekly_buckets(date!(2020, 5, 17), date!(2020, 5, 16), &sample_runs());
        assert!(buckets.is_empty());
    }

    #[test]
    fn bucket_boundaries_are_half_open() {
        let anchor = date!(2020, 5, 17);
        let runs = [
            run!(1.0, 2020, 5, 16),
            run!(2.0, 2020, 5, 17),
            run!(4.0, 2020, 5, 23),
            run!(8.0, 2020, 5, 24),
        ];

        let buckets = weekly_buckets(anchor, date!(2020, 5, 25), &runs);

        assert_eq!(
            buckets,
            vec![
                bucket(1, date!(2020, 5, 24), 6.0),
                bucket(2, date!(2020, 5, 31), 8.0),
            ]
        );
    }

    #[test]
    fn buckets_are_contiguous() {
        let anchor = date!(2020, 5, 17);
        let buckets = weekly_buckets(anchor, date!(2020, 12, 2), &long_history());

        assert_eq!(buckets[0].start_date(), anchor);
        for (index, pair) in buckets.windows(2).enumerate() {
            assert_eq!(pair[0].end_date, pair[1].start_date());
            assert_eq!(pair[0].index, index + 1);
            assert_eq!(pair[1].index, index + 2);
        }
    }

    #[test]
    fn every_run_lands_in_exactly_one_bucket() {
        let anchor = date!(2020, 5, 17);
        let runs = long_history();
        let buckets = weekly_buckets(anchor, date!(2020, 9, 10), &runs);

        for run in &runs {
            let hits = buckets.iter().filter(|bucket| bucket.contains(run.date)).count();
            assert_eq!(hits, 1, "run on {}", run.date);
        }
    }

    #[test]
    fn bucket_totals_add_up_to_total_distance() {
        let anchor = date!(2020, 5, 17);
        let runs = long_history();
        let first_run = runs[0].date;

        for today in [date!(2020, 9, 1), date!(2020, 9, 4), date!(2021, 1, 1)] {
            let report = summarize(&ReportConfig::new(anchor), today, runs.clone()).unwrap();

            let bucketed: f64 = report
                .buckets
                .iter()
                .filter(|bucket| bucket.start_date() >= anchor.min(first_run))
                .map(|bucket| bucket.total_distance)
                .sum();

            assert!((bucketed - report.total_distance).abs() < 1e-9);
        }
    }

    #[test]
    fn trailing_average_excludes_week_in_progress() {
        let anchor = date!(2020, 5, 17);
        // Runs of 1, 2, ... 8 miles in weeks 1 to 8, and 100 miles in week 9.
        let mut runs: Vec<RunRecord> = (0..8)
            .map(|week| RunRecord {
                date: anchor + Duration::days(week * 7 + 1),
                start: String::new(),
                distance: (week + 1) as f64,
            })
            .collect();
        runs.push(run!(100.0, 2020, 7, 13));

        // 59 days after the anchor: three days into week 9, which started on 2020-07-12.
        let today = date!(2020, 7, 15);
        let buckets = weekly_buckets(anchor, today, &runs);
        assert_eq!(buckets.len(), 9);
        assert_eq!(buckets[8].total_distance, 100.0);

        let (from, until) = trailing_window(anchor, today);
        assert_eq!(until, date!(2020, 7, 12));
        assert_eq!(from, date!(2020, 6, 14));

        // Buckets ending on 06-14, 06-21, 06-28 and 07-05 hold weeks 4 to 7.
        assert_eq!(trailing_average(&buckets, anchor, today), (4.0 + 5.0 + 6.0 + 7.0) / 4.0);

        let averaged: Vec<usize> = buckets
            .iter()
            .filter(|bucket| bucket.end_date >= from && bucket.end_date < until)
            .map(|bucket| bucket.index)
            .collect();
        assert_eq!(averaged, vec![4, 5, 6, 7]);
    }

    #[test]
    fn trailing_average_on_week_boundary() {
        let anchor = date!(2020, 5, 17);
        let today = date!(2020, 5, 31);
        let buckets = weekly_buckets(anchor, today, &sample_runs());

        let (from, until) = trailing_window(anchor, today);
        assert_eq!((from, until), (date!(2020, 5, 3), today));

        // Only the first week ends before the week starting today. The divisor stays at four.
        assert_eq!(trailing_average(&buckets, anchor, today), 3.0 / 4.0);
    }

    #[test]
    fn trailing_average_with_short_history_divides_by_four() {
        let anchor = date!(2020, 5, 17);
        let today = date!(2020, 5, 27);
        let buckets = weekly_buckets(anchor, today, &[run!(8.0, 2020, 5, 18)]);

        assert_eq!(trailing_average(&buckets, anchor, today), 0.0);
        assert_eq!(trailing_average(&[], anchor, today), 0.0);
    }

    #[test]
    fn empty_weeks_are_positive_zero() {
        let anchor = date!(2020, 5, 17);
        let today = date!(2020, 5, 31);

        let buckets = weekly_buckets(anchor, today, &[]);
        assert_eq!(buckets.len(), 3);
        for bucket in &buckets {
            assert!(bucket.total_distance.is_sign_positive(), "week {}", bucket.index);
            assert_eq!(format!("{:.1}", bucket.total_distance), "0.0");
        }

        let average = trailing_average(&[], anchor, today);
        assert!(average.is_sign_positive());
        assert_eq!(format!("{average:.1}"), "0.0");

        let average = trailing_average(&buckets, anchor, today);
        assert_eq!(format!("{average:.1}"), "0.0");
    }

    #[test]
    fn empty_runs_are_empty_data() {
        let config = ReportConfig::new(date!(2020, 5, 17));

        assert!(matches!(
            summarize(&config, date!(2020, 5, 31), Vec::new()),
            Err(Error::EmptyData)
        ));
    }

    #[test]
    fn first_run_today_is_zero_elapsed_time() {
        let config = ReportConfig::new(date!(2020, 5, 17));
        let today = date!(2020, 5, 20);

        match summarize(&config, today, vec![run!(3.0, 2020, 5, 20)]) {
            Err(Error::ZeroElapsedTime { first_run, today: t }) => {
                assert_eq!(first_run, today);
                assert_eq!(t, today);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn runs_outside_buckets_still_count_in_totals() {
        let config = ReportConfig::new(date!(2020, 5, 17));
        let runs = vec![run!(2.0, 2020, 5, 10), run!(3.0, 2020, 5, 20)];

        let report = summarize(&config, date!(2020, 5, 24), runs).unwrap();

        assert_eq!(report.total_distance, 5.0);
        assert_eq!(report.first_run_date, date!(2020, 5, 10));
        let bucketed: f64 = report.buckets.iter().map(|b| b.total_distance).sum();
        assert_eq!(bucketed, 3.0);
    }
}
