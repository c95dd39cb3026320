//! Plain text rendering of a `Report`.

use crate::filter::RunRecord;
use crate::weekly::{Report, WeekBucket};
use crate::ReportConfig;
use std::fmt::Write;

/// Character drawn once per `graph_interval` miles in the weekly graph.
pub const GRAPH_MARKER: char = '.';

const TABLE_BORDER: &str = "__________________________";
const TABLE_HEADER: &str = "|  # |   Date     | Miles|";

/// Renders the numbered list of individual runs.
pub fn render_run_table(runs: &[RunRecord]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "{TABLE_BORDER}");
    let _ = writeln!(output, "{TABLE_HEADER}");
    let _ = writeln!(output, "{TABLE_BORDER}");

    for (seq, run) in runs.iter().enumerate() {
        let _ = writeln!(output, "| {:>2} | {} | {:.1}  |", seq + 1, run.start, run.distance);
    }

    let _ = writeln!(output, "{TABLE_BORDER}");

    output
}

/// Returns one marker for every full `interval` miles in `total`.
pub fn graph_markers(total: f64, interval: f64) -> String {
    let count = (total / interval).floor();

    if !count.is_finite() || count < 1.0 {
        return String::new();
    }

    std::iter::repeat(GRAPH_MARKER).take(count as usize).collect()
}

fn render_week(output: &mut String, bucket: &WeekBucket, interval: f64) {
    let _ = writeln!(
        output,
        "{:>2} : {:>4.1} {}",
        bucket.index,
        bucket.total_distance,
        graph_markers(bucket.total_distance, interval)
    );
}

/// Renders the weekly totals as a dot graph.
pub fn render_weekly_graph(report: &Report, config: &ReportConfig) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "Weekly totals starting {}", report.anchor_date);
    let _ = writeln!(
        output,
        "Each dot represents {} miles ran that week",
        config.graph_interval
    );

    for bucket in &report.buckets {
        render_week(&mut output, bucket, config.graph_interval);
    }

    output
}

/// Renders the summary statistics.
pub fn render_summary(report: &Report) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "Total mileage: {:.1} miles", report.total_distance);
    let _ = writeln!(output, "Average weekly mileage: {:.1}", report.average_weekly);
    let _ = writeln!(
        output,
        "Average weekly mileage for previous four complete weeks: {:.1}",
        report.trailing_average
    );
    let _ = writeln!(output, "Average miles per run: {:.1}", report.average_per_run);

    output
}

/// Renders the complete report: run table, weekly graph and summary.
pub fn render_report(report: &Report, config: &ReportConfig) -> String {
    let mut output = render_run_table(&report.runs);

    output.push('\n');
    output.push_str(&render_weekly_graph(report, config));
    output.push('\n');
    output.push_str(&render_summary(report));

    output
}
