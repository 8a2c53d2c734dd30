use std::io::{self, Write};

use super::{RequestStats, RunReport};

pub(super) fn render<W: Write>(report: &RunReport, out: &mut W) -> io::Result<()> {
    writeln!(
        out,
        "scenario={} run_id={} duration={:.1}s stop={} vus_max={} iterations={}",
        report.scenario,
        report.run_id,
        report.duration.as_secs_f64(),
        report.stop_reason,
        report.vus_max,
        report.iterations,
    )?;
    writeln!(out)?;

    writeln!(
        out,
        "{:<24} {:>8} {:>8} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9}",
        "requests", "count", "failed", "avg", "min", "med", "p(90)", "p(95)", "max"
    )?;
    stats_row(out, "http_req_duration", &report.requests)?;
    for (tag, stats) in &report.requests_by_tag {
        stats_row(out, &format!("  {{name:{tag}}}"), stats)?;
    }

    if !report.status_counts.is_empty() {
        writeln!(out)?;
        let statuses: Vec<String> = report
            .status_counts
            .iter()
            .map(|(status, n)| format!("{status}={n}"))
            .collect();
        writeln!(out, "statuses: {}", statuses.join(" "))?;
    }

    if !report.checks.is_empty() {
        writeln!(out)?;
        for (name, check) in &report.checks {
            let mark = if check.fails == 0 { "✓" } else { "✗" };
            writeln!(
                out,
                "{mark} {name:<30} {:>6.2}% ({} passed, {} failed)",
                check.rate * 100.0,
                check.passes,
                check.fails,
            )?;
        }
    }

    if !report.thresholds.is_empty() {
        writeln!(out)?;
        for t in &report.thresholds {
            writeln!(
                out,
                "{} {}: {} (observed {:.4})",
                if t.passed { "PASS" } else { "FAIL" },
                t.metric,
                t.expression,
                t.observed,
            )?;
        }
    }

    writeln!(out)?;
    writeln!(
        out,
        "result={} exit_code={}",
        if report.passed { "passed" } else { "failed" },
        report.exit_status.code(),
    )
}

fn stats_row<W: Write>(out: &mut W, label: &str, s: &RequestStats) -> io::Result<()> {
    writeln!(
        out,
        "{label:<24} {:>8} {:>8} {:>7.2}ms {:>7.2}ms {:>7.2}ms {:>7.2}ms {:>7.2}ms {:>7.2}ms",
        s.count, s.failed, s.avg, s.min, s.med, s.p90, s.p95, s.max
    )
}
