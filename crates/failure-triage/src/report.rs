//! Statistics and markdown rendering over the healing history

use crate::types::{CategoryStats, HealingReport, HealingStats};
use chrono::Utc;
use soulscout_core_types::FailureCategory;
use std::fmt::Write;

/// How many of the latest attempts the markdown report lists.
const RECENT_ACTIONS: usize = 10;

pub(crate) fn stats(history: &[HealingReport]) -> HealingStats {
    let by_category = FailureCategory::ALL
        .iter()
        .map(|category| {
            let mut stats = CategoryStats::default();
            for report in history.iter().filter(|r| r.result.category == *category) {
                stats.attempts += 1;
                if report.result.success {
                    stats.successes += 1;
                }
            }
            (*category, stats)
        })
        .collect();

    let total_attempts = history.len();
    let successes = history.iter().filter(|r| r.result.success).count();
    HealingStats {
        total_attempts,
        success_rate: if total_attempts == 0 {
            0.0
        } else {
            successes as f64 / total_attempts as f64
        },
        by_category,
    }
}

pub(crate) fn render(history: &[HealingReport]) -> String {
    let stats = stats(history);
    let mut out = String::new();
    let _ = writeln!(out, "# Self-Healing Report");
    let _ = writeln!(out, "Generated: {}", Utc::now().to_rfc3339());
    let _ = writeln!(out);
    let _ = writeln!(out, "## Summary");
    let _ = writeln!(out, "- Total Healing Attempts: {}", stats.total_attempts);
    let _ = writeln!(out, "- Success Rate: {:.1}%", stats.success_rate * 100.0);
    let _ = writeln!(out);
    let _ = writeln!(out, "## By Failure Type");
    for (category, data) in stats.by_category.iter().filter(|(_, d)| d.attempts > 0) {
        let _ = writeln!(
            out,
            "- **{}**: {}/{} ({:.1}%)",
            category,
            data.successes,
            data.attempts,
            data.success_rate() * 100.0
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "## Recent Healing Actions");
    let skip = history.len().saturating_sub(RECENT_ACTIONS);
    for report in &history[skip..] {
        let mark = if report.result.success { "healed" } else { "escalated" };
        let _ = writeln!(
            out,
            "- [{}] {}: {}",
            mark, report.failure.test_name, report.result.explanation
        );
    }
    out
}
