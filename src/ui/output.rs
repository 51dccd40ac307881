//! Output formatting for urlprobe
//!
//! Every renderer returns the full text for one command so the binary can
//! print it in one go and tests can inspect it.

use serde::Serialize;
use serde_json::json;

use crate::batch::SummaryResult;
use crate::cache::CacheStats;
use crate::core::constants::output_formats;
use crate::core::error::Result;
use crate::core::types::ValidationResult;
use crate::repair::{DuplicateReport, RepairOutcome};
use crate::ui::color::{Colors, colorize};

fn is_json(format: &str) -> bool {
    format == output_formats::JSON
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn format_results(results: &[ValidationResult], format: &str) -> Result<String> {
    if is_json(format) {
        return to_json(results);
    }

    let mut lines: Vec<String> = results.iter().map(format_result_line).collect();
    let valid = results.iter().filter(|r| r.is_ok()).count();
    let footer = format!("{valid}/{} URLs valid", results.len());
    lines.push(String::new());
    lines.push(if valid == results.len() {
        colorize(&footer, Colors::GREEN)
    } else {
        colorize(&footer, Colors::RED)
    });
    Ok(lines.join("\n"))
}

fn format_result_line(result: &ValidationResult) -> String {
    if result.is_ok() {
        let mut line = format!(
            "{} {} {} {} ({}ms)",
            colorize("✓", Colors::GREEN),
            result.status_code,
            result.url,
            result.content_type.as_deref().unwrap_or("-"),
            result.response_time_ms
        );
        if let Some(ref target) = result.redirect_url {
            line.push_str(&format!(" -> {target}"));
        }
        line
    } else {
        format!("{} {result}", colorize("✗", Colors::RED))
    }
}

pub fn format_summary(summary: &SummaryResult, format: &str) -> Result<String> {
    if is_json(format) {
        return to_json(&json!({
            "summary": summary,
            "successRate": summary.success_rate(),
            "assetDetectionRate": summary.asset_detection_rate(),
        }));
    }

    let mut lines = vec![
        colorize("Summary", Colors::BOLD),
        format!("  Total:          {}", summary.total),
        format!(
            "  Success:        {} ({:.1}%)",
            summary.success,
            summary.success_rate() * 100.0
        ),
        format!("  With assets:    {}", summary.with_assets),
        format!("  No assets:      {}", summary.no_assets),
        format!("  Empty content:  {}", summary.empty_content),
        format!("  Redirects:      {}", summary.redirects),
        format!("  Errors:         {}", summary.errors),
        format!(
            "  Asset rate:     {:.1}%",
            summary.asset_detection_rate() * 100.0
        ),
    ];
    if !summary.issue_types.is_empty() {
        lines.push(colorize("Issues", Colors::BOLD));
        lines.extend(
            summary
                .issue_types
                .iter()
                .map(|(kind, count)| format!("  {kind}: {count}")),
        );
    }
    Ok(lines.join("\n"))
}

pub fn format_cache_stats(backend: &str, stats: &CacheStats, format: &str) -> Result<String> {
    if is_json(format) {
        return to_json(&json!({ "backend": backend, "stats": stats }));
    }
    Ok(format!(
        "Cache ({backend}): {} entries, {} expired",
        stats.size, stats.expired_count
    ))
}

pub fn format_sweep(removed: usize, format: &str) -> Result<String> {
    if is_json(format) {
        return to_json(&json!({ "removed": removed }));
    }
    Ok(format!("Removed {removed} cache entr{}", plural_y(removed)))
}

pub fn format_cleared(format: &str) -> Result<String> {
    if is_json(format) {
        return to_json(&json!({ "cleared": true }));
    }
    Ok("Cache cleared".to_string())
}

pub fn format_projects(projects: &[String], format: &str) -> Result<String> {
    if is_json(format) {
        return to_json(projects);
    }
    if projects.is_empty() {
        return Ok("No projects found".to_string());
    }
    Ok(projects.join("\n"))
}

pub fn format_duplicate_report(
    project: &str,
    report: &DuplicateReport,
    format: &str,
) -> Result<String> {
    if is_json(format) {
        return to_json(&json!({ "project": project, "report": report }));
    }

    let mut lines = vec![
        colorize(&format!("Project '{project}'"), Colors::BOLD),
        format!("  Rows:             {}", report.total_urls),
        format!("  Unique URLs:      {}", report.unique_urls),
        format!("  Duplicate rows:   {}", report.total_duplicates),
        format!("  Duplicate groups: {}", report.duplicate_groups),
    ];
    if !report.top_duplicates.is_empty() {
        lines.push(colorize("Most duplicated", Colors::BOLD));
        lines.extend(
            report
                .top_duplicates
                .iter()
                .map(|(url, count)| format!("  {count:>4}  {url}")),
        );
    }
    Ok(lines.join("\n"))
}

pub fn format_repair_outcome(
    project: &str,
    outcome: &RepairOutcome,
    format: &str,
) -> Result<String> {
    if is_json(format) {
        return to_json(&json!({ "project": project, "outcome": outcome }));
    }
    if !outcome.success {
        return Ok(format!(
            "Repair of '{project}' incomplete: {} -> {} rows, duplicates remain",
            outcome.before, outcome.after
        ));
    }
    Ok(format!(
        "Repaired '{project}': {} -> {} rows ({} removed)",
        outcome.before, outcome.after, outcome.removed
    ))
}

fn plural_y(count: usize) -> &'static str {
    if count == 1 { "y" } else { "ies" }
}
