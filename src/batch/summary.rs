use serde::Serialize;
use std::collections::BTreeMap;

use crate::core::constants::{error_messages, http_status};
use crate::core::types::{ValidationResult, ValidationStatus};
use crate::validation::classifier::ContentPolicy;

/// Aggregate counters over one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResult {
    pub total: usize,
    pub success: usize,
    pub redirects: usize,
    pub errors: usize,
    pub empty_content: usize,
    pub no_assets: usize,
    pub with_assets: usize,
    pub issue_types: BTreeMap<String, usize>,
}

impl SummaryResult {
    pub fn aggregate(results: &[ValidationResult], policy: &ContentPolicy) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Default::default()
        };

        for result in results {
            if result.status == ValidationStatus::Success {
                summary.success += 1;
                if result.content_length_bytes == 0 {
                    summary.empty_content += 1;
                    summary.record_issue("empty_content");
                } else if result
                    .content_type
                    .as_deref()
                    .is_some_and(|content_type| policy.is_asset_type(content_type))
                {
                    summary.with_assets += 1;
                } else {
                    summary.no_assets += 1;
                }
                continue;
            }

            if result.redirect {
                summary.redirects += 1;
            } else {
                summary.errors += 1;
            }
            summary.record_issue(&issue_kind(result));
        }

        summary
    }

    /// Share of successful results, 0.0 for an empty batch
    pub fn success_rate(&self) -> f64 {
        ratio(self.success, self.total)
    }

    /// Share of successful results that were assets
    pub fn asset_detection_rate(&self) -> f64 {
        ratio(self.with_assets, self.success)
    }

    fn record_issue(&mut self, kind: &str) {
        *self.issue_types.entry(kind.to_string()).or_default() += 1;
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Issue label for a failed result
pub fn issue_kind(result: &ValidationResult) -> String {
    match result.status {
        ValidationStatus::Timeout => "timeout".to_string(),
        ValidationStatus::Skipped => "skipped".to_string(),
        ValidationStatus::Cancelled => "cancelled".to_string(),
        _ if result.error.as_deref() == Some(error_messages::INVALID_SYNTAX) => {
            "invalid_syntax".to_string()
        }
        _ if result.redirect => "redirect".to_string(),
        _ if result.status_code == 0 => "connection".to_string(),
        _ if result.status_code != http_status::OK => format!("http_{}", result.status_code),
        _ if result
            .error
            .as_deref()
            .is_some_and(|error| error.starts_with("content too large")) =>
        {
            "too_large".to_string()
        }
        _ => "content_type".to_string(),
    }
}
