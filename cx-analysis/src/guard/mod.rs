//! Guard gate: evaluates the configured quality rules against the
//! current coverage and metrics state, for CI-style pass/fail checks.

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::debug;

use cx_core::config::{GuardConfig, MetricsConfig};
use cx_core::errors::AnalysisError;
use cx_storage::Store;

use crate::gaps::{analyze_gaps, Priority};

/// One tripped rule.
#[derive(Debug, Clone, Serialize)]
pub struct GuardViolation {
    pub rule: String,
    pub message: String,
    /// Warnings only fail the gate under `fail_on_warnings`.
    pub is_warning: bool,
}

/// Outcome of a guard evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct GuardReport {
    pub passed: bool,
    pub violations: Vec<GuardViolation>,
}

/// Evaluate the guard rules.
///
/// `baseline` is a per-entity coverage snapshot captured before the run
/// being judged (entity id → percent); regressions can only be detected
/// against it. Critical/high gaps are violations; medium/low gaps are
/// warnings and fail the gate only under `fail_on_warnings`.
pub fn evaluate(
    store: &Store,
    guard: &GuardConfig,
    metrics_config: &MetricsConfig,
    gap_threshold: f64,
    baseline: Option<&FxHashMap<String, f64>>,
) -> Result<GuardReport, AnalysisError> {
    let mut violations = Vec::new();

    let report = analyze_gaps(store, metrics_config, gap_threshold, None, false)?;

    if let Some(min) = guard.min_coverage_for_keystones {
        let coverage: FxHashMap<String, f64> = store
            .all_coverage()?
            .into_iter()
            .map(|c| (c.entity_id.clone(), c.coverage_percent))
            .collect();
        for m in store.all_metrics()? {
            if !m.is_keystone(metrics_config.keystone_threshold) {
                continue;
            }
            let percent = coverage.get(&m.entity_id).copied().unwrap_or(0.0);
            if percent < min {
                violations.push(GuardViolation {
                    rule: "min_coverage_for_keystones".to_string(),
                    message: format!(
                        "keystone '{}' is at {:.1}% coverage (minimum {:.1}%)",
                        m.entity_id, percent, min
                    ),
                    is_warning: false,
                });
            }
        }
    }

    if guard.fail_on_coverage_regression {
        if let Some(baseline) = baseline {
            for row in store.all_coverage()? {
                if let Some(&prior) = baseline.get(&row.entity_id) {
                    if row.coverage_percent < prior {
                        violations.push(GuardViolation {
                            rule: "fail_on_coverage_regression".to_string(),
                            message: format!(
                                "'{}' regressed from {:.1}% to {:.1}%",
                                row.entity_id, prior, row.coverage_percent
                            ),
                            is_warning: false,
                        });
                    }
                }
            }
        }
    }

    for gap in &report.gaps {
        violations.push(GuardViolation {
            rule: "coverage_gap".to_string(),
            message: format!(
                "{} gap: '{}' at {:.1}% coverage",
                gap.priority.as_str(),
                gap.name,
                gap.coverage_percent
            ),
            is_warning: matches!(gap.priority, Priority::Medium | Priority::Low),
        });
    }

    let passed = violations
        .iter()
        .all(|v| v.is_warning && !guard.fail_on_warnings);
    debug!(
        "guard: {} violation(s), passed = {passed}",
        violations.len()
    );
    Ok(GuardReport { passed, violations })
}
