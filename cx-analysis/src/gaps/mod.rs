//! Gap and impact analysis: join coverage with metrics, prioritize, and
//! recommend where tests are most needed.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::debug;

use cx_core::config::MetricsConfig;
use cx_core::errors::AnalysisError;
use cx_core::model::entity::EntityFilter;
use cx_core::model::metrics::EntityMetrics;
use cx_storage::Store;

/// Priority tiers, highest urgency first. Evaluation order matters:
/// first matching tier wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// One coverage gap, joined with metrics.
#[derive(Debug, Clone, Serialize)]
pub struct GapEntry {
    pub entity_id: String,
    pub name: String,
    pub file_path: String,
    pub line_start: u32,
    pub coverage_percent: f64,
    pub pagerank: f64,
    pub betweenness: f64,
    pub in_degree: i64,
    pub is_keystone: bool,
    pub is_bottleneck: bool,
    pub risk_score: f64,
    pub priority: Priority,
}

/// Aggregate counts and the derived recommendation. Counts are
/// canonical; the grouped view is presentational.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GapSummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub total_keystones: usize,
    pub keystones_with_gaps: usize,
    pub recommendation: String,
}

/// The full gaps report, sorted by risk descending.
#[derive(Debug, Clone, Serialize)]
pub struct GapsReport {
    pub gaps: Vec<GapEntry>,
    pub summary: GapSummary,
    /// Populated only when the caller asks for the grouped view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_priority: Option<BTreeMap<String, Vec<GapEntry>>>,
}

/// Risk of leaving an entity untested: more central, more depended-upon,
/// less covered is worse.
pub fn risk_score(coverage_percent: f64, pagerank: f64, in_degree: i64) -> f64 {
    (1.0 - coverage_percent / 100.0) * pagerank * (in_degree as f64 + 1.0)
}

/// Tier an entity. The ladder is evaluated top-down; the first match
/// wins.
pub fn tier(
    coverage: f64,
    is_keystone: bool,
    is_bottleneck: bool,
    in_degree: i64,
) -> Priority {
    if is_keystone && coverage < 25.0 {
        Priority::Critical
    } else if (is_keystone && coverage < 50.0) || (is_bottleneck && coverage < 25.0) {
        Priority::High
    } else if (in_degree >= 5 && coverage < 25.0)
        || (is_bottleneck && coverage < 50.0)
        || is_keystone
    {
        // A keystone reaching here has coverage >= 50 by elimination.
        Priority::Medium
    } else {
        Priority::Low
    }
}

/// Analyze coverage gaps across all active entities with metrics.
///
/// Entities at or above the gap threshold are not reported; entities
/// with no coverage row count as 0%.
pub fn analyze_gaps(
    store: &Store,
    metrics_config: &MetricsConfig,
    gap_threshold: f64,
    top_n: Option<usize>,
    group_by_priority: bool,
) -> Result<GapsReport, AnalysisError> {
    let entities = store.query_entities(&EntityFilter::default())?;
    let metrics: FxHashMap<String, EntityMetrics> = store
        .all_metrics()?
        .into_iter()
        .map(|m| (m.entity_id.clone(), m))
        .collect();
    let coverage: FxHashMap<String, f64> = store
        .all_coverage()?
        .into_iter()
        .map(|c| (c.entity_id.clone(), c.coverage_percent))
        .collect();

    let mut gaps = Vec::new();
    let mut summary = GapSummary::default();

    for entity in &entities {
        let Some(m) = metrics.get(&entity.id) else {
            continue;
        };
        let is_keystone = m.is_keystone(metrics_config.keystone_threshold);
        let is_bottleneck = m.is_bottleneck(metrics_config.bottleneck_threshold);
        let percent = coverage.get(&entity.id).copied().unwrap_or(0.0);

        if is_keystone {
            summary.total_keystones += 1;
            if percent < gap_threshold {
                summary.keystones_with_gaps += 1;
            }
        }
        if percent >= gap_threshold {
            continue;
        }

        let priority = tier(percent, is_keystone, is_bottleneck, m.in_degree);
        match priority {
            Priority::Critical => summary.critical += 1,
            Priority::High => summary.high += 1,
            Priority::Medium => summary.medium += 1,
            Priority::Low => summary.low += 1,
        }

        gaps.push(GapEntry {
            entity_id: entity.id.clone(),
            name: entity.name.clone(),
            file_path: entity.file_path.clone(),
            line_start: entity.line_start,
            coverage_percent: percent,
            pagerank: m.pagerank,
            betweenness: m.betweenness,
            in_degree: m.in_degree,
            is_keystone,
            is_bottleneck,
            risk_score: risk_score(percent, m.pagerank, m.in_degree),
            priority,
        });
    }

    gaps.sort_by(|a, b| b.risk_score.total_cmp(&a.risk_score));
    if let Some(n) = top_n {
        gaps.truncate(n);
    }

    summary.recommendation = recommend(&summary);

    let by_priority = group_by_priority.then(|| {
        let mut grouped: BTreeMap<String, Vec<GapEntry>> = BTreeMap::new();
        for gap in &gaps {
            grouped
                .entry(gap.priority.as_str().to_string())
                .or_default()
                .push(gap.clone());
        }
        grouped
    });

    debug!(
        "gap analysis: {} gaps ({} critical, {} high)",
        gaps.len(),
        summary.critical,
        summary.high
    );
    Ok(GapsReport {
        gaps,
        summary,
        by_priority,
    })
}

/// The recommendation follows the highest present tier.
fn recommend(summary: &GapSummary) -> String {
    if summary.critical > 0 {
        format!(
            "{} keystone entit{} with almost no coverage: write tests for these before any further changes",
            summary.critical,
            if summary.critical == 1 { "y" } else { "ies" },
        )
    } else if summary.high > 0 {
        format!(
            "{} high-priority gap(s) on central entities: schedule tests this iteration",
            summary.high
        )
    } else if summary.medium > 0 {
        format!(
            "{} medium-priority gap(s): cover them as the touched code changes",
            summary.medium
        )
    } else if summary.low > 0 {
        format!(
            "{} low-priority gap(s): acceptable for now, revisit periodically",
            summary.low
        )
    } else {
        "no coverage gaps below the threshold".to_string()
    }
}

/// One entity in an impact report, with the tests known to exercise it.
#[derive(Debug, Clone, Serialize)]
pub struct ImpactEntry {
    pub entity_id: String,
    pub name: String,
    pub file_path: String,
    pub coverage_percent: f64,
    pub pagerank: f64,
    pub in_degree: i64,
    pub is_keystone: bool,
    pub covering_tests: Vec<String>,
}

/// Impact of changing a file or entity: the target set plus its direct
/// dependents, each joined with coverage and covering tests.
#[derive(Debug, Clone, Serialize)]
pub struct ImpactReport {
    pub target: String,
    pub entries: Vec<ImpactEntry>,
    pub keystones_with_gaps: usize,
}

/// Impact of changing one file: every active entity in it plus the
/// direct dependents of those entities.
pub fn impact_for_file(
    store: &Store,
    metrics_config: &MetricsConfig,
    gap_threshold: f64,
    file_path: &str,
) -> Result<ImpactReport, AnalysisError> {
    let entities = store.query_entities(&EntityFilter {
        file_path: Some(file_path.to_string()),
        ..Default::default()
    })?;
    let mut ids: Vec<String> = entities.iter().map(|e| e.id.clone()).collect();
    for entity in &entities {
        for dep in store.dependencies_to(&entity.id)? {
            ids.push(dep.from_id);
        }
    }
    build_impact(store, metrics_config, gap_threshold, file_path, ids)
}

/// Impact of changing one entity: itself plus direct dependents.
pub fn impact_for_entity(
    store: &Store,
    metrics_config: &MetricsConfig,
    gap_threshold: f64,
    entity_id: &str,
) -> Result<ImpactReport, AnalysisError> {
    let entity = store.get_entity(entity_id)?;
    let mut ids = vec![entity.id.clone()];
    for dep in store.dependencies_to(entity_id)? {
        ids.push(dep.from_id);
    }
    build_impact(store, metrics_config, gap_threshold, &entity.name, ids)
}

fn build_impact(
    store: &Store,
    metrics_config: &MetricsConfig,
    gap_threshold: f64,
    target: &str,
    mut ids: Vec<String>,
) -> Result<ImpactReport, AnalysisError> {
    ids.sort();
    ids.dedup();

    let mut entries = Vec::new();
    let mut keystones_with_gaps = 0;

    for id in &ids {
        let Ok(entity) = store.get_entity(id) else {
            continue;
        };
        let metrics = store.get_metrics(id).ok();
        let (pagerank, in_degree) = metrics
            .as_ref()
            .map(|m| (m.pagerank, m.in_degree))
            .unwrap_or((0.0, 0));
        let is_keystone = pagerank >= metrics_config.keystone_threshold;
        let coverage_percent = store
            .get_coverage(id)
            .map(|c| c.coverage_percent)
            .unwrap_or(0.0);
        if is_keystone && coverage_percent < gap_threshold {
            keystones_with_gaps += 1;
        }

        let covering_tests = store
            .tests_covering(id)?
            .into_iter()
            .map(|(_, test_name)| test_name)
            .collect();

        entries.push(ImpactEntry {
            entity_id: entity.id,
            name: entity.name,
            file_path: entity.file_path,
            coverage_percent,
            pagerank,
            in_degree,
            is_keystone,
            covering_tests,
        });
    }

    entries.sort_by(|a, b| b.pagerank.total_cmp(&a.pagerank));
    Ok(ImpactReport {
        target: target.to_string(),
        entries,
        keystones_with_gaps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_score_formula() {
        assert_eq!(risk_score(0.0, 0.5, 10), 5.5);
    }

    #[test]
    fn tier_ladder_first_match_wins() {
        // keystone_threshold 0.30, bottleneck_threshold 0.20 assumed by
        // callers; tier() takes the resolved booleans.
        assert_eq!(tier(15.0, true, false, 15), Priority::Critical);
        assert_eq!(tier(22.0, false, true, 8), Priority::High);
        assert_eq!(tier(20.0, false, false, 6), Priority::Medium);
        assert_eq!(tier(40.0, false, false, 0), Priority::Low);
    }

    #[test]
    fn tier_edge_cases() {
        // Keystone at 35% coverage: high, not critical.
        assert_eq!(tier(35.0, true, false, 0), Priority::High);
        // Fan-in without centrality: medium.
        assert_eq!(tier(15.0, false, false, 8), Priority::Medium);
        // Low fan-in, moderate coverage: low.
        assert_eq!(tier(40.0, false, false, 2), Priority::Low);
        // Keystone with >= 50% coverage still lands medium.
        assert_eq!(tier(60.0, true, false, 0), Priority::Medium);
        // Bottleneck between 25 and 50: medium.
        assert_eq!(tier(40.0, false, true, 0), Priority::Medium);
    }
}
