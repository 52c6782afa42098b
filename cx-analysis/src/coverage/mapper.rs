//! Line-granular mapping of coverage blocks onto entities, plus the
//! aggregate and per-test import entry points.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use cx_core::config::CoverageConfig;
use cx_core::errors::CoverageError;
use cx_core::model::coverage::{CoverageBlock, EntityCoverage, TestEntityLink};
use cx_core::model::entity::EntityFilter;
use cx_storage::Store;

use super::paths;
use super::profile::{self, CoverageLayout};

/// What an aggregate import accomplished.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoverageSummary {
    pub blocks_total: usize,
    pub files_matched: usize,
    pub entities_mapped: usize,
}

/// Map blocks onto active entities, without persisting.
///
/// Blocks are grouped by normalized file; entities need a known
/// `line_end` to participate. Per line, any covered block wins over any
/// uncovered one.
pub fn map_blocks(
    store: &Store,
    blocks: &[CoverageBlock],
    config: &CoverageConfig,
) -> Result<(Vec<EntityCoverage>, CoverageSummary), CoverageError> {
    let mut by_file: FxHashMap<String, Vec<&CoverageBlock>> = FxHashMap::default();
    for block in blocks {
        let normalized = paths::normalize(&block.file, config.base_path.as_deref());
        by_file.entry(normalized).or_default().push(block);
    }

    let mut rows = Vec::new();
    let mut summary = CoverageSummary {
        blocks_total: blocks.len(),
        ..Default::default()
    };

    for (file, file_blocks) in &by_file {
        let entities = store.query_entities(&EntityFilter {
            file_path: Some(file.clone()),
            ..Default::default()
        })?;
        let with_ranges: Vec<_> = entities.iter().filter(|e| e.line_end.is_some()).collect();
        if with_ranges.is_empty() {
            continue;
        }
        summary.files_matched += 1;

        for entity in with_ranges {
            let line_end = entity.line_end.unwrap_or(entity.line_start);
            // Covered-wins merge across overlapping blocks.
            let mut line_state: BTreeMap<u32, bool> = BTreeMap::new();
            for block in file_blocks {
                let lo = block.start_line.max(entity.line_start);
                let hi = block.end_line.min(line_end);
                if hi < lo {
                    continue;
                }
                let covered = block.is_covered();
                for line in lo..=hi {
                    line_state
                        .entry(line)
                        .and_modify(|c| *c |= covered)
                        .or_insert(covered);
                }
            }
            if line_state.is_empty() {
                continue;
            }

            let covered_lines: Vec<u32> = line_state
                .iter()
                .filter(|(_, &c)| c)
                .map(|(&l, _)| l)
                .collect();
            let uncovered_lines: Vec<u32> = line_state
                .iter()
                .filter(|(_, &c)| !c)
                .map(|(&l, _)| l)
                .collect();

            rows.push(EntityCoverage {
                entity_id: entity.id.clone(),
                coverage_percent: EntityCoverage::percent_of(
                    covered_lines.len(),
                    uncovered_lines.len(),
                ),
                covered_lines,
                uncovered_lines,
                last_run: Utc::now(),
            });
        }
    }

    summary.entities_mapped = rows.len();
    Ok((rows, summary))
}

/// Import aggregate coverage from a text profile or binary directory,
/// persisting per-entity rows (replace-on-write).
pub fn import_profile(
    store: &Store,
    input: &Path,
    config: &CoverageConfig,
) -> Result<CoverageSummary, CoverageError> {
    let blocks = match profile::detect_layout(input)? {
        CoverageLayout::TextProfile(path) => profile::parse_profile_file(&path)?,
        CoverageLayout::BinaryDir(dir) => profile::convert_binary_dir(&dir)?,
        CoverageLayout::PerTestDirs(_) => {
            return Err(CoverageError::InvalidInput {
                message: format!(
                    "'{}' is a per-test layout; use the per-test import",
                    input.display()
                ),
            })
        }
    };

    let (rows, summary) = map_blocks(store, &blocks, config)?;
    store.upsert_coverage_bulk(&rows)?;
    debug!(
        "coverage import: {} blocks, {} files matched, {} entities",
        summary.blocks_total, summary.files_matched, summary.entities_mapped
    );
    Ok(summary)
}

/// Import per-test binary coverage: map each test's directory
/// independently; entities with any covered line form the test's
/// imprint. The whole test→entity map is rebuilt in one transaction.
/// A failing test directory is logged and skipped.
pub fn import_per_test(
    store: &Store,
    input: &Path,
    config: &CoverageConfig,
) -> Result<usize, CoverageError> {
    let dirs = match profile::detect_layout(input)? {
        CoverageLayout::PerTestDirs(dirs) => dirs,
        CoverageLayout::BinaryDir(dir) => {
            vec![(derive_test_name(&dir), dir)]
        }
        CoverageLayout::TextProfile(_) => {
            return Err(CoverageError::InvalidInput {
                message: "per-test import needs a binary directory layout".to_string(),
            })
        }
    };

    let mut links = Vec::new();
    let mut imported = 0;
    for (test_name, dir) in dirs {
        let blocks = match profile::convert_binary_dir(&dir) {
            Ok(blocks) => blocks,
            Err(e) => {
                warn!("per-test coverage for '{test_name}' failed: {e}, skipping");
                continue;
            }
        };
        let (rows, _) = map_blocks(store, &blocks, config)?;

        // TODO: derive the owning test file by scanning test sources
        // instead of the name-based placeholder.
        let test_file = format!("{test_name}_test.go");
        for row in rows {
            if !row.covered_lines.is_empty() {
                links.push(TestEntityLink {
                    test_file: test_file.clone(),
                    test_name: test_name.clone(),
                    entity_id: row.entity_id,
                });
            }
        }
        imported += 1;
    }

    store.replace_test_map(&links)?;
    debug!("per-test import: {imported} tests, {} links", links.len());
    Ok(imported)
}

fn derive_test_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
