//! Budgeted ring scan over the visible viewport.
//!
//! The world oracle only answers point queries, so discovering what is on
//! screen means asking tile by tile. [`RingScanner`] walks outward from the
//! viewport center in square rings and stops when either the outermost ring
//! is done or the [`QueryBudget`] runs out.
//!
//! # Per-tile pipeline
//!
//! ```text
//! query(tile) ─► None ──────────────────────────────► next tile
//!      │
//!      ▼
//! identity key ─► seen this cycle? ─► discard (duplicates++)
//!      │
//!      ▼
//! position ─► unresolvable? ─► discard
//!      │
//!      ▼
//! score query at position ─► score < threshold? ─► discard (counted)
//!      │
//!      ▼
//!   accepted
//! ```
//!
//! Walking center-first means that when the budget runs out, the tiles
//! nearest the camera are the ones that got covered.

mod diagnostics;
mod ring;

pub use diagnostics::{ScanDiagnostics, DEBUG_TRACE_CAPACITY, SAMPLE_SCORE_CAPACITY};
pub use ring::RingWalk;

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, trace};

use crate::coord::{CoordinateNormalizer, UnitClassifier};
use crate::geometry::{TileRect, Viewport};
use crate::host::{EntityRecord, WorldOracle};
use crate::resolver::{EntityResolver, FieldLookup};

/// Default ceiling on geometry point-queries per cycle.
pub const DEFAULT_QUERY_BUDGET: u32 = 2200;

/// Per-cycle ceiling on point-queries.
///
/// The budget object outlives cycles; [`QueryBudget::reset`] is called at the
/// start of each one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryBudget {
    limit: u32,
    used: u32,
}

impl QueryBudget {
    /// Create a budget with the given limit.
    pub fn new(limit: u32) -> Self {
        Self { limit, used: 0 }
    }

    /// Spend one query if any remain.
    pub fn try_consume(&mut self) -> bool {
        if self.used >= self.limit {
            return false;
        }
        self.used += 1;
        true
    }

    /// Restore the full budget.
    pub fn reset(&mut self) {
        self.used = 0;
    }

    /// Queries spent since the last reset.
    pub fn used(&self) -> u32 {
        self.used
    }

    /// The configured ceiling.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Queries left.
    pub fn remaining(&self) -> u32 {
        self.limit - self.used
    }

    /// Whether no queries remain.
    pub fn is_exhausted(&self) -> bool {
        self.used >= self.limit
    }
}

impl Default for QueryBudget {
    fn default() -> Self {
        Self::new(DEFAULT_QUERY_BUDGET)
    }
}

/// An entity accepted during the current cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredEntity {
    pub identity_key: String,
    pub tile_x: f64,
    pub tile_y: f64,
    pub score: Option<f64>,
    pub level: Option<f64>,
    pub type_id: Option<f64>,
}

/// A discovered entity together with the host record it came from.
///
/// The record is kept so the projector can ask the host for its screen
/// rectangle.
pub struct Discovery {
    pub entity: DiscoveredEntity,
    pub record: Box<dyn EntityRecord>,
}

impl std::fmt::Debug for Discovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Discovery")
            .field("entity", &self.entity)
            .finish_non_exhaustive()
    }
}

/// Everything a scan needs from the current cycle.
pub struct ScanContext<'a, C: UnitClassifier> {
    /// Continuous viewport, for visibility accounting.
    pub viewport: Viewport,
    /// Tiles to walk.
    pub tiles: TileRect,
    pub normalizer: &'a CoordinateNormalizer<C>,
    /// Geometry/identity backend.
    pub geometry: &'a dyn WorldOracle,
    /// Score backend.
    pub scores: &'a dyn WorldOracle,
    /// Minimum accepted score, inclusive.
    pub score_threshold: f64,
}

/// Result of one scan.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Accepted entities in discovery order.
    pub entities: Vec<Discovery>,
    /// In-viewport tiles visited (queried or not).
    pub tiles_visited: u64,
    /// Whether the scan stopped early for lack of budget.
    pub budget_exhausted: bool,
}

/// Center-outward budgeted scanner.
#[derive(Debug, Clone, Default)]
pub struct RingScanner {
    resolver: EntityResolver,
}

impl RingScanner {
    /// Create a scanner using the given resolver.
    pub fn new(resolver: EntityResolver) -> Self {
        Self { resolver }
    }

    /// The resolver used to interpret oracle records.
    pub fn resolver(&self) -> &EntityResolver {
        &self.resolver
    }

    /// Scan the context's tiles.
    ///
    /// Never issues more geometry queries than `budget` allows. Per-tile
    /// failures are counted in `diag` and skipped.
    pub fn scan<C: UnitClassifier>(
        &self,
        ctx: &ScanContext<'_, C>,
        budget: &mut QueryBudget,
        diag: &mut ScanDiagnostics,
    ) -> ScanOutcome {
        let rect = ctx.tiles;
        let center = rect.center();
        let max_radius = rect.max_radius_from(center);

        let mut outcome = ScanOutcome::default();
        let mut seen: HashSet<String> = HashSet::new();

        for (tx, ty) in RingWalk::new(center, max_radius) {
            if !rect.contains(tx, ty) {
                continue;
            }
            if !budget.try_consume() {
                outcome.budget_exhausted = true;
                break;
            }
            outcome.tiles_visited += 1;
            diag.queries_issued += 1;

            let record = match ctx.geometry.query_point(tx, ty) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => {
                    diag.query_errors += 1;
                    trace!(tile_x = tx, tile_y = ty, error = %e, "Point query failed");
                    continue;
                }
            };

            if let Some(discovery) = self.examine(ctx, record, &mut seen, diag) {
                outcome.entities.push(discovery);
            }
        }

        diag.budget_exhausted = outcome.budget_exhausted;
        debug!(
            tiles = rect.tile_count(),
            visited = outcome.tiles_visited,
            queries = budget.used(),
            budget = budget.limit(),
            accepted = outcome.entities.len(),
            exhausted = outcome.budget_exhausted,
            "Ring scan complete"
        );
        outcome
    }

    /// Run one oracle hit through identity, position and score checks.
    fn examine<C: UnitClassifier>(
        &self,
        ctx: &ScanContext<'_, C>,
        record: Box<dyn EntityRecord>,
        seen: &mut HashSet<String>,
        diag: &mut ScanDiagnostics,
    ) -> Option<Discovery> {
        let oracle_id = self.resolver.identity(record.as_ref());
        let position = self
            .resolver
            .position(record.as_ref())
            .map(|(x, y)| ctx.normalizer.point_to_tile(x, y));

        let key = match (&oracle_id, position) {
            (Some(id), _) => id.clone(),
            (None, Some((x, y))) => format!("{}:{}", x.floor() as i64, y.floor() as i64),
            (None, None) => return None,
        };
        if !seen.insert(key.clone()) {
            diag.duplicates += 1;
            return None;
        }
        let (tile_x, tile_y) = position?;
        diag.scanned += 1;
        diag.has_position += 1;
        if ctx.viewport.contains(tile_x, tile_y) {
            diag.visible += 1;
        }

        let score_record = self.score_record(ctx, tile_x, tile_y, diag);
        let lookup = self.lookup_score(score_record.as_deref(), record.as_ref());
        let score = match lookup {
            FieldLookup::Found(score) => {
                diag.record_score(score);
                Some(score)
            }
            FieldLookup::Zero => {
                diag.zero_score += 1;
                None
            }
            FieldLookup::Missing => {
                diag.null_score += 1;
                None
            }
        };

        let passes = match score {
            Some(s) => s >= ctx.score_threshold,
            None => ctx.score_threshold <= 0.0,
        };
        if !passes {
            trace!(key = %key, score = ?score, threshold = ctx.score_threshold, "Below threshold");
            return None;
        }

        let level = self
            .resolver
            .level(record.as_ref())
            .or_else(|| score_record.as_deref().and_then(|r| self.resolver.level(r)));
        let type_id = self
            .resolver
            .type_id(record.as_ref())
            .or_else(|| score_record.as_deref().and_then(|r| self.resolver.type_id(r)));

        Some(Discovery {
            entity: DiscoveredEntity {
                identity_key: key,
                tile_x,
                tile_y,
                score,
                level,
                type_id,
            },
            record,
        })
    }

    /// Second point-query, against the score backend, at the resolved position.
    fn score_record<C: UnitClassifier>(
        &self,
        ctx: &ScanContext<'_, C>,
        tile_x: f64,
        tile_y: f64,
        diag: &mut ScanDiagnostics,
    ) -> Option<Box<dyn EntityRecord>> {
        diag.score_queries += 1;
        let (qx, qy) = (tile_x.floor() as i64, tile_y.floor() as i64);
        match ctx.scores.query_point(qx, qy) {
            Ok(found) => found,
            Err(e) => {
                diag.query_errors += 1;
                trace!(tile_x = qx, tile_y = qy, error = %e, "Score query failed");
                None
            }
        }
    }

    /// Score from the score backend, falling back to the geometry record.
    fn lookup_score(
        &self,
        score_record: Option<&dyn EntityRecord>,
        geometry_record: &dyn EntityRecord,
    ) -> FieldLookup {
        let primary = score_record.map_or(FieldLookup::Missing, |r| self.resolver.score(r));
        if let FieldLookup::Found(_) = primary {
            return primary;
        }
        match self.resolver.score(geometry_record) {
            found @ FieldLookup::Found(_) => found,
            FieldLookup::Zero => FieldLookup::Zero,
            FieldLookup::Missing => primary,
        }
    }
}
