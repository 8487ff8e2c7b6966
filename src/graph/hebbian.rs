//! Hebbian edge strengthening, idle decay, and homeostatic scaling.
//!
//! Every pair of nodes activated by the same memory gets its edge
//! strengthened asymptotically toward `max_weight`:
//!
//! ```text
//! w' = clamp(w + (max - w) * learning_rate, min, max)
//! ```
//!
//! Every `homeostatic_interval` co-activations the engine also runs two
//! maintenance passes: idle decay (edges untouched for longer than the idle
//! threshold lose a fixed fraction of their weight) and homeostatic scaling
//! (nodes whose incident weight exceeds the target budget have all their
//! edges scaled down proportionally).

use rusqlite::{params, OptionalExtension};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

use super::nodes::canonical_pair;
use super::types::{now_epoch, now_rfc3339};
use crate::config::HebbianConfig;
use crate::db::{Backends, DualStore};
use crate::error::Result;

/// Bounds on the homeostatic scale factor.
const SCALE_FLOOR: f64 = 0.5;
const SCALE_CEILING: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct HebbianParams {
    pub learning_rate: f64,
    pub min_weight: f64,
    pub max_weight: f64,
    pub initial_weight: f64,
    pub target_total: f64,
    pub scaling_rate: f64,
    pub idle_threshold_secs: f64,
    pub idle_decay_rate: f64,
    pub homeostatic_interval: u64,
}

impl From<&HebbianConfig> for HebbianParams {
    fn from(c: &HebbianConfig) -> Self {
        Self {
            learning_rate: c.learning_rate,
            min_weight: c.min_weight,
            max_weight: c.max_weight,
            initial_weight: c.initial_edge_weight,
            target_total: c.target_total_weight,
            scaling_rate: c.scaling_rate,
            idle_threshold_secs: c.idle_threshold_secs as f64,
            idle_decay_rate: c.idle_decay_rate,
            homeostatic_interval: c.homeostatic_interval,
        }
    }
}

impl Default for HebbianParams {
    fn default() -> Self {
        Self::from(&HebbianConfig::default())
    }
}

// ── Pure weight laws ─────────────────────────────────────────────────────────

/// Asymptotic strengthening. Gains shrink as `w` approaches the ceiling.
pub fn strengthened_weight(w: f64, p: &HebbianParams) -> f64 {
    let delta = (p.max_weight - w) * p.learning_rate;
    (w + delta).clamp(p.min_weight, p.max_weight)
}

/// One idle-decay tick, floored at `min_weight`.
pub fn idle_decayed_weight(w: f64, p: &HebbianParams) -> f64 {
    (w * (1.0 - p.idle_decay_rate)).max(p.min_weight)
}

/// Scale factor for a node whose incident weights sum to `total`, or `None`
/// when the node is within budget.
pub fn homeostatic_scale(total: f64, p: &HebbianParams) -> Option<f64> {
    if total <= p.target_total || total <= 0.0 {
        return None;
    }
    let scale = 1.0 - p.scaling_rate * (total - p.target_total) / total;
    Some(scale.clamp(SCALE_FLOOR, SCALE_CEILING))
}

/// What a periodic maintenance pass changed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MaintenanceReport {
    pub idle_decayed: usize,
    pub nodes_scaled: usize,
}

pub struct HebbianEngine {
    store: DualStore,
    params: HebbianParams,
    coactivations: AtomicU64,
}

impl HebbianEngine {
    pub fn new(store: DualStore, params: HebbianParams) -> Self {
        Self {
            store,
            params,
            coactivations: AtomicU64::new(0),
        }
    }

    pub fn params(&self) -> &HebbianParams {
        &self.params
    }

    /// Saves seen since the process started.
    pub fn coactivation_count(&self) -> u64 {
        self.coactivations.load(Ordering::Relaxed)
    }

    /// Strengthen one edge, creating it at the initial weight if absent.
    /// Returns the new weight.
    pub fn strengthen_pair(&self, b: &Backends, a: i64, c: i64) -> Result<f64> {
        let (source, target) = canonical_pair(a, c);
        let now = now_epoch();
        let entity = format!("edge {source}-{target}");

        let current: Option<f64> = b
            .durable()
            .query_row(
                "SELECT weight FROM edges WHERE source_id = ?1 AND target_id = ?2",
                [source, target],
                |r| r.get(0),
            )
            .optional()?;

        let weight = match current {
            None => {
                let w = self.params.initial_weight;
                b.write(
                    &entity,
                    "INSERT INTO edges
                         (source_id, target_id, weight, co_activation_count,
                          last_strengthened, last_coactivated, created_at)
                     VALUES (?1, ?2, ?3, 1, ?4, ?4, ?5)",
                    params![source, target, w, now, now_rfc3339()],
                )?;
                w
            }
            Some(w) => {
                let next = strengthened_weight(w, &self.params);
                b.write(
                    &entity,
                    "UPDATE edges
                        SET weight = ?3,
                            co_activation_count = co_activation_count + 1,
                            last_strengthened = ?4,
                            last_coactivated = ?4
                      WHERE source_id = ?1 AND target_id = ?2",
                    params![source, target, next, now],
                )?;
                next
            }
        };
        Ok(weight)
    }

    /// Strengthen every unordered pair in `node_rows`. Duplicates are ignored.
    /// Returns the number of pairs touched.
    pub fn strengthen_all(&self, b: &Backends, node_rows: &[i64]) -> Result<usize> {
        let unique: Vec<i64> = node_rows.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        let mut pairs = 0;
        for (i, &a) in unique.iter().enumerate() {
            for &c in &unique[i + 1..] {
                self.strengthen_pair(b, a, c)?;
                pairs += 1;
            }
        }
        debug!(nodes = unique.len(), pairs, "strengthened co-activated edges");
        Ok(pairs)
    }

    /// Standalone strengthening under the guard, as its own unit of work.
    pub fn strengthen(&self, node_rows: &[i64]) -> Result<usize> {
        self.store
            .transaction("edge strengthening", |b| self.strengthen_all(b, node_rows))
    }

    /// Count one co-activation; every Nth runs idle decay and homeostatic scaling.
    pub fn record_coactivation(&self, b: &Backends) -> Result<Option<MaintenanceReport>> {
        let n = self.coactivations.fetch_add(1, Ordering::Relaxed) + 1;
        if n % self.params.homeostatic_interval != 0 {
            return Ok(None);
        }
        let report = MaintenanceReport {
            idle_decayed: self.apply_idle_decay(b, now_epoch())?,
            nodes_scaled: self.apply_homeostatic_scaling(b)?,
        };
        info!(
            coactivations = n,
            idle_decayed = report.idle_decayed,
            nodes_scaled = report.nodes_scaled,
            "hebbian maintenance"
        );
        Ok(Some(report))
    }

    /// Decay edges with no co-activation (falling back to last strengthening)
    /// within the idle threshold. Returns the number of edges changed.
    pub fn apply_idle_decay(&self, b: &Backends, now: f64) -> Result<usize> {
        let p = &self.params;
        b.write(
            "idle edge decay",
            "UPDATE edges
                SET weight = MAX(?1, weight * (1.0 - ?2))
              WHERE COALESCE(last_coactivated, last_strengthened, 0) < ?3
                AND weight > ?1",
            params![p.min_weight, p.idle_decay_rate, now - p.idle_threshold_secs],
        )
    }

    /// Scale down every edge of each node whose incident weight exceeds the
    /// target. Results stay within `[min_weight, max_weight]`.
    pub fn apply_homeostatic_scaling(&self, b: &Backends) -> Result<usize> {
        let totals: Vec<(i64, f64)> = {
            let mut stmt = b.durable().prepare(
                "SELECT node, SUM(weight) FROM (
                     SELECT source_id AS node, weight FROM edges
                     UNION ALL
                     SELECT target_id AS node, weight FROM edges
                 ) GROUP BY node",
            )?;
            let rows = stmt
                .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        let p = &self.params;
        let mut scaled = 0;
        for (node, total) in totals {
            let Some(scale) = homeostatic_scale(total, p) else {
                continue;
            };
            b.write(
                &format!("homeostatic scaling of node {node}"),
                "UPDATE edges
                    SET weight = MIN(?3, MAX(?2, weight * ?4))
                  WHERE source_id = ?1 OR target_id = ?1",
                params![node, p.min_weight, p.max_weight, scale],
            )?;
            debug!(node, total, scale, "homeostatic scaling");
            scaled += 1;
        }
        Ok(scaled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strengthening_is_monotonic_and_bounded() {
        let p = HebbianParams::default();
        let mut w = p.min_weight;
        while w < p.max_weight - 1e-3 {
            let next = strengthened_weight(w, &p);
            assert!(next > w, "{next} should exceed {w}");
            assert!(next <= p.max_weight);
            w = next;
        }
        assert_eq!(strengthened_weight(p.max_weight, &p), p.max_weight);
    }

    #[test]
    fn fifty_strengthenings_approach_but_never_reach_ceiling() {
        let p = HebbianParams::default();
        let mut w = 5.0;
        for _ in 0..50 {
            w = strengthened_weight(w, &p);
            assert!(w < 10.0);
        }
        // 10 - 5 * 0.9^50
        assert!((w - (10.0 - 5.0 * 0.9f64.powi(50))).abs() < 1e-9);
        assert!(w > 9.9);
    }

    #[test]
    fn idle_decay_respects_floor() {
        let p = HebbianParams::default();
        assert!((idle_decayed_weight(1.0, &p) - 0.98).abs() < 1e-12);
        assert_eq!(idle_decayed_weight(0.1, &p), 0.1);
        assert_eq!(idle_decayed_weight(0.101, &p), 0.1);
    }

    #[test]
    fn homeostatic_scale_only_over_budget() {
        let p = HebbianParams::default();
        assert_eq!(homeostatic_scale(50.0, &p), None);
        assert_eq!(homeostatic_scale(10.0, &p), None);
        let s = homeostatic_scale(100.0, &p).unwrap();
        assert!((s - 0.85).abs() < 1e-12);
        // extreme totals clamp at the floor
        let mut steep = p.clone();
        steep.scaling_rate = 1.0;
        assert_eq!(homeostatic_scale(1_000_000.0, &steep), Some(0.5));
    }
}
