//! Temporal decay of memories and edges.
//!
//! Two exponential laws, applied by a periodic sweep:
//!
//! ```text
//! memory: effective = importance * exp(-base_rate * (1 - importance) * days_since_access)
//! edge:   weight'   = min + (weight - min) * exp(-edge_rate * days_since_strengthened)
//! ```
//!
//! Memories at or above the immortal threshold never decay. Memories whose
//! effective importance drops below the decay threshold are hidden from
//! default queries but kept. Edges at or below the floor are skipped.
//!
//! The sweep holds the store guard for its whole duration and only writes
//! rows whose value moved by more than [`CHANGE_EPSILON`].

use chrono::{DateTime, NaiveDateTime, Utc};
use parking_lot::Mutex;
use rusqlite::params;
use rusqlite::types::ValueRef;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::types::now_epoch;
use crate::config::DecayConfig;
use crate::db::{count_rows, DualStore};
use crate::error::Result;

/// Smallest change worth writing back.
pub const CHANGE_EPSILON: f64 = 1e-4;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecayParams {
    pub enabled: bool,
    pub base_rate: f64,
    pub threshold: f64,
    pub immortal_threshold: f64,
    #[serde(skip)]
    pub sweep_interval: Duration,
    pub edge_decay_enabled: bool,
    pub edge_decay_rate: f64,
    pub edge_min_weight: f64,
}

impl From<&DecayConfig> for DecayParams {
    fn from(c: &DecayConfig) -> Self {
        Self {
            enabled: c.enabled,
            base_rate: c.base_rate,
            threshold: c.threshold,
            immortal_threshold: c.immortal_threshold,
            sweep_interval: Duration::from_secs(c.sweep_interval_minutes * 60),
            edge_decay_enabled: c.edge_decay_enabled,
            edge_decay_rate: c.edge_decay_rate,
            edge_min_weight: c.edge_decay_min_weight,
        }
    }
}

impl Default for DecayParams {
    fn default() -> Self {
        Self::from(&DecayConfig::default())
    }
}

// ── Decay laws ───────────────────────────────────────────────────────────────

/// Effective importance after `days` without access.
pub fn effective_importance(importance: f64, days: f64, p: &DecayParams) -> f64 {
    if importance >= p.immortal_threshold || days <= 0.0 {
        return importance;
    }
    importance * (-p.base_rate * (1.0 - importance) * days).exp()
}

/// Edge weight after `days` without strengthening. Never below the floor.
pub fn decayed_edge_weight(weight: f64, days: f64, p: &DecayParams) -> f64 {
    if weight <= p.edge_min_weight || days <= 0.0 {
        return weight;
    }
    p.edge_min_weight + (weight - p.edge_min_weight) * (-p.edge_decay_rate * days).exp()
}

// ── Timestamps ───────────────────────────────────────────────────────────────

/// Epoch seconds from a stored timestamp: a number, a numeric string,
/// `YYYY-MM-DD HH:MM:SS[.f]`, `YYYY-MM-DDTHH:MM:SS[.f]`, or RFC 3339.
pub fn parse_timestamp(value: ValueRef<'_>) -> Option<f64> {
    match value {
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Real(r) => Some(r),
        ValueRef::Text(bytes) => parse_timestamp_str(std::str::from_utf8(bytes).ok()?),
        ValueRef::Null | ValueRef::Blob(_) => None,
    }
}

pub fn parse_timestamp_str(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if let Ok(n) = s.parse::<f64>() {
        return n.is_finite().then_some(n);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(micros_to_epoch(dt.timestamp_micros()));
    }
    for fmt in [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(micros_to_epoch(naive.and_utc().timestamp_micros()));
        }
    }
    None
}

fn micros_to_epoch(micros: i64) -> f64 {
    micros as f64 / 1_000_000.0
}

fn days_between(then: f64, now: f64) -> f64 {
    (now - then) / SECONDS_PER_DAY
}

// ── Sweep ────────────────────────────────────────────────────────────────────

/// What one sweep did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepStats {
    pub timestamp: String,
    pub memories_swept: usize,
    pub memories_updated: usize,
    pub memories_decayed: usize,
    pub memories_immortal: usize,
    pub edges_swept: usize,
    pub edges_updated: usize,
    pub edges_at_floor: usize,
    pub duration_ms: u64,
}

/// Engine configuration and sweep history.
#[derive(Debug, Clone, Serialize)]
pub struct DecayStatus {
    pub params: DecayParams,
    pub sweep_interval_minutes: u64,
    pub running: bool,
    pub sweep_count: u64,
    pub last_sweep_at: Option<String>,
}

/// Counts over the current memories and edges.
#[derive(Debug, Clone, Serialize)]
pub struct DecayStats {
    pub memories_total: i64,
    pub memories_immortal: i64,
    pub memories_active: i64,
    pub memories_decayed: i64,
    pub edges_total: i64,
    pub edges_at_minimum: i64,
    pub edges_above_minimum: i64,
    pub average_edge_weight: f64,
    pub last_sweep: Option<SweepStats>,
}

#[derive(Default)]
struct SweepState {
    sweep_count: u64,
    last_sweep: Option<SweepStats>,
}

/// Clears the running flag when a sweep ends, including by error.
struct RunningFlag<'a>(&'a AtomicBool);

impl<'a> RunningFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for RunningFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct DecayEngine {
    store: DualStore,
    params: Arc<DecayParams>,
    state: Arc<Mutex<SweepState>>,
    running: Arc<AtomicBool>,
}

struct MemoryRow {
    memory_id: String,
    importance: f64,
    last_seen: Option<f64>,
    stored: Option<f64>,
}

struct EdgeRow {
    source_id: i64,
    target_id: i64,
    weight: f64,
    last_strengthened: Option<f64>,
}

impl DecayEngine {
    pub fn new(store: DualStore, params: DecayParams) -> Self {
        Self {
            store,
            params: Arc::new(params),
            state: Arc::new(Mutex::new(SweepState::default())),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn params(&self) -> &DecayParams {
        &self.params
    }

    /// Whether a sweep would do anything at all.
    pub fn is_active(&self) -> bool {
        self.params.enabled || self.params.edge_decay_enabled
    }

    /// Recompute effective importance and edge weights from elapsed time.
    pub fn run_sweep(&self) -> Result<SweepStats> {
        let _running = RunningFlag::raise(&self.running);
        let started = Instant::now();
        let p = &*self.params;

        let mut stats = self.store.transaction("decay sweep", |b| {
            let conn = b.durable();
            let now = now_epoch();
            let mut stats = SweepStats::default();

            if p.enabled {
                let rows: Vec<MemoryRow> = {
                    let mut stmt = conn.prepare(
                        "SELECT memory_id, importance, last_accessed, created_at, effective_importance
                           FROM memories",
                    )?;
                    let rows = stmt
                        .query_map([], |r| {
                            Ok(MemoryRow {
                                memory_id: r.get(0)?,
                                importance: r.get(1)?,
                                last_seen: parse_timestamp(r.get_ref(2)?)
                                    .or(parse_timestamp(r.get_ref(3)?)),
                                stored: r.get(4)?,
                            })
                        })?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    rows
                };

                for row in rows {
                    stats.memories_swept += 1;
                    let effective = if row.importance >= p.immortal_threshold {
                        stats.memories_immortal += 1;
                        row.importance
                    } else {
                        let days = row.last_seen.map_or(0.0, |t| days_between(t, now));
                        effective_importance(row.importance, days, p)
                    };
                    if row.importance < p.immortal_threshold && effective < p.threshold {
                        stats.memories_decayed += 1;
                    }
                    let changed = row.stored.map_or(true, |s| (s - effective).abs() > CHANGE_EPSILON);
                    if changed {
                        b.write(
                            &format!("memory {}", row.memory_id),
                            "UPDATE memories SET effective_importance = ?2 WHERE memory_id = ?1",
                            params![row.memory_id, effective],
                        )?;
                        stats.memories_updated += 1;
                    }
                }
            }

            if p.edge_decay_enabled {
                let rows: Vec<EdgeRow> = {
                    let mut stmt = conn.prepare(
                        "SELECT source_id, target_id, weight, last_strengthened
                           FROM edges WHERE weight > ?1",
                    )?;
                    let rows = stmt
                        .query_map([p.edge_min_weight], |r| {
                            Ok(EdgeRow {
                                source_id: r.get(0)?,
                                target_id: r.get(1)?,
                                weight: r.get(2)?,
                                last_strengthened: parse_timestamp(r.get_ref(3)?),
                            })
                        })?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    rows
                };

                for row in rows {
                    stats.edges_swept += 1;
                    let Some(then) = row.last_strengthened else {
                        continue;
                    };
                    let weight = decayed_edge_weight(row.weight, days_between(then, now), p);
                    if (weight - row.weight).abs() > CHANGE_EPSILON {
                        b.write(
                            &format!("edge {}-{}", row.source_id, row.target_id),
                            "UPDATE edges SET weight = ?3 WHERE source_id = ?1 AND target_id = ?2",
                            params![row.source_id, row.target_id, weight],
                        )?;
                        stats.edges_updated += 1;
                    }
                    if weight <= p.edge_min_weight + CHANGE_EPSILON {
                        stats.edges_at_floor += 1;
                    }
                }
            }
            Ok(stats)
        })?;

        stats.timestamp = Utc::now().to_rfc3339();
        stats.duration_ms = started.elapsed().as_millis() as u64;

        let mut state = self.state.lock();
        state.sweep_count += 1;
        state.last_sweep = Some(stats.clone());
        info!(
            sweep = state.sweep_count,
            memories_swept = stats.memories_swept,
            memories_updated = stats.memories_updated,
            memories_decayed = stats.memories_decayed,
            edges_swept = stats.edges_swept,
            edges_updated = stats.edges_updated,
            duration_ms = stats.duration_ms,
            "decay sweep complete"
        );
        Ok(stats)
    }

    /// Mark memories as accessed now. Resets their effective importance, since
    /// zero days have elapsed. Returns the number of rows touched.
    pub fn touch(&self, memory_ids: &[String]) -> Result<usize> {
        if memory_ids.is_empty() {
            return Ok(0);
        }
        let touched = self.store.transaction("touch", |b| {
            let now = now_epoch();
            let mut touched = 0;
            for id in memory_ids {
                touched += b.write(
                    &format!("memory {id}"),
                    "UPDATE memories
                        SET last_accessed = ?2,
                            access_count = COALESCE(access_count, 0) + 1,
                            effective_importance = importance
                      WHERE memory_id = ?1",
                    params![id, now],
                )?;
            }
            Ok(touched)
        })?;
        debug!(touched, "touched memories");
        Ok(touched)
    }

    pub fn status(&self) -> DecayStatus {
        let state = self.state.lock();
        DecayStatus {
            params: (*self.params).clone(),
            sweep_interval_minutes: self.params.sweep_interval.as_secs() / 60,
            running: self.running.load(Ordering::SeqCst),
            sweep_count: state.sweep_count,
            last_sweep_at: state.last_sweep.as_ref().map(|s| s.timestamp.clone()),
        }
    }

    pub fn stats(&self) -> Result<DecayStats> {
        let p = &*self.params;
        let last_sweep = self.state.lock().last_sweep.clone();
        self.store.read(|conn| {
            let memories_total = count_rows(conn, "memories")?;
            let (memories_immortal, memories_decayed): (i64, i64) = conn.query_row(
                "SELECT
                     COALESCE(SUM(importance >= ?1), 0),
                     COALESCE(SUM(importance < ?1 AND effective_importance < ?2), 0)
                   FROM memories",
                params![p.immortal_threshold, p.threshold],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )?;
            let (edges_total, edges_at_minimum, average): (i64, i64, Option<f64>) = conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(weight <= ?1), 0), AVG(weight) FROM edges",
                [p.edge_min_weight + CHANGE_EPSILON],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )?;
            Ok(DecayStats {
                memories_total,
                memories_immortal,
                memories_active: memories_total - memories_immortal - memories_decayed,
                memories_decayed,
                edges_total,
                edges_at_minimum,
                edges_above_minimum: edges_total - edges_at_minimum,
                average_edge_weight: average.unwrap_or(0.0),
                last_sweep,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immortal_memories_never_decay() {
        let p = DecayParams::default();
        for days in [0.0, 1.0, 365.0, 100_000.0] {
            assert_eq!(effective_importance(0.9, days, &p), 0.9);
            assert_eq!(effective_importance(1.0, days, &p), 1.0);
        }
    }

    #[test]
    fn memory_decay_follows_the_law() {
        let p = DecayParams::default();
        // 0.5 * exp(-0.01 * 0.5 * 100)
        let at_100 = effective_importance(0.5, 100.0, &p);
        assert!((at_100 - 0.5 * (-0.5f64).exp()).abs() < 1e-12);
        assert!(at_100 > p.threshold);
        // after 400 days the same memory is below the decay threshold
        assert!(effective_importance(0.5, 400.0, &p) < p.threshold);
        assert_eq!(effective_importance(0.5, 0.0, &p), 0.5);
        assert_eq!(effective_importance(0.5, -3.0, &p), 0.5);
    }

    #[test]
    fn higher_importance_decays_slower() {
        let p = DecayParams::default();
        let low = effective_importance(0.3, 30.0, &p) / 0.3;
        let high = effective_importance(0.8, 30.0, &p) / 0.8;
        assert!(high > low);
    }

    #[test]
    fn edge_decay_stays_within_bounds() {
        let p = DecayParams::default();
        for weight in [0.05, 0.1, 0.15, 1.0, 5.0, 10.0] {
            for days in [0.0, 0.5, 10.0, 1_000.0, 1e6] {
                let out = decayed_edge_weight(weight, days, &p);
                if weight <= p.edge_min_weight {
                    assert_eq!(out, weight);
                } else {
                    assert!(out >= p.edge_min_weight && out <= weight, "{weight} {days} {out}");
                }
            }
        }
        assert!(decayed_edge_weight(5.0, 10.0, &p) < 5.0);
    }

    #[test]
    fn parses_legacy_timestamps() {
        assert_eq!(parse_timestamp(ValueRef::Real(1.5)), Some(1.5));
        assert_eq!(parse_timestamp(ValueRef::Integer(7)), Some(7.0));
        assert_eq!(parse_timestamp(ValueRef::Null), None);
        assert_eq!(parse_timestamp_str("1704067200"), Some(1_704_067_200.0));
        assert_eq!(parse_timestamp_str("2024-01-01 00:00:00"), Some(1_704_067_200.0));
        assert_eq!(parse_timestamp_str("2024-01-01 00:00:00.5"), Some(1_704_067_200.5));
        assert_eq!(parse_timestamp_str("2024-01-01T00:00:00"), Some(1_704_067_200.0));
        assert_eq!(parse_timestamp_str("2024-01-01T01:00:00+01:00"), Some(1_704_067_200.0));
        assert_eq!(parse_timestamp_str("yesterday"), None);
    }
}
