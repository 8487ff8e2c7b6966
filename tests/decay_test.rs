mod helpers;

use rusqlite::params;

use synaptic::config::SynapticConfig;
use synaptic::graph::decay::{effective_importance, DecayParams};
use synaptic::graph::nodes::get_edge;
use synaptic::mind::QueryRequest;

fn query(mind: &synaptic::mind::Mind, node: &str, include_decayed: bool) -> Vec<String> {
    mind.query(QueryRequest {
        node_names: vec![node.into()],
        include_decayed,
        ..QueryRequest::default()
    })
    .unwrap()
    .memories
    .into_iter()
    .map(|m| m.memory_id)
    .collect()
}

#[test]
fn long_unused_memory_drops_out_of_queries() {
    let mind = helpers::test_mind();
    let store = mind.store();
    let old = helpers::save(&mind, helpers::SCENARIO_TEXT);
    let fresh = helpers::save(&mind, "A new microservices architecture document");
    helpers::age_memory(store, &old, 400.0);

    let stats = mind.decay().run_sweep().unwrap();
    assert_eq!(stats.memories_swept, 2);
    assert_eq!(stats.memories_decayed, 1);

    let decayed = helpers::effective_importance(store, &old);
    assert!((decayed - 0.5 * (-2.0f64).exp()).abs() < 1e-3, "got {decayed}");
    assert!(decayed < 0.1);

    let visible = query(&mind, "Architecture", false);
    assert_eq!(visible, vec![fresh.clone()]);

    let everything = query(&mind, "Architecture", true);
    assert_eq!(everything.len(), 2);
    assert!(everything.contains(&old));
}

#[test]
fn hundred_day_memory_is_still_above_threshold() {
    // 0.5 * exp(-0.01 * 0.5 * 100) is about 0.303
    let p = DecayParams::default();
    let value = effective_importance(0.5, 100.0, &p);
    assert!((value - 0.3033).abs() < 1e-3);
    assert!(value > p.threshold);
}

#[test]
fn immortal_memories_never_decay() {
    let mind = helpers::test_mind();
    let store = mind.store();
    let id = helpers::save_with_importance(&mind, helpers::SCENARIO_TEXT, 0.95);
    helpers::age_memory(store, &id, 10_000.0);

    let stats = mind.decay().run_sweep().unwrap();
    assert_eq!(stats.memories_immortal, 1);
    assert_eq!(stats.memories_decayed, 0);
    assert_eq!(helpers::effective_importance(store, &id), 0.95);
    assert_eq!(query(&mind, "Deployment", false), vec![id]);
}

#[test]
fn query_touch_restores_importance() {
    let mind = helpers::test_mind();
    let store = mind.store();
    let id = helpers::save(&mind, helpers::SCENARIO_TEXT);
    helpers::age_memory(store, &id, 400.0);
    mind.decay().run_sweep().unwrap();
    assert!(helpers::effective_importance(store, &id) < 0.1);

    // No runtime here, so the touch runs inline.
    assert_eq!(query(&mind, "Architecture", true), vec![id.clone()]);

    let (access_count, effective): (i64, f64) = store
        .read(|conn| {
            Ok(conn.query_row(
                "SELECT access_count, effective_importance FROM memories WHERE memory_id = ?1",
                [&id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )?)
        })
        .unwrap();
    assert_eq!(access_count, 1);
    assert_eq!(effective, 0.5);
    assert_eq!(query(&mind, "Architecture", false), vec![id]);
}

#[test]
fn sweep_decays_stale_edges_toward_floor() {
    let mind = helpers::test_mind();
    let store = mind.store();
    let arch = helpers::node_row(store, "Architecture");
    let deploy = helpers::node_row(store, "Deployment");
    store
        .write(
            "test weight",
            "UPDATE edges SET weight = 5.0 WHERE source_id = ?1 AND target_id = ?2",
            params![arch.min(deploy), arch.max(deploy)],
        )
        .unwrap();
    helpers::age_edge(store, arch, deploy, 100.0);

    let stats = mind.decay().run_sweep().unwrap();
    assert_eq!(stats.edges_swept, 1);
    assert_eq!(stats.edges_updated, 1);

    let weight = store
        .read(|conn| get_edge(conn, arch, deploy))
        .unwrap()
        .unwrap()
        .weight;
    let expected = 0.1 + 4.9 * (-0.5f64).exp();
    assert!((weight - expected).abs() < 1e-6, "got {weight}");
}

#[test]
fn unchanged_values_are_not_rewritten() {
    let mind = helpers::test_mind();
    helpers::save(&mind, helpers::SCENARIO_TEXT);

    mind.decay().run_sweep().unwrap();
    let second = mind.decay().run_sweep().unwrap();
    assert_eq!(second.memories_swept, 1);
    assert_eq!(second.memories_updated, 0);
    assert_eq!(mind.decay().status().sweep_count, 2);
}

#[test]
fn disabled_decay_keeps_decayed_memories_visible() {
    let mut config = SynapticConfig::default();
    config.decay.enabled = false;
    let mind = helpers::mind_with(helpers::test_store(), config);
    let id = helpers::save(&mind, helpers::SCENARIO_TEXT);
    helpers::age_memory(mind.store(), &id, 400.0);

    let stats = mind.decay().run_sweep().unwrap();
    assert_eq!(stats.memories_swept, 0);
    assert_eq!(query(&mind, "Architecture", false), vec![id]);
}

#[test]
fn decay_stats_classify_memories_and_edges() {
    let mind = helpers::test_mind();
    let store = mind.store();
    let old = helpers::save(&mind, helpers::SCENARIO_TEXT);
    helpers::save_with_importance(&mind, helpers::SCENARIO_TEXT, 0.9);
    helpers::save(&mind, helpers::SCENARIO_TEXT);
    helpers::age_memory(store, &old, 400.0);
    mind.decay().run_sweep().unwrap();

    let stats = mind.decay().stats().unwrap();
    assert_eq!(stats.memories_total, 3);
    assert_eq!(stats.memories_immortal, 1);
    assert_eq!(stats.memories_decayed, 1);
    assert_eq!(stats.memories_active, 1);
    // the three seeded engineering edges; only Architecture-Deployment was strengthened
    assert_eq!(stats.edges_total, 3);
    assert_eq!(stats.edges_at_minimum, 2);
    assert!(stats.last_sweep.is_some());
}
