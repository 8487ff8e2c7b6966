mod helpers;

use std::sync::Arc;

use synaptic::augment::{ConceptExtractor, NoSimilarity};
use synaptic::config::SynapticConfig;
use synaptic::error::Result;
use synaptic::mind::{Mind, SaveRequest};

struct StubConcepts;

impl ConceptExtractor for StubConcepts {
    fn extract(&self, _text: &str) -> Result<Vec<String>> {
        Ok(vec!["roadmap".into(), "JOY".into()])
    }
}

#[test]
fn scenario_activates_architecture_and_deployment() {
    let mind = helpers::test_mind();
    let analysis = mind.analyze(helpers::SCENARIO_TEXT, None).unwrap();
    let names: Vec<&str> = analysis.activations.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"Architecture"));
    assert!(names.contains(&"Deployment"));
    for activation in &analysis.activations {
        assert!(activation.score >= 0.6 - 1e-9);
    }
}

#[test]
fn analysis_is_deterministic_and_side_effect_free() {
    let mind = helpers::test_mind();
    let text = "Design review: plan the release, test coverage, and a happy team";
    let first = mind.analyze(text, Some(0.1)).unwrap();
    let second = mind.analyze(text, Some(0.1)).unwrap();
    assert_eq!(first.activations, second.activations);
    assert!(first
        .activations
        .windows(2)
        .all(|w| w[0].score >= w[1].score));
    assert_eq!(mind.status().unwrap().graph.memory_count, 0);
}

#[test]
fn zero_threshold_lists_the_whole_catalog() {
    let mind = helpers::test_mind();
    let analysis = mind.analyze("zzzz qqqq", Some(0.0)).unwrap();
    let names: Vec<&str> = analysis.activations.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["Architecture", "Deployment", "Testing", "Joy", "Planning"]);
}

#[test]
fn analyze_validates_input() {
    let mind = helpers::test_mind();
    assert!(mind.analyze("", None).is_err());
    assert!(mind.analyze("design", Some(1.5)).is_err());
    assert!(mind.analyze("design", Some(-0.1)).is_err());
}

#[test]
fn concept_extractor_boosts_matching_nodes() {
    let mind = Mind::with_parts(
        helpers::test_store(),
        SynapticConfig::default(),
        Arc::new(StubConcepts),
        Arc::new(NoSimilarity),
    )
    .unwrap();

    let analysis = mind.analyze("nothing on the surface", Some(0.1)).unwrap();
    assert_eq!(analysis.concepts, vec!["roadmap".to_string(), "JOY".to_string()]);

    let planning = analysis.activations.iter().find(|a| a.name == "Planning").unwrap();
    assert!(planning.concept_boosted);
    assert!(planning.matched_terms.contains(&"[concept]roadmap".to_string()));

    let joy = analysis.activations.iter().find(|a| a.name == "Joy").unwrap();
    assert!(joy.matched_terms.contains(&"[concept]joy".to_string()));
}

#[test]
fn saved_memory_records_the_analysis() {
    let mind = helpers::test_mind();
    let outcome = mind
        .save(SaveRequest {
            content: helpers::SCENARIO_TEXT.into(),
            summary: Some("services split".into()),
            source: Some("notes".into()),
            ..SaveRequest::default()
        })
        .unwrap();
    assert_eq!(outcome.summary, "services split");

    let stored = mind
        .store()
        .read(|conn| synaptic::graph::nodes::activations_for(conn, &outcome.memory_id))
        .unwrap();
    assert_eq!(stored.len(), outcome.activations.len());
    for activation in &outcome.activations {
        assert!(stored.iter().any(|s| s.node_id == activation.node_id && s.score == activation.score));
    }
}
