//! Content analysis: scoring text against the node catalog.
//!
//! Per node, over the lowercased text:
//! - each keyword found at a word boundary adds 0.25, a bare substring match 0.10
//! - each prototype phrase found as a substring adds 0.35
//! - with a concept extractor, each keyword among the extracted concepts adds
//!   0.15; failing that, a node name among them adds 0.20
//!
//! Scores are capped at 1.0. Nodes at or above the threshold are returned
//! highest first, ties in catalog order. The catalog is fixed once loaded, so
//! the keyword patterns are compiled up front.

use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

use crate::augment::ConceptExtractor;
use crate::graph::types::{Activation, Node};

const KEYWORD_WORD_SCORE: f64 = 0.25;
const KEYWORD_SUBSTRING_SCORE: f64 = 0.10;
const PHRASE_SCORE: f64 = 0.35;
const CONCEPT_KEYWORD_BOOST: f64 = 0.15;
const CONCEPT_NODE_BOOST: f64 = 0.20;
const MAX_SCORE: f64 = 1.0;

/// Output of [`ContentAnalyzer::analyze`].
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub activations: Vec<Activation>,
    /// Concepts returned by the extractor, if one ran.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub concepts: Vec<String>,
}

struct Keyword {
    text: String,
    lowered: String,
    /// `None` when the keyword cannot form a valid pattern; substring only.
    pattern: Option<Regex>,
}

struct CompiledNode {
    node: Node,
    keywords: Vec<Keyword>,
    phrases: Vec<(String, String)>,
}

pub struct ContentAnalyzer {
    nodes: Vec<CompiledNode>,
    extractor: Arc<dyn ConceptExtractor>,
    default_threshold: f64,
}

impl ContentAnalyzer {
    pub fn new(nodes: Vec<Node>, extractor: Arc<dyn ConceptExtractor>, default_threshold: f64) -> Self {
        let nodes = nodes
            .into_iter()
            .map(|node| {
                let keywords = node
                    .keywords
                    .iter()
                    .filter(|k| !k.trim().is_empty())
                    .map(|k| {
                        let lowered = k.to_lowercase();
                        let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(&lowered))).ok();
                        Keyword {
                            text: k.clone(),
                            lowered,
                            pattern,
                        }
                    })
                    .collect();
                let phrases = node
                    .prototype_phrases
                    .iter()
                    .filter(|p| !p.trim().is_empty())
                    .map(|p| (p.clone(), p.to_lowercase()))
                    .collect();
                CompiledNode {
                    node,
                    keywords,
                    phrases,
                }
            })
            .collect();

        Self {
            nodes,
            extractor,
            default_threshold,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn default_threshold(&self) -> f64 {
        self.default_threshold
    }

    /// Score `text` against every node. No side effects.
    pub fn analyze(&self, text: &str, threshold: Option<f64>) -> Analysis {
        let threshold = threshold.unwrap_or(self.default_threshold);
        let lowered = text.to_lowercase();

        let concepts = if self.extractor.is_available() {
            match self.extractor.extract(text) {
                Ok(c) => c,
                Err(e) => {
                    warn!(error = %e, "concept extraction failed, scoring without boost");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };
        let concept_set = normalize_concepts(&concepts);

        let mut activations: Vec<Activation> = self
            .nodes
            .iter()
            .filter_map(|compiled| {
                let activation = score_node(compiled, &lowered, &concept_set);
                (activation.score >= threshold).then_some(activation)
            })
            .collect();

        // stable: ties keep catalog order
        activations.sort_by(|a, b| b.score.total_cmp(&a.score));

        Analysis {
            activations,
            concepts,
        }
    }
}

fn score_node(compiled: &CompiledNode, lowered: &str, concepts: &HashSet<String>) -> Activation {
    let mut score = 0.0;
    let mut matched_terms = Vec::new();

    for kw in &compiled.keywords {
        let at_boundary = kw.pattern.as_ref().is_some_and(|re| re.is_match(lowered));
        if at_boundary {
            score += KEYWORD_WORD_SCORE;
            matched_terms.push(kw.text.clone());
        } else if lowered.contains(&kw.lowered) {
            score += KEYWORD_SUBSTRING_SCORE;
            matched_terms.push(kw.text.clone());
        }
    }

    for (phrase, phrase_lowered) in &compiled.phrases {
        if lowered.contains(phrase_lowered.as_str()) {
            score += PHRASE_SCORE;
            matched_terms.push(format!("[phrase]{phrase}"));
        }
    }

    let mut concept_boosted = false;
    if !concepts.is_empty() {
        for kw in &compiled.keywords {
            if concepts.contains(&kw.lowered) {
                score += CONCEPT_KEYWORD_BOOST;
                matched_terms.push(format!("[concept]{}", kw.text));
                concept_boosted = true;
            }
        }
        let name = compiled.node.name.to_lowercase();
        if !concept_boosted && (concepts.contains(&name) || concepts.contains(&name.replace(' ', ""))) {
            score += CONCEPT_NODE_BOOST;
            matched_terms.push(format!("[concept-node]{}", compiled.node.name));
            concept_boosted = true;
        }
    }

    Activation {
        node_row: compiled.node.id,
        node_id: compiled.node.node_id.clone(),
        name: compiled.node.name.clone(),
        category: compiled.node.category.clone(),
        score: score.min(MAX_SCORE),
        matched_terms,
        concept_boosted,
    }
}

/// Lowercased concepts, with `_` read both as a space and as nothing.
fn normalize_concepts(concepts: &[String]) -> HashSet<String> {
    let mut set = HashSet::new();
    for concept in concepts {
        let lowered = concept.trim().to_lowercase();
        if lowered.is_empty() {
            continue;
        }
        set.insert(lowered.replace('_', " "));
        set.insert(lowered.replace('_', ""));
        set.insert(lowered);
    }
    set
}
