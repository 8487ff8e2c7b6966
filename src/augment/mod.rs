//! Optional augmentation services.
//!
//! Two capability interfaces the core can use but never depends on:
//! [`ConceptExtractor`] boosts analyzer scores, [`SimilaritySearch`] backs the
//! auxiliary similarity tools. Each has a no-op default chosen at construction
//! time by [`create_extractor`] / [`create_similarity`].
//! All methods are synchronous; async callers use `spawn_blocking`.

pub mod tether;

use serde_json::Value;

use crate::config::AugmentConfig;
use crate::error::{MindError, Result};

/// Extracts concept strings from free text.
pub trait ConceptExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Result<Vec<String>>;

    /// `false` for the no-op extractor, so the analyzer can skip the call.
    fn is_available(&self) -> bool {
        true
    }
}

/// Vector-similarity search over stored memories, served elsewhere.
pub trait SimilaritySearch: Send + Sync {
    fn search(&self, query: &str, top_k: usize) -> Result<Value>;

    fn status(&self) -> Result<Value>;

    fn is_available(&self) -> bool {
        true
    }
}

/// Extractor used when none is configured.
pub struct NoConcepts;

impl ConceptExtractor for NoConcepts {
    fn extract(&self, _text: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Similarity backend used when none is configured.
pub struct NoSimilarity;

impl SimilaritySearch for NoSimilarity {
    fn search(&self, _query: &str, _top_k: usize) -> Result<Value> {
        Err(MindError::Augment("similarity search is not configured".into()))
    }

    fn status(&self) -> Result<Value> {
        Ok(serde_json::json!({ "available": false, "reason": "not configured" }))
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Create the concept extractor named in config.
///
/// Only `"none"` ships with this crate; other extractors are injected through
/// `Mind::with_parts`.
pub fn create_extractor(config: &AugmentConfig) -> Result<Box<dyn ConceptExtractor>> {
    match config.concept_extractor.as_str() {
        "none" | "" => Ok(Box::new(NoConcepts)),
        other => Err(MindError::Config(format!(
            "unknown concept extractor: {other}. Supported: none"
        ))),
    }
}

/// Create the similarity backend: the TCP bridge when enabled, else the no-op.
pub fn create_similarity(config: &AugmentConfig) -> Box<dyn SimilaritySearch> {
    if config.similarity_enabled {
        Box::new(tether::TetherClient::new(
            config.similarity_host.clone(),
            config.similarity_port,
        ))
    } else {
        Box::new(NoSimilarity)
    }
}
