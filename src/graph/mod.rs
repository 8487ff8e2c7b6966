//! The concept graph: nodes, edges, memories, and the engines that change them.
//!
//! - [`store`]: the save path, one unit of work per memory
//! - [`query`]: memories by activated node, related-node lookups
//! - [`hebbian`]: co-activation strengthening and homeostatic maintenance
//! - [`decay`]: time-based decay sweep and access touches
//! - [`catalog`]: node catalog parsing and seeding

pub mod catalog;
pub mod decay;
pub mod hebbian;
pub mod nodes;
pub mod query;
pub mod stats;
pub mod store;
pub mod types;

pub use decay::{DecayEngine, DecayParams, SweepStats};
pub use hebbian::{HebbianEngine, HebbianParams};
pub use store::{GraphStore, NewMemory};
pub use types::{Activation, Memory, Node};
