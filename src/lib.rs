//! Hebbian associative memory for AI agents, served over MCP.
//!
//! Synaptic stores free-text memories against a fixed catalog of concept
//! nodes. Saving a memory scores its text against every node; the nodes that
//! cross the activation threshold are linked to the memory, and every pair of
//! them has its connecting edge strengthened. Over time frequently
//! co-activated concepts become strongly connected, rarely used connections
//! weaken, and memories that are never recalled fade out of query results.
//!
//! # Architecture
//!
//! - **Storage**: two structurally identical SQLite databases. The durable one
//!   is always written first; an optional fast mirror (e.g. on tmpfs) serves
//!   reads and is rebuilt from the durable copy whenever it falls behind.
//! - **Learning**: asymptotic Hebbian strengthening, idle decay and periodic
//!   homeostatic scaling of each node's total connection weight.
//! - **Forgetting**: a scheduled sweep recomputes effective importance of
//!   memories and decays edge weights by elapsed time.
//! - **Transport**: MCP over stdio.
//!
//! # Modules
//!
//! - [`config`]: configuration from TOML files and environment variables
//! - [`db`]: connections, schema, migrations, the dual-write store
//! - [`graph`]: nodes, edges, memories and the Hebbian and decay engines
//! - [`analyzer`]: content analysis against the node catalog
//! - [`augment`]: optional concept extraction and similarity search
//! - [`mind`]: the handle that wires everything together

pub mod analyzer;
pub mod augment;
pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod mind;
pub mod scheduler;
pub mod server;
pub mod tools;
