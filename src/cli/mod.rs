//! Operator subcommands. Each opens storage itself and prints a plain-text report.

pub mod doctor;
pub mod nodes;
pub mod status;
pub mod sweep;
