//! Modscope - static analysis for decorator-DI TypeScript backends
//!
//! Parses a project's TypeScript sources, reconstructs the module graph and
//! provider wiring, runs rules over both, and scores the result. The same
//! pipeline backs a one-shot batch scan ([`pipeline::scan`]) and an
//! incremental editor session ([`session::ScanSession`]).

pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod models;
pub mod parsers;
pub mod pipeline;
pub mod providers;
pub mod rules;
pub mod scoring;
pub mod session;

pub use error::{PluginError, ScanError};
pub use pipeline::{scan, ScanReport};
