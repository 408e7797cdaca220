//! Configuration module for modscope
//!
//! This module handles:
//! - Project-level configuration (modscope.toml / .modscoperc.json)
//! - Rule enablement and threshold overrides
//! - Path exclusion and explicit sub-project lists

mod project_config;

pub use project_config::{
    load_config_file, load_project_config, ExcludeConfig, ModscopeConfig, ProjectEntry,
    RuleOverride, ThresholdValue, JSON_CONFIG, TOML_CONFIG,
};
