//! Rules and the rule engine
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                  RuleEngine                   │
//! │  - filters rules through the configuration    │
//! │  - runs each invocation in isolation          │
//! │  - stamps id/category/severity/help           │
//! └───────────────────────────────────────────────┘
//!                        │
//!           ┌────────────┴────────────┐
//!           ▼                         ▼
//! ┌───────────────────┐     ┌────────────────────┐
//! │ FileRule          │     │ ProjectRule        │
//! │ one SourceUnit    │     │ units + graph +    │
//! │ (secrets, CORS,   │     │ providers (cycles, │
//! │  sync I/O, plugin │     │  thresholds,       │
//! │  pattern rules)   │     │  wiring)           │
//! └───────────────────┘     └────────────────────┘
//! ```
//!
//! Built-in rules are listed by [`builtin_rules`] in registration order.
//! Declarative pattern rules can be added from TOML with
//! [`RuleSet::register_plugin`].

pub mod base;
pub mod engine;
pub mod plugin;

mod circular_module_deps;
mod circular_provider_deps;
mod cors_wildcard;
mod god_service;
mod hardcoded_secret;
mod max_providers;
mod provider_not_injectable;
mod sync_io;

pub use base::{FileContext, FileRule, ProjectContext, ProjectRule, Report, RuleError, RuleMeta, RuleUnit};
pub use circular_module_deps::CircularModuleDepsRule;
pub use circular_provider_deps::CircularProviderDepsRule;
pub use cors_wildcard::CorsWildcardRule;
pub use engine::{RuleEngine, RunOutcome};
pub use god_service::GodServiceRule;
pub use hardcoded_secret::HardcodedSecretRule;
pub use max_providers::MaxProvidersRule;
pub use provider_not_injectable::ProviderNotInjectableRule;
pub use sync_io::SyncIoRule;

use crate::error::PluginError;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// Create the built-in rule set
pub fn builtin_rules() -> Vec<RuleUnit> {
    vec![
        // Architecture
        RuleUnit::project(CircularModuleDepsRule::new()),
        RuleUnit::project(MaxProvidersRule::new()),
        RuleUnit::project(GodServiceRule::new()),
        // Correctness
        RuleUnit::project(ProviderNotInjectableRule::new()),
        RuleUnit::project(CircularProviderDepsRule::new()),
        // Security
        RuleUnit::file(HardcodedSecretRule::new()),
        RuleUnit::file(CorsWildcardRule::new()),
        // Performance
        RuleUnit::file(SyncIoRule::new()),
    ]
}

/// Ordered list of rules with unique ids
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    units: Vec<RuleUnit>,
    ids: HashSet<String>,
}

impl RuleSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut set = Self::empty();
        for unit in builtin_rules() {
            set.ids.insert(unit.id().to_string());
            set.units.push(unit);
        }
        set
    }

    /// Append a rule. Fails if the id is already registered.
    pub fn register(&mut self, unit: RuleUnit) -> Result<(), PluginError> {
        if !self.ids.insert(unit.id().to_string()) {
            return Err(PluginError::DuplicateId(unit.id().to_string()));
        }
        self.units.push(unit);
        Ok(())
    }

    /// Load, validate and register every rule in a plugin file. Nothing is
    /// registered unless the whole plugin validates.
    pub fn register_plugin(&mut self, path: &Path) -> Result<usize, PluginError> {
        let units = plugin::load_plugin(path)?;
        let mut seen = HashSet::new();
        for unit in &units {
            if self.ids.contains(unit.id()) || !seen.insert(unit.id()) {
                return Err(PluginError::DuplicateId(unit.id().to_string()));
            }
        }
        let count = units.len();
        for unit in units {
            self.register(unit)?;
        }
        info!("Registered {} plugin rules from {}", count, path.display());
        Ok(count)
    }

    pub fn units(&self) -> &[RuleUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Scope};

    #[test]
    fn test_builtin_ids_are_namespaced_and_unique() {
        let set = RuleSet::builtin();
        assert_eq!(set.len(), 8);
        for unit in set.units() {
            let meta = unit.meta();
            let (prefix, name) = meta.id.split_once('/').unwrap();
            assert_eq!(Category::parse(prefix), Some(meta.category));
            assert!(!name.is_empty());
            let shape = match unit {
                RuleUnit::File(_) => Scope::File,
                RuleUnit::Project(_) => Scope::Project,
            };
            assert_eq!(meta.scope, shape, "{}", meta.id);
        }
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut set = RuleSet::builtin();
        let err = set
            .register(RuleUnit::file(HardcodedSecretRule::new()))
            .unwrap_err();
        assert!(matches!(err, PluginError::DuplicateId(id) if id == "security/hardcoded-secret"));
        assert_eq!(set.len(), 8);
    }
}
