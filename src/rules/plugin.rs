//! Declarative rule plugins
//!
//! A plugin is a TOML file of pattern rules. Loading goes
//! read -> parse -> validate -> build, and every failure comes back as a
//! `PluginError`; nothing user-supplied is executed.
//!
//! ```toml
//! [[rule]]
//! id = "security/no-eval"
//! category = "security"
//! severity = "error"
//! description = "eval() executes arbitrary code"
//! help = "Remove eval() and parse the input explicitly."
//! pattern = '\beval\s*\('
//! ```

use super::base::{FileContext, FileRule, Report, RuleMeta, RuleUnit};
use crate::error::PluginError;
use crate::models::{Category, Scope, Severity};
use anyhow::Result;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct PluginFile {
    #[serde(default, rename = "rule")]
    rules: Vec<PluginRuleSpec>,
}

#[derive(Debug, Deserialize)]
struct PluginRuleSpec {
    id: String,
    category: Category,
    severity: Severity,
    description: String,
    #[serde(default)]
    help: String,
    pattern: String,
}

/// Load and validate a plugin file into file rules
pub fn load_plugin(path: &Path) -> Result<Vec<RuleUnit>, PluginError> {
    let content = std::fs::read_to_string(path).map_err(|source| PluginError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_plugin(&content, path)
}

/// Validate plugin content. `origin` is only used in error messages.
pub fn parse_plugin(content: &str, origin: &Path) -> Result<Vec<RuleUnit>, PluginError> {
    let file: PluginFile = toml::from_str(content).map_err(|e| PluginError::Parse {
        path: origin.to_path_buf(),
        message: e.to_string(),
    })?;

    if file.rules.is_empty() {
        return Err(PluginError::Empty(origin.to_path_buf()));
    }

    let mut units = Vec::with_capacity(file.rules.len());
    for spec in file.rules {
        let rule = PatternRule::from_spec(spec)?;
        debug!("Loaded plugin rule {}", rule.meta.id);
        units.push(RuleUnit::file(rule));
    }
    Ok(units)
}

/// A file rule that reports every line matching a regex
pub struct PatternRule {
    meta: RuleMeta,
    pattern: Regex,
}

impl PatternRule {
    fn from_spec(spec: PluginRuleSpec) -> Result<Self, PluginError> {
        let Some((prefix, name)) = spec.id.split_once('/') else {
            return Err(PluginError::InvalidId(spec.id));
        };
        let Some(prefix_category) = Category::parse(prefix) else {
            return Err(PluginError::InvalidId(spec.id));
        };
        let valid_name = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid_name {
            return Err(PluginError::InvalidId(spec.id));
        }
        if prefix_category != spec.category {
            return Err(PluginError::CategoryMismatch {
                prefix: prefix.to_string(),
                category: spec.category.to_string(),
                id: spec.id,
            });
        }

        let pattern = Regex::new(&spec.pattern).map_err(|e| PluginError::InvalidPattern {
            id: spec.id.clone(),
            message: e.to_string(),
        })?;

        Ok(Self {
            meta: RuleMeta::new(
                spec.id,
                spec.category,
                spec.severity,
                spec.description,
                spec.help,
                Scope::File,
            ),
            pattern,
        })
    }
}

impl FileRule for PatternRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check(&self, ctx: &mut FileContext<'_>) -> Result<()> {
        for (i, line) in ctx.unit.source.lines().enumerate() {
            if let Some(m) = self.pattern.find(line) {
                let column = line[..m.start()].chars().count() as u32 + 1;
                ctx.report(Report::new(self.meta.description.clone(), i as u32 + 1, column));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleSet;
    use tempfile::tempdir;

    const VALID: &str = r#"
[[rule]]
id = "security/no-eval"
category = "security"
severity = "error"
description = "eval() executes arbitrary code"
help = "Remove eval()."
pattern = '\beval\s*\('
"#;

    fn origin() -> &'static Path {
        Path::new("plugin.toml")
    }

    #[test]
    fn test_valid_plugin() {
        let units = parse_plugin(VALID, origin()).unwrap();
        assert_eq!(units.len(), 1);
        let meta = units[0].meta();
        assert_eq!(meta.id, "security/no-eval");
        assert_eq!(meta.severity, Severity::Error);
        assert_eq!(meta.scope, Scope::File);
    }

    #[test]
    fn test_validation_failures_are_returned() {
        let bad_id = VALID.replace("security/no-eval", "no-eval");
        assert!(matches!(parse_plugin(&bad_id, origin()), Err(PluginError::InvalidId(_))));

        let unknown_prefix = VALID.replace("security/no-eval", "style/no-eval");
        assert!(matches!(parse_plugin(&unknown_prefix, origin()), Err(PluginError::InvalidId(_))));

        let mismatch = VALID.replace("security/no-eval", "performance/no-eval");
        assert!(matches!(
            parse_plugin(&mismatch, origin()),
            Err(PluginError::CategoryMismatch { .. })
        ));

        let bad_pattern = VALID.replace(r"'\beval\s*\('", "'eval('");
        assert!(matches!(
            parse_plugin(&bad_pattern, origin()),
            Err(PluginError::InvalidPattern { .. })
        ));

        assert!(matches!(parse_plugin("", origin()), Err(PluginError::Empty(_))));
        assert!(matches!(parse_plugin("[[rule]]\nid = 3", origin()), Err(PluginError::Parse { .. })));
    }

    #[test]
    fn test_missing_file() {
        let err = load_plugin(Path::new("/nonexistent/plugin.toml")).err().unwrap();
        assert!(matches!(err, PluginError::Read { .. }));
    }

    #[test]
    fn test_register_plugin_rejects_collisions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rules.toml");
        std::fs::write(&path, VALID).unwrap();

        let mut set = RuleSet::builtin();
        assert_eq!(set.register_plugin(&path).unwrap(), 1);
        assert!(set.contains("security/no-eval"));

        let err = set.register_plugin(&path).unwrap_err();
        assert!(matches!(err, PluginError::DuplicateId(_)));
        assert_eq!(set.len(), 9);
    }
}
