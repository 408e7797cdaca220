//! Init command - write an example modscope.toml

use crate::config::{load_config_file, TOML_CONFIG};
use anyhow::{Context, Result};
use console::style;
use std::path::Path;

/// Example configuration. Top-level keys come before any table.
pub const EXAMPLE_CONFIG: &str = r#"# Modscope configuration

# Declarative pattern rules, relative to this file
# plugins = ["modscope-rules.toml"]
plugins = []

# Rule overrides, keyed by rule id
[rules."architecture/max-providers-per-module"]
enabled = true
thresholds = { max = 10 }

[rules."architecture/god-service"]
thresholds = { max_public_methods = 10 }

# Category switches: security, correctness, architecture, performance
[categories]
performance = true

[exclude]
paths = ["**/generated/**", "test/"]

# Sub-projects for a monorepo without nest-cli.json
# [[projects]]
# name = "api"
# root = "apps/api"
"#;

pub fn run(path: &Path) -> Result<()> {
    let root = path
        .canonicalize()
        .with_context(|| format!("Path does not exist: {}", path.display()))?;
    if !root.is_dir() {
        anyhow::bail!("Path is not a directory: {}", root.display());
    }

    let config_path = root.join(TOML_CONFIG);
    if config_path.exists() {
        println!(
            "{} {} already exists, leaving it untouched",
            style("✓").green(),
            style(config_path.display()).cyan()
        );
        return Ok(());
    }

    std::fs::write(&config_path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!(
        "{} Created {}",
        style("✓").green(),
        style(config_path.display()).cyan()
    );
    println!("\nNext steps:");
    println!("  {} Run analysis", style("modscope analyze .").cyan());
    println!("  {} Export the module graph", style("modscope graph . --format dot").cyan());

    // Catch a broken template before anyone edits it
    load_config_file(&config_path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use tempfile::tempdir;

    #[test]
    fn test_example_config_parses() {
        let config: crate::config::ModscopeConfig = toml::from_str(EXAMPLE_CONFIG).unwrap();
        assert_eq!(
            config.threshold_i64("architecture/max-providers-per-module", "max"),
            Some(10)
        );
        assert!(config.is_rule_enabled("performance/sync-io-in-injectable", Category::Performance));
        assert!(config.plugins.is_empty());
    }

    #[test]
    fn test_init_does_not_overwrite() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(TOML_CONFIG), "# mine\n").unwrap();
        run(dir.path()).unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join(TOML_CONFIG)).unwrap(),
            "# mine\n"
        );
    }

    #[test]
    fn test_init_writes_config() {
        let dir = tempdir().unwrap();
        run(dir.path()).unwrap();
        assert!(dir.path().join(TOML_CONFIG).is_file());
    }
}
