//! Hardcoded secrets
//!
//! Flags string literals assigned to secret-looking names
//! (`password`, `jwtSecret`, `apiKey`, ...). Placeholder values and
//! environment lookups are not literals and never match.

use super::base::{FileContext, FileRule, Report, RuleMeta};
use crate::models::{Category, Scope, Severity};
use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;

pub const ID: &str = "security/hardcoded-secret";

static SECRET_PATTERN: OnceLock<Regex> = OnceLock::new();

fn secret_pattern() -> &'static Regex {
    SECRET_PATTERN.get_or_init(|| {
        Regex::new(
            r#"(?i)\b\w*(password|passwd|secret|api_?key|access_?token|private_?key|client_?secret)\w*['"]?\s*[:=]\s*['"`]([^'"`\s]{6,})['"`]"#,
        )
        .unwrap()
    })
}

/// Obvious placeholders are not worth reporting
const PLACEHOLDERS: &[&str] = &["changeme", "xxxxxx", "example", "placeholder", "your_"];

pub struct HardcodedSecretRule {
    meta: RuleMeta,
}

impl HardcodedSecretRule {
    pub fn new() -> Self {
        Self {
            meta: RuleMeta::new(
                ID,
                Category::Security,
                Severity::Error,
                "Secret value committed in source",
                "Load the value from the environment (ConfigService / process.env) and rotate the leaked secret.",
                Scope::File,
            ),
        }
    }
}

impl Default for HardcodedSecretRule {
    fn default() -> Self {
        Self::new()
    }
}

impl FileRule for HardcodedSecretRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check(&self, ctx: &mut FileContext<'_>) -> Result<()> {
        for (i, line) in ctx.unit.source.lines().enumerate() {
            let trimmed = line.trim_start();
            if trimmed.starts_with("//") || trimmed.starts_with('*') {
                continue;
            }
            let Some(caps) = secret_pattern().captures(line) else {
                continue;
            };
            let value = caps[2].to_lowercase();
            if PLACEHOLDERS.iter().any(|p| value.contains(p)) {
                continue;
            }
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let column = line[..whole.start()].chars().count() as u32 + 1;
            ctx.report(Report::new(
                format!("Hardcoded {} value", caps[1].to_lowercase()),
                i as u32 + 1,
                column,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModscopeConfig;
    use crate::parsers::typescript::parse_source;
    use std::path::Path;

    fn run(source: &str) -> Vec<Report> {
        let unit = parse_source(source, Path::new("auth.module.ts")).unwrap();
        let config = ModscopeConfig::default();
        let mut ctx = FileContext::new(&unit, &config);
        HardcodedSecretRule::new().check(&mut ctx).unwrap();
        ctx.reports
    }

    #[test]
    fn test_flags_literal_secret() {
        let reports = run("JwtModule.register({\n  secret: 'sup3r-s3cret-key',\n});\n");
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].line, 2);
        assert_eq!(reports[0].column, 3);
        assert_eq!(reports[0].message, "Hardcoded secret value");
    }

    #[test]
    fn test_ignores_env_and_placeholders() {
        let reports = run(
            "const a = { secret: process.env.JWT_SECRET };\nconst dbPassword = 'changeme';\n// apiKey: 'abcdef123456'\n",
        );
        assert!(reports.is_empty());
    }

    #[test]
    fn test_camel_case_names() {
        let reports = run("const stripeApiKey = \"sk_live_abcdef123\";\n");
        assert_eq!(reports.len(), 1);
    }
}
