//! CORS misconfiguration
//!
//! `app.enableCors()` with no options and `origin: '*'` / `origin: true`
//! both allow any site to call the API.

use super::base::{FileContext, FileRule, Report, RuleMeta};
use crate::models::{Category, Scope, Severity};
use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;

pub const ID: &str = "security/cors-wildcard";

static BARE_ENABLE: OnceLock<Regex> = OnceLock::new();
static WILDCARD_ORIGIN: OnceLock<Regex> = OnceLock::new();

fn bare_enable() -> &'static Regex {
    BARE_ENABLE.get_or_init(|| Regex::new(r"\.enableCors\s*\(\s*\)").unwrap())
}

fn wildcard_origin() -> &'static Regex {
    WILDCARD_ORIGIN.get_or_init(|| {
        Regex::new(r#"\borigin\s*:\s*(?:['"`]\*['"`]|true\b)"#).unwrap()
    })
}

pub struct CorsWildcardRule {
    meta: RuleMeta,
}

impl CorsWildcardRule {
    pub fn new() -> Self {
        Self {
            meta: RuleMeta::new(
                ID,
                Category::Security,
                Severity::Warning,
                "CORS allows every origin",
                "Pass an explicit allow-list: enableCors({ origin: ['https://app.example.com'] }).",
                Scope::File,
            ),
        }
    }
}

impl Default for CorsWildcardRule {
    fn default() -> Self {
        Self::new()
    }
}

impl FileRule for CorsWildcardRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check(&self, ctx: &mut FileContext<'_>) -> Result<()> {
        for (i, line) in ctx.unit.source.lines().enumerate() {
            if line.trim_start().starts_with("//") {
                continue;
            }
            let found = if let Some(m) = bare_enable().find(line) {
                Some((m.start(), "enableCors() without options allows any origin"))
            } else {
                wildcard_origin()
                    .find(line)
                    .map(|m| (m.start(), "CORS origin is set to a wildcard"))
            };
            if let Some((start, message)) = found {
                let column = line[..start].chars().count() as u32 + 1;
                ctx.report(Report::new(message, i as u32 + 1, column));
            }
        }
        Ok(())
    }
}
