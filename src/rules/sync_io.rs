//! Blocking I/O inside injectables and controllers
//!
//! `fs.readFileSync` and friends block the event loop for every request
//! that reaches the class. Only lines inside a DI-managed class body are
//! checked; bootstrap scripts may block freely.

use super::base::{FileContext, FileRule, Report, RuleMeta};
use crate::classifier::{classify, Role};
use crate::models::{Category, Scope, Severity};
use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;

pub const ID: &str = "performance/sync-io-in-injectable";

static SYNC_CALL: OnceLock<Regex> = OnceLock::new();

fn sync_call() -> &'static Regex {
    SYNC_CALL.get_or_init(|| {
        Regex::new(
            r"\b(readFileSync|writeFileSync|appendFileSync|existsSync|readdirSync|statSync|lstatSync|mkdirSync|rmSync|unlinkSync|copyFileSync|execSync|execFileSync|spawnSync|pbkdf2Sync|scryptSync|randomFillSync)\s*\(",
        )
        .unwrap()
    })
}

pub struct SyncIoRule {
    meta: RuleMeta,
}

impl SyncIoRule {
    pub fn new() -> Self {
        Self {
            meta: RuleMeta::new(
                ID,
                Category::Performance,
                Severity::Warning,
                "Synchronous I/O inside a DI-managed class",
                "Use the promise-based API (fs/promises, util.promisify) and await it.",
                Scope::File,
            ),
        }
    }
}

impl Default for SyncIoRule {
    fn default() -> Self {
        Self::new()
    }
}

impl FileRule for SyncIoRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check(&self, ctx: &mut FileContext<'_>) -> Result<()> {
        let lines = ctx.unit.lines();
        for class in &ctx.unit.classes {
            let role = classify(class);
            if !(role.is_injectable() || role == Role::Controller || role == Role::Gateway) {
                continue;
            }
            let first = class.line.saturating_sub(1) as usize;
            let last = (class.line_end as usize).min(lines.len());
            for (offset, line) in lines[first.min(last)..last].iter().enumerate() {
                if line.trim_start().starts_with("//") {
                    continue;
                }
                if let Some(caps) = sync_call().captures(line) {
                    let Some(call) = caps.get(1) else {
                        continue;
                    };
                    let message = format!(
                        "{}() blocks the event loop inside {} '{}'",
                        call.as_str(),
                        role,
                        class.name
                    );
                    let column = line[..call.start()].chars().count() as u32 + 1;
                    ctx.report(Report::new(message, (first + offset) as u32 + 1, column));
                }
            }
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
        let unit = parse_source(source, Path::new("files.service.ts")).unwrap();
        let config = ModscopeConfig::default();
        let mut ctx = FileContext::new(&unit, &config);
        SyncIoRule::new().check(&mut ctx).unwrap();
        ctx.reports
    }

    #[test]
    fn test_flags_sync_call_in_service() {
        let reports = run(
            "import * as fs from 'fs';\n\n@Injectable()\nexport class FilesService {\n  load() {\n    return fs.readFileSync('a.txt');\n  }\n}\n",
        );
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].line, 6);
        assert!(reports[0].message.contains("readFileSync"));
        assert!(reports[0].message.contains("FilesService"));
    }

    #[test]
    fn test_outside_di_classes_is_fine() {
        let reports = run(
            "const config = fs.readFileSync('config.json');\nexport class Plain {\n  load() { return fs.readFileSync('x'); }\n}\n",
        );
        assert!(reports.is_empty());
    }
}
