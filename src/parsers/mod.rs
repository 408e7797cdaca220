//! Source parsers using tree-sitter
//!
//! Turns a TypeScript file into a [`SourceUnit`]: the declared classes with
//! their decorators, constructor parameters and methods, plus the file's
//! import statements. The rest of the crate only ever reads these units.

pub mod typescript;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Parse a file from disk. `rel_path` is the path recorded on the unit.
pub fn parse_file(path: &Path, rel_path: &Path) -> Result<SourceUnit> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    typescript::parse_source(&source, rel_path)
}

/// Whether a path is a TypeScript source we analyze
pub fn is_analyzable(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".ts")
        && !name.ends_with(".d.ts")
        && !name.ends_with(".spec.ts")
        && !name.ends_with(".test.ts")
        && !name.ends_with(".e2e-spec.ts")
}

/// A marker annotation attached to a class, member or parameter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decorator {
    /// Marker name without `@` or namespace prefix (`Injectable`)
    pub name: String,
    /// Literal text of the first call argument, if the decorator was called
    pub argument: Option<String>,
}

/// Explicit member visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn parse(text: &str) -> Option<Visibility> {
        match text.trim() {
            "public" => Some(Visibility::Public),
            "protected" => Some(Visibility::Protected),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }
}

/// A constructor parameter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// Type annotation text without the leading colon
    pub type_text: Option<String>,
    /// Modifier keywords in source order (`private`, `readonly`, ...)
    pub modifiers: Vec<String>,
    pub readonly: bool,
    pub decorators: Vec<Decorator>,
}

/// A method declared in a class body (constructors excluded)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodInfo {
    pub name: String,
    /// `None` when no visibility keyword was written
    pub visibility: Option<Visibility>,
    pub is_static: bool,
    pub is_async: bool,
    pub decorators: Vec<Decorator>,
    pub line: u32,
    pub column: u32,
    pub line_end: u32,
}

/// A class declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub name: String,
    /// Position of the class name (1-based)
    pub line: u32,
    pub column: u32,
    pub line_end: u32,
    pub decorators: Vec<Decorator>,
    pub extends: Option<String>,
    pub implements: Vec<String>,
    pub constructor_params: Vec<Parameter>,
    pub methods: Vec<MethodInfo>,
}

/// An import statement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportInfo {
    /// Module specifier (`@nestjs/common`, `./users.service`)
    pub specifier: String,
    /// Bound names (default, named and namespace imports)
    pub names: Vec<String>,
    /// `import type ...`
    pub is_type_only: bool,
    pub line: u32,
}

/// One parsed file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceUnit {
    /// Path relative to the scanned root
    pub path: PathBuf,
    pub source: String,
    pub line_count: u32,
    pub classes: Vec<ClassInfo>,
    pub imports: Vec<ImportInfo>,
}

impl SourceUnit {
    /// Source lines, 0-indexed
    pub fn lines(&self) -> Vec<&str> {
        self.source.lines().collect()
    }

    /// Find a class declared in this file
    pub fn class(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_analyzable() {
        assert!(is_analyzable(Path::new("src/app.module.ts")));
        assert!(!is_analyzable(Path::new("src/app.module.spec.ts")));
        assert!(!is_analyzable(Path::new("src/types.d.ts")));
        assert!(!is_analyzable(Path::new("test/app.e2e-spec.ts")));
        assert!(!is_analyzable(Path::new("src/main.js")));
    }

    #[test]
    fn test_visibility_parse() {
        assert_eq!(Visibility::parse("private"), Some(Visibility::Private));
        assert_eq!(Visibility::parse(" public "), Some(Visibility::Public));
        assert_eq!(Visibility::parse("readonly"), None);
    }
}
