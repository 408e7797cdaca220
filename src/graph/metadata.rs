//! Textual reading of `@Module({...})` metadata
//!
//! The decorator argument is never evaluated. Array-valued keys are located
//! at the top level of the object literal and split at top-level commas.
//! Anything that does not look like an array literal reads as empty.

use regex::Regex;
use std::sync::OnceLock;

/// Symbol lists declared in a module decorator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleMetadata {
    pub imports: Vec<String>,
    pub exports: Vec<String>,
    pub providers: Vec<String>,
    pub controllers: Vec<String>,
}

pub fn parse_module_metadata(argument: Option<&str>) -> ModuleMetadata {
    let Some(argument) = argument else {
        return ModuleMetadata::default();
    };
    let text = strip_comments(argument);
    let text = text.trim();
    if !text.starts_with('{') {
        return ModuleMetadata::default();
    }

    ModuleMetadata {
        imports: read_array_field(text, "imports"),
        exports: read_array_field(text, "exports"),
        providers: read_array_field(text, "providers"),
        controllers: read_array_field(text, "controllers"),
    }
}

/// Read `key: [a, b, ...]` from the top level of an object literal
pub fn read_array_field(object: &str, key: &str) -> Vec<String> {
    let Some(inner) = find_array(object, key) else {
        return vec![];
    };
    split_top_level(inner)
        .into_iter()
        .filter_map(normalize_element)
        .collect()
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Index just past the string literal that opens at `start`
fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Locate the array literal bound to `key` at depth 1 and return its contents
fn find_array<'a>(object: &'a str, key: &str) -> Option<&'a str> {
    let bytes = object.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'{' | b'[' | b'(' => {
                depth += 1;
                i += 1;
            }
            b'}' | b']' | b')' => {
                depth = depth.saturating_sub(1);
                i += 1;
            }
            b'\'' | b'"' | b'`' => {
                let end = skip_string(bytes, i);
                let closed = end >= i + 2 && bytes[end - 1] == b;
                if depth == 1 && closed && &object[i + 1..end - 1] == key {
                    if let Some(found) = array_after_key(object, end) {
                        return Some(found);
                    }
                }
                i = end;
            }
            _ if depth == 1 && is_ident_byte(b) && (i == 0 || !is_ident_byte(bytes[i - 1])) => {
                let mut end = i;
                while end < bytes.len() && is_ident_byte(bytes[end]) {
                    end += 1;
                }
                if &object[i..end] == key {
                    if let Some(found) = array_after_key(object, end) {
                        return Some(found);
                    }
                }
                i = end;
            }
            _ => i += 1,
        }
    }
    None
}

/// Given the index right after a key, expect `: [` and return the balanced contents
fn array_after_key(object: &str, after_key: usize) -> Option<&str> {
    let bytes = object.as_bytes();
    let mut i = after_key;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if bytes.get(i) != Some(&b':') {
        return None;
    }
    i += 1;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if bytes.get(i) != Some(&b'[') {
        return None;
    }

    let open = i;
    let mut depth = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'{' | b'[' | b'(' => depth += 1,
            b'}' | b']' | b')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&object[open + 1..i]);
                }
            }
            _ => {}
        }
        i += 1;
    }
    // Unterminated array reads as empty
    None
}

/// Split at commas that are not nested in brackets or strings
fn split_top_level(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'{' | b'[' | b'(' => depth += 1,
            b'}' | b']' | b')' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(&text[start..]);
    parts
}

fn forward_ref_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^forwardRef\s*\(\s*(?:\(\s*\)|_)\s*=>\s*\(?\s*([A-Za-z_$][\w$.]*)\s*\)?\s*\)$")
            .unwrap()
    })
}

fn static_call_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([A-Za-z_$][\w$]*)\s*\.\s*[A-Za-z_$][\w$]*\s*\(").unwrap())
}

/// Reduce one array element to the symbol name it refers to
fn normalize_element(raw: &str) -> Option<String> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(spread) = text.strip_prefix("...") {
        let target = spread.trim();
        return (!target.is_empty()).then(|| target.to_string());
    }

    if let Some(caps) = forward_ref_pattern().captures(text) {
        return Some(caps[1].to_string());
    }

    if text.starts_with('{') {
        return provide_token(text);
    }

    // Dynamic module: `ConfigModule.forRoot({...})`
    if let Some(caps) = static_call_pattern().captures(text) {
        return Some(caps[1].to_string());
    }

    Some(text.to_string())
}

/// `{ provide: TOKEN, useClass: X }` -> `TOKEN`
fn provide_token(object: &str) -> Option<String> {
    let inner = object.trim_start_matches('{').trim_end_matches('}');
    for part in split_top_level(inner) {
        let Some((key, value)) = part.split_once(':') else {
            continue;
        };
        if key.trim().trim_matches(|c| c == '\'' || c == '"') == "provide" {
            let value = value
                .trim()
                .trim_matches(|c| c == '\'' || c == '"' || c == '`');
            return (!value.is_empty()).then(|| value.to_string());
        }
    }
    None
}

/// Drop `//` and `/* */` comments outside string literals
fn strip_comments(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    let mut copied = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => {
                i = skip_string(bytes, i);
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                out.push_str(&text[copied..i]);
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                copied = i;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                out.push_str(&text[copied..i]);
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
                copied = i;
            }
            _ => i += 1,
        }
    }
    out.push_str(&text[copied.min(text.len())..]);
    out
}
