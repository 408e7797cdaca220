//! Health scoring
//!
//! # Scoring Formula
//!
//! ```text
//! weight    = severity_weight × category_multiplier      (per diagnostic)
//! deduction = 25 × Σ weight / max(file_count, 1)
//! score     = clamp(round(100 − deduction), 0, 100)
//! ```
//!
//! Severity weights: error 3.0, warning 1.5, info 0.5.
//! Category multipliers: security 1.5, architecture 1.0, correctness 1.0,
//! performance 0.75.
//!
//! Any diagnostic caps the score at 89, so 100 and "Excellent" are reserved
//! for a clean scan.
//!
//! # Example
//!
//! 20 files with one security error and two architecture warnings:
//! Σ weight = 4.5 + 1.5 + 1.5 = 7.5, deduction = 25 × 7.5 / 20 = 9.375,
//! score = round(90.625) = 91 → capped to 89 → "Good".

use crate::models::{Diagnostic, Score};

/// Scale applied to the per-file penalty
const PENALTY_SCALE: f64 = 25.0;

/// Highest value a scan with diagnostics can reach
const MAX_WITH_DIAGNOSTICS: u8 = 89;

/// Penalty weight of one diagnostic
pub fn diagnostic_weight(diagnostic: &Diagnostic) -> f64 {
    diagnostic.severity.weight() * diagnostic.category.multiplier()
}

/// Score a set of diagnostics against the number of analyzed files
pub fn score(diagnostics: &[Diagnostic], file_count: usize) -> Score {
    if diagnostics.is_empty() {
        return Score {
            value: 100,
            label: label_for(100).to_string(),
        };
    }

    let raw: f64 = diagnostics.iter().map(diagnostic_weight).sum();
    let deduction = PENALTY_SCALE * raw / file_count.max(1) as f64;
    let value = (100.0 - deduction).round().clamp(0.0, 100.0) as u8;
    let value = value.min(MAX_WITH_DIAGNOSTICS);

    Score {
        value,
        label: label_for(value).to_string(),
    }
}

pub fn label_for(value: u8) -> &'static str {
    match value {
        90.. => "Excellent",
        75..=89 => "Good",
        50..=74 => "Fair",
        _ => "Poor",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Scope, Severity};
    use std::path::PathBuf;

    fn diag(severity: Severity, category: Category) -> Diagnostic {
        Diagnostic {
            file_path: PathBuf::from("src/app.ts"),
            rule_id: format!("{}/test", category),
            category,
            severity,
            message: String::new(),
            help: String::new(),
            line: 1,
            column: 1,
            scope: Scope::File,
            source_context: None,
        }
    }

    #[test]
    fn test_empty_is_perfect_for_any_file_count() {
        for files in [0, 1, 500] {
            let s = score(&[], files);
            assert_eq!(s.value, 100);
            assert_eq!(s.label, "Excellent");
        }
    }

    #[test]
    fn test_any_diagnostic_drops_below_excellent() {
        let s = score(&[diag(Severity::Info, Category::Performance)], 10_000);
        assert_eq!(s.value, 89);
        assert_eq!(s.label, "Good");
    }

    #[test]
    fn test_documented_example() {
        let diagnostics = vec![
            diag(Severity::Error, Category::Security),
            diag(Severity::Warning, Category::Architecture),
            diag(Severity::Warning, Category::Architecture),
        ];
        assert_eq!(score(&diagnostics, 20).value, 89);
        // 25 × 7.5 / 5 = 37.5 → 62.5 rounds to 63
        let s = score(&diagnostics, 5);
        assert_eq!(s.value, 63);
        assert_eq!(s.label, "Fair");
    }

    #[test]
    fn test_monotonic_in_file_count() {
        let diagnostics = vec![
            diag(Severity::Error, Category::Security),
            diag(Severity::Warning, Category::Correctness),
            diag(Severity::Info, Category::Performance),
        ];
        let mut previous = 0;
        for files in 0..200 {
            let value = score(&diagnostics, files).value;
            assert!(value >= previous, "score dropped at {files} files");
            assert!(value <= 100);
            previous = value;
        }
    }

    #[test]
    fn test_clamped_at_zero() {
        let diagnostics: Vec<_> = (0..100)
            .map(|_| diag(Severity::Error, Category::Security))
            .collect();
        let s = score(&diagnostics, 0);
        assert_eq!(s.value, 0);
        assert_eq!(s.label, "Poor");
    }

    #[test]
    fn test_weight_ordering() {
        let error = diagnostic_weight(&diag(Severity::Error, Category::Architecture));
        let warning = diagnostic_weight(&diag(Severity::Warning, Category::Architecture));
        let info = diagnostic_weight(&diag(Severity::Info, Category::Architecture));
        assert!(error > warning && warning > info);

        let security = diagnostic_weight(&diag(Severity::Warning, Category::Security));
        let correctness = diagnostic_weight(&diag(Severity::Warning, Category::Correctness));
        let performance = diagnostic_weight(&diag(Severity::Warning, Category::Performance));
        assert!(security > warning && security > correctness);
        assert!(correctness > performance && warning > performance);
    }

    #[test]
    fn test_labels() {
        assert_eq!(label_for(90), "Excellent");
        assert_eq!(label_for(75), "Good");
        assert_eq!(label_for(50), "Fair");
        assert_eq!(label_for(49), "Poor");
    }
}
