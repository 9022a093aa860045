//! Rendering adapters: fully-loaded entities in, bytes out.
//!
//! Nothing here reads or writes the store, and a failure never touches the
//! entity that was being exported.

mod pdf;
mod spreadsheet;

pub use pdf::*;
pub use spreadsheet::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("pdf generation failed: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("nothing to export: {0}")]
    Empty(String),
}

/// Deterministic file name from entity fields: lowercase, alphanumerics
/// kept, everything else collapsed to single dashes.
pub fn export_file_name(parts: &[&str], extension: &str) -> String {
    let mut slug = String::new();
    for part in parts {
        if part.trim().is_empty() {
            continue;
        }
        if !slug.is_empty() {
            slug.push('-');
        }
        let mut last_dash = false;
        for ch in part.trim().chars() {
            if ch.is_alphanumeric() {
                slug.extend(ch.to_lowercase());
                last_dash = false;
            } else if !last_dash {
                slug.push('-');
                last_dash = true;
            }
        }
        while slug.ends_with('-') {
            slug.pop();
        }
    }
    if slug.is_empty() {
        slug.push_str("export");
    }
    format!("{slug}.{extension}")
}

/// Indonesian-style grouping: `Rp 1.234.567`.
pub fn format_rupiah(amount: i64) -> String {
    let negative = amount < 0;
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    if negative {
        format!("-Rp {grouped}")
    } else {
        format!("Rp {grouped}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_slugged_and_deterministic() {
        assert_eq!(
            export_file_name(&["SD Harapan Bangsa", "Semester Ganjil 2025"], "pdf"),
            "sd-harapan-bangsa-semester-ganjil-2025.pdf"
        );
        assert_eq!(export_file_name(&["", "  "], "csv"), "export.csv");
    }

    #[test]
    fn rupiah_grouping() {
        assert_eq!(format_rupiah(0), "Rp 0");
        assert_eq!(format_rupiah(1500), "Rp 1.500");
        assert_eq!(format_rupiah(12_345_678), "Rp 12.345.678");
        assert_eq!(format_rupiah(-250_000), "-Rp 250.000");
    }
}
