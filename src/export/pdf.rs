//! Line-oriented PDF rendering over lopdf. Good enough for the printed
//! report and budget-plan forms; layout is monospaced columns, A4 portrait.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::models::{EvaluationItem, RabData, Report};

use super::{format_rupiah, ExportError};

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;
const LEADING: i64 = 14;
const LINES_PER_PAGE: usize = 52;

pub fn report_pdf(report: &Report) -> Result<Vec<u8>, ExportError> {
    let mut lines = vec![
        "LAPORAN KEPALA SEKOLAH".to_string(),
        String::new(),
        format!("Sekolah         : {}", report.school_name),
        format!("Kepala Sekolah  : {}", report.principal_name),
        format!("Periode         : {}", report.period.label()),
        format!("Tanggal         : {}", report.date),
        format!("Status          : {}", report.status.as_str()),
        String::new(),
        "KEGIATAN".to_string(),
    ];
    for (i, activity) in report.activities.iter().enumerate() {
        let date = activity
            .date
            .map(|d| format!(" ({d})"))
            .unwrap_or_default();
        lines.push(format!("{:>3}. {}{}", i + 1, activity.name, date));
        if let Some(desc) = &activity.description {
            lines.push(format!("     {desc}"));
        }
    }
    lines.push(String::new());
    lines.push("PRESTASI".to_string());
    for (i, achievement) in report.achievements.iter().enumerate() {
        lines.push(format!("{:>3}. {}", i + 1, achievement.title));
    }
    lines.push(String::new());
    lines.push("EVALUASI".to_string());
    for item in EvaluationItem::ALL {
        let principal = report
            .principal_evaluation
            .get(&item)
            .map(|s| s.value().to_string())
            .unwrap_or_else(|| "-".to_string());
        let foundation = report
            .foundation_evaluation
            .get(&item)
            .map(|s| s.value().to_string())
            .unwrap_or_else(|| "-".to_string());
        lines.push(format!(
            "  {:<24} kepala sekolah: {:>2}   yayasan: {:>2}",
            item.label(),
            principal,
            foundation
        ));
    }
    if let Some(comment) = &report.foundation_comment {
        lines.push(String::new());
        lines.push(format!("Catatan yayasan: {comment}"));
    }

    render_lines(&lines)
}

pub fn rab_pdf(rab: &RabData) -> Result<Vec<u8>, ExportError> {
    let mut lines = vec![
        "RENCANA ANGGARAN BIAYA".to_string(),
        String::new(),
        format!("Lembaga : {}", rab.institution_name),
        format!("Periode : {} {}", rab.period, rab.year),
        format!("Status  : {}", rab.status.as_str()),
        String::new(),
    ];

    for (title, items) in [
        ("BELANJA RUTIN", &rab.routine_expenses),
        ("BELANJA INSIDENTAL", &rab.incidental_expenses),
    ] {
        lines.push(title.to_string());
        if items.is_empty() {
            lines.push("  (tidak ada)".to_string());
        }
        for (i, item) in items.iter().enumerate() {
            lines.push(format!(
                "{:>3}. {:<30} {:>4} {:<6} @{:>14} = {:>14}",
                i + 1,
                truncate(&item.description, 30),
                item.volume,
                item.unit.as_str(),
                format_rupiah(item.unit_price),
                format_rupiah(item.amount),
            ));
        }
        let total: i64 = items.iter().map(|i| i.amount).sum();
        lines.push(format!("{:>62} {:>14}", "Total:", format_rupiah(total)));
        lines.push(String::new());
    }

    lines.push(format!(
        "{:>62} {:>14}",
        "Total keseluruhan:",
        format_rupiah(rab.total_amount())
    ));

    let signatures = [
        ("Disusun oleh", &rab.signatures.prepared_by),
        ("Bendahara", &rab.signatures.treasurer),
        ("Kepala Sekolah", &rab.signatures.principal),
        ("Ketua Komite", &rab.signatures.committee_chair),
        ("Ketua Yayasan", &rab.signatures.foundation_chair),
    ];
    if signatures.iter().any(|(_, name)| name.is_some()) {
        lines.push(String::new());
        lines.push("TANDA TANGAN".to_string());
        for (label, name) in signatures {
            if let Some(name) = name {
                lines.push(format!("  {label:<16}: {name}"));
            }
        }
    }

    render_lines(&lines)
}

/// Lays text lines onto as many A4 pages as needed.
fn render_lines(lines: &[String]) -> Result<Vec<u8>, ExportError> {
    if lines.is_empty() {
        return Err(ExportError::Empty("no lines to render".into()));
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for chunk in lines.chunks(LINES_PER_PAGE) {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 10.into()]),
            Operation::new("TL", vec![LEADING.into()]),
            Operation::new("Td", vec![MARGIN.into(), (PAGE_HEIGHT - MARGIN).into()]),
        ];
        for line in chunk {
            operations.push(Operation::new("Tj", vec![Object::string_literal(line.as_str())]));
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(2)).collect();
        format!("{cut}..")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    use crate::models::{Activity, ReportPeriod, ReportStatus, Score};

    #[test]
    fn report_pdf_has_pages_and_content() {
        let report_id = Uuid::new_v4();
        let mut principal_evaluation = BTreeMap::new();
        principal_evaluation.insert(EvaluationItem::Curriculum, Score::new(8).unwrap());
        let report = Report {
            id: report_id,
            user_id: Uuid::new_v4(),
            date: Utc::now().date_naive(),
            principal_name: "Ibu Sari".into(),
            school_name: "SD Harapan".into(),
            period: ReportPeriod::OddSemester,
            activities: vec![Activity {
                id: Uuid::new_v4(),
                report_id,
                name: "Upacara bendera".into(),
                description: None,
                date: None,
            }],
            achievements: vec![],
            principal_evaluation,
            foundation_evaluation: BTreeMap::new(),
            foundation_comment: None,
            status: ReportStatus::Draft,
            submitted_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let bytes = report_pdf(&report).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        // Uncompressed content stream keeps the text findable.
        let haystack = String::from_utf8_lossy(&bytes);
        assert!(haystack.contains("SD Harapan"));
        assert!(haystack.contains("Upacara bendera"));
    }
}
