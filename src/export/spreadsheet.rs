//! Tabular workbook built from a loaded entity graph. The same rows feed
//! the CSV download and the Sheets integration payload.

use crate::models::{EstimatedWeek, EvaluationItem, RabData, Report};

use super::format_rupiah;

#[derive(Debug, Clone)]
pub struct Workbook {
    pub title: String,
    pub sheets: Vec<Sheet>,
}

#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl Workbook {
    /// One CSV byte stream; sheets are separated by a `# name` banner line.
    /// Cells containing commas, quotes or newlines are quoted.
    pub fn to_csv_bytes(&self) -> Vec<u8> {
        let mut out = String::new();
        for (i, sheet) in self.sheets.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&format!("# {}\n", sheet.name));
            for row in &sheet.rows {
                let line: Vec<String> = row.iter().map(|cell| csv_cell(cell)).collect();
                out.push_str(&line.join(","));
                out.push('\n');
            }
        }
        out.into_bytes()
    }
}

fn csv_cell(value: &str) -> String {
    if value.contains(['"', ',', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn rab_workbook(rab: &RabData) -> Workbook {
    let mut sheets = Vec::new();

    for (name, items) in [
        ("Belanja Rutin", &rab.routine_expenses),
        ("Belanja Insidental", &rab.incidental_expenses),
    ] {
        let mut rows = vec![vec![
            "No".to_string(),
            "Uraian".to_string(),
            "Volume".to_string(),
            "Satuan".to_string(),
            "Harga Satuan".to_string(),
            "Jumlah".to_string(),
            "Sumber Dana".to_string(),
            "Minggu".to_string(),
        ]];
        for (i, item) in items.iter().enumerate() {
            rows.push(vec![
                (i + 1).to_string(),
                item.description.clone(),
                item.volume.to_string(),
                item.unit.as_str().to_string(),
                format_rupiah(item.unit_price),
                format_rupiah(item.amount),
                item.fund_source.as_str().to_string(),
                item.estimated_week.number().to_string(),
            ]);
        }
        let total: i64 = items.iter().map(|i| i.amount).sum();
        rows.push(vec![
            String::new(),
            "Total".to_string(),
            String::new(),
            String::new(),
            String::new(),
            format_rupiah(total),
            String::new(),
            String::new(),
        ]);
        sheets.push(Sheet {
            name: name.to_string(),
            rows,
        });
    }

    let summary = rab.weekly_summary();
    let mut rows = vec![vec!["Minggu".to_string(), "Sumber Dana".to_string(), "Jumlah".to_string()]];
    for week in EstimatedWeek::ALL {
        if let Some(funds) = summary.weeks.get(&week) {
            for (fund, total) in funds {
                rows.push(vec![
                    week.number().to_string(),
                    fund.as_str().to_string(),
                    format_rupiah(*total),
                ]);
            }
        }
    }
    sheets.push(Sheet {
        name: "Rekap Mingguan".to_string(),
        rows,
    });

    Workbook {
        title: format!("RAB {} {} {}", rab.institution_name, rab.period, rab.year),
        sheets,
    }
}

pub fn report_workbook(report: &Report) -> Workbook {
    let mut sheets = Vec::new();

    let mut rows = vec![vec!["Kegiatan".to_string(), "Keterangan".to_string(), "Tanggal".to_string()]];
    for activity in &report.activities {
        rows.push(vec![
            activity.name.clone(),
            activity.description.clone().unwrap_or_default(),
            activity
                .date
                .map(|d| d.to_string())
                .unwrap_or_default(),
        ]);
    }
    sheets.push(Sheet {
        name: "Kegiatan".to_string(),
        rows,
    });

    let mut rows = vec![vec!["Prestasi".to_string(), "Keterangan".to_string()]];
    for achievement in &report.achievements {
        rows.push(vec![
            achievement.title.clone(),
            achievement.description.clone().unwrap_or_default(),
        ]);
    }
    sheets.push(Sheet {
        name: "Prestasi".to_string(),
        rows,
    });

    let mut rows = vec![vec![
        "Aspek".to_string(),
        "Nilai Kepala Sekolah".to_string(),
        "Nilai Yayasan".to_string(),
    ]];
    for item in EvaluationItem::ALL {
        rows.push(vec![
            item.label().to_string(),
            report
                .principal_evaluation
                .get(&item)
                .map(|s| s.value().to_string())
                .unwrap_or_default(),
            report
                .foundation_evaluation
                .get(&item)
                .map(|s| s.value().to_string())
                .unwrap_or_default(),
        ]);
    }
    sheets.push(Sheet {
        name: "Evaluasi".to_string(),
        rows,
    });

    Workbook {
        title: format!(
            "Laporan {} {}",
            report.school_name,
            report.period.label()
        ),
        sheets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    use crate::models::{
        ExpenseItem, ExpenseKind, ExpenseUnit, EstimatedWeek, FundSource, RabStatus, Signatures,
    };

    fn sample_rab() -> RabData {
        let rab_id = Uuid::new_v4();
        RabData {
            id: rab_id,
            user_id: Uuid::new_v4(),
            institution_name: "SD Harapan".into(),
            period: "Juli".into(),
            year: 2026,
            routine_expenses: vec![ExpenseItem {
                id: Uuid::new_v4(),
                rab_id,
                description: "Kertas A4".into(),
                volume: 10,
                unit: ExpenseUnit::Ream,
                unit_price: 55_000,
                amount: 550_000,
                fund_source: FundSource::Bos,
                estimated_week: EstimatedWeek::Week2,
                kind: ExpenseKind::Routine,
            }],
            incidental_expenses: vec![],
            status: RabStatus::Draft,
            submitted_at: None,
            reviewed_at: None,
            review_comment: None,
            signatures: Signatures::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn rab_workbook_contains_item_and_total() {
        let workbook = rab_workbook(&sample_rab());
        let csv = String::from_utf8(workbook.to_csv_bytes()).unwrap();
        assert!(csv.contains("Kertas A4"));
        assert!(csv.contains("Rp 550.000"));
        assert!(csv.contains("# Rekap Mingguan"));
    }

    #[test]
    fn cells_with_commas_are_quoted() {
        let workbook = Workbook {
            title: "t".into(),
            sheets: vec![Sheet {
                name: "s".into(),
                rows: vec![vec!["a,b".into(), "plain".into()]],
            }],
        };
        let csv = String::from_utf8(workbook.to_csv_bytes()).unwrap();
        assert!(csv.contains("\"a,b\",plain"));
    }
}
