// Upload processing: validate → extract → classify → aggregate.
//
// Any failure aborts the whole upload; partial dealer maps are never returned.
use crate::aggregate::aggregate;
use crate::classify::classify;
use crate::config::Settings;
use crate::error::{LeadError, Result};
use crate::extract::{extract_delimited, extract_file, InputFormat};
use crate::types::{DealerMap, RawRow};
use log::info;
use std::path::Path;

/// Check extension and size before reading the file.
pub fn validate_upload(path: &Path, max_bytes: u64) -> Result<InputFormat> {
    let format = InputFormat::from_path(path)?;
    let size = std::fs::metadata(path)?.len();
    if size > max_bytes {
        return Err(LeadError::FileTooLarge { size, limit: max_bytes });
    }
    Ok(format)
}

/// Classify extracted rows and aggregate the form leads per dealer.
pub fn analyze_rows(rows: Vec<RawRow>, settings: &Settings) -> Result<DealerMap> {
    let total = rows.len();
    let leads = classify(rows, &settings.aliases);
    if leads.is_empty() {
        return Err(LeadError::NoMatchingLeads);
    }
    let dealers = aggregate(&leads, &settings.aliases);
    info!(
        "{} rows, {} form leads, {} dealer(s)",
        total,
        leads.len(),
        dealers.len()
    );
    Ok(dealers)
}

pub fn process_text(text: &str, settings: &Settings) -> Result<DealerMap> {
    let rows = extract_delimited(text, &settings.layout)?;
    analyze_rows(rows, settings)
}

pub fn process_file(path: &Path, settings: &Settings) -> Result<DealerMap> {
    validate_upload(path, settings.max_upload_bytes)?;
    let rows = extract_file(path, &settings.layout)?;
    analyze_rows(rows, settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn rejects_wrong_extension_and_oversize() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("leads.txt");
        std::fs::write(&txt, "x").unwrap();
        assert!(matches!(
            validate_upload(&txt, 100),
            Err(LeadError::UnsupportedFormat(_))
        ));

        let csv = dir.path().join("leads.csv");
        let mut f = std::fs::File::create(&csv).unwrap();
        f.write_all(&[b'a'; 64]).unwrap();
        assert!(matches!(
            validate_upload(&csv, 32),
            Err(LeadError::FileTooLarge { size: 64, limit: 32 })
        ));
        assert_eq!(validate_upload(&csv, 64).unwrap(), InputFormat::Delimited);
    }

    #[test]
    fn rows_without_form_leads_report_no_matching_leads() {
        let rows: Vec<RawRow> = vec![[("Lead Type".to_string(), "Phone".to_string())]
            .into_iter()
            .collect()];
        assert!(matches!(
            analyze_rows(rows, &Settings::default()),
            Err(LeadError::NoMatchingLeads)
        ));
    }
}
