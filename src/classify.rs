use crate::config::FieldAliases;
use crate::types::{ClassifiedLead, RawRow};
use log::{debug, warn};

/// First lead-type alias present as a column of the first row.
pub fn lead_type_column<'a>(rows: &[RawRow], aliases: &'a FieldAliases) -> Option<&'a str> {
    let first = rows.first()?;
    aliases
        .lead_type
        .iter()
        .map(String::as_str)
        .find(|alias| first.contains_key(*alias))
}

/// Whether a lead-type label denotes a web-form lead.
///
/// Matches the token case-insensitively on the trimmed value, or as a
/// case-sensitive substring (`"Form - Website"`, `"Web Form"`).
pub fn is_form_lead(label: &str, token: &str) -> bool {
    label.trim().eq_ignore_ascii_case(token) || label.contains(token)
}

/// Keep only form leads. An unrecognized lead-type column yields no rows.
pub fn classify(rows: Vec<RawRow>, aliases: &FieldAliases) -> Vec<ClassifiedLead> {
    let Some(column) = lead_type_column(&rows, aliases) else {
        if !rows.is_empty() {
            warn!("no lead type column found among {:?}", aliases.lead_type);
        }
        return Vec::new();
    };
    let total = rows.len();
    let leads: Vec<ClassifiedLead> = rows
        .into_iter()
        .filter(|row| {
            row.get(column)
                .is_some_and(|label| is_form_lead(label, &aliases.form_token))
        })
        .collect();
    debug!(
        "lead type column '{}': {} of {} rows are form leads",
        column,
        leads.len(),
        total
    );
    leads
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn picks_first_alias_in_priority_order() {
        let aliases = FieldAliases::default();
        let rows = vec![row(&[("Type", "x"), ("LeadType", "Form")])];
        assert_eq!(lead_type_column(&rows, &aliases), Some("LeadType"));
    }

    #[test]
    fn matches_form_variants() {
        assert!(is_form_lead("Form", "Form"));
        assert!(is_form_lead(" form ", "Form"));
        assert!(is_form_lead("FORM", "Form"));
        assert!(is_form_lead("Web Form", "Form"));
        assert!(!is_form_lead("Phone", "Form"));
        assert!(!is_form_lead("web form", "Form"));
        assert!(!is_form_lead("", "Form"));
    }

    #[test]
    fn filters_to_form_leads() {
        let rows = vec![
            row(&[("Lead Type", "Form")]),
            row(&[("Lead Type", "Phone")]),
            row(&[("Lead Type", "Form - Chat")]),
            row(&[("Lead Type", "")]),
        ];
        let leads = classify(rows, &FieldAliases::default());
        assert_eq!(leads.len(), 2);
    }

    #[test]
    fn unknown_column_yields_nothing() {
        let rows = vec![row(&[("Category", "Form")])];
        assert!(classify(rows, &FieldAliases::default()).is_empty());
        assert!(classify(Vec::new(), &FieldAliases::default()).is_empty());
    }

    #[test]
    fn column_is_chosen_from_first_row_only() {
        let rows = vec![
            row(&[("Kind", "Form")]),
            row(&[("Lead Type", "Form")]),
        ];
        assert!(classify(rows, &FieldAliases::default()).is_empty());
    }
}
