use crate::config::{
    FieldAliases, ALL_DEALERS, DEALER_NAME_KEY, DEFAULT_DATA_MONTHS, UNKNOWN_SOURCE,
};
use crate::types::{ClassifiedLead, DealerMap, DealerMetrics, Fixed};
use crate::util::{month_span, parse_date_safe, percent_units};
use chrono::NaiveDate;
use log::debug;
use std::collections::BTreeMap;

/// First non-blank value among `aliases`, in order.
fn first_present<'a>(lead: &'a ClassifiedLead, aliases: &[String]) -> Option<&'a str> {
    aliases
        .iter()
        .filter_map(|alias| lead.get(alias))
        .map(String::as_str)
        .find(|v| !v.trim().is_empty())
}

fn is_blank(lead: &ClassifiedLead, column: &str) -> bool {
    lead.get(column).map_or(true, |v| v.trim().is_empty())
}

fn no_response(lead: &ClassifiedLead, column: &str) -> bool {
    match lead.get(column).map(|v| v.trim()) {
        None | Some("") | Some("N/A") => true,
        Some(_) => false,
    }
}

/// Group form leads by dealer and compute a metrics record per dealer.
///
/// Leads with an empty dealer name are left out of the per-dealer groups.
/// When no lead carries a dealer name, everything lands in `"All Dealers"`.
pub fn aggregate(leads: &[ClassifiedLead], aliases: &FieldAliases) -> DealerMap {
    let mut groups: BTreeMap<&str, Vec<&ClassifiedLead>> = BTreeMap::new();
    for lead in leads {
        let dealer = lead.get(DEALER_NAME_KEY).map(String::as_str).unwrap_or("");
        if !dealer.is_empty() {
            groups.entry(dealer).or_default().push(lead);
        }
    }

    let mut out = DealerMap::new();
    if groups.is_empty() {
        let all: Vec<&ClassifiedLead> = leads.iter().collect();
        out.insert(ALL_DEALERS.to_string(), dealer_metrics(ALL_DEALERS, &all, aliases));
        return out;
    }
    for (dealer, group) in groups {
        out.insert(dealer.to_string(), dealer_metrics(dealer, &group, aliases));
    }
    debug!("aggregated {} leads into {} dealers", leads.len(), out.len());
    out
}

/// Metrics for one dealer's leads.
pub fn dealer_metrics(
    name: &str,
    leads: &[&ClassifiedLead],
    aliases: &FieldAliases,
) -> DealerMetrics {
    let total_leads = leads.len() as u64;
    let total_sales = leads
        .iter()
        .filter(|l| !is_blank(l, &aliases.sale_date))
        .count() as u64;
    let no_response_count = leads
        .iter()
        .filter(|l| no_response(l, &aliases.response_date))
        .count() as u64;

    let mut leads_by_source: BTreeMap<String, u64> = BTreeMap::new();
    let mut leads_by_month: BTreeMap<String, u64> = BTreeMap::new();
    let mut range: Option<(NaiveDate, NaiveDate)> = None;
    for lead in leads {
        let source = first_present(lead, &aliases.source).unwrap_or(UNKNOWN_SOURCE);
        *leads_by_source.entry(source.to_string()).or_default() += 1;

        if let Some(date) = parse_date_safe(first_present(lead, &aliases.lead_date)) {
            *leads_by_month.entry(date.format("%Y-%m").to_string()).or_default() += 1;
            range = Some(match range {
                Some((lo, hi)) => (lo.min(date), hi.max(date)),
                None => (date, date),
            });
        }
    }

    let data_months = match range {
        Some((first, last)) => month_span(first, last),
        None => DEFAULT_DATA_MONTHS,
    };
    let months = data_months as u64;
    let monthly_lead_average = (total_leads * 2 + months) / (months * 2);

    let no_response_tenths = percent_units(no_response_count, total_leads, 1);
    let response_tenths = 1000 - no_response_tenths;

    DealerMetrics {
        dealer_name: name.to_string(),
        total_leads,
        total_sales,
        conversion_rate: Fixed::from_units(percent_units(total_sales, total_leads, 2), 2),
        no_response_count,
        no_response_rate: Fixed::from_units(no_response_tenths, 1),
        response_rate: Fixed::from_units(response_tenths, 1),
        leads_by_source,
        leads_by_month,
        data_months,
        monthly_lead_average,
    }
}

/// Performance band by conversion rate.
pub fn performance_tier(conversion_rate: f64) -> &'static str {
    if conversion_rate >= 20.0 {
        "Elite Performer"
    } else if conversion_rate >= 16.0 {
        "Strong Performer"
    } else if conversion_rate >= 12.0 {
        "Average Performer"
    } else {
        "Challenge Dealer"
    }
}

/// Sources by lead count, largest first, ties by name, limited to `limit`.
pub fn top_sources(metrics: &DealerMetrics, limit: usize) -> Vec<(String, u64)> {
    let mut sources: Vec<(String, u64)> = metrics
        .leads_by_source
        .iter()
        .map(|(k, v)| (k.clone(), *v))
        .collect();
    sources.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sources.truncate(limit);
    sources
}
