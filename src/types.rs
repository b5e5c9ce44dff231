use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use tabled::Tabled;

/// One data row keyed by header name, plus the injected `"Dealer Name"`.
pub type RawRow = HashMap<String, String>;

/// A row that passed the form-lead filter. Same shape as [`RawRow`].
pub type ClassifiedLead = RawRow;

/// Dealer name → metrics, ordered by dealer name.
pub type DealerMap = BTreeMap<String, DealerMetrics>;

/// Fixed-point decimal with a set number of places, rendered as `"50.00"`.
///
/// Rates are carried as integer units so that complementary percentages
/// (response / no-response) add up exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fixed {
    units: i64,
    places: u32,
}

impl Fixed {
    pub fn from_units(units: i64, places: u32) -> Self {
        Fixed { units, places }
    }

    pub fn zero(places: u32) -> Self {
        Fixed { units: 0, places }
    }

    pub fn units(&self) -> i64 {
        self.units
    }

    pub fn places(&self) -> u32 {
        self.places
    }

    pub fn as_f64(&self) -> f64 {
        self.units as f64 / 10f64.powi(self.places as i32)
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let div = 10i64.pow(self.places);
        let sign = if self.units < 0 { "-" } else { "" };
        let abs = self.units.abs();
        if self.places == 0 {
            write!(f, "{}{}", sign, abs)
        } else {
            write!(f, "{}{}.{:0width$}", sign, abs / div, abs % div, width = self.places as usize)
        }
    }
}

impl FromStr for Fixed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));
        let digits = format!("{}{}", int_part, frac_part);
        let units = digits
            .parse::<i64>()
            .map_err(|_| format!("not a fixed-point number: '{}'", s))?;
        Ok(Fixed { units, places: frac_part.len() as u32 })
    }
}

impl Serialize for Fixed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Fixed {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Per-dealer aggregate over the form leads of one upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealerMetrics {
    pub dealer_name: String,
    pub total_leads: u64,
    pub total_sales: u64,
    /// Two places.
    pub conversion_rate: Fixed,
    pub no_response_count: u64,
    /// One place.
    pub no_response_rate: Fixed,
    /// One place; always `100.0 - no_response_rate`.
    pub response_rate: Fixed,
    pub leads_by_source: BTreeMap<String, u64>,
    /// `YYYY-MM` → leads with a parseable date in that month.
    pub leads_by_month: BTreeMap<String, u64>,
    pub data_months: u32,
    pub monthly_lead_average: u64,
}

/// Network-wide reference values for one benchmark set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkMetrics {
    pub total_leads: u64,
    pub conversion_rate: f64,
    pub response_rate: f64,
    pub no_response_rate: f64,
    pub fifteen_min_response: f64,
    pub avg_response_time: f64,
    pub median_response_time: f64,
}

impl Default for BenchmarkMetrics {
    fn default() -> Self {
        BenchmarkMetrics {
            total_leads: 27047,
            conversion_rate: 16.12,
            response_rate: 54.9,
            no_response_rate: 45.1,
            fifteen_min_response: 31.7,
            avg_response_time: 5.5,
            median_response_time: 12.0,
        }
    }
}

/// Persisted benchmark store record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkData {
    pub benchmark_sets: BTreeMap<String, BenchmarkMetrics>,
    pub active_benchmark: String,
}

/// Interchange document for exporting or importing a single set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkExport {
    pub name: String,
    /// ISO-8601 timestamp of the export.
    #[serde(default)]
    pub date: String,
    pub metrics: BenchmarkMetrics,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DealerSummaryRow {
    #[serde(rename = "Dealer")]
    #[tabled(rename = "Dealer")]
    pub dealer: String,
    #[serde(rename = "FormLeads")]
    #[tabled(rename = "FormLeads")]
    pub total_leads: String,
    #[serde(rename = "Sales")]
    #[tabled(rename = "Sales")]
    pub total_sales: String,
    #[serde(rename = "ConversionRate")]
    #[tabled(rename = "ConversionRate")]
    pub conversion_rate: String,
    #[serde(rename = "ResponseRate")]
    #[tabled(rename = "ResponseRate")]
    pub response_rate: String,
    #[serde(rename = "NoResponseRate")]
    #[tabled(rename = "NoResponseRate")]
    pub no_response_rate: String,
    #[serde(rename = "DataMonths")]
    #[tabled(rename = "DataMonths")]
    pub data_months: u32,
    #[serde(rename = "MonthlyAvg")]
    #[tabled(rename = "MonthlyAvg")]
    pub monthly_lead_average: String,
    #[serde(rename = "Tier")]
    #[tabled(rename = "Tier")]
    pub tier: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct SourceShareRow {
    #[serde(rename = "Source")]
    #[tabled(rename = "Source")]
    pub source: String,
    #[serde(rename = "Leads")]
    #[tabled(rename = "Leads")]
    pub leads: u64,
    #[serde(rename = "Share")]
    #[tabled(rename = "Share")]
    pub share: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct BenchmarkRow {
    #[serde(rename = "Active")]
    #[tabled(rename = "Active")]
    pub active: String,
    #[serde(rename = "Name")]
    #[tabled(rename = "Name")]
    pub name: String,
    #[serde(rename = "TotalLeads")]
    #[tabled(rename = "TotalLeads")]
    pub total_leads: String,
    #[serde(rename = "Conversion")]
    #[tabled(rename = "Conversion")]
    pub conversion_rate: String,
    #[serde(rename = "Response")]
    #[tabled(rename = "Response")]
    pub response_rate: String,
    #[serde(rename = "NoResponse")]
    #[tabled(rename = "NoResponse")]
    pub no_response_rate: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ProjectionRow {
    #[serde(rename = "Metric")]
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "Current")]
    #[tabled(rename = "Current")]
    pub current: String,
    #[serde(rename = "Projected")]
    #[tabled(rename = "Projected")]
    pub projected: String,
    #[serde(rename = "Improvement")]
    #[tabled(rename = "Improvement")]
    pub improvement: String,
}
