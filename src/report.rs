//! Report renderers.
//!
//! Every function here is pure: metrics and benchmarks in, a document string
//! out. Anything that originated in an uploaded file (dealer names, source
//! labels) is entity-escaped before it lands in HTML.

use crate::aggregate::{performance_tier, top_sources};
use crate::roi::{one_point_lift, projection_rows, RoiInputs, RoiProjection};
use crate::sanitize::escape_html;
use crate::types::{
    BenchmarkMetrics, DealerMap, DealerMetrics, DealerSummaryRow, Fixed, SourceShareRow,
};
use crate::util::{format_int, format_money, format_number, percent_units};
use std::fmt::Write as _;
use tabled::{settings::Style, Table};

/// Annualization factor for the six-month export window.
const ANNUALIZE: u64 = 2;

/// No-response rate above which a reduction is recommended.
const NO_RESPONSE_CEILING: f64 = 30.0;

pub fn dealer_summary_rows(dealers: &DealerMap) -> Vec<DealerSummaryRow> {
    dealers
        .values()
        .map(|m| DealerSummaryRow {
            dealer: m.dealer_name.clone(),
            total_leads: format_int(m.total_leads),
            total_sales: format_int(m.total_sales),
            conversion_rate: format!("{}%", m.conversion_rate),
            response_rate: format!("{}%", m.response_rate),
            no_response_rate: format!("{}%", m.no_response_rate),
            data_months: m.data_months,
            monthly_lead_average: format_int(m.monthly_lead_average),
            tier: performance_tier(m.conversion_rate.as_f64()).to_string(),
        })
        .collect()
}

/// Top sources with their share of the dealer's leads.
pub fn source_rows(metrics: &DealerMetrics, limit: usize) -> Vec<SourceShareRow> {
    top_sources(metrics, limit)
        .into_iter()
        .map(|(source, leads)| SourceShareRow {
            share: format!(
                "{}%",
                Fixed::from_units(percent_units(leads, metrics.total_leads, 1), 1)
            ),
            source,
            leads,
        })
        .collect()
}

pub fn recommendations(metrics: &DealerMetrics, bench: &BenchmarkMetrics) -> Vec<String> {
    let mut out = Vec::new();
    if metrics.response_rate.as_f64() < bench.response_rate {
        out.push(format!(
            "Improve response rate to match network average of {}%",
            bench.response_rate
        ));
    }
    if metrics.conversion_rate.as_f64() < bench.conversion_rate {
        out.push(format!(
            "Focus on conversion optimization to reach network average of {}%",
            bench.conversion_rate
        ));
    }
    if metrics.no_response_rate.as_f64() > NO_RESPONSE_CEILING {
        out.push(format!(
            "Reduce no-response rate from {}% to under 30%",
            metrics.no_response_rate
        ));
    }
    out.push("Analyze top-performing lead sources for optimization opportunities".into());
    out.push("Implement automated response systems for faster lead engagement".into());
    out
}

/// Annual sales and revenue now versus at the network conversion rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkGap {
    pub current_sales: u64,
    pub network_sales: u64,
    pub sales_opportunity: u64,
    pub current_revenue: f64,
    pub network_revenue: f64,
    pub revenue_opportunity: f64,
}

pub fn network_gap(
    metrics: &DealerMetrics,
    bench: &BenchmarkMetrics,
    deal_value: f64,
) -> NetworkGap {
    let annual_leads = (metrics.total_leads * ANNUALIZE) as f64;
    let current_sales = metrics.total_sales * ANNUALIZE;
    let at_network = annual_leads * (bench.conversion_rate / 100.0);
    let network_sales = at_network.round().max(0.0) as u64;
    let current_revenue = current_sales as f64 * deal_value;
    let network_revenue = (at_network * deal_value).round();
    NetworkGap {
        current_sales,
        network_sales,
        sales_opportunity: network_sales.saturating_sub(current_sales),
        current_revenue,
        network_revenue,
        revenue_opportunity: (network_revenue - current_revenue).max(0.0),
    }
}

fn comparison(value: f64, network: f64) -> &'static str {
    if value >= network {
        "exceeding"
    } else {
        "below"
    }
}

/// Console dealer analysis: headline figures, tier and top sources.
pub fn dealer_report(metrics: &DealerMetrics, bench: &BenchmarkMetrics) -> String {
    let conv = metrics.conversion_rate.as_f64();
    let mut s = String::new();
    let _ = writeln!(s, "{} - Performance Analysis\n", metrics.dealer_name);
    let _ = writeln!(
        s,
        "{} processed {} form leads with a {}% conversion rate, {} the network average of {}%.\n",
        metrics.dealer_name,
        format_int(metrics.total_leads),
        metrics.conversion_rate,
        comparison(conv, bench.conversion_rate),
        bench.conversion_rate
    );
    let _ = writeln!(s, "Total Form Leads:  {}", format_int(metrics.total_leads));
    let _ = writeln!(s, "Total Sales:       {}", format_int(metrics.total_sales));
    let _ = writeln!(
        s,
        "Conversion Rate:   {}% (Network: {}%)",
        metrics.conversion_rate, bench.conversion_rate
    );
    let _ = writeln!(
        s,
        "Response Rate:     {}% (Network: {}%)",
        metrics.response_rate, bench.response_rate
    );
    let _ = writeln!(
        s,
        "Data Period:       {} month(s), {} leads/month",
        metrics.data_months, metrics.monthly_lead_average
    );
    let _ = writeln!(s, "Classification:    {}\n", performance_tier(conv));

    let sources = source_rows(metrics, 5);
    if !sources.is_empty() {
        let _ = writeln!(s, "Top Lead Sources\n");
        let _ = writeln!(s, "{}", Table::new(sources).with(Style::markdown()));
    }
    s
}

pub fn network_report(set_name: &str, bench: &BenchmarkMetrics) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "Network Performance Report\n");
    let _ = writeln!(s, "Benchmark Set:           {}", set_name);
    let _ = writeln!(s, "Total Network Leads:     {}", format_int(bench.total_leads));
    let _ = writeln!(s, "Network Conversion Rate: {}%", bench.conversion_rate);
    let _ = writeln!(s, "Network Response Rate:   {}%", bench.response_rate);
    let _ = writeln!(s, "No Response Rate:        {}%", bench.no_response_rate);
    let _ = writeln!(s, "15-Minute Response:      {}%", bench.fifteen_min_response);
    let _ = writeln!(s, "Avg Response Time:       {} h", bench.avg_response_time);
    let _ = writeln!(s, "Median Response Time:    {} h", bench.median_response_time);
    s
}

pub fn roi_report(
    dealer: Option<&str>,
    inputs: &RoiInputs,
    projection: &RoiProjection,
    bench: &BenchmarkMetrics,
) -> String {
    let i = inputs.clamped();
    let mut s = String::new();
    let _ = writeln!(s, "ROI Projection Report\n");
    let _ = writeln!(s, "Dealership:          {}", dealer.unwrap_or("Your Dealership"));
    let _ = writeln!(s, "Monthly Leads:       {}", format_number(i.monthly_leads, 0));
    let _ = writeln!(s, "Current Conversion:  {}%", i.current_conversion);
    let _ = writeln!(s, "Target Conversion:   {}%", i.target_conversion);
    let _ = writeln!(s, "Average Deal Value:  {}\n", format_money(i.avg_deal_value));
    let _ = writeln!(s, "{}\n", Table::new(projection_rows(projection)).with(Style::markdown()));
    let _ = writeln!(s, "Network Average Conversion Rate: {}%", bench.conversion_rate);
    let _ = writeln!(
        s,
        "A 1% increase in conversion rate = {} additional sales annually",
        one_point_lift(projection.annual_leads)
    );
    s
}

/// Printable HTML executive summary for one dealer.
///
/// `generated` is the timestamp text shown on the report.
pub fn executive_summary_html(
    metrics: &DealerMetrics,
    bench: &BenchmarkMetrics,
    deal_value: f64,
    generated: &str,
) -> String {
    let name = escape_html(&metrics.dealer_name);
    let conv = metrics.conversion_rate.as_f64();
    let color = if conv >= bench.conversion_rate { "green" } else { "red" };
    let gap = network_gap(metrics, bench, deal_value);

    let mut h = String::new();
    let _ = write!(
        h,
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{name} - Executive Summary</title>\
         <style>body{{font-family:Arial,sans-serif;line-height:1.6;color:#333;max-width:800px;margin:0 auto;padding:40px}}\
         h1{{color:#003478;border-bottom:3px solid #003478}}h2{{color:#0055b8;margin-top:30px}}\
         table{{width:100%;border-collapse:collapse;margin:20px 0}}th,td{{padding:10px;text-align:left;border-bottom:1px solid #ddd}}\
         .metric-value{{font-size:1.5em;color:#003478}}.comparison{{color:{color}}}\
         @media print{{body{{padding:20px}}}}</style></head><body>"
    );
    let _ = write!(h, "<h1>{name}</h1><h2>Executive Summary - Lead Performance Analysis</h2>");
    let _ = write!(h, "<p><strong>Analysis Date:</strong> {}</p>", escape_html(generated));
    let _ = write!(
        h,
        "<div class=\"metric\"><strong>Total Form Leads Analyzed:</strong> <span class=\"metric-value\">{}</span></div>",
        format_int(metrics.total_leads)
    );
    let _ = write!(
        h,
        "<div class=\"metric\"><strong>Conversion Rate:</strong> <span class=\"metric-value\">{}%</span> \
         <span class=\"comparison\">(Network Average: {}%)</span></div>",
        metrics.conversion_rate, bench.conversion_rate
    );
    let _ = write!(
        h,
        "<div class=\"metric\"><strong>Total Sales:</strong> <span class=\"metric-value\">{}</span></div>",
        format_int(metrics.total_sales)
    );
    let _ = write!(
        h,
        "<div class=\"metric\"><strong>Response Rate:</strong> <span class=\"metric-value\">{}%</span> \
         <span class=\"comparison\">(Network Average: {}%)</span></div>",
        metrics.response_rate, bench.response_rate
    );

    let _ = write!(
        h,
        "<h2>Revenue Impact Analysis</h2><table><thead><tr><th>Metric</th><th>Current</th>\
         <th>At Network Average</th><th>Opportunity</th></tr></thead><tbody>\
         <tr><td>Annual Sales (Projected)</td><td>{}</td><td>{}</td><td>{}</td></tr>\
         <tr><td>Annual Revenue</td><td>{}</td><td>{}</td><td>{}</td></tr></tbody></table>",
        format_int(gap.current_sales),
        format_int(gap.network_sales),
        format_int(gap.sales_opportunity),
        format_money(gap.current_revenue),
        format_money(gap.network_revenue),
        format_money(gap.revenue_opportunity)
    );

    let _ = write!(
        h,
        "<h2>Top Lead Sources</h2><table><thead><tr><th>Source</th><th>Lead Count</th><th>Percentage</th></tr></thead><tbody>"
    );
    for row in source_rows(metrics, 10) {
        let _ = write!(
            h,
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&row.source),
            row.leads,
            row.share
        );
    }
    let _ = write!(h, "</tbody></table><h2>Recommendations</h2><ul>");
    for rec in recommendations(metrics, bench) {
        let _ = write!(h, "<li>{}</li>", escape_html(&rec));
    }
    let _ = write!(h, "</ul></body></html>");
    h
}
