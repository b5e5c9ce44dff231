// Revenue projection for a conversion-rate improvement.
//
// Pure arithmetic; every input is coerced rather than rejected.
use crate::types::{BenchmarkMetrics, DealerMetrics, ProjectionRow};
use crate::util::{format_int, format_money, parse_f64_safe, round_to};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoiInputs {
    pub monthly_leads: f64,
    pub current_conversion: f64,
    pub target_conversion: f64,
    pub avg_deal_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoiProjection {
    pub annual_leads: f64,
    pub current_sales: i64,
    pub target_sales: i64,
    pub additional_sales: i64,
    pub current_revenue: f64,
    pub target_revenue: f64,
    pub additional_revenue: f64,
    /// One decimal place; 0 when there is no current revenue.
    pub percent_increase: f64,
}

fn non_negative(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        0.0
    }
}

fn percentage(v: f64) -> f64 {
    non_negative(v).min(100.0)
}

/// Lenient numeric form input: anything unparseable becomes 0.
pub fn coerce(text: &str) -> f64 {
    parse_f64_safe(Some(text)).unwrap_or(0.0)
}

impl RoiInputs {
    pub fn new(monthly_leads: f64, current: f64, target: f64, avg_deal_value: f64) -> Self {
        RoiInputs {
            monthly_leads,
            current_conversion: current,
            target_conversion: target,
            avg_deal_value,
        }
    }

    /// Build from raw form strings.
    pub fn from_text(monthly: &str, current: &str, target: &str, deal: &str) -> Self {
        Self::new(coerce(monthly), coerce(current), coerce(target), coerce(deal))
    }

    /// Seed from a dealer: monthly average volume, and its own conversion
    /// rate as both current and target.
    pub fn for_dealer(metrics: &DealerMetrics, avg_deal_value: f64) -> Self {
        let conv = metrics.conversion_rate.as_f64();
        Self::new(metrics.monthly_lead_average as f64, conv, conv, avg_deal_value)
    }

    /// Seed from network benchmarks when no dealer is selected.
    pub fn for_network(bench: &BenchmarkMetrics, avg_deal_value: f64) -> Self {
        let monthly = (bench.total_leads as f64 / 12.0).round();
        Self::new(monthly, bench.conversion_rate, bench.conversion_rate, avg_deal_value)
    }

    /// Target = current + `points`, to two decimals.
    pub fn with_improvement(mut self, points: f64) -> Self {
        self.target_conversion = round_to(self.current_conversion + points, 2);
        self
    }

    pub fn with_network_target(mut self, bench: &BenchmarkMetrics) -> Self {
        self.target_conversion = bench.conversion_rate;
        self
    }

    /// Inputs after clamping: volumes and values at least 0, rates in [0, 100].
    pub fn clamped(&self) -> Self {
        RoiInputs {
            monthly_leads: non_negative(self.monthly_leads),
            current_conversion: percentage(self.current_conversion),
            target_conversion: percentage(self.target_conversion),
            avg_deal_value: non_negative(self.avg_deal_value),
        }
    }
}

pub fn compute_roi(inputs: &RoiInputs) -> RoiProjection {
    let i = inputs.clamped();
    let annual_leads = i.monthly_leads * 12.0;
    let current_sales = (annual_leads * (i.current_conversion / 100.0)).round() as i64;
    let target_sales = (annual_leads * (i.target_conversion / 100.0)).round() as i64;
    let current_revenue = current_sales as f64 * i.avg_deal_value;
    let target_revenue = target_sales as f64 * i.avg_deal_value;
    let additional_revenue = target_revenue - current_revenue;
    let percent_increase = if current_revenue > 0.0 {
        round_to(additional_revenue / current_revenue * 100.0, 1)
    } else {
        0.0
    };
    RoiProjection {
        annual_leads,
        current_sales,
        target_sales,
        additional_sales: target_sales - current_sales,
        current_revenue,
        target_revenue,
        additional_revenue,
        percent_increase,
    }
}

/// Extra annual sales from a one-point conversion lift.
pub fn one_point_lift(annual_leads: f64) -> i64 {
    (non_negative(annual_leads) * 0.01).round() as i64
}

pub fn projection_rows(p: &RoiProjection) -> Vec<ProjectionRow> {
    vec![
        ProjectionRow {
            metric: "Annual Sales".into(),
            current: format_int(p.current_sales),
            projected: format_int(p.target_sales),
            improvement: format_int(p.additional_sales),
        },
        ProjectionRow {
            metric: "Annual Revenue".into(),
            current: format_money(p.current_revenue),
            projected: format_money(p.target_revenue),
            improvement: format_money(p.additional_revenue),
        },
        ProjectionRow {
            metric: "Revenue Increase".into(),
            current: String::new(),
            projected: String::new(),
            improvement: format!("{:.1}%", p.percent_increase),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Fixed;
    use std::collections::BTreeMap;

    #[test]
    fn reference_projection() {
        let p = compute_roi(&RoiInputs::new(873.0, 10.91, 12.91, 4255.0));
        assert_eq!(p.annual_leads, 10476.0);
        assert_eq!(p.current_sales, 1143);
        assert_eq!(p.target_sales, 1352);
        assert_eq!(p.additional_sales, 209);
        assert_eq!(p.additional_revenue, 889_295.0);
        assert_eq!(p.additional_revenue, p.additional_sales as f64 * 4255.0);
        assert_eq!(p.percent_increase, 18.3);
    }

    #[test]
    fn clamps_out_of_range_inputs() {
        let p = compute_roi(&RoiInputs::new(-5.0, -1.0, 250.0, -100.0));
        assert_eq!(p.annual_leads, 0.0);
        assert_eq!(p.current_sales, 0);
        assert_eq!(p.percent_increase, 0.0);

        let p = compute_roi(&RoiInputs::new(100.0, 10.0, 250.0, 1000.0));
        assert_eq!(p.target_sales, 1200);
    }

    #[test]
    fn garbage_text_coerces_to_zero() {
        let i = RoiInputs::from_text("abc", "", "12.5", "4,255");
        assert_eq!(i.monthly_leads, 0.0);
        assert_eq!(i.current_conversion, 0.0);
        assert_eq!(i.target_conversion, 12.5);
        assert_eq!(i.avg_deal_value, 4255.0);
        let p = compute_roi(&RoiInputs::new(f64::NAN, 10.0, 12.0, 1.0));
        assert_eq!(p.annual_leads, 0.0);
    }

    #[test]
    fn additional_revenue_never_drops_as_target_rises() {
        for monthly in [0.0, 1.0, 37.0, 873.0, 2500.5] {
            let mut last = f64::MIN;
            let mut target = 0.0;
            while target <= 100.0 {
                let p = compute_roi(&RoiInputs::new(monthly, 10.91, target, 4255.0));
                assert!(p.additional_revenue >= last, "monthly={} target={}", monthly, target);
                last = p.additional_revenue;
                target += 0.25;
            }
        }
    }

    #[test]
    fn seeds_from_dealer_and_network() {
        let dealer = DealerMetrics {
            dealer_name: "D".into(),
            total_leads: 120,
            total_sales: 12,
            conversion_rate: Fixed::from_units(1000, 2),
            no_response_count: 0,
            no_response_rate: Fixed::zero(1),
            response_rate: Fixed::from_units(1000, 1),
            leads_by_source: BTreeMap::new(),
            leads_by_month: BTreeMap::new(),
            data_months: 6,
            monthly_lead_average: 20,
        };
        let i = RoiInputs::for_dealer(&dealer, 4255.0).with_improvement(2.0);
        assert_eq!(i.monthly_leads, 20.0);
        assert_eq!(i.current_conversion, 10.0);
        assert_eq!(i.target_conversion, 12.0);

        let bench = BenchmarkMetrics::default();
        let n = RoiInputs::for_network(&bench, 4255.0);
        assert_eq!(n.monthly_leads, 2254.0);
        assert_eq!(n.target_conversion, 16.12);
        let n = RoiInputs::new(10.0, 5.0, 5.0, 1.0).with_network_target(&bench);
        assert_eq!(n.target_conversion, 16.12);
    }

    #[test]
    fn one_point_lift_rounds() {
        assert_eq!(one_point_lift(10476.0), 105);
        assert_eq!(one_point_lift(-3.0), 0);
    }
}
