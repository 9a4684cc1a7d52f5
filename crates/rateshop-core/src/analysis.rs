//! Comparative rate analysis: focal-vs-competitor statistics, the per-date
//! price pivot, and human-readable insight strings.
//!
//! All arithmetic is `Decimal` end to end; means, deltas, and differences are
//! rounded to two decimal places only when they are placed into the report.
//! Missing data is represented, never invented: a competitor with no in-range
//! rates appears with absent stats, and an empty focal range yields a valid
//! report with a zero mean.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// One price observation keyed by its stay (check-in) date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricePoint {
    pub stay_date: NaiveDate,
    pub price: Decimal,
}

/// A property's in-range observations, ordered by stay date (ties by
/// insertion order). The first observation wins within a date in the pivot.
#[derive(Debug, Clone)]
pub struct PropertySeries {
    pub property_id: i64,
    pub name: String,
    pub points: Vec<PricePoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComparisonPeriod {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Mean/min/max over a non-empty set of prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceStats {
    pub count: usize,
    pub mean: Decimal,
    pub min: Decimal,
    pub max: Decimal,
}

/// Focal-side stats. An empty range is `count == 0` with a zero mean and
/// absent min/max, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FocalStats {
    pub count: usize,
    pub mean: Decimal,
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompetitorComparison {
    pub property_id: i64,
    pub name: String,
    /// Absent when the competitor has no rates in the period; that keeps
    /// "no data" distinguishable from "not a competitor".
    pub stats: Option<PriceStats>,
    /// `(competitor mean - focal mean) / focal mean * 100`. Zero when the
    /// focal mean is zero; absent when the competitor has no data.
    pub percentage_delta: Option<Decimal>,
    /// `competitor mean - focal mean`; absent when the competitor has no data.
    pub price_difference: Option<Decimal>,
}

/// One pivot row: the focal price for a stay date plus each competitor's
/// price (or null) for the same date, keyed by competitor name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PivotRow {
    pub stay_date: NaiveDate,
    pub focal_price: Decimal,
    pub competitor_prices: BTreeMap<String, Option<Decimal>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PropertyRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub focal_property: PropertyRef,
    pub period: ComparisonPeriod,
    pub focal_stats: FocalStats,
    pub competitors: Vec<CompetitorComparison>,
    /// Driven by the focal property's stay dates only; competitor-only dates
    /// are not emitted.
    pub by_date: Vec<PivotRow>,
    pub insights: Vec<String>,
}

struct RawStats {
    count: usize,
    mean: Decimal,
    min: Decimal,
    max: Decimal,
}

fn raw_stats(points: &[PricePoint]) -> Option<RawStats> {
    let first = points.first()?;
    let mut min = first.price;
    let mut max = first.price;
    let mut sum = Decimal::ZERO;
    for point in points {
        sum += point.price;
        if point.price < min {
            min = point.price;
        }
        if point.price > max {
            max = point.price;
        }
    }
    Some(RawStats {
        count: points.len(),
        mean: sum / Decimal::from(points.len()),
        min,
        max,
    })
}

fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn round0(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// First observation wins within a stay date.
fn first_price_by_date(series: &PropertySeries) -> BTreeMap<NaiveDate, Decimal> {
    let mut by_date = BTreeMap::new();
    for point in &series.points {
        by_date.entry(point.stay_date).or_insert(point.price);
    }
    by_date
}

/// Build the comparison report for a focal property against its tracked
/// competitors over `period`. Pure; callers fetch the in-range series.
#[must_use]
pub fn build_comparison(
    focal: &PropertySeries,
    competitors: &[PropertySeries],
    period: ComparisonPeriod,
) -> ComparisonReport {
    let focal_raw = raw_stats(&focal.points);
    let focal_mean = focal_raw.as_ref().map_or(Decimal::ZERO, |s| s.mean);
    let focal_count = focal_raw.as_ref().map_or(0, |s| s.count);

    let focal_stats = FocalStats {
        count: focal_count,
        mean: round2(focal_mean),
        min: focal_raw.as_ref().map(|s| s.min),
        max: focal_raw.as_ref().map(|s| s.max),
    };

    // Raw per-competitor numbers feed both the report rows and the insights.
    let raw_comps: Vec<(&PropertySeries, Option<RawStats>)> = competitors
        .iter()
        .map(|series| (series, raw_stats(&series.points)))
        .collect();

    let mut comparisons = Vec::with_capacity(raw_comps.len());
    let mut raw_deltas: Vec<Option<Decimal>> = Vec::with_capacity(raw_comps.len());
    for (series, raw) in &raw_comps {
        let delta = raw.as_ref().map(|stats| {
            if focal_mean > Decimal::ZERO {
                (stats.mean - focal_mean) / focal_mean * Decimal::from(100)
            } else {
                Decimal::ZERO
            }
        });
        raw_deltas.push(delta);
        comparisons.push(CompetitorComparison {
            property_id: series.property_id,
            name: series.name.clone(),
            stats: raw.as_ref().map(|s| PriceStats {
                count: s.count,
                mean: round2(s.mean),
                min: s.min,
                max: s.max,
            }),
            percentage_delta: delta.map(round2),
            price_difference: raw.as_ref().map(|s| round2(s.mean - focal_mean)),
        });
    }

    let focal_by_date = first_price_by_date(focal);
    let comp_by_date: Vec<(&str, BTreeMap<NaiveDate, Decimal>)> = competitors
        .iter()
        .map(|series| (series.name.as_str(), first_price_by_date(series)))
        .collect();
    let by_date = focal_by_date
        .iter()
        .map(|(stay_date, focal_price)| PivotRow {
            stay_date: *stay_date,
            focal_price: *focal_price,
            competitor_prices: comp_by_date
                .iter()
                .map(|(name, prices)| ((*name).to_string(), prices.get(stay_date).copied()))
                .collect(),
        })
        .collect();

    let insights = build_insights(focal, focal_mean, focal_count, &raw_comps, &raw_deltas);

    ComparisonReport {
        focal_property: PropertyRef {
            id: focal.property_id,
            name: focal.name.clone(),
        },
        period,
        focal_stats,
        competitors: comparisons,
        by_date,
        insights,
    }
}

fn build_insights(
    focal: &PropertySeries,
    focal_mean: Decimal,
    focal_count: usize,
    raw_comps: &[(&PropertySeries, Option<RawStats>)],
    raw_deltas: &[Option<Decimal>],
) -> Vec<String> {
    let mut insights = vec![
        format!("Analyzed {focal_count} rates in the selected period"),
        format!("Average rate for {}: {:.2}", focal.name, round2(focal_mean)),
    ];

    if focal_mean > Decimal::ZERO {
        for ((series, raw), delta) in raw_comps.iter().zip(raw_deltas) {
            let (Some(_), Some(delta)) = (raw, delta) else {
                continue;
            };
            let pct = round2(*delta).abs();
            if *delta > Decimal::ZERO {
                insights.push(format!(
                    "{} is {pct:.2}% more expensive than {}",
                    series.name, focal.name
                ));
            } else {
                insights.push(format!(
                    "{} is {pct:.2}% cheaper than {}",
                    series.name, focal.name
                ));
            }
        }
    }

    let with_data: Vec<Decimal> = raw_deltas.iter().flatten().copied().collect();
    if with_data.is_empty() {
        if raw_comps.is_empty() {
            insights.push(
                "Add competitors to this property to unlock comparative analysis".to_string(),
            );
        }
    } else {
        let cheaper = with_data.iter().filter(|d| **d > Decimal::ZERO).count();
        let pct = round0(
            Decimal::from(cheaper) * Decimal::from(100) / Decimal::from(with_data.len()),
        );
        insights.push(format!(
            "{} is cheaper than {pct}% of tracked competitors",
            focal.name
        ));
    }

    insights
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn series(id: i64, name: &str, points: &[(u32, &str)]) -> PropertySeries {
        PropertySeries {
            property_id: id,
            name: name.to_string(),
            points: points
                .iter()
                .map(|(day, price)| PricePoint {
                    stay_date: date(2025, 6, *day),
                    price: dec(price),
                })
                .collect(),
        }
    }

    fn june(start: u32, end: u32) -> ComparisonPeriod {
        ComparisonPeriod {
            start_date: date(2025, 6, start),
            end_date: date(2025, 6, end),
        }
    }

    #[test]
    fn round2_rounds_midpoints_away_from_zero() {
        assert_eq!(round2(dec("1.005")), dec("1.01"));
        assert_eq!(round2(dec("-1.005")), dec("-1.01"));
        assert_eq!(round2(dec("53.3139")), dec("53.31"));
    }

    #[test]
    fn delta_and_insight_for_more_expensive_competitor() {
        let focal = series(1, "Hotel Foco", &[(17, "228.29")]);
        let comp = series(2, "Hotel Rival", &[(17, "350.00")]);
        let report = build_comparison(&focal, &[comp], june(1, 30));

        assert_eq!(report.focal_stats.count, 1);
        assert_eq!(report.focal_stats.mean, dec("228.29"));
        let rival = &report.competitors[0];
        assert_eq!(rival.percentage_delta, Some(dec("53.31")));
        assert_eq!(rival.price_difference, Some(dec("121.71")));
        assert!(report
            .insights
            .contains(&"Hotel Rival is 53.31% more expensive than Hotel Foco".to_string()));
    }

    #[test]
    fn cheaper_competitor_gets_cheaper_insight_with_positive_percentage() {
        let focal = series(1, "Hotel Foco", &[(17, "200.00")]);
        let comp = series(2, "Hotel Rival", &[(17, "150.00")]);
        let report = build_comparison(&focal, &[comp], june(1, 30));

        assert_eq!(report.competitors[0].percentage_delta, Some(dec("-25.00")));
        assert!(report
            .insights
            .contains(&"Hotel Rival is 25.00% cheaper than Hotel Foco".to_string()));
    }

    #[test]
    fn empty_focal_range_is_a_valid_report() {
        let focal = series(1, "Hotel Foco", &[]);
        let comp = series(2, "Hotel Rival", &[(17, "350.00")]);
        let report = build_comparison(&focal, &[comp], june(1, 30));

        assert_eq!(report.focal_stats.count, 0);
        assert_eq!(report.focal_stats.mean, Decimal::ZERO);
        assert_eq!(report.focal_stats.min, None);
        assert_eq!(report.focal_stats.max, None);
        // Competitor data is still reported, with a zero delta.
        let rival = &report.competitors[0];
        assert_eq!(rival.percentage_delta, Some(Decimal::ZERO));
        assert_eq!(rival.price_difference, Some(dec("350.00")));
        assert!(report.by_date.is_empty());
        // No more-expensive/cheaper claims without a focal mean.
        assert!(!report.insights.iter().any(|i| i.contains("expensive")));
        assert!(!report.insights.iter().any(|i| i.contains("cheaper than Hotel Foco")));
    }

    #[test]
    fn competitor_without_data_has_absent_stats() {
        let focal = series(1, "Hotel Foco", &[(17, "228.29")]);
        let comp = series(2, "Hotel Vazio", &[]);
        let report = build_comparison(&focal, &[comp], june(1, 30));

        let vazio = &report.competitors[0];
        assert_eq!(vazio.stats, None);
        assert_eq!(vazio.percentage_delta, None);
        assert_eq!(vazio.price_difference, None);
        // Still listed, and excluded from the positioning percentage.
        assert_eq!(report.competitors.len(), 1);
        assert!(!report
            .insights
            .iter()
            .any(|i| i.contains("% of tracked competitors")));
    }

    #[test]
    fn pivot_uses_focal_dates_only_and_first_price_wins() {
        let focal = PropertySeries {
            property_id: 1,
            name: "Hotel Foco".to_string(),
            points: vec![
                PricePoint {
                    stay_date: date(2025, 6, 17),
                    price: dec("228.29"),
                },
                // Second observation for the same date is ignored.
                PricePoint {
                    stay_date: date(2025, 6, 17),
                    price: dec("999.99"),
                },
                PricePoint {
                    stay_date: date(2025, 6, 18),
                    price: dec("231.00"),
                },
            ],
        };
        // Competitor has one overlapping date plus one date the focal
        // property lacks; the latter must not appear in the pivot.
        let comp = series(2, "Hotel Rival", &[(17, "350.00"), (25, "400.00")]);
        let report = build_comparison(&focal, &[comp], june(1, 30));

        assert_eq!(report.by_date.len(), 2);
        assert_eq!(report.by_date[0].stay_date, date(2025, 6, 17));
        assert_eq!(report.by_date[0].focal_price, dec("228.29"));
        assert_eq!(
            report.by_date[0].competitor_prices["Hotel Rival"],
            Some(dec("350.00"))
        );
        assert_eq!(report.by_date[1].stay_date, date(2025, 6, 18));
        assert_eq!(report.by_date[1].competitor_prices["Hotel Rival"], None);
        assert!(!report
            .by_date
            .iter()
            .any(|row| row.stay_date == date(2025, 6, 25)));
    }

    #[test]
    fn positioning_counts_share_of_pricier_competitors() {
        let focal = series(1, "Hotel Foco", &[(17, "200.00")]);
        let above = series(2, "Hotel Caro", &[(17, "300.00")]);
        let below = series(3, "Hotel Barato", &[(17, "100.00")]);
        let report = build_comparison(&focal, &[above, below], june(1, 30));

        assert!(report
            .insights
            .contains(&"Hotel Foco is cheaper than 50% of tracked competitors".to_string()));
    }

    #[test]
    fn no_competitors_yields_setup_hint() {
        let focal = series(1, "Hotel Foco", &[(17, "228.29")]);
        let report = build_comparison(&focal, &[], june(1, 30));

        assert!(report
            .insights
            .contains(&"Add competitors to this property to unlock comparative analysis".to_string()));
    }

    #[test]
    fn mean_uses_all_observations_not_just_pivot_rows() {
        // Two observations on the same date both count toward the mean even
        // though the pivot keeps only the first.
        let focal = PropertySeries {
            property_id: 1,
            name: "Hotel Foco".to_string(),
            points: vec![
                PricePoint {
                    stay_date: date(2025, 6, 17),
                    price: dec("100.00"),
                },
                PricePoint {
                    stay_date: date(2025, 6, 17),
                    price: dec("300.00"),
                },
            ],
        };
        let report = build_comparison(&focal, &[], june(1, 30));
        assert_eq!(report.focal_stats.count, 2);
        assert_eq!(report.focal_stats.mean, dec("200.00"));
        assert_eq!(report.focal_stats.min, Some(dec("100.00")));
        assert_eq!(report.focal_stats.max, Some(dec("300.00")));
        assert_eq!(report.by_date.len(), 1);
    }

    #[test]
    fn insights_report_count_and_average_first() {
        let focal = series(1, "Hotel Foco", &[(17, "174.15"), (18, "174.15")]);
        let report = build_comparison(&focal, &[], june(1, 30));
        assert_eq!(
            report.insights[0],
            "Analyzed 2 rates in the selected period"
        );
        assert_eq!(report.insights[1], "Average rate for Hotel Foco: 174.15");
    }
}
