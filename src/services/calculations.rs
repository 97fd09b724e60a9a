// src/services/calculations.rs
use chrono::{Datelike, TimeZone};
use chrono_tz::Tz;
use log::{debug, warn};
use std::collections::BTreeMap;

use crate::models::{
    CompetitionAssessment, CompetitionLevel, Difficulty, OpportunityAssessment, Profitability,
    RelatedKeywordEntry, SeasonalityPattern, SeasonalityProfile, TimeSeriesPoint, TrendDirection,
    TrendSummary,
};

/// Points per comparison window (weekly samples, roughly a quarter).
pub const TREND_WINDOW: usize = 12;
/// Below this window size the recent/previous comparison is noise.
pub const MIN_TREND_WINDOW: usize = 4;
/// Divisor applied to per-month sums. Kept at 4 so seasonality thresholds
/// behave like the dashboard users are used to.
pub const MONTHLY_SAMPLE_ESTIMATE: f64 = 4.0;

const RISING_FACTOR: f64 = 1.15;
const DECLINING_FACTOR: f64 = 0.85;

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun",
    "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const RISING_NOTICE: &str = " 📈 Rising trend detected - act fast!";

fn calculate_average(values: &[u8]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().map(|v| *v as f64).sum::<f64>() / values.len() as f64
    }
}

pub fn classify_trend(recent_average: f64, previous_average: f64) -> TrendDirection {
    if recent_average > previous_average * RISING_FACTOR {
        TrendDirection::Rising
    } else if recent_average < previous_average * DECLINING_FACTOR {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    }
}

/// Average popularity and the direction of the last window against the one before it.
///
/// Windows are `min(12, len / 2)` points wide and never overlap. Series too short
/// for a window of `MIN_TREND_WINDOW` points are reported as stable.
pub fn summarize(series: &[TimeSeriesPoint]) -> TrendSummary {
    let values: Vec<u8> = series.iter().map(|p| p.value).collect();
    let average_popularity = calculate_average(&values).round().clamp(0.0, 100.0) as u8;

    let window = TREND_WINDOW.min(values.len() / 2);
    if window < MIN_TREND_WINDOW {
        warn!(
            "Only {} data points, not enough for a trend comparison; reporting stable",
            values.len()
        );
        return TrendSummary {
            average_popularity,
            trend_direction: TrendDirection::Stable,
            recent_average: 0.0,
            previous_average: 0.0,
        };
    }

    let len = values.len();
    let recent_average = calculate_average(&values[len - window..]);
    let previous_average = calculate_average(&values[len - 2 * window..len - window]);
    let trend_direction = classify_trend(recent_average, previous_average);
    debug!(
        "Trend windows of {}: recent {:.2}, previous {:.2} -> {}",
        window,
        recent_average,
        previous_average,
        trend_direction.as_str()
    );

    TrendSummary {
        average_popularity,
        trend_direction,
        recent_average,
        previous_average,
    }
}

/// Sum of values per calendar month (0 = January) divided by `MONTHLY_SAMPLE_ESTIMATE`.
/// Months without samples are absent.
pub fn group_by_month(series: &[TimeSeriesPoint], timezone: &Tz) -> BTreeMap<u32, f64> {
    let mut monthly: BTreeMap<u32, f64> = BTreeMap::new();

    for point in series {
        match timezone.timestamp_opt(point.timestamp_seconds, 0).single() {
            Some(moment) => {
                *monthly.entry(moment.month0()).or_insert(0.0) += point.value as f64;
            }
            None => warn!("Skipping point with invalid timestamp {}", point.timestamp_seconds),
        }
    }

    for total in monthly.values_mut() {
        *total /= MONTHLY_SAMPLE_ESTIMATE;
    }

    monthly
}

pub fn classify_seasonality(variance: f64) -> SeasonalityPattern {
    if variance > 30.0 {
        SeasonalityPattern::HighlySeasonal
    } else if variance > 15.0 {
        SeasonalityPattern::Seasonal
    } else {
        SeasonalityPattern::Steady
    }
}

pub fn compute_seasonality(series: &[TimeSeriesPoint], timezone: &Tz) -> SeasonalityProfile {
    let monthly = group_by_month(series, timezone);

    // BTreeMap iteration is calendar order, and the sort is stable, so ties stay in that order
    let mut ranked: Vec<(u32, f64)> = monthly.iter().map(|(m, v)| (*m, *v)).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let peak_months = ranked
        .iter()
        .take(3)
        .map(|(month, _)| MONTH_NAMES[*month as usize].to_string())
        .collect();

    let variance = match (
        monthly.values().copied().reduce(f64::max),
        monthly.values().copied().reduce(f64::min),
    ) {
        (Some(max), Some(min)) => max - min,
        _ => 0.0,
    };

    SeasonalityProfile {
        pattern: classify_seasonality(variance),
        peak_months,
    }
}

pub fn competition_from_score(score: u8) -> CompetitionAssessment {
    let (level, market_saturation) = if score > 70 {
        (CompetitionLevel::High, "Saturated market - many sellers competing")
    } else if score > 40 {
        (CompetitionLevel::Medium, "Moderate competition - good balance of demand and supply")
    } else {
        (CompetitionLevel::Low, "Low competition - great opportunity for new sellers")
    };

    CompetitionAssessment {
        level,
        score,
        market_saturation: market_saturation.to_string(),
    }
}

pub fn score_competition(summary: &TrendSummary, related: &[RelatedKeywordEntry]) -> CompetitionAssessment {
    // Busy searches attract sellers
    let popularity_tier = match summary.average_popularity {
        p if p > 70 => 40,
        p if p > 40 => 25,
        _ => 10,
    };

    let related_tier = match related.len() {
        n if n > 6 => 30,
        n if n > 3 => 20,
        _ => 10,
    };

    let trend_bonus = if summary.trend_direction == TrendDirection::Rising { 20 } else { 0 };

    competition_from_score(popularity_tier + related_tier + trend_bonus)
}

struct OpportunityRule {
    applies: fn(u8, CompetitionLevel) -> bool,
    profitability: Profitability,
    difficulty: Difficulty,
    recommendation: &'static str,
}

/// Evaluated top to bottom, first match wins.
static OPPORTUNITY_RULES: [OpportunityRule; 5] = [
    OpportunityRule {
        applies: |popularity, level| popularity > 30 && level == CompetitionLevel::Low,
        profitability: Profitability::High,
        difficulty: Difficulty::Easy,
        recommendation: "🔥 Excellent opportunity! High demand with low competition.",
    },
    OpportunityRule {
        applies: |popularity, level| popularity > 50 && level == CompetitionLevel::Medium,
        profitability: Profitability::High,
        difficulty: Difficulty::Medium,
        recommendation: "✅ Good opportunity! Solid demand, manageable competition.",
    },
    OpportunityRule {
        applies: |popularity, level| popularity > 20 && level == CompetitionLevel::Low,
        profitability: Profitability::Medium,
        difficulty: Difficulty::Easy,
        recommendation: "👍 Decent opportunity! Lower risk, steady demand.",
    },
    OpportunityRule {
        applies: |popularity, level| popularity > 60 && level == CompetitionLevel::High,
        profitability: Profitability::Medium,
        difficulty: Difficulty::Hard,
        recommendation: "⚠️ Competitive market! High demand but many sellers.",
    },
    OpportunityRule {
        applies: |popularity, _| popularity < 20,
        profitability: Profitability::Low,
        difficulty: Difficulty::Medium,
        recommendation: "⛔ Low opportunity! Limited search demand.",
    },
];

static DEFAULT_OPPORTUNITY: OpportunityRule = OpportunityRule {
    applies: |_, _| true,
    profitability: Profitability::Low,
    difficulty: Difficulty::Hard,
    recommendation: "❌ Avoid! High competition with limited upside.",
};

pub fn score_opportunity(summary: &TrendSummary, competition: &CompetitionAssessment) -> OpportunityAssessment {
    let popularity = summary.average_popularity;
    let rule = OPPORTUNITY_RULES
        .iter()
        .find(|rule| (rule.applies)(popularity, competition.level))
        .unwrap_or(&DEFAULT_OPPORTUNITY);

    let mut opportunity = OpportunityAssessment {
        profitability: rule.profitability,
        difficulty: rule.difficulty,
        recommendation: rule.recommendation.to_string(),
    };

    if summary.trend_direction == TrendDirection::Rising {
        opportunity.profitability = opportunity.profitability.promote();
        opportunity.recommendation.push_str(RISING_NOTICE);
    }

    opportunity
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn series(values: &[i64]) -> Vec<TimeSeriesPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| TimeSeriesPoint::new(1_700_000_000 + i as i64 * 7 * 86_400, *v))
            .collect()
    }

    fn summary(average_popularity: u8, trend_direction: TrendDirection) -> TrendSummary {
        TrendSummary {
            average_popularity,
            trend_direction,
            recent_average: 0.0,
            previous_average: 0.0,
        }
    }

    fn related(count: usize) -> Vec<RelatedKeywordEntry> {
        (0..count)
            .map(|i| RelatedKeywordEntry {
                keyword: format!("kw {}", i),
                popularity: 50,
                trend: "stable".to_string(),
            })
            .collect()
    }

    fn month_start(month: u32) -> i64 {
        Utc.with_ymd_and_hms(2024, month, 10, 12, 0, 0).unwrap().timestamp()
    }

    #[test]
    fn average_is_rounded_mean() {
        let s = summarize(&series(&[10, 11]));
        assert_eq!(s.average_popularity, 11); // 10.5 rounds up

        let s = summarize(&series(&[0, 0, 1]));
        assert_eq!(s.average_popularity, 0);

        let s = summarize(&series(&[100; 30]));
        assert_eq!(s.average_popularity, 100);
    }

    #[test]
    fn direction_follows_the_window_ratios() {
        let mut values = vec![40; 12];
        values.extend(vec![47; 12]); // 47 > 46
        assert_eq!(summarize(&series(&values)).trend_direction, TrendDirection::Rising);

        let mut values = vec![40; 12];
        values.extend(vec![46; 12]); // 46 == 40 * 1.15, not strictly greater
        assert_eq!(summarize(&series(&values)).trend_direction, TrendDirection::Stable);

        let mut values = vec![40; 12];
        values.extend(vec![33; 12]); // 33 < 34
        assert_eq!(summarize(&series(&values)).trend_direction, TrendDirection::Declining);

        let mut values = vec![40; 12];
        values.extend(vec![34; 12]);
        assert_eq!(summarize(&series(&values)).trend_direction, TrendDirection::Stable);
    }

    #[test]
    fn direction_matches_ratios_for_long_series() {
        for len in [24usize, 25, 37, 52, 104] {
            for previous in (0..=100i64).step_by(5) {
                for recent in (0..=100i64).step_by(3) {
                    // Arbitrary history ahead of the two windows
                    let mut values: Vec<i64> = (0..len - 24).map(|i| (i * 37 % 101) as i64).collect();
                    values.extend(vec![previous; 12]);
                    values.extend(vec![recent; 12]);

                    let s = summarize(&series(&values));
                    let (r, p) = (recent as f64, previous as f64);
                    assert_eq!(
                        s.trend_direction == TrendDirection::Rising,
                        r > p * 1.15,
                        "len {} previous {} recent {}",
                        len, previous, recent
                    );
                    assert_eq!(
                        s.trend_direction == TrendDirection::Declining,
                        r < p * 0.85,
                        "len {} previous {} recent {}",
                        len, previous, recent
                    );
                }
            }
        }
    }

    #[test]
    fn only_the_last_two_windows_matter() {
        // Old history far below the windows must not affect the direction
        let mut values = vec![1; 28];
        values.extend(vec![50; 12]);
        values.extend(vec![50; 12]);
        let s = summarize(&series(&values));
        assert_eq!(s.trend_direction, TrendDirection::Stable);
        assert_eq!(s.recent_average, 50.0);
        assert_eq!(s.previous_average, 50.0);
    }

    #[test]
    fn short_series_use_clamped_windows() {
        // 10 points -> windows of 5
        let values = [10, 10, 10, 10, 10, 30, 30, 30, 30, 30];
        let s = summarize(&series(&values));
        assert_eq!(s.trend_direction, TrendDirection::Rising);
        assert_eq!(s.previous_average, 10.0);
        assert_eq!(s.recent_average, 30.0);
    }

    #[test]
    fn tiny_series_report_stable() {
        let s = summarize(&series(&[5, 90, 90]));
        assert_eq!(s.trend_direction, TrendDirection::Stable);
        assert_eq!(s.average_popularity, 62);

        let s = summarize(&series(&[70]));
        assert_eq!(s.trend_direction, TrendDirection::Stable);
        assert_eq!(s.average_popularity, 70);
    }

    #[test]
    fn equal_months_are_steady() {
        let points: Vec<TimeSeriesPoint> = (1..=12).map(|m| TimeSeriesPoint::new(month_start(m), 40)).collect();
        let profile = compute_seasonality(&points, &chrono_tz::UTC);
        assert_eq!(profile.pattern, SeasonalityPattern::Steady);
        // Ties keep calendar order
        assert_eq!(profile.peak_months, vec!["Jan", "Feb", "Mar"]);
    }

    #[test]
    fn one_hot_month_is_highly_seasonal_and_leads_the_peaks() {
        // Four samples per month so the monthly estimate equals the sample value
        let mut points = Vec::new();
        for month in 1..=12 {
            let value = if month == 7 { 60 } else { 20 };
            for week in 0..4 {
                points.push(TimeSeriesPoint::new(month_start(month) + week * 86_400, value));
            }
        }
        let monthly = group_by_month(&points, &chrono_tz::UTC);
        assert_eq!(monthly.get(&6), Some(&60.0));
        assert_eq!(monthly.get(&0), Some(&20.0));

        let profile = compute_seasonality(&points, &chrono_tz::UTC);
        assert_eq!(profile.pattern, SeasonalityPattern::HighlySeasonal);
        assert_eq!(profile.peak_months[0], "Jul");
    }

    #[test]
    fn single_month_has_no_variance() {
        let points = vec![TimeSeriesPoint::new(month_start(3), 90)];
        let profile = compute_seasonality(&points, &chrono_tz::UTC);
        assert_eq!(profile.pattern, SeasonalityPattern::Steady);
        assert_eq!(profile.peak_months, vec!["Mar"]);
    }

    #[test]
    fn seasonality_thresholds_are_strict() {
        assert_eq!(classify_seasonality(15.0), SeasonalityPattern::Steady);
        assert_eq!(classify_seasonality(15.5), SeasonalityPattern::Seasonal);
        assert_eq!(classify_seasonality(30.0), SeasonalityPattern::Seasonal);
        assert_eq!(classify_seasonality(30.5), SeasonalityPattern::HighlySeasonal);
    }

    #[test]
    fn month_buckets_follow_the_configured_timezone() {
        // 2024-03-01 03:00 UTC is still February in New York
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 3, 0, 0).unwrap().timestamp();
        let points = vec![TimeSeriesPoint::new(ts, 80)];
        let utc = compute_seasonality(&points, &chrono_tz::UTC);
        let ny = compute_seasonality(&points, &chrono_tz::America::New_York);
        assert_eq!(utc.peak_months, vec!["Mar"]);
        assert_eq!(ny.peak_months, vec!["Feb"]);
    }

    #[test]
    fn competition_score_stays_within_tier_bounds() {
        for popularity in [0u8, 41, 71, 100] {
            for count in [0usize, 4, 7, 12] {
                for direction in [TrendDirection::Rising, TrendDirection::Stable, TrendDirection::Declining] {
                    let c = score_competition(&summary(popularity, direction), &related(count));
                    assert!((20..=90).contains(&c.score), "score {} out of range", c.score);
                }
            }
        }
        assert_eq!(score_competition(&summary(10, TrendDirection::Stable), &related(0)).score, 20);
        assert_eq!(score_competition(&summary(80, TrendDirection::Rising), &related(8)).score, 90);
    }

    #[test]
    fn competition_level_boundaries() {
        assert_eq!(competition_from_score(71).level, CompetitionLevel::High);
        assert_eq!(competition_from_score(70).level, CompetitionLevel::Medium);
        assert_eq!(competition_from_score(41).level, CompetitionLevel::Medium);
        assert_eq!(competition_from_score(40).level, CompetitionLevel::Low);
        assert_eq!(
            competition_from_score(20).market_saturation,
            "Low competition - great opportunity for new sellers"
        );
    }

    #[test]
    fn opportunity_table_rows() {
        let cases = [
            (31, CompetitionLevel::Low, Profitability::High, Difficulty::Easy),
            (51, CompetitionLevel::Medium, Profitability::High, Difficulty::Medium),
            (25, CompetitionLevel::Low, Profitability::Medium, Difficulty::Easy),
            (61, CompetitionLevel::High, Profitability::Medium, Difficulty::Hard),
            (19, CompetitionLevel::Medium, Profitability::Low, Difficulty::Medium),
            (50, CompetitionLevel::Medium, Profitability::Low, Difficulty::Hard),
            (20, CompetitionLevel::Low, Profitability::Low, Difficulty::Hard),
            (60, CompetitionLevel::High, Profitability::Low, Difficulty::Hard),
        ];
        for (popularity, level, profitability, difficulty) in cases {
            let o = score_opportunity(&summary(popularity, TrendDirection::Stable), &competition_with(level));
            assert_eq!((o.profitability, o.difficulty), (profitability, difficulty), "row for {} / {:?}", popularity, level);
            assert!(!o.recommendation.contains("Rising trend"));
        }
    }

    fn competition_with(level: CompetitionLevel) -> CompetitionAssessment {
        let score = match level {
            CompetitionLevel::Low => 30,
            CompetitionLevel::Medium => 55,
            CompetitionLevel::High => 80,
        };
        competition_from_score(score)
    }

    #[test]
    fn rising_trend_promotes_once_and_caps_at_high() {
        for popularity in 0..=100u8 {
            for level in [CompetitionLevel::Low, CompetitionLevel::Medium, CompetitionLevel::High] {
                let stable = score_opportunity(&summary(popularity, TrendDirection::Stable), &competition_with(level));
                let rising = score_opportunity(&summary(popularity, TrendDirection::Rising), &competition_with(level));
                assert_eq!(rising.profitability, stable.profitability.promote());
                assert_eq!(rising.difficulty, stable.difficulty);
                assert!(rising.recommendation.ends_with("Rising trend detected - act fast!"));
            }
        }
    }
}
