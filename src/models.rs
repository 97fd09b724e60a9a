// src/models.rs
use serde::{Serialize, Deserialize};

/// One sample of relative search interest, 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesPoint {
    pub timestamp_seconds: i64,
    pub value: u8,
}

impl TimeSeriesPoint {
    pub fn new(timestamp_seconds: i64, value: i64) -> Self {
        TimeSeriesPoint {
            timestamp_seconds,
            value: value.clamp(0, 100) as u8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Rising,
    Stable,
    Declining,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Rising => "rising",
            TrendDirection::Stable => "stable",
            TrendDirection::Declining => "declining",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSummary {
    pub average_popularity: u8,
    pub trend_direction: TrendDirection,
    pub recent_average: f64,
    pub previous_average: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeasonalityPattern {
    #[serde(rename = "steady")]
    Steady,
    #[serde(rename = "seasonal")]
    Seasonal,
    #[serde(rename = "highly seasonal")]
    HighlySeasonal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonalityProfile {
    pub pattern: SeasonalityPattern,
    pub peak_months: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompetitionLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitionAssessment {
    pub level: CompetitionLevel,
    pub score: u8,
    pub market_saturation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profitability {
    Low,
    Medium,
    High,
}

impl Profitability {
    /// One step up, saturating at `High`.
    pub fn promote(self) -> Self {
        match self {
            Profitability::Low => Profitability::Medium,
            Profitability::Medium | Profitability::High => Profitability::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityAssessment {
    pub profitability: Profitability,
    pub difficulty: Difficulty,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedKeywordEntry {
    pub keyword: String,
    pub popularity: i64,
    pub trend: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub best_product_types: Vec<String>,
    pub target_audience: String,
    pub suggested_price: String,
    pub marketing_tips: Vec<String>,
}

/// Everything one analysis produces for a keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketReport {
    pub keyword: String,
    pub trend: TrendSummary,
    pub seasonality: SeasonalityProfile,
    pub competition: CompetitionAssessment,
    pub opportunity: OpportunityAssessment,
    pub related_keywords: Vec<RelatedKeywordEntry>,
    pub insights: Insights,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_values_are_clamped() {
        assert_eq!(TimeSeriesPoint::new(0, 140).value, 100);
        assert_eq!(TimeSeriesPoint::new(0, -3).value, 0);
        assert_eq!(TimeSeriesPoint::new(0, 42).value, 42);
    }

    #[test]
    fn promotion_saturates_at_high() {
        assert_eq!(Profitability::Low.promote(), Profitability::Medium);
        assert_eq!(Profitability::Medium.promote(), Profitability::High);
        assert_eq!(Profitability::High.promote(), Profitability::High);
    }

    #[test]
    fn enums_serialize_like_the_frontend_expects() {
        assert_eq!(serde_json::to_string(&SeasonalityPattern::HighlySeasonal).unwrap(), "\"highly seasonal\"");
        assert_eq!(serde_json::to_string(&TrendDirection::Declining).unwrap(), "\"declining\"");
        assert_eq!(serde_json::to_string(&CompetitionLevel::Medium).unwrap(), "\"medium\"");
    }
}
