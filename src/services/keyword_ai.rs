// src/services/keyword_ai.rs
//
// LLM enrichment of a market report: more keywords, niche ideas and qualitative insights.
use anyhow::{Context, Result};
use log::{error, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::models::{
    CompetitionAssessment, Insights, MarketReport, OpportunityAssessment, RelatedKeywordEntry,
    SeasonalityProfile, TrendSummary,
};
use crate::services::openrouter::{extract_json, null_as_default, ChatMessage, ChatRequest, OpenRouterClient};

pub const AI_PROVIDER: &str = "OpenRouter";

const MAX_MERGED_KEYWORDS: usize = 30;
const MAX_FALLBACK_KEYWORDS: usize = 20;

const SYSTEM_PROMPT: &str = "You are an expert POD market analyst specializing in profitable keyword research. \
Always respond with valid JSON only, no additional text or markdown formatting.";

fn lenient_int<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i64, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().map(|f| f.round() as i64).unwrap_or(0),
        Value::String(s) => s.trim().parse::<f64>().map(|f| f.round() as i64).unwrap_or(0),
        _ => 0,
    })
}

fn default_trend() -> String {
    "stable".to_string()
}

fn trend_or_stable<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(default_trend))
}

/// A section must be an array; entries that do not decode are skipped.
fn lenient_entries<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let entries = Vec::<Value>::deserialize(deserializer)?;
    let total = entries.len();
    let kept: Vec<T> = entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect();
    if kept.len() < total {
        warn!("Skipped {} malformed entries in AI response", total - kept.len());
    }
    Ok(kept)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiKeyword {
    #[serde(default, deserialize_with = "null_as_default")]
    pub keyword: String,
    #[serde(default, deserialize_with = "lenient_int")]
    pub popularity: i64,
    #[serde(default = "default_trend", deserialize_with = "trend_or_stable")]
    pub trend: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_intent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

impl From<&RelatedKeywordEntry> for AiKeyword {
    fn from(entry: &RelatedKeywordEntry) -> Self {
        AiKeyword {
            keyword: entry.keyword.clone(),
            popularity: entry.popularity,
            trend: entry.trend.clone(),
            search_intent: None,
            difficulty: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Niche {
    #[serde(default, deserialize_with = "null_as_default")]
    pub niche: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub profitability: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketInsights {
    #[serde(default, deserialize_with = "null_as_default")]
    pub seasonal_patterns: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub target_demographics: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content_suggestions: Vec<String>,
}

/// The shape the model is asked to return. All three sections are required;
/// individual entries are decoded leniently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiKeywordAnalysis {
    #[serde(deserialize_with = "lenient_entries")]
    pub related_keywords: Vec<AiKeyword>,
    #[serde(deserialize_with = "lenient_entries")]
    pub related_niches: Vec<Niche>,
    pub market_insights: MarketInsights,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedInsights {
    #[serde(flatten)]
    pub base: Insights,
    pub ai_powered: bool,
    pub ai_provider: String,
    pub seasonal_patterns: Vec<String>,
    pub target_demographics: Vec<String>,
    pub content_suggestions: Vec<String>,
    pub keyword_diversity: usize,
    pub commercial_keywords: usize,
    pub low_competition_keywords: usize,
}

/// A `MarketReport` with the AI analysis merged in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedReport {
    pub keyword: String,
    pub trend: TrendSummary,
    pub seasonality: SeasonalityProfile,
    pub competition: CompetitionAssessment,
    pub opportunity: OpportunityAssessment,
    pub related_keywords: Vec<AiKeyword>,
    pub related_niches: Vec<Niche>,
    pub insights: Insights,
    pub enhanced_insights: EnhancedInsights,
}

pub fn build_analysis_prompt(report: &MarketReport) -> String {
    let existing: Vec<&str> = report
        .related_keywords
        .iter()
        .take(5)
        .map(|k| k.keyword.as_str())
        .collect();
    let existing = serde_json::to_string(&existing).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"
You are an expert POD (Print on Demand) market analyst. Analyze the following data to generate comprehensive market insights for profitable POD products.

**Primary Keyword:** "{keyword}"

**Google Trends Data:**
- Search Volume: {popularity}
- Trend Direction: {trend}
- Existing Related Keywords: {existing}

**Generate a JSON response with this exact structure:**

{{
  "relatedKeywords": [
    {{
      "keyword": "specific keyword phrase for POD products",
      "popularity": 85,
      "trend": "rising|stable|declining",
      "searchIntent": "commercial|informational|navigational|transactional",
      "difficulty": "low|medium|high"
    }}
  ],
  "relatedNiches": [
    {{
      "niche": "profitable niche name",
      "description": "market opportunity description",
      "profitability": "high|medium|low",
      "examples": ["product example 1", "product example 2", "product example 3"]
    }}
  ],
  "marketInsights": {{
    "seasonalPatterns": ["seasonal insight 1", "seasonal insight 2"],
    "targetDemographics": ["demographic 1", "demographic 2"],
    "contentSuggestions": ["content idea 1", "content idea 2", "content idea 3"]
  }}
}}

**Requirements:**
1. Generate 15-25 related keywords focused on COMMERCIAL INTENT (buyers, not researchers)
2. Include long-tail keyword variations that are easier to rank for
3. Identify 5-8 profitable niches with real market potential
4. Focus on keywords people use when ready to PURCHASE POD products
5. Consider different product types: t-shirts, mugs, stickers, hoodies, phone cases
6. Include seasonal and trending variations
7. Prioritize keywords with lower competition but decent search volume
8. Think about what customers actually search for on Etsy, Amazon, etc.

Return ONLY the JSON - no explanations or markdown formatting.
"#,
        keyword = report.keyword,
        popularity = report.trend.average_popularity,
        trend = report.trend.trend_direction.as_str(),
        existing = existing,
    )
}

pub fn parse_analysis(content: &str) -> Result<AiKeywordAnalysis> {
    let value = extract_json(content).context("Invalid JSON response from AI")?;
    let mut analysis: AiKeywordAnalysis = serde_json::from_value(value)
        .context("AI response is missing relatedKeywords, relatedNiches or marketInsights")?;

    // Nameless entries carry nothing to show
    analysis.related_keywords.retain(|k| !k.keyword.trim().is_empty());
    analysis.related_niches.retain(|n| !n.niche.trim().is_empty());
    Ok(analysis)
}

/// Ask `model` for a keyword analysis of `report`.
pub async fn analyze_keyword(client: &OpenRouterClient, model: &str, report: &MarketReport) -> Result<AiKeywordAnalysis> {
    let request = ChatRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_analysis_prompt(report)),
        ],
        temperature: Some(0.7),
        max_tokens: Some(3000),
        stream: Some(false),
        ..Default::default()
    };

    let content = client.complete(&request).await?;
    let analysis = parse_analysis(&content)?;
    info!(
        "Generated {} keywords and {} niches",
        analysis.related_keywords.len(),
        analysis.related_niches.len()
    );
    Ok(analysis)
}

/// Like `analyze_keyword`, but never fails. The flag is true when the fallback was used.
pub async fn analyze_or_fallback(client: &OpenRouterClient, model: &str, report: &MarketReport) -> (AiKeywordAnalysis, bool) {
    match analyze_keyword(client, model, report).await {
        Ok(analysis) => (analysis, false),
        Err(e) => {
            error!("OpenRouter AI analysis failed: {:#}", e);
            (fallback_analysis(&report.keyword, &report.related_keywords), true)
        }
    }
}

/// Canned analysis used when the model is unavailable. Deterministic for a given input.
pub fn fallback_analysis(keyword: &str, related: &[RelatedKeywordEntry]) -> AiKeywordAnalysis {
    let generated = [
        format!("{} t shirt", keyword),
        format!("{} shirt design", keyword),
        format!("{} hoodie", keyword),
        format!("{} mug", keyword),
        format!("{} sticker", keyword),
        format!("{} gift", keyword),
        format!("{} merchandise", keyword),
        format!("custom {}", keyword),
        format!("{} apparel", keyword),
        format!("{} accessories", keyword),
        format!("{} phone case", keyword),
        format!("{} poster", keyword),
        format!("{} tote bag", keyword),
        format!("funny {}", keyword),
        format!("vintage {}", keyword),
    ];

    let from_trends = related.iter().take(10).map(|entry| AiKeyword {
        keyword: entry.keyword.clone(),
        popularity: if entry.popularity > 0 { entry.popularity } else { 50 },
        trend: entry.trend.clone(),
        search_intent: Some("commercial".to_string()),
        difficulty: Some("medium".to_string()),
    });

    // Spread popularity over 40-69 and alternate difficulty so the list is not flat
    let long_tail = generated.into_iter().enumerate().map(|(i, kw)| AiKeyword {
        keyword: kw,
        popularity: 40 + (i as i64 * 7) % 30,
        trend: "stable".to_string(),
        search_intent: Some("commercial".to_string()),
        difficulty: Some(if i % 2 == 0 { "low" } else { "medium" }.to_string()),
    });

    let niche = |name: &str, description: String, profitability: &str, examples: &[&str]| Niche {
        niche: format!("{} {}", keyword, name),
        description,
        profitability: profitability.to_string(),
        examples: examples.iter().map(|e| e.to_string()).collect(),
    };

    AiKeywordAnalysis {
        related_keywords: from_trends.chain(long_tail).take(MAX_FALLBACK_KEYWORDS).collect(),
        related_niches: vec![
            niche(
                "Apparel",
                format!("Clothing items featuring {} designs and themes", keyword),
                "high",
                &["T-shirts", "Hoodies", "Tank tops", "Long sleeves"],
            ),
            niche(
                "Home Decor",
                format!("Home decoration items with {} motifs", keyword),
                "medium",
                &["Wall art", "Throw pillows", "Canvas prints", "Posters"],
            ),
            niche(
                "Accessories",
                format!("Personal accessories featuring {} designs", keyword),
                "medium",
                &["Phone cases", "Tote bags", "Stickers", "Keychains"],
            ),
            niche(
                "Drinkware",
                format!("Mugs, bottles, and drinkware with {} themes", keyword),
                "high",
                &["Coffee mugs", "Travel mugs", "Water bottles", "Wine glasses"],
            ),
        ],
        market_insights: MarketInsights {
            seasonal_patterns: vec![
                "Steady demand throughout the year with potential holiday spikes".to_string(),
                "Consider seasonal variations and trending events".to_string(),
            ],
            target_demographics: vec![
                "Adults 18-45 interested in unique, personalized products".to_string(),
                "Gift buyers looking for themed merchandise".to_string(),
            ],
            content_suggestions: vec![
                format!("Create minimalist {} designs for broad appeal", keyword),
                format!("Develop funny or inspirational {} quotes", keyword),
                format!("Design vintage or retro-style {} graphics", keyword),
                "Consider trending colors and modern typography".to_string(),
            ],
        },
    }
}

/// Merge the AI analysis into the report. Keywords are deduplicated case-insensitively,
/// report keywords first.
pub fn enhance(report: MarketReport, ai: AiKeywordAnalysis) -> EnhancedReport {
    let mut seen = HashSet::new();
    let related_keywords: Vec<AiKeyword> = report
        .related_keywords
        .iter()
        .map(AiKeyword::from)
        .chain(ai.related_keywords)
        .filter(|k| seen.insert(k.keyword.to_lowercase()))
        .take(MAX_MERGED_KEYWORDS)
        .collect();

    let commercial_keywords = related_keywords
        .iter()
        .filter(|k| matches!(k.search_intent.as_deref(), Some("commercial") | Some("transactional")))
        .count();
    let low_competition_keywords = related_keywords
        .iter()
        .filter(|k| k.difficulty.as_deref() == Some("low"))
        .count();

    let enhanced_insights = EnhancedInsights {
        base: report.insights.clone(),
        ai_powered: true,
        ai_provider: AI_PROVIDER.to_string(),
        seasonal_patterns: ai.market_insights.seasonal_patterns,
        target_demographics: ai.market_insights.target_demographics,
        content_suggestions: ai.market_insights.content_suggestions,
        keyword_diversity: related_keywords.len(),
        commercial_keywords,
        low_competition_keywords,
    };

    EnhancedReport {
        keyword: report.keyword,
        trend: report.trend,
        seasonality: report.seasonality,
        competition: report.competition,
        opportunity: report.opportunity,
        related_keywords,
        related_niches: ai.related_niches,
        insights: report.insights,
        enhanced_insights,
    }
}
