// src/services/insights.rs
use crate::models::{Difficulty, Insights, OpportunityAssessment, Profitability, TrendDirection, TrendSummary};

/// A lookup row: if any needle occurs in the lower-cased keyword, `result` applies.
struct KeywordRule<T> {
    needles: &'static [&'static str],
    result: T,
}

static PRODUCT_RULES: &[KeywordRule<&[&str]>] = &[
    KeywordRule {
        needles: &["motivational", "quote", "inspiration"],
        result: &["T-shirts", "Posters", "Mugs", "Phone Cases", "Notebooks"],
    },
    KeywordRule {
        needles: &["cute", "kawaii", "funny"],
        result: &["Stickers", "T-shirts", "Tote Bags", "Pins", "Keychains"],
    },
    KeywordRule {
        needles: &["vintage", "retro"],
        result: &["T-shirts", "Hoodies", "Posters", "Canvas Prints", "Coasters"],
    },
    KeywordRule {
        needles: &["gaming", "gamer"],
        result: &["T-shirts", "Hoodies", "Mouse Pads", "Stickers", "Phone Cases"],
    },
    KeywordRule {
        needles: &["fitness", "gym"],
        result: &["Tank Tops", "Water Bottles", "Gym Bags", "T-shirts", "Towels"],
    },
];

const DEFAULT_PRODUCTS: &[&str] = &["T-shirts", "Mugs", "Stickers", "Phone Cases", "Tote Bags"];

static AUDIENCE_RULES: &[KeywordRule<&str>] = &[
    KeywordRule {
        needles: &["mom", "mother"],
        result: "Mothers, ages 25-45, interested in family and lifestyle products",
    },
    KeywordRule {
        needles: &["gaming", "gamer"],
        result: "Gaming enthusiasts, ages 16-35, primarily male, tech-savvy",
    },
    KeywordRule {
        needles: &["fitness", "gym"],
        result: "Fitness enthusiasts, ages 20-40, health-conscious individuals",
    },
    KeywordRule {
        needles: &["cute", "kawaii"],
        result: "Young adults, ages 16-30, interested in cute/aesthetic products",
    },
    KeywordRule {
        needles: &["vintage", "retro"],
        result: "Adults 25-50, nostalgic consumers, vintage style enthusiasts",
    },
];

const DEFAULT_AUDIENCE: &str = "General audience, ages 18-45, interested in trendy products";

fn first_match<T: Copy>(rules: &[KeywordRule<T>], keyword: &str, fallback: T) -> T {
    let keyword = keyword.to_lowercase();
    rules
        .iter()
        .find(|rule| rule.needles.iter().any(|needle| keyword.contains(needle)))
        .map(|rule| rule.result)
        .unwrap_or(fallback)
}

pub fn suggest_product_types(keyword: &str) -> Vec<String> {
    first_match(PRODUCT_RULES, keyword, DEFAULT_PRODUCTS)
        .iter()
        .map(|p| p.to_string())
        .collect()
}

pub fn target_audience(keyword: &str) -> String {
    first_match(AUDIENCE_RULES, keyword, DEFAULT_AUDIENCE).to_string()
}

pub fn suggest_pricing(profitability: Profitability, difficulty: Difficulty) -> String {
    let price = match (profitability, difficulty) {
        (Profitability::High, Difficulty::Easy) => "$15-25 (Premium pricing possible due to low competition)",
        (Profitability::High, Difficulty::Medium) => "$12-20 (Competitive but profitable range)",
        (Profitability::Medium, _) => "$10-18 (Balanced pricing for steady sales)",
        _ => "$8-15 (Lower pricing to compete effectively)",
    };
    price.to_string()
}

pub fn marketing_tips(keyword: &str, trend: TrendDirection, difficulty: Difficulty) -> Vec<String> {
    let mut tips = vec![
        format!("Use \"{}\" in your product titles and tags for better SEO", keyword),
        "Create multiple design variations to test what sells best".to_string(),
        "Research top-selling products in this niche for inspiration".to_string(),
    ];

    if trend == TrendDirection::Rising {
        tips.push("🚀 Act quickly - this trend is rising! Create designs ASAP".to_string());
        tips.push("Use social media to capitalize on the trending topic".to_string());
    }

    if difficulty == Difficulty::Easy {
        tips.push("💎 Low competition detected - you can price higher initially".to_string());
        tips.push("Focus on quality designs since there's less competition".to_string());
    } else {
        tips.push("⚔️ High competition - focus on unique angles and superior design".to_string());
        tips.push("Consider targeting long-tail keywords for easier ranking".to_string());
    }

    tips
}

pub fn derive_insights(keyword: &str, summary: &TrendSummary, opportunity: &OpportunityAssessment) -> Insights {
    Insights {
        best_product_types: suggest_product_types(keyword),
        target_audience: target_audience(keyword),
        suggested_price: suggest_pricing(opportunity.profitability, opportunity.difficulty),
        marketing_tips: marketing_tips(keyword, summary.trend_direction, opportunity.difficulty),
    }
}
