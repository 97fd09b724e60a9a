use dotenv::dotenv;
use log::{error, info, warn};
use std::env;

use pod_market_analyzer::config::AppConfig;
use pod_market_analyzer::context::AppContext;
use pod_market_analyzer::services::keyword_ai;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let use_ai = args.iter().any(|a| a == "--ai");
    let keyword = args
        .iter()
        .filter(|a| !a.starts_with("--"))
        .cloned()
        .collect::<Vec<_>>()
        .join(" ");
    if keyword.trim().is_empty() {
        error!("Usage: analyze_keyword [--ai] <keyword>");
        return Err("missing keyword".into());
    }

    let config = AppConfig::from_env();
    let ctx = AppContext::from_config(&config).map_err(|e| e.to_string())?;

    info!("Analyzing \"{}\"...", keyword);
    let report = match ctx.analyzer.analyze(keyword.trim()).await {
        Ok(report) => report,
        Err(e) => {
            error!("ERROR: Analysis failed: {}", e);
            return Err(e.into());
        }
    };

    let output = match (&ctx.relay, use_ai) {
        (Some(relay), true) => {
            let (ai, fallback) = keyword_ai::analyze_or_fallback(relay, &ctx.default_model, &report).await;
            if fallback {
                warn!("AI analysis unavailable, showing generated keywords");
            }
            serde_json::to_string_pretty(&keyword_ai::enhance(report, ai))?
        }
        (None, true) => {
            warn!("--ai given but OPENROUTER_API_KEY is not set");
            serde_json::to_string_pretty(&report)?
        }
        _ => serde_json::to_string_pretty(&report)?,
    };

    println!("{}", output);
    Ok(())
}
