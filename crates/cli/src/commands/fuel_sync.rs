use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};
use tripxl_core::config::FuelConfig;
use tripxl_core::fuel::{
    absolute_url, article_text, extract_prices, latest_announcement, origin_of,
    parse_search_results, DEFAULT_SOURCE_NAME,
};
use tripxl_core::FuelPriceSnapshot;

use crate::commands::{load_config, runtime, CommandResult};

#[derive(Debug, Error)]
pub enum FuelSyncError {
    #[error("failed to build http client: {0}")]
    Client(reqwest::Error),
    #[error("failed to fetch `{url}`: {source}")]
    Fetch { url: String, source: reqwest::Error },
    #[error("no fuel price announcement found on the search page")]
    NoAnnouncement,
    #[error("announcement page `{0}` has no article body")]
    NoArticleBody(String),
    #[error("announcement `{0}` did not contain any fuel prices")]
    NoPrices(String),
    #[error("failed to publish prices to `{url}`: {source}")]
    Publish { url: String, source: reqwest::Error },
}

impl FuelSyncError {
    fn error_class(&self) -> &'static str {
        match self {
            Self::Client(_) | Self::Fetch { .. } => "fetch",
            Self::NoAnnouncement | Self::NoArticleBody(_) | Self::NoPrices(_) => "extraction",
            Self::Publish { .. } => "publish",
        }
    }

    fn exit_code(&self) -> u8 {
        match self {
            Self::Client(_) | Self::Fetch { .. } => 4,
            Self::NoAnnouncement | Self::NoArticleBody(_) | Self::NoPrices(_) => 6,
            Self::Publish { .. } => 7,
        }
    }
}

#[derive(Debug)]
pub struct SyncReport {
    pub article_url: String,
    pub snapshot: FuelPriceSnapshot,
    pub published: bool,
}

pub fn run(dry_run: bool) -> CommandResult {
    let config = match load_config("fuel-sync") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("fuel-sync") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    match runtime.block_on(sync_prices(&config.fuel, !dry_run)) {
        Ok(report) => CommandResult::success("fuel-sync", report_message(&report)),
        Err(error) => CommandResult::failure(
            "fuel-sync",
            error.error_class(),
            error.to_string(),
            error.exit_code(),
        ),
    }
}

/// Finds the newest announcement, extracts its prices and optionally posts
/// them to `publish_url`.
pub async fn sync_prices(config: &FuelConfig, publish: bool) -> Result<SyncReport, FuelSyncError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(FuelSyncError::Client)?;

    let search_page = fetch_text(&client, &config.source_url).await?;
    let announcement = latest_announcement(parse_search_results(&search_page))
        .ok_or(FuelSyncError::NoAnnouncement)?;
    let article_url = absolute_url(&origin_of(&config.source_url), &announcement.link);
    info!(
        event_name = "fuel.sync.announcement_found",
        title = %announcement.title,
        date = %announcement.date,
        url = %article_url,
        "fuel price announcement found"
    );

    let article_page = fetch_text(&client, &article_url).await?;
    let text =
        article_text(&article_page).ok_or_else(|| FuelSyncError::NoArticleBody(article_url.clone()))?;
    let snapshot = extract_prices(&text, Utc::now(), DEFAULT_SOURCE_NAME)
        .ok_or_else(|| FuelSyncError::NoPrices(article_url.clone()))?;

    if publish {
        client
            .post(&config.publish_url)
            .json(&snapshot)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|source| {
                warn!(event_name = "fuel.sync.publish_failed", error = %source, "publish failed");
                FuelSyncError::Publish { url: config.publish_url.clone(), source }
            })?;
        info!(
            event_name = "fuel.sync.published",
            prices = snapshot.prices.len(),
            "fuel prices published"
        );
    }

    Ok(SyncReport { article_url, snapshot, published: publish })
}

async fn fetch_text(client: &reqwest::Client, url: &str) -> Result<String, FuelSyncError> {
    let fetch_error = |source| FuelSyncError::Fetch { url: url.to_string(), source };
    client
        .get(url)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(fetch_error)?
        .text()
        .await
        .map_err(fetch_error)
}

fn report_message(report: &SyncReport) -> String {
    let prices = report
        .snapshot
        .prices
        .iter()
        .map(|(fuel_type, price)| format!("{fuel_type}={price}"))
        .collect::<Vec<_>>()
        .join(", ");
    let action = if report.published { "published" } else { "extracted (dry run)" };
    format!("fuel prices {action} from {}: {prices}", report.article_url)
}
