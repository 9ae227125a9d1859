use anyhow::Result;
use tracing::info;

use storefront_translator::config::Config;
use storefront_translator::extract::FieldSelection;
use storefront_translator::job;
use storefront_translator::store::{ResourceKind, StoreClient};
use storefront_translator::translator::Translator;

fn parse_kind(value: &str) -> Result<ResourceKind> {
    match value {
        "product" => Ok(ResourceKind::Product),
        "collection" => Ok(ResourceKind::Collection),
        "page" => Ok(ResourceKind::Page),
        other => anyhow::bail!("Unknown RESOURCE_KIND: {}", other),
    }
}

fn parse_fields(value: &str) -> FieldSelection {
    let mut selection = FieldSelection::default();
    for field in value.split(',').map(str::trim) {
        match field {
            "title" => selection.title = true,
            "description" => selection.description = true,
            "tags" => selection.tags = true,
            "content" => selection.content = true,
            _ => {}
        }
    }
    selection
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("storefront_translator=info".parse()?),
        )
        .init();

    info!("Starting storefront translation job");

    // Load configuration from environment
    let config = Config::from_env()?;

    let kind = parse_kind(
        &std::env::var("RESOURCE_KIND").unwrap_or_else(|_| "product".to_string()),
    )?;
    let selection = parse_fields(
        &std::env::var("TRANSLATE_FIELDS").unwrap_or_else(|_| "title,description".to_string()),
    );

    let mut store = StoreClient::new(&config);
    let mut translator = Translator::new(&config);

    // Explicit RECORD_IDS, or every record of the kind
    let ids: Vec<u64> = match std::env::var("RECORD_IDS") {
        Ok(raw) => raw
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect(),
        Err(_) => {
            info!("No RECORD_IDS given, listing all {}", kind.plural());
            store.list(kind).await?.iter().map(|r| r.id).collect()
        }
    };

    info!(
        "Translating {} {} into {}",
        ids.len(),
        kind.plural(),
        config.target_language
    );

    let report = job::translate_records(
        &mut store,
        &mut translator,
        kind,
        &ids,
        &selection,
        &config.target_language,
    )
    .await?;

    info!(
        "Done: {} translated, {} skipped, {} failed ({} tokens over {} model calls)",
        report.translated,
        report.skipped,
        report.failed,
        translator.usage().total_tokens(),
        translator.usage().request_count()
    );
    Ok(())
}
