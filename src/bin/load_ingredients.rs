use std::{env, process::ExitCode};

use env_logger::Env;
use foodgram_sdk::{
    connect, connect_cache, error::ApiError, import::parse_ingredient_csv, import_ingredients,
    invalidate_scope, CacheScope, Config, DEFAULT_INGREDIENTS_PATH,
};

/// Usage: load-ingredients [path/to/ingredients.csv]
#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match run().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), ApiError> {
    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_INGREDIENTS_PATH.to_string());
    let config = Config::load()?;

    let input = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| ApiError::Storage(format!("Could not read {path}: {e}")))?;
    let records = parse_ingredient_csv(&input)?;
    log::info!("Parsed {} ingredients from {path}", records.len());

    let pool = connect(&config).await?;
    let inserted = import_ingredients(&records, &pool).await?;

    match connect_cache(&config).await {
        Ok(mut cache) => invalidate_scope(CacheScope::Ingredients, cache.as_mut()).await,
        Err(e) => log::warn!("Ingredient cache not invalidated: {e}"),
    }

    log::info!("Loaded {inserted} new ingredients");
    Ok(())
}
