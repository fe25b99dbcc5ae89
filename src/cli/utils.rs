use std::sync::Arc;

use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::config;
use crate::store::postgres::PgStore;
use crate::store::DynStore;

/// Connect to the backing store the server would use. The CLI operates on
/// the store directly, so a configured DATABASE_URL is required.
pub async fn connect_store() -> anyhow::Result<DynStore> {
    let cfg = config::config();
    if cfg.database.url.is_none() {
        anyhow::bail!("DATABASE_URL is not set; pulse operates directly on the store");
    }

    let store = PgStore::connect(&cfg.database).await?;
    Ok(Arc::new(store) as DynStore)
}

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let Some(data_value) = data {
                response["data"] = data_value;
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an empty collection in the appropriate format
pub fn output_empty_collection(
    output_format: &OutputFormat,
    collection_name: &str,
    message: &str,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    collection_name: []
                }))?
            );
        }
        OutputFormat::Text => {
            println!("{}", message);
        }
    }
    Ok(())
}
