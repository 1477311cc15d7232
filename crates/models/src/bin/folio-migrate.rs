//! Create every content table in the configured PostgreSQL database.

use anyhow::Context;

use folio_infra::{DatabaseConfig, PostgresStore};
use folio_models::tables;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    folio_observability::init();

    let config = DatabaseConfig::from_env().context("loading database configuration")?;
    let store = PostgresStore::connect(&config)
        .await
        .context("connecting to PostgreSQL")?;

    for table in tables::ALL {
        store
            .create_table(table)
            .await
            .with_context(|| format!("creating table {}", table.name))?;
        tracing::info!(table = table.name, "table ready");
    }

    tracing::info!(tables = tables::ALL.len(), "migration complete");
    Ok(())
}
