use anyhow::{Context, bail};

use acctparty_infra::{AppConfig, DbPool, SchemaRegistry, SqliteLedger, connect};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    acctparty_observability::init();

    let config = AppConfig::from_env().context("loading configuration")?;
    tracing::info!(backend = ?config.backend, "starting schema registration");

    match connect(&config).await.context("connecting to the database")? {
        DbPool::Postgres(pool) => {
            let report = SchemaRegistry::new(pool)
                .register()
                .await
                .context("registering schema")?;
            tracing::info!(
                created = ?report.created,
                method_column_renamed = report.method_column_renamed,
                default_accounts = report.default_accounts_backfilled,
                tax_roundings = report.tax_roundings_backfilled,
                "done"
            );
        }
        DbPool::Sqlite(pool) => {
            if config.database_url.contains(":memory:") {
                bail!("refusing to register a schema in an in-memory sqlite database");
            }
            SqliteLedger::new(pool)
                .ensure_schema()
                .await
                .context("creating sqlite ledger tables")?;
            tracing::info!("sqlite ledger tables ready");
        }
    }
    Ok(())
}
