//! Schema registration for PostgreSQL.
//!
//! Registration is planned from the current table state and then executed in
//! one transaction. Satellite tables are backfilled from legacy property rows
//! only when they are created, so running registration again is a no-op.

use std::sync::Arc;

use sqlx::{PgPool, Postgres, Row, Transaction};
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

use acctparty_accounting::property::{
    CONFIGURATION_MODEL, PARTY_MODEL, migrate_default_accounts, migrate_tax_roundings,
};
use acctparty_accounting::{ConfigurationId, LegacyProperty};
use acctparty_core::{AggregateId, CompanyId, DomainError};

use crate::db::{StoreError, map_sqlx_error};

/// Generic property storage the satellites used to live in.
pub const LEGACY_PROPERTY_TABLE: &str = "ir_property";

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("legacy property: {0}")]
    Domain(#[from] DomainError),
}

/// Tables managed by registration, in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaTable {
    Account,
    MoveLine,
    Configuration,
    DefaultAccount,
    DefaultTaxRule,
    TaxRounding,
}

impl SchemaTable {
    pub const ALL: [SchemaTable; 6] = [
        SchemaTable::Account,
        SchemaTable::MoveLine,
        SchemaTable::Configuration,
        SchemaTable::DefaultAccount,
        SchemaTable::DefaultTaxRule,
        SchemaTable::TaxRounding,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SchemaTable::Account => "account_account",
            SchemaTable::MoveLine => "account_move_line",
            SchemaTable::Configuration => "account_configuration",
            SchemaTable::DefaultAccount => "account_configuration_default_account",
            SchemaTable::DefaultTaxRule => "account_configuration_default_tax_rule",
            SchemaTable::TaxRounding => "account_configuration_tax_rounding",
        }
    }

    fn ddl(&self) -> &'static [&'static str] {
        match self {
            SchemaTable::Account => &["CREATE TABLE account_account (
                id UUID PRIMARY KEY,
                company UUID NOT NULL,
                kind TEXT NOT NULL,
                active BOOLEAN NOT NULL DEFAULT TRUE,
                party_required BOOLEAN NOT NULL DEFAULT FALSE
            )"],
            SchemaTable::MoveLine => &[
                "CREATE TABLE account_move_line (
                    id UUID PRIMARY KEY,
                    account UUID NOT NULL REFERENCES account_account (id),
                    party UUID,
                    debit NUMERIC NOT NULL DEFAULT 0,
                    credit NUMERIC NOT NULL DEFAULT 0,
                    maturity_date DATE,
                    reconciliation UUID
                )",
                "CREATE INDEX account_move_line_party_idx ON account_move_line (party)",
            ],
            SchemaTable::Configuration => &["CREATE TABLE account_configuration (
                id UUID PRIMARY KEY,
                create_date TIMESTAMPTZ NOT NULL DEFAULT now()
            )"],
            SchemaTable::DefaultAccount => &["CREATE TABLE account_configuration_default_account (
                id BIGSERIAL PRIMARY KEY,
                company UUID,
                default_account_receivable UUID REFERENCES account_account (id),
                default_account_payable UUID REFERENCES account_account (id)
            )"],
            SchemaTable::DefaultTaxRule => &["CREATE TABLE account_configuration_default_tax_rule (
                id BIGSERIAL PRIMARY KEY,
                company UUID,
                default_customer_tax_rule UUID,
                default_supplier_tax_rule UUID
            )"],
            SchemaTable::TaxRounding => &["CREATE TABLE account_configuration_tax_rounding (
                id BIGSERIAL PRIMARY KEY,
                configuration UUID NOT NULL REFERENCES account_configuration (id) ON DELETE CASCADE,
                company UUID,
                tax_rounding TEXT NOT NULL DEFAULT 'document'
            )"],
        }
    }
}

/// What registration found in the database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableState {
    /// Tables already present.
    pub existing: Vec<SchemaTable>,
    /// `account_configuration_tax_rounding` still has the legacy `method` column.
    pub tax_rounding_method_column: bool,
    /// The legacy property table is present.
    pub legacy_properties: bool,
}

impl TableState {
    pub fn exists(&self, table: SchemaTable) -> bool {
        self.existing.contains(&table)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    CreateTable(SchemaTable),
    /// Copy the legacy `method` column into `tax_rounding` and drop it.
    RenameMethodColumn,
    BackfillDefaultAccounts,
    BackfillTaxRoundings,
}

/// Steps bringing a database in `state` up to date.
pub fn plan_registration(state: &TableState) -> Vec<Step> {
    let mut steps: Vec<Step> = SchemaTable::ALL
        .into_iter()
        .filter(|table| !state.exists(*table))
        .map(Step::CreateTable)
        .collect();

    if state.exists(SchemaTable::TaxRounding) && state.tax_rounding_method_column {
        steps.push(Step::RenameMethodColumn);
    }
    if state.legacy_properties {
        if !state.exists(SchemaTable::DefaultAccount) {
            steps.push(Step::BackfillDefaultAccounts);
        }
        if !state.exists(SchemaTable::TaxRounding) {
            steps.push(Step::BackfillTaxRoundings);
        }
    }
    steps
}

/// Outcome of a registration run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterReport {
    pub created: Vec<&'static str>,
    pub method_column_renamed: bool,
    pub default_accounts_backfilled: usize,
    pub tax_roundings_backfilled: usize,
}

/// Registers the schema on a PostgreSQL database.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    pool: Arc<PgPool>,
}

impl SchemaRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    #[instrument(skip(self), err)]
    pub async fn register(&self) -> Result<RegisterReport, MigrationError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("register", e))?;

        let state = inspect(&mut tx).await?;
        let steps = plan_registration(&state);
        let mut report = RegisterReport::default();

        for step in &steps {
            match step {
                Step::CreateTable(table) => {
                    for statement in table.ddl() {
                        sqlx::query(statement)
                            .execute(&mut *tx)
                            .await
                            .map_err(|e| map_sqlx_error("create_table", e))?;
                    }
                    report.created.push(table.name());
                }
                Step::RenameMethodColumn => {
                    rename_method_column(&mut tx).await?;
                    report.method_column_renamed = true;
                }
                Step::BackfillDefaultAccounts => {
                    report.default_accounts_backfilled = backfill_default_accounts(&mut tx).await?;
                }
                Step::BackfillTaxRoundings => {
                    report.tax_roundings_backfilled = backfill_tax_roundings(&mut tx).await?;
                }
            }
        }

        tx.commit().await.map_err(|e| map_sqlx_error("register", e))?;
        info!(
            created = report.created.len(),
            method_column_renamed = report.method_column_renamed,
            default_accounts = report.default_accounts_backfilled,
            tax_roundings = report.tax_roundings_backfilled,
            "schema registered"
        );
        Ok(report)
    }
}

async fn table_exists(tx: &mut Transaction<'_, Postgres>, table: &str) -> Result<bool, StoreError> {
    sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
         WHERE table_schema = current_schema() AND table_name = $1)",
    )
    .bind(table)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("table_exists", e))
}

async fn column_exists(tx: &mut Transaction<'_, Postgres>, table: &str, column: &str) -> Result<bool, StoreError> {
    sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM information_schema.columns \
         WHERE table_schema = current_schema() AND table_name = $1 AND column_name = $2)",
    )
    .bind(table)
    .bind(column)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("column_exists", e))
}

async fn inspect(tx: &mut Transaction<'_, Postgres>) -> Result<TableState, StoreError> {
    let mut state = TableState::default();
    for table in SchemaTable::ALL {
        if table_exists(tx, table.name()).await? {
            state.existing.push(table);
        }
    }
    if state.exists(SchemaTable::TaxRounding) {
        state.tax_rounding_method_column =
            column_exists(tx, SchemaTable::TaxRounding.name(), "method").await?;
    }
    state.legacy_properties = table_exists(tx, LEGACY_PROPERTY_TABLE).await?;
    Ok(state)
}

async fn rename_method_column(tx: &mut Transaction<'_, Postgres>) -> Result<(), StoreError> {
    let table = SchemaTable::TaxRounding.name();
    for statement in [
        format!("ALTER TABLE {table} ADD COLUMN IF NOT EXISTS tax_rounding TEXT NOT NULL DEFAULT 'document'"),
        format!("UPDATE {table} SET tax_rounding = method WHERE method IS NOT NULL"),
        format!("ALTER TABLE {table} DROP COLUMN method"),
    ] {
        sqlx::query(&statement)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("rename_method_column", e))?;
    }
    Ok(())
}

async fn legacy_properties(
    tx: &mut Transaction<'_, Postgres>,
    model: &str,
) -> Result<Vec<LegacyProperty>, StoreError> {
    let rows = sqlx::query(&format!(
        "SELECT model, field, company, res, value FROM {LEGACY_PROPERTY_TABLE} WHERE model = $1"
    ))
    .bind(model)
    .fetch_all(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("legacy_properties", e))?;

    let mut properties = Vec::with_capacity(rows.len());
    for row in rows {
        let company: Option<Uuid> = row
            .try_get("company")
            .map_err(|e| map_sqlx_error("legacy_properties", e))?;
        properties.push(LegacyProperty {
            model: row.try_get("model").map_err(|e| map_sqlx_error("legacy_properties", e))?,
            field: row.try_get("field").map_err(|e| map_sqlx_error("legacy_properties", e))?,
            company: company.map(CompanyId::from_uuid),
            res: row.try_get("res").map_err(|e| map_sqlx_error("legacy_properties", e))?,
            value: row.try_get("value").map_err(|e| map_sqlx_error("legacy_properties", e))?,
        });
    }
    Ok(properties)
}

async fn backfill_default_accounts(tx: &mut Transaction<'_, Postgres>) -> Result<usize, MigrationError> {
    let properties = legacy_properties(tx, PARTY_MODEL).await?;
    let rows = migrate_default_accounts(&properties)?;
    for row in &rows {
        sqlx::query(
            "INSERT INTO account_configuration_default_account \
             (company, default_account_receivable, default_account_payable) VALUES ($1, $2, $3)",
        )
        .bind(row.company.map(|c| *c.as_uuid()))
        .bind(row.default_account_receivable.map(|a| *a.0.as_uuid()))
        .bind(row.default_account_payable.map(|a| *a.0.as_uuid()))
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("backfill_default_accounts", e))?;
    }
    Ok(rows.len())
}

/// Id of the configuration singleton, inserting it when missing.
async fn configuration_id(tx: &mut Transaction<'_, Postgres>) -> Result<ConfigurationId, StoreError> {
    let existing: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM account_configuration ORDER BY create_date, id LIMIT 1")
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("configuration_id", e))?;
    let id = match existing {
        Some(id) => id,
        None => {
            let id = *AggregateId::new().as_uuid();
            sqlx::query("INSERT INTO account_configuration (id) VALUES ($1)")
                .bind(id)
                .execute(&mut **tx)
                .await
                .map_err(|e| map_sqlx_error("configuration_id", e))?;
            id
        }
    };
    Ok(ConfigurationId::new(AggregateId::from_uuid(id)))
}

async fn backfill_tax_roundings(tx: &mut Transaction<'_, Postgres>) -> Result<usize, MigrationError> {
    let properties = legacy_properties(tx, CONFIGURATION_MODEL).await?;
    if properties.is_empty() {
        return Ok(0);
    }
    let configuration = configuration_id(tx).await?;
    let rows = migrate_tax_roundings(&properties, configuration)?;
    for row in &rows {
        sqlx::query(
            "INSERT INTO account_configuration_tax_rounding (configuration, company, tax_rounding) \
             VALUES ($1, $2, $3)",
        )
        .bind(row.configuration.0.as_uuid())
        .bind(row.company.map(|c| *c.as_uuid()))
        .bind(row.tax_rounding.as_str())
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("backfill_tax_roundings", e))?;
    }
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(existing: &[SchemaTable], method: bool, legacy: bool) -> TableState {
        TableState {
            existing: existing.to_vec(),
            tax_rounding_method_column: method,
            legacy_properties: legacy,
        }
    }

    #[test]
    fn fresh_database_creates_everything_without_backfill() {
        let steps = plan_registration(&state(&[], false, false));
        assert_eq!(
            steps,
            SchemaTable::ALL.into_iter().map(Step::CreateTable).collect::<Vec<_>>()
        );
    }

    #[test]
    fn registered_database_has_nothing_to_do() {
        assert!(plan_registration(&state(&SchemaTable::ALL, false, true)).is_empty());
    }

    #[test]
    fn legacy_properties_backfill_only_new_satellites() {
        let existing = [
            SchemaTable::Account,
            SchemaTable::MoveLine,
            SchemaTable::Configuration,
            SchemaTable::TaxRounding,
        ];
        let steps = plan_registration(&state(&existing, false, true));
        assert_eq!(
            steps,
            vec![
                Step::CreateTable(SchemaTable::DefaultAccount),
                Step::CreateTable(SchemaTable::DefaultTaxRule),
                Step::BackfillDefaultAccounts,
            ]
        );
    }

    #[test]
    fn legacy_method_column_is_renamed() {
        let steps = plan_registration(&state(&SchemaTable::ALL, true, false));
        assert_eq!(steps, vec![Step::RenameMethodColumn]);
    }

    #[test]
    fn creation_follows_reference_order() {
        let position = |table: SchemaTable| SchemaTable::ALL.iter().position(|t| *t == table).unwrap();
        assert!(position(SchemaTable::Account) < position(SchemaTable::MoveLine));
        assert!(position(SchemaTable::Configuration) < position(SchemaTable::TaxRounding));
        for table in SchemaTable::ALL {
            assert!(table.ddl()[0].starts_with(&format!("CREATE TABLE {} (", table.name())));
        }
    }
}
