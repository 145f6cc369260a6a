//! Postgres-backed configuration singleton.
//!
//! Tables are created by [`crate::migrations::SchemaRegistry`].

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use acctparty_accounting::{
    AccountId, Configuration, ConfigurationId, DefaultAccountValue, DefaultTaxRuleValue,
    TaxRounding, TaxRoundingValue, TaxRuleId,
};
use acctparty_core::{AggregateId, CompanyId};

use super::ConfigurationStore;
use crate::db::{StoreError, map_sqlx_error};

#[derive(Debug, Clone)]
pub struct PostgresConfigurationStore {
    pool: Arc<PgPool>,
}

impl PostgresConfigurationStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

fn company(row: &PgRow, operation: &'static str) -> Result<Option<CompanyId>, StoreError> {
    let id: Option<Uuid> = row.try_get("company").map_err(|e| map_sqlx_error(operation, e))?;
    Ok(id.map(CompanyId::from_uuid))
}

fn account(row: &PgRow, column: &str, operation: &'static str) -> Result<Option<AccountId>, StoreError> {
    let id: Option<Uuid> = row.try_get(column).map_err(|e| map_sqlx_error(operation, e))?;
    Ok(id.map(|id| AccountId::new(AggregateId::from_uuid(id))))
}

fn tax_rule(row: &PgRow, column: &str, operation: &'static str) -> Result<Option<TaxRuleId>, StoreError> {
    let id: Option<Uuid> = row.try_get(column).map_err(|e| map_sqlx_error(operation, e))?;
    Ok(id.map(|id| TaxRuleId::new(AggregateId::from_uuid(id))))
}

async fn singleton_id(tx: &mut Transaction<'_, Postgres>) -> Result<Uuid, StoreError> {
    let existing: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM account_configuration ORDER BY create_date, id LIMIT 1")
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("get_or_create", e))?;
    if let Some(id) = existing {
        return Ok(id);
    }
    let id = *AggregateId::new().as_uuid();
    sqlx::query("INSERT INTO account_configuration (id, create_date) VALUES ($1, now())")
        .bind(id)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("get_or_create", e))?;
    Ok(id)
}

#[async_trait]
impl ConfigurationStore for PostgresConfigurationStore {
    #[instrument(skip(self), err)]
    async fn get_or_create(&self) -> Result<Configuration, StoreError> {
        const OP: &str = "get_or_create";
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error(OP, e))?;
        let id = singleton_id(&mut tx).await?;

        let rows = sqlx::query(
            "SELECT company, default_account_receivable, default_account_payable \
             FROM account_configuration_default_account ORDER BY id",
        )
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error(OP, e))?;
        let mut default_accounts = Vec::with_capacity(rows.len());
        for row in &rows {
            default_accounts.push(DefaultAccountValue {
                company: company(row, OP)?,
                default_account_receivable: account(row, "default_account_receivable", OP)?,
                default_account_payable: account(row, "default_account_payable", OP)?,
            });
        }

        let rows = sqlx::query(
            "SELECT company, default_customer_tax_rule, default_supplier_tax_rule \
             FROM account_configuration_default_tax_rule ORDER BY id",
        )
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error(OP, e))?;
        let mut default_tax_rules = Vec::with_capacity(rows.len());
        for row in &rows {
            default_tax_rules.push(DefaultTaxRuleValue {
                company: company(row, OP)?,
                default_customer_tax_rule: tax_rule(row, "default_customer_tax_rule", OP)?,
                default_supplier_tax_rule: tax_rule(row, "default_supplier_tax_rule", OP)?,
            });
        }

        let configuration_id = ConfigurationId::new(AggregateId::from_uuid(id));
        let rows = sqlx::query(
            "SELECT company, tax_rounding FROM account_configuration_tax_rounding \
             WHERE configuration = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error(OP, e))?;
        let mut tax_roundings = Vec::with_capacity(rows.len());
        for row in &rows {
            let raw: String = row.try_get("tax_rounding").map_err(|e| map_sqlx_error(OP, e))?;
            let tax_rounding = raw.parse::<TaxRounding>().map_err(|e| StoreError::Decode {
                operation: OP,
                message: e.to_string(),
            })?;
            tax_roundings.push(TaxRoundingValue {
                configuration: configuration_id,
                company: company(row, OP)?,
                tax_rounding,
            });
        }

        tx.commit().await.map_err(|e| map_sqlx_error(OP, e))?;
        Ok(Configuration::from_values(
            configuration_id,
            default_accounts,
            default_tax_rules,
            tax_roundings,
        ))
    }

    #[instrument(skip(self, configuration), fields(configuration = %configuration.id().0), err)]
    async fn save(&self, configuration: &Configuration) -> Result<(), StoreError> {
        const OP: &str = "save_configuration";
        let id = *configuration.id().0.as_uuid();
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error(OP, e))?;

        sqlx::query(
            "INSERT INTO account_configuration (id, create_date) VALUES ($1, now()) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error(OP, e))?;

        for table in [
            "account_configuration_default_account",
            "account_configuration_default_tax_rule",
        ] {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error(OP, e))?;
        }
        sqlx::query("DELETE FROM account_configuration_tax_rounding WHERE configuration = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(OP, e))?;

        for value in configuration.default_accounts() {
            sqlx::query(
                "INSERT INTO account_configuration_default_account \
                 (company, default_account_receivable, default_account_payable) VALUES ($1, $2, $3)",
            )
            .bind(value.company.map(|c| *c.as_uuid()))
            .bind(value.default_account_receivable.map(|a| *a.0.as_uuid()))
            .bind(value.default_account_payable.map(|a| *a.0.as_uuid()))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(OP, e))?;
        }
        for value in configuration.default_tax_rules() {
            sqlx::query(
                "INSERT INTO account_configuration_default_tax_rule \
                 (company, default_customer_tax_rule, default_supplier_tax_rule) VALUES ($1, $2, $3)",
            )
            .bind(value.company.map(|c| *c.as_uuid()))
            .bind(value.default_customer_tax_rule.map(|r| *r.0.as_uuid()))
            .bind(value.default_supplier_tax_rule.map(|r| *r.0.as_uuid()))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(OP, e))?;
        }
        for value in configuration.tax_roundings() {
            sqlx::query(
                "INSERT INTO account_configuration_tax_rounding (configuration, company, tax_rounding) \
                 VALUES ($1, $2, $3)",
            )
            .bind(id)
            .bind(value.company.map(|c| *c.as_uuid()))
            .bind(value.tax_rounding.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(OP, e))?;
        }

        tx.commit().await.map_err(|e| map_sqlx_error(OP, e))
    }
}
