//! Postgres-backed ledger reads.
//!
//! `account_move_line.debit/credit` are `NUMERIC`, so sums come back exact.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use acctparty_core::PartyId;
use acctparty_parties::{BalanceSearch, ReplaceField};

use super::sql::{self, Dialect};
use super::{BalanceQuery, LedgerBackend, PartyAmount, PartyReferences, SumValue};
use crate::db::{StoreError, map_sqlx_error};

#[derive(Debug, Clone)]
pub struct PostgresLedger {
    pool: Arc<PgPool>,
}

impl PostgresLedger {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl LedgerBackend for PostgresLedger {
    #[instrument(
        skip(self, query),
        fields(
            company = %query.company,
            kind = %query.kind,
            parties = query.parties.len()
        ),
        err
    )]
    async fn sum_open_amounts(&self, query: &BalanceQuery<'_>) -> Result<Vec<PartyAmount>, StoreError> {
        if query.parties.is_empty() {
            return Ok(Vec::new());
        }
        let text = sql::balance_sql(
            Dialect::Postgres,
            query.parties.len(),
            query.due_on.is_some(),
            query.digits,
        );
        let mut stmt = sqlx::query(&text)
            .bind(query.kind.as_str())
            .bind(query.company.as_uuid());
        if let Some(due_on) = query.due_on {
            stmt = stmt.bind(due_on);
        }
        for party in query.parties {
            stmt = stmt.bind(party.as_uuid());
        }

        let rows = stmt
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("sum_open_amounts", e))?;

        let mut amounts = Vec::with_capacity(rows.len());
        for row in rows {
            let party: Uuid = row
                .try_get("party")
                .map_err(|e| map_sqlx_error("sum_open_amounts", e))?;
            let amount: Option<Decimal> = row
                .try_get("amount")
                .map_err(|e| map_sqlx_error("sum_open_amounts", e))?;
            amounts.push(PartyAmount {
                party: PartyId::from_uuid(party),
                amount: SumValue::Exact(amount.unwrap_or(Decimal::ZERO)),
            });
        }
        Ok(amounts)
    }

    #[instrument(
        skip(self, search),
        fields(company = %search.company, kind = %search.kind, operator = search.operator.as_sql()),
        err
    )]
    async fn parties_matching(&self, search: &BalanceSearch) -> Result<Vec<PartyId>, StoreError> {
        let text = sql::search_sql(
            Dialect::Postgres,
            search.operator,
            search.due_on.is_some(),
            search.digits,
        );
        let mut stmt = sqlx::query(&text)
            .bind(search.kind.as_str())
            .bind(search.company.as_uuid());
        if let Some(due_on) = search.due_on {
            stmt = stmt.bind(due_on);
        }
        let rows = stmt
            .bind(search.value)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("parties_matching", e))?;

        rows.iter()
            .map(|row| {
                row.try_get::<Uuid, _>("party")
                    .map(PartyId::from_uuid)
                    .map_err(|e| map_sqlx_error("parties_matching", e))
            })
            .collect()
    }
}

#[async_trait]
impl PartyReferences for PostgresLedger {
    #[instrument(skip(self), fields(table = field.table, column = field.column), err)]
    async fn rewrite_party(
        &self,
        field: &ReplaceField,
        source: PartyId,
        destination: PartyId,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(&sql::replace_sql(Dialect::Postgres, field))
            .bind(destination.as_uuid())
            .bind(source.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("rewrite_party", e))?;
        Ok(result.rows_affected())
    }
}
