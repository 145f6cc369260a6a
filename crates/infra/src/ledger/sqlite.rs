//! SQLite-backed ledger reads.
//!
//! SQLite has no decimal type: amounts are stored with NUMERIC affinity and
//! summed as floats rounded to the currency digits. Ids are stored as text and
//! dates as `YYYY-MM-DD` text.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tracing::instrument;
use uuid::Uuid;

use acctparty_core::PartyId;
use acctparty_parties::{BalanceSearch, ReplaceField};

use super::sql::{self, ACCOUNT_TABLE, Dialect, MOVE_LINE_TABLE};
use super::{BalanceQuery, LedgerBackend, PartyAmount, PartyReferences, SumValue};
use crate::db::{StoreError, map_sqlx_error};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone)]
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the account and ledger-line tables when missing.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let statements = [
            format!(
                "CREATE TABLE IF NOT EXISTS {ACCOUNT_TABLE} (
                    id TEXT PRIMARY KEY,
                    company TEXT NOT NULL,
                    kind TEXT NOT NULL,
                    active INTEGER NOT NULL DEFAULT 1,
                    party_required INTEGER NOT NULL DEFAULT 0
                )"
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {MOVE_LINE_TABLE} (
                    id TEXT PRIMARY KEY,
                    account TEXT NOT NULL REFERENCES {ACCOUNT_TABLE} (id),
                    party TEXT,
                    debit NUMERIC NOT NULL DEFAULT 0,
                    credit NUMERIC NOT NULL DEFAULT 0,
                    maturity_date TEXT,
                    reconciliation TEXT
                )"
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS {MOVE_LINE_TABLE}_party_idx ON {MOVE_LINE_TABLE} (party)"
            ),
        ];
        for statement in &statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }
}

fn parse_party(operation: &'static str, raw: &str) -> Result<PartyId, StoreError> {
    Uuid::parse_str(raw)
        .map(PartyId::from_uuid)
        .map_err(|e| StoreError::Decode {
            operation,
            message: format!("party id {raw:?}: {e}"),
        })
}

#[async_trait]
impl LedgerBackend for SqliteLedger {
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
            Dialect::Sqlite,
            query.parties.len(),
            query.due_on.is_some(),
            query.digits,
        );
        let mut stmt = sqlx::query(&text)
            .bind(query.kind.as_str())
            .bind(query.company.to_string());
        if let Some(due_on) = query.due_on {
            stmt = stmt.bind(due_on.format(DATE_FORMAT).to_string());
        }
        for party in query.parties {
            stmt = stmt.bind(party.to_string());
        }

        let rows = stmt
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("sum_open_amounts", e))?;

        let mut amounts = Vec::with_capacity(rows.len());
        for row in rows {
            let party: String = row
                .try_get("party")
                .map_err(|e| map_sqlx_error("sum_open_amounts", e))?;
            let amount: Option<f64> = row
                .try_get("amount")
                .map_err(|e| map_sqlx_error("sum_open_amounts", e))?;
            amounts.push(PartyAmount {
                party: parse_party("sum_open_amounts", &party)?,
                amount: SumValue::Float(amount.unwrap_or(0.0)),
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
            Dialect::Sqlite,
            search.operator,
            search.due_on.is_some(),
            search.digits,
        );
        let mut stmt = sqlx::query(&text)
            .bind(search.kind.as_str())
            .bind(search.company.to_string());
        if let Some(due_on) = search.due_on {
            stmt = stmt.bind(due_on.format(DATE_FORMAT).to_string());
        }
        let rows = stmt
            .bind(search.value.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("parties_matching", e))?;

        let mut parties = Vec::with_capacity(rows.len());
        for row in rows {
            let party: String = row
                .try_get("party")
                .map_err(|e| map_sqlx_error("parties_matching", e))?;
            parties.push(parse_party("parties_matching", &party)?);
        }
        Ok(parties)
    }
}

#[async_trait]
impl PartyReferences for SqliteLedger {
    #[instrument(skip(self), fields(table = field.table, column = field.column), err)]
    async fn rewrite_party(
        &self,
        field: &ReplaceField,
        source: PartyId,
        destination: PartyId,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(&sql::replace_sql(Dialect::Sqlite, field))
            .bind(destination.to_string())
            .bind(source.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("rewrite_party", e))?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use acctparty_accounting::AccountKind;
    use acctparty_core::CompanyId;
    use acctparty_parties::SearchOperator;
    use acctparty_parties::replace::MOVE_LINE_PARTY;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use sqlx::sqlite::SqlitePoolOptions;

    pub(crate) async fn memory_ledger() -> SqliteLedger {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let ledger = SqliteLedger::new(pool);
        ledger.ensure_schema().await.unwrap();
        ledger
    }

    pub(crate) async fn add_account(ledger: &SqliteLedger, company: CompanyId, kind: AccountKind, active: bool) -> Uuid {
        let id = Uuid::now_v7();
        sqlx::query("INSERT INTO account_account (id, company, kind, active) VALUES (?, ?, ?, ?)")
            .bind(id.to_string())
            .bind(company.to_string())
            .bind(kind.as_str())
            .bind(active)
            .execute(&ledger.pool)
            .await
            .unwrap();
        id
    }

    pub(crate) async fn add_line(
        ledger: &SqliteLedger,
        account: Uuid,
        party: Option<PartyId>,
        debit: &str,
        credit: &str,
        maturity_date: Option<&str>,
        reconciled: bool,
    ) {
        sqlx::query(
            "INSERT INTO account_move_line (id, account, party, debit, credit, maturity_date, reconciliation) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::now_v7().to_string())
        .bind(account.to_string())
        .bind(party.map(|p| p.to_string()))
        .bind(debit)
        .bind(credit)
        .bind(maturity_date)
        .bind(reconciled.then(|| Uuid::now_v7().to_string()))
        .execute(&ledger.pool)
        .await
        .unwrap();
    }

    fn float(amount: &PartyAmount) -> f64 {
        match amount.amount {
            SumValue::Float(value) => value,
            SumValue::Exact(value) => panic!("sqlite returned an exact sum: {value}"),
        }
    }

    #[tokio::test]
    async fn sums_open_lines_per_party_as_floats() {
        let ledger = memory_ledger().await;
        let company = CompanyId::new();
        let receivable = add_account(&ledger, company, AccountKind::Receivable, true).await;
        let inactive = add_account(&ledger, company, AccountKind::Receivable, false).await;
        let payable = add_account(&ledger, company, AccountKind::Payable, true).await;
        let (alice, bob) = (PartyId::new(), PartyId::new());

        add_line(&ledger, receivable, Some(alice), "100", "0", None, false).await;
        add_line(&ledger, receivable, Some(alice), "0", "40", None, false).await;
        add_line(&ledger, receivable, Some(alice), "500", "0", None, true).await;
        add_line(&ledger, inactive, Some(alice), "7", "0", None, false).await;
        add_line(&ledger, payable, Some(alice), "0", "9", None, false).await;
        add_line(&ledger, receivable, Some(bob), "1", "0", None, false).await;

        let parties = [alice];
        let rows = ledger
            .sum_open_amounts(&BalanceQuery {
                company,
                kind: AccountKind::Receivable,
                due_on: None,
                parties: &parties,
                digits: 2,
            })
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].party, alice);
        assert_eq!(float(&rows[0]), 60.0);
    }

    #[tokio::test]
    async fn due_cutoff_keeps_lines_without_maturity() {
        let ledger = memory_ledger().await;
        let company = CompanyId::new();
        let receivable = add_account(&ledger, company, AccountKind::Receivable, true).await;
        let party = PartyId::new();
        add_line(&ledger, receivable, Some(party), "10", "0", Some("2024-03-01"), false).await;
        add_line(&ledger, receivable, Some(party), "20", "0", Some("2024-04-01"), false).await;
        add_line(&ledger, receivable, Some(party), "5", "0", None, false).await;

        let parties = [party];
        let rows = ledger
            .sum_open_amounts(&BalanceQuery {
                company,
                kind: AccountKind::Receivable,
                due_on: NaiveDate::from_ymd_opt(2024, 3, 31),
                parties: &parties,
                digits: 2,
            })
            .await
            .unwrap();
        assert_eq!(float(&rows[0]), 15.0);
    }

    #[tokio::test]
    async fn search_compares_summed_amounts() {
        let ledger = memory_ledger().await;
        let company = CompanyId::new();
        let receivable = add_account(&ledger, company, AccountKind::Receivable, true).await;
        let (big, small) = (PartyId::new(), PartyId::new());
        add_line(&ledger, receivable, Some(big), "250", "0", None, false).await;
        add_line(&ledger, receivable, Some(small), "50", "0", None, false).await;
        add_line(&ledger, receivable, None, "1000", "0", None, false).await;

        let found = ledger
            .parties_matching(&BalanceSearch {
                company,
                kind: AccountKind::Receivable,
                due_on: None,
                operator: SearchOperator::Gt,
                value: Decimal::new(100, 0),
                digits: 2,
            })
            .await
            .unwrap();
        assert_eq!(found, vec![big]);
    }

    #[tokio::test]
    async fn search_sees_float_sums_as_the_read_reports_them() {
        let ledger = memory_ledger().await;
        let company = CompanyId::new();
        let receivable = add_account(&ledger, company, AccountKind::Receivable, true).await;
        let (settled, owing) = (PartyId::new(), PartyId::new());
        add_line(&ledger, receivable, Some(settled), "0.1", "0", None, false).await;
        add_line(&ledger, receivable, Some(settled), "0.2", "0", None, false).await;
        add_line(&ledger, receivable, Some(settled), "0", "0.3", None, false).await;
        add_line(&ledger, receivable, Some(owing), "0.1", "0", None, false).await;
        add_line(&ledger, receivable, Some(owing), "0.2", "0", None, false).await;

        let parties = [settled, owing];
        let mut rows = ledger
            .sum_open_amounts(&BalanceQuery {
                company,
                kind: AccountKind::Receivable,
                due_on: None,
                parties: &parties,
                digits: 2,
            })
            .await
            .unwrap();
        rows.sort_by_key(|row| row.party != settled);
        assert_eq!(float(&rows[0]), 0.0);
        assert_eq!(float(&rows[1]), 0.3);

        let search = |operator, value| BalanceSearch {
            company,
            kind: AccountKind::Receivable,
            due_on: None,
            operator,
            value,
            digits: 2,
        };
        let zero = ledger
            .parties_matching(&search(SearchOperator::Eq, Decimal::ZERO))
            .await
            .unwrap();
        assert_eq!(zero, vec![settled]);
        let nonzero = ledger
            .parties_matching(&search(SearchOperator::Ne, Decimal::ZERO))
            .await
            .unwrap();
        assert_eq!(nonzero, vec![owing]);
        let exact = ledger
            .parties_matching(&search(SearchOperator::Eq, Decimal::new(3, 1)))
            .await
            .unwrap();
        assert_eq!(exact, vec![owing]);
    }

    #[tokio::test]
    async fn rewrite_moves_lines_to_destination() {
        let ledger = memory_ledger().await;
        let company = CompanyId::new();
        let receivable = add_account(&ledger, company, AccountKind::Receivable, true).await;
        let (source, destination) = (PartyId::new(), PartyId::new());
        add_line(&ledger, receivable, Some(source), "10", "0", None, false).await;
        add_line(&ledger, receivable, Some(source), "5", "0", None, false).await;

        let rewritten = ledger
            .rewrite_party(&MOVE_LINE_PARTY, source, destination)
            .await
            .unwrap();
        assert_eq!(rewritten, 2);

        let parties = [source, destination];
        let rows = ledger
            .sum_open_amounts(&BalanceQuery {
                company,
                kind: AccountKind::Receivable,
                due_on: None,
                parties: &parties,
                digits: 2,
            })
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].party, destination);
    }
}
