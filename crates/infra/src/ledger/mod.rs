//! Ledger-line storage backends used to aggregate party balances.
//!
//! Backends only answer two grouped queries over open ledger lines; field
//! names, company fallback and rounding live in [`crate::balances`].

pub mod in_memory;
pub mod postgres;
pub mod sql;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use acctparty_accounting::AccountKind;
use acctparty_core::{CompanyId, PartyId};
use acctparty_parties::{BalanceSearch, ReplaceField};

use crate::db::StoreError;

pub use in_memory::InMemoryLedger;
pub use postgres::PostgresLedger;
pub use sqlite::SqliteLedger;

/// One batch of a balance read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceQuery<'a> {
    pub company: CompanyId,
    pub kind: AccountKind,
    /// Keep only lines maturing on or before this day (or without maturity).
    pub due_on: Option<NaiveDate>,
    pub parties: &'a [PartyId],
    /// Decimal places float sums are rounded to.
    pub digits: u32,
}

/// A summed amount as the engine returned it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SumValue {
    Exact(Decimal),
    /// Engines without a decimal SUM (SQLite) hand back floats.
    Float(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartyAmount {
    pub party: PartyId,
    pub amount: SumValue,
}

/// Grouped reads over open ledger lines.
#[async_trait]
pub trait LedgerBackend: Send + Sync {
    /// Sum of `debit - credit` per party of `query.parties` that has at least
    /// one matching line.
    async fn sum_open_amounts(&self, query: &BalanceQuery<'_>) -> Result<Vec<PartyAmount>, StoreError>;

    /// Parties whose summed open amount satisfies `search`.
    async fn parties_matching(&self, search: &BalanceSearch) -> Result<Vec<PartyId>, StoreError>;
}

/// Rewrites a party reference column (party replacement).
#[async_trait]
pub trait PartyReferences: Send + Sync {
    /// Point every `field` reference at `source` to `destination`; returns
    /// the number of rewritten rows.
    async fn rewrite_party(
        &self,
        field: &ReplaceField,
        source: PartyId,
        destination: PartyId,
    ) -> Result<u64, StoreError>;
}

#[async_trait]
impl<B> LedgerBackend for Arc<B>
where
    B: LedgerBackend + ?Sized,
{
    async fn sum_open_amounts(&self, query: &BalanceQuery<'_>) -> Result<Vec<PartyAmount>, StoreError> {
        (**self).sum_open_amounts(query).await
    }

    async fn parties_matching(&self, search: &BalanceSearch) -> Result<Vec<PartyId>, StoreError> {
        (**self).parties_matching(search).await
    }
}

#[async_trait]
impl<R> PartyReferences for Arc<R>
where
    R: PartyReferences + ?Sized,
{
    async fn rewrite_party(
        &self,
        field: &ReplaceField,
        source: PartyId,
        destination: PartyId,
    ) -> Result<u64, StoreError> {
        (**self).rewrite_party(field, source, destination).await
    }
}
