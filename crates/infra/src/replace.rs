//! Party replacement over the registered party reference fields.

use thiserror::Error;
use tracing::{info, instrument};

use acctparty_core::DomainError;
use acctparty_parties::{PartyReplace, ReplaceField};

use crate::db::StoreError;
use crate::ledger::PartyReferences;

#[derive(Debug, Error)]
pub enum ReplaceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("rewriting {model}.{column}: {source}")]
    Store {
        model: &'static str,
        column: &'static str,
        #[source]
        source: StoreError,
    },
}

/// Rewrites every registered field from the source party to the destination.
#[derive(Debug, Clone)]
pub struct PartyReplacer<R> {
    references: R,
}

impl<R> PartyReplacer<R>
where
    R: PartyReferences,
{
    pub fn new(references: R) -> Self {
        Self { references }
    }

    /// Rows rewritten per field.
    #[instrument(
        skip(self, replace),
        fields(source = %replace.source(), destination = %replace.destination()),
        err
    )]
    pub async fn replace(&self, replace: &PartyReplace) -> Result<Vec<(ReplaceField, u64)>, ReplaceError> {
        let mut rewritten = Vec::new();
        for field in PartyReplace::fields_to_replace() {
            let rows = self
                .references
                .rewrite_party(&field, replace.source(), replace.destination())
                .await
                .map_err(|source| ReplaceError::Store {
                    model: field.model,
                    column: field.column,
                    source,
                })?;
            info!(model = field.model, column = field.column, rows, "party references rewritten");
            rewritten.push((field, rows));
        }
        Ok(rewritten)
    }
}
