//! Receivable/payable balances of parties, read from a ledger backend.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, instrument};

use acctparty_accounting::Session;
use acctparty_core::{DomainError, PartyId};
use acctparty_parties::{BalanceField, SearchClause, SearchOperator};

use crate::config::{AppConfig, DEFAULT_IN_MAX};
use crate::db::StoreError;
use crate::ledger::{BalanceQuery, LedgerBackend, SumValue};

#[derive(Debug, Error)]
pub enum BalanceError {
    /// Bad field name, bad operator.
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Balances per requested field, each mapping every requested party to its
/// amount.
pub type Balances = BTreeMap<BalanceField, HashMap<PartyId, Decimal>>;

/// Computes the balance fields of parties over a [`LedgerBackend`].
#[derive(Debug, Clone)]
pub struct PartyBalances<B> {
    backend: B,
    in_max: usize,
}

impl<B> PartyBalances<B>
where
    B: LedgerBackend,
{
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            in_max: DEFAULT_IN_MAX,
        }
    }

    /// Service sized by the `ACCTPARTY_IN_MAX` setting of `config`.
    pub fn from_config(backend: B, config: &AppConfig) -> Self {
        Self::new(backend).with_in_max(config.in_max)
    }

    /// Override the number of parties per aggregation query.
    pub fn with_in_max(mut self, in_max: usize) -> Self {
        self.in_max = in_max.max(1);
        self
    }

    pub fn in_max(&self) -> usize {
        self.in_max
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Compute the `names` balance fields of `parties`.
    ///
    /// Every party gets a value for every field, zero when it has no open
    /// line. Without a company in the session every value is zero.
    #[instrument(skip(self, session, parties, names), fields(parties = parties.len()), err)]
    pub async fn get_receivable_payable<S: AsRef<str>>(
        &self,
        session: &Session,
        parties: &[PartyId],
        names: &[S],
    ) -> Result<Balances, BalanceError> {
        let fields = BalanceField::parse_all(names)?;

        let mut result: Balances = fields
            .iter()
            .map(|field| {
                let zeros = parties.iter().map(|party| (*party, Decimal::ZERO)).collect();
                (*field, zeros)
            })
            .collect();

        let Some(company) = session.company() else {
            debug!("no company in session, balances stay zero");
            return Ok(result);
        };

        let mut unique: Vec<PartyId> = Vec::with_capacity(parties.len());
        let mut seen = HashSet::with_capacity(parties.len());
        for party in parties {
            if seen.insert(*party) {
                unique.push(*party);
            }
        }

        let mut to_round = false;
        for field in &fields {
            let values = result.entry(*field).or_default();
            for chunk in unique.chunks(self.in_max) {
                let query = BalanceQuery {
                    company: company.id,
                    kind: field.account_kind(),
                    due_on: field.due_on(session.today()),
                    parties: chunk,
                    digits: company.currency.digits,
                };
                for row in self.backend.sum_open_amounts(&query).await? {
                    let amount = match row.amount {
                        SumValue::Exact(amount) => amount,
                        SumValue::Float(amount) => {
                            to_round = true;
                            float_to_decimal(amount)?
                        }
                    };
                    values.insert(row.party, amount);
                }
            }
        }

        if to_round {
            for values in result.values_mut() {
                for value in values.values_mut() {
                    *value = company.currency.round(*value);
                }
            }
        }
        Ok(result)
    }

    /// Clause on party ids equivalent to `name operator value`.
    pub fn search_receivable_payable(
        &self,
        session: &Session,
        name: &str,
        operator: &str,
        value: Option<Decimal>,
    ) -> Result<SearchClause, BalanceError> {
        let field: BalanceField = name.parse()?;
        let operator: SearchOperator = operator.parse()?;
        Ok(SearchClause::build(session, field, operator, value))
    }

    /// Run the search clause against `candidates`, keeping their order.
    #[instrument(skip(self, session, candidates), fields(candidates = candidates.len()), err)]
    pub async fn search_parties(
        &self,
        session: &Session,
        candidates: &[PartyId],
        name: &str,
        operator: &str,
        value: Option<Decimal>,
    ) -> Result<Vec<PartyId>, BalanceError> {
        let clause = self.search_receivable_payable(session, name, operator, value)?;
        let selected: HashSet<PartyId> = match &clause {
            SearchClause::Constant(true) => return Ok(candidates.to_vec()),
            SearchClause::Constant(false) => return Ok(Vec::new()),
            SearchClause::IdIn(search) | SearchClause::IdNotIn(search) => {
                self.backend.parties_matching(search).await?.into_iter().collect()
            }
        };
        let keep_selected = matches!(clause, SearchClause::IdIn(_));
        Ok(candidates
            .iter()
            .copied()
            .filter(|party| selected.contains(party) == keep_selected)
            .collect())
    }

    /// Digits of the balance fields: the company currency's, or the default.
    pub fn currency_digits(&self, session: &Session) -> u32 {
        session.currency_digits()
    }
}

/// Floats from the engine go through their shortest decimal representation.
fn float_to_decimal(amount: f64) -> Result<Decimal, StoreError> {
    Decimal::from_str(&amount.to_string()).map_err(|e| StoreError::Decode {
        operation: "get_receivable_payable",
        message: format!("amount {amount}: {e}"),
    })
}
