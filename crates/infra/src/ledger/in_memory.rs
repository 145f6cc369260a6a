use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use rust_decimal::Decimal;

use acctparty_accounting::{Account, AccountId, AccountKind, MoveLine};
use acctparty_core::{CompanyId, PartyId};
use acctparty_parties::replace::MOVE_LINE_PARTY;
use acctparty_parties::{BalanceSearch, ReplaceField};

use super::{BalanceQuery, LedgerBackend, PartyAmount, PartyReferences, SumValue};
use crate::db::StoreError;

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<AccountId, Account>,
    lines: Vec<MoveLine>,
}

/// In-memory ledger for tests/dev. Sums are exact decimals.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: RwLock<State>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_account(&self, account: Account) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        state.accounts.insert(account.id, account);
        Ok(())
    }

    pub fn insert_line(&self, line: MoveLine) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        state.lines.push(line);
        Ok(())
    }

    pub fn lines(&self) -> Result<Vec<MoveLine>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::Poisoned)?;
        Ok(state.lines.clone())
    }

    /// Open amounts per party over the lines selected by the filters.
    fn open_amounts(
        &self,
        company: CompanyId,
        kind: AccountKind,
        due_on: Option<chrono::NaiveDate>,
    ) -> Result<BTreeMap<PartyId, Decimal>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::Poisoned)?;
        let mut totals: BTreeMap<PartyId, Decimal> = BTreeMap::new();
        for line in &state.lines {
            let Some(party) = line.party else {
                continue;
            };
            let Some(account) = state.accounts.get(&line.account) else {
                continue;
            };
            if !account.active || account.kind != kind || account.company != company {
                continue;
            }
            if !line.is_open() {
                continue;
            }
            if let Some(today) = due_on {
                if !line.is_due(today) {
                    continue;
                }
            }
            *totals.entry(party).or_insert(Decimal::ZERO) += line.amount();
        }
        Ok(totals)
    }
}

#[async_trait]
impl LedgerBackend for InMemoryLedger {
    async fn sum_open_amounts(&self, query: &BalanceQuery<'_>) -> Result<Vec<PartyAmount>, StoreError> {
        let wanted: HashSet<PartyId> = query.parties.iter().copied().collect();
        let totals = self.open_amounts(query.company, query.kind, query.due_on)?;
        Ok(totals
            .into_iter()
            .filter(|(party, _)| wanted.contains(party))
            .map(|(party, amount)| PartyAmount {
                party,
                amount: SumValue::Exact(amount),
            })
            .collect())
    }

    async fn parties_matching(&self, search: &BalanceSearch) -> Result<Vec<PartyId>, StoreError> {
        let totals = self.open_amounts(search.company, search.kind, search.due_on)?;
        Ok(totals
            .into_iter()
            .filter(|(_, amount)| search.matches(*amount))
            .map(|(party, _)| party)
            .collect())
    }
}

#[async_trait]
impl PartyReferences for InMemoryLedger {
    async fn rewrite_party(
        &self,
        field: &ReplaceField,
        source: PartyId,
        destination: PartyId,
    ) -> Result<u64, StoreError> {
        if *field != MOVE_LINE_PARTY {
            return Ok(0);
        }
        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        let mut rewritten = 0;
        for line in state.lines.iter_mut().filter(|l| l.party == Some(source)) {
            line.party = Some(destination);
            rewritten += 1;
        }
        Ok(rewritten)
    }
}
