use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use acctparty_core::{AggregateId, Entity, PartyId};

use crate::account::AccountId;

/// Ledger line identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoveLineId(pub AggregateId);

impl MoveLineId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

/// Reconciliation identifier (set once a line is matched).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReconciliationId(pub AggregateId);

/// One posted ledger line. Posting and reconciling lines is owned elsewhere;
/// this crate only reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveLine {
    pub id: MoveLineId,
    pub account: AccountId,
    pub party: Option<PartyId>,
    pub debit: Decimal,
    pub credit: Decimal,
    pub maturity_date: Option<NaiveDate>,
    pub reconciliation: Option<ReconciliationId>,
}

impl Entity for MoveLine {
    type Id = MoveLineId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl MoveLine {
    /// Signed amount, debit-positive.
    pub fn amount(&self) -> Decimal {
        self.debit - self.credit
    }

    /// Not yet matched by a reconciliation.
    pub fn is_open(&self) -> bool {
        self.reconciliation.is_none()
    }

    /// Due on `today`: no maturity date, or one that is not in the future.
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.maturity_date.is_none_or(|date| date <= today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(maturity_date: Option<NaiveDate>) -> MoveLine {
        MoveLine {
            id: MoveLineId::new(AggregateId::new()),
            account: AccountId::new(AggregateId::new()),
            party: Some(PartyId::new()),
            debit: Decimal::new(1000, 2),
            credit: Decimal::new(250, 2),
            maturity_date,
            reconciliation: None,
        }
    }

    #[test]
    fn amount_is_debit_minus_credit() {
        assert_eq!(line(None).amount(), Decimal::new(750, 2));
    }

    #[test]
    fn due_when_maturity_unset_or_reached() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert!(line(None).is_due(today));
        assert!(line(Some(today)).is_due(today));
        assert!(line(today.pred_opt()).is_due(today));
        assert!(!line(today.succ_opt()).is_due(today));
    }

    #[test]
    fn reconciled_line_is_not_open() {
        let mut l = line(None);
        assert!(l.is_open());
        l.reconciliation = Some(ReconciliationId(AggregateId::new()));
        assert!(!l.is_open());
    }
}
