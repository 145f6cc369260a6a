//! Computed receivable/payable fields of a party.
//!
//! A balance is the signed sum of `debit - credit` over the open (unreconciled)
//! ledger lines of a party on active accounts of the matching kind in the
//! company of the session. The `*_today` variants only keep lines whose
//! maturity date is unset or not in the future. Nothing here is stored.

use core::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use acctparty_accounting::{AccountKind, Session};
use acctparty_core::{CompanyId, DomainError, DomainResult};

/// Name of a computed balance field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BalanceField {
    Receivable,
    Payable,
    ReceivableToday,
    PayableToday,
}

impl BalanceField {
    pub const ALL: [BalanceField; 4] = [
        BalanceField::Receivable,
        BalanceField::Payable,
        BalanceField::ReceivableToday,
        BalanceField::PayableToday,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BalanceField::Receivable => "receivable",
            BalanceField::Payable => "payable",
            BalanceField::ReceivableToday => "receivable_today",
            BalanceField::PayableToday => "payable_today",
        }
    }

    /// Account kind the lines are taken from.
    pub fn account_kind(&self) -> AccountKind {
        match self {
            BalanceField::Receivable | BalanceField::ReceivableToday => AccountKind::Receivable,
            BalanceField::Payable | BalanceField::PayableToday => AccountKind::Payable,
        }
    }

    pub fn is_today(&self) -> bool {
        matches!(self, BalanceField::ReceivableToday | BalanceField::PayableToday)
    }

    /// Maturity cutoff for this field on `today` (`None` keeps every line).
    pub fn due_on(&self, today: NaiveDate) -> Option<NaiveDate> {
        self.is_today().then_some(today)
    }

    /// Parse every name, failing on the first one that is not a balance field.
    pub fn parse_all<S: AsRef<str>>(names: &[S]) -> DomainResult<Vec<BalanceField>> {
        names.iter().map(|n| n.as_ref().parse()).collect()
    }
}

impl core::fmt::Display for BalanceField {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BalanceField {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BalanceField::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| DomainError::validation(format!("bad argument: {s}")))
    }
}

/// Comparison operator of a search clause on a balance field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchOperator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl SearchOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SearchOperator::Eq => "=",
            SearchOperator::Ne => "!=",
            SearchOperator::Lt => "<",
            SearchOperator::Le => "<=",
            SearchOperator::Gt => ">",
            SearchOperator::Ge => ">=",
        }
    }

    /// Operator selecting exactly the values this one rejects.
    pub fn negate(&self) -> SearchOperator {
        match self {
            SearchOperator::Eq => SearchOperator::Ne,
            SearchOperator::Ne => SearchOperator::Eq,
            SearchOperator::Lt => SearchOperator::Ge,
            SearchOperator::Le => SearchOperator::Gt,
            SearchOperator::Gt => SearchOperator::Le,
            SearchOperator::Ge => SearchOperator::Lt,
        }
    }

    pub fn compare(&self, lhs: Decimal, rhs: Decimal) -> bool {
        match self {
            SearchOperator::Eq => lhs == rhs,
            SearchOperator::Ne => lhs != rhs,
            SearchOperator::Lt => lhs < rhs,
            SearchOperator::Le => lhs <= rhs,
            SearchOperator::Gt => lhs > rhs,
            SearchOperator::Ge => lhs >= rhs,
        }
    }
}

impl FromStr for SearchOperator {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "=" => SearchOperator::Eq,
            "!=" => SearchOperator::Ne,
            "<" => SearchOperator::Lt,
            "<=" => SearchOperator::Le,
            ">" => SearchOperator::Gt,
            ">=" => SearchOperator::Ge,
            other => {
                return Err(DomainError::validation(format!(
                    "unsupported operator on balance field: {other}"
                )));
            }
        })
    }
}

/// Grouped, filtered aggregation over ledger lines selecting the parties
/// whose balance satisfies `operator value`.
///
/// Backends render it as
/// `SELECT party ... WHERE party IS NOT NULL ... GROUP BY party HAVING
/// CAST(SUM(...) AS NUMERIC) <op> CAST(<value> AS NUMERIC)`.
/// Backends that sum in floating point compare the sum rounded to `digits`,
/// the same value a balance read reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceSearch {
    pub company: CompanyId,
    pub kind: AccountKind,
    pub due_on: Option<NaiveDate>,
    pub operator: SearchOperator,
    pub value: Decimal,
    /// Decimal places of the company currency.
    pub digits: u32,
}

impl BalanceSearch {
    pub fn matches(&self, amount: Decimal) -> bool {
        self.operator.compare(amount, self.value)
    }

    pub fn negated(&self) -> BalanceSearch {
        BalanceSearch {
            operator: self.operator.negate(),
            ..self.clone()
        }
    }
}

/// Predicate on party ids equivalent to a clause on a balance field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchClause {
    /// `id IN (<search>)`.
    IdIn(BalanceSearch),
    /// `id NOT IN (<search>)`, where `<search>` selects the parties whose
    /// balance fails the original clause. Used when a zero balance passes the
    /// clause, so parties without lines match too.
    IdNotIn(BalanceSearch),
    /// Holds for every party (`true`) or none (`false`); used without a
    /// company, where every balance reads as zero.
    Constant(bool),
}

impl SearchClause {
    /// Build the clause for `field operator value` in `session`.
    ///
    /// A missing value compares against zero.
    pub fn build(
        session: &Session,
        field: BalanceField,
        operator: SearchOperator,
        value: Option<Decimal>,
    ) -> SearchClause {
        let value = value.unwrap_or(Decimal::ZERO);
        let zero_matches = operator.compare(Decimal::ZERO, value);
        let Some(company) = session.company_id() else {
            return SearchClause::Constant(zero_matches);
        };
        let search = BalanceSearch {
            company,
            kind: field.account_kind(),
            due_on: field.due_on(session.today()),
            operator,
            value,
            digits: session.currency_digits(),
        };
        if zero_matches {
            SearchClause::IdNotIn(search.negated())
        } else {
            SearchClause::IdIn(search)
        }
    }

    /// Whether a party with `amount` satisfies this clause.
    pub fn accepts(&self, amount: Decimal) -> bool {
        match self {
            SearchClause::IdIn(search) => search.matches(amount),
            SearchClause::IdNotIn(search) => !search.matches(amount),
            SearchClause::Constant(value) => *value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acctparty_accounting::{Company, Currency};
    use acctparty_core::UserId;
    use proptest::prelude::*;

    fn session_with_company() -> Session {
        Session::new(
            UserId::new(),
            Some(Company::new(CompanyId::new(), Currency::with_cents("EUR"))),
        )
        .with_today(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap())
    }

    #[test]
    fn names_parse_and_unknown_is_rejected() {
        for field in BalanceField::ALL {
            assert_eq!(field.name().parse::<BalanceField>().unwrap(), field);
        }
        let err = BalanceField::parse_all(&["receivable", "credit_limit"]).unwrap_err();
        assert_eq!(err, DomainError::validation("bad argument: credit_limit"));
    }

    #[test]
    fn today_fields_map_to_their_base_kind() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(BalanceField::PayableToday.account_kind(), AccountKind::Payable);
        assert_eq!(BalanceField::ReceivableToday.due_on(today), Some(today));
        assert_eq!(BalanceField::Receivable.due_on(today), None);
    }

    #[test]
    fn unsupported_operator_is_rejected() {
        assert!("like".parse::<SearchOperator>().is_err());
        assert_eq!("<=".parse::<SearchOperator>().unwrap(), SearchOperator::Le);
    }

    #[test]
    fn clause_without_company_is_constant() {
        let session = Session::new(UserId::new(), None);
        assert_eq!(
            SearchClause::build(&session, BalanceField::Receivable, SearchOperator::Gt, Some(Decimal::ONE)),
            SearchClause::Constant(false)
        );
        assert_eq!(
            SearchClause::build(&session, BalanceField::Payable, SearchOperator::Eq, None),
            SearchClause::Constant(true)
        );
    }

    #[test]
    fn clause_uses_complement_when_zero_matches() {
        let session = session_with_company();
        match SearchClause::build(&session, BalanceField::ReceivableToday, SearchOperator::Le, Some(Decimal::TEN)) {
            SearchClause::IdNotIn(search) => {
                assert_eq!(search.operator, SearchOperator::Gt);
                assert_eq!(search.kind, AccountKind::Receivable);
                assert_eq!(search.due_on, Some(session.today()));
                assert_eq!(Some(search.company), session.company_id());
                assert_eq!(search.digits, session.currency_digits());
            }
            other => panic!("unexpected clause: {other:?}"),
        }
        match SearchClause::build(&session, BalanceField::Payable, SearchOperator::Gt, Some(Decimal::TEN)) {
            SearchClause::IdIn(search) => {
                assert_eq!(search.operator, SearchOperator::Gt);
                assert_eq!(search.due_on, None);
            }
            other => panic!("unexpected clause: {other:?}"),
        }
    }

    fn operator() -> impl Strategy<Value = SearchOperator> {
        prop_oneof![
            Just(SearchOperator::Eq),
            Just(SearchOperator::Ne),
            Just(SearchOperator::Lt),
            Just(SearchOperator::Le),
            Just(SearchOperator::Gt),
            Just(SearchOperator::Ge),
        ]
    }

    proptest! {
        /// Property: the built clause accepts exactly the amounts the plain
        /// comparison accepts, whichever form it takes.
        #[test]
        fn clause_agrees_with_comparison(
            op in operator(),
            amount in -100_000i64..100_000i64,
            value in -1_000i64..1_000i64,
        ) {
            let session = session_with_company();
            let amount = Decimal::new(amount, 2);
            let value = Decimal::new(value, 2);
            let clause = SearchClause::build(&session, BalanceField::Receivable, op, Some(value));
            prop_assert_eq!(clause.accepts(amount), op.compare(amount, value));
        }

        #[test]
        fn negate_is_complement(op in operator(), a in -1_000i64..1_000i64, b in -1_000i64..1_000i64) {
            let (a, b) = (Decimal::new(a, 1), Decimal::new(b, 1));
            prop_assert_eq!(op.negate().compare(a, b), !op.compare(a, b));
        }
    }
}
