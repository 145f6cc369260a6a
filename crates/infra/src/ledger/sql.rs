//! SQL text for the ledger queries, shared by the SQL backends.
//!
//! Parameters are always bound in this order: account kind, company,
//! maturity cutoff (when present), then parties or the compared value.

use acctparty_parties::{ReplaceField, SearchOperator};

pub const MOVE_LINE_TABLE: &str = "account_move_line";
pub const ACCOUNT_TABLE: &str = "account_account";

/// Open amount of a line.
const AMOUNT: &str = "COALESCE(l.debit, 0) - COALESCE(l.credit, 0)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Numeric type both sides of a HAVING comparison are cast to.
    pub fn numeric_type(&self) -> &'static str {
        "NUMERIC"
    }

    /// Summed open amount, shared by the balance read and the search.
    ///
    /// SQLite sums in floating point, so its sum is rounded to the currency
    /// `digits`; ROUND also makes integer-only sums floats.
    fn sum(&self, digits: u32) -> String {
        match self {
            Dialect::Postgres => format!("SUM({AMOUNT})"),
            Dialect::Sqlite => format!("ROUND(SUM({AMOUNT}), {digits})"),
        }
    }
}

/// Placeholder generator (`$1, $2, ...` or `?`).
struct Params {
    dialect: Dialect,
    next: usize,
}

impl Params {
    fn new(dialect: Dialect) -> Self {
        Self { dialect, next: 1 }
    }

    fn next(&mut self) -> String {
        let n = self.next;
        self.next += 1;
        match self.dialect {
            Dialect::Postgres => format!("${n}"),
            Dialect::Sqlite => "?".to_string(),
        }
    }
}

fn open_lines_where(params: &mut Params, with_due: bool) -> String {
    let kind = params.next();
    let company = params.next();
    let mut clause = format!(
        "a.active AND a.kind = {kind} AND l.reconciliation IS NULL AND a.company = {company}"
    );
    if with_due {
        let due = params.next();
        clause.push_str(&format!(
            " AND (l.maturity_date <= {due} OR l.maturity_date IS NULL)"
        ));
    }
    clause
}

/// Balance read for a batch of `party_count` parties.
pub fn balance_sql(dialect: Dialect, party_count: usize, with_due: bool, digits: u32) -> String {
    let mut params = Params::new(dialect);
    let filter = open_lines_where(&mut params, with_due);
    let parties = (0..party_count).map(|_| params.next()).collect::<Vec<_>>().join(", ");
    format!(
        "SELECT l.party AS party, {sum} AS amount \
         FROM {MOVE_LINE_TABLE} AS l \
         JOIN {ACCOUNT_TABLE} AS a ON a.id = l.account \
         WHERE {filter} AND l.party IN ({parties}) \
         GROUP BY l.party",
        sum = dialect.sum(digits),
    )
}

/// Parties whose open amount compares to a value with `operator`.
pub fn search_sql(dialect: Dialect, operator: SearchOperator, with_due: bool, digits: u32) -> String {
    let mut params = Params::new(dialect);
    let filter = open_lines_where(&mut params, with_due);
    let value = params.next();
    let numeric = dialect.numeric_type();
    format!(
        "SELECT l.party AS party \
         FROM {MOVE_LINE_TABLE} AS l \
         JOIN {ACCOUNT_TABLE} AS a ON a.id = l.account \
         WHERE {filter} AND l.party IS NOT NULL \
         GROUP BY l.party \
         HAVING CAST({sum} AS {numeric}) {op} CAST({value} AS {numeric})",
        sum = dialect.sum(digits),
        op = operator.as_sql(),
    )
}

/// Rewrite a party reference column: binds destination, then source.
pub fn replace_sql(dialect: Dialect, field: &ReplaceField) -> String {
    let mut params = Params::new(dialect);
    let destination = params.next();
    let source = params.next();
    format!(
        "UPDATE {table} SET {column} = {destination} WHERE {column} = {source}",
        table = field.table,
        column = field.column,
    )
}
