//! Request session: who acts, for which company, on which day.

use chrono::{NaiveDate, Utc};

use acctparty_core::{CompanyId, UserId};

use crate::currency::Company;

/// Digits used for amounts when no company is in context.
pub const DEFAULT_CURRENCY_DIGITS: u32 = 2;

/// Immutable per-request context.
///
/// `company` is the company of the acting user; balance computations treat a
/// missing company as "nothing to report" rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user_id: UserId,
    company: Option<Company>,
    today: NaiveDate,
}

impl Session {
    /// Session dated with the current UTC day.
    pub fn new(user_id: UserId, company: Option<Company>) -> Self {
        Self {
            user_id,
            company,
            today: Utc::now().date_naive(),
        }
    }

    /// Override the business date (tests, back-dated reports).
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn company(&self) -> Option<&Company> {
        self.company.as_ref()
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company.as_ref().map(|c| c.id)
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Decimal digits of the company currency (2 without a company).
    pub fn currency_digits(&self) -> u32 {
        self.company
            .as_ref()
            .map(|c| c.currency.digits)
            .unwrap_or(DEFAULT_CURRENCY_DIGITS)
    }
}
