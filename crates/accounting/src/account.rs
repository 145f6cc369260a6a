use core::str::FromStr;

use serde::{Deserialize, Serialize};

use acctparty_core::{AggregateId, CompanyId, DomainError, DomainResult, Entity};

/// Account identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub AggregateId);

impl AccountId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for AccountId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Account kind as stored in the `kind` column of `account_account`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Other,
    Receivable,
    Payable,
    Revenue,
    Expense,
    Stock,
    View,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Other => "other",
            AccountKind::Receivable => "receivable",
            AccountKind::Payable => "payable",
            AccountKind::Revenue => "revenue",
            AccountKind::Expense => "expense",
            AccountKind::Stock => "stock",
            AccountKind::View => "view",
        }
    }
}

impl core::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "other" => AccountKind::Other,
            "receivable" => AccountKind::Receivable,
            "payable" => AccountKind::Payable,
            "revenue" => AccountKind::Revenue,
            "expense" => AccountKind::Expense,
            "stock" => AccountKind::Stock,
            "view" => AccountKind::View,
            other => return Err(DomainError::validation(format!("unknown account kind: {other}"))),
        })
    }
}

/// Ledger account, as far as party balances care about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub company: CompanyId,
    pub kind: AccountKind,
    pub active: bool,
    /// Lines on this account must carry a party.
    pub party_required: bool,
}

impl Entity for Account {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Account {
    /// Domain of a party's receivable/payable property: matching kind and the
    /// company of the context.
    pub fn check_party_domain(&self, kind: AccountKind, company: CompanyId) -> DomainResult<()> {
        if self.kind != kind {
            return Err(DomainError::validation(format!(
                "account {} is {} but a {} account is required",
                self.id, self.kind, kind
            )));
        }
        if self.company != company {
            return Err(DomainError::validation(format!(
                "account {} belongs to another company",
                self.id
            )));
        }
        Ok(())
    }

    /// Domain of the configuration default accounts: the party domain plus
    /// `party_required`.
    pub fn check_default_domain(&self, kind: AccountKind, company: CompanyId) -> DomainResult<()> {
        self.check_party_domain(kind, company)?;
        if !self.party_required {
            return Err(DomainError::validation(format!(
                "account {} does not require a party",
                self.id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(kind: AccountKind, company: CompanyId, party_required: bool) -> Account {
        Account {
            id: AccountId::new(AggregateId::new()),
            company,
            kind,
            active: true,
            party_required,
        }
    }

    #[test]
    fn kind_parses_from_its_column_value() {
        for kind in [
            AccountKind::Other,
            AccountKind::Receivable,
            AccountKind::Payable,
            AccountKind::Revenue,
            AccountKind::Expense,
            AccountKind::Stock,
            AccountKind::View,
        ] {
            assert_eq!(kind.as_str().parse::<AccountKind>().unwrap(), kind);
        }
        assert!("asset".parse::<AccountKind>().is_err());
    }

    #[test]
    fn party_domain_rejects_wrong_kind_or_company() {
        let company = CompanyId::new();
        let receivable = account(AccountKind::Receivable, company, false);

        assert!(receivable.check_party_domain(AccountKind::Receivable, company).is_ok());
        assert!(receivable.check_party_domain(AccountKind::Payable, company).is_err());
        assert!(receivable
            .check_party_domain(AccountKind::Receivable, CompanyId::new())
            .is_err());
    }

    #[test]
    fn default_domain_requires_party_required() {
        let company = CompanyId::new();
        let loose = account(AccountKind::Payable, company, false);
        let strict = account(AccountKind::Payable, company, true);

        assert!(loose.check_default_domain(AccountKind::Payable, company).is_err());
        assert!(strict.check_default_domain(AccountKind::Payable, company).is_ok());
    }
}
