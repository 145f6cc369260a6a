use core::str::FromStr;

use serde::{Deserialize, Serialize};

use acctparty_core::{AggregateId, CompanyId, DomainError, DomainResult, Entity};

/// Tax rule identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxRuleId(pub AggregateId);

impl TaxRuleId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for TaxRuleId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxRuleKind {
    Sale,
    Purchase,
    Both,
}

impl TaxRuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxRuleKind::Sale => "sale",
            TaxRuleKind::Purchase => "purchase",
            TaxRuleKind::Both => "both",
        }
    }
}

impl FromStr for TaxRuleKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sale" => Ok(TaxRuleKind::Sale),
            "purchase" => Ok(TaxRuleKind::Purchase),
            "both" => Ok(TaxRuleKind::Both),
            other => Err(DomainError::validation(format!("unknown tax rule kind: {other}"))),
        }
    }
}

/// Which side of a party a tax rule is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxRuleUsage {
    /// Applied on taxes when the party is a customer (`sale` or `both`).
    Customer,
    /// Applied on taxes when the party is a supplier (`purchase` or `both`).
    Supplier,
}

impl TaxRuleUsage {
    pub fn accepts(&self, kind: TaxRuleKind) -> bool {
        matches!(
            (self, kind),
            (_, TaxRuleKind::Both)
                | (TaxRuleUsage::Customer, TaxRuleKind::Sale)
                | (TaxRuleUsage::Supplier, TaxRuleKind::Purchase)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRule {
    pub id: TaxRuleId,
    pub company: CompanyId,
    pub kind: TaxRuleKind,
}

impl Entity for TaxRule {
    type Id = TaxRuleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl TaxRule {
    pub fn check_domain(&self, usage: TaxRuleUsage, company: CompanyId) -> DomainResult<()> {
        if self.company != company {
            return Err(DomainError::validation(format!(
                "tax rule {} belongs to another company",
                self.id
            )));
        }
        if !usage.accepts(self.kind) {
            return Err(DomainError::validation(format!(
                "tax rule {} of kind {} cannot be used for a {:?}",
                self.id,
                self.kind.as_str(),
                usage
            )));
        }
        Ok(())
    }
}
