//! Account configuration singleton.
//!
//! Every field is multi-valued per company: values live in satellite rows
//! (one satellite model per group of fields) keyed by company, and are
//! resolved against the company of the caller.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use acctparty_core::{AggregateId, CompanyId, DomainError, DomainResult, ValueObject};

use crate::account::{Account, AccountId, AccountKind};
use crate::tax_rule::{TaxRule, TaxRuleId, TaxRuleUsage};

/// Identifier of the (single) configuration record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigurationId(pub AggregateId);

impl ConfigurationId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

/// How taxes are rounded on documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxRounding {
    /// Round once on the document total.
    #[default]
    Document,
    /// Round every line.
    Line,
}

impl ValueObject for TaxRounding {}

impl TaxRounding {
    /// Selection choices with their labels.
    pub const SELECTION: [(TaxRounding, &'static str); 2] = [
        (TaxRounding::Document, "Per Document"),
        (TaxRounding::Line, "Per Line"),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaxRounding::Document => "document",
            TaxRounding::Line => "line",
        }
    }
}

impl FromStr for TaxRounding {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "document" => Ok(TaxRounding::Document),
            "line" => Ok(TaxRounding::Line),
            other => Err(DomainError::validation(format!("unknown tax rounding: {other}"))),
        }
    }
}

/// Multi-valued fields of the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigField {
    DefaultAccountReceivable,
    DefaultAccountPayable,
    DefaultCustomerTaxRule,
    DefaultSupplierTaxRule,
    TaxRounding,
}

impl ConfigField {
    pub const ALL: [ConfigField; 5] = [
        ConfigField::DefaultAccountReceivable,
        ConfigField::DefaultAccountPayable,
        ConfigField::DefaultCustomerTaxRule,
        ConfigField::DefaultSupplierTaxRule,
        ConfigField::TaxRounding,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ConfigField::DefaultAccountReceivable => "default_account_receivable",
            ConfigField::DefaultAccountPayable => "default_account_payable",
            ConfigField::DefaultCustomerTaxRule => "default_customer_tax_rule",
            ConfigField::DefaultSupplierTaxRule => "default_supplier_tax_rule",
            ConfigField::TaxRounding => "tax_rounding",
        }
    }

    /// Satellite model storing this field.
    pub fn multivalue_model(&self) -> ValueModel {
        match self {
            ConfigField::DefaultAccountReceivable | ConfigField::DefaultAccountPayable => {
                ValueModel::DefaultAccount
            }
            ConfigField::DefaultCustomerTaxRule | ConfigField::DefaultSupplierTaxRule => {
                ValueModel::DefaultTaxRule
            }
            ConfigField::TaxRounding => ValueModel::TaxRounding,
        }
    }

    /// Value used when no satellite row matches.
    pub fn default_value(&self) -> ConfigValue {
        match self {
            ConfigField::DefaultAccountReceivable | ConfigField::DefaultAccountPayable => {
                ConfigValue::Account(None)
            }
            ConfigField::DefaultCustomerTaxRule | ConfigField::DefaultSupplierTaxRule => {
                ConfigValue::TaxRule(None)
            }
            ConfigField::TaxRounding => ConfigValue::TaxRounding(Configuration::default_tax_rounding()),
        }
    }
}

impl FromStr for ConfigField {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigField::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown configuration field: {s}")))
    }
}

/// Satellite models (one table each).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueModel {
    DefaultAccount,
    DefaultTaxRule,
    TaxRounding,
}

impl ValueModel {
    pub fn model_name(&self) -> &'static str {
        match self {
            ValueModel::DefaultAccount => "account.configuration.default_account",
            ValueModel::DefaultTaxRule => "account.configuration.default_tax_rule",
            ValueModel::TaxRounding => "account.configuration.tax_rounding",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            ValueModel::DefaultAccount => "account_configuration_default_account",
            ValueModel::DefaultTaxRule => "account_configuration_default_tax_rule",
            ValueModel::TaxRounding => "account_configuration_tax_rounding",
        }
    }
}

/// Typed value of a configuration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigValue {
    Account(Option<AccountId>),
    TaxRule(Option<TaxRuleId>),
    TaxRounding(TaxRounding),
}

/// Satellite row: default receivable/payable accounts of a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultAccountValue {
    pub company: Option<CompanyId>,
    pub default_account_receivable: Option<AccountId>,
    pub default_account_payable: Option<AccountId>,
}

/// Satellite row: default customer/supplier tax rules of a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultTaxRuleValue {
    pub company: Option<CompanyId>,
    pub default_customer_tax_rule: Option<TaxRuleId>,
    pub default_supplier_tax_rule: Option<TaxRuleId>,
}

/// Satellite row: tax rounding method of a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRoundingValue {
    pub configuration: ConfigurationId,
    pub company: Option<CompanyId>,
    pub tax_rounding: TaxRounding,
}

/// Rows are matched on the exact company first, then on a company-less row.
fn find_value<T>(rows: &[T], company: Option<CompanyId>, key: impl Fn(&T) -> Option<CompanyId>) -> Option<&T> {
    rows.iter()
        .find(|r| key(r) == company)
        .or_else(|| rows.iter().find(|r| key(r).is_none()))
}

/// The account configuration singleton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    id: ConfigurationId,
    default_accounts: Vec<DefaultAccountValue>,
    default_tax_rules: Vec<DefaultTaxRuleValue>,
    tax_roundings: Vec<TaxRoundingValue>,
}

impl Configuration {
    pub fn new(id: ConfigurationId) -> Self {
        Self {
            id,
            default_accounts: Vec::new(),
            default_tax_rules: Vec::new(),
            tax_roundings: Vec::new(),
        }
    }

    /// Rebuild from stored satellite rows.
    pub fn from_values(
        id: ConfigurationId,
        default_accounts: Vec<DefaultAccountValue>,
        default_tax_rules: Vec<DefaultTaxRuleValue>,
        tax_roundings: Vec<TaxRoundingValue>,
    ) -> Self {
        Self {
            id,
            default_accounts,
            default_tax_rules,
            tax_roundings,
        }
    }

    pub fn id(&self) -> ConfigurationId {
        self.id
    }

    pub fn default_tax_rounding() -> TaxRounding {
        TaxRounding::Document
    }

    pub fn default_accounts(&self) -> &[DefaultAccountValue] {
        &self.default_accounts
    }

    pub fn default_tax_rules(&self) -> &[DefaultTaxRuleValue] {
        &self.default_tax_rules
    }

    pub fn tax_roundings(&self) -> &[TaxRoundingValue] {
        &self.tax_roundings
    }

    /// Resolve `field` for `company`.
    pub fn get_multivalue(&self, field: ConfigField, company: Option<CompanyId>) -> ConfigValue {
        let value = match field.multivalue_model() {
            ValueModel::DefaultAccount => find_value(&self.default_accounts, company, |r| r.company)
                .map(|r| match field {
                    ConfigField::DefaultAccountReceivable => ConfigValue::Account(r.default_account_receivable),
                    _ => ConfigValue::Account(r.default_account_payable),
                }),
            ValueModel::DefaultTaxRule => find_value(&self.default_tax_rules, company, |r| r.company)
                .map(|r| match field {
                    ConfigField::DefaultCustomerTaxRule => ConfigValue::TaxRule(r.default_customer_tax_rule),
                    _ => ConfigValue::TaxRule(r.default_supplier_tax_rule),
                }),
            ValueModel::TaxRounding => find_value(&self.tax_roundings, company, |r| r.company)
                .map(|r| ConfigValue::TaxRounding(r.tax_rounding)),
        };
        value.unwrap_or_else(|| field.default_value())
    }

    /// Store `value` for `field` on the satellite row of `company`, creating
    /// the row when missing. Field domains are not checked here; use the
    /// typed setters for user input.
    pub fn set_multivalue(
        &mut self,
        field: ConfigField,
        value: ConfigValue,
        company: Option<CompanyId>,
    ) -> DomainResult<()> {
        match (field, value) {
            (ConfigField::DefaultAccountReceivable, ConfigValue::Account(account)) => {
                self.default_account_row(company).default_account_receivable = account;
            }
            (ConfigField::DefaultAccountPayable, ConfigValue::Account(account)) => {
                self.default_account_row(company).default_account_payable = account;
            }
            (ConfigField::DefaultCustomerTaxRule, ConfigValue::TaxRule(rule)) => {
                self.default_tax_rule_row(company).default_customer_tax_rule = rule;
            }
            (ConfigField::DefaultSupplierTaxRule, ConfigValue::TaxRule(rule)) => {
                self.default_tax_rule_row(company).default_supplier_tax_rule = rule;
            }
            (ConfigField::TaxRounding, ConfigValue::TaxRounding(rounding)) => {
                let configuration = self.id;
                match self.tax_roundings.iter_mut().find(|r| r.company == company) {
                    Some(row) => row.tax_rounding = rounding,
                    None => self.tax_roundings.push(TaxRoundingValue {
                        configuration,
                        company,
                        tax_rounding: rounding,
                    }),
                }
            }
            (field, value) => {
                return Err(DomainError::validation(format!(
                    "value {value:?} does not fit field {}",
                    field.name()
                )));
            }
        }
        Ok(())
    }

    fn default_account_row(&mut self, company: Option<CompanyId>) -> &mut DefaultAccountValue {
        let idx = match self.default_accounts.iter().position(|r| r.company == company) {
            Some(idx) => idx,
            None => {
                self.default_accounts.push(DefaultAccountValue {
                    company,
                    default_account_receivable: None,
                    default_account_payable: None,
                });
                self.default_accounts.len() - 1
            }
        };
        &mut self.default_accounts[idx]
    }

    fn default_tax_rule_row(&mut self, company: Option<CompanyId>) -> &mut DefaultTaxRuleValue {
        let idx = match self.default_tax_rules.iter().position(|r| r.company == company) {
            Some(idx) => idx,
            None => {
                self.default_tax_rules.push(DefaultTaxRuleValue {
                    company,
                    default_customer_tax_rule: None,
                    default_supplier_tax_rule: None,
                });
                self.default_tax_rules.len() - 1
            }
        };
        &mut self.default_tax_rules[idx]
    }

    pub fn default_account_receivable(&self, company: Option<CompanyId>) -> Option<AccountId> {
        match self.get_multivalue(ConfigField::DefaultAccountReceivable, company) {
            ConfigValue::Account(account) => account,
            _ => None,
        }
    }

    pub fn default_account_payable(&self, company: Option<CompanyId>) -> Option<AccountId> {
        match self.get_multivalue(ConfigField::DefaultAccountPayable, company) {
            ConfigValue::Account(account) => account,
            _ => None,
        }
    }

    pub fn default_customer_tax_rule(&self, company: Option<CompanyId>) -> Option<TaxRuleId> {
        match self.get_multivalue(ConfigField::DefaultCustomerTaxRule, company) {
            ConfigValue::TaxRule(rule) => rule,
            _ => None,
        }
    }

    pub fn default_supplier_tax_rule(&self, company: Option<CompanyId>) -> Option<TaxRuleId> {
        match self.get_multivalue(ConfigField::DefaultSupplierTaxRule, company) {
            ConfigValue::TaxRule(rule) => rule,
            _ => None,
        }
    }

    pub fn tax_rounding(&self, company: Option<CompanyId>) -> TaxRounding {
        match self.get_multivalue(ConfigField::TaxRounding, company) {
            ConfigValue::TaxRounding(rounding) => rounding,
            _ => Self::default_tax_rounding(),
        }
    }

    /// Set the default receivable account of `company`.
    ///
    /// The account must be a receivable account of that company requiring a
    /// party.
    pub fn set_default_account_receivable(
        &mut self,
        company: CompanyId,
        account: Option<&Account>,
    ) -> DomainResult<()> {
        if let Some(account) = account {
            account.check_default_domain(AccountKind::Receivable, company)?;
        }
        self.set_multivalue(
            ConfigField::DefaultAccountReceivable,
            ConfigValue::Account(account.map(|a| a.id)),
            Some(company),
        )
    }

    pub fn set_default_account_payable(
        &mut self,
        company: CompanyId,
        account: Option<&Account>,
    ) -> DomainResult<()> {
        if let Some(account) = account {
            account.check_default_domain(AccountKind::Payable, company)?;
        }
        self.set_multivalue(
            ConfigField::DefaultAccountPayable,
            ConfigValue::Account(account.map(|a| a.id)),
            Some(company),
        )
    }

    pub fn set_default_customer_tax_rule(
        &mut self,
        company: CompanyId,
        rule: Option<&TaxRule>,
    ) -> DomainResult<()> {
        if let Some(rule) = rule {
            rule.check_domain(TaxRuleUsage::Customer, company)?;
        }
        self.set_multivalue(
            ConfigField::DefaultCustomerTaxRule,
            ConfigValue::TaxRule(rule.map(|r| r.id)),
            Some(company),
        )
    }

    pub fn set_default_supplier_tax_rule(
        &mut self,
        company: CompanyId,
        rule: Option<&TaxRule>,
    ) -> DomainResult<()> {
        if let Some(rule) = rule {
            rule.check_domain(TaxRuleUsage::Supplier, company)?;
        }
        self.set_multivalue(
            ConfigField::DefaultSupplierTaxRule,
            ConfigValue::TaxRule(rule.map(|r| r.id)),
            Some(company),
        )
    }

    pub fn set_tax_rounding(&mut self, company: CompanyId, rounding: TaxRounding) -> DomainResult<()> {
        self.set_multivalue(
            ConfigField::TaxRounding,
            ConfigValue::TaxRounding(rounding),
            Some(company),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax_rule::TaxRuleKind;

    fn configuration() -> Configuration {
        Configuration::new(ConfigurationId::new(AggregateId::new()))
    }

    fn account(company: CompanyId, kind: AccountKind) -> Account {
        Account {
            id: AccountId::new(AggregateId::new()),
            company,
            kind,
            active: true,
            party_required: true,
        }
    }

    fn rule(company: CompanyId, kind: TaxRuleKind) -> TaxRule {
        TaxRule {
            id: TaxRuleId::new(AggregateId::new()),
            company,
            kind,
        }
    }

    #[test]
    fn tax_rounding_defaults_to_document() {
        let config = configuration();
        assert_eq!(config.tax_rounding(Some(CompanyId::new())), TaxRounding::Document);
        assert_eq!(config.tax_rounding(None), TaxRounding::Document);
        assert_eq!(TaxRounding::default(), Configuration::default_tax_rounding());
    }

    #[test]
    fn values_are_resolved_per_company() {
        let mut config = configuration();
        let c1 = CompanyId::new();
        let c2 = CompanyId::new();
        let r1 = account(c1, AccountKind::Receivable);
        let r2 = account(c2, AccountKind::Receivable);

        config.set_default_account_receivable(c1, Some(&r1)).unwrap();
        config.set_default_account_receivable(c2, Some(&r2)).unwrap();
        config.set_tax_rounding(c2, TaxRounding::Line).unwrap();

        assert_eq!(config.default_account_receivable(Some(c1)), Some(r1.id));
        assert_eq!(config.default_account_receivable(Some(c2)), Some(r2.id));
        assert_eq!(config.default_account_payable(Some(c1)), None);
        assert_eq!(config.tax_rounding(Some(c1)), TaxRounding::Document);
        assert_eq!(config.tax_rounding(Some(c2)), TaxRounding::Line);
        // one satellite row per company
        assert_eq!(config.default_accounts().len(), 2);
        assert_eq!(config.tax_roundings()[0].configuration, config.id());
    }

    #[test]
    fn company_less_row_is_the_fallback() {
        let mut config = configuration();
        config
            .set_multivalue(ConfigField::TaxRounding, ConfigValue::TaxRounding(TaxRounding::Line), None)
            .unwrap();
        assert_eq!(config.tax_rounding(Some(CompanyId::new())), TaxRounding::Line);
    }

    #[test]
    fn fields_share_satellite_rows() {
        let mut config = configuration();
        let company = CompanyId::new();
        let receivable = account(company, AccountKind::Receivable);
        let payable = account(company, AccountKind::Payable);

        config.set_default_account_receivable(company, Some(&receivable)).unwrap();
        config.set_default_account_payable(company, Some(&payable)).unwrap();

        assert_eq!(config.default_accounts().len(), 1);
        assert_eq!(
            ConfigField::DefaultAccountPayable.multivalue_model(),
            ConfigField::DefaultAccountReceivable.multivalue_model()
        );
    }

    #[test]
    fn default_accounts_enforce_their_domain() {
        let mut config = configuration();
        let company = CompanyId::new();

        let payable = account(company, AccountKind::Payable);
        assert!(config.set_default_account_receivable(company, Some(&payable)).is_err());

        let mut loose = account(company, AccountKind::Receivable);
        loose.party_required = false;
        assert!(config.set_default_account_receivable(company, Some(&loose)).is_err());

        let foreign = account(CompanyId::new(), AccountKind::Payable);
        assert!(config.set_default_account_payable(company, Some(&foreign)).is_err());
    }

    #[test]
    fn rejected_default_keeps_the_stored_account() {
        let mut config = configuration();
        let company = CompanyId::new();
        let receivable = account(company, AccountKind::Receivable);
        config.set_default_account_receivable(company, Some(&receivable)).unwrap();

        let foreign = account(CompanyId::new(), AccountKind::Receivable);
        let err = config
            .set_default_account_receivable(company, Some(&foreign))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(config.default_account_receivable(Some(company)), Some(receivable.id));
    }

    #[test]
    fn default_tax_rules_enforce_their_kind() {
        let mut config = configuration();
        let company = CompanyId::new();

        let purchase = rule(company, TaxRuleKind::Purchase);
        assert!(config.set_default_customer_tax_rule(company, Some(&purchase)).is_err());
        assert!(config.set_default_supplier_tax_rule(company, Some(&purchase)).is_ok());

        let both = rule(company, TaxRuleKind::Both);
        config.set_default_customer_tax_rule(company, Some(&both)).unwrap();
        assert_eq!(config.default_customer_tax_rule(Some(company)), Some(both.id));
        assert_eq!(config.default_supplier_tax_rule(Some(company)), Some(purchase.id));
    }

    #[test]
    fn mismatched_value_is_rejected() {
        let mut config = configuration();
        let err = config
            .set_multivalue(ConfigField::TaxRounding, ConfigValue::Account(None), None)
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn field_names_parse() {
        for field in ConfigField::ALL {
            assert_eq!(field.name().parse::<ConfigField>().unwrap(), field);
        }
        assert!("method".parse::<ConfigField>().is_err());
        assert_eq!(
            ConfigField::TaxRounding.multivalue_model().table(),
            "account_configuration_tax_rounding"
        );
    }

    #[test]
    fn tax_rounding_serializes_to_selection_value() {
        assert_eq!(serde_json::to_string(&TaxRounding::Line).unwrap(), "\"line\"");
        assert_eq!(TaxRounding::SELECTION[0].1, "Per Document");
        assert_eq!("document".parse::<TaxRounding>().unwrap(), TaxRounding::Document);
    }
}
