//! Accounting module: accounts, tax rules, ledger lines and the account
//! configuration singleton with its per-company defaults.
//!
//! Pure domain logic only: no IO, no persistence concerns.

pub mod account;
pub mod configuration;
pub mod currency;
pub mod move_line;
pub mod property;
pub mod session;
pub mod tax_rule;

pub use account::{Account, AccountId, AccountKind};
pub use configuration::{
    ConfigField, ConfigValue, Configuration, ConfigurationId, DefaultAccountValue,
    DefaultTaxRuleValue, TaxRounding, TaxRoundingValue, ValueModel,
};
pub use currency::{Company, Currency};
pub use move_line::{MoveLine, MoveLineId, ReconciliationId};
pub use property::{LegacyProperty, PropertyValue};
pub use session::Session;
pub use tax_rule::{TaxRule, TaxRuleId, TaxRuleKind, TaxRuleUsage};
