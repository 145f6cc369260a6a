//! Migration of legacy property storage into configuration satellite rows.
//!
//! Before multi-value fields, company defaults were kept as generic
//! "properties": one row per (model field, company, optional resource) with a
//! textual value. Rows without a resource are the company defaults; rows with
//! a resource are per-record overrides and stay out of the satellites.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use acctparty_core::{AggregateId, CompanyId, DomainError, DomainResult};

use crate::account::AccountId;
use crate::configuration::{ConfigurationId, DefaultAccountValue, TaxRounding, TaxRoundingValue};

/// Model whose default properties hold the legacy party accounts.
pub const PARTY_MODEL: &str = "party.party";
/// Model whose default properties hold the legacy tax rounding.
pub const CONFIGURATION_MODEL: &str = "account.configuration";

/// One row of legacy property storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyProperty {
    /// Model owning the field (e.g. `party.party`).
    pub model: String,
    /// Field name on that model (e.g. `account_receivable`).
    pub field: String,
    pub company: Option<CompanyId>,
    /// Record the value applies to (`party.party,<id>`); `None` for defaults.
    pub res: Option<String>,
    /// Raw value: `model,id` for references, `,value` for selections.
    pub value: Option<String>,
}

impl LegacyProperty {
    pub fn is_default(&self) -> bool {
        self.res.is_none()
    }
}

/// Decoded legacy value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Reference { model: String, id: Uuid },
    Selection(String),
}

impl PropertyValue {
    /// Parse `model,id` or `,value`. Empty strings decode to `None`.
    pub fn parse(raw: &str) -> DomainResult<Option<PropertyValue>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        let (model, rest) = raw
            .split_once(',')
            .ok_or_else(|| DomainError::validation(format!("malformed property value: {raw}")))?;
        if rest.is_empty() {
            return Ok(None);
        }
        if model.is_empty() {
            return Ok(Some(PropertyValue::Selection(rest.to_string())));
        }
        let id = Uuid::parse_str(rest)
            .map_err(|e| DomainError::invalid_id(format!("{model}: {e}")))?;
        Ok(Some(PropertyValue::Reference {
            model: model.to_string(),
            id,
        }))
    }
}

fn default_rows<'a>(
    properties: &'a [LegacyProperty],
    model: &'a str,
    fields: &'a [&'a str],
) -> impl Iterator<Item = &'a LegacyProperty> + 'a {
    properties
        .iter()
        .filter(move |p| p.model == model && p.is_default() && fields.contains(&p.field.as_str()))
}

fn account_reference(property: &LegacyProperty) -> DomainResult<Option<AccountId>> {
    let Some(raw) = property.value.as_deref() else {
        return Ok(None);
    };
    match PropertyValue::parse(raw)? {
        Some(PropertyValue::Reference { model, id }) if model == "account.account" => {
            Ok(Some(AccountId::new(AggregateId::from_uuid(id))))
        }
        Some(other) => Err(DomainError::validation(format!(
            "property {} holds {other:?}, expected an account",
            property.field
        ))),
        None => Ok(None),
    }
}

/// Build default-account satellite rows (one per company) from the legacy
/// `party.party` default properties `account_receivable`/`account_payable`.
pub fn migrate_default_accounts(properties: &[LegacyProperty]) -> DomainResult<Vec<DefaultAccountValue>> {
    let mut rows: BTreeMap<Option<CompanyId>, DefaultAccountValue> = BTreeMap::new();
    for property in default_rows(properties, PARTY_MODEL, &["account_receivable", "account_payable"]) {
        let account = account_reference(property)?;
        let row = rows.entry(property.company).or_insert_with(|| DefaultAccountValue {
            company: property.company,
            default_account_receivable: None,
            default_account_payable: None,
        });
        if property.field == "account_receivable" {
            row.default_account_receivable = account;
        } else {
            row.default_account_payable = account;
        }
    }
    tracing::debug!(rows = rows.len(), "migrated legacy default account properties");
    Ok(rows.into_values().collect())
}

/// Build tax-rounding satellite rows from the legacy `account.configuration`
/// `tax_rounding` default properties, linked to `configuration`.
///
/// The satellite column is required, so properties without a value are
/// skipped.
pub fn migrate_tax_roundings(
    properties: &[LegacyProperty],
    configuration: ConfigurationId,
) -> DomainResult<Vec<TaxRoundingValue>> {
    let mut rows: BTreeMap<Option<CompanyId>, TaxRoundingValue> = BTreeMap::new();
    for property in default_rows(properties, CONFIGURATION_MODEL, &["tax_rounding"]) {
        let Some(raw) = property.value.as_deref() else {
            continue;
        };
        let tax_rounding = match PropertyValue::parse(raw)? {
            Some(PropertyValue::Selection(value)) => value.parse::<TaxRounding>()?,
            Some(other) => {
                return Err(DomainError::validation(format!(
                    "tax_rounding property holds {other:?}"
                )));
            }
            None => continue,
        };
        rows.insert(
            property.company,
            TaxRoundingValue {
                configuration,
                company: property.company,
                tax_rounding,
            },
        );
    }
    tracing::debug!(rows = rows.len(), "migrated legacy tax rounding properties");
    Ok(rows.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn property(model: &str, field: &str, company: Option<CompanyId>, value: Option<String>) -> LegacyProperty {
        LegacyProperty {
            model: model.to_string(),
            field: field.to_string(),
            company,
            res: None,
            value,
        }
    }

    #[test]
    fn parses_reference_and_selection_values() {
        let id = Uuid::now_v7();
        assert_eq!(
            PropertyValue::parse(&format!("account.account,{id}")).unwrap(),
            Some(PropertyValue::Reference {
                model: "account.account".to_string(),
                id
            })
        );
        assert_eq!(
            PropertyValue::parse(",line").unwrap(),
            Some(PropertyValue::Selection("line".to_string()))
        );
        assert_eq!(PropertyValue::parse("").unwrap(), None);
        assert_eq!(PropertyValue::parse("account.account,").unwrap(), None);
        assert!(PropertyValue::parse("garbage").is_err());
        assert!(PropertyValue::parse("account.account,12").is_err());
    }

    #[test]
    fn default_accounts_are_grouped_by_company() {
        let c1 = CompanyId::new();
        let c2 = CompanyId::new();
        let receivable = Uuid::now_v7();
        let payable = Uuid::now_v7();
        let other = Uuid::now_v7();

        let mut per_party = property(PARTY_MODEL, "account_receivable", Some(c1), Some(format!("account.account,{other}")));
        per_party.res = Some(format!("party.party,{}", Uuid::now_v7()));

        let properties = vec![
            property(PARTY_MODEL, "account_receivable", Some(c1), Some(format!("account.account,{receivable}"))),
            property(PARTY_MODEL, "account_payable", Some(c1), Some(format!("account.account,{payable}"))),
            property(PARTY_MODEL, "account_payable", Some(c2), None),
            per_party,
            property("product.template", "account_revenue", Some(c1), Some(format!("account.account,{other}"))),
        ];

        let rows = migrate_default_accounts(&properties).unwrap();
        assert_eq!(rows.len(), 2);

        let row1 = rows.iter().find(|r| r.company == Some(c1)).unwrap();
        assert_eq!(row1.default_account_receivable, Some(AccountId::new(AggregateId::from_uuid(receivable))));
        assert_eq!(row1.default_account_payable, Some(AccountId::new(AggregateId::from_uuid(payable))));

        let row2 = rows.iter().find(|r| r.company == Some(c2)).unwrap();
        assert_eq!(row2.default_account_payable, None);
    }

    #[test]
    fn tax_roundings_link_to_configuration() {
        let company = CompanyId::new();
        let configuration = ConfigurationId::new(AggregateId::new());
        let properties = vec![
            property(CONFIGURATION_MODEL, "tax_rounding", Some(company), Some(",line".to_string())),
            property(CONFIGURATION_MODEL, "tax_rounding", None, None),
        ];

        let rows = migrate_tax_roundings(&properties, configuration).unwrap();
        assert_eq!(
            rows,
            vec![TaxRoundingValue {
                configuration,
                company: Some(company),
                tax_rounding: TaxRounding::Line,
            }]
        );
    }

    #[test]
    fn unknown_tax_rounding_fails_the_migration() {
        let configuration = ConfigurationId::new(AggregateId::new());
        let properties = vec![property(CONFIGURATION_MODEL, "tax_rounding", None, Some(",weekly".to_string()))];
        assert!(migrate_tax_roundings(&properties, configuration).is_err());
    }
}
