use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use acctparty_accounting::{
    Account, AccountId, AccountKind, Configuration, TaxRule, TaxRuleId, TaxRuleUsage,
};
use acctparty_core::{Aggregate, AggregateRoot, CompanyId, DomainError, PartyId};
use acctparty_events::Event;

/// Per-company accounting properties of a party.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyAccounts {
    pub account_receivable: Option<AccountId>,
    pub account_payable: Option<AccountId>,
    /// Applied on taxes when the party is a customer.
    pub customer_tax_rule: Option<TaxRuleId>,
    /// Applied on taxes when the party is a supplier.
    pub supplier_tax_rule: Option<TaxRuleId>,
}

impl PartyAccounts {
    /// Fill the blanks with the configuration defaults of `company`.
    pub fn or_defaults(self, configuration: &Configuration, company: CompanyId) -> Self {
        let company = Some(company);
        Self {
            account_receivable: self
                .account_receivable
                .or_else(|| configuration.default_account_receivable(company)),
            account_payable: self
                .account_payable
                .or_else(|| configuration.default_account_payable(company)),
            customer_tax_rule: self
                .customer_tax_rule
                .or_else(|| configuration.default_customer_tax_rule(company)),
            supplier_tax_rule: self
                .supplier_tax_rule
                .or_else(|| configuration.default_supplier_tax_rule(company)),
        }
    }
}

/// Aggregate root: Party (customer or supplier).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Party {
    id: PartyId,
    name: String,
    properties: BTreeMap<CompanyId, PartyAccounts>,
    version: u64,
    created: bool,
}

impl Party {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: PartyId) -> Self {
        Self {
            id,
            name: String::new(),
            properties: BTreeMap::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PartyId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Properties stored for `company` (all blank when never set).
    pub fn accounts(&self, company: CompanyId) -> PartyAccounts {
        self.properties.get(&company).copied().unwrap_or_default()
    }

    /// Properties for `company`, falling back to the configuration defaults.
    pub fn accounts_or_defaults(&self, configuration: &Configuration, company: CompanyId) -> PartyAccounts {
        self.accounts(company).or_defaults(configuration, company)
    }
}

impl AggregateRoot for Party {
    type Id = PartyId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterParty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterParty {
    pub party_id: PartyId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateDetails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDetails {
    pub party_id: PartyId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetPartyAccounts.
///
/// Carries the full account and tax-rule records so the aggregate can check
/// their domains without looking anything up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetPartyAccounts {
    pub party_id: PartyId,
    pub company: CompanyId,
    /// Required in a company context.
    pub account_receivable: Option<Account>,
    /// Required in a company context.
    pub account_payable: Option<Account>,
    pub customer_tax_rule: Option<TaxRule>,
    pub supplier_tax_rule: Option<TaxRule>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartyCommand {
    RegisterParty(RegisterParty),
    UpdateDetails(UpdateDetails),
    SetPartyAccounts(SetPartyAccounts),
}

/// Event: PartyRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyRegistered {
    pub party_id: PartyId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PartyUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyUpdated {
    pub party_id: PartyId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PartyAccountsSet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyAccountsSet {
    pub party_id: PartyId,
    pub company: CompanyId,
    pub accounts: PartyAccounts,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartyEvent {
    PartyRegistered(PartyRegistered),
    PartyUpdated(PartyUpdated),
    PartyAccountsSet(PartyAccountsSet),
}

impl Event for PartyEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PartyEvent::PartyRegistered(_) => "parties.party.registered",
            PartyEvent::PartyUpdated(_) => "parties.party.updated",
            PartyEvent::PartyAccountsSet(_) => "parties.party.accounts_set",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PartyEvent::PartyRegistered(e) => e.occurred_at,
            PartyEvent::PartyUpdated(e) => e.occurred_at,
            PartyEvent::PartyAccountsSet(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Party {
    type Command = PartyCommand;
    type Event = PartyEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PartyEvent::PartyRegistered(e) => {
                self.id = e.party_id;
                self.name = e.name.clone();
                self.created = true;
            }
            PartyEvent::PartyUpdated(e) => {
                self.name = e.name.clone();
            }
            PartyEvent::PartyAccountsSet(e) => {
                self.properties.insert(e.company, e.accounts);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PartyCommand::RegisterParty(cmd) => self.handle_register(cmd),
            PartyCommand::UpdateDetails(cmd) => self.handle_update(cmd),
            PartyCommand::SetPartyAccounts(cmd) => self.handle_set_accounts(cmd),
        }
    }
}

impl Party {
    fn ensure_party_id(&self, party_id: PartyId) -> Result<(), DomainError> {
        if self.id != party_id {
            return Err(DomainError::invariant("party_id mismatch"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterParty) -> Result<Vec<PartyEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("party already exists"));
        }
        self.ensure_party_id(cmd.party_id)?;

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        Ok(vec![PartyEvent::PartyRegistered(PartyRegistered {
            party_id: cmd.party_id,
            name: cmd.name.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateDetails) -> Result<Vec<PartyEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_party_id(cmd.party_id)?;

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        Ok(vec![PartyEvent::PartyUpdated(PartyUpdated {
            party_id: cmd.party_id,
            name: cmd.name.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_accounts(&self, cmd: &SetPartyAccounts) -> Result<Vec<PartyEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_party_id(cmd.party_id)?;

        let receivable = cmd
            .account_receivable
            .as_ref()
            .ok_or_else(|| DomainError::validation("account receivable is required"))?;
        receivable.check_party_domain(AccountKind::Receivable, cmd.company)?;

        let payable = cmd
            .account_payable
            .as_ref()
            .ok_or_else(|| DomainError::validation("account payable is required"))?;
        payable.check_party_domain(AccountKind::Payable, cmd.company)?;

        if let Some(rule) = &cmd.customer_tax_rule {
            rule.check_domain(TaxRuleUsage::Customer, cmd.company)?;
        }
        if let Some(rule) = &cmd.supplier_tax_rule {
            rule.check_domain(TaxRuleUsage::Supplier, cmd.company)?;
        }

        Ok(vec![PartyEvent::PartyAccountsSet(PartyAccountsSet {
            party_id: cmd.party_id,
            company: cmd.company,
            accounts: PartyAccounts {
                account_receivable: Some(receivable.id),
                account_payable: Some(payable.id),
                customer_tax_rule: cmd.customer_tax_rule.as_ref().map(|r| r.id),
                supplier_tax_rule: cmd.supplier_tax_rule.as_ref().map(|r| r.id),
            },
            occurred_at: cmd.occurred_at,
        })])
    }
}
