//! Parties domain module: customers and suppliers seen from accounting.
//!
//! Per-company account/tax-rule properties on the party aggregate, the
//! computed balance fields and their search clauses, and the fields rewritten
//! when one party replaces another. Deterministic domain logic only (no IO).

pub mod balance;
pub mod party;
pub mod replace;

pub use acctparty_core::PartyId;
pub use balance::{BalanceField, BalanceSearch, SearchClause, SearchOperator};
pub use party::{
    Party, PartyAccounts, PartyAccountsSet, PartyCommand, PartyEvent, PartyRegistered,
    PartyUpdated, RegisterParty, SetPartyAccounts, UpdateDetails,
};
pub use replace::{PartyReplace, ReplaceField};
