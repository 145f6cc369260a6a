//! Infrastructure layer: ledger backends, balance service, configuration
//! storage, schema registration and environment configuration.

pub mod balances;
pub mod config;
pub mod configuration_store;
pub mod db;
pub mod ledger;
pub mod migrations;
pub mod party_store;
pub mod replace;

pub use balances::{BalanceError, Balances, PartyBalances};
pub use config::{AppConfig, ConfigError, DatabaseBackend};
pub use configuration_store::{ConfigurationStore, InMemoryConfigurationStore, PostgresConfigurationStore};
pub use db::{DbPool, StoreError, connect};
pub use ledger::{InMemoryLedger, LedgerBackend, PartyReferences, PostgresLedger, SqliteLedger};
pub use migrations::{MigrationError, RegisterReport, SchemaRegistry};
pub use party_store::InMemoryPartyRepository;
pub use replace::{PartyReplacer, ReplaceError};
