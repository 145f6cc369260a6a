//! Persistence of the account configuration singleton and its satellites.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use acctparty_accounting::Configuration;

use crate::db::StoreError;

pub use in_memory::InMemoryConfigurationStore;
pub use postgres::PostgresConfigurationStore;

#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    /// The singleton, created on first access.
    async fn get_or_create(&self) -> Result<Configuration, StoreError>;

    /// Replace every satellite row of the singleton with `configuration`'s.
    async fn save(&self, configuration: &Configuration) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> ConfigurationStore for Arc<S>
where
    S: ConfigurationStore + ?Sized,
{
    async fn get_or_create(&self) -> Result<Configuration, StoreError> {
        (**self).get_or_create().await
    }

    async fn save(&self, configuration: &Configuration) -> Result<(), StoreError> {
        (**self).save(configuration).await
    }
}
