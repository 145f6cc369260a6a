use std::sync::RwLock;

use async_trait::async_trait;

use acctparty_accounting::{Configuration, ConfigurationId};
use acctparty_core::{AggregateId, DomainError};

use super::ConfigurationStore;
use crate::db::StoreError;

#[derive(Debug, Default)]
pub struct InMemoryConfigurationStore {
    configuration: RwLock<Option<Configuration>>,
}

impl InMemoryConfigurationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConfigurationStore for InMemoryConfigurationStore {
    async fn get_or_create(&self) -> Result<Configuration, StoreError> {
        let mut slot = self.configuration.write().map_err(|_| StoreError::Poisoned)?;
        let configuration =
            slot.get_or_insert_with(|| Configuration::new(ConfigurationId::new(AggregateId::new())));
        Ok(configuration.clone())
    }

    async fn save(&self, configuration: &Configuration) -> Result<(), StoreError> {
        let mut slot = self.configuration.write().map_err(|_| StoreError::Poisoned)?;
        if let Some(current) = slot.as_ref() {
            if current.id() != configuration.id() {
                return Err(DomainError::conflict("configuration is a singleton").into());
            }
        }
        *slot = Some(configuration.clone());
        Ok(())
    }
}
