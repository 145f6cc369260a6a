//! Event-sourced party repository (in-memory).
//!
//! Each party is a stream of [`PartyEvent`]s; loading replays the stream and
//! executing a command appends the events it produced after a version check.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::{debug, instrument};

use acctparty_core::{Aggregate, AggregateRoot, ExpectedVersion, PartyId};
use acctparty_events::Event;
use acctparty_parties::{Party, PartyCommand, PartyEvent};

use crate::db::StoreError;

#[derive(Debug, Default)]
pub struct InMemoryPartyRepository {
    streams: RwLock<HashMap<PartyId, Vec<PartyEvent>>>,
}

impl InMemoryPartyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate a party; unknown ids load as a not-yet-created party.
    pub fn load(&self, party_id: PartyId) -> Result<Party, StoreError> {
        let streams = self.streams.read().map_err(|_| StoreError::Poisoned)?;
        let mut party = Party::empty(party_id);
        for event in streams.get(&party_id).into_iter().flatten() {
            party.apply(event);
        }
        Ok(party)
    }

    /// Handle `command` against the current state of `party_id` and append
    /// the resulting events.
    #[instrument(skip(self, command), err)]
    pub fn execute(
        &self,
        party_id: PartyId,
        command: &PartyCommand,
        expected: ExpectedVersion,
    ) -> Result<Vec<PartyEvent>, StoreError> {
        let mut streams = self.streams.write().map_err(|_| StoreError::Poisoned)?;

        let mut party = Party::empty(party_id);
        for event in streams.get(&party_id).into_iter().flatten() {
            party.apply(event);
        }
        expected.check(party.version())?;

        let events = party.handle(command)?;
        if events.is_empty() {
            return Ok(events);
        }
        let stream = streams.entry(party_id).or_default();
        for event in &events {
            debug!(event_type = event.event_type(), "appending party event");
            stream.push(event.clone());
        }
        Ok(events)
    }

    /// Every known party id.
    pub fn party_ids(&self) -> Result<Vec<PartyId>, StoreError> {
        let streams = self.streams.read().map_err(|_| StoreError::Poisoned)?;
        let mut ids: Vec<PartyId> = streams
            .iter()
            .filter(|(_, events)| !events.is_empty())
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        Ok(ids)
    }
}
