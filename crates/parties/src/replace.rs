//! Party replacement: fields pointing at a party that must be rewritten when
//! one party is merged into another.

use acctparty_core::{DomainError, DomainResult, PartyId};

/// A many-to-one column referencing `party.party`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReplaceField {
    /// Model name (e.g. `account.move.line`).
    pub model: &'static str,
    /// Table backing the model.
    pub table: &'static str,
    /// Column holding the party id.
    pub column: &'static str,
}

/// Ledger lines keep their party reference in `account_move_line.party`.
pub const MOVE_LINE_PARTY: ReplaceField = ReplaceField {
    model: "account.move.line",
    table: "account_move_line",
    column: "party",
};

/// Replace `source` by `destination` everywhere a party is referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartyReplace {
    source: PartyId,
    destination: PartyId,
}

impl PartyReplace {
    pub fn new(source: PartyId, destination: PartyId) -> DomainResult<Self> {
        if source == destination {
            return Err(DomainError::validation("a party cannot replace itself"));
        }
        Ok(Self { source, destination })
    }

    pub fn source(&self) -> PartyId {
        self.source
    }

    pub fn destination(&self) -> PartyId {
        self.destination
    }

    /// Fields to rewrite from `source` to `destination`.
    pub fn fields_to_replace() -> Vec<ReplaceField> {
        vec![MOVE_LINE_PARTY]
    }
}
