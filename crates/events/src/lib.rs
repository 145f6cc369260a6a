//! Domain events.
//!
//! Only the event contract lives here; aggregates in the domain crates define
//! their own event enums and implement [`Event`] for them.

pub mod event;

pub use event::Event;
