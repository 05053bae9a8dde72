//! Session coordination for one device.
//!
//! A single actor task owns everything the UI observes about the current
//! match and publishes it through a `watch` channel. Search, turn
//! submission, record-store traffic, and polling run in spawned tasks whose
//! results rejoin the actor over an internal channel, so published state has
//! exactly one writer.
//!
//! ## Architecture
//!
//! - [`SessionCoordinator`] — The actor: commands in, [`SessionView`] out
//! - [`SessionHandle`] — Cloneable front end for the UI
//! - [`Pipeline`] — Builds snapshots and drives turn, resign, and timeout calls
//! - [`Successor`] — Exactly-once guard for rematch successor sessions
//! - [`RoomConfig`] — Poll intervals and rating parameters
mod command;
mod config;
mod coordinator;
mod error;
mod handle;
mod pipeline;
mod successor;
mod view;

#[cfg(test)]
mod tests;

pub use command::*;
pub use config::*;
pub use coordinator::*;
pub use error::*;
pub use handle::*;
pub use pipeline::*;
pub use successor::*;
pub use view::*;
