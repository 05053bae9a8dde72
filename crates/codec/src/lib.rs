//! Snapshot and party code codecs.
//!
//! Everything the two devices exchange through the match service lives in
//! one immutable [`GameSnapshot`], serialized as compact JSON. Private
//! matchmaking pools are addressed by a short [`PartyCode`] that maps
//! bijectively onto the service's integer grouping key.
//!
//! ## Core Types
//!
//! - [`Mark`] / [`ByMark`] — The two sides and per-side storage
//! - [`Board`] / [`Move`] — Grid state and the append-only move log
//! - [`Position`] / [`Referee`] — Rules-derived game state and its judge
//! - [`GameSnapshot`] / [`Blob`] — The wire snapshot and decode outcomes
//! - [`PartyCode`] / [`GroupKey`] — Shareable codes and their pool keys
mod board;
mod error;
mod mark;
mod party;
mod position;
mod snapshot;

pub use board::*;
pub use error::*;
pub use mark::*;
pub use party::*;
pub use position::*;
pub use snapshot::*;
