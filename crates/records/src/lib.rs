//! Client for the shared record store.
//!
//! The store is a plain eventually-consistent key-value service with
//! conditional puts and nothing else. Everything built on it here is
//! expressed as a pure step over the current copy of one record, driven by
//! a single bounded compare-and-swap loop ([`Records::reconcile`]).
//!
//! ## Store
//!
//! - [`RecordStore`] — The collaborator interface (get / conditional put / delete)
//! - [`MemoryStore`] — In-process implementation with fault injection
//! - [`Records`] — Typed wrapper and reconcile loop
//!
//! ## Documents
//!
//! - [`Negotiator`] / [`RematchTicket`] — Exactly-once rematch handshake
//! - [`Rivalry`] / [`HeadToHead`] — Idempotent per-pair win/loss/draw tallies
//! - [`Presence`] / [`Beacon`] — Online heartbeats
//! - [`Friends`] / [`FriendRequest`] — Friend requests and per-receiver inbox
//! - [`Cards`] / [`RatingCard`] — Published ratings for opponent lookup
mod card;
mod error;
mod friends;
mod memory;
mod presence;
mod reconcile;
mod rematch;
mod rivalry;
mod store;

pub use card::*;
pub use error::*;
pub use friends::*;
pub use memory::*;
pub use presence::*;
pub use reconcile::*;
pub use rematch::*;
pub use rivalry::*;
pub use store::*;

use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
