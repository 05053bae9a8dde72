//! Matchmaking over a primitive turn-based match service.
//!
//! The service only relays turn hand-off and terminal outcomes. Everything
//! that keeps two devices on one shared session (adoption under read lag,
//! party validation, first-snapshot bootstrap) happens client-side in the
//! [`Matchmaker`].
//!
//! ## Service
//!
//! - [`MatchService`] — The collaborator interface
//! - [`Session`] / [`SeatInfo`] — Sessions as the service reports them
//! - [`MatchHub`] / [`HubClient`] — In-process service for tests and demos
//!
//! ## Client
//!
//! - [`Matchmaker`] / [`Mode`] — Search, adopt, and cancel
//! - [`LobbyConfig`] — Poll and grace windows
mod config;
mod error;
mod hub;
mod matchmaker;
mod service;
mod session;


pub use config::*;
pub use error::*;
pub use hub::*;
pub use matchmaker::*;
pub use service::*;
pub use session::*;
