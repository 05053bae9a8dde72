//! Elo ratings and the durable local ledger.
//!
//! Each device rates itself independently from its own pre-match rating and
//! the opponent's cached rating, so no shared transaction is needed. The
//! [`Ledger`] makes that update happen once per ended match across restarts.
//!
//! - [`Elo`] / [`Score`] — Pure rating math
//! - [`RatingBook`] — Local rating plus per-opponent cache
//! - [`Ledger`] — Persisted rating and processed-match sets
mod book;
mod elo;
mod ledger;

pub use book::*;
pub use elo::*;
pub use ledger::*;
