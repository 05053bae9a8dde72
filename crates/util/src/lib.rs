//! Core type aliases, traits, clocks, and constants for duel.
//!
//! This crate provides the foundational types and tuning parameters
//! shared by every other crate in the workspace.
mod clock;

pub use clock::*;

// ============================================================================
// TYPE ALIASES
// ============================================================================
/// Wall-clock milliseconds since the Unix epoch.
pub type Millis = u64;
/// Elo rating points.
pub type Rating = i32;
/// Seat index within a session (0 plays X, 1 plays O).
pub type Seat = usize;
/// Cell index into a row-major board.
pub type Cell = u16;

// ============================================================================
// TRAITS
// ============================================================================
/// Unique identifier trait for domain entities.
pub trait Unique<T = Self> {
    fn id(&self) -> ID<T>;
}

// ============================================================================
// IDENTITY TYPES
// ============================================================================
use std::cmp::Ordering;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::hash::Hash;
use std::hash::Hasher;
use std::marker::PhantomData;

/// Marker type for player identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Player;
/// Marker type for match session identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Match;

/// Generic ID wrapper providing compile-time type safety over uuid::Uuid.
pub struct ID<T> {
    inner: uuid::Uuid,
    marker: PhantomData<T>,
}

impl<T> ID<T> {
    pub fn inner(&self) -> uuid::Uuid {
        self.inner
    }
    /// Cast ID<T> to ID<U> while preserving the underlying UUID.
    pub fn cast<U>(self) -> ID<U> {
        ID {
            inner: self.inner,
            marker: PhantomData,
        }
    }
}

impl<T> From<ID<T>> for uuid::Uuid {
    fn from(id: ID<T>) -> Self {
        id.inner()
    }
}
impl<T> From<uuid::Uuid> for ID<T> {
    fn from(inner: uuid::Uuid) -> Self {
        Self {
            inner,
            marker: PhantomData,
        }
    }
}

impl<T> std::str::FromStr for ID<T> {
    type Err = uuid::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s).map(Self::from)
    }
}

impl<T> Default for ID<T> {
    fn default() -> Self {
        Self {
            inner: uuid::Uuid::now_v7(),
            marker: PhantomData,
        }
    }
}

impl<T> Copy for ID<T> {}
impl<T> Clone for ID<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Eq for ID<T> {}
impl<T> PartialEq for ID<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T> Ord for ID<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(&other.inner)
    }
}
impl<T> PartialOrd for ID<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Hash for ID<T> {
    fn hash<H>(&self, state: &mut H)
    where
        H: Hasher,
    {
        self.inner.hash(state);
    }
}

impl<T> Debug for ID<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ID").field(&self.inner).finish()
    }
}
impl<T> Display for ID<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.inner, f)
    }
}

impl<T> serde::Serialize for ID<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.inner.serialize(serializer)
    }
}
impl<'de, T> serde::Deserialize<'de> for ID<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        uuid::Uuid::deserialize(deserializer).map(Self::from)
    }
}

// ============================================================================
// SESSION SHAPE
// ============================================================================
/// Number of seats in a session.
pub const SEATS: usize = 2;
/// Side length of the default square board.
pub const BOARD_SIZE: u8 = 3;
/// Per-move clock allowance, reset on every committed turn (milliseconds).
pub const TURN_ALLOWANCE: Millis = 60_000;

// ============================================================================
// MATCHMAKING
// Read-lag and handshake windows are measured from local first observation.
// ============================================================================
/// Match-status poll interval while searching or awaiting a rematch.
pub const MATCH_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5);
/// Inbox poll interval while idle.
pub const INBOX_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(8);
/// Local clock tick used for countdown display and timeout detection.
pub const CLOCK_TICK_INTERVAL: std::time::Duration = std::time::Duration::from_secs(1);
/// Self-created sessions older than this with an empty seat are purged on start.
pub const STALE_SESSION_AGE: Millis = 120_000;
/// How long a tracked session may be missing from listings before it is lost.
pub const VANISH_GRACE: Millis = 15_000;
/// How long a party session may carry no party code before it is rejected.
pub const PARTY_HANDSHAKE_GRACE: Millis = 10_000;

// ============================================================================
// SHARED RECORD STORE
// ============================================================================
/// Conditional-write attempts before a sync operation gives up.
pub const CAS_ATTEMPTS: usize = 5;
/// Presence beacons newer than this count as online.
pub const PRESENCE_WINDOW: Millis = 90_000;

// ============================================================================
// RATING
// ============================================================================
/// Elo K-factor.
pub const ELO_K: f64 = 32.0;
/// Rating assumed for new players and for opponents not yet fetched.
pub const DEFAULT_RATING: Rating = 1500;

// ============================================================================
// RUNTIME UTILITIES
// ============================================================================
/// Initialize terminal logging, plus a DEBUG file log under `logs/` when `file` is set.
#[cfg(feature = "runtime")]
pub fn log(file: bool) -> std::io::Result<()> {
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config.clone(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    let mut loggers: Vec<Box<dyn simplelog::SharedLogger>> = vec![term];
    if file {
        std::fs::create_dir_all("logs")?;
        let time = SystemClock.now() / 1000;
        loggers.push(simplelog::WriteLogger::new(
            log::LevelFilter::Debug,
            config,
            std::fs::File::create(format!("logs/{}.log", time))?,
        ));
    }
    simplelog::CombinedLogger::init(loggers).map_err(std::io::Error::other)
}
