//! Round and entry lifecycle for multi-round media competitions.
//!
//! - [`round_clock`]: round state from wall-clock time
//! - [`allocator`]: sticker usage ledger under a hard ceiling
//! - [`registry`]: one submission per round and user, and its time gates
//! - [`visibility`]: competition and normal feed flags, plus the sweep
//! - [`lifecycle`]: transactions tying the above together

pub mod allocator;
pub mod app_config;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod orm;
pub mod registry;
pub mod round_clock;
pub mod visibility;
pub mod web;

pub use error::EntryError;
pub use lifecycle::{EntryService, LifecycleSettings};
pub use registry::ContentRef;
pub use round_clock::{Clock, FixedClock, RoundState, SystemClock};
