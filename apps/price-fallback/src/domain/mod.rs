//! Domain Layer - Core connection and price types.
//!
//! This layer holds the fallback state machine's states and the price
//! observations flowing through it, with no I/O dependencies.

/// Connection states and the transitions between them.
pub mod connection;

/// Price ticks and instrument symbols.
pub mod tick;

pub use connection::{ConnectionState, Transition};
pub use tick::{PriceTick, Symbol, TickSource};
