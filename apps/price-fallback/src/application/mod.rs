//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the connection supervisor and the port interfaces
//! that define how it talks to stream, poll, and display adapters.

/// Port interfaces for external systems (stream, price lookup, display).
pub mod ports;

/// Application services: the connection supervisor.
pub mod services;
