//! # Vatio - Spanish electricity price watcher for the terminal
//!
//! Vatio fetches the hourly electricity price series published by the REE
//! "datos" API for a selected day, classifies every hour into the Spanish
//! 2.0TD tariff bands (valle / llano / punta, with the weekend override),
//! and keeps a terminal view in sync while the user changes the selected
//! day. Date changes supersede any in-flight fetch through a monotonic
//! generation counter; stale results are discarded at publish time.
//!
//! ## Architecture
//!
//! The application follows a modular architecture with clear separation of
//! concerns:
//!
//! - `config`: Configuration management and validation
//! - `logging`: Structured logging and tracing
//! - `policy`: Mapping declarative retry/timeout settings onto the client
//! - `api`: HTTP client for the upstream price API
//! - `series`: Price series construction and hour-based lookup
//! - `tariff`: Tariff band classification
//! - `coordinator`: Background refresh coordination and shared state
//! - `display`: Terminal table rendering and user notices
//! - `cli`: Command line argument parsing

pub mod api;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod display;
pub mod error;
pub mod logging;
pub mod policy;
pub mod series;
pub mod tariff;

// Re-export commonly used types
pub use config::Config;
pub use coordinator::{CoordinatorHandle, RefreshCoordinator, RefreshState};
pub use error::{Result, VatioError};
