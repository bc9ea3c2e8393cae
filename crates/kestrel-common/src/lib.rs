//! Kestrel Common - Shared errors, configuration and identifiers

pub mod config;
pub mod error;
pub mod types;

pub use config::OptimizerConfig;
pub use error::{KestrelError, Result};
pub use types::{GroupExpressionId, GroupId, SlotId};
