//! # Ringleader Common
//!
//! Shared types used by every Ringleader component.
//!
//! ## Modules
//! - `types` - Node identifiers, recipients and payload tags
//! - `envelope` - The wire-level message unit and its JSON codec
//! - `clock` - Lamport logical clock
//! - `error` - Common error types
//! - `constants` - Shared configuration constants

pub mod clock;
pub mod constants;
pub mod envelope;
pub mod error;
pub mod types;

pub use clock::LamportClock;
pub use envelope::Envelope;
pub use error::RingleaderError;
pub use types::*;
