//! Discord integration for coevoice.
//!
//! [`DiscordRest`] implements the engine's platform seams over the Discord
//! REST API, [`CoevoiceHandler`] translates gateway events into engine calls,
//! and [`CoevoiceBot`] wires both into a Serenity client.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod client;
pub mod conversions;
mod error;
mod handler;
mod rest;

pub use client::CoevoiceBot;
pub use error::{DiscordError, DiscordErrorKind, DiscordResult};
pub use handler::CoevoiceHandler;
pub use rest::DiscordRest;
