//! `chatrelay-channels`: the seam between the relay and the chat network.
//!
//! Inbound traffic arrives as [`ChatEvent`]s; outbound actions go through a
//! [`Transport`] implementation supplied by the host binary.

pub mod channel;
pub mod error;
pub mod types;

pub use channel::Transport;
pub use error::ChannelError;
pub use types::{ChatEvent, ChatKind, Contact, EventKind, Target, FILE_HELPER};
