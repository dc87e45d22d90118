//! `chatrelay-dispatch`: routes inbound chat events to their handler.
//!
//! [`Dispatcher::route`] evaluates the rules in fixed precedence
//! (reset, group, friend request, private) and runs the first match.

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod ignore;

pub use context::{DispatchContext, RelayContext};
pub use dispatcher::{Dispatcher, Rule};
pub use error::DispatchError;
