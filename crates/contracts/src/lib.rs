//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the bridge.
//! All business crates depend on this crate only, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Frame timestamps are source-provided microsecond counts (`utime`, i64)
//! - `0` means "nothing published yet"

mod bridge_config;
mod channel;
mod error;
mod frame;
mod message;
mod message_source;

pub use bridge_config::*;
pub use channel::ChannelName;
pub use error::*;
pub use frame::*;
pub use message::*;
pub use message_source::{MessageHandler, MessageSource};
