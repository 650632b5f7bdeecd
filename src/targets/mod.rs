//! Built-in targets.
//!
//! Network-backed services live outside this crate and plug in through
//! [`crate::registry::TargetFactory`].
pub mod log;

pub use self::log::{LogTarget, LogTargetFactory};
