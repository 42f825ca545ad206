//! Core monitor loop for gamewarden
//!
//! This crate is the heart of gamewarden, containing:
//! - Process classification (which processes are games, which belong to the launcher)
//! - Enforcement (graceful stop, escalation, games before launcher)
//! - The single-stepped accounting engine with day rollover
//! - A background worker with cooperative cancellation

mod classifier;
mod clock;
mod enforcer;
mod events;
mod monitor;
mod notifier;
mod worker;

pub use classifier::*;
pub use clock::*;
pub use enforcer::*;
pub use events::*;
pub use monitor::*;
pub use notifier::*;
pub use worker::*;
