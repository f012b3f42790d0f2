//! Input: raw pointer/wheel/key input mapped to orbit actions.
//!
//! # Invariants
//! - Consumers see actions, never window-system events.
//! - Drag deltas are only produced while the orbit button is held.

pub mod action;
pub mod pointer;

pub use action::{Action, Key, map_key};
pub use pointer::{PointerButton, PointerTracker};

pub fn crate_info() -> &'static str {
    "noisetorus-input v0.1.0"
}
