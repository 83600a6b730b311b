//! State module for tracking harvest progress
//!
//! `ItemState` records how far a worker got with a single thread before its
//! result was written into the result set.

mod item_state;

pub use item_state::ItemState;
