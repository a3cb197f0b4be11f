//! # Synchronization Primitives for Entity State
//!
//! ## The Problem
//!
//! ```text
//! Thread 1..N (Gameplay):   WRITE position / dimension at any time
//! Thread S    (Sync cycle): CAPTURE a value, ENCODE it, PUBLISH it
//!
//! Lock held across encode:  writers stall for the whole serialization
//! No lock at all:           torn values reach clients
//! ```
//!
//! ## The Solution: Deferred Apply
//!
//! ```text
//! write(v)        pending = v            state = Changed
//! begin_compute() capture pending        state = Computing
//!   ... encode outside the lock ...
//! commit()        current = captured     state = Computed
//! ```
//!
//! A write that lands while a value is `Computing` is parked as the next
//! pending value. `commit()` still publishes what was captured and then
//! re-arms the cell, so the late write goes out on the following cycle.

mod property_cell;

pub use property_cell::{CellState, PropertyCell, SharedPropertyCell};
