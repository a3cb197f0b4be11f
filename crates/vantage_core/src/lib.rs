//! # VANTAGE Core
//!
//! Concurrency primitives behind the entity synchronization engine:
//! - Property change cells that let gameplay threads write at any time
//!   while a sync cycle captures and publishes a consistent value
//! - Monotonic identifier allocation for entities
//!
//! ## Architecture Rules
//!
//! 1. **Writers never wait on encoding** - locks cover bookkeeping only
//! 2. **Nothing half-written is ever published** - readers see committed values
//! 3. **Late writers are deferred, never lost**
//!
//! ## Example
//!
//! ```rust
//! use vantage_core::PropertyCell;
//!
//! let mut cell = PropertyCell::new(0_i32);
//! cell.write(7);
//!
//! // Sync cycle
//! let captured = cell.begin_compute();
//! assert_eq!(captured, Some(7));
//! cell.commit();
//! assert_eq!(*cell.current(), 7);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod ids;
pub mod sync;

pub use ids::IdAllocator;
pub use sync::{CellState, PropertyCell, SharedPropertyCell};
