//! # Property Change Cell
//!
//! Three-phase state machine guarding one mutable scalar.
//!
//! ## State Diagram
//!
//! ```text
//!            write                begin_compute            commit
//! NotChanged ─────▶ Changed ───────────────▶ Computing ────────▶ Computed
//!     ▲               │  ▲ write                 │ write            │
//!     │               └──┘ (overwrite)           ▼                  │ write
//!     │                                  Computing + pending        ▼
//!     │                                          │ commit        Changed
//!     │                                          ▼
//!     └──────────── (never returns)          Changed (re-armed)
//! ```
//!
//! ## Thread Safety
//!
//! `PropertyCell` itself is plain data with `&mut self` transitions. It is
//! meant to live inside a lock the owner already holds (an entity keeps
//! position, dimension and flags behind one mutex). `SharedPropertyCell`
//! wraps a single cell in its own `parking_lot::Mutex` for standalone use.

use parking_lot::Mutex;

/// Phase of a property change cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CellState {
    /// No write since construction.
    #[default]
    NotChanged = 0,
    /// A write is waiting for the next sync cycle.
    Changed = 1,
    /// A sync cycle captured a value and has not published it yet.
    Computing = 2,
    /// The last captured value was published; nothing is pending.
    Computed = 3,
}

/// Deferred-apply cell for one scalar property.
///
/// Writers always succeed. The sync cycle captures the pending value with
/// [`begin_compute`](Self::begin_compute), encodes it without holding any
/// lock, then publishes it with [`commit`](Self::commit). Readers only ever
/// see committed values through [`current`](Self::current).
#[derive(Clone, Debug)]
pub struct PropertyCell<T> {
    /// Current phase.
    state: CellState,
    /// Last committed value.
    current: T,
    /// Latest write not yet captured by a sync cycle.
    pending: Option<T>,
    /// Value captured by the in-flight sync cycle.
    computing: Option<T>,
}

impl<T: Clone> PropertyCell<T> {
    /// Creates a cell whose committed value is `initial`.
    #[must_use]
    pub const fn new(initial: T) -> Self {
        Self {
            state: CellState::NotChanged,
            current: initial,
            pending: None,
            computing: None,
        }
    }

    /// Returns the current phase.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> CellState {
        self.state
    }

    /// Returns true if a write is waiting to be captured.
    #[inline]
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Returns the last committed value.
    #[inline]
    #[must_use]
    pub const fn current(&self) -> &T {
        &self.current
    }

    /// Stores `value` as the next value to publish.
    ///
    /// Overwrites any earlier pending write (last write wins). While a value
    /// is `Computing`, the write is parked and goes out on the next cycle.
    pub fn write(&mut self, value: T) {
        self.pending = Some(value);
        if self.state != CellState::Computing {
            self.state = CellState::Changed;
        }
    }

    /// Captures the pending value and moves `Changed` to `Computing`.
    ///
    /// Returns `None` without touching the cell in any other phase, so a
    /// second call in the same cycle yields nothing.
    pub fn begin_compute(&mut self) -> Option<T> {
        if self.state != CellState::Changed {
            return None;
        }
        let value = self.pending.take()?;
        self.computing = Some(value.clone());
        self.state = CellState::Computing;
        Some(value)
    }

    /// Publishes the captured value and moves `Computing` to `Computed`.
    ///
    /// If a write arrived while computing, the cell is re-armed to `Changed`
    /// instead. Returns false (and changes nothing) when not `Computing`.
    pub fn commit(&mut self) -> bool {
        if self.state != CellState::Computing {
            return false;
        }
        if let Some(value) = self.computing.take() {
            self.current = value;
        }
        self.state = if self.pending.is_some() {
            tracing::trace!("late write deferred to next cycle");
            CellState::Changed
        } else {
            CellState::Computed
        };
        true
    }
}

impl<T: Clone + Default> Default for PropertyCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// A single property cell behind its own lock.
///
/// Every operation takes the lock for O(1) work only.
#[derive(Debug)]
pub struct SharedPropertyCell<T> {
    inner: Mutex<PropertyCell<T>>,
}

impl<T: Clone> SharedPropertyCell<T> {
    /// Creates a shared cell whose committed value is `initial`.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            inner: Mutex::new(PropertyCell::new(initial)),
        }
    }

    /// See [`PropertyCell::write`].
    pub fn write(&self, value: T) {
        self.inner.lock().write(value);
    }

    /// See [`PropertyCell::begin_compute`].
    pub fn begin_compute(&self) -> Option<T> {
        self.inner.lock().begin_compute()
    }

    /// See [`PropertyCell::commit`].
    pub fn commit(&self) -> bool {
        self.inner.lock().commit()
    }

    /// Returns a copy of the last committed value.
    #[must_use]
    pub fn current(&self) -> T {
        self.inner.lock().current().clone()
    }

    /// Returns the current phase.
    #[must_use]
    pub fn state(&self) -> CellState {
        self.inner.lock().state()
    }
}
