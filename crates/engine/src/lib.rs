//! `hourgrid-engine`: sparse temporal grid engine.
//!
//! One full-year `CellStore` per subject is the source of truth. View
//! windows are read lenses over it, every edit passes the capacity
//! validator, and `reconcile` pushes only changed cells to the backend.

pub mod capacity;
pub mod deletion;
pub mod error;
pub mod grid;
pub mod memory;
pub mod navigation;
pub mod reconcile;
pub mod store;
pub mod view;

pub use capacity::{CapacityError, CapacityValidator, DAILY_CAPACITY};
pub use deletion::DeletionQueue;
pub use error::{EditError, GridError, ViewError};
pub use grid::TimeGrid;
pub use navigation::{CellAddress, Key, KeyEffect, KeyInput, KeyOutcome, Modifiers, NavMode};
pub use reconcile::{
    reconcile, OperationKind, ReconcileError, ReconcileFailure, ReconcileOptions,
    ReconcilePlan, ReconcileResult,
};
pub use store::{CellKey, CellState, CellStore};
pub use view::{DateRange, ViewMode, ViewWindowConfig, VisibleMatrix};
