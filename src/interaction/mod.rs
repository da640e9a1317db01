//! Pointer interaction with simulated bodies: dragging and selection.

pub mod drag;
mod selection;

pub use drag::{DragForce, DragInteraction, DragPhase, DragState, PointerEvent};
pub use selection::toggle_single;
