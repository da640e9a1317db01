//! Input handling: event types, state machines, and the input processor
//! that converts raw window events into engine commands.

pub mod event;
/// Bindable key actions.
pub mod keyboard;
/// Double-click state machine and mouse position tracking.
pub(crate) mod mouse;
/// Converts raw events into engine commands.
pub mod processor;

pub use event::{InputEvent, MouseButton};
pub use keyboard::{key_string, KeyAction};
pub use processor::InputProcessor;
