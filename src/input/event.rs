//! Window-system input, reduced to what body dragging and the orbit camera
//! consume.

/// Pointer, wheel and modifier input in physical window pixels.
///
/// The viewer translates its window events into these and hands them to
/// [`SimEngine::handle_input`](crate::engine::SimEngine::handle_input). A
/// left press over a draggable body grabs it; a left press on empty space
/// orbits the camera (pans with shift held); any other button pans.
/// Leaving the window releases whatever was held.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// The pointer is now at this window position.
    CursorMoved {
        /// Pixels from the left edge.
        x: f32,
        /// Pixels from the top edge.
        y: f32,
    },
    /// A button went down or up at the last known pointer position.
    MouseButton {
        /// The button.
        button: MouseButton,
        /// Down (`true`) or up (`false`).
        pressed: bool,
    },
    /// Wheel movement in lines; positive moves the camera closer.
    Scroll {
        /// Lines scrolled.
        delta: f32,
    },
    /// Held modifiers after a change.
    ModifiersChanged {
        /// Shift turns a camera orbit into a pan.
        shift: bool,
        /// Control, or command on macOS.
        ctrl: bool,
    },
    /// The pointer left the window. An active drag is cancelled.
    CursorLeft,
}

/// Buttons the engine distinguishes. Anything beyond these reports as
/// [`MouseButton::Left`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Grabs bodies and orbits the camera.
    Left,
    /// Pans the camera.
    Right,
    /// Pans the camera.
    Middle,
}

#[cfg(feature = "viewer")]
impl From<winit::event::MouseButton> for MouseButton {
    fn from(button: winit::event::MouseButton) -> Self {
        match button {
            winit::event::MouseButton::Right => Self::Right,
            winit::event::MouseButton::Middle => Self::Middle,
            _ => Self::Left,
        }
    }
}
