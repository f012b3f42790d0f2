use glam::Vec2;

/// A high-level action produced from user input.
///
/// The scene consumes actions, never raw window events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Orbit the camera by a pointer delta in logical pixels.
    Orbit(Vec2),
    /// Zoom by wheel steps; positive moves closer.
    Zoom(f32),
    /// Return the camera to its starting pose.
    ResetView,
    ToggleAutoRotate,
    TogglePanel,
    Quit,
    /// No-op (used for input that has no binding).
    Noop,
}

/// Keys the application binds, independent of the windowing library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    R,
    Space,
    F1,
    Escape,
    Plus,
    Minus,
    Other,
}

/// Map a key press to its action.
pub fn map_key(key: Key) -> Action {
    match key {
        Key::R => Action::ResetView,
        Key::Space => Action::ToggleAutoRotate,
        Key::F1 => Action::TogglePanel,
        Key::Escape => Action::Quit,
        Key::Plus => Action::Zoom(1.0),
        Key::Minus => Action::Zoom(-1.0),
        Key::Other => Action::Noop,
    }
}
