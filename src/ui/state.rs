use glam::Vec2;
use winit::keyboard::KeyCode;

pub const ROTATION_SENSITIVITY: f32 = 0.5;
pub const ZOOM_STEP: f32 = 0.2;
pub const MAX_PITCH: f32 = 89.0;
pub const MIN_DISTANCE: f32 = 0.5;
pub const MAX_DISTANCE: f32 = 10.0;
pub const DEFAULT_DISTANCE: f32 = 3.0;

/// Everything the render loop reads each frame. Angles are in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InteractionState {
    pub rotation_x: f32,
    pub rotation_y: f32,
    pub zoom_distance: f32,
    pub wireframe: bool,
}

impl Default for InteractionState {
    fn default() -> Self {
        Self {
            rotation_x: 0.0,
            rotation_y: 0.0,
            zoom_distance: DEFAULT_DISTANCE,
            wireframe: false,
        }
    }
}

impl InteractionState {
    /// Horizontal drag spins around Y (unbounded), vertical drag tilts around X.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.rotation_y += dx * ROTATION_SENSITIVITY;
        self.rotation_x =
            (self.rotation_x + dy * ROTATION_SENSITIVITY).clamp(-MAX_PITCH, MAX_PITCH);
    }

    /// Negative offsets move the eye closer.
    pub fn scroll(&mut self, offset: f32) {
        self.zoom_distance =
            (self.zoom_distance + offset * ZOOM_STEP).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    pub fn toggle_wireframe(&mut self) -> bool {
        self.wireframe = !self.wireframe;
        self.wireframe
    }
}

/// Turns absolute cursor positions into deltas while the drag button is held.
#[derive(Clone, Copy, Debug, Default)]
pub struct PointerDrag {
    pressed: bool,
    last: Option<Vec2>,
}

impl PointerDrag {
    pub fn press(&mut self) {
        self.pressed = true;
        self.last = None;
    }

    pub fn release(&mut self) {
        self.pressed = false;
        self.last = None;
    }

    /// The first move after a press only records where the cursor is.
    pub fn moved(&mut self, position: Vec2) -> Option<Vec2> {
        if !self.pressed {
            return None;
        }
        let delta = self.last.map(|last| position - last);
        self.last = Some(position);
        delta
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    ToggleWireframe,
    ToggleOverlay,
    Exit,
}

pub fn key_action(key: KeyCode) -> Option<KeyAction> {
    match key {
        KeyCode::KeyW => Some(KeyAction::ToggleWireframe),
        KeyCode::KeyH => Some(KeyAction::ToggleOverlay),
        KeyCode::Escape => Some(KeyAction::Exit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizontal_drag_spins_without_bound() {
        let mut state = InteractionState {
            rotation_y: 30.0,
            ..Default::default()
        };
        state.rotate(100.0, 0.0);
        assert_eq!(state.rotation_y, 80.0);
        assert_eq!(state.rotation_x, 0.0);

        for _ in 0..10 {
            state.rotate(1000.0, 0.0);
        }
        assert_eq!(state.rotation_y, 5080.0);
    }

    #[test]
    fn vertical_drag_is_clamped() {
        let mut state = InteractionState::default();
        state.rotate(0.0, 60.0);
        assert_eq!(state.rotation_x, 30.0);

        state.rotate(0.0, 500.0);
        assert_eq!(state.rotation_x, MAX_PITCH);

        state.rotate(0.0, -1000.0);
        assert_eq!(state.rotation_x, -MAX_PITCH);
    }

    #[test]
    fn zoom_in_stops_at_floor() {
        let mut state = InteractionState::default();
        for _ in 0..50 {
            state.scroll(-1.0);
        }
        assert_eq!(state.zoom_distance, MIN_DISTANCE);

        state.scroll(-50.0);
        assert_eq!(state.zoom_distance, MIN_DISTANCE);
    }

    #[test]
    fn zoom_out_stops_at_ceiling() {
        let mut state = InteractionState::default();
        state.scroll(50.0);
        assert_eq!(state.zoom_distance, MAX_DISTANCE);
    }

    #[test]
    fn single_scroll_step() {
        let mut state = InteractionState::default();
        state.scroll(-1.0);
        assert!((state.zoom_distance - 2.8).abs() < 1e-6);
    }

    #[test]
    fn wireframe_toggles() {
        let mut state = InteractionState::default();
        assert!(state.toggle_wireframe());
        assert!(state.wireframe);
        assert!(!state.toggle_wireframe());
        assert!(!state.wireframe);
    }

    #[test]
    fn drag_reports_deltas_only_while_pressed() {
        let mut drag = PointerDrag::default();
        assert_eq!(drag.moved(Vec2::new(10.0, 10.0)), None);

        drag.press();
        assert_eq!(drag.moved(Vec2::new(10.0, 10.0)), None);
        assert_eq!(drag.moved(Vec2::new(15.0, 8.0)), Some(Vec2::new(5.0, -2.0)));
        assert_eq!(drag.moved(Vec2::new(115.0, 8.0)), Some(Vec2::new(100.0, 0.0)));

        drag.release();
        assert_eq!(drag.moved(Vec2::new(0.0, 0.0)), None);

        drag.press();
        assert_eq!(drag.moved(Vec2::new(500.0, 500.0)), None);
    }

    #[test]
    fn drag_feeds_rotation() {
        let mut drag = PointerDrag::default();
        let mut state = InteractionState::default();
        drag.press();
        for x in [0.0, 40.0, 100.0] {
            if let Some(delta) = drag.moved(Vec2::new(x, 0.0)) {
                state.rotate(delta.x, delta.y);
            }
        }
        assert_eq!(state.rotation_y, 50.0);
    }

    #[test]
    fn key_bindings() {
        assert_eq!(key_action(KeyCode::KeyW), Some(KeyAction::ToggleWireframe));
        assert_eq!(key_action(KeyCode::KeyH), Some(KeyAction::ToggleOverlay));
        assert_eq!(key_action(KeyCode::Escape), Some(KeyAction::Exit));
        assert_eq!(key_action(KeyCode::KeyQ), None);
    }
}
