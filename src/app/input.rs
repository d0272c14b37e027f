use winit::event::{ElementState, MouseButton, MouseScrollDelta};

/// One camera gesture derived from raw pointer events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrbitGesture {
    Rotate { dx: f32, dy: f32 },
    Pan { dx: f32, dy: f32 },
    Zoom { amount: f32 },
}

/// Tracks pointer buttons and position between events. Left drag orbits,
/// right drag (or shift plus left) pans, the wheel zooms.
#[derive(Debug, Default)]
pub struct PointerState {
    last_pos: Option<(f32, f32)>,
    left_down: bool,
    right_down: bool,
    pub shift: bool,
}

impl PointerState {
    pub fn on_button(&mut self, button: MouseButton, state: ElementState) {
        let pressed = state == ElementState::Pressed;
        match button {
            MouseButton::Left => self.left_down = pressed,
            MouseButton::Right => self.right_down = pressed,
            _ => {}
        }
    }

    pub fn on_cursor_left(&mut self) {
        self.last_pos = None;
    }

    pub fn on_cursor_moved(&mut self, x: f32, y: f32) -> Option<OrbitGesture> {
        let gesture = match self.last_pos {
            Some((px, py)) if self.left_down || self.right_down => {
                let dx = x - px;
                let dy = y - py;
                if self.right_down || self.shift {
                    Some(OrbitGesture::Pan { dx, dy })
                } else {
                    Some(OrbitGesture::Rotate { dx, dy })
                }
            }
            _ => None,
        };
        self.last_pos = Some((x, y));
        gesture
    }

    pub fn on_scroll(&mut self, delta: MouseScrollDelta) -> OrbitGesture {
        let amount = match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 40.0,
        };
        OrbitGesture::Zoom { amount }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_drag_rotates() {
        let mut pointer = PointerState::default();
        pointer.on_button(MouseButton::Left, ElementState::Pressed);
        assert_eq!(pointer.on_cursor_moved(10.0, 10.0), None);
        assert_eq!(
            pointer.on_cursor_moved(15.0, 8.0),
            Some(OrbitGesture::Rotate { dx: 5.0, dy: -2.0 })
        );
    }

    #[test]
    fn right_drag_pans() {
        let mut pointer = PointerState::default();
        pointer.on_button(MouseButton::Right, ElementState::Pressed);
        pointer.on_cursor_moved(0.0, 0.0);
        assert_eq!(
            pointer.on_cursor_moved(3.0, 4.0),
            Some(OrbitGesture::Pan { dx: 3.0, dy: 4.0 })
        );
    }

    #[test]
    fn motion_without_buttons_is_ignored() {
        let mut pointer = PointerState::default();
        pointer.on_cursor_moved(0.0, 0.0);
        assert_eq!(pointer.on_cursor_moved(50.0, 50.0), None);
    }

    #[test]
    fn reentry_does_not_jump() {
        let mut pointer = PointerState::default();
        pointer.on_button(MouseButton::Left, ElementState::Pressed);
        pointer.on_cursor_moved(0.0, 0.0);
        pointer.on_cursor_left();
        // First sample after re-entering only re-anchors the position.
        assert_eq!(pointer.on_cursor_moved(500.0, 500.0), None);
    }
}
