//! Keyboard/mouse state mapped onto camera operations.

use corelib::MoveDirection;
use winit::event::MouseScrollDelta;
use winit::keyboard::KeyCode;

/// Opposing key pairs. When both keys of a pair are held the first wins.
const MOVE_PAIRS: [((KeyCode, MoveDirection), (KeyCode, MoveDirection)); 3] = [
    ((KeyCode::KeyW, MoveDirection::Forward), (KeyCode::KeyS, MoveDirection::Backward)),
    ((KeyCode::KeyA, MoveDirection::Left), (KeyCode::KeyD, MoveDirection::Right)),
    ((KeyCode::PageUp, MoveDirection::Up), (KeyCode::PageDown, MoveDirection::Down)),
];

/// Pixels of a pixel-delta scroll that count as one wheel notch.
const PIXELS_PER_NOTCH: f64 = 40.0;

/// Keys currently held down, updated from keyboard events.
#[derive(Clone, Debug, Default)]
pub struct InputState {
    held: Vec<KeyCode>,
}

impl InputState {
    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        let held = self.is_held(key);
        if pressed && !held {
            self.held.push(key);
        } else if !pressed && held {
            self.held.retain(|&k| k != key);
        }
    }

    pub fn is_held(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    /// Forget every held key, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        self.held.clear();
    }

    /// Moves to apply this frame: at most one per axis.
    pub fn moves(&self) -> Vec<MoveDirection> {
        MOVE_PAIRS
            .iter()
            .filter_map(|&((first, first_dir), (second, second_dir))| {
                if self.is_held(first) {
                    Some(first_dir)
                } else if self.is_held(second) {
                    Some(second_dir)
                } else {
                    None
                }
            })
            .collect()
    }

    /// Look delta for raw mouse motion, only while Left Ctrl is held.
    /// Screen y grows downward, so it is negated: moving the mouse up
    /// pitches the camera up.
    pub fn look_delta(&self, dx: f64, dy: f64) -> Option<(f32, f32)> {
        self.is_held(KeyCode::ControlLeft)
            .then_some((dx as f32, -dy as f32))
    }
}

/// Zoom step for a wheel event: positive when scrolling up (zoom in).
pub fn zoom_from_scroll(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(pos) => (pos.y / PIXELS_PER_NOTCH) as f32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use winit::dpi::PhysicalPosition;

    #[test]
    fn single_keys_map_to_directions() {
        let mut input = InputState::default();
        input.set_key(KeyCode::KeyS, true);
        input.set_key(KeyCode::KeyD, true);
        input.set_key(KeyCode::PageDown, true);
        assert_eq!(
            input.moves(),
            [MoveDirection::Backward, MoveDirection::Right, MoveDirection::Down]
        );
    }

    #[test]
    fn first_key_of_pair_wins() {
        let mut input = InputState::default();
        input.set_key(KeyCode::KeyS, true);
        input.set_key(KeyCode::KeyW, true);
        input.set_key(KeyCode::KeyD, true);
        input.set_key(KeyCode::KeyA, true);
        assert_eq!(input.moves(), [MoveDirection::Forward, MoveDirection::Left]);
    }

    #[test]
    fn release_and_clear() {
        let mut input = InputState::default();
        input.set_key(KeyCode::KeyW, true);
        input.set_key(KeyCode::KeyW, true);
        input.set_key(KeyCode::KeyW, false);
        assert!(input.moves().is_empty());

        input.set_key(KeyCode::PageUp, true);
        input.clear();
        assert!(!input.is_held(KeyCode::PageUp));
    }

    #[test]
    fn look_requires_left_ctrl() {
        let mut input = InputState::default();
        assert_eq!(input.look_delta(3.0, 4.0), None);
        input.set_key(KeyCode::ControlLeft, true);
        assert_eq!(input.look_delta(3.0, 4.0), Some((3.0, -4.0)));
        input.set_key(KeyCode::ControlRight, true);
        input.set_key(KeyCode::ControlLeft, false);
        assert_eq!(input.look_delta(3.0, 4.0), None);
    }

    #[test]
    fn scroll_deltas_become_zoom_steps() {
        assert_relative_eq!(zoom_from_scroll(MouseScrollDelta::LineDelta(0.0, 1.0)), 1.0);
        assert_relative_eq!(zoom_from_scroll(MouseScrollDelta::LineDelta(0.0, -2.0)), -2.0);
        let pixels = MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, 80.0));
        assert_relative_eq!(zoom_from_scroll(pixels), 2.0);
    }
}
