// Input state tracking for keyboard and mouse
// Turns winit events into the per-tick intent the simulation consumes

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use glam::Vec2;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::game::camera::CameraInput;
use crate::game::player::PlayerIntent;
use crate::game::simulation::TickInput;

const FORWARD_KEYS: [KeyCode; 2] = [KeyCode::KeyW, KeyCode::ArrowUp];
const BACK_KEYS: [KeyCode; 2] = [KeyCode::KeyS, KeyCode::ArrowDown];
const LEFT_KEYS: [KeyCode; 2] = [KeyCode::KeyA, KeyCode::ArrowLeft];
const RIGHT_KEYS: [KeyCode; 2] = [KeyCode::KeyD, KeyCode::ArrowRight];
const JUMP_KEY: KeyCode = KeyCode::Space;
const CAMERA_MODE_KEY: KeyCode = KeyCode::KeyV;
const CONFIRM_KEY: KeyCode = KeyCode::Enter;

/// Wheel lines are scaled to roughly the pixel deltas a browser reports,
/// and flipped so that scrolling up (away from the user) zooms in.
const WHEEL_LINE_TO_ZOOM: f32 = -100.0;

pub const DOUBLE_TAP_WINDOW: Duration = Duration::from_millis(300);

/// Double-tap forward to sprint. Letting go of forward ends the sprint.
#[derive(Debug, Clone)]
pub struct SprintDetector {
    last_press: Option<Instant>,
    window: Duration,
    active: bool,
}

impl SprintDetector {
    pub fn new(window: Duration) -> Self {
        Self { last_press: None, window, active: false }
    }

    pub fn on_press(&mut self, now: Instant) {
        if let Some(last) = self.last_press {
            if now.saturating_duration_since(last) < self.window {
                self.active = true;
                log::debug!("Sprint engaged");
            }
        }
        self.last_press = Some(now);
    }

    pub fn on_release(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

pub struct InputState {
    // Keyboard
    keys_held: HashSet<KeyCode>,
    // Monotonic press stamp per held key, for last-writer-wins on each axis
    press_order: HashMap<KeyCode, u64>,
    next_stamp: u64,
    // Edges not yet handed to a tick
    keys_pressed: HashSet<KeyCode>,
    any_press: bool,
    confirm: bool,
    sprint: SprintDetector,

    // Mouse
    pub mouse_position: Vec2,
    drag_button_held: bool,
    drag_delta: Vec2,

    // Scroll: accumulated zoom units until the next tick takes them
    zoom_delta: f32,

    pub window_size: (u32, u32),
}

impl InputState {
    pub fn new() -> Self {
        Self {
            keys_held: HashSet::new(),
            press_order: HashMap::new(),
            next_stamp: 0,
            keys_pressed: HashSet::new(),
            any_press: false,
            confirm: false,
            sprint: SprintDetector::new(DOUBLE_TAP_WINDOW),
            mouse_position: Vec2::ZERO,
            drag_button_held: false,
            drag_delta: Vec2::ZERO,
            zoom_delta: 0.0,
            window_size: (0, 0),
        }
    }

    /// Feed a winit WindowEvent into the input state.
    /// Call this once per event before the game's own event handling.
    pub fn process_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                // OS key repeat is not a new press
                if event.repeat {
                    return;
                }
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.press_key(key, Instant::now()),
                        ElementState::Released => self.release_key(key),
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.move_cursor(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => {
                match state {
                    ElementState::Pressed => {
                        self.drag_button_held = true;
                        self.any_press = true;
                    }
                    ElementState::Released => self.drag_button_held = false,
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let zoom = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y * WHEEL_LINE_TO_ZOOM,
                    MouseScrollDelta::PixelDelta(pos) => -pos.y as f32,
                };
                self.scroll(zoom);
            }
            WindowEvent::Resized(size) => {
                self.window_size = (size.width, size.height);
            }
            WindowEvent::Focused(false) => self.release_all(),
            _ => {}
        }
    }

    pub fn press_key(&mut self, key: KeyCode, now: Instant) {
        if !self.keys_held.insert(key) {
            return;
        }
        self.next_stamp += 1;
        self.press_order.insert(key, self.next_stamp);
        self.keys_pressed.insert(key);
        self.any_press = true;

        if FORWARD_KEYS.contains(&key) {
            self.sprint.on_press(now);
        }
        if key == CONFIRM_KEY {
            self.confirm = true;
        }
    }

    pub fn release_key(&mut self, key: KeyCode) {
        self.keys_held.remove(&key);
        self.press_order.remove(&key);
        if FORWARD_KEYS.contains(&key) {
            self.sprint.on_release();
        }
    }

    /// Drop every held key and button, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        let held: Vec<KeyCode> = self.keys_held.iter().copied().collect();
        for key in held {
            self.release_key(key);
        }
        self.drag_button_held = false;
    }

    pub fn move_cursor(&mut self, position: Vec2) {
        if self.drag_button_held {
            self.drag_delta += position - self.mouse_position;
        }
        self.mouse_position = position;
    }

    /// Wheel input zooms the camera and, like any press, skips the intro.
    pub fn scroll(&mut self, zoom: f32) {
        self.zoom_delta += zoom;
        self.any_press = true;
    }

    pub fn is_key_held(&self, key: KeyCode) -> bool {
        self.keys_held.contains(&key)
    }

    pub fn is_sprinting(&self) -> bool {
        self.sprint.is_active()
    }

    /// True once per Enter press; used for start and restart.
    pub fn take_confirm(&mut self) -> bool {
        std::mem::take(&mut self.confirm)
    }

    /// Build the intent for one simulation tick and consume the edges,
    /// drag and zoom gathered since the previous tick.
    pub fn take_tick_input(&mut self) -> TickInput {
        let forward = self.axis(&FORWARD_KEYS, &BACK_KEYS);
        let player = PlayerIntent {
            forward,
            turn: self.axis(&LEFT_KEYS, &RIGHT_KEYS),
            jump_pressed: self.keys_pressed.contains(&JUMP_KEY),
            sprint: self.sprint.is_active() && forward > 0.0,
        };

        let movement_key = self.keys_pressed.iter().any(|k| {
            FORWARD_KEYS.contains(k)
                || BACK_KEYS.contains(k)
                || LEFT_KEYS.contains(k)
                || RIGHT_KEYS.contains(k)
        });
        let camera = CameraInput {
            drag: std::mem::take(&mut self.drag_delta),
            pointer_down: self.drag_button_held,
            zoom: std::mem::take(&mut self.zoom_delta),
            orbit: 0.0,
            toggle_mode: self.keys_pressed.contains(&CAMERA_MODE_KEY),
            movement_key,
            any_press: self.any_press,
        };

        self.keys_pressed.clear();
        self.any_press = false;

        TickInput { player, camera }
    }

    /// +1 when a positive key holds the axis, -1 for a negative key, 0 when
    /// neither is down. With both down, the most recently pressed side wins.
    fn axis(&self, positive: &[KeyCode], negative: &[KeyCode]) -> f32 {
        let latest = |keys: &[KeyCode]| {
            keys.iter().filter_map(|k| self.press_order.get(k).copied()).max()
        };
        match (latest(positive), latest(negative)) {
            (Some(p), Some(n)) => if p > n { 1.0 } else { -1.0 },
            (Some(_), None) => 1.0,
            (None, Some(_)) => -1.0,
            (None, None) => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn later(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn test_axis_last_writer_wins() {
        let t = Instant::now();
        let mut input = InputState::new();

        input.press_key(KeyCode::KeyW, t);
        assert_eq!(input.take_tick_input().player.forward, 1.0);

        input.press_key(KeyCode::KeyS, later(t, 50));
        assert_eq!(input.take_tick_input().player.forward, -1.0);

        input.release_key(KeyCode::KeyS);
        assert_eq!(input.take_tick_input().player.forward, 1.0);

        input.press_key(KeyCode::ArrowLeft, t);
        input.press_key(KeyCode::KeyD, t);
        assert_eq!(input.take_tick_input().player.turn, -1.0);
        input.release_key(KeyCode::KeyD);
        assert_eq!(input.take_tick_input().player.turn, 1.0);
    }

    #[test]
    fn test_double_tap_forward_sprints_until_release() {
        let t = Instant::now();
        let mut input = InputState::new();

        input.press_key(KeyCode::KeyW, t);
        input.release_key(KeyCode::KeyW);
        input.press_key(KeyCode::KeyW, later(t, 200));
        assert!(input.take_tick_input().player.sprint);

        input.release_key(KeyCode::KeyW);
        assert!(!input.is_sprinting());
        assert!(!input.take_tick_input().player.sprint);
    }

    #[test]
    fn test_slow_second_tap_does_not_sprint() {
        let t = Instant::now();
        let mut input = InputState::new();

        input.press_key(KeyCode::KeyW, t);
        input.release_key(KeyCode::KeyW);
        input.press_key(KeyCode::KeyW, later(t, 450));
        assert!(!input.take_tick_input().player.sprint);
    }

    #[test]
    fn test_sprint_only_applies_moving_forward() {
        let t = Instant::now();
        let mut input = InputState::new();

        input.press_key(KeyCode::KeyW, t);
        input.release_key(KeyCode::KeyW);
        input.press_key(KeyCode::KeyW, later(t, 100));
        input.press_key(KeyCode::KeyS, later(t, 150));

        let intent = input.take_tick_input().player;
        assert_eq!(intent.forward, -1.0);
        assert!(!intent.sprint);
    }

    #[test]
    fn test_edges_are_consumed_by_one_tick() {
        let t = Instant::now();
        let mut input = InputState::new();

        input.press_key(JUMP_KEY, t);
        input.press_key(CAMERA_MODE_KEY, t);
        let first = input.take_tick_input();
        assert!(first.player.jump_pressed);
        assert!(first.camera.toggle_mode);
        assert!(first.camera.any_press);

        let second = input.take_tick_input();
        assert!(!second.player.jump_pressed);
        assert!(!second.camera.toggle_mode);
        assert!(!second.camera.any_press);

        // Holding is not pressing again
        input.press_key(JUMP_KEY, later(t, 10));
        assert!(!input.take_tick_input().player.jump_pressed);
    }

    #[test]
    fn test_movement_key_flag() {
        let t = Instant::now();
        let mut input = InputState::new();

        input.press_key(JUMP_KEY, t);
        assert!(!input.take_tick_input().camera.movement_key);

        input.press_key(KeyCode::ArrowRight, t);
        assert!(input.take_tick_input().camera.movement_key);
    }

    #[test]
    fn test_drag_accumulates_only_while_held() {
        let mut input = InputState::new();

        input.move_cursor(Vec2::new(100.0, 100.0));
        input.move_cursor(Vec2::new(120.0, 100.0));
        assert_eq!(input.take_tick_input().camera.drag, Vec2::ZERO);

        input.drag_button_held = true;
        input.move_cursor(Vec2::new(130.0, 95.0));
        input.move_cursor(Vec2::new(135.0, 90.0));
        let camera = input.take_tick_input().camera;
        assert_eq!(camera.drag, Vec2::new(15.0, -10.0));
        assert!(camera.pointer_down);

        assert_eq!(input.take_tick_input().camera.drag, Vec2::ZERO);
    }

    #[test]
    fn test_scroll_zooms_and_counts_as_press() {
        let mut input = InputState::new();
        input.scroll(1.5);
        input.scroll(0.5);
        let camera = input.take_tick_input().camera;
        assert_eq!(camera.zoom, 2.0);
        assert!(camera.any_press);

        let camera = input.take_tick_input().camera;
        assert_eq!(camera.zoom, 0.0);
        assert!(!camera.any_press);
    }

    #[test]
    fn test_confirm_taken_once_and_release_all() {
        let t = Instant::now();
        let mut input = InputState::new();

        input.press_key(CONFIRM_KEY, t);
        assert!(input.take_confirm());
        assert!(!input.take_confirm());

        input.press_key(KeyCode::KeyW, t);
        input.press_key(KeyCode::KeyA, t);
        input.release_all();
        let intent = input.take_tick_input().player;
        assert_eq!(intent.forward, 0.0);
        assert_eq!(intent.turn, 0.0);
    }
}
