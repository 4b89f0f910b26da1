// Third-person orbit camera.
//
// Camera model:
//   - Orbits the player at `distance`, with an azimuth and a polar angle
//   - Follow mode: azimuth = player facing + PI (behind the player) + drag offset
//   - Manual mode: azimuth is accumulated on its own from drag and rotate keys
//   - Drag mostly sideways also pans; the pan offset shifts both eye and target
//     and decays back to zero whenever the pointer is released
//   - The eye chases its ideal position with a fixed lerp factor per tick
//   - An intro flight from high above runs on start/restart; any input cancels it

use std::f32::consts::PI;

use glam::{Mat4, Vec2, Vec3};

use super::config::CameraConfig;

/// Camera-relevant input for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraInput {
    /// Pointer movement in pixels while the drag button is held.
    pub drag: Vec2,
    pub pointer_down: bool,
    /// Wheel delta in pixel-ish units; positive zooms out.
    pub zoom: f32,
    /// Manual-mode orbit from the rotate keys, radians.
    pub orbit: f32,
    pub toggle_mode: bool,
    /// A movement key went down this tick.
    pub movement_key: bool,
    /// Any key or button went down this tick.
    pub any_press: bool,
}

pub struct CameraController {
    position: Vec3,
    look_target: Vec3,

    /// Private: always clamped to [min_distance, max_distance]. Use distance() to read.
    distance: f32,
    /// Private: always clamped to [min_polar, max_polar].
    polar: f32,
    /// Follow-mode offset added to the behind-the-player azimuth.
    azimuth_offset: f32,
    manual_angle: f32,
    manual: bool,
    pan_offset: Vec3,

    intro_active: bool,
    intro_elapsed: f32,

    config: CameraConfig,
}

impl CameraController {
    pub fn new(config: CameraConfig) -> Self {
        let start = Vec3::from_array(config.intro_start);
        Self {
            position: start,
            look_target: Vec3::ZERO,
            distance: config.distance,
            polar: config.polar,
            azimuth_offset: 0.0,
            manual_angle: 0.0,
            manual: false,
            pan_offset: Vec3::ZERO,
            intro_active: true,
            intro_elapsed: 0.0,
            config,
        }
    }

    /// Re-arm the intro flight and clear every user adjustment.
    pub fn start_intro(&mut self) {
        self.position = Vec3::from_array(self.config.intro_start);
        self.look_target = Vec3::ZERO;
        self.distance = self.config.distance;
        self.polar = self.config.polar;
        self.azimuth_offset = 0.0;
        self.manual_angle = 0.0;
        self.manual = false;
        self.pan_offset = Vec3::ZERO;
        self.intro_active = true;
        self.intro_elapsed = 0.0;
    }

    pub fn cancel_intro(&mut self) {
        if self.intro_active {
            log::debug!("Intro cancelled after {:.2}s", self.intro_elapsed);
        }
        self.intro_active = false;
    }

    pub fn intro_active(&self) -> bool {
        self.intro_active
    }

    pub fn is_manual(&self) -> bool {
        self.manual
    }

    /// Switch between follow and manual orbit. Entering manual keeps the current
    /// view; leaving it drops the follow offset and starts pulling the pan back.
    pub fn set_manual(&mut self, enabled: bool, facing: f32) {
        if enabled == self.manual {
            return;
        }
        if enabled {
            self.manual_angle = self.effective_azimuth(facing);
        } else {
            self.azimuth_offset = 0.0;
            self.decay_pan();
        }
        self.manual = enabled;
        log::info!("Camera mode: {}", if enabled { "manual" } else { "follow" });
    }

    pub fn effective_azimuth(&self, facing: f32) -> f32 {
        if self.manual {
            self.manual_angle
        } else {
            facing + PI + self.azimuth_offset
        }
    }

    pub fn update(&mut self, player: Vec3, facing: f32, input: &CameraInput, dt: f32) {
        if input.toggle_mode {
            self.set_manual(!self.manual, facing);
        }

        if self.intro_active {
            if input.any_press {
                self.cancel_intro();
            } else {
                self.update_intro(player, facing, dt);
            }
        } else {
            self.apply_input(input);
            self.follow(player, facing);
        }

        if !input.pointer_down {
            self.decay_pan();
        }
    }

    fn apply_input(&mut self, input: &CameraInput) {
        if input.pointer_down && input.drag != Vec2::ZERO {
            let Vec2 { x: dx, y: dy } = input.drag;
            let turn = dx * self.config.drag_sensitivity;
            if self.manual {
                self.manual_angle -= turn;
            } else {
                self.azimuth_offset -= turn;
            }

            self.polar = (self.polar + dy * self.config.drag_sensitivity)
                .clamp(self.config.min_polar, self.config.max_polar);

            if dx.abs() > dy.abs() {
                let forward = (self.look_target - self.position).normalize_or_zero();
                let right = forward.cross(Vec3::Y).normalize_or_zero();
                self.pan_offset += right * (-dx * self.config.pan_sensitivity);
            }
        }

        if input.zoom != 0.0 {
            self.distance = (self.distance + input.zoom * self.config.zoom_speed)
                .clamp(self.config.min_distance, self.config.max_distance);
        }

        if self.manual {
            self.manual_angle += input.orbit;
        }

        if input.movement_key {
            self.decay_pan();
        }
    }

    /// One step of pan decay, snapping to exactly zero below the epsilon.
    fn decay_pan(&mut self) {
        if self.pan_offset == Vec3::ZERO {
            return;
        }
        self.pan_offset *= self.config.pan_decay;
        if self.pan_offset.length() < self.config.pan_epsilon {
            self.pan_offset = Vec3::ZERO;
        }
    }

    /// Where the eye wants to be with no pan applied.
    fn orbit_position(&self, player: Vec3, facing: f32) -> Vec3 {
        let azimuth = self.effective_azimuth(facing);
        player
            + Vec3::new(
                azimuth.sin() * self.distance,
                self.config.height + self.polar.sin() * self.distance * 0.5,
                azimuth.cos() * self.distance,
            )
    }

    fn follow(&mut self, player: Vec3, facing: f32) {
        let ideal = self.orbit_position(player, facing) + self.pan_offset;
        self.position = self.position.lerp(ideal, self.config.follow_factor);
        self.look_target = player + Vec3::Y + self.pan_offset;
    }

    fn update_intro(&mut self, player: Vec3, facing: f32, dt: f32) {
        self.intro_elapsed += dt;
        let progress = (self.intro_elapsed / self.config.intro_duration).min(1.0);

        if progress >= 1.0 {
            self.intro_active = false;
            self.follow(player, facing);
            return;
        }

        let eased = ease_in_out_quad(progress);
        let start = Vec3::from_array(self.config.intro_start);
        self.position = start.lerp(self.orbit_position(player, facing), eased);
        self.look_target = Vec3::ZERO.lerp(player + Vec3::Y, eased);
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn look_target(&self) -> Vec3 {
        self.look_target
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn polar(&self) -> f32 {
        self.polar
    }

    pub fn pan_offset(&self) -> Vec3 {
        self.pan_offset
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.look_target, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.config.fov_degrees.to_radians(), aspect, self.config.near, self.config.far)
    }

    /// Combined view-projection matrix ready to upload to the GPU.
    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }
}

fn ease_in_out_quad(t: f32) -> f32 {
    if t < 0.5 { 2.0 * t * t } else { -1.0 + (4.0 - 2.0 * t) * t }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;
    const FACING: f32 = std::f32::consts::FRAC_PI_2;

    fn camera() -> CameraController {
        let mut cam = CameraController::new(CameraConfig::default());
        cam.cancel_intro();
        cam
    }

    fn drag(dx: f32, dy: f32) -> CameraInput {
        CameraInput { drag: Vec2::new(dx, dy), pointer_down: true, ..Default::default() }
    }

    #[test]
    fn test_pan_decays_by_tenth_and_snaps_to_zero() {
        let mut cam = camera();
        cam.pan_offset = Vec3::new(3.0, 0.0, 0.0);
        let idle = CameraInput::default();

        let mut ticks = 0;
        while cam.pan_offset() != Vec3::ZERO {
            let before = cam.pan_offset().length();
            cam.update(Vec3::ZERO, FACING, &idle, DT);
            let after = cam.pan_offset().length();
            if after > 0.0 {
                assert!((after - before * 0.9).abs() < 1e-5);
                assert!(after >= 0.1);
            }
            ticks += 1;
            assert!(ticks < 100);
        }
        assert_eq!(ticks, 33);
    }

    #[test]
    fn test_pan_holds_while_dragging() {
        let mut cam = camera();
        cam.update(Vec3::ZERO, FACING, &CameraInput::default(), DT);
        cam.update(Vec3::ZERO, FACING, &drag(20.0, 2.0), DT);
        let panned = cam.pan_offset();
        assert!(panned.length() > 0.0);

        let hold = CameraInput { pointer_down: true, ..Default::default() };
        cam.update(Vec3::ZERO, FACING, &hold, DT);
        assert_eq!(cam.pan_offset(), panned);
    }

    #[test]
    fn test_vertical_drag_does_not_pan() {
        let mut cam = camera();
        cam.update(Vec3::ZERO, FACING, &drag(2.0, 20.0), DT);
        assert_eq!(cam.pan_offset(), Vec3::ZERO);
    }

    #[test]
    fn test_polar_and_distance_are_clamped() {
        let mut cam = camera();
        cam.update(Vec3::ZERO, FACING, &drag(0.0, 10_000.0), DT);
        assert!((cam.polar() - std::f32::consts::FRAC_PI_6).abs() < 1e-6);
        cam.update(Vec3::ZERO, FACING, &drag(0.0, -10_000.0), DT);
        assert!((cam.polar() + std::f32::consts::FRAC_PI_3).abs() < 1e-6);

        let zoom_out = CameraInput { zoom: 100_000.0, ..Default::default() };
        cam.update(Vec3::ZERO, FACING, &zoom_out, DT);
        assert_eq!(cam.distance(), 25.0);
        let zoom_in = CameraInput { zoom: -100_000.0, ..Default::default() };
        cam.update(Vec3::ZERO, FACING, &zoom_in, DT);
        assert_eq!(cam.distance(), 5.0);
    }

    #[test]
    fn test_follow_sits_behind_player() {
        let mut cam = camera();
        for _ in 0..600 {
            cam.update(Vec3::ZERO, FACING, &CameraInput::default(), DT);
        }
        // Facing +X, so the camera settles on the -X side.
        assert!(cam.position().x < -13.0);
        assert!(cam.position().z.abs() < 1e-3);
        assert_eq!(cam.look_target(), Vec3::Y);
    }

    #[test]
    fn test_follow_moves_fixed_fraction_per_tick() {
        let mut cam = camera();
        let start = cam.position();
        let ideal = cam.orbit_position(Vec3::ZERO, FACING);
        cam.update(Vec3::ZERO, FACING, &CameraInput::default(), DT);
        let expected = start.lerp(ideal, 0.15);
        assert!((cam.position() - expected).length() < 1e-4);
    }

    #[test]
    fn test_manual_mode_decouples_from_facing() {
        let mut cam = camera();
        let toggle = CameraInput { toggle_mode: true, ..Default::default() };
        cam.update(Vec3::ZERO, FACING, &toggle, DT);
        assert!(cam.is_manual());
        assert!((cam.effective_azimuth(FACING) - (FACING + PI)).abs() < 1e-6);

        assert!((cam.effective_azimuth(0.0) - (FACING + PI)).abs() < 1e-6);
        let orbit = CameraInput { orbit: 0.04, ..Default::default() };
        cam.update(Vec3::ZERO, FACING, &orbit, DT);
        assert!((cam.effective_azimuth(FACING) - (FACING + PI + 0.04)).abs() < 1e-6);

        cam.update(Vec3::ZERO, FACING, &toggle, DT);
        assert!(!cam.is_manual());
        assert!((cam.effective_azimuth(1.0) - (1.0 + PI)).abs() < 1e-6);
    }

    #[test]
    fn test_intro_runs_to_completion() {
        let mut cam = CameraController::new(CameraConfig::default());
        cam.start_intro();
        let player = Vec3::new(-60.0, 1.0, 0.0);
        assert_eq!(cam.position(), Vec3::new(0.0, 40.0, 0.0));

        for _ in 0..120 {
            cam.update(player, FACING, &CameraInput::default(), DT);
        }
        assert!(cam.intro_active());
        // Halfway through the quad ease the eye is halfway there.
        let target = cam.orbit_position(player, FACING);
        let halfway = Vec3::new(0.0, 40.0, 0.0).lerp(target, 0.5);
        assert!((cam.position() - halfway).length() < 0.2);

        for _ in 0..121 {
            cam.update(player, FACING, &CameraInput::default(), DT);
        }
        assert!(!cam.intro_active());
    }

    #[test]
    fn test_any_press_cancels_intro() {
        let mut cam = CameraController::new(CameraConfig::default());
        cam.start_intro();
        let press = CameraInput { any_press: true, ..Default::default() };
        cam.update(Vec3::ZERO, FACING, &press, DT);
        assert!(!cam.intro_active());
    }

    #[test]
    fn test_ease_is_symmetric() {
        assert_eq!(ease_in_out_quad(0.0), 0.0);
        assert!((ease_in_out_quad(0.5) - 0.5).abs() < 1e-6);
        assert!((ease_in_out_quad(1.0) - 1.0).abs() < 1e-6);
        assert!((ease_in_out_quad(0.25) + ease_in_out_quad(0.75) - 1.0).abs() < 1e-6);
    }
}
