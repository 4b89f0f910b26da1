// egui heads-up display: session screens, lives, timers and the coordinate readout.
// Drawn after the scene in its own render pass on top of the swapchain image.

use egui::epaint::Shadow;
use glam::Vec3;

use crate::game::session::SessionPhase;
use crate::game::Simulation;

/// Which full-screen panel to show, if any.
#[derive(Debug, Clone, PartialEq)]
pub enum HudScreen {
    Loading,
    LoadFailed(String),
    Menu,
    Playing,
    GameOver,
    Won,
}

impl HudScreen {
    pub fn from_phase(phase: SessionPhase) -> Self {
        match phase {
            SessionPhase::Menu => HudScreen::Menu,
            SessionPhase::Playing => HudScreen::Playing,
            SessionPhase::GameOver => HudScreen::GameOver,
            SessionPhase::Won => HudScreen::Won,
        }
    }
}

/// Button the player clicked this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HudAction {
    Start,
    Restart,
}

/// A running countdown shown as "label: elapsed / total".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HudTimer {
    pub elapsed: f32,
    pub total: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HudStats {
    pub fps: u32,
    pub lives: u32,
    pub max_lives: u32,
    pub drowning: Option<HudTimer>,
    pub ship_dwell: Option<HudTimer>,
    pub player_position: Vec3,
    pub manual_camera: bool,
    pub intro_active: bool,
}

impl HudStats {
    pub fn from_simulation(sim: &Simulation, fps: u32) -> Self {
        let session = sim.session();
        let player = sim.player();
        let drowning = player.is_drowning.then(|| HudTimer {
            elapsed: player.drowning_elapsed,
            total: session.drowning_duration(),
        });
        let ship_dwell = (session.on_ship_elapsed() > 0.0).then(|| HudTimer {
            elapsed: session.on_ship_elapsed(),
            total: session.win_dwell(),
        });
        Self {
            fps,
            lives: session.lives(),
            max_lives: sim.config().session.lives,
            drowning,
            ship_dwell,
            player_position: player.position,
            manual_camera: sim.camera().is_manual(),
            intro_active: sim.camera().intro_active(),
        }
    }
}

/// Text rows for the in-game status panel.
pub fn status_lines(stats: &HudStats, show_coordinates: bool) -> Vec<String> {
    let mut lines = Vec::new();

    let hearts: String = (0..stats.max_lives)
        .map(|i| if i < stats.lives { '♥' } else { '·' })
        .collect();
    lines.push(format!("Lives: {}", hearts));

    if let Some(timer) = stats.drowning {
        lines.push(format!("Drowning! {:.1} / {:.1} s", timer.elapsed, timer.total));
    }
    if let Some(timer) = stats.ship_dwell {
        lines.push(format!("On the ship: {:.1} / {:.1} s", timer.elapsed, timer.total));
    }

    let mode = if stats.manual_camera { "camera (V)" } else { "follow (V)" };
    lines.push(format!("Rotate keys: {}", mode));

    if show_coordinates {
        let p = stats.player_position;
        lines.push(format!("Pos: ({:.1}, {:.1}, {:.1})", p.x, p.y, p.z));
    }
    if stats.intro_active {
        lines.push("Press any key to skip".to_string());
    }
    lines.push(format!("FPS: {}", stats.fps));
    lines
}

pub struct HudOverlay {
    pub show_coordinates: bool,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl HudOverlay {
    pub fn new(
        window: &winit::window::Window,
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let egui_ctx = egui::Context::default();

        let mut visuals = egui::Visuals::dark();
        visuals.window_fill = egui::Color32::from_rgba_premultiplied(0, 0, 0, 180);
        visuals.window_stroke = egui::Stroke::NONE;
        visuals.window_shadow = Shadow::NONE;
        visuals.override_text_color = Some(egui::Color32::WHITE);
        egui_ctx.set_visuals(visuals);

        let mut style = (*egui_ctx.style()).clone();
        style.override_font_id = Some(egui::FontId::proportional(16.0));
        egui_ctx.set_style(style);

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        let egui_renderer = egui_wgpu::Renderer::new(
            device,
            surface_format,
            None,  // drawn after the scene, no depth
            1,
            false,
        );

        Self {
            show_coordinates: false,
            egui_ctx,
            egui_state,
            egui_renderer,
        }
    }

    pub fn toggle_coordinates(&mut self) {
        self.show_coordinates = !self.show_coordinates;
    }

    pub fn handle_window_event(
        &mut self,
        window: &winit::window::Window,
        event: &winit::event::WindowEvent,
    ) -> egui_winit::EventResponse {
        self.egui_state.on_window_event(window, event)
    }

    /// Render one egui frame and report which button, if any, was clicked.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        window: &winit::window::Window,
        view: &wgpu::TextureView,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
        screen: &HudScreen,
        stats: &HudStats,
    ) -> Option<HudAction> {
        let raw_input = self.egui_state.take_egui_input(window);
        let show_coordinates = self.show_coordinates;
        let mut action = None;

        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            match screen {
                HudScreen::Loading => {
                    centered_panel(ctx, "Loading the island...", None);
                }
                HudScreen::LoadFailed(reason) => {
                    centered_panel(ctx, &format!("Could not load assets:\n{}", reason), None);
                }
                HudScreen::Menu => {
                    if centered_panel(ctx, "Escape to the pirate ship!", Some("Start (Enter)")) {
                        action = Some(HudAction::Start);
                    }
                }
                HudScreen::GameOver => {
                    if centered_panel(ctx, "Game over", Some("Restart (Enter)")) {
                        action = Some(HudAction::Restart);
                    }
                }
                HudScreen::Won => {
                    if centered_panel(ctx, "You made it aboard!", Some("Play again (Enter)")) {
                        action = Some(HudAction::Restart);
                    }
                }
                HudScreen::Playing => {}
            }

            if matches!(screen, HudScreen::Playing) {
                egui::Area::new(egui::Id::new("hud_status"))
                    .fixed_pos(egui::pos2(10.0, 10.0))
                    .show(ctx, |ui| {
                        egui::Frame::none()
                            .fill(egui::Color32::from_rgba_premultiplied(0, 0, 0, 180))
                            .inner_margin(egui::Margin::same(8.0))
                            .rounding(4.0)
                            .show(ui, |ui: &mut egui::Ui| {
                                for line in status_lines(stats, show_coordinates) {
                                    ui.label(line);
                                }
                            });
                    });
            }
        });

        self.egui_state
            .handle_platform_output(window, full_output.platform_output);

        let tris = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, encoder, &tris, screen_descriptor);

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("HUD Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            self.egui_renderer
                .render(&mut render_pass.forget_lifetime(), &tris, screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        action
    }
}

/// Centered window with a message and an optional button. Returns true on click.
fn centered_panel(ctx: &egui::Context, message: &str, button: Option<&str>) -> bool {
    let mut clicked = false;
    egui::Window::new("session")
        .title_bar(false)
        .resizable(false)
        .collapsible(false)
        .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
        .show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.heading(message);
                if let Some(label) = button {
                    ui.add_space(12.0);
                    clicked = ui.button(label).clicked();
                }
            });
        });
    clicked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> HudStats {
        HudStats {
            fps: 60,
            lives: 2,
            max_lives: 3,
            drowning: None,
            ship_dwell: None,
            player_position: Vec3::new(-40.0, 0.1, 2.5),
            manual_camera: false,
            intro_active: false,
        }
    }

    #[test]
    fn test_screen_follows_phase() {
        assert_eq!(HudScreen::from_phase(SessionPhase::Menu), HudScreen::Menu);
        assert_eq!(HudScreen::from_phase(SessionPhase::Playing), HudScreen::Playing);
        assert_eq!(HudScreen::from_phase(SessionPhase::GameOver), HudScreen::GameOver);
        assert_eq!(HudScreen::from_phase(SessionPhase::Won), HudScreen::Won);
    }

    #[test]
    fn test_lives_row_marks_lost_lives() {
        let lines = status_lines(&stats(), false);
        assert_eq!(lines[0], "Lives: ♥♥·");
    }

    #[test]
    fn test_timers_only_when_running() {
        let mut s = stats();
        let lines = status_lines(&s, false);
        assert!(!lines.iter().any(|l| l.starts_with("Drowning")));
        assert!(!lines.iter().any(|l| l.starts_with("On the ship")));

        s.drowning = Some(HudTimer { elapsed: 1.5, total: 3.0 });
        s.ship_dwell = Some(HudTimer { elapsed: 0.5, total: 3.0 });
        let lines = status_lines(&s, false);
        assert!(lines.contains(&"Drowning! 1.5 / 3.0 s".to_string()));
        assert!(lines.contains(&"On the ship: 0.5 / 3.0 s".to_string()));
    }

    #[test]
    fn test_coordinates_toggle() {
        let s = stats();
        assert!(!status_lines(&s, false).iter().any(|l| l.starts_with("Pos:")));
        assert!(status_lines(&s, true).contains(&"Pos: (-40.0, 0.1, 2.5)".to_string()));
    }

    #[test]
    fn test_stats_from_fresh_simulation() {
        use crate::game::assets::{AssetProvider, ProceduralAssets};
        use crate::game::GameConfig;

        let config = GameConfig::default();
        let assets = ProceduralAssets::new(config.clone()).load().expect("procedural assets");
        let sim = Simulation::new(config, assets);

        let s = HudStats::from_simulation(&sim, 30);
        assert_eq!(s.lives, 3);
        assert_eq!(s.max_lives, 3);
        assert_eq!(s.drowning, None);
        assert_eq!(s.ship_dwell, None);
        assert!(!s.manual_camera);
        assert_eq!(s.fps, 30);
    }
}
