// Session state machine: lives, drowning and ship timers, menu/playing/end screens.
//
//   Menu ──start──▶ Playing ──lives hit 0──▶ GameOver
//                     │  ▲                      │
//                     │  └──────restart─────────┤
//                     └──dwell on ship──▶ Won ──┘
//
// Only Playing advances the rest of the simulation.

use super::config::SessionConfig;
use super::timer_elapsed;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Menu,
    Playing,
    GameOver,
    Won,
}

/// What the caller must do after a life was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeLost {
    /// Lives remain: put the player back at spawn and reset the level.
    Respawn,
    GameOver,
}

#[derive(Debug, Clone)]
pub struct Session {
    phase: SessionPhase,
    lives: u32,
    on_ship_elapsed: f32,
    drowning_active: bool,
    config: SessionConfig,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            phase: SessionPhase::Menu,
            lives: config.lives,
            on_ship_elapsed: 0.0,
            drowning_active: false,
            config,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_playing(&self) -> bool {
        self.phase == SessionPhase::Playing
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn on_ship_elapsed(&self) -> f32 {
        self.on_ship_elapsed
    }

    pub fn drowning_active(&self) -> bool {
        self.drowning_active
    }

    pub fn drowning_duration(&self) -> f32 {
        self.config.drowning_duration
    }

    pub fn win_dwell(&self) -> f32 {
        self.config.win_dwell
    }

    /// Menu → Playing. Returns false (and does nothing) from any other phase.
    pub fn start(&mut self) -> bool {
        if self.phase != SessionPhase::Menu {
            return false;
        }
        self.phase = SessionPhase::Playing;
        log::info!("Session started with {} lives", self.lives);
        true
    }

    /// Full reset of the session-owned state, straight into Playing.
    pub fn restart(&mut self) {
        self.lives = self.config.lives;
        self.on_ship_elapsed = 0.0;
        self.drowning_active = false;
        self.phase = SessionPhase::Playing;
        log::info!("Session restarted");
    }

    pub fn mark_drowning(&mut self) {
        self.drowning_active = true;
    }

    /// Take one life. Never goes below zero; reaching zero ends the session.
    pub fn lose_life(&mut self) -> LifeLost {
        self.lives = self.lives.saturating_sub(1);
        self.drowning_active = false;
        self.on_ship_elapsed = 0.0;
        log::info!("Life lost, {} remaining", self.lives);

        if self.lives == 0 {
            self.phase = SessionPhase::GameOver;
            log::info!("Game over");
            LifeLost::GameOver
        } else {
            LifeLost::Respawn
        }
    }

    /// Advance the ship dwell timer. Any tick off the ship throws away all progress.
    pub fn update_ship_dwell(&mut self, on_ship: bool, dt: f32) {
        if self.phase != SessionPhase::Playing {
            return;
        }
        if !on_ship {
            self.on_ship_elapsed = 0.0;
            return;
        }
        self.on_ship_elapsed += dt;
        if timer_elapsed(self.on_ship_elapsed, self.config.win_dwell) {
            self.phase = SessionPhase::Won;
            log::info!("Reached the ship with {} lives left", self.lives);
        }
    }
}
