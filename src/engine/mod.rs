// Engine module - host-side plumbing around the simulation
// Input mapping, cosmetic ECS effects, scene instancing and the HUD

pub mod components;
pub mod hud;
pub mod input;
pub mod mesh;
pub mod scene;
pub mod systems;
