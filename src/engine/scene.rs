// Turns simulation state into per-instance draw data for the cube renderer.
// Read-only over the simulation; everything is rebuilt every frame.

use bevy_ecs::prelude::*;
use glam::{EulerRot, Mat4, Quat, Vec3};

use super::components::{Color, Lifetime, Transform};
use crate::game::dynamics::WaveField;
use crate::game::world::{Appearance, Obstacle, Platform, PlatformKind};
use crate::game::Simulation;

// ============================================================================
// INSTANCE DATA (per-box)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceData {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl InstanceData {
    pub fn new(model: Mat4, color: [f32; 3]) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            color: [color[0], color[1], color[2], 1.0],
        }
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        const COLUMN: wgpu::BufferAddress = std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress;
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceData>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,  // One per instance, not per vertex
            attributes: &[
                // Model matrix columns (locations 2-5)
                wgpu::VertexAttribute { offset: 0,          shader_location: 2, format: wgpu::VertexFormat::Float32x4 },
                wgpu::VertexAttribute { offset: COLUMN,     shader_location: 3, format: wgpu::VertexFormat::Float32x4 },
                wgpu::VertexAttribute { offset: COLUMN * 2, shader_location: 4, format: wgpu::VertexFormat::Float32x4 },
                wgpu::VertexAttribute { offset: COLUMN * 3, shader_location: 5, format: wgpu::VertexFormat::Float32x4 },
                // Color (location 6)
                wgpu::VertexAttribute { offset: COLUMN * 4, shader_location: 6, format: wgpu::VertexFormat::Float32x4 },
            ],
        }
    }
}

// ============================================================================
// PALETTE
// ============================================================================

const SAND: [f32; 3] = [0.86, 0.78, 0.55];
const GRASS: [f32; 3] = [0.25, 0.45, 0.2];
const BARK: [f32; 3] = [0.4, 0.26, 0.13];
const LEAVES: [f32; 3] = [0.15, 0.5, 0.18];
const STONE: [f32; 3] = [0.5, 0.5, 0.52];
const LOG_WOOD: [f32; 3] = [0.55, 0.36, 0.2];
const HULL: [f32; 3] = [0.35, 0.2, 0.1];
const SAIL: [f32; 3] = [0.92, 0.9, 0.84];
const CRAB: [f32; 3] = [0.85, 0.25, 0.15];
const SKIN: [f32; 3] = [0.95, 0.75, 0.6];
const SHIRT: [f32; 3] = [0.75, 0.1, 0.12];
const SEA_DEEP: [f32; 3] = [0.05, 0.25, 0.5];
const SEA_CREST: [f32; 3] = [0.3, 0.6, 0.8];

const TREE_HEIGHT: f32 = 4.0;
const CANOPY_SCALE: f32 = 3.0;
const LIMB_WIDTH: f32 = 0.09;
const JOINT_SIZE: f32 = 0.12;

/// Box whose top face sits at `top` and extends `depth` downward.
fn slab(center_x: f32, center_z: f32, size_x: f32, size_z: f32, top: f32, depth: f32, rotation: Quat) -> Mat4 {
    let center = Vec3::new(center_x, top - depth * 0.5, center_z);
    Mat4::from_scale_rotation_translation(Vec3::new(size_x, depth, size_z), rotation, center)
}

// ============================================================================
// BUILDERS
// ============================================================================

/// One or more boxes for a platform, depending on what it is.
pub fn platform_instances(platform: &Platform, out: &mut Vec<InstanceData>) {
    let b = &platform.bounds;
    let c = b.center_xz();
    let size = b.size_xz();

    match &platform.kind {
        PlatformKind::Floating(float) => {
            let tilt = Quat::from_euler(EulerRot::XYZ, float.tilt.x, 0.0, float.tilt.y);
            out.push(InstanceData::new(slab(c.x, c.y, size.x, size.y, b.surface_y, 1.2, tilt), STONE));
        }
        PlatformKind::SinkingLog(_) => {
            out.push(InstanceData::new(slab(c.x, c.y, size.x, size.y, b.surface_y, 0.6, Quat::IDENTITY), LOG_WOOD));
        }
        PlatformKind::Ship(ship) => {
            let tilt = Quat::from_euler(EulerRot::XYZ, ship.tilt.x, 0.0, ship.tilt.y);
            out.push(InstanceData::new(slab(c.x, c.y, size.x, size.y, b.surface_y, 3.0, tilt), HULL));
            let mast = Mat4::from_scale_rotation_translation(
                Vec3::new(0.4, 8.0, 0.4),
                tilt,
                Vec3::new(c.x, b.surface_y + 4.0, c.y),
            );
            out.push(InstanceData::new(mast, HULL));
            let sail = Mat4::from_scale_rotation_translation(
                Vec3::new(0.1, 4.0, size.y * 1.4),
                tilt,
                Vec3::new(c.x + 0.3, b.surface_y + 5.0, c.y),
            );
            out.push(InstanceData::new(sail, SAIL));
        }
        PlatformKind::Static => match platform.appearance {
            Appearance::Tree => {
                let trunk = slab(c.x, c.y, size.x, size.y, TREE_HEIGHT, TREE_HEIGHT, Quat::IDENTITY);
                out.push(InstanceData::new(trunk, BARK));
                let canopy = slab(
                    c.x, c.y,
                    size.x * CANOPY_SCALE, size.y * CANOPY_SCALE,
                    TREE_HEIGHT + 2.0, 2.5,
                    Quat::IDENTITY,
                );
                out.push(InstanceData::new(canopy, LEAVES));
            }
            Appearance::Bush => out.push(InstanceData::new(slab(c.x, c.y, size.x, size.y, b.surface_y + 0.5, 1.0, Quat::IDENTITY), LEAVES)),
            Appearance::Boulder => out.push(InstanceData::new(slab(c.x, c.y, size.x, size.y, b.surface_y + 0.4, 1.0, Quat::IDENTITY), STONE)),
            Appearance::Sand => out.push(InstanceData::new(slab(c.x, c.y, size.x, size.y, b.surface_y, 0.5, Quat::IDENTITY), SAND)),
            _ => out.push(InstanceData::new(slab(c.x, c.y, size.x, size.y, b.surface_y, 0.5, Quat::IDENTITY), GRASS)),
        },
    }
}

/// Flat body plus two claws, facing along the patrol heading.
pub fn obstacle_instances(crab: &Obstacle, out: &mut Vec<InstanceData>) {
    let heading = Quat::from_rotation_y(crab.heading);
    let body = Mat4::from_scale_rotation_translation(Vec3::new(0.8, 0.3, 0.6), heading, crab.position + Vec3::Y * 0.15);
    out.push(InstanceData::new(body, CRAB));
    for side in [-1.0, 1.0] {
        let offset = heading * Vec3::new(side * 0.45, 0.25, 0.35);
        let claw = Mat4::from_scale_rotation_translation(Vec3::splat(0.2), heading, crab.position + offset);
        out.push(InstanceData::new(claw, CRAB));
    }
}

/// Every `every`-th sea vertex (on both axes) as a thin tile covering its neighbours.
pub fn sea_instances(waves: &WaveField, every: usize, out: &mut Vec<InstanceData>) {
    let every = every.max(1);
    let stride = waves.stride;
    if stride < 2 || waves.vertex_count() == 0 {
        return;
    }
    let spacing = waves.vertex(1).x - waves.vertex(0).x;
    let tile = spacing * every as f32;

    for row in (0..stride).step_by(every) {
        for col in (0..stride).step_by(every) {
            let p = waves.vertex(row * stride + col);
            let crest = ((p.y - waves.water_level) * 2.0 + 0.5).clamp(0.0, 1.0);
            let color = [
                SEA_DEEP[0] + (SEA_CREST[0] - SEA_DEEP[0]) * crest,
                SEA_DEEP[1] + (SEA_CREST[1] - SEA_DEEP[1]) * crest,
                SEA_DEEP[2] + (SEA_CREST[2] - SEA_DEEP[2]) * crest,
            ];
            out.push(InstanceData::new(slab(p.x, p.z, tile, tile, p.y, 0.1, Quat::IDENTITY), color));
        }
    }
}

/// A cube on every joint and a thin box along every bone.
pub fn skeleton_instances(joints: &[Mat4], parents: &[Option<usize>], out: &mut Vec<InstanceData>) {
    for (idx, joint) in joints.iter().enumerate() {
        let position = joint.w_axis.truncate();
        let marker = Mat4::from_scale_rotation_translation(Vec3::splat(JOINT_SIZE), Quat::IDENTITY, position);
        out.push(InstanceData::new(marker, SKIN));

        let Some(parent) = parents.get(idx).copied().flatten() else { continue };
        let Some(parent_joint) = joints.get(parent) else { continue };
        let from = parent_joint.w_axis.truncate();
        let bone = position - from;
        let length = bone.length();
        if length < 1e-4 {
            continue;
        }
        let rotation = Quat::from_rotation_arc(Vec3::Y, bone / length);
        let limb = Mat4::from_scale_rotation_translation(
            Vec3::new(LIMB_WIDTH, length, LIMB_WIDTH),
            rotation,
            from + bone * 0.5,
        );
        out.push(InstanceData::new(limb, SHIRT));
    }
}

/// Splash droplets shrink as their lifetime runs out.
pub fn particle_instances(world: &mut World, out: &mut Vec<InstanceData>) {
    let mut query = world.query::<(&Transform, &Color, Option<&Lifetime>)>();
    for (transform, color, lifetime) in query.iter(world) {
        let fade = lifetime.map_or(1.0, |l| l.fraction_left());
        let model = Mat4::from_scale_rotation_translation(
            Vec3::splat(transform.scale * fade.max(0.2)),
            Quat::IDENTITY,
            transform.position,
        );
        out.push(InstanceData::new(model, color.to_array()));
    }
}

/// Everything visible this frame, capped at `max_instances`.
pub fn build_scene(sim: &Simulation, particles: &mut World, sea_every: usize, max_instances: usize) -> Vec<InstanceData> {
    let mut out = Vec::with_capacity(max_instances);

    sea_instances(sim.waves(), sea_every, &mut out);
    for platform in &sim.world().platforms {
        platform_instances(platform, &mut out);
    }
    for crab in &sim.world().obstacles {
        obstacle_instances(crab, &mut out);
    }

    let player = sim.player();
    let animation = sim.animation();
    let joints = animation.pose_matrices(player.position, player.facing, 1.0);
    let parents: Vec<Option<usize>> = animation.skeleton().joints.iter().map(|j| j.parent).collect();
    skeleton_instances(&joints, &parents, &mut out);

    particle_instances(particles, &mut out);

    if out.len() > max_instances {
        log::debug!("Dropping {} instances over the cap", out.len() - max_instances);
        out.truncate(max_instances);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::world::{Bounds, FloatingParams};
    use glam::Vec2;

    fn translation(instance: &InstanceData) -> Vec3 {
        Mat4::from_cols_array_2d(&instance.model).w_axis.truncate()
    }

    #[test]
    fn test_slab_top_sits_on_surface() {
        let platform = Platform::new(Appearance::Sand, Bounds::new(-45.5, -35.5, -100.0, 100.0, 0.1), PlatformKind::Static);
        let mut out = Vec::new();
        platform_instances(&platform, &mut out);
        assert_eq!(out.len(), 1);

        let model = Mat4::from_cols_array_2d(&out[0].model);
        let top = model.transform_point3(Vec3::new(0.0, 0.5, 0.0));
        assert!((top.y - 0.1).abs() < 1e-5);
        assert!((top.x - -40.5).abs() < 1e-4);
        assert_eq!(out[0].color, [SAND[0], SAND[1], SAND[2], 1.0]);
    }

    #[test]
    fn test_tree_draws_trunk_and_canopy() {
        let mut out = Vec::new();
        platform_instances(&Platform::solid(Appearance::Tree, Bounds::square(-100.0, 10.0, 1.0, 0.5)), &mut out);
        assert_eq!(out.len(), 2);
        assert!(translation(&out[1]).y > translation(&out[0]).y);
    }

    #[test]
    fn test_static_props_pick_color_by_appearance() {
        let color = |appearance| {
            let mut out = Vec::new();
            platform_instances(&Platform::solid(appearance, Bounds::square(0.0, 0.0, 1.0, 0.5)), &mut out);
            out[0].color
        };
        assert_eq!(color(Appearance::Bush), [LEAVES[0], LEAVES[1], LEAVES[2], 1.0]);
        assert_eq!(color(Appearance::Boulder), [STONE[0], STONE[1], STONE[2], 1.0]);
        assert_eq!(color(Appearance::Grass), [GRASS[0], GRASS[1], GRASS[2], 1.0]);
    }

    #[test]
    fn test_floating_rock_follows_tilt() {
        let float = FloatingParams {
            rest_y: -0.7,
            surface_offset: 0.5,
            amplitude: 0.1,
            frequency: 1.0,
            phase: 0.0,
            tilt_amplitude: 0.05,
            tilt: Vec2::new(0.05, 0.0),
        };
        let platform = Platform::new(Appearance::Rock, Bounds::square(10.0, 0.0, 1.5, -0.2), PlatformKind::Floating(float));
        let mut out = Vec::new();
        platform_instances(&platform, &mut out);

        let model = Mat4::from_cols_array_2d(&out[0].model);
        let (_, rotation, _) = model.to_scale_rotation_translation();
        assert!(rotation.angle_between(Quat::IDENTITY) > 0.01);
    }

    #[test]
    fn test_crab_has_body_and_claws() {
        let crab = Obstacle::new(Vec3::new(-40.0, 0.1, 0.0), Vec3::Z, 0.05, 8.0, 0.0);
        let mut out = Vec::new();
        obstacle_instances(&crab, &mut out);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_skeleton_bone_spans_joints() {
        let root = Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0));
        let child = Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0));
        let mut out = Vec::new();
        skeleton_instances(&[root, child], &[None, Some(0)], &mut out);

        // root marker, child marker, one bone
        assert_eq!(out.len(), 3);
        let bone = Mat4::from_cols_array_2d(&out[2].model);
        let (scale, _, center) = bone.to_scale_rotation_translation();
        assert!((center - Vec3::new(0.0, 1.5, 0.0)).length() < 1e-5);
        assert!((scale.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_particles_shrink_with_lifetime() {
        let mut world = World::new();
        let mut lifetime = Lifetime::new(1.0);
        lifetime.remaining = 0.5;
        world.spawn((
            Transform::from_position(Vec3::ONE).with_scale(0.2),
            Color::new(1.0, 1.0, 1.0),
            lifetime,
        ));

        let mut out = Vec::new();
        particle_instances(&mut world, &mut out);
        let (scale, _, position) = Mat4::from_cols_array_2d(&out[0].model).to_scale_rotation_translation();
        assert!((scale.x - 0.1).abs() < 1e-5);
        assert_eq!(position, Vec3::ONE);
    }
}
