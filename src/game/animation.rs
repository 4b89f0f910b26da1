// Procedural skeletal animation.
//
// Each state writes closed-form target rotations (sums of sines over the
// animation clock) for a handful of named joints. Every tick the targeted
// joints are lerped from their current rotation toward rest + target, then the
// target map is cleared. Joints that received no target this tick keep their
// current rotation untouched.
//
// Rotations are XYZ Euler angles stored as Vec3, the same convention the pose
// matrices are built with.

use std::collections::{HashMap, HashSet};

use glam::{EulerRot, Mat4, Quat, Vec3};

use super::config::AnimationConfig;
use super::GameError;

// ============================================================================
// SKELETON
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct JointDef {
    pub name: String,
    /// Index of the parent joint. Parents always come before their children.
    pub parent: Option<usize>,
    /// Translation from the parent joint in the parent's frame.
    pub offset: Vec3,
    pub rest: Vec3,
}

#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    pub joints: Vec<JointDef>,
}

impl Skeleton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a joint and return its index.
    pub fn add_joint(&mut self, name: &str, parent: Option<usize>, offset: Vec3, rest: Vec3) -> usize {
        let idx = self.joints.len();
        self.joints.push(JointDef { name: name.to_string(), parent, offset, rest });
        idx
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|j| j.name == name)
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }
}

// ============================================================================
// STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimState {
    Idle,
    Walk,
    Sprint,
    Jump,
    Drown,
}

impl AnimState {
    pub fn is_locomotion(self) -> bool {
        matches!(self, AnimState::Walk | AnimState::Sprint | AnimState::Jump)
    }
}

/// Motion summary the resolver hands to the blender.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionFlags {
    pub grounded: bool,
    pub horizontal_speed: f32,
    pub sprinting: bool,
    pub drowning: bool,
}

/// Joint targets for one tick. Axes that are not written stay at zero.
#[derive(Debug, Default)]
struct TargetMap {
    entries: HashMap<usize, Vec3>,
}

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
    Z,
}

pub struct AnimationBlender {
    skeleton: Skeleton,
    current: Vec<Vec3>,
    targets: TargetMap,
    state: AnimState,
    previous: AnimState,
    /// Animation clock; drives every sinusoid.
    clock: f32,
    transitioning: bool,
    transition_time: f32,
    needs_reset: bool,
    /// Joint names already reported missing, so each is logged once.
    warned: HashSet<String>,
    config: AnimationConfig,
}

impl AnimationBlender {
    pub fn new(skeleton: Skeleton, config: AnimationConfig) -> Self {
        let current = skeleton.joints.iter().map(|j| j.rest).collect();
        Self {
            skeleton,
            current,
            targets: TargetMap::default(),
            state: AnimState::Idle,
            previous: AnimState::Idle,
            clock: 0.0,
            transitioning: false,
            transition_time: 0.0,
            needs_reset: false,
            warned: HashSet::new(),
            config,
        }
    }

    pub fn state(&self) -> AnimState {
        self.state
    }

    pub fn previous_state(&self) -> AnimState {
        self.previous
    }

    pub fn is_transitioning(&self) -> bool {
        self.transitioning
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    /// Current rotation of every joint, indexed like the skeleton.
    pub fn rotations(&self) -> &[Vec3] {
        &self.current
    }

    pub fn rotation_of(&self, name: &str) -> Option<Vec3> {
        self.skeleton.find(name).map(|i| self.current[i])
    }

    /// Switch state. A no-op if already in `next`.
    pub fn set_state(&mut self, next: AnimState) {
        if next == self.state {
            return;
        }
        if self.state.is_locomotion() && next == AnimState::Idle {
            self.needs_reset = true;
        }
        log::trace!("Animation {:?} -> {:?}", self.state, next);
        self.previous = self.state;
        self.state = next;
        self.transition_time = 0.0;
        self.transitioning = true;
    }

    /// Pick a state from the motion flags. Drowning wins over everything and
    /// freezes classification until it ends.
    pub fn classify(&mut self, flags: &MotionFlags) {
        let next = if flags.drowning {
            AnimState::Drown
        } else if !flags.grounded {
            AnimState::Jump
        } else if flags.horizontal_speed > self.config.moving_threshold {
            if flags.sprinting { AnimState::Sprint } else { AnimState::Walk }
        } else {
            AnimState::Idle
        };
        self.set_state(next);
    }

    pub fn update(&mut self, flags: &MotionFlags, dt: f32) {
        self.classify(flags);
        self.advance(dt);
    }

    /// Advance the clock and blend the current state's pose, without reclassifying.
    pub fn advance(&mut self, dt: f32) {
        self.clock += dt;

        if self.transitioning {
            self.transition_time += dt;
            if self.transition_time >= self.config.transition_duration {
                self.transitioning = false;
                self.transition_time = 0.0;
            }
        }

        if self.needs_reset {
            self.reset_to_rest();
            self.needs_reset = false;
        }

        let t = self.clock;
        match self.state {
            AnimState::Idle => self.pose_idle(t),
            AnimState::Walk => self.pose_walk(t),
            AnimState::Sprint => self.pose_sprint(t),
            AnimState::Jump => self.pose_jump(),
            AnimState::Drown => self.pose_drown(t),
        }

        self.apply_targets();
    }

    /// Lerp factor for this tick: ramps up over the transition window, then settles.
    pub fn blend_factor(&self) -> f32 {
        if self.transitioning {
            (self.transition_time / self.config.transition_duration).min(1.0) * self.config.transition_blend
        } else {
            self.config.settle_blend
        }
    }

    /// Snap every joint back to its rest rotation.
    pub fn reset_to_rest(&mut self) {
        for (current, joint) in self.current.iter_mut().zip(&self.skeleton.joints) {
            *current = joint.rest;
        }
    }

    /// Back to Idle at rest with a fresh clock. Used on restart.
    pub fn reset(&mut self) {
        self.reset_to_rest();
        self.targets.entries.clear();
        self.state = AnimState::Idle;
        self.previous = AnimState::Idle;
        self.clock = 0.0;
        self.transitioning = false;
        self.transition_time = 0.0;
        self.needs_reset = false;
    }

    /// Model-space transform of every joint for the player's root placement.
    pub fn pose_matrices(&self, root_position: Vec3, facing: f32, scale: f32) -> Vec<Mat4> {
        let root = Mat4::from_scale_rotation_translation(Vec3::splat(scale), Quat::from_rotation_y(facing), root_position);
        let mut world: Vec<Mat4> = Vec::with_capacity(self.skeleton.len());
        for (joint, rot) in self.skeleton.joints.iter().zip(&self.current) {
            let local = Mat4::from_rotation_translation(Quat::from_euler(EulerRot::XYZ, rot.x, rot.y, rot.z), joint.offset);
            let parent = joint.parent.and_then(|p| world.get(p).copied()).unwrap_or(root);
            world.push(parent * local);
        }
        world
    }

    // ========================================================================
    // TARGETS
    // ========================================================================

    fn joint_index(&self, name: &str) -> Result<usize, GameError> {
        self.skeleton
            .find(name)
            .ok_or_else(|| GameError::InvariantViolation(format!("skeleton has no joint '{}'", name)))
    }

    fn set_target(&mut self, name: &str, axis: Axis, value: f32) {
        let idx = match self.joint_index(name) {
            Ok(idx) => idx,
            Err(err) => {
                if self.warned.insert(name.to_string()) {
                    log::warn!("Skipping animation target: {}", err);
                }
                return;
            }
        };
        let target = self.targets.entries.entry(idx).or_insert(Vec3::ZERO);
        match axis {
            Axis::X => target.x = value,
            Axis::Y => target.y = value,
            Axis::Z => target.z = value,
        }
    }

    fn apply_targets(&mut self) {
        let factor = self.blend_factor();
        for (&idx, target) in &self.targets.entries {
            let goal = self.skeleton.joints[idx].rest + *target;
            self.current[idx] = self.current[idx].lerp(goal, factor);
        }
        self.targets.entries.clear();
    }

    // ========================================================================
    // POSES
    // ========================================================================

    fn pose_idle(&mut self, t: f32) {
        let bob = (t * 2.0).sin() * 0.08;
        self.set_target("Spine", Axis::X, bob);

        let breathing = (t * 3.0).sin() * 0.03;
        self.set_target("Spine1", Axis::Y, breathing);

        let arms = (t * 1.5).sin() * 0.1;
        self.set_target("LeftArm", Axis::X, arms);
        self.set_target("RightArm", Axis::X, -arms);

        // Looking around.
        self.set_target("Head", Axis::Y, (t * 1.3).sin());
        self.set_target("Neck", Axis::Y, t.sin() * 0.05);
    }

    fn pose_walk(&mut self, t: f32) {
        let cycle = (t * 4.0).sin();

        self.set_target("LeftUpLeg", Axis::X, cycle * 0.6);
        self.set_target("RightUpLeg", Axis::X, -cycle * 0.6);

        let knee = (cycle * 0.5).max(0.0);
        self.set_target("LeftLeg", Axis::X, -knee);
        self.set_target("RightLeg", Axis::X, -knee);

        // Opposite to the legs.
        let arms = cycle * 0.4;
        self.set_target("LeftArm", Axis::Z, -arms * 0.5);
        self.set_target("RightArm", Axis::Z, arms * 0.5);

        self.set_target("Spine", Axis::X, (t * 8.0).sin().abs() * 0.03);
    }

    fn pose_sprint(&mut self, t: f32) {
        let cycle = (t * 6.0).sin();

        self.set_target("LeftUpLeg", Axis::X, cycle);
        self.set_target("RightUpLeg", Axis::X, -cycle);

        let knee = (cycle * 1.5).max(0.0);
        self.set_target("LeftLeg", Axis::X, -knee);
        self.set_target("RightLeg", Axis::X, -knee);

        let arms = cycle * 0.8;
        self.set_target("LeftArm", Axis::Z, arms * 0.7);
        self.set_target("RightArm", Axis::Z, arms * 0.7);

        let elbow = (cycle * 0.8).max(0.0);
        self.set_target("LeftForeArm", Axis::Z, elbow);
        self.set_target("RightForeArm", Axis::Z, -elbow);

        self.set_target("Spine1", Axis::X, (t * 12.0).sin().abs() * 0.05);
        self.set_target("Spine", Axis::X, -0.1);

        let sway = cycle * 0.15;
        self.set_target("Spine2", Axis::Y, sway);

        let twist = cycle * 0.2;
        self.set_target("LeftShoulder", Axis::Z, twist);
        self.set_target("RightShoulder", Axis::Z, -twist);

        self.set_target("Hips", Axis::Y, sway);
        self.set_target("Hips", Axis::Z, sway * 0.5);

        self.set_target("Head", Axis::X, (t * 6.0).sin() * 0.05);
        self.set_target("Neck", Axis::Y, sway * 0.3);
    }

    fn pose_jump(&mut self) {
        self.set_target("LeftArm", Axis::X, -0.8);
        self.set_target("RightArm", Axis::X, -0.8);

        self.set_target("LeftForeArm", Axis::Z, 10.0);
        self.set_target("RightForeArm", Axis::Z, 0.6);

        self.set_target("LeftUpLeg", Axis::X, 0.48);
        self.set_target("LeftLeg", Axis::X, -1.2);
        self.set_target("RightUpLeg", Axis::X, 0.48);
        self.set_target("RightLeg", Axis::X, -1.2);

        self.set_target("Spine", Axis::X, -0.3);
    }

    fn pose_drown(&mut self, t: f32) {
        // Arms up and thrashing out of phase.
        let flail = (t * 8.0).sin() * 0.4;
        self.set_target("LeftArm", Axis::X, -1.4 + flail);
        self.set_target("RightArm", Axis::X, -1.4 - flail);

        let wrist = (t * 10.0).sin() * 0.5;
        self.set_target("LeftForeArm", Axis::Z, wrist);
        self.set_target("RightForeArm", Axis::Z, -wrist);

        self.set_target("Head", Axis::X, -0.4);
        self.set_target("Neck", Axis::X, -0.2);
        self.set_target("Spine", Axis::X, -0.25);

        let kick = (t * 5.0).sin() * 0.3;
        self.set_target("LeftUpLeg", Axis::X, kick);
        self.set_target("RightUpLeg", Axis::X, -kick);
    }
}
