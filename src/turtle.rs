//! Turtle state and operations for 3D interpretation.

use crate::error::{Error, Result};
use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Default maximum number of saved poses.
pub const DEFAULT_MAX_STACK_DEPTH: usize = 1024;

/// Position and orientation of the turtle.
///
/// In turtle-local space the heading is `+X`, left is `+Y` and up is `+Z`.
/// The default pose places the turtle at the origin with heading `+Z`,
/// left `-Y` and up `+X` in world space, so trees grow along world `+Z`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurtleState {
    /// Current world-space position of the "cursor".
    pub position: Vec3,

    /// Current world-space orientation.
    pub rotation: Quat,
}

impl Default for TurtleState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::from_mat3(&Mat3::from_cols(Vec3::Z, Vec3::NEG_Y, Vec3::X)),
        }
    }
}

impl TurtleState {
    /// Returns the turtle's local heading direction (X-axis) in world space.
    pub fn heading(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Returns the turtle's local left direction (Y-axis) in world space.
    pub fn left(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Returns the turtle's local up direction (Z-axis) in world space.
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    /// Rotates the turtle around its local X axis by `angle` radians (Roll).
    pub fn rotate_local_x(&mut self, angle: f32) {
        self.rotate_local(Vec3::X, angle);
    }

    /// Rotates the turtle around its local Y axis by `angle` radians (Pitch).
    pub fn rotate_local_y(&mut self, angle: f32) {
        self.rotate_local(Vec3::Y, angle);
    }

    /// Rotates the turtle around its local Z axis by `angle` radians (Yaw).
    pub fn rotate_local_z(&mut self, angle: f32) {
        self.rotate_local(Vec3::Z, angle);
    }

    // Renormalized so long strings of turns don't drift off the unit sphere.
    fn rotate_local(&mut self, axis: Vec3, angle: f32) {
        let rot = Quat::from_axis_angle(axis, angle);
        self.rotation = (self.rotation * rot).normalize();
    }
}

/// A turtle pose plus its save/restore stack.
///
/// Owned by one interpretation pass; nothing else mutates it.
#[derive(Clone, Debug)]
pub struct Turtle {
    state: TurtleState,
    stack: Vec<TurtleState>,
    max_stack_depth: usize,
}

impl Default for Turtle {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_STACK_DEPTH)
    }
}

impl Turtle {
    /// A turtle in the default pose whose stack holds at most `max_stack_depth` poses.
    pub fn new(max_stack_depth: usize) -> Self {
        Self::from_state(TurtleState::default(), max_stack_depth)
    }

    pub fn from_state(state: TurtleState, max_stack_depth: usize) -> Self {
        Self {
            state,
            stack: Vec::new(),
            max_stack_depth,
        }
    }

    pub fn state(&self) -> &TurtleState {
        &self.state
    }

    pub fn position(&self) -> Vec3 {
        self.state.position
    }

    pub fn rotation(&self) -> Quat {
        self.state.rotation
    }

    /// Number of poses currently saved.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Translates the turtle by `distance` along its current heading.
    pub fn move_forward(&mut self, distance: f32) {
        self.state.position += self.state.heading() * distance;
    }

    /// Turns around the local up axis.
    pub fn yaw(&mut self, angle: f32) {
        self.state.rotate_local_z(angle);
    }

    /// Turns around the local left axis.
    pub fn pitch(&mut self, angle: f32) {
        self.state.rotate_local_y(angle);
    }

    /// Turns around the local heading axis.
    pub fn roll(&mut self, angle: f32) {
        self.state.rotate_local_x(angle);
    }

    /// Saves the full pose.
    pub fn push(&mut self) -> Result<()> {
        if self.stack.len() >= self.max_stack_depth {
            return Err(Error::StackOverflow {
                depth: self.max_stack_depth,
                index: None,
            });
        }
        self.stack.push(self.state);
        Ok(())
    }

    /// Restores the most recently saved pose.
    pub fn pop(&mut self) -> Result<()> {
        self.state = self
            .stack
            .pop()
            .ok_or(Error::StackUnderflow { index: None })?;
        Ok(())
    }
}

/// Operations that a command symbol can map to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TurtleOp {
    /// Move forward one step while drawing (`F`, `G`). Consecutive forwards coalesce.
    Forward,
    /// Move forward one step without drawing (`f`).
    Move,
    /// Rotate around local up by `sign * angle` (`+`/`-`).
    Yaw(f32),
    /// Rotate around local left by `sign * angle` (`^`/`v`).
    Pitch(f32),
    /// Rotate around local heading by `sign * angle` (`>`/`<`).
    Roll(f32),
    /// Turn 180 degrees around local up (`|`).
    TurnAround,
    /// Save the turtle pose onto the stack (`[`).
    Push,
    /// Restore the most recently pushed pose (`]`).
    Pop,
    /// Recognized symbol with no turtle meaning, e.g. a grammar variable.
    Ignore,
}

impl TurtleOp {
    /// Applies a non-drawing op to `turtle`. `angle` is the configured turn angle.
    ///
    /// `Forward` is handled by the interpreter, which accumulates runs; here it
    /// behaves like `Move` with distance `step`.
    pub fn apply(self, turtle: &mut Turtle, step: f32, angle: f32) -> Result<()> {
        match self {
            Self::Forward | Self::Move => turtle.move_forward(step),
            Self::Yaw(s) => turtle.yaw(angle * s),
            Self::Pitch(s) => turtle.pitch(angle * s),
            Self::Roll(s) => turtle.roll(angle * s),
            Self::TurnAround => turtle.yaw(PI),
            Self::Push => turtle.push()?,
            Self::Pop => turtle.pop()?,
            Self::Ignore => {}
        }
        Ok(())
    }
}
