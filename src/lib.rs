//! # symbios-arbor
//!
//! Deterministic L-System trees for instanced rendering.
//!
//! A [`Grammar`] derives a command string from an axiom, an [`Interpreter`]
//! walks it with a 3D [`Turtle`] and reduces every straight run into one
//! [`CylinderSegment`], and [`SegmentGroups`] organizes the segments by
//! length so a renderer can build one template per length and instance it.
//! The result is engine-agnostic; scene builders plug in as a [`SceneSink`].

pub mod blueprint;
pub mod cancel;
pub mod config;
pub mod error;
pub mod grammar;
pub mod interpreter;
pub mod pipeline;
pub mod sink;
pub mod turtle;

pub use blueprint::*;
pub use cancel::*;
pub use config::*;
pub use error::*;
pub use grammar::*;
pub use interpreter::*;
pub use pipeline::*;
pub use sink::*;
pub use turtle::*;
