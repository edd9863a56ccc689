//! Cylinder segments and their grouping by length.
//!
//! A [`CylinderSegment`] is one coalesced forward run of the turtle. Segments
//! of equal length share one cylinder template, so [`SegmentGroups`] buckets
//! them by [`LengthKey`] in first-seen order and each group can be
//! instanced from a single mesh.

use crate::error::{Error, Result};
use bevy_math::primitives::{Cylinder, Measured3d};
use glam::{Quat, Vec3};
use indexmap::IndexMap;
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Two-valued classification tag for emitted segments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Material {
    Branch,
    Leaf,
}

impl Material {
    /// `Branch` if `length` is strictly greater than `threshold`, otherwise `Leaf`.
    pub fn classify(length: f32, threshold: f32) -> Self {
        if length > threshold {
            Self::Branch
        } else {
            Self::Leaf
        }
    }
}

/// One straight run of the turtle, reduced to a single cylinder.
///
/// This is the record handed to external scene builders:
/// `{"from": [x, y, z], "to": [x, y, z], "radius", "material", "length"}`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CylinderSegment {
    /// Turtle position at the start of the run.
    pub from: Vec3,

    /// Turtle position at the end of the run.
    pub to: Vec3,

    pub radius: f32,

    pub material: Material,

    /// Sum of the step distances of the run. Not recomputed from `from`/`to`.
    pub length: f32,
}

impl CylinderSegment {
    /// Unit vector from `from` to `to`, or `None` for a degenerate segment.
    pub fn direction(&self) -> Option<Vec3> {
        (self.to - self.from).try_normalize()
    }

    pub fn midpoint(&self) -> Vec3 {
        self.from.lerp(self.to, 0.5)
    }

    pub fn euclidean_length(&self) -> f32 {
        self.from.distance(self.to)
    }

    /// The template primitive for this segment, aligned along +Y as Bevy meshes are.
    pub fn template(&self) -> Cylinder {
        Cylinder::new(self.radius, self.length)
    }

    /// World transform that places [`template`](Self::template) onto this segment.
    ///
    /// Translation is the midpoint; rotation carries +Y onto the segment direction.
    pub fn instance_transform(&self) -> (Vec3, Quat) {
        let rotation = self
            .direction()
            .map_or(Quat::IDENTITY, |dir| Quat::from_rotation_arc(Vec3::Y, dir));
        (self.midpoint(), rotation)
    }

    pub fn volume(&self) -> f32 {
        self.template().volume()
    }
}

/// Group key: an `f32` length compared by bit pattern.
///
/// Exact float equality is the grouping contract; near-equal lengths (from
/// jitter or rounding) land in different groups unless a quantized
/// [`GroupingPolicy`] is used.
#[derive(Clone, Copy, Debug)]
pub struct LengthKey(f32);

impl LengthKey {
    pub fn new(length: f32) -> Self {
        // -0.0 and 0.0 share a group.
        Self(if length == 0.0 { 0.0 } else { length })
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

impl PartialEq for LengthKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for LengthKey {}

impl Hash for LengthKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl fmt::Display for LengthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Shortest representation that parses back to the same f32.
        write!(f, "{}", self.0)
    }
}

impl FromStr for LengthKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<f32>()
            .map(Self::new)
            .map_err(|e| Error::Serialization(format!("invalid length key '{s}': {e}")))
    }
}

/// How segment lengths map to group keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GroupingPolicy {
    /// One group per bit-identical length.
    #[default]
    Exact,
    /// Lengths are rounded to the nearest multiple of `step` before grouping.
    Quantized { step: f32 },
}

impl GroupingPolicy {
    pub fn key_for(self, length: f32) -> LengthKey {
        match self {
            Self::Exact => LengthKey::new(length),
            Self::Quantized { step } => LengthKey::new((length / step).round() * step),
        }
    }

    pub fn validate(self) -> Result<()> {
        match self {
            Self::Quantized { step } if !(step.is_finite() && step > 0.0) => Err(
                Error::InvalidConfig(format!("quantized grouping step must be positive, got {step}")),
            ),
            _ => Ok(()),
        }
    }
}

/// Segments organized by length for instancing.
///
/// Keys follow first-encounter order; within a group, segments keep emission
/// order. A renderer builds one template per key and instantiates it per
/// segment.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SegmentGroups {
    groups: IndexMap<LengthKey, Vec<CylinderSegment>>,
}

/// Groups `segments` by exact length.
pub fn group_by_length(segments: &[CylinderSegment]) -> SegmentGroups {
    SegmentGroups::from_segments(segments, GroupingPolicy::Exact)
}

impl SegmentGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: &[CylinderSegment], policy: GroupingPolicy) -> Self {
        let mut groups = Self::new();
        for segment in segments {
            groups.insert(policy.key_for(segment.length), *segment);
        }
        groups
    }

    /// Appends `segment` to the group for `key`, creating the group if needed.
    pub fn insert(&mut self, key: LengthKey, segment: CylinderSegment) {
        self.groups.entry(key).or_default().push(segment);
    }

    /// Number of distinct lengths.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of segments across all groups.
    pub fn segment_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn get(&self, length: f32) -> Option<&[CylinderSegment]> {
        self.groups.get(&LengthKey::new(length)).map(Vec::as_slice)
    }

    pub fn keys(&self) -> impl Iterator<Item = LengthKey> + '_ {
        self.groups.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LengthKey, &[CylinderSegment])> {
        self.groups.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// One template cylinder per group, shaped after the group's first segment.
    pub fn templates(&self) -> impl Iterator<Item = (LengthKey, Cylinder)> + '_ {
        self.groups
            .iter()
            .filter_map(|(k, v)| v.first().map(|s| (*k, s.template())))
    }

    pub fn total_volume(&self) -> f32 {
        self.groups.values().flatten().map(CylinderSegment::volume).sum()
    }

    /// Flattens the groups, group by group.
    pub fn into_segments(self) -> Vec<CylinderSegment> {
        self.groups.into_values().flatten().collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Serialize for SegmentGroups {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for (key, segments) in &self.groups {
            map.serialize_entry(&key.to_string(), segments)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SegmentGroups {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = IndexMap::<String, Vec<CylinderSegment>>::deserialize(deserializer)?;
        let mut groups = IndexMap::with_capacity(raw.len());
        for (key, segments) in raw {
            let parsed: LengthKey = key.parse().map_err(de::Error::custom)?;
            if groups.insert(parsed, segments).is_some() {
                return Err(de::Error::custom(format!("duplicate length key '{key}'")));
            }
        }
        Ok(Self { groups })
    }
}

/// Serializes segments in the flat persisted form (an array of records).
pub fn segments_to_json(segments: &[CylinderSegment]) -> Result<String> {
    Ok(serde_json::to_string(segments)?)
}

pub fn segments_from_json(json: &str) -> Result<Vec<CylinderSegment>> {
    Ok(serde_json::from_str(json)?)
}

/// Returns the `job`-th of `jobs` contiguous chunks of `segments`.
///
/// Chunks are `len / jobs` long; the last job also takes the remainder so
/// that every segment is rendered by exactly one job.
pub fn job_slice(segments: &[CylinderSegment], job: usize, jobs: usize) -> Result<&[CylinderSegment]> {
    if jobs == 0 || job >= jobs {
        return Err(Error::InvalidConfig(format!(
            "job {job} out of range for {jobs} jobs"
        )));
    }
    let chunk = segments.len() / jobs;
    let start = job * chunk;
    let stop = if job + 1 == jobs {
        segments.len()
    } else {
        start + chunk
    };
    Ok(&segments[start..stop])
}

/// Slices `segments` with optional bounds, clamped to the slice length.
pub fn segment_range(
    segments: &[CylinderSegment],
    start: Option<usize>,
    stop: Option<usize>,
) -> &[CylinderSegment] {
    let stop = stop.unwrap_or(segments.len()).min(segments.len());
    let start = start.unwrap_or(0).min(stop);
    &segments[start..stop]
}
