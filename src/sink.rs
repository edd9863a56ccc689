//! Scene sinks: consumers of the grouped segment model.
//!
//! The pipeline never talks to a scene graph. Anything that builds objects
//! from segments (a DCC host, a game engine, a file) implements
//! [`SceneSink`] and receives the finished [`Scene`].

use crate::blueprint::{CylinderSegment, SegmentGroups};
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

/// One finished tree as handed to a sink.
#[derive(Clone, Copy, Debug)]
pub struct Scene<'a> {
    /// Segments in emission order.
    pub segments: &'a [CylinderSegment],
    /// The same segments grouped by length.
    pub groups: &'a SegmentGroups,
    /// Optional base material name from the config.
    pub material: Option<&'a str>,
}

/// Accepts the grouped-segment model of one tree.
pub trait SceneSink {
    fn consume(&mut self, scene: &Scene<'_>) -> Result<()>;
}

/// Persisted shape of the records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RecordLayout {
    /// A single array of records.
    Flat,
    /// An object mapping stringified length to arrays of records.
    #[default]
    Grouped,
}

/// Writes segments as JSON to any writer.
pub struct JsonSink<W: Write> {
    writer: W,
    layout: RecordLayout,
    pretty: bool,
}

impl<W: Write> JsonSink<W> {
    pub fn new(writer: W, layout: RecordLayout) -> Self {
        Self {
            writer,
            layout,
            pretty: false,
        }
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut self.writer, value)?;
        } else {
            serde_json::to_writer(&mut self.writer, value)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> SceneSink for JsonSink<W> {
    fn consume(&mut self, scene: &Scene<'_>) -> Result<()> {
        tracing::debug!(
            segments = scene.segments.len(),
            lengths = scene.groups.len(),
            layout = ?self.layout,
            "writing segments"
        );
        match self.layout {
            RecordLayout::Grouped => self.write(scene.groups),
            RecordLayout::Flat => self.write(scene.segments),
        }
    }
}
