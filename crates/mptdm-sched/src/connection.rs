//! Connection-level state seen by the scheduler.

use crate::error::Error;
use crate::path::{Path, PathIndex, MAX_PATHS};
use crate::segment::Segment;
use std::collections::VecDeque;

/// Which queue a segment was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentSource {
    /// Head of the normal send queue (first transmission).
    Send,

    /// Head of the reinjection queue.
    Reinject,
}

/// Connection-wide flags.
#[derive(Debug, Clone, Default)]
pub struct MetaState {
    /// The peer has shut down its sending side.
    pub rcv_shutdown: bool,

    /// Path on which the peer's data-fin arrived.
    pub dfin_path_index: Option<PathIndex>,

    /// Fallback to an infinite mapping is in effect.
    pub infinite_mapping_snd: bool,

    /// Fallback to an infinite mapping has been requested.
    pub send_infinite_mapping: bool,
}

impl MetaState {
    /// Degraded single-path mode: data is sent strictly in order.
    pub fn in_fallback(&self) -> bool {
        self.infinite_mapping_snd || self.send_infinite_mapping
    }
}

/// One multipath connection: its paths and its outgoing queues.
#[derive(Debug, Clone, Default)]
pub struct Connection {
    pub(crate) meta: MetaState,
    pub(crate) paths: Vec<Path>,
    pub(crate) send_queue: VecDeque<Segment>,
    pub(crate) reinject_queue: VecDeque<Segment>,
}

impl Connection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn meta(&self) -> &MetaState {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut MetaState {
        &mut self.meta
    }

    pub fn in_fallback(&self) -> bool {
        self.meta.in_fallback()
    }

    /// Add a path. Paths are scanned newest first.
    pub fn add_path(&mut self, path: Path) -> Result<(), Error> {
        if self.path(path.index()).is_some() {
            return Err(Error::Path(format!("path {} already exists", path.index())));
        }
        if self.paths.len() >= usize::from(MAX_PATHS) {
            return Err(Error::Path(format!("connection already has {} paths", MAX_PATHS)));
        }
        self.paths.insert(0, path);
        Ok(())
    }

    /// Remove a path, returning its last state.
    pub fn remove_path(&mut self, index: PathIndex) -> Option<Path> {
        let pos = self.paths.iter().position(|path| path.index() == index)?;
        Some(self.paths.remove(pos))
    }

    pub fn path(&self, index: PathIndex) -> Option<&Path> {
        self.paths.iter().find(|path| path.index() == index)
    }

    pub fn path_mut(&mut self, index: PathIndex) -> Option<&mut Path> {
        self.paths.iter_mut().find(|path| path.index() == index)
    }

    /// Paths in scan order.
    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    pub fn paths_mut(&mut self) -> impl Iterator<Item = &mut Path> {
        self.paths.iter_mut()
    }

    pub fn push_send(&mut self, segment: Segment) {
        self.send_queue.push_back(segment);
    }

    pub fn push_reinject(&mut self, segment: Segment) {
        self.reinject_queue.push_back(segment);
    }

    pub fn send_queue(&self) -> &VecDeque<Segment> {
        &self.send_queue
    }

    pub fn reinject_queue(&self) -> &VecDeque<Segment> {
        &self.reinject_queue
    }

    /// Pop the head of the given queue once it has been handed to a path.
    pub fn dequeue(&mut self, source: SegmentSource) -> Option<Segment> {
        match source {
            SegmentSource::Send => self.send_queue.pop_front(),
            SegmentSource::Reinject => self.reinject_queue.pop_front(),
        }
    }
}
