//! Scheduler plugin interface and registry.

use crate::connection::{Connection, SegmentSource};
use crate::error::Error;
use crate::path::PathIndex;
use crate::segment::Segment;
use crate::tdm::TdmScheduler;
use std::num::NonZeroU32;
use std::sync::Arc;

/// A scheduling decision: send `segment` from `source` on `path`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scheduled {
    /// The segment, as it is after scheduling (its path mask may have been
    /// cleared).
    pub segment: Segment,

    /// Queue the segment was taken from.
    pub source: SegmentSource,

    /// Path that should carry it.
    pub path: PathIndex,

    /// Maximum number of bytes for this burst. 0 means no cap.
    pub limit: u32,
}

impl Scheduled {
    /// The byte cap, or `None` when the burst is unlimited.
    pub fn byte_limit(&self) -> Option<NonZeroU32> {
        NonZeroU32::new(self.limit)
    }
}

/// Interface between a host transport and a path scheduler.
///
/// Calls for the same connection are serialized by the `&mut Connection`
/// borrow; one scheduler may serve many connections concurrently.
pub trait MultipathScheduler: Send + Sync {
    /// Name the scheduler is registered under.
    fn name(&self) -> &'static str;

    /// Find an available path for `segment`, or for any data if `None`.
    fn get_subflow(
        &self,
        conn: &Connection,
        segment: Option<&mut Segment>,
        zero_window_test: bool,
    ) -> Option<PathIndex>;

    /// Decide what to send next and where. `None` means "try again later".
    fn next_segment(&self, conn: &mut Connection) -> Option<Scheduled>;
}

/// Schedulers available by name.
#[derive(Default)]
pub struct SchedulerRegistry {
    schedulers: Vec<Arc<dyn MultipathScheduler>>,
}

impl SchedulerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry containing the built-in `tdm` scheduler with default tunables.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.schedulers.push(Arc::new(TdmScheduler::default()));
        registry
    }

    /// Add a scheduler. Names must be unique.
    pub fn register(&mut self, scheduler: Arc<dyn MultipathScheduler>) -> Result<(), Error> {
        let name = scheduler.name();
        if self.find(name).is_some() {
            return Err(Error::AlreadyRegistered {
                name: name.to_string(),
            });
        }
        tracing::debug!("registered scheduler {}", name);
        self.schedulers.push(scheduler);
        Ok(())
    }

    /// Remove a scheduler. Returns whether it was registered.
    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.schedulers.len();
        self.schedulers.retain(|scheduler| scheduler.name() != name);
        before != self.schedulers.len()
    }

    pub fn find(&self, name: &str) -> Option<Arc<dyn MultipathScheduler>> {
        self.schedulers
            .iter()
            .find(|scheduler| scheduler.name() == name)
            .cloned()
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.schedulers.iter().map(|scheduler| scheduler.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tdm() {
        let registry = SchedulerRegistry::with_builtin();
        assert_eq!(registry.names(), vec!["tdm"]);
        assert!(registry.find("tdm").is_some());
        assert!(registry.find("minrtt").is_none());
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut registry = SchedulerRegistry::with_builtin();
        let err = registry
            .register(Arc::new(TdmScheduler::default()))
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyRegistered { ref name } if name == "tdm"));
    }

    #[test]
    fn unregister() {
        let mut registry = SchedulerRegistry::with_builtin();
        assert!(registry.unregister("tdm"));
        assert!(!registry.unregister("tdm"));
        assert!(registry.names().is_empty());
        registry.register(Arc::new(TdmScheduler::default())).unwrap();
        assert_eq!(registry.names(), vec!["tdm"]);
    }

    #[test]
    fn unlimited_sentinel() {
        let scheduled = Scheduled {
            segment: Segment::new(0, 10),
            source: SegmentSource::Reinject,
            path: PathIndex::new(1).unwrap(),
            limit: 0,
        };
        assert!(scheduled.byte_limit().is_none());
        let capped = Scheduled {
            limit: 2000,
            ..scheduled
        };
        assert_eq!(capped.byte_limit().map(NonZeroU32::get), Some(2000));
    }
}
