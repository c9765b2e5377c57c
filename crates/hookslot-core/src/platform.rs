//! Capabilities a host framework provides to the hook engine.
//!
//! The engine never renders anything itself. A host creates instances, calls
//! their render function, and reports lifecycle points through [`Mountable`],
//! [`Updatable`] and [`Unmountable`]. In the other direction the engine asks
//! the host for re-renders through a [`RenderScheduler`].

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identity of one rendering instance.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct InstanceId(u64);

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

impl InstanceId {
    pub(crate) fn next() -> Self {
        Self(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Schedules re-renders on behalf of hook state changes.
///
/// Requests are fire-and-forget: the engine makes no assumption about when,
/// or how many times, the host re-renders in response.
pub trait RenderScheduler {
    /// Ask the host to render `instance` again.
    fn schedule_render(&self, instance: InstanceId);
}

/// Scheduler that drops every request. Useful for hosts that re-render on
/// their own cadence.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultScheduler;

impl RenderScheduler for DefaultScheduler {
    fn schedule_render(&self, _instance: InstanceId) {}
}

/// Called by the host once the first render output has been committed.
pub trait Mountable {
    fn did_mount(&self);
}

/// Called by the host after each later render output has been committed.
pub trait Updatable {
    fn did_update(&self);
}

/// Called by the host right before the instance is discarded.
pub trait Unmountable {
    fn will_unmount(&self);
}

/// Re-render handle for one instance.
///
/// Requests made after the instance unmounted or was dropped are ignored.
#[derive(Clone)]
pub struct RenderTrigger {
    instance: InstanceId,
    scheduler: Rc<dyn RenderScheduler>,
    live: Weak<Cell<bool>>,
}

impl RenderTrigger {
    pub(crate) fn new(
        instance: InstanceId,
        scheduler: Rc<dyn RenderScheduler>,
        live: &Rc<Cell<bool>>,
    ) -> Self {
        Self {
            instance,
            scheduler,
            live: Rc::downgrade(live),
        }
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    pub fn is_live(&self) -> bool {
        self.live.upgrade().is_some_and(|live| live.get())
    }

    /// Forward a re-render request to the host if the instance is still live.
    pub fn request(&self) {
        if !self.is_live() {
            log::debug!(
                "ignoring re-render request for instance {} after unmount",
                self.instance
            );
            return;
        }
        self.scheduler.schedule_render(self.instance);
    }
}

impl fmt::Debug for RenderTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderTrigger")
            .field("instance", &self.instance)
            .field("live", &self.is_live())
            .finish()
    }
}
