//! Standard re-render scheduling backed by Rust's `std` library.
//!
//! Hosts that run their own event loop can bind instances to a
//! [`StdScheduler`]. Every re-render request is recorded and the registered
//! waker is invoked, so the loop can wake up (possibly on another thread),
//! drain the requested instances with [`StdScheduler::take_pending`], and
//! render them on its UI thread.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use hookslot_core::{HostBindings, InstanceId, RenderScheduler};

type Waker = Arc<dyn Fn() + Send + Sync + 'static>;

struct SchedulerShared {
    render_requested: AtomicBool,
    pending: Mutex<Vec<InstanceId>>,
    waker: RwLock<Option<Waker>>,
}

/// Scheduler that records re-render requests with `std` synchronization
/// primitives. Clones share the same queue.
#[derive(Clone)]
pub struct StdScheduler {
    shared: Arc<SchedulerShared>,
}

impl StdScheduler {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(SchedulerShared {
                render_requested: AtomicBool::new(false),
                pending: Mutex::new(Vec::new()),
                waker: RwLock::new(None),
            }),
        }
    }

    /// Host bindings routing re-render requests to this scheduler.
    pub fn bindings(&self) -> HostBindings {
        HostBindings::new(Rc::new(self.clone()))
    }

    /// Returns whether a render has been requested since the last call.
    pub fn take_render_request(&self) -> bool {
        self.shared.render_requested.swap(false, Ordering::SeqCst)
    }

    /// Instances requested since the last call, in first-request order.
    pub fn take_pending(&self) -> Vec<InstanceId> {
        self.shared.render_requested.store(false, Ordering::SeqCst);
        let mut pending = self
            .shared
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *pending)
    }

    pub fn has_pending(&self) -> bool {
        !self
            .shared
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Registers a waker that will be invoked whenever a render is scheduled.
    pub fn set_render_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        *self
            .shared
            .waker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(waker));
    }

    pub fn clear_render_waker(&self) {
        *self
            .shared
            .waker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn wake(&self) {
        let waker = self
            .shared
            .waker
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl Default for StdScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdScheduler")
            .field(
                "render_requested",
                &self.shared.render_requested.load(Ordering::SeqCst),
            )
            .finish()
    }
}

impl RenderScheduler for StdScheduler {
    fn schedule_render(&self, instance: InstanceId) {
        let newly_queued = {
            let mut pending = self
                .shared
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if pending.contains(&instance) {
                false
            } else {
                pending.push(instance);
                true
            }
        };
        if !newly_queued {
            log::trace!("instance {instance} already queued for render");
            return;
        }
        self.shared.render_requested.store(true, Ordering::SeqCst);
        self.wake();
    }
}

#[cfg(test)]
#[path = "tests/std_scheduler_tests.rs"]
mod tests;
