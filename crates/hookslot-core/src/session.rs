//! Render sessions: the scope during which hook calls are valid.
//!
//! A [`RenderSession`] is created by `HookInstance::render` and handed to the
//! render function. It carries the slot cursor and a link to the rendering
//! instance. The paired [`SessionGuard`] deactivates the session when the
//! render returns or unwinds, so clones that escape the render function can no
//! longer lease slots.

use std::any::Any;
use std::cell::Cell;
use std::rc::{Rc, Weak};

use crate::component::InstanceCore;
use crate::imperative::RefTarget;
use crate::platform::{InstanceId, RenderTrigger};
use crate::HookError;

pub(crate) struct SessionInner {
    instance: Weak<InstanceCore>,
    instance_id: InstanceId,
    cursor: Cell<usize>,
    active: Cell<bool>,
}

/// Handle to one render pass of one instance. Hooks are methods on it.
#[derive(Clone)]
pub struct RenderSession {
    inner: Rc<SessionInner>,
}

/// Guard that ends the session on drop.
#[must_use = "SessionGuard ends the render session on drop"]
pub(crate) struct SessionGuard {
    session: Rc<SessionInner>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.session.active.set(false);
        if let Some(instance) = self.session.instance.upgrade() {
            instance.rendering.set(false);
        }
        log::trace!(
            "render session for instance {} ended after {} slot(s)",
            self.session.instance_id,
            self.session.cursor.get()
        );
    }
}

impl RenderSession {
    /// Start a session for `instance` with the cursor at slot 0.
    pub(crate) fn begin(instance: &Rc<InstanceCore>) -> (Self, SessionGuard) {
        let inner = Rc::new(SessionInner {
            instance: Rc::downgrade(instance),
            instance_id: instance.id,
            cursor: Cell::new(0),
            active: Cell::new(true),
        });
        log::trace!("render session for instance {} started", instance.id);
        let guard = SessionGuard {
            session: Rc::clone(&inner),
        };
        (Self { inner }, guard)
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    pub fn instance_id(&self) -> InstanceId {
        self.inner.instance_id
    }

    /// Number of slots leased so far in this pass.
    pub fn cursor(&self) -> usize {
        self.inner.cursor.get()
    }

    /// Hand out the next slot index.
    pub fn try_lease(&self) -> Result<usize, HookError> {
        self.try_lease_slot().map(|(slot, _)| slot)
    }

    /// Hand out the next slot index.
    ///
    /// # Panics
    /// Panics if the session is no longer rendering.
    pub fn lease(&self) -> usize {
        self.lease_slot().0
    }

    pub(crate) fn try_lease_slot(&self) -> Result<(usize, Rc<InstanceCore>), HookError> {
        if !self.inner.active.get() {
            return Err(HookError::NoActiveSession);
        }
        let instance = self
            .inner
            .instance
            .upgrade()
            .ok_or(HookError::NoActiveSession)?;
        let slot = self.inner.cursor.get();
        self.inner.cursor.set(slot + 1);
        log::trace!("instance {} leased hook slot {slot}", self.inner.instance_id);
        Ok((slot, instance))
    }

    pub(crate) fn lease_slot(&self) -> (usize, Rc<InstanceCore>) {
        match self.try_lease_slot() {
            Ok(leased) => leased,
            Err(err) => panic!("{err}"),
        }
    }

    /// Re-render handle of the instance being rendered.
    pub fn render_trigger(&self) -> Option<RenderTrigger> {
        self.inner
            .instance
            .upgrade()
            .map(|instance| instance.trigger.clone())
    }

    /// The ref the host passed to this instance, if it has the expected type.
    pub fn forwarded_ref<H: 'static>(&self) -> Option<RefTarget<H>> {
        let instance = self.inner.instance.upgrade()?;
        let forwarded = instance.forwarded_ref.borrow();
        let erased: &Rc<dyn Any> = forwarded.as_ref()?;
        erased.downcast_ref::<RefTarget<H>>().cloned()
    }
}

impl std::fmt::Debug for RenderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSession")
            .field("instance", &self.inner.instance_id)
            .field("cursor", &self.inner.cursor.get())
            .field("active", &self.inner.active.get())
            .finish()
    }
}
