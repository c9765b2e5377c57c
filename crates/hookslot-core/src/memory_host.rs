//! In-memory host that drives hook-capable instances through their lifecycle.
//!
//! `MemoryHost` plays the part of the rendering framework: it mounts
//! instances, keeps their props and last output, queues re-render requests
//! until [`MemoryHost::flush`], and propagates context values to subscribed
//! instances. It does no reconciliation; every mounted instance is a root.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::collections::map::HashMap;
use crate::component::{HookComponent, HookInstance, HostBindings};
use crate::context::{Context, ContextHost, ContextKey, Subscription, CONTEXT_PROTOCOL_VERSION};
use crate::imperative::RefTarget;
use crate::platform::{InstanceId, Mountable, RenderScheduler, RenderTrigger, Unmountable, Updatable};
use crate::HookError;

const DEFAULT_RENDER_LIMIT: usize = 64;

trait HostedNode {
    fn rerender(&self) -> Result<(), HookError>;
    fn unmount(&self);
}

type SubscriberList = Vec<(u64, RenderTrigger)>;

struct MemoryHostInner {
    pending: RefCell<Vec<InstanceId>>,
    mounted: RefCell<HashMap<InstanceId, Rc<dyn HostedNode>>>,
    provided: RefCell<HashMap<ContextKey, Rc<dyn Any>>>,
    subscribers: RefCell<HashMap<ContextKey, SubscriberList>>,
    next_subscription: Cell<u64>,
    render_limit: Cell<usize>,
}

impl MemoryHostInner {
    fn schedule(&self, instance: InstanceId) {
        let mut pending = self.pending.borrow_mut();
        if !pending.contains(&instance) {
            pending.push(instance);
        }
    }

    fn notify(&self, key: ContextKey) {
        let triggers: Vec<RenderTrigger> = self
            .subscribers
            .borrow()
            .get(&key)
            .map(|list| list.iter().map(|(_, trigger)| trigger.clone()).collect())
            .unwrap_or_default();
        for trigger in triggers {
            trigger.request();
        }
    }
}

/// Capability object handed to instances. Holds the host weakly so mounted
/// instances do not keep it alive.
struct HostLink(Weak<MemoryHostInner>);

impl RenderScheduler for HostLink {
    fn schedule_render(&self, instance: InstanceId) {
        if let Some(inner) = self.0.upgrade() {
            inner.schedule(instance);
        }
    }
}

impl ContextHost for HostLink {
    fn protocol_version(&self) -> u32 {
        CONTEXT_PROTOCOL_VERSION
    }

    fn read(&self, key: ContextKey) -> Option<Rc<dyn Any>> {
        let inner = self.0.upgrade()?;
        let provided = inner.provided.borrow().get(&key).cloned();
        provided
    }

    fn subscribe(&self, key: ContextKey, trigger: RenderTrigger) -> Subscription {
        let Some(inner) = self.0.upgrade() else {
            return Subscription::detached();
        };
        let id = inner.next_subscription.get();
        inner.next_subscription.set(id + 1);
        inner
            .subscribers
            .borrow_mut()
            .entry(key)
            .or_default()
            .push((id, trigger));
        let weak = Weak::clone(&self.0);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                if let Some(list) = inner.subscribers.borrow_mut().get_mut(&key) {
                    list.retain(|(entry, _)| *entry != id);
                }
            }
        })
    }
}

/// Reference host for driving hook-capable instances in memory.
#[derive(Clone)]
pub struct MemoryHost {
    inner: Rc<MemoryHostInner>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(MemoryHostInner {
                pending: RefCell::new(Vec::new()),
                mounted: RefCell::new(HashMap::default()),
                provided: RefCell::new(HashMap::default()),
                subscribers: RefCell::new(HashMap::default()),
                next_subscription: Cell::new(1),
                render_limit: Cell::new(DEFAULT_RENDER_LIMIT),
            }),
        }
    }

    /// Maximum number of flush passes before [`MemoryHost::flush`] gives up.
    pub fn with_render_limit(self, limit: usize) -> Self {
        self.inner.render_limit.set(limit.max(1));
        self
    }

    /// Capabilities for instances mounted by this host.
    pub fn bindings(&self) -> HostBindings {
        let link = Rc::new(HostLink(Rc::downgrade(&self.inner)));
        HostBindings::new(link.clone()).with_context(link)
    }

    /// Instantiate, render, and mount `component` with `props`.
    pub fn mount<P: 'static, O: 'static>(
        &self,
        component: &HookComponent<P, O>,
        props: P,
    ) -> Result<Mounted<P, O>, HookError> {
        self.mount_inner(component, props, |_| {})
    }

    /// Like [`MemoryHost::mount`], forwarding `target` to the instance.
    pub fn mount_with_ref<P: 'static, O: 'static, H: 'static>(
        &self,
        component: &HookComponent<P, O>,
        props: P,
        target: RefTarget<H>,
    ) -> Result<Mounted<P, O>, HookError> {
        self.mount_inner(component, props, move |instance| {
            instance.set_forwarded_ref(Some(target));
        })
    }

    fn mount_inner<P: 'static, O: 'static>(
        &self,
        component: &HookComponent<P, O>,
        props: P,
        prepare: impl FnOnce(&HookInstance<P, O>),
    ) -> Result<Mounted<P, O>, HookError> {
        let instance = component.instantiate(&self.bindings())?;
        prepare(&instance);
        let output = instance.render(&props)?;
        let id = instance.id();
        let node = Rc::new(MountedInner {
            instance,
            props: RefCell::new(props),
            output: RefCell::new(Some(output)),
            renders: Cell::new(1),
        });
        self.inner
            .mounted
            .borrow_mut()
            .insert(id, node.clone() as Rc<dyn HostedNode>);
        log::debug!("mounted instance {id}");
        node.instance.did_mount();
        Ok(Mounted {
            host: self.clone(),
            node,
        })
    }

    /// Provide `value` for `context` and schedule every subscribed instance.
    pub fn provide<T: 'static>(&self, context: &Context<T>, value: T) {
        self.inner
            .provided
            .borrow_mut()
            .insert(context.key(), Rc::new(value));
        self.inner.notify(context.key());
    }

    /// Stop providing `context`; readers fall back to its default.
    pub fn clear_provided<T: 'static>(&self, context: &Context<T>) {
        let removed = self.inner.provided.borrow_mut().remove(&context.key());
        if removed.is_some() {
            self.inner.notify(context.key());
        }
    }

    pub fn subscriber_count<T: 'static>(&self, context: &Context<T>) -> usize {
        self.inner
            .subscribers
            .borrow()
            .get(&context.key())
            .map_or(0, Vec::len)
    }

    pub fn has_pending(&self) -> bool {
        !self.inner.pending.borrow().is_empty()
    }

    pub fn pending(&self) -> Vec<InstanceId> {
        self.inner.pending.borrow().clone()
    }

    pub fn mounted_count(&self) -> usize {
        self.inner.mounted.borrow().len()
    }

    /// Re-render every scheduled instance until no requests remain.
    ///
    /// Returns the number of renders performed.
    pub fn flush(&self) -> Result<usize, HookError> {
        let limit = self.inner.render_limit.get();
        let mut renders = 0;
        let mut passes = 0;
        loop {
            let pending = std::mem::take(&mut *self.inner.pending.borrow_mut());
            if pending.is_empty() {
                break;
            }
            let mut batch = RequeueOnExit {
                host: &self.inner,
                remaining: pending.into_iter(),
            };
            passes += 1;
            if passes > limit {
                log::warn!("render requests still pending after {limit} flush passes");
                return Err(HookError::RenderLimitExceeded { passes: limit });
            }
            while let Some(id) = batch.remaining.next() {
                let node = self.inner.mounted.borrow().get(&id).cloned();
                match node {
                    Some(node) => {
                        node.rerender()?;
                        renders += 1;
                    }
                    None => log::debug!("skipping render request for unmounted instance {id}"),
                }
            }
        }
        log::debug!("flush performed {renders} render(s) in {passes} pass(es)");
        Ok(renders)
    }

    fn unmount_id(&self, id: InstanceId) {
        self.inner.pending.borrow_mut().retain(|pending| *pending != id);
        let node = self.inner.mounted.borrow_mut().remove(&id);
        if let Some(node) = node {
            log::debug!("unmounting instance {id}");
            node.unmount();
        }
    }

    /// Unmount every mounted instance.
    pub fn unmount_all(&self) {
        let mut ids: Vec<InstanceId> = self.inner.mounted.borrow().keys().copied().collect();
        ids.sort_unstable();
        for id in ids.into_iter().rev() {
            self.unmount_id(id);
        }
    }
}

/// Puts the unprocessed part of a flush batch back in front of the queue when
/// a render fails or a lifecycle pass panics.
struct RequeueOnExit<'a> {
    host: &'a MemoryHostInner,
    remaining: std::vec::IntoIter<InstanceId>,
}

impl Drop for RequeueOnExit<'_> {
    fn drop(&mut self) {
        let unprocessed: Vec<InstanceId> = self.remaining.by_ref().collect();
        if unprocessed.is_empty() {
            return;
        }
        log::debug!("requeueing {} unprocessed render request(s)", unprocessed.len());
        let mut pending = self.host.pending.borrow_mut();
        let newer = std::mem::replace(&mut *pending, unprocessed);
        for id in newer {
            if !pending.contains(&id) {
                pending.push(id);
            }
        }
    }
}

struct MountedInner<P, O> {
    instance: HookInstance<P, O>,
    props: RefCell<P>,
    output: RefCell<Option<O>>,
    renders: Cell<usize>,
}

impl<P, O> HostedNode for MountedInner<P, O> {
    fn rerender(&self) -> Result<(), HookError> {
        let output = {
            let props = self.props.borrow();
            self.instance.render(&props)?
        };
        *self.output.borrow_mut() = Some(output);
        self.renders.set(self.renders.get() + 1);
        self.instance.did_update();
        Ok(())
    }

    fn unmount(&self) {
        self.instance.will_unmount();
    }
}

/// Handle to an instance mounted on a [`MemoryHost`].
pub struct Mounted<P, O> {
    host: MemoryHost,
    node: Rc<MountedInner<P, O>>,
}

impl<P: 'static, O: 'static> Mounted<P, O> {
    pub fn id(&self) -> InstanceId {
        self.node.instance.id()
    }

    pub fn instance(&self) -> &HookInstance<P, O> {
        &self.node.instance
    }

    pub fn render_count(&self) -> usize {
        self.node.renders.get()
    }

    pub fn with_output<R>(&self, f: impl FnOnce(Option<&O>) -> R) -> R {
        f(self.node.output.borrow().as_ref())
    }

    /// Replace the props and re-render right away.
    pub fn set_props(&self, props: P) -> Result<(), HookError> {
        *self.node.props.borrow_mut() = props;
        let id = self.id();
        self.host
            .inner
            .pending
            .borrow_mut()
            .retain(|pending| *pending != id);
        self.node.rerender()
    }

    /// Re-render with the current props.
    pub fn rerender(&self) -> Result<(), HookError> {
        self.node.rerender()
    }

    pub fn unmount(&self) {
        self.host.unmount_id(self.id());
    }
}

impl<P: 'static, O: Clone + 'static> Mounted<P, O> {
    pub fn output(&self) -> Option<O> {
        self.node.output.borrow().clone()
    }
}
