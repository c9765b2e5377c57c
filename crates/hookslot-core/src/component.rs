//! Wrapping render functions into hook-capable component types.
//!
//! [`use_hooks`] turns a render function into a [`HookComponent`]. The host
//! creates one [`HookInstance`] per mounted occurrence; each instance owns its
//! hook slots and effect chain, renders through [`HookInstance::render`] and
//! receives lifecycle points through the [`Mountable`], [`Updatable`] and
//! [`Unmountable`] capabilities. Components carry named static values and
//! instances accept a forwarded ref, so a wrapped function can stand in for any
//! other component type of the host.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::collections::map::HashMap;
use crate::context::{ContextHost, CONTEXT_PROTOCOL_VERSION};
use crate::effect::{self, EffectChain, EffectRecord, PanicPayload};
use crate::imperative::RefTarget;
use crate::platform::{
    DefaultScheduler, InstanceId, Mountable, RenderScheduler, RenderTrigger, Unmountable,
    Updatable,
};
use crate::session::RenderSession;
use crate::slot_store::{HookKind, HookRecord, HookSlots};
use crate::HookError;

type RenderFn<P, O> = dyn Fn(&RenderSession, &P) -> O;
type Statics = HashMap<&'static str, Rc<dyn Any>>;
type LifecyclePass = fn(InstanceId, &[Rc<RefCell<EffectRecord>>]) -> Option<PanicPayload>;

/// Lifecycle position of an instance as reported by its host.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LifecyclePhase {
    Created,
    Mounted,
    Unmounted,
}

/// Host capabilities an instance is bound to at creation.
#[derive(Clone)]
pub struct HostBindings {
    scheduler: Rc<dyn RenderScheduler>,
    context: Option<Rc<dyn ContextHost>>,
}

impl HostBindings {
    pub fn new(scheduler: Rc<dyn RenderScheduler>) -> Self {
        Self {
            scheduler,
            context: None,
        }
    }

    /// Bindings whose re-render requests go nowhere.
    pub fn detached() -> Self {
        Self::new(Rc::new(DefaultScheduler))
    }

    pub fn with_context(mut self, host: Rc<dyn ContextHost>) -> Self {
        self.context = Some(host);
        self
    }
}

impl Default for HostBindings {
    fn default() -> Self {
        Self::detached()
    }
}

pub(crate) struct InstanceCore {
    pub(crate) id: InstanceId,
    pub(crate) slots: RefCell<HookSlots>,
    pub(crate) effects: RefCell<EffectChain>,
    pub(crate) phase: Cell<LifecyclePhase>,
    pub(crate) rendering: Cell<bool>,
    pub(crate) trigger: RenderTrigger,
    pub(crate) context: Option<Rc<dyn ContextHost>>,
    pub(crate) forwarded_ref: RefCell<Option<Rc<dyn Any>>>,
    live: Rc<Cell<bool>>,
    in_pass: Cell<bool>,
    update_deferred: Cell<bool>,
}

impl InstanceCore {
    fn new(bindings: &HostBindings) -> Self {
        let id = InstanceId::next();
        let live = Rc::new(Cell::new(true));
        Self {
            id,
            slots: RefCell::new(HookSlots::default()),
            effects: RefCell::new(EffectChain::default()),
            phase: Cell::new(LifecyclePhase::Created),
            rendering: Cell::new(false),
            trigger: RenderTrigger::new(id, Rc::clone(&bindings.scheduler), &live),
            context: bindings.context.clone(),
            forwarded_ref: RefCell::new(None),
            live,
            in_pass: Cell::new(false),
            update_deferred: Cell::new(false),
        }
    }

    /// Put a fresh record into `slot`.
    ///
    /// A displaced effect leaves the effect chain too, so its stored unwind
    /// runs right away when the record drops. Dropping happens after every
    /// borrow is released.
    pub(crate) fn replace_slot(&self, slot: usize, kind: HookKind, record: HookRecord) {
        let displaced = {
            let mut slots = self.slots.borrow_mut();
            slots.note_reinit(slot, kind);
            slots.install(slot, record)
        };
        let retired = match &displaced {
            Some(HookRecord::Effect(_)) => self.effects.borrow_mut().remove(slot),
            _ => None,
        };
        drop(retired);
        drop(displaced);
    }

    /// Run `pass` over the effect chain, then any update pass that was
    /// requested while it ran. Nested passes would interleave unwinds and
    /// effects of the same record.
    fn run_lifecycle_pass(&self, pass: LifecyclePass) {
        self.in_pass.set(true);
        let mut pass = pass;
        let mut first_panic = None;
        loop {
            let records = self.effects.borrow().snapshot();
            if let Some(payload) = pass(self.id, &records) {
                first_panic.get_or_insert(payload);
            }
            if !self.update_deferred.replace(false)
                || self.phase.get() != LifecyclePhase::Mounted
            {
                break;
            }
            log::debug!("running deferred update pass for instance {}", self.id);
            pass = effect::run_update_pass;
        }
        self.in_pass.set(false);
        effect::resume(first_panic);
    }
}

impl Drop for InstanceCore {
    fn drop(&mut self) {
        if self.phase.get() == LifecyclePhase::Unmounted || self.effects.get_mut().is_empty() {
            return;
        }
        log::debug!("instance {} dropped without unmount; running unwinds", self.id);
        let records = self.effects.get_mut().take_all();
        if effect::run_unmount_pass(self.id, &records).is_some() {
            log::warn!(
                "discarding unwind panic of instance {} dropped without unmount",
                self.id
            );
        }
    }
}

/// A render function wrapped into a component type.
pub struct HookComponent<P, O> {
    render: Rc<RenderFn<P, O>>,
    display_name: Rc<str>,
    statics: Rc<Statics>,
}

impl<P, O> Clone for HookComponent<P, O> {
    fn clone(&self) -> Self {
        Self {
            render: Rc::clone(&self.render),
            display_name: Rc::clone(&self.display_name),
            statics: Rc::clone(&self.statics),
        }
    }
}

/// Wrap `render` into a component type whose instances may call hooks.
pub fn use_hooks<P, O, F>(render: F) -> HookComponent<P, O>
where
    F: Fn(&RenderSession, &P) -> O + 'static,
{
    HookComponent {
        render: Rc::new(render),
        display_name: Rc::from(std::any::type_name::<F>()),
        statics: Rc::new(Statics::default()),
    }
}

impl<P, O> HookComponent<P, O> {
    pub fn with_display_name(mut self, name: impl Into<Rc<str>>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Attach a named static value to the component type.
    pub fn with_static<T: 'static>(mut self, name: &'static str, value: T) -> Self {
        Rc::make_mut(&mut self.statics).insert(name, Rc::new(value));
        self
    }

    /// Copy every static of `other` that this component does not define yet.
    pub fn forward_statics_from<Q, R>(mut self, other: &HookComponent<Q, R>) -> Self {
        let statics = Rc::make_mut(&mut self.statics);
        for (name, value) in other.statics.iter() {
            statics.entry(*name).or_insert_with(|| Rc::clone(value));
        }
        self
    }

    pub fn static_value<T: 'static>(&self, name: &str) -> Option<&T> {
        self.statics.get(name)?.downcast_ref::<T>()
    }

    pub fn static_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.statics.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Create an instance bound to the host capabilities in `bindings`.
    ///
    /// Fails fast if the bound context host speaks another protocol version.
    pub fn instantiate(&self, bindings: &HostBindings) -> Result<HookInstance<P, O>, HookError> {
        if let Some(host) = &bindings.context {
            let found = host.protocol_version();
            if found != CONTEXT_PROTOCOL_VERSION {
                return Err(HookError::UnsupportedContextHost {
                    found,
                    expected: CONTEXT_PROTOCOL_VERSION,
                });
            }
        }
        let core = Rc::new(InstanceCore::new(bindings));
        log::debug!(
            "created instance {} of {}",
            core.id,
            self.display_name.as_ref()
        );
        Ok(HookInstance {
            component: self.clone(),
            core,
        })
    }
}

impl<P, O> fmt::Debug for HookComponent<P, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookComponent")
            .field("display_name", &self.display_name)
            .field("statics", &self.static_names())
            .finish()
    }
}

/// One rendering instance of a [`HookComponent`].
pub struct HookInstance<P, O> {
    component: HookComponent<P, O>,
    core: Rc<InstanceCore>,
}

impl<P, O> HookInstance<P, O> {
    pub fn id(&self) -> InstanceId {
        self.core.id
    }

    pub fn component(&self) -> &HookComponent<P, O> {
        &self.component
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.core.phase.get()
    }

    pub fn render_trigger(&self) -> RenderTrigger {
        self.core.trigger.clone()
    }

    /// Run the render function under a fresh session.
    pub fn render(&self, props: &P) -> Result<O, HookError> {
        let core = &self.core;
        if core.phase.get() == LifecyclePhase::Unmounted {
            return Err(HookError::InstanceUnmounted { instance: core.id });
        }
        if core.rendering.replace(true) {
            return Err(HookError::ReentrantRender { instance: core.id });
        }
        let (session, _guard) = RenderSession::begin(core);
        Ok((self.component.render)(&session, props))
    }

    /// Set or clear the ref the host forwards to this instance.
    pub fn set_forwarded_ref<H: 'static>(&self, target: Option<RefTarget<H>>) {
        *self.core.forwarded_ref.borrow_mut() =
            target.map(|target| Rc::new(target) as Rc<dyn Any>);
    }

    pub fn slot_count(&self) -> usize {
        self.core.slots.borrow().len()
    }

    /// Kinds of the filled slots, in slot order.
    pub fn debug_slot_kinds(&self) -> Vec<(usize, HookKind)> {
        self.core.slots.borrow().kinds()
    }
}

impl<P, O> Mountable for HookInstance<P, O> {
    fn did_mount(&self) {
        let core = &self.core;
        if core.phase.get() != LifecyclePhase::Created {
            log::warn!(
                "did_mount on instance {} in phase {:?}; ignoring",
                core.id,
                core.phase.get()
            );
            return;
        }
        core.phase.set(LifecyclePhase::Mounted);
        log::debug!("mount pass for instance {}", core.id);
        core.run_lifecycle_pass(effect::run_mount_pass);
    }
}

impl<P, O> Updatable for HookInstance<P, O> {
    fn did_update(&self) {
        let core = &self.core;
        match core.phase.get() {
            LifecyclePhase::Mounted => {}
            LifecyclePhase::Created => {
                log::warn!(
                    "did_update on instance {} before did_mount; mounting instead",
                    core.id
                );
                self.did_mount();
                return;
            }
            LifecyclePhase::Unmounted => {
                log::warn!("did_update on unmounted instance {}; ignoring", core.id);
                return;
            }
        }
        if core.in_pass.get() {
            log::debug!(
                "did_update on instance {} during a lifecycle pass; deferring",
                core.id
            );
            core.update_deferred.set(true);
            return;
        }
        log::debug!("update pass for instance {}", core.id);
        core.run_lifecycle_pass(effect::run_update_pass);
    }
}

impl<P, O> Unmountable for HookInstance<P, O> {
    fn will_unmount(&self) {
        let core = &self.core;
        if core.phase.replace(LifecyclePhase::Unmounted) == LifecyclePhase::Unmounted {
            return;
        }
        core.live.set(false);
        let records = core.effects.borrow_mut().take_all();
        log::debug!("unmount pass for instance {}", core.id);
        let panic = effect::run_unmount_pass(core.id, &records);
        drop(records);
        let slots = core.slots.borrow_mut().take_all();
        drop(slots);
        core.forwarded_ref.borrow_mut().take();
        effect::resume(panic);
    }
}

impl<P, O> fmt::Debug for HookInstance<P, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookInstance")
            .field("id", &self.core.id)
            .field("component", &self.component.display_name())
            .field("phase", &self.core.phase.get())
            .field("slots", &self.slot_count())
            .finish()
    }
}
