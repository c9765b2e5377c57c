//! Effect hooks and the lifecycle passes that run them.
//!
//! Every render refreshes the effect callback stored in its slot and marks the
//! slot as pending only when its dependency list changed. Pending effects run
//! from the host's lifecycle callbacks, never during render:
//!
//! - mount: pending effects in registration order;
//! - update: pending unwinds in reverse registration order, then pending
//!   effects in registration order;
//! - unmount: every stored unwind in reverse registration order, pending or
//!   not.
//!
//! A panic in one callback does not stop the rest of the pass. The first panic
//! is resumed once the pass is done.
//!
//! `use_layout_effect` and `use_mutation_effect` share this machine. There is
//! no separate before-paint tier; all three run at the same lifecycle points.

use std::any::Any;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::deps::{changed, Deps};
use crate::platform::InstanceId;
use crate::session::RenderSession;
use crate::slot_store::{HookKind, HookRecord};

type EffectFn = Box<dyn FnOnce(EffectScope) -> EffectResult>;
type Unwind = Box<dyn FnOnce()>;
pub(crate) type PanicPayload = Box<dyn Any + Send + 'static>;

/// Argument passed to effect callbacks.
#[derive(Clone, Copy, Debug, Default)]
pub struct EffectScope;

/// What an effect leaves behind: optionally, the unwind to run before the
/// effect runs again and at unmount.
#[derive(Default)]
pub struct EffectResult {
    unwind: Option<Unwind>,
}

impl EffectScope {
    pub fn on_unwind(&self, unwind: impl FnOnce() + 'static) -> EffectResult {
        EffectResult::new(unwind)
    }

    /// Finish an effect that needs no unwind.
    pub fn done(&self) -> EffectResult {
        EffectResult::none()
    }
}

impl EffectResult {
    pub fn new(unwind: impl FnOnce() + 'static) -> Self {
        Self {
            unwind: Some(Box::new(unwind)),
        }
    }

    pub fn none() -> Self {
        Self { unwind: None }
    }

    fn into_unwind(self) -> Option<Unwind> {
        self.unwind
    }
}

pub(crate) struct EffectRecord {
    slot: usize,
    deps: Option<Deps>,
    should_run: bool,
    effect: Option<EffectFn>,
    unwind: Option<Unwind>,
}

impl EffectRecord {
    fn new(slot: usize) -> Self {
        Self {
            slot,
            deps: None,
            should_run: false,
            effect: None,
            unwind: None,
        }
    }

    fn refresh(&mut self, effect: EffectFn, deps: Option<Deps>) {
        self.effect = Some(effect);
        // A render that was never committed keeps its effect pending.
        if changed(self.deps.as_ref(), deps.as_ref()) {
            self.deps = deps;
            self.should_run = true;
        }
    }

    fn take_unwind(&mut self, force: bool) -> Option<Unwind> {
        if force || self.should_run {
            self.unwind.take()
        } else {
            None
        }
    }

    fn take_effect(&mut self) -> Option<EffectFn> {
        if !std::mem::replace(&mut self.should_run, false) {
            return None;
        }
        self.effect.take()
    }
}

impl Drop for EffectRecord {
    fn drop(&mut self) {
        // Reached when slot re-initialisation retires an effect.
        if let Some(unwind) = self.unwind.take() {
            if panic::catch_unwind(AssertUnwindSafe(unwind)).is_err() {
                log::error!("unwind of retired effect in hook slot {} panicked", self.slot);
            }
        }
    }
}

/// Effect records of one instance in slot order, one entry per effect slot.
#[derive(Default)]
pub(crate) struct EffectChain {
    records: Vec<Rc<RefCell<EffectRecord>>>,
}

impl EffectChain {
    fn register(&mut self, record: Rc<RefCell<EffectRecord>>) -> Option<Rc<RefCell<EffectRecord>>> {
        let slot = record.borrow().slot;
        let index = self
            .records
            .iter()
            .position(|entry| entry.borrow().slot >= slot)
            .unwrap_or(self.records.len());
        if self
            .records
            .get(index)
            .is_some_and(|entry| entry.borrow().slot == slot)
        {
            return Some(std::mem::replace(&mut self.records[index], record));
        }
        self.records.insert(index, record);
        None
    }

    /// Detach the record of `slot`, if that slot holds an effect.
    pub(crate) fn remove(&mut self, slot: usize) -> Option<Rc<RefCell<EffectRecord>>> {
        let index = self
            .records
            .iter()
            .position(|entry| entry.borrow().slot == slot)?;
        Some(self.records.remove(index))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn snapshot(&self) -> Vec<Rc<RefCell<EffectRecord>>> {
        self.records.clone()
    }

    pub(crate) fn take_all(&mut self) -> Vec<Rc<RefCell<EffectRecord>>> {
        std::mem::take(&mut self.records)
    }
}

fn guarded(
    instance: InstanceId,
    slot: usize,
    what: &str,
    first_panic: &mut Option<PanicPayload>,
    f: impl FnOnce(),
) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        log::error!("{what} in hook slot {slot} of instance {instance} panicked");
        first_panic.get_or_insert(payload);
    }
}

fn run_effects(
    instance: InstanceId,
    records: &[Rc<RefCell<EffectRecord>>],
    first_panic: &mut Option<PanicPayload>,
) {
    for record in records {
        let (slot, effect) = {
            let mut record = record.borrow_mut();
            (record.slot, record.take_effect())
        };
        let Some(effect) = effect else {
            continue;
        };
        guarded(instance, slot, "effect", first_panic, || {
            let unwind = effect(EffectScope).into_unwind();
            record.borrow_mut().unwind = unwind;
        });
    }
}

fn run_unwinds(
    instance: InstanceId,
    records: &[Rc<RefCell<EffectRecord>>],
    force: bool,
    first_panic: &mut Option<PanicPayload>,
) {
    for record in records.iter().rev() {
        let (slot, unwind) = {
            let mut record = record.borrow_mut();
            (record.slot, record.take_unwind(force))
        };
        if let Some(unwind) = unwind {
            guarded(instance, slot, "unwind", first_panic, unwind);
        }
    }
}

pub(crate) fn run_mount_pass(
    instance: InstanceId,
    records: &[Rc<RefCell<EffectRecord>>],
) -> Option<PanicPayload> {
    let mut first_panic = None;
    run_effects(instance, records, &mut first_panic);
    first_panic
}

pub(crate) fn run_update_pass(
    instance: InstanceId,
    records: &[Rc<RefCell<EffectRecord>>],
) -> Option<PanicPayload> {
    let mut first_panic = None;
    run_unwinds(instance, records, false, &mut first_panic);
    run_effects(instance, records, &mut first_panic);
    first_panic
}

pub(crate) fn run_unmount_pass(
    instance: InstanceId,
    records: &[Rc<RefCell<EffectRecord>>],
) -> Option<PanicPayload> {
    let mut first_panic = None;
    run_unwinds(instance, records, true, &mut first_panic);
    first_panic
}

pub(crate) fn resume(panic: Option<PanicPayload>) {
    if let Some(payload) = panic {
        panic::resume_unwind(payload);
    }
}

impl RenderSession {
    /// Register `effect` to run after commit whenever `deps` changed.
    ///
    /// `None` for `deps` runs the effect after every commit; `deps![]` runs it
    /// once after mount.
    pub fn use_effect<F>(&self, effect: F, deps: impl Into<Option<Deps>>)
    where
        F: FnOnce(EffectScope) -> EffectResult + 'static,
    {
        let (slot, core) = self.lease_slot();
        let deps = deps.into();
        let effect: EffectFn = Box::new(effect);
        if let Some(HookRecord::Effect(record)) = core.slots.borrow().get(slot) {
            record.borrow_mut().refresh(effect, deps);
            return;
        }
        let mut record = EffectRecord::new(slot);
        record.refresh(effect, deps);
        let record = Rc::new(RefCell::new(record));
        core.replace_slot(slot, HookKind::Effect, HookRecord::Effect(Rc::clone(&record)));
        let replaced = core.effects.borrow_mut().register(record);
        drop(replaced);
    }

    /// Alias of [`RenderSession::use_effect`].
    pub fn use_layout_effect<F>(&self, effect: F, deps: impl Into<Option<Deps>>)
    where
        F: FnOnce(EffectScope) -> EffectResult + 'static,
    {
        self.use_effect(effect, deps);
    }

    /// Alias of [`RenderSession::use_effect`].
    pub fn use_mutation_effect<F>(&self, effect: F, deps: impl Into<Option<Deps>>)
    where
        F: FnOnce(EffectScope) -> EffectResult + 'static,
    {
        self.use_effect(effect, deps);
    }

    /// The `value` recorded by the previous commit whose `deps` changed.
    ///
    /// Returns `None` until the first commit has happened.
    pub fn use_previous<T: Clone + 'static>(
        &self,
        value: T,
        deps: impl Into<Option<Deps>>,
    ) -> Option<T> {
        let holder = self.use_ref_with(|| None::<T>);
        let previous = holder.current();
        self.use_effect(
            move |scope| {
                holder.set_current(Some(value));
                scope.done()
            },
            deps,
        );
        previous
    }
}
