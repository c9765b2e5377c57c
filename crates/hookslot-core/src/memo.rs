use std::any::Any;
use std::rc::Rc;

use crate::deps::{changed, Deps};
use crate::session::RenderSession;
use crate::slot_store::{HookKind, HookRecord};

impl RenderSession {
    /// Value of `compute`, recomputed only when `deps` changed.
    ///
    /// The returned `Rc` is the same allocation for as long as the dependencies
    /// stay equal.
    pub fn use_memo<T: 'static>(
        &self,
        compute: impl FnOnce() -> T,
        deps: impl Into<Option<Deps>>,
    ) -> Rc<T> {
        let (slot, core) = self.lease_slot();
        let deps = deps.into();
        if let Some(HookRecord::Memo {
            deps: stored,
            value,
        }) = core.slots.borrow().get(slot)
        {
            if !changed(stored.as_ref(), deps.as_ref()) {
                if let Ok(value) = Rc::clone(value).downcast::<T>() {
                    return value;
                }
            }
        }

        let value = Rc::new(compute());
        let erased: Rc<dyn Any> = value.clone();
        if let Some(HookRecord::Memo {
            deps: stored,
            value: stored_value,
        }) = core.slots.borrow_mut().get_mut(slot)
        {
            if stored_value.is::<T>() {
                *stored = deps;
                *stored_value = erased;
                return value;
            }
        }
        core.replace_slot(
            slot,
            HookKind::Memo,
            HookRecord::Memo {
                deps,
                value: erased,
            },
        );
        value
    }

    /// `callback` itself, kept stable until `deps` change.
    pub fn use_callback<F: 'static>(&self, callback: F, deps: impl Into<Option<Deps>>) -> Rc<F> {
        self.use_memo(move || callback, deps)
    }
}
