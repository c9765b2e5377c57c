use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::session::RenderSession;
use crate::slot_store::{HookKind, HookRecord};

/// Mutable cell with stable identity for the lifetime of its hook slot.
///
/// `use_ref` hands out clones of the same `HookRef` on every render, so
/// writes through [`HookRef::set_current`] are visible to later renders and to
/// effects that captured an earlier clone.
pub struct HookRef<T> {
    inner: Rc<RefCell<T>>,
}

impl<T> Clone for HookRef<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> HookRef<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(value)),
        }
    }

    /// Run `f` with an immutable reference to the stored value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let borrow = self.inner.borrow();
        f(&*borrow)
    }

    /// Run `f` with a mutable reference to the stored value.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut borrow = self.inner.borrow_mut();
        f(&mut *borrow)
    }

    pub fn borrow(&self) -> Ref<'_, T> {
        self.inner.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.inner.borrow_mut()
    }

    /// Replace `current`, returning the previous value.
    pub fn set_current(&self, value: T) -> T {
        std::mem::replace(&mut *self.inner.borrow_mut(), value)
    }

    /// Whether both handles point at the same record.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone> HookRef<T> {
    pub fn current(&self) -> T {
        self.inner.borrow().clone()
    }
}

impl<T> PartialEq for HookRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T: fmt::Debug> fmt::Debug for HookRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(value) => f.debug_struct("HookRef").field("current", &*value).finish(),
            Err(_) => f.write_str("HookRef(<borrowed>)"),
        }
    }
}

impl RenderSession {
    /// A mutable record that keeps its identity across renders.
    ///
    /// `initial` is only stored by the first render; later renders return the
    /// existing record unchanged.
    pub fn use_ref<T: 'static>(&self, initial: T) -> HookRef<T> {
        self.use_ref_with(move || initial)
    }

    /// Like [`RenderSession::use_ref`], building the initial value lazily.
    pub fn use_ref_with<T: 'static>(&self, init: impl FnOnce() -> T) -> HookRef<T> {
        let (slot, core) = self.lease_slot();
        let existing = core
            .slots
            .borrow()
            .erased::<HookRef<T>>(slot, HookKind::Reference);
        if let Some(existing) = existing {
            return existing;
        }
        let record = HookRef::new(init());
        core.replace_slot(
            slot,
            HookKind::Reference,
            HookRecord::Reference(Box::new(record.clone())),
        );
        record
    }
}
