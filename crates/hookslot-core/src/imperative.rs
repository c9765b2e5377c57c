use std::fmt;
use std::rc::Rc;

use crate::deps::{Dep, Deps};
use crate::hook_ref::HookRef;
use crate::session::RenderSession;

/// Where an imperative handle gets published.
///
/// A callback target is called with the handle after commit and with `None`
/// on unwind. An object target has its `current` set and cleared.
pub enum RefTarget<T> {
    Callback(Rc<dyn Fn(Option<T>)>),
    Object(HookRef<Option<T>>),
}

impl<T> RefTarget<T> {
    pub fn callback(callback: impl Fn(Option<T>) + 'static) -> Self {
        RefTarget::Callback(Rc::new(callback))
    }

    pub fn object(cell: HookRef<Option<T>>) -> Self {
        RefTarget::Object(cell)
    }

    pub fn assign(&self, value: Option<T>) {
        match self {
            RefTarget::Callback(callback) => callback(value),
            RefTarget::Object(cell) => {
                cell.set_current(value);
            }
        }
    }
}

impl<T> Clone for RefTarget<T> {
    fn clone(&self) -> Self {
        match self {
            RefTarget::Callback(callback) => RefTarget::Callback(Rc::clone(callback)),
            RefTarget::Object(cell) => RefTarget::Object(cell.clone()),
        }
    }
}

impl<T> PartialEq for RefTarget<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RefTarget::Callback(a), RefTarget::Callback(b)) => Rc::ptr_eq(a, b),
            (RefTarget::Object(a), RefTarget::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl<T> fmt::Debug for RefTarget<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefTarget::Callback(callback) => {
                write!(f, "RefTarget::Callback({:p})", Rc::as_ptr(callback))
            }
            RefTarget::Object(_) => f.write_str("RefTarget::Object"),
        }
    }
}

impl RenderSession {
    /// Publish the handle built by `build` into `target` after commit.
    ///
    /// With `deps` present the target is appended to the list, so a new target
    /// republishes. Without `deps` the handle is rebuilt after every commit.
    /// The previous handle is cleared from its target before a rebuild and at
    /// unmount.
    pub fn use_imperative_methods<H: 'static>(
        &self,
        target: &RefTarget<H>,
        build: impl FnOnce() -> H + 'static,
        deps: impl Into<Option<Deps>>,
    ) {
        let deps = deps.into().map(|mut deps| {
            deps.push_dep(Dep::new(target.clone()));
            deps
        });
        let target = target.clone();
        self.use_effect(
            move |scope| {
                target.assign(Some(build()));
                scope.on_unwind(move || target.assign(None))
            },
            deps,
        );
    }
}
