//! Reducer and state hooks.
//!
//! The slot holds the state cell; the render gets a snapshot of the value and
//! a dispatcher. A dispatch folds the action into the value currently stored
//! in the slot (not the snapshot the render saw), so several updates issued
//! before the next render compose. When the reducer returns a value equal to
//! the current one nothing is written and no re-render is requested.

use std::fmt;
use std::rc::Rc;

use crate::hook_ref::HookRef;
use crate::platform::RenderTrigger;
use crate::session::RenderSession;
use crate::slot_store::{HookKind, HookRecord};

type Reducer<S, A> = dyn Fn(&S, A) -> S;

/// Sends actions to a reducer slot.
pub struct Dispatch<S, A> {
    state: HookRef<S>,
    reducer: Rc<Reducer<S, A>>,
    trigger: RenderTrigger,
}

impl<S, A> Clone for Dispatch<S, A> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            reducer: Rc::clone(&self.reducer),
            trigger: self.trigger.clone(),
        }
    }
}

impl<S: Clone + PartialEq, A> Dispatch<S, A> {
    /// Apply `action` to the stored state and request a re-render if it changed.
    /// Returns whether the state changed.
    pub fn dispatch(&self, action: A) -> bool {
        let current = self.state.current();
        let next = (self.reducer)(&current, action);
        if next == current {
            log::trace!(
                "dispatch left state of instance {} unchanged",
                self.trigger.instance()
            );
            return false;
        }
        self.state.set_current(next);
        self.trigger.request();
        true
    }

    /// The value stored in the slot right now.
    pub fn current(&self) -> S {
        self.state.current()
    }
}

impl<S, A> fmt::Debug for Dispatch<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch")
            .field("instance", &self.trigger.instance())
            .finish()
    }
}

/// Action understood by the `use_state` reducer.
pub enum StateAction<T> {
    Set(T),
    Update(Box<dyn FnOnce(&T) -> T>),
}

fn apply_state_action<T>(previous: &T, action: StateAction<T>) -> T {
    match action {
        StateAction::Set(value) => value,
        StateAction::Update(update) => update(previous),
    }
}

/// Setter returned by `use_state`.
pub struct StateSetter<T> {
    dispatch: Dispatch<T, StateAction<T>>,
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            dispatch: self.dispatch.clone(),
        }
    }
}

impl<T: Clone + PartialEq + 'static> StateSetter<T> {
    pub fn set(&self, value: T) -> bool {
        self.dispatch.dispatch(StateAction::Set(value))
    }

    /// Replace the state with `update(previous)`.
    pub fn update(&self, update: impl FnOnce(&T) -> T + 'static) -> bool {
        self.dispatch.dispatch(StateAction::Update(Box::new(update)))
    }

    pub fn current(&self) -> T {
        self.dispatch.current()
    }
}

impl<T> fmt::Debug for StateSetter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StateSetter").field(&self.dispatch).finish()
    }
}

impl RenderSession {
    /// State driven by `reducer`, seeded with `initial` on the first render.
    pub fn use_reducer<S, A, R>(&self, reducer: R, initial: S) -> (S, Dispatch<S, A>)
    where
        S: Clone + PartialEq + 'static,
        A: 'static,
        R: Fn(&S, A) -> S + 'static,
    {
        let (slot, core) = self.lease_slot();
        let existing = core
            .slots
            .borrow()
            .erased::<HookRef<S>>(slot, HookKind::Reducer);
        let state = match existing {
            Some(state) => state,
            None => {
                let state = HookRef::new(initial);
                core.replace_slot(
                    slot,
                    HookKind::Reducer,
                    HookRecord::Reducer(Box::new(state.clone())),
                );
                state
            }
        };
        let snapshot = state.current();
        let dispatch = Dispatch {
            state,
            reducer: Rc::new(reducer),
            trigger: core.trigger.clone(),
        };
        (snapshot, dispatch)
    }

    /// A state cell with a setter.
    pub fn use_state<T: Clone + PartialEq + 'static>(&self, initial: T) -> (T, StateSetter<T>) {
        let (value, dispatch) = self.use_reducer(apply_state_action::<T>, initial);
        (value, StateSetter { dispatch })
    }
}
