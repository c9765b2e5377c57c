//! Context reads from inside hook-driven render functions.
//!
//! Propagation of context values belongs to the host. The engine talks to it
//! through [`ContextHost`]: on the first `use_context` of a slot the instance
//! subscribes to the channel (so the host re-renders it when the provided value
//! changes), and every render reads the currently provided value, falling back
//! to the channel default.

use std::any::Any;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::platform::RenderTrigger;
use crate::session::RenderSession;
use crate::slot_store::{HookKind, HookRecord};
use crate::HookError;

/// Version of the [`ContextHost`] contract this crate implements.
pub const CONTEXT_PROTOCOL_VERSION: u32 = 1;

/// Identity of one context channel.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub struct ContextKey(usize);

static NEXT_CONTEXT_KEY: AtomicUsize = AtomicUsize::new(1);

fn next_context_key() -> ContextKey {
    ContextKey(NEXT_CONTEXT_KEY.fetch_add(1, Ordering::Relaxed))
}

/// A typed context channel.
pub struct Context<T: 'static> {
    key: ContextKey,
    default: Rc<dyn Fn() -> T>,
}

impl<T: 'static> Clone for Context<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            default: Rc::clone(&self.default),
        }
    }
}

impl<T: 'static> PartialEq for Context<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T: 'static> Eq for Context<T> {}

impl<T: 'static> fmt::Debug for Context<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context").field("key", &self.key).finish()
    }
}

impl<T: 'static> Context<T> {
    pub fn key(&self) -> ContextKey {
        self.key
    }

    pub fn default_value(&self) -> T {
        (self.default)()
    }
}

/// Create a channel whose readers see `default` when nothing is provided.
pub fn create_context<T: Clone + 'static>(default: T) -> Context<T> {
    Context {
        key: next_context_key(),
        default: Rc::new(move || default.clone()),
    }
}

/// Context propagation a host offers to hook-driven instances.
pub trait ContextHost {
    /// Must return [`CONTEXT_PROTOCOL_VERSION`] for the contract this crate
    /// was built against; instantiation fails otherwise.
    fn protocol_version(&self) -> u32;

    /// The value currently provided for `key` in scope of the reader.
    fn read(&self, key: ContextKey) -> Option<Rc<dyn Any>>;

    /// Re-render through `trigger` whenever the value provided for `key` changes,
    /// until the returned subscription is dropped.
    fn subscribe(&self, key: ContextKey, trigger: RenderTrigger) -> Subscription;
}

/// Live subscription; cancels itself on drop.
#[must_use = "dropping a Subscription cancels it"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription with nothing to cancel.
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    pub fn cancel(mut self) {
        self.run_cancel();
    }

    fn run_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

impl RenderSession {
    /// Current value of `context` for this instance.
    ///
    /// # Panics
    /// Panics outside an active render or when the instance has no context
    /// host bound.
    pub fn use_context<T: Clone + 'static>(&self, context: &Context<T>) -> T {
        match self.try_use_context(context) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn try_use_context<T: Clone + 'static>(&self, context: &Context<T>) -> Result<T, HookError> {
        let (slot, core) = self.try_lease_slot()?;
        let host = core.context.clone().ok_or(HookError::ContextUnavailable)?;
        let subscribed = matches!(
            core.slots.borrow().get(slot),
            Some(HookRecord::ContextSubscription { key, .. }) if *key == context.key
        );
        if !subscribed {
            let subscription = host.subscribe(context.key, core.trigger.clone());
            core.replace_slot(
                slot,
                HookKind::ContextSubscription,
                HookRecord::ContextSubscription {
                    key: context.key,
                    _subscription: subscription,
                },
            );
        }
        let provided = host
            .read(context.key)
            .and_then(|value| value.downcast_ref::<T>().cloned());
        Ok(provided.unwrap_or_else(|| context.default_value()))
    }
}
