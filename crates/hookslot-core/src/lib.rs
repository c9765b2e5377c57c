#![doc = r"Slot-indexed hooks for component hosts with a mount/update/unmount lifecycle."]
//!
//! A render function wrapped with [`use_hooks`] receives a [`RenderSession`]
//! and calls hooks on it in a fixed order. Each call leases the next slot of
//! the instance's hook store, so slot `i` keeps the state of the `i`-th hook
//! across renders. Hooks must be called unconditionally and in the same order
//! on every render; a slot that meets a different hook is re-initialised.
//!
//! ```
//! use hookslot_core::{deps, use_hooks, MemoryHost};
//!
//! let counter = use_hooks(|cx, step: &i32| {
//!     let (count, set_count) = cx.use_state(0);
//!     let step = *step;
//!     cx.use_effect(
//!         move |scope| {
//!             set_count.update(move |count| count + step);
//!             scope.done()
//!         },
//!         deps![step],
//!     );
//!     count
//! });
//!
//! let host = MemoryHost::new();
//! let mounted = host.mount(&counter, 2).unwrap();
//! assert_eq!(mounted.output(), Some(0));
//! host.flush().unwrap();
//! assert_eq!(mounted.output(), Some(2));
//! ```

mod collections;
mod component;
pub mod context;
mod deps;
mod effect;
mod error;
mod hook_ref;
mod imperative;
mod memo;
pub mod memory_host;
pub mod platform;
mod session;
mod slot_store;
mod state;

pub use component::{use_hooks, HookComponent, HookInstance, HostBindings, LifecyclePhase};
pub use context::{
    create_context, Context, ContextHost, ContextKey, Subscription, CONTEXT_PROTOCOL_VERSION,
};
pub use deps::{changed, Dep, DepKey, Deps, Identity};
pub use effect::{EffectResult, EffectScope};
pub use error::HookError;
pub use hook_ref::HookRef;
pub use imperative::RefTarget;
pub use memory_host::{MemoryHost, Mounted};
pub use platform::{
    DefaultScheduler, InstanceId, Mountable, RenderScheduler, RenderTrigger, Unmountable,
    Updatable,
};
pub use session::RenderSession;
pub use slot_store::HookKind;
pub use state::{Dispatch, StateAction, StateSetter};

#[cfg(test)]
#[path = "tests/hooks_tests.rs"]
mod hooks_tests;

#[cfg(test)]
#[path = "tests/effect_tests.rs"]
mod effect_tests;

#[cfg(test)]
#[path = "tests/host_tests.rs"]
mod host_tests;
