//! Per-instance storage of hook records, indexed by lease order.
//!
//! Slot `i` belongs to the `i`-th hook call of a render. Nothing here checks
//! that the same hook lands on the same slot every time; when a hook finds a
//! record of another kind (or another value type) in its slot the hook
//! re-initialises the slot and [`HookSlots::note_reinit`] logs it.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::context::{ContextKey, Subscription};
use crate::deps::Deps;
use crate::effect::EffectRecord;

/// Discriminant of a stored hook record.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HookKind {
    Reference,
    Reducer,
    Memo,
    Effect,
    ContextSubscription,
}

pub(crate) enum HookRecord {
    /// Leased through `RenderSession::lease` but never filled by a hook.
    Vacant,
    /// A `HookRef<T>`, type-erased.
    Reference(Box<dyn Any>),
    /// The `HookRef<S>` holding reducer state, type-erased.
    Reducer(Box<dyn Any>),
    Memo {
        deps: Option<Deps>,
        value: Rc<dyn Any>,
    },
    Effect(Rc<RefCell<EffectRecord>>),
    ContextSubscription {
        key: ContextKey,
        _subscription: Subscription,
    },
}

impl HookRecord {
    pub(crate) fn kind(&self) -> Option<HookKind> {
        match self {
            HookRecord::Vacant => None,
            HookRecord::Reference(_) => Some(HookKind::Reference),
            HookRecord::Reducer(_) => Some(HookKind::Reducer),
            HookRecord::Memo { .. } => Some(HookKind::Memo),
            HookRecord::Effect(_) => Some(HookKind::Effect),
            HookRecord::ContextSubscription { .. } => Some(HookKind::ContextSubscription),
        }
    }
}

#[derive(Default)]
pub(crate) struct HookSlots {
    records: Vec<HookRecord>,
}

impl HookSlots {
    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn get(&self, slot: usize) -> Option<&HookRecord> {
        self.records.get(slot)
    }

    pub(crate) fn get_mut(&mut self, slot: usize) -> Option<&mut HookRecord> {
        self.records.get_mut(slot)
    }

    /// Store `record` at `slot`, returning whatever it displaced.
    pub(crate) fn install(&mut self, slot: usize, record: HookRecord) -> Option<HookRecord> {
        while self.records.len() < slot {
            self.records.push(HookRecord::Vacant);
        }
        if slot == self.records.len() {
            self.records.push(record);
            None
        } else {
            Some(std::mem::replace(&mut self.records[slot], record))
        }
    }

    /// Clone the `HookRef<T>` stored under a reference-kind slot.
    pub(crate) fn erased<T: Clone + 'static>(&self, slot: usize, kind: HookKind) -> Option<T> {
        let erased = match (self.records.get(slot)?, kind) {
            (HookRecord::Reference(value), HookKind::Reference) => value,
            (HookRecord::Reducer(value), HookKind::Reducer) => value,
            _ => return None,
        };
        erased.downcast_ref::<T>().cloned()
    }

    pub(crate) fn kind_at(&self, slot: usize) -> Option<HookKind> {
        self.records.get(slot).and_then(HookRecord::kind)
    }

    pub(crate) fn kinds(&self) -> Vec<(usize, HookKind)> {
        self.records
            .iter()
            .enumerate()
            .filter_map(|(slot, record)| record.kind().map(|kind| (slot, kind)))
            .collect()
    }

    /// Remove every record. The caller drops them once no borrow is held.
    pub(crate) fn take_all(&mut self) -> Vec<HookRecord> {
        std::mem::take(&mut self.records)
    }

    pub(crate) fn note_reinit(&self, slot: usize, wanted: HookKind) {
        if let Some(found) = self.kind_at(slot) {
            log::warn!(
                "hook slot {slot} held a {found:?} record (or another value type) but is now \
                 leased as {wanted:?}; re-initialising. Hooks must be called unconditionally \
                 and in the same order on every render"
            );
        }
    }
}
