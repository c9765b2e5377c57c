//! Dependency lists and the comparator shared by every memoizing hook.
//!
//! A dependency list is an ordered sequence of comparison keys supplied at each
//! hook call. Hooks take `Option<Deps>`: `None` means the list is absent and the
//! hook recomputes on every render, while `Some(deps![])` is an empty list that
//! only differs from "nothing stored yet".

use smallvec::SmallVec;
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Element of a dependency list: any value with equality and a debug form.
pub trait DepKey: Any + fmt::Debug {
    fn dyn_eq(&self, other: &dyn DepKey) -> bool;

    fn as_any(&self) -> &dyn Any;
}

impl<T: PartialEq + fmt::Debug + 'static> DepKey for T {
    fn dyn_eq(&self, other: &dyn DepKey) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One type-erased dependency. Elements of different types never compare equal.
#[derive(Clone)]
pub struct Dep(Rc<dyn DepKey>);

impl Dep {
    pub fn new<T: PartialEq + fmt::Debug + 'static>(value: T) -> Self {
        Self(Rc::new(value))
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }
}

impl PartialEq for Dep {
    fn eq(&self, other: &Self) -> bool {
        self.0.dyn_eq(&*other.0)
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

/// Ordered dependency list compared positionally between renders.
#[derive(Clone, Default, PartialEq)]
pub struct Deps {
    items: SmallVec<[Dep; 4]>,
}

impl Deps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<T: PartialEq + fmt::Debug + 'static>(&mut self, value: T) {
        self.items.push(Dep::new(value));
    }

    /// Builder form of [`Deps::push`].
    pub fn with<T: PartialEq + fmt::Debug + 'static>(mut self, value: T) -> Self {
        self.push(value);
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dep> {
        self.items.iter()
    }

    pub(crate) fn push_dep(&mut self, dep: Dep) {
        self.items.push(dep);
    }
}

impl FromIterator<Dep> for Deps {
    fn from_iter<I: IntoIterator<Item = Dep>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl fmt::Debug for Deps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

/// Builds a [`Deps`] list: `deps![]`, `deps![a, b]`.
#[macro_export]
macro_rules! deps {
    () => {
        $crate::Deps::new()
    };
    ($($value:expr),+ $(,)?) => {{
        let mut deps = $crate::Deps::new();
        $(deps.push($value);)+
        deps
    }};
}

/// Reference-equality key: two `Identity` values are equal only when they wrap
/// the same allocation.
pub struct Identity<T: ?Sized>(Rc<T>);

impl<T: ?Sized> Identity<T> {
    pub fn of(value: &Rc<T>) -> Self {
        Self(Rc::clone(value))
    }
}

impl<T: ?Sized> Clone for Identity<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: ?Sized> PartialEq for Identity<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: ?Sized> fmt::Debug for Identity<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({:p})", Rc::as_ptr(&self.0))
    }
}

/// Returns `true` when a hook guarded by `next` must recompute.
///
/// An absent `prev` (nothing stored yet) or an absent `next` (no list given)
/// always counts as changed. Two present lists are unchanged only when they
/// have the same length and every position compares equal.
pub fn changed(prev: Option<&Deps>, next: Option<&Deps>) -> bool {
    match (prev, next) {
        (Some(prev), Some(next)) => {
            prev.len() != next.len() || prev.iter().zip(next.iter()).any(|(a, b)| a != b)
        }
        _ => true,
    }
}
