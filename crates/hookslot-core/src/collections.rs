//! Map type behind the statics, instance and context tables.
//!
//! Keys are small ids and static names, so `rustc-hash` is the default. The
//! `std-hash` feature switches to SipHash for hosts that key tables with
//! untrusted input.

#[cfg(feature = "std-hash")]
pub(crate) mod map {
    pub(crate) use std::collections::HashMap;
}

#[cfg(not(feature = "std-hash"))]
pub(crate) mod map {
    pub(crate) use rustc_hash::FxHashMap as HashMap;
}
