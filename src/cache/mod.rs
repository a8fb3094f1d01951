//! Caching subsystem.
//!
//! - [`RequestKey`]: normalized identity of a request (endpoint + sorted
//!   parameters).
//! - [`RequestCache`]: subscription-based response cache with at-most-one
//!   fetch per key, last-request-wins commits and a retention window. See
//!   the [`request`] module docs for the full lifecycle.
//! - [`TagIndex`] / [`Tag`]: groups entries so they can be invalidated
//!   together.
//! - [`Clock`]: injectable time source ([`SystemClock`], [`ManualClock`]).

mod clock;
mod key;
pub mod request;
mod tags;

pub use clock::{Clock, ManualClock, SystemClock};
pub use key::RequestKey;
pub use request::{
    CacheConfig, CacheEntry, Invalidation, QueryState, QueryStatus, RequestCache, Subscription,
};
pub use tags::{Tag, TagIndex};
