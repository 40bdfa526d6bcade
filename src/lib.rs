//! Logical clocks for ordering events across processes that share no synchronized wall clock.
//!
//! The (Lamport) Clock Condition gives that if `a` happens before `b` (denoted `a -> b`), then
//! `TS(a) < TS(b)`. Vector clocks guarantee a stronger condition: `a -> b` <=> `TS(a) < TS(b)`.
//! Hybrid logical clocks keep Lamport's condition while staying close to physical time.
//!
//! All three families implement [`Clock`]. A process holds one clock value per causal stream:
//! it calls [`Clock::tick`] for a local event, attaches [`Clock::raw_value`] to outgoing
//! messages, and calls [`Clock::tock`] with the decoded clock of every message it receives.
//! Clock values are immutable; every operation returns a new value that replaces the old one.
//!
//! ```
//! use clocks::{Clock, LamportClock};
//!
//! let alice = LamportClock::new();
//! let bob = LamportClock::new();
//!
//! let sent = alice.tick_now();
//! let wire = sent.raw_value().to_vec();
//!
//! let received = LamportClock::from_raw_value(&wire).unwrap();
//! let bob = bob.tock_now(&received);
//! assert!(bob > sent);
//! ```

pub mod error;
pub mod hybrid_logical_clock;
pub mod identifier;
pub mod lamport_clock;
pub mod time;
pub mod vector_clock;

mod cache;
mod codec;
#[cfg(feature = "serde")]
mod serde_impls;

pub use error::{ClockError, Result};
pub use hybrid_logical_clock::HybridLogicalClock;
pub use identifier::{Identifier, SimpleIdentifier};
pub use lamport_clock::LamportClock;
pub use time::{FixedTimeSource, SystemTimeSource, TimeSource};
pub use vector_clock::{ClockOrdering, ComparePolicy, VectorClock};

/// The contract shared by every clock family.
///
/// The `now` argument of [`Clock::tick`] and [`Clock::tock`] is a synthetic clock describing the
/// current moment (see [`Clock::now`]); only its time component is read, never its owner.
pub trait Clock: Clone + PartialEq + PartialOrd + Sized {
    /// The owner identity carried by this clock.
    type Id: Identifier;

    /// A synthetic clock describing the current moment, owned by nobody.
    fn now() -> Self;

    /// The owner of this clock's lineage.
    fn id(&self) -> &Self::Id;

    /// Advances the clock for a local event. The result is strictly greater than `self`.
    fn tick(&self, now: &Self) -> Self;

    /// Merges a clock received from another process. The result is causally after both.
    fn tock(&self, now: &Self, other: &Self) -> Self;

    /// Merges several received clocks at once; with no clocks this is exactly [`Clock::tick`].
    ///
    /// The default tocks against the greatest of `others`, which dominates tocking against any
    /// lesser one when the order is total.
    fn tock_all(&self, now: &Self, others: &[Self]) -> Self {
        let latest = others
            .iter()
            .reduce(|latest, other| if other > latest { other } else { latest });
        match latest {
            Some(latest) => self.tock(now, latest),
            None => self.tick(now),
        }
    }

    /// The earliest possible clock of this family, owned by nobody.
    fn distant_past() -> Self;

    /// The earliest possible clock of this clock's lineage.
    fn origin(&self) -> Self;

    /// The deterministic big-endian binary encoding, computed once per value.
    fn raw_value(&self) -> &[u8];

    /// Decodes the output of [`Clock::raw_value`].
    fn from_raw_value(bytes: &[u8]) -> Result<Self>;

    /// The delimited text encoding.
    fn text_value(&self) -> Result<String>;

    /// Decodes the output of [`Clock::text_value`].
    fn from_text_value(text: &str) -> Result<Self>;

    /// [`Clock::tick`] against the current moment.
    fn tick_now(&self) -> Self {
        self.tick(&Self::now())
    }

    /// [`Clock::tock`] against the current moment.
    fn tock_now(&self, other: &Self) -> Self {
        self.tock(&Self::now(), other)
    }

    /// [`Clock::tock_all`] against the current moment.
    fn tock_all_now(&self, others: &[Self]) -> Self {
        self.tock_all(&Self::now(), others)
    }

    /// Returns whether this clock is ordered strictly before `other`.
    #[inline]
    fn happens_before(&self, other: &Self) -> bool {
        self < other
    }

    /// Returns whether neither clock is ordered before the other and they are not equal.
    #[inline]
    fn is_concurrent_with(&self, other: &Self) -> bool {
        self.partial_cmp(other).is_none()
    }
}
