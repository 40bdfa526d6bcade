//! The goal of HLC is to provide one-way causality detection similar to that provided by lamport
//! clocks, while maintaining the clock value to be always close to the physical/NTP clock.
//!
//! Formally, given a distributed system, we need to assign each event `e` a timestamp, `L(e)`,
//! such that:
//!   1. `e -> f => L(e) < L(f),`
//!   2. Space requirement for `L(e)` is O(1) integers (unlike vector clocks, for example),
//!   3. `L(e)` is represented with bounded space, and
//!   4. `L(e)` is *close* to the physical time of `e`, i.e. `| L(e) - PT(e) |` is bounded.
//!
//! A single counter cannot do both jobs: once it has absorbed logical increments there is no
//! safe moment to pull it back towards physical time. The timestamp is therefore split into
//! `milliseconds`, the maximum physical time heard of so far, and `count`, which only captures
//! causality among events sharing the same `milliseconds` and resets whenever physical time
//! catches up.
//!
//! ## The algorithm, with `now` the current physical time:
//! - **Send or local event** (`tick`)
//!     - `(now, 0)`                     if `now > milliseconds`
//!     - `(milliseconds, count + 1)`    otherwise
//! - **Receive event of message `m`** (`tock`)
//!     - `(now, 0)`                                 if `now` is past both `milliseconds` and `m`'s
//!     - `(milliseconds, 1 + max(count, m.count))`  else if `milliseconds == m.milliseconds`
//!     - `(milliseconds, count + 1)`                else if `milliseconds > m.milliseconds`
//!     - `(m.milliseconds, m.count + 1)`            otherwise.
//!
//! Timestamps compare lexicographically by `(milliseconds, count, id)`.
//!
//! The paper "Logical Physical Clocks and Consistent Snapshots in Globally Distributed Databases"
//! by Kulkarni et al. proves that `e -> f` implies `(L(e), C(e)) < (L(f), C(f))`, that
//! `L(f) >= PT(f)`, and that `C(f)` stays bounded when messages take at least a little physical
//! time to deliver.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::time::SystemTime;

use tracing::warn;

use crate::Clock;
use crate::cache::EncodedCache;
use crate::codec::{ByteReader, parse_field, split_fields};
use crate::error::Result;
use crate::identifier::{Identifier, SimpleIdentifier};
use crate::time::{SystemTimeSource, TimeSource, millis_since_epoch, system_time_from_millis};

const MILLIS_SIZE: usize = 8;
const COUNT_SIZE: usize = 2;
const TEXT_DELIMITER: char = '-';

#[derive(Debug, Clone)]
pub struct HybridLogicalClock<I = SimpleIdentifier>
where
    I: Identifier,
{
    /// The maximum physical timestamp observed so far, either from local events or received
    /// messages, in milliseconds since the Unix epoch. Monotonically non-decreasing.
    milliseconds: u64,
    /// The logical counter used to distinguish causally related events that happen at the same
    /// `milliseconds`.
    ///
    /// 16 bits give it room to grow up to 65535 events per millisecond; past that the clock
    /// borrows the next millisecond.
    count: u16,
    id: I,
    encoded: EncodedCache,
}

impl HybridLogicalClock {
    /// Creates a clock at the current system time for a freshly generated [`SimpleIdentifier`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<I> HybridLogicalClock<I>
where
    I: Identifier,
{
    /// Creates a clock from its parts.
    #[must_use]
    pub fn from_parts(milliseconds: u64, count: u16, id: I) -> Self {
        Self {
            milliseconds,
            count,
            id,
            encoded: EncodedCache::default(),
        }
    }

    /// Creates a clock for `id` reading the current time from `source`.
    #[must_use]
    pub fn owned_by(id: I, source: &impl TimeSource) -> Self {
        Self::from_parts(source.now_millis(), 0, id)
    }

    /// Creates a clock at the given wall-clock time.
    #[must_use]
    pub fn at(time: SystemTime, count: u16, id: I) -> Self {
        Self::from_parts(millis_since_epoch(time), count, id)
    }

    /// A synthetic, unowned clock describing the moment reported by `source`.
    #[must_use]
    pub fn now_from(source: &impl TimeSource) -> Self {
        Self::from_parts(source.now_millis(), 0, I::default_identifier())
    }

    /// Physical component, in milliseconds since the Unix epoch.
    #[must_use]
    pub fn milliseconds(&self) -> u64 {
        self.milliseconds
    }

    /// Logical component.
    #[must_use]
    pub fn count(&self) -> u16 {
        self.count
    }

    /// Physical component as a [`SystemTime`].
    #[must_use]
    pub fn system_time(&self) -> SystemTime {
        system_time_from_millis(self.milliseconds)
    }

    /// Encoded length: milliseconds, count, then the owner id.
    #[must_use]
    pub fn encoded_len() -> usize {
        MILLIS_SIZE + COUNT_SIZE + I::REQUIRED_SIZE
    }

    /// Starts a fresh count at `milliseconds`, which is past everything seen so far.
    fn reset(&self, milliseconds: u64) -> Self {
        Self::from_parts(milliseconds, 0, self.id.clone())
    }

    /// Yet another event at `milliseconds` after `count` earlier ones.
    fn bump(&self, milliseconds: u64, count: u16) -> Self {
        match (count.checked_add(1), milliseconds.checked_add(1)) {
            (Some(count), _) => Self::from_parts(milliseconds, count, self.id.clone()),
            (None, Some(next)) => {
                warn!(milliseconds, "logical counter exhausted, advancing to next millisecond");
                Self::from_parts(next, 0, self.id.clone())
            }
            // Nothing is left above (u64::MAX, u16::MAX); stall there rather than wrap.
            (None, None) => {
                warn!(milliseconds, "hybrid logical clock exhausted, holding at maximum");
                Self::from_parts(milliseconds, count, self.id.clone())
            }
        }
    }
}

impl<I: Identifier> Default for HybridLogicalClock<I> {
    fn default() -> Self {
        Self::owned_by(I::random(), &SystemTimeSource)
    }
}

impl<I: Identifier> Clock for HybridLogicalClock<I> {
    type Id = I;

    fn now() -> Self {
        Self::now_from(&SystemTimeSource)
    }

    fn id(&self) -> &I {
        &self.id
    }

    fn tick(&self, now: &Self) -> Self {
        if now.milliseconds > self.milliseconds {
            // First event at a new maximum physical time.
            self.reset(now.milliseconds)
        } else {
            // Physical time never moves the clock backwards; count another event instead.
            self.bump(self.milliseconds, self.count)
        }
    }

    fn tock(&self, now: &Self, other: &Self) -> Self {
        if now.milliseconds > self.milliseconds && now.milliseconds > other.milliseconds {
            self.reset(now.milliseconds)
        } else if self.milliseconds == other.milliseconds {
            // Both at the same physical time: count past what either of us has seen.
            self.bump(self.milliseconds, self.count.max(other.count))
        } else if self.milliseconds > other.milliseconds {
            self.bump(self.milliseconds, self.count)
        } else {
            // The incoming clock is ahead of ours; count past what it had.
            self.bump(other.milliseconds, other.count)
        }
    }

    fn distant_past() -> Self {
        Self::from_parts(0, 0, I::default_identifier())
    }

    fn origin(&self) -> Self {
        Self::from_parts(0, 0, self.id.clone())
    }

    fn raw_value(&self) -> &[u8] {
        self.encoded.get_or_encode(|| {
            let mut bytes = Vec::with_capacity(Self::encoded_len());
            bytes.extend_from_slice(&self.milliseconds.to_be_bytes());
            bytes.extend_from_slice(&self.count.to_be_bytes());
            bytes.extend_from_slice(self.id.encode());
            bytes
        })
    }

    fn from_raw_value(bytes: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);
        reader.require(Self::encoded_len())?;
        let milliseconds = reader.read_u64()?;
        let count = reader.read_u16()?;
        let id = reader.read_identifier()?;
        reader.finish()?;
        Ok(Self::from_parts(milliseconds, count, id))
    }

    fn text_value(&self) -> Result<String> {
        Ok(format!(
            "{}{TEXT_DELIMITER}{}{TEXT_DELIMITER}{}",
            self.milliseconds,
            self.count,
            self.id.to_text()
        ))
    }

    fn from_text_value(text: &str) -> Result<Self> {
        let fields = split_fields(text, TEXT_DELIMITER, 3)?;
        let milliseconds = parse_field(fields[0], "timestamp")?;
        let count = parse_field(fields[1], "count")?;
        let id = I::from_text(fields[2])?;
        Ok(Self::from_parts(milliseconds, count, id))
    }
}

impl<I: Identifier> PartialEq for HybridLogicalClock<I> {
    fn eq(&self, other: &Self) -> bool {
        self.milliseconds == other.milliseconds && self.count == other.count && self.id == other.id
    }
}

impl<I: Identifier> Eq for HybridLogicalClock<I> {}

impl<I: Identifier> Hash for HybridLogicalClock<I> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.milliseconds.hash(state);
        self.count.hash(state);
        self.id.hash(state);
    }
}

impl<I: Identifier> PartialOrd for HybridLogicalClock<I> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<I: Identifier> Ord for HybridLogicalClock<I> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.milliseconds
            .cmp(&other.milliseconds)
            .then(self.count.cmp(&other.count))
            .then_with(|| self.id.cmp(&other.id))
    }
}
