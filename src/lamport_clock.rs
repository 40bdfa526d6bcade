//! Lamport clocks.
//!
//! A process increments its counter before each event in that process. When it sends a message
//! it includes its counter with the message, and on receipt the receiver sets its counter to be
//! greater than the maximum of its own value and the received value before it considers the
//! message received. Ties between equal counters are broken by owner id, which turns Lamport's
//! partial order into a total one.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use crate::Clock;
use crate::cache::EncodedCache;
use crate::codec::{ByteReader, parse_field, split_fields};
use crate::error::Result;
use crate::identifier::{Identifier, SimpleIdentifier};

const COUNT_SIZE: usize = 8;
const TEXT_DELIMITER: char = '-';

/// A counter plus the id of the process that owns it, ordered by `(count, id)`.
#[derive(Debug, Clone)]
pub struct LamportClock<I = SimpleIdentifier>
where
    I: Identifier,
{
    count: u64,
    id: I,
    encoded: EncodedCache,
}

impl LamportClock {
    /// Creates a clock at count 1 for a freshly generated [`SimpleIdentifier`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<I> LamportClock<I>
where
    I: Identifier,
{
    /// Creates a clock from its parts.
    #[must_use]
    pub fn from_parts(count: u64, id: I) -> Self {
        Self {
            count,
            id,
            encoded: EncodedCache::default(),
        }
    }

    /// Creates a clock at count 1 for the given owner.
    #[must_use]
    pub fn owned_by(id: I) -> Self {
        Self::from_parts(1, id)
    }

    /// The number of events this lineage knows to have happened.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Encoded length: the counter followed by the owner id.
    #[must_use]
    pub fn encoded_len() -> usize {
        COUNT_SIZE + I::REQUIRED_SIZE
    }

    fn advanced_past(&self, count: u64) -> Self {
        // u64::MAX events is out of reach; saturate rather than wrap.
        Self::from_parts(count.saturating_add(1), self.id.clone())
    }
}

impl<I: Identifier> Default for LamportClock<I> {
    fn default() -> Self {
        Self::owned_by(I::random())
    }
}

impl<I: Identifier> Clock for LamportClock<I> {
    type Id = I;

    fn now() -> Self {
        Self::from_parts(0, I::default_identifier())
    }

    fn id(&self) -> &I {
        &self.id
    }

    fn tick(&self, now: &Self) -> Self {
        self.advanced_past(self.count.max(now.count))
    }

    fn tock(&self, now: &Self, other: &Self) -> Self {
        self.advanced_past(self.count.max(now.count.max(other.count)))
    }

    fn distant_past() -> Self {
        Self::from_parts(0, I::default_identifier())
    }

    fn origin(&self) -> Self {
        Self::from_parts(0, self.id.clone())
    }

    fn raw_value(&self) -> &[u8] {
        self.encoded.get_or_encode(|| {
            let mut bytes = Vec::with_capacity(Self::encoded_len());
            bytes.extend_from_slice(&self.count.to_be_bytes());
            bytes.extend_from_slice(self.id.encode());
            bytes
        })
    }

    fn from_raw_value(bytes: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);
        reader.require(Self::encoded_len())?;
        let count = reader.read_u64()?;
        let id = reader.read_identifier()?;
        reader.finish()?;
        Ok(Self::from_parts(count, id))
    }

    fn text_value(&self) -> Result<String> {
        Ok(format!("{}{TEXT_DELIMITER}{}", self.count, self.id.to_text()))
    }

    fn from_text_value(text: &str) -> Result<Self> {
        let fields = split_fields(text, TEXT_DELIMITER, 2)?;
        let count = parse_field(fields[0], "count")?;
        let id = I::from_text(fields[1])?;
        Ok(Self::from_parts(count, id))
    }
}

impl<I: Identifier> PartialEq for LamportClock<I> {
    fn eq(&self, other: &Self) -> bool {
        self.count == other.count && self.id == other.id
    }
}

impl<I: Identifier> Eq for LamportClock<I> {}

impl<I: Identifier> Hash for LamportClock<I> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.count.hash(state);
        self.id.hash(state);
    }
}

impl<I: Identifier> PartialOrd for LamportClock<I> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<I: Identifier> Ord for LamportClock<I> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.count
            .cmp(&other.count)
            .then_with(|| self.id.cmp(&other.id))
    }
}
