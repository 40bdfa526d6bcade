//! Vector clocks.
//!
//! Each process keeps a counter for itself and the latest counter it has heard of for every other
//! process. A local event bumps the process's own entry; receiving a message takes the
//! entry-wise maximum with the sender's clock and then bumps the own entry once. Unlike Lamport
//! timestamps this captures causality exactly, at the cost of a partial order: two clocks that
//! have not heard of each other's latest events are concurrent.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

use tracing::debug;

use crate::Clock;
use crate::cache::EncodedCache;
use crate::codec::{ByteReader, parse_field};
use crate::error::{ClockError, Result};
use crate::identifier::{Identifier, SimpleIdentifier};

const COUNT_SIZE: usize = 8;
const TEXT_DELIMITER: char = ':';

/// The outcome of comparing two vector clocks in a single pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClockOrdering {
    /// The left clock happened before the right one.
    Before,
    /// The left clock happened after the right one.
    After,
    /// The clocks are identical.
    Equal,
    /// Neither clock is ordered before the other.
    Concurrent,
}

impl ClockOrdering {
    /// The equivalent [`Ordering`], or `None` for concurrent clocks.
    #[must_use]
    pub const fn to_ordering(self) -> Option<Ordering> {
        match self {
            Self::Before => Some(Ordering::Less),
            Self::After => Some(Ordering::Greater),
            Self::Equal => Some(Ordering::Equal),
            Self::Concurrent => None,
        }
    }

    /// The ordering seen from the other side.
    #[must_use]
    pub const fn reverse(self) -> Self {
        match self {
            Self::Before => Self::After,
            Self::After => Self::Before,
            other => other,
        }
    }
}

/// Which keys take part in a vector clock comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComparePolicy {
    /// Only entries known to both clocks are compared; an entry present on one side only keeps
    /// the clocks from being equal but never orders them. This is the order used by
    /// `PartialOrd`.
    #[default]
    SharedKeys,
    /// Classic domination over the union of keys, an absent entry counting as 0.
    FullUnion,
}

#[derive(Debug, Clone)]
pub struct VectorClock<I = SimpleIdentifier>
where
    I: Identifier,
{
    /// Assume there are N processes in the system, all of whom have their own respective vector
    /// clock (say `VC_i` for each process i in {1, ..., N}). Then each clock, `VC_i`, will have
    /// an underlying list of size N, `V_i` such that:
    /// - `V_i[i]` is the number of events that have taken place at process `i`,
    /// - `V_i[j]` is the number of events that process `i` **knows** to have taken place at
    ///    process `j`, (i.e. that have potentially affected process `i`).
    ///
    /// `count` is `V_i[i]`; it is kept out of `others`, which holds every `V_i[j]` for `j != i`
    /// that process `i` has heard about.
    count: u64,
    /// The owner of this clock, i.e. process `i` would have vector clock `VC_i` from the above
    /// description. Never a key of `others`.
    id: I,
    others: BTreeMap<I, u64>,
    encoded: EncodedCache,
}

impl VectorClock {
    /// Constructs a new vector clock at count 1 for a freshly generated [`SimpleIdentifier`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<I> VectorClock<I>
where
    I: Identifier,
{
    /// Constructs a new vector clock at count 1 for the given process identifier.
    #[must_use]
    pub fn owned_by(id: I) -> Self {
        Self::with_count(1, id)
    }

    /// Constructs a vector clock that has not heard from any other process.
    #[must_use]
    pub fn with_count(count: u64, id: I) -> Self {
        Self::from_map(count, id, BTreeMap::new())
    }

    /// Constructs a vector clock from its own count and the entries it knows for other processes.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::DuplicateIdentifier`] if `others` names `id` or names any
    /// identifier twice.
    pub fn from_parts(
        count: u64,
        id: I,
        others: impl IntoIterator<Item = (I, u64)>,
    ) -> Result<Self> {
        let mut map = BTreeMap::new();
        for (other, other_count) in others {
            if other == id || map.contains_key(&other) {
                debug!(id = %other.to_text(), "rejecting duplicate vector clock entry");
                return Err(ClockError::DuplicateIdentifier(other.to_text()));
            }
            map.insert(other, other_count);
        }
        Ok(Self::from_map(count, id, map))
    }

    fn from_map(count: u64, id: I, others: BTreeMap<I, u64>) -> Self {
        debug_assert!(!others.contains_key(&id));
        Self {
            count,
            id,
            others,
            encoded: EncodedCache::default(),
        }
    }

    /// The number of events that have taken place at the owning process.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// What this clock knows about every other process, sorted by identifier.
    #[must_use]
    pub fn others(&self) -> &BTreeMap<I, u64> {
        &self.others
    }

    /// Fetches the clock's value for a given process, if this clock knows of it.
    #[must_use]
    pub fn get(&self, id: &I) -> Option<u64> {
        if *id == self.id {
            Some(self.count)
        } else {
            self.others.get(id).copied()
        }
    }

    /// Every entry of the clock, own entry first, then the others in identifier order.
    pub fn entries(&self) -> impl Iterator<Item = (&I, u64)> {
        std::iter::once((&self.id, self.count))
            .chain(self.others.iter().map(|(id, count)| (id, *count)))
    }

    /// The canonical comparable form: `others` plus the owner's own entry.
    #[must_use]
    pub fn as_dictionary(&self) -> BTreeMap<I, u64> {
        let mut view = self.others.clone();
        view.insert(self.id.clone(), self.count);
        view
    }

    /// Compares two clocks over the entries both know about (see [`ComparePolicy::SharedKeys`]).
    #[must_use]
    pub fn compare(&self, other: &Self) -> ClockOrdering {
        self.compare_with(other, ComparePolicy::SharedKeys)
    }

    /// Compares two clocks in one pass over the union of their entries.
    ///
    /// Comparing vector timestamps `U` and `V`, we say
    /// - `U == V` if, and only if, `U[i] == V[i]` for each `i`,
    /// - `U < V` if, and only if, `U[i] <= V[i]` for each `i` _and_ there exists some `j` such
    ///   that `U[j] < V[j]`, and
    /// - `U || V` (are **concurrent**) if neither `U < V` nor `V < U`.
    ///
    /// `policy` decides what "each `i`" ranges over when the clocks know different processes.
    #[must_use]
    pub fn compare_with(&self, other: &Self, policy: ComparePolicy) -> ClockOrdering {
        let lhs = self.as_dictionary();
        let rhs = other.as_dictionary();

        let mut has_less = false;
        let mut has_greater = false;
        let mut unshared = false;

        let keys: BTreeSet<&I> = lhs.keys().chain(rhs.keys()).collect();
        for key in keys {
            let (left, right) = match (lhs.get(key), rhs.get(key), policy) {
                (Some(left), Some(right), _) => (*left, *right),
                (left, right, ComparePolicy::FullUnion) => {
                    (left.copied().unwrap_or(0), right.copied().unwrap_or(0))
                }
                (_, _, ComparePolicy::SharedKeys) => {
                    unshared = true;
                    continue;
                }
            };
            match left.cmp(&right) {
                Ordering::Less => has_less = true,
                Ordering::Greater => has_greater = true,
                Ordering::Equal => {}
            }
        }

        match (has_less, has_greater) {
            // V[i] <= V'[i] for all i, and there exists some j such that V[j] < V'[j] => V < V'
            (true, false) => ClockOrdering::Before,
            // V[i] >= V'[i] for all i, and there exists some j such that V[j] > V'[j] => V > V'
            (false, true) => ClockOrdering::After,
            (true, true) => ClockOrdering::Concurrent,
            // Same values everywhere we looked, but one side knows a process the other doesn't.
            (false, false) if unshared => ClockOrdering::Concurrent,
            (false, false) => ClockOrdering::Equal,
        }
    }

    /// Returns whether every entry known to both clocks is at least as large in `self`.
    #[must_use]
    pub fn dominates(&self, other: &Self) -> bool {
        other
            .entries()
            .all(|(id, theirs)| self.get(id).is_none_or(|ours| ours >= theirs))
    }

    /// Takes the entry-wise maximum of this clock and every remote, then increments the owner's
    /// entry once.
    fn merged<'a>(&self, remotes: impl IntoIterator<Item = &'a Self>) -> Self {
        let mut merged = self.as_dictionary();
        for remote in remotes {
            for (id, count) in remote.entries() {
                // Only overwrite an entry when the remote knows of more events than we do.
                let entry = merged.entry(id.clone()).or_insert(0);
                *entry = (*entry).max(count);
            }
        }
        let own = merged.remove(&self.id).unwrap_or(self.count);
        Self::from_map(own.saturating_add(1), self.id.clone(), merged)
    }

    /// Encoded length for a clock that knows `others` other processes.
    #[must_use]
    pub fn encoded_len(others: usize) -> usize {
        (others + 1) * (I::REQUIRED_SIZE + COUNT_SIZE)
    }

    fn checked_text(id: &I) -> Result<String> {
        let text = id.to_text();
        if text.contains(TEXT_DELIMITER) {
            return Err(ClockError::InvalidIdentifier {
                text,
                delimiter: TEXT_DELIMITER,
            });
        }
        Ok(text)
    }
}

impl<I: Identifier> Default for VectorClock<I> {
    fn default() -> Self {
        Self::owned_by(I::random())
    }
}

impl<I: Identifier> Clock for VectorClock<I> {
    type Id = I;

    fn now() -> Self {
        Self::with_count(0, I::default_identifier())
    }

    fn id(&self) -> &I {
        &self.id
    }

    /// Increments the owning process's entry. Vector clocks have no notion of physical time, so
    /// `now` is not consulted.
    fn tick(&self, _now: &Self) -> Self {
        Self::from_map(self.count.saturating_add(1), self.id.clone(), self.others.clone())
    }

    fn tock(&self, _now: &Self, other: &Self) -> Self {
        self.merged([other])
    }

    /// Merging any number of remotes costs a single increment of the owner's entry.
    fn tock_all(&self, _now: &Self, others: &[Self]) -> Self {
        self.merged(others)
    }

    fn distant_past() -> Self {
        Self::with_count(0, I::default_identifier())
    }

    fn origin(&self) -> Self {
        Self::with_count(0, self.id.clone())
    }

    fn raw_value(&self) -> &[u8] {
        self.encoded.get_or_encode(|| {
            let mut bytes = Vec::with_capacity(Self::encoded_len(self.others.len()));
            for (id, count) in self.entries() {
                bytes.extend_from_slice(id.encode());
                bytes.extend_from_slice(&count.to_be_bytes());
            }
            bytes
        })
    }

    fn from_raw_value(bytes: &[u8]) -> Result<Self> {
        let group = I::REQUIRED_SIZE + COUNT_SIZE;
        let mut reader = ByteReader::new(bytes);
        reader.require(group)?;
        let id: I = reader.read_identifier()?;
        let count = reader.read_u64()?;

        let mut others = Vec::with_capacity(reader.remaining() / group);
        while reader.remaining() > 0 {
            reader.require(group)?;
            let other = reader.read_identifier()?;
            others.push((other, reader.read_u64()?));
        }
        Self::from_parts(count, id, others)
    }

    /// Renders `id:count` pairs joined by `:`, own pair first.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidIdentifier`] if any identifier's text contains `:`.
    fn text_value(&self) -> Result<String> {
        let mut parts = Vec::with_capacity(2 * (self.others.len() + 1));
        for (id, count) in self.entries() {
            parts.push(Self::checked_text(id)?);
            parts.push(count.to_string());
        }
        Ok(parts.join(":"))
    }

    fn from_text_value(text: &str) -> Result<Self> {
        let fields: Vec<&str> = text.split(TEXT_DELIMITER).collect();
        if fields.len() < 2 || fields.len() % 2 != 0 {
            debug!(text, fields = fields.len(), "rejecting vector clock text");
            return Err(ClockError::Malformed(format!(
                "expected id:count pairs in {text:?}, found {} fields",
                fields.len()
            )));
        }

        let mut pairs = Vec::with_capacity(fields.len() / 2);
        for pair in fields.chunks_exact(2) {
            pairs.push((I::from_text(pair[0])?, parse_field(pair[1], "count")?));
        }
        let mut pairs = pairs.into_iter();
        let Some((id, count)) = pairs.next() else {
            return Err(ClockError::Malformed("empty vector clock".into()));
        };
        Self::from_parts(count, id, pairs)
    }
}

impl<I: Identifier> PartialEq for VectorClock<I> {
    /// Two clocks are equal when their dictionaries are, regardless of which entry each owns.
    fn eq(&self, other: &Self) -> bool {
        self.as_dictionary() == other.as_dictionary()
    }
}

impl<I: Identifier> Eq for VectorClock<I> {}

impl<I: Identifier> Hash for VectorClock<I> {
    /// Hashes the dictionary view, consistent with equality.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_dictionary().hash(state);
    }
}

impl<I: Identifier> PartialOrd for VectorClock<I> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(other).to_ordering()
    }
}
