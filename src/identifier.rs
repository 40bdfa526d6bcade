//! Owner identities for clocks.
//!
//! Every clock carries the identifier of the process (or device) that owns its lineage. The clock
//! algorithms only need a handful of things from an identifier: a fixed byte width so that binary
//! layouts stay fixed-width, a total order so that ties between equal counters can be broken, and
//! a way to mint a fresh random one. Anything providing that can be plugged into the clocks as
//! their `I` type parameter.

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;

use tracing::debug;
use uuid::Uuid;

use crate::error::{ClockError, Result};

/// A fixed-size, totally ordered, byte-encodable identity.
///
/// The `Ord` implementation must agree with byte-lexicographic order over [`Identifier::encode`]
/// so that a clock's ordering matches the ordering of its binary encoding.
pub trait Identifier: Clone + Eq + Ord + Hash + fmt::Debug + Send + Sync + 'static {
    /// Number of bytes in the encoded form.
    const REQUIRED_SIZE: usize;

    /// The reserved all-zero identifier, used for synthetic "now" probes that have no owner.
    fn default_identifier() -> Self;

    /// Mints a new random identifier.
    fn random() -> Self;

    /// Decodes an identifier from exactly [`Identifier::REQUIRED_SIZE`] bytes.
    fn try_decode(bytes: &[u8]) -> Result<Self>;

    /// The identifier's bytes, always [`Identifier::REQUIRED_SIZE`] long.
    fn encode(&self) -> &[u8];

    /// Text form used by the delimited text layouts. Lowercase hex by default.
    fn to_text(&self) -> String {
        hex::encode(self.encode())
    }

    /// Parses the output of [`Identifier::to_text`].
    fn from_text(text: &str) -> Result<Self> {
        let bytes = hex::decode(text)
            .map_err(|err| ClockError::Malformed(format!("identifier {text:?}: {err}")))?;
        Self::try_decode(&bytes)
    }

    /// Returns true if this is the reserved no-owner identifier.
    fn is_default(&self) -> bool {
        *self == Self::default_identifier()
    }
}

/// Compares two raw identifiers byte-lexicographically.
///
/// # Errors
///
/// Returns [`ClockError::LengthMismatch`] if the identifiers differ in length; ordering is only
/// defined between identifiers of equal size.
pub fn try_cmp_bytes(lhs: &[u8], rhs: &[u8]) -> Result<Ordering> {
    if lhs.len() != rhs.len() {
        return Err(ClockError::LengthMismatch {
            lhs: lhs.len(),
            rhs: rhs.len(),
        });
    }
    Ok(lhs.cmp(rhs))
}

/// Compares the encoded forms of two identifiers, possibly of different types.
///
/// # Panics
///
/// Panics if the identifiers have different sizes. That is a programming error; untrusted bytes
/// should go through [`try_cmp_bytes`] instead.
pub fn cmp_bytes<A: Identifier, B: Identifier>(lhs: &A, rhs: &B) -> Ordering {
    match try_cmp_bytes(lhs.encode(), rhs.encode()) {
        Ok(ordering) => ordering,
        Err(err) => panic!("{err}"),
    }
}

const SIMPLE_SIZE: usize = 16;

/// The default identifier: 16 random bytes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimpleIdentifier([u8; SIMPLE_SIZE]);

impl SimpleIdentifier {
    const SIZE: usize = SIMPLE_SIZE;

    /// Wraps raw bytes as an identifier.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; Self::SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; Self::SIZE] {
        &self.0
    }
}

impl Identifier for SimpleIdentifier {
    const REQUIRED_SIZE: usize = Self::SIZE;

    fn default_identifier() -> Self {
        Self([0; Self::SIZE])
    }

    fn random() -> Self {
        Self(rand::random())
    }

    fn try_decode(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; Self::SIZE] = bytes.try_into().map_err(|_| {
            debug!(len = bytes.len(), "rejecting identifier of wrong size");
            ClockError::SizeMismatch {
                expected: Self::SIZE,
                actual: bytes.len(),
            }
        })?;
        Ok(Self(bytes))
    }

    fn encode(&self) -> &[u8] {
        &self.0
    }
}

impl Default for SimpleIdentifier {
    fn default() -> Self {
        Self::random()
    }
}

impl fmt::Debug for SimpleIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SimpleIdentifier({})", hex::encode(self.0))
    }
}

impl fmt::Display for SimpleIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl From<[u8; 16]> for SimpleIdentifier {
    fn from(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

/// UUIDs are 16-byte identities whose text form is the hyphenated string.
impl Identifier for Uuid {
    const REQUIRED_SIZE: usize = 16;

    fn default_identifier() -> Self {
        Uuid::nil()
    }

    fn random() -> Self {
        Uuid::new_v4()
    }

    fn try_decode(bytes: &[u8]) -> Result<Self> {
        Uuid::from_slice(bytes).map_err(|_| ClockError::SizeMismatch {
            expected: 16,
            actual: bytes.len(),
        })
    }

    fn encode(&self) -> &[u8] {
        self.as_bytes()
    }

    fn to_text(&self) -> String {
        self.hyphenated().to_string()
    }

    fn from_text(text: &str) -> Result<Self> {
        Uuid::try_parse(text)
            .map_err(|err| ClockError::Malformed(format!("identifier {text:?}: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(last: u8) -> SimpleIdentifier {
        let mut bytes = [0u8; 16];
        bytes[15] = last;
        SimpleIdentifier::from_bytes(bytes)
    }

    #[test]
    fn test_default_identifier_is_zero() {
        let default = SimpleIdentifier::default_identifier();
        assert_eq!(default.encode(), &[0u8; 16]);
        assert!(default.is_default());
        assert!(!id(1).is_default());
    }

    #[test]
    fn test_random_identifiers_differ() {
        let a = SimpleIdentifier::random();
        let b = SimpleIdentifier::random();
        assert_eq!(a.encode().len(), SimpleIdentifier::REQUIRED_SIZE);
        assert_ne!(a, b);
    }

    #[test]
    fn test_try_decode_size_mismatch() {
        assert_eq!(
            SimpleIdentifier::try_decode(&[1, 2, 3]),
            Err(ClockError::SizeMismatch {
                expected: 16,
                actual: 3
            })
        );
        assert_eq!(SimpleIdentifier::try_decode(id(7).encode()), Ok(id(7)));
    }

    #[test]
    fn test_ordering_is_byte_lexicographic() {
        assert!(id(1) < id(2));

        let mut high = [0u8; 16];
        high[0] = 1;
        assert!(SimpleIdentifier::from_bytes(high) > id(255));
    }

    #[test]
    fn test_text_round_trip() {
        let text = id(1).to_text();
        assert_eq!(text, "00000000000000000000000000000001");
        assert_eq!(SimpleIdentifier::from_text(&text), Ok(id(1)));
        assert!(matches!(
            SimpleIdentifier::from_text("zz"),
            Err(ClockError::Malformed(_))
        ));
        assert!(matches!(
            SimpleIdentifier::from_text("0102"),
            Err(ClockError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_uuid_identifier() {
        let uuid = Uuid::random();
        let text = Identifier::to_text(&uuid);
        assert_eq!(text.len(), 36);
        assert_eq!(<Uuid as Identifier>::from_text(&text), Ok(uuid));
        assert_eq!(<Uuid as Identifier>::try_decode(uuid.encode()), Ok(uuid));
        assert!(Uuid::default_identifier().is_default());
    }

    #[test]
    fn test_try_cmp_bytes() {
        assert_eq!(try_cmp_bytes(&[1, 2], &[1, 3]), Ok(Ordering::Less));
        assert_eq!(
            try_cmp_bytes(&[1, 2], &[1]),
            Err(ClockError::LengthMismatch { lhs: 2, rhs: 1 })
        );
        assert_eq!(cmp_bytes(&id(3), &Uuid::nil()), Ordering::Greater);
    }

    #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
    struct Short([u8; 4]);

    impl Identifier for Short {
        const REQUIRED_SIZE: usize = 4;

        fn default_identifier() -> Self {
            Self([0; 4])
        }

        fn random() -> Self {
            Self(rand::random())
        }

        fn try_decode(bytes: &[u8]) -> Result<Self> {
            bytes.try_into().map(Self).map_err(|_| ClockError::SizeMismatch {
                expected: 4,
                actual: bytes.len(),
            })
        }

        fn encode(&self) -> &[u8] {
            &self.0
        }
    }

    #[test]
    #[should_panic(expected = "cannot compare identifiers")]
    fn test_cmp_bytes_length_mismatch_panics() {
        let _ = cmp_bytes(&id(1), &Short([0; 4]));
    }
}
