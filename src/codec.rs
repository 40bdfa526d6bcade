//! Helpers shared by the binary and text layouts of every clock.
//!
//! All integers are written big-endian (network byte order) so that the encoded bytes of two
//! clocks with the same owner sort the same way the clocks do.

use std::str::FromStr;

use tracing::debug;

use crate::error::{ClockError, Result};
use crate::identifier::Identifier;

/// Cursor over untrusted input bytes.
pub(crate) struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    /// Fails with [`ClockError::Truncated`] unless at least `len` more bytes are available.
    pub(crate) fn require(&self, len: usize) -> Result<()> {
        if self.remaining() < len {
            debug!(
                needed = self.pos + len,
                available = self.bytes.len(),
                "rejecting truncated clock"
            );
            return Err(ClockError::Truncated {
                expected: self.pos + len,
                actual: self.bytes.len(),
            });
        }
        Ok(())
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        self.require(len)?;
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_be_bytes(buf))
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        buf.copy_from_slice(self.take(2)?);
        Ok(u16::from_be_bytes(buf))
    }

    pub(crate) fn read_identifier<I: Identifier>(&mut self) -> Result<I> {
        I::try_decode(self.take(I::REQUIRED_SIZE)?)
    }

    /// Fails if any bytes are left over after a fixed-width layout.
    pub(crate) fn finish(self) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            extra => {
                debug!(extra, "rejecting clock with trailing bytes");
                Err(ClockError::Malformed(format!("{extra} trailing bytes")))
            }
        }
    }
}

/// Parses one numeric field of a text layout.
///
/// Only plain ASCII digits are accepted; signs and whitespace are rejected.
pub(crate) fn parse_field<T: FromStr>(field: &str, name: &str) -> Result<T> {
    let digits = !field.is_empty() && field.bytes().all(|b| b.is_ascii_digit());
    digits.then(|| field.parse().ok()).flatten().ok_or_else(|| {
        debug!(field, name, "rejecting non-numeric clock field");
        ClockError::Malformed(format!("{name} {field:?} is not a number"))
    })
}

/// Splits `text` into exactly `count` fields on `delimiter`; the last field keeps any further
/// delimiters so identifiers whose text contains the delimiter survive.
pub(crate) fn split_fields<'t>(
    text: &'t str,
    delimiter: char,
    count: usize,
) -> Result<Vec<&'t str>> {
    let fields: Vec<&str> = text.splitn(count, delimiter).collect();
    if fields.len() != count {
        debug!(text, expected = count, found = fields.len(), "rejecting clock text");
        return Err(ClockError::Malformed(format!(
            "expected {count} fields in {text:?}, found {}",
            fields.len()
        )));
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_reads_big_endian() {
        let bytes = [0, 0, 0, 0, 0, 0, 3, 0xe8, 0, 1];
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_u64(), Ok(1000));
        assert_eq!(reader.read_u16(), Ok(1));
        assert_eq!(reader.remaining(), 0);
        assert!(reader.finish().is_ok());
    }

    #[test]
    fn test_reader_truncated() {
        let bytes = [0, 1, 2];
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_u16(), Ok(1));
        assert_eq!(
            reader.read_u16(),
            Err(ClockError::Truncated {
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn test_reader_trailing_bytes() {
        let bytes = [0, 1, 2];
        let mut reader = ByteReader::new(&bytes);
        reader.read_u16().unwrap();
        assert!(matches!(reader.finish(), Err(ClockError::Malformed(_))));
    }

    #[test]
    fn test_split_fields() {
        assert_eq!(split_fields("1-2-a-b", '-', 3), Ok(vec!["1", "2", "a-b"]));
        assert!(matches!(split_fields("12", '-', 2), Err(ClockError::Malformed(_))));
        assert_eq!(parse_field::<u16>("7", "count"), Ok(7));
        assert!(parse_field::<u16>("x", "count").is_err());
        assert!(parse_field::<u16>("70000", "count").is_err());
    }

    #[test]
    fn test_parse_field_accepts_only_digits() {
        assert_eq!(parse_field::<u64>("005", "count"), Ok(5));
        for bad in ["", "+5", "-5", " 5", "5 ", "0x5"] {
            assert!(
                matches!(parse_field::<u64>(bad, "count"), Err(ClockError::Malformed(_))),
                "{bad:?} should be rejected"
            );
        }
    }
}
