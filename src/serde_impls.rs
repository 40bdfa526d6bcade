//! Serde support. Human-readable formats carry the text encoding, binary formats the raw one.

use std::fmt;

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Clock, HybridLogicalClock, Identifier, LamportClock, VectorClock};

struct RawBytes;

impl<'de> Visitor<'de> for RawBytes {
    type Value = Vec<u8>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an encoded clock")
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
        Ok(v.to_vec())
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
        Ok(v)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(byte) = seq.next_element()? {
            bytes.push(byte);
        }
        Ok(bytes)
    }
}

fn serialize_clock<C: Clock, S: Serializer>(clock: &C, serializer: S) -> Result<S::Ok, S::Error> {
    if serializer.is_human_readable() {
        let text = clock.text_value().map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    } else {
        serializer.serialize_bytes(clock.raw_value())
    }
}

fn deserialize_clock<'de, C: Clock, D: Deserializer<'de>>(deserializer: D) -> Result<C, D::Error> {
    if deserializer.is_human_readable() {
        let text = String::deserialize(deserializer)?;
        C::from_text_value(&text).map_err(de::Error::custom)
    } else {
        let bytes = deserializer.deserialize_bytes(RawBytes)?;
        C::from_raw_value(&bytes).map_err(de::Error::custom)
    }
}

macro_rules! impl_serde {
    ($($clock:ident),+) => {$(
        impl<I: Identifier> Serialize for $clock<I> {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serialize_clock(self, serializer)
            }
        }

        impl<'de, I: Identifier> Deserialize<'de> for $clock<I> {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                deserialize_clock(deserializer)
            }
        }
    )+};
}

impl_serde!(LamportClock, VectorClock, HybridLogicalClock);
