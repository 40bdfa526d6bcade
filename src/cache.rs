use std::fmt;
use std::sync::OnceLock;

/// Memoized binary encoding of an immutable clock value.
///
/// The encoding is a pure function of the clock, so two threads racing to fill the cache would
/// store identical bytes. Clones carry the cached bytes along; clocks built by `tick`/`tock`
/// start with an empty cache.
#[derive(Clone, Default)]
pub(crate) struct EncodedCache(OnceLock<Box<[u8]>>);

impl EncodedCache {
    pub(crate) fn get_or_encode(&self, encode: impl FnOnce() -> Vec<u8>) -> &[u8] {
        self.0.get_or_init(|| encode().into_boxed_slice())
    }

    pub(crate) fn is_filled(&self) -> bool {
        self.0.get().is_some()
    }
}

impl fmt::Debug for EncodedCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedCache").field("filled", &self.is_filled()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encodes_once() {
        let cache = EncodedCache::default();
        assert!(!cache.is_filled());

        let mut calls = 0;
        assert_eq!(
            cache.get_or_encode(|| {
                calls += 1;
                vec![1, 2]
            }),
            &[1, 2]
        );
        assert_eq!(cache.get_or_encode(|| vec![9]), &[1, 2]);
        assert_eq!(calls, 1);
        assert!(cache.is_filled());
        assert!(cache.clone().is_filled());
    }
}
