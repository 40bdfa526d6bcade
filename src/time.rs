//! Sources of physical time for hybrid logical clocks.
//!
//! A hybrid logical clock only ever reads wall-clock time through a synthetic "now" clock, so the
//! source of that reading is pluggable: the system clock by default, a fixed instant for tests
//! and replay, or (with the `ntp` feature) an SNTP server.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Something that can report the current time in milliseconds since the Unix epoch.
pub trait TimeSource {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64;
}

/// Reads [`SystemTime::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_millis(&self) -> u64 {
        millis_since_epoch(SystemTime::now())
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixedTimeSource(pub u64);

impl TimeSource for FixedTimeSource {
    fn now_millis(&self) -> u64 {
        self.0
    }
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now_millis(&self) -> u64 {
        (**self).now_millis()
    }
}

/// Converts a [`SystemTime`] to whole milliseconds since the Unix epoch.
///
/// Times before the epoch clamp to 0.
#[must_use]
pub fn millis_since_epoch(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Converts milliseconds since the Unix epoch back to a [`SystemTime`].
#[must_use]
pub fn system_time_from_millis(milliseconds: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(milliseconds)
}

#[cfg(feature = "ntp")]
pub use ntp::NtpTimeSource;

#[cfg(feature = "ntp")]
mod ntp {
    use std::fmt;

    use rsntp::SntpClient;
    use tracing::warn;

    use super::{SystemTimeSource, TimeSource};

    /// Asks an SNTP server for the time on every reading.
    ///
    /// Falls back to the system clock when the server cannot be reached, so a reading is always
    /// available.
    pub struct NtpTimeSource {
        /// Never travels with a clock; only the readings it yields do.
        client: SntpClient,
        server: String,
    }

    impl NtpTimeSource {
        /// The server queried when none is configured.
        pub const DEFAULT_SERVER: &'static str = "pool.ntp.org";

        /// Creates a source querying [`NtpTimeSource::DEFAULT_SERVER`].
        #[must_use]
        pub fn new() -> Self {
            Self::with_server(Self::DEFAULT_SERVER)
        }

        /// Creates a source querying the given `host` or `host:port`.
        #[must_use]
        pub fn with_server(server: impl Into<String>) -> Self {
            Self {
                client: SntpClient::new(),
                server: server.into(),
            }
        }

        /// The configured server.
        #[must_use]
        pub fn server(&self) -> &str {
            &self.server
        }
    }

    impl Default for NtpTimeSource {
        fn default() -> Self {
            Self::new()
        }
    }

    impl fmt::Debug for NtpTimeSource {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("NtpTimeSource").field("server", &self.server).finish()
        }
    }

    impl TimeSource for NtpTimeSource {
        fn now_millis(&self) -> u64 {
            let result = match self.client.synchronize(self.server.as_str()) {
                Ok(result) => result,
                Err(err) => {
                    warn!(
                        server = %self.server,
                        error = %err,
                        "sntp query failed, using system clock"
                    );
                    return SystemTimeSource.now_millis();
                }
            };
            match result.datetime().unix_timestamp() {
                Ok(elapsed) => u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                Err(err) => {
                    warn!(
                        server = %self.server,
                        error = %err,
                        "sntp time out of range, using system clock"
                    );
                    SystemTimeSource.now_millis()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_source() {
        assert_eq!(FixedTimeSource(1000).now_millis(), 1000);
        assert_eq!((&FixedTimeSource(7)).now_millis(), 7);
    }

    #[test]
    fn test_system_source_is_after_2020() {
        // 2020-01-01T00:00:00Z
        assert!(SystemTimeSource.now_millis() > 1_577_836_800_000);
    }

    #[test]
    fn test_millis_conversions() {
        assert_eq!(millis_since_epoch(UNIX_EPOCH), 0);
        assert_eq!(millis_since_epoch(system_time_from_millis(1234)), 1234);
        assert_eq!(millis_since_epoch(UNIX_EPOCH - Duration::from_secs(5)), 0);
    }
}
