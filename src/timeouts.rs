//! Timeout configuration for cable client operations.
//!
//! Centralizes the bounded waits of the WebSocket transport: connection
//! establishment, the server welcome handshake, and heartbeat staleness
//! detection.

use std::time::Duration;

/// Timeout configuration for cable client operations.
///
/// All values have sensible defaults; use the builder or a preset to adjust.
///
/// # Examples
///
/// ```rust
/// use reink_cable::CableTimeouts;
/// use std::time::Duration;
///
/// // Use defaults (recommended for most cases)
/// let timeouts = CableTimeouts::default();
///
/// // Custom timeouts for high-latency environments
/// let timeouts = CableTimeouts::builder()
///     .connection_timeout(Duration::from_secs(30))
///     .stale_threshold_secs(15)
///     .build();
///
/// // Aggressive timeouts for local development
/// let timeouts = CableTimeouts::fast();
/// ```
#[derive(Debug, Clone)]
pub struct CableTimeouts {
    /// Timeout for establishing the WebSocket connection (TCP + TLS +
    /// upgrade).
    /// Default: 10 seconds
    pub connection_timeout: Duration,

    /// Timeout for the server's welcome frame after the socket opens. The
    /// server withholds the welcome when the credential query parameters are
    /// rejected, so this bound also covers authentication.
    /// Default: 5 seconds
    pub welcome_timeout: Duration,

    /// Maximum silence before the connection is considered stale. The server
    /// heartbeats every ~3 seconds, so twice that is a missed beat plus
    /// margin. Set to 0 to disable staleness detection.
    /// Default: 6 seconds
    pub stale_threshold: Duration,
}

impl Default for CableTimeouts {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_secs(10),
            welcome_timeout: Duration::from_secs(5),
            stale_threshold: Duration::from_secs(6),
        }
    }
}

impl CableTimeouts {
    /// Create a new builder for custom timeout configuration.
    pub fn builder() -> CableTimeoutsBuilder {
        CableTimeoutsBuilder::new()
    }

    /// Create timeouts optimized for fast local development.
    ///
    /// Uses shorter timeouts suitable for localhost connections.
    pub fn fast() -> Self {
        Self {
            connection_timeout: Duration::from_secs(2),
            welcome_timeout: Duration::from_secs(2),
            stale_threshold: Duration::from_secs(6),
        }
    }

    /// Create timeouts optimized for high-latency or unreliable networks.
    ///
    /// Uses longer timeouts suitable for remote connections.
    pub fn relaxed() -> Self {
        Self {
            connection_timeout: Duration::from_secs(30),
            welcome_timeout: Duration::from_secs(15),
            stale_threshold: Duration::from_secs(20),
        }
    }

    /// Create timeouts suitable for integration tests.
    ///
    /// Short connect/welcome bounds so failures surface quickly, staleness
    /// detection disabled so a quiet in-test server is not torn down.
    pub fn for_testing() -> Self {
        Self {
            connection_timeout: Duration::from_secs(5),
            welcome_timeout: Duration::from_secs(5),
            stale_threshold: Duration::ZERO,
        }
    }

    /// Check if a duration represents "no timeout" (zero or very large).
    pub fn is_no_timeout(duration: Duration) -> bool {
        duration.is_zero() || duration > Duration::from_secs(86400 * 365) // > 1 year
    }
}

/// Builder for creating custom [`CableTimeouts`] configurations.
#[derive(Debug, Clone)]
pub struct CableTimeoutsBuilder {
    timeouts: CableTimeouts,
}

impl CableTimeoutsBuilder {
    fn new() -> Self {
        Self {
            timeouts: CableTimeouts::default(),
        }
    }

    /// Set the connection timeout (TCP + TLS + upgrade).
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.connection_timeout = timeout;
        self
    }

    /// Set the connection timeout in seconds.
    pub fn connection_timeout_secs(self, secs: u64) -> Self {
        self.connection_timeout(Duration::from_secs(secs))
    }

    /// Set the welcome handshake timeout.
    pub fn welcome_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.welcome_timeout = timeout;
        self
    }

    /// Set the welcome handshake timeout in seconds.
    pub fn welcome_timeout_secs(self, secs: u64) -> Self {
        self.welcome_timeout(Duration::from_secs(secs))
    }

    /// Set the heartbeat staleness threshold.
    /// Set to 0 to disable staleness detection.
    pub fn stale_threshold(mut self, threshold: Duration) -> Self {
        self.timeouts.stale_threshold = threshold;
        self
    }

    /// Set the heartbeat staleness threshold in seconds.
    /// Set to 0 to disable staleness detection.
    pub fn stale_threshold_secs(self, secs: u64) -> Self {
        self.stale_threshold(Duration::from_secs(secs))
    }

    /// Build the timeout configuration.
    pub fn build(self) -> CableTimeouts {
        self.timeouts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let timeouts = CableTimeouts::default();
        assert_eq!(timeouts.connection_timeout, Duration::from_secs(10));
        assert_eq!(timeouts.welcome_timeout, Duration::from_secs(5));
        assert_eq!(timeouts.stale_threshold, Duration::from_secs(6));
    }

    #[test]
    fn test_builder() {
        let timeouts = CableTimeouts::builder()
            .connection_timeout_secs(60)
            .welcome_timeout_secs(20)
            .stale_threshold(Duration::ZERO)
            .build();

        assert_eq!(timeouts.connection_timeout, Duration::from_secs(60));
        assert_eq!(timeouts.welcome_timeout, Duration::from_secs(20));
        assert!(timeouts.stale_threshold.is_zero());
    }

    #[test]
    fn test_fast_preset() {
        let timeouts = CableTimeouts::fast();
        assert!(timeouts.connection_timeout <= Duration::from_secs(5));
        assert!(timeouts.welcome_timeout <= Duration::from_secs(5));
    }

    #[test]
    fn test_relaxed_preset() {
        let timeouts = CableTimeouts::relaxed();
        assert!(timeouts.connection_timeout >= Duration::from_secs(30));
        assert!(timeouts.stale_threshold >= Duration::from_secs(10));
    }

    #[test]
    fn test_for_testing_disables_staleness() {
        let timeouts = CableTimeouts::for_testing();
        assert!(timeouts.stale_threshold.is_zero());
    }

    #[test]
    fn test_is_no_timeout() {
        assert!(CableTimeouts::is_no_timeout(Duration::ZERO));
        assert!(!CableTimeouts::is_no_timeout(Duration::from_secs(1)));
        assert!(!CableTimeouts::is_no_timeout(Duration::from_secs(3600)));
    }
}
