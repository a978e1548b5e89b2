use std::time::Duration;

use lumalink_transport::DeviceProfile;

/// Upper bound on one connect attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Time between keep-alive frames. The light drops idle links after a few seconds.
pub const DEFAULT_KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(2);
/// Delay between a session ending and the next connect attempt.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(5);

/// Configuration for the reconnection supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Which light to connect to.
    pub device: DeviceProfile,
    /// Bound on each connect attempt.
    pub connect_timeout: Duration,
    /// Keep-alive period while a session is active.
    pub keep_alive_interval: Duration,
    /// Fixed wait before reconnecting.
    pub backoff: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            device: DeviceProfile::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            keep_alive_interval: DEFAULT_KEEP_ALIVE_INTERVAL,
            backoff: DEFAULT_BACKOFF,
        }
    }
}
