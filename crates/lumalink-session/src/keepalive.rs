use std::time::Duration;

use lumalink_frame::{encode_fixed, FixedFrame};
use lumalink_transport::RadioLink;
use tokio::time::MissedTickBehavior;

use crate::error::SessionError;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepAliveState {
    Running,
    Stopped,
}

/// Periodic keep-alive writer for one session.
#[derive(Debug)]
pub struct KeepAlive {
    interval: Duration,
    state: KeepAliveState,
    sent: u64,
}

impl KeepAlive {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: KeepAliveState::Running,
            sent: 0,
        }
    }

    pub fn state(&self) -> KeepAliveState {
        self.state
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Send a keep-alive frame now and then every `interval`, until a write fails.
    ///
    /// Only returns on failure; the returned error is the signal that the
    /// session is dead. Ticks are spaced from the previous write, so a slow
    /// write delays the next one instead of bunching them up.
    pub async fn run<L: RadioLink>(&mut self, session: &Session<L>) -> SessionError {
        let frame = encode_fixed(FixedFrame::KeepAlive);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(err) = session.send(&frame).await {
                self.state = KeepAliveState::Stopped;
                tracing::warn!(
                    address = session.address(),
                    sent = self.sent,
                    error = %err,
                    "keep-alive write failed"
                );
                return SessionError::KeepAlive(err);
            }
            self.sent += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use lumalink_test_harness::{LinkScript, MockLink, MockRadio};
    use lumalink_transport::{DeviceProfile, LinkError, RadioConnector};
    use tokio::time::Instant;

    use super::*;

    async fn open_session(radio: &MockRadio) -> Session<MockLink> {
        let link = radio
            .connect("C9:38:32:30:63:51", Duration::from_secs(1))
            .await
            .expect("connect should succeed");
        Session::open(link, &DeviceProfile::default())
            .await
            .expect("session should open")
    }

    #[tokio::test(start_paused = true)]
    async fn first_frame_is_immediate_then_every_interval() {
        let radio = MockRadio::new();
        radio.script_links([LinkScript::failing_after(3)]);
        let session = open_session(&radio).await;
        let started = Instant::now();

        let mut keep_alive = KeepAlive::new(Duration::from_secs(2));
        let err = keep_alive.run(&session).await;

        assert!(matches!(err, SessionError::KeepAlive(LinkError::Write { .. })));
        assert_eq!(keep_alive.state(), KeepAliveState::Stopped);
        assert_eq!(keep_alive.sent(), 3);
        radio.with_log(|log| {
            let offsets: Vec<Duration> = log.writes.iter().map(|w| w.at - started).collect();
            assert_eq!(offsets.len(), 3);
            assert!(offsets[0] < Duration::from_millis(10));
            assert!(offsets[1] >= Duration::from_secs(2));
            assert!(offsets[2] >= Duration::from_secs(4));
            for frame in log.frames_on(0) {
                assert_eq!(frame, encode_fixed(FixedFrame::KeepAlive).as_bytes());
            }
        });
    }

    #[tokio::test]
    async fn stops_when_session_closed() {
        let radio = MockRadio::new();
        let session = open_session(&radio).await;
        session.close().await.expect("close");

        let mut keep_alive = KeepAlive::new(Duration::from_secs(2));
        assert_eq!(keep_alive.state(), KeepAliveState::Running);
        let err = keep_alive.run(&session).await;

        assert!(matches!(err, SessionError::KeepAlive(LinkError::Closed)));
        assert_eq!(keep_alive.state(), KeepAliveState::Stopped);
        assert_eq!(keep_alive.sent(), 0);
    }
}
