use std::fmt;
use std::sync::Arc;

use lumalink_transport::{connect_within, RadioConnector, TextChannel, TextClient};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::SupervisorConfig;
use crate::error::SessionError;
use crate::keepalive::KeepAlive;
use crate::relay::relay_client;
use crate::session::Session;

/// Where the supervisor is in its connect/serve/back-off cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Connecting,
    Active,
    BackingOff,
    /// Shutdown was requested; terminal.
    Stopped,
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connecting => "connecting",
            Self::Active => "active",
            Self::BackingOff => "backing-off",
            Self::Stopped => "stopped",
        })
    }
}

/// Keeps a radio session alive for as long as the process runs.
///
/// Each cycle connects (bounded by the connect timeout), opens a
/// [`Session`], then runs the keep-alive and accepts clients until the
/// keep-alive fails, a relayed write fails, or the text channel dies. The
/// session is then torn down and, after a fixed back-off, the cycle starts
/// again. No session error ends the loop; only the shutdown token does.
///
/// At most one session exists at a time. Clients are only accepted while a
/// session is active; clients that arrive while backing off wait in the
/// channel until the next session starts.
pub struct Supervisor<C, T> {
    connector: C,
    channel: T,
    config: SupervisorConfig,
    state: watch::Sender<SupervisorState>,
    shutdown: CancellationToken,
}

impl<C, T> Supervisor<C, T>
where
    C: RadioConnector,
    T: TextChannel,
{
    pub fn new(connector: C, channel: T, config: SupervisorConfig) -> Self {
        let (state, _) = watch::channel(SupervisorState::Connecting);
        Self {
            connector,
            channel,
            config,
            state,
            shutdown: CancellationToken::new(),
        }
    }

    /// Use an externally owned shutdown token.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Token that stops [`run`](Self::run) when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SupervisorState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SupervisorState {
        *self.state.borrow()
    }

    /// Run cycles until shutdown, leaving the state at [`SupervisorState::Stopped`].
    pub async fn run(mut self) {
        while !self.shutdown.is_cancelled() {
            match self.run_cycle().await {
                Ok(()) => break,
                Err(err) => tracing::warn!(
                    error = %err,
                    backoff = ?self.config.backoff,
                    "session ended, reconnecting after back-off"
                ),
            }

            self.set_state(SupervisorState::BackingOff);
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.backoff) => {}
            }
        }
        self.set_state(SupervisorState::Stopped);
        tracing::info!("supervisor stopped");
    }

    /// One connect/serve/teardown cycle. `Ok` means shutdown was requested.
    async fn run_cycle(&mut self) -> Result<(), SessionError> {
        self.set_state(SupervisorState::Connecting);
        let address = self.config.device.address.clone();
        tracing::info!(%address, timeout = ?self.config.connect_timeout, "connecting to light");

        let link = tokio::select! {
            _ = self.shutdown.cancelled() => return Ok(()),
            link = connect_within(&self.connector, &address, self.config.connect_timeout) => link?,
        };
        let session = match Session::open_until(link, &self.config.device, &self.shutdown).await? {
            Some(session) => Arc::new(session),
            None => return Ok(()),
        };

        self.set_state(SupervisorState::Active);
        let outcome = self.serve(&session).await;

        if let Err(err) = session.close().await {
            tracing::warn!(%address, error = %err, "disconnect failed during teardown");
        }
        outcome
    }

    async fn serve(&mut self, session: &Arc<Session<C::Link>>) -> Result<(), SessionError> {
        let mut keep_alive = KeepAlive::new(self.config.keep_alive_interval);
        let heartbeat = keep_alive.run(session.as_ref());
        tokio::pin!(heartbeat);
        let mut clients = JoinSet::new();

        let outcome = loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break Ok(()),
                err = &mut heartbeat => break Err(err),
                accepted = self.channel.accept() => match accepted {
                    Ok(mut client) => {
                        let peer = client.peer().to_string();
                        tracing::info!(%peer, "client connected");
                        let session = Arc::clone(session);
                        clients.spawn(async move {
                            let result = relay_client(session.as_ref(), &mut client).await;
                            (peer, result)
                        });
                    }
                    Err(err) => break Err(SessionError::Channel(err)),
                },
                Some(joined) = clients.join_next() => match joined {
                    Ok((peer, Ok(()))) => tracing::info!(%peer, "client finished"),
                    Ok((peer, Err(err))) => {
                        tracing::warn!(%peer, error = %err, "client hit a radio failure");
                        break Err(err);
                    }
                    Err(join_err) if join_err.is_cancelled() => {}
                    Err(join_err) => break Err(SessionError::ClientTask(join_err.to_string())),
                },
            }
        };

        clients.shutdown().await;
        outcome
    }

    fn set_state(&self, next: SupervisorState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::debug!(from = %previous, to = %next, "supervisor state changed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use lumalink_test_harness::{memory_channel, ConnectOutcome, LinkScript, MockRadio};

    use super::*;

    fn config() -> SupervisorConfig {
        SupervisorConfig::default()
    }

    #[test]
    fn state_display() {
        assert_eq!(SupervisorState::BackingOff.to_string(), "backing-off");
        assert_eq!(SupervisorState::Active.to_string(), "active");
    }

    #[tokio::test(start_paused = true)]
    async fn reaches_active_and_stops_on_shutdown() {
        let radio = MockRadio::new();
        let (channel, _dialer) = memory_channel();
        let supervisor = Supervisor::new(radio.clone(), channel, config());
        let shutdown = supervisor.shutdown_token();
        let mut states = supervisor.subscribe();
        let task = tokio::spawn(supervisor.run());

        states
            .wait_for(|state| *state == SupervisorState::Active)
            .await
            .expect("supervisor should become active");
        shutdown.cancel();
        task.await.expect("supervisor should not panic");

        assert_eq!(*states.borrow(), SupervisorState::Stopped);
        radio.with_log(|log| {
            assert_eq!(log.connect_attempts.len(), 1);
            assert!(log.was_disconnected(0));
        });
    }

    #[tokio::test(start_paused = true)]
    async fn connect_timeout_leads_to_back_off() {
        let radio = MockRadio::new();
        radio.script_connects([ConnectOutcome::Hang]);
        let (channel, _dialer) = memory_channel();
        let supervisor = Supervisor::new(radio.clone(), channel, config());
        let shutdown = supervisor.shutdown_token();
        let mut states = supervisor.subscribe();
        let task = tokio::spawn(supervisor.run());

        states
            .wait_for(|state| *state == SupervisorState::BackingOff)
            .await
            .expect("timeout should lead to back-off");
        radio
            .wait_for(|log| log.connect_attempts.len() == 2)
            .await;
        shutdown.cancel();
        task.await.expect("supervisor should not panic");

        radio.with_log(|log| {
            let gap = log.connect_attempts[1] - log.connect_attempts[0];
            assert!(gap >= Duration::from_secs(35));
        });
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_while_connecting_stops_immediately() {
        let radio = MockRadio::new();
        radio.script_connects([ConnectOutcome::Hang]);
        let (channel, _dialer) = memory_channel();
        let shutdown = CancellationToken::new();
        let supervisor =
            Supervisor::new(radio.clone(), channel, config()).with_shutdown(shutdown.clone());
        let mut states = supervisor.subscribe();
        let task = tokio::spawn(supervisor.run());

        radio.wait_for(|log| log.connect_attempts.len() == 1).await;
        shutdown.cancel();
        task.await.expect("supervisor should not panic");

        assert_eq!(*states.borrow_and_update(), SupervisorState::Stopped);
        radio.with_log(|log| assert_eq!(log.links_opened, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_while_subscribing_releases_link() {
        let radio = MockRadio::new();
        radio.script_links([LinkScript {
            stall_subscribe: true,
            ..LinkScript::default()
        }]);
        let (channel, _dialer) = memory_channel();
        let supervisor = Supervisor::new(radio.clone(), channel, config());
        let shutdown = supervisor.shutdown_token();
        let mut states = supervisor.subscribe();
        let task = tokio::spawn(supervisor.run());

        radio.wait_for(|log| log.links_opened == 1).await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("supervisor should stop promptly")
            .expect("supervisor should not panic");

        assert_eq!(*states.borrow_and_update(), SupervisorState::Stopped);
        radio.with_log(|log| {
            assert!(log.subscriptions.is_empty());
            assert!(log.was_disconnected(0));
        });
    }
}
