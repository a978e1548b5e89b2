use lumalink_frame::command::normalize;
use lumalink_frame::{encode_command, LogicalCommand};
use lumalink_transport::{LinkError, RadioLink, TextClient};

use crate::error::SessionError;
use crate::session::Session;

/// What to do after handling one client line.
#[derive(Debug)]
pub enum LineDisposition {
    /// Send the reply and keep reading.
    Reply(String),
    /// Send the reply and end this client's loop.
    Farewell(String),
    /// Send the reply, end this client's loop and fail the session.
    LinkLost(String, LinkError),
}

impl LineDisposition {
    pub fn reply(&self) -> &str {
        match self {
            Self::Reply(reply) | Self::Farewell(reply) | Self::LinkLost(reply, _) => reply,
        }
    }
}

/// Handle one line: parse, encode, transmit, and decide on the reply.
///
/// Transmits at most one frame. Only a radio write failure is fatal; parse
/// and range errors are reported back to the client.
pub async fn handle_line<L: RadioLink>(session: &Session<L>, line: &str) -> LineDisposition {
    let command = LogicalCommand::parse(line);
    let frame = match &command {
        LogicalCommand::Disconnect => {
            return LineDisposition::Farewell("Disconnecting...".to_string())
        }
        LogicalCommand::Unknown(normalized) => {
            return LineDisposition::Reply(format!("Unknown command: {normalized}"))
        }
        _ => match encode_command(&command) {
            Ok(Some(frame)) => frame,
            Ok(None) => return LineDisposition::Reply(format!("Unknown command: {command}")),
            Err(err) => return LineDisposition::Reply(format!("Error: {err}")),
        },
    };

    match session.send(&frame).await {
        Ok(()) => LineDisposition::Reply(format!("Executed: {}", normalize(line))),
        Err(err) => LineDisposition::LinkLost(format!("Error: {err}"), err),
    }
}

/// Serve one client until it leaves, says `exit`, or the radio link fails.
///
/// A client going away or its transport failing ends the loop with `Ok`.
/// A radio write failure is reported to the client and then returned, so
/// the caller can tear the session down.
pub async fn relay_client<L, C>(session: &Session<L>, client: &mut C) -> Result<(), SessionError>
where
    L: RadioLink,
    C: TextClient,
{
    loop {
        let line = match client.recv_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::debug!(peer = client.peer(), "client disconnected");
                return Ok(());
            }
            Err(err) => {
                tracing::debug!(peer = client.peer(), error = %err, "client transport failed");
                return Ok(());
            }
        };

        let disposition = handle_line(session, &line).await;
        tracing::debug!(peer = client.peer(), line = %line, reply = disposition.reply(), "handled line");

        let delivered = client.send_line(disposition.reply()).await;
        if let Err(err) = delivered {
            tracing::debug!(peer = client.peer(), error = %err, "reply not delivered");
            return match disposition {
                LineDisposition::LinkLost(_, link_err) => Err(link_err.into()),
                _ => Ok(()),
            };
        }

        match disposition {
            LineDisposition::Reply(_) => {}
            LineDisposition::Farewell(_) => return Ok(()),
            LineDisposition::LinkLost(_, link_err) => return Err(link_err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use lumalink_frame::{encode_color, encode_fixed, FixedFrame};
    use lumalink_test_harness::{memory_channel, LinkScript, MockLink, MockRadio};
    use lumalink_transport::{DeviceProfile, RadioConnector, TextChannel};

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

    #[tokio::test]
    async fn executes_and_echoes_normalized_input() {
        let radio = MockRadio::new();
        let session = open_session(&radio).await;

        let disposition = handle_line(&session, "  COLOR 10 20 30 ").await;

        assert!(matches!(&disposition, LineDisposition::Reply(r) if r == "Executed: color 10 20 30"));
        radio.with_log(|log| {
            assert_eq!(
                log.frames_on(0),
                vec![encode_color(10, 20, 30).expect("valid").as_bytes().to_vec()]
            );
        });
    }

    #[tokio::test]
    async fn unknown_and_invalid_send_nothing() {
        let radio = MockRadio::new();
        let session = open_session(&radio).await;

        let unknown = handle_line(&session, "Dance Now").await;
        assert_eq!(unknown.reply(), "Unknown command: dance now");

        let short = handle_line(&session, "color 1 2").await;
        assert_eq!(short.reply(), "Unknown command: color 1 2");

        let invalid = handle_line(&session, "brightness 101").await;
        assert_eq!(
            invalid.reply(),
            "Error: brightness must be between 0 and 100 (got 101)"
        );
        assert!(matches!(invalid, LineDisposition::Reply(_)));

        radio.with_log(|log| assert!(log.writes.is_empty()));
    }

    #[tokio::test]
    async fn exit_is_a_farewell_without_a_frame() {
        let radio = MockRadio::new();
        let session = open_session(&radio).await;

        let disposition = handle_line(&session, "EXIT").await;

        assert!(matches!(&disposition, LineDisposition::Farewell(r) if r == "Disconnecting..."));
        radio.with_log(|log| assert!(log.writes.is_empty()));
    }

    #[tokio::test]
    async fn write_failure_is_link_lost() {
        let radio = MockRadio::new();
        radio.script_links([LinkScript::failing_after(0)]);
        let session = open_session(&radio).await;

        let disposition = handle_line(&session, "on").await;

        assert!(disposition.reply().starts_with("Error: write to "));
        assert!(matches!(
            disposition,
            LineDisposition::LinkLost(_, LinkError::Write { .. })
        ));
    }

    #[tokio::test]
    async fn relay_replies_once_per_line_until_exit() {
        let radio = MockRadio::new();
        let session = open_session(&radio).await;
        let (mut channel, mut dialer) = memory_channel();
        let mut peer = dialer.connect();
        let mut client = channel.accept().await.expect("accept");

        for line in ["on", "bogus", "brightness 50", "exit", "off"] {
            assert!(peer.send(line));
        }
        relay_client(&session, &mut client)
            .await
            .expect("relay should end cleanly");
        drop(client);

        let mut replies = Vec::new();
        while let Some(reply) = peer.recv().await {
            replies.push(reply);
        }
        assert_eq!(
            replies,
            vec![
                "Executed: on",
                "Unknown command: bogus",
                "Executed: brightness 50",
                "Disconnecting...",
            ]
        );
        radio.with_log(|log| {
            assert_eq!(log.frames_on(0).len(), 2);
            assert_eq!(log.frames_on(0)[0], encode_fixed(FixedFrame::TurnOn).as_bytes());
        });
    }

    #[tokio::test]
    async fn relay_ends_quietly_when_client_hangs_up() {
        let radio = MockRadio::new();
        let session = open_session(&radio).await;
        let (mut channel, mut dialer) = memory_channel();
        let mut peer = dialer.connect();
        let mut client = channel.accept().await.expect("accept");

        peer.hang_up();
        relay_client(&session, &mut client)
            .await
            .expect("hang-up is not an error");
        assert!(session.is_open().await);
    }

    #[tokio::test]
    async fn relay_reports_then_propagates_link_loss() {
        let radio = MockRadio::new();
        radio.script_links([LinkScript::failing_after(0)]);
        let session = open_session(&radio).await;
        let (mut channel, mut dialer) = memory_channel();
        let mut peer = dialer.connect();
        let mut client = channel.accept().await.expect("accept");

        assert!(peer.send("illuminate"));
        let err = relay_client(&session, &mut client)
            .await
            .expect_err("link loss should propagate");

        assert!(matches!(err, SessionError::Link(LinkError::Write { .. })));
        let reply = peer.recv().await.expect("client should get a reply");
        assert!(reply.starts_with("Error: "));
    }
}
