use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use lumalink_frame::{verify_checksum, FRAME_LEN};
use lumalink_transport::{LinkError, NotifyHandler, RadioConnector, RadioLink, Result};
use tokio::sync::Notify;
use tokio::time::Instant;
use uuid::Uuid;

/// What the next connect attempt does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// Hand out a new link.
    Accept,
    /// Fail immediately with [`LinkError::Connect`].
    Refuse,
    /// Never complete; only the caller's timeout ends the attempt.
    Hang,
}

/// Behavior of one link handed out by [`MockRadio`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkScript {
    /// Fail every write once this many writes succeeded on the link.
    pub fail_after_writes: Option<usize>,
    /// Fail the notification subscription.
    pub fail_subscribe: bool,
    /// Never complete the notification subscription.
    pub stall_subscribe: bool,
}

impl LinkScript {
    pub fn failing_after(writes: usize) -> Self {
        Self {
            fail_after_writes: Some(writes),
            ..Self::default()
        }
    }
}

/// One successful write observed by the fake radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    /// Index of the link (0 for the first successful connect).
    pub link: usize,
    pub characteristic: Uuid,
    pub data: Vec<u8>,
    pub at: Instant,
}

/// Everything the fake radio observed.
#[derive(Debug, Default)]
pub struct RadioLog {
    pub connect_attempts: Vec<Instant>,
    pub links_opened: usize,
    pub subscriptions: Vec<(usize, Uuid)>,
    pub writes: Vec<WriteRecord>,
    pub failed_writes: Vec<(usize, Instant)>,
    pub disconnects: Vec<(usize, Instant)>,
    /// Raw bytes in the order they hit the air, one byte at a time.
    pub wire: Vec<u8>,
    pub max_concurrent_writes: usize,
    in_flight: usize,
}

impl RadioLog {
    /// Frames written on `link`, in order.
    pub fn frames_on(&self, link: usize) -> Vec<Vec<u8>> {
        self.writes
            .iter()
            .filter(|write| write.link == link)
            .map(|write| write.data.clone())
            .collect()
    }

    /// Whether the wire splits cleanly into checksummed frames.
    pub fn wire_is_well_framed(&self) -> bool {
        self.wire.len() % FRAME_LEN == 0 && self.wire.chunks(FRAME_LEN).all(verify_checksum)
    }

    pub fn was_disconnected(&self, link: usize) -> bool {
        self.disconnects.iter().any(|(index, _)| *index == link)
    }
}

#[derive(Default)]
struct Shared {
    log: RadioLog,
    connect_script: VecDeque<ConnectOutcome>,
    link_script: VecDeque<LinkScript>,
    handlers: Vec<NotifyHandler>,
}

/// Fake radio: a [`RadioConnector`] whose links write into a shared log.
///
/// Clones share the same state, so a test keeps one clone for assertions
/// and hands another to the code under test.
#[derive(Clone, Default)]
pub struct MockRadio {
    shared: Arc<Mutex<Shared>>,
    changed: Arc<Notify>,
}

impl MockRadio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue outcomes for the next connect attempts. Unscripted attempts succeed.
    pub fn script_connects(&self, outcomes: impl IntoIterator<Item = ConnectOutcome>) {
        self.lock().connect_script.extend(outcomes);
    }

    /// Queue behavior for the next links handed out. Unscripted links are healthy.
    pub fn script_links(&self, scripts: impl IntoIterator<Item = LinkScript>) {
        self.lock().link_script.extend(scripts);
    }

    /// Deliver a notification to every subscribed handler.
    pub fn emit_notification(&self, payload: &[u8]) {
        for handler in &self.lock().handlers {
            handler(payload);
        }
    }

    /// Run `inspect` against the current log.
    pub fn with_log<R>(&self, inspect: impl FnOnce(&RadioLog) -> R) -> R {
        inspect(&self.lock().log)
    }

    /// Wait until `condition` holds for the log.
    pub async fn wait_for(&self, mut condition: impl FnMut(&RadioLog) -> bool) {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if condition(&self.lock().log) {
                return;
            }
            notified.await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update<R>(&self, apply: impl FnOnce(&mut Shared) -> R) -> R {
        let result = apply(&mut self.lock());
        self.changed.notify_waiters();
        result
    }
}

#[async_trait]
impl RadioConnector for MockRadio {
    type Link = MockLink;

    async fn connect(&self, address: &str, _timeout: Duration) -> Result<MockLink> {
        let outcome = self.update(|shared| {
            shared.log.connect_attempts.push(Instant::now());
            shared
                .connect_script
                .pop_front()
                .unwrap_or(ConnectOutcome::Accept)
        });

        match outcome {
            ConnectOutcome::Accept => {
                let (index, script) = self.update(|shared| {
                    let index = shared.log.links_opened;
                    shared.log.links_opened += 1;
                    (index, shared.link_script.pop_front().unwrap_or_default())
                });
                Ok(MockLink {
                    radio: self.clone(),
                    index,
                    script,
                    address: address.to_string(),
                    writes: 0,
                    connected: true,
                })
            }
            ConnectOutcome::Refuse => Err(LinkError::Connect {
                address: address.to_string(),
                reason: "device not in range".to_string(),
            }),
            ConnectOutcome::Hang => std::future::pending().await,
        }
    }
}

/// A link handed out by [`MockRadio`].
pub struct MockLink {
    radio: MockRadio,
    index: usize,
    script: LinkScript,
    address: String,
    writes: usize,
    connected: bool,
}

impl MockLink {
    pub fn index(&self) -> usize {
        self.index
    }
}

#[async_trait]
impl RadioLink for MockLink {
    async fn subscribe_notify(&mut self, characteristic: Uuid, handler: NotifyHandler) -> Result<()> {
        if !self.connected {
            return Err(LinkError::Closed);
        }
        if self.script.fail_subscribe {
            return Err(LinkError::Subscribe {
                characteristic,
                reason: "scripted subscribe failure".to_string(),
            });
        }
        if self.script.stall_subscribe {
            return std::future::pending().await;
        }
        let index = self.index;
        self.radio.update(|shared| {
            shared.log.subscriptions.push((index, characteristic));
            shared.handlers.push(handler);
        });
        Ok(())
    }

    async fn write(&mut self, characteristic: Uuid, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(LinkError::Closed);
        }
        let index = self.index;
        if self
            .script
            .fail_after_writes
            .is_some_and(|budget| self.writes >= budget)
        {
            self.radio
                .update(|shared| shared.log.failed_writes.push((index, Instant::now())));
            return Err(LinkError::Write {
                characteristic,
                reason: "scripted link loss".to_string(),
            });
        }

        self.radio.update(|shared| {
            shared.log.in_flight += 1;
            shared.log.max_concurrent_writes =
                shared.log.max_concurrent_writes.max(shared.log.in_flight);
        });
        // Byte-at-a-time with yields, so overlapping writers would interleave.
        for byte in data {
            self.radio.update(|shared| shared.log.wire.push(*byte));
            tokio::task::yield_now().await;
        }
        self.writes += 1;
        self.radio.update(|shared| {
            shared.log.in_flight -= 1;
            shared.log.writes.push(WriteRecord {
                link: index,
                characteristic,
                data: data.to_vec(),
                at: Instant::now(),
            });
        });
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if !self.connected {
            return Ok(());
        }
        self.connected = false;
        let index = self.index;
        self.radio.update(|shared| {
            shared.log.disconnects.push((index, Instant::now()));
            shared.handlers.clear();
        });
        Ok(())
    }

    fn address(&self) -> &str {
        &self.address
    }
}
