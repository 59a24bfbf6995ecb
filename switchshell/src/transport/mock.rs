//! Scripted in-memory transport for driver and dispatcher tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{ShellChannel, Transport};
use crate::error::{ChannelError, Result};

type Responder = dyn FnMut(&[u8]) -> Vec<Reply> + Send;

/// One chunk the fake device emits, optionally after a delay.
#[derive(Debug, Clone)]
pub(crate) struct Reply {
    pub delay: Duration,
    pub data: Vec<u8>,
    /// The device drops the channel instead of sending data.
    pub hangup: bool,
}

impl Reply {
    pub fn now(data: impl AsRef<[u8]>) -> Self {
        Self::after(Duration::ZERO, data)
    }

    pub fn after(delay: Duration, data: impl AsRef<[u8]>) -> Self {
        Self {
            delay,
            data: data.as_ref().to_vec(),
            hangup: false,
        }
    }

    /// The remote side closes the channel.
    pub fn hangup() -> Self {
        Self {
            delay: Duration::ZERO,
            data: Vec::new(),
            hangup: true,
        }
    }
}

/// Everything the driver wrote to, and did with, a mock channel.
#[derive(Debug, Default)]
pub(crate) struct Wire {
    pub sent: Vec<Vec<u8>>,
    pub channels_opened: usize,
    pub channels_closed: usize,
    pub transport_closed: bool,
}

impl Wire {
    pub fn sent_text(&self) -> Vec<String> {
        self.sent
            .iter()
            .map(|s| String::from_utf8_lossy(s).into_owned())
            .collect()
    }
}

/// Fake device: every `send` is handed to `responder`, whose replies are
/// queued for the driver to read.
pub(crate) struct MockTransport {
    responder: Arc<Mutex<Box<Responder>>>,
    wire: Arc<Mutex<Wire>>,
    fail_open: bool,
    hang_open: bool,
    stall_sends_after: Option<usize>,
}

impl MockTransport {
    pub fn new(responder: impl FnMut(&[u8]) -> Vec<Reply> + Send + 'static) -> Self {
        Self {
            responder: Arc::new(Mutex::new(Box::new(responder))),
            wire: Arc::new(Mutex::new(Wire::default())),
            fail_open: false,
            hang_open: false,
            stall_sends_after: None,
        }
    }

    /// A device that echoes nothing and never shows a prompt.
    pub fn silent() -> Self {
        Self::new(|_| Vec::new())
    }

    /// A device that answers the first send (the command) with `chunks`.
    pub fn answering(chunks: Vec<Reply>) -> Self {
        let mut chunks = Some(chunks);
        Self::new(move |_| chunks.take().unwrap_or_default())
    }

    pub fn failing_open() -> Self {
        let mut transport = Self::silent();
        transport.fail_open = true;
        transport
    }

    /// A device that never confirms the channel open.
    pub fn hanging_open() -> Self {
        let mut transport = Self::silent();
        transport.hang_open = true;
        transport
    }

    /// Writes past the first `sends` on each channel never complete, as
    /// with a peer that stops granting window space.
    pub fn stall_sends_after(mut self, sends: usize) -> Self {
        self.stall_sends_after = Some(sends);
        self
    }

    pub fn wire(&self) -> Arc<Mutex<Wire>> {
        self.wire.clone()
    }
}

impl Transport for MockTransport {
    type Channel = MockChannel;

    async fn open_shell(&self) -> Result<MockChannel> {
        if self.fail_open {
            return Err(ChannelError::OpenFailed("administratively prohibited".into()).into());
        }
        if self.hang_open {
            return std::future::pending().await;
        }
        self.wire.lock().unwrap().channels_opened += 1;
        Ok(MockChannel {
            responder: self.responder.clone(),
            wire: self.wire.clone(),
            queue: VecDeque::new(),
            closed: false,
            sends: 0,
            stall_sends_after: self.stall_sends_after,
        })
    }

    async fn close(self) -> Result<()> {
        self.wire.lock().unwrap().transport_closed = true;
        Ok(())
    }
}

pub(crate) struct MockChannel {
    responder: Arc<Mutex<Box<Responder>>>,
    wire: Arc<Mutex<Wire>>,
    queue: VecDeque<Reply>,
    closed: bool,
    sends: usize,
    stall_sends_after: Option<usize>,
}

impl ShellChannel for MockChannel {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if self.closed {
            return Err(ChannelError::Closed.into());
        }
        if self.stall_sends_after.is_some_and(|limit| self.sends >= limit) {
            return std::future::pending().await;
        }
        self.sends += 1;
        self.wire.lock().unwrap().sent.push(data.to_vec());
        let replies = (self.responder.lock().unwrap())(data);
        self.queue.extend(replies);
        Ok(())
    }

    async fn recv(&mut self, max: usize) -> Result<Vec<u8>> {
        let Some(front) = self.queue.front() else {
            return std::future::pending().await;
        };
        if !front.delay.is_zero() {
            tokio::time::sleep(front.delay).await;
            if let Some(front) = self.queue.front_mut() {
                front.delay = Duration::ZERO;
            }
        }
        if self.queue.front().is_some_and(|front| front.hangup) {
            self.queue.pop_front();
            self.closed = true;
            return Err(ChannelError::Closed.into());
        }
        Ok(self.pop(max))
    }

    fn try_recv(&mut self, max: usize) -> Result<Option<Vec<u8>>> {
        match self.queue.front() {
            Some(front) if front.delay.is_zero() && !front.hangup => Ok(Some(self.pop(max))),
            _ => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.wire.lock().unwrap().channels_closed += 1;
        Ok(())
    }
}

impl MockChannel {
    fn pop(&mut self, max: usize) -> Vec<u8> {
        let Some(mut front) = self.queue.pop_front() else {
            return Vec::new();
        };
        if front.data.len() > max {
            let rest = front.data.split_off(max);
            self.queue.push_front(Reply::now(rest));
        }
        front.data
    }
}
