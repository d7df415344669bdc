//! Queue-backed boundary between the application and the wireless link.
//!
//! Outbound payloads and inbound frames share one bounded queue, drained by
//! a single worker. Producers never wait: a full queue fails the send, or
//! drops the inbound frame. The link is best-effort and nothing is retried.

use alloc::{boxed::Box, format, vec::Vec};
use core::sync::atomic::{AtomicU32, Ordering};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel};
use embassy_time::with_timeout;

use crate::{
    config::{COMMAND_QUEUE_DEPTH, TRANSPORT_POLL_TIMEOUT, TRANSPORT_QUEUE_DEPTH},
    error::{LinkError, TransportError},
    memlog::SharedLogger,
    peer::PeerAddress,
    task::alert::{AlertEvent, Alerts},
    wire::ActuatorCommand,
};

pub type CommandChannel =
    channel::Channel<CriticalSectionRawMutex, ActuatorCommand, COMMAND_QUEUE_DEPTH>;
pub type CommandSender =
    channel::Sender<'static, CriticalSectionRawMutex, ActuatorCommand, COMMAND_QUEUE_DEPTH>;
pub type CommandReceiver =
    channel::Receiver<'static, CriticalSectionRawMutex, ActuatorCommand, COMMAND_QUEUE_DEPTH>;

/// The channel carrying decoded commands from the worker to the orchestrator.
pub fn init_commands() -> &'static CommandChannel {
    Box::leak(Box::new(channel::Channel::new()))
}

/// Frame-level access to the radio.
#[allow(async_fn_in_trait)]
pub trait WirelessLink {
    /// Transmits one frame. Resolves once the link layer reports the outcome.
    async fn send_frame(&mut self, peer: &PeerAddress, frame: &[u8]) -> Result<(), LinkError>;
}

/// A queued frame. The buffer is owned by the queue until the worker is done with it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportItem {
    Outbound(Vec<u8>),
    Inbound(Vec<u8>),
}

/// What the worker did with one item.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Processed {
    Sent,
    SendFailed(LinkError),
    Delivered(ActuatorCommand),
    /// The inbound frame did not decode as a command.
    Rejected(LinkError),
    /// The orchestrator is behind, the command was dropped.
    CommandQueueFull(ActuatorCommand),
}

pub struct Transport {
    queue: channel::Channel<CriticalSectionRawMutex, TransportItem, TRANSPORT_QUEUE_DEPTH>,
    peer: PeerAddress,
    alerts: Alerts,
    dropped_frames: AtomicU32,
}

pub fn init(peer: PeerAddress, alerts: Alerts) -> &'static Transport {
    Box::leak(Box::new(Transport::new(peer, alerts)))
}

impl Transport {
    pub fn new(peer: PeerAddress, alerts: Alerts) -> Self {
        Transport {
            queue: channel::Channel::new(),
            peer,
            alerts,
            dropped_frames: AtomicU32::new(0),
        }
    }

    pub fn peer(&self) -> PeerAddress {
        self.peer
    }

    /// Queues a copy of `payload` for transmission to the peer.
    pub fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        let buffer = copy_frame(payload).ok_or(TransportError::OutOfMemory)?;
        self.queue
            .try_send(TransportItem::Outbound(buffer))
            .map_err(|_| TransportError::QueueFull)
    }

    /// Inbound frame from the link layer. Never blocks; drops the frame if
    /// the queue is full.
    pub fn on_frame_received(&self, raw: &[u8]) {
        let queued = copy_frame(raw)
            .is_some_and(|buffer| self.queue.try_send(TransportItem::Inbound(buffer)).is_ok());

        if !queued {
            self.dropped_frames.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Completion report from the link layer.
    pub fn on_send_completed(&self, _peer: &PeerAddress, success: bool) {
        if !success {
            self.alerts.notify(AlertEvent::SendFailed);
        }
    }

    /// Inbound frames lost at the callback boundary.
    pub fn dropped_frames(&self) -> u32 {
        self.dropped_frames.load(Ordering::Relaxed)
    }

    /// Items waiting for the worker.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Runs the worker forever.
    pub async fn run(
        &self,
        link: &mut impl WirelessLink,
        commands: CommandSender,
        memlog: SharedLogger,
    ) -> ! {
        loop {
            self.process_next(link, commands, memlog).await;
        }
    }

    /// Waits briefly for one item and handles it. Returns `None` on timeout.
    pub async fn process_next(
        &self,
        link: &mut impl WirelessLink,
        commands: CommandSender,
        memlog: SharedLogger,
    ) -> Option<Processed> {
        let item = with_timeout(TRANSPORT_POLL_TIMEOUT, self.queue.receive())
            .await
            .ok()?;

        // The item's buffer is released when it goes out of scope, whatever the outcome.
        let processed = match item {
            TransportItem::Outbound(frame) => match link.send_frame(&self.peer, &frame).await {
                Ok(()) => {
                    self.on_send_completed(&self.peer, true);
                    Processed::Sent
                }
                Err(error) => {
                    memlog.warn(format!("send to {} failed: {error}", self.peer));
                    self.on_send_completed(&self.peer, false);
                    Processed::SendFailed(error)
                }
            },

            TransportItem::Inbound(frame) => match ActuatorCommand::decode(&frame) {
                Ok(command) => match commands.try_send(command) {
                    Ok(()) => Processed::Delivered(command),
                    Err(_) => {
                        memlog.warn("command queue full, command dropped");
                        Processed::CommandQueueFull(command)
                    }
                },
                Err(error) => {
                    memlog.warn(format!("inbound frame dropped: {error}"));
                    Processed::Rejected(error)
                }
            },
        };

        Some(processed)
    }
}

// Copies a frame into an owned buffer, or fails if the heap can't fit it.
fn copy_frame(bytes: &[u8]) -> Option<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(bytes.len()).ok()?;
    buffer.extend_from_slice(bytes);
    Some(buffer)
}
