//! Collaborator seams consumed by the handshake core.
//!
//! The core never does I/O or timing of its own: sending frames, watching
//! for channel close, and arming timers are all behind the traits in this
//! module so the transport layer can plug in its real machinery and tests
//! can inject fakes.

use std::fmt;
use std::io;
use std::time::Duration;

use crate::wire::{HandshakeResponse, Version};

/// A cluster node on the other end of a channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerNode {
    /// Node name as it appears in cluster state.
    pub name: String,
    /// Transport address the channel was opened to.
    pub address: String,
}

impl PeerNode {
    /// Create a peer node descriptor.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

impl fmt::Display for PeerNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{{}}}", self.name, self.address)
    }
}

/// One-shot callback type used for close listeners and timer tasks.
pub type Listener = Box<dyn FnOnce() + Send>;

/// An open TCP channel to a peer, as seen by the handshake core.
///
/// The core only needs to learn about the channel dying; reads and writes
/// stay with the owning transport.
pub trait TcpChannel: Send + Sync {
    /// Register a listener fired at most once when the channel closes for
    /// any reason.
    fn add_close_listener(&self, listener: Listener);
}

/// Reply side of an inbound handshake, provided by the dispatch layer.
pub trait ReplyChannel: Send + Sync {
    /// Serialize and send a handshake response frame.
    fn send_response(&self, response: HandshakeResponse) -> io::Result<()>;
}

/// Dispatches a framed handshake request on a channel.
///
/// Sending is fire-and-forget; a synchronous error means the frame never
/// left and the handshake fails locally.
pub trait HandshakeRequestSender: Send + Sync {
    /// Send a handshake request advertising `version` to `node` over
    /// `channel` under `request_id`.
    fn send_request(
        &self,
        node: &PeerNode,
        channel: &dyn TcpChannel,
        request_id: u64,
        version: Version,
    ) -> io::Result<()>;
}

/// Arms one-shot timers for handshake timeouts.
pub trait Scheduler: Send + Sync {
    /// Run `task` once after `delay` elapses.
    fn schedule(&self, task: Listener, delay: Duration);
}

/// [`Scheduler`] backed by the ambient tokio runtime.
///
/// Each task is a spawned sleep, so `schedule` must be called from within a
/// runtime context.
#[derive(Debug, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule(&self, task: Listener, delay: Duration) {
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_peer_node_display() {
        let node = PeerNode::new("data-2", "10.0.0.7:9300");
        assert_eq!(node.to_string(), "data-2{10.0.0.7:9300}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_fires_after_delay() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();

        TokioScheduler.schedule(
            Box::new(move || flag.store(true, Ordering::SeqCst)),
            Duration::from_millis(50),
        );

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!fired.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(fired.load(Ordering::SeqCst));
    }
}
