//! # Lucero Transport
//!
//! Node-to-node transport negotiation for the [Lucero](https://github.com/lucero-search/lucero)
//! distributed search engine.
//!
//! Before any cluster traffic is allowed on a freshly-opened TCP channel,
//! both ends run a handshake to discover each other's wire version and
//! check compatibility. This crate implements that handshake: the wire
//! codec, the version-family negotiation rules, and the concurrent
//! bookkeeping that resolves each attempt exactly once against whichever
//! of response, timeout, channel close, or send failure happens first.
//!
//! ## Features
//!
//! - **Version negotiation** - Family-aware compatibility rules that keep
//!   rolling upgrades from the legacy 6.x/7.x product line working
//! - **Forward-compatible framing** - Length-prefixed request payloads old
//!   peers can skip and new peers can grow
//! - **One-shot completion** - Lock-free pending table and CAS completion
//!   latch; late events are dropped silently
//! - **Injectable collaborators** - Sending, scheduling, and channel close
//!   notification sit behind traits so hosts and tests plug in their own
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use lucero_transport::{Handshaker, PeerNode, TokioScheduler, Version};
//! # use lucero_transport::{HandshakeRequestSender, TcpChannel, Listener};
//! # struct Sender;
//! # impl HandshakeRequestSender for Sender {
//! #     fn send_request(&self, _: &PeerNode, _: &dyn TcpChannel, _: u64, _: Version) -> std::io::Result<()> { Ok(()) }
//! # }
//! # struct Channel;
//! # impl TcpChannel for Channel { fn add_close_listener(&self, _: Listener) {} }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let handshaker = Handshaker::new(
//!     Version::new(2, 5, 0),
//!     Arc::new(TokioScheduler),
//!     Arc::new(Sender),
//! );
//!
//! let channel = Channel;
//! let (sink, negotiated) = tokio::sync::oneshot::channel();
//! handshaker.send_handshake(
//!     1,
//!     &PeerNode::new("data-1", "10.0.0.5:9300"),
//!     &channel,
//!     Duration::from_secs(30),
//!     sink,
//! );
//!
//! let version = negotiated.await??;
//! println!("channel speaks {version}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`transport`] - Handshake orchestration, pending table, collaborator seams
//! - [`wire`] - Version identities and the low-level wire codec

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod transport;
pub mod wire;

// Re-exports for convenience
pub use transport::{
    HandshakeError, HandshakeMetrics, HandshakeRequestSender, HandshakeResponseHandler,
    HandshakeResult, HandshakeSink, Handshaker, Listener, PeerNode, PendingTable, RemoteException,
    ReplyChannel, Scheduler, TcpChannel, TokioScheduler, HANDSHAKE_ACTION_NAME,
};
pub use wire::{HandshakeRequest, HandshakeResponse, Version, WireError, WireInput, WireOutput};
