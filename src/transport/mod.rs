//! # Transport Layer
//!
//! Connection-level handshake orchestration for node-to-node channels:
//!
//! - [`handshaker`] - Client and server handshake paths
//! - [`pending`] - In-flight handshake registry
//! - [`channel`] - Collaborator seams (channels, sender, scheduler)
//! - [`error`] - Terminal handshake errors
//!
//! The transport layer owning the TCP machinery creates one [`Handshaker`]
//! per transport, routes inbound frames carrying
//! [`HANDSHAKE_ACTION_NAME`] to it, and reads the negotiated version out of
//! the completion sink before letting any other traffic onto the channel.

pub mod channel;
pub mod error;
pub mod handshaker;
pub mod pending;

/// Action identifier the dispatch layer routes handshake frames by.
pub const HANDSHAKE_ACTION_NAME: &str = "internal:tcp/handshake";

pub use channel::{
    HandshakeRequestSender, Listener, PeerNode, ReplyChannel, Scheduler, TcpChannel,
    TokioScheduler,
};
pub use error::{HandshakeError, RemoteException};
pub use handshaker::{
    HandshakeMetrics, HandshakeResponseHandler, HandshakeResult, HandshakeSink, Handshaker,
};
pub use pending::PendingTable;
