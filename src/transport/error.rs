//! Transport handshake error types.

use std::io;
use std::time::Duration;

use thiserror::Error;

use super::channel::PeerNode;
use super::HANDSHAKE_ACTION_NAME;
use crate::wire::{Version, WireError};

/// Failure reported by the remote side of a transport exchange.
///
/// The dispatch layer decodes remote failures from error frames and hands
/// them to the pending handshake handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RemoteException {
    message: String,
}

impl RemoteException {
    /// Create a remote exception with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message reported by the peer.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Terminal failures of a transport handshake.
///
/// Client-side variants surface exactly once through the completion sink;
/// server-side variants return from
/// [`Handshaker::handle_handshake`](super::Handshaker::handle_handshake).
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The channel closed before a response arrived.
    #[error("handshake failed because connection reset")]
    ConnectionReset,

    /// The handshake deadline fired before a response arrived.
    #[error("[{node}] handshake_timeout[{timeout:?}]")]
    Timeout {
        /// The deadline that elapsed.
        timeout: Duration,
        /// The peer that never answered.
        node: PeerNode,
    },

    /// The request sender failed synchronously; the frame never left.
    #[error("[{node}] failure to send {HANDSHAKE_ACTION_NAME}")]
    SendFailure {
        /// The peer the request was addressed to.
        node: PeerNode,
        /// The underlying send error.
        #[source]
        cause: io::Error,
    },

    /// The response decoded but the remote version is outside the local
    /// compatibility window.
    #[error(
        "received message from unsupported version: [{remote}] minimal compatible version is: [{}]",
        .local.minimum_compatibility_version()
    )]
    UnsupportedVersion {
        /// The local node's version.
        local: Version,
        /// The version the peer reported.
        remote: Version,
    },

    /// The peer answered with a transport-level failure instead of a
    /// handshake response.
    #[error("handshake failed")]
    HandshakeFailed {
        /// The failure the peer reported.
        #[source]
        cause: RemoteException,
    },

    /// A handshake request left undrained bytes on the stream.
    #[error(
        "handshake request not fully read for request id [{request_id}], action [{HANDSHAKE_ACTION_NAME}], available [{available}]; resetting"
    )]
    Protocol {
        /// Request id of the offending frame.
        request_id: u64,
        /// Bytes left unread on the stream.
        available: usize,
    },

    /// A payload failed to encode or decode.
    #[error("handshake wire error")]
    Wire(#[from] WireError),
}
