//! Transport handshake orchestration.
//!
//! Sends and receives connection-level handshakes: the client path arms a
//! pending entry, emits the request through the transport's sender, and
//! races the response against timeout, channel close, and local send
//! failure; the server path decodes the request and answers with the
//! version the rest of the connection will speak.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::channel::{HandshakeRequestSender, PeerNode, ReplyChannel, Scheduler, TcpChannel};
use super::error::{HandshakeError, RemoteException};
use super::pending::PendingTable;
use crate::wire::{HandshakeRequest, HandshakeResponse, Version, WireError, WireInput};

/// Outcome of a handshake: the negotiated version, or the terminal error.
pub type HandshakeResult = Result<Version, HandshakeError>;

/// One-shot completion sink a handshake resolves into.
pub type HandshakeSink = oneshot::Sender<HandshakeResult>;

/// Sends and receives transport-level connection handshakes.
///
/// One `Handshaker` lives per transport, created with the node's own
/// version and the transport's sender and scheduler. It holds the table of
/// in-flight handshakes and the negotiation rules; all I/O and timing stays
/// behind the collaborator traits.
pub struct Handshaker {
    local_version: Version,
    scheduler: Arc<dyn Scheduler>,
    request_sender: Arc<dyn HandshakeRequestSender>,
    pending: PendingTable,
    num_handshakes: AtomicU64,
}

impl Handshaker {
    /// Create a handshaker for a node running `local_version`.
    pub fn new(
        local_version: Version,
        scheduler: Arc<dyn Scheduler>,
        request_sender: Arc<dyn HandshakeRequestSender>,
    ) -> Self {
        Self {
            local_version,
            scheduler,
            request_sender,
            pending: PendingTable::new(),
            num_handshakes: AtomicU64::new(0),
        }
    }

    /// The version this node runs.
    pub fn local_version(&self) -> Version {
        self.local_version
    }

    /// Start a handshake on a freshly-opened channel.
    ///
    /// `request_id` must be fresh; the caller owns id allocation. The sink
    /// resolves exactly once with the negotiated version or the first
    /// terminal error among response, timeout, channel close, and send
    /// failure.
    pub fn send_handshake(
        &self,
        request_id: u64,
        node: &PeerNode,
        channel: &dyn TcpChannel,
        timeout: Duration,
        sink: HandshakeSink,
    ) {
        self.num_handshakes.fetch_add(1, Ordering::Relaxed);
        let handler = Arc::new(HandshakeResponseHandler::new(
            request_id,
            self.local_version,
            sink,
            self.pending.clone(),
        ));
        self.pending.insert(request_id, handler.clone());

        {
            let handler = handler.clone();
            channel.add_close_listener(Box::new(move || {
                handler.handle_local_exception(HandshakeError::ConnectionReset);
            }));
        }

        // The request advertises the minimum-compatible version since we do
        // not yet know the peer's version; the response carries the peer's
        // actual version as payload.
        let advertised = self.advertised_min_compat_version();
        tracing::trace!(request_id, peer = %node, advertised = %advertised, "sending transport handshake");

        match self
            .request_sender
            .send_request(node, channel, request_id, advertised)
        {
            Ok(()) => {
                let handler = handler.clone();
                let node = node.clone();
                self.scheduler.schedule(
                    Box::new(move || {
                        handler.handle_local_exception(HandshakeError::Timeout { timeout, node });
                    }),
                    timeout,
                );
            }
            Err(cause) => {
                tracing::debug!(request_id, peer = %node, "handshake request could not be sent: {cause}");
                handler.handle_local_exception(HandshakeError::SendFailure {
                    node: node.clone(),
                    cause,
                });
                let orphan = self.pending.remove(request_id);
                debug_assert!(
                    orphan.is_none(),
                    "handshake must not stay pending after a send failure"
                );
            }
        }
    }

    /// Answer an inbound handshake request.
    ///
    /// The request must exhaust `stream`; trailing bytes mean the peer and
    /// we disagree about the codec and the connection cannot be trusted.
    /// The response version is picked from `stream`'s wire version, not
    /// from the decoded payload.
    pub fn handle_handshake(
        &self,
        channel: &dyn ReplyChannel,
        request_id: u64,
        stream: &mut WireInput,
    ) -> Result<(), HandshakeError> {
        let _request = HandshakeRequest::read_from(stream)?;
        if stream.remaining() != 0 {
            return Err(HandshakeError::Protocol {
                request_id,
                available: stream.remaining(),
            });
        }
        let response_version = self.response_version(stream.version());
        channel
            .send_response(HandshakeResponse::new(response_version))
            .map_err(WireError::from)?;
        Ok(())
    }

    /// Take the pending handler for an inbound response frame.
    ///
    /// The dispatch layer calls this when a handshake-action frame arrives;
    /// `None` means a timeout, close, or send failure already won.
    pub fn remove_handler(&self, request_id: u64) -> Option<Arc<HandshakeResponseHandler>> {
        self.pending.remove(request_id)
    }

    /// Number of handshakes still awaiting a terminal event.
    pub fn num_pending_handshakes(&self) -> usize {
        self.pending.len()
    }

    /// Total handshakes started over the transport's lifetime.
    pub fn num_handshakes(&self) -> u64 {
        self.num_handshakes.load(Ordering::Relaxed)
    }

    /// Snapshot of the handshake counters.
    pub fn metrics(&self) -> HandshakeMetrics {
        HandshakeMetrics {
            total_handshakes: self.num_handshakes(),
            pending_handshakes: self.num_pending_handshakes(),
        }
    }

    /// The minimum-compatible version to put on the wire.
    ///
    /// 1.x and 2.x deliberately advertise the signal ids instead of their
    /// true minimums so the receiver can tell a Lucero peer apart from a
    /// legacy peer, which advertises the same 6.8.0 a 1.x node otherwise
    /// would (see [`Version::COMPAT_SIGNAL_1X`]).
    fn advertised_min_compat_version(&self) -> Version {
        let local = self.local_version;
        if local >= Version::V_1_0_0 && local < Version::V_2_0_0 {
            Version::COMPAT_SIGNAL_1X
        } else if local >= Version::V_2_0_0 {
            Version::COMPAT_SIGNAL_2X
        } else {
            local.minimum_compatibility_version()
        }
    }

    /// The version to answer an inbound handshake with.
    ///
    /// A stream decoded at legacy 6.8.0 belongs to a legacy 7.x peer and
    /// one at legacy 5.6.0 to a legacy 6.8 peer; both get legacy 7.10.2 so
    /// a rolling upgrade from the legacy line can decode the reply. A 1.x
    /// Lucero peer shows up as 6.7.99 and falls through to the local
    /// version. The window stays open through 2.x.
    fn response_version(&self, wire_version: Version) -> Version {
        let local = self.local_version;
        let legacy_peer =
            wire_version == Version::LEGACY_6_8_0 || wire_version == Version::LEGACY_5_6_0;
        if local >= Version::V_1_0_0 && local < Version::V_3_0_0 && legacy_peer {
            Version::LEGACY_7_10_2
        } else {
            local
        }
    }
}

impl fmt::Debug for Handshaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handshaker")
            .field("local_version", &self.local_version)
            .field("pending", &self.pending.len())
            .field("num_handshakes", &self.num_handshakes())
            .finish()
    }
}

/// Per-handshake completion state.
///
/// Four event sources race to finish a handshake: the response frame, a
/// remote failure frame, the timeout, and the channel close listener. The
/// `done` flag makes completion fire at most once; local events must
/// additionally win the [`PendingTable`] removal, which is what keeps a
/// late response from resolving a handshake the timeout already failed.
pub struct HandshakeResponseHandler {
    request_id: u64,
    local_version: Version,
    done: AtomicBool,
    sink: Mutex<Option<HandshakeSink>>,
    pending: PendingTable,
}

impl HandshakeResponseHandler {
    pub(crate) fn new(
        request_id: u64,
        local_version: Version,
        sink: HandshakeSink,
        pending: PendingTable,
    ) -> Self {
        Self {
            request_id,
            local_version,
            done: AtomicBool::new(false),
            sink: Mutex::new(Some(sink)),
            pending,
        }
    }

    /// Decode and apply a response frame.
    ///
    /// Called by the dispatch layer after it removed this handler from the
    /// pending table, on the receiving thread; the compatibility check is
    /// O(1) and runs without a thread hop.
    pub fn handle_response(&self, stream: &mut WireInput) {
        match HandshakeResponse::read_from(stream) {
            Err(e) => self.complete(Err(HandshakeError::Wire(e))),
            Ok(response) => {
                let remote = response.version();
                if self.local_version.is_compatible(remote) {
                    self.complete(Ok(remote));
                } else {
                    self.complete(Err(HandshakeError::UnsupportedVersion {
                        local: self.local_version,
                        remote,
                    }));
                }
            }
        }
    }

    /// Apply a failure frame the peer sent instead of a response.
    pub fn handle_exception(&self, cause: RemoteException) {
        self.complete(Err(HandshakeError::HandshakeFailed { cause }));
    }

    /// Apply a locally-raised terminal event: timeout, channel close, or
    /// send failure.
    ///
    /// The pending-table removal is the election: only the event that
    /// observes a still-present entry may complete the handshake, so the
    /// four racing sources stay idempotent.
    pub fn handle_local_exception(&self, error: HandshakeError) {
        if self.pending.remove(self.request_id).is_some() {
            self.complete(Err(error));
        }
    }

    fn complete(&self, result: HandshakeResult) {
        if self
            .done
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            if let Some(sink) = self.sink.lock().take() {
                let _ = sink.send(result);
            }
        } else {
            tracing::trace!(request_id = self.request_id, "dropping late handshake completion");
        }
    }
}

impl fmt::Debug for HandshakeResponseHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandshakeResponseHandler")
            .field("request_id", &self.request_id)
            .field("local_version", &self.local_version)
            .field("done", &self.done.load(Ordering::Relaxed))
            .finish()
    }
}

/// Snapshot of the handshake counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct HandshakeMetrics {
    /// Handshakes started over the transport's lifetime, whatever their
    /// outcome.
    pub total_handshakes: u64,
    /// Handshakes still awaiting a terminal event.
    pub pending_handshakes: usize,
}
