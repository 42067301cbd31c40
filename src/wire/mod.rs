//! # Wire Layer
//!
//! Low-level wire encoding for the transport handshake:
//!
//! - [`version`] - Protocol version identities and compatibility rules
//! - [`stream`] - Variable-length integer codec and payload readers/writers
//! - [`message`] - Handshake request/response payloads
//!
//! Most users should go through [`crate::transport`] instead of encoding
//! frames by hand.

pub mod message;
pub mod stream;
pub mod version;

pub use message::{HandshakeRequest, HandshakeResponse};
pub use stream::{WireError, WireInput, WireOutput};
pub use version::Version;
