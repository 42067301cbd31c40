//! Handshake request and response payloads.
//!
//! Both payloads ride inside an outer transport frame owned by the dispatch
//! layer; the codecs here start at the first payload byte. The request wraps
//! its version in a length-prefixed blob so that a peer which does not know
//! the field can skip it cleanly, and so the blob can grow without breaking
//! old parsers. The response carries a bare version and is strict.

use super::stream::{WireError, WireInput, WireOutput};
use super::version::Version;

/// Payload of an outbound or inbound handshake request.
///
/// The version is the sender's advertised minimum-compatible version, not
/// its own version. `None` means the peer was too old to send the field at
/// all (or sent an empty blob).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeRequest {
    /// Advertised minimum-compatible version, if the sender provided one.
    pub version: Option<Version>,
}

impl HandshakeRequest {
    /// Create a request advertising `version`.
    pub fn new(version: Version) -> Self {
        Self {
            version: Some(version),
        }
    }

    /// Decode a request payload.
    ///
    /// End-of-stream while reading the byte reference, and a zero-length
    /// inner blob, both decode to `version: None` without error.
    pub fn read_from(input: &mut WireInput) -> Result<Self, WireError> {
        let version = match input.read_optional_bytes_ref()? {
            None => None,
            Some(blob) if blob.is_empty() => None,
            Some(blob) => {
                let mut inner = input.sub_input(blob);
                Some(Version::read_from(&mut inner)?)
            }
        };
        Ok(Self { version })
    }

    /// Encode this request onto `out`.
    pub fn write_to(&self, out: &mut WireOutput) {
        let mut payload = WireOutput::with_capacity(4);
        if let Some(version) = self.version {
            version.write_to(&mut payload);
        }
        out.write_bytes_ref(payload.as_slice());
    }
}

/// Payload of a handshake response: the version the responder selected for
/// the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeResponse {
    version: Version,
}

impl HandshakeResponse {
    /// Create a response carrying `version`.
    pub fn new(version: Version) -> Self {
        Self { version }
    }

    /// The version the responder selected.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Decode a response payload.
    pub fn read_from(input: &mut WireInput) -> Result<Self, WireError> {
        Ok(Self {
            version: Version::read_from(input)?,
        })
    }

    /// Encode this response onto `out`.
    pub fn write_to(&self, out: &mut WireOutput) {
        self.version.write_to(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn decode_request(out: WireOutput) -> HandshakeRequest {
        let mut input = WireInput::new(out.into_bytes(), Version::V_1_0_0);
        let request = HandshakeRequest::read_from(&mut input).unwrap();
        assert_eq!(input.remaining(), 0);
        request
    }

    #[test]
    fn test_request_round_trip() {
        let request = HandshakeRequest::new(Version::COMPAT_SIGNAL_2X);
        let mut out = WireOutput::new();
        request.write_to(&mut out);
        assert_eq!(decode_request(out), request);
    }

    #[test]
    fn test_request_without_version_round_trip() {
        let request = HandshakeRequest { version: None };
        let mut out = WireOutput::new();
        request.write_to(&mut out);
        assert_eq!(decode_request(out).version, None);
    }

    #[test]
    fn test_request_from_empty_stream() {
        let mut input = WireInput::new(Bytes::new(), Version::LEGACY_5_6_0);
        let request = HandshakeRequest::read_from(&mut input).unwrap();
        assert_eq!(request.version, None);
    }

    #[test]
    fn test_request_zero_length_blob() {
        let mut out = WireOutput::new();
        out.write_bytes_ref(&[]);
        let mut input = WireInput::new(out.into_bytes(), Version::V_1_0_0);
        let request = HandshakeRequest::read_from(&mut input).unwrap();
        assert_eq!(request.version, None);
    }

    #[test]
    fn test_request_blob_may_grow() {
        // Trailing bytes inside the inner blob belong to a newer sender and
        // must not leak into the outer stream.
        let mut inner = WireOutput::new();
        Version::new(1, 3, 0).write_to(&mut inner);
        inner.write_u8(0xff);
        inner.write_u8(0xff);

        let mut out = WireOutput::new();
        out.write_bytes_ref(inner.as_slice());

        let mut input = WireInput::new(out.into_bytes(), Version::V_1_0_0);
        let request = HandshakeRequest::read_from(&mut input).unwrap();
        assert_eq!(request.version, Some(Version::new(1, 3, 0)));
        assert_eq!(input.remaining(), 0);
    }

    #[test]
    fn test_response_round_trip() {
        let response = HandshakeResponse::new(Version::LEGACY_7_10_2);
        let mut out = WireOutput::new();
        response.write_to(&mut out);

        let mut input = WireInput::new(out.into_bytes(), Version::V_1_0_0);
        let decoded = HandshakeResponse::read_from(&mut input).unwrap();
        assert_eq!(decoded.version(), Version::LEGACY_7_10_2);
        assert_eq!(input.remaining(), 0);
    }

    #[test]
    fn test_response_truncated() {
        let mut input = WireInput::new(Bytes::new(), Version::V_1_0_0);
        assert!(matches!(
            HandshakeResponse::read_from(&mut input),
            Err(WireError::UnexpectedEof)
        ));
    }
}
