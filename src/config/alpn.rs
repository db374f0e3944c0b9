//! ALPN protocol list encoding
//!
//! `alpn-protos` is written as a comma separated list (`"h2, http/1.1"`).
//! The handshake layer wants the `ProtocolNameList` wire form instead: every
//! name preceded by a single length byte.

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;

use crate::config::error::{ConfigError, Result};

/// Longest protocol name a length byte can describe
const MAX_PROTO_LEN: usize = u8::MAX as usize;

/// ALPN configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Alpn {
    /// List as configured
    pub protos: Option<String>,
    /// Length-prefixed form, present once encoded
    pub encoded: Option<Bytes>,
}

impl Alpn {
    /// Replace the configured list; the encoded form is recomputed later
    pub fn set(&mut self, protos: &str) {
        self.protos = Some(protos.to_string());
        self.encoded = None;
    }

    /// Encode the configured list, if any
    pub fn encode(&mut self) -> Result<()> {
        self.encoded = match self.protos.as_deref() {
            Some(protos) => Some(encode_alpn(protos)?),
            None => None,
        };
        Ok(())
    }

    pub fn wire(&self) -> Option<&[u8]> {
        self.encoded.as_deref()
    }

    /// Total encoded length in bytes
    pub fn wire_len(&self) -> usize {
        self.encoded.as_ref().map_or(0, Bytes::len)
    }
}

/// Encode a comma separated protocol list into length-prefixed form
///
/// All whitespace is removed first. A single trailing comma is accepted;
/// any other empty name fails.
pub fn encode_alpn(list: &str) -> Result<Bytes> {
    let compact: String = list.chars().filter(|c| !c.is_whitespace()).collect();
    let body = compact.strip_suffix(',').unwrap_or(&compact);

    let mut buf = BytesMut::with_capacity(body.len() + 1);
    for proto in body.split(',') {
        if proto.is_empty() {
            return Err(ConfigError::EmptyProtocolToken);
        }
        if proto.len() > MAX_PROTO_LEN {
            return Err(ConfigError::ProtocolTooLong);
        }
        buf.put_u8(proto.len() as u8);
        buf.put_slice(proto.as_bytes());
    }

    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_h2_http11() {
        let wire = encode_alpn("h2,http/1.1").unwrap();
        assert_eq!(&wire[..], b"\x02h2\x08http/1.1");
        assert_eq!(wire.len(), 12);
    }

    #[test]
    fn test_whitespace_is_removed() {
        let wire = encode_alpn(" h2 ,\thttp/ 1.1\n").unwrap();
        assert_eq!(&wire[..], b"\x02h2\x08http/1.1");
    }

    #[test]
    fn test_trailing_comma_tolerated() {
        let wire = encode_alpn("h2,").unwrap();
        assert_eq!(&wire[..], b"\x02h2");
    }

    #[test]
    fn test_empty_tokens_rejected() {
        for list in ["h2,,http/1.1", ",h2", ",", "", "   ", "h2,,"] {
            assert!(
                matches!(encode_alpn(list), Err(ConfigError::EmptyProtocolToken)),
                "{:?} should be rejected",
                list
            );
        }
    }

    #[test]
    fn test_protocol_length_limit() {
        let max = "p".repeat(255);
        let wire = encode_alpn(&max).unwrap();
        assert_eq!(wire[0], 255);
        assert_eq!(wire.len(), 256);

        let long = "p".repeat(256);
        assert!(matches!(encode_alpn(&long), Err(ConfigError::ProtocolTooLong)));
        assert!(matches!(
            encode_alpn(&format!("h2,{}", long)),
            Err(ConfigError::ProtocolTooLong)
        ));
    }

    #[test]
    fn test_alpn_struct() {
        let mut alpn = Alpn::default();
        alpn.encode().unwrap();
        assert!(alpn.wire().is_none());

        alpn.set("h2");
        alpn.encode().unwrap();
        assert_eq!(alpn.wire(), Some(&b"\x02h2"[..]));
        assert_eq!(alpn.wire_len(), 3);

        alpn.set("h2,,x");
        assert!(alpn.encode().is_err());
    }
}
