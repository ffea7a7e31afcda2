//! Serialization boundary for nodes configurations.
//!
//! The serialized form embeds the version in a fixed header so that
//! [`ConfigCodec::extract_config_version`] never pays for a full
//! deserialization. The observation pipeline relies on that to drop
//! already-processed versions before touching the body.

use anyerror::AnyError;

use crate::nodes_config::ConfigVersion;
use crate::nodes_config::NodesConfig;

/// Errors of the serialize/deserialize boundary.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CodecError {
    #[error("serialized configuration is truncated: {0} bytes")]
    Truncated(usize),

    #[error("failed to encode configuration: {0}")]
    Encode(AnyError),

    #[error("failed to decode configuration: {0}")]
    Decode(AnyError),
}

/// How configurations cross the wire to and from the store.
///
/// Stateless: implementations are selected through
/// [`NcmTypeConfig`](crate::type_config::NcmTypeConfig) and invoked as
/// associated functions.
pub trait ConfigCodec: 'static {
    fn serialize(nc: &NodesConfig) -> Result<Vec<u8>, CodecError>;

    fn deserialize(bytes: &[u8]) -> Result<NodesConfig, CodecError>;

    /// Cheap version extraction. Succeeds iff `bytes` is a well-formed
    /// serialized configuration.
    fn extract_config_version(bytes: &[u8]) -> Result<ConfigVersion, CodecError>;

    /// Human-readable rendition, for trace samples and tooling output.
    fn debug_json_string(nc: &NodesConfig) -> String;
}

/// The provided codec: an 8-byte big-endian version header followed by a
/// JSON body.
pub struct JsonCodec {}

const VERSION_HEADER_LEN: usize = 8;

impl ConfigCodec for JsonCodec {
    fn serialize(nc: &NodesConfig) -> Result<Vec<u8>, CodecError> {
        let body = serde_json::to_vec(nc).map_err(|e| CodecError::Encode(AnyError::new(&e)))?;
        let mut bytes = Vec::with_capacity(VERSION_HEADER_LEN + body.len());
        bytes.extend_from_slice(&nc.version().val().to_be_bytes());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    fn deserialize(bytes: &[u8]) -> Result<NodesConfig, CodecError> {
        let header = Self::extract_config_version(bytes)?;
        let nc: NodesConfig = serde_json::from_slice(&bytes[VERSION_HEADER_LEN..])
            .map_err(|e| CodecError::Decode(AnyError::new(&e)))?;
        if nc.version() != header {
            return Err(CodecError::Decode(AnyError::error(format!(
                "version header {} does not match body version {}",
                header,
                nc.version()
            ))));
        }
        Ok(nc)
    }

    fn extract_config_version(bytes: &[u8]) -> Result<ConfigVersion, CodecError> {
        if bytes.len() <= VERSION_HEADER_LEN {
            return Err(CodecError::Truncated(bytes.len()));
        }
        let mut header = [0u8; VERSION_HEADER_LEN];
        header.copy_from_slice(&bytes[..VERSION_HEADER_LEN]);
        Ok(ConfigVersion::new(u64::from_be_bytes(header)))
    }

    fn debug_json_string(nc: &NodesConfig) -> String {
        serde_json::to_string(nc).unwrap_or_else(|e| format!("<unserializable nodes config: {}>", e))
    }
}
