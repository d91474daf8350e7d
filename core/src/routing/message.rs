// Update messages: the only thing routers ever exchange
//
// Wire format is bincode of `{source, vector}`, with size limits so a
// corrupt or hostile frame can't make us allocate an arbitrary vector.

use super::cost::NodeId;
use crate::{Result, RoutingError};
use bincode::Options;
use serde::{Deserialize, Serialize};

/// Largest network an update may describe
pub const MAX_NODES: usize = 4096;

/// Maximum encoded update size: length prefix + source + MAX_NODES costs
pub const MAX_UPDATE_SIZE: usize = 16 + MAX_NODES * 4;

/// A neighbor's advertised distance vector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateMessage {
    /// Router that sent this vector
    pub source: NodeId,
    /// Advertised cost to every destination (possibly poisoned)
    pub vector: Vec<u32>,
}

impl UpdateMessage {
    pub fn new(source: NodeId, vector: Vec<u32>) -> Self {
        Self { source, vector }
    }
}

fn wire_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_UPDATE_SIZE as u64)
}

/// Serialize an update to bytes
pub fn encode_update(message: &UpdateMessage) -> Result<Vec<u8>> {
    if message.vector.len() > MAX_NODES {
        return Err(RoutingError::VectorLength {
            expected: MAX_NODES,
            got: message.vector.len(),
        });
    }

    let bytes = wire_options().serialize(message)?;

    if bytes.len() > MAX_UPDATE_SIZE {
        return Err(RoutingError::MessageTooLarge {
            size: bytes.len(),
            max: MAX_UPDATE_SIZE,
        });
    }

    Ok(bytes)
}

/// Deserialize bytes to an update
pub fn decode_update(bytes: &[u8]) -> Result<UpdateMessage> {
    if bytes.len() > MAX_UPDATE_SIZE {
        return Err(RoutingError::MessageTooLarge {
            size: bytes.len(),
            max: MAX_UPDATE_SIZE,
        });
    }

    let message: UpdateMessage = wire_options().deserialize(bytes)?;
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let msg = UpdateMessage::new(2, vec![1, 0, 999, 7]);
        let bytes = encode_update(&msg).unwrap();
        let decoded = decode_update(&bytes).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_oversized_vector_rejected() {
        let msg = UpdateMessage::new(0, vec![1; MAX_NODES + 1]);
        let result = encode_update(&msg);
        assert!(matches!(result, Err(RoutingError::VectorLength { .. })));
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let bytes = vec![0u8; MAX_UPDATE_SIZE + 1];
        let result = decode_update(&bytes);
        assert!(matches!(result, Err(RoutingError::MessageTooLarge { .. })));
    }

    #[test]
    fn test_truncated_frame_rejected() {
        let msg = UpdateMessage::new(1, vec![0, 1, 2]);
        let bytes = encode_update(&msg).unwrap();
        let result = decode_update(&bytes[..bytes.len() - 2]);
        assert!(matches!(result, Err(RoutingError::Codec(_))));
    }

    #[test]
    fn test_bogus_length_prefix_rejected() {
        // source = 0, then a vector length claiming u64::MAX entries
        let mut bytes = vec![0u8; 8];
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        assert!(decode_update(&bytes).is_err());
    }
}
