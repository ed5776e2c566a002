/*
    SyncMessage - request/response envelope for the inventory exchange

    Responsibilities:
    `message.rs` defines the two frame kinds exchanged between peers and
    their bincode encoding. The nonce correlates a response with its
    request and is echoed verbatim by the responder.

    Inputs:
    - filters/inventories from the service layer
    - raw frame bytes from the transport

    Outputs:
    - encoded frames for NetCommand::Send
    - decoded messages for dispatch
*/

use crate::core_inventory::errors::RequestError;
use crate::core_inventory::filter::DataFilter;
use crate::core_inventory::inventory::Inventory;
use serde::{Deserialize, Serialize};

/// One frame of the inventory exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncMessage {
    /// "Here is what I hold; send me the delta"
    InventoryRequest { nonce: i32, filter: DataFilter },
    /// The delta, correlated by the echoed nonce
    InventoryResponse { nonce: i32, inventory: Inventory },
}

impl SyncMessage {
    /// Encode for transmission
    pub fn encode(&self) -> Result<Vec<u8>, RequestError> {
        bincode::serialize(self).map_err(|e| RequestError::Codec(e.to_string()))
    }

    /// Decode a received frame
    pub fn decode(bytes: &[u8]) -> Result<Self, RequestError> {
        bincode::deserialize(bytes).map_err(|e| RequestError::Codec(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_roundtrip() {
        let msg = SyncMessage::InventoryRequest {
            nonce: -42,
            filter: DataFilter::new("offer"),
        };
        let decoded = SyncMessage::decode(&msg.encode().unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_response_roundtrip() {
        let msg = SyncMessage::InventoryResponse {
            nonce: 7,
            inventory: Inventory::new(Vec::new(), 3),
        };
        let decoded = SyncMessage::decode(&msg.encode().unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_garbage_frame_rejected() {
        assert!(matches!(
            SyncMessage::decode(&[0xFF, 0xFE, 0xFD]),
            Err(RequestError::Codec(_))
        ));
    }
}
