use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{Detection, Role, SignalTarget};

/// Messages sent from client to server via WebSocket
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Bind this connection into a room under a role
    Join {
        role: Role,
        #[serde(rename = "roomId")]
        room_id: String,
    },

    /// Relay an opaque signaling payload to the counterpart role
    Signal {
        /// Sent by clients for symmetry with `join`; the server relays
        /// within the connection's bound room.
        #[serde(rename = "roomId", default)]
        room_id: Option<String>,
        data: Value,
        target: SignalTarget,
    },

    /// Submit one captured frame for server-side inference
    InferFrame {
        frame_id: String,
        /// Capture instant on the producing device, ms since epoch
        #[serde(default)]
        capture_ts: Option<i64>,
        /// Receipt instant at the producer's sender loop, ms since epoch
        #[serde(default)]
        recv_ts: Option<i64>,
        #[serde(default)]
        mime: Option<String>,
        /// Base64-encoded image bytes
        data: String,
    },
}

/// Messages sent from server to client via WebSocket
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Echoed back to the sender after a successful join
    Joined {
        role: Role,
        #[serde(rename = "roomId")]
        room_id: String,
    },

    /// Sent to a joining viewer whose room already holds a phone
    Ready,

    /// Sent to the resident viewer when a phone joins
    #[serde(rename = "phone-joined")]
    PhoneJoined,

    /// Relayed signaling payload, verbatim
    Signal { data: Value },

    /// Inference result, fanned out to both room peers
    InferResult {
        frame_id: String,
        #[serde(default)]
        capture_ts: Option<i64>,
        #[serde(default)]
        recv_ts: Option<i64>,
        inference_ts: i64,
        detections: Vec<Detection>,
    },

    /// Inference failure, reported to the submitting connection only
    InferError { error: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_round_trips_wire_names() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"join","role":"phone","roomId":"r1"}"#).unwrap();
        match &msg {
            ClientMessage::Join { role, room_id } => {
                assert_eq!(*role, Role::Phone);
                assert_eq!(room_id, "r1");
            }
            other => panic!("unexpected decode: {other:?}"),
        }
        let encoded = serde_json::to_value(&msg).unwrap();
        assert_eq!(encoded["type"], "join");
        assert_eq!(encoded["roomId"], "r1");
    }

    #[test]
    fn phone_joined_uses_dashed_tag() {
        let encoded = serde_json::to_value(ServerMessage::PhoneJoined).unwrap();
        assert_eq!(encoded["type"], "phone-joined");
    }

    #[test]
    fn signal_data_is_opaque() {
        let raw = r#"{"type":"signal","roomId":"r1","data":{"sdp":"offer","nested":[1,2]},"target":"phone"}"#;
        let msg: ClientMessage = serde_json::from_str(raw).unwrap();
        match msg {
            ClientMessage::Signal { data, target, .. } => {
                assert_eq!(target, SignalTarget::Phone);
                assert_eq!(data["sdp"], "offer");
                assert_eq!(data["nested"][1], 2);
            }
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[test]
    fn infer_frame_timestamps_are_optional() {
        let raw = r#"{"type":"infer_frame","frame_id":"f1","mime":"image/jpeg","data":"AAAA"}"#;
        let msg: ClientMessage = serde_json::from_str(raw).unwrap();
        match msg {
            ClientMessage::InferFrame {
                capture_ts, recv_ts, ..
            } => {
                assert!(capture_ts.is_none());
                assert!(recv_ts.is_none());
            }
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[test]
    fn unknown_type_tag_is_rejected() {
        let raw = r#"{"type":"bogus","roomId":"r1"}"#;
        assert!(serde_json::from_str::<ClientMessage>(raw).is_err());
    }
}
