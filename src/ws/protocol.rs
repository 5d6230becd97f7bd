//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};

/// Messages sent from server to client.
///
/// The `Type` tag carries the message class name the browser client switches on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type")]
pub enum ServerMsg {
    /// Paddle side assigned to the receiving participant (0 = left, 1 = right)
    #[serde(rename = "PlayerNumberMessage")]
    PlayerNumber {
        #[serde(rename = "PlayerNumber")]
        player_number: u8,
    },

    /// Opponent's paddle center
    #[serde(rename = "PlayerPositionMessage")]
    PlayerPosition {
        #[serde(rename = "YPos")]
        y_pos: i32,
    },

    /// Ball center, sent every tick
    #[serde(rename = "BallPositionMessage")]
    BallPosition {
        #[serde(rename = "XPos")]
        x_pos: i32,
        #[serde(rename = "YPos")]
        y_pos: i32,
    },

    /// Current score, index 0 = left slot
    #[serde(rename = "ScoreMessage")]
    Score {
        #[serde(rename = "Score")]
        score: [u32; 2],
    },
}

/// Paddle position update from the client.
///
/// The client only ever sends this one shape, so no `Type` tag is required.
/// Mouse coordinates may be fractional.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClientMsg {
    #[serde(rename = "YPos")]
    pub y_pos: f64,
}

/// Inbound frames that cannot be turned into a paddle update
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed paddle update: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Binary frames are not supported")]
    BinaryFrame,
}

impl ClientMsg {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Pixel coordinate as sent on the wire (truncated toward zero)
pub fn wire_coord(value: f64) -> i32 {
    value as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn server_messages_use_client_shapes() {
        let cases = [
            (
                ServerMsg::PlayerNumber { player_number: 1 },
                json!({"Type": "PlayerNumberMessage", "PlayerNumber": 1}),
            ),
            (
                ServerMsg::PlayerPosition { y_pos: 120 },
                json!({"Type": "PlayerPositionMessage", "YPos": 120}),
            ),
            (
                ServerMsg::BallPosition { x_pos: 386, y_pos: 150 },
                json!({"Type": "BallPositionMessage", "XPos": 386, "YPos": 150}),
            ),
            (
                ServerMsg::Score { score: [2, 5] },
                json!({"Type": "ScoreMessage", "Score": [2, 5]}),
            ),
        ];

        for (msg, expected) in cases {
            assert_eq!(serde_json::to_value(&msg).unwrap(), expected);
        }
    }

    #[test]
    fn parses_untagged_and_tagged_paddle_updates() {
        assert_eq!(ClientMsg::parse(r#"{"YPos":120}"#).unwrap().y_pos, 120.0);
        assert_eq!(ClientMsg::parse(r#"{"YPos":87.5}"#).unwrap().y_pos, 87.5);
        assert_eq!(
            ClientMsg::parse(r#"{"Type":"PlayerPositionMessage","YPos":40}"#)
                .unwrap()
                .y_pos,
            40.0
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(ClientMsg::parse("hello"), Err(ProtocolError::Malformed(_))));
        assert!(ClientMsg::parse(r#"{"XPos":1}"#).is_err());
        assert!(ClientMsg::parse(r#"{"YPos":"up"}"#).is_err());
    }

    #[test]
    fn wire_coords_truncate() {
        assert_eq!(wire_coord(386.9), 386);
        assert_eq!(wire_coord(3.0), 3);
        assert_eq!(wire_coord(-0.5), 0);
    }
}
