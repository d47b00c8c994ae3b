// Network protocol messages: one JSON object per line

use crate::consensus::ValidationError;
use crate::core::{Address, Block, Transaction};
use serde::{Deserialize, Serialize};
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Largest record accepted from a peer, newline included. Full chain
/// snapshots are the big ones.
pub const MAX_MESSAGE_BYTES: usize = 32 * 1024 * 1024;

/// Every `type` tag the protocol understands
pub const MESSAGE_TYPES: [&str; 6] = [
    "GET_CHAIN",
    "CHAIN",
    "TRANSACTION",
    "BLOCK",
    "PEER_INFO",
    "DIRECT_NOTIFICATION",
];

/// Relay hint attached to freshly mined blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    Normal,
}

/// Identity metadata a node announces after connecting
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PeerIdentity {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub port: u16,
}

/// Payment details carried in a direct notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentNotice {
    pub from: Address,
    pub amount: u64,
    pub timestamp: u64,
    /// Whether the transfer is already in a block
    pub confirmed: bool,
    pub pending_balance: i64,
    pub confirmed_balance: i64,
}

/// Application payload of a DIRECT_NOTIFICATION
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Notification {
    PaymentReceived(PaymentNotice),
}

/// Network message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// Ask for the full chain
    #[serde(rename = "GET_CHAIN")]
    GetChain,
    /// Full chain snapshot, genesis first
    #[serde(rename = "CHAIN")]
    Chain { data: Vec<Block> },
    #[serde(rename = "TRANSACTION")]
    NewTransaction { data: Transaction },
    #[serde(rename = "BLOCK")]
    NewBlock {
        data: Block,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        priority: Option<Priority>,
    },
    #[serde(rename = "PEER_INFO")]
    PeerInfo { data: PeerIdentity },
    /// Delivered to every peer; only the node whose user owns
    /// `recipient_address` surfaces it
    #[serde(rename = "DIRECT_NOTIFICATION")]
    DirectNotification {
        #[serde(rename = "recipientAddress")]
        recipient_address: Address,
        data: Notification,
    },
}

impl Message {
    /// Wire tag of this message
    pub fn message_type(&self) -> &'static str {
        match self {
            Message::GetChain => "GET_CHAIN",
            Message::Chain { .. } => "CHAIN",
            Message::NewTransaction { .. } => "TRANSACTION",
            Message::NewBlock { .. } => "BLOCK",
            Message::PeerInfo { .. } => "PEER_INFO",
            Message::DirectNotification { .. } => "DIRECT_NOTIFICATION",
        }
    }

    /// Serialize to a single newline-terminated record
    pub fn encode(&self) -> Result<String, ValidationError> {
        let mut line =
            serde_json::to_string(self).map_err(|e| ValidationError::MalformedMessage(e.to_string()))?;
        line.push('\n');
        Ok(line)
    }

    /// Parse one record (without its trailing newline).
    ///
    /// An unrecognised `type` tag is reported separately from malformed JSON
    /// so the caller can log it distinctly.
    pub fn decode(line: &str) -> Result<Self, ValidationError> {
        let value: serde_json::Value =
            serde_json::from_str(line).map_err(|e| ValidationError::MalformedMessage(e.to_string()))?;

        let tag = value
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| ValidationError::MalformedMessage("missing type tag".to_string()))?;

        if !MESSAGE_TYPES.contains(&tag) {
            return Err(ValidationError::UnknownMessageType(tag.to_string()));
        }

        serde_json::from_value(value).map_err(|e| ValidationError::MalformedMessage(e.to_string()))
    }
}

/// One record pulled off a connection
#[derive(Debug, PartialEq, Eq)]
pub enum Frame {
    /// Record text without its newline; invalid UTF-8 is replaced, so the
    /// record fails to decode on its own
    Line(String),
    /// No newline within the limit; the stream cannot be resynchronised
    Oversized,
    Closed,
}

/// Read the next newline-terminated record, buffering at most `limit` bytes
pub async fn read_frame<R>(reader: &mut R, buf: &mut Vec<u8>, limit: usize) -> io::Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let read = (&mut *reader).take(limit as u64 + 1).read_until(b'\n', buf).await?;
    if read == 0 {
        return Ok(Frame::Closed);
    }

    match buf.strip_suffix(b"\n") {
        Some(line) => Ok(Frame::Line(String::from_utf8_lossy(line).into_owned())),
        None if buf.len() > limit => Ok(Frame::Oversized),
        // Last record before EOF
        None => Ok(Frame::Line(String::from_utf8_lossy(buf).into_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_chain_wire_format() {
        let line = Message::GetChain.encode().unwrap();
        assert_eq!(line, "{\"type\":\"GET_CHAIN\"}\n");
        assert_eq!(Message::decode(line.trim_end()).unwrap(), Message::GetChain);
    }

    #[test]
    fn test_block_wire_format() {
        let msg = Message::NewBlock {
            data: Block::genesis(),
            priority: Some(Priority::High),
        };
        let line = msg.encode().unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();

        assert_eq!(value["type"], "BLOCK");
        assert_eq!(value["priority"], "HIGH");
        assert_eq!(value["data"]["index"], 0);
        assert_eq!(value["data"]["previousHash"], "0".repeat(64));
        assert_eq!(Message::decode(line.trim_end()).unwrap(), msg);
    }

    #[test]
    fn test_block_without_priority() {
        let json = serde_json::json!({ "type": "BLOCK", "data": Block::genesis() }).to_string();
        let msg = Message::decode(&json).unwrap();
        assert_eq!(
            msg,
            Message::NewBlock {
                data: Block::genesis(),
                priority: None
            }
        );
    }

    #[test]
    fn test_transaction_wire_format() {
        let tx = Transaction::mint(Address::new("02ab"), 500, 1_700_000_000_001);
        let value = serde_json::to_value(Message::NewTransaction { data: tx.clone() }).unwrap();

        assert_eq!(value["type"], "TRANSACTION");
        assert_eq!(value["data"]["from"], "0");
        assert_eq!(value["data"]["to"], "02ab");
        assert_eq!(value["data"]["amount"], 500);
    }

    #[test]
    fn test_direct_notification_wire_format() {
        let msg = Message::DirectNotification {
            recipient_address: Address::new("02cd"),
            data: Notification::PaymentReceived(PaymentNotice {
                from: Address::new("02ab"),
                amount: 120,
                timestamp: 5,
                confirmed: false,
                pending_balance: 120,
                confirmed_balance: 0,
            }),
        };
        let line = msg.encode().unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();

        assert_eq!(value["recipientAddress"], "02cd");
        assert_eq!(value["data"]["type"], "PAYMENT_RECEIVED");
        assert_eq!(value["data"]["data"]["amount"], 120);
        assert_eq!(value["data"]["data"]["pendingBalance"], 120);
        assert_eq!(Message::decode(line.trim_end()).unwrap(), msg);
    }

    #[test]
    fn test_peer_info_defaults() {
        let msg = Message::decode(r#"{"type":"PEER_INFO","data":{"name":"alice"}}"#).unwrap();
        assert_eq!(
            msg,
            Message::PeerInfo {
                data: PeerIdentity {
                    name: "alice".to_string(),
                    id: String::new(),
                    port: 0
                }
            }
        );
    }

    #[test]
    fn test_decode_unknown_type() {
        assert_eq!(
            Message::decode(r#"{"type":"BALANCE_UPDATE","data":{}}"#),
            Err(ValidationError::UnknownMessageType("BALANCE_UPDATE".to_string()))
        );
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(
            Message::decode("{not json"),
            Err(ValidationError::MalformedMessage(_))
        ));
        assert!(matches!(
            Message::decode(r#"{"data":1}"#),
            Err(ValidationError::MalformedMessage(_))
        ));
        assert!(matches!(
            Message::decode(r#"{"type":"TRANSACTION","data":{"from":"a"}}"#),
            Err(ValidationError::MalformedMessage(_))
        ));
    }

    #[tokio::test]
    async fn test_read_frame_splits_records() {
        let mut input: &[u8] = b"{\"type\":\"GET_CHAIN\"}\n\xff\xfe\n{\"type\":\"GET_CHAIN\"}";
        let mut buf = Vec::new();

        let Frame::Line(first) = read_frame(&mut input, &mut buf, 64).await.unwrap() else {
            panic!("expected a record");
        };
        assert_eq!(Message::decode(&first).unwrap(), Message::GetChain);

        // Bad bytes cost only their own record
        let Frame::Line(garbled) = read_frame(&mut input, &mut buf, 64).await.unwrap() else {
            panic!("expected a record");
        };
        assert!(Message::decode(&garbled).is_err());

        let Frame::Line(last) = read_frame(&mut input, &mut buf, 64).await.unwrap() else {
            panic!("expected a record");
        };
        assert_eq!(Message::decode(&last).unwrap(), Message::GetChain);
        assert_eq!(read_frame(&mut input, &mut buf, 64).await.unwrap(), Frame::Closed);
    }

    #[tokio::test]
    async fn test_read_frame_stops_at_limit() {
        let flood = vec![b'a'; 1_000];
        let mut input: &[u8] = &flood;
        let mut buf = Vec::new();

        assert_eq!(read_frame(&mut input, &mut buf, 64).await.unwrap(), Frame::Oversized);
        assert_eq!(buf.len(), 65);
    }

    #[tokio::test]
    async fn test_read_frame_accepts_record_at_limit() {
        let mut record = vec![b' '; 64];
        record.push(b'\n');
        let mut input: &[u8] = &record;
        let mut buf = Vec::new();

        assert_eq!(
            read_frame(&mut input, &mut buf, 64).await.unwrap(),
            Frame::Line(" ".repeat(64))
        );
    }
}
