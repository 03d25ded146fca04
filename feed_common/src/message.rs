//! Named-event messages exchanged over a feed session.
//!
//! Every message is a JSON object `{"event": <name>, "data": <payload>}` sent as
//! one line. Inbound messages are decoded leniently: the payload is kept as a raw
//! `serde_json::Value` and only interpreted once the event name is known, so a
//! malformed payload degrades to "absent" instead of failing the session.
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::error::FeedError;
use crate::quote::Quote;

/// Names of events a client may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ClientEventName {
    /// Replace the subscription set.
    Subscribe,
    /// Remove symbols from the subscription set.
    Unsubscribe,
    /// Liveness probe.
    Ping,
}

/// Raw inbound envelope as read off the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientMessage {
    /// Event name, see [`ClientEventName`].
    pub event: String,
    /// Event payload; `null` when omitted.
    #[serde(default)]
    pub data: Value,
}

/// Inbound event after interpretation of the envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// `None` when the payload was absent or not a list.
    Subscribe(Option<Vec<String>>),
    /// `None` when the payload was absent or not a list.
    Unsubscribe(Option<Vec<String>>),
    /// Keep-alive.
    Ping,
}

impl ClientMessage {
    /// Decode a single JSON line.
    pub fn decode(line: &str) -> Result<Self, FeedError> {
        Ok(serde_json::from_str(line)?)
    }

    /// Build a `subscribe` message; `None` subscribes to everything.
    pub fn subscribe(symbols: Option<Vec<String>>) -> Self {
        ClientMessage {
            event: ClientEventName::Subscribe.to_string(),
            data: symbols.map(Value::from).unwrap_or(Value::Null),
        }
    }

    /// Build an `unsubscribe` message.
    pub fn unsubscribe(symbols: Vec<String>) -> Self {
        ClientMessage {
            event: ClientEventName::Unsubscribe.to_string(),
            data: Value::from(symbols),
        }
    }

    /// Build a `ping` message.
    pub fn ping() -> Self {
        ClientMessage {
            event: ClientEventName::Ping.to_string(),
            data: Value::Null,
        }
    }

    /// Encode as one newline-terminated JSON line.
    pub fn to_json_line(&self) -> Result<Vec<u8>, FeedError> {
        let mut json = serde_json::to_vec(self)?;
        json.push(b'\n');
        Ok(json)
    }

    /// Interpret the envelope. Returns `None` for unknown event names.
    pub fn into_event(self) -> Option<ClientEvent> {
        let name = ClientEventName::from_str(&self.event).ok()?;
        Some(match name {
            ClientEventName::Subscribe => ClientEvent::Subscribe(symbol_list(self.data)),
            ClientEventName::Unsubscribe => ClientEvent::Unsubscribe(symbol_list(self.data)),
            ClientEventName::Ping => ClientEvent::Ping,
        })
    }
}

/// Non-string elements of a list are skipped; anything but a list is `None`.
fn symbol_list(data: Value) -> Option<Vec<String>> {
    match data {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(symbol) => Some(symbol),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}

/// Outbound events produced by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, AsRefStr)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ServerEvent {
    /// Human-readable notice (welcome, unsubscribe confirmation).
    Info(String),
    /// Full state for the current subscription set.
    Snapshot(Vec<Quote>),
    /// One instrument changed during a broadcast cycle.
    Update(Quote),
    /// Reply to `ping`, epoch milliseconds.
    Pong(i64),
}

impl ServerEvent {
    /// Encode as one newline-terminated JSON line.
    pub fn to_json_line(&self) -> Result<Vec<u8>, FeedError> {
        let mut json = serde_json::to_vec(self)?;
        json.push(b'\n');
        Ok(json)
    }

    /// Decode a single JSON line.
    pub fn decode(line: &str) -> Result<Self, FeedError> {
        Ok(serde_json::from_str(line)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn event(line: &str) -> Option<ClientEvent> {
        ClientMessage::decode(line).unwrap().into_event()
    }

    #[rstest]
    #[case(r#"{"event":"subscribe","data":["AAPL","TSLA"]}"#, ClientEvent::Subscribe(Some(vec!["AAPL".into(), "TSLA".into()])))]
    #[case(r#"{"event":"subscribe"}"#, ClientEvent::Subscribe(None))]
    #[case(r#"{"event":"subscribe","data":"AAPL"}"#, ClientEvent::Subscribe(None))]
    #[case(r#"{"event":"subscribe","data":["AAPL",7,null]}"#, ClientEvent::Subscribe(Some(vec!["AAPL".into()])))]
    #[case(r#"{"event":"unsubscribe","data":{"symbols":["AAPL"]}}"#, ClientEvent::Unsubscribe(None))]
    #[case(r#"{"event":"unsubscribe","data":["MSFT"]}"#, ClientEvent::Unsubscribe(Some(vec!["MSFT".into()])))]
    #[case(r#"{"event":"PING"}"#, ClientEvent::Ping)]
    fn test_into_event(#[case] line: &str, #[case] expected: ClientEvent) {
        assert_eq!(event(line), Some(expected));
    }

    #[test]
    fn test_unknown_event_is_ignored() {
        assert_eq!(event(r#"{"event":"trade","data":[]}"#), None);
    }

    #[test]
    fn test_client_builders_round_trip_through_decode() {
        let line = ClientMessage::subscribe(None).to_json_line().unwrap();
        let text = String::from_utf8(line).unwrap();
        assert!(text.ends_with('\n'));
        assert_eq!(event(text.trim_end()), Some(ClientEvent::Subscribe(None)));
    }

    #[test]
    fn test_server_event_envelope() {
        let value = serde_json::to_value(ServerEvent::Pong(1234)).unwrap();
        assert_eq!(value, serde_json::json!({"event": "pong", "data": 1234}));
        assert_eq!(ServerEvent::Info("hi".into()).as_ref(), "info");
    }

    #[test]
    fn test_update_line_decodes_on_client_side() {
        let quote = Quote::from_ohlc("AAPL", 1.0, 2.0, 0.5, 1.5, 3, 4);
        let line = ServerEvent::Update(quote.clone()).to_json_line().unwrap();
        let decoded = ServerEvent::decode(std::str::from_utf8(&line).unwrap().trim_end()).unwrap();
        assert_eq!(decoded, ServerEvent::Update(quote));
    }
}
