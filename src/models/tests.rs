use serde_json::json;

use super::*;
use crate::error::CableError;

// ==================== ChannelIdentifier Tests ====================

#[test]
fn test_identifier_without_params() {
    let identifier = ChannelIdentifier::new("NotificationsChannel");

    assert_eq!(identifier.channel(), "NotificationsChannel");
    assert!(identifier.params().is_empty());
    assert_eq!(identifier.key(), r#"{"channel":"NotificationsChannel"}"#);
}

#[test]
fn test_identifier_key_is_canonical_under_param_reordering() {
    let mut forward = ChannelParams::new();
    forward.insert("a".to_string(), json!(1));
    forward.insert("b".to_string(), json!(2));

    let mut reversed = ChannelParams::new();
    reversed.insert("b".to_string(), json!(2));
    reversed.insert("a".to_string(), json!(1));

    let first = ChannelIdentifier::with_params("x", forward).unwrap();
    let second = ChannelIdentifier::with_params("x", reversed).unwrap();

    assert_eq!(
        first.key(),
        second.key(),
        "identically-populated params must serialize to the same key"
    );
    assert_eq!(first, second);
}

#[test]
fn test_identifier_rejects_reserved_channel_key() {
    let mut params = ChannelParams::new();
    params.insert("channel".to_string(), json!("Sneaky"));

    let err = ChannelIdentifier::with_params("RoomChannel", params).unwrap_err();
    assert!(
        matches!(err, CableError::ConfigurationError(_)),
        "reserved key should be a configuration error, got: {err}"
    );
}

#[test]
fn test_identifier_from_wire_round_trip() {
    let mut params = ChannelParams::new();
    params.insert("room_id".to_string(), json!(7));
    let identifier = ChannelIdentifier::with_params("ChatChannel", params).unwrap();

    let parsed = ChannelIdentifier::from_wire(&identifier.key()).unwrap();
    assert_eq!(parsed, identifier);
}

#[test]
fn test_identifier_from_wire_tolerates_foreign_key_order() {
    // A server may re-serialize the identifier with its own key order.
    let parsed = ChannelIdentifier::from_wire(r#"{"room_id":7,"channel":"ChatChannel"}"#).unwrap();

    assert_eq!(parsed.channel(), "ChatChannel");
    assert_eq!(parsed.key(), r#"{"channel":"ChatChannel","room_id":7}"#);
}

#[test]
fn test_identifier_from_wire_requires_channel_field() {
    let err = ChannelIdentifier::from_wire(r#"{"room_id":7}"#).unwrap_err();
    assert!(matches!(err, CableError::SerializationError(_)));
}

#[test]
fn test_identifier_supports_nested_param_values() {
    let mut params = ChannelParams::new();
    params.insert("filter".to_string(), json!({"kind": "note", "ids": [1, 2]}));
    let identifier = ChannelIdentifier::with_params("FeedChannel", params).unwrap();

    let parsed = ChannelIdentifier::from_wire(&identifier.key()).unwrap();
    assert_eq!(parsed.params()["filter"]["ids"], json!([1, 2]));
}

// ==================== ClientCommand Tests ====================

#[test]
fn test_subscribe_command_wire_shape() {
    let identifier = ChannelIdentifier::new("NotificationsChannel");
    let command = ClientCommand::Subscribe {
        identifier: identifier.key(),
    };

    let wire: serde_json::Value = serde_json::to_value(&command).unwrap();
    assert_eq!(wire["command"], "subscribe");
    assert_eq!(wire["identifier"], r#"{"channel":"NotificationsChannel"}"#);
}

#[test]
fn test_unsubscribe_command_wire_shape() {
    let command = ClientCommand::Unsubscribe {
        identifier: r#"{"channel":"ChatChannel"}"#.to_string(),
    };

    let wire: serde_json::Value = serde_json::to_value(&command).unwrap();
    assert_eq!(wire["command"], "unsubscribe");
    assert_eq!(command.identifier(), r#"{"channel":"ChatChannel"}"#);
}

// ==================== ServerMessage Tests ====================

#[test]
fn test_parse_welcome_frame() {
    let msg = ServerMessage::parse(r#"{"type":"welcome"}"#).unwrap();
    assert!(matches!(msg, ServerMessage::Protocol(ProtocolFrame::Welcome)));
}

#[test]
fn test_parse_ping_frame() {
    let msg = ServerMessage::parse(r#"{"type":"ping","message":1724400000}"#).unwrap();
    match msg {
        ServerMessage::Protocol(ProtocolFrame::Ping { message }) => {
            assert_eq!(message, Some(json!(1724400000)));
        }
        other => panic!("expected ping, got {other:?}"),
    }
}

#[test]
fn test_parse_confirm_subscription_frame() {
    let msg = ServerMessage::parse(
        r#"{"identifier":"{\"channel\":\"ChatChannel\"}","type":"confirm_subscription"}"#,
    )
    .unwrap();
    match msg {
        ServerMessage::Protocol(ProtocolFrame::ConfirmSubscription { identifier }) => {
            assert_eq!(identifier, r#"{"channel":"ChatChannel"}"#);
        }
        other => panic!("expected confirm_subscription, got {other:?}"),
    }
}

#[test]
fn test_parse_reject_subscription_frame() {
    let msg = ServerMessage::parse(
        r#"{"identifier":"{\"channel\":\"ChatChannel\"}","type":"reject_subscription"}"#,
    )
    .unwrap();
    assert!(matches!(
        msg,
        ServerMessage::Protocol(ProtocolFrame::RejectSubscription { .. })
    ));
}

#[test]
fn test_parse_disconnect_frame() {
    let msg =
        ServerMessage::parse(r#"{"type":"disconnect","reason":"unauthorized","reconnect":false}"#)
            .unwrap();
    match msg {
        ServerMessage::Protocol(ProtocolFrame::Disconnect { reason, reconnect }) => {
            assert_eq!(reason.as_deref(), Some("unauthorized"));
            assert_eq!(reconnect, Some(false));
        }
        other => panic!("expected disconnect, got {other:?}"),
    }
}

#[test]
fn test_parse_disconnect_frame_without_hints() {
    let msg = ServerMessage::parse(r#"{"type":"disconnect"}"#).unwrap();
    match msg {
        ServerMessage::Protocol(ProtocolFrame::Disconnect { reason, reconnect }) => {
            assert!(reason.is_none());
            assert!(reconnect.is_none(), "absent reconnect hint stays None");
        }
        other => panic!("expected disconnect, got {other:?}"),
    }
}

#[test]
fn test_parse_broadcast_frame() {
    // Broadcasts carry no type tag at all.
    let msg = ServerMessage::parse(
        r#"{"identifier":"{\"channel\":\"ChatChannel\"}","message":{"body":"hi"}}"#,
    )
    .unwrap();
    match msg {
        ServerMessage::Broadcast { identifier, message } => {
            assert_eq!(identifier, r#"{"channel":"ChatChannel"}"#);
            assert_eq!(message["body"], "hi");
        }
        other => panic!("expected broadcast, got {other:?}"),
    }
}

#[test]
fn test_parse_garbage_frame_is_an_error() {
    assert!(ServerMessage::parse("not json").is_err());
    assert!(
        ServerMessage::parse(r#"{"something":"else"}"#).is_err(),
        "a frame that is neither typed nor broadcast-shaped should not parse"
    );
}

// ==================== ConnectionOptions Tests ====================

#[test]
fn test_connection_options_default() {
    let opts = ConnectionOptions::default();

    assert!(opts.auto_reconnect, "auto_reconnect should default to true");
    assert_eq!(opts.reconnect_delay_ms, 1000, "reconnect_delay_ms should default to 1000");
    assert_eq!(
        opts.max_reconnect_delay_ms, 30000,
        "max_reconnect_delay_ms should default to 30000"
    );
    assert!(
        opts.max_reconnect_attempts.is_none(),
        "max_reconnect_attempts should default to None (infinite)"
    );
}

#[test]
fn test_connection_options_builder_pattern() {
    let opts = ConnectionOptions::new()
        .with_auto_reconnect(false)
        .with_reconnect_delay_ms(2000)
        .with_max_reconnect_delay_ms(60000)
        .with_max_reconnect_attempts(Some(5));

    assert!(!opts.auto_reconnect);
    assert_eq!(opts.reconnect_delay_ms, 2000);
    assert_eq!(opts.max_reconnect_delay_ms, 60000);
    assert_eq!(opts.max_reconnect_attempts, Some(5));
}

#[test]
fn test_connection_options_deserialize_fills_defaults() {
    let opts: ConnectionOptions = serde_json::from_str("{}").unwrap();

    assert!(opts.auto_reconnect);
    assert_eq!(opts.reconnect_delay_ms, 1000);
    assert_eq!(opts.max_reconnect_delay_ms, 30000);
    assert!(opts.max_reconnect_attempts.is_none());
}

#[test]
fn test_connection_options_serialization_round_trip() {
    let opts = ConnectionOptions::new()
        .with_reconnect_delay_ms(500)
        .with_max_reconnect_attempts(Some(3));

    let json = serde_json::to_string(&opts).unwrap();
    let parsed: ConnectionOptions = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed.reconnect_delay_ms, 500);
    assert_eq!(parsed.max_reconnect_attempts, Some(3));
}

// ==================== Content Model Tests ====================

#[test]
fn test_concept_deserializes_from_api_shape() {
    let concept: Concept =
        serde_json::from_str(r#"{"id":3,"slug":"entropy","title":"Entropy"}"#).unwrap();

    assert_eq!(concept, Concept::new(3, "entropy", "Entropy"));
}

#[test]
fn test_chapter_carries_parent_concept_slug() {
    let chapter = Chapter::new(11, "entropy-arrow", "The Arrow of Time", "entropy");
    let json = serde_json::to_value(&chapter).unwrap();

    assert_eq!(json["concept_slug"], "entropy");

    let back: Chapter = serde_json::from_value(json).unwrap();
    assert_eq!(back, chapter);
}
