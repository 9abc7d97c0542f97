use bytes::BytesMut;
use std::sync::Arc;
use viaduct_protocol_core::wire::{Bool, Byte, ClassicString, Float, Int, Long, Short, Str, UnsignedByte, VarInt, WireType};
use viaduct_protocol_core::{Pipeline, ProtocolError, ProtocolRegistry, TranslatedPacket, UserConnection};
use viaduct_protocols::packets::{c0_30_cpe, r1_19_3, r1_19_4};
use viaduct_protocols::storage::{CpeExtensions, SnowTracker};
use viaduct_types::{Direction, ProtocolVersion, TextComponent};

fn registry() -> ProtocolRegistry {
    viaduct_protocols::build_registry(8).unwrap()
}

fn session(client: ProtocolVersion) -> (Arc<Pipeline>, UserConnection) {
    let pipeline = registry()
        .resolve(ProtocolVersion::C0_30_CPE, client)
        .unwrap();
    (
        pipeline,
        UserConnection::new(1, client, ProtocolVersion::C0_30_CPE),
    )
}

fn game_event(kind: u8, value: f32) -> Vec<u8> {
    let mut buf = BytesMut::new();
    UnsignedByte.encode(&kind, &mut buf).unwrap();
    Float.encode(&value, &mut buf).unwrap();
    buf.to_vec()
}

fn weather(pipeline: &Pipeline, user: &mut UserConnection, kind: i8) -> Vec<TranslatedPacket> {
    let mut payload = BytesMut::new();
    Byte.encode(&kind, &mut payload).unwrap();
    pipeline
        .process(
            user,
            Direction::Clientbound,
            c0_30_cpe::clientbound::ENV_WEATHER_TYPE,
            payload,
        )
        .unwrap()
}

fn summary(packets: &[TranslatedPacket]) -> Vec<(Direction, i32, Vec<u8>)> {
    packets
        .iter()
        .map(|p| (p.direction, p.id, p.payload.to_vec()))
        .collect()
}

#[test]
fn test_snow_starts_rain_and_tracks_snow() {
    let (pipeline, mut user) = session(ProtocolVersion::R1_19_4);
    let out = weather(&pipeline, &mut user, 2);
    let event = r1_19_4::clientbound::GAME_EVENT;
    assert_eq!(
        summary(&out),
        vec![
            (Direction::Clientbound, event, game_event(1, 2.0)),
            (Direction::Clientbound, event, game_event(7, 1.0)),
        ]
    );
    assert!(user.has::<SnowTracker>());
}

#[test]
fn test_sunny_clears_snow() {
    let (pipeline, mut user) = session(ProtocolVersion::R1_19_4);
    weather(&pipeline, &mut user, 2);
    let out = weather(&pipeline, &mut user, 0);
    assert_eq!(
        summary(&out),
        vec![(
            Direction::Clientbound,
            r1_19_4::clientbound::GAME_EVENT,
            game_event(1, 1.0)
        )]
    );
    assert!(!user.has::<SnowTracker>());
}

#[test]
fn test_rain_replaces_snow() {
    let (pipeline, mut user) = session(ProtocolVersion::R1_19_4);
    weather(&pipeline, &mut user, 2);
    let out = weather(&pipeline, &mut user, 1);
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].payload.to_vec(), game_event(1, 2.0));
    assert_eq!(out[1].payload.to_vec(), game_event(7, 1.0));
    assert!(!user.has::<SnowTracker>());
}

#[test]
fn test_unknown_weather_only_starts_rain() {
    let (pipeline, mut user) = session(ProtocolVersion::R1_19_4);
    weather(&pipeline, &mut user, 2);
    let out = weather(&pipeline, &mut user, 5);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].payload.to_vec(), game_event(1, 2.0));
    assert!(!user.has::<SnowTracker>());
}

#[test]
fn test_weather_for_1_19_3_client() {
    let (pipeline, mut user) = session(ProtocolVersion::R1_19_3);
    assert_eq!(pipeline.len(), 1);
    let out = weather(&pipeline, &mut user, 0);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].id, r1_19_3::clientbound::GAME_EVENT);
}

#[test]
fn test_weather_does_not_interleave_with_next_packet() {
    let (pipeline, mut user) = session(ProtocolVersion::R1_19_4);
    let mut wire = weather(&pipeline, &mut user, 2);
    wire.extend(
        pipeline
            .process(
                &mut user,
                Direction::Clientbound,
                c0_30_cpe::clientbound::PING,
                BytesMut::new(),
            )
            .unwrap(),
    );
    let ids: Vec<_> = wire.iter().map(|p| p.id).collect();
    assert_eq!(
        ids,
        vec![
            r1_19_4::clientbound::GAME_EVENT,
            r1_19_4::clientbound::GAME_EVENT,
            r1_19_4::clientbound::KEEP_ALIVE,
        ]
    );
    assert_eq!(wire[2].payload.to_vec(), vec![0; 8]);
}

fn ext_info(app: &str, count: i16) -> BytesMut {
    let mut buf = BytesMut::new();
    ClassicString.encode(&app.to_string(), &mut buf).unwrap();
    Short.encode(&count, &mut buf).unwrap();
    buf
}

fn ext_entry(name: &str, version: i32) -> BytesMut {
    let mut buf = BytesMut::new();
    ClassicString.encode(&name.to_string(), &mut buf).unwrap();
    Int.encode(&version, &mut buf).unwrap();
    buf
}

#[test]
fn test_cpe_negotiation_answers_after_last_entry() {
    let (pipeline, mut user) = session(ProtocolVersion::R1_19_4);
    let out = pipeline
        .process(
            &mut user,
            Direction::Clientbound,
            c0_30_cpe::clientbound::EXT_INFO,
            ext_info("ClassicServer", 2),
        )
        .unwrap();
    assert!(out.is_empty());

    let out = pipeline
        .process(
            &mut user,
            Direction::Clientbound,
            c0_30_cpe::clientbound::EXT_ENTRY,
            ext_entry("EnvWeatherType", 1),
        )
        .unwrap();
    assert!(out.is_empty());

    let out = pipeline
        .process(
            &mut user,
            Direction::Clientbound,
            c0_30_cpe::clientbound::EXT_ENTRY,
            ext_entry("MessageTypes", 1),
        )
        .unwrap();
    assert_eq!(
        summary(&out),
        vec![
            (
                Direction::Serverbound,
                c0_30_cpe::serverbound::EXT_INFO,
                ext_info("viaduct", 2).to_vec()
            ),
            (
                Direction::Serverbound,
                c0_30_cpe::serverbound::EXT_ENTRY,
                ext_entry("EnvWeatherType", 1).to_vec()
            ),
            (
                Direction::Serverbound,
                c0_30_cpe::serverbound::EXT_ENTRY,
                ext_entry("MessageTypes", 1).to_vec()
            ),
        ]
    );

    let extensions = user.get::<CpeExtensions>().unwrap();
    assert_eq!(extensions.app_name, "ClassicServer");
    assert!(extensions.supports("EnvWeatherType"));
}

#[test]
fn test_cpe_without_extensions_answers_immediately() {
    let (pipeline, mut user) = session(ProtocolVersion::R1_19_4);
    let out = pipeline
        .process(
            &mut user,
            Direction::Clientbound,
            c0_30_cpe::clientbound::EXT_INFO,
            ext_info("Bare", 0),
        )
        .unwrap();
    assert_eq!(out.len(), 3);
    assert!(out.iter().all(|p| p.direction == Direction::Serverbound));
}

#[test]
fn test_ext_entry_without_ext_info_fails() {
    let (pipeline, mut user) = session(ProtocolVersion::R1_19_4);
    let result = pipeline.process(
        &mut user,
        Direction::Clientbound,
        c0_30_cpe::clientbound::EXT_ENTRY,
        ext_entry("EnvWeatherType", 1),
    );
    assert!(matches!(result, Err(ProtocolError::Handler(_))));
}

#[test]
fn test_classic_message_becomes_system_chat() {
    let (pipeline, mut user) = session(ProtocolVersion::R1_19_4);
    let mut payload = BytesMut::new();
    Byte.encode(&0, &mut payload).unwrap();
    ClassicString
        .encode(&"hello world".to_string(), &mut payload)
        .unwrap();
    let out = pipeline
        .process(
            &mut user,
            Direction::Clientbound,
            c0_30_cpe::clientbound::MESSAGE,
            payload,
        )
        .unwrap();

    let mut expected = BytesMut::new();
    Str::new(262_144)
        .encode(&TextComponent::plain("hello world").to_json(), &mut expected)
        .unwrap();
    Bool.encode(&false, &mut expected).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].id, r1_19_4::clientbound::SYSTEM_CHAT);
    assert_eq!(out[0].payload.to_vec(), expected.to_vec());
}

#[test]
fn test_disconnect_reason_becomes_json() {
    let (pipeline, mut user) = session(ProtocolVersion::R1_19_4);
    let mut payload = BytesMut::new();
    ClassicString
        .encode(&"Kicked".to_string(), &mut payload)
        .unwrap();
    let out = pipeline
        .process(
            &mut user,
            Direction::Clientbound,
            c0_30_cpe::clientbound::DISCONNECT,
            payload,
        )
        .unwrap();
    let mut expected = BytesMut::new();
    Str::new(262_144)
        .encode(&r#"{"text":"Kicked"}"#.to_string(), &mut expected)
        .unwrap();
    assert_eq!(out[0].id, r1_19_4::clientbound::DISCONNECT);
    assert_eq!(out[0].payload.to_vec(), expected.to_vec());
}

fn chat_message(text: &str) -> BytesMut {
    let mut buf = BytesMut::new();
    Str::new(256).encode(&text.to_string(), &mut buf).unwrap();
    Long.encode(&1_700_000_000_000, &mut buf).unwrap();
    Long.encode(&42, &mut buf).unwrap();
    Bool.encode(&false, &mut buf).unwrap();
    VarInt.encode(&0, &mut buf).unwrap();
    buf.extend_from_slice(&[0, 0, 0]);
    buf
}

fn classic_message(text: &str) -> Vec<u8> {
    let mut buf = BytesMut::new();
    Byte.encode(&-1, &mut buf).unwrap();
    ClassicString.encode(&text.to_string(), &mut buf).unwrap();
    buf.to_vec()
}

#[test]
fn test_serverbound_chat_becomes_classic_message() {
    let (pipeline, mut user) = session(ProtocolVersion::R1_19_4);
    let out = pipeline
        .process(
            &mut user,
            Direction::Serverbound,
            r1_19_3::serverbound::CHAT_MESSAGE,
            chat_message("hello"),
        )
        .unwrap();
    assert_eq!(
        summary(&out),
        vec![(
            Direction::Serverbound,
            c0_30_cpe::serverbound::MESSAGE,
            classic_message("hello")
        )]
    );
}

#[test]
fn test_long_chat_is_split() {
    let (pipeline, mut user) = session(ProtocolVersion::R1_19_4);
    let text = "a".repeat(100);
    let out = pipeline
        .process(
            &mut user,
            Direction::Serverbound,
            r1_19_3::serverbound::CHAT_MESSAGE,
            chat_message(&text),
        )
        .unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].payload.to_vec(), classic_message(&text[..64]));
    assert_eq!(out[1].payload.to_vec(), classic_message(&text[64..]));
    assert!(out.iter().all(|p| p.id == c0_30_cpe::serverbound::MESSAGE));
}

#[test]
fn test_serverbound_keep_alive_is_dropped() {
    let (pipeline, mut user) = session(ProtocolVersion::R1_19_4);
    let mut payload = BytesMut::new();
    Long.encode(&7, &mut payload).unwrap();
    let out = pipeline
        .process(
            &mut user,
            Direction::Serverbound,
            r1_19_3::serverbound::KEEP_ALIVE,
            payload,
        )
        .unwrap();
    assert!(out.is_empty());
}

#[test]
fn test_untranslated_packet_passes_through() {
    let (pipeline, mut user) = session(ProtocolVersion::R1_19_4);
    let out = pipeline
        .process(
            &mut user,
            Direction::Clientbound,
            0x05,
            BytesMut::from(&[1u8, 2, 3][..]),
        )
        .unwrap();
    assert_eq!(out[0].id, 0x06);
    assert_eq!(out[0].payload.to_vec(), vec![1, 2, 3]);
}

#[test]
fn test_unsupported_version_has_no_path() {
    let registry = registry();
    assert!(matches!(
        registry.resolve(ProtocolVersion::C0_30_CPE, ProtocolVersion::R1_20),
        Err(ProtocolError::NoPath { .. })
    ));
    assert!(matches!(
        registry.resolve(ProtocolVersion::R1_8, ProtocolVersion::R1_19_4),
        Err(ProtocolError::NoPath { .. })
    ));
}

#[test]
fn test_close_drops_capabilities() {
    let (pipeline, mut user) = session(ProtocolVersion::R1_19_4);
    weather(&pipeline, &mut user, 2);
    user.close();
    assert!(!user.has::<SnowTracker>());
}
