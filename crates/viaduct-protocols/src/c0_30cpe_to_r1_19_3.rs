//! Classic (c0.30 with CPE) server to a 1.19.3 client.
//!
//! Only the play packets a classic server sends outside of world data are
//! translated here: chat, disconnect, ping, extension negotiation and weather.

use crate::packets::{c0_30_cpe, game_event, r1_19_3, r1_19_4, weather};
use crate::storage::{CpeExtensions, SnowTracker};
use tracing::{debug, trace};
use viaduct_protocol_core::wire::{Bool, Byte, ClassicString, Float, Int, Long, Short, Str, UnsignedByte};
use viaduct_protocol_core::{
    HopId, PacketHandlers, PacketWrapper, Protocol, ProtocolResult, UserConnection,
};
use viaduct_types::{PacketIdentifier, ProtocolVersion, TextComponent};

const CHAT_JSON: Str = Str::new(262_144);
const CHAT_INPUT: Str = Str::new(256);

const APP_NAME: &str = "viaduct";
const SUPPORTED_EXTENSIONS: &[(&str, i32)] = &[("EnvWeatherType", 1), ("MessageTypes", 1)];

/// `MessageTypes` sender id for a message shown above the hotbar.
const ANNOUNCEMENT: i8 = 100;
/// Sender id the classic protocol expects from clients.
const SELF_SENDER: i8 = -1;

pub fn hop_id() -> HopId {
    HopId::new(ProtocolVersion::C0_30_CPE, ProtocolVersion::R1_19_3)
}

pub fn protocol() -> ProtocolResult<Protocol> {
    let mut protocol = Protocol::new(ProtocolVersion::C0_30_CPE, ProtocolVersion::R1_19_3);

    protocol.register_clientbound(
        c0_30_cpe::clientbound::ENV_WEATHER_TYPE,
        None,
        PacketHandlers::new().handler(translate_weather),
    )?;
    protocol.register_clientbound(
        c0_30_cpe::clientbound::EXT_INFO,
        None,
        PacketHandlers::new().handler(record_ext_info),
    )?;
    protocol.register_clientbound(
        c0_30_cpe::clientbound::EXT_ENTRY,
        None,
        PacketHandlers::new().handler(record_ext_entry),
    )?;
    protocol.register_clientbound(
        c0_30_cpe::clientbound::MESSAGE,
        Some(r1_19_3::clientbound::SYSTEM_CHAT),
        PacketHandlers::new().handler(translate_message),
    )?;
    protocol.register_clientbound(
        c0_30_cpe::clientbound::DISCONNECT,
        Some(r1_19_3::clientbound::DISCONNECT),
        PacketHandlers::new().handler(|wrapper| {
            let reason = wrapper.read(ClassicString)?;
            wrapper.write(CHAT_JSON, classic_text(&reason).to_json())?;
            Ok(())
        }),
    )?;
    protocol.register_clientbound(
        c0_30_cpe::clientbound::PING,
        Some(r1_19_3::clientbound::KEEP_ALIVE),
        PacketHandlers::new().write(Long, 0),
    )?;

    protocol.register_serverbound(
        r1_19_3::serverbound::CHAT_MESSAGE,
        Some(c0_30_cpe::serverbound::MESSAGE),
        PacketHandlers::new().handler(translate_chat),
    )?;
    protocol.register_serverbound(
        r1_19_3::serverbound::KEEP_ALIVE,
        None,
        PacketHandlers::new().handler(|wrapper| {
            wrapper.clear_input();
            wrapper.cancel();
            Ok(())
        }),
    )?;

    Ok(protocol)
}

// === Weather ===

fn translate_weather(wrapper: &mut PacketWrapper<'_>) -> ProtocolResult<()> {
    wrapper.cancel();
    let weather_type = wrapper.read(Byte)?;

    let (rain_state, rain_level) = match weather_type {
        weather::SUNNY => (1.0, None),
        weather::RAINING | weather::SNOWING => (2.0, Some(1.0)),
        _ => (2.0, None),
    };
    send_game_event(wrapper.user(), game_event::RAIN_STATE, rain_state)?;
    if let Some(level) = rain_level {
        send_game_event(wrapper.user(), game_event::RAIN_LEVEL, level)?;
    }

    let user = wrapper.user();
    if weather_type == weather::SNOWING {
        user.put(SnowTracker);
    } else {
        user.remove::<SnowTracker>();
    }
    trace!("Connection {}: classic weather {}", user.id(), weather_type);
    Ok(())
}

/// Game events are injected already shaped for the newest version this
/// crate knows about, skipping the hops that would otherwise remap them.
fn send_game_event(user: &mut UserConnection, kind: u8, value: f32) -> ProtocolResult<()> {
    let (id, after) = if user
        .client_version()
        .newer_than_or_equal_to(ProtocolVersion::R1_19_4)
    {
        (
            r1_19_4::clientbound::GAME_EVENT,
            HopId::new(ProtocolVersion::R1_19_3, ProtocolVersion::R1_19_4),
        )
    } else {
        (r1_19_3::clientbound::GAME_EVENT, hop_id())
    };

    let mut event = PacketWrapper::create(PacketIdentifier::clientbound(id), user);
    event.write(UnsignedByte, kind)?;
    event.write(Float, value)?;
    event.send(after);
    Ok(())
}

// === Extension negotiation ===

fn record_ext_info(wrapper: &mut PacketWrapper<'_>) -> ProtocolResult<()> {
    wrapper.cancel();
    let app_name = wrapper.read(ClassicString)?;
    let count = wrapper.read(Short)?.max(0) as usize;
    debug!("CPE server '{}' announces {} extensions", app_name, count);

    let user = wrapper.user();
    user.put(CpeExtensions::new(app_name, count));
    if count == 0 {
        answer_extensions(user)?;
    }
    Ok(())
}

fn record_ext_entry(wrapper: &mut PacketWrapper<'_>) -> ProtocolResult<()> {
    wrapper.cancel();
    let name = wrapper.read(ClassicString)?;
    let version = wrapper.read(Int)?;

    let user = wrapper.user();
    let Some(extensions) = user.get_mut::<CpeExtensions>() else {
        return Err(anyhow::anyhow!("ExtEntry '{}' received before ExtInfo", name).into());
    };
    extensions.extensions.push((name, version));
    if extensions.extensions.len() == extensions.expected {
        answer_extensions(user)?;
    }
    Ok(())
}

/// The client half of the handshake: our own `ExtInfo` followed by one
/// `ExtEntry` per supported extension. Already classic-shaped, so they leave
/// through the serverbound side of this hop.
fn answer_extensions(user: &mut UserConnection) -> ProtocolResult<()> {
    let mut info = PacketWrapper::create(
        PacketIdentifier::serverbound(c0_30_cpe::serverbound::EXT_INFO),
        user,
    );
    info.write(ClassicString, APP_NAME.to_string())?;
    info.write(Short, SUPPORTED_EXTENSIONS.len() as i16)?;
    info.send(hop_id());

    for (name, version) in SUPPORTED_EXTENSIONS {
        let mut entry = PacketWrapper::create(
            PacketIdentifier::serverbound(c0_30_cpe::serverbound::EXT_ENTRY),
            user,
        );
        entry.write(ClassicString, name.to_string())?;
        entry.write(Int, *version)?;
        entry.send(hop_id());
    }
    Ok(())
}

// === Chat ===

fn translate_message(wrapper: &mut PacketWrapper<'_>) -> ProtocolResult<()> {
    let sender = wrapper.read(Byte)?;
    let message = wrapper.read(ClassicString)?;
    let overlay = sender == ANNOUNCEMENT
        && wrapper
            .user()
            .get::<CpeExtensions>()
            .is_some_and(|ext| ext.supports("MessageTypes"));

    wrapper.write(CHAT_JSON, classic_text(&message).to_json())?;
    wrapper.write(Bool, overlay)?;
    Ok(())
}

/// Modern chat carries up to 256 characters plus signing data; classic
/// messages are 64 characters. Long messages are split and the overflow is
/// sent as extra classic messages.
fn translate_chat(wrapper: &mut PacketWrapper<'_>) -> ProtocolResult<()> {
    let message = wrapper.read(CHAT_INPUT)?;
    wrapper.clear_input();

    let mut chunks = split_classic(&message).into_iter();
    let first = chunks.next().unwrap_or_default();
    wrapper.write(Byte, SELF_SENDER)?;
    wrapper.write(ClassicString, first)?;

    for chunk in chunks {
        let mut extra = PacketWrapper::create(
            PacketIdentifier::serverbound(c0_30_cpe::serverbound::MESSAGE),
            wrapper.user(),
        );
        extra.write(Byte, SELF_SENDER)?;
        extra.write(ClassicString, chunk)?;
        extra.send(hop_id());
    }
    Ok(())
}

fn split_classic(message: &str) -> Vec<String> {
    let chars: Vec<char> = message.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(ClassicString::WIDTH)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

const CLASSIC_COLORS: [&str; 16] = [
    "black",
    "dark_blue",
    "dark_green",
    "dark_aqua",
    "dark_red",
    "dark_purple",
    "gold",
    "gray",
    "dark_gray",
    "blue",
    "green",
    "aqua",
    "red",
    "light_purple",
    "yellow",
    "white",
];

/// Turn `&`-prefixed classic color codes into component colors.
fn classic_text(message: &str) -> TextComponent {
    let mut root = TextComponent::plain("");
    let mut color: Option<&str> = None;
    let mut current = String::new();
    let mut chars = message.chars().peekable();

    while let Some(c) = chars.next() {
        let code = match chars.peek() {
            Some(next) if c == '&' => next.to_digit(16),
            _ => None,
        };
        let Some(code) = code else {
            current.push(c);
            continue;
        };
        chars.next();
        if !current.is_empty() {
            root.extra.push(segment(std::mem::take(&mut current), color));
        }
        color = Some(CLASSIC_COLORS[code as usize]);
    }
    if !current.is_empty() {
        root.extra.push(segment(current, color));
    }

    match root.extra.len() {
        0 => root,
        1 if root.extra[0].color.is_none() => root.extra.remove(0),
        _ => root,
    }
}

fn segment(text: String, color: Option<&str>) -> TextComponent {
    match color {
        Some(color) => TextComponent::colored(text, color),
        None => TextComponent::plain(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classic_text_plain() {
        assert_eq!(classic_text("hello"), TextComponent::plain("hello"));
        assert_eq!(classic_text(""), TextComponent::plain(""));
    }

    #[test]
    fn test_classic_text_colors() {
        let text = classic_text("&ewelcome &fhome");
        assert_eq!(text.text, "");
        assert_eq!(
            text.extra,
            vec![
                TextComponent::colored("welcome ", "yellow"),
                TextComponent::colored("home", "white"),
            ]
        );
    }

    #[test]
    fn test_classic_text_keeps_lone_ampersand() {
        assert_eq!(classic_text("a & b"), TextComponent::plain("a & b"));
        assert_eq!(classic_text("trailing&"), TextComponent::plain("trailing&"));
    }

    #[test]
    fn test_split_classic() {
        assert_eq!(split_classic(""), vec![String::new()]);
        assert_eq!(split_classic("hi"), vec!["hi".to_string()]);
        let long = "x".repeat(130);
        let chunks = split_classic(&long);
        assert_eq!(
            chunks.iter().map(String::len).collect::<Vec<_>>(),
            vec![64, 64, 2]
        );
    }

    #[test]
    fn test_registrations() {
        let protocol = protocol().unwrap();
        assert_eq!(protocol.id(), hop_id());
        assert_eq!(
            protocol.mapped_id(
                viaduct_types::Direction::Clientbound,
                c0_30_cpe::clientbound::MESSAGE
            ),
            r1_19_3::clientbound::SYSTEM_CHAT
        );
        assert_eq!(
            protocol.mapped_id(
                viaduct_types::Direction::Serverbound,
                r1_19_3::serverbound::CHAT_MESSAGE
            ),
            c0_30_cpe::serverbound::MESSAGE
        );
    }
}
