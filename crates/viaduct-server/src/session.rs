use crate::config::ProxyConfig;
use anyhow::{anyhow, bail, Result};
use bytes::BytesMut;
use std::sync::Arc;
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};
use viaduct_protocol_core::codec::{read_varint, write_varint};
use viaduct_protocol_core::{Connection, Pipeline, ProtocolError, ProtocolRegistry, UserConnection};
use viaduct_types::{Direction, ProtocolVersion};

const HANDSHAKE: i32 = 0x00;

/// Proxy one client: read its handshake, pick the pipeline, then relay
/// translated packets both ways until either side hangs up.
pub async fn handle_connection(
    stream: TcpStream,
    id: u64,
    registry: Arc<ProtocolRegistry>,
    config: Arc<ProxyConfig>,
) {
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".into());
    let client = Connection::new(stream, config.max_packet_size);

    if let Err(e) = run_session(client, id, &registry, &config).await {
        debug!("Connection {} ({}) ended: {:#}", id, peer, e);
    }
}

async fn run_session(
    mut client: Connection,
    id: u64,
    registry: &ProtocolRegistry,
    config: &ProxyConfig,
) -> Result<()> {
    // === Handshake ===
    let (packet_id, mut handshake) = client.read_packet().await?;
    if packet_id != HANDSHAKE {
        bail!("Expected handshake, got packet 0x{:02X}", packet_id);
    }
    let protocol = read_varint(&mut handshake)?;
    let client_version = ProtocolVersion::from_release_protocol(protocol)
        .ok_or_else(|| anyhow!("Unknown client protocol {}", protocol))?;
    let server_version = config.server_version;

    let pipeline = match registry.resolve(server_version, client_version) {
        Ok(pipeline) => pipeline,
        Err(e @ ProtocolError::NoPath { .. }) => {
            warn!("Rejecting connection {}: {}", id, e);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    info!(
        "Connection {}: client {} via {} hops to {}",
        id,
        client_version,
        pipeline.len(),
        server_version
    );

    let backend = TcpStream::connect(&config.backend).await?;
    let mut server = Connection::new(backend, config.max_packet_size);
    if server_version.is_release() {
        let mut rewritten = BytesMut::with_capacity(handshake.len() + 5);
        write_varint(&mut rewritten, server_version.protocol());
        rewritten.extend_from_slice(&handshake);
        server.write_packet(HANDSHAKE, &rewritten).await?;
    }

    let mut user = UserConnection::new(id, client_version, server_version);
    let result = relay(&pipeline, &mut user, client, server).await;
    user.close();
    result
}

async fn relay(
    pipeline: &Pipeline,
    user: &mut UserConnection,
    client: Connection,
    server: Connection,
) -> Result<()> {
    let (mut client_rx, mut client_tx) = client.into_split();
    let (mut server_rx, mut server_tx) = server.into_split();

    loop {
        let (direction, id, payload) = tokio::select! {
            packet = client_rx.read_packet() => {
                let (id, payload) = packet?;
                (Direction::Serverbound, id, payload)
            }
            packet = server_rx.read_packet() => {
                let (id, payload) = packet?;
                (Direction::Clientbound, id, payload)
            }
        };

        let translated = pipeline.process(user, direction, id, payload)?;
        trace!(
            "Connection {}: {} 0x{:02X} -> {} packet(s)",
            user.id(),
            direction,
            id,
            translated.len()
        );
        for packet in translated {
            match packet.direction {
                Direction::Clientbound => client_tx.write_packet(packet.id, &packet.payload).await?,
                Direction::Serverbound => server_tx.write_packet(packet.id, &packet.payload).await?,
            }
        }
    }
}
