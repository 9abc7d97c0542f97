//! Concrete version hops.

pub mod c0_30cpe_to_r1_19_3;
pub mod packets;
pub mod r1_19_3_to_r1_19_4;
pub mod storage;

use tracing::info;
use viaduct_protocol_core::{ProtocolRegistry, ProtocolResult};

/// Build the registry holding every hop this crate provides.
pub fn build_registry(max_injection_depth: usize) -> ProtocolResult<ProtocolRegistry> {
    let mut builder = ProtocolRegistry::builder().max_injection_depth(max_injection_depth);
    builder
        .register(c0_30cpe_to_r1_19_3::protocol()?)?
        .register(r1_19_3_to_r1_19_4::protocol()?)?;
    let registry = builder.build();
    info!(
        "Loaded {} protocol hops covering {} versions",
        registry.hop_count(),
        registry.versions().len()
    );
    Ok(registry)
}
