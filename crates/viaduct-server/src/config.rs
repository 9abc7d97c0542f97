use serde::Deserialize;
use std::path::Path;
use viaduct_protocol_core::pipeline::DEFAULT_MAX_INJECTION_DEPTH;
use viaduct_types::ProtocolVersion;

#[derive(Debug, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Address of the server being proxied to.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Version the backend speaks, by display name (e.g. `"c0.30 CPE"`).
    #[serde(default = "default_server_version")]
    pub server_version: ProtocolVersion,
    #[serde(default = "default_max_packet_size")]
    pub max_packet_size: usize,
    #[serde(default = "default_max_injection_depth")]
    pub max_injection_depth: usize,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_bind() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    25565
}

fn default_backend() -> String {
    "127.0.0.1:25566".into()
}

fn default_server_version() -> ProtocolVersion {
    ProtocolVersion::C0_30_CPE
}

fn default_max_packet_size() -> usize {
    2_097_151
}

fn default_max_injection_depth() -> usize {
    DEFAULT_MAX_INJECTION_DEPTH
}

fn default_log_filter() -> String {
    "info".into()
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            backend: default_backend(),
            server_version: default_server_version(),
            max_packet_size: default_max_packet_size(),
            max_injection_depth: default_max_injection_depth(),
            log_filter: default_log_filter(),
        }
    }
}

impl ProxyConfig {
    /// Missing file means defaults; a file that fails to parse is an error.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Self::parse(&contents)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}
