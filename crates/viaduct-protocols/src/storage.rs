use viaduct_protocol_core::{Capability, CapabilityTag};

/// Present while the classic server reports snow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SnowTracker;

impl Capability for SnowTracker {
    const TAG: CapabilityTag = CapabilityTag::SnowTracker;
}

/// What a CPE server announced during extension negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CpeExtensions {
    pub app_name: String,
    pub expected: usize,
    pub extensions: Vec<(String, i32)>,
}

impl CpeExtensions {
    pub fn new(app_name: impl Into<String>, expected: usize) -> Self {
        Self {
            app_name: app_name.into(),
            expected,
            extensions: Vec::new(),
        }
    }

    /// All announced `ExtEntry` packets have arrived.
    pub fn is_complete(&self) -> bool {
        self.extensions.len() >= self.expected
    }

    pub fn supports(&self, name: &str) -> bool {
        self.extensions.iter().any(|(ext, _)| ext.eq_ignore_ascii_case(name))
    }

    pub fn version_of(&self, name: &str) -> Option<i32> {
        self.extensions
            .iter()
            .find(|(ext, _)| ext.eq_ignore_ascii_case(name))
            .map(|(_, version)| *version)
    }
}

impl Capability for CpeExtensions {
    const TAG: CapabilityTag = CapabilityTag::CpeExtensions;
}
