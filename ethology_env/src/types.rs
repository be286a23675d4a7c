//! Common types for the Ethology environment abstraction.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Namespaced identifier of an agent kind, e.g. `minecraft:zombie`.
///
/// This is the archetype key: every analysis of the disposable
/// representative of a kind is cached under it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentTypeKey(String);

impl AgentTypeKey {
    /// Default namespace applied when a key is written without one.
    pub const DEFAULT_NAMESPACE: &'static str = "minecraft";

    /// Parses `namespace:path`, defaulting the namespace when absent.
    pub fn parse(raw: &str) -> Self {
        if raw.contains(':') {
            Self(raw.to_string())
        } else {
            Self(format!("{}:{}", Self::DEFAULT_NAMESPACE, raw))
        }
    }

    /// Builds a key from its two halves.
    pub fn new(namespace: &str, path: &str) -> Self {
        Self(format!("{}:{}", namespace, path))
    }

    /// Returns the namespace half.
    pub fn namespace(&self) -> &str {
        self.0.split_once(':').map(|(ns, _)| ns).unwrap_or(Self::DEFAULT_NAMESPACE)
    }

    /// Returns the path half.
    pub fn path(&self) -> &str {
        self.0.split_once(':').map(|(_, path)| path).unwrap_or(&self.0)
    }

    /// Returns the full key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentTypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier of one live agent instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub Uuid);

impl InstanceId {
    /// Creates a new random InstanceId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a deterministic InstanceId from a seed (for simulation).
    pub fn from_seed(seed: u64) -> Self {
        Self(uuid_from_seed(seed))
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Show first 8 chars for readability
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Identity of whoever asked for a scan (a connected player, a tool).
///
/// Rate limiting is keyed by this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequesterId(pub Uuid);

impl RequesterId {
    /// Creates a new random RequesterId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a deterministic RequesterId from a seed (for simulation).
    pub fn from_seed(seed: u64) -> Self {
        Self(uuid_from_seed(seed ^ 0x5851f42d4c957f2d))
    }
}

impl Default for RequesterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

fn uuid_from_seed(seed: u64) -> Uuid {
    let mut bytes = [0u8; 16];
    bytes[0..8].copy_from_slice(&seed.to_le_bytes());
    bytes[8..16].copy_from_slice(&seed.wrapping_mul(0x517cc1b727220a95).to_le_bytes());
    Uuid::from_bytes(bytes)
}

/// A request for behavioral analysis.
///
/// With `instance_id` present the live instance is analyzed; otherwise the
/// archetype of `agent_type` is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// Kind of agent to analyze
    pub agent_type: AgentTypeKey,

    /// Specific live instance, if targeted
    pub instance_id: Option<InstanceId>,
}

impl ScanRequest {
    /// Request for the archetype of a kind.
    pub fn archetype(agent_type: AgentTypeKey) -> Self {
        Self { agent_type, instance_id: None }
    }

    /// Request for one live instance.
    pub fn instance(agent_type: AgentTypeKey, instance_id: InstanceId) -> Self {
        Self { agent_type, instance_id: Some(instance_id) }
    }

    /// Returns true for targeted (instance) requests.
    pub fn is_targeted(&self) -> bool {
        self.instance_id.is_some()
    }
}

/// Envelope for encoded scan results delivered to a requester.
///
/// This is a transport-layer wrapper - the payload is the encoded result
/// and is decoded by the receiving side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEnvelope {
    /// The encoded result bytes
    pub payload: Vec<u8>,

    /// Timestamp when the result was produced (sender's clock)
    pub timestamp_ms: u64,
}

impl ResultEnvelope {
    /// Creates a new envelope from payload bytes.
    pub fn new(payload: Vec<u8>, timestamp_ms: u64) -> Self {
        Self { payload, timestamp_ms }
    }

    /// Returns the payload size in bytes.
    pub fn size(&self) -> usize {
        self.payload.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_type_key_defaults_namespace() {
        let key = AgentTypeKey::parse("zombie");
        assert_eq!(key.as_str(), "minecraft:zombie");
        assert_eq!(key.namespace(), "minecraft");
        assert_eq!(key.path(), "zombie");
    }

    #[test]
    fn test_agent_type_key_keeps_namespace() {
        let key = AgentTypeKey::parse("wildlife:otter");
        assert_eq!(key.namespace(), "wildlife");
        assert_eq!(key.path(), "otter");
        assert_eq!(key, AgentTypeKey::new("wildlife", "otter"));
    }

    #[test]
    fn test_seeded_ids_are_deterministic() {
        assert_eq!(InstanceId::from_seed(7), InstanceId::from_seed(7));
        assert_ne!(InstanceId::from_seed(7), InstanceId::from_seed(8));
        assert_eq!(RequesterId::from_seed(3), RequesterId::from_seed(3));
        assert_ne!(RequesterId::from_seed(3).0, InstanceId::from_seed(3).0);
    }

    #[test]
    fn test_scan_request_targeting() {
        let key = AgentTypeKey::parse("cow");
        assert!(!ScanRequest::archetype(key.clone()).is_targeted());
        assert!(ScanRequest::instance(key, InstanceId::from_seed(1)).is_targeted());
    }
}
