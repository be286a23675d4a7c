//! Wire form of a finished analysis.
//!
//! Field order is the wire order: agent type, optional instance, four stats,
//! capabilities, current states. Encoded with bincode's default options.

use crate::accumulator::{AgentStats, TraitAccumulator};
use crate::behavior_trait::BehaviorTrait;
use crate::error::EthologyError;
use ethology_env::{AgentTypeKey, InstanceId, ResultEnvelope};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WireStats {
    pub health: f64,
    pub damage: f64,
    pub speed: f64,
    pub defense: f64,
}

impl From<AgentStats> for WireStats {
    fn from(stats: AgentStats) -> Self {
        Self {
            health: stats.health,
            damage: stats.damage,
            speed: stats.speed,
            defense: stats.defense,
        }
    }
}

impl From<WireStats> for AgentStats {
    fn from(stats: WireStats) -> Self {
        Self {
            health: stats.health,
            damage: stats.damage,
            speed: stats.speed,
            defense: stats.defense,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub agent_type: AgentTypeKey,
    pub instance_id: Option<InstanceId>,
    pub stats: WireStats,
    pub capabilities: Vec<BehaviorTrait>,
    pub current_states: Vec<BehaviorTrait>,
}

impl ScanResult {
    pub fn encode(&self) -> Result<Vec<u8>, EthologyError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, EthologyError> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Encodes into an envelope stamped with `timestamp_ms`.
    pub fn to_envelope(&self, timestamp_ms: u64) -> Result<ResultEnvelope, EthologyError> {
        Ok(ResultEnvelope::new(self.encode()?, timestamp_ms))
    }

    pub fn from_envelope(envelope: &ResultEnvelope) -> Result<Self, EthologyError> {
        Self::decode(&envelope.payload)
    }
}

impl From<&TraitAccumulator> for ScanResult {
    fn from(acc: &TraitAccumulator) -> Self {
        Self {
            agent_type: acc.agent_type().clone(),
            instance_id: acc.instance_id(),
            stats: acc.stats().into(),
            capabilities: acc.capabilities().to_vec(),
            current_states: acc.current_states().to_vec(),
        }
    }
}

/// Rebuilds an accumulator. Goes through the normal insertion path, so a
/// payload with duplicate keys still yields unique lists.
impl From<ScanResult> for TraitAccumulator {
    fn from(result: ScanResult) -> Self {
        let mut acc = TraitAccumulator::new(result.agent_type);
        acc.set_instance_id(result.instance_id);
        acc.set_stats(result.stats.into());
        for t in result.capabilities {
            acc.add_capability(t);
        }
        for t in result.current_states {
            acc.add_current_state(t);
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior_trait::TraitCategory;

    fn sample() -> TraitAccumulator {
        let mut acc = TraitAccumulator::for_instance(AgentTypeKey::parse("wolf"), InstanceId::from_seed(3));
        acc.set_health(8.0);
        acc.set_damage(4.0);
        acc.add_capability(
            BehaviorTrait::new("ethology:vanilla_breed", "minecraft:heart_of_the_sea", "t.breed", TraitCategory::Goal)
                .with_arg("Wolf"),
        );
        acc.add_current_state(BehaviorTrait::new("ethology:vanilla_sit", "minecraft:oak_stairs", "t.sit", TraitCategory::Goal));
        acc
    }

    #[test]
    fn test_envelope_preserves_result() {
        let acc = sample();
        let envelope = ScanResult::from(&acc).to_envelope(1234).expect("encodes");
        assert_eq!(envelope.timestamp_ms, 1234);

        let decoded: TraitAccumulator = ScanResult::from_envelope(&envelope).expect("decodes").into();
        assert_eq!(decoded, acc);
        assert_eq!(decoded.capabilities()[0].args, vec!["Wolf"]);
    }

    #[test]
    fn test_stats_are_fixed_width_little_endian() {
        let result = ScanResult {
            agent_type: AgentTypeKey::parse("a:b"),
            instance_id: None,
            stats: WireStats {
                health: 1.0,
                damage: 2.0,
                speed: 3.0,
                defense: 4.0,
            },
            capabilities: Vec::new(),
            current_states: Vec::new(),
        };
        let bytes = result.encode().expect("encodes");
        // u64 length + "a:b", then the None tag, then four f64s, then two empty u64-prefixed lists
        assert_eq!(bytes.len(), 8 + 3 + 1 + 4 * 8 + 8 + 8);
        assert_eq!(&bytes[12..20], &1.0f64.to_le_bytes());
    }

    #[test]
    fn test_decode_reapplies_dedup() {
        let t = BehaviorTrait::new("ethology:x", "minecraft:stone", "t.x", TraitCategory::Stat);
        let result = ScanResult {
            agent_type: AgentTypeKey::parse("cow"),
            instance_id: None,
            stats: AgentStats::default().into(),
            capabilities: vec![t.clone(), t],
            current_states: Vec::new(),
        };
        let acc: TraitAccumulator = result.into();
        assert_eq!(acc.capabilities().len(), 1);
    }

    #[test]
    fn test_truncated_payload_is_codec_error() {
        let bytes = ScanResult::from(&sample()).encode().expect("encodes");
        assert!(matches!(
            ScanResult::decode(&bytes[..bytes.len() / 2]),
            Err(EthologyError::Codec(_))
        ));
    }
}
