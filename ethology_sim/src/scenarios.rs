//! End-to-end scenarios for the harness.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// Many requesters, one archetype: exactly one computation
    Coalescing,

    /// One requester floods the coordinator past its token bucket
    RateLimitFlood,

    /// Instantiation fails once, nothing is cached, the next request succeeds
    FailedArchetypeRetry,

    /// Rapid selections on the client yield one request for the last one
    DebounceBurst,

    /// Targeted scans reuse fresh server results, then go stale
    InstanceFreshness,

    /// A modded unit graph with a reference cycle
    CyclicGraph,

    /// Scan every known kind and check its ecological classification
    Census,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Coalescing,
            ScenarioId::RateLimitFlood,
            ScenarioId::FailedArchetypeRetry,
            ScenarioId::DebounceBurst,
            ScenarioId::InstanceFreshness,
            ScenarioId::CyclicGraph,
            ScenarioId::Census,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Coalescing => "coalescing",
            ScenarioId::RateLimitFlood => "rate_limit_flood",
            ScenarioId::FailedArchetypeRetry => "failed_archetype_retry",
            ScenarioId::DebounceBurst => "debounce_burst",
            ScenarioId::InstanceFreshness => "instance_freshness",
            ScenarioId::CyclicGraph => "cyclic_graph",
            ScenarioId::Census => "census",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Coalescing => "32 requesters ask for the same archetype in shuffled order",
            ScenarioId::RateLimitFlood => "One requester sends 3x its bucket capacity at once",
            ScenarioId::FailedArchetypeRetry => "Injected instantiation failure, then a clean retry",
            ScenarioId::DebounceBurst => "Client clicks through 10 kinds inside the quiet interval",
            ScenarioId::InstanceFreshness => "Targeted scans inside and outside the freshness window",
            ScenarioId::CyclicGraph => "Pack goals referencing each other must terminate",
            ScenarioId::Census => "Every kind scanned; one hostility trait each where summonable",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "coalescing" | "coalesce" => Ok(ScenarioId::Coalescing),
            "rate_limit_flood" | "ratelimit" | "flood" => Ok(ScenarioId::RateLimitFlood),
            "failed_archetype_retry" | "retry" => Ok(ScenarioId::FailedArchetypeRetry),
            "debounce_burst" | "debounce" => Ok(ScenarioId::DebounceBurst),
            "instance_freshness" | "freshness" => Ok(ScenarioId::InstanceFreshness),
            "cyclic_graph" | "cycle" => Ok(ScenarioId::CyclicGraph),
            "census" => Ok(ScenarioId::Census),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_parse_back() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
        }
        assert!("split_brain".parse::<ScenarioId>().is_err());
    }
}
