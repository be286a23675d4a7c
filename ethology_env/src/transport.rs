//! Transport abstraction between scan requesters and the scan coordinator.

use crate::error::EnvError;
use crate::types::{RequesterId, ResultEnvelope, ScanRequest};

/// Client side of the scan protocol: ships requests to the coordinator.
///
/// # Implementations
///
/// - **Production**: wraps the host's packet channel
/// - **Simulation**: channel-based, routed by the harness
///
/// # Packet Flow
///
/// ```text
/// Client                     Transport                 Coordinator
///   |                           |                          |
///   |-- send_request(req) ----->|------------------------->|
///   |                           |                          |-- analyze
///   |<--------------------------|<-- on_scan_result(env) --|
/// ```
pub trait RequestSender: Send + Sync + 'static {
    /// Queues a request for delivery.
    ///
    /// # Returns
    /// * `Ok(())` - Request queued for delivery
    /// * `Err(EnvError::TransportError)` - Immediate send failure
    ///
    /// Success does not guarantee a response: the coordinator may drop
    /// rate-limited requests and never answers failed analyses.
    fn send_request(&self, request: ScanRequest) -> Result<(), EnvError>;
}

/// Server side of the scan protocol: delivers results to requesters.
///
/// Called on the coordinator's authoritative task, so implementations must
/// not block.
pub trait ResultSink: Send + Sync + 'static {
    /// Delivers one encoded result to the original requester.
    fn on_scan_result(&self, requester: RequesterId, envelope: ResultEnvelope) -> Result<(), EnvError>;
}
