use edge_signout_core::contract::{AlbResponse, SignoutConfig};
use edge_signout_core::signout::signout_response;
use serde_json::Value;

/// Handles a sign-out request routed here by the load balancer listener
/// rule.
///
/// The inbound event carries request headers and query parameters, none of
/// which influence the response: sign-out depends only on the resolved
/// redirect config.
pub fn handle_signout_event(_event: Value, config: &SignoutConfig) -> AlbResponse {
    signout_response(config)
}
