use edge_signout_core::contract::{AlbResponse, SignoutConfig, REDIRECT_URL_ENV_VAR};
use edge_signout_lambda::handlers::signout::handle_signout_event;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

async fn handle_request(event: LambdaEvent<Value>) -> Result<AlbResponse, Error> {
    // Resolved fresh on every invocation; an unset variable falls back to
    // the root path, a set-but-empty one flows through verbatim.
    let config = SignoutConfig::resolve(std::env::var(REDIRECT_URL_ENV_VAR).ok());
    Ok(handle_signout_event(event.payload, &config))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}
