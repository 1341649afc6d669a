use crate::contract::{
    AlbResponse, MultiValueHeaders, SignoutConfig, ALLOW_METHODS_HEADER, LOCATION_HEADER,
    SET_COOKIE_HEADER,
};
use crate::cookie::{expiry_directive, SESSION_COOKIE_NAMES};

pub const SIGNOUT_STATUS_CODE: u16 = 302;

/// Builds the sign-out redirect: expire both session cookies and send the
/// client to the resolved destination.
///
/// Pure function of the config. The redirect target flows into `Location`
/// unchanged, with no validation or encoding applied.
pub fn signout_response(config: &SignoutConfig) -> AlbResponse {
    let mut headers = MultiValueHeaders::new();
    headers.insert(
        SET_COOKIE_HEADER.to_string(),
        SESSION_COOKIE_NAMES
            .iter()
            .map(|name| expiry_directive(name))
            .collect(),
    );
    headers.insert(ALLOW_METHODS_HEADER.to_string(), vec!["GET".to_string()]);
    headers.insert(
        LOCATION_HEADER.to_string(),
        vec![config.redirect_target.clone()],
    );

    AlbResponse {
        status_code: SIGNOUT_STATUS_CODE,
        multi_value_headers: headers,
    }
}
