/// Cookie names written by the load balancer's authentication action. Large
/// auth payloads are split across the numbered pair, so sign-out must clear
/// both.
pub const SESSION_COOKIE_NAMES: [&str; 2] =
    ["AWSELBAuthSessionCookie-0", "AWSELBAuthSessionCookie-1"];

/// Builds a `Set-Cookie` value that deletes `name`: empty value, immediate
/// expiry.
pub fn expiry_directive(name: &str) -> String {
    format!("{name}=; max-age=0")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_exact_expiry_directive() {
        assert_eq!(
            expiry_directive("AWSELBAuthSessionCookie-0"),
            "AWSELBAuthSessionCookie-0=; max-age=0"
        );
    }

    #[test]
    fn session_cookie_names_are_the_numbered_pair() {
        assert_eq!(
            SESSION_COOKIE_NAMES,
            ["AWSELBAuthSessionCookie-0", "AWSELBAuthSessionCookie-1"]
        );
    }
}
