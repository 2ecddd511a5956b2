//! Per-target HTTP client construction.

use reqwest::{redirect, Client};

use crate::target::Target;

/// Redirect hops to chase when following is enabled.
const MAX_REDIRECTS: usize = 10;

/// Build a client configured from the target's options.
///
/// Clients are created once per target and shared by that target's workers;
/// they are never shared across targets.
pub(crate) fn create_client(target: &Target) -> reqwest::Result<Client> {
    let options = &target.options;

    let mut builder = Client::builder()
        .danger_accept_invalid_certs(!options.enforce_ssl)
        .gzip(options.compress)
        .redirect(if options.follow_redirects {
            redirect::Policy::limited(MAX_REDIRECTS)
        } else {
            redirect::Policy::none()
        });

    if !options.keep_alive {
        // An empty idle pool forces a fresh connection per request.
        builder = builder.pool_max_idle_per_host(0);
    }
    if options.no_http2 {
        builder = builder.http1_only();
    }
    if let Some(timeout) = options.parsed_timeout() {
        builder = builder.timeout(timeout);
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::Target;

    #[test]
    fn test_create_client_default_target() {
        assert!(create_client(&Target::default()).is_ok());
    }

    #[test]
    fn test_create_client_option_combinations() {
        let mut target = Target::default();
        target.options.enforce_ssl = true;
        target.options.compress = true;
        target.options.keep_alive = true;
        target.options.follow_redirects = false;
        target.options.no_http2 = true;
        assert!(create_client(&target).is_ok());
    }

    #[test]
    fn test_create_client_without_timeout() {
        let mut target = Target::default();
        target.options.timeout = String::new();
        assert!(create_client(&target).is_ok());
    }
}
