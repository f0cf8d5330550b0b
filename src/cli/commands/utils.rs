//! Shared utilities for CLI commands

use miette::Result;
use tracing::debug;

use crate::cli::GlobalOpts;
use crate::core::HttpClient;

/// Resolve connection settings and build the API client
///
/// No request is made here; credentials are only checked by the server on
/// the first call.
pub fn connect(global: &GlobalOpts) -> Result<HttpClient> {
    let config = global
        .overrides()
        .resolve()
        .map_err(|e| miette::miette!("{}", e))?;
    debug!(url = %config.url, email = %config.email, verify = config.verify, "Connecting");
    HttpClient::new(&config).map_err(|e| miette::miette!("{}", e))
}
