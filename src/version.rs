// src/version.rs
// Compiled-in API version shared by the client and the mock server helpers

use crate::error::{Error, Result};

/// Controller API version this SDK speaks
pub const API_VERSION: &str = "2.3";

/// Platform version reported by the mock controller
pub const PLATFORM_VERSION: &str = "2.0.0";

/// Response header carrying the controller's API version
pub const API_VERSION_HEADER: &str = "DEIS_API_VERSION";

/// Response header carrying the controller's platform version
pub const PLATFORM_VERSION_HEADER: &str = "DEIS_PLATFORM_VERSION";

/// User agent sent with every SDK request
pub fn user_agent() -> String {
    format!("Deis Rust SDK V{API_VERSION}")
}

/// Check whether a controller speaking `server` can serve a client built for `client`.
///
/// Versions are `major.minor`. They are incompatible when either one is
/// malformed, the majors differ, or the server's minor is older than the
/// client's.
pub fn check_api_compatibility(server: &str, client: &str) -> Result<()> {
    let mismatch = || Error::ApiMismatch {
        client: client.to_string(),
        server: server.to_string(),
    };

    let (server_major, server_minor) = parse_version(server).ok_or_else(mismatch)?;
    let (client_major, client_minor) = parse_version(client).ok_or_else(mismatch)?;

    if server_major != client_major || server_minor < client_minor {
        return Err(mismatch());
    }
    Ok(())
}

fn parse_version(version: &str) -> Option<(u64, u64)> {
    let mut parts = version.trim().split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some((major, minor))
}
