//! Application configuration and constants
//!
//! Central naming values used across the application. Streaming constants
//! (buffer sizes, timeouts) live next to the code that uses them.

/// The application name
pub const APP_NAME: &str = "Pocket Radio";

/// Application version (synchronized with Cargo.toml)
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// `User-Agent` sent with HTTP stream requests.
pub const USER_AGENT: &str = concat!("PocketRadio/", env!("CARGO_PKG_VERSION"));
