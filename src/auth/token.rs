//! Refresh and access token models plus the redacting secret wrapper.

pub mod access;
pub mod refresh;
pub mod secret;
