//! Mock infrastructure for testing external services
//!
//! Relays are the only external dependency; each mock relay is a wiremock
//! server speaking either the path-prefix or the query-parameter contract.

pub mod relay;

pub use relay::*;
