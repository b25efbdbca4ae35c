//! Relay failover core
//!
//! Keeps the prioritized relay list, probes relay liveness, selects the best
//! live relay and rewrites requests into each relay's wire contract.

pub mod descriptor;
pub mod monitor;
pub mod probe;
pub mod registry;
pub mod selector;
pub mod transform;

pub use descriptor::{RelayDescriptor, RelayKind, UpstreamApi};
pub use monitor::HealthMonitor;
pub use probe::{HealthCheck, HttpHealthProbe, ProbeFailure, ProbePlan};
pub use registry::RelayRegistry;
pub use selector::RelaySelector;
pub use transform::{CallKind, RelayRequest, RelayTransform, RequestOptions, RequestTransformer};
