//! Access capability gating
//!
//! Renderable units declare the `(verb, resource)` pairs they need. A
//! [`CapabilityService`] answers allow/deny per pair and an [`AccessGate`]
//! only reveals its child once every pair is allowed. Failures always deny.

pub mod gate;
pub mod policy;
pub mod requirement;
pub mod service;

pub use gate::{AccessGate, GateState};
pub use policy::StaticCapabilities;
pub use requirement::{CapabilityRequirement, CapabilityRequirements};
pub use service::{CapabilityService, HttpCapabilityService};
