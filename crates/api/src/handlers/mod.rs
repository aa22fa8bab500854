//! HTTP handlers, one module per resource.

pub mod interventions;
pub mod notifications;
