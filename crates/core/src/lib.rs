//! Domain rules for the intervention lifecycle.
//!
//! This crate holds everything that can be decided without I/O:
//!
//! - [`intervention`]: field enumerations, status transition table, photo cap.
//! - [`access`]: the AccessGuard policy table and list scoping.
//! - [`change`]: the ChangeDetector and the [`change::SideEffect`] it emits.
//! - [`notification`]: notification kinds and recipient selection.
//! - [`validation`]: conversion of DTO validation failures into [`error::CoreError`].

pub mod access;
pub mod change;
pub mod error;
pub mod intervention;
pub mod notification;
pub mod roles;
pub mod types;
pub mod validation;
