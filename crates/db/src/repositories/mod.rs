//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that accept
//! a pool or connection as the first argument. [`PgStore`] adapts them to the
//! store traits in [`crate::store`].

pub mod intervention_repo;
pub mod notification_repo;
pub mod outbox_repo;
pub mod pg_store;
pub mod user_repo;

pub use intervention_repo::InterventionRepo;
pub use notification_repo::NotificationRepo;
pub use outbox_repo::OutboxRepo;
pub use pg_store::PgStore;
pub use user_repo::UserRepo;
