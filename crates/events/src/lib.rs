//! Side-effect execution for the intervention lifecycle.
//!
//! - [`NotificationDispatcher`] resolves recipients and persists notification
//!   records, copying lifecycle notifications to email when configured.
//! - [`ComplianceReportGenerator`] records compliance reports for clients.
//! - [`OutboxProcessor`] drains the side-effect outbox in the background,
//!   retrying failed tasks with exponential backoff.
//! - [`delivery`] holds the external email channel.

pub mod compliance;
pub mod delivery;
pub mod dispatcher;
pub mod outbox;

pub use compliance::{ComplianceReport, ComplianceReportGenerator};
pub use delivery::email::{EmailConfig, EmailError, EmailTransport, OutgoingEmail, SmtpMailer};
pub use dispatcher::NotificationDispatcher;
pub use outbox::{OutboxConfig, OutboxProcessor, OutboxRunSummary};
