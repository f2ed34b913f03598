pub mod assignment;
pub mod auth_bundle;
pub mod course;
pub mod due_date;
pub mod job_sync;
pub mod source;
pub mod user;
pub mod user_assignment;

pub use assignment::Assignment;
pub use auth_bundle::AuthBundle;
pub use course::{Course, Enrollment};
pub use due_date::DueDate;
pub use job_sync::{JobSync, JobSyncGroup};
pub use source::Source;
pub use user::User;
pub use user_assignment::UserAssignment;
