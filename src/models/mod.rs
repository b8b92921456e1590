pub mod date_range;
pub mod outcome;
pub mod profile;
pub mod report;
pub mod task;

pub use date_range::{DateFormat, DateRange};
pub use outcome::{FailureReason, OutcomeStatus, SubmissionOutcome};
pub use profile::{
    ConfirmationProfile, FormProfile, LoginProfile, NavigationProfile, Pick, PortalProfile,
    Strategy,
};
pub use report::{RunReport, RunStatus};
pub use task::{
    dedup_identifiers, materialize_tasks, Credentials, JournalContent, SchoolId, SubmissionTask,
};
