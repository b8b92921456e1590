pub mod confirmation;
pub mod failure_writer;
pub mod form_locator;
pub mod login;
pub mod navigator;

pub use confirmation::{ConfirmationCheck, Verdict};
pub use failure_writer::FailureWriter;
pub use form_locator::{FieldRole, FormFields, FormLocator};
pub use login::LoginService;
pub use navigator::JournalNavigator;
