//! Built-in report providers.

mod logged_in;

pub use logged_in::{LOGGED_IN_REPORT, LoggedInProvider};
