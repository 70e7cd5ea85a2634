//! Survey and response services.
//!
//! Both services take the store and the clock by injection so that tests can
//! run each case against its own in-memory store and move time across the
//! 24-hour edit window.

mod clock;
mod error;
mod responses;
mod surveys;

#[cfg(any(test, feature = "test-utils"))]
pub use clock::ManualClock;
pub use clock::{Clock, SystemClock};
pub use error::{NotFoundKind, ServiceError};
pub use responses::ResponseService;
pub use surveys::SurveyService;
