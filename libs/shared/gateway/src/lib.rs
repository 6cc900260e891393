pub mod meeting;
pub mod wire;

pub use meeting::{GuardianSchedule, MeetingApiClient};
