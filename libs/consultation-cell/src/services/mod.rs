pub mod catalog;
pub mod editor;
pub mod gateway;
pub mod reconciler;

pub use editor::ScheduleEditor;
pub use gateway::{MeetingScheduleGateway, ScheduleGateway};
