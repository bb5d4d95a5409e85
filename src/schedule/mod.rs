/// Cron-driven birthday announcements and role updates
mod birthday_tasks;
mod manager;
mod types;

pub use manager::start_schedule_manager;
pub use types::{Schedule, ScheduleType};
