pub mod academic_log;
pub mod behavior_log;
pub mod category;
pub mod organization;
pub mod student;
