pub mod academic_logs;
pub mod behavior_logs;
pub mod categories;
pub mod health;
pub mod organizations;
pub mod students;
