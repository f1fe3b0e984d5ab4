pub mod admin;
pub mod applications;
pub mod core;
pub mod recent_grades;
pub mod reports;
pub mod scholarships;
pub mod settings;
pub mod students;
