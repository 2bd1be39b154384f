pub mod attendance;
pub mod class;
pub mod class_student;
pub mod user;
