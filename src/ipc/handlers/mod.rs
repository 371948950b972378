pub mod attendance;
pub mod classes;
pub mod core;
pub mod export;
pub mod homework;
pub mod notices;
pub mod session;
pub mod students;
pub mod subjects;
pub mod teacher;
