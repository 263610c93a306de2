pub mod admin;
pub mod attendance;
pub mod payroll;
pub mod requests;
pub mod shared;
