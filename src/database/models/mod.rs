pub mod activity;
pub mod attendance;
pub mod employee;
pub mod holiday;
pub mod leave;
pub(crate) mod macros;
pub mod payroll;
pub mod request;

// Re-export all models for easy importing
pub use activity::*;
pub use attendance::*;
pub use employee::*;
pub use holiday::*;
pub use leave::*;
pub use payroll::*;
pub use request::*;
