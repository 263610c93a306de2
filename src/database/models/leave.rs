use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct LeaveType {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub is_paid: bool,
    pub max_days_per_year: i32,
}

/// Days allocated and consumed for one (employee, leave type, year).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct LeaveBalance {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub leave_type_id: Uuid,
    pub year: i32,
    pub allocated_days: f64,
    pub used_days: f64,
    pub remaining_days: f64,
}

impl LeaveBalance {
    pub fn new(employee_id: Uuid, leave_type_id: Uuid, year: i32, allocated_days: f64) -> Self {
        LeaveBalance {
            id: Uuid::new_v4(),
            employee_id,
            leave_type_id,
            year,
            allocated_days,
            used_days: 0.0,
            remaining_days: allocated_days,
        }
    }

    pub fn consume(&mut self, days: f64) {
        self.used_days += days;
        self.remaining_days = self.allocated_days - self.used_days;
    }
}

/// Days an approved leave takes from one balance row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeaveUsage {
    pub employee_id: Uuid,
    pub leave_type_id: Uuid,
    pub year: i32,
    pub days: f64,
}
