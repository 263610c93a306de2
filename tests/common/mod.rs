#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveTime};
use fake::faker::name::en::Name;
use fake::Fake;
use uuid::Uuid;

use ph_payroll::database::models::{
    ContributionBracket, ContributionKind, Employee, EmploymentType, LeaveBalance, LeaveType,
    PunchProof, TaxBracket,
};
use ph_payroll::database::{MemoryStore, PayrollStore};
use ph_payroll::services::attendance::{PunchClock, PunchRequest};
use ph_payroll::services::auth::{create_token, Role};
use ph_payroll::{AttendancePolicy, Config};

pub const LEAVE_YEAR: i32 = 2025;
pub const ALLOCATED_LEAVE_DAYS: f64 = 5.0;

pub fn date(value: &str) -> NaiveDate {
    value.parse().expect("valid test date")
}

// Shared test context: a store seeded with one regular employee paid 17,600 a month
// (800 a day, 100 an hour, 125 an overtime hour) and a vacation leave type.
pub struct TestContext {
    pub store: MemoryStore,
    pub employee: Employee,
    pub vacation: LeaveType,
    pub policy: AttendancePolicy,
    pub user_id: Uuid,
    pub manager_id: Uuid,
}

impl TestContext {
    pub async fn new() -> Self {
        let store = MemoryStore::new();

        let name: String = Name().fake();
        let employee = Employee::new("E-001", name, EmploymentType::Regular, 17_600.0, None);
        store.save_employee(&employee).await.expect("seed employee");

        let vacation = LeaveType {
            id: Uuid::new_v4(),
            code: "VL".to_string(),
            name: "Vacation Leave".to_string(),
            is_paid: true,
            max_days_per_year: 15,
        };
        store.insert_leave_type(vacation.clone()).expect("seed leave type");
        store
            .save_leave_balance(&LeaveBalance::new(
                employee.id,
                vacation.id,
                LEAVE_YEAR,
                ALLOCATED_LEAVE_DAYS,
            ))
            .await
            .expect("seed leave balance");

        TestContext {
            store,
            employee,
            vacation,
            policy: AttendancePolicy::default(),
            user_id: Uuid::new_v4(),
            manager_id: Uuid::new_v4(),
        }
    }

    /// Flat statutory tables so payslip deductions are easy to read off.
    pub fn seed_deduction_tables(&self) {
        let effective = date("2025-01-01");
        for (kind, employee_share, employer_share) in [
            (ContributionKind::Sss, 500.0, 1_000.0),
            (ContributionKind::PhilHealth, 250.0, 250.0),
            (ContributionKind::PagIbig, 100.0, 100.0),
        ] {
            self.store
                .insert_contribution_bracket(ContributionBracket {
                    id: Uuid::new_v4(),
                    kind,
                    salary_range_min: 0.0,
                    salary_range_max: 1_000_000.0,
                    employee_share,
                    employer_share,
                    effective_date: effective,
                })
                .expect("seed contribution bracket");
        }

        for (min, max, fixed_tax, excess_over, percentage_rate) in [
            (0.0, 20_833.0, 0.0, 0.0, 0.0),
            (20_833.01, 1_000_000.0, 0.0, 20_833.0, 0.15),
        ] {
            self.store
                .insert_tax_bracket(TaxBracket {
                    id: Uuid::new_v4(),
                    salary_range_min: min,
                    salary_range_max: max,
                    fixed_tax,
                    excess_over,
                    percentage_rate,
                    effective_date: effective,
                })
                .expect("seed tax bracket");
        }
    }

    pub fn punch(&self, work_date: &str, time: &str) -> PunchRequest {
        self.punch_with_proof(work_date, time, PunchProof::default())
    }

    pub fn punch_with_proof(&self, work_date: &str, time: &str, proof: PunchProof) -> PunchRequest {
        PunchRequest {
            employee_id: self.employee.id,
            actor_user_id: self.user_id,
            clock: clock(work_date, time),
            proof,
        }
    }

    pub fn employee_token(&self) -> String {
        token(self.user_id, Some(self.employee.id), Role::Employee)
    }

    pub fn manager_token(&self) -> String {
        token(self.manager_id, None, Role::Manager)
    }
}

pub fn clock(work_date: &str, time: &str) -> PunchClock {
    let day = date(work_date);
    let at = NaiveTime::parse_from_str(time, "%H:%M").expect("valid test time");

    PunchClock {
        work_date: day,
        time: time.to_string(),
        instant: day.and_time(at).and_utc(),
    }
}

pub fn token(user_id: Uuid, employee_id: Option<Uuid>, role: Role) -> String {
    create_token(
        &Config::test_config().jwt_secret,
        user_id,
        employee_id,
        role,
        Duration::hours(1),
    )
    .expect("sign test token")
}
