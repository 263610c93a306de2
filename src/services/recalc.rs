use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::database::models::{Action, AttendanceFilter, Employee, EntityType};
use crate::database::PayrollStore;
use crate::error::AppError;
use crate::services::activity_logger::ActivityLogger;
use crate::services::attendance::recompute_record;
use crate::services::holiday_calendar::HolidayCalendar;
use crate::services::policy::AttendancePolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecalcRequest {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub employee_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecalcReport {
    pub scanned: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Reprices every complete, non-leave record in the range.
///
/// Rows are saved one at a time without a global lock; a row that fails to save
/// is counted and the pass continues.
pub async fn recalculate<S: PayrollStore>(
    store: &S,
    policy: &AttendancePolicy,
    actor_user_id: Uuid,
    request: &RecalcRequest,
) -> Result<RecalcReport, AppError> {
    if request.from > request.to {
        return Err(AppError::BadRequest("from must not be after to".to_string()));
    }

    let records = store
        .list_attendance(&AttendanceFilter {
            employee_id: request.employee_id,
            from: Some(request.from),
            to: Some(request.to),
        })
        .await?;
    let calendar = HolidayCalendar::load_or_empty(store).await;
    let mut employees: HashMap<Uuid, Option<Employee>> = HashMap::new();
    let mut report = RecalcReport::default();

    for mut record in records {
        report.scanned += 1;
        if record.is_leave() || record.time_in.is_none() || record.time_out.is_none() {
            report.skipped += 1;
            continue;
        }

        let employee = match employees.get(&record.employee_id) {
            Some(cached) => cached.clone(),
            None => {
                let loaded = store.get_employee(record.employee_id).await?;
                employees.insert(record.employee_id, loaded.clone());
                loaded
            }
        };
        let Some(employee) = employee else {
            log::warn!("Attendance {} belongs to unknown employee {}", record.id, record.employee_id);
            report.failed += 1;
            continue;
        };

        let before = record.pay;
        recompute_record(&mut record, &employee, &calendar, policy);
        record.updated_at = Utc::now();

        match store.upsert_attendance(&record).await {
            Ok(()) => {
                if record.pay != before {
                    log::debug!("Recalculated {} on {}", employee.code, record.work_date);
                }
                report.updated += 1;
            }
            Err(e) => {
                log::error!("Failed to save recalculated attendance {}: {}", record.id, e);
                report.failed += 1;
            }
        }
    }

    log::info!(
        "Recalculated {} to {}: scanned {}, updated {}, skipped {}, failed {}",
        request.from,
        request.to,
        report.scanned,
        report.updated,
        report.skipped,
        report.failed
    );
    ActivityLogger::new(store)
        .log_activity(
            Some(actor_user_id),
            EntityType::ATTENDANCE,
            request.employee_id.unwrap_or(Uuid::nil()),
            Action::RECALCULATED,
            format!("Attendance recalculated for {} to {}", request.from, request.to),
            Some(json!({ "request": request, "report": report })),
        )
        .await
        .unwrap_or_else(|e| log::warn!("Failed to log recalculation activity: {}", e));

    Ok(report)
}
