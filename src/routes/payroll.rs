use actix_web::web;

use crate::database::PayrollStore;
use crate::handlers::payroll;

pub fn configure<S: PayrollStore + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payroll")
            .route("/payslips", web::get().to(payroll::preview_payslips::<S>))
            .route(
                "/payslips/{employee_id}",
                web::get().to(payroll::get_payslip::<S>),
            )
            .route("/runs", web::post().to(payroll::create_run::<S>))
            .route("/runs", web::get().to(payroll::list_runs::<S>)),
    );
}
