use actix_web::web;

use crate::database::PayrollStore;

pub mod admin;
pub mod attendance;
pub mod payroll;
pub mod requests;

pub fn configure<S: PayrollStore + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(attendance::configure::<S>)
            .configure(requests::configure::<S>)
            .configure(payroll::configure::<S>)
            .configure(admin::configure::<S>),
    );
}
