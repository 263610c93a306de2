use actix_web::web;

use crate::database::PayrollStore;
use crate::handlers::attendance;

pub fn configure<S: PayrollStore + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/attendance")
            .route("/time-in", web::post().to(attendance::time_in::<S>))
            .route("/time-out", web::post().to(attendance::time_out::<S>))
            .route("/me", web::get().to(attendance::my_attendance::<S>))
            .route("/me/summary", web::get().to(attendance::my_summary::<S>))
            .route("/recalc", web::post().to(attendance::recalculate::<S>))
            .route(
                "/{employee_id}/{work_date}",
                web::put().to(attendance::edit_attendance::<S>),
            ),
    );
}
