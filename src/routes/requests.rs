use actix_web::web;

use crate::database::PayrollStore;
use crate::handlers::requests;

pub fn configure<S: PayrollStore + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/requests")
            .route("", web::get().to(requests::list_requests::<S>))
            .route("/leave", web::post().to(requests::submit_leave::<S>))
            .route(
                "/time-correction",
                web::post().to(requests::submit_time_correction::<S>),
            )
            .route("/overtime", web::post().to(requests::submit_overtime::<S>))
            .route("/{id}", web::get().to(requests::get_request::<S>))
            .route("/{id}/approve", web::post().to(requests::approve_request::<S>))
            .route("/{id}/reject", web::post().to(requests::reject_request::<S>))
            .route("/{id}/cancel", web::post().to(requests::cancel_request::<S>)),
    );
}
