use actix_web::web;

use crate::database::PayrollStore;
use crate::handlers::admin;

pub fn configure<S: PayrollStore + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/holidays", web::get().to(admin::list_holidays::<S>))
            .route("/holidays", web::post().to(admin::create_holiday::<S>))
            .route("/holidays/{id}", web::delete().to(admin::delete_holiday::<S>))
            .route("/policy", web::get().to(admin::get_policy::<S>))
            .route("/policy", web::put().to(admin::update_policy::<S>)),
    );
}
