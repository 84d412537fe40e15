use actix_web::{error, web, HttpRequest};

use super::handlers;
use crate::error::ClinicError;

// Extractor rejections answer with the same JSON error body as the handlers.
fn rejected(what: &str, err: impl std::fmt::Display) -> error::Error {
    ClinicError::validation(format!("Invalid {}: {}", what, err)).into()
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _: &HttpRequest| rejected("request body", err)),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _: &HttpRequest| rejected("query string", err)),
    )
    .app_data(
        web::PathConfig::default().error_handler(|err, _: &HttpRequest| rejected("path", err)),
    )
    .service(
        web::scope("/patients")
            .route("", web::get().to(handlers::list_patients))
            .route("", web::post().to(handlers::create_patient))
            .route("/{pid}", web::put().to(handlers::update_patient))
            .route("/{pid}", web::delete().to(handlers::delete_patient)),
    )
    .service(
        web::scope("/appointments")
            .route("", web::get().to(handlers::list_appointments))
            .route("", web::post().to(handlers::book_appointment))
            .route("/{id}", web::delete().to(handlers::delete_appointment)),
    )
    .service(
        web::scope("/bills")
            .route("", web::get().to(handlers::list_bills))
            .route("", web::post().to(handlers::add_bill))
            .route("/{id}", web::get().to(handlers::get_bill))
            .route("/{id}/export", web::get().to(handlers::export_bill)),
    )
    .route("/roster", web::get().to(handlers::roster));
}
