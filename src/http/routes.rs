use crate::http;
use actix_web::web;

/// Mount every HTTP sub-module under `/api`.
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(http::extract::configure).service(
        web::scope("/api")
            .configure(http::campaigns::init_routes)
            .configure(http::characters::init_routes)
            .configure(http::pcs::init_routes)
            .configure(http::dice::init_routes)
            .configure(http::health::init_routes),
    );
}
