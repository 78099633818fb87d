use actix_web::{
    web::{self, Data},
    HttpResponse, Scope,
};

use crate::{api::types::HealthResponse, AppState};

pub fn scope() -> Scope {
    web::scope("/health").service(web::resource("").route(web::get().to(health)))
}

async fn health(state: Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        models_ready: state.extractor.is_ready(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
