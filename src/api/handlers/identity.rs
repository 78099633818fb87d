use actix_web::{
    web::{self, Data, Json, Path},
    HttpResponse, Scope,
};
use tracing::{error, info};

use crate::{
    api::types::{BindingStatusResponse, EnrollRequest, VerifyRequest},
    core::face::CapturedFrame,
    utils::error::{FailureClass, IdentityError},
    AppState,
};

pub fn scope() -> Scope {
    web::scope("/identity")
        .service(
            web::resource("/enroll")
                .route(web::post().to(enroll))
        )
        .service(
            web::resource("/verify")
                .route(web::post().to(verify))
        )
        .service(
            web::resource("/{wallet}/binding")
                .route(web::get().to(binding_status))
        )
}

async fn enroll(
    state: Data<AppState>,
    request: Json<EnrollRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    info!(wallet = %request.wallet_address, "Received enrollment request");

    let frame = CapturedFrame::from_bytes(&request.face_image).map_err(to_http_error)?;

    let mut enrollment = state.enrollment();
    let outcome = enrollment
        .enroll(&request.wallet_address, &frame)
        .await
        .map_err(|e| {
            error!(wallet = %request.wallet_address, "Enrollment failed: {}", e);
            to_http_error(e)
        })?;

    info!(
        wallet = %request.wallet_address,
        partial = outcome.is_partial(),
        "Enrollment finished"
    );
    Ok(HttpResponse::Created().json(outcome))
}

async fn verify(
    state: Data<AppState>,
    request: Json<VerifyRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    info!(wallet = %request.wallet_address, "Received verification request");

    let frame = CapturedFrame::from_bytes(&request.face_image).map_err(to_http_error)?;

    let outcome = state
        .verifier
        .verify(&request.wallet_address, &frame)
        .await
        .map_err(|e| {
            error!(wallet = %request.wallet_address, "Verification failed: {}", e);
            to_http_error(e)
        })?;

    info!(
        wallet = %request.wallet_address,
        combined = outcome.combined,
        "Verification finished"
    );
    Ok(HttpResponse::Ok().json(outcome))
}

async fn binding_status(
    state: Data<AppState>,
    wallet: Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    let binding = state.binder.binding(&wallet).await.map_err(|e| {
        error!(wallet = %wallet, "Binding lookup failed: {}", e);
        to_http_error(e)
    })?;

    Ok(HttpResponse::Ok().json(BindingStatusResponse::from_binding(&wallet, binding)))
}

fn to_http_error(e: IdentityError) -> actix_web::Error {
    match e.class() {
        FailureClass::Retry => actix_web::error::ErrorBadRequest(e),
        FailureClass::Support => actix_web::error::ErrorServiceUnavailable(e),
        FailureClass::Rejected => actix_web::error::ErrorConflict(e),
    }
}
