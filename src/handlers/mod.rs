pub mod department;
pub mod employee;

use actix_web::error::JsonPayloadError;
use actix_web::{web, HttpRequest};

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::utils;
use crate::utils::jwt::Claims;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(malformed_body))
    .service(
        web::resource("/v1/department")
            .route(web::post().to(department::create_department))
            .route(web::get().to(department::get_departments)),
    )
    .service(
        web::resource("/v1/department/{department_id}")
            .route(web::get().to(department::get_department))
            .route(web::patch().to(department::update_department))
            .route(web::delete().to(department::delete_department)),
    )
    .service(
        web::resource("/v1/department/{department_id}/edit")
            .route(web::get().to(department::edit_department_form)),
    )
    .service(
        web::resource("/v1/department/{department_id}/manager")
            .route(web::delete().to(department::release_manager)),
    )
    .service(
        web::resource("/v1/employee/eligible-managers")
            .route(web::get().to(employee::get_eligible_managers)),
    );
}

fn malformed_body(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(err.to_string()).into()
}

/// Checks the bearer token and that its role may use the department console.
pub fn authorize(req: &HttpRequest, config: &AppConfig) -> Result<Claims, AppError> {
    let token = req.headers().get("Authorization")
        .and_then(|auth| auth.to_str().ok())
        .and_then(|auth| auth.split_whitespace().nth(1))
        .ok_or_else(|| AppError::Unauthorized("Missing token".to_string()))?;

    let claims = utils::jwt::validate_token(token, &config.jwt_secret)
        .map_err(|err| AppError::Unauthorized(err.to_string()))?;

    if !claims.may_administer_departments() {
        log::warn!("User {} with role {} denied console access", claims.sub, claims.role);
        return Err(AppError::Forbidden("Insufficient role".to_string()));
    }
    Ok(claims)
}
