use actix_web::{web, HttpRequest, HttpResponse};

use crate::config::AppConfig;
use crate::coordinator::AssignmentCoordinator;
use crate::errors::AppError;
use crate::handlers::authorize;
use crate::models::department::ManagerSummary;

/// Options for the department manager select list.
pub async fn get_eligible_managers(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    coordinator: web::Data<AssignmentCoordinator>,
) -> Result<HttpResponse, actix_web::Error> {
    authorize(&req, &config)?;

    let managers = coordinator
        .eligible_managers()
        .await
        .map_err(AppError::from)?;

    let options: Vec<ManagerSummary> = managers.iter().map(ManagerSummary::from).collect();
    Ok(HttpResponse::Ok().json(options))
}
