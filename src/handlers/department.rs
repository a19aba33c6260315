use actix_web::{web, HttpRequest, HttpResponse};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::config::AppConfig;
use crate::coordinator::AssignmentCoordinator;
use crate::errors::AppError;
use crate::handlers::authorize;
use crate::models::department::{DepartmentDraft, DepartmentId};
use crate::models::employee::EmployeeId;
use crate::utils::validation::validate_payload;

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewDepartment {
    #[validate(length(min = 1, max = 100))]
    name: String,
    #[validate(length(max = 500))]
    description: Option<String>,
    establishment_date: NaiveDate,
    manager_id: Option<EmployeeId>,
}

/// Submitted edit form. The whole form is sent back, so a missing or null
/// `managerId` means the manager select was cleared.
#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentUpdate {
    edit_token: Uuid,
    #[validate(length(min = 1, max = 100))]
    name: String,
    #[validate(length(max = 500))]
    description: Option<String>,
    establishment_date: NaiveDate,
    manager_id: Option<EmployeeId>,
}

fn parse_department_id(raw: String) -> Result<DepartmentId, AppError> {
    raw.parse::<DepartmentId>()
        .map_err(|_| AppError::BadRequest("Invalid department ID".to_string()))
}

pub async fn create_department(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    coordinator: web::Data<AssignmentCoordinator>,
    new_department: web::Json<NewDepartment>,
) -> Result<HttpResponse, actix_web::Error> {
    authorize(&req, &config)?;
    validate_payload(&*new_department)?;

    let NewDepartment {
        name,
        description,
        establishment_date,
        manager_id,
    } = new_department.into_inner();
    let draft = DepartmentDraft {
        name,
        description,
        establishment_date,
    };

    let department = coordinator
        .assign_on_create(draft, manager_id)
        .await
        .map_err(AppError::from)?;

    Ok(HttpResponse::Created().json(department))
}

pub async fn get_departments(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    coordinator: web::Data<AssignmentCoordinator>,
) -> Result<HttpResponse, actix_web::Error> {
    authorize(&req, &config)?;

    let departments = coordinator.list().await.map_err(AppError::from)?;
    Ok(HttpResponse::Ok().json(departments))
}

pub async fn get_department(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    coordinator: web::Data<AssignmentCoordinator>,
    department_id: web::Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    authorize(&req, &config)?;
    let department_id = parse_department_id(department_id.into_inner())?;

    let department = coordinator.details(department_id).await.map_err(AppError::from)?;
    Ok(HttpResponse::Ok().json(department))
}

pub async fn edit_department_form(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    coordinator: web::Data<AssignmentCoordinator>,
    department_id: web::Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    authorize(&req, &config)?;
    let department_id = parse_department_id(department_id.into_inner())?;

    let form = coordinator.prepare_edit(department_id).await.map_err(AppError::from)?;
    Ok(HttpResponse::Ok().json(form))
}

pub async fn update_department(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    coordinator: web::Data<AssignmentCoordinator>,
    department_id: web::Path<String>,
    updates: web::Json<DepartmentUpdate>,
) -> Result<HttpResponse, actix_web::Error> {
    authorize(&req, &config)?;
    validate_payload(&*updates)?;
    let department_id = parse_department_id(department_id.into_inner())?;

    let DepartmentUpdate {
        edit_token,
        name,
        description,
        establishment_date,
        manager_id,
    } = updates.into_inner();
    let draft = DepartmentDraft {
        name,
        description,
        establishment_date,
    };

    let department = coordinator
        .apply_edit(department_id, edit_token, draft, manager_id)
        .await
        .map_err(AppError::from)?;

    Ok(HttpResponse::Ok().json(department))
}

pub async fn release_manager(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    coordinator: web::Data<AssignmentCoordinator>,
    department_id: web::Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    authorize(&req, &config)?;
    let department_id = parse_department_id(department_id.into_inner())?;

    let department = coordinator.release(department_id).await.map_err(AppError::from)?;
    Ok(HttpResponse::Ok().json(department))
}

pub async fn delete_department(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    coordinator: web::Data<AssignmentCoordinator>,
    department_id: web::Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    authorize(&req, &config)?;
    let department_id = parse_department_id(department_id.into_inner())?;

    coordinator.delete(department_id).await.map_err(AppError::from)?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Department deleted successfully",
    })))
}
