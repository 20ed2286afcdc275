use crate::employee::model::{Compensation, Employee, ReportingStructure};
use crate::employee::repository::RepositoryError;
use crate::{AppState, ErrorResponse, ValidationErrors};
use actix_web::{error, http::header, web, HttpRequest, HttpResponse, Responder};
use rust_decimal::Decimal;

const EMPLOYEE_ROUTE: &str = "employee_by_id";
const COMPENSATION_ROUTE: &str = "employee_compensation";

fn internal_error(message: &str, err: RepositoryError) -> HttpResponse {
    log::error!("{}: {}", message, err);
    HttpResponse::InternalServerError().json(ErrorResponse::internal_error(message))
}

fn employee_id_error(message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(ValidationErrors::single("EmployeeId", message))
}

/// 201 with a `Location` pointing at the named route for `id`.
fn created_at<T: serde::Serialize>(req: &HttpRequest, route: &str, id: &str, body: &T) -> HttpResponse {
    let mut response = HttpResponse::Created();
    match req.url_for(route, [id]) {
        Ok(url) => {
            response.insert_header((header::LOCATION, url.to_string()));
        }
        Err(e) => log::warn!("Could not build location for route '{}': {:?}", route, e),
    }
    response.json(body)
}

#[utoipa::path(
    post,
    path = "/api/employee",
    tag = "Employee",
    request_body = Employee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Malformed request body", body = ErrorResponse)
    )
)]
pub async fn create_employee(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<Employee>,
) -> impl Responder {
    let employee = body.into_inner();
    log::debug!(
        "Received employee create request for '{} {}'",
        employee.first_name,
        employee.last_name
    );

    match state.employee_service().create(employee).await {
        Ok(created) => created_at(&req, EMPLOYEE_ROUTE, &created.employee_id, &created),
        Err(e) => internal_error("Failed to create employee", e),
    }
}

#[utoipa::path(
    get,
    path = "/api/employee/{id}",
    tag = "Employee",
    params(
        ("id" = String, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found", body = ErrorResponse)
    )
)]
pub async fn get_employee_by_id(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let id = path.into_inner();
    log::debug!("Received employee get request for '{}'", id);

    match state.employee_service().get_by_id(&id).await {
        Ok(Some(employee)) => HttpResponse::Ok().json(employee),
        Ok(None) => HttpResponse::NotFound().json(ErrorResponse::not_found("Employee not found")),
        Err(e) => internal_error("Failed to retrieve employee", e),
    }
}

#[utoipa::path(
    put,
    path = "/api/employee/{id}",
    tag = "Employee",
    params(
        ("id" = String, Path, description = "Employee ID")
    ),
    request_body = Employee,
    responses(
        (status = 200, description = "Employee replaced", body = Employee),
        (status = 404, description = "Employee not found", body = ErrorResponse)
    )
)]
pub async fn update_employee(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<Employee>,
) -> impl Responder {
    let id = path.into_inner();
    log::debug!("Received employee update request for '{}'", id);

    let service = state.employee_service();
    let existing = match service.get_by_id(&id).await {
        Ok(Some(employee)) => employee,
        Ok(None) => {
            return HttpResponse::NotFound().json(ErrorResponse::not_found("Employee not found"))
        }
        Err(e) => return internal_error("Failed to retrieve employee", e),
    };

    let mut employee = body.into_inner();
    employee.employee_id = id;

    match service.update(employee).await {
        Ok(mut updated) => {
            updated.compensation = existing.compensation;
            HttpResponse::Ok().json(updated)
        }
        Err(RepositoryError::EmployeeNotFound(_)) => {
            HttpResponse::NotFound().json(ErrorResponse::not_found("Employee not found"))
        }
        Err(e) => internal_error("Failed to update employee", e),
    }
}

#[utoipa::path(
    get,
    path = "/api/employee/{id}/reporting-structure",
    tag = "Employee",
    params(
        ("id" = String, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee with the number of direct and indirect reports", body = ReportingStructure),
        (status = 404, description = "Employee not found", body = ErrorResponse)
    )
)]
pub async fn get_reporting_structure(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let id = path.into_inner();
    log::debug!("Received employee reporting structure get request for '{}'", id);

    match state.employee_service().get_reporting_structure(&id).await {
        Ok(Some(structure)) => HttpResponse::Ok().json(structure),
        Ok(None) => HttpResponse::NotFound().json(ErrorResponse::not_found("Employee not found")),
        Err(e) => internal_error("Failed to retrieve reporting structure", e),
    }
}

#[utoipa::path(
    post,
    path = "/api/employee/compensation",
    tag = "Compensation",
    request_body = Compensation,
    responses(
        (status = 201, description = "Compensation created", body = Compensation),
        (status = 400, description = "Validation failed, keyed by field", body = ValidationErrors)
    )
)]
pub async fn create_compensation(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<Option<Compensation>>,
) -> impl Responder {
    let Some(compensation) = body.into_inner() else {
        return HttpResponse::BadRequest()
            .json(ErrorResponse::bad_request("Compensation is required."));
    };

    // Checks run in this order and only the first failure is reported.
    if compensation.employee_id.is_empty() {
        return employee_id_error("EmployeeId is required.".to_string());
    }

    let employee_id = compensation.employee_id.clone();
    log::debug!(
        "Received compensation create request for employee '{}'",
        employee_id
    );

    let service = state.employee_service();

    match service.employee_exists(&employee_id).await {
        Ok(true) => {}
        Ok(false) => {
            return employee_id_error(format!("Employee '{}' does not exist.", employee_id))
        }
        Err(e) => return internal_error("Failed to validate compensation", e),
    }

    match service.compensation_exists(&employee_id).await {
        Ok(false) => {}
        Ok(true) => {
            return employee_id_error(format!(
                "Compensation for employee '{}' already exists.",
                employee_id
            ))
        }
        Err(e) => return internal_error("Failed to validate compensation", e),
    }

    if compensation.salary < Decimal::ZERO {
        return HttpResponse::BadRequest().json(ValidationErrors::single(
            "Salary",
            "Salary must not be negative.",
        ));
    }

    match service.create_compensation(Some(compensation)).await {
        Ok(Some(created)) => created_at(&req, COMPENSATION_ROUTE, &created.employee_id, &created),
        Ok(None) => HttpResponse::BadRequest()
            .json(ErrorResponse::bad_request("Compensation is required.")),
        // Lost a race with a concurrent insert for the same employee.
        Err(RepositoryError::CompensationExists(id)) => employee_id_error(format!(
            "Compensation for employee '{}' already exists.",
            id
        )),
        Err(RepositoryError::EmployeeNotFound(id)) => {
            employee_id_error(format!("Employee '{}' does not exist.", id))
        }
        Err(e) => internal_error("Failed to create compensation", e),
    }
}

#[utoipa::path(
    get,
    path = "/api/employee/{id}/compensation",
    tag = "Compensation",
    params(
        ("id" = String, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Compensation found", body = Compensation),
        (status = 404, description = "Compensation not found", body = ErrorResponse)
    )
)]
pub async fn get_compensation_by_employee_id(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let id = path.into_inner();
    log::debug!("Received compensation get request for employee '{}'", id);

    match state
        .employee_service()
        .get_compensation_by_employee_id(&id)
        .await
    {
        Ok(Some(compensation)) => HttpResponse::Ok().json(compensation),
        Ok(None) => {
            HttpResponse::NotFound().json(ErrorResponse::not_found("Compensation not found"))
        }
        Err(e) => internal_error("Failed to retrieve compensation", e),
    }
}

fn json_error_handler(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let message = err.to_string();
    log::warn!("Rejected request body: {}", message);
    error::InternalError::from_response(
        err,
        HttpResponse::BadRequest().json(ErrorResponse::bad_request(&message)),
    )
    .into()
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .service(web::resource("/employee").route(web::post().to(create_employee)))
        // Must precede "/employee/{id}" so POST is not answered with 405.
        .service(
            web::resource("/employee/compensation")
                .route(web::post().to(create_compensation)),
        )
        .service(
            web::resource("/employee/{id}")
                .name(EMPLOYEE_ROUTE)
                .route(web::get().to(get_employee_by_id))
                .route(web::put().to(update_employee)),
        )
        .service(
            web::resource("/employee/{id}/reporting-structure")
                .route(web::get().to(get_reporting_structure)),
        )
        .service(
            web::resource("/employee/{id}/compensation")
                .name(COMPENSATION_ROUTE)
                .route(web::get().to(get_compensation_by_employee_id)),
        );
}
