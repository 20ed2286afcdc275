use actix_cors::Cors;
use actix_web::middleware::{Compress, Logger};
use actix_web::{http::header, web, App, HttpServer};
use actix_web_prometheus::PrometheusMetricsBuilder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod db;
pub mod employee;

pub use crate::config::AppConfig;
pub use crate::db::AppState;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: error_type.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self::new("NotFound", message)
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new("BadRequest", message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::new("InternalServerError", message)
    }
}

/// Field-keyed validation messages, e.g. `{"EmployeeId": ["EmployeeId is required."]}`.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, ToSchema)]
pub struct ValidationErrors(pub BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(field.to_string(), vec![message.into()]);
        Self(errors)
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::employee::routes::create_employee,
        crate::employee::routes::get_employee_by_id,
        crate::employee::routes::update_employee,
        crate::employee::routes::get_reporting_structure,
        crate::employee::routes::create_compensation,
        crate::employee::routes::get_compensation_by_employee_id
    ),
    components(
        schemas(
            employee::model::Employee,
            employee::model::DirectReport,
            employee::model::Compensation,
            employee::model::ReportingNode,
            employee::model::ReportingStructure,
            ErrorResponse,
            ValidationErrors,
        )
    ),
    tags(
        (name = "Employee", description = "Employee records and reporting structure."),
        (name = "Compensation", description = "Employee compensation.")
    )
)]
pub struct ApiDoc;

pub async fn run() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let app_state = match AppState::new(&config).await {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            log::error!("Failed to initialise the employee store. Please check DATABASE_URL and ensure the database is running. Error: {}", e);
            std::process::exit(1);
        }
    };

    let prometheus = match PrometheusMetricsBuilder::new("employee_records_server")
        .endpoint("/metrics")
        .build()
    {
        Ok(prometheus) => prometheus,
        Err(e) => {
            log::error!("Failed to create Prometheus metrics middleware: {}", e);
            std::process::exit(1);
        }
    };

    let bind_address = (config.host.clone(), config.port);
    log::info!("Starting server at http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        let app_state = app_state.clone();
        let prometheus = prometheus.clone();
        let cors = config
            .cors_allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "OPTIONS"])
            .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
            .expose_headers(vec![header::LOCATION])
            .max_age(3600);

        App::new()
            .wrap(Compress::default())
            .wrap(Logger::default())
            .wrap(prometheus)
            .wrap(cors)
            .app_data(app_state)
            .service(web::scope("/api").configure(employee::routes::config))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
    })
    .keep_alive(actix_web::http::KeepAlive::Os)
    .bind(bind_address)?
    .run()
    .await
}
