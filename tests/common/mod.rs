use actix_web::{web, App};
use employee_records_server::employee::routes;
use employee_records_server::AppState;

pub const JOHN_LENNON: &str = "16a596ae-edd3-4847-99fe-c4518e82c86f";
pub const RINGO_STARR: &str = "03aa1462-ffa9-4978-901b-7c001562cf6f";
pub const PETE_BEST: &str = "62c1084e-6e34-4630-93fd-9153afb65309";
pub const GEORGE_HARRISON: &str = "c0c2293d-16bd-4603-8e08-638a9d18b22c";

/// Fresh in-memory state holding the bundled org chart.
pub fn seeded_state() -> web::Data<AppState> {
    web::Data::new(AppState::seeded_in_memory().expect("seed data should parse"))
}

/// The routes mounted the way the server mounts them.
pub fn test_app(
    state: web::Data<AppState>,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(state)
        .service(web::scope("/api").configure(routes::config))
}
