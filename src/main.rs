#[actix_web::main]
async fn main() -> std::io::Result<()> {
    employee_records_server::run().await
}
