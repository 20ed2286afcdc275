//! Database module - AppState and store backends
//!
//! - `postgres` - PostgreSQL repository, used when `DATABASE_URL` is set
//! - `memory` - in-memory repository for local runs and tests

pub mod memory;
pub mod postgres;

use crate::config::AppConfig;
use crate::employee::model::Employee;
use crate::employee::repository::{EmployeeRepository, RepositoryError};
use crate::employee::service::EmployeeService;
use memory::{MemoryEmployeeRepository, MemoryStore};
use postgres::PgEmployeeRepository;
use sqlx::PgPool;
use std::sync::Arc;

const SEED_DATA: &str = include_str!("../../resources/employee_seed_data.json");

/// The bundled org chart loaded into empty stores at startup.
pub fn seed_employees() -> Result<Vec<Employee>, RepositoryError> {
    Ok(serde_json::from_str(SEED_DATA)?)
}

/// Builds a fresh unit of work for each request.
pub type RepositoryFactory = Arc<dyn Fn() -> Box<dyn EmployeeRepository> + Send + Sync>;

#[derive(Clone)]
pub enum Store {
    Postgres(PgPool),
    Memory(Arc<MemoryStore>),
    /// Repositories supplied by the embedder; seeding is left to them.
    Custom(RepositoryFactory),
}

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
}

impl AppState {
    pub async fn new(config: &AppConfig) -> Result<Self, RepositoryError> {
        let state = match &config.database_url {
            Some(database_url) => {
                let pool = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(config.max_connections)
                    .acquire_timeout(std::time::Duration::from_secs(30))
                    .idle_timeout(std::time::Duration::from_secs(900))
                    .connect(database_url)
                    .await?;
                postgres::ensure_schema(&pool).await?;
                log::info!("Connected to PostgreSQL");
                Self::with_pool(pool)
            }
            None => {
                log::warn!("DATABASE_URL not set, using the in-memory store");
                Self::in_memory()
            }
        };

        if config.seed_data {
            let employees = seed_employees()?;
            let inserted = state.seed(&employees).await?;
            log::info!("Seeded {} employees", inserted);
        }

        Ok(state)
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self {
            store: Store::Postgres(pool),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            store: Store::Memory(Arc::new(MemoryStore::new())),
        }
    }

    pub fn with_repository_factory(factory: RepositoryFactory) -> Self {
        Self {
            store: Store::Custom(factory),
        }
    }

    /// In-memory state holding the bundled seed data.
    pub fn seeded_in_memory() -> Result<Self, RepositoryError> {
        let store = MemoryStore::new();
        store.insert_seed(&seed_employees()?);
        Ok(Self {
            store: Store::Memory(Arc::new(store)),
        })
    }

    /// Inserts the employees whose ids are not stored yet.
    pub async fn seed(&self, employees: &[Employee]) -> Result<usize, RepositoryError> {
        match &self.store {
            Store::Postgres(pool) => postgres::insert_seed(pool, employees).await,
            Store::Memory(store) => Ok(store.insert_seed(employees)),
            Store::Custom(_) => {
                log::warn!("Custom store in use, skipping seed data");
                Ok(0)
            }
        }
    }

    /// A fresh unit of work over the configured store.
    pub fn repository(&self) -> Box<dyn EmployeeRepository> {
        match &self.store {
            Store::Postgres(pool) => Box::new(PgEmployeeRepository::new(pool.clone())),
            Store::Memory(store) => Box::new(MemoryEmployeeRepository::new(store.clone())),
            Store::Custom(factory) => factory(),
        }
    }

    pub fn employee_service(&self) -> EmployeeService {
        EmployeeService::new(self.repository())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_data_parses() {
        let employees = seed_employees().unwrap();
        assert_eq!(employees.len(), 5);
        let lennon = employees
            .iter()
            .find(|e| e.employee_id == "16a596ae-edd3-4847-99fe-c4518e82c86f")
            .unwrap();
        assert_eq!(lennon.first_name, "John");
        assert_eq!(lennon.direct_reports.len(), 2);
        let compensation = lennon.compensation.as_ref().unwrap();
        assert_eq!(compensation.salary, rust_decimal::Decimal::new(205_000, 0));
        assert_eq!(compensation.effective_date.to_string(), "2024-01-01");
    }

    #[tokio::test]
    async fn test_seeded_state_holds_lennon_compensation() {
        let state = AppState::seeded_in_memory().unwrap();
        let repo = state.repository();

        let compensation = repo
            .get_compensation_by_employee_id("16a596ae-edd3-4847-99fe-c4518e82c86f")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(compensation.employee_id, "16a596ae-edd3-4847-99fe-c4518e82c86f");
        assert_eq!(compensation.salary, rust_decimal::Decimal::new(205_000, 0));
        assert!(!compensation.compensation_id.is_empty());
    }

    #[tokio::test]
    async fn test_custom_store_builds_repositories_from_factory() {
        let store = Arc::new(MemoryStore::new());
        store.insert_seed(&seed_employees().unwrap());
        let factory_store = store.clone();
        let state = AppState::with_repository_factory(Arc::new(move || {
            Box::new(MemoryEmployeeRepository::new(factory_store.clone()))
                as Box<dyn EmployeeRepository>
        }));

        assert_eq!(state.seed(&seed_employees().unwrap()).await.unwrap(), 0);
        assert!(state
            .repository()
            .employee_exists("16a596ae-edd3-4847-99fe-c4518e82c86f")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let state = AppState::in_memory();
        let employees = seed_employees().unwrap();
        assert_eq!(state.seed(&employees).await.unwrap(), 5);
        assert_eq!(state.seed(&employees).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_in_memory_config_builds_seeded_state() {
        let config = AppConfig::default();
        let state = AppState::new(&config).await.unwrap();
        let repo = state.repository();
        assert!(repo
            .employee_exists("62c1084e-6e34-4630-93fd-9153afb65309")
            .await
            .unwrap());
    }
}
