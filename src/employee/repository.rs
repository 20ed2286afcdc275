//! Persistence gateway for employees and compensations.
//!
//! A repository is a unit of work: reads go straight to the store and return
//! owned snapshots, while mutations are only staged. Nothing reaches the store
//! until [`EmployeeRepository::save`] is called.

use crate::employee::model::{Compensation, Employee, ReportingTree};
use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("compensation for employee '{0}' already exists")]
    CompensationExists(String),
    #[error("employee '{0}' does not exist")]
    EmployeeNotFound(String),
    #[error("invalid seed data: {0}")]
    Seed(#[from] serde_json::Error),
}

/// A mutation waiting for the next commit.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingChange {
    AddEmployee(Employee),
    UpdateEmployee(Employee),
    RemoveEmployee(String),
    AddCompensation(Compensation),
}

/// Ordered list of staged mutations shared by the store backends.
#[derive(Debug, Default)]
pub struct ChangeSet {
    pending: Mutex<Vec<PendingChange>>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self, change: PendingChange) {
        self.pending.lock().push(change);
    }

    /// Takes every staged change, leaving the set empty.
    pub fn take(&self) -> Vec<PendingChange> {
        std::mem::take(&mut *self.pending.lock())
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Binds a seeded compensation to the employee that carries it, giving it
/// an id when the seed has none.
pub fn seed_compensation(employee_id: &str, mut compensation: Compensation) -> Compensation {
    compensation.employee_id = employee_id.to_string();
    if compensation.compensation_id.is_empty() {
        compensation.compensation_id = new_id();
    }
    compensation
}

#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    /// Point lookup, with the employee's compensation attached if present.
    async fn get_by_id(&self, employee_id: &str) -> Result<Option<Employee>, RepositoryError>;

    /// The employee plus its subordinates, loaded `REPORTING_DEPTH` levels deep.
    async fn get_reporting_structure(
        &self,
        employee_id: &str,
    ) -> Result<Option<ReportingTree>, RepositoryError>;

    async fn employee_exists(&self, employee_id: &str) -> Result<bool, RepositoryError>;

    /// Stages an insert and returns the employee with its new id.
    fn add(&self, employee: Employee) -> Employee;

    /// Stages a full replace of the employee matched by id.
    fn update(&self, employee: Employee) -> Employee;

    fn remove(&self, employee_id: &str);

    async fn get_compensation_by_employee_id(
        &self,
        employee_id: &str,
    ) -> Result<Option<Compensation>, RepositoryError>;

    /// Stages an insert and returns the compensation with its new id.
    fn add_compensation(&self, compensation: Compensation) -> Compensation;

    async fn compensation_exists(&self, employee_id: &str) -> Result<bool, RepositoryError>;

    /// Commits every staged change atomically.
    async fn save(&self) -> Result<(), RepositoryError>;
}
