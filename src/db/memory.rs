//! In-memory employee store, used when no database is configured and in tests.

use crate::employee::model::{Compensation, Employee, ReportingTree, REPORTING_DEPTH};
use crate::employee::repository::{
    new_id, seed_compensation, ChangeSet, EmployeeRepository, PendingChange, RepositoryError,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
struct Tables {
    employees: HashMap<String, Employee>,
    /// Keyed by employee id; at most one compensation per employee.
    compensations: HashMap<String, Compensation>,
}

impl Tables {
    /// Rejects a batch that would break a store constraint, without
    /// touching the tables. Earlier changes in the batch are taken into
    /// account by later ones.
    fn check(&self, changes: &[PendingChange]) -> Result<(), RepositoryError> {
        let mut present: HashMap<&str, bool> = HashMap::new();
        let mut compensated: HashMap<&str, bool> = HashMap::new();

        for change in changes {
            match change {
                PendingChange::AddEmployee(employee) => {
                    present.insert(&employee.employee_id, true);
                }
                PendingChange::UpdateEmployee(employee) => {
                    let id = employee.employee_id.as_str();
                    let exists = present
                        .get(id)
                        .copied()
                        .unwrap_or_else(|| self.employees.contains_key(id));
                    if !exists {
                        return Err(RepositoryError::EmployeeNotFound(id.to_string()));
                    }
                }
                PendingChange::RemoveEmployee(employee_id) => {
                    present.insert(employee_id, false);
                    compensated.insert(employee_id, false);
                }
                PendingChange::AddCompensation(compensation) => {
                    let id = compensation.employee_id.as_str();
                    let exists = present
                        .get(id)
                        .copied()
                        .unwrap_or_else(|| self.employees.contains_key(id));
                    if !exists {
                        return Err(RepositoryError::EmployeeNotFound(id.to_string()));
                    }
                    let taken = compensated
                        .get(id)
                        .copied()
                        .unwrap_or_else(|| self.compensations.contains_key(id));
                    if taken {
                        return Err(RepositoryError::CompensationExists(id.to_string()));
                    }
                    compensated.insert(id, true);
                }
            }
        }
        Ok(())
    }

    /// Applies a change that already passed [`Tables::check`].
    fn apply(&mut self, change: PendingChange) {
        match change {
            PendingChange::AddEmployee(mut employee) | PendingChange::UpdateEmployee(mut employee) => {
                employee.compensation = None;
                self.employees
                    .insert(employee.employee_id.clone(), employee);
            }
            PendingChange::RemoveEmployee(employee_id) => {
                self.employees.remove(&employee_id);
                self.compensations.remove(&employee_id);
                for employee in self.employees.values_mut() {
                    employee
                        .direct_reports
                        .retain(|report| report.employee_id != employee_id);
                }
            }
            PendingChange::AddCompensation(compensation) => {
                self.compensations
                    .insert(compensation.employee_id.clone(), compensation);
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts employees that are not stored yet, keeping their ids, along
    /// with any compensation they carry.
    pub fn insert_seed(&self, employees: &[Employee]) -> usize {
        let mut tables = self.tables.write();
        let mut inserted = 0;
        for employee in employees {
            if !tables.employees.contains_key(&employee.employee_id) {
                let mut employee = employee.clone();
                if let Some(compensation) = employee.compensation.take() {
                    let compensation = seed_compensation(&employee.employee_id, compensation);
                    tables
                        .compensations
                        .entry(employee.employee_id.clone())
                        .or_insert(compensation);
                }
                tables
                    .employees
                    .insert(employee.employee_id.clone(), employee);
                inserted += 1;
            }
        }
        inserted
    }

    pub fn compensation_count(&self) -> usize {
        self.tables.read().compensations.len()
    }

    pub fn employee_count(&self) -> usize {
        self.tables.read().employees.len()
    }
}

pub struct MemoryEmployeeRepository {
    store: Arc<MemoryStore>,
    changes: ChangeSet,
}

impl MemoryEmployeeRepository {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            changes: ChangeSet::new(),
        }
    }
}

#[async_trait]
impl EmployeeRepository for MemoryEmployeeRepository {
    async fn get_by_id(&self, employee_id: &str) -> Result<Option<Employee>, RepositoryError> {
        let tables = self.store.tables.read();
        Ok(tables.employees.get(employee_id).map(|employee| {
            let mut employee = employee.clone();
            employee.compensation = tables.compensations.get(employee_id).cloned();
            employee
        }))
    }

    async fn get_reporting_structure(
        &self,
        employee_id: &str,
    ) -> Result<Option<ReportingTree>, RepositoryError> {
        let tables = self.store.tables.read();
        let Some(root) = tables.employees.get(employee_id) else {
            return Ok(None);
        };

        let mut tree = ReportingTree::new(root.clone());
        let mut frontier = vec![employee_id.to_string()];

        for _ in 0..REPORTING_DEPTH {
            let mut next = Vec::new();
            for manager_id in &frontier {
                let Some(manager) = tables.employees.get(manager_id) else {
                    continue;
                };
                for report in &manager.direct_reports {
                    if tree.contains(&report.employee_id) {
                        continue;
                    }
                    if let Some(employee) = tables.employees.get(&report.employee_id) {
                        tree.insert(employee.clone());
                        next.push(report.employee_id.clone());
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        Ok(Some(tree))
    }

    async fn employee_exists(&self, employee_id: &str) -> Result<bool, RepositoryError> {
        Ok(self.store.tables.read().employees.contains_key(employee_id))
    }

    fn add(&self, mut employee: Employee) -> Employee {
        employee.employee_id = new_id();
        self.changes.stage(PendingChange::AddEmployee(employee.clone()));
        employee
    }

    fn update(&self, employee: Employee) -> Employee {
        self.changes
            .stage(PendingChange::UpdateEmployee(employee.clone()));
        employee
    }

    fn remove(&self, employee_id: &str) {
        self.changes
            .stage(PendingChange::RemoveEmployee(employee_id.to_string()));
    }

    async fn get_compensation_by_employee_id(
        &self,
        employee_id: &str,
    ) -> Result<Option<Compensation>, RepositoryError> {
        Ok(self.store.tables.read().compensations.get(employee_id).cloned())
    }

    fn add_compensation(&self, mut compensation: Compensation) -> Compensation {
        compensation.compensation_id = new_id();
        self.changes
            .stage(PendingChange::AddCompensation(compensation.clone()));
        compensation
    }

    async fn compensation_exists(&self, employee_id: &str) -> Result<bool, RepositoryError> {
        Ok(self
            .store
            .tables
            .read()
            .compensations
            .contains_key(employee_id))
    }

    async fn save(&self) -> Result<(), RepositoryError> {
        let changes = self.changes.take();
        if changes.is_empty() {
            return Ok(());
        }

        let mut tables = self.store.tables.write();
        tables.check(&changes)?;
        for change in changes {
            tables.apply(change);
        }

        Ok(())
    }
}
