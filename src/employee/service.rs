use crate::employee::model::{Compensation, Employee, ReportingStructure, ReportingTree};
use crate::employee::repository::{EmployeeRepository, RepositoryError};
use std::collections::HashSet;

/// Employee and compensation operations over one unit of work.
///
/// Empty identifiers short-circuit to `Ok(None)` without touching the
/// repository.
pub struct EmployeeService {
    repository: Box<dyn EmployeeRepository>,
}

impl EmployeeService {
    pub fn new(repository: Box<dyn EmployeeRepository>) -> Self {
        Self { repository }
    }

    pub async fn create(&self, mut employee: Employee) -> Result<Employee, RepositoryError> {
        employee.dedup_direct_reports();
        let employee = self.repository.add(employee);
        self.repository.save().await?;
        log::debug!("Created employee '{}'", employee.employee_id);
        Ok(employee)
    }

    pub async fn get_by_id(&self, employee_id: &str) -> Result<Option<Employee>, RepositoryError> {
        if employee_id.is_empty() {
            return Ok(None);
        }
        self.repository.get_by_id(employee_id).await
    }

    /// Replaces every attribute of the stored employee with the same id.
    pub async fn update(&self, mut employee: Employee) -> Result<Employee, RepositoryError> {
        log::debug!("Updating employee '{}'", employee.employee_id);
        employee.dedup_direct_reports();
        let employee = self.repository.update(employee);
        self.repository.save().await?;
        Ok(employee)
    }

    pub async fn employee_exists(&self, employee_id: &str) -> Result<bool, RepositoryError> {
        self.repository.employee_exists(employee_id).await
    }

    pub async fn get_reporting_structure(
        &self,
        employee_id: &str,
    ) -> Result<Option<ReportingStructure>, RepositoryError> {
        if employee_id.is_empty() {
            return Ok(None);
        }

        log::debug!("Retrieving reporting structure for employee '{}'", employee_id);

        let Some(tree) = self.repository.get_reporting_structure(employee_id).await? else {
            return Ok(None);
        };

        let number_of_reports = count_reports(&tree);

        Ok(Some(ReportingStructure {
            employee: tree.to_node(),
            number_of_reports,
        }))
    }

    /// Stages and commits a compensation. `None` is a no-op that never
    /// reaches the repository.
    pub async fn create_compensation(
        &self,
        compensation: Option<Compensation>,
    ) -> Result<Option<Compensation>, RepositoryError> {
        let Some(compensation) = compensation else {
            return Ok(None);
        };

        log::debug!(
            "Creating compensation for employee '{}'",
            compensation.employee_id
        );

        let compensation = self.repository.add_compensation(compensation);
        self.repository.save().await?;
        Ok(Some(compensation))
    }

    pub async fn get_compensation_by_employee_id(
        &self,
        employee_id: &str,
    ) -> Result<Option<Compensation>, RepositoryError> {
        if employee_id.is_empty() {
            return Ok(None);
        }

        log::debug!("Retrieving compensation for employee '{}'", employee_id);

        self.repository
            .get_compensation_by_employee_id(employee_id)
            .await
    }

    pub async fn compensation_exists(&self, employee_id: &str) -> Result<bool, RepositoryError> {
        self.repository.compensation_exists(employee_id).await
    }
}

/// Number of direct and indirect reports below the root of the loaded tree.
///
/// Each employee is counted once, however many paths lead to it, so the
/// result is the size of the reachable subtree minus the root.
pub fn count_reports(tree: &ReportingTree) -> usize {
    let root_id = tree.root().employee_id.as_str();
    let mut visited = HashSet::from([root_id.to_string()]);
    count_below(tree, root_id, &mut visited)
}

fn count_below(tree: &ReportingTree, employee_id: &str, visited: &mut HashSet<String>) -> usize {
    let unseen: Vec<&str> = tree
        .children(employee_id)
        .map(|child| child.employee_id.as_str())
        .filter(|id| visited.insert(id.to_string()))
        .collect();

    unseen.len()
        + unseen
            .iter()
            .map(|child_id| count_below(tree, child_id, visited))
            .sum::<usize>()
}
