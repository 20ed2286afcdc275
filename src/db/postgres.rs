//! PostgreSQL-backed employee repository

use crate::employee::model::{
    Compensation, DirectReport, Employee, ReportingTree, REPORTING_DEPTH,
};
use crate::employee::repository::{
    new_id, seed_compensation, ChangeSet, EmployeeRepository, PendingChange, RepositoryError,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;

const SCHEMA: [&str; 4] = [
    r#"
    CREATE TABLE IF NOT EXISTS employees (
        employee_id TEXT PRIMARY KEY,
        first_name TEXT NOT NULL DEFAULT '',
        last_name TEXT NOT NULL DEFAULT '',
        position TEXT NOT NULL DEFAULT '',
        department TEXT NOT NULL DEFAULT ''
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS employee_reports (
        manager_id TEXT NOT NULL REFERENCES employees (employee_id) ON DELETE CASCADE,
        report_id TEXT NOT NULL,
        ordinal INTEGER NOT NULL,
        PRIMARY KEY (manager_id, report_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS compensations (
        compensation_id TEXT PRIMARY KEY,
        employee_id TEXT NOT NULL UNIQUE REFERENCES employees (employee_id) ON DELETE CASCADE,
        salary NUMERIC NOT NULL CHECK (salary >= 0),
        effective_date DATE NOT NULL
    )
    "#,
    // Widens salary columns created with a fixed scale.
    "ALTER TABLE compensations ALTER COLUMN salary TYPE NUMERIC",
];

/// Creates the tables this service needs if they are missing.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// Inserts employees that are not stored yet, keeping their ids.
pub async fn insert_seed(pool: &PgPool, employees: &[Employee]) -> Result<usize, RepositoryError> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for employee in employees {
        let result = sqlx::query(
            r#"
            INSERT INTO employees (employee_id, first_name, last_name, position, department)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (employee_id) DO NOTHING
            "#,
        )
        .bind(&employee.employee_id)
        .bind(&employee.first_name)
        .bind(&employee.last_name)
        .bind(&employee.position)
        .bind(&employee.department)
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected() as usize;
    }

    for employee in employees {
        for (ordinal, report) in employee.direct_reports.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO employee_reports (manager_id, report_id, ordinal)
                VALUES ($1, $2, $3)
                ON CONFLICT (manager_id, report_id) DO NOTHING
                "#,
            )
            .bind(&employee.employee_id)
            .bind(&report.employee_id)
            .bind(ordinal as i32)
            .execute(&mut *tx)
            .await?;
        }
    }

    for employee in employees {
        let Some(compensation) = employee.compensation.clone() else {
            continue;
        };
        let compensation = seed_compensation(&employee.employee_id, compensation);
        sqlx::query(
            r#"
            INSERT INTO compensations (compensation_id, employee_id, salary, effective_date)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(&compensation.compensation_id)
        .bind(&compensation.employee_id)
        .bind(compensation.salary)
        .bind(compensation.effective_date)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(inserted)
}

#[derive(sqlx::FromRow)]
struct EmployeeRow {
    employee_id: String,
    first_name: String,
    last_name: String,
    position: String,
    department: String,
}

#[derive(sqlx::FromRow)]
struct ReportRow {
    manager_id: String,
    report_id: String,
}

#[derive(sqlx::FromRow)]
struct CompensationRow {
    compensation_id: String,
    employee_id: String,
    salary: Decimal,
    effective_date: NaiveDate,
}

impl From<CompensationRow> for Compensation {
    fn from(row: CompensationRow) -> Self {
        Self {
            compensation_id: row.compensation_id,
            employee_id: row.employee_id,
            salary: row.salary,
            effective_date: row.effective_date,
        }
    }
}

pub struct PgEmployeeRepository {
    pool: PgPool,
    changes: ChangeSet,
}

impl PgEmployeeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            changes: ChangeSet::new(),
        }
    }

    /// Loads employees by id together with their ordered direct-report ids.
    async fn fetch_employees(&self, ids: &[String]) -> Result<Vec<Employee>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, EmployeeRow>(
            "SELECT employee_id, first_name, last_name, position, department FROM employees WHERE employee_id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let edges = sqlx::query_as::<_, ReportRow>(
            "SELECT manager_id, report_id FROM employee_reports WHERE manager_id = ANY($1) ORDER BY manager_id, ordinal",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut reports: HashMap<String, Vec<DirectReport>> = HashMap::new();
        for edge in edges {
            reports
                .entry(edge.manager_id)
                .or_default()
                .push(DirectReport::new(edge.report_id));
        }

        Ok(rows
            .into_iter()
            .map(|row| Employee {
                direct_reports: reports.remove(&row.employee_id).unwrap_or_default(),
                employee_id: row.employee_id,
                first_name: row.first_name,
                last_name: row.last_name,
                position: row.position,
                department: row.department,
                compensation: None,
            })
            .collect())
    }
}

#[async_trait]
impl EmployeeRepository for PgEmployeeRepository {
    async fn get_by_id(&self, employee_id: &str) -> Result<Option<Employee>, RepositoryError> {
        let mut employees = self.fetch_employees(&[employee_id.to_string()]).await?;
        let Some(mut employee) = employees.pop() else {
            return Ok(None);
        };
        employee.compensation = self.get_compensation_by_employee_id(employee_id).await?;
        Ok(Some(employee))
    }

    async fn get_reporting_structure(
        &self,
        employee_id: &str,
    ) -> Result<Option<ReportingTree>, RepositoryError> {
        let mut roots = self.fetch_employees(&[employee_id.to_string()]).await?;
        let Some(root) = roots.pop() else {
            return Ok(None);
        };

        let mut tree = ReportingTree::new(root);
        let mut frontier = vec![employee_id.to_string()];

        for _ in 0..REPORTING_DEPTH {
            let wanted: Vec<String> = frontier
                .iter()
                .filter_map(|id| tree.get(id))
                .flat_map(|e| e.direct_reports.iter())
                .map(|r| r.employee_id.clone())
                .filter(|id| !tree.contains(id))
                .collect();

            frontier.clear();
            for employee in self.fetch_employees(&wanted).await? {
                frontier.push(employee.employee_id.clone());
                tree.insert(employee);
            }
            if frontier.is_empty() {
                break;
            }
        }

        Ok(Some(tree))
    }

    async fn employee_exists(&self, employee_id: &str) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM employees WHERE employee_id = $1)",
        )
        .bind(employee_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
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
        let row = sqlx::query_as::<_, CompensationRow>(
            "SELECT compensation_id, employee_id, salary, effective_date FROM compensations WHERE employee_id = $1",
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Compensation::from))
    }

    fn add_compensation(&self, mut compensation: Compensation) -> Compensation {
        compensation.compensation_id = new_id();
        self.changes
            .stage(PendingChange::AddCompensation(compensation.clone()));
        compensation
    }

    async fn compensation_exists(&self, employee_id: &str) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM compensations WHERE employee_id = $1)",
        )
        .bind(employee_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn save(&self) -> Result<(), RepositoryError> {
        let changes = self.changes.take();
        if changes.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for change in changes {
            apply_change(&mut tx, change).await?;
        }
        tx.commit().await?;

        Ok(())
    }
}

async fn apply_change(conn: &mut PgConnection, change: PendingChange) -> Result<(), RepositoryError> {
    match change {
        PendingChange::AddEmployee(employee) => {
            sqlx::query(
                r#"
                INSERT INTO employees (employee_id, first_name, last_name, position, department)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(&employee.employee_id)
            .bind(&employee.first_name)
            .bind(&employee.last_name)
            .bind(&employee.position)
            .bind(&employee.department)
            .execute(&mut *conn)
            .await?;
            write_reports(conn, &employee).await
        }
        PendingChange::UpdateEmployee(employee) => {
            let result = sqlx::query(
                r#"
                UPDATE employees
                SET first_name = $2, last_name = $3, position = $4, department = $5
                WHERE employee_id = $1
                "#,
            )
            .bind(&employee.employee_id)
            .bind(&employee.first_name)
            .bind(&employee.last_name)
            .bind(&employee.position)
            .bind(&employee.department)
            .execute(&mut *conn)
            .await?;

            if result.rows_affected() == 0 {
                return Err(RepositoryError::EmployeeNotFound(employee.employee_id));
            }

            sqlx::query("DELETE FROM employee_reports WHERE manager_id = $1")
                .bind(&employee.employee_id)
                .execute(&mut *conn)
                .await?;
            write_reports(conn, &employee).await
        }
        PendingChange::RemoveEmployee(employee_id) => {
            sqlx::query("DELETE FROM employee_reports WHERE report_id = $1")
                .bind(&employee_id)
                .execute(&mut *conn)
                .await?;
            sqlx::query("DELETE FROM employees WHERE employee_id = $1")
                .bind(&employee_id)
                .execute(&mut *conn)
                .await?;
            Ok(())
        }
        PendingChange::AddCompensation(compensation) => {
            sqlx::query(
                r#"
                INSERT INTO compensations (compensation_id, employee_id, salary, effective_date)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(&compensation.compensation_id)
            .bind(&compensation.employee_id)
            .bind(compensation.salary)
            .bind(compensation.effective_date)
            .execute(&mut *conn)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    RepositoryError::CompensationExists(compensation.employee_id.clone())
                }
                sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                    RepositoryError::EmployeeNotFound(compensation.employee_id.clone())
                }
                other => RepositoryError::Database(other),
            })?;
            Ok(())
        }
    }
}

async fn write_reports(conn: &mut PgConnection, employee: &Employee) -> Result<(), RepositoryError> {
    for (ordinal, report) in employee.direct_reports.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO employee_reports (manager_id, report_id, ordinal)
            VALUES ($1, $2, $3)
            ON CONFLICT (manager_id, report_id) DO NOTHING
            "#,
        )
        .bind(&employee.employee_id)
        .bind(&report.employee_id)
        .bind(ordinal as i32)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}
