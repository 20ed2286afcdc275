use crate::employee::model::{
    Compensation, DirectReport, Employee, ReportingNode, ReportingTree,
};
use crate::employee::repository::{EmployeeRepository, RepositoryError};
use crate::employee::service::{count_reports, EmployeeService};
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    GetById(String),
    GetReportingStructure(String),
    EmployeeExists(String),
    Add,
    Update(String),
    Remove(String),
    GetCompensation(String),
    AddCompensation(String),
    CompensationExists(String),
    Save,
}

/// Repository double that records every call and answers from canned values.
#[derive(Default)]
struct RecordingRepository {
    calls: Arc<Mutex<Vec<Call>>>,
    employee: Option<Employee>,
    tree: Option<ReportingTree>,
    compensation: Option<Compensation>,
}

impl RecordingRepository {
    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl EmployeeRepository for RecordingRepository {
    async fn get_by_id(&self, employee_id: &str) -> Result<Option<Employee>, RepositoryError> {
        self.record(Call::GetById(employee_id.to_string()));
        Ok(self.employee.clone())
    }

    async fn get_reporting_structure(
        &self,
        employee_id: &str,
    ) -> Result<Option<ReportingTree>, RepositoryError> {
        self.record(Call::GetReportingStructure(employee_id.to_string()));
        Ok(self.tree.clone())
    }

    async fn employee_exists(&self, employee_id: &str) -> Result<bool, RepositoryError> {
        self.record(Call::EmployeeExists(employee_id.to_string()));
        Ok(self.employee.is_some())
    }

    fn add(&self, mut employee: Employee) -> Employee {
        self.record(Call::Add);
        employee.employee_id = "generated-id".to_string();
        employee
    }

    fn update(&self, employee: Employee) -> Employee {
        self.record(Call::Update(employee.employee_id.clone()));
        employee
    }

    fn remove(&self, employee_id: &str) {
        self.record(Call::Remove(employee_id.to_string()));
    }

    async fn get_compensation_by_employee_id(
        &self,
        employee_id: &str,
    ) -> Result<Option<Compensation>, RepositoryError> {
        self.record(Call::GetCompensation(employee_id.to_string()));
        Ok(self.compensation.clone())
    }

    fn add_compensation(&self, mut compensation: Compensation) -> Compensation {
        self.record(Call::AddCompensation(compensation.employee_id.clone()));
        compensation.compensation_id = "generated-compensation-id".to_string();
        compensation
    }

    async fn compensation_exists(&self, employee_id: &str) -> Result<bool, RepositoryError> {
        self.record(Call::CompensationExists(employee_id.to_string()));
        Ok(self.compensation.is_some())
    }

    async fn save(&self) -> Result<(), RepositoryError> {
        self.record(Call::Save);
        Ok(())
    }
}

fn service_with(repository: RecordingRepository) -> (EmployeeService, Arc<Mutex<Vec<Call>>>) {
    let calls = repository.calls.clone();
    (EmployeeService::new(Box::new(repository)), calls)
}

fn person(id: &str, first_name: &str, reports: &[&str]) -> Employee {
    Employee {
        employee_id: id.to_string(),
        first_name: first_name.to_string(),
        last_name: "Test".to_string(),
        position: "Software Engineer".to_string(),
        department: "Engineering".to_string(),
        direct_reports: reports.iter().map(|r| DirectReport::new(*r)).collect(),
        compensation: None,
    }
}

fn tree_of(root: Employee, rest: Vec<Employee>) -> ReportingTree {
    let mut tree = ReportingTree::new(root);
    for employee in rest {
        tree.insert(employee);
    }
    tree
}

fn sample_compensation(employee_id: &str) -> Compensation {
    Compensation {
        compensation_id: String::new(),
        employee_id: employee_id.to_string(),
        salary: Decimal::new(12_345_678, 2),
        effective_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
    }
}

#[tokio::test]
async fn test_reporting_structure_returns_none_for_empty_id_without_repository_call() {
    let (service, calls) = service_with(RecordingRepository::default());

    let result = service.get_reporting_structure("").await.unwrap();

    assert!(result.is_none());
    assert!(calls.lock().is_empty());
}

#[tokio::test]
async fn test_reporting_structure_returns_none_for_unknown_employee() {
    let (service, calls) = service_with(RecordingRepository::default());

    let result = service.get_reporting_structure("unknown").await.unwrap();

    assert!(result.is_none());
    assert_eq!(
        *calls.lock(),
        vec![Call::GetReportingStructure("unknown".to_string())]
    );
}

#[tokio::test]
async fn test_reporting_structure_counts_direct_and_indirect_reports() {
    let tree = tree_of(
        person("tom", "Tom", &["debbie", "clark"]),
        vec![
            person("debbie", "Debbie", &["bart"]),
            person("bart", "Bart", &[]),
            person("clark", "Clark", &[]),
        ],
    );
    let (service, calls) = service_with(RecordingRepository {
        tree: Some(tree),
        ..Default::default()
    });

    let structure = service.get_reporting_structure("tom").await.unwrap().unwrap();

    assert_eq!(structure.number_of_reports, 3);
    assert_eq!(structure.employee.employee_id, "tom");
    assert_eq!(structure.employee.direct_reports.len(), 2);
    assert_eq!(structure.employee.direct_reports[0].employee_id, "debbie");
    assert_eq!(
        structure.employee.direct_reports[0].direct_reports[0].employee_id,
        "bart"
    );
    assert_eq!(
        *calls.lock(),
        vec![Call::GetReportingStructure("tom".to_string())]
    );
}

#[test]
fn test_count_reports_of_employee_without_reports_is_zero() {
    let tree = ReportingTree::new(person("solo", "Solo", &[]));
    assert_eq!(count_reports(&tree), 0);
}

#[test]
fn test_count_reports_ignores_references_outside_the_loaded_tree() {
    let tree = tree_of(
        person("root", "Root", &["a", "not-loaded"]),
        vec![person("a", "A", &["also-not-loaded"])],
    );
    assert_eq!(count_reports(&tree), 1);
}

#[test]
fn test_count_reports_recurses_past_two_levels_when_loaded() {
    let tree = tree_of(
        person("l0", "Level0", &["l1"]),
        vec![
            person("l1", "Level1", &["l2"]),
            person("l2", "Level2", &["l3"]),
            person("l3", "Level3", &["l4a", "l4b"]),
            person("l4a", "Level4a", &[]),
            person("l4b", "Level4b", &[]),
        ],
    );
    assert_eq!(count_reports(&tree), 5);
}

#[test]
fn test_count_reports_terminates_on_cycles() {
    let tree = tree_of(
        person("a", "A", &["b"]),
        vec![person("b", "B", &["c"]), person("c", "C", &["a", "b"])],
    );
    assert_eq!(count_reports(&tree), 2);

    let node = tree.to_node();
    assert_eq!(node.direct_reports[0].direct_reports[0].employee_id, "c");
    assert!(node.direct_reports[0].direct_reports[0]
        .direct_reports
        .is_empty());
}

#[test]
fn test_count_reports_counts_shared_report_once() {
    let tree = tree_of(
        person("root", "Root", &["left", "right"]),
        vec![
            person("left", "Left", &["shared"]),
            person("right", "Right", &["shared"]),
            person("shared", "Shared", &[]),
        ],
    );
    assert_eq!(count_reports(&tree), 3);
}

#[test]
fn test_reporting_node_leaves_render_with_empty_reports() {
    let tree = tree_of(
        person("root", "Root", &["child"]),
        vec![person("child", "Child", &["beyond-horizon"])],
    );

    let node = tree.to_node();

    assert_eq!(
        node,
        ReportingNode {
            employee_id: "root".to_string(),
            first_name: "Root".to_string(),
            last_name: "Test".to_string(),
            position: "Software Engineer".to_string(),
            department: "Engineering".to_string(),
            direct_reports: vec![ReportingNode {
                employee_id: "child".to_string(),
                first_name: "Child".to_string(),
                last_name: "Test".to_string(),
                position: "Software Engineer".to_string(),
                department: "Engineering".to_string(),
                direct_reports: vec![],
            }],
        }
    );
}

#[tokio::test]
async fn test_create_compensation_returns_new_compensation_after_insert_then_commit() {
    let (service, calls) = service_with(RecordingRepository::default());

    let created = service
        .create_compensation(Some(sample_compensation("emp-1")))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(created.compensation_id, "generated-compensation-id");
    assert_eq!(created.employee_id, "emp-1");
    assert_eq!(
        *calls.lock(),
        vec![Call::AddCompensation("emp-1".to_string()), Call::Save]
    );
}

#[tokio::test]
async fn test_create_compensation_with_none_never_touches_repository() {
    let (service, calls) = service_with(RecordingRepository::default());

    let created = service.create_compensation(None).await.unwrap();

    assert!(created.is_none());
    assert!(calls.lock().is_empty());
}

#[tokio::test]
async fn test_get_compensation_returns_stored_compensation() {
    let (service, calls) = service_with(RecordingRepository {
        compensation: Some(sample_compensation("emp-1")),
        ..Default::default()
    });

    let compensation = service
        .get_compensation_by_employee_id("emp-1")
        .await
        .unwrap();

    assert!(compensation.is_some());
    assert_eq!(
        *calls.lock(),
        vec![Call::GetCompensation("emp-1".to_string())]
    );
}

#[tokio::test]
async fn test_get_compensation_with_empty_id_skips_repository() {
    let (service, calls) = service_with(RecordingRepository::default());

    let compensation = service.get_compensation_by_employee_id("").await.unwrap();

    assert!(compensation.is_none());
    assert!(calls.lock().is_empty());
}

#[tokio::test]
async fn test_get_by_id_with_empty_id_skips_repository() {
    let (service, calls) = service_with(RecordingRepository::default());

    assert!(service.get_by_id("").await.unwrap().is_none());
    assert!(calls.lock().is_empty());
}

#[tokio::test]
async fn test_create_employee_assigns_id_and_commits() {
    let (service, calls) = service_with(RecordingRepository::default());

    let created = service.create(person("", "Debbie", &[])).await.unwrap();

    assert_eq!(created.employee_id, "generated-id");
    assert_eq!(created.first_name, "Debbie");
    assert_eq!(*calls.lock(), vec![Call::Add, Call::Save]);
}

#[tokio::test]
async fn test_update_employee_stages_full_replace_then_commits() {
    let (service, calls) = service_with(RecordingRepository::default());

    let updated = service
        .update(person("emp-1", "Pete", &["emp-2"]))
        .await
        .unwrap();

    assert_eq!(updated.first_name, "Pete");
    assert_eq!(updated.direct_reports, vec![DirectReport::new("emp-2")]);
    assert_eq!(
        *calls.lock(),
        vec![Call::Update("emp-1".to_string()), Call::Save]
    );
}

#[tokio::test]
async fn test_employee_writes_drop_repeated_direct_reports() {
    let (service, _) = service_with(RecordingRepository::default());

    let created = service
        .create(person("", "Tom", &["b", "a", "b"]))
        .await
        .unwrap();
    let updated = service
        .update(person("emp-1", "Tom", &["a", "a", "c"]))
        .await
        .unwrap();

    assert_eq!(
        created.direct_reports,
        vec![DirectReport::new("b"), DirectReport::new("a")]
    );
    assert_eq!(
        updated.direct_reports,
        vec![DirectReport::new("a"), DirectReport::new("c")]
    );
}

#[tokio::test]
async fn test_existence_predicates_delegate_to_repository() {
    let (service, calls) = service_with(RecordingRepository {
        employee: Some(person("emp-1", "Paul", &[])),
        ..Default::default()
    });

    assert!(service.employee_exists("emp-1").await.unwrap());
    assert!(!service.compensation_exists("emp-1").await.unwrap());
    assert_eq!(
        *calls.lock(),
        vec![
            Call::EmployeeExists("emp-1".to_string()),
            Call::CompensationExists("emp-1".to_string()),
        ]
    );
}

#[test]
fn test_employee_json_uses_camel_case() {
    let employee = person("emp-1", "John", &["emp-2"]);

    let json = serde_json::to_value(&employee).unwrap();

    assert_eq!(json["employeeId"], "emp-1");
    assert_eq!(json["firstName"], "John");
    assert_eq!(json["directReports"][0]["employeeId"], "emp-2");
}

#[test]
fn test_compensation_salary_is_a_json_number() {
    let json = serde_json::to_string(&sample_compensation("emp-1")).unwrap();

    assert!(json.contains(r#""salary":123456.78"#), "{}", json);
    assert!(json.contains(r#""effectiveDate":"2024-01-01""#), "{}", json);
}

#[test]
fn test_compensation_salary_keeps_every_digit() {
    let compensation: Compensation = serde_json::from_str(
        r#"{"employeeId": "emp-1", "salary": 12345678901234567.89, "effectiveDate": "2024-01-01"}"#,
    )
    .unwrap();

    assert_eq!(compensation.salary.to_string(), "12345678901234567.89");
    let json = serde_json::to_string(&compensation).unwrap();
    assert!(json.contains(r#""salary":12345678901234567.89"#), "{}", json);
}

#[test]
fn test_employee_without_id_deserializes_with_empty_id() {
    let employee: Employee = serde_json::from_str(
        r#"{"firstName": "Debbie", "lastName": "Downer", "position": "Receiver", "department": "Complaints"}"#,
    )
    .unwrap();

    assert!(employee.employee_id.is_empty());
    assert!(employee.direct_reports.is_empty());
    assert!(employee.compensation.is_none());
}
