use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use utoipa::ToSchema;

/// How many levels of subordinates the reporting-structure fetch loads.
pub const REPORTING_DEPTH: usize = 2;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    /// Assigned by the server on creation. Empty until then.
    #[serde(default)]
    #[schema(example = "16a596ae-edd3-4847-99fe-c4518e82c86f")]
    pub employee_id: String,
    #[serde(default)]
    #[schema(example = "John")]
    pub first_name: String,
    #[serde(default)]
    #[schema(example = "Lennon")]
    pub last_name: String,
    #[serde(default)]
    #[schema(example = "Development Manager")]
    pub position: String,
    #[serde(default)]
    #[schema(example = "Engineering")]
    pub department: String,
    #[serde(default)]
    pub direct_reports: Vec<DirectReport>,
    #[serde(default)]
    pub compensation: Option<Compensation>,
}

impl Employee {
    /// Drops repeated direct-report ids, keeping the first occurrence.
    pub fn dedup_direct_reports(&mut self) {
        let mut seen = HashSet::new();
        self.direct_reports
            .retain(|report| seen.insert(report.employee_id.clone()));
    }
}

/// Reference to a subordinate by id.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DirectReport {
    #[schema(example = "b7839309-3348-463b-a7e3-5de1c168beb3")]
    pub employee_id: String,
}

impl DirectReport {
    pub fn new(employee_id: impl Into<String>) -> Self {
        Self {
            employee_id: employee_id.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Compensation {
    #[serde(default)]
    #[schema(example = "5f0a8c1e-3d4b-4c8e-9a57-1b2c3d4e5f60")]
    pub compensation_id: String,
    #[serde(default)]
    #[schema(example = "62c1084e-6e34-4630-93fd-9153afb65309")]
    pub employee_id: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    #[schema(value_type = f64, example = 123456.78)]
    pub salary: Decimal,
    #[schema(value_type = String, format = Date, example = "2024-01-01")]
    pub effective_date: NaiveDate,
}

/// An employee and the subordinates loaded with it, indexed by id.
///
/// Edges are the `direct_reports` lists of the indexed employees. A
/// reference whose target is not in the index lies beyond the load horizon
/// and is not part of the tree.
#[derive(Debug, Clone)]
pub struct ReportingTree {
    root_id: String,
    nodes: HashMap<String, Employee>,
}

impl ReportingTree {
    pub fn new(root: Employee) -> Self {
        let root_id = root.employee_id.clone();
        let mut nodes = HashMap::new();
        nodes.insert(root_id.clone(), root);
        Self { root_id, nodes }
    }

    pub fn insert(&mut self, employee: Employee) {
        self.nodes
            .entry(employee.employee_id.clone())
            .or_insert(employee);
    }

    pub fn root(&self) -> &Employee {
        &self.nodes[&self.root_id]
    }

    pub fn get(&self, employee_id: &str) -> Option<&Employee> {
        self.nodes.get(employee_id)
    }

    pub fn contains(&self, employee_id: &str) -> bool {
        self.nodes.contains_key(employee_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Loaded direct reports of `employee_id`, in their stored order.
    pub fn children<'a>(&'a self, employee_id: &str) -> impl Iterator<Item = &'a Employee> + 'a {
        self.nodes
            .get(employee_id)
            .map(|e| e.direct_reports.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|report| self.nodes.get(&report.employee_id))
    }

    /// Nested rendering of the loaded subtree. Nodes already rendered on the
    /// current path are not expanded again.
    pub fn to_node(&self) -> ReportingNode {
        let mut path = HashSet::new();
        self.render(&self.root_id, &mut path)
    }

    fn render(&self, employee_id: &str, path: &mut HashSet<String>) -> ReportingNode {
        let employee = &self.nodes[employee_id];
        path.insert(employee_id.to_string());

        let child_ids: Vec<String> = self
            .children(employee_id)
            .filter(|child| !path.contains(&child.employee_id))
            .map(|child| child.employee_id.clone())
            .collect();
        let direct_reports = child_ids
            .iter()
            .map(|child_id| self.render(child_id, path))
            .collect();

        path.remove(employee_id);

        ReportingNode {
            employee_id: employee.employee_id.clone(),
            first_name: employee.first_name.clone(),
            last_name: employee.last_name.clone(),
            position: employee.position.clone(),
            department: employee.department.clone(),
            direct_reports,
        }
    }
}

/// An employee with its loaded subordinates nested in place.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportingNode {
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    pub position: String,
    pub department: String,
    #[schema(no_recursion)]
    pub direct_reports: Vec<ReportingNode>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportingStructure {
    pub employee: ReportingNode,
    #[schema(example = 4)]
    pub number_of_reports: usize,
}
