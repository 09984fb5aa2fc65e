use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use super::{create_in, delete_in, trimmed, update_in};
use crate::backend::RealtimeStore;
use crate::error::{Error, Result};
use crate::listener::LiveCollection;
use crate::model::Employee;

pub const EMPLOYEES_PATH: &str = "employees";

/// Form input for creating or editing an employee.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDraft {
    pub name: String,
    pub start_year: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub department: Option<String>,
}

impl EmployeeDraft {
    pub fn new(
        name: impl Into<String>,
        start_year: impl Into<String>,
        start_date: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            start_year: start_year.into(),
            start_date: start_date.into(),
            ..Self::default()
        }
    }

    pub fn with_end_date(mut self, end_date: impl Into<String>) -> Self {
        self.end_date = Some(end_date.into());
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    /// Trims every field and checks the required ones.
    ///
    /// Blank optional fields become `None`, which clears them on update.
    pub fn validated(&self) -> Result<Self> {
        let missing =
            || Error::Validation("Nome, ano de entrada e data de início são obrigatórios.".into());
        Ok(Self {
            name: trimmed(&self.name).ok_or_else(missing)?,
            start_year: trimmed(&self.start_year).ok_or_else(missing)?,
            start_date: trimmed(&self.start_date).ok_or_else(missing)?,
            end_date: self.end_date.as_deref().and_then(trimmed),
            department: self.department.as_deref().and_then(trimmed),
        })
    }
}

/// The live employee roster, sorted by name.
pub struct Employees {
    collection: LiveCollection<Employee>,
}

impl Employees {
    pub async fn open(store: Arc<dyn RealtimeStore>) -> Self {
        Self {
            collection: LiveCollection::open(store, Some(EMPLOYEES_PATH)).await,
        }
    }

    pub fn collection(&self) -> &LiveCollection<Employee> {
        &self.collection
    }

    pub fn items(&self) -> Vec<Employee> {
        self.collection.items()
    }

    pub fn total(&self) -> usize {
        self.collection.len()
    }

    /// Employees grouped by department, each group in roster order.
    pub fn by_department(&self) -> BTreeMap<String, Vec<Employee>> {
        let mut groups: BTreeMap<String, Vec<Employee>> = BTreeMap::new();
        for employee in self.collection.items() {
            groups
                .entry(employee.department_or_default().to_string())
                .or_default()
                .push(employee);
        }
        groups
    }

    pub async fn create(&self, draft: &EmployeeDraft) -> Result<String> {
        create_in(&self.collection, &draft.validated()?).await
    }

    pub async fn update(&self, id: &str, draft: &EmployeeDraft) -> Result<()> {
        update_in(&self.collection, id, &draft.validated()?).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        delete_in(&self.collection, id).await
    }
}
