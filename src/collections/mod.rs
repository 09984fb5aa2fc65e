//! Typed collections over the live listener: the employee roster, footer
//! news and newsletters, each with validated mutators.

mod employees;
mod news;
mod newsletters;

pub use employees::{EmployeeDraft, Employees, EMPLOYEES_PATH};
pub use news::{News, NewsDraft, NEWS_PATH};
pub use newsletters::{
    IssueDraft, NewsletterBoard, NewsletterDraft, NewsletterEdit, Newsletters, NEWSLETTERS_PATH,
};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::listener::LiveCollection;
use crate::model::{now_iso, Entity};

/// Trims `value`, returning `None` when nothing is left.
pub(crate) fn trimmed(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Serializes a validated draft into the fields it writes.
pub(crate) fn fields_of<D: Serialize>(draft: &D) -> Result<Map<String, Value>> {
    match serde_json::to_value(draft) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(Error::Mutation(format!("payload is not an object: {other}"))),
        Err(e) => Err(Error::Mutation(e.to_string())),
    }
}

/// Record body for a create: the draft plus both timestamps.
pub(crate) fn created(mut fields: Map<String, Value>) -> Value {
    let now = now_iso();
    fields.insert("createdAt".into(), Value::String(now.clone()));
    fields.insert("updatedAt".into(), Value::String(now));
    Value::Object(fields)
}

/// Patch for an update: the draft plus a fresh `updatedAt`.
///
/// Every draft field is written, so the last update wins as a whole.
pub(crate) fn updated(mut fields: Map<String, Value>) -> Map<String, Value> {
    fields.insert("updatedAt".into(), Value::String(now_iso()));
    fields
}

pub(crate) async fn create_in<T: Entity, D: Serialize>(
    collection: &LiveCollection<T>,
    draft: &D,
) -> Result<String> {
    collection.push_entry(created(fields_of(draft)?)).await
}

pub(crate) async fn update_in<T: Entity, D: Serialize>(
    collection: &LiveCollection<T>,
    id: &str,
    draft: &D,
) -> Result<()> {
    if id.trim().is_empty() {
        return Err(Error::Validation("Registo sem identificador.".into()));
    }
    collection.patch_entry(id, updated(fields_of(draft)?)).await
}

pub(crate) async fn delete_in<T: Entity>(collection: &LiveCollection<T>, id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(Error::Validation("Registo sem identificador.".into()));
    }
    collection.remove_entry(id).await
}
