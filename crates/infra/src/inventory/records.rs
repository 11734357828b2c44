//! Document shapes of inventory items and assignments.
//!
//! Field names are camelCase and timestamps are epoch milliseconds so that
//! `createdAt`/`assignedAt` order numerically in every backend. Optional item
//! fields are omitted when empty; assignment `returnedAt`/notes are kept as
//! explicit nulls.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use bizdesk_core::{AssignmentId, CompanyId, ItemId, UserId};
use bizdesk_inventory::{
    Assignment, AssignmentStatus, Attributes, Category, InventoryItem, ItemRef, ItemStatus,
    UserRef,
};

use crate::document_store::{Document, DocumentId, Fields};

use super::InventoryError;

pub(crate) mod field {
    pub const COMPANY_ID: &str = "companyId";
    pub const CATEGORY: &str = "category";
    pub const STATUS: &str = "status";
    pub const CREATED_AT: &str = "createdAt";
    pub const ITEM_ID: &str = "itemId";
    pub const ASSIGNED_TO: &str = "assignedTo";
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemRecord {
    company_id: CompanyId,
    name: String,
    category: Category,
    status: ItemStatus,
    #[serde(default)]
    attributes: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    purchase_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    purchase_price: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    created_at: DateTime<Utc>,
    created_by: UserId,
    created_by_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssignmentRecord {
    company_id: CompanyId,
    item_id: ItemId,
    item_name: String,
    item_category: Category,
    assigned_to: UserId,
    assigned_to_name: String,
    assigned_by: UserId,
    assigned_by_name: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    assigned_at: DateTime<Utc>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    returned_at: Option<DateTime<Utc>>,
    status: AssignmentStatus,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    return_notes: Option<String>,
}

pub(crate) fn item_doc_id(id: ItemId) -> DocumentId {
    DocumentId::from(*id.as_uuid())
}

pub(crate) fn assignment_doc_id(id: AssignmentId) -> DocumentId {
    DocumentId::from(*id.as_uuid())
}

/// Truncate to what the document can hold (milliseconds).
pub(crate) fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

pub(crate) fn item_to_fields(item: &InventoryItem) -> Result<Fields, InventoryError> {
    to_fields(&ItemRecord {
        company_id: item.company_id,
        name: item.name.clone(),
        category: item.category,
        status: item.status,
        attributes: item.attributes.clone(),
        purchase_date: item.purchase_date,
        purchase_price: item.purchase_price,
        notes: item.notes.clone(),
        created_at: item.created_at,
        created_by: item.created_by.user_id,
        created_by_name: item.created_by.display_name.clone(),
    })
}

pub(crate) fn item_from_document(doc: Document) -> Result<InventoryItem, InventoryError> {
    let id: ItemId = parse_id(&doc.id)?;
    let r: ItemRecord = from_fields(&doc.id, doc.fields)?;
    Ok(InventoryItem {
        id,
        company_id: r.company_id,
        name: r.name,
        category: r.category,
        status: r.status,
        attributes: r.attributes,
        purchase_date: r.purchase_date,
        purchase_price: r.purchase_price,
        notes: r.notes,
        created_at: r.created_at,
        created_by: UserRef::new(r.created_by, r.created_by_name),
    })
}

pub(crate) fn assignment_to_fields(a: &Assignment) -> Result<Fields, InventoryError> {
    to_fields(&AssignmentRecord {
        company_id: a.company_id,
        item_id: a.item.item_id,
        item_name: a.item.name.clone(),
        item_category: a.item.category,
        assigned_to: a.assigned_to.user_id,
        assigned_to_name: a.assigned_to.display_name.clone(),
        assigned_by: a.assigned_by.user_id,
        assigned_by_name: a.assigned_by.display_name.clone(),
        assigned_at: a.assigned_at,
        returned_at: a.returned_at,
        status: a.status,
        notes: a.notes.clone(),
        return_notes: a.return_notes.clone(),
    })
}

pub(crate) fn assignment_from_document(doc: Document) -> Result<Assignment, InventoryError> {
    let id: AssignmentId = parse_id(&doc.id)?;
    let r: AssignmentRecord = from_fields(&doc.id, doc.fields)?;
    Ok(Assignment {
        id,
        company_id: r.company_id,
        item: ItemRef {
            item_id: r.item_id,
            name: r.item_name,
            category: r.item_category,
        },
        assigned_to: UserRef::new(r.assigned_to, r.assigned_to_name),
        assigned_by: UserRef::new(r.assigned_by, r.assigned_by_name),
        assigned_at: r.assigned_at,
        returned_at: r.returned_at,
        status: r.status,
        notes: r.notes,
        return_notes: r.return_notes,
    })
}

/// JSON value of an id/enum as stored, for equality filters.
pub(crate) fn filter_value<T: Serialize>(value: &T) -> Result<JsonValue, InventoryError> {
    serde_json::to_value(value).map_err(|e| InventoryError::Decode(e.to_string()))
}

fn to_fields<T: Serialize>(record: &T) -> Result<Fields, InventoryError> {
    match serde_json::to_value(record) {
        Ok(JsonValue::Object(map)) => Ok(map),
        Ok(other) => Err(InventoryError::Decode(format!(
            "record serialized to a non-object: {other}"
        ))),
        Err(e) => Err(InventoryError::Decode(e.to_string())),
    }
}

fn from_fields<T: DeserializeOwned>(id: &DocumentId, fields: Fields) -> Result<T, InventoryError> {
    serde_json::from_value(JsonValue::Object(fields))
        .map_err(|e| InventoryError::Decode(format!("document {id}: {e}")))
}

fn parse_id<T>(id: &DocumentId) -> Result<T, InventoryError>
where
    T: core::str::FromStr<Err = bizdesk_core::DomainError>,
{
    id.as_str()
        .parse()
        .map_err(|e| InventoryError::Decode(format!("document {id}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizdesk_inventory::NewItem;

    fn sample_item() -> InventoryItem {
        let mut new = NewItem::new("Company Van", Category::Vehicle)
            .with_attribute("plate", "B-XY 123")
            .with_attribute("vin", "WVWZZZ1JZXW000001");
        new.purchase_price = Some(3_200_000);
        InventoryItem::create(
            ItemId::new(),
            CompanyId::new(),
            new,
            UserRef::new(UserId::new(), "Fleet Admin"),
            0,
            now_millis(),
        )
        .unwrap()
    }

    #[test]
    fn item_document_uses_camel_case_and_millis() {
        let item = sample_item();
        let fields = item_to_fields(&item).unwrap();
        assert_eq!(fields["companyId"], JsonValue::String(item.company_id.to_string()));
        assert_eq!(fields["createdAt"], JsonValue::from(item.created_at.timestamp_millis()));
        assert_eq!(fields["status"], JsonValue::String("available".to_string()));
        assert!(!fields.contains_key("notes"));
        assert!(!fields.contains_key("purchaseDate"));
    }

    #[test]
    fn item_survives_document_mapping() {
        let item = sample_item();
        let doc = Document {
            id: item_doc_id(item.id),
            fields: item_to_fields(&item).unwrap(),
        };
        assert_eq!(item_from_document(doc).unwrap(), item);
    }

    #[test]
    fn active_assignment_stores_null_return() {
        let item = sample_item();
        let a = Assignment::open(
            AssignmentId::new(),
            item.company_id,
            item.item_ref(),
            UserRef::new(UserId::new(), "Driver"),
            item.created_by.clone(),
            None,
            now_millis(),
        );
        let fields = assignment_to_fields(&a).unwrap();
        assert_eq!(fields["returnedAt"], JsonValue::Null);
        assert_eq!(fields["status"], JsonValue::String("active".to_string()));

        let doc = Document {
            id: assignment_doc_id(a.id),
            fields,
        };
        assert_eq!(assignment_from_document(doc).unwrap(), a);
    }

    #[test]
    fn malformed_document_is_a_decode_error() {
        let doc = Document {
            id: DocumentId::new("not-a-uuid"),
            fields: Fields::new(),
        };
        assert!(matches!(item_from_document(doc), Err(InventoryError::Decode(_))));
    }
}
