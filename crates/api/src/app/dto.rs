use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use serde_json::json;

use bizdesk_core::{ItemId, UserId};
use bizdesk_infra::directory::Member;
use bizdesk_infra::inventory::{CreatedItem, InventorySummary, ItemFilter, ReturnedItem};
use bizdesk_inventory::{
    Assignment, Attributes, Category, InventoryItem, ItemPatch, ItemStatus, NewItem,
};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub attributes: Attributes,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_price: Option<u64>,
    pub notes: Option<String>,
    /// Users to hand the item to right away.
    #[serde(default)]
    pub assign_to: Vec<UserId>,
    pub assignment_note: Option<String>,
}

impl CreateItemRequest {
    pub fn into_parts(self) -> (NewItem, Vec<UserId>, Option<String>) {
        let item = NewItem {
            name: self.name,
            category: self.category,
            attributes: self.attributes,
            purchase_date: self.purchase_date,
            purchase_price: self.purchase_price,
            notes: self.notes,
        };
        (item, self.assign_to, self.assignment_note)
    }
}

#[derive(Debug, Deserialize)]
pub struct AssignItemRequest {
    pub user_id: UserId,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReturnItemRequest {
    pub item_id: ItemId,
    pub return_note: Option<String>,
}

/// Partial update. For the optional fields, a missing key keeps the value and
/// an explicit `null` clears it.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub category: Option<Category>,
    pub status: Option<ItemStatus>,
    pub attributes: Option<Attributes>,
    #[serde(default, deserialize_with = "double_option")]
    pub purchase_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub purchase_price: Option<Option<u64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

impl From<UpdateItemRequest> for ItemPatch {
    fn from(req: UpdateItemRequest) -> Self {
        ItemPatch {
            name: req.name,
            category: req.category,
            status: req.status,
            attributes: req.attributes,
            purchase_date: req.purchase_date.into(),
            purchase_price: req.purchase_price.into(),
            notes: req.notes.into(),
        }
    }
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemListQuery {
    pub category: Option<String>,
    pub status: Option<String>,
}

impl ItemListQuery {
    pub fn into_filter(self) -> Result<ItemFilter, axum::response::Response> {
        let category = match self.category.as_deref().filter(|s| !s.is_empty()) {
            Some(raw) => Some(raw.parse::<Category>().map_err(errors::domain_error_to_response)?),
            None => None,
        };
        let status = match self.status.as_deref().filter(|s| !s.is_empty()) {
            Some(raw) => Some(raw.parse::<ItemStatus>().map_err(errors::domain_error_to_response)?),
            None => None,
        };
        Ok(ItemFilter { category, status })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AssignmentListQuery {
    #[serde(default)]
    pub include_returned: bool,
}

// -------------------------
// Response mapping
// -------------------------

pub fn item_to_json(item: &InventoryItem) -> serde_json::Value {
    json!({
        "id": item.id.to_string(),
        "name": item.name,
        "category": item.category.as_str(),
        "status": item.status.as_str(),
        "attributes": item.attributes,
        "purchase_date": item.purchase_date,
        "purchase_price": item.purchase_price,
        "notes": item.notes,
        "created_at": item.created_at.to_rfc3339(),
        "created_by": {
            "user_id": item.created_by.user_id.to_string(),
            "display_name": item.created_by.display_name,
        },
    })
}

pub fn assignment_to_json(a: &Assignment) -> serde_json::Value {
    json!({
        "id": a.id.to_string(),
        "item": {
            "id": a.item.item_id.to_string(),
            "name": a.item.name,
            "category": a.item.category.as_str(),
        },
        "assigned_to": {
            "user_id": a.assigned_to.user_id.to_string(),
            "display_name": a.assigned_to.display_name,
        },
        "assigned_by": {
            "user_id": a.assigned_by.user_id.to_string(),
            "display_name": a.assigned_by.display_name,
        },
        "assigned_at": a.assigned_at.to_rfc3339(),
        "returned_at": a.returned_at.map(|t| t.to_rfc3339()),
        "status": a.status.as_str(),
        "notes": a.notes,
        "return_notes": a.return_notes,
    })
}

pub fn assignments_to_json(assignments: &[Assignment]) -> serde_json::Value {
    json!({
        "count": assignments.len(),
        "assignments": assignments.iter().map(assignment_to_json).collect::<Vec<_>>(),
    })
}

pub fn created_to_json(created: &CreatedItem) -> serde_json::Value {
    json!({
        "item": item_to_json(&created.item),
        "assignments": created.assignments.iter().map(assignment_to_json).collect::<Vec<_>>(),
    })
}

pub fn returned_to_json(returned: &ReturnedItem) -> serde_json::Value {
    json!({
        "assignment": assignment_to_json(&returned.assignment),
        "item": returned.item.as_ref().map(item_to_json),
    })
}

pub fn summary_to_json(summary: &InventorySummary) -> serde_json::Value {
    json!({
        "total_items": summary.total_items,
        "available": summary.available,
        "assigned": summary.assigned,
        "maintenance": summary.maintenance,
        "retired": summary.retired,
        "active_assignments": summary.active_assignments,
    })
}

pub fn member_to_json(member: &Member) -> serde_json::Value {
    json!({
        "user_id": member.user_id.to_string(),
        "display_name": member.display_name,
        "role": member.role.as_str(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizdesk_inventory::Patch;

    #[test]
    fn update_distinguishes_missing_from_null() {
        let req: UpdateItemRequest =
            serde_json::from_str(r#"{"notes": null, "purchase_price": 1200}"#).unwrap();
        let patch = ItemPatch::from(req);
        assert_eq!(patch.notes, Patch::Clear);
        assert_eq!(patch.purchase_price, Patch::Set(1200));
        assert_eq!(patch.purchase_date, Patch::Keep);
        assert!(patch.name.is_none());
    }

    #[test]
    fn list_query_parses_case_insensitively() {
        let q = ItemListQuery {
            category: Some("Electronics".into()),
            status: Some("ASSIGNED".into()),
        };
        let filter = q.into_filter().unwrap();
        assert_eq!(filter.category, Some(Category::Electronics));
        assert_eq!(filter.status, Some(ItemStatus::Assigned));
    }

    #[test]
    fn list_query_rejects_unknown_values() {
        let q = ItemListQuery {
            category: Some("spaceship".into()),
            status: None,
        };
        assert!(q.into_filter().is_err());
    }

    #[test]
    fn create_request_defaults_to_no_assignees() {
        let req: CreateItemRequest =
            serde_json::from_str(r#"{"name": "Desk", "category": "furniture"}"#).unwrap();
        let (item, assignees, note) = req.into_parts();
        assert_eq!(item.category, Category::Furniture);
        assert!(assignees.is_empty());
        assert!(note.is_none());
    }
}
