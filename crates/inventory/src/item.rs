use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use bizdesk_core::{CompanyId, CompanyScoped, DomainError, Entity, ItemId, UserId};

use crate::assignment::ItemRef;
use crate::category::{Attributes, Category};
use crate::normalize_note;

/// Reference to a user, denormalized with the display name for audit/display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub user_id: UserId,
    pub display_name: String,
}

impl UserRef {
    pub fn new(user_id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
        }
    }
}

/// Item status.
///
/// `Assigned` is derived from the item's active assignments. `Maintenance` and
/// `Retired` are administrative and only change through an explicit item update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Available,
    Assigned,
    Maintenance,
    Retired,
}

impl ItemStatus {
    pub const ALL: [ItemStatus; 4] = [
        ItemStatus::Available,
        ItemStatus::Assigned,
        ItemStatus::Maintenance,
        ItemStatus::Retired,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Available => "available",
            ItemStatus::Assigned => "assigned",
            ItemStatus::Maintenance => "maintenance",
            ItemStatus::Retired => "retired",
        }
    }

    pub fn is_administrative(self) -> bool {
        matches!(self, ItemStatus::Maintenance | ItemStatus::Retired)
    }

    /// Items under maintenance or retired cannot be handed out.
    pub fn is_assignable(self) -> bool {
        !self.is_administrative()
    }

    /// Status the item should have given its number of active assignments.
    ///
    /// Administrative statuses are kept as they are.
    pub fn reconcile(self, active_assignments: usize) -> ItemStatus {
        if self.is_administrative() {
            self
        } else if active_assignments > 0 {
            ItemStatus::Assigned
        } else {
            ItemStatus::Available
        }
    }
}

impl core::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for ItemStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| {
                DomainError::validation(
                    "status must be one of: available, assigned, maintenance, retired",
                )
            })
    }
}

/// Input for creating an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub attributes: Attributes,
    pub purchase_date: Option<NaiveDate>,
    /// Price in smallest currency unit (e.g., cents).
    pub purchase_price: Option<u64>,
    pub notes: Option<String>,
}

impl NewItem {
    pub fn new(name: impl Into<String>, category: Category) -> Self {
        Self {
            name: name.into(),
            category,
            attributes: Attributes::new(),
            purchase_date: None,
            purchase_price: None,
            notes: None,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        self.category.validate_attributes(&self.attributes)
    }
}

/// Field update for optional fields: leave untouched, set, or remove.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    #[default]
    Keep,
    Set(T),
    Clear,
}

impl<T> Patch<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, Patch::Keep)
    }

    fn apply_to(self, slot: &mut Option<T>) {
        match self {
            Patch::Keep => {}
            Patch::Set(v) => *slot = Some(v),
            Patch::Clear => *slot = None,
        }
    }
}

/// `None` = keep, `Some(None)` = clear, `Some(Some(v))` = set.
impl<T> From<Option<Option<T>>> for Patch<T> {
    fn from(value: Option<Option<T>>) -> Self {
        match value {
            None => Patch::Keep,
            Some(None) => Patch::Clear,
            Some(Some(v)) => Patch::Set(v),
        }
    }
}

/// Partial update of an item.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub category: Option<Category>,
    pub status: Option<ItemStatus>,
    pub attributes: Option<Attributes>,
    pub purchase_date: Patch<NaiveDate>,
    pub purchase_price: Patch<u64>,
    pub notes: Patch<String>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.status.is_none()
            && self.attributes.is_none()
            && self.purchase_date.is_keep()
            && self.purchase_price.is_keep()
            && self.notes.is_keep()
    }
}

/// Entity: InventoryItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: ItemId,
    pub company_id: CompanyId,
    pub name: String,
    pub category: Category,
    pub status: ItemStatus,
    pub attributes: Attributes,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_price: Option<u64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: UserRef,
}

impl Entity for InventoryItem {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl CompanyScoped for InventoryItem {
    fn company_id(&self) -> CompanyId {
        self.company_id
    }
}

impl InventoryItem {
    /// Build a new item. Status is `assigned` when it is created together
    /// with at least one assignee, `available` otherwise.
    pub fn create(
        id: ItemId,
        company_id: CompanyId,
        new: NewItem,
        created_by: UserRef,
        assignee_count: usize,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        new.validate()?;
        Ok(Self {
            id,
            company_id,
            name: new.name.trim().to_string(),
            category: new.category,
            status: ItemStatus::Available.reconcile(assignee_count),
            attributes: new.attributes,
            purchase_date: new.purchase_date,
            purchase_price: new.purchase_price,
            notes: normalize_note(new.notes),
            created_at: now,
            created_by,
        })
    }

    pub fn item_ref(&self) -> ItemRef {
        ItemRef {
            item_id: self.id,
            name: self.name.clone(),
            category: self.category,
        }
    }

    /// Check the item can be handed out and flip it to `assigned`.
    pub fn mark_assigned(&mut self) -> Result<(), DomainError> {
        if !self.status.is_assignable() {
            return Err(DomainError::invariant(format!(
                "item is {} and cannot be assigned",
                self.status
            )));
        }
        self.status = ItemStatus::Assigned;
        Ok(())
    }

    /// Recompute status from the number of still-active assignments.
    pub fn reconcile_status(&mut self, active_assignments: usize) {
        self.status = self.status.reconcile(active_assignments);
    }

    /// Apply an administrative patch.
    ///
    /// `assigned` can never be set directly. `available`, `maintenance` and
    /// `retired` only when no assignment is active, so an item with a holder
    /// is always `assigned`. Attribute keys are re-validated against the
    /// (possibly new) category.
    pub fn apply_patch(
        &mut self,
        patch: ItemPatch,
        active_assignments: usize,
    ) -> Result<(), DomainError> {
        if patch.is_empty() {
            return Err(DomainError::validation("patch contains no changes"));
        }

        let mut next = self.clone();

        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("name cannot be empty"));
            }
            next.name = name.trim().to_string();
        }
        if let Some(category) = patch.category {
            next.category = category;
        }
        if let Some(attributes) = patch.attributes {
            next.attributes = attributes;
        }
        next.category.validate_attributes(&next.attributes)?;

        if let Some(status) = patch.status {
            match status {
                ItemStatus::Assigned => {
                    return Err(DomainError::validation(
                        "status 'assigned' is set by assigning the item",
                    ));
                }
                ItemStatus::Available if active_assignments > 0 => {
                    return Err(DomainError::invariant(format!(
                        "item has {active_assignments} active assignment(s) and cannot be marked available"
                    )));
                }
                ItemStatus::Available => next.status = ItemStatus::Available,
                ItemStatus::Maintenance | ItemStatus::Retired if active_assignments > 0 => {
                    return Err(DomainError::invariant(format!(
                        "item has {active_assignments} active assignment(s); return it before marking it {status}"
                    )));
                }
                ItemStatus::Maintenance | ItemStatus::Retired => next.status = status,
            }
        }

        patch.purchase_date.apply_to(&mut next.purchase_date);
        patch.purchase_price.apply_to(&mut next.purchase_price);
        match patch.notes {
            Patch::Set(n) => next.notes = normalize_note(Some(n)),
            other => other.apply_to(&mut next.notes),
        }

        *self = next;
        Ok(())
    }
}
