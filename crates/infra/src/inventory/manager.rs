use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use bizdesk_auth::Actor;
use bizdesk_core::{AssignmentId, CompanyScoped, DomainError, ItemId, UserId};
use bizdesk_inventory::{
    Assignment, AssignmentStatus, Category, InventoryItem, ItemPatch, ItemStatus, NewItem,
    UserRef, count_active, ensure_distinct_assignees, sort_newest_first,
};

use crate::directory::{Member, MembershipDirectory};
use crate::document_store::{
    Direction, DocumentStore, FieldPatch, Query, WriteBatch, collections,
};

use super::InventoryError;
use super::records::{
    assignment_doc_id, assignment_from_document, assignment_to_fields, field,
    filter_value, item_doc_id, item_from_document, item_to_fields, now_millis,
};

/// Optional equality filters for item listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemFilter {
    pub category: Option<Category>,
    pub status: Option<ItemStatus>,
}

/// Result of `create_item_with_assignments`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedItem {
    pub item: InventoryItem,
    pub assignments: Vec<Assignment>,
}

/// Result of `return_item`. `item` is `None` when the item was deleted meanwhile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnedItem {
    pub assignment: Assignment,
    pub item: Option<InventoryItem>,
}

/// Item counts per status for one company.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InventorySummary {
    pub total_items: usize,
    pub available: usize,
    pub assigned: usize,
    pub maintenance: usize,
    pub retired: usize,
    pub active_assignments: usize,
}

/// Inventory/assignment manager.
///
/// Every operation takes the acting user explicitly and is scoped to the
/// actor's company: records of other companies read as not found. Operations
/// that write more than one document do so through a single `WriteBatch`, so
/// an item and its assignments never end up half-written.
///
/// There is no locking across calls. Two concurrent `assign_item` calls for the
/// same item both succeed and leave two active assignments, which the data
/// model allows.
#[derive(Clone)]
pub struct InventoryManager {
    store: Arc<dyn DocumentStore>,
    directory: Arc<dyn MembershipDirectory>,
}

impl InventoryManager {
    pub fn new(store: Arc<dyn DocumentStore>, directory: Arc<dyn MembershipDirectory>) -> Self {
        Self { store, directory }
    }

    /// Create an item and hand it to `assignees` in one atomic write.
    ///
    /// The item starts `assigned` when there is at least one assignee,
    /// `available` otherwise. Every assignee must be a member of the actor's
    /// company and appear only once.
    #[instrument(
        skip(self, actor, new_item, assignees, note),
        fields(company_id = %actor.company_id, assignees = assignees.len()),
        err
    )]
    pub async fn create_item_with_assignments(
        &self,
        actor: &Actor,
        new_item: NewItem,
        assignees: &[UserId],
        note: Option<String>,
    ) -> Result<CreatedItem, InventoryError> {
        new_item.validate()?;
        ensure_distinct_assignees(assignees)?;

        let mut holders = Vec::with_capacity(assignees.len());
        for user_id in assignees {
            holders.push(self.resolve_assignee(actor, *user_id).await?);
        }

        let now = now_millis();
        let item = InventoryItem::create(
            ItemId::new(),
            actor.company_id,
            new_item,
            actor_ref(actor),
            holders.len(),
            now,
        )?;

        let assignments: Vec<Assignment> = holders
            .into_iter()
            .map(|holder| {
                Assignment::open(
                    AssignmentId::new(),
                    actor.company_id,
                    item.item_ref(),
                    holder,
                    actor_ref(actor),
                    note.clone(),
                    now,
                )
            })
            .collect();

        let mut batch = WriteBatch::new();
        batch.insert(collections::INVENTORY_ITEMS, item_doc_id(item.id), item_to_fields(&item)?);
        for a in &assignments {
            batch.insert(collections::ASSIGNMENTS, assignment_doc_id(a.id), assignment_to_fields(a)?);
        }
        self.store.commit(batch).await?;

        info!(item_id = %item.id, status = %item.status, "inventory item created");
        Ok(CreatedItem { item, assignments })
    }

    /// Hand an existing item to one more user.
    ///
    /// Items under maintenance or retired are rejected, as is a second active
    /// assignment of the same item to the same user.
    #[instrument(
        skip(self, actor, note),
        fields(company_id = %actor.company_id, item_id = %item_id, assignee = %assignee),
        err
    )]
    pub async fn assign_item(
        &self,
        actor: &Actor,
        item_id: ItemId,
        assignee: UserId,
        note: Option<String>,
    ) -> Result<Assignment, InventoryError> {
        let mut item = self.load_item(actor, item_id).await?;
        let holder = self.resolve_assignee(actor, assignee).await?;

        let active = self.get_active_assignments_for_item(actor, item_id).await?;
        if active.iter().any(|a| a.assigned_to.user_id == assignee) {
            return Err(DomainError::conflict(format!(
                "item is already assigned to {}",
                holder.display_name
            ))
            .into());
        }

        let previous = item.status;
        item.mark_assigned()?;

        let assignment = Assignment::open(
            AssignmentId::new(),
            actor.company_id,
            item.item_ref(),
            holder,
            actor_ref(actor),
            note,
            now_millis(),
        );

        let mut batch = WriteBatch::new();
        batch.insert(
            collections::ASSIGNMENTS,
            assignment_doc_id(assignment.id),
            assignment_to_fields(&assignment)?,
        );
        if previous != item.status {
            batch.patch(
                collections::INVENTORY_ITEMS,
                item_doc_id(item.id),
                FieldPatch::new().set(field::STATUS, filter_value(&item.status)?),
            );
        }
        self.store.commit(batch).await?;

        info!(assignment_id = %assignment.id, "inventory item assigned");
        Ok(assignment)
    }

    /// Close one assignment and recompute the item's status from the
    /// assignments that are still active.
    ///
    /// Exactly one assignment is written; a second return of the same
    /// assignment is a conflict and writes nothing.
    #[instrument(
        skip(self, actor, return_note),
        fields(company_id = %actor.company_id, assignment_id = %assignment_id, item_id = %item_id),
        err
    )]
    pub async fn return_item(
        &self,
        actor: &Actor,
        assignment_id: AssignmentId,
        item_id: ItemId,
        return_note: Option<String>,
    ) -> Result<ReturnedItem, InventoryError> {
        let mut assignment = self.load_assignment(actor, assignment_id).await?;
        if assignment.item.item_id != item_id {
            return Err(DomainError::validation(format!(
                "assignment {assignment_id} does not belong to item {item_id}"
            ))
            .into());
        }

        let before = assignment_to_fields(&assignment)?;
        if let Err(e) = assignment.close(now_millis(), return_note) {
            warn!(error = %e, "return rejected");
            return Err(e.into());
        }
        let after = assignment_to_fields(&assignment)?;

        let mut batch = WriteBatch::new();
        batch.patch(
            collections::ASSIGNMENTS,
            assignment_doc_id(assignment.id),
            FieldPatch::diff(&before, &after),
        );

        let item = match self.find_item(actor, item_id).await? {
            Some(mut item) => {
                let remaining = self
                    .get_active_assignments_for_item(actor, item_id)
                    .await?
                    .iter()
                    .filter(|a| a.id != assignment.id)
                    .count();
                let previous = item.status;
                item.reconcile_status(remaining);
                if previous != item.status {
                    batch.patch(
                        collections::INVENTORY_ITEMS,
                        item_doc_id(item.id),
                        FieldPatch::new().set(field::STATUS, filter_value(&item.status)?),
                    );
                }
                Some(item)
            }
            None => {
                warn!("returned assignment refers to a deleted item");
                None
            }
        };

        self.store.commit(batch).await?;

        info!(
            item_status = item.as_ref().map(|i| i.status.as_str()).unwrap_or("deleted"),
            "inventory item returned"
        );
        Ok(ReturnedItem { assignment, item })
    }

    /// Items of the actor's company, newest first.
    pub async fn get_inventory_items(
        &self,
        actor: &Actor,
        filter: ItemFilter,
    ) -> Result<Vec<InventoryItem>, InventoryError> {
        let mut query = Query::collection(collections::INVENTORY_ITEMS)
            .where_eq(field::COMPANY_ID, filter_value(&actor.company_id)?);
        if let Some(category) = filter.category {
            query = query.where_eq(field::CATEGORY, filter_value(&category)?);
        }
        if let Some(status) = filter.status {
            query = query.where_eq(field::STATUS, filter_value(&status)?);
        }
        let query = query.order_by(field::CREATED_AT, Direction::Descending);

        self.store
            .query(&query)
            .await?
            .into_iter()
            .map(item_from_document)
            .collect()
    }

    pub async fn get_inventory_item_by_id(
        &self,
        actor: &Actor,
        item_id: ItemId,
    ) -> Result<Option<InventoryItem>, InventoryError> {
        self.find_item(actor, item_id).await
    }

    /// Every active assignment of the actor's company.
    pub async fn get_active_assignments(
        &self,
        actor: &Actor,
    ) -> Result<Vec<Assignment>, InventoryError> {
        let query = self
            .assignments_query(actor)?
            .where_eq(field::STATUS, filter_value(&AssignmentStatus::Active)?);
        self.query_assignments(&query).await
    }

    /// Assignments held by one user; returned ones only when asked for.
    pub async fn get_user_assignments(
        &self,
        actor: &Actor,
        user_id: UserId,
        include_returned: bool,
    ) -> Result<Vec<Assignment>, InventoryError> {
        let mut query = self
            .assignments_query(actor)?
            .where_eq(field::ASSIGNED_TO, filter_value(&user_id)?);
        if !include_returned {
            query = query.where_eq(field::STATUS, filter_value(&AssignmentStatus::Active)?);
        }
        self.query_assignments(&query).await
    }

    /// Full audit trail of an item, including returned assignments.
    pub async fn get_item_assignment_history(
        &self,
        actor: &Actor,
        item_id: ItemId,
    ) -> Result<Vec<Assignment>, InventoryError> {
        let query = self
            .assignments_query(actor)?
            .where_eq(field::ITEM_ID, filter_value(&item_id)?);
        self.query_assignments(&query).await
    }

    pub async fn get_active_assignments_for_item(
        &self,
        actor: &Actor,
        item_id: ItemId,
    ) -> Result<Vec<Assignment>, InventoryError> {
        let query = self
            .assignments_query(actor)?
            .where_eq(field::ITEM_ID, filter_value(&item_id)?)
            .where_eq(field::STATUS, filter_value(&AssignmentStatus::Active)?);
        self.query_assignments(&query).await
    }

    /// Apply an administrative patch to an item.
    ///
    /// Only fields that actually change are written; cleared optional fields
    /// are removed from the document. A new name or category is copied onto
    /// the item's active assignments in the same batch.
    #[instrument(skip(self, actor, patch), fields(company_id = %actor.company_id, item_id = %item_id), err)]
    pub async fn update_inventory_item(
        &self,
        actor: &Actor,
        item_id: ItemId,
        patch: ItemPatch,
    ) -> Result<InventoryItem, InventoryError> {
        let mut item = self.load_item(actor, item_id).await?;
        let active = self.get_active_assignments_for_item(actor, item_id).await?;

        let before = item_to_fields(&item)?;
        item.apply_patch(patch, count_active(&active))?;
        let after = item_to_fields(&item)?;

        let changes = FieldPatch::diff(&before, &after);
        if changes.is_empty() {
            return Ok(item);
        }

        let mut batch = WriteBatch::new();
        batch.patch(collections::INVENTORY_ITEMS, item_doc_id(item.id), changes);

        let item_ref = item.item_ref();
        let mut refreshed = 0usize;
        for mut assignment in active.into_iter().filter(|a| a.item != item_ref) {
            let before = assignment_to_fields(&assignment)?;
            assignment.item = item_ref.clone();
            let after = assignment_to_fields(&assignment)?;
            batch.patch(
                collections::ASSIGNMENTS,
                assignment_doc_id(assignment.id),
                FieldPatch::diff(&before, &after),
            );
            refreshed += 1;
        }

        self.store.commit(batch).await?;
        info!(status = %item.status, refreshed, "inventory item updated");
        Ok(item)
    }

    /// Delete an item. Its assignments stay in place as the audit trail.
    #[instrument(skip(self, actor), fields(company_id = %actor.company_id, item_id = %item_id), err)]
    pub async fn delete_inventory_item(
        &self,
        actor: &Actor,
        item_id: ItemId,
    ) -> Result<(), InventoryError> {
        let item = self.load_item(actor, item_id).await?;
        let still_active = self.get_active_assignments_for_item(actor, item_id).await?.len();

        self.store
            .delete(collections::INVENTORY_ITEMS, &item_doc_id(item.id))
            .await?;

        if still_active > 0 {
            warn!(still_active, "deleted item still has active assignments");
        }
        info!("inventory item deleted");
        Ok(())
    }

    pub async fn inventory_summary(&self, actor: &Actor) -> Result<InventorySummary, InventoryError> {
        let items = self.get_inventory_items(actor, ItemFilter::default()).await?;
        let active_assignments = self.get_active_assignments(actor).await?.len();

        let mut summary = InventorySummary {
            total_items: items.len(),
            active_assignments,
            ..InventorySummary::default()
        };
        for item in &items {
            match item.status {
                ItemStatus::Available => summary.available += 1,
                ItemStatus::Assigned => summary.assigned += 1,
                ItemStatus::Maintenance => summary.maintenance += 1,
                ItemStatus::Retired => summary.retired += 1,
            }
        }
        Ok(summary)
    }

    /// Members of the actor's company (assignee picker).
    pub async fn list_members(&self, actor: &Actor) -> Result<Vec<Member>, InventoryError> {
        Ok(self.directory.list_members(actor.company_id).await?)
    }

    async fn resolve_assignee(&self, actor: &Actor, user_id: UserId) -> Result<UserRef, InventoryError> {
        match self.directory.get_member(actor.company_id, user_id).await? {
            Some(member) => Ok(UserRef::new(member.user_id, member.display_name)),
            None => Err(DomainError::validation(format!(
                "user {user_id} is not a member of this company"
            ))
            .into()),
        }
    }

    async fn find_item(
        &self,
        actor: &Actor,
        item_id: ItemId,
    ) -> Result<Option<InventoryItem>, InventoryError> {
        let Some(doc) = self
            .store
            .get(collections::INVENTORY_ITEMS, &item_doc_id(item_id))
            .await?
        else {
            return Ok(None);
        };
        let item = item_from_document(doc)?;
        Ok(item.belongs_to(actor.company_id).then_some(item))
    }

    async fn load_item(&self, actor: &Actor, item_id: ItemId) -> Result<InventoryItem, InventoryError> {
        self.find_item(actor, item_id)
            .await?
            .ok_or_else(InventoryError::not_found)
    }

    async fn load_assignment(
        &self,
        actor: &Actor,
        assignment_id: AssignmentId,
    ) -> Result<Assignment, InventoryError> {
        let doc = self
            .store
            .get(collections::ASSIGNMENTS, &assignment_doc_id(assignment_id))
            .await?
            .ok_or_else(InventoryError::not_found)?;
        let assignment = assignment_from_document(doc)?;
        if !assignment.belongs_to(actor.company_id) {
            return Err(InventoryError::not_found());
        }
        Ok(assignment)
    }

    fn assignments_query(&self, actor: &Actor) -> Result<Query, InventoryError> {
        Ok(Query::collection(collections::ASSIGNMENTS)
            .where_eq(field::COMPANY_ID, filter_value(&actor.company_id)?))
    }

    async fn query_assignments(&self, query: &Query) -> Result<Vec<Assignment>, InventoryError> {
        let mut assignments = self
            .store
            .query(query)
            .await?
            .into_iter()
            .map(assignment_from_document)
            .collect::<Result<Vec<_>, _>>()?;
        sort_newest_first(&mut assignments);
        Ok(assignments)
    }
}

fn actor_ref(actor: &Actor) -> UserRef {
    UserRef::new(actor.user_id, actor.display_name.clone())
}
