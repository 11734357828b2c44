use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bizdesk_core::{AssignmentId, CompanyId, CompanyScoped, DomainError, Entity, ItemId, UserId};

use crate::category::Category;
use crate::item::UserRef;
use crate::normalize_note;

/// Denormalized item reference carried by every assignment (for display).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    pub item_id: ItemId,
    pub name: String,
    pub category: Category,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Active,
    Returned,
}

impl AssignmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignmentStatus::Active => "active",
            AssignmentStatus::Returned => "returned",
        }
    }
}

impl core::fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One item held by one user over a time interval.
///
/// Created active, closed exactly once on return, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub company_id: CompanyId,
    pub item: ItemRef,
    pub assigned_to: UserRef,
    pub assigned_by: UserRef,
    pub assigned_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: AssignmentStatus,
    pub notes: Option<String>,
    pub return_notes: Option<String>,
}

impl Entity for Assignment {
    type Id = AssignmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl CompanyScoped for Assignment {
    fn company_id(&self) -> CompanyId {
        self.company_id
    }
}

impl Assignment {
    pub fn open(
        id: AssignmentId,
        company_id: CompanyId,
        item: ItemRef,
        assigned_to: UserRef,
        assigned_by: UserRef,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            company_id,
            item,
            assigned_to,
            assigned_by,
            assigned_at: now,
            returned_at: None,
            status: AssignmentStatus::Active,
            notes: normalize_note(notes),
            return_notes: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AssignmentStatus::Active
    }

    /// Close the assignment. Fails with a conflict if it was already returned.
    pub fn close(
        &mut self,
        now: DateTime<Utc>,
        return_notes: Option<String>,
    ) -> Result<(), DomainError> {
        if !self.is_active() {
            return Err(DomainError::conflict(format!(
                "assignment {} was already returned",
                self.id
            )));
        }
        self.status = AssignmentStatus::Returned;
        self.returned_at = Some(now);
        self.return_notes = normalize_note(return_notes);
        Ok(())
    }
}

pub fn count_active<'a>(assignments: impl IntoIterator<Item = &'a Assignment>) -> usize {
    assignments.into_iter().filter(|a| a.is_active()).count()
}

/// Newest assignment first; ties broken by id so the order is stable.
pub fn sort_newest_first(assignments: &mut [Assignment]) {
    assignments.sort_by(|a, b| {
        b.assigned_at
            .cmp(&a.assigned_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

pub fn ensure_distinct_assignees(assignees: &[UserId]) -> Result<(), DomainError> {
    let mut seen = HashSet::with_capacity(assignees.len());
    for user_id in assignees {
        if !seen.insert(*user_id) {
            return Err(DomainError::validation(format!(
                "user {user_id} is listed more than once"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn item_ref() -> ItemRef {
        ItemRef {
            item_id: ItemId::new(),
            name: "Forklift".to_string(),
            category: Category::Equipment,
        }
    }

    fn open_at(at: DateTime<Utc>) -> Assignment {
        Assignment::open(
            AssignmentId::new(),
            CompanyId::new(),
            item_ref(),
            UserRef::new(UserId::new(), "Dana"),
            UserRef::new(UserId::new(), "Sam"),
            Some("for the warehouse shift".to_string()),
            at,
        )
    }

    #[test]
    fn open_assignment_is_active_without_return() {
        let a = open_at(Utc::now());
        assert!(a.is_active());
        assert_eq!(a.returned_at, None);
        assert_eq!(a.return_notes, None);
    }

    #[test]
    fn close_sets_timestamp_and_note() {
        let mut a = open_at(Utc::now());
        let now = Utc::now();
        a.close(now, Some(" scratched lid ".to_string())).unwrap();
        assert_eq!(a.status, AssignmentStatus::Returned);
        assert_eq!(a.returned_at, Some(now));
        assert_eq!(a.return_notes.as_deref(), Some("scratched lid"));
    }

    #[test]
    fn close_twice_is_a_conflict() {
        let mut a = open_at(Utc::now());
        a.close(Utc::now(), None).unwrap();
        let before = a.clone();
        assert!(matches!(a.close(Utc::now(), None), Err(DomainError::Conflict(_))));
        assert_eq!(a, before);
    }

    #[test]
    fn sorts_newest_first() {
        let t0 = Utc::now();
        let mut list = vec![
            open_at(t0),
            open_at(t0 + Duration::minutes(5)),
            open_at(t0 - Duration::minutes(5)),
        ];
        sort_newest_first(&mut list);
        assert!(list.windows(2).all(|w| w[0].assigned_at >= w[1].assigned_at));
    }

    #[test]
    fn counts_only_active() {
        let mut returned = open_at(Utc::now());
        returned.close(Utc::now(), None).unwrap();
        let list = vec![open_at(Utc::now()), returned, open_at(Utc::now())];
        assert_eq!(count_active(&list), 2);
    }

    #[test]
    fn duplicate_assignees_are_rejected() {
        let u = UserId::new();
        assert!(ensure_distinct_assignees(&[u, UserId::new()]).is_ok());
        assert!(ensure_distinct_assignees(&[u, u]).is_err());
    }
}
