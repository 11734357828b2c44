//! Membership directory: which users belong to a company, and under what role.
//!
//! Used to populate assignee pickers and to check that an assignee belongs to
//! the actor's company before an item is handed out.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use bizdesk_auth::Role;
use bizdesk_core::{CompanyId, UserId};

use crate::document_store::{
    DocumentId, DocumentStore, Fields, Query, StoreError, WriteBatch, collections,
};

/// A user record as seen by one company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user_id: UserId,
    pub display_name: String,
    pub role: Role,
}

#[async_trait]
pub trait MembershipDirectory: Send + Sync {
    /// Members of a company, sorted by display name.
    async fn list_members(&self, company_id: CompanyId) -> Result<Vec<Member>, StoreError>;

    /// A single member, `None` if the user does not belong to the company.
    async fn get_member(
        &self,
        company_id: CompanyId,
        user_id: UserId,
    ) -> Result<Option<Member>, StoreError>;
}

/// Stored shape of a `users` document (the id is the user id).
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
    company_id: CompanyId,
    display_name: String,
    role: Role,
}

/// Directory backed by the `users` collection of a document store.
#[derive(Clone)]
pub struct DocumentDirectory {
    store: Arc<dyn DocumentStore>,
}

impl DocumentDirectory {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Add a user to a company (dev bootstrap and tests).
    pub async fn register_member(
        &self,
        company_id: CompanyId,
        member: &Member,
    ) -> Result<(), StoreError> {
        let record = UserRecord {
            company_id,
            display_name: member.display_name.clone(),
            role: member.role.clone(),
        };
        let fields = match serde_json::to_value(&record) {
            Ok(serde_json::Value::Object(map)) => map,
            Ok(_) => Fields::new(),
            Err(e) => return Err(StoreError::InvalidDocument(e.to_string())),
        };

        let mut batch = WriteBatch::new();
        batch.insert(
            collections::USERS,
            DocumentId::from(*member.user_id.as_uuid()),
            fields,
        );
        self.store.commit(batch).await
    }

    fn decode(id: &DocumentId, fields: Fields) -> Result<(UserId, UserRecord), StoreError> {
        let user_id: UserId = id
            .as_str()
            .parse()
            .map_err(|e| StoreError::InvalidDocument(format!("users/{id}: {e}")))?;
        let record: UserRecord = serde_json::from_value(serde_json::Value::Object(fields))
            .map_err(|e| StoreError::InvalidDocument(format!("users/{id}: {e}")))?;
        Ok((user_id, record))
    }
}

#[async_trait]
impl MembershipDirectory for DocumentDirectory {
    async fn list_members(&self, company_id: CompanyId) -> Result<Vec<Member>, StoreError> {
        let query = Query::collection(collections::USERS).where_eq("companyId", company_id.to_string());

        let mut members = Vec::new();
        for doc in self.store.query(&query).await? {
            let (user_id, record) = Self::decode(&doc.id, doc.fields)?;
            members.push(Member {
                user_id,
                display_name: record.display_name,
                role: record.role,
            });
        }
        members.sort_by(|a, b| {
            a.display_name
                .to_lowercase()
                .cmp(&b.display_name.to_lowercase())
        });
        Ok(members)
    }

    async fn get_member(
        &self,
        company_id: CompanyId,
        user_id: UserId,
    ) -> Result<Option<Member>, StoreError> {
        let id = DocumentId::from(*user_id.as_uuid());
        let Some(doc) = self.store.get(collections::USERS, &id).await? else {
            return Ok(None);
        };

        let (user_id, record) = Self::decode(&doc.id, doc.fields)?;
        if record.company_id != company_id {
            return Ok(None);
        }
        Ok(Some(Member {
            user_id,
            display_name: record.display_name,
            role: record.role,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document_store::InMemoryDocumentStore;

    fn member(name: &str, role: Role) -> Member {
        Member {
            user_id: UserId::new(),
            display_name: name.to_string(),
            role,
        }
    }

    #[tokio::test]
    async fn lists_only_members_of_the_company() {
        let directory = DocumentDirectory::new(Arc::new(InMemoryDocumentStore::new()));
        let acme = CompanyId::new();
        let globex = CompanyId::new();

        directory.register_member(acme, &member("zoe", Role::EMPLOYEE)).await.unwrap();
        directory.register_member(acme, &member("Adam", Role::MANAGER)).await.unwrap();
        directory.register_member(globex, &member("Bob", Role::ADMIN)).await.unwrap();

        let names: Vec<String> = directory
            .list_members(acme)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.display_name)
            .collect();
        assert_eq!(names, vec!["Adam".to_string(), "zoe".to_string()]);
    }

    #[tokio::test]
    async fn get_member_hides_other_companies() {
        let directory = DocumentDirectory::new(Arc::new(InMemoryDocumentStore::new()));
        let acme = CompanyId::new();
        let dana = member("Dana", Role::EMPLOYEE);
        directory.register_member(acme, &dana).await.unwrap();

        assert_eq!(directory.get_member(acme, dana.user_id).await.unwrap(), Some(dana.clone()));
        assert_eq!(directory.get_member(CompanyId::new(), dana.user_id).await.unwrap(), None);
        assert_eq!(directory.get_member(acme, UserId::new()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn registering_twice_fails() {
        let directory = DocumentDirectory::new(Arc::new(InMemoryDocumentStore::new()));
        let acme = CompanyId::new();
        let dana = member("Dana", Role::EMPLOYEE);
        directory.register_member(acme, &dana).await.unwrap();
        assert!(matches!(
            directory.register_member(acme, &dana).await,
            Err(StoreError::AlreadyExists { .. })
        ));
    }
}
