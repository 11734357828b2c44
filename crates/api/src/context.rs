use bizdesk_auth::{Actor, Role};
use bizdesk_core::{CompanyId, UserId};

/// Authenticated actor for a request.
///
/// Inserted by the auth middleware and present for all protected routes. The
/// actor's company scopes everything the request can read or write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
    actor: Actor,
}

impl ActorContext {
    pub fn new(actor: Actor) -> Self {
        Self { actor }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn user_id(&self) -> UserId {
        self.actor.user_id
    }

    pub fn company_id(&self) -> CompanyId {
        self.actor.company_id
    }

    pub fn roles(&self) -> &[Role] {
        &self.actor.roles
    }
}
