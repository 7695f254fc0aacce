use scholarstream_cache::QueryState;
use scholarstream_core::{ClientError, Identity, Role, UserRecord};

use super::signed_out;
use crate::context::AppContext;
use crate::keys;
use crate::scope::PageScope;

#[derive(Clone, Debug, PartialEq)]
pub struct ProfileView {
    pub identity: Identity,
    /// The stored user record, if the backend has one.
    pub record: Option<UserRecord>,
    /// `None` while the role is unknown or could not be resolved.
    pub role: Option<Role>,
}

pub struct MyProfile {
    ctx: AppContext,
    scope: PageScope,
}

impl MyProfile {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            scope: PageScope::new(),
        }
    }

    pub fn scope(&self) -> &PageScope {
        &self.scope
    }

    pub async fn load(&self) -> QueryState<ProfileView> {
        let Some(identity) = self.ctx.session().resolved().await else {
            return signed_out();
        };
        let api = self.ctx.api().clone();
        let email = identity.email.clone();
        let record = self.scope.read(self.ctx.query(keys::user_info(&identity.email), move || async move {
            api.user(&email).await
        }));

        let roles = self.ctx.roles().clone();
        let who = identity.clone();
        let role = self.scope.read(self.ctx.query(keys::role(&identity.email), move || async move {
            roles
                .resolve_role(&who)
                .await
                .map(|record| record.role)
                .map_err(ClientError::Role)
        }));

        let (record, role): (QueryState<Option<UserRecord>>, QueryState<Role>) =
            tokio::join!(record, role);
        let role = role.data;
        record.map(move |record| ProfileView {
            identity,
            record,
            role,
        })
    }
}
