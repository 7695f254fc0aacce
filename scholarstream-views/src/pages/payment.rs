use scholarstream_cache::QueryState;
use scholarstream_core::WriteResult;

use crate::context::AppContext;
use crate::keys;
use crate::mutations::Mutation;
use crate::scope::PageScope;

/// Return page of the checkout flow.
///
/// Marks the application paid once per (email, application id). The write
/// is cached under its own key, so revisiting the page or re-rendering it
/// does not send it again; only a failed attempt is retried.
pub struct PaymentSuccess {
    ctx: AppContext,
    scope: PageScope,
    application_id: Option<String>,
}

impl PaymentSuccess {
    pub fn new(ctx: AppContext, application_id: Option<String>) -> Self {
        Self {
            ctx,
            scope: PageScope::new(),
            application_id: application_id.filter(|id| !id.is_empty()),
        }
    }

    pub fn scope(&self) -> &PageScope {
        &self.scope
    }

    /// Stays `Pending` without sending anything until both the identity and
    /// the application id are known.
    pub async fn confirm(&self) -> QueryState<WriteResult> {
        let Some(id) = self.application_id.clone() else {
            return QueryState::pending();
        };
        let Some(identity) = self.ctx.session().resolved().await else {
            return QueryState::pending();
        };
        let key = keys::payment_update(&identity.email, &id);
        let done = self.ctx.cache().peek::<WriteResult>(&key);
        if done.is_success() {
            return done;
        }

        let api = self.ctx.api().clone();
        let cache = self.ctx.cache().clone();
        let mutation = Mutation::MarkApplicationPaid {
            id: id.clone(),
            email: identity.email,
        };
        self.scope
            .read(self.ctx.query(key, move || async move {
                let result = api.mark_application_paid(&id).await?;
                for prefix in mutation.invalidations() {
                    cache.invalidate_prefix(&prefix);
                }
                Ok(result)
            }))
            .await
    }
}
