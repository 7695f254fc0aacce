use scholarstream_cache::QueryState;
use scholarstream_core::{Application, ClientError, Review, Scholarship};
use tracing::info;

use crate::context::AppContext;
use crate::keys;
use crate::mutations::Mutation;
use crate::routes;
use crate::scope::PageScope;

/// Where the apply button leads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Anonymous visitor: sign in first, then come back to `from`.
    SignIn { from: String },
    Applied {
        application_id: Option<String>,
        redirect: &'static str,
    },
}

pub struct ScholarshipDetails {
    ctx: AppContext,
    scope: PageScope,
    id: String,
}

impl ScholarshipDetails {
    pub fn new(ctx: AppContext, id: impl Into<String>) -> Self {
        Self {
            ctx,
            scope: PageScope::new(),
            id: id.into(),
        }
    }

    pub fn scope(&self) -> &PageScope {
        &self.scope
    }

    pub fn path(&self) -> String {
        format!("/scholarships/{}", self.id)
    }

    pub async fn load(&self) -> QueryState<Scholarship> {
        let api = self.ctx.api().clone();
        let id = self.id.clone();
        self.scope
            .read(self.ctx.query(keys::scholarship(&self.id), move || async move {
                api.scholarship(&id).await
            }))
            .await
    }

    /// Reviews left for this scholarship.
    pub async fn reviews(&self) -> QueryState<Vec<Review>> {
        let api = self.ctx.api().clone();
        let id = self.id.clone();
        self.scope
            .read(self.ctx.query(keys::public_reviews(), move || async move {
                api.public_reviews().await
            }))
            .await
            .map(move |all: Vec<Review>| {
                all.into_iter()
                    .filter(|r| r.scholarship_id == id)
                    .collect()
            })
    }

    pub async fn apply(&self) -> Result<ApplyOutcome, ClientError> {
        self.scope.ensure_active()?;
        let Some(identity) = self.ctx.session().resolved().await else {
            return Ok(ApplyOutcome::SignIn { from: self.path() });
        };
        let scholarship = self.load().await.into_result()?;
        let application = Application {
            payment_status: Some("unpaid".into()),
            enrollment_status: Some("pending".into()),
            ..Application::for_scholarship(
                &scholarship,
                self.id.clone(),
                identity.email.clone(),
                identity.display_name.clone(),
            )
        };
        let api = self.ctx.api();
        let inserted = self
            .ctx
            .mutate(
                Mutation::CreateApplication {
                    email: identity.email.clone(),
                },
                api.create_application(&application),
            )
            .await?;
        info!(scholarship = %self.id, "Application submitted");
        Ok(ApplyOutcome::Applied {
            application_id: inserted.inserted_id,
            redirect: routes::MY_APPLICATIONS,
        })
    }
}
