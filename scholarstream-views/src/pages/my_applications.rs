use scholarstream_cache::QueryState;
use scholarstream_core::{
    Application, CheckoutRequest, ClientError, InsertResult, Review, WriteResult,
};

use super::{record_id, signed_out};
use crate::context::AppContext;
use crate::form::{FormError, ReviewDraft};
use crate::keys;
use crate::mutations::Mutation;
use crate::scope::PageScope;

/// The signed-in student's applications.
pub struct MyApplications {
    ctx: AppContext,
    scope: PageScope,
}

impl MyApplications {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            scope: PageScope::new(),
        }
    }

    pub fn scope(&self) -> &PageScope {
        &self.scope
    }

    pub async fn load(&self) -> QueryState<Vec<Application>> {
        let Some(identity) = self.ctx.session().resolved().await else {
            return signed_out();
        };
        let api = self.ctx.api().clone();
        let email = identity.email;
        self.scope
            .read(self.ctx.query(keys::my_applications(&email), move || async move {
                api.applications(Some(&email)).await
            }))
            .await
    }

    /// Details of one application.
    pub async fn view(&self, id: &str) -> QueryState<Application> {
        let api = self.ctx.api().clone();
        let owned = id.to_string();
        self.scope
            .read(self.ctx.query(keys::application(id), move || async move {
                api.application(&owned).await
            }))
            .await
    }

    pub async fn delete(&self, application: &Application) -> Result<WriteResult, ClientError> {
        self.scope.ensure_active()?;
        let id = record_id(application.id.as_deref(), "application")?;
        let identity = self.ctx.require_identity().await?;
        self.ctx
            .mutate(
                Mutation::DeleteApplication {
                    id: id.to_string(),
                    email: identity.email,
                },
                self.ctx.api().delete_application(id),
            )
            .await
    }

    /// Post a review for the scholarship behind `application`.
    pub async fn add_review(
        &self,
        application: &Application,
        draft: &ReviewDraft,
    ) -> Result<InsertResult, FormError> {
        draft.validate()?;
        self.scope.ensure_active()?;
        let identity = self.ctx.require_identity().await?;
        let review = Review {
            scholarship_id: application.scholarship_id.clone(),
            university_name: Some(application.university_name.clone()),
            display_name: identity.display_name.clone(),
            email: identity.email.clone(),
            image_url: identity.photo_url.clone(),
            rating_point: Some(draft.rating),
            review_comment: Some(draft.comment.trim().to_string()),
            ..Default::default()
        };
        let inserted = self
            .ctx
            .mutate(Mutation::CreateReview, self.ctx.api().create_review(&review))
            .await?;
        Ok(inserted)
    }

    /// Start a checkout for the application fee and return the gateway URL
    /// to redirect to.
    pub async fn pay(&self, application: &Application) -> Result<String, FormError> {
        if application.is_paid() {
            return Err(FormError::invalid("paymentStatus", "This application is already paid"));
        }
        self.scope.ensure_active()?;
        let id = record_id(application.id.as_deref(), "application")?;
        let identity = self.ctx.require_identity().await?;
        let request = CheckoutRequest {
            application_fee: application.application_fee.clone(),
            id: id.to_string(),
            email: identity.email,
            scholarship_name: application.scholarship_name.clone(),
        };
        let session = self.ctx.api().create_checkout_session(&request).await?;
        session
            .url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ClientError::Decode("checkout session carries no URL".into()).into())
    }
}
