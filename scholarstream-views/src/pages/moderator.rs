use std::fmt;

use scholarstream_cache::QueryState;
use scholarstream_core::{Application, ApplicationPatch, ClientError, Review, WriteResult};

use crate::context::AppContext;
use crate::form::FormError;
use crate::keys;
use crate::mutations::Mutation;
use crate::scope::PageScope;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnrollmentStatus {
    Pending,
    Processing,
    Enrolled,
    Rejected,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Pending => "pending",
            EnrollmentStatus::Processing => "processing",
            EnrollmentStatus::Enrolled => "enrolled",
            EnrollmentStatus::Rejected => "rejected",
        }
    }

    /// Status of a stored application; a missing status reads as pending.
    pub fn of(application: &Application) -> Option<Self> {
        match application.enrollment_status.as_deref().unwrap_or("pending") {
            "pending" => Some(EnrollmentStatus::Pending),
            "processing" => Some(EnrollmentStatus::Processing),
            "enrolled" => Some(EnrollmentStatus::Enrolled),
            "rejected" => Some(EnrollmentStatus::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Moderator view over every submitted application.
pub struct ManageApplications {
    ctx: AppContext,
    scope: PageScope,
}

impl ManageApplications {
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
        let api = self.ctx.api().clone();
        self.scope
            .read(self.ctx.query(keys::applications(), move || async move {
                api.applications(None).await
            }))
            .await
    }

    pub async fn give_feedback(&self, id: &str, feedback: &str) -> Result<WriteResult, FormError> {
        let feedback = feedback.trim();
        if feedback.is_empty() {
            return Err(FormError::invalid("feedback", "Feedback is required"));
        }
        let patch = ApplicationPatch {
            feedback: Some(feedback.to_string()),
            enrollment_status: None,
        };
        Ok(self.update(id, patch).await?)
    }

    pub async fn set_status(&self, id: &str, status: EnrollmentStatus) -> Result<WriteResult, ClientError> {
        let patch = ApplicationPatch {
            feedback: None,
            enrollment_status: Some(status.as_str().to_string()),
        };
        self.update(id, patch).await
    }

    pub async fn reject(&self, id: &str) -> Result<WriteResult, ClientError> {
        self.set_status(id, EnrollmentStatus::Rejected).await
    }

    async fn update(&self, id: &str, patch: ApplicationPatch) -> Result<WriteResult, ClientError> {
        self.scope.ensure_active()?;
        self.ctx
            .mutate(
                Mutation::UpdateApplication { id: id.to_string() },
                self.ctx.api().update_application(id, &patch),
            )
            .await
    }
}

/// Moderator view over every review.
pub struct AllReviews {
    ctx: AppContext,
    scope: PageScope,
}

impl AllReviews {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            scope: PageScope::new(),
        }
    }

    pub fn scope(&self) -> &PageScope {
        &self.scope
    }

    pub async fn load(&self) -> QueryState<Vec<Review>> {
        let api = self.ctx.api().clone();
        self.scope
            .read(self.ctx.query(keys::reviews(), move || async move { api.reviews(None).await }))
            .await
    }

    pub async fn delete(&self, review_id: &str) -> Result<WriteResult, ClientError> {
        self.scope.ensure_active()?;
        self.ctx
            .mutate(Mutation::DeleteReview, self.ctx.api().delete_review(review_id))
            .await
    }
}
