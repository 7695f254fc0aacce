use scholarstream_cache::QueryState;
use scholarstream_core::{ClientError, Review, ReviewPatch, WriteResult};

use super::signed_out;
use crate::context::AppContext;
use crate::form::{FormError, ReviewDraft};
use crate::keys;
use crate::mutations::Mutation;
use crate::scope::PageScope;

pub struct MyReviews {
    ctx: AppContext,
    scope: PageScope,
}

impl MyReviews {
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
        let Some(identity) = self.ctx.session().resolved().await else {
            return signed_out();
        };
        let api = self.ctx.api().clone();
        let email = identity.email;
        self.scope
            .read(self.ctx.query(keys::my_reviews(&email), move || async move {
                api.reviews(Some(&email)).await
            }))
            .await
    }

    pub async fn edit(&self, review_id: &str, draft: &ReviewDraft) -> Result<WriteResult, FormError> {
        draft.validate()?;
        self.scope.ensure_active()?;
        let patch = ReviewPatch {
            rating_point: draft.rating,
            review_comment: draft.comment.trim().to_string(),
        };
        let result = self
            .ctx
            .mutate(Mutation::UpdateReview, self.ctx.api().update_review(review_id, &patch))
            .await?;
        Ok(result)
    }

    pub async fn delete(&self, review_id: &str) -> Result<WriteResult, ClientError> {
        self.scope.ensure_active()?;
        self.ctx
            .mutate(Mutation::DeleteReview, self.ctx.api().delete_review(review_id))
            .await
    }
}
