use scholarstream_cache::QueryState;
use scholarstream_core::{Review, Scholarship};

use super::all_scholarships;
use crate::context::AppContext;
use crate::derive::{self, PlatformStats, UniversityRank};
use crate::keys;
use crate::scope::PageScope;

/// Landing page sections. Everything here is readable anonymously.
pub struct HomePage {
    ctx: AppContext,
    scope: PageScope,
}

impl HomePage {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            scope: PageScope::new(),
        }
    }

    pub fn scope(&self) -> &PageScope {
        &self.scope
    }

    pub async fn featured_scholarships(&self) -> QueryState<Vec<Scholarship>> {
        all_scholarships(&self.ctx, &self.scope)
            .await
            .map(|all| derive::featured_scholarships(&all))
    }

    pub async fn top_universities(&self) -> QueryState<Vec<UniversityRank>> {
        all_scholarships(&self.ctx, &self.scope)
            .await
            .map(|all| derive::top_universities(&all))
    }

    pub async fn featured_reviews(&self) -> QueryState<Vec<Review>> {
        let api = self.ctx.api().clone();
        self.scope
            .read(self.ctx.query(keys::public_reviews(), move || async move {
                api.public_reviews().await
            }))
            .await
            .map(|reviews: Vec<Review>| derive::featured_reviews(&reviews))
    }

    pub async fn stats(&self) -> QueryState<PlatformStats> {
        let api = self.ctx.api().clone();
        let applications = self.scope.read(self.ctx.query(keys::public_applications(), move || async move {
            api.public_applications().await
        }));
        let (scholarships, applications) =
            tokio::join!(all_scholarships(&self.ctx, &self.scope), applications);
        scholarships
            .zip(applications)
            .map(|(s, a)| derive::platform_stats(&s, &a))
    }
}
