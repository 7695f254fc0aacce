//! One view model per page. Each owns a [`PageScope`](crate::PageScope),
//! reads through the context's cache and writes through
//! [`AppContext::mutate`](crate::AppContext::mutate).

mod admin;
mod auth;
mod catalog;
mod details;
mod home;
mod moderator;
mod my_applications;
mod my_reviews;
mod payment;
mod profile;

pub use admin::{AddScholarship, Analytics, ManageScholarships, ManageUsers};
pub use auth::{LoginPage, RegisterForm, RegisterPage};
pub use catalog::{CatalogParams, ScholarshipCatalog, CATALOG_PAGE_SIZE};
pub use details::{ApplyOutcome, ScholarshipDetails};
pub use home::HomePage;
pub use moderator::{AllReviews, EnrollmentStatus, ManageApplications};
pub use my_applications::MyApplications;
pub use my_reviews::MyReviews;
pub use payment::PaymentSuccess;
pub use profile::{MyProfile, ProfileView};

use scholarstream_cache::{QueryState, QueryStatus};
use scholarstream_core::{AuthError, ClientError, Scholarship};
use scholarstream_http::ScholarshipFilter;

use crate::context::AppContext;
use crate::keys;
use crate::scope::PageScope;

/// Snapshot for a page that needs a signed-in identity but has none.
fn signed_out<T>() -> QueryState<T> {
    QueryState {
        status: QueryStatus::Error,
        error: Some(ClientError::Auth(AuthError::NoActiveIdentity)),
        ..QueryState::pending()
    }
}

fn record_id<'a>(id: Option<&'a str>, what: &str) -> Result<&'a str, ClientError> {
    id.filter(|id| !id.is_empty())
        .ok_or_else(|| ClientError::Decode(format!("{what} record has no id")))
}

/// The unfiltered scholarship list shared by the landing page, the catalog
/// country filter and the admin pages.
async fn all_scholarships(ctx: &AppContext, scope: &PageScope) -> QueryState<Vec<Scholarship>> {
    let api = ctx.api().clone();
    scope
        .read(ctx.query(keys::all_scholarships(), move || async move {
            api.scholarships(&ScholarshipFilter::default()).await
        }))
        .await
}
