//! Cache keys used by the pages. Mutations invalidate by prefix of these.

use scholarstream_cache::QueryKey;
use scholarstream_http::ScholarshipFilter;

pub fn scholarships(filter: &ScholarshipFilter) -> QueryKey {
    QueryKey::new("scholarships").with_params(filter.params())
}

pub fn all_scholarships() -> QueryKey {
    scholarships(&ScholarshipFilter::default())
}

pub fn scholarship(id: &str) -> QueryKey {
    QueryKey::new("scholarship").with(id)
}

/// Every application (moderator and analytics views).
pub fn applications() -> QueryKey {
    QueryKey::new("applications")
}

/// Unfiltered list read anonymously for the landing-page statistics.
pub fn public_applications() -> QueryKey {
    applications().with("public")
}

pub fn my_applications(email: &str) -> QueryKey {
    QueryKey::new("myApplications").with(email)
}

pub fn application(id: &str) -> QueryKey {
    QueryKey::new("application").with(id)
}

pub fn reviews() -> QueryKey {
    QueryKey::new("reviews")
}

pub fn public_reviews() -> QueryKey {
    reviews().with("public")
}

pub fn my_reviews(email: &str) -> QueryKey {
    reviews().with(email)
}

pub fn users() -> QueryKey {
    QueryKey::new("users")
}

pub fn user_info(email: &str) -> QueryKey {
    QueryKey::new("userInfo").with(email)
}

pub fn role(email: &str) -> QueryKey {
    QueryKey::new("role").with(email)
}

pub fn payment_update(email: &str, application_id: &str) -> QueryKey {
    QueryKey::new("payment-update").with(email).with(application_id)
}
