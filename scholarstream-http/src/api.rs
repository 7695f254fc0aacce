use scholarstream_core::config::ApiSettings;
use scholarstream_core::{
    Application, ApplicationPatch, CheckoutRequest, CheckoutSession, ClientError, InsertResult,
    Review, ReviewPatch, RoleLookup, RolePatch, Scholarship, ScholarshipPatch, UserRecord,
    WriteResult,
};
use scholarstream_security::{RoleSource, SessionStore};
use serde_json::json;
use tracing::instrument;

use crate::client::HttpClient;

/// Query parameters of the scholarship listing. Empty fields are omitted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ScholarshipFilter {
    pub search: Option<String>,
    pub country: Option<String>,
    /// Restrict to scholarships this user applied to.
    pub email: Option<String>,
}

impl ScholarshipFilter {
    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Non-empty `(name, value)` pairs, in a fixed order.
    pub fn params(&self) -> Vec<(&'static str, &str)> {
        [
            ("search", self.search.as_deref()),
            ("country", self.country.as_deref()),
            ("email", self.email.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, value)| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (name, v))
        })
        .collect()
    }
}

/// Typed access to every REST resource.
///
/// Catalog reads go through the public adapter; everything that touches a
/// user's data goes through the authenticated one.
#[derive(Clone)]
pub struct ScholarStreamApi {
    public: HttpClient,
    secure: HttpClient,
}

impl ScholarStreamApi {
    pub fn new(settings: &ApiSettings, session: SessionStore) -> Result<Self, ClientError> {
        Ok(Self {
            public: HttpClient::public(settings)?,
            secure: HttpClient::authenticated(settings, session)?,
        })
    }

    pub fn from_clients(public: HttpClient, secure: HttpClient) -> Self {
        Self { public, secure }
    }

    pub fn public_client(&self) -> &HttpClient {
        &self.public
    }

    pub fn secure_client(&self) -> &HttpClient {
        &self.secure
    }

    // -- scholarships ------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn scholarships(&self, filter: &ScholarshipFilter) -> Result<Vec<Scholarship>, ClientError> {
        self.public.get(&["scholarships"], &filter.params()).await
    }

    pub async fn scholarship(&self, id: &str) -> Result<Scholarship, ClientError> {
        self.public.get(&["scholarships", id], &[]).await
    }

    pub async fn create_scholarship(&self, scholarship: &Scholarship) -> Result<InsertResult, ClientError> {
        self.secure.post(&["scholarships"], scholarship).await
    }

    pub async fn update_scholarship(
        &self,
        id: &str,
        patch: &ScholarshipPatch,
    ) -> Result<WriteResult, ClientError> {
        self.secure.patch(&["scholarships", id], patch).await
    }

    pub async fn delete_scholarship(&self, id: &str) -> Result<WriteResult, ClientError> {
        self.secure.delete(&["scholarships", id]).await
    }

    // -- applications ------------------------------------------------------

    /// Applications, filtered to `email` when given.
    pub async fn applications(&self, email: Option<&str>) -> Result<Vec<Application>, ClientError> {
        self.secure.get(&["applications"], &email_param(email)).await
    }

    /// Unfiltered application list used by the public statistics panel.
    pub async fn public_applications(&self) -> Result<Vec<Application>, ClientError> {
        self.public.get(&["applications"], &[]).await
    }

    pub async fn application(&self, id: &str) -> Result<Application, ClientError> {
        self.secure.get(&["applications", id], &[]).await
    }

    pub async fn create_application(&self, application: &Application) -> Result<InsertResult, ClientError> {
        self.secure.post(&["applications"], application).await
    }

    pub async fn update_application(
        &self,
        id: &str,
        patch: &ApplicationPatch,
    ) -> Result<WriteResult, ClientError> {
        self.secure.patch(&["applications", id], patch).await
    }

    pub async fn delete_application(&self, id: &str) -> Result<WriteResult, ClientError> {
        self.secure.delete(&["applications", id]).await
    }

    pub async fn mark_application_paid(&self, id: &str) -> Result<WriteResult, ClientError> {
        self.secure
            .patch(&["applications", "payment-done", id], &json!({ "id": id }))
            .await
    }

    // -- reviews -----------------------------------------------------------

    pub async fn reviews(&self, email: Option<&str>) -> Result<Vec<Review>, ClientError> {
        self.secure.get(&["reviews"], &email_param(email)).await
    }

    /// Unfiltered review list shown on the landing page.
    pub async fn public_reviews(&self) -> Result<Vec<Review>, ClientError> {
        self.public.get(&["reviews"], &[]).await
    }

    pub async fn create_review(&self, review: &Review) -> Result<InsertResult, ClientError> {
        self.secure.post(&["reviews"], review).await
    }

    pub async fn update_review(&self, id: &str, patch: &ReviewPatch) -> Result<WriteResult, ClientError> {
        self.secure.patch(&["reviews", id], patch).await
    }

    pub async fn delete_review(&self, id: &str) -> Result<WriteResult, ClientError> {
        self.secure.delete(&["reviews", id]).await
    }

    // -- users -------------------------------------------------------------

    pub async fn users(&self, email: Option<&str>) -> Result<Vec<UserRecord>, ClientError> {
        self.secure.get(&["users"], &email_param(email)).await
    }

    /// The stored user record for `email`, if there is one.
    pub async fn user(&self, email: &str) -> Result<Option<UserRecord>, ClientError> {
        let users = self.users(Some(email)).await?;
        Ok(users.into_iter().find(|u| u.email.eq_ignore_ascii_case(email)))
    }

    /// Create the user record. The backend answers an existing email with a
    /// message instead of an error; that case returns an `InsertResult`
    /// without an id.
    pub async fn create_user(&self, user: &UserRecord) -> Result<InsertResult, ClientError> {
        self.secure.post(&["users"], user).await
    }

    pub async fn update_user_role(&self, id: &str, patch: &RolePatch) -> Result<WriteResult, ClientError> {
        self.secure.patch(&["users", id], patch).await
    }

    pub async fn delete_user(&self, id: &str) -> Result<WriteResult, ClientError> {
        self.secure.delete(&["users", id]).await
    }

    #[instrument(skip(self))]
    pub async fn role(&self, email: &str) -> Result<RoleLookup, ClientError> {
        self.secure.get(&["users", "role", email], &[]).await
    }

    // -- payments ----------------------------------------------------------

    pub async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, ClientError> {
        self.secure.post(&["create-checkout-sessions"], request).await
    }
}

fn email_param(email: Option<&str>) -> Vec<(&'static str, &str)> {
    email
        .filter(|e| !e.is_empty())
        .map(|e| vec![("email", e)])
        .unwrap_or_default()
}

impl RoleSource for ScholarStreamApi {
    async fn fetch_role(&self, email: &str) -> Result<Option<String>, ClientError> {
        Ok(self.role(email).await?.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_params_skip_blank_values() {
        let filter = ScholarshipFilter::default().search("  ").country("UK");
        assert_eq!(filter.params(), vec![("country", "UK")]);

        let filter = ScholarshipFilter::default().search("law").email("a@b.c");
        assert_eq!(filter.params(), vec![("search", "law"), ("email", "a@b.c")]);
    }
}
