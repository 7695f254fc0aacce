use scholarstream_core::{ClientError, Identity, ProfileUpdate, UserRecord};
use tracing::info;

use crate::context::AppContext;
use crate::form::{Checks, FormError};
use crate::mutations::Mutation;
use crate::routes;

fn auth_failed(err: scholarstream_core::AuthError) -> FormError {
    FormError::Client(ClientError::Auth(err))
}

/// Make sure the backend has a user record for `identity`. New records get
/// the student role.
async fn ensure_user_record(ctx: &AppContext, identity: &Identity) -> Result<(), ClientError> {
    let record = UserRecord {
        email: identity.email.clone(),
        display_name: identity.display_name.clone(),
        photo_url: identity.photo_url.clone(),
        role: Some("student".into()),
        ..Default::default()
    };
    let inserted = ctx
        .mutate(Mutation::CreateUser, ctx.api().create_user(&record))
        .await?;
    if inserted.inserted_id.is_none() {
        info!(email = %identity.email, "User record already exists");
    }
    Ok(())
}

pub struct LoginPage {
    ctx: AppContext,
    from: Option<String>,
}

impl LoginPage {
    /// `from` is the path a guard redirected from, if any.
    pub fn new(ctx: AppContext, from: Option<String>) -> Self {
        Self { ctx, from }
    }

    /// Where to go after signing in.
    pub fn redirect(&self) -> String {
        self.from
            .clone()
            .filter(|p| p.starts_with('/') && p != routes::SIGN_IN)
            .unwrap_or_else(|| routes::HOME.to_string())
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<String, FormError> {
        Checks::default()
            .required("email", email, "Email")
            .required("password", password, "Password")
            .finish()?;
        self.ctx
            .session()
            .sign_in(email.trim(), password)
            .await
            .map_err(auth_failed)?;
        Ok(self.redirect())
    }

    pub async fn sign_in_with_federated_provider(&self) -> Result<String, FormError> {
        let identity = self
            .ctx
            .session()
            .sign_in_with_federated_provider()
            .await
            .map_err(auth_failed)?;
        ensure_user_record(&self.ctx, &identity).await?;
        Ok(self.redirect())
    }
}

/// Sign-up form input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    /// URL returned by the media upload widget.
    pub photo_url: Option<String>,
}

pub struct RegisterPage {
    ctx: AppContext,
}

impl RegisterPage {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    /// Create the account, set its profile, then create the user record.
    pub async fn register(&self, form: &RegisterForm) -> Result<String, FormError> {
        let mut checks = Checks::default();
        checks
            .required("name", &form.name, "Name")
            .required("email", &form.email, "Email")
            .check(form.email.contains('@'), "email", "Invalid email address")
            .required("password", &form.password, "Password");
        let photo_url = checks.image("photoURL", form.photo_url.as_deref());
        checks.finish()?;

        let session = self.ctx.session();
        session
            .register(form.email.trim(), &form.password)
            .await
            .map_err(auth_failed)?;
        let update = ProfileUpdate {
            display_name: Some(form.name.trim().to_string()),
            photo_url,
        };
        // The account exists either way; record it before reporting.
        let profile = session.update_profile(update).await;
        let identity = self.ctx.require_identity().await?;
        ensure_user_record(&self.ctx, &identity).await?;
        profile.map_err(auth_failed)?;
        Ok(routes::HOME.to_string())
    }
}
