use scholarstream_cache::QueryState;
use scholarstream_core::{
    ClientError, InsertResult, Role, RolePatch, Scholarship, ScholarshipPatch, UserRecord,
    WriteResult,
};
use tracing::info;

use super::{all_scholarships, record_id};
use crate::context::AppContext;
use crate::derive::{self, parse_fee, AnalyticsSummary};
use crate::form::{Checks, FormError};
use crate::keys;
use crate::mutations::Mutation;
use crate::scope::PageScope;

pub struct ManageScholarships {
    ctx: AppContext,
    scope: PageScope,
}

impl ManageScholarships {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            scope: PageScope::new(),
        }
    }

    pub fn scope(&self) -> &PageScope {
        &self.scope
    }

    pub async fn load(&self) -> QueryState<Vec<Scholarship>> {
        all_scholarships(&self.ctx, &self.scope).await
    }

    pub async fn update(&self, id: &str, patch: &ScholarshipPatch) -> Result<WriteResult, FormError> {
        if patch.is_empty() {
            return Err(FormError::invalid("scholarship", "Nothing to update"));
        }
        let mut checks = Checks::default();
        let mut patch = patch.clone();
        if patch.image.is_some() {
            patch.image = checks.image("image", patch.image.as_deref());
        }
        if let Some(fee) = patch.application_fee.as_deref() {
            checks.check(parse_fee(fee).is_some(), "applicationFee", "Application fee must be a number");
        }
        checks.finish()?;
        self.scope.ensure_active()?;
        let result = self
            .ctx
            .mutate(
                Mutation::UpdateScholarship { id: id.to_string() },
                self.ctx.api().update_scholarship(id, &patch),
            )
            .await?;
        Ok(result)
    }

    pub async fn delete(&self, id: &str) -> Result<WriteResult, ClientError> {
        self.scope.ensure_active()?;
        self.ctx
            .mutate(
                Mutation::DeleteScholarship { id: id.to_string() },
                self.ctx.api().delete_scholarship(id),
            )
            .await
    }
}

/// Scholarship creation form.
pub struct AddScholarship {
    ctx: AppContext,
    scope: PageScope,
}

impl AddScholarship {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            scope: PageScope::new(),
        }
    }

    pub fn scope(&self) -> &PageScope {
        &self.scope
    }

    pub fn validate(scholarship: &Scholarship) -> Result<Scholarship, FormError> {
        let mut checks = Checks::default();
        checks
            .required("scholarshipName", &scholarship.scholarship_name, "Scholarship name")
            .required("universityName", &scholarship.university_name, "University name")
            .required(
                "country",
                scholarship.country.as_deref().unwrap_or_default(),
                "Country",
            );
        if let Some(fee) = scholarship.application_fee.as_deref() {
            checks.check(parse_fee(fee).is_some(), "applicationFee", "Application fee must be a number");
        }
        let image = checks.image("image", scholarship.image.as_deref());
        checks.finish()?;
        Ok(Scholarship {
            image,
            ..scholarship.clone()
        })
    }

    pub async fn submit(&self, scholarship: &Scholarship) -> Result<InsertResult, FormError> {
        let scholarship = Self::validate(scholarship)?;
        self.scope.ensure_active()?;
        let inserted = self
            .ctx
            .mutate(
                Mutation::CreateScholarship,
                self.ctx.api().create_scholarship(&scholarship),
            )
            .await?;
        info!(name = %scholarship.scholarship_name, "Scholarship added");
        Ok(inserted)
    }
}

/// User list with a role filter and role management.
pub struct ManageUsers {
    ctx: AppContext,
    scope: PageScope,
    role_filter: Option<Role>,
}

impl ManageUsers {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            scope: PageScope::new(),
            role_filter: None,
        }
    }

    pub fn scope(&self) -> &PageScope {
        &self.scope
    }

    pub fn set_role_filter(&mut self, role: Option<Role>) {
        self.role_filter = role;
    }

    pub async fn load(&self) -> QueryState<Vec<UserRecord>> {
        let api = self.ctx.api().clone();
        let role = self.role_filter;
        self.scope
            .read(self.ctx.query(keys::users(), move || async move { api.users(None).await }))
            .await
            .map(|users: Vec<UserRecord>| derive::filter_users_by_role(&users, role))
    }

    /// Change `user`'s role. Returns `false` without sending anything when
    /// the user already has it.
    pub async fn change_role(&self, user: &UserRecord, role: Role) -> Result<bool, ClientError> {
        let current = user.role().unwrap_or(Role::Student);
        if current == role && user.role.is_some() {
            return Ok(false);
        }
        self.scope.ensure_active()?;
        let id = record_id(user.id.as_deref(), "user")?;
        self.ctx
            .mutate(
                Mutation::UpdateUserRole {
                    email: user.email.clone(),
                },
                self.ctx.api().update_user_role(id, &RolePatch { role }),
            )
            .await?;
        info!(email = %user.email, %role, "Role changed");
        Ok(true)
    }

    pub async fn delete(&self, user: &UserRecord) -> Result<WriteResult, ClientError> {
        self.scope.ensure_active()?;
        let id = record_id(user.id.as_deref(), "user")?;
        self.ctx
            .mutate(
                Mutation::DeleteUser {
                    email: user.email.clone(),
                },
                self.ctx.api().delete_user(id),
            )
            .await
    }
}

pub struct Analytics {
    ctx: AppContext,
    scope: PageScope,
}

impl Analytics {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            scope: PageScope::new(),
        }
    }

    pub fn scope(&self) -> &PageScope {
        &self.scope
    }

    pub async fn load(&self) -> QueryState<AnalyticsSummary> {
        let users_api = self.ctx.api().clone();
        let users = self
            .scope
            .read(self.ctx.query(keys::users(), move || async move { users_api.users(None).await }));
        let applications_api = self.ctx.api().clone();
        let applications = self.scope.read(self.ctx.query(keys::applications(), move || async move {
            applications_api.applications(None).await
        }));
        let (users, scholarships, applications) = tokio::join!(
            users,
            all_scholarships(&self.ctx, &self.scope),
            applications
        );
        users
            .zip(scholarships)
            .zip(applications)
            .map(|((u, s), a)| derive::analytics_summary(&u, &s, &a))
    }
}
