use scholarstream_cache::QueryKey;

use crate::keys;

/// Every write a page can issue, with the identifiers its invalidation needs.
///
/// [`Mutation::invalidations`] is the single place that decides which cached
/// reads a successful write makes stale.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
    CreateApplication { email: String },
    DeleteApplication { id: String, email: String },
    UpdateApplication { id: String },
    MarkApplicationPaid { id: String, email: String },
    CreateReview,
    UpdateReview,
    DeleteReview,
    CreateScholarship,
    UpdateScholarship { id: String },
    DeleteScholarship { id: String },
    CreateUser,
    UpdateUserRole { email: String },
    DeleteUser { email: String },
}

impl Mutation {
    /// Key prefixes to invalidate once the write has succeeded.
    pub fn invalidations(&self) -> Vec<QueryKey> {
        match self {
            // Catalog lists filtered by `email` are answered from applications.
            Mutation::CreateApplication { email } => vec![
                keys::applications(),
                keys::my_applications(email),
                QueryKey::new("scholarships"),
            ],
            Mutation::DeleteApplication { id, email } => vec![
                keys::applications(),
                keys::my_applications(email),
                keys::application(id),
                QueryKey::new("scholarships"),
            ],
            Mutation::MarkApplicationPaid { id, email } => vec![
                keys::applications(),
                keys::my_applications(email),
                keys::application(id),
            ],
            Mutation::UpdateApplication { id } => vec![
                keys::applications(),
                QueryKey::new("myApplications"),
                keys::application(id),
            ],
            Mutation::CreateReview | Mutation::UpdateReview | Mutation::DeleteReview => {
                vec![keys::reviews()]
            }
            Mutation::CreateScholarship => vec![QueryKey::new("scholarships")],
            Mutation::UpdateScholarship { id } | Mutation::DeleteScholarship { id } => {
                vec![QueryKey::new("scholarships"), keys::scholarship(id)]
            }
            Mutation::CreateUser => vec![keys::users()],
            Mutation::UpdateUserRole { email } | Mutation::DeleteUser { email } => {
                vec![keys::users(), keys::user_info(email), keys::role(email)]
            }
        }
    }

    /// Email whose cached role must be dropped after the write.
    pub fn forgets_role_of(&self) -> Option<&str> {
        match self {
            Mutation::UpdateUserRole { email } | Mutation::DeleteUser { email } => Some(email),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mutation::CreateApplication { .. } => "create_application",
            Mutation::DeleteApplication { .. } => "delete_application",
            Mutation::UpdateApplication { .. } => "update_application",
            Mutation::MarkApplicationPaid { .. } => "mark_application_paid",
            Mutation::CreateReview => "create_review",
            Mutation::UpdateReview => "update_review",
            Mutation::DeleteReview => "delete_review",
            Mutation::CreateScholarship => "create_scholarship",
            Mutation::UpdateScholarship { .. } => "update_scholarship",
            Mutation::DeleteScholarship { .. } => "delete_scholarship",
            Mutation::CreateUser => "create_user",
            Mutation::UpdateUserRole { .. } => "update_user_role",
            Mutation::DeleteUser { .. } => "delete_user",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(mutation: Mutation) -> Vec<String> {
        mutation.invalidations().iter().map(ToString::to_string).collect()
    }

    #[test]
    fn create_application_targets_lists() {
        assert_eq!(
            rendered(Mutation::CreateApplication { email: "a@b.c".into() }),
            ["applications", "myApplications:a@b.c", "scholarships"]
        );
    }

    #[test]
    fn application_writes_reach_applied_only_catalog() {
        let mine = keys::scholarships(
            &scholarstream_http::ScholarshipFilter::default()
                .search("law")
                .email("a@b.c"),
        );
        for mutation in [
            Mutation::CreateApplication { email: "a@b.c".into() },
            Mutation::DeleteApplication {
                id: "x".into(),
                email: "a@b.c".into(),
            },
        ] {
            assert!(mutation.invalidations().iter().any(|p| mine.starts_with(p)));
        }
    }

    #[test]
    fn role_changes_drop_role_entries() {
        let m = Mutation::UpdateUserRole { email: "a@b.c".into() };
        assert_eq!(rendered(m.clone()), ["users", "userInfo:a@b.c", "role:a@b.c"]);
        assert_eq!(m.forgets_role_of(), Some("a@b.c"));
        assert_eq!(Mutation::CreateReview.forgets_role_of(), None);
    }

    #[test]
    fn scholarship_prefix_covers_filtered_lists() {
        let filtered = keys::scholarships(&scholarstream_http::ScholarshipFilter::default().country("UK"));
        let prefixes = Mutation::UpdateScholarship { id: "s1".into() }.invalidations();
        assert!(prefixes.iter().any(|p| filtered.starts_with(p)));
        assert!(!keys::scholarship("s2").starts_with(&prefixes[1]));
    }
}
