//! Path → page mapping with the guard each page sits behind.

use std::collections::BTreeMap;

use scholarstream_security::{AuthenticatedGuard, Gate, RoleGuard};

use crate::context::AppContext;

pub const HOME: &str = "/";
pub const SIGN_IN: &str = "/login";
pub const MY_APPLICATIONS: &str = "/dashboard/myApplications";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PageKind {
    Home,
    About,
    Catalog,
    ScholarshipDetails,
    Login,
    Register,
    MyProfile,
    MyApplications,
    MyReviews,
    PaymentSuccess,
    ManageApplications,
    AllReviews,
    ManageScholarships,
    AddScholarship,
    ManageUsers,
    Analytics,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GuardKind {
    Public,
    Authenticated,
    Moderator,
    Admin,
}

impl GuardKind {
    /// Start the gate protecting `path`; `None` for public pages.
    pub fn gate(self, ctx: &AppContext, path: &str) -> Option<Gate> {
        match self {
            GuardKind::Public => None,
            GuardKind::Authenticated => Some(ctx.gate(AuthenticatedGuard, path)),
            GuardKind::Moderator => Some(ctx.gate(RoleGuard::moderator(), path)),
            GuardKind::Admin => Some(ctx.gate(RoleGuard::admin(), path)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    /// Slash-separated pattern; `:name` segments capture one path segment.
    pub pattern: &'static str,
    pub page: PageKind,
    pub guard: GuardKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: BTreeMap<String, String>,
}

impl RouteMatch<'_> {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

#[derive(Clone, Debug)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// First route matching `path`. Query strings, fragments and trailing
    /// slashes are ignored. `None` means the error page.
    pub fn resolve<'a>(&'a self, path: &str) -> Option<RouteMatch<'a>> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments = split(path);
        self.routes.iter().find_map(|route| {
            let pattern = split(route.pattern);
            if pattern.len() != segments.len() {
                return None;
            }
            let mut params = BTreeMap::new();
            for (expected, actual) in pattern.iter().zip(&segments) {
                match expected.strip_prefix(':') {
                    Some(name) => {
                        params.insert(name.to_string(), actual.to_string());
                    }
                    None if expected == actual => {}
                    None => return None,
                }
            }
            Some(RouteMatch { route, params })
        })
    }
}

fn split(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn route(pattern: &'static str, page: PageKind, guard: GuardKind) -> Route {
    Route {
        pattern,
        page,
        guard,
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        use GuardKind::*;
        Self::new(vec![
            route(HOME, PageKind::Home, Public),
            route("/about", PageKind::About, Public),
            route("/scholarships", PageKind::Catalog, Public),
            route("/scholarships/:id", PageKind::ScholarshipDetails, Public),
            route(SIGN_IN, PageKind::Login, Public),
            route("/register", PageKind::Register, Public),
            route("/dashboard", PageKind::MyProfile, Authenticated),
            route("/dashboard/myProfile", PageKind::MyProfile, Authenticated),
            route(MY_APPLICATIONS, PageKind::MyApplications, Authenticated),
            route("/dashboard/myReviews", PageKind::MyReviews, Authenticated),
            route("/dashboard/payment-success/:id", PageKind::PaymentSuccess, Authenticated),
            route("/dashboard/manageAppliedApplications", PageKind::ManageApplications, Moderator),
            route("/dashboard/allReviews", PageKind::AllReviews, Moderator),
            route("/dashboard/manageScholarships", PageKind::ManageScholarships, Admin),
            route("/dashboard/addScholarship", PageKind::AddScholarship, Admin),
            route("/dashboard/manageUsers", PageKind::ManageUsers, Admin),
            route("/dashboard/analytics", PageKind::Analytics, Admin),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_static_and_param_routes() {
        let table = RouteTable::default();
        assert_eq!(table.resolve("/").unwrap().route.page, PageKind::Home);

        let details = table.resolve("/scholarships/abc123?tab=reviews").unwrap();
        assert_eq!(details.route.page, PageKind::ScholarshipDetails);
        assert_eq!(details.param("id"), Some("abc123"));

        let admin = table.resolve("/dashboard/analytics/").unwrap();
        assert_eq!(admin.route.guard, GuardKind::Admin);
    }

    #[test]
    fn unknown_paths_do_not_resolve() {
        let table = RouteTable::default();
        assert!(table.resolve("/nope").is_none());
        assert!(table.resolve("/scholarships/a/b").is_none());
    }

    #[test]
    fn moderator_and_admin_areas_are_disjoint() {
        let table = RouteTable::default();
        let guard = |p: &str| table.resolve(p).map(|m| m.route.guard);
        assert_eq!(guard("/dashboard/allReviews"), Some(GuardKind::Moderator));
        assert_eq!(guard("/dashboard/manageUsers"), Some(GuardKind::Admin));
        assert_eq!(guard(MY_APPLICATIONS), Some(GuardKind::Authenticated));
    }
}
