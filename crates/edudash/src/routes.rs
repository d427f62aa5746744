//! Which guard, if any, sits in front of each page.

use edudash_guard::Requirement;
use edudash_protocol::{Role, Route};

/// How a route is served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteKind {
    /// Rendered for everyone.
    Public,
    /// Behind a [`ProtectedRoute`](edudash_guard::ProtectedRoute) for
    /// this role.
    Protected(Role),
    /// Behind the [`AdminLayout`](edudash_guard::AdminLayout).
    AdminLayout,
    /// The [`DashboardRedirector`](edudash_guard::DashboardRedirector).
    Dashboard,
    /// No page at this path.
    NotFound,
}

/// Maps routes to their guards.
#[derive(Debug, Clone)]
pub struct RouteTable {
    default_redirect: Route,
}

impl RouteTable {
    /// The standard table, sending unplaceable users to `/login`.
    pub fn standard() -> Self {
        Self::new(Route::Login)
    }

    pub fn new(default_redirect: Route) -> Self {
        Self { default_redirect }
    }

    pub fn resolve(&self, route: &Route) -> RouteKind {
        match route {
            Route::Home | Route::About | Route::Login => RouteKind::Public,
            Route::Student => RouteKind::Protected(Role::Student),
            Route::Tutor => RouteKind::Protected(Role::Tutor),
            Route::Admin => RouteKind::AdminLayout,
            Route::Dashboard => RouteKind::Dashboard,
            Route::Path(_) => RouteKind::NotFound,
        }
    }

    /// The requirement a protected page for `role` enforces.
    pub fn requirement(&self, role: Role) -> Requirement {
        Requirement::role(role).redirect_to(self.default_redirect.clone())
    }

    pub fn default_redirect(&self) -> &Route {
        &self.default_redirect
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_every_page() {
        let table = RouteTable::standard();

        assert_eq!(table.resolve(&Route::Home), RouteKind::Public);
        assert_eq!(table.resolve(&Route::Login), RouteKind::Public);
        assert_eq!(table.resolve(&Route::Student), RouteKind::Protected(Role::Student));
        assert_eq!(table.resolve(&Route::Tutor), RouteKind::Protected(Role::Tutor));
        assert_eq!(table.resolve(&Route::Admin), RouteKind::AdminLayout);
        assert_eq!(table.resolve(&Route::Dashboard), RouteKind::Dashboard);
        assert_eq!(table.resolve(&Route::parse("/nowhere")), RouteKind::NotFound);
    }

    #[test]
    fn test_requirement_uses_default_redirect() {
        let table = RouteTable::new(Route::Home);
        let req = table.requirement(Role::Tutor);

        assert_eq!(req.role, Some(Role::Tutor));
        assert_eq!(req.redirect_to, Route::Home);
    }
}
