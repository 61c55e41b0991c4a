use crate::admin::AdminCredentials;

/// Views a client can navigate to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Home,
    Job { id: String },
    About,
    Cost,
    AdminLogin,
    Admin,
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Self::Home => "/".to_string(),
            Self::Job { id } => format!("/jobs/{id}"),
            Self::About => "/about".to_string(),
            Self::Cost => "/cost".to_string(),
            Self::AdminLogin => "/admin/login".to_string(),
            Self::Admin => "/admin".to_string(),
        }
    }

    /// Whether entering the route requires an admin session.
    pub fn requires_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Outcome of a navigation guard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Access {
    Allow,
    Redirect(Route),
}

/// Decides whether `target` may be entered with the given admin session.
pub fn guard(target: &Route, session: Option<&AdminCredentials>) -> Access {
    if !target.requires_admin() {
        return Access::Allow;
    }
    match session {
        Some(credentials) if !credentials.username.is_empty() => Access::Allow,
        _ => Access::Redirect(Route::AdminLogin),
    }
}
