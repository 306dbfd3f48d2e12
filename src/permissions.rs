//! Each role maps to one capability set holding both its permission tokens and
//! its allowed route patterns, so the two views of the policy cannot drift.
//! Until the role is known every check denies.

use std::collections::BTreeSet;

use parking_lot::RwLock;
use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use crate::api::DashboardApi;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Agent,
    Investigateur,
    Unrecognized(String),
}

impl Role {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "admin" => Role::Admin,
            "agent" => Role::Agent,
            "investigateur" => Role::Investigateur,
            _ => Role::Unrecognized(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::Agent => "agent",
            Role::Investigateur => "investigateur",
            Role::Unrecognized(raw) => raw,
        }
    }
}

struct RolePolicy {
    permissions: &'static [&'static str],
    routes: &'static [&'static str],
    home: &'static str,
}

const ADMIN_POLICY: RolePolicy = RolePolicy {
    permissions: &[
        "dashboard.view",
        "reports.view",
        "reports.manage",
        "reports.delete",
        "reports.export",
        "reports.assign",
        "analysis.view",
        "users.view",
        "users.manage",
        "notifications.view",
        "settings.manage",
        "audit.view",
        "profile.view",
        "profile.edit",
    ],
    routes: &["/admin", "/admin/*", "/profile", "/profile/*", "/notifications"],
    home: "/admin/dashboard",
};

const AGENT_POLICY: RolePolicy = RolePolicy {
    permissions: &[
        "dashboard.view",
        "reports.view",
        "reports.manage",
        "reports.export",
        "analysis.view",
        "notifications.view",
        "profile.view",
        "profile.edit",
    ],
    routes: &["/agent", "/agent/*", "/profile", "/profile/*", "/notifications"],
    home: "/agent/dashboard",
};

const INVESTIGATEUR_POLICY: RolePolicy = RolePolicy {
    permissions: &[
        "dashboard.view",
        "reports.view",
        "investigations.view",
        "investigations.manage",
        "notifications.view",
        "profile.view",
        "profile.edit",
    ],
    routes: &[
        "/investigateur",
        "/investigateur/*",
        "/profile",
        "/profile/*",
        "/notifications",
    ],
    home: "/investigateur/dashboard",
};

const SIGN_IN_ROUTE: &str = "/login";

fn policy_for(role: &Role) -> Option<&'static RolePolicy> {
    match role {
        Role::Admin => Some(&ADMIN_POLICY),
        Role::Agent => Some(&AGENT_POLICY),
        Role::Investigateur => Some(&INVESTIGATEUR_POLICY),
        Role::Unrecognized(_) => None,
    }
}

/// Glob over route paths: `*` matches any sequence, `?` a single character.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    glob: String,
    regex: Regex,
}

impl RoutePattern {
    pub fn compile(glob: &str) -> Result<Self, regex::Error> {
        let mut pattern = String::with_capacity(glob.len() + 8);
        pattern.push('^');
        for ch in glob.chars() {
            match ch {
                '*' => pattern.push_str(".*"),
                '?' => pattern.push('.'),
                other => pattern.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
            }
        }
        pattern.push('$');
        Ok(Self {
            glob: glob.to_string(),
            regex: Regex::new(&pattern)?,
        })
    }

    pub fn glob(&self) -> &str {
        &self.glob
    }

    pub fn matches(&self, route: &str) -> bool {
        self.regex.is_match(route)
    }
}

#[derive(Debug, Clone)]
pub struct Capabilities {
    role: Role,
    permissions: BTreeSet<&'static str>,
    routes: Vec<RoutePattern>,
    home: &'static str,
}

impl Capabilities {
    /// Unknown roles get nothing: no tokens, no routes.
    pub fn for_role(role: &Role) -> Self {
        let Some(policy) = policy_for(role) else {
            return Self {
                role: role.clone(),
                permissions: BTreeSet::new(),
                routes: Vec::new(),
                home: SIGN_IN_ROUTE,
            };
        };
        let routes = policy
            .routes
            .iter()
            .filter_map(|glob| match RoutePattern::compile(glob) {
                Ok(pattern) => Some(pattern),
                Err(err) => {
                    warn!(glob, error = %err, "skipping invalid route pattern");
                    None
                }
            })
            .collect();
        Self {
            role: role.clone(),
            permissions: policy.permissions.iter().copied().collect(),
            routes,
            home: policy.home,
        }
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn contains(&self, token: &str) -> bool {
        self.permissions.contains(token)
    }

    pub fn permissions(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.permissions.iter().copied()
    }

    pub fn route_globs(&self) -> impl Iterator<Item = &str> + '_ {
        self.routes.iter().map(RoutePattern::glob)
    }

    pub fn allows_route(&self, route: &str) -> bool {
        self.routes.iter().any(|pattern| pattern.matches(route))
    }

    pub fn home(&self) -> &'static str {
        self.home
    }
}

#[derive(Debug, Clone)]
pub enum GateState {
    Uninitialized,
    Loaded(Capabilities),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "target", rename_all = "snake_case")]
pub enum RouteDecision {
    /// The role is not known yet; show a neutral loading state.
    Loading,
    Allow,
    Redirect(String),
}

/// Serializable view of the gate for the webview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionSnapshot {
    pub loaded: bool,
    pub role: Option<String>,
    pub permissions: Vec<String>,
    pub routes: Vec<String>,
    pub home: Option<String>,
}

pub struct PermissionGate {
    state: RwLock<GateState>,
}

impl Default for PermissionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionGate {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(GateState::Uninitialized),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(*self.state.read(), GateState::Loaded(_))
    }

    pub fn role(&self) -> Option<Role> {
        match &*self.state.read() {
            GateState::Loaded(caps) => Some(caps.role().clone()),
            GateState::Uninitialized => None,
        }
    }

    /// Installs the capability set for `role` directly.
    pub fn install(&self, role: Role) {
        let caps = Capabilities::for_role(&role);
        *self.state.write() = GateState::Loaded(caps);
    }

    /// Back to the uninitialized state; every check denies until the next load.
    pub fn clear(&self) {
        *self.state.write() = GateState::Uninitialized;
    }

    /// Loads the role once; a gate that is already loaded is left alone.
    pub async fn ensure_loaded(&self, api: &dyn DashboardApi) -> bool {
        if self.is_loaded() {
            return true;
        }
        self.reload(api).await
    }

    /// Issues exactly one profile fetch. The current state is only replaced
    /// after a successful fetch; a failure is logged and leaves it untouched.
    pub async fn reload(&self, api: &dyn DashboardApi) -> bool {
        match api.fetch_profile().await {
            Ok(profile) => {
                let role = Role::parse(&profile.role);
                if let Role::Unrecognized(raw) = &role {
                    warn!(role = %raw, "unrecognized role, denying everything");
                }
                info!(role = role.as_str(), "permissions loaded");
                self.install(role);
                true
            }
            Err(err) => {
                warn!(error = %err, "failed to fetch profile for permissions");
                false
            }
        }
    }

    fn with_caps(&self, check: impl FnOnce(&Capabilities) -> bool) -> bool {
        match &*self.state.read() {
            GateState::Loaded(caps) => check(caps),
            GateState::Uninitialized => false,
        }
    }

    pub fn has_permission(&self, token: &str) -> bool {
        self.with_caps(|caps| caps.contains(token))
    }

    pub fn has_any_permission<S: AsRef<str>>(&self, tokens: &[S]) -> bool {
        self.with_caps(|caps| tokens.iter().any(|t| caps.contains(t.as_ref())))
    }

    pub fn has_all_permissions<S: AsRef<str>>(&self, tokens: &[S]) -> bool {
        self.with_caps(|caps| tokens.iter().all(|t| caps.contains(t.as_ref())))
    }

    pub fn can_access_route(&self, route: &str) -> bool {
        self.with_caps(|caps| caps.allows_route(route))
    }

    pub fn guard_route(&self, route: &str) -> RouteDecision {
        match &*self.state.read() {
            GateState::Uninitialized => RouteDecision::Loading,
            GateState::Loaded(caps) if caps.allows_route(route) => RouteDecision::Allow,
            GateState::Loaded(caps) => RouteDecision::Redirect(caps.home().to_string()),
        }
    }

    pub fn snapshot(&self) -> PermissionSnapshot {
        match &*self.state.read() {
            GateState::Uninitialized => PermissionSnapshot {
                loaded: false,
                role: None,
                permissions: Vec::new(),
                routes: Vec::new(),
                home: None,
            },
            GateState::Loaded(caps) => PermissionSnapshot {
                loaded: true,
                role: Some(caps.role().as_str().to_string()),
                permissions: caps.permissions().map(str::to_string).collect(),
                routes: caps.route_globs().map(str::to_string).collect(),
                home: Some(caps.home().to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeApi;

    #[test]
    fn glob_patterns_match_routes() {
        let star = RoutePattern::compile("/admin/*").unwrap();
        assert!(star.matches("/admin/reports/12"));
        assert!(!star.matches("/admin"));
        assert!(!star.matches("/agent/reports"));

        let single = RoutePattern::compile("/reports/?").unwrap();
        assert!(single.matches("/reports/7"));
        assert!(!single.matches("/reports/77"));

        let dotted = RoutePattern::compile("/files/a.b").unwrap();
        assert!(!dotted.matches("/files/aXb"));
    }

    #[test]
    fn deny_everything_before_load() {
        let gate = PermissionGate::new();
        for token in ["reports.view", "profile.view", "dashboard.view"] {
            assert!(!gate.has_permission(token));
        }
        assert!(!gate.has_any_permission(&["reports.view"]));
        assert!(!gate.has_all_permissions::<&str>(&[]));
        assert!(!gate.can_access_route("/profile"));
        assert_eq!(gate.guard_route("/admin/dashboard"), RouteDecision::Loading);
        assert!(!gate.snapshot().loaded);
    }

    #[test]
    fn unknown_role_has_no_capabilities() {
        let caps = Capabilities::for_role(&Role::parse("superviseur"));
        assert_eq!(caps.permissions().count(), 0);
        assert_eq!(caps.route_globs().count(), 0);

        let gate = PermissionGate::new();
        gate.install(Role::parse("superviseur"));
        assert!(!gate.has_permission("profile.view"));
        assert_eq!(
            gate.guard_route("/profile"),
            RouteDecision::Redirect("/login".into())
        );
    }

    #[test]
    fn role_checks_follow_the_table() {
        let gate = PermissionGate::new();
        gate.install(Role::parse(" Agent "));
        assert!(gate.has_permission("reports.manage"));
        assert!(!gate.has_permission("reports.delete"));
        assert!(gate.has_any_permission(&["reports.delete", "reports.export"]));
        assert!(!gate.has_all_permissions(&["reports.delete", "reports.export"]));
        assert!(gate.can_access_route("/agent/reports"));
        assert!(!gate.can_access_route("/admin/users"));
        assert_eq!(
            gate.guard_route("/admin/users"),
            RouteDecision::Redirect("/agent/dashboard".into())
        );
        assert_eq!(gate.guard_route("/profile/edit"), RouteDecision::Allow);
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_state() {
        let api = FakeApi::new();
        api.fail_profile(true);
        let gate = PermissionGate::new();
        assert!(!gate.reload(&api).await);
        assert!(!gate.is_loaded());

        api.fail_profile(false);
        api.set_role("investigateur");
        assert!(gate.ensure_loaded(&api).await);
        assert_eq!(gate.role(), Some(Role::Investigateur));
        assert_eq!(api.profile_calls(), 2);

        // already loaded: no new fetch
        assert!(gate.ensure_loaded(&api).await);
        assert_eq!(api.profile_calls(), 2);

        api.fail_profile(true);
        assert!(!gate.reload(&api).await);
        assert_eq!(gate.role(), Some(Role::Investigateur));
        assert!(gate.has_permission("investigations.manage"));
        assert_eq!(api.profile_calls(), 3);
    }

    #[tokio::test]
    async fn reload_switches_role() {
        let api = FakeApi::new();
        api.set_role("admin");
        let gate = PermissionGate::new();
        assert!(gate.reload(&api).await);
        assert!(gate.has_permission("users.manage"));

        api.set_role("agent");
        assert!(gate.reload(&api).await);
        assert!(!gate.has_permission("users.manage"));
        let snapshot = gate.snapshot();
        assert_eq!(snapshot.role.as_deref(), Some("agent"));
        assert!(snapshot.routes.contains(&"/agent/*".to_string()));
    }
}
