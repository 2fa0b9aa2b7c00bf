//! Client-side routes and the navigation guard.
//!
//! The route table mirrors the dashboard front end: a public dashboard, a
//! URL management view that requires a session, and the login view. The
//! `RouteGuard` decides, before each navigation, whether to allow it or
//! redirect; the `Router` applies that decision and follows navigation
//! requests published on the `EventBus`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};
use url::form_urlencoded;

use crate::auth::Session;
use crate::events::{AppEvent, EventBus};

/// Query parameter carrying the originally requested path through login
pub const REDIRECT_PARAM: &str = "redirect";

/// Upper bound on guard redirects followed for a single navigation
const MAX_REDIRECTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Dashboard,
    Urls,
    Login,
}

impl Route {
    pub const ALL: [Route; 3] = [Route::Dashboard, Route::Urls, Route::Login];

    pub fn name(&self) -> &'static str {
        match self {
            Route::Dashboard => "dashboard",
            Route::Urls => "urls",
            Route::Login => "login",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Dashboard => "/",
            Route::Urls => "/urls",
            Route::Login => "/login",
        }
    }

    pub fn requires_auth(&self) -> bool {
        matches!(self, Route::Urls)
    }

    /// Match a path (query string ignored, trailing slash tolerated)
    pub fn from_path(path: &str) -> Option<Route> {
        let path = path.split('?').next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        let normalized = if trimmed.is_empty() { "/" } else { trimmed };
        Self::ALL.into_iter().find(|r| r.path() == normalized)
    }

    pub fn from_name(name: &str) -> Option<Route> {
        Self::ALL.into_iter().find(|r| r.name() == name)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A route plus its query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub route: Route,
    pub query: BTreeMap<String, String>,
}

impl Location {
    pub fn new(route: Route) -> Self {
        Self {
            route,
            query: BTreeMap::new(),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Path plus encoded query string, e.g. `/login?redirect=%2Furls`
    pub fn full_path(&self) -> String {
        if self.query.is_empty() {
            return self.route.path().to_string();
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();
        format!("{}?{}", self.route.path(), query)
    }

    /// Parse a full path produced by `full_path`
    pub fn parse(full_path: &str) -> Option<Location> {
        let (path, query) = match full_path.split_once('?') {
            Some((path, query)) => (path, query),
            None => (full_path, ""),
        };
        let route = Route::from_path(path)?;
        let query = form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        Some(Location { route, query })
    }

    /// Where to go after login, if this is a login location with a return path
    pub fn redirect_target(&self) -> Option<Location> {
        self.query
            .get(REDIRECT_PARAM)
            .and_then(|path| Location::parse(path))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(Location),
}

/// Read-only access check run before every navigation.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    session: Arc<Session>,
}

impl RouteGuard {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub fn check(&self, to: &Location) -> GuardDecision {
        let authenticated = self.session.is_authenticated();

        if to.route.requires_auth() && !authenticated {
            return GuardDecision::Redirect(
                Location::new(Route::Login).with_query(REDIRECT_PARAM, to.full_path()),
            );
        }

        if to.route == Route::Login && authenticated {
            return GuardDecision::Redirect(Location::new(Route::Dashboard));
        }

        GuardDecision::Allow
    }
}

/// Result of a navigation after the guard ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub requested: Location,
    pub resolved: Location,
}

impl Navigation {
    pub fn was_redirected(&self) -> bool {
        self.requested != self.resolved
    }
}

/// Tracks the current location and applies the guard to every move.
pub struct Router {
    guard: RouteGuard,
    current: Location,
    events: Option<broadcast::Receiver<AppEvent>>,
}

impl Router {
    /// Start on the dashboard, which needs no session.
    pub fn new(guard: RouteGuard) -> Self {
        Self {
            guard,
            current: Location::new(Route::Dashboard),
            events: None,
        }
    }

    /// Follow navigation requests published on `bus`.
    pub fn attach(&mut self, bus: &EventBus) {
        self.events = Some(bus.subscribe());
    }

    pub fn current(&self) -> &Location {
        &self.current
    }

    pub fn navigate(&mut self, to: Location) -> Navigation {
        let requested = to.clone();
        let mut target = to;

        for _ in 0..MAX_REDIRECTS {
            match self.guard.check(&target) {
                GuardDecision::Allow => break,
                GuardDecision::Redirect(next) => {
                    debug!(from = %target, to = %next, "Navigation redirected");
                    target = next;
                }
            }
        }

        self.current = target.clone();
        Navigation {
            requested,
            resolved: target,
        }
    }

    /// Apply every navigation event received since the last call.
    /// Non-navigation events are skipped.
    pub fn process_events(&mut self) -> Vec<Navigation> {
        let Some(mut rx) = self.events.take() else {
            return Vec::new();
        };

        let mut navigations = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(AppEvent::Navigate(location)) => navigations.push(self.navigate(location)),
                Ok(AppEvent::Notice(_)) => {}
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Router missed navigation events");
                }
                Err(_) => break,
            }
        }

        self.events = Some(rx);
        navigations
    }
}
