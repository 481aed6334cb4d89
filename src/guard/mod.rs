// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the sso-session project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Route guarding
//!
//! Decides whether a view may render given the current session. The decision
//! itself is a pure function ([`decide`]); [`RouteGuard`] adds the side
//! effect of asking for a login when a protected view is requested by an
//! unauthenticated user.
//!
//! Login requests are debounced by the controller: however many times a
//! protected view is evaluated during one unauthenticated stay, the broker
//! sees a single login.

use std::sync::Arc;

use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::session::{Session, SessionController, SessionState};

/// One entry of the route table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Exact path, e.g. `/profile`
    pub path: String,
    /// Name of the view rendered for this path
    pub component: String,
    /// Whether the view needs an authenticated session
    #[serde(default)]
    pub requires_auth: bool,
}

impl Route {
    pub fn new(path: impl Into<String>, component: impl Into<String>, requires_auth: bool) -> Self {
        Self {
            path: path.into(),
            component: component.into(),
            requires_auth,
        }
    }
}

/// Ordered list of routes; the first exact match wins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    pub fn resolve(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.path == path)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

/// Outcome of [`decide`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Render,
    RequireLogin,
}

/// Pure guard policy
pub fn decide(route: &Route, session: &Session) -> RouteDecision {
    if !route.requires_auth || session.is_authenticated() {
        RouteDecision::Render
    } else {
        RouteDecision::RequireLogin
    }
}

/// Guard bound to a session controller
pub struct RouteGuard {
    controller: Arc<SessionController>,
    table: RouteTable,
}

impl RouteGuard {
    pub fn new(controller: Arc<SessionController>, table: RouteTable) -> Self {
        Self { controller, table }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Whether `route` may render now.
    ///
    /// A protected route requested without an authenticated session returns
    /// `false` and, once the controller is initialized, triggers a login for
    /// the current unauthenticated stay if none was triggered yet.
    pub async fn can_render(&self, route: &Route) -> bool {
        let state = self.controller.state();
        if !state.is_ready() && self.controller.options().block_until_ready {
            debug!("Session {}, holding {}", state, route.path);
            return false;
        }

        match decide(route, &self.controller.session()) {
            RouteDecision::Render => true,
            RouteDecision::RequireLogin => {
                if state == SessionState::Unauthenticated {
                    match self.controller.request_login_once().await {
                        Ok(true) => debug!("Login requested for {}", route.path),
                        Ok(false) => debug!("Login already requested, holding {}", route.path),
                        Err(e) => error!("Could not start login for {}: {}", route.path, e),
                    }
                }
                false
            }
        }
    }

    /// [`can_render`](Self::can_render) for a path of the route table.
    /// Unknown paths never render.
    pub async fn can_render_path(&self, path: &str) -> bool {
        match self.table.resolve(path) {
            Some(route) => self.can_render(route).await,
            None => {
                debug!("No route for {}", path);
                false
            }
        }
    }
}
