// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the sso-session project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Plain-text views
//!
//! View models for the Home, Public, Profile, Course and Navbar pages. They
//! only read the session and resource responses; all decisions about what
//! may be shown belong to the route guard.

use std::fmt;

use chrono::{DateTime, Local, Utc};
use serde::Deserialize;

use crate::resource::ResourceResponse;
use crate::session::Session;

/// Navbar button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    Login,
    Logout,
}

impl NavAction {
    pub fn for_session(session: &Session) -> Self {
        if session.is_authenticated() {
            Self::Logout
        } else {
            Self::Login
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Login => "Login",
            Self::Logout => "Logout",
        }
    }
}

/// Links of the Home page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeView {
    pub greeting: String,
    pub links: Vec<&'static str>,
}

impl HomeView {
    pub fn new(session: &Session) -> Self {
        if session.is_authenticated() {
            let name = session.claims().name().unwrap_or("User");
            Self {
                greeting: format!("Hello, {}!", name),
                links: vec!["/public", "/course"],
            }
        } else {
            Self {
                greeting: "Please login to access more features.".to_string(),
                links: vec!["/public"],
            }
        }
    }
}

impl fmt::Display for HomeView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Welcome to MyApp")?;
        writeln!(f, "{}", self.greeting)?;
        write!(f, "Links: {}", self.links.join(" "))
    }
}

pub fn public_page() -> &'static str {
    "Public Page\nThis page is accessible to everyone, even if you are not logged in."
}

/// User information shown on the Profile page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileView {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub roles: String,
    pub groups: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub token: Option<String>,
}

impl ProfileView {
    /// Build the view; the raw token is included only when `show_token` is set
    pub fn new(session: &Session, show_token: bool) -> Self {
        let claims = session.claims();
        let groups = claims.groups();
        Self {
            name: claims.name().map(str::to_string),
            username: claims.preferred_username().map(str::to_string),
            email: claims.email().map(str::to_string),
            roles: claims.realm_roles().join(", "),
            groups: if groups.is_empty() {
                "None".to_string()
            } else {
                groups.join(", ")
            },
            expires_at: session.expires_at(),
            token: if show_token {
                session.raw_token().map(str::to_string)
            } else {
                None
            },
        }
    }
}

impl fmt::Display for ProfileView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "User Information")?;
        writeln!(f, "Name: {}", self.name.as_deref().unwrap_or(""))?;
        writeln!(f, "Username: {}", self.username.as_deref().unwrap_or(""))?;
        writeln!(f, "Email: {}", self.email.as_deref().unwrap_or(""))?;
        writeln!(f, "Roles: {}", self.roles)?;
        writeln!(f, "Groups: {}", self.groups)?;
        match self.expires_at {
            Some(exp) => write!(
                f,
                "Token Expires At: {}",
                exp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
            )?,
            None => write!(f, "Token Expires At: unknown")?,
        }
        if let Some(token) = &self.token {
            write!(f, "\nAccess Token:\n{}", token)?;
        }
        Ok(())
    }
}

/// Course record returned by the resource API
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CourseInfo {
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default)]
    pub enrollment_date: Option<String>,
    #[serde(default)]
    pub expected_graduation: Option<String>,
    #[serde(default)]
    pub gpa: Option<serde_json::Value>,
    #[serde(default)]
    pub credits_completed: Option<serde_json::Value>,
}

/// What the Course page shows for a resource response
#[derive(Debug, Clone, PartialEq)]
pub enum CourseView {
    Course(CourseInfo),
    Error(String),
}

impl CourseView {
    pub fn from_response(response: &ResourceResponse) -> Self {
        if !response.is_ok() {
            return Self::Error(
                response
                    .message
                    .clone()
                    .unwrap_or_else(|| "An unexpected error occurred.".to_string()),
            );
        }
        let Some(payload) = &response.payload else {
            return Self::Error("No course data found.".to_string());
        };
        match serde_json::from_value::<CourseInfo>(payload.clone()) {
            Ok(info) => Self::Course(info),
            Err(e) => Self::Error(format!("Unreadable course data: {}", e)),
        }
    }
}

fn or_blank(value: &Option<serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

impl fmt::Display for CourseView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(message) => write!(f, "Error: {}", message),
            Self::Course(info) => {
                writeln!(f, "Your Course Information")?;
                writeln!(f, "Major: {}", info.major.as_deref().unwrap_or(""))?;
                writeln!(
                    f,
                    "Enrollment Date: {}",
                    info.enrollment_date.as_deref().unwrap_or("")
                )?;
                writeln!(
                    f,
                    "Expected Graduation: {}",
                    info.expected_graduation.as_deref().unwrap_or("")
                )?;
                writeln!(f, "GPA: {}", or_blank(&info.gpa))?;
                write!(f, "Credits Completed: {}", or_blank(&info.credits_completed))
            }
        }
    }
}
