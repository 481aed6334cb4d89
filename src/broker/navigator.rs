// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the sso-session project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Redirect side effects
//!
//! Login and logout are full navigations to the broker. A browser host would
//! change `window.location`; a terminal host can only show the URL.

use std::sync::{Mutex, PoisonError};

use log::info;
use url::Url;

/// Performs a navigation to an external URL
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &Url);
}

/// Prints the URL so the user can open it in a browser
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, url: &Url) {
        info!("Redirecting to {}", url);
        println!("Open this URL in your browser to continue:\n  {}", url);
    }
}

/// Keeps every URL it was asked to visit
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<Url>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visited(&self) -> Vec<Url> {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<Url> {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &Url) {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.clone());
    }
}
