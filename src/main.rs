// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the sso-session project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Command line front-end: boots a session and renders one page
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};

use sso_session::broker::{ConsoleNavigator, KeycloakBroker, TokenSet};
use sso_session::config::{output_config_schema, Config};
use sso_session::guard::{RouteGuard, RouteTable};
use sso_session::resource::ResourceClient;
use sso_session::session::SessionController;
use sso_session::views::{public_page, CourseView, HomeView, NavAction, ProfileView};
use sso_session::SessionError;

/// Single-sign-on session client
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (YAML)
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// JSON file with tokens from a completed login
    /// (`access_token`, optional `refresh_token` and `id_token`)
    #[arg(long)]
    tokens: Option<PathBuf>,

    /// Page to render
    #[arg(short, long, default_value = "/")]
    route: String,

    /// Refresh the token before rendering
    #[arg(long)]
    refresh: bool,

    /// Start the login redirect instead of rendering
    #[arg(long, conflicts_with = "logout")]
    login: bool,

    /// Log out after rendering
    #[arg(long)]
    logout: bool,

    /// Show the raw access token on the profile page
    #[arg(long)]
    show_token: bool,

    /// Print the configuration JSON schema and exit
    #[arg(long)]
    show_config_schema: bool,

    /// Identity broker base URL
    #[arg(long)]
    broker_url: Option<String>,

    /// Broker realm
    #[arg(long)]
    realm: Option<String>,

    /// Client identifier
    #[arg(long)]
    client_id: Option<String>,

    /// Resource endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// Refresh threshold in seconds
    #[arg(long)]
    min_validity: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn load_tokens(path: &Path) -> Result<TokenSet> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read token file {:?}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid token file {:?}", path))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.show_config_schema {
        return output_config_schema();
    }

    let mut config = Config::from_file(&args.config)?;
    config.apply_args(
        args.broker_url.clone(),
        args.realm.clone(),
        args.client_id.clone(),
        args.endpoint.clone(),
        args.min_validity,
    );
    config.validate().context("Invalid configuration after overrides")?;
    debug!("Effective configuration: {:?}", config);

    let mut broker = KeycloakBroker::new(Arc::new(ConsoleNavigator));
    if let Some(path) = &args.tokens {
        broker = broker.with_tokens(load_tokens(path)?);
    }

    let controller = Arc::new(SessionController::new(
        Arc::new(broker),
        config.session.clone(),
    ));
    let state = controller
        .initialize(&config.broker)
        .await
        .context("Could not establish a session")?;
    info!("Session {}", state);

    if args.refresh && controller.session().is_authenticated() {
        match controller.refresh_default().await {
            Ok(true) => info!("Token refreshed"),
            Ok(false) => info!("Token still valid, not refreshed"),
            Err(SessionError::Refresh(reason)) => {
                warn!("Refresh rejected ({}), logging out", reason);
                controller.logout().await?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
    }

    if args.login {
        if controller.session().is_authenticated() {
            info!("Already logged in");
        } else {
            controller.login().await.context("Could not start login")?;
        }
        return Ok(());
    }

    let guard = RouteGuard::new(
        Arc::clone(&controller),
        RouteTable::new(config.routes.clone()),
    );
    let session = controller.session();
    println!("[{}]", NavAction::for_session(&session).label());

    if !guard.can_render_path(&args.route).await {
        println!("{} is not available. Please login.", args.route);
        return Ok(());
    }

    let component = guard
        .table()
        .resolve(&args.route)
        .map(|route| route.component.as_str())
        .unwrap_or("Home");
    match component {
        "Public" => println!("{}", public_page()),
        "Profile" => println!("{}", ProfileView::new(&session, args.show_token)),
        "Course" => {
            let client = ResourceClient::new(&config.resource)
                .context("Failed to build HTTP client")?
                .with_session(controller.reader());
            let response = client.fetch().await;
            println!("{}", CourseView::from_response(&response));
        }
        _ => println!("{}", HomeView::new(&session)),
    }

    if args.logout {
        controller.logout().await?;
    }

    Ok(())
}
