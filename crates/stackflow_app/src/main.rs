// SPDX-License-Identifier: MIT OR Apache-2.0
//! `StackFlow` - visual editor for AI stack pipelines
//!
//! A desktop front-end featuring:
//! - Flow canvas with a node palette, wiring and live value propagation
//! - Inspector for node settings, synced to the stack backend
//! - Saved stacks list with a create dialog
//! - Template gallery
//!
//! ## Architecture
//!
//! The graph model and canvas live in `stackflow_graph`. This binary hosts
//! them in an egui window with `egui_dock` panels and talks to the backend
//! through a background REST client.

mod api;
mod app;
mod models;
mod panel_types;
mod panels;
mod settings;
mod store;

use app::StackflowApp;
use settings::{AppSettings, SETTINGS_FILE_NAME};
use std::path::Path;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Log directives added on top of `RUST_LOG`
const DEFAULT_LOG_DIRECTIVES: [&str; 4] = [
    "stackflow_app=debug",
    "stackflow_graph=debug",
    "wgpu=warn",
    "naga=warn",
];

fn main() {
    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in DEFAULT_LOG_DIRECTIVES {
        match directive.parse() {
            Ok(directive) => env_filter = env_filter.add_directive(directive),
            Err(e) => eprintln!("Invalid log directive {directive:?}: {e}"),
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting StackFlow v{}", env!("CARGO_PKG_VERSION"));

    let settings = AppSettings::load_or_default(Path::new(SETTINGS_FILE_NAME));

    if let Err(e) = StackflowApp::run(settings) {
        tracing::error!("StackFlow exited with an error: {e}");
        std::process::exit(1);
    }
}
