// SPDX-License-Identifier: MIT OR Apache-2.0
//! Application panel implementations.

mod stacks;
mod flow_editor;
mod inspector;
mod templates;

pub use stacks::StacksPanel;
pub use flow_editor::FlowEditorPanel;
pub use inspector::InspectorPanel;
pub use templates::TemplatesPanel;

/// Requests a panel makes of the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelAction {
    /// Start a fresh canvas named after a stack or template and show it
    OpenCanvas(String),
}
