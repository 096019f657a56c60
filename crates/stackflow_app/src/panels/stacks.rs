// SPDX-License-Identifier: MIT OR Apache-2.0
//! Stacks panel - saved stacks and the create dialog.

use super::PanelAction;
use crate::api::ApiService;
use crate::models::{CreateStackRequest, Stack};
use crate::store::StackState;

/// Default name offered by the create dialog
const DEFAULT_STACK_NAME: &str = "Chat With PDF";

/// Default description offered by the create dialog
const DEFAULT_STACK_DESCRIPTION: &str = "Chat with your pdf docs";

/// Create dialog state
#[derive(Debug, Clone, PartialEq)]
struct CreateDialog {
    name: String,
    description: String,
    /// A create request was sent from this dialog and has not settled yet
    submitted: bool,
}

impl Default for CreateDialog {
    fn default() -> Self {
        Self {
            name: DEFAULT_STACK_NAME.to_string(),
            description: DEFAULT_STACK_DESCRIPTION.to_string(),
            submitted: false,
        }
    }
}

/// The stacks panel
pub struct StacksPanel {
    dialog: Option<CreateDialog>,
}

impl StacksPanel {
    /// Create a new stacks panel
    pub fn new() -> Self {
        Self { dialog: None }
    }

    /// Open the create dialog with its default values
    pub fn open_create_dialog(&mut self, stacks: &mut StackState) {
        stacks.clear_create_error();
        self.dialog = Some(CreateDialog::default());
    }

    /// Render the stacks panel
    pub fn ui(
        &mut self,
        ui: &mut egui::Ui,
        stacks: &mut StackState,
        api: &ApiService,
        actions: &mut Vec<PanelAction>,
    ) {
        ui.horizontal(|ui| {
            ui.heading("Your Stacks");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("+ New Stack").clicked() {
                    self.open_create_dialog(stacks);
                }
                if ui
                    .add_enabled(!stacks.loading, egui::Button::new("\u{21bb}"))
                    .on_hover_text("Reload")
                    .clicked()
                {
                    api.fetch_stacks();
                }
            });
        });

        ui.separator();

        if stacks.loading {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Loading stacks...");
            });
        } else if let Some(error) = stacks.error.clone() {
            ui.colored_label(ui.visuals().error_fg_color, format!("Error: {error}"));
            ui.horizontal(|ui| {
                if ui.button("Retry").clicked() {
                    api.fetch_stacks();
                }
                if ui.button("Dismiss").clicked() {
                    stacks.clear_errors();
                }
            });
        } else if stacks.stacks.is_empty() {
            ui.centered_and_justified(|ui| {
                ui.label("No stacks found. Create your first stack!");
            });
        } else {
            egui::ScrollArea::vertical().show(ui, |ui| {
                for (index, stack) in stacks.stacks.iter().enumerate() {
                    ui.push_id(index, |ui| stack_card(ui, stack, actions));
                }
            });
        }

        self.create_dialog_ui(ui.ctx(), stacks, api);
    }

    fn create_dialog_ui(&mut self, ctx: &egui::Context, stacks: &mut StackState, api: &ApiService) {
        let Some(dialog) = &mut self.dialog else {
            return;
        };

        if dialog.submitted && !stacks.create_loading {
            dialog.submitted = false;
            if stacks.create_error.is_none() {
                self.dialog = None;
                return;
            }
        }

        let mut open = true;
        let mut cancelled = false;
        egui::Window::new("Create New Stack")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                egui::Grid::new("create_stack_form")
                    .num_columns(2)
                    .spacing([8.0, 8.0])
                    .show(ui, |ui| {
                        ui.label("Name");
                        ui.text_edit_singleline(&mut dialog.name);
                        ui.end_row();

                        ui.label("Description");
                        ui.text_edit_multiline(&mut dialog.description);
                        ui.end_row();
                    });

                if let Some(error) = &stacks.create_error {
                    ui.colored_label(ui.visuals().error_fg_color, error);
                }

                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button("Cancel").clicked() {
                        cancelled = true;
                    }

                    let request = CreateStackRequest::from_form(&dialog.name, &dialog.description);
                    let label = if stacks.create_loading { "Creating..." } else { "Create" };
                    let enabled = request.is_some() && !stacks.create_loading;
                    if ui.add_enabled(enabled, egui::Button::new(label)).clicked() {
                        if let Some(request) = request {
                            tracing::info!("Creating stack '{}'", request.name);
                            api.create_stack(request);
                            dialog.submitted = true;
                        }
                    }
                });
            });

        if !open || cancelled {
            stacks.clear_create_error();
            self.dialog = None;
        }
    }
}

impl Default for StacksPanel {
    fn default() -> Self {
        Self::new()
    }
}

fn stack_card(ui: &mut egui::Ui, stack: &Stack, actions: &mut Vec<PanelAction>) {
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.set_width(ui.available_width());
        ui.horizontal(|ui| {
            ui.strong(&stack.name);
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Edit Stack").clicked() {
                    actions.push(PanelAction::OpenCanvas(stack.name.clone()));
                }
            });
        });
        if !stack.description.is_empty() {
            ui.label(&stack.description);
        }
        if let Some(created) = stack.created_at.as_deref().and_then(created_label) {
            ui.weak(format!("Created: {created}"));
        }
    });
    ui.add_space(4.0);
}

/// Date part of an ISO 8601 timestamp
fn created_label(timestamp: &str) -> Option<&str> {
    let date = timestamp.split(['T', ' ']).next()?.trim();
    (!date.is_empty()).then_some(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialog_defaults() {
        let dialog = CreateDialog::default();
        assert_eq!(dialog.name, "Chat With PDF");
        assert_eq!(dialog.description, "Chat with your pdf docs");
        assert!(CreateStackRequest::from_form(&dialog.name, &dialog.description).is_some());
    }

    #[test]
    fn test_open_dialog_clears_create_error() {
        let mut panel = StacksPanel::new();
        let mut stacks = StackState {
            create_error: Some("Failed to create stack".to_string()),
            ..Default::default()
        };
        panel.open_create_dialog(&mut stacks);
        assert!(stacks.create_error.is_none());
        assert_eq!(panel.dialog, Some(CreateDialog::default()));
    }

    #[test]
    fn test_created_label() {
        assert_eq!(created_label("2024-05-01T10:00:00Z"), Some("2024-05-01"));
        assert_eq!(created_label("2024-05-01 10:00:00"), Some("2024-05-01"));
        assert_eq!(created_label(""), None);
    }
}
