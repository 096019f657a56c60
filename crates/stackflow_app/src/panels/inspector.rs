// SPDX-License-Identifier: MIT OR Apache-2.0
//! Inspector panel - selected node properties and backend sync.

use crate::api::ApiService;
use crate::models::{UpdateKnowledgeBaseRequest, UpdateLlmRequest};
use crate::store::ConfigState;
use stackflow_graph::node::{KnowledgeBaseConfig, LlmConfig};
use stackflow_graph::{CanvasController, NodeConfig};

/// Update body for an LLM node's settings. An empty API key is left out so
/// the stored key is kept.
pub fn llm_update_request(config: &LlmConfig) -> UpdateLlmRequest {
    UpdateLlmRequest {
        model: Some(config.model.clone()),
        api_key: non_empty(&config.api_key),
        temperature: Some(f64::from(config.temperature)),
        ..Default::default()
    }
}

/// Update body for a knowledge base node's settings. An empty API key is left
/// out so the stored key is kept.
pub fn knowledge_base_update_request(config: &KnowledgeBaseConfig) -> UpdateKnowledgeBaseRequest {
    UpdateKnowledgeBaseRequest {
        embedding_model: Some(config.embedding_model.clone()),
        api_key: non_empty(&config.api_key),
        ..Default::default()
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// The inspector panel
pub struct InspectorPanel;

impl InspectorPanel {
    /// Create a new inspector panel
    pub fn new() -> Self {
        Self
    }

    /// Render the inspector panel
    pub fn ui(
        &mut self,
        ui: &mut egui::Ui,
        canvas: &mut CanvasController,
        config: &mut ConfigState,
        api: &ApiService,
    ) {
        egui::ScrollArea::vertical().show(ui, |ui| {
            canvas.inspector_ui(ui);

            let Some(node_config) = canvas.selected_node().map(|n| n.config().clone()) else {
                return;
            };

            match node_config {
                NodeConfig::Llm(llm) => {
                    ui.separator();
                    Self::llm_backend_ui(ui, &llm, config, api);
                }
                NodeConfig::KnowledgeBase(kb) => {
                    ui.separator();
                    Self::knowledge_base_backend_ui(ui, &kb, config, api);
                }
                NodeConfig::UserQuery(_) | NodeConfig::Output(_) => {}
            }
        });
    }

    fn llm_backend_ui(ui: &mut egui::Ui, llm: &LlmConfig, config: &mut ConfigState, api: &ApiService) {
        ui.label("Backend");

        if config.llm_loading {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.weak("Loading stored settings...");
            });
        } else if let Some(details) = &config.llm_details {
            ui.weak(format!(
                "Stored: {} ({}), temperature {:.2}",
                details.model, details.provider, details.temperature
            ));
        }

        ui.horizontal(|ui| {
            let label = if config.llm_update_loading { "Saving..." } else { "Save LLM settings" };
            if ui
                .add_enabled(!config.llm_update_loading, egui::Button::new(label))
                .clicked()
            {
                config.clear_llm_update_error();
                api.update_llm_details(llm_update_request(llm));
            }
            if ui
                .add_enabled(!config.llm_loading, egui::Button::new("Reload"))
                .clicked()
            {
                api.fetch_stack_details();
            }
        });

        let errors = [config.llm_error.clone(), config.llm_update_error.clone()];
        if error_lines(ui, &errors) {
            config.clear_llm_errors();
        }
    }

    fn knowledge_base_backend_ui(
        ui: &mut egui::Ui,
        kb: &KnowledgeBaseConfig,
        config: &mut ConfigState,
        api: &ApiService,
    ) {
        ui.label("Backend");

        if let Some(details) = &config.knowledge_base_details {
            ui.weak(format!(
                "Stored: {} ({})",
                details.name,
                details.embedding_model.as_deref().unwrap_or("no embedding model")
            ));
        }

        let busy = config.knowledge_base_update_loading;
        let label = if busy { "Saving..." } else { "Save Knowledge Base settings" };
        if ui.add_enabled(!busy, egui::Button::new(label)).clicked() {
            config.clear_knowledge_base_update_error();
            api.update_knowledge_base_details(knowledge_base_update_request(kb));
        }

        let errors = [
            config.knowledge_base_error.clone(),
            config.knowledge_base_update_error.clone(),
        ];
        if error_lines(ui, &errors) {
            config.clear_knowledge_base_errors();
        }
    }
}

impl Default for InspectorPanel {
    fn default() -> Self {
        Self::new()
    }
}

/// Show error messages with a dismiss button; returns true when dismissed
fn error_lines(ui: &mut egui::Ui, errors: &[Option<String>]) -> bool {
    let messages: Vec<&str> = errors.iter().flatten().map(String::as_str).collect();
    if messages.is_empty() {
        return false;
    }
    for message in &messages {
        ui.colored_label(ui.visuals().error_fg_color, *message);
    }
    ui.small_button("Dismiss").clicked()
}
