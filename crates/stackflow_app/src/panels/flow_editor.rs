// SPDX-License-Identifier: MIT OR Apache-2.0
//! Flow editor panel - node palette, toolbar and canvas.

use stackflow_graph::ui::palette_ui;
use stackflow_graph::{CanvasController, CanvasEvent};

/// The flow editor panel
pub struct FlowEditorPanel {
    /// Show the node palette
    pub show_palette: bool,
}

impl FlowEditorPanel {
    /// Create a new flow editor panel
    pub fn new() -> Self {
        Self { show_palette: true }
    }

    /// Render the flow editor panel
    pub fn ui(&mut self, ui: &mut egui::Ui, canvas: &mut CanvasController) {
        egui::TopBottomPanel::top("flow_toolbar").show_inside(ui, |ui| {
            ui.horizontal(|ui| {
                ui.strong(&canvas.graph().name);
                ui.separator();
                ui.toggle_value(&mut self.show_palette, "Palette");
                ui.checkbox(&mut canvas.show_grid, "Grid");
                ui.checkbox(&mut canvas.snap_to_grid, "Snap");
                ui.checkbox(&mut canvas.show_minimap, "Minimap");
                ui.separator();
                if ui.button("-").on_hover_text("Zoom out").clicked() {
                    canvas.zoom_out();
                }
                ui.label(format!("{:.0}%", canvas.zoom * 100.0));
                if ui.button("+").on_hover_text("Zoom in").clicked() {
                    canvas.zoom_in();
                }
                if ui.button("Fit View").clicked() {
                    canvas.fit_view();
                }
                if ui.button("Reset View").clicked() {
                    canvas.reset_view();
                }
                let has_selection = canvas.graph().nodes().any(|n| n.selected)
                    || canvas.graph().edges().any(|e| e.selected);
                if ui
                    .add_enabled(has_selection, egui::Button::new("Delete Selection"))
                    .clicked()
                {
                    canvas.dispatch(CanvasEvent::DeleteSelection);
                }
            });
        });

        if self.show_palette {
            egui::SidePanel::left("flow_palette")
                .resizable(false)
                .default_width(170.0)
                .show_inside(ui, |ui| {
                    ui.heading("Components");
                    ui.weak("Drag onto the canvas");
                    ui.separator();
                    palette_ui(ui);
                });
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show_inside(ui, |ui| canvas.ui(ui));
    }
}

impl Default for FlowEditorPanel {
    fn default() -> Self {
        Self::new()
    }
}
