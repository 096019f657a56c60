// SPDX-License-Identifier: MIT OR Apache-2.0
//! Templates panel - gallery of pre-built stacks.

use super::PanelAction;

/// A pre-built stack template
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Template {
    /// Template ID
    pub id: u32,
    /// Display name
    pub name: &'static str,
    /// One-paragraph description
    pub description: &'static str,
    /// Gallery category
    pub category: &'static str,
    /// Average rating out of five
    pub rating: f32,
    /// Download count
    pub downloads: u32,
    /// Technology tags
    pub tags: &'static [&'static str],
}

/// Category that matches every template
pub const ALL_CATEGORIES: &str = "all";

/// Filter choices, in display order
pub const CATEGORIES: [&str; 5] = [ALL_CATEGORIES, "Chat", "Image", "Development", "Content"];

/// The template gallery
pub static TEMPLATES: [Template; 4] = [
    Template {
        id: 1,
        name: "ChatGPT Clone",
        description: "A complete chat application with OpenAI integration, real-time messaging, and user authentication.",
        category: "Chat",
        rating: 4.8,
        downloads: 1250,
        tags: &["OpenAI", "React", "Node.js", "Socket.io"],
    },
    Template {
        id: 2,
        name: "Image Generator",
        description: "AI-powered image generation app using DALL-E or Stable Diffusion with image editing capabilities.",
        category: "Image",
        rating: 4.6,
        downloads: 890,
        tags: &["DALL-E", "Python", "Flask", "React"],
    },
    Template {
        id: 3,
        name: "Code Assistant",
        description: "Intelligent code completion and debugging tool with GitHub integration and IDE plugins.",
        category: "Development",
        rating: 4.9,
        downloads: 2100,
        tags: &["GitHub", "VSCode", "TypeScript", "OpenAI"],
    },
    Template {
        id: 4,
        name: "Content Writer",
        description: "AI-powered content creation tool with SEO optimization and multiple content formats.",
        category: "Content",
        rating: 4.5,
        downloads: 750,
        tags: &["SEO", "WordPress", "Python", "GPT-4"],
    },
];

/// Templates in `category`, or every template for [`ALL_CATEGORIES`]
pub fn filter(category: &str) -> impl Iterator<Item = &'static Template> + '_ {
    TEMPLATES
        .iter()
        .filter(move |template| category == ALL_CATEGORIES || template.category == category)
}

/// The templates panel
pub struct TemplatesPanel {
    category: &'static str,
}

impl TemplatesPanel {
    /// Create a new templates panel
    pub fn new() -> Self {
        Self {
            category: ALL_CATEGORIES,
        }
    }

    /// Render the templates panel
    pub fn ui(&mut self, ui: &mut egui::Ui, actions: &mut Vec<PanelAction>) {
        ui.heading("Stack Templates");
        ui.weak("Choose from our curated collection of pre-built AI application templates");
        ui.add_space(4.0);

        ui.horizontal_wrapped(|ui| {
            for category in CATEGORIES {
                let label = if category == ALL_CATEGORIES { "All" } else { category };
                if ui.selectable_label(self.category == category, label).clicked() {
                    self.category = category;
                }
            }
        });

        ui.separator();

        egui::ScrollArea::vertical().show(ui, |ui| {
            for template in filter(self.category) {
                ui.push_id(template.id, |ui| template_card(ui, template, actions));
            }
        });
    }
}

impl Default for TemplatesPanel {
    fn default() -> Self {
        Self::new()
    }
}

fn template_card(ui: &mut egui::Ui, template: &Template, actions: &mut Vec<PanelAction>) {
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.set_width(ui.available_width());
        ui.horizontal(|ui| {
            ui.strong(template.name);
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.weak(format!("\u{2b50} {:.1}  \u{2b07} {}", template.rating, template.downloads));
            });
        });
        ui.weak(template.category);
        ui.label(template.description);
        ui.horizontal_wrapped(|ui| {
            for tag in template.tags {
                ui.small(*tag);
            }
        });
        if ui.button("Use Template").clicked() {
            actions.push(PanelAction::OpenCanvas(template.name.to_string()));
        }
    });
    ui.add_space(4.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_category() {
        let names: Vec<_> = filter(ALL_CATEGORIES).map(|t| t.name).collect();
        assert_eq!(
            names,
            vec!["ChatGPT Clone", "Image Generator", "Code Assistant", "Content Writer"]
        );
    }

    #[test]
    fn test_category_filter() {
        let matches: Vec<_> = filter("Development").collect();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].name, "Code Assistant");
        assert_eq!(matches[0].downloads, 2100);

        assert_eq!(filter("Audio").count(), 0);
    }

    #[test]
    fn test_every_category_has_a_template() {
        for category in CATEGORIES {
            assert!(filter(category).count() > 0, "{category}");
        }
    }
}
