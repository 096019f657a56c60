// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared panel type definitions.

/// Panel types that can be docked in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelType {
    /// Saved stacks and the create dialog
    Stacks,
    /// Node palette and canvas
    FlowEditor,
    /// Properties of the selected node
    Inspector,
    /// Template gallery
    Templates,
}

impl PanelType {
    /// Every panel, in menu order
    pub const ALL: [PanelType; 4] = [
        PanelType::Stacks,
        PanelType::FlowEditor,
        PanelType::Inspector,
        PanelType::Templates,
    ];

    /// Get the display name for this panel type
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stacks => "Stacks",
            Self::FlowEditor => "Flow Editor",
            Self::Inspector => "Inspector",
            Self::Templates => "Templates",
        }
    }

    /// Get the icon for this panel type
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Stacks => "\u{1f4da}",     // books
            Self::FlowEditor => "\u{1f500}", // branch
            Self::Inspector => "\u{2699}",   // cog
            Self::Templates => "\u{1f4cb}",  // clipboard
        }
    }
}
