// SPDX-License-Identifier: MIT OR Apache-2.0
//! Canvas controller: owns the graph store and renders it with egui.
//!
//! Features:
//! - Node rendering with named handles
//! - Edge rendering (bezier curves)
//! - Pan/zoom navigation
//! - Node and edge selection, box selection
//! - Handle drag-to-connect
//! - Node dragging
//! - Palette drag-and-drop
//! - Minimap
//!
//! Every mutation goes through [`CanvasController::dispatch`]. Gestures and
//! node widgets only queue [`CanvasEvent`]s; the queue is flushed after the
//! frame has been drawn.

use crate::changes::{
    apply_edge_changes, apply_node_changes, selection_removal, EdgeChange, NodeChange,
};
use crate::connection::connect;
use crate::edge::{ConnectionCandidate, EdgeId};
use crate::factory::NodeFactory;
use crate::graph::{Graph, GraphStore};
use crate::handle::{self, HandleDirection, HandleRef};
use crate::node::{
    Node, NodeConfig, NodeId, NodeKind, Position, EMBEDDING_MODELS, LLM_MODELS, TEMPERATURE_RANGE,
};
use crate::propagation::{propagate, repropagate, PropagationReport};
use egui::{Color32, Pos2, Rect, Stroke, Vec2};
use std::sync::Arc;

/// Node visual dimensions
const NODE_WIDTH: f32 = 220.0;
const NODE_HEADER_HEIGHT: f32 = 40.0;
const NODE_BODY_HEIGHT: f32 = 36.0;
const PORT_HEIGHT: f32 = 22.0;
const PORT_RADIUS: f32 = 6.0;
const PORT_PADDING: f32 = 12.0;
const NODE_ROUNDING: f32 = 6.0;
const NODE_SHADOW_OFFSET: f32 = 3.0;
const CLOSE_GLYPH_SIZE: f32 = 14.0;

/// Edge visual parameters
const BEZIER_CURVATURE: f32 = 50.0;
const EDGE_THICKNESS: f32 = 2.5;
const EDGE_HIT_DISTANCE: f32 = 6.0;

/// Grid parameters
const GRID_SPACING: f32 = 20.0;

/// Zoom limits
const MIN_ZOOM: f32 = 0.1;
const MAX_ZOOM: f32 = 4.0;

/// Zoom step of the zoom buttons
const ZOOM_STEP: f32 = 1.2;
/// Screen margin kept around the graph by fit view
const FIT_PADDING: f32 = 40.0;

/// A request to change the graph.
///
/// Produced by gestures, node widgets and the inspector; consumed by
/// [`CanvasController::dispatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    /// Apply a batch of node changes
    NodesChanged(Vec<NodeChange>),
    /// Apply a batch of edge changes
    EdgesChanged(Vec<EdgeChange>),
    /// Validate and create an edge
    Connect(ConnectionCandidate),
    /// Create a node from a palette payload at a graph position
    Drop {
        /// Palette payload (node kind slug)
        payload: String,
        /// Drop position in graph space
        position: Position,
    },
    /// A node's input was edited
    InputChanged {
        /// Edited node
        node: NodeId,
        /// New input value
        value: String,
    },
    /// A node's configuration was edited
    ConfigEdited {
        /// Edited node
        node: NodeId,
        /// New configuration, must keep the node kind
        config: NodeConfig,
    },
    /// Remove every selected node and edge
    DeleteSelection,
}

/// Drag-and-drop payload carried from the palette onto the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteItem(pub NodeKind);

/// Mutation handle bound to a single node.
///
/// Node widgets never touch the store: they record what should happen here and
/// the controller applies it once the frame is drawn.
pub struct NodeActions<'a> {
    node: NodeId,
    queue: &'a mut Vec<CanvasEvent>,
}

impl NodeActions<'_> {
    /// The node these actions apply to
    pub fn node_id(&self) -> &NodeId {
        &self.node
    }

    /// Remove the node and its edges
    pub fn remove_node(&mut self) {
        self.queue
            .push(CanvasEvent::NodesChanged(vec![NodeChange::Remove(self.node.clone())]));
    }

    /// Remove an edge
    pub fn remove_edge(&mut self, edge: EdgeId) {
        self.queue
            .push(CanvasEvent::EdgesChanged(vec![EdgeChange::Remove(edge)]));
    }

    /// Set the node's input and propagate it downstream
    pub fn set_input(&mut self, value: impl Into<String>) {
        self.queue.push(CanvasEvent::InputChanged {
            node: self.node.clone(),
            value: value.into(),
        });
    }

    /// Replace the node's configuration
    pub fn edit_config(&mut self, config: NodeConfig) {
        self.queue.push(CanvasEvent::ConfigEdited {
            node: self.node.clone(),
            config,
        });
    }
}

/// Dragging state for creating edges
#[derive(Debug, Clone)]
pub struct ConnectionDrag {
    /// Handle the drag started on
    pub from: HandleRef,
    /// Current mouse position (screen space)
    pub current_pos: Pos2,
}

/// Box selection state
#[derive(Debug, Clone)]
pub struct BoxSelection {
    /// Start position (screen space)
    pub start: Pos2,
    /// Current position (screen space)
    pub current: Pos2,
}

impl BoxSelection {
    fn rect(&self) -> Rect {
        Rect::from_two_pos(self.start, self.current)
    }
}

/// Canvas interaction mode
#[derive(Debug, Clone, Default)]
pub enum InteractionMode {
    /// Default mode - selecting and dragging
    #[default]
    Normal,
    /// Panning the view
    Panning,
    /// Dragging selected nodes
    DraggingNodes {
        /// Nodes being moved
        nodes: Vec<NodeId>,
    },
    /// Creating an edge
    CreatingConnection(ConnectionDrag),
    /// Box selection
    BoxSelect(BoxSelection),
}

/// Owns the graph of one editing session together with its view state
pub struct CanvasController {
    store: GraphStore,
    factory: NodeFactory,
    /// Current pan offset (graph space)
    pub pan: Vec2,
    /// Current zoom level
    pub zoom: f32,
    /// Current interaction mode
    pub mode: InteractionMode,
    /// Show minimap
    pub show_minimap: bool,
    /// Show grid
    pub show_grid: bool,
    /// Snap to grid
    pub snap_to_grid: bool,
    /// Grid size for snapping
    pub snap_size: f32,
    pending: Vec<CanvasEvent>,
    last_report: Option<PropagationReport>,
    viewport: Vec2,
    last_mouse_pos: Pos2,
    hovered_node: Option<NodeId>,
    hovered_handle: Option<HandleRef>,
    hovered_edge: Option<EdgeId>,
}

impl CanvasController {
    /// Create a controller editing the given graph
    pub fn new(graph: Graph) -> Self {
        Self {
            factory: NodeFactory::for_graph(&graph),
            store: GraphStore::new(graph),
            pan: Vec2::ZERO,
            zoom: 1.0,
            mode: InteractionMode::Normal,
            show_minimap: true,
            show_grid: true,
            snap_to_grid: false,
            snap_size: GRID_SPACING,
            pending: Vec::new(),
            last_report: None,
            viewport: Vec2::ZERO,
            last_mouse_pos: Pos2::ZERO,
            hovered_node: None,
            hovered_handle: None,
            hovered_edge: None,
        }
    }

    /// Current graph
    pub fn graph(&self) -> &Graph {
        self.store.graph()
    }

    /// Current graph snapshot
    pub fn snapshot(&self) -> Arc<Graph> {
        self.store.snapshot()
    }

    /// Number of graph transitions so far
    pub fn revision(&self) -> u64 {
        self.store.revision()
    }

    /// Report of the most recent propagation pass
    pub fn last_report(&self) -> Option<&PropagationReport> {
        self.last_report.as_ref()
    }

    /// Replace the edited graph and reset the view
    pub fn load(&mut self, graph: Graph) {
        tracing::info!(name = %graph.name, nodes = graph.node_count(), "Loading graph");
        self.factory = NodeFactory::for_graph(&graph);
        self.store.reset(graph);
        self.mode = InteractionMode::Normal;
        self.pending.clear();
        self.last_report = None;
        self.reset_view();
    }

    /// Return to the default pan and zoom
    pub fn reset_view(&mut self) {
        self.pan = Vec2::ZERO;
        self.zoom = 1.0;
    }

    /// Multiply the zoom, keeping the center of the canvas fixed
    pub fn zoom_by(&mut self, factor: f32) {
        let center = self.viewport / 2.0;
        let graph_center = center / self.zoom - self.pan;
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.pan = center / self.zoom - graph_center;
    }

    /// Zoom in one step
    pub fn zoom_in(&mut self) {
        self.zoom_by(ZOOM_STEP);
    }

    /// Zoom out one step
    pub fn zoom_out(&mut self) {
        self.zoom_by(1.0 / ZOOM_STEP);
    }

    /// Pan and zoom so every node is visible, never zooming past 100%
    pub fn fit_view(&mut self) {
        let Some(bounds) = graph_bounds(self.graph()) else {
            self.reset_view();
            return;
        };
        let available = self.viewport - Vec2::splat(FIT_PADDING * 2.0);
        if available.x <= 0.0 || available.y <= 0.0 {
            return;
        }
        self.zoom = (available.x / bounds.width())
            .min(available.y / bounds.height())
            .clamp(MIN_ZOOM, 1.0);
        self.pan = self.viewport / 2.0 / self.zoom - bounds.center().to_vec2();
    }

    /// First selected node
    pub fn selected_node(&self) -> Option<&Node> {
        self.graph().nodes().find(|n| n.selected)
    }

    /// Apply an event to the graph.
    ///
    /// Returns `true` if the graph changed.
    pub fn dispatch(&mut self, event: CanvasEvent) -> bool {
        match event {
            CanvasEvent::NodesChanged(changes) => {
                self.store.update(|graph| apply_node_changes(&changes, graph))
            }
            CanvasEvent::EdgesChanged(changes) => {
                self.store.update(|graph| apply_edge_changes(&changes, graph))
            }
            CanvasEvent::Connect(candidate) => self.store.update(|graph| connect(&candidate, graph)),
            CanvasEvent::Drop { payload, position } => {
                match self.factory.create_from_payload(&payload, position, self.store.graph()) {
                    Some(node) => self
                        .store
                        .update(|graph| apply_node_changes(&[NodeChange::Add(node)], graph)),
                    None => false,
                }
            }
            CanvasEvent::InputChanged { node, value } => {
                let report = &mut self.last_report;
                self.store.update(|graph| {
                    let (next, propagated) = propagate(graph, &node, &value);
                    *report = Some(propagated);
                    next
                })
            }
            CanvasEvent::ConfigEdited { node, config } => {
                let report = &mut self.last_report;
                self.store.update(|graph| {
                    let mut next = graph.clone();
                    match next.node_mut(&node) {
                        Some(target) => {
                            if !target.replace_config(config) {
                                return next;
                            }
                        }
                        None => {
                            tracing::debug!(node = %node, "Ignoring config edit for unknown node");
                            return next;
                        }
                    }
                    let (next, propagated) = repropagate(&next, &node);
                    *report = Some(propagated);
                    next
                })
            }
            CanvasEvent::DeleteSelection => {
                let (nodes, edges) = selection_removal(self.store.graph());
                if nodes.is_empty() && edges.is_empty() {
                    return false;
                }
                self.store
                    .update(|graph| apply_node_changes(&nodes, &apply_edge_changes(&edges, graph)))
            }
        }
    }

    /// Mutation handle bound to a node; queued events apply on [`Self::flush`]
    pub fn actions_for(&mut self, node: NodeId) -> NodeActions<'_> {
        NodeActions {
            node,
            queue: &mut self.pending,
        }
    }

    /// Queue an event for the end of the frame
    pub fn queue(&mut self, event: CanvasEvent) {
        self.pending.push(event);
    }

    /// Dispatch every queued event in order.
    ///
    /// Returns `true` if any of them changed the graph.
    pub fn flush(&mut self) -> bool {
        let events = std::mem::take(&mut self.pending);
        let mut changed = false;
        for event in events {
            changed |= self.dispatch(event);
        }
        changed
    }

    /// Convert screen position to graph position; the canvas top-left is the origin
    pub fn screen_to_graph(&self, screen_pos: Pos2, rect: Rect) -> Pos2 {
        Pos2::new(
            (screen_pos.x - rect.left()) / self.zoom - self.pan.x,
            (screen_pos.y - rect.top()) / self.zoom - self.pan.y,
        )
    }

    /// Convert graph position to screen position
    pub fn graph_to_screen(&self, graph_pos: Pos2, rect: Rect) -> Pos2 {
        Pos2::new(
            (graph_pos.x + self.pan.x) * self.zoom + rect.left(),
            (graph_pos.y + self.pan.y) * self.zoom + rect.top(),
        )
    }

    /// Snap position to grid
    pub fn snap_position(&self, pos: Position) -> Position {
        if self.snap_to_grid && self.snap_size > 0.0 {
            Position::new(
                (pos.x / self.snap_size).round() * self.snap_size,
                (pos.y / self.snap_size).round() * self.snap_size,
            )
        } else {
            pos
        }
    }

    /// Graph position a palette item dropped at `screen_pos` lands on
    pub fn drop_position(&self, screen_pos: Pos2, rect: Rect) -> Position {
        let pos = self.screen_to_graph(screen_pos, rect);
        self.snap_position(Position::new(pos.x, pos.y))
    }

    /// Render the canvas and handle its gestures
    pub fn ui(&mut self, ui: &mut egui::Ui) {
        let rect = ui.available_rect_before_wrap();
        let response = ui.allocate_rect(rect, egui::Sense::click_and_drag());
        self.viewport = rect.size();
        let painter = ui.painter_at(rect);
        let graph = self.snapshot();

        // Draw grid
        if self.show_grid {
            self.draw_grid(&painter, rect);
        }

        // Handle input
        self.handle_input(ui, &response, rect, &graph);
        self.handle_palette_drop(ui, &response, rect);

        // Draw edges first (below nodes)
        self.draw_edges(&painter, rect, &graph);

        // Draw edge being created
        if let InteractionMode::CreatingConnection(ref drag) = self.mode {
            self.draw_connection_drag(&painter, rect, &graph, drag);
        }

        // Draw nodes
        self.draw_nodes(&painter, rect, &graph);

        // Draw box selection
        if let InteractionMode::BoxSelect(ref selection) = self.mode {
            draw_box_selection(&painter, selection);
        }

        // Draw minimap
        if self.show_minimap {
            self.draw_minimap(&painter, rect, &graph);
        }

        // Draw status bar
        self.draw_status_bar(&painter, rect, &graph);

        if self.flush() {
            ui.ctx().request_repaint();
        }
    }

    fn draw_grid(&self, painter: &egui::Painter, rect: Rect) {
        let spacing = GRID_SPACING * self.zoom;
        let major_spacing = spacing * 5.0;

        let grid_color_minor = Color32::from_rgba_unmultiplied(60, 60, 60, 100);
        let grid_color_major = Color32::from_rgba_unmultiplied(80, 80, 80, 150);

        let offset_x = (self.pan.x * self.zoom).rem_euclid(major_spacing);
        let offset_y = (self.pan.y * self.zoom).rem_euclid(major_spacing);

        for (step, color) in [(spacing, grid_color_minor), (major_spacing, grid_color_major)] {
            let mut x = rect.left() + offset_x % step;
            while x < rect.right() {
                painter.line_segment(
                    [Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())],
                    Stroke::new(1.0, color),
                );
                x += step;
            }

            let mut y = rect.top() + offset_y % step;
            while y < rect.bottom() {
                painter.line_segment(
                    [Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)],
                    Stroke::new(1.0, color),
                );
                y += step;
            }
        }
    }

    fn handle_input(&mut self, ui: &egui::Ui, response: &egui::Response, rect: Rect, graph: &Graph) {
        let mouse_pos = ui.input(|i| i.pointer.hover_pos().unwrap_or(self.last_mouse_pos));
        let delta = mouse_pos - self.last_mouse_pos;
        self.last_mouse_pos = mouse_pos;

        let graph_pos = self.screen_to_graph(mouse_pos, rect);
        self.hovered_node = find_node_at(graph_pos, graph);
        self.hovered_handle = find_handle_at(graph_pos, graph);
        self.hovered_edge = self.find_edge_at(mouse_pos, rect, graph);

        // Zoom with scroll wheel, keeping the point under the pointer fixed
        let scroll_delta = ui.input(|i| i.raw_scroll_delta.y);
        if scroll_delta != 0.0 && response.contains_pointer() {
            let old_zoom = self.zoom;
            self.zoom = (self.zoom * (1.0 + scroll_delta * 0.001)).clamp(MIN_ZOOM, MAX_ZOOM);
            if self.zoom != old_zoom {
                self.pan = (mouse_pos - rect.min) / self.zoom - graph_pos.to_vec2();
            }
        }

        let shift_held = ui.input(|i| i.modifiers.shift);

        match &mut self.mode {
            InteractionMode::Normal => {
                if response.dragged_by(egui::PointerButton::Middle) {
                    self.mode = InteractionMode::Panning;
                } else if response.clicked() {
                    self.handle_click(graph_pos, shift_held, graph);
                } else if response.drag_started_by(egui::PointerButton::Primary) {
                    self.start_drag(mouse_pos, graph_pos, graph);
                }
            }

            InteractionMode::Panning => {
                if response.dragged() {
                    self.pan += delta / self.zoom;
                }
                if response.drag_stopped() {
                    self.mode = InteractionMode::Normal;
                }
            }

            InteractionMode::DraggingNodes { nodes } => {
                let nodes = nodes.clone();
                let graph_delta = delta / self.zoom;
                let mut changes = Vec::new();
                if response.dragged() && graph_delta != Vec2::ZERO {
                    for id in nodes.iter() {
                        if let Some(node) = graph.node(id) {
                            let moved = node.position.translated(graph_delta.x, graph_delta.y);
                            changes.push(NodeChange::Position(id.clone(), moved));
                        }
                    }
                }
                let stopped = response.drag_stopped();
                if stopped && self.snap_to_grid {
                    for id in nodes.iter() {
                        if let Some(node) = graph.node(id) {
                            changes.push(NodeChange::Position(id.clone(), self.snap_position(node.position)));
                        }
                    }
                }
                if !changes.is_empty() {
                    self.pending.push(CanvasEvent::NodesChanged(changes));
                }
                if stopped {
                    self.mode = InteractionMode::Normal;
                }
            }

            InteractionMode::CreatingConnection(drag) => {
                drag.current_pos = mouse_pos;

                if response.drag_stopped() {
                    if let Some(target) = &self.hovered_handle {
                        if let Some(candidate) = connection_candidate(&drag.from, target) {
                            self.pending.push(CanvasEvent::Connect(candidate));
                        }
                    }
                    self.mode = InteractionMode::Normal;
                }
            }

            InteractionMode::BoxSelect(selection) => {
                selection.current = mouse_pos;

                if response.drag_stopped() {
                    let selection_rect = selection.rect();
                    let mut changes = Vec::new();
                    for node in graph.nodes() {
                        let node_screen = self.graph_to_screen(node_rect(node).min, rect);
                        let inside = selection_rect.contains(node_screen);
                        if inside && !node.selected {
                            changes.push(NodeChange::Select(node.id.clone(), true));
                        } else if !inside && node.selected && !shift_held {
                            changes.push(NodeChange::Select(node.id.clone(), false));
                        }
                    }
                    if !changes.is_empty() {
                        self.pending.push(CanvasEvent::NodesChanged(changes));
                    }
                    self.mode = InteractionMode::Normal;
                }
            }
        }

        // Delete key, unless a text field has focus
        let wants_keyboard = ui.ctx().wants_keyboard_input();
        let delete_pressed =
            ui.input(|i| i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace));
        if delete_pressed && !wants_keyboard && response.contains_pointer() {
            self.pending.push(CanvasEvent::DeleteSelection);
        }
    }

    fn handle_click(&mut self, graph_pos: Pos2, shift_held: bool, graph: &Graph) {
        if let Some(node_id) = self.hovered_node.clone() {
            if graph.node(&node_id).is_some_and(|n| close_glyph_rect(n).contains(graph_pos)) {
                self.actions_for(node_id).remove_node();
                return;
            }
            self.queue_selection(graph, Some(&node_id), None, shift_held);
        } else if let Some(edge_id) = self.hovered_edge.clone() {
            self.queue_selection(graph, None, Some(&edge_id), shift_held);
        } else if !shift_held {
            self.queue_selection(graph, None, None, false);
        }
    }

    fn start_drag(&mut self, mouse_pos: Pos2, graph_pos: Pos2, graph: &Graph) {
        if let Some(from) = self.hovered_handle.clone() {
            self.mode = InteractionMode::CreatingConnection(ConnectionDrag {
                from,
                current_pos: mouse_pos,
            });
        } else if let Some(node_id) = find_node_at(graph_pos, graph) {
            let grabbed_selected = graph.node(&node_id).is_some_and(|n| n.selected);
            let nodes = if grabbed_selected {
                graph.nodes().filter(|n| n.selected).map(|n| n.id.clone()).collect()
            } else {
                self.queue_selection(graph, Some(&node_id), None, false);
                vec![node_id]
            };
            self.mode = InteractionMode::DraggingNodes { nodes };
        } else {
            self.mode = InteractionMode::BoxSelect(BoxSelection {
                start: mouse_pos,
                current: mouse_pos,
            });
        }
    }

    /// Queue changes selecting `node` or `edge`; without `additive` everything else is deselected
    fn queue_selection(
        &mut self,
        graph: &Graph,
        node: Option<&NodeId>,
        edge: Option<&EdgeId>,
        additive: bool,
    ) {
        let mut node_changes = Vec::new();
        let mut edge_changes = Vec::new();

        for n in graph.nodes() {
            if Some(&n.id) == node {
                let selected = if additive { !n.selected } else { true };
                if selected != n.selected {
                    node_changes.push(NodeChange::Select(n.id.clone(), selected));
                }
            } else if n.selected && !additive {
                node_changes.push(NodeChange::Select(n.id.clone(), false));
            }
        }
        for e in graph.edges() {
            if Some(&e.id) == edge {
                let selected = if additive { !e.selected } else { true };
                if selected != e.selected {
                    edge_changes.push(EdgeChange::Select(e.id.clone(), selected));
                }
            } else if e.selected && !additive {
                edge_changes.push(EdgeChange::Select(e.id.clone(), false));
            }
        }

        if !node_changes.is_empty() {
            self.pending.push(CanvasEvent::NodesChanged(node_changes));
        }
        if !edge_changes.is_empty() {
            self.pending.push(CanvasEvent::EdgesChanged(edge_changes));
        }
    }

    fn handle_palette_drop(&mut self, ui: &egui::Ui, response: &egui::Response, rect: Rect) {
        let Some(item) = response.dnd_release_payload::<PaletteItem>() else {
            return;
        };
        let Some(screen_pos) = ui.input(|i| i.pointer.interact_pos()) else {
            return;
        };
        let position = self.drop_position(screen_pos, rect);
        tracing::debug!(kind = %item.0, x = position.x, y = position.y, "Palette item dropped");
        self.pending.push(CanvasEvent::Drop {
            payload: item.0.slug().to_string(),
            position,
        });
    }

    fn find_edge_at(&self, mouse_pos: Pos2, rect: Rect, graph: &Graph) -> Option<EdgeId> {
        let threshold = EDGE_HIT_DISTANCE * self.zoom.max(1.0);
        graph
            .edges()
            .filter_map(|edge| {
                let (from, to) = edge_anchors(graph, edge)?;
                let points = self.bezier_between(
                    self.graph_to_screen(from, rect),
                    self.graph_to_screen(to, rect),
                );
                let distance = points
                    .iter()
                    .map(|p| p.distance(mouse_pos))
                    .fold(f32::INFINITY, f32::min);
                (distance < threshold).then(|| (edge.id.clone(), distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    fn draw_edges(&self, painter: &egui::Painter, rect: Rect, graph: &Graph) {
        for edge in graph.edges() {
            let Some((from, to)) = edge_anchors(graph, edge) else {
                continue;
            };
            let is_hovered = self.hovered_edge.as_ref() == Some(&edge.id);

            let [r, g, b] = graph
                .node(&edge.source)
                .map(|n| n.kind().color())
                .unwrap_or([128, 128, 128]);
            let color = if edge.selected {
                Color32::WHITE
            } else if is_hovered {
                Color32::from_rgb(r.saturating_add(50), g.saturating_add(50), b.saturating_add(50))
            } else {
                Color32::from_rgb(r, g, b)
            };

            self.draw_bezier(
                painter,
                self.graph_to_screen(from, rect),
                self.graph_to_screen(to, rect),
                color,
            );
        }
    }

    fn bezier_between(&self, from: Pos2, to: Pos2) -> Vec<Pos2> {
        let distance = (to.x - from.x).abs();
        let curvature = (BEZIER_CURVATURE * self.zoom).max(distance * 0.5);

        let ctrl1 = Pos2::new(from.x + curvature, from.y);
        let ctrl2 = Pos2::new(to.x - curvature, to.y);
        bezier_points(from, ctrl1, ctrl2, to, 32)
    }

    fn draw_bezier(&self, painter: &egui::Painter, from: Pos2, to: Pos2, color: Color32) {
        let points = self.bezier_between(from, to);
        for pair in points.windows(2) {
            painter.line_segment([pair[0], pair[1]], Stroke::new(EDGE_THICKNESS * self.zoom, color));
        }
    }

    fn draw_connection_drag(&self, painter: &egui::Painter, rect: Rect, graph: &Graph, drag: &ConnectionDrag) {
        let Some(node) = graph.node(&drag.from.node) else {
            return;
        };
        let Some(anchor) = handle_anchor(node, drag.from.name, drag.from.direction) else {
            return;
        };
        let anchor = self.graph_to_screen(anchor, rect);
        let [r, g, b] = node.kind().color();
        let color = Color32::from_rgb(r, g, b);

        match drag.from.direction {
            HandleDirection::Output => self.draw_bezier(painter, anchor, drag.current_pos, color),
            HandleDirection::Input => self.draw_bezier(painter, drag.current_pos, anchor, color),
        }
    }

    fn draw_nodes(&self, painter: &egui::Painter, rect: Rect, graph: &Graph) {
        for node in graph.nodes() {
            let graph_rect = node_rect(node);
            let screen_rect = Rect::from_min_size(
                self.graph_to_screen(graph_rect.min, rect),
                graph_rect.size() * self.zoom,
            );

            // Skip nodes outside the view
            if !screen_rect.intersects(rect) {
                continue;
            }

            let kind = node.kind();
            let is_hovered = self.hovered_node.as_ref() == Some(&node.id);

            // Shadow
            painter.rect_filled(
                screen_rect.translate(Vec2::splat(NODE_SHADOW_OFFSET)),
                NODE_ROUNDING * self.zoom,
                Color32::from_rgba_unmultiplied(0, 0, 0, 60),
            );

            // Background
            let bg_color = if node.selected {
                Color32::from_rgb(60, 70, 90)
            } else if is_hovered {
                Color32::from_rgb(52, 52, 56)
            } else {
                Color32::from_rgb(45, 45, 48)
            };
            painter.rect_filled(screen_rect, NODE_ROUNDING * self.zoom, bg_color);

            // Header
            let header_rect = Rect::from_min_size(
                screen_rect.min,
                Vec2::new(screen_rect.width(), NODE_HEADER_HEIGHT * self.zoom),
            );
            let [r, g, b] = kind.color();
            painter.rect_filled(
                header_rect,
                egui::Rounding {
                    nw: NODE_ROUNDING * self.zoom,
                    ne: NODE_ROUNDING * self.zoom,
                    sw: 0.0,
                    se: 0.0,
                },
                Color32::from_rgb(r, g, b),
            );
            painter.text(
                header_rect.left_top() + Vec2::new(8.0, 6.0) * self.zoom,
                egui::Align2::LEFT_TOP,
                kind.display_name(),
                egui::FontId::proportional(12.0 * self.zoom),
                Color32::WHITE,
            );
            painter.text(
                header_rect.left_bottom() + Vec2::new(8.0, -6.0) * self.zoom,
                egui::Align2::LEFT_BOTTOM,
                kind.description(),
                egui::FontId::proportional(9.0 * self.zoom),
                Color32::from_gray(225),
            );

            // Close glyph
            let close_rect = Rect::from_min_size(
                self.graph_to_screen(close_glyph_rect(node).min, rect),
                Vec2::splat(CLOSE_GLYPH_SIZE * self.zoom),
            );
            painter.text(
                close_rect.center(),
                egui::Align2::CENTER_CENTER,
                "×",
                egui::FontId::proportional(13.0 * self.zoom),
                Color32::WHITE,
            );

            // Body
            let body_top = screen_rect.bottom() - NODE_BODY_HEIGHT * self.zoom;
            painter.text(
                Pos2::new(screen_rect.left() + 8.0 * self.zoom, body_top + 4.0 * self.zoom),
                egui::Align2::LEFT_TOP,
                body_summary(node),
                egui::FontId::proportional(10.0 * self.zoom),
                Color32::from_gray(190),
            );

            // Selection outline
            if node.selected {
                painter.rect_stroke(
                    screen_rect,
                    NODE_ROUNDING * self.zoom,
                    Stroke::new(2.0, Color32::from_rgb(100, 150, 255)),
                );
            }

            self.draw_handles(painter, rect, node);
        }
    }

    fn draw_handles(&self, painter: &egui::Painter, rect: Rect, node: &Node) {
        let kind = node.kind();
        let [r, g, b] = kind.color();
        let color = Color32::from_rgb(r, g, b);
        let radius = PORT_RADIUS * self.zoom;

        for (direction, names) in [
            (HandleDirection::Input, kind.input_handles()),
            (HandleDirection::Output, kind.output_handles()),
        ] {
            for name in names {
                let Some(anchor) = handle_anchor(node, name, direction) else {
                    continue;
                };
                let pos = self.graph_to_screen(anchor, rect);
                let is_hovered = self.hovered_handle.as_ref().is_some_and(|h| {
                    h.node == node.id && h.name == *name && h.direction == direction
                });

                painter.circle_filled(pos, if is_hovered { radius * 1.3 } else { radius }, color);
                painter.circle_stroke(pos, radius, Stroke::new(1.0, Color32::from_gray(30)));

                let (label_pos, align) = match direction {
                    HandleDirection::Input => {
                        (Pos2::new(pos.x + PORT_PADDING * self.zoom, pos.y), egui::Align2::LEFT_CENTER)
                    }
                    HandleDirection::Output => {
                        (Pos2::new(pos.x - PORT_PADDING * self.zoom, pos.y), egui::Align2::RIGHT_CENTER)
                    }
                };
                painter.text(
                    label_pos,
                    align,
                    *name,
                    egui::FontId::proportional(10.0 * self.zoom),
                    Color32::from_gray(200),
                );
            }
        }
    }

    fn draw_minimap(&self, painter: &egui::Painter, rect: Rect, graph: &Graph) {
        let minimap_size = Vec2::new(150.0, 100.0);
        let minimap_rect = Rect::from_min_size(
            Pos2::new(rect.right() - minimap_size.x - 10.0, rect.bottom() - minimap_size.y - 30.0),
            minimap_size,
        );

        painter.rect_filled(minimap_rect, 4.0, Color32::from_rgba_unmultiplied(30, 30, 30, 200));
        painter.rect_stroke(minimap_rect, 4.0, Stroke::new(1.0, Color32::from_gray(60)));

        let Some(bounds) = graph_bounds(graph) else {
            return;
        };
        let bounds = bounds.expand(50.0);
        let scale = (minimap_rect.width() / bounds.width()).min(minimap_rect.height() / bounds.height());
        let to_minimap = |p: Pos2| minimap_rect.min + (p - bounds.min) * scale;

        for node in graph.nodes() {
            let node_rect = node_rect(node);
            let color = if node.selected {
                Color32::from_rgb(100, 150, 255)
            } else {
                let [r, g, b] = node.kind().color();
                Color32::from_rgb(r, g, b)
            };
            painter.rect_filled(
                Rect::from_min_size(to_minimap(node_rect.min), node_rect.size() * scale),
                2.0,
                color,
            );
        }

        // Viewport indicator
        let view_min = self.screen_to_graph(rect.min, rect);
        let view_max = self.screen_to_graph(rect.max, rect);
        painter.rect_stroke(
            Rect::from_min_max(to_minimap(view_min), to_minimap(view_max)).intersect(minimap_rect),
            2.0,
            Stroke::new(1.0, Color32::WHITE),
        );
    }

    fn draw_status_bar(&self, painter: &egui::Painter, rect: Rect, graph: &Graph) {
        let mut status = format!(
            "Nodes: {} | Edges: {} | Zoom: {:.0}% | Selected: {}",
            graph.node_count(),
            graph.edge_count(),
            self.zoom * 100.0,
            graph.nodes().filter(|n| n.selected).count(),
        );
        if let Some(report) = self.last_report.as_ref().filter(|r| !r.skipped.is_empty()) {
            status.push_str(&format!(" | Cycle: {} node(s) not recomputed", report.skipped.len()));
        }

        painter.text(
            Pos2::new(rect.left() + 5.0, rect.bottom() - 11.0),
            egui::Align2::LEFT_CENTER,
            status,
            egui::FontId::proportional(11.0),
            Color32::from_gray(150),
        );
    }

    /// Property form for the selected node
    pub fn inspector_ui(&mut self, ui: &mut egui::Ui) {
        let Some(node) = self.selected_node().cloned() else {
            ui.weak("Select a node to edit its properties");
            return;
        };

        ui.heading(node.kind().display_name());
        ui.weak(node.id.as_str());
        ui.separator();

        let edges: Vec<_> = self
            .graph()
            .edges_for_node(&node.id)
            .map(|e| (e.id.clone(), format!("{} → {}", e.source, e.target)))
            .collect();
        let mut actions = self.actions_for(node.id.clone());
        node_form(ui, &node, &mut actions);

        if !edges.is_empty() {
            ui.separator();
            ui.label("Connections");
            for (edge_id, label) in edges {
                ui.horizontal(|ui| {
                    ui.label(label);
                    if ui.small_button("Remove").clicked() {
                        actions.remove_edge(edge_id);
                    }
                });
            }
        }

        ui.separator();
        if ui.button("Delete node").clicked() {
            actions.remove_node();
        }

        self.flush();
    }
}

impl Default for CanvasController {
    fn default() -> Self {
        Self::new(Graph::default())
    }
}

/// Palette of draggable node kinds
pub fn palette_ui(ui: &mut egui::Ui) {
    for kind in NodeKind::ALL {
        let id = egui::Id::new(("stackflow-palette", kind.slug()));
        ui.dnd_drag_source(id, PaletteItem(kind), |ui| {
            let [r, g, b] = kind.color();
            egui::Frame::group(ui.style())
                .stroke(Stroke::new(1.0, Color32::from_rgb(r, g, b)))
                .show(ui, |ui| {
                    ui.set_min_width(160.0);
                    ui.strong(kind.display_name());
                    ui.small(kind.description());
                });
        });
        ui.add_space(4.0);
    }
}

/// Kind-specific form fields, reporting edits through `actions`
fn node_form(ui: &mut egui::Ui, node: &Node, actions: &mut NodeActions<'_>) {
    let mut config = node.config().clone();
    let mut changed = false;

    match &mut config {
        NodeConfig::UserQuery(query) => {
            ui.label("Query");
            let mut text = query.query.clone();
            if ui
                .add(egui::TextEdit::multiline(&mut text).hint_text("Write your query here"))
                .changed()
            {
                actions.set_input(text);
            }
        }
        NodeConfig::KnowledgeBase(kb) => {
            ui.label("Embedding Model");
            egui::ComboBox::from_id_salt("kb-embedding-model")
                .selected_text(kb.embedding_model.clone())
                .show_ui(ui, |ui| {
                    for model in EMBEDDING_MODELS {
                        changed |= ui
                            .selectable_value(&mut kb.embedding_model, model.to_string(), model)
                            .changed();
                    }
                });
            ui.label("API Key");
            changed |= ui
                .add(egui::TextEdit::singleline(&mut kb.api_key).password(true))
                .changed();
        }
        NodeConfig::Llm(llm) => {
            ui.label("Model");
            egui::ComboBox::from_id_salt("llm-model")
                .selected_text(llm.model.clone())
                .show_ui(ui, |ui| {
                    for model in LLM_MODELS {
                        changed |= ui
                            .selectable_value(&mut llm.model, model.to_string(), model)
                            .changed();
                    }
                });
            ui.label("API Key");
            changed |= ui
                .add(egui::TextEdit::singleline(&mut llm.api_key).password(true))
                .changed();
            ui.label("Prompt");
            changed |= ui
                .add(egui::TextEdit::multiline(&mut llm.prompt).desired_rows(4))
                .changed();
            ui.label("Temperature");
            changed |= ui
                .add(egui::Slider::new(&mut llm.temperature, TEMPERATURE_RANGE).step_by(0.05))
                .changed();
            changed |= ui.checkbox(&mut llm.web_search_enabled, "Web search").changed();
            if llm.web_search_enabled {
                ui.label("SERF API Key");
                changed |= ui
                    .add(egui::TextEdit::singleline(&mut llm.serf_api_key).password(true))
                    .changed();
            }
        }
        NodeConfig::Output(output) => {
            ui.label("Output Text");
            let mut text = output.output_text.as_str();
            ui.add(egui::TextEdit::multiline(&mut text).desired_rows(6));
        }
    }

    if changed {
        actions.edit_config(config);
    }
}

/// One-line summary drawn in the node body
fn body_summary(node: &Node) -> String {
    let text = match node.config() {
        NodeConfig::UserQuery(query) if !query.query.is_empty() => query.query.clone(),
        NodeConfig::KnowledgeBase(kb) => format!("Model: {}", kb.embedding_model),
        NodeConfig::Llm(llm) => format!("{} · t={:.2}", llm.model, llm.temperature),
        NodeConfig::Output(output) if !output.output_text.is_empty() => output.output_text.clone(),
        _ => node.kind().description().to_string(),
    };
    truncate(&text, 32)
}

fn truncate(text: &str, max_chars: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > max_chars || line.len() < text.len() {
        let cut: String = line.chars().take(max_chars).collect();
        format!("{cut}…")
    } else {
        line.to_string()
    }
}

/// Node bounds in graph space
/// Union of every node rectangle, in graph space
fn graph_bounds(graph: &Graph) -> Option<Rect> {
    graph.nodes().map(node_rect).reduce(|a, b| a.union(b))
}

fn node_rect(node: &Node) -> Rect {
    let kind = node.kind();
    let rows = kind.input_handles().len().max(kind.output_handles().len()).max(1);
    let height = NODE_HEADER_HEIGHT + rows as f32 * PORT_HEIGHT + NODE_BODY_HEIGHT;
    Rect::from_min_size(
        Pos2::new(node.position.x, node.position.y),
        Vec2::new(NODE_WIDTH, height),
    )
}

/// Close glyph bounds in graph space
fn close_glyph_rect(node: &Node) -> Rect {
    let rect = node_rect(node);
    Rect::from_min_size(
        Pos2::new(rect.right() - CLOSE_GLYPH_SIZE - 6.0, rect.top() + 6.0),
        Vec2::splat(CLOSE_GLYPH_SIZE),
    )
}

/// Anchor of a named handle in graph space
fn handle_anchor(node: &Node, name: &str, direction: HandleDirection) -> Option<Pos2> {
    let kind = node.kind();
    let names = match direction {
        HandleDirection::Input => kind.input_handles(),
        HandleDirection::Output => kind.output_handles(),
    };
    let index = names.iter().position(|h| *h == name)?;
    let y = node.position.y + NODE_HEADER_HEIGHT + index as f32 * PORT_HEIGHT + PORT_HEIGHT / 2.0;
    let x = match direction {
        HandleDirection::Input => node.position.x,
        HandleDirection::Output => node.position.x + NODE_WIDTH,
    };
    Some(Pos2::new(x, y))
}

/// Graph-space endpoints of an edge, resolving default handles
fn edge_anchors(graph: &Graph, edge: &crate::edge::Edge) -> Option<(Pos2, Pos2)> {
    let source = graph.node(&edge.source)?;
    let target = graph.node(&edge.target)?;
    let source_handle = edge.source_handle.as_deref().unwrap_or(handle::OUTPUT);
    let target_handle = edge
        .target_handle
        .as_deref()
        .unwrap_or_else(|| target.kind().default_input_handle(source.kind()));
    Some((
        handle_anchor(source, source_handle, HandleDirection::Output)?,
        handle_anchor(target, target_handle, HandleDirection::Input)?,
    ))
}

/// Topmost node under a graph position
fn find_node_at(graph_pos: Pos2, graph: &Graph) -> Option<NodeId> {
    graph
        .nodes()
        .filter(|node| node_rect(node).contains(graph_pos))
        .last()
        .map(|node| node.id.clone())
}

/// Handle under a graph position
fn find_handle_at(graph_pos: Pos2, graph: &Graph) -> Option<HandleRef> {
    let hit_radius = PORT_RADIUS * 1.5;
    graph.nodes().find_map(|node| {
        let kind = node.kind();
        let inputs = kind.input_handles().iter().map(|h| (*h, HandleDirection::Input));
        let outputs = kind.output_handles().iter().map(|h| (*h, HandleDirection::Output));
        inputs.chain(outputs).find_map(|(name, direction)| {
            let anchor = handle_anchor(node, name, direction)?;
            (anchor.distance(graph_pos) < hit_radius).then(|| HandleRef {
                node: node.id.clone(),
                name,
                direction,
            })
        })
    })
}

/// Candidate for a drag between two handles, oriented output → input
fn connection_candidate(from: &HandleRef, to: &HandleRef) -> Option<ConnectionCandidate> {
    if from.direction != to.direction.opposite() {
        return None;
    }
    let (source, target) = match from.direction {
        HandleDirection::Output => (from, to),
        HandleDirection::Input => (to, from),
    };
    Some(
        ConnectionCandidate::new(source.node.clone(), target.node.clone())
            .with_handles(Some(source.name), Some(target.name)),
    )
}

fn draw_box_selection(painter: &egui::Painter, selection: &BoxSelection) {
    let rect = selection.rect();
    painter.rect_filled(rect, 0.0, Color32::from_rgba_unmultiplied(100, 150, 255, 30));
    painter.rect_stroke(rect, 0.0, Stroke::new(1.0, Color32::from_rgb(100, 150, 255)));
}

/// Generate points along a cubic bezier curve
fn bezier_points(p0: Pos2, p1: Pos2, p2: Pos2, p3: Pos2, segments: usize) -> Vec<Pos2> {
    (0..=segments)
        .map(|i| {
            let t = i as f32 / segments as f32;
            let mt = 1.0 - t;
            let a = mt * mt * mt;
            let b = 3.0 * mt * mt * t;
            let c = 3.0 * mt * t * t;
            let d = t * t * t;
            Pos2::new(
                a * p0.x + b * p1.x + c * p2.x + d * p3.x,
                a * p0.y + b * p1.y + c * p2.y + d * p3.y,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::starter_graph;

    fn controller() -> CanvasController {
        CanvasController::new(starter_graph())
    }

    #[test]
    fn test_drop_creates_node() {
        let mut canvas = controller();
        let changed = canvas.dispatch(CanvasEvent::Drop {
            payload: "llm".to_string(),
            position: Position::new(120.0, 80.0),
        });

        assert!(changed);
        assert_eq!(canvas.graph().node_count(), 5);
        let created: Vec<_> = canvas
            .graph()
            .nodes()
            .filter(|n| !starter_graph().contains_node(&n.id))
            .collect();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].kind(), NodeKind::Llm);
        assert_eq!(created[0].position, Position::new(120.0, 80.0));
        assert_eq!(created[0].config(), &NodeKind::Llm.default_config());
    }

    #[test]
    fn test_drop_after_add_with_same_id() {
        let mut canvas = CanvasController::new(Graph::new("test"));
        let added = Node::with_defaults("llm-1", NodeKind::Llm, Position::default());
        assert!(canvas.dispatch(CanvasEvent::NodesChanged(vec![NodeChange::Add(added)])));

        let changed = canvas.dispatch(CanvasEvent::Drop {
            payload: "llm".to_string(),
            position: Position::new(120.0, 80.0),
        });
        assert!(changed);
        assert_eq!(canvas.graph().node_count(), 2);
        assert_eq!(
            canvas.graph().node(&"llm-1".into()).map(|n| n.position),
            Some(Position::default())
        );
    }

    #[test]
    fn test_drop_unknown_payload() {
        let mut canvas = controller();
        assert!(!canvas.dispatch(CanvasEvent::Drop {
            payload: "chart".to_string(),
            position: Position::default(),
        }));
        assert_eq!(canvas.revision(), 0);
    }

    #[test]
    fn test_drop_position_uses_canvas_origin() {
        let mut canvas = controller();
        let rect = Rect::from_min_size(Pos2::new(50.0, 50.0), Vec2::new(800.0, 600.0));
        assert_eq!(canvas.drop_position(Pos2::new(170.0, 130.0), rect), Position::new(120.0, 80.0));

        canvas.pan = Vec2::new(10.0, 0.0);
        canvas.zoom = 2.0;
        assert_eq!(canvas.drop_position(Pos2::new(250.0, 210.0), rect), Position::new(90.0, 80.0));

        let screen = canvas.graph_to_screen(Pos2::new(90.0, 80.0), rect);
        assert_eq!(screen, Pos2::new(250.0, 210.0));

        canvas.snap_to_grid = true;
        assert_eq!(canvas.drop_position(Pos2::new(255.0, 215.0), rect), Position::new(100.0, 80.0));
    }

    #[test]
    fn test_input_propagates() {
        let mut canvas = controller();
        canvas.dispatch(CanvasEvent::InputChanged {
            node: "user-query".into(),
            value: "hello".to_string(),
        });

        let kb = canvas.graph().node(&"knowledge-base".into()).unwrap();
        assert_eq!(kb.value(), "hello");
        let report = canvas.last_report().unwrap();
        assert_eq!(report.updated.len(), 4);
    }

    #[test]
    fn test_config_edit_repropagates() {
        let mut canvas = controller();
        canvas.dispatch(CanvasEvent::InputChanged {
            node: "user-query".into(),
            value: "pdf".to_string(),
        });

        let mut config = canvas.graph().node(&"llm".into()).unwrap().config().clone();
        if let NodeConfig::Llm(llm) = &mut config {
            llm.prompt = "{query}!".to_string();
        }
        assert!(canvas.dispatch(CanvasEvent::ConfigEdited {
            node: "llm".into(),
            config,
        }));
        assert_eq!(canvas.graph().node(&"output".into()).unwrap().value(), "pdf!");
    }

    #[test]
    fn test_config_edit_cannot_change_kind() {
        let mut canvas = controller();
        let changed = canvas.dispatch(CanvasEvent::ConfigEdited {
            node: "llm".into(),
            config: NodeKind::Output.default_config(),
        });
        assert!(!changed);
        assert_eq!(canvas.graph().node(&"llm".into()).unwrap().kind(), NodeKind::Llm);
    }

    #[test]
    fn test_node_actions_apply_on_flush() {
        let mut canvas = controller();
        {
            let mut actions = canvas.actions_for("knowledge-base".into());
            actions.remove_edge("kb-to-llm".into());
            actions.remove_node();
        }
        assert_eq!(canvas.graph().node_count(), 4);

        assert!(canvas.flush());
        assert_eq!(canvas.graph().node_count(), 3);
        assert_eq!(canvas.graph().edge_count(), 2);
        assert!(!canvas.flush());
    }

    #[test]
    fn test_delete_selection() {
        let mut canvas = controller();
        canvas.dispatch(CanvasEvent::NodesChanged(vec![NodeChange::Select(
            "output".into(),
            true,
        )]));
        canvas.dispatch(CanvasEvent::EdgesChanged(vec![EdgeChange::Select(
            "user-query-to-kb".into(),
            true,
        )]));

        assert!(canvas.dispatch(CanvasEvent::DeleteSelection));
        assert_eq!(canvas.graph().node_count(), 3);
        assert_eq!(canvas.graph().edge_count(), 2);
        assert!(!canvas.dispatch(CanvasEvent::DeleteSelection));
    }

    #[test]
    fn test_connect_event() {
        let mut canvas = controller();
        let candidate = ConnectionCandidate::new("user-query", "output")
            .with_handles(Some(handle::OUTPUT), Some(handle::INPUT));
        assert!(canvas.dispatch(CanvasEvent::Connect(candidate)));
        assert!(!canvas.dispatch(CanvasEvent::Connect(ConnectionCandidate::new("output", "llm"))));
        assert_eq!(canvas.graph().edge_count(), 5);
    }

    #[test]
    fn test_drag_candidate_orientation() {
        let output = HandleRef {
            node: "a".into(),
            name: handle::OUTPUT,
            direction: HandleDirection::Output,
        };
        let input = HandleRef {
            node: "b".into(),
            name: handle::CONTEXT_INPUT,
            direction: HandleDirection::Input,
        };

        let forward = connection_candidate(&output, &input).unwrap();
        assert_eq!(forward, connection_candidate(&input, &output).unwrap());
        assert_eq!(forward.source, NodeId::from("a"));
        assert_eq!(forward.target_handle.as_deref(), Some(handle::CONTEXT_INPUT));
        assert!(connection_candidate(&output, &output).is_none());
    }

    #[test]
    fn test_hit_testing() {
        let graph = starter_graph();
        assert_eq!(find_node_at(Pos2::new(110.0, 110.0), &graph), Some(NodeId::from("user-query")));
        assert_eq!(find_node_at(Pos2::new(10.0, 10.0), &graph), None);

        let llm = graph.node(&"llm".into()).unwrap();
        let anchor = handle_anchor(llm, handle::CONTEXT_INPUT, HandleDirection::Input).unwrap();
        let hit = find_handle_at(anchor, &graph).unwrap();
        assert_eq!(hit.name, handle::CONTEXT_INPUT);
        assert_eq!(hit.node, NodeId::from("llm"));
    }

    #[test]
    fn test_zoom_buttons_keep_center() {
        let mut canvas = controller();
        canvas.viewport = Vec2::new(800.0, 600.0);
        canvas.pan = Vec2::new(-100.0, 20.0);
        let rect = Rect::from_min_size(Pos2::ZERO, canvas.viewport);
        let center = canvas.screen_to_graph(rect.center(), rect);

        canvas.zoom_in();
        assert!((canvas.zoom - ZOOM_STEP).abs() < 1e-5);
        assert!((canvas.screen_to_graph(rect.center(), rect) - center).length() < 1e-3);

        canvas.zoom_out();
        assert!((canvas.zoom - 1.0).abs() < 1e-5);
        assert!((canvas.screen_to_graph(rect.center(), rect) - center).length() < 1e-3);

        for _ in 0..50 {
            canvas.zoom_in();
        }
        assert_eq!(canvas.zoom, MAX_ZOOM);
    }

    #[test]
    fn test_fit_view_shows_every_node() {
        let mut canvas = controller();
        canvas.viewport = Vec2::new(800.0, 400.0);
        canvas.pan = Vec2::new(5000.0, 5000.0);
        canvas.fit_view();

        let rect = Rect::from_min_size(Pos2::ZERO, canvas.viewport);
        assert!(canvas.zoom <= 1.0);
        for node in canvas.graph().nodes() {
            let bounds = node_rect(node);
            let min = canvas.graph_to_screen(bounds.min, rect);
            let max = canvas.graph_to_screen(bounds.max, rect);
            assert!(rect.expand(0.01).contains(min), "{} starts off screen", node.id);
            assert!(rect.expand(0.01).contains(max), "{} ends off screen", node.id);
        }

        canvas.load(Graph::new("empty"));
        canvas.zoom = 2.0;
        canvas.fit_view();
        assert_eq!((canvas.pan, canvas.zoom), (Vec2::ZERO, 1.0));
    }

    #[test]
    fn test_load_resets_ids() {
        let mut canvas = CanvasController::default();
        canvas.load(starter_graph());
        canvas.dispatch(CanvasEvent::Drop {
            payload: "output".to_string(),
            position: Position::default(),
        });
        assert_eq!(canvas.graph().node_count(), 5);
        assert_eq!(canvas.revision(), 2);
    }
}
