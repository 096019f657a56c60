// SPDX-License-Identifier: MIT OR Apache-2.0
//! Main application setup and event loop.

use crate::api::{ApiError, ApiService};
use crate::panel_types::PanelType;
use crate::panels::{FlowEditorPanel, InspectorPanel, PanelAction, StacksPanel, TemplatesPanel};
use crate::settings::{AppSettings, SettingsError, SETTINGS_FILE_NAME};
use crate::store::{ConfigState, StackState};
use egui_dock::{DockArea, DockState, NodeIndex, Style, TabViewer};
use egui_wgpu::wgpu;
use stackflow_graph::{CanvasController, CanvasEvent, StartLayout};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

/// Application errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Window creation failed
    #[error("Failed to create window: {0}")]
    WindowCreation(String),

    /// Renderer initialization failed
    #[error("Failed to initialize renderer: {0}")]
    RendererInit(String),

    /// Event loop error
    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings error
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// REST client setup failed
    #[error("API client error: {0}")]
    Api(#[from] ApiError),
}

/// Result type for application operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Tab viewer implementation for `egui_dock`
struct AppTabViewer<'a> {
    canvas: &'a mut CanvasController,
    api: &'a ApiService,
    stacks: &'a mut StackState,
    config: &'a mut ConfigState,
    stacks_panel: &'a mut StacksPanel,
    flow_editor: &'a mut FlowEditorPanel,
    inspector: &'a mut InspectorPanel,
    templates: &'a mut TemplatesPanel,
    actions: &'a mut Vec<PanelAction>,
}

impl TabViewer for AppTabViewer<'_> {
    type Tab = PanelType;

    fn title(&mut self, tab: &mut Self::Tab) -> egui::WidgetText {
        format!("{} {}", tab.icon(), tab.name()).into()
    }

    fn ui(&mut self, ui: &mut egui::Ui, tab: &mut Self::Tab) {
        match tab {
            PanelType::Stacks => self.stacks_panel.ui(ui, self.stacks, self.api, self.actions),
            PanelType::FlowEditor => self.flow_editor.ui(ui, self.canvas),
            PanelType::Inspector => self.inspector.ui(ui, self.canvas, self.config, self.api),
            PanelType::Templates => self.templates.ui(ui, self.actions),
        }
    }

    fn closeable(&mut self, tab: &mut Self::Tab) -> bool {
        *tab != PanelType::FlowEditor
    }
}

/// Graphics state for wgpu rendering
struct GraphicsState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    egui_renderer: egui_wgpu::Renderer,
}

impl GraphicsState {
    fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .map_err(|e| AppError::RendererInit(format!("surface: {e}")))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| AppError::RendererInit("no suitable GPU adapter".to_string()))?;

        tracing::info!("Using GPU: {}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("StackFlow Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            },
            None,
        ))
        .map_err(|e| AppError::RendererInit(format!("device: {e}")))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(wgpu::TextureFormat::is_srgb)
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| AppError::RendererInit("surface has no texture formats".to_string()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            egui_renderer,
        })
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    fn render(
        &mut self,
        egui_ctx: &egui::Context,
        full_output: egui::FullOutput,
        window: &Window,
    ) -> std::result::Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("StackFlow Encoder"),
        });

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: window.scale_factor() as f32,
        };

        let paint_jobs = egui_ctx.tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer.update_texture(&self.device, &self.queue, *id, image_delta);
        }

        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        {
            // egui-wgpu wants a 'static render pass
            let mut render_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("StackFlow Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color {
                                r: 0.1,
                                g: 0.1,
                                b: 0.1,
                                a: 1.0,
                            }),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                })
                .forget_lifetime();

            self.egui_renderer.render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        Ok(())
    }
}

/// Running state of the application
struct AppRunning {
    window: Arc<Window>,
    graphics: GraphicsState,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    app: AppInner,
}

/// Inner application state and panels
struct AppInner {
    settings: AppSettings,
    dock_state: DockState<PanelType>,
    canvas: CanvasController,
    api: ApiService,
    stacks: StackState,
    config: ConfigState,
    stacks_panel: StacksPanel,
    flow_editor: FlowEditorPanel,
    inspector: InspectorPanel,
    templates: TemplatesPanel,
    /// Whether the app should exit
    request_exit: bool,
}

impl AppInner {
    fn new(settings: AppSettings) -> Result<Self> {
        let api = ApiService::new(&settings.api)?;

        let mut canvas = CanvasController::new(settings.editor.start_layout.build());
        canvas.show_grid = settings.editor.show_grid;
        canvas.show_minimap = settings.editor.show_minimap;
        canvas.snap_to_grid = settings.editor.snap_to_grid;
        canvas.snap_size = settings.editor.snap_size;

        api.fetch_stacks();
        api.fetch_stack_details();

        Ok(Self {
            settings,
            dock_state: Self::create_default_layout(),
            canvas,
            api,
            stacks: StackState::default(),
            config: ConfigState::default(),
            stacks_panel: StacksPanel::new(),
            flow_editor: FlowEditorPanel::new(),
            inspector: InspectorPanel::new(),
            templates: TemplatesPanel::new(),
            request_exit: false,
        })
    }

    fn create_default_layout() -> DockState<PanelType> {
        // Canvas in the center
        let mut dock_state = DockState::new(vec![PanelType::FlowEditor]);
        let surface = dock_state.main_surface_mut();

        let [_center, _left] = surface.split_left(
            NodeIndex::root(),
            0.22,
            vec![PanelType::Stacks, PanelType::Templates],
        );

        let [_center, _right] = surface.split_right(NodeIndex::root(), 0.75, vec![PanelType::Inspector]);

        dock_state
    }

    fn update(&mut self, ctx: &egui::Context) {
        for event in self.api.drain() {
            self.stacks.apply(&event);
            self.config.apply(&event);
        }

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                self.file_menu(ui);
                self.edit_menu(ui);
                self.view_menu(ui);

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if self.stacks.loading || self.stacks.create_loading || self.config.is_busy() {
                        ui.spinner();
                    }
                    ui.weak(self.api_label());
                });
            });
        });

        let mut actions = Vec::new();
        let mut tab_viewer = AppTabViewer {
            canvas: &mut self.canvas,
            api: &self.api,
            stacks: &mut self.stacks,
            config: &mut self.config,
            stacks_panel: &mut self.stacks_panel,
            flow_editor: &mut self.flow_editor,
            inspector: &mut self.inspector,
            templates: &mut self.templates,
            actions: &mut actions,
        };

        DockArea::new(&mut self.dock_state)
            .style(Style::from_egui(ctx.style().as_ref()))
            .show(ctx, &mut tab_viewer);

        for action in actions {
            self.handle_action(action);
        }

        // Background requests finish between input events
        if self.stacks.loading || self.stacks.create_loading || self.config.is_busy() {
            ctx.request_repaint();
        }
    }

    fn api_label(&self) -> String {
        format!("API: {}", self.settings.api.base_url)
    }

    fn handle_action(&mut self, action: PanelAction) {
        match action {
            PanelAction::OpenCanvas(name) => {
                tracing::info!("Opening canvas for '{name}'");
                let mut graph = self.settings.editor.start_layout.build();
                graph.name = name;
                self.canvas.load(graph);
                self.open_panel(PanelType::FlowEditor);
            }
        }
    }

    fn new_canvas(&mut self, layout: StartLayout) {
        tracing::info!("New canvas: {}", layout.display_name());
        self.canvas.load(layout.build());
        self.open_panel(PanelType::FlowEditor);
    }

    fn file_menu(&mut self, ui: &mut egui::Ui) {
        ui.menu_button("File", |ui| {
            if ui.button("New Stack...").clicked() {
                self.stacks_panel.open_create_dialog(&mut self.stacks);
                self.open_panel(PanelType::Stacks);
                ui.close_menu();
            }

            ui.menu_button("New Canvas", |ui| {
                for layout in [StartLayout::Starter, StartLayout::Empty] {
                    if ui.button(layout.display_name()).clicked() {
                        self.new_canvas(layout);
                        ui.close_menu();
                    }
                }
            });

            ui.separator();

            if ui.button("Copy Graph as RON").clicked() {
                match self.canvas.graph().to_ron() {
                    Ok(text) => ui.ctx().copy_text(text),
                    Err(e) => tracing::error!("Failed to serialize graph: {e}"),
                }
                ui.close_menu();
            }

            if ui.button("Save Settings").clicked() {
                if let Err(e) = self.save_settings() {
                    tracing::error!("{e}");
                }
                ui.close_menu();
            }

            ui.separator();

            if ui.button("Exit").clicked() {
                self.request_exit = true;
                ui.close_menu();
            }
        });
    }

    fn edit_menu(&mut self, ui: &mut egui::Ui) {
        ui.menu_button("Edit", |ui| {
            if ui.button("Delete Selection").clicked() {
                self.canvas.dispatch(CanvasEvent::DeleteSelection);
                ui.close_menu();
            }

            ui.separator();

            if ui.button("Reload Stacks").clicked() {
                self.api.fetch_stacks();
                ui.close_menu();
            }
            if ui.button("Reload LLM Settings").clicked() {
                self.api.fetch_stack_details();
                ui.close_menu();
            }
            if ui.button("Clear Errors").clicked() {
                self.stacks.clear_errors();
                self.config.clear_all_errors();
                ui.close_menu();
            }
        });
    }

    fn view_menu(&mut self, ui: &mut egui::Ui) {
        ui.menu_button("View", |ui| {
            ui.menu_button("Panels", |ui| {
                for panel in PanelType::ALL {
                    if ui.button(panel.name()).clicked() {
                        self.open_panel(panel);
                        ui.close_menu();
                    }
                }
            });

            ui.separator();
            ui.checkbox(&mut self.canvas.show_grid, "Show Grid");
            ui.checkbox(&mut self.canvas.show_minimap, "Show Minimap");
            ui.checkbox(&mut self.canvas.snap_to_grid, "Snap to Grid");

            ui.separator();
            if ui.button("Reset Layout").clicked() {
                self.dock_state = Self::create_default_layout();
                ui.close_menu();
            }
        });
    }

    fn save_settings(&mut self) -> Result<()> {
        let editor = &mut self.settings.editor;
        editor.show_grid = self.canvas.show_grid;
        editor.show_minimap = self.canvas.show_minimap;
        editor.snap_to_grid = self.canvas.snap_to_grid;
        editor.snap_size = self.canvas.snap_size;

        let path = Path::new(SETTINGS_FILE_NAME);
        self.settings.save(path)?;
        tracing::info!("Saved settings to {}", path.display());
        Ok(())
    }

    fn open_panel(&mut self, panel: PanelType) {
        if let Some((surface, node, tab)) = self.dock_state.find_tab(&panel) {
            self.dock_state.set_active_tab((surface, node, tab));
            self.dock_state.set_focused_node_and_surface((surface, node));
        } else {
            self.dock_state.push_to_focused_leaf(panel);
        }
    }
}

/// Main application
pub struct StackflowApp {
    /// Settings consumed when the window is first created
    settings: Option<AppSettings>,
    running: Option<AppRunning>,
    /// Fatal error raised inside the event loop
    failure: Option<AppError>,
}

impl StackflowApp {
    /// Create a new application
    pub fn new(settings: AppSettings) -> Self {
        Self {
            settings: Some(settings),
            running: None,
            failure: None,
        }
    }

    /// Run the application until its window closes
    pub fn run(settings: AppSettings) -> Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Wait);

        let mut app = StackflowApp::new(settings);
        event_loop.run_app(&mut app)?;

        match app.failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop, settings: AppSettings) -> Result<AppRunning> {
        tracing::info!("Creating window...");

        let window_attrs = Window::default_attributes()
            .with_title("StackFlow")
            .with_inner_size(winit::dpi::LogicalSize::new(
                settings.window.width,
                settings.window.height,
            ))
            .with_min_inner_size(winit::dpi::LogicalSize::new(800, 600));

        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .map_err(|e| AppError::WindowCreation(e.to_string()))?,
        );

        tracing::info!("Initializing graphics...");
        let graphics = GraphicsState::new(window.clone())?;

        let egui_ctx = egui::Context::default();
        let app = AppInner::new(settings)?;

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            &window,
            Some(window.scale_factor() as f32),
            None,
            Some(2 * 1024), // max texture side
        );

        tracing::info!("Window size: {:?}", window.inner_size());

        Ok(AppRunning {
            window,
            graphics,
            egui_ctx,
            egui_state,
            app,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: AppError) {
        tracing::error!("{err}");
        self.failure = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for StackflowApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() {
            return;
        }
        let Some(settings) = self.settings.take() else {
            return;
        };

        match self.start(event_loop, settings) {
            Ok(running) => {
                running.window.request_redraw();
                self.running = Some(running);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(running) = &mut self.running else {
            return;
        };

        let response = running.egui_state.on_window_event(&running.window, &event);
        if response.repaint {
            running.window.request_redraw();
        }
        if response.consumed {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("Close requested, exiting...");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                tracing::debug!("Window resized to {:?}", new_size);
                running.graphics.resize(new_size);
                running.window.request_redraw();
            }
            WindowEvent::RedrawRequested => {
                let raw_input = running.egui_state.take_egui_input(&running.window);
                let full_output = running.egui_ctx.run(raw_input, |ctx| {
                    running.app.update(ctx);
                });

                if running.app.request_exit {
                    event_loop.exit();
                    return;
                }

                running
                    .egui_state
                    .handle_platform_output(&running.window, full_output.platform_output.clone());

                let repaint = full_output
                    .viewport_output
                    .get(&egui::ViewportId::ROOT)
                    .is_some_and(|v| v.repaint_delay.is_zero());

                match running.graphics.render(&running.egui_ctx, full_output, &running.window) {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = running.window.inner_size();
                        running.graphics.resize(size);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        let err = AppError::RendererInit("out of GPU memory".to_string());
                        self.fail(event_loop, err);
                        return;
                    }
                    Err(wgpu::SurfaceError::Timeout) => {
                        tracing::warn!("Surface timeout");
                    }
                }

                if repaint {
                    running.window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        // Pick up API results that arrived while the loop was idle
        if let Some(running) = &self.running {
            if running.app.stacks.loading
                || running.app.stacks.create_loading
                || running.app.config.is_busy()
            {
                running.window.request_redraw();
            }
        }
    }
}
