//! Application event loop.
//!
//! [`App`] hosts a single mounted view in a winit window. The event loop maps
//! window events onto the [`SceneController`]:
//!
//! 1. `resumed` creates the window and the renderer, then mounts the view
//! 2. the asset load runs on the async runtime and comes back as
//!    [`FlowEvent::AssetLoaded`]
//! 3. `Resized` feeds the resize observer
//! 4. `RedrawRequested` runs one frame-driver tick and asks for the next frame
//! 5. `CloseRequested` tears the view down and leaves the loop
//!
//! Activating the entry affordance, or pressing `X`, enters or leaves a
//! simulated immersive session.

use std::{rc::Rc, sync::Arc};

use instant::Instant;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    keyboard::Key,
    window::Window,
};

use crate::{
    config::ViewConfig,
    context::GpuRenderer,
    document::{Document, Viewport},
    error::{AssetError, RenderError},
    frame::TickOutcome,
    immersive::SimulatedSession,
    lifecycle::{AssetOutcome, LoadTicket, PendingAsset, SceneController, ViewHandle},
    resources::LoadedAsset,
    views,
};

#[cfg(not(target_arch = "wasm32"))]
type HostDocument = crate::document::VirtualDocument;
#[cfg(target_arch = "wasm32")]
type HostDocument = crate::web::WebDocument;

pub enum FlowEvent {
    /// The renderer finished initialising (the web creates it asynchronously).
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    RendererReady(anyhow::Result<GpuRenderer>),
    AssetLoaded {
        ticket: LoadTicket,
        result: Result<LoadedAsset, AssetError>,
    },
    /// The immersive entry affordance was activated.
    ToggleImmersive,
}

impl std::fmt::Debug for FlowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RendererReady(result) => f
                .debug_tuple("RendererReady")
                .field(&result.as_ref().map(|_| "GpuRenderer"))
                .finish(),
            Self::AssetLoaded { ticket, result } => f
                .debug_struct("AssetLoaded")
                .field("ticket", ticket)
                .field("ok", &result.is_ok())
                .finish(),
            Self::ToggleImmersive => f.write_str("ToggleImmersive"),
        }
    }
}

struct Mount {
    controller: SceneController<GpuRenderer>,
    handle: ViewHandle,
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<FlowEvent>,
    config: ViewConfig,
    document: HostDocument,
    window_size: Option<(u32, u32)>,
    window: Option<Arc<Window>>,
    mount: Option<Mount>,
    last_time: Instant,
}

impl App {
    fn new(
        event_loop: &EventLoop<FlowEvent>,
        config: ViewConfig,
        mut document: HostDocument,
        window_size: Option<(u32, u32)>,
    ) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        let affordance_proxy = proxy.clone();
        document.on_affordance(Rc::new(move |mode| {
            log::debug!("{:?} entry activated", mode);
            if affordance_proxy
                .send_event(FlowEvent::ToggleImmersive)
                .is_err()
            {
                log::debug!("event loop closed before the entry was handled");
            }
        }));
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime: tokio::runtime::Runtime::new()?,
            proxy,
            config,
            document,
            window_size,
            window: None,
            mount: None,
            last_time: Instant::now(),
        })
    }

    fn mount(&mut self, renderer: anyhow::Result<GpuRenderer>) {
        if self.mount.is_some() {
            log::warn!("{} view is already mounted", self.config.name);
            return;
        }
        let view = views::for_config(&self.config);
        let mounted = SceneController::mount(
            self.config.clone(),
            view,
            &mut self.document,
            move |_: &Viewport| renderer.map_err(|e| RenderError::Uninitialised(format!("{:#}", e))),
        );
        self.spawn_load(mounted.pending);
        self.mount = Some(Mount {
            controller: mounted.controller,
            handle: mounted.handle,
        });
        self.last_time = Instant::now();
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn spawn_load(&self, pending: PendingAsset) {
        let proxy = self.proxy.clone();
        let task = async move {
            let (ticket, result) = pending.resolve().await;
            if proxy
                .send_event(FlowEvent::AssetLoaded { ticket, result })
                .is_err()
            {
                log::debug!("event loop closed before the asset arrived");
            }
        };
        #[cfg(not(target_arch = "wasm32"))]
        self.async_runtime.spawn(task);
        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(task);
    }

    fn teardown(&mut self) {
        if let Some(mut mount) = self.mount.take() {
            mount
                .controller
                .teardown(&mut self.document, &mut mount.handle);
        }
    }

    fn toggle_immersive(&mut self) {
        let Some(mode) = self.config.immersive else {
            return;
        };
        let Some(mount) = &mut self.mount else {
            return;
        };
        if mount.controller.is_presenting() {
            mount.controller.exit_immersive();
        } else {
            mount
                .controller
                .enter_immersive(Box::new(SimulatedSession::start(mode)));
        }
    }

    fn redraw(&mut self) {
        let dt = self.last_time.elapsed();
        self.last_time = Instant::now();
        let Some(mount) = &mut self.mount else {
            return;
        };
        match mount.controller.tick(dt) {
            TickOutcome::Stopped => return,
            TickOutcome::Failed(RenderError::Outdated) => {
                log::debug!("surface was reconfigured");
            }
            TickOutcome::Failed(e) if e.is_fatal() => return,
            _ => {}
        }
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler<FlowEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let mut window_attributes =
            Window::default_attributes().with_title(format!("gallery: {}", self.config.name));
        if let Some((width, height)) = self.window_size {
            window_attributes =
                window_attributes.with_inner_size(winit::dpi::PhysicalSize::new(width, height));
        }

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowAttributesExtWebSys;

            let surface = self.document.acquire_surface();
            window_attributes = window_attributes.with_canvas(self.document.canvas(surface));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("cannot create a window: {}", e);
                event_loop.exit();
                return;
            }
        };
        let size = window.inner_size();
        self.document.sync_viewport(Viewport::new(
            size.width,
            size.height,
            window.scale_factor(),
        ));
        self.window = Some(window.clone());

        #[cfg(not(target_arch = "wasm32"))]
        {
            let renderer = self.async_runtime.block_on(GpuRenderer::new(window));
            self.mount(renderer);
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let renderer = GpuRenderer::new(window).await;
                if proxy.send_event(FlowEvent::RendererReady(renderer)).is_err() {
                    log::warn!("event loop closed before the renderer was ready");
                }
            });
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: FlowEvent) {
        match event {
            FlowEvent::RendererReady(renderer) => self.mount(renderer),
            FlowEvent::AssetLoaded { ticket, result } => {
                let Some(mount) = &mut self.mount else {
                    log::debug!("asset arrived after teardown");
                    return;
                };
                if let AssetOutcome::Attached(_) =
                    mount.controller.complete_asset_load(&ticket, result)
                {
                    if let Some(window) = &self.window {
                        window.request_redraw();
                    }
                }
            }
            FlowEvent::ToggleImmersive => self.toggle_immersive(),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.teardown();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                let pixel_ratio = self
                    .window
                    .as_ref()
                    .map_or(1.0, |window| window.scale_factor());
                self.document
                    .sync_viewport(Viewport::new(size.width, size.height, pixel_ratio));
                if let Some(mount) = &mut self.mount {
                    mount
                        .controller
                        .on_resize(&self.document, size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(),
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed && !event.repeat {
                    if let Key::Character(c) = &event.logical_key {
                        if c.eq_ignore_ascii_case("x") {
                            self.toggle_immersive();
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.teardown();
    }
}

fn init_logging() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_error_panic_hook::set_once();
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Could not initialize logger: {}", e).into());
        }
    }
}

/// Opens a window and runs the view described by `config` until it is closed.
///
/// `window_size` is the initial inner size in physical pixels; the platform
/// picks one when it is `None`.
pub fn run(config: ViewConfig, window_size: Option<(u32, u32)>) -> anyhow::Result<()> {
    init_logging();

    #[cfg(not(target_arch = "wasm32"))]
    let document = crate::document::VirtualDocument::default();
    #[cfg(target_arch = "wasm32")]
    let document = crate::web::WebDocument::new()?;

    let event_loop: EventLoop<FlowEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config, document, window_size)?;
    event_loop.run_app(&mut app)?;

    Ok(())
}
