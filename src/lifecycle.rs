//! Scene lifecycle.
//!
//! A [`SceneController`] owns one mounted view: its scene graph, camera,
//! renderer, immersive session and frame driver. Mounting hands back a
//! [`ViewHandle`] naming the document elements and listener the view created;
//! the same handle goes back into [`SceneController::teardown`], so the
//! controller never has to search the document for what it inserted.
//!
//! The asset is loaded outside the controller. [`SceneController::mount`]
//! returns the load as a [`PendingAsset`] whose [`LoadTicket`] carries the
//! controller's liveness flag; a completion that arrives after teardown finds
//! the flag down and is discarded without touching the scene.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use futures::FutureExt;

use crate::{
    camera::PerspectiveCamera,
    config::{AssetRequest, ViewConfig},
    data_structures::scene_graph::{NodeId, Scene},
    document::{Document, ElementId, ListenerId, Viewport},
    error::{AssetError, RenderError},
    frame::{FrameDriver, FrameState, TickOutcome},
    immersive::ImmersiveSession,
    renderer::{Released, Renderer, release_scene},
    resize,
    resources::{LoadedAsset, load_asset},
    views::SceneView,
};

static NEXT_MOUNT_ID: AtomicU64 = AtomicU64::new(1);

/// The document resources a mount created. Teardown takes each one out, so a
/// handle that went through teardown once names nothing.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ViewHandle {
    surface: Option<ElementId>,
    affordance: Option<ElementId>,
    listener: Option<ListenerId>,
}

impl ViewHandle {
    pub fn surface(&self) -> Option<ElementId> {
        self.surface
    }

    pub fn affordance(&self) -> Option<ElementId> {
        self.affordance
    }

    pub fn listener(&self) -> Option<ListenerId> {
        self.listener
    }

    /// Whether the resize listener of this mount is still registered with `document`.
    pub fn listens<D: Document + ?Sized>(&self, document: &D) -> bool {
        self.listener
            .is_some_and(|listener| document.has_resize_listener(listener))
    }

    pub fn is_released(&self) -> bool {
        *self == Self::default()
    }
}

/// Identifies the mount an asset load belongs to.
#[derive(Clone, Debug)]
pub struct LoadTicket {
    mount: u64,
    alive: Arc<AtomicBool>,
}

impl LoadTicket {
    /// `false` once the owning controller has been torn down.
    pub fn is_live(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn mount_id(&self) -> u64 {
        self.mount
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub type AssetFuture = futures::future::BoxFuture<'static, Result<LoadedAsset, AssetError>>;
#[cfg(target_arch = "wasm32")]
pub type AssetFuture = futures::future::LocalBoxFuture<'static, Result<LoadedAsset, AssetError>>;

/// An asset load that has not been awaited yet.
pub struct PendingAsset {
    pub ticket: LoadTicket,
    pub request: AssetRequest,
    pub future: AssetFuture,
}

impl PendingAsset {
    /// Awaits the load and pairs the result with its ticket, ready for
    /// [`SceneController::complete_asset_load`].
    pub async fn resolve(self) -> (LoadTicket, Result<LoadedAsset, AssetError>) {
        let result = self.future.await;
        (self.ticket, result)
    }
}

impl std::fmt::Debug for PendingAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingAsset")
            .field("ticket", &self.ticket)
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetOutcome {
    /// The asset is part of the scene and will be animated from the next tick on.
    Attached(NodeId),
    /// The load or the view rejected the asset. The view stays usable without it.
    Failed,
    /// The controller was torn down, or the ticket belongs to another mount.
    Discarded,
}

/// What a call to [`SceneController::teardown`] actually did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub listener_removed: bool,
    pub driver_stopped: bool,
    pub session_ended: bool,
    pub surface_removed: bool,
    pub released: Released,
    pub nodes_cleared: usize,
    pub affordance_removed: bool,
    pub renderer_disposed: bool,
}

impl TeardownReport {
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

/// Everything [`SceneController::mount`] produces.
pub struct Mounted<R: Renderer> {
    pub controller: SceneController<R>,
    pub handle: ViewHandle,
    pub pending: PendingAsset,
}

pub struct SceneController<R: Renderer> {
    name: &'static str,
    view: Option<Box<dyn SceneView>>,
    scene: Option<Scene>,
    camera: Option<PerspectiveCamera>,
    renderer: Option<R>,
    session: Option<Box<dyn ImmersiveSession>>,
    asset_node: Option<NodeId>,
    asset_failure: Option<String>,
    listener: Option<ListenerId>,
    frame: FrameDriver,
    alive: Arc<AtomicBool>,
    mount_id: u64,
}

impl<R: Renderer> SceneController<R> {
    /// Mounts a view into `document`.
    ///
    /// The drawable surface is taken from the document, which reuses a surface it
    /// already holds. A failing `make_renderer` is logged and leaves the controller
    /// without a renderer: ticks still animate, teardown still works.
    pub fn mount<D, F>(
        config: ViewConfig,
        mut view: Box<dyn SceneView>,
        document: &mut D,
        make_renderer: F,
    ) -> Mounted<R>
    where
        D: Document + ?Sized,
        F: FnOnce(&Viewport) -> Result<R, RenderError>,
    {
        let viewport = document.viewport();
        let mount_id = NEXT_MOUNT_ID.fetch_add(1, Ordering::Relaxed);
        log::info!(
            "mounting {} view #{} at {}x{} (pixel ratio {})",
            config.name,
            mount_id,
            viewport.width,
            viewport.height,
            viewport.pixel_ratio
        );

        let mut scene = Scene::new();
        let camera = PerspectiveCamera::new(&config.camera, viewport.width, viewport.height);
        let surface = document.acquire_surface();

        let renderer = match make_renderer(&viewport) {
            Ok(mut renderer) => {
                renderer.set_pixel_ratio(viewport.pixel_ratio);
                renderer.set_size(viewport.width, viewport.height);
                renderer.set_clear_colour(config.clear_colour);
                Some(renderer)
            }
            Err(e) => {
                log::error!("{} view has no renderer: {}", config.name, e);
                None
            }
        };

        view.on_init(&mut scene);
        let affordance = config
            .immersive
            .map(|mode| document.insert_affordance(mode));
        let listener = document.add_resize_listener();

        let frame = FrameDriver::new();
        frame.start();

        let alive = Arc::new(AtomicBool::new(true));
        let ticket = LoadTicket {
            mount: mount_id,
            alive: alive.clone(),
        };
        let load = load_asset(config.asset.clone(), config.source.clone());
        #[cfg(not(target_arch = "wasm32"))]
        let future = load.boxed();
        #[cfg(target_arch = "wasm32")]
        let future = load.boxed_local();

        let controller = Self {
            name: config.name,
            view: Some(view),
            scene: Some(scene),
            camera: Some(camera),
            renderer,
            session: None,
            asset_node: None,
            asset_failure: None,
            listener: Some(listener),
            frame,
            alive,
            mount_id,
        };
        Mounted {
            controller,
            handle: ViewHandle {
                surface: Some(surface),
                affordance,
                listener: Some(listener),
            },
            pending: PendingAsset {
                ticket,
                request: config.asset,
                future,
            },
        }
    }

    /// Hands the result of an asset load to the view.
    ///
    /// This is the only way an asset reaches the scene graph, and it does nothing
    /// once the ticket's mount has been torn down.
    pub fn complete_asset_load(
        &mut self,
        ticket: &LoadTicket,
        result: Result<LoadedAsset, AssetError>,
    ) -> AssetOutcome {
        if !ticket.is_live() || ticket.mount != self.mount_id {
            log::debug!(
                "discarding asset load of mount #{} in {} view",
                ticket.mount,
                self.name
            );
            return AssetOutcome::Discarded;
        }
        if self.asset_node.is_some() {
            log::debug!("{} view already has its asset", self.name);
            return AssetOutcome::Discarded;
        }
        let (Some(view), Some(scene)) = (self.view.as_mut(), self.scene.as_mut()) else {
            return AssetOutcome::Discarded;
        };

        let attached = result.and_then(|asset| view.on_asset(asset));
        match attached {
            Ok(node) => {
                let nodes = node.count();
                let id = scene.add(node);
                self.asset_node = Some(id);
                log::info!("{} view attached its asset ({} nodes)", self.name, nodes);
                AssetOutcome::Attached(id)
            }
            Err(e) => {
                log::error!("{} view failed to load its asset: {}", self.name, e);
                self.asset_failure = Some(e.to_string());
                AssetOutcome::Failed
            }
        }
    }

    /// One frame: advance the asset's animation if it is loaded, then render once.
    ///
    /// Render errors are reported, not raised. A lost device stops the frame
    /// driver; every other error leaves it running.
    pub fn tick(&mut self, dt: Duration) -> TickOutcome {
        if !self.frame.begin_tick() {
            return TickOutcome::Stopped;
        }

        if let (Some(view), Some(scene), Some(id)) =
            (self.view.as_mut(), self.scene.as_mut(), self.asset_node)
        {
            if let Some(node) = scene.node_mut(id) {
                view.on_update(node, dt);
            }
        }

        let (Some(renderer), Some(scene), Some(camera)) = (
            self.renderer.as_mut(),
            self.scene.as_ref(),
            self.camera.as_ref(),
        ) else {
            return TickOutcome::Headless;
        };
        match renderer.render(scene, camera) {
            Ok(()) => TickOutcome::Rendered,
            Err(e) if e.is_fatal() => {
                log::error!("{} view stops rendering: {}", self.name, e);
                self.frame.stop();
                TickOutcome::Failed(e)
            }
            Err(e) => {
                log::warn!("{} view skipped a frame: {}", self.name, e);
                TickOutcome::Failed(e)
            }
        }
    }

    /// Resize observer. Does nothing once the view's listener is gone or while
    /// there is no camera or renderer to update.
    pub fn on_resize<D: Document + ?Sized>(
        &mut self,
        document: &D,
        width: u32,
        height: u32,
    ) -> bool {
        let listening = self
            .listener
            .is_some_and(|listener| document.has_resize_listener(listener));
        if !listening {
            log::debug!("{} view is not listening for resizes", self.name);
            return false;
        }
        let (Some(camera), Some(renderer)) = (self.camera.as_mut(), self.renderer.as_mut()) else {
            log::debug!("{} view has nothing to resize", self.name);
            return false;
        };
        let pixel_ratio = document.viewport().pixel_ratio;
        resize::apply(camera, renderer, width, height, pixel_ratio)
    }

    /// Attaches an immersive session. A session that was still presenting is ended
    /// first; after teardown the new session is ended right away.
    pub fn enter_immersive(&mut self, mut session: Box<dyn ImmersiveSession>) -> bool {
        if !self.is_mounted() {
            log::warn!("{} view is not mounted, ending {:?} session", self.name, session.mode());
            session.end();
            return false;
        }
        self.exit_immersive();
        log::info!("{} view entered {:?}", self.name, session.mode());
        self.session = Some(session);
        true
    }

    /// Ends the current immersive session. Returns whether one was presenting.
    pub fn exit_immersive(&mut self) -> bool {
        match self.session.take() {
            Some(mut session) if session.is_presenting() => {
                session.end();
                log::info!("{} view left {:?}", self.name, session.mode());
                true
            }
            _ => false,
        }
    }

    /// Releases everything the mount created, in order: the resize listener, the
    /// frame driver, the immersive session, the drawable surface, the GPU
    /// resources of every drawable node, the scene graph, the immersive entry
    /// affordance and finally the renderer.
    ///
    /// Each step checks its target first, so teardown after a partial mount works
    /// and a second teardown does nothing.
    pub fn teardown<D: Document + ?Sized>(
        &mut self,
        document: &mut D,
        handle: &mut ViewHandle,
    ) -> TeardownReport {
        let mut report = TeardownReport::default();

        if let Some(listener) = handle.listener.take() {
            report.listener_removed = document.remove_resize_listener(listener);
        }
        self.listener = None;

        report.driver_stopped = self.frame.stop();
        self.alive.store(false, Ordering::SeqCst);

        report.session_ended = self.exit_immersive();

        if let Some(surface) = handle.surface.take() {
            if document.is_attached(surface) {
                report.surface_removed = document.remove_element(surface);
            }
        }

        if let (Some(scene), Some(renderer)) = (self.scene.as_ref(), self.renderer.as_mut()) {
            report.released = release_scene(scene, renderer);
        }
        if let Some(scene) = self.scene.as_mut() {
            report.nodes_cleared = scene.clear();
        }

        if let Some(affordance) = handle.affordance.take() {
            report.affordance_removed = document.remove_element(affordance);
        }

        if let Some(mut renderer) = self.renderer.take() {
            renderer.dispose();
            report.renderer_disposed = true;
        }
        self.scene = None;
        self.camera = None;
        self.view = None;
        self.asset_node = None;

        if report.is_noop() {
            log::debug!("{} view #{} was already torn down", self.name, self.mount_id);
        } else {
            log::info!("tore down {} view #{}: {:?}", self.name, self.mount_id, report);
        }
        report
    }

    pub fn is_mounted(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn mount_id(&self) -> u64 {
        self.mount_id
    }

    pub fn camera(&self) -> Option<&PerspectiveCamera> {
        self.camera.as_ref()
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn renderer(&self) -> Option<&R> {
        self.renderer.as_ref()
    }

    pub fn renderer_mut(&mut self) -> Option<&mut R> {
        self.renderer.as_mut()
    }

    pub fn asset_node(&self) -> Option<NodeId> {
        self.asset_node
    }

    /// The error of the last failed asset load, if any.
    pub fn asset_failure(&self) -> Option<&str> {
        self.asset_failure.as_deref()
    }

    pub fn is_presenting(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.is_presenting())
    }

    pub fn frame_state(&self) -> FrameState {
        self.frame.state()
    }

    /// A handle on the frame driver that shares its running state.
    pub fn frame_driver(&self) -> FrameDriver {
        self.frame.clone()
    }
}
