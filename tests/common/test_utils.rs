#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use gallery_xr::{
    camera::PerspectiveCamera,
    config::{AssetSource, ViewConfig},
    data_structures::{
        geometry::{GeometryId, MaterialId},
        scene_graph::Scene,
    },
    document::{Document, ElementId, ListenerId, Viewport, VirtualDocument},
    error::RenderError,
    immersive::{ImmersiveMode, ImmersiveSession},
    lifecycle::{Mounted, SceneController},
    renderer::Renderer,
    views,
};

/// Everything the doubles below saw, in the order they saw it.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Step {
    PixelRatio(f64),
    Size(u32, u32),
    ClearColour,
    Render,
    ReleaseGeometry(GeometryId),
    ReleaseMaterial(MaterialId),
    Dispose,
    ListenerRemoved(ListenerId),
    ElementRemoved(ElementId),
    SessionEnded,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Journal(Arc<Mutex<Vec<Step>>>);

impl Journal {
    pub(crate) fn record(&self, step: Step) {
        self.0.lock().unwrap().push(step);
    }

    pub(crate) fn steps(&self) -> Vec<Step> {
        self.0.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, pred: impl Fn(&Step) -> bool) -> usize {
        self.0.lock().unwrap().iter().filter(|s| pred(s)).count()
    }

    pub(crate) fn position(&self, pred: impl Fn(&Step) -> bool) -> Option<usize> {
        self.0.lock().unwrap().iter().position(pred)
    }

    pub(crate) fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// A renderer that records calls instead of drawing.
pub(crate) struct RecordingRenderer {
    journal: Journal,
    size: (u32, u32),
    pixel_ratio: f64,
    failure: Option<RenderError>,
    disposed: bool,
}

impl RecordingRenderer {
    pub(crate) fn new(journal: Journal) -> Self {
        Self {
            journal,
            size: (0, 0),
            pixel_ratio: 1.0,
            failure: None,
            disposed: false,
        }
    }

    /// A renderer whose every frame fails with `err`.
    pub(crate) fn failing(journal: Journal, err: RenderError) -> Self {
        Self {
            failure: Some(err),
            ..Self::new(journal)
        }
    }
}

impl Renderer for RecordingRenderer {
    fn set_pixel_ratio(&mut self, pixel_ratio: f64) {
        self.pixel_ratio = pixel_ratio;
        self.journal.record(Step::PixelRatio(pixel_ratio));
    }

    fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.journal.record(Step::Size(width, height));
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn set_clear_colour(&mut self, _colour: wgpu::Color) {
        self.journal.record(Step::ClearColour);
    }

    fn render(&mut self, _scene: &Scene, _camera: &PerspectiveCamera) -> Result<(), RenderError> {
        assert!(!self.disposed, "rendered after dispose");
        self.journal.record(Step::Render);
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn release_geometry(&mut self, geometry: GeometryId) -> bool {
        self.journal.record(Step::ReleaseGeometry(geometry));
        true
    }

    fn release_material(&mut self, material: MaterialId) -> bool {
        self.journal.record(Step::ReleaseMaterial(material));
        true
    }

    fn dispose(&mut self) {
        self.disposed = true;
        self.journal.record(Step::Dispose);
    }
}

/// A [`VirtualDocument`] that journals removals.
pub(crate) struct RecordingDocument {
    pub(crate) inner: VirtualDocument,
    journal: Journal,
}

impl RecordingDocument {
    pub(crate) fn new(journal: Journal) -> Self {
        Self {
            inner: VirtualDocument::default(),
            journal,
        }
    }
}

impl Document for RecordingDocument {
    fn viewport(&self) -> Viewport {
        self.inner.viewport()
    }

    fn acquire_surface(&mut self) -> ElementId {
        self.inner.acquire_surface()
    }

    fn insert_affordance(&mut self, mode: ImmersiveMode) -> ElementId {
        self.inner.insert_affordance(mode)
    }

    fn is_attached(&self, element: ElementId) -> bool {
        self.inner.is_attached(element)
    }

    fn remove_element(&mut self, element: ElementId) -> bool {
        self.journal.record(Step::ElementRemoved(element));
        self.inner.remove_element(element)
    }

    fn add_resize_listener(&mut self) -> ListenerId {
        self.inner.add_resize_listener()
    }

    fn remove_resize_listener(&mut self, listener: ListenerId) -> bool {
        self.journal.record(Step::ListenerRemoved(listener));
        self.inner.remove_resize_listener(listener)
    }

    fn has_resize_listener(&self, listener: ListenerId) -> bool {
        self.inner.has_resize_listener(listener)
    }
}

pub(crate) struct RecordingSession {
    mode: ImmersiveMode,
    presenting: bool,
    journal: Journal,
}

impl RecordingSession {
    pub(crate) fn start(mode: ImmersiveMode, journal: Journal) -> Self {
        Self {
            mode,
            presenting: true,
            journal,
        }
    }
}

impl ImmersiveSession for RecordingSession {
    fn mode(&self) -> ImmersiveMode {
        self.mode
    }

    fn is_presenting(&self) -> bool {
        self.presenting
    }

    fn end(&mut self) {
        if self.presenting {
            self.presenting = false;
            self.journal.record(Step::SessionEnded);
        }
    }
}

/// Asset paths resolve against a directory that does not exist, so a load
/// that is actually awaited fails.
pub(crate) fn offline(config: ViewConfig) -> ViewConfig {
    config.with_source(AssetSource::Local("/nonexistent/gallery-assets".into()))
}

pub(crate) fn mount_with<D: Document + ?Sized>(
    config: ViewConfig,
    document: &mut D,
    journal: &Journal,
) -> Mounted<RecordingRenderer> {
    let config = offline(config);
    let view = views::for_config(&config);
    let journal = journal.clone();
    SceneController::mount(config, view, document, move |_| {
        Ok(RecordingRenderer::new(journal))
    })
}

pub(crate) fn mount_ar<D: Document + ?Sized>(
    document: &mut D,
    journal: &Journal,
) -> Mounted<RecordingRenderer> {
    mount_with(ViewConfig::ar(), document, journal)
}
