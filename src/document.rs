//! The host document a view draws into.
//!
//! A [`Document`] owns at most one drawable surface and tracks it by
//! [`ElementId`], so a view never has to query the page for an existing canvas:
//! [`Document::acquire_surface`] hands back the surface the document already holds
//! or inserts the first one. The same goes for immersive entry affordances,
//! which are unique per [`ImmersiveMode`].
//!
//! Resize listeners are registered by token. Removing the token a view received
//! at registration is the only way to unregister it.
//!
//! Activating an entry affordance calls the document's [`AffordanceHandler`],
//! which the host uses to request an immersive session.

use std::{
    collections::{BTreeMap, BTreeSet},
    rc::Rc,
};

use crate::immersive::ImmersiveMode;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

/// Size of the viewport in physical pixels plus the device pixel ratio.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f64,
}

impl Viewport {
    pub fn new(width: u32, height: u32, pixel_ratio: f64) -> Self {
        Self {
            width,
            height,
            pixel_ratio,
        }
    }
}

/// Called with the mode of the entry affordance the user activated.
pub type AffordanceHandler = Rc<dyn Fn(ImmersiveMode)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementKind {
    Surface,
    Affordance(ImmersiveMode),
}

pub trait Document {
    fn viewport(&self) -> Viewport;

    /// Returns the drawable surface, inserting one only if the document holds none.
    fn acquire_surface(&mut self) -> ElementId;

    /// Returns the entry affordance for `mode`, inserting it if missing.
    fn insert_affordance(&mut self, mode: ImmersiveMode) -> ElementId;

    fn is_attached(&self, element: ElementId) -> bool;

    /// Detaches `element`. Returns `false` if it was not attached.
    fn remove_element(&mut self, element: ElementId) -> bool;

    fn add_resize_listener(&mut self) -> ListenerId;

    /// Returns `false` if `listener` was not registered.
    fn remove_resize_listener(&mut self, listener: ListenerId) -> bool;

    fn has_resize_listener(&self, listener: ListenerId) -> bool;

    /// Records the viewport the host window reports. Documents that measure the
    /// viewport themselves ignore this.
    fn sync_viewport(&mut self, _viewport: Viewport) {}

    /// Sets what happens when an entry affordance is activated. Only affordances
    /// inserted afterwards use the new handler.
    fn on_affordance(&mut self, _handler: AffordanceHandler) {}
}

/// An in-memory document.
///
/// Natively the window is the only drawable surface, so this is the document the
/// desktop app mounts into; tests use it to observe what a view inserted.
pub struct VirtualDocument {
    viewport: Viewport,
    next_id: u64,
    elements: BTreeMap<ElementId, ElementKind>,
    listeners: BTreeSet<ListenerId>,
    peak_surfaces: usize,
    affordance_handler: Option<AffordanceHandler>,
}

impl std::fmt::Debug for VirtualDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualDocument")
            .field("viewport", &self.viewport)
            .field("elements", &self.elements)
            .field("listeners", &self.listeners)
            .field("peak_surfaces", &self.peak_surfaces)
            .finish_non_exhaustive()
    }
}

impl VirtualDocument {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            next_id: 1,
            elements: BTreeMap::new(),
            listeners: BTreeSet::new(),
            peak_surfaces: 0,
            affordance_handler: None,
        }
    }

    /// Simulates a click on `element`. Returns `false` unless it is an attached
    /// entry affordance and a handler is set.
    pub fn activate(&self, element: ElementId) -> bool {
        let Some(ElementKind::Affordance(mode)) = self.kind_of(element) else {
            return false;
        };
        match &self.affordance_handler {
            Some(handler) => {
                handler(mode);
                true
            }
            None => false,
        }
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport.width = width;
        self.viewport.height = height;
    }

    pub fn set_pixel_ratio(&mut self, pixel_ratio: f64) {
        self.viewport.pixel_ratio = pixel_ratio;
    }

    pub fn surface_count(&self) -> usize {
        self.count(|kind| *kind == ElementKind::Surface)
    }

    pub fn affordance_count(&self) -> usize {
        self.count(|kind| matches!(kind, ElementKind::Affordance(_)))
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// The largest number of surfaces that were ever attached at the same time.
    pub fn peak_surface_count(&self) -> usize {
        self.peak_surfaces
    }

    pub fn kind_of(&self, element: ElementId) -> Option<ElementKind> {
        self.elements.get(&element).copied()
    }

    fn count(&self, pred: impl Fn(&ElementKind) -> bool) -> usize {
        self.elements.values().filter(|kind| pred(kind)).count()
    }

    fn next(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn find(&self, kind: ElementKind) -> Option<ElementId> {
        self.elements
            .iter()
            .find(|(_, k)| **k == kind)
            .map(|(id, _)| *id)
    }

    fn insert(&mut self, kind: ElementKind) -> ElementId {
        let id = ElementId(self.next());
        self.elements.insert(id, kind);
        self.peak_surfaces = self.peak_surfaces.max(self.surface_count());
        id
    }
}

impl Default for VirtualDocument {
    fn default() -> Self {
        Self::new(Viewport::new(800, 600, 1.0))
    }
}

impl Document for VirtualDocument {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn acquire_surface(&mut self) -> ElementId {
        match self.find(ElementKind::Surface) {
            Some(existing) => {
                log::debug!("reusing drawable surface {:?}", existing);
                existing
            }
            None => self.insert(ElementKind::Surface),
        }
    }

    fn insert_affordance(&mut self, mode: ImmersiveMode) -> ElementId {
        let kind = ElementKind::Affordance(mode);
        match self.find(kind) {
            Some(existing) => existing,
            None => self.insert(kind),
        }
    }

    fn is_attached(&self, element: ElementId) -> bool {
        self.elements.contains_key(&element)
    }

    fn remove_element(&mut self, element: ElementId) -> bool {
        self.elements.remove(&element).is_some()
    }

    fn add_resize_listener(&mut self) -> ListenerId {
        let id = ListenerId(self.next());
        self.listeners.insert(id);
        id
    }

    fn remove_resize_listener(&mut self, listener: ListenerId) -> bool {
        self.listeners.remove(&listener)
    }

    fn has_resize_listener(&self, listener: ListenerId) -> bool {
        self.listeners.contains(&listener)
    }

    fn sync_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn on_affordance(&mut self, handler: AffordanceHandler) {
        self.affordance_handler = Some(handler);
    }
}
