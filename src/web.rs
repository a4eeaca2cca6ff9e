//! Browser host: a [`Document`] over the page DOM and the JS entry points.

use std::collections::{BTreeMap, BTreeSet};

use wasm_bindgen::{JsCast, prelude::*};

use crate::{
    config::{AssetSource, ViewConfig},
    document::{AffordanceHandler, Document, ElementId, ElementKind, ListenerId, Viewport},
    flow,
    immersive::ImmersiveMode,
};

const CANVAS_ID: &str = "gallery-canvas";

/// The page document. Only elements this document inserted are ever removed.
pub struct WebDocument {
    window: web_sys::Window,
    document: web_sys::Document,
    next_id: u64,
    elements: BTreeMap<ElementId, (ElementKind, web_sys::Element)>,
    listeners: BTreeSet<ListenerId>,
    affordance_handler: Option<AffordanceHandler>,
    // click closures live as long as their element
    clicks: BTreeMap<ElementId, Closure<dyn FnMut()>>,
}

impl WebDocument {
    pub fn new() -> anyhow::Result<Self> {
        let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("no global window"))?;
        let document = window
            .document()
            .ok_or_else(|| anyhow::anyhow!("window has no document"))?;
        Ok(Self {
            window,
            document,
            next_id: 1,
            elements: BTreeMap::new(),
            listeners: BTreeSet::new(),
            affordance_handler: None,
            clicks: BTreeMap::new(),
        })
    }

    /// The canvas behind a surface element.
    pub fn canvas(&self, surface: ElementId) -> Option<web_sys::HtmlCanvasElement> {
        match self.elements.get(&surface) {
            Some((ElementKind::Surface, element)) => element.clone().dyn_into().ok(),
            _ => None,
        }
    }

    fn next(&mut self) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        id
    }

    fn find(&self, kind: ElementKind) -> Option<ElementId> {
        self.elements
            .iter()
            .find(|(_, (k, _))| *k == kind)
            .map(|(id, _)| *id)
    }

    fn append(&mut self, kind: ElementKind, element: Result<web_sys::Element, JsValue>) -> ElementId {
        let id = self.next();
        let body = self.document.body();
        match (element, body) {
            (Ok(element), Some(body)) => match body.append_child(&element) {
                Ok(_) => {
                    self.elements.insert(id, (kind, element));
                }
                Err(e) => log::error!("cannot insert {:?}: {:?}", kind, e),
            },
            (Err(e), _) => log::error!("cannot create {:?}: {:?}", kind, e),
            (_, None) => log::error!("document has no body for {:?}", kind),
        }
        id
    }

    fn listen_for_clicks(&mut self, id: ElementId, mode: ImmersiveMode) {
        let (Some(handler), Some((_, element))) =
            (self.affordance_handler.clone(), self.elements.get(&id))
        else {
            return;
        };
        let click = Closure::<dyn FnMut()>::new(move || handler(mode));
        match element.add_event_listener_with_callback("click", click.as_ref().unchecked_ref()) {
            Ok(()) => {
                self.clicks.insert(id, click);
            }
            Err(e) => log::error!("cannot listen for clicks on the {:?} entry: {:?}", mode, e),
        }
    }

    fn create_canvas(&self) -> Result<web_sys::Element, JsValue> {
        let canvas = self.document.create_element("canvas")?;
        canvas.set_id(CANVAS_ID);
        if let Some(html) = canvas.dyn_ref::<web_sys::HtmlElement>() {
            let style = html.style();
            style.set_property("width", "100%")?;
            style.set_property("height", "100%")?;
            style.set_property("display", "block")?;
        }
        Ok(canvas)
    }

    fn create_affordance(&self, mode: ImmersiveMode) -> Result<web_sys::Element, JsValue> {
        let button = self.document.create_element("button")?;
        button.set_id(mode.affordance_id());
        button.set_text_content(Some(mode.label()));
        Ok(button)
    }
}

impl Document for WebDocument {
    fn viewport(&self) -> Viewport {
        let css = |value: Result<JsValue, JsValue>| {
            value.ok().and_then(|v| v.as_f64()).unwrap_or(0.0)
        };
        let pixel_ratio = self.window.device_pixel_ratio();
        Viewport::new(
            (css(self.window.inner_width()) * pixel_ratio) as u32,
            (css(self.window.inner_height()) * pixel_ratio) as u32,
            pixel_ratio,
        )
    }

    fn acquire_surface(&mut self) -> ElementId {
        if let Some(existing) = self.find(ElementKind::Surface) {
            return existing;
        }
        let canvas = self.create_canvas();
        self.append(ElementKind::Surface, canvas)
    }

    fn insert_affordance(&mut self, mode: ImmersiveMode) -> ElementId {
        let kind = ElementKind::Affordance(mode);
        if let Some(existing) = self.find(kind) {
            return existing;
        }
        let button = self.create_affordance(mode);
        let id = self.append(kind, button);
        self.listen_for_clicks(id, mode);
        id
    }

    fn is_attached(&self, element: ElementId) -> bool {
        self.elements
            .get(&element)
            .is_some_and(|(_, element)| element.is_connected())
    }

    fn remove_element(&mut self, element: ElementId) -> bool {
        let click = self.clicks.remove(&element);
        let Some((_, node)) = self.elements.remove(&element) else {
            return false;
        };
        if let Some(click) = click {
            if let Err(e) =
                node.remove_event_listener_with_callback("click", click.as_ref().unchecked_ref())
            {
                log::warn!("cannot stop listening for clicks: {:?}", e);
            }
        }
        if node.is_connected() {
            node.remove();
            true
        } else {
            false
        }
    }

    fn add_resize_listener(&mut self) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.insert(id);
        id
    }

    fn remove_resize_listener(&mut self, listener: ListenerId) -> bool {
        self.listeners.remove(&listener)
    }

    fn has_resize_listener(&self, listener: ListenerId) -> bool {
        self.listeners.contains(&listener)
    }

    fn on_affordance(&mut self, handler: AffordanceHandler) {
        self.affordance_handler = Some(handler);
    }
}

fn start(config: ViewConfig, asset_base: Option<String>) -> Result<(), JsValue> {
    let source = match asset_base {
        Some(base) => AssetSource::parse(&base).map_err(|e| JsValue::from_str(&e.to_string()))?,
        None => AssetSource::Origin,
    };
    flow::run(config.with_source(source), None).map_err(|e| JsValue::from_str(&format!("{:#}", e)))
}

/// Mounts the AR model viewer. `asset_base` defaults to the page origin.
#[wasm_bindgen]
pub fn run_ar(asset_base: Option<String>) -> Result<(), JsValue> {
    start(ViewConfig::ar(), asset_base)
}

/// Mounts the VR panorama. `asset_base` defaults to the page origin.
#[wasm_bindgen]
pub fn run_vr(asset_base: Option<String>) -> Result<(), JsValue> {
    start(ViewConfig::vr(), asset_base)
}
