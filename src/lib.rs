//! gallery-xr
//!
//! The 3D layer of the NFT gallery: an AR model viewer and a VR panorama, each a
//! scene that is mounted into a host document, animated once per frame and torn
//! down deterministically. Runs natively in a winit window and on the web.
//!
//! High-level modules
//! - `lifecycle`: the scene controller (mount, asset completion, tick, resize, teardown)
//! - `views`: what the AR and VR scenes contain and how their assets move
//! - `frame`: the RUNNING/STOPPED frame driver
//! - `resize`: camera projection and surface size for a new viewport
//! - `document`: the host a view draws into (surface, immersive affordance, listeners)
//! - `renderer` / `context`: the renderer seam and its wgpu implementation
//! - `resources`: asynchronous model and panorama loading
//! - `config`: every constant of the two views and where assets come from
//! - `flow`: the winit event loop hosting one mounted view
//!

pub mod animation;
pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod document;
pub mod error;
pub mod flow;
pub mod frame;
pub mod immersive;
pub mod lifecycle;
pub mod pipelines;
pub mod renderer;
pub mod resize;
pub mod resources;
pub mod views;
#[cfg(target_arch = "wasm32")]
pub mod web;

// Re-exports commonly used types for convenience in downstream code.
pub use config::ViewConfig;
pub use document::{Document, VirtualDocument};
pub use lifecycle::{AssetOutcome, Mounted, SceneController, TeardownReport, ViewHandle};
pub use renderer::Renderer;
