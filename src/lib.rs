//! flagviz - Interactive 3D flag viewer
//!
//! Loads a glTF model and an equirectangular HDR environment asynchronously,
//! renders with image-based lighting, and lets the host UI swap the texture
//! of a named mesh (the flag surface) at runtime.
//!
//! The viewer itself is a library component ([`viewer::ViewerSession`]); the
//! `app` module is the demo host that embeds it in a winit window with an
//! egui flag-picker panel.

pub mod app;
pub mod assets;
pub mod config;
pub mod render;
pub mod scene;
pub mod ui;
pub mod viewer;
