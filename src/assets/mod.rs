//! Asset loading: decode on worker threads, deliver results over a channel.
//!
//! Every loader is synchronous at its core (`load_*`) with a `spawn_*`
//! wrapper that runs the decode off the UI thread and sends a [`LoadEvent`]
//! back. The viewer drains the channel once per frame, so scene mutation
//! stays on a single thread and completion order between independent loads
//! is irrelevant. A send after the receiver is gone is silently dropped -
//! that is how results arriving after session teardown are discarded.

pub mod catalog;
pub mod gltf;
pub mod texture;

use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};

pub use texture::{load_equirect, load_texture, EquirectImage, TextureImage};

use crate::scene::Model;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read asset at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image at {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to import glTF at {path}: {source}")]
    Gltf {
        path: String,
        #[source]
        source: Box<::gltf::Error>,
    },
    #[error("image at {path} has no pixels")]
    EmptyImage { path: String },
}

/// Completion message for one asynchronous load.
pub enum LoadEvent {
    Model(Result<Model, AssetError>),
    Environment(Result<EquirectImage, AssetError>),
    FlagTexture {
        file: String,
        result: Result<TextureImage, AssetError>,
    },
}

pub fn load_channel() -> (Sender<LoadEvent>, Receiver<LoadEvent>) {
    channel()
}

pub fn spawn_model_load(tx: Sender<LoadEvent>, path: PathBuf) {
    std::thread::spawn(move || {
        let result = gltf::load_model(&path);
        let _ = tx.send(LoadEvent::Model(result));
    });
}

pub fn spawn_environment_load(tx: Sender<LoadEvent>, path: PathBuf) {
    std::thread::spawn(move || {
        let result = texture::load_equirect(&path);
        let _ = tx.send(LoadEvent::Environment(result));
    });
}

/// Flag textures target glTF UVs, so rows are kept as stored (no flip).
pub fn spawn_flag_texture_load(tx: Sender<LoadEvent>, file: String, path: PathBuf) {
    std::thread::spawn(move || {
        let result = texture::load_texture(&path, false);
        let _ = tx.send(LoadEvent::FlagTexture { file, result });
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn failed_load_is_delivered_over_the_channel() {
        let (tx, rx) = load_channel();
        spawn_model_load(tx, PathBuf::from("no/such/model.glb"));
        match rx.recv_timeout(Duration::from_secs(5)).expect("load event") {
            LoadEvent::Model(Err(AssetError::Gltf { path, .. })) => {
                assert!(path.contains("model.glb"));
            }
            _ => panic!("expected a model import error"),
        }
    }

    #[test]
    fn send_after_receiver_dropped_is_discarded() {
        let (tx, rx) = load_channel();
        drop(rx);
        // Must not panic; the worker's result simply disappears.
        spawn_flag_texture_load(tx, "SpainFlag.jpg".into(), PathBuf::from("missing.jpg"));
        std::thread::sleep(Duration::from_millis(50));
    }
}
