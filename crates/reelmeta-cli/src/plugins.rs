//! Plugin factory registration.
//!
//! Concrete plugin bodies (filesystem scanners, media-probe wrappers,
//! external API clients) are external collaborators of this engine, not
//! part of it — a deployment links them in here by registering a factory
//! per locator. This crate ships no concrete plugins of its own.
use reelmeta_core::PluginLoader;

pub fn register_builtin_plugins(_loader: &mut PluginLoader) {
    // Deployments register their own plugin factories here, e.g.:
    // loader.register("FilesystemScannerPlugin", Arc::new(|cfg| ...));
}
