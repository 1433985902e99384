use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use glam::Vec4;
use parking_lot::RwLock;

/// A region of the window showing one camera.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub camera: String,
    pub zorder: i32,
    pub background: Vec4,
    /// Fractions of the window covered, `left, top, width, height`.
    pub dimensions: Vec4,
}

impl Viewport {
    pub fn actual_size(&self, window: (u32, u32)) -> (u32, u32) {
        (
            (window.0 as f32 * self.dimensions.z).round() as u32,
            (window.1 as f32 * self.dimensions.w).round() as u32,
        )
    }
}

/// Model of the render window: its size, viewports and whether it has
/// been closed.
#[derive(Debug)]
pub struct RenderWindow {
    title: String,
    size: RwLock<(u32, u32)>,
    viewports: RwLock<BTreeMap<i32, Viewport>>,
    closed: AtomicBool,
}

impl RenderWindow {
    pub fn new(title: &str, width: u32, height: u32) -> Self {
        Self {
            title: title.to_string(),
            size: RwLock::new((width.max(1), height.max(1))),
            viewports: RwLock::new(BTreeMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn size(&self) -> (u32, u32) {
        *self.size.read()
    }

    pub fn resize(&self, width: u32, height: u32) {
        *self.size.write() = (width.max(1), height.max(1));
    }

    /// Adds a full-window viewport for `camera`, replacing any viewport
    /// already at `zorder`.
    pub fn add_viewport(&self, camera: &str, zorder: i32) -> Viewport {
        let viewport = Viewport {
            camera: camera.to_string(),
            zorder,
            background: Vec4::new(0.0, 0.0, 0.0, 1.0),
            dimensions: Vec4::new(0.0, 0.0, 1.0, 1.0),
        };
        self.viewports.write().insert(zorder, viewport.clone());
        viewport
    }

    pub fn remove_viewport(&self, zorder: i32) -> Option<Viewport> {
        self.viewports.write().remove(&zorder)
    }

    pub fn viewport(&self, zorder: i32) -> Option<Viewport> {
        self.viewports.read().get(&zorder).cloned()
    }

    /// Viewports ordered by z-order.
    pub fn viewports(&self) -> Vec<Viewport> {
        self.viewports.read().values().cloned().collect()
    }

    pub fn set_background(&self, zorder: i32, colour: Vec4) -> bool {
        self.viewports
            .write()
            .get_mut(&zorder)
            .map(|viewport| viewport.background = colour)
            .is_some()
    }

    /// Width over height of a viewport in pixels.
    pub fn aspect_ratio(&self, zorder: i32) -> Option<f32> {
        let viewport = self.viewport(zorder)?;
        let (width, height) = viewport.actual_size(self.size());
        Some(width as f32 / height.max(1) as f32)
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewports_replace_by_zorder() {
        let window = RenderWindow::new("test", 800, 600);
        window.add_viewport("a", 0);
        window.add_viewport("b", 0);
        window.add_viewport("c", 1);
        let cameras: Vec<_> = window.viewports().into_iter().map(|v| v.camera).collect();
        assert_eq!(cameras, vec!["b", "c"]);
        assert!(window.remove_viewport(0).is_some());
        assert!(window.viewport(0).is_none());
    }

    #[test]
    fn aspect_follows_window_size() {
        let window = RenderWindow::new("test", 800, 600);
        window.add_viewport("a", 0);
        assert_eq!(window.aspect_ratio(0), Some(800.0 / 600.0));
        window.resize(1280, 0);
        assert_eq!(window.size(), (1280, 1));
        assert_eq!(window.aspect_ratio(0), Some(1280.0));
    }
}
