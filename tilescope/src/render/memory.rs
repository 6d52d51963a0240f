//! In-memory overlay surface.
//!
//! Used by the CLI simulator and by tests. Every surface a factory creates
//! writes into the same shared [`SurfaceLog`], so callers can inspect what
//! was drawn after handing the factory to a renderer.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::{Marker, OverlaySurface, SurfaceFactory};

/// What has been drawn so far.
#[derive(Debug, Clone, Default)]
pub struct SurfaceLog {
    markers: Vec<Marker>,
    clears: u32,
}

impl SurfaceLog {
    /// Markers currently on the surface.
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Keys of the markers currently on the surface, in draw order.
    pub fn keys(&self) -> Vec<String> {
        self.markers.iter().map(|m| m.key.clone()).collect()
    }

    /// Number of times the surface was cleared.
    pub fn clears(&self) -> u32 {
        self.clears
    }
}

/// A surface writing into a shared [`SurfaceLog`].
#[derive(Debug, Clone)]
pub struct MemorySurface {
    log: Rc<RefCell<SurfaceLog>>,
}

impl OverlaySurface for MemorySurface {
    fn clear(&mut self) {
        let mut log = self.log.borrow_mut();
        log.markers.clear();
        log.clears += 1;
    }

    fn append(&mut self, marker: Marker) {
        self.log.borrow_mut().markers.push(marker);
    }

    fn len(&self) -> usize {
        self.log.borrow().markers.len()
    }
}

/// Factory for [`MemorySurface`]s. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemorySurfaceFactory {
    log: Rc<RefCell<SurfaceLog>>,
    created: Rc<Cell<u32>>,
}

impl MemorySurfaceFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the shared log.
    pub fn log(&self) -> SurfaceLog {
        self.log.borrow().clone()
    }

    /// Number of surfaces created.
    pub fn created(&self) -> u32 {
        self.created.get()
    }
}

impl SurfaceFactory for MemorySurfaceFactory {
    fn create(&mut self) -> Box<dyn OverlaySurface> {
        self.created.set(self.created.get() + 1);
        Box::new(MemorySurface {
            log: Rc::clone(&self.log),
        })
    }
}
