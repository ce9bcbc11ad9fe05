//! Minimap buffer cache with host-driven eviction.
//!
//! The raster engine (and the image it owns) is the only large allocation a
//! view holds. The host evicts it when the view is deactivated or the process
//! is under memory pressure, and the next pass recreates it on miss.
//!
//! While a pass runs, the engine lives on the worker thread, so the cache only
//! remembers that it is out. An eviction that arrives meanwhile is applied
//! when the engine comes back.

use log::debug;

use crate::image::MinimapImage;
use crate::raster::RasterEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Never rendered.
    Empty,
    Ready,
    /// The engine is out for a pass.
    Rendering,
    /// Dropped by the host; recreated on the next pass.
    Evicted,
}

#[derive(Debug)]
enum Slot {
    Empty,
    Ready(RasterEngine),
    Rendering { evict_on_return: bool },
    Evicted,
}

#[derive(Debug)]
pub struct MinimapCache {
    slot: Slot,
    misses: u64,
}

impl Default for MinimapCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MinimapCache {
    pub fn new() -> Self {
        Self {
            slot: Slot::Empty,
            misses: 0,
        }
    }

    pub fn state(&self) -> CacheState {
        match self.slot {
            Slot::Empty => CacheState::Empty,
            Slot::Ready(_) => CacheState::Ready,
            Slot::Rendering { .. } => CacheState::Rendering,
            Slot::Evicted => CacheState::Evicted,
        }
    }

    /// Times an engine had to be created because none was cached.
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// The cached engine, creating one if the cache is empty or evicted.
    /// `None` while the engine is out for a pass.
    pub fn get_or_create(&mut self) -> Option<&mut RasterEngine> {
        if matches!(self.slot, Slot::Empty | Slot::Evicted) {
            self.misses += 1;
            debug!("cache: miss ({:?}), creating engine", self.state());
            self.slot = Slot::Ready(RasterEngine::new());
        }
        match &mut self.slot {
            Slot::Ready(engine) => Some(engine),
            _ => None,
        }
    }

    /// Image from the last completed pass, if still cached.
    pub fn image(&self) -> Option<&MinimapImage> {
        match &self.slot {
            Slot::Ready(engine) => engine.image(),
            _ => None,
        }
    }

    /// Hand the engine out for a pass, creating it on miss. `None` if a pass
    /// already holds it.
    pub fn take(&mut self) -> Option<RasterEngine> {
        self.get_or_create()?;
        match std::mem::replace(
            &mut self.slot,
            Slot::Rendering {
                evict_on_return: false,
            },
        ) {
            Slot::Ready(engine) => Some(engine),
            other => {
                self.slot = other;
                None
            }
        }
    }

    /// Return the engine after a pass.
    pub fn restore(&mut self, engine: RasterEngine) {
        match self.slot {
            Slot::Rendering {
                evict_on_return: true,
            } => {
                debug!("cache: evicted during pass, dropping returned buffer");
                drop(engine);
                self.slot = Slot::Evicted;
            }
            _ => self.slot = Slot::Ready(engine),
        }
    }

    /// Drop the cached buffer. Returns `true` if memory was (or will be, once
    /// the running pass returns) released.
    pub fn evict(&mut self) -> bool {
        match &mut self.slot {
            Slot::Ready(_) => {
                debug!("cache: evicted");
                self.slot = Slot::Evicted;
                true
            }
            Slot::Rendering { evict_on_return } => {
                *evict_on_return = true;
                true
            }
            Slot::Empty | Slot::Evicted => false,
        }
    }
}
