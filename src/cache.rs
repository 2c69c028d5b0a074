//! Bounded LRU cache of decoded, screen-scaled images.

use crate::error::ImageError;
use crate::loader::ImageLoader;
use crate::render::{PixelBuffer, Size};

use log::{debug, trace};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default number of images kept in memory.
pub const DEFAULT_CACHE_CAPACITY: usize = 25;

/// Caches images by resolved path, evicting the least recently accessed.
///
/// Hits and inserts both count as access. Failed loads are never cached.
pub struct ImageCache<L> {
    loader: L,
    target: Size,
    capacity: usize,
    entries: HashMap<PathBuf, Arc<PixelBuffer>>,
    /// Front is least recently used.
    recency: VecDeque<PathBuf>,
}

impl<L> ImageCache<L>
where
    L: ImageLoader,
{
    /// Create a cache scaling images to fit `target`.
    ///
    /// A capacity of zero is treated as one.
    pub fn new(loader: L, target: Size, capacity: usize) -> Self {
        Self {
            loader,
            target,
            capacity: capacity.max(1),
            entries: HashMap::new(),
            recency: VecDeque::new(),
        }
    }

    /// Fetch the image at `path`, loading it on a miss.
    pub fn get(&mut self, path: &Path) -> Result<Arc<PixelBuffer>, ImageError> {
        if let Some(buffer) = self.entries.get(path).cloned() {
            trace!("cache hit {}", path.display());
            self.touch(path);
            return Ok(buffer);
        }

        let buffer = Arc::new(self.loader.load_and_scale(path, self.target)?);
        debug!("cache miss, loaded {}", path.display());
        self.entries.insert(path.to_path_buf(), Arc::clone(&buffer));
        self.recency.push_back(path.to_path_buf());

        while self.entries.len() > self.capacity {
            let Some(oldest) = self.recency.pop_front() else {
                break;
            };
            trace!("evicting {}", oldest.display());
            self.entries.remove(&oldest);
        }

        Ok(buffer)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            debug!("clearing {} cached images", self.entries.len());
        }
        self.entries.clear();
        self.recency.clear();
    }

    /// Whether `path` is cached.
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Number of cached images.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of cached images.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The size images are scaled to fit.
    pub fn target(&self) -> Size {
        self.target
    }

    /// Change the target size. Cached images at the old size are dropped.
    pub fn set_target(&mut self, target: Size) {
        if target != self.target {
            self.target = target;
            self.clear();
        }
    }

    /// The underlying loader.
    pub fn loader(&self) -> &L {
        &self.loader
    }

    fn touch(&mut self, path: &Path) {
        if let Some(idx) = self.recency.iter().position(|p| p == path) {
            if let Some(key) = self.recency.remove(idx) {
                self.recency.push_back(key);
            }
        }
    }
}
