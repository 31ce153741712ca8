//! A single growable atlas page
//!
//! A page is a square bin whose side length is always a power of two. When a
//! rectangle does not fit, the page doubles (up to its maximum size) by
//! building fresh free-space state and replaying every earlier placement in
//! insertion order. Placements made before the most recent growth are not
//! stable: read positions from [`Page::placed`] only once packing is done.

use crate::bin::{BinPacker, PackingAlgorithm};
use crate::config::PackerConfig;
use crate::error::PackError;
use crate::uv_math::ceil_power_of_two;

/// Use rate above which a page counts as almost full
pub const ALMOST_FULL_RATE: f32 = 0.95;

/// A rectangle waiting to be placed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RectRequest {
    /// Caller-side identifier (index of the surface it belongs to)
    pub id: usize,
    pub width: u32,
    pub height: u32,
}

impl RectRequest {
    pub const fn new(id: usize, width: u32, height: u32) -> Self {
        Self { id, width, height }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// A rectangle placed on a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedRect {
    pub id: usize,
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

impl PackedRect {
    /// Size-only copy used when replaying after growth
    pub fn request(&self) -> RectRequest {
        RectRequest::new(self.id, self.width, self.height)
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn overlaps(&self, other: &PackedRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// One square bin with growth and placement history
pub struct Page {
    size: u32,
    max_size: u32,
    algorithm: PackingAlgorithm,
    used_width: u32,
    used_height: u32,
    used_area: u64,
    placed: Vec<PackedRect>,
    bin: Box<dyn BinPacker>,
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("size", &self.size)
            .field("max_size", &self.max_size)
            .field("algorithm", &self.algorithm)
            .field("used_area", &self.used_area)
            .field("placed", &self.placed.len())
            .finish()
    }
}

impl Page {
    /// Create a page of `initial_size` (rounded up to a power of two, capped at `max_size`)
    pub fn new(initial_size: u32, max_size: u32, algorithm: PackingAlgorithm) -> Self {
        let max_size = ceil_power_of_two(max_size);
        let size = ceil_power_of_two(initial_size).min(max_size);
        Self {
            size,
            max_size,
            algorithm,
            used_width: 0,
            used_height: 0,
            used_area: 0,
            placed: Vec::new(),
            bin: algorithm.create(size),
        }
    }

    pub fn with_config(config: &PackerConfig) -> Self {
        Self::new(config.initial_page_size, config.max_page_size, config.algorithm)
    }

    /// Current side length in pixels
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    /// Placed rectangles in placement order
    pub fn placed(&self) -> &[PackedRect] {
        &self.placed
    }

    pub fn used_area(&self) -> u64 {
        self.used_area
    }

    /// Furthest (x, y) reached by any placed rectangle
    pub fn used_extent(&self) -> (u32, u32) {
        (self.used_width, self.used_height)
    }

    pub fn is_growable(&self) -> bool {
        self.size < self.max_size
    }

    pub fn use_rate(&self) -> f32 {
        (self.used_area as f64 / (self.size as f64 * self.size as f64)) as f32
    }

    /// Advisory: callers may prefer a new page over squeezing this one
    pub fn is_almost_full(&self) -> bool {
        self.use_rate() > ALMOST_FULL_RATE
    }

    /// Try to place `rect`, growing the page if needed
    ///
    /// Returns `Ok(false)` when the rectangle does not fit (the page is left
    /// as it was, possibly grown). Returns an error only for rectangles no
    /// page could ever hold.
    pub fn add(&mut self, rect: RectRequest) -> Result<bool, PackError> {
        if rect.width == 0 || rect.height == 0 {
            return Err(PackError::EmptyRect {
                id: rect.id,
                width: rect.width,
                height: rect.height,
            });
        }
        // A rect covering a whole max-size page can never pass the area check
        let max_area = self.max_size as u64 * self.max_size as u64;
        if rect.width > self.max_size || rect.height > self.max_size || rect.area() >= max_area {
            return Err(PackError::RectTooLarge {
                id: rect.id,
                width: rect.width,
                height: rect.height,
                max_size: self.max_size,
            });
        }

        if (rect.width > self.size || rect.height > self.size)
            && !self.realloc(rect.width.max(rect.height))
        {
            return Ok(false);
        }

        // Fast reject on area alone; may be conservative
        let total_area = self.size as u64 * self.size as u64;
        if total_area <= self.used_area + rect.area() {
            return Ok(false);
        }

        loop {
            if let Some((x, y)) = self.bin.pack(rect.width, rect.height) {
                self.commit(PackedRect {
                    id: rect.id,
                    width: rect.width,
                    height: rect.height,
                    x,
                    y,
                });
                return Ok(true);
            }
            if !self.is_growable() || !self.realloc(self.size << 1) {
                return Ok(false);
            }
        }
    }

    /// Resize the page and replay all placements into fresh free-space state
    ///
    /// `new_size` is rounded up to a power of two and capped at the maximum.
    /// The new state is only committed if every earlier rectangle fits again;
    /// returns `false` (page unchanged) otherwise.
    pub fn realloc(&mut self, new_size: u32) -> bool {
        let new_size = ceil_power_of_two(new_size).min(self.max_size);
        if new_size == self.size {
            return true;
        }

        let requests: Vec<RectRequest> = self.placed.iter().map(PackedRect::request).collect();
        let sizes: Vec<(u32, u32)> = requests.iter().map(|r| (r.width, r.height)).collect();

        let mut bin = self.algorithm.create(new_size);
        let results = bin.pack_many(&sizes);

        let mut replayed = Vec::with_capacity(requests.len());
        for (request, result) in requests.iter().zip(results) {
            let Some((x, y)) = result else {
                tracing::error!(
                    "Page realloc {} -> {} failed: rect {} ({}x{}) no longer fits",
                    self.size,
                    new_size,
                    request.id,
                    request.width,
                    request.height
                );
                return false;
            };
            replayed.push(PackedRect {
                id: request.id,
                width: request.width,
                height: request.height,
                x,
                y,
            });
        }

        tracing::debug!(
            "Page grown {} -> {} ({} rects replayed)",
            self.size,
            new_size,
            replayed.len()
        );

        self.size = new_size;
        self.bin = bin;
        self.used_width = 0;
        self.used_height = 0;
        self.used_area = 0;
        self.placed = Vec::with_capacity(replayed.len());
        for rect in replayed {
            self.commit(rect);
        }
        true
    }

    fn commit(&mut self, rect: PackedRect) {
        self.used_width = self.used_width.max(rect.right());
        self.used_height = self.used_height.max(rect.bottom());
        self.used_area += rect.width as u64 * rect.height as u64;
        self.placed.push(rect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_disjoint(page: &Page) {
        let placed = page.placed();
        for (i, a) in placed.iter().enumerate() {
            assert!(a.right() <= page.size() && a.bottom() <= page.size());
            for b in &placed[i + 1..] {
                assert!(!a.overlaps(b), "{:?} overlaps {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_new_rounds_and_caps() {
        let page = Page::new(20, 1024, PackingAlgorithm::Skyline);
        assert_eq!(page.size(), 32);
        let page = Page::new(5000, 1024, PackingAlgorithm::Skyline);
        assert_eq!(page.size(), 1024);
        assert!(!page.is_growable());
    }

    #[test]
    fn test_oversized_rect_forces_growth() {
        let padding = 2;
        let mut page = Page::new(32, 1024, PackingAlgorithm::Skyline);
        assert!(page.add(RectRequest::new(0, 40 + padding, 10 + padding)).unwrap());
        assert_eq!(page.size(), 64);
        assert!(page.add(RectRequest::new(1, 10 + padding, 10 + padding)).unwrap());
        assert_eq!(page.placed().len(), 2);
        assert_disjoint(&page);
    }

    #[test]
    fn test_area_fast_reject_does_not_grow() {
        let mut page = Page::new(32, 1024, PackingAlgorithm::Skyline);
        assert!(page.add(RectRequest::new(0, 30, 30)).unwrap());
        assert!(!page.add(RectRequest::new(1, 20, 20)).unwrap());
        assert_eq!(page.size(), 32);
        assert_eq!(page.placed().len(), 1);
    }

    #[test]
    fn test_packing_failure_doubles_and_replays() {
        let mut page = Page::new(32, 1024, PackingAlgorithm::Skyline);
        assert!(page.add(RectRequest::new(7, 20, 20)).unwrap());
        assert!(page.add(RectRequest::new(9, 20, 20)).unwrap());
        assert_eq!(page.size(), 64);

        let ids: Vec<usize> = page.placed().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![7, 9]);
        assert_eq!(page.used_area(), 800);
        assert_disjoint(&page);
    }

    #[test]
    fn test_not_growable_at_max() {
        let mut page = Page::new(1024, 1024, PackingAlgorithm::Skyline);
        assert!(page.add(RectRequest::new(0, 600, 600)).unwrap());
        assert!(!page.add(RectRequest::new(1, 600, 600)).unwrap());
        assert_eq!(page.placed().len(), 1);
    }

    #[test]
    fn test_errors_for_impossible_rects() {
        let mut page = Page::new(32, 1024, PackingAlgorithm::Skyline);
        assert_eq!(
            page.add(RectRequest::new(3, 1025, 4)),
            Err(PackError::RectTooLarge {
                id: 3,
                width: 1025,
                height: 4,
                max_size: 1024
            })
        );
        assert!(matches!(
            page.add(RectRequest::new(4, 0, 4)),
            Err(PackError::EmptyRect { id: 4, .. })
        ));
        assert_eq!(page.size(), 32);
    }

    #[test]
    fn test_almost_full() {
        let mut page = Page::new(32, 32, PackingAlgorithm::Skyline);
        assert!(!page.is_almost_full());
        assert!(page.add(RectRequest::new(0, 32, 31)).unwrap());
        assert!(page.is_almost_full());
        assert!(page.use_rate() > 0.95 && page.use_rate() < 1.0);
        assert_eq!(page.used_extent(), (32, 31));
    }

    #[test]
    fn test_realloc_same_size_is_noop() {
        let mut page = Page::new(64, 1024, PackingAlgorithm::Guillotine);
        assert!(page.add(RectRequest::new(0, 10, 10)).unwrap());
        let before = page.placed().to_vec();
        assert!(page.realloc(40));
        assert_eq!(page.placed(), before.as_slice());
    }

    fn lcg(seed: &mut u32) -> u32 {
        *seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        *seed >> 8
    }

    fn check_growth_stream(algorithm: PackingAlgorithm) {
        let mut seed = 0xC0FF_EE11;
        let mut page = Page::new(32, 1024, algorithm);
        let mut accepted = Vec::new();
        let mut sizes = vec![page.size()];

        for id in 0..400 {
            let rect = RectRequest::new(id, 1 + lcg(&mut seed) % 96, 1 + lcg(&mut seed) % 96);
            if page.add(rect).unwrap() {
                accepted.push(rect);
            }

            assert!(page.size().is_power_of_two());
            assert!(page.size() <= page.max_size());
            if sizes.last() != Some(&page.size()) {
                sizes.push(page.size());
            }

            assert_disjoint(&page);
            let ids: Vec<usize> = page.placed().iter().map(|r| r.id).collect();
            let expected: Vec<usize> = accepted.iter().map(|r| r.id).collect();
            assert_eq!(ids, expected, "placement order changed");
            let area: u64 = accepted.iter().map(RectRequest::area).sum();
            assert_eq!(page.used_area(), area);
        }

        assert!(sizes.len() >= 3, "page grew too little: {:?}", sizes);
        assert!(sizes.windows(2).all(|w| w[1] > w[0]), "page shrank: {:?}", sizes);

        // Replaying the whole history into the largest page keeps it intact
        assert!(page.realloc(1024));
        assert_eq!(page.size(), 1024);
        assert_eq!(page.placed().len(), accepted.len());
        assert_disjoint(&page);
    }

    #[test]
    fn test_growth_stream_skyline() {
        check_growth_stream(PackingAlgorithm::Skyline);
    }

    #[test]
    fn test_growth_stream_guillotine() {
        check_growth_stream(PackingAlgorithm::Guillotine);
    }

    #[test]
    fn test_realloc_refuses_to_lose_rects() {
        let mut page = Page::new(64, 1024, PackingAlgorithm::Skyline);
        assert!(page.add(RectRequest::new(0, 60, 60)).unwrap());
        assert!(!page.realloc(32));
        assert_eq!(page.size(), 64);
        assert_eq!(page.placed().len(), 1);
    }
}
