//! Multi-page greedy packer
//!
//! Rectangles are sorted tallest first (ties: widest first) and each goes to
//! the first page that accepts it. Whatever is left over opens one new page
//! and the leftovers are re-sorted and retried, until everything is placed
//! or the page limit is hit.

use crate::config::PackerConfig;
use crate::error::PackError;
use crate::page::{PackedRect, Page, RectRequest};

/// A packed rectangle with the page it landed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub page: usize,
    /// Final side length of that page
    pub page_size: u32,
    pub rect: PackedRect,
}

/// Outcome of [`MultiPagePacker::pack_rects`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackReport {
    /// Rectangles submitted
    pub requested: usize,
    /// Rectangles placed
    pub placed: usize,
    /// Rectangles no page could ever hold
    pub rejected: Vec<PackError>,
    /// Ids of rectangles left over when the page limit was reached
    pub unplaced: Vec<usize>,
    pub page_limit_reached: bool,
    /// Pages in use after packing
    pub page_count: usize,
}

impl PackReport {
    /// Every submitted rectangle was placed
    pub fn is_complete(&self) -> bool {
        self.placed == self.requested
    }

    /// Number of rectangles that were not placed
    pub fn dropped(&self) -> usize {
        self.requested - self.placed
    }
}

/// Ordered set of pages sharing one configuration
#[derive(Debug)]
pub struct MultiPagePacker {
    config: PackerConfig,
    pages: Vec<Page>,
}

impl Default for MultiPagePacker {
    fn default() -> Self {
        Self::new(PackerConfig::default())
    }
}

impl MultiPagePacker {
    /// Create a packer holding one empty page
    pub fn new(config: PackerConfig) -> Self {
        Self {
            pages: vec![Page::with_config(&config)],
            config,
        }
    }

    pub fn config(&self) -> &PackerConfig {
        &self.config
    }

    /// Pages in creation order
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Place a batch of rectangles across pages
    ///
    /// Never fails as a whole: impossible rectangles end up in
    /// [`PackReport::rejected`] and anything left once the page limit is
    /// reached ends up in [`PackReport::unplaced`].
    pub fn pack_rects(&mut self, rects: &[RectRequest]) -> PackReport {
        let mut report = PackReport {
            requested: rects.len(),
            ..Default::default()
        };

        let mut input: Vec<RectRequest> = rects.to_vec();
        let mut carry: Vec<RectRequest> = Vec::new();

        while !input.is_empty() {
            input.sort_by(|a, b| b.height.cmp(&a.height).then(b.width.cmp(&a.width)));

            for rect in input.drain(..) {
                match self.place(rect) {
                    Ok(true) => report.placed += 1,
                    Ok(false) => carry.push(rect),
                    Err(e) => {
                        tracing::error!("{}", e);
                        report.rejected.push(e);
                    }
                }
            }

            if carry.is_empty() {
                break;
            }

            if self.pages.len() >= self.config.max_pages {
                tracing::warn!(
                    "Too many rects to pack: page limit {} reached, {} rects left unplaced",
                    self.config.max_pages,
                    carry.len()
                );
                report.page_limit_reached = true;
                report.unplaced = carry.iter().map(|r| r.id).collect();
                break;
            }

            tracing::debug!(
                "Opening page {} for {} leftover rects",
                self.pages.len(),
                carry.len()
            );
            self.pages.push(Page::with_config(&self.config));
            std::mem::swap(&mut input, &mut carry);
        }

        report.page_count = self.pages.len();
        report
    }

    /// First page in creation order that accepts `rect`
    fn place(&mut self, rect: RectRequest) -> Result<bool, PackError> {
        for page in &mut self.pages {
            if page.add(rect)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// All placements, page by page in placement order
    pub fn placements(&self) -> impl Iterator<Item = Placement> + '_ {
        self.pages.iter().enumerate().flat_map(|(index, page)| {
            let page_size = page.size();
            page.placed().iter().map(move |rect| Placement {
                page: index,
                page_size,
                rect: *rect,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bin::PackingAlgorithm;

    fn assert_pages_disjoint(packer: &MultiPagePacker) {
        for page in packer.pages() {
            let placed = page.placed();
            let area: u64 = placed.iter().map(|r| r.width as u64 * r.height as u64).sum();
            assert!(area <= page.size() as u64 * page.size() as u64);
            for (i, a) in placed.iter().enumerate() {
                for b in &placed[i + 1..] {
                    assert!(!a.overlaps(b), "{:?} overlaps {:?}", a, b);
                }
            }
        }
    }

    #[test]
    fn test_small_batch_fits_one_page() {
        let mut packer = MultiPagePacker::default();
        let rects: Vec<RectRequest> = (0..12).map(|i| RectRequest::new(i, 8, 8)).collect();
        let report = packer.pack_rects(&rects);
        assert!(report.is_complete());
        assert_eq!(report.placed, 12);
        assert_eq!(report.page_count, 1);
        assert_eq!(packer.placements().count(), 12);
        assert_pages_disjoint(&packer);
    }

    #[test]
    fn test_area_reject_spills_to_new_page() {
        // The area check refuses the rect that would fill the page exactly
        let config = PackerConfig {
            max_page_size: 32,
            ..Default::default()
        };
        let mut packer = MultiPagePacker::new(config);
        let rects: Vec<RectRequest> = (0..20).map(|i| RectRequest::new(i, 8, 8)).collect();
        let report = packer.pack_rects(&rects);
        assert!(report.is_complete());
        assert_eq!(report.page_count, 2);
        assert_eq!(packer.pages()[0].placed().len(), 15);
        assert_eq!(packer.pages()[1].placed().len(), 5);
        assert_pages_disjoint(&packer);
    }

    #[test]
    fn test_tallest_first() {
        let mut packer = MultiPagePacker::default();
        let rects = [
            RectRequest::new(0, 4, 4),
            RectRequest::new(1, 8, 16),
            RectRequest::new(2, 8, 8),
            RectRequest::new(3, 16, 8),
        ];
        let report = packer.pack_rects(&rects);
        assert!(report.is_complete());
        let order: Vec<usize> = packer.placements().map(|p| p.rect.id).collect();
        assert_eq!(order, vec![1, 3, 2, 0]);
    }

    #[test]
    fn test_two_large_rects() {
        let mut packer = MultiPagePacker::default();
        let report =
            packer.pack_rects(&[RectRequest::new(0, 600, 600), RectRequest::new(1, 600, 600)]);
        assert_eq!(report.placed, 2);
        assert_eq!(report.page_count, 2);
        for page in packer.pages() {
            assert_eq!(page.size(), 1024);
        }
        assert_pages_disjoint(&packer);
    }

    #[test]
    fn test_page_limit_reports_leftovers() {
        let config = PackerConfig {
            max_page_size: 64,
            max_pages: 2,
            ..Default::default()
        };
        let mut packer = MultiPagePacker::new(config);
        let rects: Vec<RectRequest> = (0..10).map(|i| RectRequest::new(i, 60, 60)).collect();
        let report = packer.pack_rects(&rects);
        assert_eq!(report.placed, 2);
        assert_eq!(report.unplaced.len(), 8);
        assert_eq!(report.dropped(), 8);
        assert!(report.page_limit_reached);
        assert!(!report.is_complete());
        assert_eq!(packer.page_count(), 2);
    }

    #[test]
    fn test_default_page_limit() {
        let mut packer = MultiPagePacker::default();
        let rects: Vec<RectRequest> = (0..200).map(|i| RectRequest::new(i, 1000, 1000)).collect();
        let report = packer.pack_rects(&rects);
        assert!(report.placed < rects.len());
        assert_eq!(report.placed, 128);
        assert_eq!(report.page_count, 128);
        assert!(report.page_limit_reached);
    }

    #[test]
    fn test_impossible_rects_do_not_block_batch() {
        let mut packer = MultiPagePacker::default();
        let rects = [
            RectRequest::new(0, 2000, 10),
            RectRequest::new(1, 10, 10),
            RectRequest::new(2, 1024, 1024),
            RectRequest::new(3, 12, 3),
        ];
        let report = packer.pack_rects(&rects);
        assert_eq!(report.placed, 2);
        assert_eq!(report.rejected.len(), 2);
        assert!(report.unplaced.is_empty());
        assert!(!report.page_limit_reached);
        assert_eq!(report.page_count, 1);
    }

    #[test]
    fn test_guillotine_algorithm_packs_disjoint() {
        let config = PackerConfig {
            algorithm: PackingAlgorithm::Guillotine,
            ..Default::default()
        };
        let mut packer = MultiPagePacker::new(config);
        let rects: Vec<RectRequest> = (0..300)
            .map(|i| RectRequest::new(i, 10 + (i as u32 * 7) % 90, 10 + (i as u32 * 13) % 70))
            .collect();
        let report = packer.pack_rects(&rects);
        assert!(report.is_complete());
        assert_pages_disjoint(&packer);
    }
}
