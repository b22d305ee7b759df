//! Windowed rendering: which rows of a long list need to be laid out.
//!
//! The virtualizer keeps a prefix-sum table of item sizes (estimated, or
//! measured once the row has been drawn) and binary-searches it against the
//! scroll offset. Mutations only mark the table dirty; it is rebuilt on the
//! next read.

use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_OVERSCAN: usize = 10;

/// Per-item size guess used until a real measurement exists
#[derive(Clone)]
pub enum SizeEstimator {
    Fixed(f32),
    Dynamic(Arc<dyn Fn(usize) -> f32 + Send + Sync>),
}

impl SizeEstimator {
    pub fn dynamic(f: impl Fn(usize) -> f32 + Send + Sync + 'static) -> Self {
        SizeEstimator::Dynamic(Arc::new(f))
    }

    pub fn estimate(&self, index: usize) -> f32 {
        let size = match self {
            SizeEstimator::Fixed(size) => *size,
            SizeEstimator::Dynamic(f) => f(index),
        };
        sanitize_size(size)
    }
}

impl std::fmt::Debug for SizeEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SizeEstimator::Fixed(size) => write!(f, "Fixed({size})"),
            SizeEstimator::Dynamic(_) => write!(f, "Dynamic(..)"),
        }
    }
}

fn sanitize_size(size: f32) -> f32 {
    if size.is_finite() && size > 0.0 {
        size
    } else {
        0.0
    }
}

/// One materialized row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirtualItem {
    pub index: usize,
    pub start: f32,
    pub size: f32,
}

impl VirtualItem {
    pub fn end(&self) -> f32 {
        self.start + self.size
    }
}

/// Rows to draw plus the full scrollable extent
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VirtualWindow {
    pub total_extent: f32,
    pub items: Vec<VirtualItem>,
}

impl VirtualWindow {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Index range covered by `items`
    pub fn range(&self) -> std::ops::Range<usize> {
        match (self.items.first(), self.items.last()) {
            (Some(first), Some(last)) => first.index..last.index + 1,
            _ => 0..0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Virtualizer {
    count: usize,
    estimator: SizeEstimator,
    overscan: usize,
    measured: HashMap<usize, f32>,
    // offsets[i] = start of item i, offsets[count] = total extent
    offsets: Vec<f32>,
    dirty: bool,
}

impl Virtualizer {
    pub fn new(count: usize, estimator: SizeEstimator) -> Self {
        Self {
            count,
            estimator,
            overscan: DEFAULT_OVERSCAN,
            measured: HashMap::new(),
            offsets: Vec::new(),
            dirty: true,
        }
    }

    pub fn fixed(count: usize, size: f32) -> Self {
        Self::new(count, SizeEstimator::Fixed(size))
    }

    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn overscan(&self) -> usize {
        self.overscan
    }

    pub fn set_count(&mut self, count: usize) {
        if count == self.count {
            return;
        }
        if count < self.count {
            self.measured.retain(|&i, _| i < count);
        }
        self.count = count;
        self.dirty = true;
    }

    /// Swapping the estimator discards measurements made under the old one
    pub fn set_estimator(&mut self, estimator: SizeEstimator) {
        self.estimator = estimator;
        self.measured.clear();
        self.dirty = true;
    }

    pub fn set_overscan(&mut self, overscan: usize) {
        self.overscan = overscan;
    }

    /// Record the real size of an item once it has been laid out
    pub fn measure(&mut self, index: usize, size: f32) {
        if index >= self.count {
            return;
        }
        let size = sanitize_size(size);
        if self.measured.get(&index) != Some(&size) {
            self.measured.insert(index, size);
            self.dirty = true;
        }
    }

    fn size_of(&self, index: usize) -> f32 {
        self.measured
            .get(&index)
            .copied()
            .unwrap_or_else(|| self.estimator.estimate(index))
    }

    fn ensure_offsets(&mut self) {
        if !self.dirty && self.offsets.len() == self.count + 1 {
            return;
        }
        let mut offsets = Vec::with_capacity(self.count + 1);
        let mut acc = 0.0f32;
        offsets.push(acc);
        for i in 0..self.count {
            acc += self.size_of(i);
            offsets.push(acc);
        }
        self.offsets = offsets;
        self.dirty = false;
    }

    pub fn total_extent(&mut self) -> f32 {
        self.ensure_offsets();
        self.offsets[self.count]
    }

    /// Scroll position that puts `index` at the top of the viewport
    pub fn offset_for_index(&mut self, index: usize) -> f32 {
        self.ensure_offsets();
        self.offsets[index.min(self.count)]
    }

    /// Rows that intersect `[scroll_offset, scroll_offset + viewport)`, padded
    /// by `overscan` on both sides. `viewport == None` means the scroll
    /// container is not attached yet and yields an empty window.
    pub fn compute(&mut self, scroll_offset: f32, viewport: Option<f32>) -> VirtualWindow {
        self.ensure_offsets();
        let total_extent = self.offsets[self.count];

        let viewport = match viewport {
            Some(v) if v.is_finite() && v > 0.0 => v,
            _ => {
                return VirtualWindow {
                    total_extent,
                    items: Vec::new(),
                }
            }
        };
        if self.count == 0 {
            return VirtualWindow {
                total_extent,
                items: Vec::new(),
            };
        }

        let max_offset = (total_extent - viewport).max(0.0);
        let offset = if scroll_offset.is_finite() {
            scroll_offset.clamp(0.0, max_offset)
        } else {
            0.0
        };
        let end = offset + viewport;

        // First item whose end lies past the offset
        let first = self.offsets[1..]
            .partition_point(|&item_end| item_end <= offset)
            .min(self.count - 1);
        // Items starting before the viewport end
        let last = self.offsets[..self.count]
            .partition_point(|&start| start < end)
            .saturating_sub(1)
            .max(first);

        let start_index = first.saturating_sub(self.overscan);
        let end_index = (last + self.overscan).min(self.count - 1);

        let items = (start_index..=end_index)
            .map(|index| VirtualItem {
                index,
                start: self.offsets[index],
                size: self.offsets[index + 1] - self.offsets[index],
            })
            .collect();

        VirtualWindow {
            total_extent,
            items,
        }
    }
}

/// One-shot window computation without keeping a [`Virtualizer`] around
pub fn compute_window(
    count: usize,
    estimator: SizeEstimator,
    overscan: usize,
    scroll_offset: f32,
    viewport: Option<f32>,
) -> VirtualWindow {
    Virtualizer::new(count, estimator)
        .with_overscan(overscan)
        .compute(scroll_offset, viewport)
}
