//! Visible prefix of a filtered and sorted collection, grown one page at a time.

/// Rows added each time more are requested.
pub const PAGE_SIZE: usize = 50;

/// The consumer computes the whole collection, then shows `slice()` of it. Any filter or
/// sort change must call [`VisibleWindow::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleWindow {
    visible: usize,
}

impl VisibleWindow {
    pub fn new() -> Self {
        Self { visible: PAGE_SIZE }
    }

    /// Window after `pages` growth steps have been requested (at least one page).
    pub fn with_pages(pages: usize) -> Self {
        Self {
            visible: PAGE_SIZE.saturating_mul(pages.max(1)),
        }
    }

    pub fn visible(&self) -> usize {
        self.visible
    }

    pub fn has_more(&self, total: usize) -> bool {
        self.visible < total
    }

    /// Grow by one page if the window does not yet cover `total`. Returns whether it grew.
    pub fn request_more(&mut self, total: usize) -> bool {
        if self.has_more(total) {
            self.visible = self.visible.saturating_add(PAGE_SIZE);
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.visible = PAGE_SIZE;
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[..self.visible.min(items.len())]
    }
}

impl Default for VisibleWindow {
    fn default() -> Self {
        Self::new()
    }
}
