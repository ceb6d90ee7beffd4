//! Scroll window over the match list.
//!
//! The viewport is the contiguous range `[start, start + page_size)` of
//! match indices currently on screen. It follows the cursor with a scroll
//! buffer: the cursor is kept at least `buffer` rows away from either edge
//! whenever the list is long enough, so the list scrolls before the cursor
//! reaches the last visible row.

/// Visible window over a list of `len` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    start: usize,
    page_size: usize,
    buffer: usize,
}

impl Viewport {
    pub fn new(page_size: usize, buffer: usize) -> Self {
        Viewport {
            start: 0,
            page_size: page_size.max(1),
            buffer,
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Effective buffer: never so large that no row is a valid cursor spot.
    pub fn buffer(&self) -> usize {
        self.buffer.min((self.page_size - 1) / 2)
    }

    /// Visible range for a list of `len` rows.
    pub fn range(&self, len: usize) -> std::ops::Range<usize> {
        let end = (self.start + self.page_size).min(len);
        self.start.min(end)..end
    }

    pub fn reset(&mut self) {
        self.start = 0;
    }

    pub fn set_page_size(&mut self, page_size: usize, cursor: usize, len: usize) {
        self.page_size = page_size.max(1);
        self.follow(cursor, len);
    }

    /// Move `start` by the minimal amount that keeps `cursor` inside the
    /// buffered interior, then clamp so the last page is full.
    pub fn follow(&mut self, cursor: usize, len: usize) {
        if len <= self.page_size {
            self.start = 0;
            return;
        }

        let buffer = self.buffer();
        if cursor < self.start + buffer {
            self.start = cursor.saturating_sub(buffer);
        } else if cursor + buffer >= self.start + self.page_size {
            self.start = cursor + buffer + 1 - self.page_size;
        }

        self.start = self.start.min(len - self.page_size);
    }
}
