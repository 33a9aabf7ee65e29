// rams-document-service/src/preview/view.rs

pub const MIN_ZOOM: f32 = 0.5;
pub const MAX_ZOOM: f32 = 3.0;
pub const ZOOM_STEP: f32 = 0.25;

/// Preview scale factor, in quarter steps between 0.5x and 3.0x.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zoom(f32);

impl Default for Zoom {
    fn default() -> Self {
        Self(1.0)
    }
}

impl Zoom {
    pub fn value(&self) -> f32 {
        self.0
    }

    pub fn zoom_in(&mut self) {
        self.0 = (self.0 + ZOOM_STEP).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.0 = (self.0 - ZOOM_STEP).max(MIN_ZOOM);
    }

    pub fn reset(&mut self) {
        self.0 = 1.0;
    }
}

/// Current page within `1..=num_pages`. Moves outside the range are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    current: u32,
    num_pages: u32,
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::new(1)
    }
}

impl PageCursor {
    pub fn new(num_pages: u32) -> Self {
        Self {
            current: 1,
            num_pages: num_pages.max(1),
        }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }

    pub fn next(&mut self) {
        if self.current < self.num_pages {
            self.current += 1;
        }
    }

    pub fn prev(&mut self) {
        if self.current > 1 {
            self.current -= 1;
        }
    }

    pub fn go_to(&mut self, page: u32) {
        if (1..=self.num_pages).contains(&page) {
            self.current = page;
        }
    }
}
