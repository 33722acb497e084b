//! # Platform Interface
//!
//! Window and event-loop services the engine needs each frame. Desktop
//! backends wrap a real window; [`HeadlessPlatform`] simulates one.

/// Window / OS integration.
pub trait Platform {
    /// Pumps pending OS events. Called once at the start of every frame.
    fn poll_events(&mut self);

    /// Returns true once the user or OS asked to close.
    fn should_close(&self) -> bool;

    /// Current framebuffer size in pixels.
    fn framebuffer_size(&self) -> (u32, u32);
}

/// A window that does not exist.
///
/// Counts polled frames and reports `should_close` once `frame_limit` frames
/// have been polled. Size changes and close requests can be injected.
#[derive(Clone, Debug)]
pub struct HeadlessPlatform {
    size: (u32, u32),
    frame_limit: Option<u64>,
    frames_polled: u64,
    close_requested: bool,
}

impl HeadlessPlatform {
    /// Creates a platform that never closes on its own.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            frame_limit: None,
            frames_polled: 0,
            close_requested: false,
        }
    }

    /// Closes after `frames` polls.
    #[must_use]
    pub const fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }

    /// Simulates the user resizing the window.
    pub fn set_framebuffer_size(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    /// Simulates the user closing the window.
    pub fn request_close(&mut self) {
        self.close_requested = true;
    }

    /// Number of `poll_events` calls so far.
    #[must_use]
    pub const fn frames_polled(&self) -> u64 {
        self.frames_polled
    }
}

impl Platform for HeadlessPlatform {
    fn poll_events(&mut self) {
        self.frames_polled += 1;
    }

    fn should_close(&self) -> bool {
        self.close_requested
            || self
                .frame_limit
                .is_some_and(|limit| self.frames_polled >= limit)
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_limit() {
        let mut platform = HeadlessPlatform::new(64, 64).with_frame_limit(2);
        assert!(!platform.should_close());
        platform.poll_events();
        assert!(!platform.should_close());
        platform.poll_events();
        assert!(platform.should_close());
    }

    #[test]
    fn test_injected_events() {
        let mut platform = HeadlessPlatform::new(64, 64);
        platform.set_framebuffer_size(128, 32);
        assert_eq!(platform.framebuffer_size(), (128, 32));

        platform.request_close();
        assert!(platform.should_close());
    }
}
