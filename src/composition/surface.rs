use tracing::debug;

use crate::video::types::Frame;

/// The single frame buffer every clip draws into
///
/// Sized to the native resolution of the clip that is playing. Only one frame
/// is held at a time.
#[derive(Debug, Clone)]
pub struct DrawingSurface {
    frame: Frame,
}

impl Default for DrawingSurface {
    fn default() -> Self {
        Self {
            frame: Frame::new_black(1, 1),
        }
    }
}

impl DrawingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            frame: Frame::new_black(width.max(1), height.max(1)),
        }
    }

    /// Resize to a clip's resolution, returns whether the size changed
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        let size = (width.max(1), height.max(1));
        if self.frame.dimensions() == size {
            return false;
        }
        debug!(
            "Surface resized {}x{} -> {}x{}",
            self.frame.width(),
            self.frame.height(),
            size.0,
            size.1
        );
        self.frame = Frame::new_black(size.0, size.1);
        true
    }

    /// Draw a decoded frame, resampling it if it does not match the surface
    pub fn draw(&mut self, frame: Frame) {
        let (width, height) = self.frame.dimensions();
        self.frame = if frame.dimensions() == (width, height) {
            frame
        } else {
            frame.resized(width, height)
        };
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.frame.dimensions()
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn frame_mut(&mut self) -> &mut Frame {
        &mut self.frame
    }
}
