use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use super::canvas::PixelCanvas;
use super::Viewport;

/// Presents a [`PixelCanvas`] in a window through `pixels`.
///
/// The frame buffer is the viewport's backing store; `pixels` scales it to
/// whatever physical size the window surface currently has.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
    surface_size: (u32, u32),
}

impl Renderer {
    pub fn new(window: Arc<Window>, viewport: Viewport) -> Result<Self, Error> {
        let size = window.inner_size();
        let surface_size = surface_extent((size.width, size.height), viewport);
        let pixels = Self::build_pixels(Arc::clone(&window), surface_size, viewport)?;
        Ok(Self {
            window,
            pixels,
            viewport,
            surface_size,
        })
    }

    /// The window surface changed size; the logical canvas does not.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.surface_size = (width, height);
        self.pixels =
            Self::build_pixels(Arc::clone(&self.window), self.surface_size, self.viewport)?;
        Ok(())
    }

    /// The window moved to a display with a different scale factor.
    pub fn set_pixel_ratio(&mut self, pixel_ratio: f32) -> Result<(), Error> {
        let viewport = Viewport::new(self.viewport.width, self.viewport.height, pixel_ratio);
        if viewport == self.viewport {
            return Ok(());
        }
        self.viewport = viewport;
        self.pixels = Self::build_pixels(Arc::clone(&self.window), self.surface_size, viewport)?;
        Ok(())
    }

    pub fn canvas(&mut self) -> PixelCanvas<'_> {
        let (width, height) = self.viewport.backing_size();
        PixelCanvas::new(
            self.pixels.frame_mut(),
            width,
            height,
            self.viewport.pixel_ratio,
        )
    }

    pub fn present(&self) -> Result<(), Error> {
        self.pixels.render()
    }

    fn build_pixels(
        window: Arc<Window>,
        surface_size: (u32, u32),
        viewport: Viewport,
    ) -> Result<Pixels<'static>, Error> {
        let (buffer_width, buffer_height) = viewport.backing_size();
        let surface = SurfaceTexture::new(surface_size.0, surface_size.1, window);
        Pixels::new(buffer_width, buffer_height, surface)
    }
}

/// Windows can report a zero inner size before they are first shown.
fn surface_extent(inner: (u32, u32), viewport: Viewport) -> (u32, u32) {
    if inner.0 == 0 || inner.1 == 0 {
        viewport.backing_size()
    } else {
        inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_type_is_non_generic() {
        fn assert_sized<T: Sized>() {}
        assert_sized::<Renderer>();
    }

    #[test]
    fn surface_extent_prefers_window_size() {
        let viewport = Viewport::new(600, 600, 2.0);
        assert_eq!(surface_extent((1280, 1200), viewport), (1280, 1200));
    }

    #[test]
    fn surface_extent_falls_back_to_backing_store() {
        let viewport = Viewport::new(600, 400, 2.0);
        assert_eq!(surface_extent((0, 900), viewport), (1200, 800));
    }
}
