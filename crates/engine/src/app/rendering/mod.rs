mod canvas;
mod font;
mod renderer;
mod transform;

pub use canvas::{Color, DrawSurface, Font, PixelCanvas, DEFAULT_FONT};
pub use renderer::Renderer;
pub use transform::{normalize_pixel_ratio, Viewport};
