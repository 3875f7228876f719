pub mod gemini;
pub mod image;

pub use self::gemini::*;
pub use self::image::*;
