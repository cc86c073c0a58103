//! Optional logo and background images.

/// Image decoding into premultiplied RGBA8.
pub mod decode;
