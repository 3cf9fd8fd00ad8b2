pub mod color;
pub mod render;
