use serde::Serialize;

/// Pixel rectangle, origin at the top-left corner of the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextRegion {
    pub text: String,
    pub bounding_box: Option<BoundingBox>,
    /// Word confidence in the range 0..=100 as reported by the engine.
    pub confidence: Option<f32>,
}
