//! Viewport sizing and pointer coordinate conversion.
//!
//! Bubble coordinates are logical (CSS) pixels. Device-pixel scaling only shows
//! up here: when sizing the canvas backing store and when mapping client
//! coordinates of an input event back onto the playfield.

const MAX_DPR: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Logical width in CSS pixels.
    pub width: f64,
    /// Logical height in CSS pixels.
    pub height: f64,
    pub dpr: f64,
}

impl Viewport {
    pub fn canvas_width_px(&self) -> u32 {
        (self.width * self.dpr).floor().max(1.0) as u32
    }

    pub fn canvas_height_px(&self) -> u32 {
        (self.height * self.dpr).floor().max(1.0) as u32
    }
}

/// Bounding rect of the canvas in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClientRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

pub fn sanitize_dpr(dpr: f64) -> f64 {
    if dpr.is_finite() && dpr > 0.0 {
        dpr.min(MAX_DPR)
    } else {
        1.0
    }
}

pub fn viewport_for(css_width: f64, css_height: f64, dpr: f64) -> Viewport {
    let clean = |v: f64| if v.is_finite() { v.max(1.0) } else { 1.0 };
    Viewport {
        width: clean(css_width),
        height: clean(css_height),
        dpr: sanitize_dpr(dpr),
    }
}

/// Maps client coordinates onto the logical playfield.
///
/// `canvas_px` is the backing store size. The scale factor
/// `canvas_px / (rect_size * dpr)` is 1.0 when the canvas fills its rect, and
/// corrects for CSS stretching otherwise.
pub fn client_to_canvas(
    client_x: f64,
    client_y: f64,
    rect: ClientRect,
    canvas_px: (u32, u32),
    dpr: f64,
) -> Option<(f64, f64)> {
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return None;
    }
    let dpr = sanitize_dpr(dpr);
    let scale_x = canvas_px.0 as f64 / (rect.width * dpr);
    let scale_y = canvas_px.1 as f64 / (rect.height * dpr);
    Some((
        (client_x - rect.left) * scale_x,
        (client_y - rect.top) * scale_y,
    ))
}
