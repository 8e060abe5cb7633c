//! Score sharing from the end screen: share text, a QR code of the page URL,
//! and a best-effort clipboard copy.

use js_sys::{Function, Promise, Reflect};
use qrcodegen::{QrCode, QrCodeEcc};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement, Window};

pub const QR_SIZE_PX: u32 = 176;

pub fn share_text(score: u32, url: &str) -> String {
    let points = if score == 1 { "point" } else { "points" };
    format!("I scored {} {} in Red Bubble! {}", score, points, url)
}

/// Drops any fragment and query so the QR points at a clean game URL.
pub fn share_url(href: &str) -> &str {
    let end = href.find(['?', '#']).unwrap_or(href.len());
    &href[..end]
}

pub fn js_value_to_string(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

fn js_function(target: &JsValue, name: &str) -> Result<Function, String> {
    Reflect::get(target, &JsValue::from_str(name))
        .map_err(|err| js_value_to_string(&err))?
        .dyn_into::<Function>()
        .map_err(|_| format!("{} missing", name))
}

/// How the share QR is painted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QrStyle {
    pub size_px: u32,
    /// Quiet zone around the code, in modules.
    pub quiet_modules: i32,
    pub light: &'static str,
    pub dark: &'static str,
}

impl Default for QrStyle {
    fn default() -> Self {
        Self {
            size_px: QR_SIZE_PX,
            quiet_modules: 2,
            light: "#f8fcff",
            dark: "#0f172a",
        }
    }
}

impl QrStyle {
    /// Pixel rectangle `(x, y, w, h)` covering module `(mx, my)`, snapped
    /// outward to whole pixels so neighbouring modules never leave a seam.
    pub fn module_rect(&self, code_modules: i32, mx: i32, my: i32) -> (f64, f64, f64, f64) {
        let per_module = self.size_px as f64 / (code_modules + self.quiet_modules * 2) as f64;
        let edge = |m: i32| (m + self.quiet_modules) as f64 * per_module;
        let (x0, y0) = (edge(mx).floor(), edge(my).floor());
        let (x1, y1) = (edge(mx + 1).ceil(), edge(my + 1).ceil());
        (x0, y0, (x1 - x0).max(1.0), (y1 - y0).max(1.0))
    }
}

/// Encodes `payload` as a QR code and returns it as a PNG data URL.
pub fn render_qr_data_url(
    document: &Document,
    payload: &str,
    style: &QrStyle,
) -> Result<String, JsValue> {
    let qr = QrCode::encode_text(payload, QrCodeEcc::Medium)
        .map_err(|_| JsValue::from_str("share link too long for a QR code"))?;

    let canvas = document
        .create_element("canvas")?
        .dyn_into::<HtmlCanvasElement>()?;
    canvas.set_width(style.size_px);
    canvas.set_height(style.size_px);

    let ctx = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2D canvas unavailable for share QR"))?
        .dyn_into::<CanvasRenderingContext2d>()?;
    ctx.set_image_smoothing_enabled(false);

    let side = style.size_px as f64;
    ctx.set_fill_style_str(style.light);
    ctx.fill_rect(0.0, 0.0, side, side);

    ctx.set_fill_style_str(style.dark);
    let modules = qr.size();
    for my in 0..modules {
        for mx in (0..modules).filter(|&mx| qr.get_module(mx, my)) {
            let (x, y, w, h) = style.module_rect(modules, mx, my);
            ctx.fill_rect(x, y, w, h);
        }
    }

    canvas.to_data_url_with_type("image/png")
}

/// Copies `text` through `navigator.clipboard.writeText`. Reached through
/// `Reflect` since the clipboard is missing on insecure origins.
pub async fn copy_to_clipboard(window: &Window, text: &str) -> Result<(), String> {
    let nav_js: JsValue = window.navigator().into();
    let clipboard = Reflect::get(&nav_js, &JsValue::from_str("clipboard"))
        .map_err(|err| js_value_to_string(&err))?;
    if clipboard.is_undefined() || clipboard.is_null() {
        return Err("clipboard unavailable".to_string());
    }

    let write_text = js_function(&clipboard, "writeText")?;
    let promise = write_text
        .call1(&clipboard, &JsValue::from_str(text))
        .map_err(|err| js_value_to_string(&err))?;
    JsFuture::from(Promise::from(promise))
        .await
        .map_err(|err| js_value_to_string(&err))?;
    Ok(())
}
