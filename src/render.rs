//! Canvas 2D frame painting.
//!
//! Everything here reads session state and wall-clock time and writes pixels.
//! Nothing here mutates the session.

use crate::geometry::Viewport;
use crate::sim::{Bubble, BubbleKind, Session};
use std::f64::consts::TAU;
use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

const PARTICLE_COUNT: u32 = 50;
const BG_DARK: &str = "#0f172a";
const BG_MID: &str = "#1e293b";
const HUD_FONT: &str = "bold 24px Arial";
const HUD_TOP: f64 = 40.0;
const HUD_LINE: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub alpha: f64,
}

pub fn bubble_color(kind: BubbleKind) -> &'static str {
    match kind {
        BubbleKind::Blue => "#3b82f6",
        BubbleKind::Red => "#ef4444",
    }
}

/// Fill colour at 25% opacity, for the inner stop of the glow.
pub fn glow_color(kind: BubbleKind) -> String {
    format!("{}40", bubble_color(kind))
}

/// Ambient particle `index` at `time_s` seconds. A radius at or below zero
/// means the particle is not drawn this frame.
pub fn particle(index: u32, time_s: f64, width: f64, height: f64) -> Particle {
    let phase = time_s + index as f64;
    let s = phase.sin();
    Particle {
        x: (s * width) % width,
        y: (phase.cos() * height) % height,
        radius: s * 2.0 + 1.0,
        alpha: 0.1 + s * 0.05,
    }
}

pub fn hud_lines(session: &Session) -> [String; 3] {
    [
        format!("Score: {}", session.score()),
        format!("Level: {}", session.level()),
        format!("Lives: {}", session.lives()),
    ]
}

/// Paints one full frame in logical coordinates. The caller has already set
/// the context transform to the device pixel ratio.
pub fn render_frame(
    ctx: &CanvasRenderingContext2d,
    session: &Session,
    viewport: &Viewport,
    time_ms: f64,
) -> Result<(), JsValue> {
    let time_s = time_ms * 0.001;
    ctx.clear_rect(0.0, 0.0, viewport.width, viewport.height);
    draw_background(ctx, viewport, time_s)?;
    for bubble in session.live_bubbles() {
        draw_bubble(ctx, bubble)?;
    }
    draw_hud(ctx, session, viewport)
}

fn draw_background(
    ctx: &CanvasRenderingContext2d,
    viewport: &Viewport,
    time_s: f64,
) -> Result<(), JsValue> {
    let (w, h) = (viewport.width, viewport.height);

    let main = ctx.create_linear_gradient(0.0, 0.0, 0.0, h);
    main.add_color_stop(0.0, BG_DARK)?;
    main.add_color_stop(0.5, BG_MID)?;
    main.add_color_stop(1.0, BG_DARK)?;
    ctx.set_fill_style_canvas_gradient(&main);
    ctx.fill_rect(0.0, 0.0, w, h);

    let cx = w * 0.5;
    let cy = h * 0.5;
    let overlay = ctx.create_radial_gradient(
        cx + (time_s * 0.5).sin() * 50.0,
        cy + (time_s * 0.5).cos() * 50.0,
        0.0,
        cx,
        cy,
        w.max(h),
    )?;
    overlay.add_color_stop(0.0, "rgba(30, 41, 59, 0.8)")?;
    overlay.add_color_stop(0.5, "rgba(15, 23, 42, 0.4)")?;
    overlay.add_color_stop(1.0, "rgba(15, 23, 42, 0.8)")?;
    ctx.set_fill_style_canvas_gradient(&overlay);
    ctx.fill_rect(0.0, 0.0, w, h);

    for i in 0..PARTICLE_COUNT {
        let p = particle(i, time_s, w, h);
        if p.radius <= 0.0 {
            continue;
        }
        ctx.begin_path();
        ctx.arc(p.x, p.y, p.radius, 0.0, TAU)?;
        ctx.set_fill_style_str(&format!("rgba(148, 163, 184, {:.3})", p.alpha));
        ctx.fill();
    }

    Ok(())
}

fn draw_bubble(ctx: &CanvasRenderingContext2d, bubble: &Bubble) -> Result<(), JsValue> {
    let (cx, cy) = bubble.center();
    let r = bubble.radius();
    let color = bubble_color(bubble.kind);

    let glow = ctx.create_radial_gradient(cx, cy, 0.0, cx, cy, bubble.size)?;
    glow.add_color_stop(0.0, &glow_color(bubble.kind))?;
    glow.add_color_stop(1.0, "transparent")?;
    ctx.begin_path();
    ctx.arc(cx, cy, bubble.size, 0.0, TAU)?;
    ctx.set_fill_style_canvas_gradient(&glow);
    ctx.fill();

    // Shadow, then body on top of it.
    ctx.begin_path();
    ctx.arc(cx, cy, r, 0.0, TAU)?;
    ctx.set_fill_style_str("rgba(0, 0, 0, 0.3)");
    ctx.fill();
    ctx.set_fill_style_str(color);
    ctx.fill();

    ctx.begin_path();
    ctx.arc(
        bubble.x + bubble.size / 3.0,
        bubble.y + bubble.size / 3.0,
        bubble.size / 6.0,
        0.0,
        TAU,
    )?;
    ctx.set_fill_style_str("rgba(255, 255, 255, 0.6)");
    ctx.fill();

    ctx.begin_path();
    ctx.arc(cx, cy, r, 0.0, TAU)?;
    ctx.set_stroke_style_str("rgba(255, 255, 255, 0.8)");
    ctx.set_line_width(2.0);
    ctx.stroke();

    Ok(())
}

fn draw_hud(
    ctx: &CanvasRenderingContext2d,
    session: &Session,
    viewport: &Viewport,
) -> Result<(), JsValue> {
    ctx.set_fill_style_str("white");
    ctx.set_font(HUD_FONT);
    ctx.set_text_align("center");
    ctx.set_shadow_color("rgba(0, 0, 0, 0.5)");
    ctx.set_shadow_blur(4.0);

    let x = viewport.width * 0.5;
    for (i, line) in hud_lines(session).iter().enumerate() {
        ctx.fill_text(line, x, HUD_TOP + HUD_LINE * i as f64)?;
    }

    ctx.set_shadow_blur(0.0);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn colors_by_kind() {
        assert_eq!(bubble_color(BubbleKind::Blue), "#3b82f6");
        assert_eq!(bubble_color(BubbleKind::Red), "#ef4444");
        assert_eq!(glow_color(BubbleKind::Red), "#ef444440");
    }

    #[test]
    fn particles_stay_inside_playfield_span() {
        for i in 0..PARTICLE_COUNT {
            let p = particle(i, 12.34, 400.0, 800.0);
            assert!(p.x.abs() < 400.0);
            assert!(p.y.abs() < 800.0);
            assert!((-1.0..=3.0).contains(&p.radius));
            assert!((0.05..=0.15).contains(&p.alpha));
        }
    }

    #[test]
    fn particles_move_with_time() {
        assert_ne!(particle(3, 0.0, 400.0, 800.0), particle(3, 1.0, 400.0, 800.0));
        assert_eq!(particle(3, 2.0, 400.0, 800.0), particle(3, 2.0, 400.0, 800.0));
    }

    #[test]
    fn hud_reflects_session() {
        let session = Session::new(GameConfig::default(), 0.0, StdRng::seed_from_u64(1));
        assert_eq!(
            hud_lines(&session),
            [
                "Score: 0".to_string(),
                "Level: 1".to_string(),
                "Lives: 3".to_string()
            ]
        );
    }
}
