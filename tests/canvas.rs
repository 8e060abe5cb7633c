#![cfg(target_arch = "wasm32")]

use rand::SeedableRng;
use rand::rngs::StdRng;
use red_bubble::config::GameConfig;
use red_bubble::geometry::viewport_for;
use red_bubble::render::render_frame;
use red_bubble::screens::{EndScreen, MenuScreen};
use red_bubble::share::{QrStyle, render_qr_data_url};
use red_bubble::sim::{BubbleKind, Session};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;
use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement};

wasm_bindgen_test_configure!(run_in_browser);

fn document() -> Document {
    web_sys::window()
        .expect("no window")
        .document()
        .expect("no document")
}

fn canvas_2d(width: u32, height: u32) -> CanvasRenderingContext2d {
    let canvas = document()
        .create_element("canvas")
        .expect("create canvas")
        .dyn_into::<HtmlCanvasElement>()
        .expect("canvas element");
    canvas.set_width(width);
    canvas.set_height(height);

    canvas
        .get_context("2d")
        .expect("get context")
        .expect("2d context")
        .dyn_into::<CanvasRenderingContext2d>()
        .expect("cast 2d")
}

#[wasm_bindgen_test]
fn canvas_2d_context_available() {
    let ctx = canvas_2d(16, 16);
    ctx.set_fill_style_str("#3b82f6");
    ctx.fill_rect(0.0, 0.0, 16.0, 16.0);
}

#[wasm_bindgen_test]
fn renders_a_live_session() {
    let ctx = canvas_2d(300, 400);
    let viewport = viewport_for(300.0, 400.0, 1.0);
    let mut session = Session::new(GameConfig::default(), 0.0, StdRng::seed_from_u64(8));
    for _ in 0..4 {
        session.spawn_bubble(Some(&viewport)).expect("spawn");
    }
    for _ in 0..60 {
        session.advance(viewport.height);
    }

    assert!(render_frame(&ctx, &session, &viewport, 1234.0).is_ok());
}

#[wasm_bindgen_test]
fn blue_bubble_body_is_painted_blue() {
    let ctx = canvas_2d(300, 400);
    let viewport = viewport_for(300.0, 400.0, 1.0);
    let mut session = Session::new(GameConfig::default(), 0.0, StdRng::seed_from_u64(21));
    let bubble = session.spawn_bubble(Some(&viewport)).expect("spawn");
    assert_eq!(bubble.kind, BubbleKind::Blue);

    // Bring it well below the HUD.
    while session.bubbles()[0].center().1 < 200.0 {
        session.advance(viewport.height);
    }
    render_frame(&ctx, &session, &viewport, 0.0).expect("render");

    let (cx, cy) = session.bubbles()[0].center();
    let pixel = ctx
        .get_image_data(cx.round(), cy.round(), 1.0, 1.0)
        .expect("image data")
        .data();
    assert!(pixel[2] as i32 > pixel[0] as i32 + 100, "pixel {:?}", pixel.to_vec());
}

#[wasm_bindgen_test]
fn share_qr_is_a_png_data_url() {
    let url = render_qr_data_url(&document(), "https://example.org/", &QrStyle::default())
        .expect("qr");
    assert!(url.starts_with("data:image/png"));
}

#[wasm_bindgen_test]
fn screens_build_with_their_actions() {
    let doc = document();
    let host = doc.create_element("div").expect("host");

    let menu = MenuScreen::build(&doc, &host, &GameConfig::default()).expect("menu");
    assert_eq!(menu.start_button.text_content().as_deref(), Some("Start Game"));

    let end = EndScreen::build(&doc, &host).expect("end");
    end.set_score(42);
    assert_eq!(end.score_text.text_content().as_deref(), Some("Your Score: 42"));
    assert!(end.share_panel.hidden());
    assert_eq!(host.child_element_count(), 2);
}
