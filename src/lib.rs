pub mod config;
pub mod geometry;
pub mod render;
pub mod screens;
pub mod share;
pub mod sim;

use config::{GameConfig, RuntimeOptions};
use geometry::{ClientRect, Viewport, client_to_canvas, viewport_for};
use rand::SeedableRng;
use rand::rngs::StdRng;
use screens::{EndScreen, MenuScreen, Mode, ModeController, set_overlay_visible};
use share::js_value_to_string;
use sim::{Session, TapOutcome};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{
    CanvasRenderingContext2d, Document, Event, HtmlButtonElement, HtmlCanvasElement,
    HtmlDivElement, HtmlElement, MouseEvent, TouchEvent, Window,
};

const LOG_PREFIX: &str = "[red_bubble]";
const DIAGNOSTICS_EVERY_FRAMES: u64 = 30;

type Shared = Rc<RefCell<AppState>>;

struct AppState {
    document: Document,
    canvas: HtmlCanvasElement,
    ctx: Option<CanvasRenderingContext2d>,
    diagnostics: HtmlDivElement,
    diagnostics_text: HtmlElement,
    tools_button: Option<HtmlButtonElement>,
    diagnostics_open: bool,
    menu: MenuScreen,
    end: EndScreen,
    modes: ModeController,
    config: GameConfig,
    config_warnings: Vec<String>,
    seed: Option<u64>,
    session: Option<Session>,
    viewport: Option<Viewport>,
    view: Option<GameView>,
    score_reported: bool,
    frames: u64,
    status: String,
    last_event: String,
}

/// Everything that only exists while a session is on screen: the scheduled
/// animation frame and the input/resize listeners. Dropping it cancels the
/// frame and detaches every listener.
struct GameView {
    window: Window,
    canvas: HtmlCanvasElement,
    frame_cb: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>,
    raf_id: Rc<Cell<Option<i32>>>,
    on_resize: Closure<dyn FnMut(Event)>,
    on_click: Closure<dyn FnMut(MouseEvent)>,
    on_touchend: Closure<dyn FnMut(TouchEvent)>,
}

impl GameView {
    fn mount(shared: &Shared) -> Result<Self, JsValue> {
        let window = window();
        let canvas = shared.borrow().canvas.clone();

        let state_resize = Rc::clone(shared);
        let on_resize = Closure::wrap(Box::new(move |event: Event| {
            let mut st = state_resize.borrow_mut();
            if let Err(err) = update_geometry(&mut st) {
                log_error(&format!("resize: {}", js_value_to_string(&err)));
            }
            let message = match st.viewport {
                Some(vp) => format!(
                    "{} {}x{} @{:.2}",
                    event.type_(),
                    vp.width,
                    vp.height,
                    vp.dpr
                ),
                None => event.type_(),
            };
            log_event(&mut st, &message);
        }) as Box<dyn FnMut(Event)>);

        let state_click = Rc::clone(shared);
        let on_click = Closure::wrap(Box::new(move |event: MouseEvent| {
            handle_tap(&state_click, event.client_x() as f64, event.client_y() as f64);
        }) as Box<dyn FnMut(MouseEvent)>);

        let state_touch = Rc::clone(shared);
        let on_touchend = Closure::wrap(Box::new(move |event: TouchEvent| {
            // Suppress the synthesized click so one touch is one tap.
            event.prevent_default();
            if let Some(touch) = event.changed_touches().item(0) {
                handle_tap(&state_touch, touch.client_x() as f64, touch.client_y() as f64);
            }
        }) as Box<dyn FnMut(TouchEvent)>);

        let frame_cb: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
        let raf_id: Rc<Cell<Option<i32>>> = Rc::new(Cell::new(None));

        let state_frame = Rc::clone(shared);
        let frame_cb_loop = Rc::clone(&frame_cb);
        let raf_id_loop = Rc::clone(&raf_id);
        let window_loop = window.clone();
        *frame_cb.borrow_mut() = Some(Closure::wrap(Box::new(move |ts: f64| {
            raf_id_loop.set(None);

            if run_frame(&state_frame, ts) {
                if let Some(cb) = frame_cb_loop.borrow().as_ref() {
                    match window_loop.request_animation_frame(cb.as_ref().unchecked_ref()) {
                        Ok(id) => raf_id_loop.set(Some(id)),
                        Err(err) => log_error(&format!("raf: {}", js_value_to_string(&err))),
                    }
                }
            } else {
                // The view is torn down outside of this callback.
                let shared = Rc::clone(&state_frame);
                spawn_local(async move { finish_session(&shared) });
            }
        }) as Box<dyn FnMut(f64)>));

        // Built before anything is attached, so a failure below detaches
        // whatever did get attached when `view` drops.
        let view = Self {
            window,
            canvas,
            frame_cb,
            raf_id,
            on_resize,
            on_click,
            on_touchend,
        };

        let resize = view.on_resize.as_ref().unchecked_ref();
        view.window.add_event_listener_with_callback("resize", resize)?;
        view.window
            .add_event_listener_with_callback("orientationchange", resize)?;
        view.canvas.add_event_listener_with_callback(
            "click",
            view.on_click.as_ref().unchecked_ref(),
        )?;
        view.canvas.add_event_listener_with_callback(
            "touchend",
            view.on_touchend.as_ref().unchecked_ref(),
        )?;

        let first_frame = view
            .frame_cb
            .borrow()
            .as_ref()
            .map(|cb| view.window.request_animation_frame(cb.as_ref().unchecked_ref()));
        view.raf_id.set(first_frame.transpose()?);

        Ok(view)
    }
}

impl Drop for GameView {
    fn drop(&mut self) {
        if let Some(id) = self.raf_id.take() {
            let _ = self.window.cancel_animation_frame(id);
        }
        // Breaks the self-reference held by the frame closure.
        self.frame_cb.borrow_mut().take();

        let resize = self.on_resize.as_ref().unchecked_ref();
        let _ = self.window.remove_event_listener_with_callback("resize", resize);
        let _ = self
            .window
            .remove_event_listener_with_callback("orientationchange", resize);
        let _ = self.canvas.remove_event_listener_with_callback(
            "click",
            self.on_click.as_ref().unchecked_ref(),
        );
        let _ = self.canvas.remove_event_listener_with_callback(
            "touchend",
            self.on_touchend.as_ref().unchecked_ref(),
        );
    }
}

fn window() -> Window {
    web_sys::window().expect("missing window")
}

fn now_ms() -> f64 {
    window().performance().map(|p| p.now()).unwrap_or(0.0)
}

fn log_event(state: &mut AppState, event: &str) {
    state.last_event = event.to_string();
    web_sys::console::log_1(&JsValue::from_str(&format!("{} {}", LOG_PREFIX, event)));
}

fn log_error(message: &str) {
    web_sys::console::error_1(&JsValue::from_str(&format!("{} {}", LOG_PREFIX, message)));
}

fn set_status(state: &mut AppState, status: &str) {
    if let Some(el) = state.document.document_element() {
        let _ = el.set_attribute("data-render-status", status);
    }
    state.status = status.to_string();
}

fn session_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn update_geometry(state: &mut AppState) -> Result<(), JsValue> {
    let window = window();
    let css_width = window.inner_width()?.as_f64().unwrap_or(1.0);
    let css_height = window.inner_height()?.as_f64().unwrap_or(1.0);
    let viewport = viewport_for(css_width, css_height, window.device_pixel_ratio());

    let width = viewport.canvas_width_px();
    let height = viewport.canvas_height_px();
    if state.canvas.width() != width {
        state.canvas.set_width(width);
    }
    if state.canvas.height() != height {
        state.canvas.set_height(height);
    }

    let style = state.canvas.style();
    style.set_property("width", &format!("{}px", viewport.width))?;
    style.set_property("height", &format!("{}px", viewport.height))?;

    // Absolute, so repeated resizes never compound the scale.
    if let Some(ctx) = &state.ctx {
        ctx.set_transform(viewport.dpr, 0.0, 0.0, viewport.dpr, 0.0, 0.0)?;
    }

    state.viewport = Some(viewport);
    Ok(())
}

/// Runs one animation frame. Returns whether another frame should be scheduled.
fn run_frame(shared: &Shared, ts: f64) -> bool {
    let mut st = shared.borrow_mut();
    let st = &mut *st;
    let viewport = st.viewport;
    let ctx = st.ctx.clone();

    let Some(session) = st.session.as_mut() else {
        return false;
    };
    if !session.is_playing() {
        return false;
    }
    // No surface yet: skip this frame's work and try again next frame.
    let (Some(viewport), Some(ctx)) = (viewport, ctx) else {
        return true;
    };

    let report = match session.step(ts, Some(&viewport)) {
        Ok(report) => report,
        Err(err) => {
            log_error(&format!("step: {}", err));
            return true;
        }
    };
    if report.ended {
        return false;
    }

    if let Err(err) = render::render_frame(&ctx, session, &viewport, ts) {
        log_error(&format!("render: {}", js_value_to_string(&err)));
    }
    let lives = session.lives();

    st.frames += 1;
    if report.lost > 0 {
        log_event(st, &format!("lost {} (lives {})", report.lost, lives));
    }
    if st.diagnostics_open && st.frames % DIAGNOSTICS_EVERY_FRAMES == 0 {
        let _ = update_diagnostics(st);
    }
    true
}

fn handle_tap(shared: &Shared, client_x: f64, client_y: f64) {
    let ended = {
        let mut st = shared.borrow_mut();
        let Some(viewport) = st.viewport else {
            return;
        };
        let bounds = st.canvas.get_bounding_client_rect();
        let rect = ClientRect {
            left: bounds.left(),
            top: bounds.top(),
            width: bounds.width(),
            height: bounds.height(),
        };
        let canvas_px = (st.canvas.width(), st.canvas.height());
        let Some((x, y)) = client_to_canvas(client_x, client_y, rect, canvas_px, viewport.dpr)
        else {
            return;
        };
        let Some(session) = st.session.as_mut() else {
            return;
        };

        let outcome = session.tap(x, y);
        let score = session.score();
        let level = session.level();
        match outcome {
            TapOutcome::Popped { count } => {
                log_event(
                    &mut st,
                    &format!("pop x{} (score {}, level {})", count, score, level),
                );
            }
            TapOutcome::HitRed => log_event(&mut st, "hit_red"),
            TapOutcome::Miss | TapOutcome::Ignored => {}
        }
        outcome == TapOutcome::HitRed
    };

    if ended {
        let shared = Rc::clone(shared);
        spawn_local(async move { finish_session(&shared) });
    }
}

fn begin_session(shared: &Shared) -> Result<(), JsValue> {
    {
        let mut st = shared.borrow_mut();
        update_geometry(&mut st)?;
        let session = Session::new(st.config.clone(), now_ms(), session_rng(st.seed));
        st.session = Some(session);
        st.score_reported = false;
        st.frames = 0;
        set_overlay_visible(&st.menu.root, false);
        set_overlay_visible(&st.end.root, false);
        st.end.reset_share();
        set_status(&mut st, "playing");
        log_event(&mut st, "session_start");
    }

    let view = GameView::mount(shared)?;
    shared.borrow_mut().view = Some(view);
    Ok(())
}

/// Reports the final score once per session and swaps to the end screen.
fn finish_session(shared: &Shared) {
    let view = {
        let mut st = shared.borrow_mut();
        if st.score_reported {
            return;
        }
        let Some(score) = st
            .session
            .as_ref()
            .filter(|s| s.is_game_over())
            .map(|s| s.score())
        else {
            return;
        };
        st.score_reported = true;

        if !st.modes.finish(score) {
            log_error(&format!("finish rejected in mode {}", st.modes.mode().name()));
        }
        st.end.set_score(score);
        set_overlay_visible(&st.end.root, true);
        set_status(&mut st, "game_over");
        log_event(&mut st, &format!("game_over (score {})", score));
        let _ = update_diagnostics(&st);
        st.view.take()
    };
    drop(view);
}

fn start_game(shared: &Shared) {
    {
        let mut st = shared.borrow_mut();
        if !st.modes.start() {
            let mode = st.modes.mode().name();
            log_event(&mut st, &format!("start ignored in mode {}", mode));
            return;
        }
    }
    if let Err(err) = begin_session(shared) {
        log_error(&format!("start: {}", js_value_to_string(&err)));
    }
}

fn play_again(shared: &Shared) {
    {
        let mut st = shared.borrow_mut();
        if !st.modes.play_again() {
            let mode = st.modes.mode().name();
            log_event(&mut st, &format!("play_again ignored in mode {}", mode));
            return;
        }
    }
    if let Err(err) = begin_session(shared) {
        log_error(&format!("play_again: {}", js_value_to_string(&err)));
    }
}

fn share_score(shared: &Shared) {
    let (score, document, end_qr, end_status, end_panel) = {
        let mut st = shared.borrow_mut();
        let Some(score) = st.modes.final_score() else {
            return;
        };
        log_event(&mut st, "share");
        (
            score,
            st.document.clone(),
            st.end.share_qr.clone(),
            st.end.share_status.clone(),
            st.end.share_panel.clone(),
        )
    };

    let href = window().location().href().unwrap_or_default();
    let url = share::share_url(&href).to_string();
    let text = share::share_text(score, &url);

    match share::render_qr_data_url(&document, &url, &share::QrStyle::default()) {
        Ok(data_url) => end_qr.set_src(&data_url),
        Err(err) => log_error(&format!("share qr: {}", js_value_to_string(&err))),
    }
    end_panel.set_hidden(false);
    end_status.set_text_content(Some("Copying..."));

    let shared = Rc::clone(shared);
    spawn_local(async move {
        let message = match share::copy_to_clipboard(&window(), &text).await {
            Ok(()) => "Copied to clipboard".to_string(),
            Err(reason) => format!("Copy failed ({}). Scan the code to play.", reason),
        };
        end_status.set_text_content(Some(&message));
        log_event(&mut shared.borrow_mut(), &format!("share: {}", message));
    });
}

fn set_diagnostics_open(state: &mut AppState, open: bool) {
    state.diagnostics_open = open;

    if let Some(el) = state.document.document_element() {
        let _ = el.set_attribute("data-diag-open", if open { "1" } else { "0" });
    }
    if let Some(button) = &state.tools_button {
        let _ = button.set_attribute("aria-expanded", if open { "true" } else { "false" });
        let _ = button.set_attribute("aria-pressed", if open { "true" } else { "false" });
    }
    let _ = state
        .diagnostics
        .set_attribute("aria-hidden", if open { "false" } else { "true" });
}

fn update_diagnostics(state: &AppState) -> Result<(), JsValue> {
    let (score, level, lives, bubbles) = match &state.session {
        Some(session) => (
            session.score().to_string(),
            session.level().to_string(),
            session.lives().to_string(),
            session.live_bubbles().count().to_string(),
        ),
        None => ("-".into(), "-".into(), "-".into(), "-".into()),
    };

    let viewport_line = match state.viewport {
        Some(vp) => format!("viewport: {}x{} (dpr {:.2})", vp.width, vp.height, vp.dpr),
        None => "viewport: (pending)".to_string(),
    };
    let warnings = if state.config_warnings.is_empty() {
        "none".to_string()
    } else {
        state.config_warnings.join("; ")
    };

    let lines = [
        format!("status: {}", state.status),
        format!("event: {}", state.last_event),
        format!("mode: {}", state.modes.mode().name()),
        format!("score: {}", score),
        format!("level: {}", level),
        format!("lives: {}", lives),
        format!("bubbles: {}", bubbles),
        format!("canvas: {}x{}", state.canvas.width(), state.canvas.height()),
        viewport_line,
        format!("context_2d: {}", state.ctx.is_some()),
        format!("frames: {}", state.frames),
        format!(
            "seed: {}",
            state
                .seed
                .map(|s| s.to_string())
                .unwrap_or_else(|| "(entropy)".to_string())
        ),
        format!("config_warnings: {}", warnings),
    ];

    state.diagnostics_text.set_text_content(Some(&lines.join("\n")));
    Ok(())
}

fn bind_click<F>(target: &HtmlButtonElement, shared: &Shared, action: F) -> Result<(), JsValue>
where
    F: Fn(&Shared) + 'static,
{
    let shared = Rc::clone(shared);
    let cb = Closure::wrap(Box::new(move |_event: Event| {
        action(&shared);
    }) as Box<dyn FnMut(Event)>);
    target.add_event_listener_with_callback("click", cb.as_ref().unchecked_ref())?;
    cb.forget();
    Ok(())
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();

    if let Err(err) = start_impl() {
        let message = format!("fatal: {}", js_value_to_string(&err));

        if let Some(win) = web_sys::window() {
            if let Some(doc) = win.document() {
                if let Some(el) = doc.document_element() {
                    let _ = el.set_attribute("data-render-status", "error");
                }
                if let Some(diag) = doc.get_element_by_id("diagnostics-text") {
                    diag.set_text_content(Some(&message));
                }
                if let Some(fallback) = doc.get_element_by_id("fallback") {
                    let _ = fallback.remove_attribute("hidden");
                }
            }
        }

        web_sys::console::error_1(&err);
    }
}

fn start_impl() -> Result<(), JsValue> {
    let win = window();
    let document = win
        .document()
        .ok_or_else(|| JsValue::from_str("Missing document"))?;
    let body = document
        .body()
        .ok_or_else(|| JsValue::from_str("Missing body"))?;

    let canvas = document
        .get_element_by_id("game-canvas")
        .ok_or_else(|| JsValue::from_str("Missing canvas"))?
        .dyn_into::<HtmlCanvasElement>()?;
    let diagnostics = document
        .get_element_by_id("diagnostics")
        .ok_or_else(|| JsValue::from_str("Missing diagnostics"))?
        .dyn_into::<HtmlDivElement>()?;
    let diagnostics_text = document
        .get_element_by_id("diagnostics-text")
        .ok_or_else(|| JsValue::from_str("Missing diagnostics text"))?
        .dyn_into::<HtmlElement>()?;
    let tools_button = document
        .get_element_by_id("tools-button")
        .and_then(|el| el.dyn_into::<HtmlButtonElement>().ok());

    // A missing 2D context is not fatal: frames are skipped.
    let ctx = canvas
        .get_context("2d")?
        .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok());

    let search = win.location().search().unwrap_or_default();
    let options = RuntimeOptions::from_query(&search);
    let (config, config_warnings) = options.apply(&GameConfig::default());
    for warning in &config_warnings {
        let message = format!("{} config: {}", LOG_PREFIX, warning);
        web_sys::console::warn_1(&JsValue::from_str(&message));
    }

    let menu = MenuScreen::build(&document, &body, &config)?;
    let end = EndScreen::build(&document, &body)?;
    set_overlay_visible(&end.root, false);

    let state = Rc::new(RefCell::new(AppState {
        document: document.clone(),
        canvas,
        ctx,
        diagnostics,
        diagnostics_text,
        tools_button,
        diagnostics_open: false,
        menu,
        end,
        modes: ModeController::default(),
        config,
        config_warnings,
        seed: options.seed,
        session: None,
        viewport: None,
        view: None,
        score_reported: false,
        frames: 0,
        status: "loading".to_string(),
        last_event: "init".to_string(),
    }));

    {
        let mut st = state.borrow_mut();
        set_diagnostics_open(&mut st, options.diagnostics);
        if let Err(err) = update_geometry(&mut st) {
            log_error(&format!("geometry: {}", js_value_to_string(&err)));
        }
        set_overlay_visible(&st.menu.root, true);
        set_status(&mut st, Mode::Home.name());
        log_event(&mut st, "ready");
        let _ = update_diagnostics(&st);
    }

    {
        let st = state.borrow();
        bind_click(&st.menu.start_button, &state, start_game)?;
        bind_click(&st.end.play_again_button, &state, play_again)?;
        bind_click(&st.end.share_button, &state, share_score)?;
        if let Some(button) = &st.tools_button {
            bind_click(button, &state, |shared| {
                let mut st = shared.borrow_mut();
                let open = !st.diagnostics_open;
                set_diagnostics_open(&mut st, open);
                log_event(&mut st, "toggle_diagnostics");
                let _ = update_diagnostics(&st);
            })?;
        }
    }

    Ok(())
}
