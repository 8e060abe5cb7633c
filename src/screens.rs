//! Mode controller plus the menu and end overlays.
//!
//! The overlays are plain DOM built once at startup and shown/hidden by mode.
//! Each action button calls back exactly once per click; the controller decides
//! whether the request is a legal transition.

use crate::config::GameConfig;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    Document, Element, HtmlButtonElement, HtmlDivElement, HtmlElement, HtmlImageElement,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Home,
    Playing,
    GameOver { score: u32 },
}

impl Mode {
    pub fn name(self) -> &'static str {
        match self {
            Mode::Home => "home",
            Mode::Playing => "playing",
            Mode::GameOver { .. } => "game_over",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeController {
    mode: Mode,
}

impl Default for ModeController {
    fn default() -> Self {
        Self { mode: Mode::Home }
    }
}

impl ModeController {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn final_score(&self) -> Option<u32> {
        match self.mode {
            Mode::GameOver { score } => Some(score),
            _ => None,
        }
    }

    /// Home -> Playing.
    pub fn start(&mut self) -> bool {
        self.transition(Mode::Home, Mode::Playing)
    }

    /// Playing -> GameOver, carrying the final score.
    pub fn finish(&mut self, score: u32) -> bool {
        self.transition(Mode::Playing, Mode::GameOver { score })
    }

    /// GameOver -> Playing.
    pub fn play_again(&mut self) -> bool {
        if matches!(self.mode, Mode::GameOver { .. }) {
            self.mode = Mode::Playing;
            true
        } else {
            false
        }
    }

    fn transition(&mut self, from: Mode, to: Mode) -> bool {
        if self.mode == from {
            self.mode = to;
            true
        } else {
            false
        }
    }
}

/// Menu rules, with the numbers taken from the running config.
pub fn how_to_play(config: &GameConfig) -> [(&'static str, String); 5] {
    let lives = if config.initial_lives == 1 { "life" } else { "lives" };
    [
        (
            "blue",
            "Tap or click blue bubbles to pop them and score points".to_string(),
        ),
        ("red", "Avoid red bubbles - they end the game!".to_string()),
        (
            "yellow",
            "Don't let blue bubbles fall off screen - you'll lose a life".to_string(),
        ),
        ("green", format!("Start with {} {}", config.initial_lives, lives)),
        (
            "purple",
            format!("Level up every {} points", config.points_per_level),
        ),
    ]
}

const LEVEL_PROGRESSION: [&str; 3] = [
    "Level 1: Easy mode - only blue bubbles",
    "Level 2: 10% red bubbles, faster speed",
    "Level 3+: More red bubbles, even faster!",
];

pub struct MenuScreen {
    pub root: HtmlDivElement,
    pub start_button: HtmlButtonElement,
}

pub struct EndScreen {
    pub root: HtmlDivElement,
    pub score_text: HtmlElement,
    pub play_again_button: HtmlButtonElement,
    pub share_button: HtmlButtonElement,
    pub share_panel: HtmlDivElement,
    pub share_qr: HtmlImageElement,
    pub share_status: HtmlElement,
}

fn element<T: JsCast>(document: &Document, tag: &str, class: &str) -> Result<T, JsValue> {
    let el = document.create_element(tag)?;
    if !class.is_empty() {
        el.set_class_name(class);
    }
    el.dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("<{}> has unexpected type", tag)))
}

fn text_element(
    document: &Document,
    tag: &str,
    class: &str,
    text: &str,
) -> Result<Element, JsValue> {
    let el: Element = element(document, tag, class)?;
    el.set_text_content(Some(text));
    Ok(el)
}

fn bullet_list<'a>(
    document: &Document,
    items: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Result<Element, JsValue> {
    let list: Element = element(document, "ul", "bullets")?;
    for (dot, text) in items {
        let li: Element = element(document, "li", "")?;
        let marker: Element = element(document, "span", &format!("dot dot-{}", dot))?;
        li.append_child(&marker)?;
        li.append_child(&text_element(document, "span", "", text)?.into())?;
        list.append_child(&li)?;
    }
    Ok(list)
}

fn section(document: &Document, title: &str, list: &Element) -> Result<Element, JsValue> {
    let section: Element = element(document, "section", "panel-section")?;
    section.append_child(&text_element(document, "h2", "", title)?.into())?;
    section.append_child(list)?;
    Ok(section)
}

impl MenuScreen {
    pub fn build(
        document: &Document,
        parent: &Element,
        config: &GameConfig,
    ) -> Result<Self, JsValue> {
        let root: HtmlDivElement = element(document, "div", "overlay menu")?;
        root.set_id("menu-screen");
        let card: Element = element(document, "div", "card")?;

        card.append_child(&text_element(document, "h1", "", "Red Bubble")?.into())?;
        card.append_child(&text_element(
            document,
            "p",
            "tagline",
            "Test your reflexes and quick thinking!",
        )?.into())?;

        let rules = how_to_play(config);
        let how = bullet_list(
            document,
            rules.iter().map(|(dot, text)| (*dot, text.as_str())),
        )?;
        card.append_child(&section(document, "How to Play", &how)?.into())?;
        let levels = bullet_list(document, LEVEL_PROGRESSION.iter().map(|t| ("blue", *t)))?;
        card.append_child(&section(document, "Level Progression", &levels)?.into())?;

        let start_button: HtmlButtonElement = element(document, "button", "primary")?;
        start_button.set_id("start-button");
        start_button.set_text_content(Some("Start Game"));
        start_button.set_attribute("aria-label", "Start Game")?;
        card.append_child(&start_button)?;

        root.append_child(&card)?;
        parent.append_child(&root)?;
        Ok(Self { root, start_button })
    }
}

impl EndScreen {
    pub fn build(document: &Document, parent: &Element) -> Result<Self, JsValue> {
        let root: HtmlDivElement = element(document, "div", "overlay end")?;
        root.set_id("end-screen");
        let card: Element = element(document, "div", "card")?;

        card.append_child(&text_element(document, "h2", "", "Game Over!")?.into())?;
        let score_text: HtmlElement = element(document, "p", "final-score")?;
        card.append_child(&score_text)?;

        let play_again_button: HtmlButtonElement = element(document, "button", "primary")?;
        play_again_button.set_id("play-again-button");
        play_again_button.set_text_content(Some("Play Again"));
        play_again_button.set_attribute("aria-label", "Play Again")?;
        card.append_child(&play_again_button)?;

        let share_button: HtmlButtonElement = element(document, "button", "secondary")?;
        share_button.set_id("share-button");
        share_button.set_text_content(Some("Share Score"));
        share_button.set_attribute("aria-label", "Share Score")?;
        card.append_child(&share_button)?;

        let share_panel: HtmlDivElement = element(document, "div", "share")?;
        share_panel.set_hidden(true);
        let share_qr: HtmlImageElement = element(document, "img", "share-qr")?;
        share_qr.set_alt("QR code for this game");
        share_panel.append_child(&share_qr)?;
        let share_status: HtmlElement = element(document, "p", "share-status")?;
        share_panel.append_child(&share_status)?;
        card.append_child(&share_panel)?;

        root.append_child(&card)?;
        parent.append_child(&root)?;
        Ok(Self {
            root,
            score_text,
            play_again_button,
            share_button,
            share_panel,
            share_qr,
            share_status,
        })
    }

    pub fn set_score(&self, score: u32) {
        self.score_text
            .set_text_content(Some(&format!("Your Score: {}", score)));
    }

    pub fn reset_share(&self) {
        self.share_panel.set_hidden(true);
        self.share_status.set_text_content(None);
    }
}

/// Shows or hides an overlay. Showing flags `data-enter` so the stylesheet
/// plays the entrance animation from the first painted frame.
pub fn set_overlay_visible(root: &HtmlDivElement, visible: bool) {
    root.set_hidden(!visible);
    let _ = root.set_attribute("data-enter", if visible { "1" } else { "0" });
}
