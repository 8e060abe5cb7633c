//! Session simulation: spawning, motion, tapping and life/level bookkeeping.
//!
//! Everything here is platform independent. The browser side owns one
//! [`Session`] and routes both frame updates and taps through it, so a bubble
//! popped by a tap is purged before the next advance and can never also be
//! counted as lost.

use crate::config::GameConfig;
use crate::geometry::Viewport;
use rand::Rng;
use rand::rngs::StdRng;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BubbleKind {
    Blue,
    Red,
}

impl BubbleKind {
    pub fn name(self) -> &'static str {
        match self {
            BubbleKind::Blue => "blue",
            BubbleKind::Red => "red",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bubble {
    pub id: u64,
    /// Left edge of the bounding square.
    pub x: f64,
    /// Top edge of the bounding square.
    pub y: f64,
    /// Diameter.
    pub size: f64,
    /// Pixels per frame.
    pub speed: f64,
    pub kind: BubbleKind,
    pub alive: bool,
}

impl Bubble {
    pub fn radius(&self) -> f64 {
        self.size / 2.0
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.radius(), self.y + self.radius())
    }

    /// Inclusive: a tap exactly on the rim counts.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let (cx, cy) = self.center();
        let dx = x - cx;
        let dy = y - cy;
        (dx * dx + dy * dy).sqrt() <= self.radius()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    MissingSurface,
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::MissingSurface => {
                write!(f, "cannot spawn a bubble without a drawing surface")
            }
        }
    }
}

impl std::error::Error for SimError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapOutcome {
    /// Session is not playing.
    Ignored,
    Miss,
    Popped { count: u32 },
    HitRed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub spawned: bool,
    pub lost: u32,
    pub red_escaped: u32,
    /// The session ended during this frame.
    pub ended: bool,
}

pub fn level_for_score(score: u32, points_per_level: u32) -> u32 {
    score / points_per_level.max(1) + 1
}

/// Chance that a freshly spawned bubble is red. From level 3 on it is re-rolled
/// for every spawn.
pub fn red_probability<R: Rng + ?Sized>(level: u32, rng: &mut R) -> f64 {
    match level {
        0 | 1 => 0.0,
        2 => 0.1,
        _ => 0.2 + rng.r#gen::<f64>() * 0.2,
    }
}

pub struct Session {
    config: GameConfig,
    rng: StdRng,
    bubbles: Vec<Bubble>,
    score: u32,
    lives: u32,
    playing: bool,
    game_over: bool,
    last_spawn_ms: f64,
    next_id: u64,
}

impl Session {
    pub fn new(config: GameConfig, now_ms: f64, rng: StdRng) -> Self {
        Self {
            lives: config.initial_lives,
            config,
            rng,
            bubbles: Vec::new(),
            score: 0,
            playing: true,
            game_over: false,
            last_spawn_ms: now_ms,
            next_id: 1,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn level(&self) -> u32 {
        level_for_score(self.score, self.config.points_per_level)
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn bubbles(&self) -> &[Bubble] {
        &self.bubbles
    }

    pub fn live_bubbles(&self) -> impl Iterator<Item = &Bubble> {
        self.bubbles.iter().filter(|b| b.alive)
    }

    pub fn spawn_bubble(&mut self, surface: Option<&Viewport>) -> Result<Bubble, SimError> {
        let surface = surface.ok_or(SimError::MissingSurface)?;
        let level = self.level();
        let range = self.config.bubble_size;

        let size = if range.max > range.min {
            self.rng.gen_range(range.min..range.max)
        } else {
            range.min
        };
        let max_x = (surface.width - size).max(0.0);
        let x = self.rng.r#gen::<f64>() * max_x;

        let red_chance = red_probability(level, &mut self.rng);
        let kind = if self.rng.r#gen::<f64>() < red_chance {
            BubbleKind::Red
        } else {
            BubbleKind::Blue
        };

        let level_speed =
            self.config.base_speed + (level - 1) as f64 * self.config.speed_increase;
        let speed = level_speed * self.rng.gen_range(0.8..=1.2);

        let bubble = Bubble {
            id: self.next_id,
            x,
            y: -size,
            size,
            speed,
            kind,
            alive: true,
        };
        self.next_id += 1;
        self.bubbles.push(bubble.clone());
        Ok(bubble)
    }

    /// Spawns one bubble once more than the spawn interval has passed since
    /// the previous spawn.
    pub fn maybe_spawn(
        &mut self,
        now_ms: f64,
        surface: Option<&Viewport>,
    ) -> Result<bool, SimError> {
        if !self.playing || now_ms - self.last_spawn_ms <= self.config.spawn_interval_ms {
            return Ok(false);
        }
        self.spawn_bubble(surface)?;
        self.last_spawn_ms = now_ms;
        Ok(true)
    }

    pub fn advance(&mut self, surface_height: f64) -> FrameReport {
        let mut report = FrameReport::default();
        if !self.playing {
            return report;
        }

        self.bubbles.retain(|b| b.alive);
        for bubble in &mut self.bubbles {
            bubble.y += bubble.speed;
            if bubble.y > surface_height {
                bubble.alive = false;
                match bubble.kind {
                    BubbleKind::Blue => report.lost += 1,
                    BubbleKind::Red => report.red_escaped += 1,
                }
            }
        }
        self.bubbles.retain(|b| b.alive);

        if report.lost > 0 {
            self.lives = self.lives.saturating_sub(report.lost);
            if self.lives == 0 {
                self.end();
                report.ended = true;
            }
        }
        report
    }

    /// Resolves a tap at logical coordinates. A live red bubble under the tap
    /// wins over any blue one it overlaps; otherwise every blue bubble under
    /// the tap pops.
    pub fn tap(&mut self, x: f64, y: f64) -> TapOutcome {
        if !self.playing {
            return TapOutcome::Ignored;
        }

        let hit_red = self
            .live_bubbles()
            .any(|b| b.kind == BubbleKind::Red && b.contains(x, y));
        if hit_red {
            self.end();
            return TapOutcome::HitRed;
        }

        let mut popped = 0;
        for bubble in self.bubbles.iter_mut().filter(|b| b.alive) {
            if bubble.contains(x, y) {
                bubble.alive = false;
                popped += 1;
            }
        }

        if popped == 0 {
            TapOutcome::Miss
        } else {
            self.score += popped;
            TapOutcome::Popped { count: popped }
        }
    }

    /// One simulation frame: maybe spawn, then advance.
    pub fn step(
        &mut self,
        now_ms: f64,
        surface: Option<&Viewport>,
    ) -> Result<FrameReport, SimError> {
        let spawned = self.maybe_spawn(now_ms, surface)?;
        let height = surface.map(|s| s.height).ok_or(SimError::MissingSurface)?;
        let mut report = self.advance(height);
        report.spawned = spawned;
        Ok(report)
    }

    fn end(&mut self) {
        self.playing = false;
        self.game_over = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::viewport_for;
    use rand::SeedableRng;

    fn session(seed: u64) -> Session {
        Session::new(GameConfig::default(), 0.0, StdRng::seed_from_u64(seed))
    }

    fn surface() -> Viewport {
        viewport_for(360.0, 640.0, 1.0)
    }

    fn place(s: &mut Session, kind: BubbleKind, x: f64, y: f64, size: f64, speed: f64) -> u64 {
        let id = s.next_id;
        s.next_id += 1;
        s.bubbles.push(Bubble {
            id,
            x,
            y,
            size,
            speed,
            kind,
            alive: true,
        });
        id
    }

    #[test]
    fn spawn_respects_size_and_position_bounds() {
        let mut s = session(7);
        let vp = surface();
        for _ in 0..500 {
            let b = s.spawn_bubble(Some(&vp)).unwrap();
            assert!((30.0..=50.0).contains(&b.size), "size {}", b.size);
            assert!(b.x >= 0.0 && b.x <= vp.width - b.size, "x {}", b.x);
            assert_eq!(b.y, -b.size);
            assert!(b.alive);
        }
    }

    #[test]
    fn spawn_without_surface_fails() {
        let mut s = session(1);
        assert_eq!(s.spawn_bubble(None), Err(SimError::MissingSurface));
        assert!(s.bubbles().is_empty());
    }

    #[test]
    fn spawn_on_narrow_canvas_pins_to_left_edge() {
        let mut s = session(3);
        let vp = viewport_for(20.0, 640.0, 1.0);
        let b = s.spawn_bubble(Some(&vp)).unwrap();
        assert_eq!(b.x, 0.0);
    }

    #[test]
    fn ids_are_unique() {
        let mut s = session(9);
        let vp = surface();
        let a = s.spawn_bubble(Some(&vp)).unwrap();
        let b = s.spawn_bubble(Some(&vp)).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn level_one_spawns_only_blue() {
        let mut s = session(11);
        let vp = surface();
        for _ in 0..300 {
            assert_eq!(s.spawn_bubble(Some(&vp)).unwrap().kind, BubbleKind::Blue);
        }
    }

    #[test]
    fn red_probability_by_level() {
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(red_probability(1, &mut rng), 0.0);
        assert_eq!(red_probability(2, &mut rng), 0.1);
        for level in 3..20 {
            let p = red_probability(level, &mut rng);
            assert!((0.2..=0.4).contains(&p), "level {} p {}", level, p);
        }
    }

    #[test]
    fn speed_scales_with_level() {
        let mut s = session(13);
        let vp = surface();
        for _ in 0..200 {
            let b = s.spawn_bubble(Some(&vp)).unwrap();
            assert!(b.speed >= 1.5 * 0.8 - 1e-9 && b.speed <= 1.5 * 1.2 + 1e-9);
        }

        s.score = 20;
        let base = 1.5 + 2.0 * 0.3;
        for _ in 0..200 {
            let b = s.spawn_bubble(Some(&vp)).unwrap();
            assert!(b.speed >= base * 0.8 - 1e-9 && b.speed <= base * 1.2 + 1e-9);
        }
    }

    #[test]
    fn spawn_timer_uses_strict_interval() {
        let mut s = session(2);
        let vp = surface();
        assert!(!s.maybe_spawn(800.0, Some(&vp)).unwrap());
        assert!(s.maybe_spawn(800.5, Some(&vp)).unwrap());
        assert!(!s.maybe_spawn(1200.0, Some(&vp)).unwrap());
        assert!(s.maybe_spawn(1601.0, Some(&vp)).unwrap());
        assert_eq!(s.bubbles().len(), 2);
    }

    #[test]
    fn blue_escape_costs_a_life() {
        let mut s = session(4);
        place(&mut s, BubbleKind::Blue, 10.0, 639.0, 40.0, 2.0);
        let report = s.advance(640.0);
        assert_eq!(report.lost, 1);
        assert_eq!(s.lives(), 2);
        assert!(s.bubbles().is_empty());
        assert!(s.is_playing());
    }

    #[test]
    fn red_escape_is_free() {
        let mut s = session(4);
        place(&mut s, BubbleKind::Red, 10.0, 639.0, 40.0, 2.0);
        let report = s.advance(640.0);
        assert_eq!(report.lost, 0);
        assert_eq!(report.red_escaped, 1);
        assert_eq!(s.lives(), 3);
        assert!(s.bubbles().is_empty());
    }

    #[test]
    fn losses_batch_within_a_frame_and_clamp() {
        let mut s = session(4);
        for i in 0..5 {
            place(&mut s, BubbleKind::Blue, i as f64 * 50.0, 700.0, 40.0, 1.0);
        }
        let report = s.advance(640.0);
        assert_eq!(report.lost, 5);
        assert_eq!(s.lives(), 0);
        assert!(report.ended);
        assert!(s.is_game_over());
        assert!(!s.is_playing());
    }

    #[test]
    fn last_life_lost_ends_session() {
        let mut s = session(4);
        s.lives = 1;
        place(&mut s, BubbleKind::Blue, 10.0, 700.0, 40.0, 1.5);
        let report = s.advance(640.0);
        assert!(report.ended);
        assert_eq!(s.lives(), 0);
        assert!(s.is_game_over());
    }

    #[test]
    fn blue_tap_scores_and_levels_up() {
        let mut s = session(4);
        s.score = 9;
        assert_eq!(s.level(), 1);
        let id = place(&mut s, BubbleKind::Blue, 100.0, 100.0, 40.0, 1.0);
        assert_eq!(s.tap(120.0, 120.0), TapOutcome::Popped { count: 1 });
        assert_eq!(s.score(), 10);
        assert_eq!(s.level(), 2);
        assert!(!s.bubbles().iter().find(|b| b.id == id).unwrap().alive);
    }

    #[test]
    fn popped_bubble_is_not_also_lost() {
        let mut s = session(4);
        place(&mut s, BubbleKind::Blue, 100.0, 630.0, 40.0, 20.0);
        assert_eq!(s.tap(120.0, 650.0), TapOutcome::Popped { count: 1 });
        let report = s.advance(640.0);
        assert_eq!(report.lost, 0);
        assert_eq!(s.lives(), 3);
        assert!(s.bubbles().is_empty());
    }

    #[test]
    fn red_tap_on_rim_ends_game_without_scoring() {
        let mut s = session(4);
        s.score = 4;
        place(&mut s, BubbleKind::Red, 100.0, 100.0, 40.0, 1.0);
        // Centre (120, 120), radius 20: tap exactly on the rim.
        assert_eq!(s.tap(140.0, 120.0), TapOutcome::HitRed);
        assert_eq!(s.score(), 4);
        assert!(s.is_game_over());
        assert!(!s.is_playing());
    }

    #[test]
    fn red_wins_over_overlapping_blue() {
        let mut s = session(4);
        place(&mut s, BubbleKind::Blue, 100.0, 100.0, 40.0, 1.0);
        place(&mut s, BubbleKind::Red, 110.0, 100.0, 40.0, 1.0);
        assert_eq!(s.tap(125.0, 120.0), TapOutcome::HitRed);
        assert_eq!(s.score(), 0);
        assert_eq!(s.live_bubbles().count(), 2);
    }

    #[test]
    fn one_tap_pops_every_blue_underneath() {
        let mut s = session(4);
        place(&mut s, BubbleKind::Blue, 100.0, 100.0, 40.0, 1.0);
        place(&mut s, BubbleKind::Blue, 105.0, 100.0, 40.0, 1.0);
        assert_eq!(s.tap(122.0, 120.0), TapOutcome::Popped { count: 2 });
        assert_eq!(s.score(), 2);
    }

    #[test]
    fn miss_changes_nothing() {
        let mut s = session(4);
        place(&mut s, BubbleKind::Blue, 100.0, 100.0, 40.0, 1.0);
        place(&mut s, BubbleKind::Red, 200.0, 200.0, 40.0, 1.0);
        assert_eq!(s.tap(5.0, 5.0), TapOutcome::Miss);
        assert_eq!(s.score(), 0);
        assert_eq!(s.lives(), 3);
        assert!(s.live_bubbles().count() == 2);
        assert!(s.is_playing());
    }

    #[test]
    fn no_mutation_after_game_over() {
        let mut s = session(4);
        place(&mut s, BubbleKind::Red, 100.0, 100.0, 40.0, 1.0);
        place(&mut s, BubbleKind::Blue, 300.0, 700.0, 40.0, 1.0);
        assert_eq!(s.tap(120.0, 120.0), TapOutcome::HitRed);

        assert_eq!(s.tap(120.0, 120.0), TapOutcome::Ignored);
        let report = s.advance(640.0);
        assert_eq!(report, FrameReport::default());
        assert_eq!(s.lives(), 3);
        assert_eq!(s.score(), 0);
        assert!(!s.maybe_spawn(10_000.0, Some(&surface())).unwrap());
    }

    #[test]
    fn step_spawns_then_advances() {
        let mut s = session(21);
        let vp = surface();
        let report = s.step(900.0, Some(&vp)).unwrap();
        assert!(report.spawned);
        let b = &s.bubbles()[0];
        assert!((b.y - (-b.size + b.speed)).abs() < 1e-9);
    }

    #[test]
    fn level_formula() {
        assert_eq!(level_for_score(0, 10), 1);
        assert_eq!(level_for_score(9, 10), 1);
        assert_eq!(level_for_score(10, 10), 2);
        assert_eq!(level_for_score(35, 10), 4);
    }

    #[test]
    fn long_run_invariants_hold() {
        let mut s = session(99);
        let vp = surface();
        let mut last_score = 0;
        let mut now = 0.0;
        while s.is_playing() && now < 600_000.0 {
            now += 16.0;
            let before = s.lives();
            let report = s.step(now, Some(&vp)).unwrap();
            assert_eq!(s.lives(), before.saturating_sub(report.lost));

            // Pop slower than bubbles spawn so lives eventually run out.
            if (now as u64) % 1280 == 0 {
                if let Some((cx, cy)) = s
                    .live_bubbles()
                    .filter(|b| b.kind == BubbleKind::Blue)
                    .max_by(|a, b| a.y.total_cmp(&b.y))
                    .map(|b| b.center())
                {
                    s.tap(cx, cy);
                }
            }

            assert!(s.score() >= last_score);
            last_score = s.score();
            assert_eq!(s.level(), s.score() / 10 + 1);
        }
        assert!(s.is_game_over());
    }
}
