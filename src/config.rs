//! Game tuning and runtime options.
//!
//! `GameConfig` holds the constants the simulation runs on. `RuntimeOptions` is
//! parsed from the page query string so a session can be reproduced (`seed=`) or
//! tuned while testing on a device (`lives=`, `spawn=`, `diag=1`).

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub initial_lives: u32,
    pub spawn_interval_ms: f64,
    /// Pixels per frame at level 1.
    pub base_speed: f64,
    /// Added to the base speed for every level above 1.
    pub speed_increase: f64,
    pub bubble_size: SizeRange,
    pub points_per_level: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            initial_lives: 3,
            spawn_interval_ms: 800.0,
            base_speed: 1.5,
            speed_increase: 0.3,
            bubble_size: SizeRange {
                min: 30.0,
                max: 50.0,
            },
            points_per_level: 10,
        }
    }
}

impl GameConfig {
    /// Non-fatal problems with this config. `sanitized` repairs each of them.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.initial_lives == 0 {
            warnings.push("initial_lives is 0; using 1".to_string());
        }
        if !(self.spawn_interval_ms > 0.0) {
            warnings.push(format!(
                "spawn_interval_ms {} is not positive; using default",
                self.spawn_interval_ms
            ));
        }
        if !(self.base_speed > 0.0) {
            warnings.push(format!(
                "base_speed {} is not positive; using default",
                self.base_speed
            ));
        }
        if self.speed_increase < 0.0 {
            warnings.push(format!(
                "speed_increase {} is negative; using 0",
                self.speed_increase
            ));
        }
        if !(self.bubble_size.min > 0.0) || self.bubble_size.min > self.bubble_size.max {
            warnings.push(format!(
                "bubble_size {}..{} is invalid; using default",
                self.bubble_size.min, self.bubble_size.max
            ));
        }
        if self.points_per_level == 0 {
            warnings.push("points_per_level is 0; using default".to_string());
        }
        warnings
    }

    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        let size_ok = self.bubble_size.min > 0.0 && self.bubble_size.min <= self.bubble_size.max;
        Self {
            initial_lives: self.initial_lives.max(1),
            spawn_interval_ms: if self.spawn_interval_ms > 0.0 {
                self.spawn_interval_ms
            } else {
                defaults.spawn_interval_ms
            },
            base_speed: if self.base_speed > 0.0 {
                self.base_speed
            } else {
                defaults.base_speed
            },
            speed_increase: self.speed_increase.max(0.0),
            bubble_size: if size_ok {
                self.bubble_size
            } else {
                defaults.bubble_size
            },
            points_per_level: if self.points_per_level > 0 {
                self.points_per_level
            } else {
                defaults.points_per_level
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeOptions {
    pub seed: Option<u64>,
    pub lives: Option<u32>,
    pub spawn_interval_ms: Option<f64>,
    pub diagnostics: bool,
    pub warnings: Vec<String>,
}

impl RuntimeOptions {
    /// Parses `location.search` (with or without the leading `?`).
    pub fn from_query(search: &str) -> Self {
        let mut options = Self::default();
        let search = search.strip_prefix('?').unwrap_or(search);

        for pair in search.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match key {
                "seed" => match value.parse::<u64>() {
                    Ok(seed) => options.seed = Some(seed),
                    Err(_) => options.warnings.push(format!("bad seed: {:?}", value)),
                },
                "lives" => match value.parse::<u32>() {
                    Ok(lives) => options.lives = Some(lives),
                    Err(_) => options.warnings.push(format!("bad lives: {:?}", value)),
                },
                "spawn" => match value.parse::<f64>() {
                    Ok(ms) if ms.is_finite() => options.spawn_interval_ms = Some(ms),
                    _ => options.warnings.push(format!("bad spawn: {:?}", value)),
                },
                "diag" => options.diagnostics = value == "1" || value == "true",
                _ => options.warnings.push(format!("unknown option: {}", key)),
            }
        }

        options
    }

    /// Applies overrides on top of `base`, then repairs anything invalid.
    /// Returns the config together with every warning raised on the way.
    pub fn apply(&self, base: &GameConfig) -> (GameConfig, Vec<String>) {
        let mut config = base.clone();
        if let Some(lives) = self.lives {
            config.initial_lives = lives;
        }
        if let Some(ms) = self.spawn_interval_ms {
            config.spawn_interval_ms = ms;
        }

        let mut warnings = self.warnings.clone();
        warnings.extend(config.validate());
        (config.sanitized(), warnings)
    }
}
