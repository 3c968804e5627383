//! Flock configuration - tunable weights, radii, speeds and volumes.
//!
//! Everything here is set before the flock is spawned and is read-only
//! while the simulation runs. Configs load from JSON; any field left out
//! takes its default, and `sanitize` repairs values the steering math
//! cannot use (non-finite, negative, inverted ranges).

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::components::{BoundingBox, Vec3};
use crate::environment::LayerMask;

/// How agents observe each other within a tick.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Agents update in population order and later agents see the
    /// already-moved state of earlier ones.
    #[default]
    Sequential,
    /// Every agent reads a snapshot taken at tick start; results are
    /// committed after the whole population has been processed.
    DoubleBuffered,
}

/// Containment volume, centered on the origin horizontally.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Containment {
    /// Horizontal half extent on x and z
    pub bounds_distance: f32,
    /// Agents above this height are pushed down
    pub upper_limit: f32,
    /// Agents below this height are pushed up
    pub lower_limit: f32,
}

impl Default for Containment {
    fn default() -> Self {
        Self {
            bounds_distance: 20.0,
            upper_limit: -1.0,
            lower_limit: -18.0,
        }
    }
}

/// Preferred depth band. Heights decrease with depth; the surface is y = 0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DepthBand {
    /// Top of the band
    pub ceiling: f32,
    /// Top of the comfortable middle of the band
    pub comfort_top: f32,
    /// Bottom of the band
    pub floor: f32,
    /// Height above the ceiling where the downward bias becomes strong
    pub surface_margin: f32,
}

impl Default for DepthBand {
    fn default() -> Self {
        Self {
            ceiling: -3.0,
            comfort_top: -5.0,
            floor: -12.0,
            surface_margin: 2.0,
        }
    }
}

/// Fixed behavior constants outside the configured blend weights.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BehaviorTuning {
    pub fov_half_angle_deg: f32,
    pub threat_radius: f32,
    pub threat_weight: f32,
    /// Per-axis random jitter added to the threat escape direction
    pub threat_jitter: f32,
    pub depth_band: DepthBand,
    pub depth_weight: f32,
    /// Scale applied to the vertical component of the blended heading
    pub vertical_damping: f32,
    /// Smoothing time constant for heading changes, in seconds
    pub smooth_time: f32,
}

impl Default for BehaviorTuning {
    fn default() -> Self {
        Self {
            fov_half_angle_deg: 90.0,
            threat_radius: 5.0,
            threat_weight: 5.0,
            threat_jitter: 0.1,
            depth_band: DepthBand::default(),
            depth_weight: 2.0,
            vertical_damping: 0.3,
            smooth_time: 0.5,
        }
    }
}

impl BehaviorTuning {
    /// Cosine of the field-of-view half angle
    pub fn fov_cos(&self) -> f32 {
        self.fov_half_angle_deg.to_radians().cos()
    }
}

/// Complete flock configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FlockConfig {
    pub flock_size: u32,
    /// Seed for spawning and jitter; entropy when absent
    pub seed: Option<u64>,

    pub min_speed: f32,
    pub max_speed: f32,

    pub cohesion_distance: f32,
    pub avoidance_distance: f32,
    pub alignment_distance: f32,
    pub obstacle_distance: f32,

    pub cohesion_weight: f32,
    pub avoidance_weight: f32,
    pub alignment_weight: f32,
    pub bounds_weight: f32,
    pub obstacle_weight: f32,

    pub linear_damping: f32,
    pub obstacle_mask: LayerMask,
    pub spawn_volume: BoundingBox,
    pub containment: Containment,
    pub tuning: BehaviorTuning,
    pub update_mode: UpdateMode,
}

impl Default for FlockConfig {
    fn default() -> Self {
        Self {
            flock_size: 100,
            seed: None,
            min_speed: 1.0,
            max_speed: 3.0,
            cohesion_distance: 5.0,
            avoidance_distance: 1.5,
            alignment_distance: 3.0,
            obstacle_distance: 4.0,
            cohesion_weight: 1.0,
            avoidance_weight: 1.5,
            alignment_weight: 1.0,
            bounds_weight: 2.0,
            obstacle_weight: 10.0,
            linear_damping: 1.0,
            obstacle_mask: LayerMask::ALL,
            spawn_volume: BoundingBox::new(
                Vec3::new(-15.0, -12.0, -15.0),
                Vec3::new(15.0, -4.0, 15.0),
            ),
            containment: Containment::default(),
            tuning: BehaviorTuning::default(),
            update_mode: UpdateMode::Sequential,
        }
    }
}

impl FlockConfig {
    /// Parse, sanitize and validate a JSON config
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let mut config: FlockConfig = serde_json::from_str(json)?;
        config.sanitize();
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        log::debug!("Loaded flock config from {}", path.display());
        Self::from_json_str(&json)
    }

    /// Repair values the steering math cannot use. Returns the number of
    /// fields that were changed.
    pub fn sanitize(&mut self) -> usize {
        let defaults = FlockConfig::default();
        let mut fixes = 0;

        fixes += non_negative(&mut self.min_speed, defaults.min_speed, "min_speed");
        fixes += non_negative(&mut self.max_speed, defaults.max_speed, "max_speed");
        if self.min_speed > self.max_speed {
            log::warn!(
                "min_speed {} exceeds max_speed {}; swapping",
                self.min_speed,
                self.max_speed
            );
            std::mem::swap(&mut self.min_speed, &mut self.max_speed);
            fixes += 1;
        }

        fixes += non_negative(
            &mut self.cohesion_distance,
            defaults.cohesion_distance,
            "cohesion_distance",
        );
        fixes += non_negative(
            &mut self.avoidance_distance,
            defaults.avoidance_distance,
            "avoidance_distance",
        );
        fixes += non_negative(
            &mut self.alignment_distance,
            defaults.alignment_distance,
            "alignment_distance",
        );
        fixes += non_negative(
            &mut self.obstacle_distance,
            defaults.obstacle_distance,
            "obstacle_distance",
        );

        // A missing or broken weight removes the behavior from the blend
        fixes += non_negative(&mut self.cohesion_weight, 0.0, "cohesion_weight");
        fixes += non_negative(&mut self.avoidance_weight, 0.0, "avoidance_weight");
        fixes += non_negative(&mut self.alignment_weight, 0.0, "alignment_weight");
        fixes += non_negative(&mut self.bounds_weight, 0.0, "bounds_weight");
        fixes += non_negative(&mut self.obstacle_weight, 0.0, "obstacle_weight");

        fixes += non_negative(&mut self.linear_damping, defaults.linear_damping, "linear_damping");

        let containment = &mut self.containment;
        fixes += non_negative(
            &mut containment.bounds_distance,
            defaults.containment.bounds_distance,
            "containment.bounds_distance",
        );
        fixes += finite(
            &mut containment.upper_limit,
            defaults.containment.upper_limit,
            "containment.upper_limit",
        );
        fixes += finite(
            &mut containment.lower_limit,
            defaults.containment.lower_limit,
            "containment.lower_limit",
        );
        if containment.lower_limit > containment.upper_limit {
            log::warn!("containment limits inverted; swapping");
            std::mem::swap(&mut containment.lower_limit, &mut containment.upper_limit);
            fixes += 1;
        }

        let tuning = &mut self.tuning;
        let default_tuning = defaults.tuning;
        fixes += non_negative(
            &mut tuning.fov_half_angle_deg,
            default_tuning.fov_half_angle_deg,
            "tuning.fov_half_angle_deg",
        );
        if tuning.fov_half_angle_deg > 180.0 {
            tuning.fov_half_angle_deg = 180.0;
            fixes += 1;
        }
        fixes += non_negative(
            &mut tuning.threat_radius,
            default_tuning.threat_radius,
            "tuning.threat_radius",
        );
        fixes += non_negative(&mut tuning.threat_weight, 0.0, "tuning.threat_weight");
        fixes += non_negative(&mut tuning.threat_jitter, 0.0, "tuning.threat_jitter");
        fixes += non_negative(&mut tuning.depth_weight, 0.0, "tuning.depth_weight");
        fixes += non_negative(
            &mut tuning.vertical_damping,
            default_tuning.vertical_damping,
            "tuning.vertical_damping",
        );
        fixes += non_negative(
            &mut tuning.smooth_time,
            default_tuning.smooth_time,
            "tuning.smooth_time",
        );
        if tuning.smooth_time < MIN_SMOOTH_TIME {
            tuning.smooth_time = MIN_SMOOTH_TIME;
            fixes += 1;
        }

        let band = &mut tuning.depth_band;
        let default_band = default_tuning.depth_band;
        fixes += finite(&mut band.ceiling, default_band.ceiling, "depth_band.ceiling");
        fixes += finite(&mut band.comfort_top, default_band.comfort_top, "depth_band.comfort_top");
        fixes += finite(&mut band.floor, default_band.floor, "depth_band.floor");
        fixes += non_negative(
            &mut band.surface_margin,
            default_band.surface_margin,
            "depth_band.surface_margin",
        );
        if !(band.floor <= band.comfort_top && band.comfort_top <= band.ceiling) {
            log::warn!(
                "depth band out of order (ceiling {}, comfort_top {}, floor {}); using defaults",
                band.ceiling,
                band.comfort_top,
                band.floor
            );
            *band = default_band;
            fixes += 1;
        }

        if fixes > 0 {
            log::debug!("Sanitized {} flock config field(s)", fixes);
        }
        fixes
    }

    /// Reject configs that cannot be repaired
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.spawn_volume.min.is_finite() || !self.spawn_volume.max.is_finite() {
            return Err(ConfigError::Invalid("spawn volume is not finite".into()));
        }
        if !self.spawn_volume.is_ordered() {
            return Err(ConfigError::Invalid(format!(
                "spawn volume min {:?} exceeds max {:?}",
                self.spawn_volume.min, self.spawn_volume.max
            )));
        }
        Ok(())
    }
}

const MIN_SMOOTH_TIME: f32 = 1.0e-3;

fn finite(value: &mut f32, fallback: f32, name: &str) -> usize {
    if value.is_finite() {
        return 0;
    }
    log::warn!("{} is not finite; using {}", name, fallback);
    *value = fallback;
    1
}

fn non_negative(value: &mut f32, fallback: f32, name: &str) -> usize {
    if finite(value, fallback, name) > 0 {
        return 1;
    }
    if *value < 0.0 {
        log::warn!("{} is negative ({}); clamping to zero", name, value);
        *value = 0.0;
        return 1;
    }
    0
}

/// Errors from loading or validating a config
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Invalid(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Json(e) => write!(f, "Config parse error: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Json(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}
