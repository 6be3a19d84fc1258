//! Character tuning records and the roster asset format.
#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};

const DEFAULT_BLEND_MS: u32 = 400;
const DEFAULT_JUMP_DELAY_MS: u32 = 100;
const DEFAULT_GRAVITY: [f32; 3] = [0.0, -18.0, 0.0];

#[derive(Debug)]
pub enum ProfileError {
    NotFound(String),
    Invalid(String),
    Parse(String),
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileError::NotFound(name) => write!(f, "character not found: {}", name),
            ProfileError::Invalid(message) => write!(f, "invalid profile: {}", message),
            ProfileError::Parse(message) => write!(f, "profile parse error: {}", message),
        }
    }
}

impl std::error::Error for ProfileError {}

/// Requested animation track names. Resolution against the loaded set is
/// fuzzy (see `character_animation`), so these are requests, not handles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackNames {
    pub idle: String,
    pub walk: String,
    pub jump: String,
}

impl Default for TrackNames {
    fn default() -> Self {
        Self {
            idle: "idle".to_string(),
            walk: "walk".to_string(),
            jump: "jump".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CharacterProfile {
    pub name: String,
    /// Mass in relative units; 1.0 is the baseline character. Feeds every
    /// mass-scaled speed/friction/damping formula.
    pub mass: f32,
    pub capsule_height: f32,
    pub capsule_radius: f32,
    pub ground_speed: f32,
    pub air_speed: f32,
    pub boost_multiplier: f32,
    pub jump_height: f32,
    /// Yaw change per tick of full turn input, radians.
    pub rotation_speed: f32,
    /// Fraction of the remaining yaw error closed per tick.
    pub rotation_smoothing: f32,
    /// Crossfade duration in milliseconds. 0 switches tracks atomically.
    #[serde(default = "default_blend_ms")]
    pub animation_blend_ms: u32,
    /// Jump-track suppression window after leaving the ground, milliseconds.
    #[serde(default = "default_jump_delay_ms")]
    pub jump_delay_ms: u32,
    #[serde(default = "default_mesh_scale")]
    pub mesh_scale: f32,
    /// Character-specific gravity, distinct from any scene gravity.
    #[serde(default = "default_gravity")]
    pub gravity: [f32; 3],
    #[serde(default)]
    pub tracks: TrackNames,
}

fn default_blend_ms() -> u32 {
    DEFAULT_BLEND_MS
}

fn default_jump_delay_ms() -> u32 {
    DEFAULT_JUMP_DELAY_MS
}

fn default_mesh_scale() -> f32 {
    1.0
}

fn default_gravity() -> [f32; 3] {
    DEFAULT_GRAVITY
}

impl CharacterProfile {
    pub fn gravity_magnitude(&self) -> f32 {
        let [x, y, z] = self.gravity;
        (x * x + y * y + z * z).sqrt()
    }

    pub fn blend_duration_secs(&self) -> f64 {
        f64::from(self.animation_blend_ms) / 1000.0
    }

    pub fn jump_delay_secs(&self) -> f64 {
        f64::from(self.jump_delay_ms) / 1000.0
    }
}

#[derive(Clone, Debug, Default)]
pub struct ProfileValidation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ProfileValidation {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// The roster of selectable characters, supplied by the asset layer as TOML.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileSet {
    pub characters: Vec<CharacterProfile>,
}

impl ProfileSet {
    pub fn parse_toml(text: &str) -> Result<Self, ProfileError> {
        toml::from_str(text).map_err(|err| ProfileError::Parse(err.to_string()))
    }

    pub fn to_toml(&self) -> Result<String, ProfileError> {
        toml::to_string(self).map_err(|err| ProfileError::Parse(err.to_string()))
    }

    pub fn find(&self, name: &str) -> Result<&CharacterProfile, ProfileError> {
        self.characters
            .iter()
            .find(|profile| profile.name == name)
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))
    }

    pub fn validate(&self) -> ProfileValidation {
        let mut validation = ProfileValidation::default();

        if self.characters.is_empty() {
            validation
                .warnings
                .push("profile set contains no characters".to_string());
        }

        for profile in &self.characters {
            let name = profile.name.trim();
            if name.is_empty() {
                validation
                    .errors
                    .push("character name must not be empty".to_string());
            }
            if !profile.mass.is_finite() || profile.mass <= 0.0 {
                validation
                    .errors
                    .push(format!("'{}': mass must be finite and > 0", profile.name));
            }
            if profile.capsule_height <= 0.0 || profile.capsule_radius <= 0.0 {
                validation.errors.push(format!(
                    "'{}': capsule dimensions must be > 0",
                    profile.name
                ));
            }
            if profile.ground_speed < 0.0 || profile.air_speed < 0.0 {
                validation
                    .errors
                    .push(format!("'{}': speeds must be >= 0", profile.name));
            }
            if profile.boost_multiplier < 1.0 {
                validation.warnings.push(format!(
                    "'{}': boost multiplier below 1 slows the character while boosting",
                    profile.name
                ));
            }
            if profile.jump_height < 0.0 {
                validation
                    .errors
                    .push(format!("'{}': jump height must be >= 0", profile.name));
            }
            if !(0.0..=1.0).contains(&profile.rotation_smoothing) {
                validation.errors.push(format!(
                    "'{}': rotation smoothing must be in [0, 1]",
                    profile.name
                ));
            }
            if profile.gravity_magnitude() <= f32::EPSILON {
                validation
                    .errors
                    .push(format!("'{}': gravity must be non-zero", profile.name));
            }
        }

        let mut names: Vec<&str> = self
            .characters
            .iter()
            .map(|profile| profile.name.as_str())
            .collect();
        names.sort_unstable();
        names.dedup();
        if names.len() != self.characters.len() {
            validation
                .errors
                .push("character names must be unique".to_string());
        }

        validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_profile(name: &str) -> CharacterProfile {
        CharacterProfile {
            name: name.to_string(),
            mass: 1.0,
            capsule_height: 1.8,
            capsule_radius: 0.6,
            ground_speed: 25.0,
            air_speed: 25.0,
            boost_multiplier: 8.0,
            jump_height: 2.0,
            rotation_speed: 0.05,
            rotation_smoothing: 0.2,
            animation_blend_ms: DEFAULT_BLEND_MS,
            jump_delay_ms: DEFAULT_JUMP_DELAY_MS,
            mesh_scale: 0.7,
            gravity: DEFAULT_GRAVITY,
            tracks: TrackNames::default(),
        }
    }

    #[test]
    fn find_returns_not_found_for_unknown_name() {
        let set = ProfileSet {
            characters: vec![sample_profile("red")],
        };
        assert!(set.find("red").is_ok());
        match set.find("blue") {
            Err(ProfileError::NotFound(name)) => assert_eq!(name, "blue"),
            other => panic!("expected NotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn parse_applies_defaults_for_optional_fields() {
        let text = r#"
            [[characters]]
            name = "scout"
            mass = 0.8
            capsule_height = 1.6
            capsule_radius = 0.5
            ground_speed = 30.0
            air_speed = 28.0
            boost_multiplier = 6.0
            jump_height = 2.5
            rotation_speed = 0.06
            rotation_smoothing = 0.25
        "#;
        let set = ProfileSet::parse_toml(text).expect("parse");
        let scout = set.find("scout").expect("scout");
        assert_eq!(scout.animation_blend_ms, DEFAULT_BLEND_MS);
        assert_eq!(scout.jump_delay_ms, DEFAULT_JUMP_DELAY_MS);
        assert_eq!(scout.gravity, DEFAULT_GRAVITY);
        assert_eq!(scout.tracks.walk, "walk");
        assert!(set.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_mass_and_duplicate_names() {
        let mut heavy = sample_profile("dup");
        heavy.mass = 0.0;
        let set = ProfileSet {
            characters: vec![heavy, sample_profile("dup")],
        };
        let validation = set.validate();
        assert!(!validation.is_ok());
        assert!(validation.errors.iter().any(|e| e.contains("mass")));
        assert!(validation.errors.iter().any(|e| e.contains("unique")));
    }

    #[test]
    fn toml_round_trip_preserves_tuning() {
        let set = ProfileSet {
            characters: vec![sample_profile("red")],
        };
        let text = set.to_toml().expect("serialize");
        let parsed = ProfileSet::parse_toml(&text).expect("parse");
        assert_eq!(parsed, set);
    }
}
