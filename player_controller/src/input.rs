//! Input intent resolution strategies.
//!
//! Exactly one resolver produces the frame's `InputIntent`. The strategy is
//! chosen once at startup from the detected device class instead of merging
//! keyboard and touch ad hoc per frame.

use character_motor::InputIntent;
use rapier3d::prelude::Real;

/// One input source's raw per-frame sample (keyboard or touch).
#[derive(Clone, Copy, Debug, Default)]
pub struct RawInput {
    pub move_axis: [Real; 2],
    pub turn_axis: Real,
    pub jump: bool,
    pub boost: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceClass {
    Desktop,
    Touch,
    /// Touch screen with an attached keyboard; both sources stay live.
    HybridTouchKeyboard,
}

pub trait IntentResolver {
    fn resolve(&mut self, primary: RawInput, secondary: Option<RawInput>) -> InputIntent;
}

/// Single authoritative source; a secondary record is ignored outright.
#[derive(Default)]
pub struct OverrideResolver;

impl IntentResolver for OverrideResolver {
    fn resolve(&mut self, primary: RawInput, _secondary: Option<RawInput>) -> InputIntent {
        InputIntent {
            move_axis: primary.move_axis,
            turn_axis: primary.turn_axis,
            want_jump: primary.jump,
            want_boost: primary.boost,
        }
    }
}

/// Hybrid devices: primary axes win past the deadzone, the secondary fills
/// in otherwise; jump/boost fire if either source holds them.
pub struct MergeResolver {
    pub deadzone: Real,
}

impl Default for MergeResolver {
    fn default() -> Self {
        Self { deadzone: 0.1 }
    }
}

impl IntentResolver for MergeResolver {
    fn resolve(&mut self, primary: RawInput, secondary: Option<RawInput>) -> InputIntent {
        let secondary = secondary.unwrap_or_default();
        let primary_mag = axis_magnitude(primary.move_axis);
        let move_axis = if primary_mag > self.deadzone {
            primary.move_axis
        } else {
            secondary.move_axis
        };
        let turn_axis = if primary.turn_axis.abs() > self.deadzone {
            primary.turn_axis
        } else {
            secondary.turn_axis
        };
        InputIntent {
            move_axis,
            turn_axis,
            want_jump: primary.jump || secondary.jump,
            want_boost: primary.boost || secondary.boost,
        }
    }
}

/// Picks the resolver once, at startup, from the detected device class.
pub fn resolver_for(device: DeviceClass) -> Box<dyn IntentResolver> {
    match device {
        DeviceClass::Desktop | DeviceClass::Touch => Box::new(OverrideResolver),
        DeviceClass::HybridTouchKeyboard => Box::new(MergeResolver::default()),
    }
}

fn axis_magnitude(axis: [Real; 2]) -> Real {
    (axis[0] * axis[0] + axis[1] * axis[1]).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_resolver_ignores_the_secondary_source() {
        let mut resolver = OverrideResolver;
        let secondary = RawInput {
            move_axis: [1.0, 0.0],
            jump: true,
            ..Default::default()
        };
        let intent = resolver.resolve(RawInput::default(), Some(secondary));
        assert_eq!(intent.move_axis, [0.0, 0.0]);
        assert!(!intent.want_jump);
    }

    #[test]
    fn merge_resolver_prefers_an_active_primary_axis() {
        let mut resolver = MergeResolver::default();
        let primary = RawInput {
            move_axis: [0.0, 1.0],
            ..Default::default()
        };
        let secondary = RawInput {
            move_axis: [1.0, 0.0],
            ..Default::default()
        };
        let intent = resolver.resolve(primary, Some(secondary));
        assert_eq!(intent.move_axis, [0.0, 1.0]);
    }

    #[test]
    fn merge_resolver_falls_back_to_the_secondary_axis() {
        let mut resolver = MergeResolver::default();
        let primary = RawInput {
            move_axis: [0.05, 0.0],
            ..Default::default()
        };
        let secondary = RawInput {
            move_axis: [0.0, 0.8],
            turn_axis: 0.5,
            ..Default::default()
        };
        let intent = resolver.resolve(primary, Some(secondary));
        assert_eq!(intent.move_axis, [0.0, 0.8]);
        assert_eq!(intent.turn_axis, 0.5);
    }

    #[test]
    fn merge_resolver_ors_the_action_flags() {
        let mut resolver = MergeResolver::default();
        let secondary = RawInput {
            jump: true,
            boost: true,
            ..Default::default()
        };
        let intent = resolver.resolve(RawInput::default(), Some(secondary));
        assert!(intent.want_jump);
        assert!(intent.want_boost);
    }

    #[test]
    fn resolver_choice_follows_the_device_class() {
        let mut hybrid = resolver_for(DeviceClass::HybridTouchKeyboard);
        let secondary = RawInput {
            jump: true,
            ..Default::default()
        };
        assert!(hybrid.resolve(RawInput::default(), Some(secondary)).want_jump);

        let mut desktop = resolver_for(DeviceClass::Desktop);
        assert!(!desktop.resolve(RawInput::default(), Some(secondary)).want_jump);
    }
}
