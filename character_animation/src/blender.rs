//! Animation state selection and eased crossfading.

use character_motor::MotionState;
use character_profiles::{CharacterProfile, TrackNames};
use engine_core::logging;
use engine_core::timing::{ease_in_out_cubic, TimedWindow};

use crate::deck::{resolve_track, TrackDeck, TrackHandle};

const DEFAULT_BLEND_SECS: f64 = 0.4;
const DEFAULT_JUMP_DELAY_SECS: f64 = 0.1;

#[derive(Clone, Debug, PartialEq)]
struct ResolvedTrack {
    handle: TrackHandle,
    /// The actual track name in the deck.
    name: String,
    /// The name that was asked for; selection no-ops compare against this.
    requested: String,
}

/// A crossfade in flight. Holding the previous track inside this value is
/// what guarantees "blending implies both tracks exist".
#[derive(Clone, Debug)]
struct ActiveBlend {
    previous: ResolvedTrack,
    window: TimedWindow,
}

pub struct AnimationBlender {
    current: Option<ResolvedTrack>,
    blend: Option<ActiveBlend>,
    blend_duration: f64,
    jump_delay: f64,
    jump_delay_window: Option<TimedWindow>,
    last_state: Option<MotionState>,
    /// Last requested name that failed to resolve; selection retries every
    /// tick, the warning fires once per name.
    last_unresolved: Option<String>,
}

impl Default for AnimationBlender {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationBlender {
    pub fn new() -> Self {
        Self {
            current: None,
            blend: None,
            blend_duration: DEFAULT_BLEND_SECS,
            jump_delay: DEFAULT_JUMP_DELAY_SECS,
            jump_delay_window: None,
            last_state: None,
            last_unresolved: None,
        }
    }

    /// Adopts a character's blend tuning and clears all animation state.
    pub fn set_profile(&mut self, profile: &CharacterProfile) {
        self.blend_duration = profile.blend_duration_secs();
        self.jump_delay = profile.jump_delay_secs();
        self.reset();
    }

    pub fn reset(&mut self) {
        self.current = None;
        self.blend = None;
        self.jump_delay_window = None;
        self.last_state = None;
        self.last_unresolved = None;
    }

    pub fn current_track(&self) -> Option<&str> {
        self.current.as_ref().map(|track| track.name.as_str())
    }

    pub fn is_blending(&self) -> bool {
        self.blend.is_some()
    }

    pub fn is_jump_delayed(&self) -> bool {
        self.jump_delay_window.is_some()
    }

    /// Selects the target track from the visual state and starts whatever
    /// switch or crossfade it requires. `is_moving` comes from raw input
    /// magnitude, not from the resulting velocity.
    pub fn update(
        &mut self,
        deck: &mut dyn TrackDeck,
        is_moving: bool,
        state: MotionState,
        tracks: &TrackNames,
        now: f64,
    ) {
        self.update_jump_delay(state, now);

        let target = if state == MotionState::InAir && self.jump_delay_window.is_none() {
            tracks.jump.as_str()
        } else if is_moving {
            tracks.walk.as_str()
        } else {
            tracks.idle.as_str()
        };

        // Already fully on the target and not mid-blend: nothing to do.
        if self.blend.is_none() {
            if let Some(current) = &self.current {
                if current.requested == target {
                    return;
                }
            }
        }

        if self.current.is_none() {
            self.start_first_track(deck, target);
            return;
        }

        // An in-flight blend finishes before a new selection is honored.
        if self.blend.is_some() {
            return;
        }

        if self.blend_duration <= 0.0 {
            self.switch_directly(deck, target);
            return;
        }

        self.start_crossfade(deck, target, now);
    }

    /// Advances the in-flight crossfade, if any. Must be called with the
    /// same `now` as `update` within a tick.
    pub fn update_blend(&mut self, deck: &mut dyn TrackDeck, now: f64) {
        let Some(blend) = &self.blend else {
            return;
        };
        let Some(current) = &self.current else {
            return;
        };

        let progress = blend.window.progress(now);
        let new_weight = ease_in_out_cubic(progress) as f32;
        deck.set_weight(blend.previous.handle, 1.0 - new_weight);
        deck.set_weight(current.handle, new_weight);

        if progress >= 1.0 {
            deck.stop(blend.previous.handle);
            deck.set_weight(current.handle, 1.0);
            self.blend = None;
        }
    }

    fn update_jump_delay(&mut self, state: MotionState, now: f64) {
        let in_air = state == MotionState::InAir;
        let was_in_air = self.last_state == Some(MotionState::InAir);
        if in_air && !was_in_air {
            self.jump_delay_window = Some(TimedWindow::new(now, self.jump_delay));
        } else if !in_air && was_in_air {
            self.jump_delay_window = None;
        } else if let Some(window) = self.jump_delay_window {
            if window.is_complete(now) {
                self.jump_delay_window = None;
            }
        }
        self.last_state = Some(state);
    }

    /// Resolution failure is a no-op for the tick; the warning fires once
    /// per failing name, not once per tick.
    fn resolve_or_warn(
        &mut self,
        deck: &dyn TrackDeck,
        requested: &str,
    ) -> Option<(TrackHandle, String)> {
        match resolve_track(deck, requested) {
            Some(resolved) => {
                self.last_unresolved = None;
                Some(resolved)
            }
            None => {
                if self.last_unresolved.as_deref() != Some(requested) {
                    warn_unresolved(deck, requested);
                    self.last_unresolved = Some(requested.to_string());
                }
                None
            }
        }
    }

    fn start_first_track(&mut self, deck: &mut dyn TrackDeck, requested: &str) {
        let Some((handle, name)) = self.resolve_or_warn(deck, requested) else {
            return;
        };
        // Anything the asset pipeline auto-started gets silenced first.
        deck.stop_all();
        deck.start(handle);
        deck.set_weight(handle, 1.0);
        self.current = Some(ResolvedTrack {
            handle,
            name,
            requested: requested.to_string(),
        });
    }

    fn switch_directly(&mut self, deck: &mut dyn TrackDeck, requested: &str) {
        let Some((handle, name)) = self.resolve_or_warn(deck, requested) else {
            return;
        };
        if let Some(current) = &self.current {
            if current.handle == handle {
                self.current = Some(ResolvedTrack {
                    handle,
                    name,
                    requested: requested.to_string(),
                });
                return;
            }
            deck.stop(current.handle);
        }
        deck.start(handle);
        deck.set_weight(handle, 1.0);
        self.current = Some(ResolvedTrack {
            handle,
            name,
            requested: requested.to_string(),
        });
    }

    fn start_crossfade(&mut self, deck: &mut dyn TrackDeck, requested: &str, now: f64) {
        let Some((handle, name)) = self.resolve_or_warn(deck, requested) else {
            return;
        };
        let Some(current) = self.current.clone() else {
            return;
        };
        if current.handle == handle {
            // Fuzzy resolution landed on the track already playing.
            self.current = Some(ResolvedTrack {
                handle,
                name,
                requested: requested.to_string(),
            });
            return;
        }

        deck.start(current.handle);
        deck.start(handle);
        deck.set_weight(current.handle, 1.0);
        deck.set_weight(handle, 0.0);

        self.blend = Some(ActiveBlend {
            previous: current,
            window: TimedWindow::new(now, self.blend_duration),
        });
        self.current = Some(ResolvedTrack {
            handle,
            name,
            requested: requested.to_string(),
        });
    }
}

fn warn_unresolved(deck: &dyn TrackDeck, requested: &str) {
    let available: Vec<String> = deck
        .list_all()
        .into_iter()
        .map(|(_, name)| name)
        .collect();
    logging::warn(format!(
        "animation track not found: '{}' (available: {})",
        requested,
        available.join(", ")
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::test_deck::MockDeck;

    fn tracks() -> TrackNames {
        TrackNames::default()
    }

    fn blender(blend_secs: f64, delay_secs: f64) -> AnimationBlender {
        let mut blender = AnimationBlender::new();
        blender.blend_duration = blend_secs;
        blender.jump_delay = delay_secs;
        blender
    }

    #[test]
    fn first_selection_starts_at_full_weight_without_blending() {
        let mut deck = MockDeck::new(&["idle", "walk", "jump"]);
        let mut blender = blender(0.4, 0.1);

        blender.update(&mut deck, false, MotionState::OnGround, &tracks(), 0.0);
        assert_eq!(blender.current_track(), Some("idle"));
        assert!(!blender.is_blending());
        assert!(deck.playing[0]);
        assert_eq!(deck.weights[0], 1.0);
    }

    #[test]
    fn reselecting_the_current_track_is_a_no_op() {
        let mut deck = MockDeck::new(&["idle", "walk", "jump"]);
        let mut blender = blender(0.4, 0.1);

        blender.update(&mut deck, false, MotionState::OnGround, &tracks(), 0.0);
        let starts = deck.start_log.len();
        for tick in 1..10 {
            blender.update(
                &mut deck,
                false,
                MotionState::OnGround,
                &tracks(),
                tick as f64 * 0.016,
            );
        }
        assert_eq!(deck.start_log.len(), starts);
        assert!(!blender.is_blending());
    }

    #[test]
    fn crossfade_weights_are_monotonic_and_sum_to_one() {
        let mut deck = MockDeck::new(&["idle", "walk", "jump"]);
        let mut blender = blender(0.4, 0.1);

        blender.update(&mut deck, false, MotionState::OnGround, &tracks(), 0.0);
        blender.update(&mut deck, true, MotionState::OnGround, &tracks(), 1.0);
        assert!(blender.is_blending());

        let mut last_new = 0.0;
        for step in 0..=20 {
            let now = 1.0 + 0.4 * step as f64 / 20.0;
            blender.update_blend(&mut deck, now);
            let new_weight = deck.weights[1];
            let old_weight = deck.weights[0];
            if blender.is_blending() {
                assert!((new_weight + old_weight - 1.0).abs() < 1.0e-6);
            }
            assert!(new_weight + 1.0e-6 >= last_new);
            last_new = new_weight;
        }

        assert!(!blender.is_blending());
        assert_eq!(deck.weights[1], 1.0);
        assert!(!deck.playing[0]);
        assert!(deck.playing[1]);
    }

    #[test]
    fn blend_completes_exactly_at_duration() {
        let mut deck = MockDeck::new(&["idle", "walk", "jump"]);
        let mut blender = blender(0.4, 0.1);

        blender.update(&mut deck, false, MotionState::OnGround, &tracks(), 0.0);
        blender.update(&mut deck, true, MotionState::OnGround, &tracks(), 2.0);
        blender.update_blend(&mut deck, 2.39);
        assert!(blender.is_blending());
        blender.update_blend(&mut deck, 2.4);
        assert!(!blender.is_blending());
        assert_eq!(deck.weights[1], 1.0);
    }

    #[test]
    fn zero_duration_switches_atomically() {
        let mut deck = MockDeck::new(&["idle", "walk", "jump"]);
        let mut blender = blender(0.0, 0.1);

        blender.update(&mut deck, false, MotionState::OnGround, &tracks(), 0.0);
        blender.update(&mut deck, true, MotionState::OnGround, &tracks(), 0.1);
        assert!(!blender.is_blending());
        assert!(!deck.playing[0]);
        assert!(deck.playing[1]);
        assert_eq!(deck.weights[1], 1.0);
        assert_eq!(blender.current_track(), Some("walk"));
    }

    #[test]
    fn in_flight_blend_defers_new_selections() {
        let mut deck = MockDeck::new(&["idle", "walk", "jump"]);
        let mut blender = blender(0.4, 0.0);

        blender.update(&mut deck, false, MotionState::OnGround, &tracks(), 0.0);
        blender.update(&mut deck, true, MotionState::OnGround, &tracks(), 1.0);
        assert_eq!(blender.current_track(), Some("walk"));

        // Wants idle now, but the walk blend is still running.
        blender.update(&mut deck, false, MotionState::OnGround, &tracks(), 1.1);
        assert_eq!(blender.current_track(), Some("walk"));

        blender.update_blend(&mut deck, 1.4);
        blender.update(&mut deck, false, MotionState::OnGround, &tracks(), 1.45);
        assert_eq!(blender.current_track(), Some("idle"));
    }

    #[test]
    fn jump_track_waits_out_the_delay_window() {
        let mut deck = MockDeck::new(&["idle", "walk", "jump"]);
        let mut blender = blender(0.0, 0.1);

        blender.update(&mut deck, true, MotionState::OnGround, &tracks(), 0.0);
        assert_eq!(blender.current_track(), Some("walk"));

        // Entering the air starts the suppression window.
        blender.update(&mut deck, true, MotionState::InAir, &tracks(), 1.0);
        assert!(blender.is_jump_delayed());
        assert_eq!(blender.current_track(), Some("walk"));

        // Still suppressed inside the window.
        blender.update(&mut deck, true, MotionState::InAir, &tracks(), 1.05);
        assert_eq!(blender.current_track(), Some("walk"));

        // Window expired: jump plays.
        blender.update(&mut deck, true, MotionState::InAir, &tracks(), 1.2);
        assert_eq!(blender.current_track(), Some("jump"));
    }

    #[test]
    fn landing_cancels_the_jump_delay() {
        let mut deck = MockDeck::new(&["idle", "walk", "jump"]);
        let mut blender = blender(0.0, 10.0);

        blender.update(&mut deck, false, MotionState::OnGround, &tracks(), 0.0);
        blender.update(&mut deck, false, MotionState::InAir, &tracks(), 1.0);
        assert!(blender.is_jump_delayed());
        blender.update(&mut deck, false, MotionState::OnGround, &tracks(), 1.5);
        assert!(!blender.is_jump_delayed());
    }

    #[test]
    fn unresolvable_target_leaves_current_animation_playing() {
        let mut deck = MockDeck::new(&["Dance"]);
        let mut blender = blender(0.4, 0.1);

        blender.update(&mut deck, false, MotionState::OnGround, &tracks(), 0.0);
        assert_eq!(blender.current_track(), None);
        assert!(!blender.is_blending());
    }

    #[test]
    fn unresolved_warning_latches_per_name() {
        let mut deck = MockDeck::new(&["Dance"]);
        let mut blender = blender(0.4, 0.1);

        blender.update(&mut deck, false, MotionState::OnGround, &tracks(), 0.0);
        assert_eq!(blender.last_unresolved.as_deref(), Some("idle"));

        // Retrying the same failing name keeps the latch.
        blender.update(&mut deck, false, MotionState::OnGround, &tracks(), 0.1);
        assert_eq!(blender.last_unresolved.as_deref(), Some("idle"));

        // A different failing name re-arms the warning.
        blender.update(&mut deck, true, MotionState::OnGround, &tracks(), 0.2);
        assert_eq!(blender.last_unresolved.as_deref(), Some("walk"));
    }

    #[test]
    fn fuzzy_resolution_to_the_playing_track_does_not_self_blend() {
        // "idle" keyword-falls-back to this track, and "walk" substring-
        // matches the same one: both selections land on a single track.
        let mut deck = MockDeck::new(&["stand_walk_cycle"]);
        let mut blender = blender(0.4, 0.1);

        blender.update(&mut deck, false, MotionState::OnGround, &tracks(), 0.0);
        assert_eq!(blender.current_track(), Some("stand_walk_cycle"));
        let starts = deck.start_log.len();

        blender.update(&mut deck, true, MotionState::OnGround, &tracks(), 0.5);
        assert!(!blender.is_blending());
        assert_eq!(deck.start_log.len(), starts);

        // And the re-labelled selection stays a no-op afterwards.
        blender.update(&mut deck, true, MotionState::OnGround, &tracks(), 0.6);
        assert!(!blender.is_blending());
        assert_eq!(deck.start_log.len(), starts);
    }

    #[test]
    fn profile_swap_clears_blend_state() {
        let mut deck = MockDeck::new(&["idle", "walk", "jump"]);
        let mut blender = blender(0.4, 0.1);

        blender.update(&mut deck, false, MotionState::OnGround, &tracks(), 0.0);
        blender.update(&mut deck, true, MotionState::OnGround, &tracks(), 1.0);
        assert!(blender.is_blending());

        blender.reset();
        assert!(!blender.is_blending());
        assert_eq!(blender.current_track(), None);
        assert!(!blender.is_jump_delayed());
    }
}
