//! The loaded-animation-set seam and the ordered track resolution policy.

/// Opaque handle to a track inside the loaded set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackHandle(pub u32);

/// A loaded skeletal-animation set. Implemented by the asset layer; the
/// blender only starts/stops tracks and drives their weights.
pub trait TrackDeck {
    fn find_by_name(&self, name: &str) -> Option<TrackHandle>;
    fn list_all(&self) -> Vec<(TrackHandle, String)>;
    fn start(&mut self, track: TrackHandle);
    fn stop(&mut self, track: TrackHandle);
    fn stop_all(&mut self);
    fn set_weight(&mut self, track: TrackHandle, weight: f32);
}

const KEYWORD_FALLBACKS: &[(&str, &[&str])] = &[
    ("idle", &["idle", "stand"]),
    ("walk", &["walk", "run", "move"]),
    ("jump", &["jump", "leap", "hop"]),
];

/// Resolves a requested track name against the deck: exact match first, then
/// case-insensitive substring in either direction, then the keyword fallback
/// table. Never guesses beyond that list.
pub fn resolve_track(deck: &dyn TrackDeck, requested: &str) -> Option<(TrackHandle, String)> {
    if let Some(handle) = deck.find_by_name(requested) {
        return Some((handle, requested.to_string()));
    }
    let wanted = requested.to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    let all = deck.list_all();

    for (handle, name) in &all {
        let lower = name.to_lowercase();
        if lower.contains(&wanted) || (!lower.is_empty() && wanted.contains(&lower)) {
            return Some((*handle, name.clone()));
        }
    }

    for (keyword, candidates) in KEYWORD_FALLBACKS {
        if !wanted.contains(keyword) {
            continue;
        }
        for (handle, name) in &all {
            let lower = name.to_lowercase();
            if candidates.iter().any(|candidate| lower.contains(candidate)) {
                return Some((*handle, name.clone()));
            }
        }
    }

    None
}

#[cfg(test)]
pub(crate) mod test_deck {
    use super::*;

    /// Records starts/stops/weights so tests can assert on blend traffic.
    pub struct MockDeck {
        pub names: Vec<String>,
        pub playing: Vec<bool>,
        pub weights: Vec<f32>,
        pub start_log: Vec<u32>,
    }

    impl MockDeck {
        pub fn new(names: &[&str]) -> Self {
            Self {
                names: names.iter().map(|name| name.to_string()).collect(),
                playing: vec![false; names.len()],
                weights: vec![0.0; names.len()],
                start_log: Vec::new(),
            }
        }
    }

    impl TrackDeck for MockDeck {
        fn find_by_name(&self, name: &str) -> Option<TrackHandle> {
            self.names
                .iter()
                .position(|candidate| candidate == name)
                .map(|index| TrackHandle(index as u32))
        }

        fn list_all(&self) -> Vec<(TrackHandle, String)> {
            self.names
                .iter()
                .enumerate()
                .map(|(index, name)| (TrackHandle(index as u32), name.clone()))
                .collect()
        }

        fn start(&mut self, track: TrackHandle) {
            self.playing[track.0 as usize] = true;
            self.start_log.push(track.0);
        }

        fn stop(&mut self, track: TrackHandle) {
            self.playing[track.0 as usize] = false;
        }

        fn stop_all(&mut self) {
            for playing in &mut self.playing {
                *playing = false;
            }
        }

        fn set_weight(&mut self, track: TrackHandle, weight: f32) {
            self.weights[track.0 as usize] = weight;
        }
    }
}
