use std::collections::BTreeMap;

use serde::Serialize;

/// Instruction for the ambient audio player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AudioDirective {
    Play { era: String, track: String },
    Pause,
    Silence,
}

impl AudioDirective {
    /// No active era, or an era without a track, means silence. Pausing only
    /// applies while some era is active.
    pub fn resolve(
        active_era: Option<&str>,
        paused: bool,
        tracks: &BTreeMap<String, String>,
    ) -> Self {
        let Some(era) = active_era else {
            return AudioDirective::Silence;
        };
        if paused {
            return AudioDirective::Pause;
        }
        match tracks.get(era) {
            Some(track) => AudioDirective::Play {
                era: era.to_string(),
                track: track.clone(),
            },
            None => AudioDirective::Silence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AudioDirective;
    use formats::EraConfig;

    #[test]
    fn resolves_per_state() {
        let music = EraConfig::default().music;
        assert_eq!(AudioDirective::resolve(None, false, &music), AudioDirective::Silence);
        assert_eq!(AudioDirective::resolve(None, true, &music), AudioDirective::Silence);
        assert_eq!(
            AudioDirective::resolve(Some("Финский период"), true, &music),
            AudioDirective::Pause
        );
        assert_eq!(
            AudioDirective::resolve(Some("Финский период"), false, &music),
            AudioDirective::Play {
                era: "Финский период".to_string(),
                track: "/music/fin.m4a".to_string(),
            }
        );
        assert_eq!(
            AudioDirective::resolve(Some("Bronze age"), false, &music),
            AudioDirective::Silence
        );
    }

    #[test]
    fn serializes_tagged() {
        let v = serde_json::to_value(AudioDirective::Pause).expect("json");
        assert_eq!(v, serde_json::json!({"action": "pause"}));
    }
}
