use serde::Serialize;
use std::fmt;

use crate::audio::features::AnalysisResult;

const GENRE_THRESHOLD: f64 = 0.6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Genre {
    Amapiano,
    Afrobeat,
    #[serde(rename = "Afrobeat/Amapiano fusion")]
    Fusion,
}

impl Genre {
    /// First match wins: log drum intensity, then afro rhythm.
    pub fn classify(afro_rhythm: f64, log_drum_intensity: f64) -> Self {
        if log_drum_intensity > GENRE_THRESHOLD {
            Genre::Amapiano
        } else if afro_rhythm > GENRE_THRESHOLD {
            Genre::Afrobeat
        } else {
            Genre::Fusion
        }
    }

    pub fn of(result: &AnalysisResult) -> Self {
        Self::classify(result.afro_rhythm(), result.log_drum_intensity())
    }

    pub fn label(self) -> &'static str {
        match self {
            Genre::Amapiano => "Amapiano",
            Genre::Afrobeat => "Afrobeat",
            Genre::Fusion => "Afrobeat/Amapiano fusion",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PromptPair {
    pub suno_prompt: String,
    pub riffusion_prompt: String,
}

pub fn compose(result: &AnalysisResult) -> PromptPair {
    let genre = Genre::of(result);

    let suno_prompt = format!(
        "{}, {:.0} BPM, bouncy West African rhythm signature {:.2}, \
         signature Amapiano log drum bass intensity {:.2}, \
         traditional percussion layering {:.2}, vocal lift elements {:.2}, \
         high danceability factor {:.2}, polyrhythmic complexity, \
         authentic African drum patterns, rolling piano melodies, \
         jazz-influenced chord progressions, South African township vibes",
        genre,
        result.tempo(),
        result.afro_rhythm(),
        result.log_drum_intensity(),
        result.percussion_richness(),
        result.vocal_lift(),
        result.danceability(),
    );

    let riffusion_prompt = format!(
        "{}, {:.0} bpm, log drum bass, west african percussion, polyrhythmic drums, \
         bouncy rhythm, traditional african instruments, piano rolls, vocal chops, \
         jazz chords, township house, authentic african music, dance groove",
        genre.label().to_lowercase(),
        result.tempo(),
    );

    PromptPair {
        suno_prompt,
        riffusion_prompt,
    }
}
