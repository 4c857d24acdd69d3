use serde::Serialize;

use crate::error::FeatureError;

pub const CENTROID_FALLBACK: f32 = 1500.0;
pub const ROLLOFF_FALLBACK: f32 = 3000.0;
pub const ZCR_FALLBACK: f32 = 0.1;

/// `max(0, min(1, x))`. NaN passes through `min` as 1.0.
pub fn clamp01(x: f64) -> f64 {
    0.0f64.max(x.min(1.0))
}

/// The three per-track statistics, after any fallback substitution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpectralStats {
    /// Mean spectral centroid (Hz)
    pub spectral_centroid_mean: f32,
    /// Mean 85% spectral roll-off (Hz)
    pub spectral_rolloff_mean: f32,
    /// Mean zero-crossing rate (crossings per sample)
    pub zero_crossing_rate_mean: f32,
}

impl SpectralStats {
    /// Each statistic is resolved independently: a failure in one is replaced
    /// by its fallback constant without affecting the others.
    pub fn resolve(
        centroid: Result<f32, FeatureError>,
        rolloff: Result<f32, FeatureError>,
        zcr: Result<f32, FeatureError>,
    ) -> Self {
        Self {
            spectral_centroid_mean: or_fallback("spectral centroid", centroid, CENTROID_FALLBACK),
            spectral_rolloff_mean: or_fallback("spectral rolloff", rolloff, ROLLOFF_FALLBACK),
            zero_crossing_rate_mean: or_fallback("zero-crossing rate", zcr, ZCR_FALLBACK),
        }
    }
}

fn or_fallback(name: &str, value: Result<f32, FeatureError>, fallback: f32) -> f32 {
    value.unwrap_or_else(|err| {
        log::debug!("{} unavailable ({}), using {}", name, err, fallback);
        fallback
    })
}

/// Outcome of a successful analysis. Every index is within [0, 1].
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AnalysisResult {
    duration: f64,
    tempo: f64,
    afro_rhythm: f64,
    log_drum_intensity: f64,
    percussion_richness: f64,
    vocal_lift: f64,
    danceability: f64,
}

impl AnalysisResult {
    pub fn from_measurements(duration: f64, tempo: f64, stats: &SpectralStats) -> Self {
        let rolloff = stats.spectral_rolloff_mean as f64;
        let zcr = stats.zero_crossing_rate_mean as f64;
        let centroid = stats.spectral_centroid_mean as f64;

        Self {
            duration,
            tempo,
            afro_rhythm: clamp01((tempo - 80.0) / 80.0),
            log_drum_intensity: clamp01((rolloff - 2000.0) / 4000.0),
            percussion_richness: clamp01(zcr * 10.0),
            vocal_lift: clamp01((centroid - 1000.0) / 2000.0),
            danceability: clamp01((tempo - 100.0) / 60.0),
        }
    }

    /// Build a result from already-derived indices; each is clamped.
    #[cfg(test)]
    #[allow(clippy::too_many_arguments)]
    pub fn from_indices(
        duration: f64,
        tempo: f64,
        afro_rhythm: f64,
        log_drum_intensity: f64,
        percussion_richness: f64,
        vocal_lift: f64,
        danceability: f64,
    ) -> Self {
        Self {
            duration,
            tempo,
            afro_rhythm: clamp01(afro_rhythm),
            log_drum_intensity: clamp01(log_drum_intensity),
            percussion_richness: clamp01(percussion_richness),
            vocal_lift: clamp01(vocal_lift),
            danceability: clamp01(danceability),
        }
    }

    pub fn duration(&self) -> f64 { self.duration }
    pub fn tempo(&self) -> f64 { self.tempo }
    pub fn afro_rhythm(&self) -> f64 { self.afro_rhythm }
    pub fn log_drum_intensity(&self) -> f64 { self.log_drum_intensity }
    pub fn percussion_richness(&self) -> f64 { self.percussion_richness }
    pub fn vocal_lift(&self) -> f64 { self.vocal_lift }
    pub fn danceability(&self) -> f64 { self.danceability }

    fn indices(&self) -> [f64; 5] {
        [
            self.afro_rhythm,
            self.log_drum_intensity,
            self.percussion_richness,
            self.vocal_lift,
            self.danceability,
        ]
    }
}
