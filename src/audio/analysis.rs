use rayon::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};

use super::decode::{self, AudioData};
use super::features::{AnalysisResult, SpectralStats};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, FeatureError, TempoError};

const ROLLOFF_PERCENT: f32 = 0.85;
const ZERO_THRESHOLD: f32 = 1e-10;

// Onset strength
const POWER_FLOOR: f32 = 1e-10;
const TOP_DB: f32 = 80.0;

// Tempo search
const START_BPM: f32 = 120.0;
const STD_BPM_OCTAVES: f32 = 1.0;
const MAX_TEMPO: f32 = 320.0;
const AC_SECONDS: f32 = 8.0;

/// Decode, resample and analyze an in-memory audio file with default framing.
pub fn analyze(bytes: Vec<u8>, extension: Option<&str>) -> Result<AnalysisResult, AnalysisError> {
    analyze_with(bytes, extension, &AnalysisConfig::default())
}

pub fn analyze_with(
    bytes: Vec<u8>,
    extension: Option<&str>,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, AnalysisError> {
    let audio = decode::decode_audio(bytes, extension)?;
    let audio = decode::resample(audio, config.sample_rate)?;
    Ok(analyze_samples(&audio, config)?)
}

/// A per-track statistic reduced from the spectrogram.
type SpectralStatistic = fn(&Spectrogram) -> Result<f32, FeatureError>;

pub fn analyze_samples(audio: &AudioData, config: &AnalysisConfig) -> Result<AnalysisResult, TempoError> {
    analyze_samples_using(audio, config, spectral_centroid_mean, spectral_rolloff_mean)
}

fn analyze_samples_using(
    audio: &AudioData,
    config: &AnalysisConfig,
    centroid: SpectralStatistic,
    rolloff: SpectralStatistic,
) -> Result<AnalysisResult, TempoError> {
    let duration = audio.duration();
    let spectrogram = Spectrogram::compute(&audio.samples, audio.sample_rate, config.n_fft, config.hop_length);

    let frame_rate = audio.sample_rate as f32 / config.hop_length as f32;
    let onsets = onset_envelope(&spectrogram);
    let tempo = estimate_tempo(&onsets, frame_rate)?;

    let stats = SpectralStats::resolve(
        centroid(&spectrogram),
        rolloff(&spectrogram),
        zero_crossing_rate_mean(&audio.samples, config.n_fft, config.hop_length),
    );

    log::info!(
        "Analysis: {:.1}s, tempo={:.1} BPM, centroid={:.1}Hz, rolloff={:.1}Hz, zcr={:.4}",
        duration,
        tempo,
        stats.spectral_centroid_mean,
        stats.spectral_rolloff_mean,
        stats.zero_crossing_rate_mean
    );

    Ok(AnalysisResult::from_measurements(duration, tempo as f64, &stats))
}

/// Magnitude STFT over centered, zero-padded frames.
pub struct Spectrogram {
    /// One row per frame, `n_fft / 2 + 1` bins each
    pub frames: Vec<Vec<f32>>,
    pub sample_rate: u32,
    pub n_fft: usize,
}

impl Spectrogram {
    pub fn compute(samples: &[f32], sample_rate: u32, n_fft: usize, hop: usize) -> Self {
        let half = n_fft / 2;
        let mut padded = vec![0.0f32; half];
        padded.extend_from_slice(samples);
        padded.resize(padded.len() + half, 0.0);

        let num_frames = frame_count(padded.len(), n_fft, hop);
        let hann = hann_window(n_fft);
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n_fft);

        let frames = (0..num_frames)
            .into_par_iter()
            .map(|frame_idx| {
                let start = frame_idx * hop;
                let mut buffer: Vec<Complex<f32>> = padded[start..start + n_fft]
                    .iter()
                    .zip(hann.iter())
                    .map(|(&s, &w)| Complex::new(s * w, 0.0))
                    .collect();
                fft.process(&mut buffer);
                buffer[..=half].iter().map(|c| c.norm()).collect::<Vec<f32>>()
            })
            .collect();

        Self {
            frames,
            sample_rate,
            n_fft,
        }
    }

    pub fn bin_frequency(&self, bin: usize) -> f32 {
        bin as f32 * self.sample_rate as f32 / self.n_fft as f32
    }
}

fn frame_count(len: usize, frame_len: usize, hop: usize) -> usize {
    if len < frame_len {
        0
    } else {
        (len - frame_len) / hop + 1
    }
}

fn mean_of(values: &[f32], name: &'static str) -> Result<f32, FeatureError> {
    if values.is_empty() {
        return Err(FeatureError::NoFrames);
    }
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64;
    if !mean.is_finite() {
        return Err(FeatureError::NonFinite(name));
    }
    Ok(mean as f32)
}

pub fn spectral_centroid_mean(spec: &Spectrogram) -> Result<f32, FeatureError> {
    let centroids: Vec<f32> = spec
        .frames
        .iter()
        .map(|bins| {
            let total_energy: f32 = bins.iter().sum();
            if total_energy > 1e-10 {
                bins.iter()
                    .enumerate()
                    .map(|(i, &mag)| spec.bin_frequency(i) * mag)
                    .sum::<f32>()
                    / total_energy
            } else {
                0.0
            }
        })
        .collect();
    mean_of(&centroids, "spectral centroid")
}

pub fn spectral_rolloff_mean(spec: &Spectrogram) -> Result<f32, FeatureError> {
    let rolloffs: Vec<f32> = spec
        .frames
        .iter()
        .map(|bins| {
            let threshold = ROLLOFF_PERCENT * bins.iter().sum::<f32>();
            let mut cumulative = 0.0f32;
            let bin = bins
                .iter()
                .position(|&mag| {
                    cumulative += mag;
                    cumulative >= threshold
                })
                .unwrap_or(bins.len().saturating_sub(1));
            spec.bin_frequency(bin)
        })
        .collect();
    mean_of(&rolloffs, "spectral rolloff")
}

/// Frames are centered with edge padding. Near-zero samples count as zero,
/// and zero counts as positive.
pub fn zero_crossing_rate_mean(samples: &[f32], frame_len: usize, hop: usize) -> Result<f32, FeatureError> {
    let (Some(&first), Some(&last)) = (samples.first(), samples.last()) else {
        return Err(FeatureError::NoFrames);
    };
    let half = frame_len / 2;
    let mut padded = vec![first; half];
    padded.extend_from_slice(samples);
    padded.resize(padded.len() + half, last);

    let negative: Vec<bool> = padded
        .iter()
        .map(|&s| s.abs() > ZERO_THRESHOLD && s < 0.0)
        .collect();

    let rates: Vec<f32> = (0..frame_count(padded.len(), frame_len, hop))
        .map(|frame_idx| {
            let frame = &negative[frame_idx * hop..frame_idx * hop + frame_len];
            let crossings = frame.windows(2).filter(|w| w[0] != w[1]).count();
            crossings as f32 / frame_len as f32
        })
        .collect();
    mean_of(&rates, "zero-crossing rate")
}

/// Mean positive first difference of the dB power spectrum per frame.
pub fn onset_envelope(spec: &Spectrogram) -> Vec<f32> {
    let db_frames: Vec<Vec<f32>> = spec
        .frames
        .iter()
        .map(|bins| {
            bins.iter()
                .map(|&mag| 10.0 * (mag * mag).max(POWER_FLOOR).log10())
                .collect()
        })
        .collect();

    let peak_db = db_frames
        .iter()
        .flatten()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max);
    let floor_db = peak_db - TOP_DB;

    let mut envelope = vec![0.0f32; db_frames.len()];
    for i in 1..db_frames.len() {
        let rise: f32 = db_frames[i]
            .iter()
            .zip(db_frames[i - 1].iter())
            .map(|(cur, prev)| (cur.max(floor_db) - prev.max(floor_db)).max(0.0))
            .sum();
        envelope[i] = rise / db_frames[i].len().max(1) as f32;
    }
    envelope
}

/// Pick the onset autocorrelation lag that best combines periodicity
/// strength with a log-normal tempo prior around `START_BPM`.
pub fn estimate_tempo(onsets: &[f32], frame_rate: f32) -> Result<f32, TempoError> {
    if onsets.len() < 2 {
        return Err(TempoError::TooShort {
            frames: onsets.len(),
        });
    }
    if !onsets.iter().any(|&o| o > 0.0) {
        return Err(TempoError::NoOnsets);
    }

    let lag_to_bpm = |lag: usize| 60.0 * frame_rate / lag as f32;

    let max_lag = ((AC_SECONDS * frame_rate).round() as usize).min(onsets.len() - 1);
    let min_lag = ((60.0 * frame_rate / MAX_TEMPO).ceil() as usize).max(1);
    if min_lag > max_lag {
        return Err(TempoError::TooShort {
            frames: onsets.len(),
        });
    }

    let autocorrelation = |lag: usize| -> f32 {
        onsets
            .iter()
            .zip(onsets[lag..].iter())
            .map(|(a, b)| a * b)
            .sum()
    };

    let energy = autocorrelation(0);
    let log_prior = |bpm: f32| -> f32 {
        let octaves = (bpm.log2() - START_BPM.log2()) / STD_BPM_OCTAVES;
        -0.5 * octaves * octaves
    };

    let best = (min_lag..=max_lag)
        .filter_map(|lag| {
            let strength = autocorrelation(lag) / energy;
            if strength > 0.0 {
                let bpm = lag_to_bpm(lag);
                Some((bpm, (1.0 + 1e6 * strength).ln() + log_prior(bpm)))
            } else {
                None
            }
        })
        .max_by(|a, b| a.1.total_cmp(&b.1));

    match best {
        Some((bpm, _)) if bpm.is_finite() && bpm > 0.0 => Ok(bpm),
        _ => Err(TempoError::NoPeriodicity {
            min_bpm: lag_to_bpm(max_lag),
            max_bpm: lag_to_bpm(min_lag).min(MAX_TEMPO),
        }),
    }
}

fn hann_window(size: usize) -> Vec<f32> {
    // periodic form, as used for STFT analysis
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / size as f32).cos()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decode::tests::wav_bytes;

    const SR: u32 = 22050;

    fn tone(freq: f32, seconds: f32) -> Vec<f32> {
        let n = (SR as f32 * seconds) as usize;
        (0..n)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / SR as f32).sin())
            .collect()
    }

    /// Decaying 1.5kHz bursts every `period` samples.
    fn click_track(period: usize, seconds: f32) -> Vec<f32> {
        let n = (SR as f32 * seconds) as usize;
        let burst = 441;
        (0..n)
            .map(|i| {
                let offset = i % period;
                if offset < burst {
                    let t = offset as f32 / SR as f32;
                    let decay = 1.0 - offset as f32 / burst as f32;
                    0.8 * decay * (2.0 * std::f32::consts::PI * 1500.0 * t).sin()
                } else {
                    0.0
                }
            })
            .collect()
    }

    fn spectrogram(samples: &[f32]) -> Spectrogram {
        Spectrogram::compute(samples, SR, 2048, 512)
    }

    #[test]
    fn frame_count_matches_centered_framing() {
        let spec = spectrogram(&vec![0.0; 5000]);
        assert_eq!(spec.frames.len(), 1 + 5000 / 512);
        assert_eq!(spec.frames[0].len(), 1025);
    }

    #[test]
    fn centroid_of_pure_tone() {
        let centroid = spectral_centroid_mean(&spectrogram(&tone(1000.0, 10.0))).unwrap();
        assert!((centroid - 1000.0).abs() < 60.0, "centroid {}", centroid);
    }

    #[test]
    fn rolloff_of_pure_tone() {
        let rolloff = spectral_rolloff_mean(&spectrogram(&tone(1000.0, 10.0))).unwrap();
        assert!((rolloff - 1000.0).abs() < 100.0, "rolloff {}", rolloff);
    }

    #[test]
    fn silent_frames_have_zero_centroid_and_rolloff() {
        let spec = spectrogram(&vec![0.0; 4096]);
        assert_eq!(spectral_centroid_mean(&spec).unwrap(), 0.0);
        assert_eq!(spectral_rolloff_mean(&spec).unwrap(), 0.0);
    }

    #[test]
    fn statistics_fail_without_frames() {
        let empty = Spectrogram {
            frames: Vec::new(),
            sample_rate: SR,
            n_fft: 2048,
        };
        assert_eq!(spectral_centroid_mean(&empty), Err(FeatureError::NoFrames));
        assert_eq!(spectral_rolloff_mean(&empty), Err(FeatureError::NoFrames));
        assert_eq!(zero_crossing_rate_mean(&[], 2048, 512), Err(FeatureError::NoFrames));
    }

    #[test]
    fn non_finite_statistic_is_an_error() {
        let spec = Spectrogram {
            frames: vec![vec![f32::INFINITY; 4]],
            sample_rate: SR,
            n_fft: 6,
        };
        assert!(matches!(spectral_centroid_mean(&spec), Err(FeatureError::NonFinite(_))));
    }

    #[test]
    fn zero_crossing_rate_of_pure_tone() {
        // two crossings per period
        let zcr = zero_crossing_rate_mean(&tone(1000.0, 2.0), 2048, 512).unwrap();
        let expected = 2.0 * 1000.0 / SR as f32;
        assert!((zcr - expected).abs() < 0.005, "zcr {} expected {}", zcr, expected);
    }

    #[test]
    fn zero_crossing_rate_ignores_tiny_values() {
        let samples: Vec<f32> = (0..4096)
            .map(|i| if i % 2 == 0 { 1e-12 } else { -1e-12 })
            .collect();
        assert_eq!(zero_crossing_rate_mean(&samples, 2048, 512).unwrap(), 0.0);
    }

    #[test]
    fn onset_envelope_is_flat_for_silence() {
        let onsets = onset_envelope(&spectrogram(&vec![0.0; SR as usize]));
        assert!(onsets.iter().all(|&o| o == 0.0));
    }

    #[test]
    fn tempo_of_periodic_clicks() {
        // 22 hops between clicks: 60 * 22050 / (22 * 512) ≈ 117.45 BPM
        let period = 22 * 512;
        let onsets = onset_envelope(&spectrogram(&click_track(period, 12.0)));
        let tempo = estimate_tempo(&onsets, SR as f32 / 512.0).unwrap();
        assert!((tempo - 117.45).abs() < 0.5, "tempo {}", tempo);
    }

    #[test]
    fn tempo_requires_onsets() {
        assert!(matches!(estimate_tempo(&[0.0; 500], 43.0), Err(TempoError::NoOnsets)));
        assert!(matches!(estimate_tempo(&[1.0], 43.0), Err(TempoError::TooShort { frames: 1 })));
    }

    #[test]
    fn tempo_requires_periodicity() {
        // a single onset never lines up with itself at any non-zero lag
        let mut onsets = vec![0.0f32; 500];
        onsets[3] = 1.0;
        match estimate_tempo(&onsets, 43.0) {
            Err(TempoError::NoPeriodicity { min_bpm, max_bpm }) => {
                assert!(min_bpm <= max_bpm, "{} > {}", min_bpm, max_bpm);
                assert!(max_bpm <= MAX_TEMPO);
            }
            other => panic!("expected NoPeriodicity, got {:?}", other),
        }
    }

    #[test]
    fn tempo_needs_a_lag_within_range() {
        // at 43 frames/s the shortest lag is 9 frames, beyond this envelope
        let onsets = [0.0, 1.0, 0.5, 1.0, 0.2];
        assert!(matches!(
            estimate_tempo(&onsets, 43.0),
            Err(TempoError::TooShort { frames: 5 })
        ));
    }

    #[test]
    fn analyzes_click_track_end_to_end() {
        let samples = click_track(22 * 512, 10.0);
        let result = analyze(wav_bytes(&samples, SR, 1), Some("wav")).unwrap();
        assert!((result.duration() - 10.0).abs() < 1e-6);
        assert!((result.tempo() - 117.45).abs() < 0.5, "tempo {}", result.tempo());
        assert!((result.afro_rhythm() - (result.tempo() - 80.0) / 80.0).abs() < 1e-9);
        assert!((result.danceability() - (result.tempo() - 100.0) / 60.0).abs() < 1e-9);
        for idx in [
            result.log_drum_intensity(),
            result.percussion_richness(),
            result.vocal_lift(),
        ] {
            assert!((0.0..=1.0).contains(&idx));
        }
    }

    #[test]
    fn silent_audio_fails_tempo_estimation() {
        let bytes = wav_bytes(&vec![0.0; SR as usize * 3], SR, 1);
        let err = analyze(bytes, Some("wav")).unwrap_err();
        assert!(matches!(err, AnalysisError::Tempo(TempoError::NoOnsets)), "{:?}", err);
    }

    #[test]
    fn resampled_input_keeps_its_duration() {
        // the click track held for two samples each, played back at 44.1kHz in stereo
        let samples: Vec<f32> = click_track(22 * 512, 6.0)
            .iter()
            .flat_map(|&s| [s, s])
            .collect();
        let result = analyze(wav_bytes(&samples, 2 * SR, 2), Some("wav")).unwrap();
        let expected = samples.len() as f64 / (2.0 * SR as f64);
        assert!(
            (result.duration() - expected).abs() <= 1.0 / SR as f64,
            "duration {} expected {}",
            result.duration(),
            expected
        );
    }

    #[test]
    fn tiny_clip_at_another_rate_fails_tempo_not_decode() {
        let bytes = wav_bytes(&[0.3; 10], 8000, 1);
        let err = analyze(bytes, Some("wav")).unwrap_err();
        assert!(matches!(err, AnalysisError::Tempo(_)), "{:?}", err);
    }

    #[test]
    fn failed_rolloff_falls_back_during_analysis() {
        let audio = AudioData {
            samples: click_track(22 * 512, 10.0),
            sample_rate: SR,
        };
        let config = AnalysisConfig::default();
        let measured = analyze_samples(&audio, &config).unwrap();
        let result = analyze_samples_using(&audio, &config, spectral_centroid_mean, |_| {
            Err(FeatureError::NonFinite("spectral rolloff"))
        })
        .unwrap();

        assert!((result.log_drum_intensity() - 0.25).abs() < 1e-12);
        assert_eq!(result.tempo(), measured.tempo());
        assert_eq!(result.vocal_lift(), measured.vocal_lift());
        assert_eq!(result.percussion_richness(), measured.percussion_richness());
    }

    #[test]
    fn undecodable_input_reports_decode_failure() {
        let err = analyze(b"RIFF\x00\x00garbage".to_vec(), Some("wav")).unwrap_err();
        assert!(matches!(err, AnalysisError::Decode(_)), "{:?}", err);
        assert!(err.to_string().starts_with("could not decode audio"));
    }

    #[test]
    fn custom_framing_is_honored() {
        let config = AnalysisConfig {
            sample_rate: SR,
            n_fft: 1024,
            hop_length: 256,
        };
        let samples = click_track(44 * 256, 8.0);
        let result = analyze_with(wav_bytes(&samples, SR, 1), Some("wav"), &config).unwrap();
        let expected = 60.0 * SR as f64 / (44.0 * 256.0);
        assert!((result.tempo() - expected).abs() < 0.5, "tempo {}", result.tempo());
    }
}
