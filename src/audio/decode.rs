use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::DecodeError;

/// Only the opening window of a track is analyzed.
pub const MAX_ANALYSIS_SECONDS: u32 = 60;

/// Highest stream rate accepted from a container header.
const MAX_SAMPLE_RATE: u32 = 768_000;

/// File extensions the CLI accepts. Filtering only; content is not checked.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "m4a", "aac"];

#[derive(Debug)]
pub struct AudioData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioData {
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

pub fn is_supported_extension(ext: &str) -> bool {
    SUPPORTED_EXTENSIONS
        .iter()
        .any(|s| s.eq_ignore_ascii_case(ext))
}

/// Decode in-memory audio into a mono buffer holding at most the first
/// `MAX_ANALYSIS_SECONDS` at the stream's native rate.
pub fn decode_audio(bytes: Vec<u8>, extension: Option<&str>) -> Result<AudioData, DecodeError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(DecodeError::Probe)?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoTrack)?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .filter(|&sr| sr > 0)
        .ok_or(DecodeError::UnknownSampleRate)?;
    if sample_rate > MAX_SAMPLE_RATE {
        return Err(DecodeError::UnsupportedSampleRate(sample_rate));
    }
    let max_samples = (sample_rate as usize)
        .checked_mul(MAX_ANALYSIS_SECONDS as usize)
        .ok_or(DecodeError::UnsupportedSampleRate(sample_rate))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(DecodeError::Codec)?;

    let mut all_samples: Vec<f32> = Vec::new();

    while all_samples.len() < max_samples {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(DecodeError::Packet(e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => return Err(DecodeError::Packet(e)),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);
        let num_frames = decoded.frames();

        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        let samples = sample_buf.samples();

        // Downmix to mono
        if channels == 1 {
            all_samples.extend_from_slice(samples);
        } else {
            for frame_samples in samples.chunks(channels) {
                let mono: f32 = frame_samples.iter().sum::<f32>() / channels as f32;
                all_samples.push(mono);
            }
        }
    }

    all_samples.truncate(max_samples);
    if all_samples.is_empty() {
        return Err(DecodeError::Empty);
    }

    log::info!(
        "Decoded audio: {} samples, {}Hz, {:.1}s",
        all_samples.len(),
        sample_rate,
        all_samples.len() as f32 / sample_rate as f32
    );

    Ok(AudioData {
        samples: all_samples,
        sample_rate,
    })
}

/// Resample to the analysis rate. A buffer already at `target_rate` is
/// returned untouched; otherwise the output is aligned to the input and holds
/// `round(len * ratio)` samples.
pub fn resample(audio: AudioData, target_rate: u32) -> Result<AudioData, DecodeError> {
    use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};

    if audio.sample_rate == target_rate {
        return Ok(audio);
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = target_rate as f64 / audio.sample_rate as f64;
    let expected = (audio.samples.len() as f64 * ratio).round() as usize;
    let resample_err = |reason: String| DecodeError::Resample {
        target: target_rate,
        reason,
    };
    if expected == 0 {
        return Err(resample_err(format!(
            "{} samples at {}Hz yield no output",
            audio.samples.len(),
            audio.sample_rate
        )));
    }

    let mut resampler = SincFixedIn::<f32>::new(
        ratio,
        2.0, // max relative ratio
        params,
        audio.samples.len(),
        1, // mono
    )
    .map_err(|e| resample_err(e.to_string()))?;

    let delay = resampler.output_delay();
    let input = vec![audio.samples];
    let mut samples = resampler
        .process(&input, None)
        .map_err(|e| resample_err(e.to_string()))?
        .into_iter()
        .next()
        .unwrap_or_default();

    // Flush the filter tail so the delayed output covers the whole input
    while samples.len() < delay + expected {
        let tail = resampler
            .process_partial(None::<&[Vec<f32>]>, None)
            .map_err(|e| resample_err(e.to_string()))?
            .into_iter()
            .next()
            .unwrap_or_default();
        if tail.is_empty() {
            break;
        }
        samples.extend(tail);
    }

    samples.drain(..delay.min(samples.len()));
    samples.resize(expected, 0.0);

    log::debug!(
        "Resampled {}Hz -> {}Hz ({} samples)",
        audio.sample_rate,
        target_rate,
        samples.len()
    );

    Ok(AudioData {
        samples,
        sample_rate: target_rate,
    })
}
