use thiserror::Error;

/// Input bytes could not be turned into a mono waveform.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to probe audio format: {0}")]
    Probe(#[source] symphonia::core::errors::Error),

    #[error("no audio tracks found")]
    NoTrack,

    #[error("unknown sample rate")]
    UnknownSampleRate,

    #[error("unsupported sample rate: {0}Hz")]
    UnsupportedSampleRate(u32),

    #[error("failed to create audio decoder: {0}")]
    Codec(#[source] symphonia::core::errors::Error),

    #[error("failed to read audio packet: {0}")]
    Packet(#[source] symphonia::core::errors::Error),

    #[error("audio stream contains no samples")]
    Empty,

    #[error("resampling to {target}Hz failed: {reason}")]
    Resample { target: u32, reason: String },
}

/// Beat tracking could not produce a tempo.
#[derive(Debug, Error)]
pub enum TempoError {
    #[error("audio too short for beat tracking ({frames} onset frames)")]
    TooShort { frames: usize },

    #[error("no onsets detected")]
    NoOnsets,

    #[error("no periodicity found between {min_bpm:.0} and {max_bpm:.0} BPM")]
    NoPeriodicity { min_bpm: f32, max_bpm: f32 },
}

/// A single spectral/temporal statistic could not be computed.
///
/// Never surfaced to callers: the extractor substitutes a fallback constant.
#[derive(Debug, Error, PartialEq)]
pub enum FeatureError {
    #[error("no analysis frames")]
    NoFrames,

    #[error("{0} mean is not finite")]
    NonFinite(&'static str),
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("could not decode audio: {0}")]
    Decode(#[from] DecodeError),

    #[error("could not estimate tempo: {0}")]
    Tempo(#[from] TempoError),
}
