use serde::Serialize;

use crate::audio::features::AnalysisResult;
use crate::prompt::{Genre, PromptPair};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Everything the CLI prints for one track, in JSON form.
#[derive(Serialize)]
pub struct Report<'a> {
    pub file: &'a str,
    pub genre: Genre,
    pub analysis: &'a AnalysisResult,
    pub prompts: &'a PromptPair,
}

pub fn render_analysis(result: &AnalysisResult) -> String {
    let genre = Genre::of(result).label().to_uppercase();
    format!(
        "PROFESSIONAL MUSIC ANALYSIS COMPLETE\n\
         {rule}\n\
         \n\
         TRACK INFORMATION:\n   \
            Duration: {duration:.1} seconds\n   \
            Tempo: {tempo:.1} BPM\n   \
            Primary Genre: {genre}\n\
         \n\
         BEAT ANALYSIS:\n   \
            Afro Rhythm Signature: {afro:.3}\n   \
            Log Drum Bass Intensity: {log_drum:.3}\n   \
            Percussion Layer Richness: {percussion:.3}\n   \
            Vocal Lift Elements: {vocal:.3}\n   \
            Danceability Factor: {dance:.3}\n\
         \n\
         ANALYSIS STATUS: COMPLETE - AI PROMPTS GENERATED\n\
         {rule}",
        rule = RULE,
        duration = result.duration(),
        tempo = result.tempo(),
        genre = genre,
        afro = result.afro_rhythm(),
        log_drum = result.log_drum_intensity(),
        percussion = result.percussion_richness(),
        vocal = result.vocal_lift(),
        dance = result.danceability(),
    )
}

pub fn render_prompts(prompts: &PromptPair) -> String {
    format!(
        "Suno AI Prompt:\n{}\n\nRiffusion Prompt:\n{}",
        prompts.suno_prompt, prompts.riffusion_prompt
    )
}

pub const USAGE_GUIDE: &str = "\
How to use these prompts

For Suno AI:
  1. Copy the Suno prompt above
  2. Go to Suno AI
  3. Paste the prompt in the description field
  4. Generate your AI music!

For Riffusion:
  1. Copy the Riffusion prompt above
  2. Go to Riffusion
  3. Paste the prompt in the text field
  4. Generate your AI music!";
