//! CLI Module
//!
//! Command-line interface for rendering voice clips with the echo chain.

pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::dsp::EffectParams;

/// EchoClip - echo and voice enhancement for short clips
#[derive(Parser, Debug)]
#[command(name = "echoclip")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Studio configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Effect settings given on the command line
#[derive(Args, Debug, Clone, Default)]
pub struct EffectArgs {
    /// Effect parameters file (JSON); flags below override it
    #[arg(long)]
    pub params: Option<PathBuf>,

    /// Echo delay in seconds (0.01 - 1.0)
    #[arg(long)]
    pub delay: Option<f32>,

    /// Echo feedback (0 - 0.95, exclusive)
    #[arg(long)]
    pub feedback: Option<f32>,

    /// 5 kHz low-pass noise filter (`--noise-reduction` or `--noise-reduction=false`)
    #[arg(
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub noise_reduction: Option<bool>,

    /// Voice boost as linear gain (1.0 - 3.0)
    #[arg(long)]
    pub boost: Option<f32>,

    /// Clarity boost at 3.5 kHz in dB (0 - 12)
    #[arg(long)]
    pub clarity: Option<f32>,
}

impl EffectArgs {
    /// Apply the flags on top of `base`
    pub fn apply(&self, base: EffectParams) -> EffectParams {
        EffectParams {
            delay_time: self.delay.unwrap_or(base.delay_time),
            feedback: self.feedback.unwrap_or(base.feedback),
            noise_reduction: self.noise_reduction.unwrap_or(base.noise_reduction),
            voice_boost: self.boost.unwrap_or(base.voice_boost),
            clarity_gain_db: self.clarity.unwrap_or(base.clarity_gain_db),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a clip and write WAV and MP3 exports
    #[command(name = "render")]
    Render {
        /// Input WAV or MP3 file
        input: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        #[command(flatten)]
        effects: EffectArgs,

        /// Also write the voice-only preview as WAV
        #[arg(long)]
        preview: bool,

        /// Write a JSON summary next to the exports
        #[arg(long)]
        json: bool,
    },

    /// Render every WAV and MP3 file under a directory
    #[command(name = "render-dir")]
    RenderDir {
        /// Directory to scan recursively
        dir: PathBuf,

        /// Output directory
        #[arg(short, long)]
        out_dir: PathBuf,

        #[command(flatten)]
        effects: EffectArgs,
    },

    /// Print format, duration and levels of an audio file
    #[command(name = "info")]
    Info {
        /// Input WAV or MP3 file
        input: PathBuf,
    },

    /// Print the effective effect parameters as JSON
    #[command(name = "params")]
    Params {
        #[command(flatten)]
        effects: EffectArgs,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_render() {
        let cli = Cli::parse_from([
            "echoclip",
            "render",
            "voice.wav",
            "--delay",
            "0.5",
            "--noise-reduction",
            "-o",
            "out",
        ]);
        match cli.command {
            Some(Commands::Render {
                input,
                out_dir,
                effects,
                ..
            }) => {
                assert_eq!(input, PathBuf::from("voice.wav"));
                assert_eq!(out_dir, PathBuf::from("out"));
                let params = effects.apply(EffectParams::default());
                assert_eq!(params.delay_time, 0.5);
                assert!(params.noise_reduction);
                assert_eq!(params.feedback, 0.4);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_noise_reduction_can_be_turned_off() {
        let base = EffectParams {
            noise_reduction: true,
            ..Default::default()
        };

        let cli = Cli::parse_from(["echoclip", "params", "--noise-reduction=false"]);
        match cli.command {
            Some(Commands::Params { effects }) => {
                assert_eq!(effects.noise_reduction, Some(false));
                assert!(!effects.apply(base).noise_reduction);
            }
            other => panic!("unexpected command {:?}", other),
        }

        let cli = Cli::parse_from(["echoclip", "params"]);
        match cli.command {
            Some(Commands::Params { effects }) => assert!(effects.apply(base).noise_reduction),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
