//! CLI argument definitions using clap.

use clap::Parser;
use std::path::PathBuf;
use vaani_asr::decoder::DEFAULT_CONFIDENCE_THRESHOLD;

#[derive(Debug, Parser)]
#[command(name = "vaani")]
#[command(about = "Speech transcription HTTP service")]
#[command(version)]
pub struct Args {
    /// Directory containing the ONNX acoustic model and vocab.txt
    pub model_dir: PathBuf,

    /// Bind address
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Bind port
    #[arg(short, long, default_value_t = 8000)]
    pub port: u16,

    /// Raw-logit score at or below which frames are suppressed to blank
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
    pub confidence_threshold: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_model_dir_with_defaults() {
        let args = Args::parse_from(["vaani", "models/hi-conformer"]);

        assert_eq!(args.model_dir.to_str(), Some("models/hi-conformer"));
        assert_eq!(args.host, "127.0.0.1");
        assert_eq!(args.port, 8000);
        assert!((args.confidence_threshold - DEFAULT_CONFIDENCE_THRESHOLD).abs() < f32::EPSILON);
    }

    #[test]
    fn parses_bind_and_threshold_overrides() {
        let args = Args::parse_from([
            "vaani",
            "models",
            "--host",
            "0.0.0.0",
            "-p",
            "9000",
            "--confidence-threshold=-5.5",
        ]);

        assert_eq!(args.host, "0.0.0.0");
        assert_eq!(args.port, 9000);
        assert!((args.confidence_threshold + 5.5).abs() < f32::EPSILON);
    }
}
