use std::path::PathBuf;

use clap::{ArgAction, Parser};

/// Causal-perception dual-target experiment.
#[derive(Parser, Debug)]
#[command(name = "causex", version, about)]
pub struct Args {
    /// JSON file overriding the default session parameters.
    #[arg(short, long, env = "CAUSEX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Participant id written into every result row; a random UUID if absent.
    #[arg(short, long)]
    pub participant: Option<String>,

    /// Name for the welcome banner.
    #[arg(long)]
    pub name: Option<String>,

    /// Directory results are exported into.
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// RNG seed for trial lists, block order and stimuli. Overrides the config.
    #[arg(long)]
    pub seed: Option<u64>,

    /// TTF font to draw text with.
    #[arg(long, env = "CAUSEX_FONT")]
    pub font: Option<PathBuf>,

    /// Run in an 800x600 window instead of borderless fullscreen.
    #[arg(long)]
    pub windowed: bool,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["causex"]).unwrap();
        assert_eq!(args.participant, None);
        assert_eq!(args.output_dir, PathBuf::from("."));
        assert!(!args.windowed);
        assert_eq!(args.verbose, 0);
    }

    #[test]
    fn flags_parse() {
        let args = Args::try_parse_from([
            "causex",
            "--participant",
            "p-17",
            "--name",
            "Ada",
            "--seed",
            "42",
            "--windowed",
            "-vv",
            "-o",
            "/tmp/out",
        ])
        .unwrap();
        assert_eq!(args.participant.as_deref(), Some("p-17"));
        assert_eq!(args.name.as_deref(), Some("Ada"));
        assert_eq!(args.seed, Some(42));
        assert!(args.windowed);
        assert_eq!(args.verbose, 2);
        assert_eq!(args.output_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn seed_must_be_numeric() {
        assert!(Args::try_parse_from(["causex", "--seed", "abc"]).is_err());
    }
}
