use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::error::ConfigError;
use crate::geometry::Rect;
use crate::model::{ClickType, MovementSpeed, Sequence};

#[derive(Parser, Debug)]
#[command(name = "sequence_clicker", version, about = "Humanized mouse click sequences")]
pub struct Cli {
    /// Log at debug level (RUST_LOG still wins when set)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a saved click sequence
    Run(RunArgs),
    /// Record raw mouse activity to a file
    Record(RecordArgs),
    /// Replay a recording
    Play(PlayArgs),
    /// Click repeatedly at a fixed interval
    Click(ClickArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Sequence JSON file
    pub sequence: PathBuf,

    /// Settings JSON file (flat key/value object)
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Check every click for the failure marker and retry once
    #[arg(long)]
    pub validate: bool,

    /// Override the loop mode with a fixed loop count
    #[arg(long, conflicts_with = "forever")]
    pub loops: Option<i32>,

    /// Loop until interrupted
    #[arg(long)]
    pub forever: bool,

    /// Stop after this many seconds even if loops remain
    #[arg(long)]
    pub max_seconds: Option<u64>,
}

#[derive(Args, Debug)]
pub struct RecordArgs {
    #[arg(short, long)]
    pub output: PathBuf,

    /// Recording length
    #[arg(long, default_value_t = 10)]
    pub seconds: u64,
}

#[derive(Args, Debug)]
pub struct PlayArgs {
    pub recording: PathBuf,

    #[arg(long, default_value_t = 1.0)]
    pub speed: f64,
}

#[derive(Args, Debug)]
pub struct ClickArgs {
    /// Time between clicks, at least 100ms
    #[arg(long, default_value_t = 1000)]
    pub interval_ms: u32,

    /// Random +/- variation applied to each interval
    #[arg(long, default_value_t = 0)]
    pub deviation_ms: u32,

    /// Click random points of X,Y,W,H instead of the cursor position
    #[arg(long, value_parser = parse_area)]
    pub area: Option<Rect>,

    /// left, right, middle or double
    #[arg(long, value_parser = parse_click_type, default_value = "left")]
    pub click_type: ClickType,

    /// fast, medium or slow
    #[arg(long, value_parser = parse_speed, default_value = "medium")]
    pub speed: MovementSpeed,

    #[arg(long)]
    pub max_seconds: Option<u64>,
}

impl ClickArgs {
    pub fn to_sequence(&self) -> Result<Sequence, ConfigError> {
        Sequence::interval_clicker(self.interval_ms, self.deviation_ms, self.area, self.click_type, self.speed)
    }
}

fn parse_area(s: &str) -> Result<Rect, String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<i32>().map_err(|e| format!("{p:?}: {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    match parts[..] {
        [x, y, width, height] => Ok(Rect::new(x, y, width, height)),
        _ => Err(format!("expected X,Y,W,H, got {s:?}")),
    }
}

fn parse_click_type(s: &str) -> Result<ClickType, String> {
    match s.to_ascii_lowercase().as_str() {
        "left" => Ok(ClickType::Left),
        "right" => Ok(ClickType::Right),
        "middle" => Ok(ClickType::Middle),
        "double" => Ok(ClickType::Double),
        _ => Err(format!("unknown click type {s:?}")),
    }
}

fn parse_speed(s: &str) -> Result<MovementSpeed, String> {
    match s.to_ascii_lowercase().as_str() {
        "fast" => Ok(MovementSpeed::Fast),
        "medium" => Ok(MovementSpeed::Medium),
        "slow" => Ok(MovementSpeed::Slow),
        _ => Err(format!("unknown speed {s:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args() {
        let cli = Cli::try_parse_from(["sequence_clicker", "run", "seq.json", "--loops", "3", "--validate", "-v"]).unwrap();
        assert!(cli.verbose);
        let Command::Run(args) = cli.command else { panic!("expected run") };
        assert_eq!(args.sequence, PathBuf::from("seq.json"));
        assert_eq!(args.loops, Some(3));
        assert!(args.validate);
        assert!(!args.forever);
        assert!(args.settings.is_none());
    }

    #[test]
    fn test_loops_conflicts_with_forever() {
        assert!(Cli::try_parse_from(["sequence_clicker", "run", "s.json", "--loops", "2", "--forever"]).is_err());
    }

    #[test]
    fn test_record_defaults() {
        let cli = Cli::try_parse_from(["sequence_clicker", "record", "--output", "out.json"]).unwrap();
        let Command::Record(args) = cli.command else { panic!("expected record") };
        assert_eq!(args.seconds, 10);
        assert_eq!(args.output, PathBuf::from("out.json"));
    }

    #[test]
    fn test_play_speed() {
        let cli = Cli::try_parse_from(["sequence_clicker", "play", "r.json", "--speed", "2.5"]).unwrap();
        let Command::Play(args) = cli.command else { panic!("expected play") };
        assert_eq!(args.speed, 2.5);
    }

    #[test]
    fn test_click_args() {
        let cli = Cli::try_parse_from([
            "sequence_clicker", "click", "--interval-ms", "250", "--deviation-ms", "40",
            "--area", "10, 20,300,200", "--click-type", "Double", "--speed", "slow",
        ])
        .unwrap();
        let Command::Click(args) = cli.command else { panic!("expected click") };
        assert_eq!(args.area, Some(Rect::new(10, 20, 300, 200)));
        assert_eq!(args.click_type, ClickType::Double);
        assert_eq!(args.speed, MovementSpeed::Slow);

        let seq = args.to_sequence().unwrap();
        assert_eq!(seq.steps[0].delay_ms, 250);
        assert_eq!(seq.steps[0].deviation_ms, 40);
        assert_eq!(seq.steps[0].click_area, Rect::new(10, 20, 300, 200));
    }

    #[test]
    fn test_click_defaults_and_interval_floor() {
        let cli = Cli::try_parse_from(["sequence_clicker", "click"]).unwrap();
        let Command::Click(args) = cli.command else { panic!("expected click") };
        assert_eq!(args.interval_ms, 1000);
        assert_eq!(args.click_type, ClickType::Left);
        assert!(args.area.is_none());
        assert!(args.to_sequence().is_ok());

        let cli = Cli::try_parse_from(["sequence_clicker", "click", "--interval-ms", "99"]).unwrap();
        let Command::Click(args) = cli.command else { panic!("expected click") };
        assert_eq!(args.to_sequence(), Err(ConfigError::IntervalTooShort { interval: 99, min: 100 }));
    }

    #[test]
    fn test_click_rejects_bad_values() {
        assert!(Cli::try_parse_from(["sequence_clicker", "click", "--area", "1,2,3"]).is_err());
        assert!(Cli::try_parse_from(["sequence_clicker", "click", "--area", "1,2,x,4"]).is_err());
        assert!(Cli::try_parse_from(["sequence_clicker", "click", "--click-type", "triple"]).is_err());
        assert!(Cli::try_parse_from(["sequence_clicker", "click", "--speed", "custom"]).is_err());
    }
}
