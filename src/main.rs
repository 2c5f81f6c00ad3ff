use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use serde::Deserialize;

use range_localizer::filters::track_filter::diagonal_measurement_noise;
use range_localizer::{
    Localizer, LocalizerConfig, MotionBasedLocalizer, PositionTracker, StepInput, TrackFilter,
    TrackFilterConfig, Vec2,
};

#[derive(Parser, Debug)]
#[command(name = "range_localizer")]
#[command(about = "Streaming range + velocity localizer (JSON lines in, JSON lines out)", long_about = None)]
struct Args {
    /// Localizer config (JSON); defaults apply to missing fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Input file of JSON lines (default: stdin)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Disambiguation strategy
    #[arg(long, value_enum, default_value_t = Strategy::Motion)]
    strategy: Strategy,

    /// Known starting position "x,y" (tracking strategy)
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    initial_position: Option<(f64, f64)>,

    /// Anchor position at the starting position "x,y" (tracking strategy)
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    initial_anchor: Option<(f64, f64)>,

    /// Report the resolved candidate without Kalman filtering
    #[arg(long, default_value_t = false)]
    no_filter: bool,

    /// Target acceleration std, both axes (m/s²)
    #[arg(long, default_value = "0.5")]
    accel_std: f64,

    /// Position measurement variance (m²)
    #[arg(long, default_value = "0.1")]
    position_var: f64,

    /// Velocity measurement variance (m²/s²)
    #[arg(long, default_value = "0.001")]
    velocity_var: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Strategy {
    /// Localize on the first heading change
    Motion,
    /// Track from a known initial position
    Tracking,
}

#[derive(Deserialize)]
struct InputLine {
    range: f64,
    velocity: [f64; 2],
    anchor: [f64; 2],
}

fn parse_point(text: &str) -> Result<(f64, f64), String> {
    let (x, y) = text
        .split_once(',')
        .ok_or_else(|| format!("expected \"x,y\", got \"{}\"", text))?;
    let x = x.trim().parse::<f64>().map_err(|e| format!("bad x: {}", e))?;
    let y = y.trim().parse::<f64>().map_err(|e| format!("bad y: {}", e))?;
    Ok((x, y))
}

fn build_localizer(args: &Args, config: LocalizerConfig) -> Result<Box<dyn Localizer>> {
    let filter = if args.no_filter {
        None
    } else {
        let filter_config = TrackFilterConfig::constant_velocity(
            config.dt,
            (args.accel_std, args.accel_std),
            diagonal_measurement_noise(args.position_var, args.velocity_var),
        );
        Some(TrackFilter::new(filter_config)?)
    };

    let localizer: Box<dyn Localizer> = match args.strategy {
        Strategy::Motion => Box::new(MotionBasedLocalizer::new(config, filter)?),
        Strategy::Tracking => {
            let (Some(position), Some(anchor)) = (args.initial_position, args.initial_anchor)
            else {
                bail!("--strategy tracking needs --initial-position and --initial-anchor");
            };
            Box::new(PositionTracker::new(
                config,
                Vec2::new(position.0, position.1),
                Vec2::new(anchor.0, anchor.1),
                filter,
            )?)
        }
    };
    Ok(localizer)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => LocalizerConfig::from_path(path)?,
        None => LocalizerConfig::default(),
    };
    info!(
        "dt={} noisy={} strategy={:?} filter={}",
        config.dt, config.noisy, args.strategy, !args.no_filter
    );

    let mut localizer = build_localizer(&args, config)?;

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };
    let mut out = BufWriter::new(io::stdout().lock());

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading line {}", line_no + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let parsed: InputLine = serde_json::from_str(&line)
            .with_context(|| format!("parsing line {}", line_no + 1))?;

        let input = StepInput::new(
            parsed.range,
            Vec2::new(parsed.velocity[0], parsed.velocity[1]),
            Vec2::new(parsed.anchor[0], parsed.anchor[1]),
        );
        let output = localizer.step(&input);
        serde_json::to_writer(&mut out, &output.snapshot())?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    info!(
        "Done: {} steps, localization index {:?}",
        localizer.steps(),
        localizer.state().localization_index()
    );
    Ok(())
}
