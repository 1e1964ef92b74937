use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use libdieroll::{Orchestrator, RelaunchPolicy, RenderFrame, SimConfig, TriggerOutcome};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Headless driver for the physical die
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON simulation config; missing keys keep their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of rolls
    #[arg(short = 'n', long, default_value_t = 1, value_parser = parse_count)]
    rolls: usize,

    /// Longest time to wait for touchdown, in seconds
    #[arg(short, long, default_value_t = 8.0, value_parser = parse_seconds)]
    time: f32,

    /// Time to keep simulating after touchdown, in seconds
    #[arg(long, default_value_t = 2.0, value_parser = parse_non_negative)]
    settle: f32,

    /// Frames per second
    #[arg(long, default_value_t = 60.0, value_parser = parse_seconds)]
    fps: f32,

    /// Seed for reproducible rolls
    #[arg(long)]
    seed: Option<u64>,

    /// Re-launch on every frame while rolling
    #[arg(long)]
    every_frame: bool,

    /// Mass of the die, overrides the config file
    #[arg(long)]
    mass: Option<f32>,

    /// Output format: text, json, csv
    #[arg(short, long, default_value = "text", value_parser = ["text", "json", "csv"])]
    output: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LabelReport {
    label: String,
    position: [f32; 3],
    normal: [f32; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RollReport {
    roll: usize,
    launched: bool,
    touchdown_time: Option<f32>,
    frames: u64,
    position: [f32; 3],
    /// w, i, j, k
    orientation: [f32; 4],
    labels: Vec<LabelReport>,
}

fn parse_count(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be greater than 0".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("invalid count: {}", s)),
    }
}

fn parse_seconds(s: &str) -> Result<f32, String> {
    match s.parse::<f32>() {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
        Ok(v) => Err(format!("must be greater than 0, got {}", v)),
        Err(_) => Err(format!("invalid number: {}", s)),
    }
}

fn parse_non_negative(s: &str) -> Result<f32, String> {
    match s.parse::<f32>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        Ok(v) => Err(format!("must not be negative, got {}", v)),
        Err(_) => Err(format!("invalid number: {}", s)),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SimConfig> {
    let Some(path) = path else {
        return Ok(SimConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

/// Config file plus command-line overrides, validated.
fn build_config(args: &Args) -> anyhow::Result<SimConfig> {
    let mut config = load_config(args.config.as_deref())?;
    if args.every_frame {
        config.roll.relaunch = RelaunchPolicy::EveryFrame;
    }
    if let Some(mass) = args.mass {
        config.die.mass = mass;
    }
    config.validate().context("invalid simulation config")?;
    Ok(config)
}

fn report(
    roll: usize,
    launched: bool,
    touchdown_time: Option<f32>,
    frames: u64,
    frame: &RenderFrame,
) -> RollReport {
    let p = frame.position;
    let q = frame.orientation.quaternion();
    RollReport {
        roll,
        launched,
        touchdown_time,
        frames,
        position: [p.x, p.y, p.z],
        orientation: [q.w, q.i, q.j, q.k],
        labels: frame
            .labels
            .iter()
            .map(|l| LabelReport {
                label: l.label.to_string(),
                position: [l.position.x, l.position.y, l.position.z],
                normal: [l.normal.x, l.normal.y, l.normal.z],
            })
            .collect(),
    }
}

fn run_simulation(args: &Args, config: &SimConfig) -> anyhow::Result<Vec<RollReport>> {
    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut orch = Orchestrator::with_rng(config, rng)?;
    let dt = 1.0 / args.fps;
    let max_frames = (args.time / dt).ceil() as u64;
    let settle_frames = (args.settle / dt).ceil() as u64;

    let mut reports = Vec::with_capacity(args.rolls);
    for roll in 1..=args.rolls {
        let launched = matches!(orch.press_roll(), TriggerOutcome::Launched(_));
        if !launched {
            warn!("roll {}: die still rolling from the previous roll", roll);
        }

        let start = orch.world().elapsed();
        let mut frames = 0;
        let mut touchdown_time = None;
        while orch.is_rolling() && frames < max_frames {
            let frame = orch.frame(dt);
            frames += 1;
            if !frame.is_rolling {
                touchdown_time = Some(frame.time - start);
            }
        }
        match touchdown_time {
            Some(t) => info!("roll {}: touchdown after {:.3}s", roll, t),
            None => warn!("roll {}: no touchdown within {}s", roll, args.time),
        }

        for _ in 0..settle_frames {
            orch.frame(dt);
        }
        frames += settle_frames;

        reports.push(report(roll, launched, touchdown_time, frames, &orch.snapshot()));
    }

    Ok(reports)
}

fn format_output(results: &[RollReport], output_format: &str) -> anyhow::Result<String> {
    match output_format {
        "text" => {
            let mut output = String::new();
            for r in results {
                let touchdown = match r.touchdown_time {
                    Some(t) => format!("touchdown after {:.3}s", t),
                    None => "no touchdown".to_string(),
                };
                output.push_str(&format!(
                    "Roll {}: {}, {} frames, rest at ({:.3}, {:.3}, {:.3})\n",
                    r.roll, touchdown, r.frames, r.position[0], r.position[1], r.position[2]
                ));
            }
            Ok(output)
        }
        "json" => {
            if results.len() == 1 {
                Ok(serde_json::to_string_pretty(&results[0])?)
            } else {
                Ok(serde_json::to_string_pretty(results)?)
            }
        }
        "csv" => {
            let mut output = String::from("Roll,Launched,Touchdown,Frames,X,Y,Z,Qw,Qi,Qj,Qk\n");
            for r in results {
                let touchdown = r.touchdown_time.map(|t| t.to_string()).unwrap_or_default();
                let [x, y, z] = r.position;
                let [w, i, j, k] = r.orientation;
                output.push_str(&format!(
                    "{},{},{},{},{},{},{},{},{},{},{}\n",
                    r.roll, r.launched, touchdown, r.frames, x, y, z, w, i, j, k
                ));
            }
            Ok(output)
        }
        other => anyhow::bail!("invalid output format: {}", other),
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = build_config(&args)?;
    info!(
        "rolling {} time(s) at {} fps, relaunch {:?}",
        args.rolls, args.fps, config.roll.relaunch
    );

    let results = run_simulation(&args, &config)?;
    println!("{}", format_output(&results, &args.output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["dieroll"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).expect("valid arguments")
    }

    fn sample_report() -> RollReport {
        RollReport {
            roll: 1,
            launched: true,
            touchdown_time: Some(1.25),
            frames: 195,
            position: [0.5, -1.0, 0.25],
            orientation: [1.0, 0.0, 0.0, 0.0],
            labels: vec![LabelReport {
                label: "Play".to_string(),
                position: [1.51, -1.0, 0.25],
                normal: [1.0, 0.0, 0.0],
            }],
        }
    }

    #[test]
    fn test_args_defaults() {
        let a = args(&[]);
        assert_eq!(a.rolls, 1);
        assert_eq!(a.time, 8.0);
        assert_eq!(a.settle, 2.0);
        assert_eq!(a.fps, 60.0);
        assert_eq!(a.output, "text");
        assert!(a.seed.is_none());
        assert!(!a.every_frame);
    }

    #[test]
    fn test_args_reject_bad_values() {
        assert!(Args::try_parse_from(["dieroll", "--rolls", "0"]).is_err());
        assert!(Args::try_parse_from(["dieroll", "--fps", "0"]).is_err());
        assert!(Args::try_parse_from(["dieroll", "--time", "-1"]).is_err());
        assert!(Args::try_parse_from(["dieroll", "--settle", "-0.5"]).is_err());
        assert!(Args::try_parse_from(["dieroll", "--output", "xml"]).is_err());
    }

    #[test]
    fn test_build_config_applies_overrides() {
        let config = build_config(&args(&["--every-frame", "--mass", "2.5"])).expect("config");
        assert_eq!(config.roll.relaunch, RelaunchPolicy::EveryFrame);
        assert_eq!(config.die.mass, 2.5);
    }

    #[test]
    fn test_build_config_rejects_non_positive_mass() {
        let err = build_config(&args(&["--mass", "0"])).unwrap_err();
        assert!(format!("{:#}", err).contains("mass"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Some(Path::new("/nonexistent/dieroll.json"))).unwrap_err();
        assert!(err.to_string().contains("reading config"));
    }

    #[test]
    fn test_run_simulation_touches_down() {
        let a = args(&["--seed", "17", "--rolls", "3", "--settle", "1"]);
        let config = build_config(&a).expect("config");
        let results = run_simulation(&a, &config).expect("simulation");
        assert_eq!(results.len(), 3);
        for (i, r) in results.iter().enumerate() {
            assert_eq!(r.roll, i + 1);
            assert!(r.launched);
            let t = r.touchdown_time.expect("touchdown");
            assert!(t > 0.0 && t < 2.0);
            assert!(r.position.iter().all(|c| c.is_finite()));
            assert_eq!(r.labels.len(), 6);
        }
    }

    #[test]
    fn test_run_simulation_is_reproducible_with_seed() {
        let a = args(&["--seed", "99", "--settle", "0.5"]);
        let config = build_config(&a).expect("config");
        let first = run_simulation(&a, &config).expect("simulation");
        let second = run_simulation(&a, &config).expect("simulation");
        assert_eq!(first[0].position, second[0].position);
        assert_eq!(first[0].orientation, second[0].orientation);
    }

    #[test]
    fn test_every_frame_mode_never_touches_down() {
        let a = args(&[
            "--seed", "3", "--every-frame", "--time", "1", "--rolls", "2", "--settle", "0",
        ]);
        let config = build_config(&a).expect("config");
        let results = run_simulation(&a, &config).expect("simulation");
        assert!(results[0].launched);
        assert!(results[0].touchdown_time.is_none());
        // still rolling, so the second press is ignored
        assert!(!results[1].launched);
    }

    #[test]
    fn test_format_output_text() {
        let output = format_output(&[sample_report()], "text").unwrap();
        assert!(output.contains("Roll 1: touchdown after 1.250s"));
        assert!(output.contains("195 frames"));
        assert!(output.contains("(0.500, -1.000, 0.250)"));
    }

    #[test]
    fn test_format_output_json() {
        let output = format_output(&[sample_report()], "json").unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["roll"], 1);
        assert_eq!(parsed["frames"], 195);
        assert_eq!(parsed["labels"][0]["label"], "Play");

        let many = format_output(&[sample_report(), sample_report()], "json").unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&many).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_format_output_csv() {
        let mut missed = sample_report();
        missed.roll = 2;
        missed.touchdown_time = None;
        let output = format_output(&[sample_report(), missed], "csv").unwrap();
        assert!(output.starts_with("Roll,Launched,Touchdown,Frames,X,Y,Z,Qw,Qi,Qj,Qk\n"));
        assert!(output.contains("1,true,1.25,195,0.5,-1,0.25,1,0,0,0"));
        assert!(output.contains("2,true,,195,"));
    }

    #[test]
    fn test_format_output_invalid_format() {
        assert!(format_output(&[sample_report()], "invalid").is_err());
    }
}
