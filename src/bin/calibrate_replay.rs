use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

use pose_coach::calibration::{CalibrationSequencer, CapturePhase, SequencerEvent};
use pose_coach::config::Config;
use pose_coach::replay;

const CONFIG_PATH: &str = "config.toml";

/// 記録済みの姿勢ストリームでキャリブレーションを再生する
#[derive(Parser, Debug)]
#[command(name = "calibrate_replay", version = env!("GIT_VERSION"))]
struct Args {
    /// JSON lines の姿勢ファイル
    poses: PathBuf,
    /// 設定ファイル
    #[arg(short, long, default_value = CONFIG_PATH)]
    config: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = Config::load_or_default(&args.config);

    println!("=== Calibration Replay ===");
    println!("Poses: {}", args.poses.display());
    println!("Hold: {}s, threshold={}, cutoff={}, min_shared={}",
        config.hold.duration_secs, config.hold.similarity_threshold,
        config.hold.confidence_cutoff, config.hold.min_shared_joints);
    println!("Countdown: start={}s, exercise={}s",
        config.calibration.start_countdown_secs, config.calibration.exercise_countdown_secs);
    println!();

    let base = Instant::now();
    let frames = replay::load_frames(&args.poses, base)?;
    println!("{} frames loaded", frames.len());

    let mut sequencer = CalibrationSequencer::from_config(&config);
    let events = replay::run(&mut sequencer, &frames, base);

    let mut completed = None;
    for (at, event) in events {
        let t = at.duration_since(base).as_secs_f32();
        match event {
            SequencerEvent::Instruction(instruction) => println!("[{:6.2}s] {}", t, instruction),
            SequencerEvent::Countdown { remaining } => println!("[{:6.2}s]   {}...", t, remaining),
            SequencerEvent::Captured { phase, pose } => {
                let label = match phase {
                    CapturePhase::Start => "start",
                    CapturePhase::End => "end",
                };
                println!("[{:6.2}s]   captured {} pose ({} joints, avg conf {:.2})",
                    t, label, pose.len(), pose.average_confidence());
            }
            SequencerEvent::PoseSignalLost => println!("[{:6.2}s]   (no pose)", t),
            SequencerEvent::PoseSignalRestored => println!("[{:6.2}s]   (pose restored)", t),
            SequencerEvent::Completed(pair) => completed = Some(pair),
            SequencerEvent::StateChanged { .. } | SequencerEvent::Cancelled => {}
        }
    }
    println!();

    let Some(pair) = completed else {
        println!("Calibration did not complete (state: {:?})", sequencer.state());
        return Ok(());
    };

    match pair.range_of_motion(config.hold.confidence_cutoff) {
        Some(rom) if !rom.is_empty() => {
            println!("Range of motion:");
            for d in rom.iter() {
                println!("  {:<15} dx={:+.3} dy={:+.3} |d|={:.3}", d.joint, d.dx, d.dy, d.distance);
            }
            if let Some(largest) = rom.largest() {
                println!("Largest: {} ({:.3})", largest.joint, largest.distance);
            }
        }
        _ => println!("Range of motion: no joints tracked in both poses"),
    }

    Ok(())
}
