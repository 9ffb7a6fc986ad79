use clap::Parser;
use gesture_coach::sources::parse_recording;
use std::path::PathBuf;

/// Check a recorded keypoint stream before feeding it to a session.
#[derive(Parser, Debug)]
#[command(name = "frame_probe")]
struct Args {
    recording: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    println!("Probing {}...\n", args.recording.display());

    let content = std::fs::read_to_string(&args.recording)?;
    let frames = match parse_recording(&content) {
        Ok(frames) => {
            println!("✓ Parsed {} frames", frames.len());
            frames
        }
        Err(e) => {
            println!("✗ {}", e);
            return Ok(());
        }
    };

    let mut hands_per_frame = [0usize; 3];
    let mut unusable_hands = 0;
    let mut faces = 0;
    let mut faces_without_eyes = 0;

    for frame in &frames {
        hands_per_frame[frame.hands.len().min(2)] += 1;
        unusable_hands += frame
            .hands
            .iter()
            .filter(|h| h.composite_point().is_none())
            .count();
        if let Some(face) = &frame.face {
            faces += 1;
            if face.eyes().is_none() {
                faces_without_eyes += 1;
            }
        }
    }

    let span_ms = match (frames.first(), frames.last()) {
        (Some(first), Some(last)) => last.t_ms.saturating_sub(first.t_ms),
        _ => 0,
    };

    println!("  Duration: {:.1}s", span_ms as f64 / 1000.0);
    println!(
        "  Frames with 0 / 1 / 2+ hands: {} / {} / {}",
        hands_per_frame[0], hands_per_frame[1], hands_per_frame[2]
    );
    println!("  Hands missing palm landmarks: {}", unusable_hands);
    println!("  Frames with a face: {} ({} without both eyes)", faces, faces_without_eyes);

    if frames.windows(2).any(|w| w[1].t_ms < w[0].t_ms) {
        println!("✗ Timestamps go backwards; replay will skip the late frames");
    }

    Ok(())
}
