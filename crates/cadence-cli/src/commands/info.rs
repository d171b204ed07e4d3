//! Print summary information about a song file.

use super::common::load_song;
use cadence_engine::Renderer;
use cadence_song::validate_song;
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct InfoArgs {
    /// Song file to inspect (.json or .toml)
    #[arg(value_name = "SONG")]
    input: PathBuf,
}

pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let song = load_song(&args.input)?;

    println!("{}", args.input.display());
    println!("  bars:            {}", song.bar_count);
    println!(
        "  time signature:  {} beats/bar, {} parts/beat, {} ticks/part",
        song.beats_per_bar, song.parts_per_beat, song.ticks_per_part
    );
    println!("  tempo:           {:.1} bpm", song.tempo_bpm);
    println!("  key:             pitch class {}, octave {}", song.key.pitch_class, song.key.octave);
    println!("  channels:        {}", song.channels.len());
    println!(
        "  loop region:     bars [{}, {}) repeat_count={:?}",
        song.loop_start,
        song.loop_start + song.loop_length,
        song.loop_repeat_count
    );

    match validate_song(&song) {
        Ok(()) => println!("  validation:      ok"),
        Err(errors) => {
            println!("  validation:      {} error(s)", errors.len());
            for err in &errors {
                println!("    - {err}");
            }
        }
    }

    let renderer = Renderer::new(song.clone(), 44100.0);
    match renderer.get_total_samples(true, true, song.loop_repeat_count) {
        Some(samples) => println!("  duration:        {:.2}s ({} samples @ 44100 Hz)", samples as f64 / 44100.0, samples),
        None => println!("  duration:        infinite (no loop_repeat_count set)"),
    }

    Ok(())
}
