//! Render a song to a WAV file.

use super::common::load_song;
use cadence_engine::Renderer;
use cadence_song::validate_song;
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct RenderArgs {
    /// Song file to render (.json or .toml)
    #[arg(value_name = "SONG")]
    input: PathBuf,

    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Sample rate in Hz
    #[arg(long, default_value = "44100")]
    sample_rate: u32,

    /// Number of extra times to repeat the loop region (0 = play through once)
    #[arg(long)]
    loop_count: Option<u32>,

    /// Skip the intro bars (everything before the loop region)
    #[arg(long)]
    skip_intro: bool,

    /// Skip the outro bars (everything after the loop region)
    #[arg(long)]
    skip_outro: bool,

    /// Output bit depth (16, 24, or 32)
    #[arg(long, default_value = "16")]
    bit_depth: u16,

    /// Render block size in frames
    #[arg(long, default_value = "1024")]
    block_size: usize,
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    let song = load_song(&args.input)?;
    if let Err(errors) = validate_song(&song) {
        for err in &errors {
            tracing::error!(%err, "song validation failed");
        }
        anyhow::bail!("song failed validation with {} error(s)", errors.len());
    }

    let sample_rate = args.sample_rate as f32;
    let mut renderer = Renderer::new(song, sample_rate);
    renderer.play();

    let total_samples = renderer
        .get_total_samples(!args.skip_intro, !args.skip_outro, args.loop_count)
        .ok_or_else(|| anyhow::anyhow!("song loops forever (no loop_repeat_count set); pass --loop-count"))?;

    tracing::info!(total_samples, sample_rate = args.sample_rate, "rendering");

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: args.sample_rate,
        bits_per_sample: args.bit_depth,
        sample_format: if args.bit_depth == 32 {
            hound::SampleFormat::Float
        } else {
            hound::SampleFormat::Int
        },
    };
    let mut writer = hound::WavWriter::create(&args.output, spec)?;

    let mut remaining = total_samples;
    let mut out_l = vec![0.0f32; args.block_size];
    let mut out_r = vec![0.0f32; args.block_size];
    let max_int = (1i32 << (args.bit_depth - 1)) as f32;

    while remaining > 0 {
        let frames = remaining.min(args.block_size as u64) as usize;
        renderer.render(&mut out_l[..frames], &mut out_r[..frames], frames, true);
        for i in 0..frames {
            if args.bit_depth == 32 {
                writer.write_sample(out_l[i])?;
                writer.write_sample(out_r[i])?;
            } else {
                writer.write_sample((out_l[i] * max_int).clamp(-max_int, max_int - 1.0) as i32)?;
                writer.write_sample((out_r[i] * max_int).clamp(-max_int, max_int - 1.0) as i32)?;
            }
        }
        remaining -= frames as u64;
    }

    writer.finalize()?;
    println!("Wrote {} frames to {}", total_samples, args.output.display());
    Ok(())
}
