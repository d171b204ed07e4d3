//! Realtime playback of a song through the default (or named) audio device.

use super::common::load_song;
use cadence_engine::Renderer;
use cadence_song::validate_song;
use clap::Args;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Args)]
pub struct PlayArgs {
    /// Song file to play (.json or .toml)
    #[arg(value_name = "SONG")]
    input: PathBuf,

    /// Output device (exact name, or substring match)
    #[arg(short, long)]
    output: Option<String>,

    /// Number of extra times to repeat the loop region (omit to loop forever)
    #[arg(long)]
    loop_count: Option<u32>,
}

fn find_output_device(host: &cpal::Host, name: Option<&str>) -> anyhow::Result<cpal::Device> {
    match name {
        Some(search) => {
            let search_lower = search.to_lowercase();
            for device in host.output_devices()? {
                if let Ok(dev_name) = device.name()
                    && dev_name.to_lowercase().contains(&search_lower)
                {
                    return Ok(device);
                }
            }
            anyhow::bail!("no output device matching '{search}'")
        }
        None => host
            .default_output_device()
            .ok_or_else(|| anyhow::anyhow!("no default output device available")),
    }
}

pub fn run(args: PlayArgs) -> anyhow::Result<()> {
    let mut song = load_song(&args.input)?;
    if let Some(n) = args.loop_count {
        song.loop_repeat_count = Some(n);
    }
    if let Err(errors) = validate_song(&song) {
        for err in &errors {
            tracing::error!(%err, "song validation failed");
        }
        anyhow::bail!("song failed validation with {} error(s)", errors.len());
    }

    let host = cpal::default_host();
    let device = find_output_device(&host, args.output.as_deref())?;
    let device_name = device.name().unwrap_or_else(|_| "<unknown>".to_string());
    let config = device.default_output_config()?;
    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;

    println!("Playing {} on '{device_name}' at {sample_rate} Hz", args.input.display());

    let mut renderer = Renderer::new(song, sample_rate as f32);
    renderer.play();

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        println!("\nStopping...");
        r.store(false, Ordering::SeqCst);
    })?;

    let renderer = Arc::new(Mutex::new(renderer));
    let render_running = Arc::clone(&running);
    let render_handle = Arc::clone(&renderer);

    let mut scratch_l = vec![0.0f32; 4096];
    let mut scratch_r = vec![0.0f32; 4096];

    let stream = device.build_output_stream(
        &config.into(),
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            if !render_running.load(Ordering::Relaxed) {
                data.fill(0.0);
                return;
            }
            let frames = data.len() / channels;
            if frames > scratch_l.len() {
                scratch_l.resize(frames, 0.0);
                scratch_r.resize(frames, 0.0);
            }
            let mut renderer = render_handle.lock().unwrap();
            renderer.render(&mut scratch_l[..frames], &mut scratch_r[..frames], frames, true);
            if renderer.is_finished() {
                render_running.store(false, Ordering::Relaxed);
            }
            for i in 0..frames {
                let idx = i * channels;
                data[idx] = scratch_l[i];
                if channels > 1 {
                    data[idx + 1] = scratch_r[i];
                }
                for c in 2..channels {
                    data[idx + c] = 0.0;
                }
            }
        },
        move |err| tracing::error!(%err, "output stream error"),
        None,
    )?;
    stream.play()?;

    while running.load(Ordering::Relaxed) {
        std::thread::sleep(std::time::Duration::from_millis(50));
    }

    println!("Done!");
    Ok(())
}
