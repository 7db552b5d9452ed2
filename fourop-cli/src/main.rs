//! fourop CLI — real-time player for the four-operator FM engine.
//!
//! Plays the startup patch (a sine carrier frequency-modulated by a second
//! sine an octave up) on the default output device. Keyboard-to-note glue
//! belongs to a UI layer; here the note is a `--freq=` argument.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use fourop_engine::{
    ModSet, OperatorConfig, Patch, SourceStrategy, SynthController, SynthEngine, WaveType,
    BUFFER_SIZE,
};
use std::error::Error;
use std::time::Duration;

#[derive(Debug, Default)]
struct Args {
    list_devices: bool,
    device_name: Option<String>,
    sample_rate: Option<u32>,
    channels: Option<u16>,
    duration_sec: Option<u64>,
    freq: Option<f32>,
    wavetable: bool,
}

fn parse_args() -> Args {
    let mut a = Args::default();
    for s in std::env::args().skip(1) {
        if s == "--list-devices" { a.list_devices = true; continue; }
        if s == "--wavetable"    { a.wavetable = true;    continue; }
        if let Some(rest) = s.strip_prefix("--device=")      { a.device_name = Some(rest.to_string()); continue; }
        if let Some(rest) = s.strip_prefix("--sample-rate=") { a.sample_rate = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--channels=")    { a.channels    = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--duration=")    { a.duration_sec= rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--freq=")        { a.freq        = rest.parse().ok();      continue; }
        eprintln!("[warn] unknown arg: {s}");
    }
    a
}

fn list_output_devices() -> Result<(), Box<dyn Error>> {
    let host = cpal::default_host();
    println!("Available output devices:");
    for dev in host.output_devices()? {
        println!("- {}", dev.name()?);
    }
    Ok(())
}

fn pick_device(args: &Args) -> Result<cpal::Device, Box<dyn Error>> {
    let host = cpal::default_host();
    if let Some(name) = &args.device_name {
        for d in host.output_devices()? {
            if d.name()? == *name { return Ok(d); }
        }
        return Err(format!("requested device not found: {name}").into());
    }
    host.default_output_device()
        .ok_or_else(|| "no default output device".into())
}

fn choose_config(
    device: &cpal::Device,
    req_sr: Option<u32>,
    req_ch: Option<u16>,
) -> Result<cpal::SupportedStreamConfig, Box<dyn Error>> {
    // If nothing requested, default is already concrete.
    if req_sr.is_none() && req_ch.is_none() {
        return Ok(device.default_output_config()?);
    }

    // Pick a SupportedStreamConfigRange first.
    let mut best: Option<(u64, cpal::SupportedStreamConfigRange)> = None;
    for range in device.supported_output_configs()? {
        let ch     = range.channels();
        let sr_min = range.min_sample_rate().0;
        let sr_max = range.max_sample_rate().0;

        let ch_pen = match req_ch { Some(c) => (i64::from(ch) - i64::from(c)).unsigned_abs(), None => 0 };
        let sr_pen = match req_sr {
            Some(sr) => if (sr_min..=sr_max).contains(&sr) { 0 } else { u64::from(sr_min.abs_diff(sr).min(sr_max.abs_diff(sr))) },
            None => 0,
        };

        let score = sr_pen.saturating_mul(1000) + ch_pen;
        if best.as_ref().map(|(s, _)| *s).map_or(true, |s| score < s) {
            best = Some((score, range));
        }
    }

    let (_, range) = best.ok_or_else(|| "no supported output configs".to_string())?;

    // Choose a concrete sample rate and convert the range into a concrete config.
    let pick_sr = match req_sr {
        Some(sr) => {
            let lo = range.min_sample_rate().0;
            let hi = range.max_sample_rate().0;
            cpal::SampleRate(sr.clamp(lo, hi))
        }
        None => range.max_sample_rate(),
    };

    Ok(range.with_sample_rate(pick_sr))
}

/// The original program's startup patch: operator 3 is the sine carrier
/// (ratio 1.0, amp 0.3), modulated by operator 2 (sine, ratio 2.0, amp 5.0).
fn startup_patch(strategy: SourceStrategy) -> Patch {
    let mut patch = Patch::default();
    patch.carrier = 3;
    patch.ops[3] = OperatorConfig {
        wave: WaveType::Sine,
        strategy,
        freq: 1.0,
        amp: 0.3,
        mods: ModSet::from_indices(&[2]).expect("static wiring"),
        ..OperatorConfig::default()
    };
    patch.ops[2] = OperatorConfig {
        wave: WaveType::Sine,
        strategy,
        freq: 2.0,
        amp: 5.0,
        ..OperatorConfig::default()
    };
    patch
}

/// Generic stream: pull one mono sample per frame and duplicate it across
/// channels, converting through f32.
fn build_stream<T>(
    device: &cpal::Device,
    cfg: &cpal::StreamConfig,
    mut engine: SynthEngine,
    err_fn: impl Fn(cpal::StreamError) + Send + 'static,
) -> Result<cpal::Stream, Box<dyn Error>>
where
    T: cpal::Sample + cpal::FromSample<f32> + cpal::SizedSample + Send + 'static,
{
    let channels = cfg.channels as usize;

    let stream = device.build_output_stream(
        cfg,
        move |output: &mut [T], _| {
            for frame in output.chunks_mut(channels) {
                let s = engine.next_sample().clamp(-1.0, 1.0);
                let v: T = T::from_sample(s);
                for ch in frame.iter_mut() { *ch = v; }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

/// i16 stream: exercise the engine's PCM path. The mono scratch buffer is
/// allocated here, once; the callback only slices it.
fn build_stream_i16(
    device: &cpal::Device,
    cfg: &cpal::StreamConfig,
    mut engine: SynthEngine,
    err_fn: impl Fn(cpal::StreamError) + Send + 'static,
) -> Result<cpal::Stream, Box<dyn Error>> {
    let channels = cfg.channels as usize;
    let mut scratch = vec![0i16; BUFFER_SIZE];

    let stream = device.build_output_stream(
        cfg,
        move |output: &mut [i16], _| {
            let frames = output.len() / channels;
            let mut done = 0;
            while done < frames {
                let n = (frames - done).min(scratch.len());
                let mono = &mut scratch[..n];
                engine.fill_buffer(mono);
                for (i, &s) in mono.iter().enumerate() {
                    let at = (done + i) * channels;
                    for ch in output[at..at + channels].iter_mut() { *ch = s; }
                }
                done += n;
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

fn print_status(controller: &SynthController) {
    println!(
        "{}  | {:.2} Hz | {}%",
        controller.carrier_wave().name(),
        controller.base_frequency(),
        (controller.carrier_amp() * 100.0) as i32
    );
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = parse_args();

    if args.list_devices {
        list_output_devices()?;
        return Ok(());
    }

    println!("fourop-cli — real-time FM synth player\n");

    let device  = pick_device(&args)?;
    let sup_cfg = choose_config(&device, args.sample_rate, args.channels)?;
    let sample_format = sup_cfg.sample_format();
    let mut cfg = sup_cfg.config();

    if let Some(sr) = args.sample_rate { cfg.sample_rate = cpal::SampleRate(sr); }
    if let Some(ch) = args.channels    { cfg.channels    = ch; }

    let strategy = if args.wavetable { SourceStrategy::Wavetable } else { SourceStrategy::Formula };
    let sr_f32 = cfg.sample_rate.0 as f32;
    let (engine, controller) = SynthEngine::new(sr_f32, &startup_patch(strategy))?;

    controller.set_base_frequency(args.freq.unwrap_or(440.0));

    println!("Using device: {}", device.name()?);
    println!("Stream config: {:?} (sample_format: {:?})", cfg, sample_format);
    if let Some(d) = args.duration_sec { println!("Auto-stop after {d} seconds"); }
    print_status(&controller);
    println!("Press Ctrl+C to stop…\n");

    let err_fn = |e: cpal::StreamError| eprintln!("[cpal] stream error: {e}");

    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &cfg, engine, err_fn)?,
        cpal::SampleFormat::I16 => build_stream_i16(&device, &cfg, engine, err_fn)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &cfg, engine, err_fn)?,
        other => return Err(format!("unsupported device sample format: {other:?}").into()),
    };

    stream.play()?;
    controller.set_enabled(true);

    if let Some(d) = args.duration_sec {
        std::thread::sleep(Duration::from_secs(d));
        controller.set_enabled(false);
        return Ok(());
    }

    loop { std::thread::sleep(Duration::from_millis(500)); }
}
