//! chime - minimal polyphonic synthesizer

use std::io::Write;
use std::path::Path;

use anyhow::{bail, Result};
use chime::config::{self, ChimeConfig};
use chime::engine::{default_device_name, list_output_devices, CpalPlatform, Player, Recorder};
use chime::gate::{AudioContextGate, OfflinePlatform};
use chime::input::terminal::TerminalInput;
use chime::input::{Interaction, InteractionBus, KeySession, KeyboardLayout, SessionEvent};
use chime::synth::{Note, VoiceManager, RELEASE_TIME};
use clap::Parser;

mod cli;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play { config: config_path } => {
            let cfg = config::load_or_default(&config_path)?;

            let platform = CpalPlatform::new(cfg.audio.device.clone());
            let bus = InteractionBus::new();
            let gate = AudioContextGate::arm(&platform, &bus)?;

            println!("Press any key or click to start audio (Esc quits)");

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(play(cfg, gate, bus))?;
        }

        Commands::Record {
            config: config_path,
            output,
            notes,
            length,
        } => {
            let cfg = config::load_or_default(&config_path)?;

            let notes = notes
                .split_whitespace()
                .map(str::parse)
                .collect::<Result<Vec<Note>, _>>()?;
            if notes.is_empty() {
                bail!("No notes to record");
            }
            if length.is_nan() || length <= 0.0 {
                bail!("Note length must be positive");
            }

            println!("Recording {} notes to {:?}...", notes.len(), output);

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(record(&cfg, &notes, length, &output))?;
        }

        Commands::Devices => {
            println!("Available audio devices:\n");

            match default_device_name() {
                Some(name) => println!("Default output: {}\n", name),
                None => println!("No default output device\n"),
            }

            println!("Output devices:");
            let devices = list_output_devices();
            if devices.is_empty() {
                println!("  (none)");
            }
            for (name, config) in devices {
                println!(
                    "  - {} ({} Hz, {} ch)",
                    name, config.sample_rate.0, config.channels
                );
            }
        }

        Commands::Check { config: config_path } => {
            println!("Checking configuration at {:?}...", config_path);

            match config::load_config(&config_path) {
                Ok(cfg) => {
                    println!("Configuration is valid!");
                    println!("  Sample rate: {} Hz", cfg.audio.sample_rate);
                    println!("  Buffer size: {}", cfg.audio.buffer_size);
                    println!(
                        "  Device: {}",
                        cfg.audio.device.as_deref().unwrap_or("(default)")
                    );
                    println!("  Master volume: {:.0}%", cfg.master.volume * 100.0);
                    println!("  Keyboard octave: {}", cfg.keyboard.octave);
                }
                Err(e) => {
                    println!("Configuration is invalid: {:#}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Init => {
            let example_config = include_str!("../chime.example.yaml");

            let path = "chime.yaml";
            if Path::new(path).exists() {
                println!("chime.yaml already exists. Not overwriting.");
            } else {
                std::fs::write(path, example_config)?;
                println!("Created chime.yaml with example configuration.");
            }
        }
    }

    Ok(())
}

/// Raw mode needs explicit carriage returns
fn status(line: &str) {
    print!("{}\r\n", line);
    let _ = std::io::stdout().flush();
}

async fn play(cfg: ChimeConfig, gate: AudioContextGate, bus: InteractionBus) -> Result<()> {
    let (mut terminal, mut keys) = TerminalInput::start(bus)?;

    let context = gate.ready().await?;

    let mut player = Player::new();
    player.start(context.clone(), cfg.audio.device.as_deref())?;

    let mut synth = VoiceManager::new(context);
    synth.prepare();
    synth.set_volume(cfg.master.volume);

    // Keys pressed while waiting for the gate, including the one that opened it
    let quit = KeySession::discard_pending(&mut keys);

    let mut session = KeySession::new(
        KeyboardLayout::new(cfg.keyboard.octave),
        terminal.reports_releases(),
    );
    status("Audio ready. Keys a-; play, z/x change octave, Esc quits.");
    if !terminal.reports_releases() {
        status("This terminal does not report key releases: press a key again to stop its note.");
    }
    status(&format!("Octave {}", session.layout().octave()));

    if !quit {
        while let Some(input) = keys.recv().await {
            match session.handle(&mut synth, input) {
                SessionEvent::Continue => {}
                SessionEvent::OctaveChanged(octave) => status(&format!("Octave {}", octave)),
                SessionEvent::Quit => break,
            }
        }
    }

    session.release_all(&mut synth);
    tokio::time::sleep(RELEASE_TIME * 2).await;

    player.stop();
    terminal.stop();
    println!("Bye.");
    Ok(())
}

async fn record(cfg: &ChimeConfig, notes: &[Note], length: f64, output: &Path) -> Result<()> {
    let bus = InteractionBus::new();
    let gate = AudioContextGate::arm(&OfflinePlatform::new(cfg.audio.sample_rate), &bus)?;

    // Nobody is listening to an offline render, so open the gate directly
    bus.emit(Interaction::KeyDown);
    let context = gate.ready().await?;

    let mut synth = VoiceManager::new(context.clone());
    synth.prepare();
    synth.set_volume(cfg.master.volume);

    let mut recorder = Recorder::new(output, cfg.audio.sample_rate, cfg.audio.buffer_size)?;

    for note in notes {
        println!("  {} ({:.2} Hz)", note, note.frequency());
        synth.start(note);
        recorder.render(&context, length)?;
        synth.stop(note);
        recorder.render(&context, RELEASE_TIME.as_secs_f64())?;
    }

    let duration = recorder.duration_secs();
    recorder.finalize()?;
    println!("Recorded {:.2}s to {:?}", duration, output);
    Ok(())
}
