use clap::Parser;
use gbcore::error::EmulatorError;
use gbcore::Emulator;
use std::path::PathBuf;
use std::process::ExitCode;

/// Headless Game Boy core: loads a ROM and runs it, no window attached.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the Game Boy ROM image to run.
    rom_path: PathBuf,
}

fn main() -> ExitCode {
    env_logger::init();

    let args = Args::try_parse().unwrap_or_else(|e| {
        eprintln!("{e}");
        std::process::exit(EmulatorError::BadUsage(e.to_string()).exit_code());
    });

    match run(&args.rom_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn run(rom_path: &PathBuf) -> Result<(), EmulatorError> {
    let rom_data = std::fs::read(rom_path).map_err(|e| EmulatorError::RomLoadFail {
        path: rom_path.display().to_string(),
        reason: e.to_string(),
    })?;

    log::info!("loaded ROM {} ({} bytes)", rom_path.display(), rom_data.len());

    let mut emulator = Emulator::new(true);
    emulator.load_rom(&rom_data)?;

    while emulator.running() {
        emulator.run_frame()?;
        if emulator.take_frame_ready() {
            log::trace!("frame ready");
        }
    }

    Ok(())
}
