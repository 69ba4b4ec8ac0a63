pub mod cpu;
pub mod error;
pub mod instruction;
pub mod joypad;
pub mod mbc;
pub mod memory_bus;
pub mod memory_map;
pub mod ppu;

use cpu::Cpu;
use error::EmulatorError;
use joypad::Button;
use memory_bus::MemoryBus;
use ppu::Ppu;

/// Standard Game Boy CPU frequency, in Hz.
pub const CPU_FREQ_HZ: f64 = 4_194_304.0;
/// Cycles (T-states) per 59.7 Hz video frame.
pub const CYCLES_PER_FRAME: u32 = 70224;

/// Owns the CPU, PPU, and memory bus, and drives them in lockstep.
///
/// This is the single owned context the rest of the core is built around: no
/// subsystem keeps global/static state, so multiple `Emulator`s can coexist.
pub struct Emulator {
    cpu: Cpu,
    ppu: Ppu,
    memory_bus: MemoryBus,
    running: bool,
    frame_ready: bool,
}

impl Emulator {
    /// Creates a fresh emulator with zeroed RAM and, if `skip_boot_rom` is set,
    /// CPU/IO register state matching the machine immediately after the DMG
    /// boot ROM hands off to the cartridge at `0x0100`.
    pub fn new(skip_boot_rom: bool) -> Self {
        let mut memory_bus = MemoryBus::new();
        let cpu = Cpu::new(skip_boot_rom);
        if skip_boot_rom {
            Cpu::initialize_post_boot_io(&mut memory_bus);
        }
        Emulator {
            cpu,
            ppu: Ppu::new(),
            memory_bus,
            running: true,
            frame_ready: false,
        }
    }

    /// Parses cartridge header bytes and installs the ROM on the bus.
    pub fn load_rom(&mut self, rom_data: &[u8]) -> Result<(), EmulatorError> {
        self.memory_bus.load_rom(rom_data)
    }

    /// Executes a single CPU instruction, advances the PPU by the same number
    /// of T-cycles, and returns the cycle count consumed.
    ///
    /// Within one call, all memory effects of the instruction are fully
    /// ordered before the PPU advances a single dot: the PPU observes bus
    /// state as of the end of the instruction, not mid-instruction.
    pub fn step(&mut self) -> Result<u32, EmulatorError> {
        let cycles = self.cpu.step(&mut self.memory_bus)? as u32;
        self.ppu.step(cycles, &mut self.memory_bus);
        if self.ppu.mode() == 1 && self.ppu.scanline() == ppu::GB_HEIGHT as u8 {
            self.frame_ready = true;
        }
        Ok(cycles)
    }

    /// Runs instructions until roughly one frame's worth of cycles has
    /// elapsed or the host has asked the core to stop.
    pub fn run_frame(&mut self) -> Result<(), EmulatorError> {
        let mut cycles_this_frame: u32 = 0;
        while self.running && cycles_this_frame < CYCLES_PER_FRAME {
            cycles_this_frame += self.step()?;
        }
        Ok(())
    }

    /// True once, on the frame this V-blank was entered; cleared by `take_frame_ready`.
    pub fn frame_ready(&self) -> bool {
        self.frame_ready
    }

    /// Reads and clears the frame-ready flag, handing the caller a chance to
    /// consume the framebuffer exactly once per frame.
    pub fn take_frame_ready(&mut self) -> bool {
        std::mem::replace(&mut self.frame_ready, false)
    }

    /// The current 160x144 RGB framebuffer, row-major, top-left origin.
    pub fn frame_buffer(&self) -> &[u8; ppu::GB_WIDTH * ppu::GB_HEIGHT * 3] {
        self.ppu.get_frame_buffer()
    }

    pub fn key_down(&mut self, button: Button) {
        self.memory_bus.key_down(button);
    }

    pub fn key_up(&mut self, button: Button) {
        self.memory_bus.key_up(button);
    }

    /// Host-driven shutdown request, observed at the top of the next `step`/`run_frame`.
    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn memory_bus(&self) -> &MemoryBus {
        &self.memory_bus
    }

    pub fn memory_bus_mut(&mut self) -> &mut MemoryBus {
        &mut self.memory_bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_rom() -> Vec<u8> {
        let mut rom = vec![0u8; 0x8000];
        rom[0x0147] = 0x00; // ROM ONLY
        rom[0x0148] = 0x00; // 32 KiB
        rom[0x0149] = 0x00; // no RAM
        rom
    }

    #[test]
    fn new_emulator_matches_post_boot_register_state() {
        let emulator = Emulator::new(true);
        assert_eq!(emulator.cpu().pc(), 0x0100);
    }

    #[test]
    fn loading_an_undersized_rom_still_succeeds_and_steps() {
        let mut emulator = Emulator::new(true);
        emulator.load_rom(&test_rom()).unwrap();
        let cycles = emulator.step().unwrap();
        assert!(cycles > 0);
    }

    #[test]
    fn a_full_frame_eventually_raises_frame_ready() {
        let mut emulator = Emulator::new(true);
        emulator.load_rom(&test_rom()).unwrap();
        for _ in 0..CYCLES_PER_FRAME * 2 {
            if emulator.frame_ready() {
                break;
            }
            // NOP-filled ROM: every instruction is a 4-cycle NOP.
            emulator.step().unwrap();
        }
        assert!(emulator.frame_ready());
    }
}
