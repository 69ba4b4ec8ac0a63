use crate::error::EmulatorError;
use crate::joypad::{Button, Joypad};
use crate::mbc::Cartridge;
use crate::memory_map::*;
use std::fmt;

/// Represents the Game Boy's memory map: cartridge, internal RAM, I/O registers,
/// and the peripherals (joypad) that hang off the I/O register window.
pub struct MemoryBus {
    cartridge: Option<Cartridge>,

    vram: Box<[u8; VRAM_SIZE]>,
    wram: Box<[u8; (WRAM_BANK_0_SIZE + WRAM_BANK_N_SIZE)]>,
    oam: Box<[u8; OAM_SIZE]>,
    io_registers: Box<[u8; IO_REGISTERS_SIZE]>,
    hram: Box<[u8; HRAM_SIZE]>,
    interrupt_enable: u8, // FFFF (IE Register)

    pub joypad: Joypad,
}

impl MemoryBus {
    pub fn new() -> Self {
        // Initialize IO registers to their values right after the boot ROM hands off.
        let mut io_regs = [0u8; IO_REGISTERS_SIZE];
        io_regs[(SB_ADDR - IO_REGISTERS_START) as usize] = 0x00;
        io_regs[(SC_ADDR - IO_REGISTERS_START) as usize] = 0x7E;
        io_regs[(DIV_ADDR - IO_REGISTERS_START) as usize] = 0xAC;
        io_regs[(TIMA_ADDR - IO_REGISTERS_START) as usize] = 0x00;
        io_regs[(TMA_ADDR - IO_REGISTERS_START) as usize] = 0x00;
        io_regs[(TAC_ADDR - IO_REGISTERS_START) as usize] = 0x00;
        io_regs[(IF_ADDR - IO_REGISTERS_START) as usize] = 0xE1;
        io_regs[(NR10_ADDR - IO_REGISTERS_START) as usize] = 0x80;
        io_regs[(0xFF11 - IO_REGISTERS_START) as usize] = 0xBF;
        io_regs[(0xFF12 - IO_REGISTERS_START) as usize] = 0xF3;
        io_regs[(0xFF14 - IO_REGISTERS_START) as usize] = 0xBF;
        io_regs[(0xFF16 - IO_REGISTERS_START) as usize] = 0x3F;
        io_regs[(0xFF17 - IO_REGISTERS_START) as usize] = 0x00;
        io_regs[(0xFF19 - IO_REGISTERS_START) as usize] = 0xBF;
        io_regs[(0xFF1A - IO_REGISTERS_START) as usize] = 0x7F;
        io_regs[(0xFF1B - IO_REGISTERS_START) as usize] = 0xFF;
        io_regs[(0xFF1C - IO_REGISTERS_START) as usize] = 0x9F;
        io_regs[(0xFF1E - IO_REGISTERS_START) as usize] = 0xBF;
        io_regs[(0xFF20 - IO_REGISTERS_START) as usize] = 0xFF;
        io_regs[(0xFF21 - IO_REGISTERS_START) as usize] = 0x00;
        io_regs[(0xFF22 - IO_REGISTERS_START) as usize] = 0x00;
        io_regs[(0xFF23 - IO_REGISTERS_START) as usize] = 0xBF;
        io_regs[(0xFF24 - IO_REGISTERS_START) as usize] = 0x77;
        io_regs[(0xFF25 - IO_REGISTERS_START) as usize] = 0xF3;
        io_regs[(0xFF26 - IO_REGISTERS_START) as usize] = 0xF1;
        io_regs[(LCDC_ADDR - IO_REGISTERS_START) as usize] = 0x91;
        // Bit 7 is unused and forced high only by read_byte's mask (see below);
        // the stored value itself carries just mode bits 0-1 and the LYC=LY flag.
        io_regs[(STAT_ADDR - IO_REGISTERS_START) as usize] = 0x05;
        io_regs[(SCY_ADDR - IO_REGISTERS_START) as usize] = 0x00;
        io_regs[(SCX_ADDR - IO_REGISTERS_START) as usize] = 0x00;
        io_regs[(LY_ADDR - IO_REGISTERS_START) as usize] = 0x00;
        io_regs[(LYC_ADDR - IO_REGISTERS_START) as usize] = 0x00;
        io_regs[(DMA_ADDR - IO_REGISTERS_START) as usize] = 0xFF;
        io_regs[(BGP_ADDR - IO_REGISTERS_START) as usize] = 0xFC;
        io_regs[(OBP0_ADDR - IO_REGISTERS_START) as usize] = 0xFF;
        io_regs[(OBP1_ADDR - IO_REGISTERS_START) as usize] = 0xFF;
        io_regs[(WY_ADDR - IO_REGISTERS_START) as usize] = 0x00;
        io_regs[(WX_ADDR - IO_REGISTERS_START) as usize] = 0x00;

        let mut bus = MemoryBus {
            cartridge: None,

            vram: Box::new([0; VRAM_SIZE]),
            wram: Box::new([0; WRAM_BANK_0_SIZE + WRAM_BANK_N_SIZE]),
            oam: Box::new([0; OAM_SIZE]),
            io_registers: Box::new(io_regs),
            hram: Box::new([0; HRAM_SIZE]),
            interrupt_enable: 0x00,

            joypad: Joypad::new(),
        };

        let joyp_val = bus.joypad.read_p1();
        bus.io_registers[(P1_JOYP_ADDR - IO_REGISTERS_START) as usize] = joyp_val;

        bus
    }

    /// Parses and installs a ROM image, replacing any cartridge already loaded.
    pub fn load_rom(&mut self, rom_data: &[u8]) -> Result<(), EmulatorError> {
        self.cartridge = Some(Cartridge::load(rom_data)?);
        Ok(())
    }

    pub fn cartridge(&self) -> Option<&Cartridge> {
        self.cartridge.as_ref()
    }

    // --- Interrupt Request Helper ---
    /// Sets the corresponding interrupt flag bit (0-4) in the IF register (0xFF0F).
    pub fn request_interrupt(&mut self, bit: u8) {
        if bit < 5 {
            let if_reg_offset = (IF_ADDR - IO_REGISTERS_START) as usize;
            let current_if = self.io_registers[if_reg_offset];
            self.io_registers[if_reg_offset] = current_if | (1 << bit);
        }
    }

    // --- Read/Write ---

    pub fn read_byte(&self, addr: u16) -> u8 {
        match addr {
            ROM_BANK_0_START..=ROM_BANK_N_END => match &self.cartridge {
                Some(cart) => cart.read_rom(addr),
                None => 0xFF,
            },
            VRAM_START..=VRAM_END => self.vram[(addr - VRAM_START) as usize],
            EXT_RAM_START..=EXT_RAM_END => match &self.cartridge {
                Some(cart) => cart.read_ram(addr),
                None => 0xFF,
            },
            WRAM_BANK_0_START..=WRAM_BANK_N_END => {
                self.wram[(addr - WRAM_BANK_0_START) as usize]
            }
            ECHO_RAM_START..=ECHO_RAM_END => self.read_byte(addr - 0x2000),
            OAM_START..=OAM_END => self.oam[(addr - OAM_START) as usize],
            NOT_USABLE_START..=NOT_USABLE_END => 0x00,
            IO_REGISTERS_START..=IO_REGISTERS_END => {
                let offset = (addr - IO_REGISTERS_START) as usize;
                match addr {
                    P1_JOYP_ADDR => self.joypad.read_p1(),
                    STAT_ADDR => self.io_registers[offset] | 0x80,
                    _ => self.io_registers[offset],
                }
            }
            HRAM_START..=HRAM_END => self.hram[(addr - HRAM_START) as usize],
            INTERRUPT_ENABLE_REGISTER => self.interrupt_enable,
        }
    }

    pub fn write_byte(&mut self, addr: u16, value: u8) {
        match addr {
            ROM_BANK_0_START..=ROM_BANK_N_END => {
                if let Some(cart) = &mut self.cartridge {
                    cart.write_control(addr, value);
                }
            }
            VRAM_START..=VRAM_END => {
                self.vram[(addr - VRAM_START) as usize] = value;
            }
            EXT_RAM_START..=EXT_RAM_END => {
                if let Some(cart) = &mut self.cartridge {
                    cart.write_ram(addr, value);
                }
            }
            WRAM_BANK_0_START..=WRAM_BANK_N_END => {
                self.wram[(addr - WRAM_BANK_0_START) as usize] = value;
            }
            ECHO_RAM_START..=ECHO_RAM_END => self.write_byte(addr - 0x2000, value),
            OAM_START..=OAM_END => {
                self.oam[(addr - OAM_START) as usize] = value;
            }
            NOT_USABLE_START..=NOT_USABLE_END => { /* write ignored */ }
            IO_REGISTERS_START..=IO_REGISTERS_END => {
                let offset = (addr - IO_REGISTERS_START) as usize;
                match addr {
                    P1_JOYP_ADDR => self.joypad.write_p1(value),
                    DIV_ADDR => {
                        self.io_registers[offset] = 0;
                    }
                    IF_ADDR => {
                        // Bits 0-4 are R/W; preserve the unused upper bits.
                        self.io_registers[offset] = (value & 0x1F) | (self.io_registers[offset] & 0xE0);
                    }
                    STAT_ADDR => {
                        // Only bits 3-6 (interrupt-source enables) are game-writable;
                        // bits 0-2 (mode/coincidence) and bit 7 stay under PPU control.
                        self.io_registers[offset] =
                            (value & 0b0111_1000) | (self.io_registers[offset] & 0b1000_0111);
                    }
                    DMA_ADDR => {
                        self.io_registers[offset] = value;
                        self.perform_dma_transfer(value);
                    }
                    _ => {
                        self.io_registers[offset] = value;
                    }
                }
            }
            HRAM_START..=HRAM_END => {
                self.hram[(addr - HRAM_START) as usize] = value;
            }
            INTERRUPT_ENABLE_REGISTER => {
                self.interrupt_enable = value & 0x1F;
            }
        }
    }

    /// Performs an OAM DMA transfer: copies 160 bytes from `source_high_byte << 8`
    /// into OAM. Not cycle-accurate — the real hardware spreads this over ~160
    /// M-cycles and blocks CPU access to most memory during the transfer.
    fn perform_dma_transfer(&mut self, source_high_byte: u8) {
        let source_start_addr = (source_high_byte as u16) << 8;
        if source_start_addr >= 0xFE00 {
            log::warn!(
                "DMA transfer requested from restricted area {:#06x}",
                source_start_addr
            );
            return;
        }

        for i in 0..OAM_SIZE {
            let byte_to_copy = self.read_byte(source_start_addr + i as u16);
            self.oam[i] = byte_to_copy;
        }
    }

    /// Reads a 16-bit word (Little Endian).
    pub fn read_word(&self, addr: u16) -> u16 {
        let low = self.read_byte(addr) as u16;
        let high = self.read_byte(addr.wrapping_add(1)) as u16;
        (high << 8) | low
    }

    /// Writes a 16-bit word (Little Endian).
    pub fn write_word(&mut self, addr: u16, value: u16) {
        let low = (value & 0xFF) as u8;
        let high = (value >> 8) as u8;
        self.write_byte(addr, low);
        self.write_byte(addr.wrapping_add(1), high);
    }

    // --- Public Input Handling Methods (Delegate to Joypad) ---

    /// Called by the host when a Game Boy button is pressed down.
    pub fn key_down(&mut self, button: Button) {
        if self.joypad.key_down(button) {
            self.request_interrupt(JOYPAD_INTERRUPT_BIT);
        }
        let p1_val = self.joypad.read_p1();
        self.io_registers[(P1_JOYP_ADDR - IO_REGISTERS_START) as usize] = p1_val;
    }

    /// Called by the host when a Game Boy button is released.
    pub fn key_up(&mut self, button: Button) {
        self.joypad.key_up(button);
        let p1_val = self.joypad.read_p1();
        self.io_registers[(P1_JOYP_ADDR - IO_REGISTERS_START) as usize] = p1_val;
    }

    // --- Debug / Accessor methods ---
    pub fn get_io_reg(&self, addr: u16) -> u8 {
        if (IO_REGISTERS_START..=IO_REGISTERS_END).contains(&addr) {
            let offset = (addr - IO_REGISTERS_START) as usize;
            self.io_registers[offset]
        } else if addr == INTERRUPT_ENABLE_REGISTER {
            self.interrupt_enable
        } else {
            0xFF
        }
    }

    /// Writes an I/O register directly, bypassing `write_byte`'s side effects.
    /// Used by the PPU to update LY/STAT without re-triggering bus logic.
    pub fn set_io_reg_direct(&mut self, addr: u16, value: u8) {
        if (IO_REGISTERS_START..=IO_REGISTERS_END).contains(&addr) {
            let offset = (addr - IO_REGISTERS_START) as usize;
            self.io_registers[offset] = value;
        } else if addr == INTERRUPT_ENABLE_REGISTER {
            self.interrupt_enable = value & 0x1F;
        }
    }

    pub fn get_vram(&self) -> &[u8; VRAM_SIZE] {
        &self.vram
    }

    pub fn get_oam(&self) -> &[u8; OAM_SIZE] {
        &self.oam
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBus")
            .field("cartridge_loaded", &self.cartridge.is_some())
            .field("IE", &format_args!("{:#04X}", self.interrupt_enable))
            .field("IF", &format_args!("{:#04X}", self.get_io_reg(IF_ADDR)))
            .field("joypad", &self.joypad)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_rom() -> Vec<u8> {
        let mut rom = vec![0u8; 0x8000];
        rom[0x0147] = 0x00; // NoMbc
        rom[0x0148] = 0x00; // 2 banks (32 KiB)
        rom[0x0149] = 0x00;
        rom
    }

    #[test]
    fn echo_ram_mirrors_wram() {
        let mut bus = MemoryBus::new();
        bus.write_byte(0xC010, 0x7A);
        assert_eq!(bus.read_byte(0xE010), 0x7A);
    }

    #[test]
    fn stat_read_always_has_bit_7_set() {
        let bus = MemoryBus::new();
        assert_eq!(bus.get_io_reg(STAT_ADDR) & 0x80, 0);
        assert_eq!(bus.read_byte(STAT_ADDR) & 0x80, 0x80);
    }

    #[test]
    fn dma_copies_160_bytes_into_oam() {
        let mut bus = MemoryBus::new();
        bus.load_rom(&test_rom()).unwrap();
        for i in 0..OAM_SIZE {
            bus.write_byte(0xC000 + i as u16, i as u8);
        }
        bus.write_byte(DMA_ADDR, 0xC0);
        for i in 0..OAM_SIZE {
            assert_eq!(bus.read_byte(OAM_START + i as u16), i as u8);
        }
    }

    #[test]
    fn word_read_write_round_trips_little_endian() {
        let mut bus = MemoryBus::new();
        bus.write_word(0xC000, 0xBEEF);
        assert_eq!(bus.read_byte(0xC000), 0xEF);
        assert_eq!(bus.read_byte(0xC001), 0xBE);
        assert_eq!(bus.read_word(0xC000), 0xBEEF);
    }
}
