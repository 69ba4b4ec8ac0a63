// src/mbc.rs

use crate::error::EmulatorError;
use crate::memory_map::{EXT_RAM_SIZE, ROM_BANK_0_SIZE, ROM_BANK_N_SIZE};

/// Memory Bank Controller variant selected by the cartridge header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbcType {
    NoMbc,
    Mbc1,
}

impl MbcType {
    /// Determines MBC type, RAM presence, and battery presence from the cartridge
    /// type byte at header offset 0x147.
    fn from_header(cartridge_type_code: u8) -> Option<(Self, bool, bool)> {
        match cartridge_type_code {
            0x00 => Some((MbcType::NoMbc, false, false)),
            0x01 => Some((MbcType::Mbc1, false, false)),
            0x02 => Some((MbcType::Mbc1, true, false)),
            0x03 => Some((MbcType::Mbc1, true, true)),
            _ => None,
        }
    }
}

/// Owns the ROM image and external RAM, and decodes bank-switch writes into the
/// effective ROM/RAM bank currently mapped. See SPEC_FULL.md §4.1.
pub struct Cartridge {
    rom: Vec<u8>,
    ram: Vec<u8>,
    mbc_type: MbcType,
    has_ram: bool,
    has_battery: bool,

    num_rom_banks: usize,
    num_ram_banks: usize,

    rom_bank_low: u8,
    upper_bits: u8,
    ram_enable: bool,
    mode: u8,
}

impl Cartridge {
    /// Parses a ROM image's header and constructs a cartridge ready for use.
    pub fn load(rom_data: &[u8]) -> Result<Self, EmulatorError> {
        if rom_data.len() < 0x150 {
            return Err(EmulatorError::RomLoadFail {
                path: String::new(),
                reason: "ROM is too small to contain a valid header".to_string(),
            });
        }

        let cartridge_type_code = rom_data[0x0147];
        let rom_size_code = rom_data[0x0148];
        let ram_size_code = rom_data[0x0149];

        let (mbc_type, has_ram, has_battery) = MbcType::from_header(cartridge_type_code)
            .ok_or(EmulatorError::UnsupportedCartridge {
                type_byte: cartridge_type_code,
            })?;

        let num_rom_banks = match rom_size_code {
            0x00..=0x08 => 2usize << rom_size_code,
            _ => {
                return Err(EmulatorError::RomLoadFail {
                    path: String::new(),
                    reason: format!("unsupported ROM size code {:#04x}", rom_size_code),
                });
            }
        };

        let ram_size = match ram_size_code {
            0x00 => 0,
            0x01 => 2 * 1024,
            0x02 => 8 * 1024,
            0x03 => 32 * 1024,
            0x04 => 128 * 1024,
            0x05 => 64 * 1024,
            _ => {
                return Err(EmulatorError::RomLoadFail {
                    path: String::new(),
                    reason: format!("unsupported RAM size code {:#04x}", ram_size_code),
                });
            }
        };

        let mut rom = rom_data.to_vec();
        let expected_rom_size = num_rom_banks * ROM_BANK_N_SIZE;
        if rom.len() < expected_rom_size {
            log::warn!(
                "ROM file size ({}) smaller than header-declared size ({})",
                rom.len(),
                expected_rom_size
            );
            rom.resize(expected_rom_size, 0xFF);
        }

        let (ram, num_ram_banks, has_ram) = if has_ram && ram_size > 0 {
            (vec![0u8; ram_size], ram_size.max(EXT_RAM_SIZE) / EXT_RAM_SIZE, true)
        } else {
            (Vec::new(), 0, false)
        };

        log::info!(
            "loaded ROM: {} bytes, type {:?} ({:#04x}), {} ROM bank(s), {} RAM bank(s), battery={}",
            rom.len(),
            mbc_type,
            cartridge_type_code,
            num_rom_banks,
            num_ram_banks,
            has_battery
        );

        Ok(Cartridge {
            rom,
            ram,
            mbc_type,
            has_ram,
            has_battery,
            num_rom_banks,
            num_ram_banks,
            rom_bank_low: 1,
            upper_bits: 0,
            ram_enable: false,
            mode: 0,
        })
    }

    pub fn has_battery(&self) -> bool {
        self.has_battery
    }

    fn effective_rom_bank(&self) -> usize {
        let bank = ((self.upper_bits as usize) << 5) | self.rom_bank_low as usize;
        bank % self.num_rom_banks.max(1)
    }

    fn effective_ram_bank(&self) -> usize {
        if self.mode == 1 { self.upper_bits as usize } else { 0 }
    }

    /// `read(addr)` for `0000..=7FFF`, per SPEC_FULL.md §4.1.
    pub fn read_rom(&self, addr: u16) -> u8 {
        if addr < 0x4000 {
            self.rom.get(addr as usize).copied().unwrap_or(0xFF)
        } else {
            let bank = self.effective_rom_bank();
            let offset = bank * ROM_BANK_N_SIZE + (addr as usize - 0x4000);
            self.rom.get(offset).copied().unwrap_or(0xFF)
        }
    }

    /// MBC control write into the ROM window (`0000..=7FFF`).
    pub fn write_control(&mut self, addr: u16, value: u8) {
        if self.mbc_type != MbcType::Mbc1 {
            return;
        }
        match addr {
            0x0000..=0x1FFF => {
                self.ram_enable = (value & 0x0F) == 0x0A;
            }
            0x2000..=0x3FFF => {
                let low = value & 0x1F;
                self.rom_bank_low = if low == 0 { 1 } else { low };
                log::debug!("MBC1 rom_bank_low set to {}", self.rom_bank_low);
            }
            0x4000..=0x5FFF => {
                self.upper_bits = value & 0x03;
            }
            0x6000..=0x7FFF => {
                self.mode = value & 0x01;
            }
            _ => unreachable!(),
        }
    }

    /// External RAM read (`A000..=BFFF`).
    pub fn read_ram(&self, addr: u16) -> u8 {
        if !self.ram_enable || !self.has_ram || self.ram.is_empty() {
            return 0xFF;
        }
        let bank = self.effective_ram_bank() % self.num_ram_banks.max(1);
        let offset = bank * EXT_RAM_SIZE + (addr as usize - 0xA000);
        self.ram.get(offset).copied().unwrap_or(0xFF)
    }

    /// External RAM write (`A000..=BFFF`).
    pub fn write_ram(&mut self, addr: u16, value: u8) {
        if !self.ram_enable || !self.has_ram || self.ram.is_empty() {
            return;
        }
        let bank = self.effective_ram_bank() % self.num_ram_banks.max(1);
        let offset = bank * EXT_RAM_SIZE + (addr as usize - 0xA000);
        if let Some(slot) = self.ram.get_mut(offset) {
            *slot = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rom_with_banks(num_banks: usize) -> Vec<u8> {
        let mut rom = vec![0u8; num_banks * ROM_BANK_0_SIZE.max(ROM_BANK_N_SIZE)];
        rom[0x0147] = 0x01; // MBC1
        rom[0x0148] = match num_banks {
            2 => 0x00,
            4 => 0x01,
            8 => 0x02,
            _ => panic!("unsupported test bank count"),
        };
        rom[0x0149] = 0x00;
        for (bank, chunk) in rom.chunks_mut(ROM_BANK_N_SIZE).enumerate() {
            if let Some(first) = chunk.first_mut() {
                *first = bank as u8;
            }
        }
        rom
    }

    #[test]
    fn mbc1_bank_zero_aliases_to_one() {
        let rom = rom_with_banks(8);
        let mut cart = Cartridge::load(&rom).unwrap();
        cart.write_control(0x2000, 0x00);
        assert_eq!(cart.read_rom(0x4000), 1);
    }

    #[test]
    fn mbc1_bank_switch_selects_requested_bank() {
        let rom = rom_with_banks(8);
        let mut cart = Cartridge::load(&rom).unwrap();
        cart.write_control(0x2000, 0x03);
        assert_eq!(cart.read_rom(0x4000), 3);
    }

    #[test]
    fn mbc1_ram_disabled_reads_ff() {
        let mut rom = rom_with_banks(2);
        rom[0x0147] = 0x02; // MBC1+RAM
        rom[0x0149] = 0x02; // 8 KiB
        let cart = Cartridge::load(&rom).unwrap();
        assert_eq!(cart.read_ram(0xA000), 0xFF);
    }

    #[test]
    fn mbc1_ram_round_trips_when_enabled() {
        let mut rom = rom_with_banks(2);
        rom[0x0147] = 0x02;
        rom[0x0149] = 0x02;
        let mut cart = Cartridge::load(&rom).unwrap();
        cart.write_control(0x0000, 0x0A);
        cart.write_ram(0xA010, 0x42);
        assert_eq!(cart.read_ram(0xA010), 0x42);
    }

    #[test]
    fn unsupported_cartridge_type_is_an_error() {
        let mut rom = vec![0u8; ROM_BANK_0_SIZE + ROM_BANK_N_SIZE];
        rom[0x0147] = 0x19; // MBC5, unsupported
        rom[0x0148] = 0x00;
        rom[0x0149] = 0x00;
        assert!(matches!(
            Cartridge::load(&rom),
            Err(EmulatorError::UnsupportedCartridge { type_byte: 0x19 })
        ));
    }
}
