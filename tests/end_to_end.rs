use gbcore::cpu::Cpu;
use gbcore::memory_bus::MemoryBus;

/// Builds a minimal 32 KiB, no-MBC ROM image with `program` placed at 0x0100.
fn rom_with_program(program: &[u8]) -> Vec<u8> {
    let mut rom = vec![0u8; 0x8000];
    rom[0x0100..0x0100 + program.len()].copy_from_slice(program);
    rom[0x0147] = 0x00; // ROM ONLY
    rom[0x0148] = 0x00; // 32 KiB (2 banks)
    rom[0x0149] = 0x00; // no RAM
    rom
}

fn bus_with_program(program: &[u8]) -> MemoryBus {
    let mut bus = MemoryBus::new();
    bus.load_rom(&rom_with_program(program)).unwrap();
    bus
}

#[test]
fn nop_times_four_then_halt() {
    let mut bus = bus_with_program(&[0x00, 0x00, 0x00, 0x00, 0x76]);
    let mut cpu = Cpu::new(true);

    for _ in 0..5 {
        cpu.step(&mut bus).unwrap();
    }

    assert_eq!(cpu.pc(), 0x0105);
    assert_eq!(cpu.sp(), 0xFFFE);
    let (a, f, ..) = cpu.registers();
    assert_eq!((a, f), (0x01, 0xB0));
    assert!(cpu.halted());
}

#[test]
fn load_immediate_pair_sets_registers_pc_and_cycles() {
    let mut bus = bus_with_program(&[0x01, 0x34, 0x12]); // LD BC,0x1234
    let mut cpu = Cpu::new(true);

    let cycles = cpu.step(&mut bus).unwrap();

    let (_, _, b, c, ..) = cpu.registers();
    assert_eq!((b, c), (0x12, 0x34));
    assert_eq!(cpu.pc(), 0x0103);
    assert_eq!(cycles, 12);
}

#[test]
fn arithmetic_sets_half_carry_without_zero_or_carry() {
    // LD A,0x0F ; ADD A,0x01
    let mut bus = bus_with_program(&[0x3E, 0x0F, 0xC6, 0x01]);
    let mut cpu = Cpu::new(true);

    cpu.step(&mut bus).unwrap(); // LD A,0x0F
    cpu.step(&mut bus).unwrap(); // ADD A,0x01

    let (a, f, ..) = cpu.registers();
    assert_eq!(a, 0x10);
    assert_eq!(f & 0x80, 0x00, "Z must be clear");
    assert_eq!(f & 0x40, 0x00, "N must be clear");
    assert_eq!(f & 0x20, 0x20, "H must be set");
    assert_eq!(f & 0x10, 0x00, "C must be clear");
}

#[test]
fn conditional_jump_not_taken_advances_by_instruction_length_only() {
    // INC A (clears Z, since post-boot A=0x01 -> 0x02) ; JR Z,+5
    let mut bus = bus_with_program(&[0x3C, 0x28, 0x05]);
    let mut cpu = Cpu::new(true);

    cpu.step(&mut bus).unwrap(); // INC A
    let cycles_before = cpu.total_cycles();
    let cycles = cpu.step(&mut bus).unwrap(); // JR Z,+5 (not taken)

    assert_eq!(cpu.pc(), 0x0103);
    assert_eq!(cycles, 8, "not-taken JR costs 8 cycles, not 12");
    assert_eq!(cpu.total_cycles() - cycles_before, 8);
}

#[test]
fn call_then_ret_round_trips_pc_and_sp() {
    // 0x0100: JP 0xC000
    let mut bus = bus_with_program(&[0xC3, 0x00, 0xC0]);
    // 0xC000: CALL 0xD000
    bus.write_byte(0xC000, 0xCD);
    bus.write_byte(0xC001, 0x00);
    bus.write_byte(0xC002, 0xD0);
    // 0xD000: RET
    bus.write_byte(0xD000, 0xC9);

    let mut cpu = Cpu::new(true);

    cpu.step(&mut bus).unwrap(); // JP 0xC000
    assert_eq!(cpu.pc(), 0xC000);

    cpu.step(&mut bus).unwrap(); // CALL 0xD000
    assert_eq!(cpu.pc(), 0xD000);
    assert_eq!(cpu.sp(), 0xFFFC);
    assert_eq!(bus.read_word(0xFFFC), 0xC003);

    cpu.step(&mut bus).unwrap(); // RET
    assert_eq!(cpu.pc(), 0xC003);
    assert_eq!(cpu.sp(), 0xFFFE);
}

#[test]
fn cb_prefixed_instruction_advances_pc_past_both_opcode_bytes() {
    // SET 7,A (CB FF) followed by NOP, so a PC stuck after the CB byte would
    // re-decode the FF byte itself instead of landing on the NOP.
    let mut bus = bus_with_program(&[0xCB, 0xFF, 0x00]);
    let mut cpu = Cpu::new(true);

    let cycles = cpu.step(&mut bus).unwrap(); // SET 7,A
    assert_eq!(cpu.pc(), 0x0102, "PC must skip both the CB prefix and the CB opcode byte");
    assert_eq!(cycles, 8, "SET r is 8 T-cycles total, prefix fetch included");
    let (a, ..) = cpu.registers();
    assert_eq!(a & 0x80, 0x80, "SET 7,A must set bit 7");

    cpu.step(&mut bus).unwrap(); // NOP
    assert_eq!(cpu.pc(), 0x0103);
}

#[test]
fn mbc1_bank_switch_remaps_the_switchable_window() {
    let num_banks = 8usize;
    let mut rom = vec![0u8; num_banks * 0x4000];
    rom[0x0147] = 0x01; // MBC1
    rom[0x0148] = 0x02; // 2 << 2 = 8 banks
    rom[0x0149] = 0x00;
    rom[3 * 0x4000] = 0xAB; // marker byte at the start of bank 3

    let mut bus = MemoryBus::new();
    bus.load_rom(&rom).unwrap();

    bus.write_byte(0x2000, 0x03); // select ROM bank 3
    assert_eq!(bus.read_byte(0x4000), 0xAB);
}
