use super::{BankController, Cartridge, FlashCart, Machine, StopReason};
use crate::cell::{CellRef, Usage, BANK_SHIFT, ID_ROM, ID_WRAM};
use crate::cpu::{Bus, Interrupt, Reg};
use crate::error::StepError;
use once_cell::sync::OnceCell;

/// 32 KiB ROM-only image with `code` at 0x0100 and `data` at 0x0200.
fn rom_with(code: &[u8], data: &[u8]) -> Vec<u8> {
    let mut rom = vec![0u8; 0x8000];
    rom[0x100..0x100 + code.len()].copy_from_slice(code);
    rom[0x200..0x200 + data.len()].copy_from_slice(data);
    rom
}

fn machine(rom: &[u8]) -> Machine {
    let mut machine = Machine::new(Cartridge::from_bytes(rom).unwrap());
    machine.reset();
    machine
}

/// Prints the NUL-terminated string at 0x0200 over the serial port, waiting
/// for each transfer to finish, then halts with interrupts disabled.
const SERIAL_PRINT: &[u8] = &[
    0x21, 0x00, 0x02, // 0100 LD HL,0x0200
    0x2A, //             0103 LD A,(HL+)
    0xB7, //             0104 OR A
    0x28, 0x0E, //       0105 JR Z,0x0115
    0xE0, 0x01, //       0107 LDH (SB),A
    0x3E, 0x81, //       0109 LD A,0x81
    0xE0, 0x02, //       010B LDH (SC),A
    0xF0, 0x02, //       010D LDH A,(SC)
    0xE6, 0x80, //       010F AND 0x80
    0x20, 0xFA, //       0111 JR NZ,0x010D
    0x18, 0xEE, //       0113 JR 0x0103
    0x76, //             0115 HALT
];

#[test]
fn golden_serial_passed() {
    let mut gb = machine(&rom_with(SERIAL_PRINT, b"Passed\0"));
    assert_eq!(gb.run(Some(400_000)).unwrap(), StopReason::CycleLimit);

    assert_eq!(gb.serial_output(), b"Passed");
    assert!(gb.cpu.halted);
    assert_eq!(gb.cpu.pc, 0x0116);
    // HL walked past the terminator.
    assert_eq!(gb.cpu.regs.hl(), 0x0207);
}

#[test]
fn vblank_is_serviced_before_timer() {
    let mut gb = machine(&rom_with(&[], &[]));
    gb.cpu.ime = true;
    gb.write(0xFFFF, 0x05);
    gb.raise_interrupt(Interrupt::VBlank.mask() | Interrupt::Timer.mask());

    let cycles = gb.cpu.service_interrupts(&mut gb.bus);
    assert_eq!(cycles, 20);
    assert_eq!(gb.cpu.pc, 0x0040);
    assert!(!gb.cpu.ime);
    assert_eq!(gb.bus.interrupt_flag(), Interrupt::Timer.mask());
    assert_eq!(gb.cpu.regs.sp(), 0xFFFC);
    assert_eq!(gb.read(0xFFFD), 0x01);
    assert_eq!(gb.read(0xFFFC), 0x00);

    // IME is off now, so Timer stays pending.
    assert_eq!(gb.cpu.service_interrupts(&mut gb.bus), 0);
    assert_eq!(gb.cpu.pc, 0x0040);
}

#[test]
fn halt_wakes_without_ime() {
    let mut gb = machine(&rom_with(&[0x76, 0x00], &[]));
    gb.write(0xFFFF, Interrupt::Timer.mask());
    gb.step().unwrap();
    assert!(gb.cpu.halted);

    assert_eq!(gb.step().unwrap(), 4);
    assert!(gb.cpu.halted);

    // Not enabled: stays halted.
    gb.raise_interrupt(Interrupt::Serial.mask());
    assert!(gb.cpu.halted);

    gb.raise_interrupt(Interrupt::Timer.mask());
    assert!(!gb.cpu.halted);
    gb.step().unwrap();
    assert_eq!(gb.cpu.pc, 0x0102);
}

#[test]
fn timer_overflow_dispatches_to_its_vector() {
    let mut gb = machine(&rom_with(&[], &[]));
    gb.write(0xFF06, 0x80);
    gb.write(0xFF05, 0xFE);
    gb.write(0xFF07, 0x05);
    gb.write(0xFFFF, Interrupt::Timer.mask());
    gb.cpu.ime = true;

    let mut reached = false;
    for _ in 0..64 {
        gb.step().unwrap();
        if (0x0050..0x0058).contains(&gb.cpu.pc) {
            reached = true;
            break;
        }
    }
    assert!(reached, "timer vector never reached, pc={:04X}", gb.cpu.pc);
    assert!(gb.read(0xFF05) >= 0x80);
}

#[test]
fn illegal_opcode_stops_run() {
    let mut gb = machine(&rom_with(&[0x00, 0xD3], &[]));
    let err = gb.run(None).unwrap_err();
    assert_eq!(
        err,
        StepError::IllegalOpcode {
            opcode: 0xD3,
            address: 0x0101,
        }
    );
    // Nothing past the NOP ran.
    assert_eq!(gb.cpu.pc, 0x0101);
    assert_eq!(gb.cpu.cycles, 4);
}

#[test]
fn empty_slot_stops_immediately() {
    let mut gb = Machine::new(Cartridge::empty());
    gb.reset();
    assert!(matches!(
        gb.step(),
        Err(StepError::IllegalOpcode { opcode: 0xDD, .. })
    ));
}

#[test]
fn reset_without_boot_rom_uses_post_boot_state() {
    let gb = machine(&rom_with(&[], &[]));
    let regs = &gb.cpu.regs;
    assert_eq!(regs.af(), 0x01B0);
    assert_eq!(regs.bc(), 0x0013);
    assert_eq!(regs.de(), 0x00D8);
    assert_eq!(regs.hl(), 0x014D);
    assert_eq!(regs.sp(), 0xFFFE);
    assert_eq!(gb.cpu.pc, 0x0100);
    assert_eq!(gb.read(0xFF40), 0x91);
    assert_eq!(gb.read(0xFF47), 0xFC);
    assert_eq!(gb.read(0xFF26), 0xF1);
    assert_eq!(gb.read(0xFF50), 0x01);

    let mut rom = rom_with(&[], &[]);
    rom[0x143] = 0x80;
    let gb = machine(&rom);
    assert_eq!(gb.cpu.regs.get(Reg::A), 0x11);
    assert!(gb.cpu.cgb);
}

#[test]
fn boot_rom_overlays_until_disabled() {
    let mut rom = rom_with(&[], &[]);
    rom[0x0000] = 0xAB;
    let mut boot = vec![0u8; 0x100];
    boot[0] = 0x31;
    let mut gb = Machine::with_boot_rom(Cartridge::from_bytes(&rom).unwrap(), &boot);
    gb.reset();

    assert_eq!(gb.cpu.pc, 0x0000);
    assert_eq!(gb.read(0x0000), 0x31);
    gb.write(0x0000, 0x00);
    assert_eq!(gb.read(0x0000), 0x31);

    gb.write(0xFF50, 0x01);
    assert_eq!(gb.read(0x0000), 0xAB);
}

#[test]
fn instrumentation_dump_records() {
    let mut gb = machine(&rom_with(&[0x00], &[]));
    gb.step().unwrap();

    let mut sink = Vec::new();
    gb.dump_instrumentation(&mut sink).unwrap();
    assert_eq!(sink.len(), 16);
    let id = u64::from_le_bytes(sink[0..8].try_into().unwrap());
    let used_as = u64::from_le_bytes(sink[8..16].try_into().unwrap());
    assert_eq!(id, ID_ROM | 0x100);
    assert_eq!(used_as, Usage::INSTRUCTION.bits() | (1 << BANK_SHIFT));
}

#[test]
fn stores_record_destinations_in_the_dump() {
    // LD A,(0x0200) ; LD (0xC010),A
    let mut gb = machine(&rom_with(&[0xFA, 0x00, 0x02, 0xEA, 0x10, 0xC0], &[0x5A]));
    gb.step().unwrap();
    gb.step().unwrap();
    assert_eq!(gb.read(0xC010), 0x5A);

    let wram = gb.cell(CellRef::WRam(0x10)).unwrap();
    assert_eq!(wram.origin(), Some(gb.resolve(0x0200)));
    assert_eq!(wram.used_as(), 0);

    let source = gb.cell(gb.resolve(0x0200)).unwrap();
    assert!(source.usage().contains(Usage::DATA));
    assert_eq!(source.used_as() & 0xFF_FFFF_FFFF, ID_WRAM | 0x10);

    // The operand bytes of the absolute loads are pointer bytes.
    let low = gb.cell(gb.resolve(0x0104)).unwrap();
    assert!(low.usage().contains(Usage::POINTER_LOW));
    let high = gb.cell(gb.resolve(0x0105)).unwrap();
    assert!(high.usage().contains(Usage::POINTER_HIGH));
}

#[test]
fn flash_cart_reboot_requests_quit() {
    let mut gb = machine(&rom_with(&[], &[]));
    let flash = FlashCart::new(Vec::new());
    gb.install_controller(BankController::FlashCart(Box::new(flash)));
    assert_eq!(gb.cartridge().sram_len(), FlashCart::SRAM_SIZE);

    gb.write(0x7F00, 0xE1);
    gb.write(0x7F10, 0xE2);
    gb.write(0x7F20, 0xE3);
    gb.write(0x7FE0, 0x80);
    assert!(!gb.quit_requested());

    assert_eq!(gb.run(Some(1_000)).unwrap(), StopReason::Quit);
    assert!(gb.quit_requested());
}

#[test]
fn swap_cartridge_tolerates_stale_origins() {
    let mut big = vec![0u8; 0x10000];
    big[0x148] = 0x01;
    big[0xFFFF] = 0x77;
    big[0x147] = 0x01;
    let mut gb = machine(&big);

    // Bank 3 holds 0xFFFF.
    gb.write(0x2000, 0x03);
    let src = gb.resolve(0x7FFF);
    let dst = gb.resolve(0xC000);
    gb.cpu.write_from(&mut gb.bus, dst, src);
    assert_eq!(gb.read(0xC000), 0x77);

    let old = gb.swap_cartridge(Cartridge::from_bytes(&rom_with(&[0x00], &[])).unwrap());
    assert_eq!(old.rom_len(), 0x10000);
    assert_eq!(gb.read(0x0100), 0x00);

    let stale = gb.cell(CellRef::WRam(0)).unwrap().origin().unwrap();
    assert!(gb.cell(stale).is_none());

    // Marking through a stale origin is a no-op.
    gb.cpu.mark_origin(&mut gb.bus, CellRef::WRam(0), Usage::POINTER_LOW);
    let mut sink = Vec::new();
    gb.dump_instrumentation(&mut sink).unwrap();
}

#[test]
fn step_frame_stops_at_vblank() {
    // JR -2
    let mut gb = machine(&rom_with(&[0x18, 0xFE], &[]));
    gb.step_frame().unwrap();
    assert_eq!(gb.read(0xFF44), 144);
    assert_ne!(gb.bus.interrupt_flag() & Interrupt::VBlank.mask(), 0);
}

#[test]
fn double_speed_switch_needs_arming() {
    let mut rom = rom_with(&[0x10, 0x10], &[]);
    rom[0x143] = 0x80;
    let mut gb = machine(&rom);

    gb.step().unwrap();
    assert_eq!(gb.cpu.speed, 1);

    gb.write(0xFF4D, 0x01);
    gb.step().unwrap();
    assert_eq!(gb.cpu.speed, 2);
    assert_eq!(gb.read(0xFF4D), 0xFE);
}

static CPU_INSTRS_ROM: OnceCell<Option<Vec<u8>>> = OnceCell::new();

fn cpu_instrs_rom() -> Option<&'static [u8]> {
    CPU_INSTRS_ROM
        .get_or_init(|| {
            use std::path::PathBuf;

            let candidates = [
                PathBuf::from("assets/roms/blargg/cpu_instrs.gb"),
                PathBuf::from(env!("CARGO_MANIFEST_DIR"))
                    .join("../../assets/roms/blargg/cpu_instrs.gb"),
            ];
            candidates.iter().find_map(|path| std::fs::read(path).ok())
        })
        .as_deref()
}

#[test]
#[ignore]
fn blargg_cpu_instrs() {
    let Some(rom) = cpu_instrs_rom() else {
        eprintln!("cpu_instrs.gb not found, skipping");
        return;
    };
    let mut gb = machine(rom);
    for _ in 0..4_000 {
        gb.run(Some(1_000_000)).unwrap();
        if gb.serial_output().ends_with(b"Passed all tests\n")
            || gb.serial_output().windows(6).any(|w| w == b"Failed")
        {
            break;
        }
    }
    let output = String::from_utf8_lossy(gb.serial_output());
    assert!(output.contains("Passed all tests"), "{output}");
}
