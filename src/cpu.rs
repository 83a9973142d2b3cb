//! NES 6502 CPU implementation.
//!
//! Instructions execute atomically; `step` runs one instruction or one
//! interrupt entry and returns the cycles it consumed.
//!
//! <https://wiki.nesdev.org/w/index.php/CPU>

use crate::{
    bus::Bus,
    common::{Reset, ResetKind},
    mem::Mem,
};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::trace;

bitflags! {
    // Status register.
    //
    // 7654 3210
    // NVUB DIZC
    // |||| ||||
    // |||| |||+- Carry
    // |||| ||+-- Zero
    // |||| |+--- Interrupt disable
    // |||| +---- Decimal mode (present but ignored by ADC/SBC on the NES)
    // |||+------ Break: 1 when pushed by PHP/BRK, 0 by IRQ/NMI
    // ||+------- Unused, always pushed as 1
    // |+-------- Overflow
    // +--------- Negative
    #[derive(Default, Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
    #[must_use]
    pub struct Status: u8 {
        const C = 0x01;
        const Z = 0x02;
        const I = 0x04;
        const D = 0x08;
        const B = 0x10;
        const U = 0x20;
        const V = 0x40;
        const N = 0x80;
    }
}

/// NES 6502 CPU.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Cpu {
    pub pc: u16,
    pub sp: u8,
    pub acc: u8,
    pub x: u8,
    pub y: u8,
    pub status: Status,
    nmi_pending: bool,
    /// NMI that becomes pending after the next instruction completes.
    nmi_delayed: bool,
    irq_pending: bool,
    pub bus: Bus,
}

impl Cpu {
    const NMI_VECTOR: u16 = 0xFFFA;
    const RESET_VECTOR: u16 = 0xFFFC;
    const IRQ_VECTOR: u16 = 0xFFFE;
    const SP_BASE: u16 = 0x0100;
    const POWER_ON_SP: u8 = 0xFD;
    const POWER_ON_STATUS: Status = Status::I.union(Status::U);
    const INTERRUPT_CYCLES: u8 = 7;

    pub fn new(bus: Bus) -> Self {
        Self {
            pc: 0x0000,
            sp: 0x00,
            acc: 0x00,
            x: 0x00,
            y: 0x00,
            status: Self::POWER_ON_STATUS,
            nmi_pending: false,
            nmi_delayed: false,
            irq_pending: false,
            bus,
        }
    }

    /// Raise the NMI line; serviced before the next instruction.
    pub fn trigger_nmi(&mut self) {
        self.nmi_pending = true;
    }

    /// Raise an NMI that waits until one more instruction has run.
    pub fn trigger_nmi_delayed(&mut self) {
        self.nmi_delayed = true;
    }

    /// Raise the IRQ line; serviced when the I flag allows.
    pub fn trigger_irq(&mut self) {
        self.irq_pending = true;
    }

    /// Execute one instruction or interrupt entry, returning cycles
    /// consumed.
    pub fn step(&mut self) -> u8 {
        if self.nmi_pending {
            self.nmi_pending = false;
            self.interrupt(Self::NMI_VECTOR);
            trace!("NMI - PC:${:04X}", self.pc);
            return Self::INTERRUPT_CYCLES;
        }
        if self.irq_pending && !self.status.contains(Status::I) {
            self.irq_pending = false;
            self.interrupt(Self::IRQ_VECTOR);
            trace!("IRQ - PC:${:04X}", self.pc);
            return Self::INTERRUPT_CYCLES;
        }

        let opcode = self.fetch_byte();
        let cycles = self.execute(opcode);

        if self.nmi_delayed {
            self.nmi_delayed = false;
            self.nmi_pending = true;
        }
        cycles
    }

    fn interrupt(&mut self, vector: u16) {
        self.push_word(self.pc);
        self.push_byte(((self.status | Status::U) & !Status::B).bits());
        self.status.insert(Status::I);
        self.pc = self.read_word(vector);
    }

    // Memory access

    fn read(&mut self, addr: u16) -> u8 {
        self.bus.read(addr)
    }

    fn write(&mut self, addr: u16, val: u8) {
        self.bus.write(addr, val);
    }

    fn read_word(&mut self, addr: u16) -> u16 {
        let lo = self.read(addr);
        let hi = self.read(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    fn fetch_byte(&mut self) -> u8 {
        let val = self.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        val
    }

    fn fetch_word(&mut self) -> u16 {
        let lo = self.fetch_byte();
        let hi = self.fetch_byte();
        u16::from_le_bytes([lo, hi])
    }

    // Stack

    fn push_byte(&mut self, val: u8) {
        self.write(Self::SP_BASE | u16::from(self.sp), val);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn pop_byte(&mut self) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        self.read(Self::SP_BASE | u16::from(self.sp))
    }

    fn push_word(&mut self, val: u16) {
        let [lo, hi] = val.to_le_bytes();
        self.push_byte(hi);
        self.push_byte(lo);
    }

    fn pop_word(&mut self) -> u16 {
        let lo = self.pop_byte();
        let hi = self.pop_byte();
        u16::from_le_bytes([lo, hi])
    }

    // Addressing modes. The `_x`/`_y` indexed modes report whether the
    // effective address crossed a page for the +1 cycle penalty.

    fn imm(&mut self) -> u16 {
        let addr = self.pc;
        self.pc = self.pc.wrapping_add(1);
        addr
    }

    fn zp0(&mut self) -> u16 {
        self.fetch_byte().into()
    }

    fn zpx(&mut self) -> u16 {
        self.fetch_byte().wrapping_add(self.x).into()
    }

    fn zpy(&mut self) -> u16 {
        self.fetch_byte().wrapping_add(self.y).into()
    }

    fn abs(&mut self) -> u16 {
        self.fetch_word()
    }

    fn abx(&mut self) -> (u16, bool) {
        let base = self.fetch_word();
        let addr = base.wrapping_add(self.x.into());
        (addr, Self::pages_differ(base, addr))
    }

    fn aby(&mut self) -> (u16, bool) {
        let base = self.fetch_word();
        let addr = base.wrapping_add(self.y.into());
        (addr, Self::pages_differ(base, addr))
    }

    fn ind(&mut self) -> u16 {
        let ptr = self.fetch_word();
        // 6502 bug: the high byte is fetched without carrying into the page
        let lo = self.read(ptr);
        let hi = self.read((ptr & 0xFF00) | u16::from((ptr as u8).wrapping_add(1)));
        u16::from_le_bytes([lo, hi])
    }

    fn idx(&mut self) -> u16 {
        let ptr = self.fetch_byte().wrapping_add(self.x);
        let lo = self.read(ptr.into());
        let hi = self.read(ptr.wrapping_add(1).into());
        u16::from_le_bytes([lo, hi])
    }

    fn idy(&mut self) -> (u16, bool) {
        let ptr = self.fetch_byte();
        let lo = self.read(ptr.into());
        let hi = self.read(ptr.wrapping_add(1).into());
        let base = u16::from_le_bytes([lo, hi]);
        let addr = base.wrapping_add(self.y.into());
        (addr, Self::pages_differ(base, addr))
    }

    const fn pages_differ(a: u16, b: u16) -> bool {
        a & 0xFF00 != b & 0xFF00
    }

    // Flag helpers

    fn set_zn(&mut self, val: u8) {
        self.status.set(Status::Z, val == 0x00);
        self.status.set(Status::N, val & 0x80 != 0);
    }

    // Operations

    fn adc(&mut self, val: u8) {
        let carry = u16::from(self.status.contains(Status::C));
        let sum = u16::from(self.acc) + u16::from(val) + carry;
        self.status.set(Status::C, sum > 0xFF);
        self.status
            .set(Status::V, !(self.acc ^ val) & (self.acc ^ sum as u8) & 0x80 != 0);
        self.acc = sum as u8;
        self.set_zn(self.acc);
    }

    fn sbc(&mut self, val: u8) {
        self.adc(!val);
    }

    fn compare(&mut self, reg: u8, val: u8) {
        self.status.set(Status::C, reg >= val);
        self.set_zn(reg.wrapping_sub(val));
    }

    fn bit(&mut self, val: u8) {
        self.status.set(Status::Z, self.acc & val == 0x00);
        self.status.set(Status::N, val & 0x80 != 0);
        self.status.set(Status::V, val & 0x40 != 0);
    }

    fn asl(&mut self, val: u8) -> u8 {
        self.status.set(Status::C, val & 0x80 != 0);
        let result = val << 1;
        self.set_zn(result);
        result
    }

    fn lsr(&mut self, val: u8) -> u8 {
        self.status.set(Status::C, val & 0x01 != 0);
        let result = val >> 1;
        self.set_zn(result);
        result
    }

    fn rol(&mut self, val: u8) -> u8 {
        let carry = u8::from(self.status.contains(Status::C));
        self.status.set(Status::C, val & 0x80 != 0);
        let result = (val << 1) | carry;
        self.set_zn(result);
        result
    }

    fn ror(&mut self, val: u8) -> u8 {
        let carry = u8::from(self.status.contains(Status::C)) << 7;
        self.status.set(Status::C, val & 0x01 != 0);
        let result = (val >> 1) | carry;
        self.set_zn(result);
        result
    }

    fn modify(&mut self, addr: u16, f: fn(&mut Self, u8) -> u8) {
        let val = self.read(addr);
        let result = f(self, val);
        self.write(addr, result);
    }

    /// Conditional relative branch: +1 cycle when taken, +1 more when the
    /// target lands on a different page.
    fn branch(&mut self, condition: bool) -> u8 {
        let offset = self.fetch_byte() as i8;
        if condition {
            let base = self.pc;
            self.pc = base.wrapping_add(offset as u16);
            2 + 1 + u8::from(Self::pages_differ(base, self.pc))
        } else {
            2
        }
    }

    fn brk(&mut self) {
        self.pc = self.pc.wrapping_add(1);
        self.push_word(self.pc);
        self.push_byte((self.status | Status::B | Status::U).bits());
        self.status.insert(Status::I);
        self.pc = self.read_word(Self::IRQ_VECTOR);
    }

    #[allow(clippy::too_many_lines)]
    fn execute(&mut self, opcode: u8) -> u8 {
        match opcode {
            // ADC
            0x69 => { let a = self.imm(); let v = self.read(a); self.adc(v); 2 }
            0x65 => { let a = self.zp0(); let v = self.read(a); self.adc(v); 3 }
            0x75 => { let a = self.zpx(); let v = self.read(a); self.adc(v); 4 }
            0x6D => { let a = self.abs(); let v = self.read(a); self.adc(v); 4 }
            0x7D => { let (a, p) = self.abx(); let v = self.read(a); self.adc(v); 4 + u8::from(p) }
            0x79 => { let (a, p) = self.aby(); let v = self.read(a); self.adc(v); 4 + u8::from(p) }
            0x61 => { let a = self.idx(); let v = self.read(a); self.adc(v); 6 }
            0x71 => { let (a, p) = self.idy(); let v = self.read(a); self.adc(v); 5 + u8::from(p) }

            // AND
            0x29 => { let a = self.imm(); let v = self.read(a); self.acc &= v; self.set_zn(self.acc); 2 }
            0x25 => { let a = self.zp0(); let v = self.read(a); self.acc &= v; self.set_zn(self.acc); 3 }
            0x35 => { let a = self.zpx(); let v = self.read(a); self.acc &= v; self.set_zn(self.acc); 4 }
            0x2D => { let a = self.abs(); let v = self.read(a); self.acc &= v; self.set_zn(self.acc); 4 }
            0x3D => { let (a, p) = self.abx(); let v = self.read(a); self.acc &= v; self.set_zn(self.acc); 4 + u8::from(p) }
            0x39 => { let (a, p) = self.aby(); let v = self.read(a); self.acc &= v; self.set_zn(self.acc); 4 + u8::from(p) }
            0x21 => { let a = self.idx(); let v = self.read(a); self.acc &= v; self.set_zn(self.acc); 6 }
            0x31 => { let (a, p) = self.idy(); let v = self.read(a); self.acc &= v; self.set_zn(self.acc); 5 + u8::from(p) }

            // ASL
            0x0A => { self.acc = self.asl(self.acc); 2 }
            0x06 => { let a = self.zp0(); self.modify(a, Self::asl); 5 }
            0x16 => { let a = self.zpx(); self.modify(a, Self::asl); 6 }
            0x0E => { let a = self.abs(); self.modify(a, Self::asl); 6 }
            0x1E => { let (a, _) = self.abx(); self.modify(a, Self::asl); 7 }

            // Branches
            0x90 => self.branch(!self.status.contains(Status::C)), // BCC
            0xB0 => self.branch(self.status.contains(Status::C)),  // BCS
            0xF0 => self.branch(self.status.contains(Status::Z)),  // BEQ
            0x30 => self.branch(self.status.contains(Status::N)),  // BMI
            0xD0 => self.branch(!self.status.contains(Status::Z)), // BNE
            0x10 => self.branch(!self.status.contains(Status::N)), // BPL
            0x50 => self.branch(!self.status.contains(Status::V)), // BVC
            0x70 => self.branch(self.status.contains(Status::V)),  // BVS

            // BIT
            0x24 => { let a = self.zp0(); let v = self.read(a); self.bit(v); 3 }
            0x2C => { let a = self.abs(); let v = self.read(a); self.bit(v); 4 }

            // BRK
            0x00 => { self.brk(); 7 }

            // Flag clears/sets
            0x18 => { self.status.remove(Status::C); 2 } // CLC
            0xD8 => { self.status.remove(Status::D); 2 } // CLD
            0x58 => { self.status.remove(Status::I); 2 } // CLI
            0xB8 => { self.status.remove(Status::V); 2 } // CLV
            0x38 => { self.status.insert(Status::C); 2 } // SEC
            0xF8 => { self.status.insert(Status::D); 2 } // SED
            0x78 => { self.status.insert(Status::I); 2 } // SEI

            // CMP
            0xC9 => { let a = self.imm(); let v = self.read(a); self.compare(self.acc, v); 2 }
            0xC5 => { let a = self.zp0(); let v = self.read(a); self.compare(self.acc, v); 3 }
            0xD5 => { let a = self.zpx(); let v = self.read(a); self.compare(self.acc, v); 4 }
            0xCD => { let a = self.abs(); let v = self.read(a); self.compare(self.acc, v); 4 }
            0xDD => { let (a, p) = self.abx(); let v = self.read(a); self.compare(self.acc, v); 4 + u8::from(p) }
            0xD9 => { let (a, p) = self.aby(); let v = self.read(a); self.compare(self.acc, v); 4 + u8::from(p) }
            0xC1 => { let a = self.idx(); let v = self.read(a); self.compare(self.acc, v); 6 }
            0xD1 => { let (a, p) = self.idy(); let v = self.read(a); self.compare(self.acc, v); 5 + u8::from(p) }

            // CPX
            0xE0 => { let a = self.imm(); let v = self.read(a); self.compare(self.x, v); 2 }
            0xE4 => { let a = self.zp0(); let v = self.read(a); self.compare(self.x, v); 3 }
            0xEC => { let a = self.abs(); let v = self.read(a); self.compare(self.x, v); 4 }

            // CPY
            0xC0 => { let a = self.imm(); let v = self.read(a); self.compare(self.y, v); 2 }
            0xC4 => { let a = self.zp0(); let v = self.read(a); self.compare(self.y, v); 3 }
            0xCC => { let a = self.abs(); let v = self.read(a); self.compare(self.y, v); 4 }

            // DEC
            0xC6 => { let a = self.zp0(); self.modify(a, |cpu, v| { let r = v.wrapping_sub(1); cpu.set_zn(r); r }); 5 }
            0xD6 => { let a = self.zpx(); self.modify(a, |cpu, v| { let r = v.wrapping_sub(1); cpu.set_zn(r); r }); 6 }
            0xCE => { let a = self.abs(); self.modify(a, |cpu, v| { let r = v.wrapping_sub(1); cpu.set_zn(r); r }); 6 }
            0xDE => { let (a, _) = self.abx(); self.modify(a, |cpu, v| { let r = v.wrapping_sub(1); cpu.set_zn(r); r }); 7 }

            // DEX/DEY
            0xCA => { self.x = self.x.wrapping_sub(1); self.set_zn(self.x); 2 }
            0x88 => { self.y = self.y.wrapping_sub(1); self.set_zn(self.y); 2 }

            // EOR
            0x49 => { let a = self.imm(); let v = self.read(a); self.acc ^= v; self.set_zn(self.acc); 2 }
            0x45 => { let a = self.zp0(); let v = self.read(a); self.acc ^= v; self.set_zn(self.acc); 3 }
            0x55 => { let a = self.zpx(); let v = self.read(a); self.acc ^= v; self.set_zn(self.acc); 4 }
            0x4D => { let a = self.abs(); let v = self.read(a); self.acc ^= v; self.set_zn(self.acc); 4 }
            0x5D => { let (a, p) = self.abx(); let v = self.read(a); self.acc ^= v; self.set_zn(self.acc); 4 + u8::from(p) }
            0x59 => { let (a, p) = self.aby(); let v = self.read(a); self.acc ^= v; self.set_zn(self.acc); 4 + u8::from(p) }
            0x41 => { let a = self.idx(); let v = self.read(a); self.acc ^= v; self.set_zn(self.acc); 6 }
            0x51 => { let (a, p) = self.idy(); let v = self.read(a); self.acc ^= v; self.set_zn(self.acc); 5 + u8::from(p) }

            // INC
            0xE6 => { let a = self.zp0(); self.modify(a, |cpu, v| { let r = v.wrapping_add(1); cpu.set_zn(r); r }); 5 }
            0xF6 => { let a = self.zpx(); self.modify(a, |cpu, v| { let r = v.wrapping_add(1); cpu.set_zn(r); r }); 6 }
            0xEE => { let a = self.abs(); self.modify(a, |cpu, v| { let r = v.wrapping_add(1); cpu.set_zn(r); r }); 6 }
            0xFE => { let (a, _) = self.abx(); self.modify(a, |cpu, v| { let r = v.wrapping_add(1); cpu.set_zn(r); r }); 7 }

            // INX/INY
            0xE8 => { self.x = self.x.wrapping_add(1); self.set_zn(self.x); 2 }
            0xC8 => { self.y = self.y.wrapping_add(1); self.set_zn(self.y); 2 }

            // JMP
            0x4C => { self.pc = self.abs(); 3 }
            0x6C => { self.pc = self.ind(); 5 }

            // JSR
            0x20 => {
                let addr = self.abs();
                self.push_word(self.pc.wrapping_sub(1));
                self.pc = addr;
                6
            }

            // LDA
            0xA9 => { let a = self.imm(); self.acc = self.read(a); self.set_zn(self.acc); 2 }
            0xA5 => { let a = self.zp0(); self.acc = self.read(a); self.set_zn(self.acc); 3 }
            0xB5 => { let a = self.zpx(); self.acc = self.read(a); self.set_zn(self.acc); 4 }
            0xAD => { let a = self.abs(); self.acc = self.read(a); self.set_zn(self.acc); 4 }
            0xBD => { let (a, p) = self.abx(); self.acc = self.read(a); self.set_zn(self.acc); 4 + u8::from(p) }
            0xB9 => { let (a, p) = self.aby(); self.acc = self.read(a); self.set_zn(self.acc); 4 + u8::from(p) }
            0xA1 => { let a = self.idx(); self.acc = self.read(a); self.set_zn(self.acc); 6 }
            0xB1 => { let (a, p) = self.idy(); self.acc = self.read(a); self.set_zn(self.acc); 5 + u8::from(p) }

            // LDX
            0xA2 => { let a = self.imm(); self.x = self.read(a); self.set_zn(self.x); 2 }
            0xA6 => { let a = self.zp0(); self.x = self.read(a); self.set_zn(self.x); 3 }
            0xB6 => { let a = self.zpy(); self.x = self.read(a); self.set_zn(self.x); 4 }
            0xAE => { let a = self.abs(); self.x = self.read(a); self.set_zn(self.x); 4 }
            0xBE => { let (a, p) = self.aby(); self.x = self.read(a); self.set_zn(self.x); 4 + u8::from(p) }

            // LDY
            0xA0 => { let a = self.imm(); self.y = self.read(a); self.set_zn(self.y); 2 }
            0xA4 => { let a = self.zp0(); self.y = self.read(a); self.set_zn(self.y); 3 }
            0xB4 => { let a = self.zpx(); self.y = self.read(a); self.set_zn(self.y); 4 }
            0xAC => { let a = self.abs(); self.y = self.read(a); self.set_zn(self.y); 4 }
            0xBC => { let (a, p) = self.abx(); self.y = self.read(a); self.set_zn(self.y); 4 + u8::from(p) }

            // LSR
            0x4A => { self.acc = self.lsr(self.acc); 2 }
            0x46 => { let a = self.zp0(); self.modify(a, Self::lsr); 5 }
            0x56 => { let a = self.zpx(); self.modify(a, Self::lsr); 6 }
            0x4E => { let a = self.abs(); self.modify(a, Self::lsr); 6 }
            0x5E => { let (a, _) = self.abx(); self.modify(a, Self::lsr); 7 }

            // NOP
            0xEA => 2,

            // ORA
            0x09 => { let a = self.imm(); let v = self.read(a); self.acc |= v; self.set_zn(self.acc); 2 }
            0x05 => { let a = self.zp0(); let v = self.read(a); self.acc |= v; self.set_zn(self.acc); 3 }
            0x15 => { let a = self.zpx(); let v = self.read(a); self.acc |= v; self.set_zn(self.acc); 4 }
            0x0D => { let a = self.abs(); let v = self.read(a); self.acc |= v; self.set_zn(self.acc); 4 }
            0x1D => { let (a, p) = self.abx(); let v = self.read(a); self.acc |= v; self.set_zn(self.acc); 4 + u8::from(p) }
            0x19 => { let (a, p) = self.aby(); let v = self.read(a); self.acc |= v; self.set_zn(self.acc); 4 + u8::from(p) }
            0x01 => { let a = self.idx(); let v = self.read(a); self.acc |= v; self.set_zn(self.acc); 6 }
            0x11 => { let (a, p) = self.idy(); let v = self.read(a); self.acc |= v; self.set_zn(self.acc); 5 + u8::from(p) }

            // Stack
            0x48 => { self.push_byte(self.acc); 3 } // PHA
            0x08 => { self.push_byte((self.status | Status::B | Status::U).bits()); 3 } // PHP
            0x68 => { self.acc = self.pop_byte(); self.set_zn(self.acc); 4 } // PLA
            0x28 => { // PLP
                self.status = (Status::from_bits_truncate(self.pop_byte()) & !Status::B) | Status::U;
                4
            }

            // ROL
            0x2A => { self.acc = self.rol(self.acc); 2 }
            0x26 => { let a = self.zp0(); self.modify(a, Self::rol); 5 }
            0x36 => { let a = self.zpx(); self.modify(a, Self::rol); 6 }
            0x2E => { let a = self.abs(); self.modify(a, Self::rol); 6 }
            0x3E => { let (a, _) = self.abx(); self.modify(a, Self::rol); 7 }

            // ROR
            0x6A => { self.acc = self.ror(self.acc); 2 }
            0x66 => { let a = self.zp0(); self.modify(a, Self::ror); 5 }
            0x76 => { let a = self.zpx(); self.modify(a, Self::ror); 6 }
            0x6E => { let a = self.abs(); self.modify(a, Self::ror); 6 }
            0x7E => { let (a, _) = self.abx(); self.modify(a, Self::ror); 7 }

            // RTI/RTS
            0x40 => {
                self.status = (Status::from_bits_truncate(self.pop_byte()) & !Status::B) | Status::U;
                self.pc = self.pop_word();
                6
            }
            0x60 => { self.pc = self.pop_word().wrapping_add(1); 6 }

            // SBC
            0xE9 => { let a = self.imm(); let v = self.read(a); self.sbc(v); 2 }
            0xE5 => { let a = self.zp0(); let v = self.read(a); self.sbc(v); 3 }
            0xF5 => { let a = self.zpx(); let v = self.read(a); self.sbc(v); 4 }
            0xED => { let a = self.abs(); let v = self.read(a); self.sbc(v); 4 }
            0xFD => { let (a, p) = self.abx(); let v = self.read(a); self.sbc(v); 4 + u8::from(p) }
            0xF9 => { let (a, p) = self.aby(); let v = self.read(a); self.sbc(v); 4 + u8::from(p) }
            0xE1 => { let a = self.idx(); let v = self.read(a); self.sbc(v); 6 }
            0xF1 => { let (a, p) = self.idy(); let v = self.read(a); self.sbc(v); 5 + u8::from(p) }

            // STA
            0x85 => { let a = self.zp0(); self.write(a, self.acc); 3 }
            0x95 => { let a = self.zpx(); self.write(a, self.acc); 4 }
            0x8D => { let a = self.abs(); self.write(a, self.acc); 4 }
            0x9D => { let (a, _) = self.abx(); self.write(a, self.acc); 5 }
            0x99 => { let (a, _) = self.aby(); self.write(a, self.acc); 5 }
            0x81 => { let a = self.idx(); self.write(a, self.acc); 6 }
            0x91 => { let (a, _) = self.idy(); self.write(a, self.acc); 6 }

            // STX/STY
            0x86 => { let a = self.zp0(); self.write(a, self.x); 3 }
            0x96 => { let a = self.zpy(); self.write(a, self.x); 4 }
            0x8E => { let a = self.abs(); self.write(a, self.x); 4 }
            0x84 => { let a = self.zp0(); self.write(a, self.y); 3 }
            0x94 => { let a = self.zpx(); self.write(a, self.y); 4 }
            0x8C => { let a = self.abs(); self.write(a, self.y); 4 }

            // Transfers
            0xAA => { self.x = self.acc; self.set_zn(self.x); 2 } // TAX
            0xA8 => { self.y = self.acc; self.set_zn(self.y); 2 } // TAY
            0xBA => { self.x = self.sp; self.set_zn(self.x); 2 }  // TSX
            0x8A => { self.acc = self.x; self.set_zn(self.acc); 2 } // TXA
            0x9A => { self.sp = self.x; 2 }                        // TXS
            0x98 => { self.acc = self.y; self.set_zn(self.acc); 2 } // TYA

            // Unofficial opcodes run as NOPs, but still consume their
            // operand bytes so execution stays aligned
            0x80 | 0x82 | 0x89 | 0xC2 | 0xE2 => { let _ = self.imm(); 2 }
            0x04 | 0x44 | 0x64 => { let _ = self.zp0(); 3 }
            0x14 | 0x34 | 0x54 | 0x74 | 0xD4 | 0xF4 => { let _ = self.zpx(); 4 }
            0x0C => { let _ = self.abs(); 4 }
            0x1C | 0x3C | 0x5C | 0x7C | 0xDC | 0xFC => {
                let (_, p) = self.abx();
                4 + u8::from(p)
            }
            _ => 2,
        }
    }
}

impl Reset for Cpu {
    fn reset(&mut self, kind: ResetKind) {
        match kind {
            ResetKind::Soft => {
                self.status.insert(Status::I);
                // Reset suppresses the interrupt stack writes; only SP moves
                self.sp = self.sp.wrapping_sub(3);
            }
            ResetKind::Hard => {
                self.acc = 0x00;
                self.x = 0x00;
                self.y = 0x00;
                self.sp = Self::POWER_ON_SP;
                self.status = Self::POWER_ON_STATUS;
            }
        }
        self.nmi_pending = false;
        self.nmi_delayed = false;
        self.irq_pending = false;
        self.bus.reset(kind);
        self.pc = self.read_word(Self::RESET_VECTOR);
        trace!("{kind:?} reset - PC:${:04X}", self.pc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A CPU with the zero page free and no cartridge; programs are poked
    /// into WRAM and the PC pointed at them.
    fn cpu_with_program(program: &[u8]) -> Cpu {
        let mut cpu = Cpu::new(Bus::default());
        for (i, &byte) in program.iter().enumerate() {
            cpu.bus.write(0x0200 + i as u16, byte);
        }
        cpu.sp = 0xFD;
        cpu.status = Status::I | Status::U;
        cpu.pc = 0x0200;
        cpu
    }

    #[test]
    fn lda_imm_sets_flags() {
        let mut cpu = cpu_with_program(&[0xA9, 0x00, 0xA9, 0x80]);
        assert_eq!(cpu.step(), 2);
        assert!(cpu.status.contains(Status::Z));
        assert_eq!(cpu.step(), 2);
        assert!(cpu.status.contains(Status::N));
        assert!(!cpu.status.contains(Status::Z));
    }

    #[test]
    fn adc_overflow_and_carry() {
        // 0x50 + 0x50 = 0xA0: V set, C clear
        let mut cpu = cpu_with_program(&[0xA9, 0x50, 0x69, 0x50]);
        cpu.step();
        cpu.step();
        assert_eq!(cpu.acc, 0xA0);
        assert!(cpu.status.contains(Status::V));
        assert!(!cpu.status.contains(Status::C));

        // 0xD0 + 0x90 = 0x60 carry out, V set
        let mut cpu = cpu_with_program(&[0xA9, 0xD0, 0x69, 0x90]);
        cpu.step();
        cpu.step();
        assert_eq!(cpu.acc, 0x60);
        assert!(cpu.status.contains(Status::C));
        assert!(cpu.status.contains(Status::V));
    }

    #[test]
    fn sbc_uses_borrow() {
        // SEC; LDA #$10; SBC #$08
        let mut cpu = cpu_with_program(&[0x38, 0xA9, 0x10, 0xE9, 0x08]);
        cpu.step();
        cpu.step();
        cpu.step();
        assert_eq!(cpu.acc, 0x08);
        assert!(cpu.status.contains(Status::C), "no borrow");
    }

    #[test]
    fn decimal_flag_ignored_by_adc() {
        // SED; CLC; LDA #$09; ADC #$01 -> $0A in binary, not BCD $10
        let mut cpu = cpu_with_program(&[0xF8, 0x18, 0xA9, 0x09, 0x69, 0x01]);
        for _ in 0..4 {
            cpu.step();
        }
        assert_eq!(cpu.acc, 0x0A);
        assert!(cpu.status.contains(Status::D), "flag itself still tracks");
    }

    #[test]
    fn compare_sets_carry_on_greater_equal() {
        let mut cpu = cpu_with_program(&[0xA9, 0x40, 0xC9, 0x40, 0xC9, 0x41]);
        cpu.step();
        cpu.step();
        assert!(cpu.status.contains(Status::C));
        assert!(cpu.status.contains(Status::Z));
        cpu.step();
        assert!(!cpu.status.contains(Status::C));
        assert!(cpu.status.contains(Status::N));
    }

    #[test]
    fn branch_cycle_penalties() {
        // BNE forward, not taken (Z set)
        let mut cpu = cpu_with_program(&[0xA9, 0x00, 0xD0, 0x02]);
        cpu.step();
        assert_eq!(cpu.step(), 2, "branch not taken");

        // BEQ forward, taken, same page
        let mut cpu = cpu_with_program(&[0xA9, 0x00, 0xF0, 0x02]);
        cpu.step();
        assert_eq!(cpu.step(), 3, "taken, same page");
        assert_eq!(cpu.pc, 0x0206);
    }

    #[test]
    fn branch_page_cross_penalty() {
        let mut cpu = Cpu::new(Bus::default());
        cpu.pc = 0x02F0;
        cpu.bus.write(0x02F0, 0xD0); // BNE +$20 crosses into $0312
        cpu.bus.write(0x02F1, 0x20);
        assert_eq!(cpu.step(), 4, "taken across a page");
        assert_eq!(cpu.pc, 0x0312);
    }

    #[test]
    fn jmp_indirect_page_wrap_bug() {
        let mut cpu = cpu_with_program(&[0x6C, 0xFF, 0x03]);
        cpu.bus.write(0x03FF, 0x34);
        cpu.bus.write(0x0400, 0xFF); // would be the high byte without the bug
        cpu.bus.write(0x0300, 0x12); // actual high byte source
        assert_eq!(cpu.step(), 5);
        assert_eq!(cpu.pc, 0x1234, "high byte fetched from $0300, not $0400");
    }

    #[test]
    fn absolute_x_page_cross_penalty() {
        let mut cpu = cpu_with_program(&[0xBD, 0xFF, 0x02, 0xBD, 0x00, 0x03]);
        cpu.x = 0x01;
        assert_eq!(cpu.step(), 5, "read crosses into $0300");
        assert_eq!(cpu.step(), 4, "no cross");
    }

    #[test]
    fn indirect_y_page_cross_penalty() {
        let mut cpu = cpu_with_program(&[0xB1, 0x10]);
        cpu.bus.write(0x0010, 0xFF);
        cpu.bus.write(0x0011, 0x02);
        cpu.y = 0x01;
        assert_eq!(cpu.step(), 6, "base $02FF + 1 crosses");
    }

    #[test]
    fn sta_never_takes_page_penalty() {
        let mut cpu = cpu_with_program(&[0x9D, 0xFF, 0x02]);
        cpu.x = 0x01;
        assert_eq!(cpu.step(), 5);
    }

    #[test]
    fn php_sets_break_plp_ignores_it() {
        let mut cpu = cpu_with_program(&[0x08, 0x28]);
        cpu.status = Status::U | Status::C;
        cpu.step();
        let pushed = cpu.bus.peek(0x01FD);
        assert_eq!(pushed & 0x30, 0x30, "PHP pushes B|U");
        cpu.status = Status::U;
        cpu.step();
        assert!(!cpu.status.contains(Status::B), "PLP drops B");
        assert!(cpu.status.contains(Status::U), "PLP forces U");
        assert!(cpu.status.contains(Status::C));
    }

    #[test]
    fn jsr_rts_round_trip() {
        let mut cpu = cpu_with_program(&[0x20, 0x10, 0x02]); // JSR $0210
        cpu.bus.write(0x0210, 0x60); // RTS
        assert_eq!(cpu.step(), 6);
        assert_eq!(cpu.pc, 0x0210);
        assert_eq!(cpu.step(), 6);
        assert_eq!(cpu.pc, 0x0203, "returns past the JSR");
    }

    #[test]
    fn stack_wraps_within_page_one() {
        let mut cpu = cpu_with_program(&[0x48]); // PHA
        cpu.sp = 0x00;
        cpu.acc = 0x42;
        cpu.step();
        assert_eq!(cpu.bus.peek(0x0100), 0x42);
        assert_eq!(cpu.sp, 0xFF);
    }

    #[test]
    fn nmi_services_before_instruction() {
        let mut cpu = cpu_with_program(&[0xEA]);
        cpu.trigger_nmi();
        let sp_before = cpu.sp;
        assert_eq!(cpu.step(), 7);
        assert_eq!(cpu.sp, sp_before.wrapping_sub(3), "pc + status pushed");
        assert!(cpu.status.contains(Status::I));
        let pushed_status = cpu.bus.peek(0x0100 | u16::from(sp_before.wrapping_sub(2)));
        assert_eq!(pushed_status & 0x10, 0x00, "B clear on NMI push");
    }

    #[test]
    fn irq_masked_by_interrupt_disable() {
        let mut cpu = cpu_with_program(&[0xEA, 0x58, 0xEA]); // NOP; CLI; NOP
        cpu.trigger_irq();
        assert_eq!(cpu.step(), 2, "IRQ held while I set");
        cpu.step(); // CLI
        assert_eq!(cpu.step(), 7, "IRQ serviced once unmasked");
    }

    #[test]
    fn delayed_nmi_runs_one_more_instruction() {
        let mut cpu = cpu_with_program(&[0xEA, 0xEA]);
        cpu.trigger_nmi_delayed();
        assert_eq!(cpu.step(), 2, "next instruction still runs");
        assert_eq!(cpu.step(), 7, "then the NMI");
    }

    #[test]
    fn unofficial_opcodes_consume_operands() {
        // NOP zp, NOP abs, NOP imm then a real LDA
        let mut cpu = cpu_with_program(&[0x04, 0x00, 0x0C, 0x00, 0x00, 0x80, 0x00, 0xA9, 0x42]);
        assert_eq!(cpu.step(), 3);
        assert_eq!(cpu.step(), 4);
        assert_eq!(cpu.step(), 2);
        cpu.step();
        assert_eq!(cpu.acc, 0x42, "stream stays aligned");
    }

    #[test]
    fn hard_reset_state() {
        let mut cpu = Cpu::new(Bus::default());
        cpu.reset(ResetKind::Hard);
        assert_eq!(cpu.sp, 0xFD);
        assert_eq!(cpu.status.bits(), 0x24);
    }
}
