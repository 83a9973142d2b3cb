//! Shared helpers for building `iNES` images in memory.
#![allow(dead_code)]

/// Builds a minimal `iNES` 1.0 image around a handful of code fragments.
pub struct RomBuilder {
    mapper: u8,
    prg_banks: u8,
    chr_banks: u8,
    flags6: u8,
    prg: Vec<u8>,
    chr: Vec<u8>,
    nmi_vector: u16,
    reset_vector: u16,
    irq_vector: u16,
}

impl RomBuilder {
    pub fn new() -> Self {
        Self {
            mapper: 0,
            prg_banks: 1,
            chr_banks: 0,
            flags6: 0,
            prg: Vec::new(),
            chr: Vec::new(),
            nmi_vector: 0x8000,
            reset_vector: 0x8000,
            irq_vector: 0x8000,
        }
    }

    pub fn mapper(mut self, mapper: u8) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn prg_banks(mut self, banks: u8) -> Self {
        self.prg_banks = banks;
        self
    }

    pub fn chr_banks(mut self, banks: u8) -> Self {
        self.chr_banks = banks;
        self
    }

    pub fn vertical_mirroring(mut self) -> Self {
        self.flags6 |= 0x01;
        self
    }

    /// Place `code` at CPU address `addr` (assuming the first PRG bank maps
    /// at $8000 and the last maps up to $FFFF).
    pub fn code_at(mut self, addr: u16, code: &[u8]) -> Self {
        let offset = usize::from(addr - 0x8000);
        if self.prg.len() < offset + code.len() {
            self.prg.resize(offset + code.len(), 0xEA);
        }
        self.prg[offset..offset + code.len()].copy_from_slice(code);
        self
    }

    /// Place pattern bytes at a CHR offset (implies at least one CHR bank).
    pub fn chr_at(mut self, offset: usize, data: &[u8]) -> Self {
        if self.chr_banks == 0 {
            self.chr_banks = 1;
        }
        if self.chr.len() < offset + data.len() {
            self.chr.resize(offset + data.len(), 0x00);
        }
        self.chr[offset..offset + data.len()].copy_from_slice(data);
        self
    }

    pub fn nmi_vector(mut self, addr: u16) -> Self {
        self.nmi_vector = addr;
        self
    }

    pub fn reset_vector(mut self, addr: u16) -> Self {
        self.reset_vector = addr;
        self
    }

    pub fn irq_vector(mut self, addr: u16) -> Self {
        self.irq_vector = addr;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let prg_len = usize::from(self.prg_banks) * 0x4000;
        let chr_len = usize::from(self.chr_banks) * 0x2000;

        let mut prg = self.prg;
        prg.resize(prg_len, 0xEA);
        prg[prg_len - 6..].copy_from_slice(&[
            (self.nmi_vector & 0xFF) as u8,
            (self.nmi_vector >> 8) as u8,
            (self.reset_vector & 0xFF) as u8,
            (self.reset_vector >> 8) as u8,
            (self.irq_vector & 0xFF) as u8,
            (self.irq_vector >> 8) as u8,
        ]);

        let mut rom = vec![
            0x4E,
            0x45,
            0x53,
            0x1A,
            self.prg_banks,
            self.chr_banks,
            (self.mapper << 4) | self.flags6,
            self.mapper & 0xF0,
            0x00,
            0x00,
            0x00,
            0x00,
            0x00,
            0x00,
            0x00,
            0x00,
        ];
        rom.extend_from_slice(&prg);
        let mut chr = self.chr;
        chr.resize(chr_len, 0x00);
        rom.extend_from_slice(&chr);
        rom
    }
}

/// A ROM that spins forever with rendering and NMI disabled.
pub fn idle_rom() -> Vec<u8> {
    RomBuilder::new()
        .code_at(0x8000, &[0x4C, 0x00, 0x80]) // JMP $8000
        .build()
}

/// A ROM that enables background+sprite rendering, then spins forever.
pub fn rendering_rom() -> Vec<u8> {
    RomBuilder::new()
        .code_at(
            0x8000,
            &[
                0xA9, 0x18, // LDA #$18
                0x8D, 0x01, 0x20, // STA $2001
                0x4C, 0x05, 0x80, // JMP $8005
            ],
        )
        .build()
}
