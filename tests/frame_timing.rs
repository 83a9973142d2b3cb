//! Frame-level timing: cycle budgets, the odd-frame dot skip, NMI cadence,
//! and OAM DMA stalls.

use velones_core::prelude::*;

mod common;
use common::{idle_rom, rendering_rom, RomBuilder};

fn deck_with(rom: &[u8]) -> ControlDeck {
    let mut deck = ControlDeck::new();
    deck.load_rom(rom).expect("valid rom");
    deck
}

#[test]
fn run_frame_advances_frame_count() {
    let mut deck = deck_with(&idle_rom());
    assert_eq!(deck.frame_count(), 0);
    for i in 1..=5 {
        deck.run_frame(VirtualButtons::empty(), VirtualButtons::empty());
        assert_eq!(deck.frame_count(), i);
    }
}

#[test]
fn frame_cycle_budget() {
    let mut deck = deck_with(&idle_rom());
    // First frame is short (power-on to the first VBlank)
    deck.run_frame(VirtualButtons::empty(), VirtualButtons::empty());
    let start = deck.cycle_count();
    deck.run_frame(VirtualButtons::empty(), VirtualButtons::empty());
    let delta = deck.cycle_count() - start;
    // 89342 dots / 3, up to one instruction of jitter on either side
    assert!(
        (29775..=29790).contains(&delta),
        "frame took {delta} CPU cycles"
    );
}

#[test]
fn cycle_count_tracks_ppu_dots() {
    let mut deck = deck_with(&idle_rom());
    for _ in 0..5 {
        deck.run_frame(VirtualButtons::empty(), VirtualButtons::empty());
    }
    assert_eq!(
        deck.cycle_count() * 3,
        deck.ppu().cycle_count,
        "CPU and PPU stay in 1:3 lockstep"
    );
}

#[test]
fn odd_frame_skip_shortens_rendered_frames() {
    // Measured over enough frames, the per-odd-frame dot skip separates
    // cleanly from instruction-boundary jitter.
    const FRAMES: u64 = 200;

    let mut rendered = deck_with(&rendering_rom());
    rendered.run_frame(VirtualButtons::empty(), VirtualButtons::empty());
    let start = rendered.ppu().cycle_count;
    for _ in 0..FRAMES {
        rendered.run_frame(VirtualButtons::empty(), VirtualButtons::empty());
    }
    let rendered_dots = rendered.ppu().cycle_count - start;

    let mut idle = deck_with(&idle_rom());
    idle.run_frame(VirtualButtons::empty(), VirtualButtons::empty());
    let start = idle.ppu().cycle_count;
    for _ in 0..FRAMES {
        idle.run_frame(VirtualButtons::empty(), VirtualButtons::empty());
    }
    let idle_dots = idle.ppu().cycle_count - start;

    let saved = idle_dots as i64 - rendered_dots as i64;
    let expected = (FRAMES / 2) as i64;
    assert!(
        (saved - expected).abs() <= 24,
        "expected ~{expected} skipped dots, measured {saved}"
    );
}

#[test]
fn nmi_fires_once_per_frame() {
    // NMI handler counts frames into $60
    let rom = RomBuilder::new()
        .code_at(
            0x8000,
            &[
                0xA9, 0x80, // LDA #$80
                0x8D, 0x00, 0x20, // STA $2000
                0x4C, 0x05, 0x80, // JMP $8005
            ],
        )
        .code_at(0x8100, &[0xE6, 0x60, 0x40]) // INC $60; RTI
        .nmi_vector(0x8100)
        .build();
    let mut deck = deck_with(&rom);

    const FRAMES: u8 = 30;
    for _ in 0..FRAMES {
        deck.run_frame(VirtualButtons::empty(), VirtualButtons::empty());
    }
    let count = deck.read_memory(0x60);
    // The NMI raised at a frame's VBlank is serviced early in the next
    // run_frame call
    assert!(
        count == FRAMES || count == FRAMES - 1,
        "NMI count {count} for {FRAMES} frames"
    );
}

#[test]
fn oam_dma_reports_513_stall_cycles() {
    let rom = RomBuilder::new()
        .code_at(
            0x8000,
            &[
                0xA9, 0x07, // LDA #$07
                0x8D, 0x14, 0x40, // STA $4014
                0x4C, 0x05, 0x80, // JMP $8005
            ],
        )
        .build();
    let mut deck = deck_with(&rom);

    let cpu = deck.cpu_mut();
    assert_eq!(cpu.step(), 2, "LDA #imm");
    assert_eq!(cpu.step(), 4, "STA abs");
    assert_eq!(cpu.bus.take_dma_cycles(), 513, "stall owed to the frame loop");
    assert_eq!(cpu.bus.take_dma_cycles(), 0);
}

#[test]
fn audio_samples_accumulate_per_frame() {
    let mut deck = deck_with(&idle_rom());
    deck.run_frame(VirtualButtons::empty(), VirtualButtons::empty());
    deck.drain_audio(&mut [0.0; 4096]);

    deck.run_frame(VirtualButtons::empty(), VirtualButtons::empty());
    let pairs = deck.audio_len() / 2;
    // ~735 stereo pairs per NTSC frame at 44.1 kHz
    assert!(
        (731..=739).contains(&pairs),
        "{pairs} stereo pairs this frame"
    );
}
