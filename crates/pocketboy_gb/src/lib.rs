pub mod cpu;
pub mod debug;
pub mod mmu;
pub mod system;

pub use cpu::Cpu;
pub use mmu::Mmu;
pub use system::System;

/// Logical screen width in pixels for the Game Boy DMG.
pub const SCREEN_WIDTH: usize = 160;
/// Logical screen height in pixels.
pub const SCREEN_HEIGHT: usize = 144;
/// Default integer scaling factor for the SDL frontend.
pub const SCREEN_SCALE: u32 = 4;
