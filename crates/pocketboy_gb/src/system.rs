use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use crate::cpu::{Cpu, Decoded};
use crate::debug::{
    step_channel, DebugBridge, EventKind, EventPayload, InstructionView, StepController,
    StepListener, StepSignal,
};
use crate::mmu::{MemoryError, Mmu, ROM_END};

/// T-cycles in one DMG frame; used only to batch stepping per render pass.
const CYCLES_PER_FRAME: u64 = 70_224;

/// Composition root of the machine: the CPU (which owns the memory unit),
/// an optional debug bridge, and the breakpoint handshake.
///
/// The CPU lives behind `Rc<RefCell<_>>` so a debug-script host can hold
/// the same handle for its introspection functions. `step` releases the
/// CPU borrow before publishing any event, which lets callbacks read and
/// write live state.
pub struct System {
    cpu: Rc<RefCell<Cpu>>,
    bridge: Option<Rc<DebugBridge>>,
    controller: StepController,
    listener: StepListener,
}

impl Default for System {
    fn default() -> Self {
        Self::new()
    }
}

impl System {
    pub fn new() -> Self {
        let (controller, listener) = step_channel();
        Self {
            cpu: Rc::new(RefCell::new(Cpu::new(Mmu::new()))),
            bridge: None,
            controller,
            listener,
        }
    }

    /// Shared handle to the CPU, for debugger introspection.
    pub fn cpu(&self) -> Rc<RefCell<Cpu>> {
        Rc::clone(&self.cpu)
    }

    /// Sender half of the breakpoint handshake, for key bindings and
    /// debug scripts.
    pub fn controller(&self) -> StepController {
        self.controller.clone()
    }

    pub fn attach_bridge(&mut self, bridge: Rc<DebugBridge>) {
        log::info!("attaching debug bridge to the cpu");
        self.bridge = Some(bridge);
    }

    /// Copy a ROM image into the cartridge area at 0x0000.
    pub fn load_rom(&mut self, rom: &[u8]) {
        let len = rom.len().min(ROM_END);
        if len < rom.len() {
            log::warn!(
                "ROM is {} bytes, truncating to the {} byte cartridge area",
                rom.len(),
                ROM_END
            );
        }
        self.cpu.borrow_mut().mmu.write_bytes(&rom[..len], 0);
    }

    /// Overlay a boot image at address 0 and restart execution from it.
    pub fn perform_bootstrap(&mut self, path: &Path) -> Result<(), MemoryError> {
        let mut cpu = self.cpu.borrow_mut();
        cpu.mmu.load_boot_image(path)?;
        cpu.reset_to_boot();
        Ok(())
    }

    pub fn breakpoint_active(&self) -> bool {
        self.listener.breakpoint_active()
    }

    /// Execute one instruction, publishing lifecycle events around it.
    ///
    /// Returns the T-cycles consumed, or 0 for an opcode with no table
    /// entry; the stall leaves PC and all state untouched and reports one
    /// `unimplemented_opcode` event.
    pub fn step(&mut self) -> u32 {
        let decoded = self.cpu.borrow().decode();
        match decoded {
            Decoded::Unknown(opcode) => {
                if let Some(bridge) = &self.bridge {
                    bridge.publish(
                        EventKind::UnimplementedOpcode,
                        &EventPayload::UnknownOpcode(opcode),
                    );
                }
                0
            }
            Decoded::Instruction { inst, prefixed } => {
                let view = InstructionView::from(&inst);
                if let Some(bridge) = &self.bridge {
                    bridge.publish(
                        EventKind::BeforeExecute,
                        &EventPayload::Instruction(view.clone()),
                    );
                }
                let cycles = self.cpu.borrow_mut().execute(&inst, prefixed);
                if let Some(bridge) = &self.bridge {
                    bridge.publish(EventKind::AfterExecute, &EventPayload::Instruction(view));
                }
                cycles
            }
        }
    }

    /// Step roughly one frame worth of instructions.
    ///
    /// Stops early when the CPU stalls on an unknown opcode or a callback
    /// raises a breakpoint mid-frame.
    pub fn step_frame(&mut self) {
        let start = self.cpu.borrow().cycle_count();
        while self.cpu.borrow().cycle_count().wrapping_sub(start) < CYCLES_PER_FRAME {
            if self.breakpoint_active() {
                break;
            }
            if self.step() == 0 {
                break;
            }
        }
    }

    /// Service the breakpoint handshake once, without blocking.
    ///
    /// A pending Step executes exactly one instruction; a pending Continue
    /// clears the breakpoint so the next frame free-runs; nothing pending
    /// returns immediately so the caller's event loop stays responsive.
    pub fn poll_debug(&mut self) {
        match self.listener.poll() {
            Some(StepSignal::Step) => {
                self.step();
            }
            Some(StepSignal::Continue) => {
                log::info!("continuing from breakpoint");
            }
            None => {}
        }
    }
}
