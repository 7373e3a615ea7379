//! Debugger-facing surface of the core: execution lifecycle events, state
//! snapshots, and the breakpoint step/continue handshake.
//!
//! Nothing here knows about any particular scripting engine. A host
//! subscribes plain callbacks and reads plain snapshot structs, so the
//! scripting runtime can be swapped without touching the core.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Arc;

use anyhow::Result;

use crate::cpu::opcodes::Instruction;

/// Execution lifecycle events a debugger can observe.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    BeforeExecute,
    AfterExecute,
    UnimplementedOpcode,
}

impl EventKind {
    /// The event name used by debug scripts.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::BeforeExecute => "before_execute",
            EventKind::AfterExecute => "after_execute",
            EventKind::UnimplementedOpcode => "unimplemented_opcode",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "before_execute" => Some(EventKind::BeforeExecute),
            "after_execute" => Some(EventKind::AfterExecute),
            "unimplemented_opcode" => Some(EventKind::UnimplementedOpcode),
            _ => None,
        }
    }
}

/// Descriptor fields exposed to debugger callbacks.
#[derive(Clone, Debug)]
pub struct InstructionView {
    pub opcode: u8,
    pub mnemonic: &'static str,
    pub cycles: u32,
    pub length: u16,
}

impl From<&Instruction> for InstructionView {
    fn from(inst: &Instruction) -> Self {
        Self {
            opcode: inst.opcode,
            mnemonic: inst.mnemonic,
            cycles: inst.cycles,
            length: inst.length,
        }
    }
}

/// Payload delivered with each event.
#[derive(Clone, Debug)]
pub enum EventPayload {
    Instruction(InstructionView),
    UnknownOpcode(u8),
}

pub type EventCallback = Box<dyn FnMut(&EventPayload) -> Result<()>>;

/// Callback registry for execution events.
///
/// Callbacks run in subscription order. A callback error is logged and the
/// remaining callbacks still run; a debug script fault must never stop the
/// machine.
#[derive(Default)]
pub struct DebugBridge {
    callbacks: RefCell<HashMap<EventKind, Vec<EventCallback>>>,
}

impl DebugBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, event: EventKind, callback: EventCallback) {
        self.callbacks
            .borrow_mut()
            .entry(event)
            .or_default()
            .push(callback);
    }

    pub fn publish(&self, event: EventKind, payload: &EventPayload) {
        // Run with the registry borrow released, so a callback that calls
        // subscribe does not hit the RefCell.
        let mut running = {
            let mut map = self.callbacks.borrow_mut();
            match map.get_mut(&event) {
                Some(list) => std::mem::take(list),
                None => return,
            }
        };

        for callback in running.iter_mut() {
            if let Err(err) = callback(payload) {
                log::error!("debug callback for {} failed: {err:#}", event.name());
            }
        }

        // Merge back, keeping anything subscribed while we were running.
        let mut map = self.callbacks.borrow_mut();
        let slot = map.entry(event).or_default();
        let added = std::mem::take(slot);
        *slot = running;
        slot.extend(added);
    }
}

/// A pending step or continue request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StepSignal {
    Step,
    Continue,
}

/// Sender half of the breakpoint handshake. Cloneable; handed to whatever
/// delivers step/continue requests (key bindings, a debug script).
#[derive(Clone)]
pub struct StepController {
    breakpoint: Arc<AtomicBool>,
    step_tx: SyncSender<()>,
    cont_tx: SyncSender<()>,
}

impl StepController {
    /// Halt stepping before the next instruction. Idempotent.
    pub fn request_breakpoint(&self) {
        self.breakpoint.store(true, Ordering::SeqCst);
    }

    pub fn breakpoint_active(&self) -> bool {
        self.breakpoint.load(Ordering::SeqCst)
    }

    /// Ask for one instruction to execute. Dropped when no breakpoint is
    /// active or a step request is already pending.
    pub fn request_next(&self) {
        if self.breakpoint_active() {
            let _ = self.step_tx.try_send(());
        }
    }

    /// Ask to resume free running. Same drop rules as `request_next`.
    pub fn request_continue(&self) {
        if self.breakpoint_active() {
            let _ = self.cont_tx.try_send(());
        }
    }
}

/// Receiver half of the breakpoint handshake, owned by the stepping loop.
pub struct StepListener {
    breakpoint: Arc<AtomicBool>,
    step_rx: Receiver<()>,
    cont_rx: Receiver<()>,
}

impl StepListener {
    pub fn breakpoint_active(&self) -> bool {
        self.breakpoint.load(Ordering::SeqCst)
    }

    /// Non-blocking check for a pending signal. Continue wins when both
    /// are pending and clears the breakpoint state; any step request
    /// still buffered is discarded with it, so it cannot fire as a
    /// spurious step under a later breakpoint.
    pub fn poll(&self) -> Option<StepSignal> {
        if self.cont_rx.try_recv().is_ok() {
            self.breakpoint.store(false, Ordering::SeqCst);
            while self.step_rx.try_recv().is_ok() {}
            return Some(StepSignal::Continue);
        }
        if self.step_rx.try_recv().is_ok() {
            return Some(StepSignal::Step);
        }
        None
    }
}

/// Create a connected controller/listener pair.
///
/// Each signal queue holds at most one outstanding request, mirroring the
/// one-keypress-one-step debugger interaction.
pub fn step_channel() -> (StepController, StepListener) {
    let breakpoint = Arc::new(AtomicBool::new(false));
    let (step_tx, step_rx) = sync_channel(1);
    let (cont_tx, cont_rx) = sync_channel(1);
    (
        StepController {
            breakpoint: Arc::clone(&breakpoint),
            step_tx,
            cont_tx,
        },
        StepListener {
            breakpoint,
            step_rx,
            cont_rx,
        },
    )
}

/// Register file values captured for the debugger.
#[derive(Clone, Debug)]
pub struct RegisterSnapshot {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
}

#[derive(Clone, Debug)]
pub struct PairSnapshot {
    pub af: u16,
    pub bc: u16,
    pub de: u16,
    pub hl: u16,
}

/// Full CPU state as seen by `cpuState()` in debug scripts.
#[derive(Clone, Debug)]
pub struct CpuSnapshot {
    pub stack_pointer: u16,
    pub program_counter: u16,
    pub registers: RegisterSnapshot,
    pub register_pairs: PairSnapshot,
    pub flags: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::cell::Cell;
    use std::rc::Rc;

    fn nop_view() -> EventPayload {
        EventPayload::Instruction(InstructionView {
            opcode: 0x00,
            mnemonic: "NOP",
            cycles: 4,
            length: 1,
        })
    }

    #[test]
    fn callbacks_run_in_subscription_order() {
        let bridge = DebugBridge::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for tag in ["first", "second"] {
            let order = Rc::clone(&order);
            bridge.subscribe(
                EventKind::BeforeExecute,
                Box::new(move |_| {
                    order.borrow_mut().push(tag);
                    Ok(())
                }),
            );
        }

        bridge.publish(EventKind::BeforeExecute, &nop_view());
        assert_eq!(*order.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn failing_callback_does_not_stop_later_ones() {
        let bridge = DebugBridge::new();
        let reached = Rc::new(Cell::new(false));

        bridge.subscribe(
            EventKind::AfterExecute,
            Box::new(|_| Err(anyhow!("script blew up"))),
        );
        let flag = Rc::clone(&reached);
        bridge.subscribe(
            EventKind::AfterExecute,
            Box::new(move |_| {
                flag.set(true);
                Ok(())
            }),
        );

        bridge.publish(EventKind::AfterExecute, &nop_view());
        assert!(reached.get());
    }

    #[test]
    fn signals_are_dropped_without_an_active_breakpoint() {
        let (controller, listener) = step_channel();
        controller.request_next();
        controller.request_continue();
        assert_eq!(listener.poll(), None);
    }

    #[test]
    fn step_then_continue_round_trip() {
        let (controller, listener) = step_channel();
        controller.request_breakpoint();
        assert!(listener.breakpoint_active());

        controller.request_next();
        assert_eq!(listener.poll(), Some(StepSignal::Step));
        assert!(listener.breakpoint_active());

        controller.request_continue();
        assert_eq!(listener.poll(), Some(StepSignal::Continue));
        assert!(!listener.breakpoint_active());
        assert_eq!(listener.poll(), None);
    }

    #[test]
    fn continue_discards_a_pending_step() {
        let (controller, listener) = step_channel();
        controller.request_breakpoint();

        controller.request_next();
        controller.request_continue();
        assert_eq!(listener.poll(), Some(StepSignal::Continue));

        // The step buffered before Continue must not leak into the next
        // breakpoint session.
        controller.request_breakpoint();
        assert_eq!(listener.poll(), None);
    }

    #[test]
    fn signal_slots_hold_at_most_one_request() {
        let (controller, listener) = step_channel();
        controller.request_breakpoint();

        controller.request_next();
        controller.request_next();
        controller.request_next();

        assert_eq!(listener.poll(), Some(StepSignal::Step));
        assert_eq!(listener.poll(), None);
    }

    #[test]
    fn event_names_round_trip() {
        for kind in [
            EventKind::BeforeExecute,
            EventKind::AfterExecute,
            EventKind::UnimplementedOpcode,
        ] {
            assert_eq!(EventKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(EventKind::from_name("on_fire"), None);
    }
}
