//! Rhai host for debug scripts.
//!
//! The core's `DebugBridge` only deals in plain callbacks and snapshot
//! structs, so everything rhai-specific lives here: the `on(...)`
//! subscription function, the introspection functions (`cpuState`,
//! `dumpMemory`, `writeByte`, `breakpoint`) and the pretty-printers.

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::{anyhow, Context, Result};
use rhai::{Dynamic, Engine, FnPtr, AST};

use pocketboy_gb::debug::{CpuSnapshot, DebugBridge, EventKind, EventPayload};
use pocketboy_gb::{Cpu, System};

/// Engine and compiled script, shared with every subscribed callback.
struct ScriptRuntime {
    engine: Engine,
    ast: AST,
}

type RuntimeSlot = Rc<RefCell<Option<Rc<ScriptRuntime>>>>;

/// A loaded debug script wired into a `System`.
///
/// Dropping the host does not detach the callbacks; keep it alive for the
/// lifetime of the system it was loaded into.
pub struct ScriptHost {
    _runtime: Rc<ScriptRuntime>,
}

impl ScriptHost {
    /// Read, compile and run a debug script, attaching its bridge to the
    /// system. Any failure is returned so startup can abort.
    pub fn load(system: &mut System, path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("failed to read debug script {}", path.display()))?;
        Self::from_source(system, &source)
    }

    pub fn from_source(system: &mut System, source: &str) -> Result<Self> {
        let bridge = Rc::new(DebugBridge::new());
        // Callbacks are created while the script runs, before the engine
        // is in its final home, so they reach it through this slot.
        let runtime_slot: RuntimeSlot = Rc::new(RefCell::new(None));

        let mut engine = Engine::new();
        register_subscribe_fn(&mut engine, &bridge, &runtime_slot);
        register_introspection_fns(&mut engine, system);
        register_pretty_printers(&mut engine, system);

        let ast = engine
            .compile(source)
            .map_err(|err| anyhow!("debug script parse error: {err}"))?;
        let runtime = Rc::new(ScriptRuntime { engine, ast });
        *runtime_slot.borrow_mut() = Some(Rc::clone(&runtime));

        runtime
            .engine
            .run_ast(&runtime.ast)
            .map_err(|err| anyhow!("debug script failed: {err}"))?;

        system.attach_bridge(bridge);
        Ok(Self { _runtime: runtime })
    }
}

fn register_subscribe_fn(engine: &mut Engine, bridge: &Rc<DebugBridge>, slot: &RuntimeSlot) {
    let bridge = Rc::clone(bridge);
    let slot = Rc::clone(slot);
    engine.register_fn("on", move |name: &str, callback: Dynamic| {
        let Some(kind) = EventKind::from_name(name) else {
            log::warn!("unknown debug event {name:?}");
            return;
        };
        let Some(fn_ptr) = callback.try_cast::<FnPtr>() else {
            log::warn!("expected a function for the {} callback", kind.name());
            return;
        };

        let slot = Rc::clone(&slot);
        bridge.subscribe(
            kind,
            Box::new(move |payload| {
                let guard = slot.borrow();
                let runtime = guard
                    .as_ref()
                    .ok_or_else(|| anyhow!("script runtime not initialised"))?;
                let arg = payload_to_dynamic(payload);
                fn_ptr
                    .call::<Dynamic>(&runtime.engine, &runtime.ast, (arg,))
                    .map_err(|err| anyhow!("{err}"))?;
                Ok(())
            }),
        );
    });
}

fn register_introspection_fns(engine: &mut Engine, system: &System) {
    {
        let cpu = system.cpu();
        engine.register_fn("cpuState", move || snapshot_to_map(&cpu.borrow().snapshot()));
    }
    {
        let cpu = system.cpu();
        engine.register_fn("dumpMemory", move || cpu.borrow().mmu.snapshot());
    }
    {
        let cpu = system.cpu();
        engine.register_fn("writeByte", move |addr: i64, value: i64| {
            cpu.borrow_mut().mmu.write_byte(addr as u16, value as u8);
        });
    }
    {
        let controller = system.controller();
        engine.register_fn("breakpoint", move || {
            log::info!("breakpoint requested by debug script");
            controller.request_breakpoint();
        });
    }
}

fn register_pretty_printers(engine: &mut Engine, system: &System) {
    {
        let cpu = system.cpu();
        engine.register_fn("ppCPU", move || {
            println!("{}", format_cpu(&cpu.borrow().snapshot()));
        });
    }
    {
        let cpu = system.cpu();
        engine.register_fn("ppInstruction", move |inst: rhai::Map| {
            println!("{}", format_instruction(&cpu.borrow(), &inst));
        });
    }
    {
        let cpu = system.cpu();
        engine.register_fn("ppSystem", move || {
            let cpu = cpu.borrow();
            let opcode = cpu.mmu.read_byte(cpu.pc);
            println!("next opcode: 0x{opcode:02X}");
            println!("{}", format_cpu(&cpu.snapshot()));
        });
    }
    {
        // Overload taking the instruction view handed to callbacks.
        let cpu = system.cpu();
        engine.register_fn("ppSystem", move |inst: rhai::Map| {
            let cpu = cpu.borrow();
            println!("{}", format_instruction(&cpu, &inst));
            println!("{}", format_cpu(&cpu.snapshot()));
        });
    }
}

fn payload_to_dynamic(payload: &EventPayload) -> Dynamic {
    match payload {
        EventPayload::Instruction(view) => {
            let mut map = rhai::Map::new();
            map.insert("opcode".into(), Dynamic::from(view.opcode as i64));
            map.insert(
                "opcodeHex".into(),
                Dynamic::from(format!("0x{:02X}", view.opcode)),
            );
            map.insert("mnemonic".into(), Dynamic::from(view.mnemonic.to_string()));
            map.insert("cycles".into(), Dynamic::from(view.cycles as i64));
            map.insert("len".into(), Dynamic::from(view.length as i64));
            Dynamic::from(map)
        }
        EventPayload::UnknownOpcode(opcode) => Dynamic::from(*opcode as i64),
    }
}

fn snapshot_to_map(snap: &CpuSnapshot) -> rhai::Map {
    let mut registers = rhai::Map::new();
    for (name, value) in [
        ("A", snap.registers.a),
        ("F", snap.registers.f),
        ("B", snap.registers.b),
        ("C", snap.registers.c),
        ("D", snap.registers.d),
        ("E", snap.registers.e),
        ("H", snap.registers.h),
        ("L", snap.registers.l),
    ] {
        registers.insert(name.into(), Dynamic::from(value as i64));
    }

    let mut pairs = rhai::Map::new();
    for (name, value) in [
        ("AF", snap.register_pairs.af),
        ("BC", snap.register_pairs.bc),
        ("DE", snap.register_pairs.de),
        ("HL", snap.register_pairs.hl),
    ] {
        pairs.insert(name.into(), Dynamic::from(value as i64));
    }

    let mut map = rhai::Map::new();
    map.insert(
        "stackPointer".into(),
        Dynamic::from(snap.stack_pointer as i64),
    );
    map.insert(
        "programCounter".into(),
        Dynamic::from(snap.program_counter as i64),
    );
    map.insert("registers".into(), Dynamic::from(registers));
    map.insert("registerPairs".into(), Dynamic::from(pairs));
    map.insert("flags".into(), Dynamic::from(snap.flags.clone()));
    map
}

fn format_cpu(snap: &CpuSnapshot) -> String {
    format!(
        "PC: 0x{:04X}  SP: 0x{:04X}  flags: {}\n\
         AF: 0x{:04X}  BC: 0x{:04X}  DE: 0x{:04X}  HL: 0x{:04X}",
        snap.program_counter,
        snap.stack_pointer,
        snap.flags,
        snap.register_pairs.af,
        snap.register_pairs.bc,
        snap.register_pairs.de,
        snap.register_pairs.hl,
    )
}

fn format_instruction(cpu: &Cpu, inst: &rhai::Map) -> String {
    let opcode = map_int(inst, "opcode");
    let len = map_int(inst, "len").max(1);
    let mnemonic = inst
        .get("mnemonic")
        .map(|v| v.to_string())
        .unwrap_or_default();

    let mut line = format!("0x{opcode:02X}: {mnemonic}");
    if len > 1 {
        line.push_str("  operands:");
        for i in 1..len {
            let byte = cpu.mmu.read_byte(cpu.pc.wrapping_add(i as u16));
            line.push_str(&format!(" 0x{byte:02X}"));
        }
    }
    line
}

fn map_int(map: &rhai::Map, key: &str) -> i64 {
    map.get(key).and_then(|v| v.as_int().ok()).unwrap_or(0)
}
