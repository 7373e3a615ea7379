use pocketboy_common::app::App;
use pocketboy_common::color::Color;
use pocketboy_common::key::Key;
use pocketboy_gb::debug::StepController;
use pocketboy_gb::{System, SCREEN_HEIGHT, SCREEN_SCALE, SCREEN_WIDTH};

use crate::input::InputState;

/// Drives the machine from the SDL frame loop.
pub struct EmulatorApp {
    system: System,
    controller: StepController,
    input: InputState,
    should_exit: bool,
}

impl EmulatorApp {
    pub fn new(system: System) -> Self {
        let controller = system.controller();
        Self {
            system,
            controller,
            input: InputState::default(),
            should_exit: false,
        }
    }
}

impl App for EmulatorApp {
    fn init(&mut self) {
        log::info!("Game Boy init");
    }

    fn update(&mut self, screen_state: &mut [u8]) {
        if self.system.breakpoint_active() {
            // Halted at a breakpoint: service at most one debugger request
            // and return, so the frontend keeps pumping events.
            self.system.poll_debug();
        } else {
            self.system.step_frame();
        }

        // No PPU yet; paint the unlit LCD shade.
        let (r, g, b) = Color::DMG_LIGHTEST.rgb();
        for pixel in screen_state.chunks_exact_mut(3) {
            pixel[0] = r;
            pixel[1] = g;
            pixel[2] = b;
        }
    }

    fn handle_key_event(&mut self, key: Key, is_down: bool) {
        log::debug!("key event: {:?} down={}", key, is_down);
        match key {
            Key::Escape if is_down => self.should_exit = true,
            // Debugger hotkeys fire on release: one step per press.
            Key::N if !is_down => self.controller.request_next(),
            Key::K if !is_down => self.controller.request_continue(),
            _ => self.input.handle_key(key, is_down),
        }
    }

    fn should_exit(&self) -> bool {
        self.should_exit
    }

    fn exit(&mut self) {
        log::info!("Game Boy exit");
    }

    fn width(&self) -> u32 {
        SCREEN_WIDTH as u32
    }

    fn height(&self) -> u32 {
        SCREEN_HEIGHT as u32
    }

    fn scale(&self) -> u32 {
        SCREEN_SCALE
    }

    fn title(&self) -> String {
        "PocketBoy".to_string()
    }
}
