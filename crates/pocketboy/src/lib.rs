pub mod app;
pub mod input;
pub mod script;

pub use app::EmulatorApp;
pub use script::ScriptHost;

use anyhow::Result;
use pocketboy_gb::{System, SCREEN_HEIGHT, SCREEN_SCALE, SCREEN_WIDTH};
use pocketboy_sdl2::{SdlContext, SdlInitInfo};

/// Hand the composed system to the SDL frontend and block until exit.
pub fn run(system: System) -> Result<()> {
    let app = EmulatorApp::new(system);
    let init_info = SdlInitInfo::builder()
        .width(SCREEN_WIDTH as u32)
        .height(SCREEN_HEIGHT as u32)
        .scale(SCREEN_SCALE)
        .title("PocketBoy".to_string())
        .build();
    log::info!("starting Game Boy emulator");
    SdlContext::run(init_info, app)
}
