use pocketboy_common::key::Key;

/// Current joypad button state, updated from frontend key events.
///
/// Nothing reads this back yet; the joypad register is not modeled. It is
/// the seam where that wiring will land.
#[derive(Debug, Default)]
pub struct InputState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub a: bool,
    pub b: bool,
    pub start: bool,
    pub select: bool,
}

impl InputState {
    pub fn handle_key(&mut self, key: Key, is_down: bool) {
        match key {
            Key::Up => self.up = is_down,
            Key::Down => self.down = is_down,
            Key::Left => self.left = is_down,
            Key::Right => self.right = is_down,
            Key::X => self.a = is_down,
            Key::Z => self.b = is_down,
            Key::Return => self.start = is_down,
            Key::RShift => self.select = is_down,
            _ => {}
        }
    }
}
