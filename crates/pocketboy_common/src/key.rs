/// Keys the frontends report to an `App`.
///
/// Covers the DMG joypad bindings (arrows, Z/X, Return/RShift) plus the
/// debugger hotkeys N (step) and K (continue).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Key {
    None,
    Up,
    Down,
    Left,
    Right,
    Z,
    X,
    N,
    K,
    Return,
    RShift,
    Escape,
}
