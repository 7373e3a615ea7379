use crate::key::Key;

/// Contract between an emulator frontend loop and the machine it drives.
///
/// The frontend calls `update` once per frame with the RGB24 framebuffer to
/// fill, and forwards key transitions through `handle_key_event`.
pub trait App {
    fn init(&mut self);
    fn update(&mut self, screen: &mut [u8]);
    fn handle_key_event(&mut self, key: Key, is_down: bool);
    fn should_exit(&self) -> bool;
    fn exit(&mut self);

    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn scale(&self) -> u32;
    fn title(&self) -> String;
}
