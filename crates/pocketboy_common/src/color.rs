#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    // The four shades of the original DMG LCD, lightest to darkest.
    pub const DMG_LIGHTEST: Color = Color::new_rgb(0x9B, 0xBC, 0x0F);
    pub const DMG_LIGHT: Color = Color::new_rgb(0x8B, 0xAC, 0x0F);
    pub const DMG_DARK: Color = Color::new_rgb(0x30, 0x62, 0x30);
    pub const DMG_DARKEST: Color = Color::new_rgb(0x0F, 0x38, 0x0F);

    #[inline]
    pub const fn new_rgb(r: u8, g: u8, b: u8) -> Color {
        Color { r, g, b, a: 0xff }
    }

    #[inline]
    pub const fn rgb(&self) -> (u8, u8, u8) {
        (self.r, self.g, self.b)
    }
}
