//! # ESC/POS Control Commands
//!
//! Byte-level command builders. Commands are escape sequences beginning
//! with ESC (0x1B) or GS (0x1D); multi-byte integers are little-endian.

/// ESC (Escape) - command prefix byte.
pub const ESC: u8 = 0x1B;

/// GS (Group Separator) - extended command prefix.
pub const GS: u8 = 0x1D;

/// # Initialize Printer (ESC @)
///
/// Resets the printer to its power-on default state. Sent at the start of
/// every print job so earlier jobs cannot leak formatting state.
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC @ |
/// | Hex     | 1B 40 |
///
/// ## Example
///
/// ```
/// use etiqueta::protocol::commands;
///
/// assert_eq!(commands::init(), vec![0x1B, 0x40]);
/// ```
#[inline]
pub fn init() -> Vec<u8> {
    vec![ESC, b'@']
}

/// Split a `u16` into little-endian `[low, high]` bytes.
#[inline]
pub fn u16_le(value: u16) -> [u8; 2] {
    [(value & 0xFF) as u8, (value >> 8) as u8]
}
