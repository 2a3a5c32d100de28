// ============================================================================
// Campaign Defaults
// ============================================================================

/// Directory campaign logs are written to
pub const DEFAULT_LOG_DIR: &str = "log";

/// Serial device of the measurement target
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Zero bytes in front of the random part of a campaign address
pub const ADDRESS_ZERO_PAD: usize = 6;

/// Random bytes at the end of a campaign address
pub const ADDRESS_RANDOM_BYTES: usize = 2;

// ============================================================================
// Progress Bar Theming
// ============================================================================

/// Orange theme color - single source of truth for RGB values
/// Uses (255, 175, 0) to exactly match xterm-256 color 214 for consistency
pub const ORANGE: (u8, u8, u8) = (255, 175, 0);

/// Nearest xterm-256 color index from RGB
///
/// Colors 16-231 form a 6×6×6 cube with component levels
/// 0, 95, 135, 175, 215, 255.
const fn rgb_to_xterm256(r: u8, g: u8, b: u8) -> u8 {
    const fn nearest_idx(val: u8) -> u8 {
        if val < 48 {
            0
        } else if val < 115 {
            1
        } else if val < 155 {
            2
        } else if val < 195 {
            3
        } else if val < 235 {
            4
        } else {
            5
        }
    }
    16 + 36 * nearest_idx(r) + 6 * nearest_idx(g) + nearest_idx(b)
}

/// Orange theme color (xterm-256 color code for indicatif) - derived from ORANGE
pub const ORANGE_256: u8 = rgb_to_xterm256(ORANGE.0, ORANGE.1, ORANGE.2);
