//! Terminal preview of a rendered buffer
//!
//! Encodes two image rows per character row using the upper half-block
//! (U+2580) with 24-bit ANSI colours: foreground paints the top pixel,
//! background the bottom one.

/// Probe the terminal for a preview size: full width, and two pixel rows per
/// character row with space left for a status line. Falls back to 120x72
/// when no terminal is attached.
pub fn terminal_dimensions() -> (usize, usize) {
    match crossterm::terminal::size() {
        Ok((w, h)) => {
            let width = (w as usize).max(16);
            let height = ((h.saturating_sub(2) as usize) * 2).max(16);
            (width, height)
        }
        Err(_) => (120, 72),
    }
}

/// Render an RGB byte buffer as ANSI half-block art.
pub fn to_halfblocks(buffer: &[u8], width: usize, height: usize) -> String {
    assert_eq!(buffer.len(), width * height * 3);

    let char_rows = (height + 1) / 2;
    let mut out = String::with_capacity(width * char_rows * 40 + char_rows);

    for row in 0..char_rows {
        for col in 0..width {
            let top = pixel(buffer, width, row * 2, col);
            // Odd image heights leave the last bottom pixel black.
            let bottom = if row * 2 + 1 < height {
                pixel(buffer, width, row * 2 + 1, col)
            } else {
                [0, 0, 0]
            };
            out.push_str(&format!(
                "\x1b[38;2;{};{};{}m\x1b[48;2;{};{};{}m\u{2580}",
                top[0], top[1], top[2], bottom[0], bottom[1], bottom[2]
            ));
        }
        out.push_str("\x1b[0m\n");
    }

    out
}

fn pixel(buffer: &[u8], width: usize, row: usize, col: usize) -> [u8; 3] {
    let i = (row * width + col) * 3;
    [buffer[i], buffer[i + 1], buffer[i + 2]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_halfblock_row_count() {
        let buffer = vec![0u8; 4 * 6 * 3];
        let out = to_halfblocks(&buffer, 4, 6);
        assert_eq!(out.lines().count(), 3);
    }

    #[test]
    fn test_halfblock_odd_height_rounds_up() {
        let buffer = vec![0u8; 4 * 5 * 3];
        let out = to_halfblocks(&buffer, 4, 5);
        assert_eq!(out.lines().count(), 3);
    }

    #[test]
    fn test_halfblock_encodes_colours() {
        let mut buffer = vec![0u8; 1 * 2 * 3];
        buffer[0] = 255; // top pixel red
        buffer[5] = 255; // bottom pixel blue
        let out = to_halfblocks(&buffer, 1, 2);
        assert!(out.contains("\x1b[38;2;255;0;0m"));
        assert!(out.contains("\x1b[48;2;0;0;255m"));
        assert!(out.contains('\u{2580}'));
    }

    #[test]
    fn test_fallback_dimensions_are_sane() {
        let (w, h) = terminal_dimensions();
        assert!(w >= 16);
        assert!(h >= 16);
    }
}
