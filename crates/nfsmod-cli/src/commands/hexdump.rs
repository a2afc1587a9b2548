//! Hexdump command implementation.
//!
//! ```text
//! 0x000: 4E 46 53 43 6F 6E 74 65  00 00 00 00 00 00 00 00  |NFSConte........|
//! ```

use anyhow::Result;
use nfsmod_core::{Address, Platform, ProtectedMemory};

use super::hex_utils::describe;

const BYTES_PER_LINE: usize = 16;

/// Run the hexdump command
pub fn run<P: Platform>(
    memory: &ProtectedMemory<P>,
    address: Address,
    size: usize,
    ascii: bool,
) -> Result<()> {
    let bytes = memory.read_bytes(address, size)?;

    println!("Hexdump at {} ({} bytes):", describe(memory, address), size);
    println!();

    for (i, chunk) in bytes.chunks(BYTES_PER_LINE).enumerate() {
        println!("{}", format_line(i * BYTES_PER_LINE, chunk, ascii));
    }

    Ok(())
}

/// One dump line: offset, hex bytes with a gap after the eighth, optional ASCII column.
pub fn format_line(offset: usize, chunk: &[u8], ascii: bool) -> String {
    let mut line = format!("0x{:03X}: ", offset);

    for j in 0..BYTES_PER_LINE {
        if j == 8 {
            line.push(' ');
        }
        match chunk.get(j) {
            Some(byte) => line.push_str(&format!("{:02X} ", byte)),
            None => line.push_str("   "),
        }
    }

    if ascii {
        line.push_str(" |");
        for byte in chunk {
            if (0x20..0x7F).contains(byte) {
                line.push(*byte as char);
            } else {
                line.push('.');
            }
        }
        for _ in chunk.len()..BYTES_PER_LINE {
            line.push(' ');
        }
        line.push('|');
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_line() {
        let chunk: Vec<u8> = (0x41..0x51).collect();
        assert_eq!(
            format_line(0x20, &chunk, false),
            "0x020: 41 42 43 44 45 46 47 48  49 4A 4B 4C 4D 4E 4F 50 "
        );
    }

    #[test]
    fn test_short_line_is_padded() {
        let line = format_line(0, &[0xDE, 0xAD], true);
        assert!(line.starts_with("0x000: DE AD "));
        assert!(line.ends_with(" |..              |"));
        assert_eq!(
            line.len(),
            format_line(0, &[0u8; BYTES_PER_LINE], true).len()
        );
    }

    #[test]
    fn test_ascii_column() {
        let line = format_line(0x10, b"Razor\0\x7F~", true);
        assert!(line.ends_with("|Razor..~        |"));
    }
}
