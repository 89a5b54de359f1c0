/// Hexdump a program loaded at `program_offset`, `stride` bytes per row.
///
/// ```text
/// 0200: 6a 05 12 06
/// ```
pub fn hexdump(program: &[u8], program_offset: u16, stride: usize) -> String {
    let stride = stride.max(1);

    program
        .chunks(stride)
        .enumerate()
        .map(|(line, bytes)| {
            let mut str = format!("{:04x}:", program_offset as usize + line * stride);
            for byte in bytes {
                str.push_str(format!(" {:02x}", byte).as_str());
            }
            str
        })
        .collect::<Vec<String>>()
        .join("\n")
}
