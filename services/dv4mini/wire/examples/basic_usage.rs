//! Basic usage example for the DV4mini frame codec.

use dv4mini_wire::{
    checksum, decode_header, encode, opcode, ChecksumWidth, Mode, Response, HEADER_SIZE,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== DV4mini Frame Codec Example ===\n");

    // 1. Encode a set-frequency frame
    println!("1. Encoding a SET FREQUENCY frame...");
    let qrg = [0x19, 0xfc, 0xd3, 0x70];
    let params = [qrg, qrg].concat();
    let frame = encode(opcode::SET_FREQUENCY, &params)?;
    println!("   Frame: {:02x?}", frame.as_ref());

    // 2. Decode its header
    println!("\n2. Decoding the header...");
    let mut header = [0u8; HEADER_SIZE];
    header.copy_from_slice(&frame[..HEADER_SIZE]);
    let (op, len) = decode_header(&header);
    println!("   Opcode: {:#04x} ({:?})", op, opcode::name(op));
    println!("   Body length: {}", len);

    // 3. Assemble a reply the way the exchange engine does
    println!("\n3. Assembling a VERSION reply...");
    let reply_header = [0x71, 0xfe, 0x39, 0x1d, opcode::GET_VERSION, 4];
    let response = Response::from_parts(reply_header, b"1.66")?;
    println!(
        "   Reply params: {:?}",
        String::from_utf8_lossy(response.params())
    );

    // 4. Mode bytes
    println!("\n4. Mode bytes...");
    for mode in [Mode::DSTAR, Mode::C4FM, Mode::DMR] {
        println!("   {} -> {:#04x}", mode, mode.byte());
    }

    // 5. Checksum
    println!("\n5. 9-bit checksum of \"hello world\"...");
    let crc = checksum(ChecksumWidth::Bits9, b"hello world")?;
    println!("   {:#05x}", crc);

    Ok(())
}
