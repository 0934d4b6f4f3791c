use std::{env, fs, path::Path};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    // Too slow to build as a const in the crate itself, it hits the const eval limit
    let out_dir = env::var_os("OUT_DIR").expect("cargo sets OUT_DIR for build scripts");
    let path = Path::new(&out_dir).join("hex.rs");
    let table = format!("{:?}", hex_pair_table());
    fs::write(
        &path,
        format!("pub static HEX_LOOKUP: [[u8; 256]; 256] = {table};"),
    )
    .expect("failed to write the hex lookup table");
}

/// Maps every pair of ASCII hex digits to the byte they spell. Anything else maps to 0.
fn hex_pair_table() -> [[u8; 256]; 256] {
    let mut output = [[0u8; 256]; 256];
    for high in 0..=u8::MAX {
        for low in 0..=u8::MAX {
            output[high as usize][low as usize] = hex_digit(high) << 4 | hex_digit(low);
        }
    }
    output
}

fn hex_digit(input: u8) -> u8 {
    match input {
        b'0'..=b'9' => input - b'0',
        b'A'..=b'F' => input - b'A' + 10,
        b'a'..=b'f' => input - b'a' + 10,
        _ => 0,
    }
}
