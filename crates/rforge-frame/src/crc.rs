//! CRC-16/CCITT-FALSE (poly 0x1021, init 0xFFFF, no reflection, no xor-out).

/// Initial register value.
pub const CRC16_INIT: u16 = 0xFFFF;

const POLY: u16 = 0x1021;

/// Compute the checksum of `data` starting from [`CRC16_INIT`].
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    crc16_ccitt_with(CRC16_INIT, data)
}

/// Continue a checksum from an arbitrary register value.
pub fn crc16_ccitt_with(init: u16, data: &[u8]) -> u16 {
    let mut crc = init;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            if (crc & 0x8000) != 0 {
                crc = (crc << 1) ^ POLY;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}
