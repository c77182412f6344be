//! CRC-16/CCITT-FALSE as used by the EMVCo merchant-presented QR trailer.
//!
//! Polynomial 0x1021, initial value 0xFFFF, MSB first, no reflection and no
//! final XOR. Scanners recompute this over the payload and reject on mismatch.

const POLYNOMIAL: u16 = 0x1021;
const INITIAL: u16 = 0xFFFF;

/// Compute the checksum over raw bytes.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc = INITIAL;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ POLYNOMIAL;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// Checksum rendered as exactly four uppercase hex digits.
pub fn crc16_hex(data: &str) -> String {
    format!("{:04X}", crc16(data.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_check_value() {
        assert_eq!(crc16(b"123456789"), 0x29B1);
        assert_eq!(crc16_hex("123456789"), "29B1");
    }

    #[test]
    fn test_empty_input_is_initial_value() {
        assert_eq!(crc16(b""), 0xFFFF);
        assert_eq!(crc16_hex(""), "FFFF");
    }

    #[test]
    fn test_hex_is_zero_padded() {
        // "A" hashes to 0xB915; walk a few inputs until one falls under 0x1000
        let padded = (0u32..10_000)
            .map(|n| n.to_string())
            .find(|s| crc16(s.as_bytes()) < 0x1000)
            .expect("some short input hashes below 0x1000");
        let hex = crc16_hex(&padded);
        assert_eq!(hex.len(), 4);
        assert!(hex.starts_with('0'));
    }

    #[test]
    fn test_operates_on_utf8_bytes() {
        assert_eq!(crc16_hex("é"), format!("{:04X}", crc16(&[0xC3, 0xA9])));
    }
}
