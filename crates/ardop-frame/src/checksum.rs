//! Frame checksums.
//!
//! The framing layer only needs *a* 16-bit sum over a byte run. The default is
//! the CRC-16 used by ARDOP TNCs; anything implementing [`Checksum`] (closures
//! included) can stand in for it.

/// A pure function from a byte run to a 16-bit checksum.
pub trait Checksum {
    fn checksum(&self, data: &[u8]) -> u16;
}

impl<F> Checksum for F
where
    F: Fn(&[u8]) -> u16,
{
    fn checksum(&self, data: &[u8]) -> u16 {
        self(data)
    }
}

/// CRC-16 with the CCITT polynomial, all-ones preset, MSB first, no final xor.
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc16;

const POLY: u16 = 0x1021;
const PRESET: u16 = 0xFFFF;

impl Crc16 {
    pub fn sum(data: &[u8]) -> u16 {
        data.iter().fold(PRESET, |crc, &byte| {
            let mut crc = crc ^ (u16::from(byte) << 8);
            for _ in 0..8 {
                crc = if crc & 0x8000 != 0 {
                    (crc << 1) ^ POLY
                } else {
                    crc << 1
                };
            }
            crc
        })
    }
}

impl Checksum for Crc16 {
    fn checksum(&self, data: &[u8]) -> u16 {
        Crc16::sum(data)
    }
}
