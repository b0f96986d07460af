use crate::error::{Error, Result};

/// Bitstream reader. Reads arbitrary bits MSB-first out of an entropy-coded segment.
#[derive(Debug)]
pub struct Bitstream<'data> {
    data: &'data [u8],
    byte_cursor: usize,
    bit_cursor: u8,
}

impl<'data> Bitstream<'data> {
    /// Creates a new bitstream.
    pub fn new(data: &'data [u8]) -> Self {
        Self {
            data,
            byte_cursor: 0,
            bit_cursor: 0,
        }
    }

    /// Reads up to 64 bits out of the bitstream and returns them in a u64.
    pub fn read_bits(&mut self, bits: usize) -> Result<u64> {
        if bits > 64 {
            return Err(Error::InternalError(
                "Can't read more than 64 bits at a time",
            ));
        }

        let mut value: u64 = 0;
        for _ in 0..bits {
            let current_byte = *self
                .data
                .get(self.byte_cursor)
                .ok_or(Error::Malformed("Read past end of bit buffer"))?;
            let current_bit = 1u8 & (current_byte >> (7 - self.bit_cursor));

            value = (value << 1) | current_bit as u64;

            self.bit_cursor += 1;
            if self.bit_cursor == 8 {
                self.byte_cursor += 1;
                self.bit_cursor = 0;
            }
        }
        Ok(value)
    }

    /// Reads a single bit.
    pub fn read_bit(&mut self) -> Result<u8> {
        Ok(self.read_bits(1)? as u8)
    }
}

/// Bitstream writer, the mirror image of [`Bitstream`]. Bits are packed MSB-first.
#[derive(Debug, Default)]
pub struct BitWriter {
    data: Vec<u8>,
    current: u8,
    filled: u8,
}

impl BitWriter {
    /// Creates a writer preallocating `bytes` of output.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            data: Vec::with_capacity(bytes),
            current: 0,
            filled: 0,
        }
    }

    /// Appends the low `bits` bits of `value`.
    pub fn write_bits(&mut self, value: u32, bits: u8) {
        for i in (0..bits).rev() {
            let bit = ((value >> i) & 1) as u8;
            self.current = (self.current << 1) | bit;
            self.filled += 1;
            if self.filled == 8 {
                self.flush_byte();
            }
        }
    }

    /// Appends `bits` zero bits, copying whole bytes at once.
    pub fn write_zeros(&mut self, mut bits: usize) {
        while bits > 0 && self.filled != 0 {
            self.write_bits(0, 1);
            bits -= 1;
        }
        self.data.resize(self.data.len() + bits / 8, 0);
        self.write_bits(0, (bits % 8) as u8);
    }

    fn flush_byte(&mut self) {
        self.data.push(self.current);
        // 0xFF inside entropy-coded data must be followed by a stuffed zero
        if self.current == 0xFF {
            self.data.push(0x00);
        }
        self.current = 0;
        self.filled = 0;
    }

    /// Pads the final partial byte with one bits and returns the packed bytes.
    pub fn finish(mut self) -> Vec<u8> {
        if self.filled > 0 {
            let pad = 8 - self.filled;
            self.write_bits((1u32 << pad) - 1, pad);
        }
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_msb_first() {
        let data = [0b1010_0000, 0b1111_0000];
        let mut bits = Bitstream::new(&data);
        assert_eq!(bits.read_bits(3).unwrap(), 0b101);
        assert_eq!(bits.read_bits(0).unwrap(), 0);
        assert_eq!(bits.read_bits(9).unwrap(), 0b0_0000_1111);
        assert_eq!(bits.read_bits(4).unwrap(), 0);
        assert!(bits.read_bit().is_err());
    }

    #[test]
    fn zero_width_read_at_end_is_allowed() {
        let data = [0xAB];
        let mut bits = Bitstream::new(&data);
        bits.read_bits(8).unwrap();
        assert_eq!(bits.read_bits(0).unwrap(), 0);
    }

    #[test]
    fn writer_pads_with_ones_and_stuffs() {
        let mut writer = BitWriter::with_capacity(4);
        writer.write_bits(0, 2);
        assert_eq!(writer.finish(), vec![0b0011_1111]);

        let mut writer = BitWriter::with_capacity(4);
        writer.write_bits(0xFF, 8);
        writer.write_bits(0b1, 1);
        assert_eq!(writer.finish(), vec![0xFF, 0x00, 0xFF, 0x00]);
    }

    #[test]
    fn write_zeros_matches_bitwise_writes() {
        let mut fast = BitWriter::with_capacity(8);
        fast.write_bits(0b1, 1);
        fast.write_zeros(21);

        let mut slow = BitWriter::with_capacity(8);
        slow.write_bits(0b1, 1);
        for _ in 0..21 {
            slow.write_bits(0, 1);
        }
        assert_eq!(fast.finish(), slow.finish());
    }
}
