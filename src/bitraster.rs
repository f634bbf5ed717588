//! Bit-raster encoding.
//!
//! Text is laid into a fixed `height x width` grid of cells, one bit per
//! cell, in row-major scan order. Each payload byte is written most
//! significant bit first. This is a direct raster of the payload bytes: no
//! finder patterns, no format information and no error correction.
//!
//! Text is expanded as its UTF-8 bytes, so ASCII input produces the same
//! 8-bit character codes a plain character walk would.

use crate::error::{check_dimensions, Error, Result};

/// A rectangular grid of 0/1 cells indexed `[row][col]`.
///
/// Cells that the raster walk never reaches stay 0.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BitMatrix {
    rows: u32,
    cols: u32,
    // Row-major, one byte per cell, each 0 or 1.
    cells: Vec<u8>,
}

impl BitMatrix {
    /// Creates an all-zero matrix with `rows` rows and `cols` columns.
    pub fn new(rows: u32, cols: u32) -> Result<Self> {
        Self::filled(rows, cols, false)
    }

    /// Creates a matrix with every cell set to `bit`.
    pub fn filled(rows: u32, cols: u32, bit: bool) -> Result<Self> {
        check_dimensions(cols, rows)?;
        Ok(Self {
            rows,
            cols,
            cells: vec![u8::from(bit); rows as usize * cols as usize],
        })
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// Number of cells, which is also the number of payload bits the grid holds.
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Returns the cell at (`row`, `col`). Out-of-range coordinates read as 0.
    pub fn get(&self, row: u32, col: u32) -> bool {
        if row >= self.rows || col >= self.cols {
            return false;
        }
        self.cells[self.index(row, col)] != 0
    }

    /// Sets the cell at (`row`, `col`).
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are outside the matrix.
    pub fn set(&mut self, row: u32, col: u32, bit: bool) {
        assert!(row < self.rows && col < self.cols, "Cell out of range");
        let index = self.index(row, col);
        self.cells[index] = u8::from(bit);
    }

    /// The cells of one row, each 0 or 1.
    ///
    /// # Panics
    ///
    /// Panics if `row` is outside the matrix.
    pub fn row(&self, row: u32) -> &[u8] {
        assert!(row < self.rows, "Row out of range");
        let start = row as usize * self.cols as usize;
        &self.cells[start..start + self.cols as usize]
    }

    pub fn count_ones(&self) -> usize {
        self.cells.iter().filter(|&&c| c != 0).count()
    }

    fn index(&self, row: u32, col: u32) -> usize {
        row as usize * self.cols as usize + col as usize
    }
}

/// Number of payload bits a `width x height` grid can hold.
pub const fn capacity_bits(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

/// Number of bits `text` needs once expanded to bytes.
pub fn payload_bits(text: &str) -> usize {
    text.len() * 8
}

/// Sequential bit writer over a matrix, advancing column first and
/// wrapping to the next row when the column reaches the width.
struct RasterWriter<'a> {
    matrix: &'a mut BitMatrix,
    length: usize,
}

impl<'a> RasterWriter<'a> {
    fn new(matrix: &'a mut BitMatrix) -> Self {
        Self { matrix, length: 0 }
    }

    fn is_full(&self) -> bool {
        self.length >= self.matrix.capacity()
    }

    /// Appends the 8 bits of `val`, MSB first. Bits past the end of the
    /// grid are dropped.
    fn append_byte(&mut self, val: u8) {
        for i in (0..8).rev() {
            if self.is_full() {
                return;
            }
            let cols = self.matrix.cols as usize;
            let row = (self.length / cols) as u32;
            let col = (self.length % cols) as u32;
            self.matrix.set(row, col, (val >> i) & 1 != 0);
            self.length += 1;
        }
    }
}

/// Encodes `text` into a `height x width` matrix.
///
/// Anything past the grid capacity is silently dropped; use
/// [`encode_checked`] to be told about it instead. The empty string gives
/// an all-zero matrix.
pub fn encode(text: &str, width: u32, height: u32) -> Result<BitMatrix> {
    let mut matrix = BitMatrix::new(height, width)?;
    let mut writer = RasterWriter::new(&mut matrix);
    for &byte in text.as_bytes() {
        if writer.is_full() {
            break;
        }
        writer.append_byte(byte);
    }
    Ok(matrix)
}

/// Like [`encode`], but fails with [`Error::PayloadTooLarge`] instead of
/// truncating.
pub fn encode_checked(text: &str, width: u32, height: u32) -> Result<BitMatrix> {
    check_dimensions(width, height)?;
    let bits = payload_bits(text);
    let capacity = capacity_bits(width, height);
    if bits > capacity {
        return Err(Error::PayloadTooLarge { bits, capacity });
    }
    encode(text, width, height)
}

/// Reads the payload bytes back out of a matrix with the same row-major
/// walk [`encode`] uses.
///
/// Reading stops at the first all-zero byte or at the last whole byte
/// of the grid, so a payload that itself contains NUL does not survive the
/// round trip.
pub fn read_bytes(matrix: &BitMatrix) -> Vec<u8> {
    let cols = matrix.cols() as usize;
    let whole_bytes = matrix.capacity() / 8;
    let mut out = Vec::with_capacity(whole_bytes);
    for n in 0..whole_bytes {
        let mut byte = 0u8;
        for bit in 0..8 {
            let pos = n * 8 + bit;
            let cell = matrix.get((pos / cols) as u32, (pos % cols) as u32);
            byte = (byte << 1) | u8::from(cell);
        }
        if byte == 0 {
            break;
        }
        out.push(byte);
    }
    out
}

/// [`read_bytes`] decoded as UTF-8, replacing invalid sequences.
pub fn read_text(matrix: &BitMatrix) -> String {
    String::from_utf8_lossy(&read_bytes(matrix)).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn row_bits(matrix: &BitMatrix, row: u32) -> String {
        matrix.row(row).iter().map(|b| if *b == 1 { '1' } else { '0' }).collect()
    }

    #[test]
    fn test_encode_hi() {
        let m = encode("Hi", 8, 2).unwrap();
        assert_eq!(row_bits(&m, 0), "01001000");
        assert_eq!(row_bits(&m, 1), "01101001");
    }

    #[test]
    fn test_encode_wraps_mid_byte() {
        // 5 columns: 'A' = 01000001 spills 3 bits into row 1.
        let m = encode("A", 5, 3).unwrap();
        assert_eq!(row_bits(&m, 0), "01000");
        assert_eq!(row_bits(&m, 1), "00100");
        assert_eq!(row_bits(&m, 2), "00000");
    }

    #[test]
    fn test_empty_text_is_all_zero() {
        let m = encode("", 7, 3).unwrap();
        assert_eq!((m.rows(), m.cols()), (3, 7));
        assert_eq!(m.count_ones(), 0);
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(matches!(
            encode("x", 0, 4),
            Err(Error::InvalidDimensions { width: 0, height: 4 })
        ));
        assert!(matches!(encode("x", 4, 0), Err(Error::InvalidDimensions { .. })));
    }

    #[test]
    fn test_overflow_truncates_to_prefix() {
        // 12 cells hold one byte and half of the next.
        let long = encode("Hello", 4, 3).unwrap();
        let prefix = encode("He", 4, 3).unwrap();
        assert_eq!(long, prefix);
    }

    #[test]
    fn test_encode_checked_reports_overflow() {
        match encode_checked("Hello", 4, 3) {
            Err(Error::PayloadTooLarge { bits, capacity }) => {
                assert_eq!(bits, 40);
                assert_eq!(capacity, 12);
            }
            other => panic!("expected PayloadTooLarge, got {other:?}"),
        }
        assert!(encode_checked("Hi", 8, 2).is_ok());
    }

    #[test]
    fn test_non_ascii_uses_utf8_bytes() {
        // 'é' is C3 A9 in UTF-8.
        let m = encode("é", 8, 2).unwrap();
        assert_eq!(row_bits(&m, 0), "11000011");
        assert_eq!(row_bits(&m, 1), "10101001");
        assert_eq!(read_text(&m), "é");
    }

    #[test]
    fn test_get_out_of_range_reads_zero() {
        let m = BitMatrix::filled(2, 2, true).unwrap();
        assert!(m.get(1, 1));
        assert!(!m.get(2, 0));
        assert!(!m.get(0, 2));
    }

    #[test]
    #[should_panic(expected = "Row out of range")]
    fn test_row_out_of_range_panics() {
        let m = BitMatrix::new(2, 3).unwrap();
        assert_eq!(m.row(1), &[0, 0, 0]);
        let _ = m.row(2);
    }

    proptest! {
        #[test]
        fn prop_matrix_round_trip(text in "[ -~]{0,24}", width in 1u32..40, height in 1u32..40) {
            prop_assume!(payload_bits(&text) < capacity_bits(width, height));
            let m = encode(&text, width, height).unwrap();
            prop_assert_eq!(read_text(&m), text);
        }
    }
}
