//! A queue of bits shared by every room record encoder and decoder.
//!
//! Fields are pushed and popped most significant bit first, but inside a
//! physical byte the first bit pushed ends up in the least significant
//! position. Pushing works like an 8 bit shift register fed from the top:
//!
//! ```text
//! push 1, 0, 1        byte (partial)   after flush
//! 1          ->       1.......
//! 0          ->       01......
//! 1          ->       101.....          00000101
//! ```
//!
//! Popping mirrors this by taking bit 0 of the head byte, shifting the head
//! byte right, and folding the bit into the field as `acc * 2 + bit`. A byte is
//! retired from the front of the queue once all eight of its bits have been
//! read.
use crate::errors::{BitError, FieldError};
use slice_deque::SliceDeque;

/// A FIFO of bits backed by whole bytes.
///
/// Bits of a byte that is still being filled are not readable until the
/// byte is complete, either by pushing more bits or by
/// [`flush_to_byte_boundary`](BitChannel::flush_to_byte_boundary).
/// ```
/// # use jsw_data::BitChannel;
/// let mut bits = BitChannel::new();
/// bits.push_bits(3, 0b101).unwrap();
/// bits.push_bits(13, 0x1abc).unwrap();
/// bits.push_bits(8, 0x7f).unwrap();
///
/// assert_eq!(bits.pop_bits(3).unwrap(), 0b101);
/// assert_eq!(bits.pop_bits(13).unwrap(), 0x1abc);
/// assert_eq!(bits.pop_bits(8).unwrap(), 0x7f);
/// ```
#[derive(Debug)]
pub struct BitChannel {
    bytes: SliceDeque<u8>,
    // bits already read from the head byte
    head_used: u32,
    // bits pushed into the tail byte; 0 when the tail is complete
    tail_fill: u32,
}

impl BitChannel {
    pub const MAX_WIDTH: u32 = 32;

    pub fn new() -> Self {
        Self {
            bytes: SliceDeque::new(),
            head_used: 0,
            tail_fill: 0,
        }
    }

    /// Create a channel that reads back previously encoded bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut queue = SliceDeque::with_capacity(bytes.len());
        queue.extend_from_slice(bytes);
        Self {
            bytes: queue,
            head_used: 0,
            tail_fill: 0,
        }
    }

    /// Number of bits pushed and not yet popped, including the bits of an
    /// incomplete tail byte.
    pub fn bit_len(&self) -> usize {
        let padding = if self.tail_fill > 0 {
            8 - self.tail_fill
        } else {
            0
        };
        self.bytes.len() * 8 - (padding + self.head_used) as usize
    }

    /// Number of bits that can be popped right now.
    pub fn available(&self) -> usize {
        let complete = self.bytes.len() - (self.tail_fill > 0) as usize;
        (complete * 8).saturating_sub(self.head_used as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.bit_len() == 0
    }

    pub fn push_bit(&mut self, bit: bool) {
        if self.tail_fill == 0 {
            self.bytes.push_back(0);
        }
        if let Some(tail) = self.bytes.last_mut() {
            *tail = (*tail >> 1) | ((bit as u8) << 7);
        }
        self.tail_fill = (self.tail_fill + 1) % 8;
    }

    /// Append the low `width` bits of `value`, most significant first.
    pub fn push_bits(&mut self, width: u32, value: u32) -> Result<(), BitError> {
        if width > Self::MAX_WIDTH {
            return Err(BitError::InvalidWidth(width));
        }
        if width < Self::MAX_WIDTH && value >> width != 0 {
            return Err(BitError::Overflow { value, width });
        }

        for i in (0..width).rev() {
            self.push_bit((value >> i) & 1 == 1);
        }

        Ok(())
    }

    pub fn pop_bit(&mut self) -> Result<bool, BitError> {
        if self.available() == 0 {
            return Err(BitError::Exhausted {
                requested: 1,
                available: 0,
            });
        }

        let head = &mut self.bytes[0];
        let bit = *head & 1 == 1;
        *head >>= 1;
        self.head_used += 1;

        if self.head_used == 8 {
            self.bytes.pop_front();
            self.head_used = 0;
        }

        Ok(bit)
    }

    /// Remove the next `width` bits and rebuild them into a value.
    ///
    /// Nothing is consumed if fewer than `width` bits are available.
    pub fn pop_bits(&mut self, width: u32) -> Result<u32, BitError> {
        if width > Self::MAX_WIDTH {
            return Err(BitError::InvalidWidth(width));
        }
        let available = self.available();
        if available < width as usize {
            return Err(BitError::Exhausted {
                requested: width,
                available,
            });
        }

        let mut acc = 0u32;
        for _ in 0..width {
            let bit = self.pop_bit()?;
            acc = (acc << 1) | bit as u32;
        }

        Ok(acc)
    }

    /// [`push_bits`](BitChannel::push_bits), naming the field on failure.
    #[inline]
    pub fn push_field(&mut self, field: &'static str, width: u32, value: u32) -> Result<(), FieldError> {
        self.push_bits(width, value)
            .map_err(|source| FieldError { field, source })
    }

    /// [`pop_bits`](BitChannel::pop_bits), naming the field on failure.
    #[inline]
    pub fn pop_field(&mut self, field: &'static str, width: u32) -> Result<u32, FieldError> {
        self.pop_bits(width)
            .map_err(|source| FieldError { field, source })
    }

    /// Pop a field of at most 8 bits.
    #[inline]
    pub fn pop_u8(&mut self, field: &'static str, width: u32) -> Result<u8, FieldError> {
        debug_assert!(width <= 8);
        self.pop_field(field, width).map(|v| v as u8)
    }

    #[inline]
    pub fn push_flag(&mut self, field: &'static str, flag: bool) -> Result<(), FieldError> {
        self.push_field(field, 1, flag as u32)
    }

    #[inline]
    pub fn pop_flag(&mut self, field: &'static str) -> Result<bool, FieldError> {
        self.pop_bit().map_err(|source| FieldError { field, source })
    }

    /// Pad the tail byte with zero bits.
    pub fn flush_to_byte_boundary(&mut self) {
        while self.tail_fill != 0 {
            self.push_bit(false);
        }
    }

    /// Flush and return the unread bytes.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.flush_to_byte_boundary();
        self.bytes.to_vec()
    }
}

impl Default for BitChannel {
    fn default() -> Self {
        Self::new()
    }
}
