//! The memory image is the whole address space of the machine. Program, data, and stack all share
//! it: the loader fills it upward from address zero, and the stack grows downward from the top.
//! Every access is bounds-checked against the image and fails with a segmentation `Fault`.

use crate::bytecode::Word;
use crate::errors::Fault;

/// Number of addressable bytes, offsets `0x0000..=0xfffe`.
pub const MEMORY_SIZE: usize = 0xffff;

pub struct Memory {
  bytes: Vec<u8>,
}

impl Memory {

  /// Reserves and zeroes the image. Reservation failure is reported rather than aborting.
  pub fn new() -> Result<Memory, Fault> {
    let mut bytes: Vec<u8> = Vec::new();
    bytes
      .try_reserve_exact(MEMORY_SIZE)
      .map_err(|_| Fault::OutOfMemory{ size: MEMORY_SIZE })?;
    bytes.resize(MEMORY_SIZE, 0);
    Ok(Memory{ bytes })
  }

  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  fn check(&self, address: usize, width: usize) -> Result<(), Fault> {
    match address.checked_add(width) {
      Some(end) if end <= self.bytes.len() => Ok(()),
      _                                    => Err(Fault::OutOfBounds{ address })
    }
  }

  pub fn read_byte(&self, address: Word) -> Result<u8, Fault> {
    let address = address as usize;
    self.check(address, 1)?;
    Ok(self.bytes[address])
  }

  /// Reads a little-endian word from `address` and `address + 1`.
  pub fn read_word(&self, address: Word) -> Result<Word, Fault> {
    let address = address as usize;
    self.check(address, 2)?;
    Ok(Word::from_le_bytes([self.bytes[address], self.bytes[address + 1]]))
  }

  /// Writes a little-endian word to `address` and `address + 1`.
  pub fn write_word(&mut self, address: Word, value: Word) -> Result<(), Fault> {
    let address = address as usize;
    self.check(address, 2)?;
    self.bytes[address..address + 2].copy_from_slice(&value.to_le_bytes());
    Ok(())
  }

  /// Copies `data` into the image starting at `offset`.
  pub fn copy_in(&mut self, offset: usize, data: &[u8]) -> Result<(), Fault> {
    self.check(offset, data.len())?;
    self.bytes[offset..offset + data.len()].copy_from_slice(data);
    Ok(())
  }

  /// The final `count` bytes of the image, or all of it if `count` is larger.
  pub fn tail(&self, count: usize) -> &[u8] {
    let start = self.bytes.len().saturating_sub(count);
    &self.bytes[start..]
  }

}

/// Renders bytes as contiguous lowercase hex, optionally separated.
pub fn hex_dump(bytes: &[u8], separator: Option<char>) -> String {
  let mut text = String::with_capacity(bytes.len() * 3);
  for (i, byte) in bytes.iter().enumerate() {
    if let (Some(sep), true) = (separator, i > 0) {
      text.push(sep);
    }
    text.push_str(&format!("{:02x}", byte));
  }
  text
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn zero_initialized() {
    let memory = Memory::new().unwrap();
    assert_eq!(memory.len(), MEMORY_SIZE);
    assert!(memory.tail(MEMORY_SIZE).iter().all(|b| *b == 0));
  }

  #[test]
  fn words_are_little_endian() {
    let mut memory = Memory::new().unwrap();
    memory.write_word(0x10, 0x5005).unwrap();
    assert_eq!(memory.read_byte(0x10), Ok(0x05));
    assert_eq!(memory.read_byte(0x11), Ok(0x50));
    assert_eq!(memory.read_word(0x10), Ok(0x5005));
  }

  #[test]
  fn last_word_fits() {
    let mut memory = Memory::new().unwrap();
    memory.write_word(0xfffd, 0xbeef).unwrap();
    assert_eq!(memory.read_word(0xfffd), Ok(0xbeef));
    assert_eq!(memory.tail(2), &[0xefu8, 0xbe][..]);
  }

  #[test]
  fn out_of_bounds_access_faults() {
    let mut memory = Memory::new().unwrap();
    assert_eq!(memory.read_byte(0xffff), Err(Fault::OutOfBounds{ address: 0xffff }));
    assert_eq!(memory.read_word(0xfffe), Err(Fault::OutOfBounds{ address: 0xfffe }));
    assert_eq!(memory.write_word(0xfffe, 1), Err(Fault::OutOfBounds{ address: 0xfffe }));
    assert!(memory.copy_in(MEMORY_SIZE - 1, &[1, 2]).is_err());
  }

  #[test]
  fn hex() {
    assert_eq!(hex_dump(&[0x00, 0x0f, 0xab], None), "000fab");
    assert_eq!(hex_dump(&[0x00, 0x0f, 0xab], Some(' ')), "00 0f ab");
    assert_eq!(hex_dump(&[], Some(' ')), "");
  }
}
