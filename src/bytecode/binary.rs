/*!
  This module is responsible for the encoding and decoding of binary instructions.

  An instruction is one opcode byte followed by zero, one, or two little-endian argument words:

  ```text
    length 1   [opcode]
    length 3   [opcode][arg0 lo][arg0 hi]
    length 5   [opcode][arg0 lo][arg0 hi][arg1 lo][arg1 hi]
  ```

  The length of an instruction is a property of its opcode alone and is looked up in
  `OPCODE_TABLE`. No opcode currently uses the five byte form.
*/

use crate::bytecode::{Instruction, Opcode, Word};
use crate::errors::Fault;
use crate::memory::Memory;

pub struct OpcodeEntry {
  pub opcode : Opcode,
  pub length : u8,
}

const fn entry(opcode: Opcode, length: u8) -> OpcodeEntry {
  OpcodeEntry{ opcode, length }
}

/// Encoded length of every opcode.
pub static OPCODE_TABLE: [OpcodeEntry; 20] = [
  entry(Opcode::Nop,     1),
  entry(Opcode::Hlt,     1),
  entry(Opcode::MovAx,   3),
  entry(Opcode::MovBx,   3),
  entry(Opcode::MovCx,   3),
  entry(Opcode::MovDx,   3),
  entry(Opcode::MovSp,   3),
  entry(Opcode::MovMem0, 3),
  entry(Opcode::MovMem1, 3),
  entry(Opcode::MovMem2, 3),
  entry(Opcode::Ste,     1),
  entry(Opcode::Stg,     1),
  entry(Opcode::Sth,     1),
  entry(Opcode::Stl,     1),
  entry(Opcode::Cle,     1),
  entry(Opcode::Clg,     1),
  entry(Opcode::Clh,     1),
  entry(Opcode::Cll,     1),
  entry(Opcode::Push,    3),
  entry(Opcode::Pop,     3),
];

/// The encoded length of `code`, or `None` if no opcode has that value.
pub fn resolve_length(code: u8) -> Option<u8> {
  OPCODE_TABLE
    .iter()
    .find(|e| e.opcode.code() == code)
    .map(|e| e.length)
}

/// The encoded length of an opcode known to be valid.
pub fn instruction_size(opcode: Opcode) -> u8 {
  match resolve_length(opcode.code()) {
    Some(length) => length,
    None         => unreachable!("Unreachable: {} has no entry in OPCODE_TABLE.", opcode)
  }
}

/// Number of argument words for an encoded length.
fn argument_count(opcode: u8, length: u8) -> Result<usize, Fault> {
  match length {
    1 => Ok(0),
    3 => Ok(1),
    5 => Ok(2),
    _ => Err(Fault::BadLength{ opcode, length })
  }
}

/**
  Decodes the instruction stored at `address`, returning it with its encoded length. The opcode
  byte must have a table entry; anything else is an illegal instruction, never a zero length
  instruction to skip over.
*/
pub fn decode(memory: &Memory, address: Word) -> Result<(Instruction, u8), Fault> {
  let code   = memory.read_byte(address)?;
  let length = resolve_length(code)
                 .ok_or(Fault::UnknownOpcode{ opcode: code, address })?;
  let count  = argument_count(code, length)?;

  let mut args: [Word; 2] = [0, 0];
  for (i, arg) in args.iter_mut().take(count).enumerate() {
    let offset = (address as usize) + 1 + 2 * i;
    if offset > Word::MAX as usize {
      return Err(Fault::OutOfBounds{ address: offset });
    }
    *arg = memory.read_word(offset as Word)?;
  }

  // `resolve_length` succeeded, so the byte is a known opcode.
  let opcode = Opcode::from_code(code)
                 .ok_or(Fault::UnknownOpcode{ opcode: code, address })?;
  Ok((Instruction::from_parts(opcode, args), length))
}

/// Encodes the instruction into its byte form.
pub fn encode(instruction: &Instruction) -> Vec<u8> {
  let opcode = instruction.opcode();
  let mut bytes: Vec<u8> = Vec::with_capacity(instruction_size(opcode) as usize);

  bytes.push(opcode.code());
  for arg in instruction.arguments() {
    bytes.extend_from_slice(&arg.to_le_bytes());
  }
  bytes
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::bytecode::{Destination, MemorySlot};
  use crate::registers::{Flag, Register};
  use proptest::prelude::*;
  use strum::IntoEnumIterator;

  fn decode_bytes(bytes: &[u8]) -> Result<(Instruction, u8), Fault> {
    let mut memory = Memory::new().unwrap();
    memory.copy_in(0, bytes).unwrap();
    decode(&memory, 0)
  }

  #[test]
  fn table_covers_every_opcode() {
    for opcode in Opcode::iter() {
      let length = resolve_length(opcode.code());
      assert!(length.is_some(), "{} has no table entry", opcode);
      assert!([1, 3, 5].contains(&length.unwrap()));
    }
    assert_eq!(OPCODE_TABLE.len(), Opcode::iter().count());
  }

  #[test]
  fn recorded_lengths() {
    assert_eq!(resolve_length(0x01), Some(1));
    assert_eq!(resolve_length(0x02), Some(1));
    for code in 0x08..=0x0f {
      assert_eq!(resolve_length(code), Some(3));
    }
    for code in 0x10..=0x17 {
      assert_eq!(resolve_length(code), Some(1));
    }
    assert_eq!(resolve_length(0x1a), Some(3));
    assert_eq!(resolve_length(0x1b), Some(3));
  }

  #[test]
  fn absent_opcodes_are_illegal() {
    for code in 0u8..=0xff {
      if Opcode::from_code(code).is_none() {
        assert_eq!(resolve_length(code), None);
        assert_eq!(
          decode_bytes(&[code, 0, 0, 0, 0]),
          Err(Fault::UnknownOpcode{ opcode: code, address: 0 })
        );
      }
    }
  }

  #[test]
  fn encoded_layout() {
    let mov = Instruction::Mov { destination: Destination::Register(Register::Bx), value: 0x5005 };
    assert_eq!(encode(&mov), vec![0x09, 0x05, 0x50]);
    assert_eq!(encode(&Instruction::Hlt), vec![0x02]);
    assert_eq!(encode(&Instruction::Pop(1)), vec![0x1b, 0x01, 0x00]);
  }

  #[test]
  fn encoded_length_matches_table() {
    for opcode in Opcode::iter() {
      let instruction = Instruction::from_parts(opcode, [0, 0]);
      assert_eq!(encode(&instruction).len(), instruction_size(opcode) as usize);
    }
  }

  #[test]
  fn nullary_round_trip() {
    for instruction in &[Instruction::Nop, Instruction::Hlt, Instruction::ClearFlag(Flag::Lower)] {
      let (decoded, length) = decode_bytes(&encode(instruction)).unwrap();
      assert_eq!(decoded, *instruction);
      assert_eq!(length, 1);
      assert!(decoded.arguments().is_empty());
    }
  }

  #[test]
  fn decode_at_end_of_memory_faults() {
    let mut memory = Memory::new().unwrap();
    memory.copy_in(0xfffd, &[Opcode::MovAx.code(), 0x01]).unwrap();
    assert_eq!(decode(&memory, 0xfffd), Err(Fault::OutOfBounds{ address: 0xfffe }));
  }

  proptest! {
    #[test]
    fn unary_round_trip(value in any::<Word>()) {
      let destinations =
        Register::iter().map(Destination::Register)
          .chain(MemorySlot::iter().map(Destination::Memory))
          .chain(std::iter::once(Destination::StackPointer));
      let instructions: Vec<Instruction> =
        destinations.map(|destination| Instruction::Mov { destination, value })
          .chain(vec![Instruction::Push(value), Instruction::Pop(value)])
          .collect();
      prop_assert_eq!(instructions.len(), 10);

      for instruction in &instructions {
        let (decoded, length) = decode_bytes(&encode(instruction)).unwrap();
        prop_assert_eq!(decoded, *instruction);
        prop_assert_eq!(length, 3);
        prop_assert_eq!(decoded.arguments(), vec![value]);
      }
    }
  }
}
