//! The register file: four general registers, the stack pointer, the instruction pointer, and the
//! flags register. Only the low four bits of `flags` mean anything:
//!
//! ```text
//!   bit 3  E   equal
//!   bit 2  GT  greater-than
//!   bit 1  H   higher-byte select
//!   bit 0  L   lower-byte select
//! ```

use strum_macros::{Display as StrumDisplay, EnumIter, EnumString, IntoStaticStr};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::bytecode::Word;
use crate::errors::Fault;

/// The stack pointer of a fresh machine: the top of the address space.
pub const STACK_TOP: Word = 0xffff;

/// A general register, numbered by its push/pop selector.
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, EnumIter, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,         PartialEq, Debug,           Hash
)]
#[repr(u8)]
pub enum Register {
  #[strum(serialize = "ax")] Ax = 0,
  #[strum(serialize = "bx")] Bx = 1,
  #[strum(serialize = "cx")] Cx = 2,
  #[strum(serialize = "dx")] Dx = 3,
}

impl Register {
  /// Resolves a push/pop selector argument.
  pub fn from_selector(selector: Word) -> Result<Register, Fault> {
    match selector {
      0 => Ok(Register::Ax),
      1 => Ok(Register::Bx),
      2 => Ok(Register::Cx),
      3 => Ok(Register::Dx),
      _ => Err(Fault::InvalidRegister{ selector })
    }
  }

  pub fn selector(&self) -> Word {
    Into::<u8>::into(*self) as Word
  }
}

/// A meaningful bit of the flags register. The discriminant is the bit mask.
#[derive(
  StrumDisplay, IntoStaticStr, EnumIter, IntoPrimitive,
  Clone,        Copy,          Eq,       PartialEq,     Debug, Hash
)]
#[repr(u16)]
pub enum Flag {
  #[strum(serialize = "E")]  Equal   = 0x08,
  #[strum(serialize = "GT")] Greater = 0x04,
  #[strum(serialize = "H")]  Higher  = 0x02,
  #[strum(serialize = "L")]  Lower   = 0x01,
}

impl Flag {
  pub fn mask(&self) -> Word {
    Into::<u16>::into(*self)
  }
}

/// Which part of a general register a move writes, as chosen by the byte-select flags.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum ByteSelect {
  Full,
  High,
  Low,
}

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct Registers {
  pub ax    : Word,
  pub bx    : Word,
  pub cx    : Word,
  pub dx    : Word,
  pub sp    : Word,
  pub ip    : Word,
  pub flags : Word,
}

impl Registers {

  pub fn new() -> Registers {
    Registers{
      ax    : 0,
      bx    : 0,
      cx    : 0,
      dx    : 0,
      sp    : STACK_TOP,
      ip    : 0,
      flags : 0,
    }
  }

  pub fn get(&self, register: Register) -> Word {
    match register {
      Register::Ax => self.ax,
      Register::Bx => self.bx,
      Register::Cx => self.cx,
      Register::Dx => self.dx,
    }
  }

  pub fn get_mut(&mut self, register: Register) -> &mut Word {
    match register {
      Register::Ax => &mut self.ax,
      Register::Bx => &mut self.bx,
      Register::Cx => &mut self.cx,
      Register::Dx => &mut self.dx,
    }
  }

  /**
    Writes `value` into `register` according to `select`. For the byte selections only the low
    byte of `value` is used, and the other byte of the register is preserved.
  */
  pub fn write(&mut self, register: Register, value: Word, select: ByteSelect) {
    let slot = self.get_mut(register);
    *slot = match select {
      ByteSelect::Full => value,
      ByteSelect::High => (*slot & 0x00ff) | ((value & 0x00ff) << 8),
      ByteSelect::Low  => (*slot & 0xff00) |  (value & 0x00ff),
    };
  }

  // region Flags

  pub fn flag(&self, flag: Flag) -> bool {
    self.flags & flag.mask() != 0
  }

  pub fn set_flag(&mut self, flag: Flag) {
    self.flags |= flag.mask();
  }

  pub fn clear_flag(&mut self, flag: Flag) {
    self.flags &= !flag.mask();
  }

  /// The byte selection in force, or a fault if both select flags are set.
  pub fn byte_select(&self) -> Result<ByteSelect, Fault> {
    match (self.flag(Flag::Higher), self.flag(Flag::Lower)) {
      (true,  true ) => Err(Fault::ConflictingByteSelect),
      (true,  false) => Ok(ByteSelect::High),
      (false, true ) => Ok(ByteSelect::Low),
      (false, false) => Ok(ByteSelect::Full),
    }
  }

  // endregion

}

impl Default for Registers {
  fn default() -> Self {
    Registers::new()
  }
}
