use std::convert::TryFrom;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use strum_macros::{Display as StrumDisplay, EnumIter, EnumString, IntoStaticStr};
use num_enum::{TryFromPrimitive, IntoPrimitive};

use crate::bytecode::Word;
use crate::registers::{Flag, Register};

/**
  Opcodes of the virtual machine.

  The values are fixed by the binary encoding and are grouped by family. The move family occupies
  `0x08..=0x0f`, one opcode per destination, and the flag family occupies `0x10..=0x17`, the four
  set operations followed by the four clear operations in the same flag order.
*/
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, EnumIter, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,         PartialEq, Debug,           Hash
)]
#[repr(u8)]
pub enum Opcode {
  #[strum(serialize = "nop")]   Nop     = 0x01,
  #[strum(serialize = "hlt")]   Hlt     = 0x02,

  // Move family //
  #[strum(serialize = "movax")] MovAx   = 0x08,
  #[strum(serialize = "movbx")] MovBx   = 0x09,
  #[strum(serialize = "movcx")] MovCx   = 0x0a,
  #[strum(serialize = "movdx")] MovDx   = 0x0b,
  #[strum(serialize = "movsp")] MovSp   = 0x0c,
  #[strum(serialize = "movm0")] MovMem0 = 0x0d,
  #[strum(serialize = "movm1")] MovMem1 = 0x0e,
  #[strum(serialize = "movm2")] MovMem2 = 0x0f,

  // Flag family //
  #[strum(serialize = "ste")]   Ste     = 0x10,
  #[strum(serialize = "stg")]   Stg     = 0x11,
  #[strum(serialize = "sth")]   Sth     = 0x12,
  #[strum(serialize = "stl")]   Stl     = 0x13,
  #[strum(serialize = "cle")]   Cle     = 0x14,
  #[strum(serialize = "clg")]   Clg     = 0x15,
  #[strum(serialize = "clh")]   Clh     = 0x16,
  #[strum(serialize = "cll")]   Cll     = 0x17,

  // Stack //
  #[strum(serialize = "push")]  Push    = 0x1a,
  #[strum(serialize = "pop")]   Pop     = 0x1b,
}

impl Opcode {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  pub fn from_code(code: u8) -> Option<Opcode> {
    Opcode::try_from(code).ok()
  }
}

/// One of the three memory destinations of `mov`. They have no defined addressing mode.
#[derive(StrumDisplay, EnumString, EnumIter, Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum MemorySlot {
  #[strum(serialize = "m0")] M0,
  #[strum(serialize = "m1")] M1,
  #[strum(serialize = "m2")] M2,
}

/// Where a `mov` writes its argument.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum Destination {
  Register(Register),
  StackPointer,
  Memory(MemorySlot),
}

impl Destination {
  pub fn opcode(&self) -> Opcode {
    match self {
      Destination::Register(Register::Ax) => Opcode::MovAx,
      Destination::Register(Register::Bx) => Opcode::MovBx,
      Destination::Register(Register::Cx) => Opcode::MovCx,
      Destination::Register(Register::Dx) => Opcode::MovDx,
      Destination::StackPointer           => Opcode::MovSp,
      Destination::Memory(MemorySlot::M0) => Opcode::MovMem0,
      Destination::Memory(MemorySlot::M1) => Opcode::MovMem1,
      Destination::Memory(MemorySlot::M2) => Opcode::MovMem2,
    }
  }
}

impl Display for Destination {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Destination::Register(register) => write!(f, "{}", register),
      Destination::StackPointer       => write!(f, "sp"),
      Destination::Memory(slot)       => write!(f, "{}", slot),
    }
  }
}

impl FromStr for Destination {
  type Err = ();

  fn from_str(text: &str) -> Result<Self, Self::Err> {
    if text == "sp" {
      return Ok(Destination::StackPointer);
    }
    if let Ok(register) = Register::from_str(text) {
      return Ok(Destination::Register(register));
    }
    MemorySlot::from_str(text)
      .map(Destination::Memory)
      .map_err(|_| ())
  }
}

/**
  A decoded instruction. The set of variants is closed: every opcode decodes to exactly one
  variant and every variant encodes to exactly one opcode, so a `match` over `Instruction` is a
  complete dispatch table.

  Push and pop keep their raw selector word. A selector that names no register is only an error
  once the instruction executes.
*/
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum Instruction {
  Nop,
  Hlt,
  Mov {
    destination : Destination,
    value       : Word
  },
  SetFlag(Flag),
  ClearFlag(Flag),
  Push(Word),
  Pop(Word),
}

impl Instruction {

  pub fn opcode(&self) -> Opcode {
    match self {
      Instruction::Nop                        => Opcode::Nop,
      Instruction::Hlt                        => Opcode::Hlt,
      Instruction::Mov { destination, .. }    => destination.opcode(),
      Instruction::SetFlag(Flag::Equal)       => Opcode::Ste,
      Instruction::SetFlag(Flag::Greater)     => Opcode::Stg,
      Instruction::SetFlag(Flag::Higher)      => Opcode::Sth,
      Instruction::SetFlag(Flag::Lower)       => Opcode::Stl,
      Instruction::ClearFlag(Flag::Equal)     => Opcode::Cle,
      Instruction::ClearFlag(Flag::Greater)   => Opcode::Clg,
      Instruction::ClearFlag(Flag::Higher)    => Opcode::Clh,
      Instruction::ClearFlag(Flag::Lower)     => Opcode::Cll,
      Instruction::Push(_)                    => Opcode::Push,
      Instruction::Pop(_)                     => Opcode::Pop,
    }
  }

  /// The argument words carried by this instruction, in encoding order.
  pub fn arguments(&self) -> Vec<Word> {
    match self {
      Instruction::Mov { value, .. } => vec![*value],
      | Instruction::Push(selector)
      | Instruction::Pop(selector)   => vec![*selector],
      _                              => vec![],
    }
  }

  /**
    Builds the instruction for `opcode` from its decoded argument words. Missing arguments read
    as zero; the decoder always supplies as many as the opcode's length calls for.
  */
  pub fn from_parts(opcode: Opcode, args: [Word; 2]) -> Instruction {
    let arg = args[0];
    match opcode {
      Opcode::Nop     => Instruction::Nop,
      Opcode::Hlt     => Instruction::Hlt,

      Opcode::MovAx   => Instruction::Mov { destination: Destination::Register(Register::Ax), value: arg },
      Opcode::MovBx   => Instruction::Mov { destination: Destination::Register(Register::Bx), value: arg },
      Opcode::MovCx   => Instruction::Mov { destination: Destination::Register(Register::Cx), value: arg },
      Opcode::MovDx   => Instruction::Mov { destination: Destination::Register(Register::Dx), value: arg },
      Opcode::MovSp   => Instruction::Mov { destination: Destination::StackPointer,           value: arg },
      Opcode::MovMem0 => Instruction::Mov { destination: Destination::Memory(MemorySlot::M0), value: arg },
      Opcode::MovMem1 => Instruction::Mov { destination: Destination::Memory(MemorySlot::M1), value: arg },
      Opcode::MovMem2 => Instruction::Mov { destination: Destination::Memory(MemorySlot::M2), value: arg },

      Opcode::Ste     => Instruction::SetFlag(Flag::Equal),
      Opcode::Stg     => Instruction::SetFlag(Flag::Greater),
      Opcode::Sth     => Instruction::SetFlag(Flag::Higher),
      Opcode::Stl     => Instruction::SetFlag(Flag::Lower),
      Opcode::Cle     => Instruction::ClearFlag(Flag::Equal),
      Opcode::Clg     => Instruction::ClearFlag(Flag::Greater),
      Opcode::Clh     => Instruction::ClearFlag(Flag::Higher),
      Opcode::Cll     => Instruction::ClearFlag(Flag::Lower),

      Opcode::Push    => Instruction::Push(arg),
      Opcode::Pop     => Instruction::Pop(arg),
    }
  }

}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      Instruction::Mov { destination, value } => {
        write!(f, "mov {}, {:#06x}", destination, value)
      }

      | Instruction::Push(selector)
      | Instruction::Pop(selector) => {
        match Register::from_selector(*selector) {
          Ok(register) => write!(f, "{} {}", self.opcode(), register),
          Err(_)       => write!(f, "{} {}", self.opcode(), selector),
        }
      }

      _ => {
        write!(f, "{}", self.opcode())
      }

    }
  }
}
