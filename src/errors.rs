//! Terminal conditions of the virtual machine. Every `Fault` ends execution; there is no local
//! recovery. A `Fault` carries the detail of what went wrong, and `Fault::kind` classifies it into
//! one of the coarse `ErrorKind`s that decide the reporter's message and the process exit status.

use std::fmt::{Display, Formatter};

use num_enum::IntoPrimitive;
use thiserror::Error;

use crate::bytecode::Word;

/**
  The coarse classification of how a run ended. The numeric values are the status codes the
  driver exits with; only `SystemHalt` maps to a successful exit.
*/
#[derive(IntoPrimitive, Clone, Copy, Eq, PartialEq, Debug, Hash)]
#[repr(u8)]
pub enum ErrorKind {
  NoError                 = 0x00,
  SystemHalt              = 0x01,
  MemoryAllocationFailure = 0x02,
  Segmentation            = 0x04,
  IllegalInstruction      = 0x08,
}

impl ErrorKind {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  /// The one-line diagnostic the reporter prints for this kind.
  pub fn message(&self) -> &'static str {
    match self {
      ErrorKind::NoError                 => "No error",
      ErrorKind::SystemHalt              => "System halted",
      ErrorKind::MemoryAllocationFailure => "VM Memory allocation failure",
      ErrorKind::Segmentation            => "VM Segmentation fault",
      ErrorKind::IllegalInstruction      => "VM Illegal instruction",
    }
  }
}

impl Display for ErrorKind {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.message())
  }
}

#[derive(Error, Clone, Copy, Eq, PartialEq, Debug)]
pub enum Fault {
  // region Memory allocation

  #[error("could not reserve {size} bytes for the memory image")]
  OutOfMemory { size: usize },

  // endregion

  // region Segmentation

  #[error("instruction pointer {ip:#06x} is past the break {brk:#06x}")]
  PastBreak { ip: Word, brk: Word },

  #[error("address {address:#06x} is outside the memory image")]
  OutOfBounds { address: usize },

  #[error("push would move the stack pointer {sp:#06x} into loaded data ending at {brk:#06x}")]
  StackOverrun { sp: Word, brk: Word },

  #[error("opcode {opcode:#04x} has an invalid encoded length {length}")]
  BadLength { opcode: u8, length: u8 },

  // endregion

  // region Illegal instruction

  #[error("unknown opcode {opcode:#04x} at {address:#06x}")]
  UnknownOpcode { opcode: u8, address: Word },

  #[error("both the higher-byte and lower-byte select flags are set")]
  ConflictingByteSelect,

  #[error("push and pop require both byte-select flags to be clear")]
  ByteSelectActive,

  #[error("{selector:#06x} does not select a general register")]
  InvalidRegister { selector: Word },

  #[error("stack exhausted: cannot push with the stack pointer at {sp:#06x}")]
  StackExhausted { sp: Word },

  #[error("stack empty: cannot pop with the stack pointer at {sp:#06x}")]
  StackEmpty { sp: Word },

  // endregion
}

impl Fault {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Fault::OutOfMemory { .. } => ErrorKind::MemoryAllocationFailure,

      | Fault::PastBreak   { .. }
      | Fault::OutOfBounds { .. }
      | Fault::StackOverrun{ .. }
      | Fault::BadLength   { .. } => ErrorKind::Segmentation,

      | Fault::UnknownOpcode   { .. }
      | Fault::ConflictingByteSelect
      | Fault::ByteSelectActive
      | Fault::InvalidRegister { .. }
      | Fault::StackExhausted  { .. }
      | Fault::StackEmpty      { .. } => ErrorKind::IllegalInstruction,
    }
  }
}

/// How a call to `VM::execute` ended. Both variants are terminal.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Termination {
  Halted,
  Faulted(Fault),
}

impl Termination {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Termination::Halted        => ErrorKind::SystemHalt,
      Termination::Faulted(fault) => fault.kind(),
    }
  }

  /// The process exit status for this termination: zero for a halt, the kind code otherwise.
  pub fn exit_code(&self) -> i32 {
    match self {
      Termination::Halted         => 0,
      Termination::Faulted(fault) => fault.kind().code() as i32,
    }
  }
}

impl Display for Termination {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Termination::Halted         => write!(f, "{}", ErrorKind::SystemHalt),
      Termination::Faulted(fault) => write!(f, "{}: {}", fault.kind(), fault),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kinds_have_original_codes() {
    assert_eq!(ErrorKind::NoError.code(), 0x00);
    assert_eq!(ErrorKind::SystemHalt.code(), 0x01);
    assert_eq!(ErrorKind::MemoryAllocationFailure.code(), 0x02);
    assert_eq!(ErrorKind::Segmentation.code(), 0x04);
    assert_eq!(ErrorKind::IllegalInstruction.code(), 0x08);
  }

  #[test]
  fn faults_are_classified() {
    assert_eq!(Fault::PastBreak{ ip: 4, brk: 3 }.kind(), ErrorKind::Segmentation);
    assert_eq!(Fault::StackOverrun{ sp: 4, brk: 3 }.kind(), ErrorKind::Segmentation);
    assert_eq!(Fault::StackEmpty{ sp: 0xffff }.kind(), ErrorKind::IllegalInstruction);
    assert_eq!(Fault::ConflictingByteSelect.kind(), ErrorKind::IllegalInstruction);
    assert_eq!(Fault::OutOfMemory{ size: 1 }.kind(), ErrorKind::MemoryAllocationFailure);
  }

  #[test]
  fn only_a_halt_exits_successfully() {
    assert_eq!(Termination::Halted.exit_code(), 0);
    assert_eq!(Termination::Faulted(Fault::ConflictingByteSelect).exit_code(), 0x08);
    assert_eq!(Termination::Faulted(Fault::PastBreak{ ip: 9, brk: 2 }).exit_code(), 0x04);
  }

  #[test]
  fn termination_message() {
    let text = Termination::Faulted(Fault::UnknownOpcode{ opcode: 0xee, address: 0x10 }).to_string();
    assert_eq!(text, "VM Illegal instruction: unknown opcode 0xee at 0x0010");
    assert_eq!(Termination::Halted.to_string(), "System halted");
  }
}
