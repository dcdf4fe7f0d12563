/*!
  A `Program` is a finite, ordered sequence of instructions that ends in `hlt`. Load order is
  execution order: the loader lays the encoded instructions end to end from address zero, and the
  address one past the last byte becomes the machine's break.
*/

use std::fmt::{Display, Formatter};

use thiserror::Error;
use tracing::warn;

use crate::bytecode::{encode, AssemblyError, Instruction};
use crate::memory::MEMORY_SIZE;

#[derive(Error, Clone, Eq, PartialEq, Debug)]
pub enum ProgramError {
  #[error("program does not contain a hlt instruction")]
  MissingHalt,

  #[error("program is {size} bytes but the memory image holds {capacity}")]
  TooLarge { size: usize, capacity: usize },

  #[error(transparent)]
  Assembly(#[from] AssemblyError),
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Program {
  instructions: Vec<Instruction>,
}

impl Program {

  /**
    Validates and wraps `instructions`. The program must contain a `hlt`. Anything after the first
    `hlt` is never loaded, so it is dropped here with a warning.
  */
  pub fn new(mut instructions: Vec<Instruction>) -> Result<Program, ProgramError> {
    let halt_idx =
      instructions
        .iter()
        .position(|i| *i == Instruction::Hlt)
        .ok_or(ProgramError::MissingHalt)?;

    if halt_idx + 1 < instructions.len() {
      warn!(
        dropped = instructions.len() - halt_idx - 1,
        "ignoring instructions after hlt"
      );
      instructions.truncate(halt_idx + 1);
    }

    let program = Program{ instructions };
    let size    = program.encoded_len();
    if size > MEMORY_SIZE {
      return Err(ProgramError::TooLarge{ size, capacity: MEMORY_SIZE });
    }
    Ok(program)
  }

  pub fn instructions(&self) -> &[Instruction] {
    &self.instructions
  }

  /// The program as it is laid out in memory.
  pub fn to_bytes(&self) -> Vec<u8> {
    self.instructions.iter().flat_map(encode).collect()
  }

  pub fn encoded_len(&self) -> usize {
    self.instructions.iter().map(|i| encode(i).len()).sum()
  }

}

impl Display for Program {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    for instruction in &self.instructions {
      writeln!(f, "{}", instruction)?;
    }
    Ok(())
  }
}
