//! Structures and functions for the virtual machine: the memory image, the register file, and the
//! fetch-decode-dispatch loop that drives them.

use std::fmt::{Display, Formatter};

use prettytable::{format as TableFormat, Table};
use strum::IntoEnumIterator;
use tracing::{debug, info};

use crate::bytecode::*;
use crate::errors::{Fault, Termination};
use crate::memory::{hex_dump, Memory, MEMORY_SIZE};
use crate::registers::{ByteSelect, Flag, Register, Registers};

/// Number of trailing memory bytes shown in a state dump.
pub const DUMP_TAIL: usize = 32;

/// Highest stack pointer a `pop` accepts. Above it nothing has been pushed.
pub const STACK_BOTTOM: Word = 0xfffd;

/// Execution state. `Halted` and `Faulted` are terminal.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum State {
  Running,
  Halted,
  Faulted(Fault),
}

/// What the loop does after an instruction completes.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Flow {
  Continue,
  Halt,
}

pub struct VM {
  registers : Registers,
  memory    : Memory,
  /// One past the last loaded byte.
  brk       : Word,
  state     : State,
}

impl VM {

  // region Display methods

  fn make_register_table(registers: &Registers) -> Table {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Register", ubl->"Contents"]);

    let general = Register::iter().map(|r| (r.to_string(), registers.get(r)));
    let special = vec![
      ("sp".to_string(),    registers.sp),
      ("ip".to_string(),    registers.ip),
      ("flags".to_string(), registers.flags),
    ];

    for (name, value) in general.chain(special) {
      table.add_row(row![r->format!("{} =", name), format!("{:04x}", value)]);
    }
    table
  }

  /// Names of the set flags, highest bit first, or `-` when none are set.
  pub fn describe_flags(registers: &Registers) -> String {
    let set: Vec<&'static str> =
      Flag::iter()
        .filter(|f| registers.flag(*f))
        .map(|f| f.into())
        .collect();

    match set.is_empty() {
      true  => "-".to_string(),
      false => set.join(" ")
    }
  }

  // endregion

  // region Low-level utility methods

  /// Allocates a zeroed machine with the stack pointer at the top of memory.
  pub fn new() -> Result<VM, Fault> {
    Ok(VM {
      registers : Registers::new(),
      memory    : Memory::new()?,
      brk       : 0,
      state     : State::Running,
    })
  }

  pub fn registers(&self) -> &Registers {
    &self.registers
  }

  pub fn memory(&self) -> &Memory {
    &self.memory
  }

  pub fn brk(&self) -> Word {
    self.brk
  }

  pub fn state(&self) -> State {
    self.state
  }

  /// Copies a program into memory from address zero and moves the break past it.
  pub fn load(&mut self, program: &Program) -> Result<Word, ProgramError> {
    let brk = self.load_bytes(&program.to_bytes())?;
    info!(instructions = program.instructions().len(), brk, "program loaded");
    Ok(brk)
  }

  /**
    Copies a pre-encoded image into memory from address zero and moves the break past it. The
    bytes are not checked to be valid instructions.
  */
  pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<Word, ProgramError> {
    if bytes.len() > MEMORY_SIZE {
      return Err(ProgramError::TooLarge{ size: bytes.len(), capacity: MEMORY_SIZE });
    }
    self.memory
        .copy_in(0, bytes)
        .map_err(|_| ProgramError::TooLarge{ size: bytes.len(), capacity: MEMORY_SIZE })?;
    self.brk = bytes.len() as Word;
    Ok(self.brk)
  }

  // endregion

  // region Execution

  /**
    Runs until a `hlt` or a fault. Either way the machine is left in a terminal state, and calling
    `execute` again only reports how it ended.
  */
  pub fn execute(&mut self) -> Termination {
    loop {
      match self.state {
        State::Halted         => return Termination::Halted,
        State::Faulted(fault) => return Termination::Faulted(fault),
        State::Running        => {}
      }

      self.state = match self.step() {
        Ok(Flow::Continue) => State::Running,
        Ok(Flow::Halt)     => {
          info!(ip = self.registers.ip, "system halted");
          State::Halted
        }
        Err(fault)         => {
          info!(ip = self.registers.ip, %fault, "fault");
          State::Faulted(fault)
        }
      };
    }
  }

  /**
    Fetches, decodes, and dispatches the instruction at the instruction pointer, then advances the
    instruction pointer past it. A halt leaves the instruction pointer on the `hlt`.
  */
  pub fn step(&mut self) -> Result<Flow, Fault> {
    let ip = self.registers.ip;
    if ip > self.brk {
      return Err(Fault::PastBreak{ ip, brk: self.brk });
    }

    let (instruction, length) = decode(&self.memory, ip)?;
    debug!(ip, %instruction, "dispatch");
    let flow = self.dispatch(instruction)?;

    if flow == Flow::Continue {
      self.registers.ip =
        ip.checked_add(length as Word)
          .ok_or(Fault::OutOfBounds{ address: ip as usize + length as usize })?;
    }

    #[cfg(feature = "trace_computation")] println!("{}\n{}", instruction, self);

    Ok(flow)
  }

  fn dispatch(&mut self, instruction: Instruction) -> Result<Flow, Fault> {
    match instruction {

      Instruction::Nop => {}

      Instruction::Hlt => {
        return Ok(Flow::Halt);
      }

      Instruction::Mov { destination, value } => {
        self.mov(destination, value)?;
      }

      Instruction::SetFlag(flag) => {
        self.registers.set_flag(flag);
      }

      Instruction::ClearFlag(flag) => {
        self.registers.clear_flag(flag);
      }

      Instruction::Push(selector) => {
        self.push(selector)?;
      }

      Instruction::Pop(selector) => {
        self.pop(selector)?;
      }

    }
    Ok(Flow::Continue)
  }

  // endregion

  // region VM instruction methods

  /**
    Writes `value` to `destination`. A general register honors the byte-select flags; the stack
    pointer is always overwritten in full. The memory destinations have no addressing mode and
    do nothing.
  */
  fn mov(&mut self, destination: Destination, value: Word) -> Result<(), Fault> {
    let select = self.registers.byte_select()?;

    match destination {
      Destination::Register(register) => self.registers.write(register, value, select),
      Destination::StackPointer       => self.registers.sp = value,
      Destination::Memory(_)          => {}
    }
    Ok(())
  }

  fn require_no_byte_select(&self) -> Result<(), Fault> {
    match self.registers.byte_select()? {
      ByteSelect::Full => Ok(()),
      _                => Err(Fault::ByteSelectActive)
    }
  }

  /// Pushes the selected register. The stack may not grow into the loaded program.
  fn push(&mut self, selector: Word) -> Result<(), Fault> {
    self.require_no_byte_select()?;

    let sp = self.registers.sp;
    if sp < 2 {
      return Err(Fault::StackExhausted{ sp });
    }
    if (sp as u32) < (self.brk as u32) + 2 {
      return Err(Fault::StackOverrun{ sp, brk: self.brk });
    }

    let register = Register::from_selector(selector)?;
    let sp       = sp - 2;
    self.memory.write_word(sp, self.registers.get(register))?;
    self.registers.sp = sp;
    Ok(())
  }

  /// Pops the top of the stack into the selected register.
  fn pop(&mut self, selector: Word) -> Result<(), Fault> {
    self.require_no_byte_select()?;

    let sp = self.registers.sp;
    if sp > STACK_BOTTOM {
      return Err(Fault::StackEmpty{ sp });
    }

    let register = Register::from_selector(selector)?;
    let value    = self.memory.read_word(sp)?;
    self.registers.write(register, value, ByteSelect::Full);
    self.registers.sp = sp + 2;
    Ok(())
  }

  // endregion

}

lazy_static! {
  pub static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

impl Display for VM {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let table = VM::make_register_table(&self.registers);

    write!(
      f,
      "{}Flags: {}\nBreak: {:04x}\n{}\n",
      table,
      VM::describe_flags(&self.registers),
      self.brk,
      hex_dump(self.memory.tail(DUMP_TAIL), None)
    )
  }
}
