//! The fault reporter. Turns the way a run ended into a diagnostic: a one line message for the
//! diagnostics stream and, when a machine exists, a dump of its registers, flags, and memory tail.

use std::io::{self, Write};

use crate::errors::{ErrorKind, Fault, Termination};
use crate::vm::VM;

pub struct Report<'a> {
  kind   : ErrorKind,
  fault  : Option<Fault>,
  vm     : Option<&'a VM>,
}

impl<'a> Report<'a> {

  pub fn new(termination: Termination, vm: &'a VM) -> Report<'a> {
    let fault = match termination {
      Termination::Halted         => None,
      Termination::Faulted(fault) => Some(fault),
    };
    Report{ kind: termination.kind(), fault, vm: Some(vm) }
  }

  /// A report for a machine that could not be constructed.
  pub fn construction_failed(fault: Fault) -> Report<'static> {
    Report{ kind: fault.kind(), fault: Some(fault), vm: None }
  }

  pub fn kind(&self) -> ErrorKind {
    self.kind
  }

  pub fn message(&self) -> String {
    match self.fault {
      Some(fault) => format!("{}: {}", self.kind, fault),
      None        => self.kind.to_string(),
    }
  }

  /// Zero for a halt, otherwise the kind code.
  pub fn exit_code(&self) -> i32 {
    match self.kind {
      ErrorKind::SystemHalt | ErrorKind::NoError => 0,
      kind                                       => kind.code() as i32,
    }
  }

  /// Writes the message to `diagnostics` and the state dump, if any, to `out`.
  pub fn emit<O, D>(&self, out: &mut O, diagnostics: &mut D) -> io::Result<()>
    where O: Write, D: Write
  {
    writeln!(diagnostics, "{}", self.message())?;
    if let Some(vm) = self.vm {
      write!(out, "{}", vm)?;
    }
    out.flush()
  }

}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::bytecode::{Instruction, Program};

  fn emitted(report: &Report) -> (String, String) {
    let mut out: Vec<u8> = Vec::new();
    let mut diagnostics: Vec<u8> = Vec::new();
    report.emit(&mut out, &mut diagnostics).unwrap();
    (String::from_utf8(out).unwrap(), String::from_utf8(diagnostics).unwrap())
  }

  #[test]
  fn halt_report() {
    let mut vm = VM::new().unwrap();
    vm.load(&Program::new(vec![Instruction::Push(0), Instruction::Hlt]).unwrap()).unwrap();
    let report = Report::new(vm.execute(), &vm);

    assert_eq!(report.exit_code(), 0);
    let (out, diagnostics) = emitted(&report);
    assert_eq!(diagnostics, "System halted\n");
    assert!(out.contains("sp ="));
    assert!(out.contains("fffd"));
    assert!(out.ends_with(&format!("{}\n", "00".repeat(32))));
  }

  #[test]
  fn fault_report() {
    let mut vm = VM::new().unwrap();
    vm.load(&Program::new(vec![Instruction::Pop(0), Instruction::Hlt]).unwrap()).unwrap();
    let report = Report::new(vm.execute(), &vm);

    assert_eq!(report.kind(), ErrorKind::IllegalInstruction);
    assert_eq!(report.exit_code(), 0x08);
    let (out, diagnostics) = emitted(&report);
    assert_eq!(diagnostics, "VM Illegal instruction: stack empty: cannot pop with the stack pointer at 0xffff\n");
    assert!(out.contains("Flags: -"));
  }

  #[test]
  fn construction_failure_has_no_dump() {
    let report = Report::construction_failed(Fault::OutOfMemory{ size: 0xffff });
    assert_eq!(report.exit_code(), 0x02);
    let (out, diagnostics) = emitted(&report);
    assert!(out.is_empty());
    assert!(diagnostics.starts_with("VM Memory allocation failure"));
  }
}
