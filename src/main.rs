use std::{env, fs, io, process};

use tracing_subscriber::EnvFilter;

use hvm::bytecode::{parse_assembly, Destination, Instruction, Program, ProgramError};
use hvm::registers::{Flag, Register};
use hvm::report::Report;
use hvm::VM;

/// Pushes ax, overwrites bx, and pops the pushed value back into bx.
fn example_program() -> Vec<Instruction> {
  vec![
    Instruction::Mov { destination: Destination::Register(Register::Ax), value: 0x0004 },
    Instruction::SetFlag(Flag::Equal),
    Instruction::Push(Register::Ax.selector()),
    Instruction::Mov { destination: Destination::Register(Register::Bx), value: 0x5005 },
    Instruction::Pop(Register::Bx.selector()),
    Instruction::Hlt,
  ]
}

fn read_program(path: Option<String>) -> Result<Program, String> {
  let instructions = match path {
    Some(path) => {
      let text = fs::read_to_string(&path)
                   .map_err(|e| format!("{}: {}", path, e))?;
      parse_assembly(&text)
        .map_err(|e| format!("{}: {}", path, ProgramError::from(e)))?
    }
    None => example_program()
  };
  Program::new(instructions).map_err(|e| e.to_string())
}

/// Prints the report and returns its exit code.
fn finish(report: &Report) -> i32 {
  // Nothing else can be reported if stdout or stderr itself fails; the exit code still stands.
  let _ = report.emit(&mut io::stdout(), &mut io::stderr());
  report.exit_code()
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(io::stderr)
    .init();

  let program = match read_program(env::args().nth(1)) {
    Ok(program) => program,
    Err(message) => {
      eprintln!("{}", message);
      process::exit(1);
    }
  };

  let mut vm = match VM::new() {
    Ok(vm) => vm,
    Err(fault) => {
      process::exit(finish(&Report::construction_failed(fault)));
    }
  };

  if let Err(e) = vm.load(&program) {
    eprintln!("{}", e);
    process::exit(1);
  }

  let termination = vm.execute();
  let code        = finish(&Report::new(termination, &vm));

  // The machine owns the memory image; release it before exiting.
  drop(vm);
  process::exit(code);
}
