/*!
  The human readable textual form of bytecode is called assembly. One instruction per line:

  ```text
    mov ax, 0x0004     # comment
    ste
    push ax
    pop 1              ; selectors may also be given numerically
    hlt
  ```

  Mnemonics are the `strum` names of the opcodes, except that the move family is written `mov`
  with the destination as its first operand. Numbers are decimal or `0x` hexadecimal.
*/

use std::str::FromStr;

use nom::{
  branch::alt,
  bytes::complete::tag_no_case,
  character::complete::{
    alpha1,
    alphanumeric1,
    char as one_char,
    digit1,
    hex_digit1,
    space0,
    space1
  },
  combinator::{all_consuming, map, map_res, opt},
  multi::separated_list,
  sequence::{delimited, pair, preceded},
  IResult
};
use thiserror::Error;

use crate::bytecode::{Destination, Instruction, Opcode, Word};
use crate::registers::Register;

#[derive(Error, Clone, Eq, PartialEq, Debug)]
pub enum AssemblyError {
  #[error("line {line}: cannot parse `{text}`")]
  Syntax { line: usize, text: String },

  #[error("line {line}: {name} is not an operation")]
  NotAnOperation { line: usize, name: String },

  #[error("line {line}: {name} requires {expected} operands but was given {given}")]
  WrongArity { line: usize, name: String, expected: usize, given: usize },

  #[error("line {line}: `{operand}` is not a valid operand for {name}")]
  BadOperand { line: usize, name: String, operand: String },
}

/// An operand as written, before it is checked against its instruction.
#[derive(Clone, Eq, PartialEq, Debug)]
enum Operand<'a> {
  Number(Word),
  Name(&'a str),
}

impl<'a> Operand<'a> {
  fn text(&self) -> String {
    match self {
      Operand::Number(n) => n.to_string(),
      Operand::Name(s)   => s.to_string(),
    }
  }
}

// region Parsers

fn number(input: &str) -> IResult<&str, Word> {
  alt((
    map_res(
      preceded(tag_no_case("0x"), hex_digit1),
      |digits: &str| Word::from_str_radix(digits, 16)
    ),
    map_res(digit1, |digits: &str| digits.parse::<Word>())
  ))(input)
}

fn operand(input: &str) -> IResult<&str, Operand> {
  alt((
    map(number, Operand::Number),
    map(alphanumeric1, Operand::Name)
  ))(input)
}

/// `mnemonic [operand {, operand}]`, with surrounding whitespace already trimmed.
fn statement(input: &str) -> IResult<&str, (&str, Vec<Operand>)> {
  all_consuming(
    pair(
      alpha1,
      map(
        opt(preceded(
          space1,
          separated_list(delimited(space0, one_char(','), space0), operand)
        )),
        Option::unwrap_or_default
      )
    )
  )(input)
}

// endregion

/// Removes a trailing `#` or `;` comment and surrounding whitespace.
fn strip_comment(line: &str) -> &str {
  match line.find(|c: char| c == '#' || c == ';') {
    Some(idx) => line[..idx].trim(),
    None      => line.trim()
  }
}

fn register_selector(operand: &Operand) -> Option<Word> {
  match operand {
    Operand::Number(n) => Some(*n),
    Operand::Name(s)   => Register::from_str(&s.to_lowercase()).ok().map(|r| r.selector()),
  }
}

fn assemble(line: usize, name: &str, operands: &[Operand]) -> Result<Instruction, AssemblyError> {
  let mnemonic = name.to_lowercase();
  let arity = |expected: usize| {
    match operands.len() == expected {
      true  => Ok(()),
      false => Err(AssemblyError::WrongArity{
        line,
        name     : mnemonic.clone(),
        expected,
        given    : operands.len()
      })
    }
  };
  let bad_operand = |operand: &Operand| {
    AssemblyError::BadOperand{ line, name: mnemonic.clone(), operand: operand.text() }
  };

  if mnemonic == "mov" {
    arity(2)?;
    let destination = match &operands[0] {
      Operand::Name(s) => Destination::from_str(&s.to_lowercase())
                            .map_err(|_| bad_operand(&operands[0]))?,
      other            => return Err(bad_operand(other)),
    };
    let value = match &operands[1] {
      Operand::Number(n) => *n,
      other              => return Err(bad_operand(other)),
    };
    return Ok(Instruction::Mov{ destination, value });
  }

  let opcode = Opcode::from_str(&mnemonic)
    .map_err(|_| AssemblyError::NotAnOperation{ line, name: name.to_string() })?;

  match opcode {
    // The move family is only reachable through `mov`.
    | Opcode::MovAx | Opcode::MovBx | Opcode::MovCx | Opcode::MovDx
    | Opcode::MovSp | Opcode::MovMem0 | Opcode::MovMem1 | Opcode::MovMem2 => {
      Err(AssemblyError::NotAnOperation{ line, name: name.to_string() })
    }

    Opcode::Push | Opcode::Pop => {
      arity(1)?;
      let selector = register_selector(&operands[0])
                       .ok_or_else(|| bad_operand(&operands[0]))?;
      Ok(Instruction::from_parts(opcode, [selector, 0]))
    }

    _ => {
      arity(0)?;
      Ok(Instruction::from_parts(opcode, [0, 0]))
    }
  }
}

/// Parses assembly text into instructions, in order. Blank and comment-only lines are skipped.
pub fn parse_assembly(text: &str) -> Result<Vec<Instruction>, AssemblyError> {
  let mut instructions: Vec<Instruction> = Vec::new();

  for (idx, raw_line) in text.lines().enumerate() {
    let line = idx + 1;
    let code = strip_comment(raw_line);
    if code.is_empty() {
      continue;
    }

    let (_rest, (name, operands)) = statement(code)
      .map_err(|_| AssemblyError::Syntax{ line, text: code.to_string() })?;
    instructions.push(assemble(line, name, &operands)?);
  }

  Ok(instructions)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::bytecode::MemorySlot;
  use crate::registers::Flag;

  #[test]
  fn numbers() {
    assert_eq!(number("0x5005"), Ok(("", 0x5005)));
    assert_eq!(number("0XfF"), Ok(("", 0xff)));
    assert_eq!(number("42"), Ok(("", 42)));
    assert_eq!(number("0x10000"), Ok(("x10000", 0)));
  }

  #[test]
  fn demonstration_program() {
    let text = "
      # Push ax and pop it into bx.
      mov ax, 0x04
      ste
      push ax
      mov bx, 0x5005   ; overwritten by the pop
      pop bx
      hlt
    ";
    let program = parse_assembly(text).unwrap();
    assert_eq!(program, vec![
      Instruction::Mov{ destination: Destination::Register(Register::Ax), value: 0x0004 },
      Instruction::SetFlag(Flag::Equal),
      Instruction::Push(0),
      Instruction::Mov{ destination: Destination::Register(Register::Bx), value: 0x5005 },
      Instruction::Pop(1),
      Instruction::Hlt,
    ]);
  }

  #[test]
  fn destinations_and_selectors() {
    let program = parse_assembly("MOV sp,0x10\nmov m2 , 7\npush 9\nCLL").unwrap();
    assert_eq!(program, vec![
      Instruction::Mov{ destination: Destination::StackPointer, value: 0x10 },
      Instruction::Mov{ destination: Destination::Memory(MemorySlot::M2), value: 7 },
      Instruction::Push(9),
      Instruction::ClearFlag(Flag::Lower),
    ]);
  }

  #[test]
  fn register_names_ignore_case() {
    let program = parse_assembly("MOV AX, 1\nPUSH AX\nPop Dx\nhlt").unwrap();
    assert_eq!(program, vec![
      Instruction::Mov{ destination: Destination::Register(Register::Ax), value: 1 },
      Instruction::Push(0),
      Instruction::Pop(3),
      Instruction::Hlt,
    ]);
  }

  #[test]
  fn errors_carry_line_numbers() {
    assert_eq!(
      parse_assembly("nop\njmp 4"),
      Err(AssemblyError::NotAnOperation{ line: 2, name: "jmp".to_string() })
    );
    assert_eq!(
      parse_assembly("\n\nhlt ax"),
      Err(AssemblyError::WrongArity{ line: 3, name: "hlt".to_string(), expected: 0, given: 1 })
    );
    assert_eq!(
      parse_assembly("mov 4, 4"),
      Err(AssemblyError::BadOperand{ line: 1, name: "mov".to_string(), operand: "4".to_string() })
    );
    assert_eq!(
      parse_assembly("push ip"),
      Err(AssemblyError::BadOperand{ line: 1, name: "push".to_string(), operand: "ip".to_string() })
    );
    assert_eq!(
      parse_assembly("movax 4"),
      Err(AssemblyError::NotAnOperation{ line: 1, name: "movax".to_string() })
    );
    assert_eq!(
      parse_assembly("mov ax, 0x"),
      Err(AssemblyError::Syntax{ line: 1, text: "mov ax, 0x".to_string() })
    );
  }
}
