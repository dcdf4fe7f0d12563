/*!

  The machine is 16 bit and little-endian. An instruction is an opcode byte followed by zero, one,
  or two argument words, so instructions are 1, 3, or 5 bytes long and are not aligned. The
  length of an instruction depends only on its opcode, which is how the decoder knows how many
  argument bytes to read.

  Two representations of an instruction are used. `Opcode` is the single byte that appears in
  memory and is converted from a raw byte with `TryFromPrimitive`. `Instruction` is the decoded
  form: a closed enum whose variants carry their arguments in typed form. The dispatcher matches
  on `Instruction`, so adding an opcode without a handler is a compile error rather than a
  silent no-op.

*/

mod assembly;
mod binary;
mod instruction;
mod program;

/// Register and argument width.
pub type Word = u16;

pub use assembly::{parse_assembly, AssemblyError};
pub use binary::{decode, encode, instruction_size, resolve_length, OpcodeEntry, OPCODE_TABLE};
pub use instruction::{Destination, Instruction, MemorySlot, Opcode};
pub use program::{Program, ProgramError};
