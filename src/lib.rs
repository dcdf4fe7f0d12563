//! A minimal 16-bit bytecode virtual machine. A single memory image holds the program, its data,
//! and a stack that grows down from the top; a small register file and a flags register are
//! driven by a fetch-decode-dispatch loop that runs until `hlt` or a fault.

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;
extern crate strum;

pub mod bytecode;
pub mod errors;
pub mod memory;
pub mod registers;
pub mod report;
pub mod vm;

pub use errors::{ErrorKind, Fault, Termination};
pub use vm::VM;
