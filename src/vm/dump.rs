//! Human-readable listing of an emitted instruction stream.

use super::ops::Insn;

/// Disassembler for emitted instructions.
pub struct Disassembler<'a> {
    code: &'a [Insn],
    output: String,
}

impl<'a> Disassembler<'a> {
    pub fn new(code: &'a [Insn]) -> Self {
        Self {
            code,
            output: String::new(),
        }
    }

    pub fn disassemble(&mut self, title: &str) -> &str {
        self.output.push_str(&format!("== {} ==\n", title));
        for (pc, insn) in self.code.iter().enumerate() {
            match insn {
                // Labels sit flush left, like an assembler listing
                Insn::Mark(label) => self.output.push_str(&format!("{:04}: {}:\n", pc, label)),
                _ => self.output.push_str(&format!("{:04}:     {}\n", pc, insn)),
            }
        }
        &self.output
    }
}

/// Format an instruction stream as a listing.
pub fn format_code(title: &str, code: &[Insn]) -> String {
    let mut disassembler = Disassembler::new(code);
    disassembler.disassemble(title).to_string()
}
