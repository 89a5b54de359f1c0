use std::collections::BTreeSet;

use super::Disassembly;
use crate::isa::Operation;

impl Disassembly {
    fn label_at(&self, address: usize) -> Option<&String> {
        u16::try_from(address)
            .ok()
            .and_then(|address| self.labels.get(&address))
    }

    /// Generate a listing with the synthesized labels in front of their lines
    ///
    /// E.g.
    /// ```text
    ///             L_0200:
    /// 0200: 6A05          CP      VA, 05h
    /// 0202: 1200          JUMP    L_0200
    /// ```
    #[tracing::instrument(skip(self))]
    pub fn listing(&self) -> String {
        let mut str = String::new();

        for line in &self.lines {
            if let Some(label) = self.label_at(line.address) {
                str.push_str(format!("            {}:\n", label).as_str());
            }
            str.push_str(
                format!(
                    "{:04X}: {:04X}          {}\n",
                    line.address, line.word, line.text
                )
                .as_str(),
            );
        }

        str
    }

    /// Generate source that assembles back into the same program.
    ///
    /// Labels that point outside of the program, or in between instructions, are defined with
    /// `.label`. Words that are not an instruction become comments, with an `.org` to keep the
    /// following instructions at their addresses.
    #[tracing::instrument(skip(self))]
    pub fn source(&self) -> String {
        let mut str = String::new();
        str.push_str(".code\n");
        str.push_str(format!(".org {:04X}h\n", self.base).as_str());

        let addresses: BTreeSet<usize> = self.lines.iter().map(|line| line.address).collect();
        for (address, label) in &self.labels {
            if !addresses.contains(&(*address as usize)) {
                str.push_str(format!(".label {} {:04X}h\n", label, address).as_str());
            }
        }

        for line in &self.lines {
            if let Some(label) = self.label_at(line.address) {
                str.push_str(format!("{}:\n", label).as_str());
            }
            if line.decoded.operation == Operation::Invalid {
                str.push_str(format!("    ; {}\n", line.text).as_str());
                str.push_str(format!(".org {:04X}h\n", line.address + 2).as_str());
            } else {
                str.push_str(format!("    {}\n", line.text).as_str());
            }
        }

        str
    }
}
