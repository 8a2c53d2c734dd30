use std::io::{self, Write};

use super::RunReport;

pub(super) fn render<W: Write>(report: &RunReport, out: &mut W) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)
}
