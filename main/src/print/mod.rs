use std::fmt;
use std::io::Write;

use crate::Result;

pub(crate) mod file;
pub(crate) mod line;
pub(crate) mod symbol;
pub(crate) mod types;
pub(crate) mod unit;

pub trait Printer {
    /// Write a line with an optional label.
    fn line(&mut self, label: &str, buf: &[u8]) -> Result<()>;

    /// Write a formatted line with an optional label.
    fn line_args(&mut self, label: &str, args: fmt::Arguments) -> Result<()> {
        let buf = fmt::format(args);
        self.line(label, buf.as_bytes())
    }

    fn line_break(&mut self) -> Result<()>;

    /// Calls `body` with a printer that indents one more level.
    fn indent(&mut self, body: &mut dyn FnMut(&mut dyn Printer) -> Result<()>) -> Result<()>;
}

pub struct TextPrinter<'w> {
    w: &'w mut dyn Write,
    indent: usize,
}

impl<'w> TextPrinter<'w> {
    pub fn new(w: &'w mut dyn Write) -> Self {
        TextPrinter { w, indent: 0 }
    }

    fn write_indent(&mut self) -> Result<()> {
        for _ in 0..self.indent {
            write!(self.w, "\t")?;
        }
        Ok(())
    }
}

impl<'w> Printer for TextPrinter<'w> {
    fn line(&mut self, label: &str, buf: &[u8]) -> Result<()> {
        self.write_indent()?;
        if !label.is_empty() {
            write!(self.w, "{}:", label)?;
            if !buf.is_empty() {
                write!(self.w, " ")?;
            }
        }
        self.w.write_all(buf)?;
        writeln!(self.w)?;
        Ok(())
    }

    fn line_break(&mut self) -> Result<()> {
        writeln!(self.w).map_err(From::from)
    }

    fn indent(&mut self, body: &mut dyn FnMut(&mut dyn Printer) -> Result<()>) -> Result<()> {
        let mut printer = TextPrinter {
            w: &mut *self.w,
            indent: self.indent + 1,
        };
        body(&mut printer)
    }
}
