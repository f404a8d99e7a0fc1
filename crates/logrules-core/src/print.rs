//! Indented, optionally single-line debug output.
//!
//! Every printable type in this crate takes a `level` and a
//! `spaces_per_level`:
//!
//! - the absolute value of `level` is the indentation depth; a negative
//!   `level` suppresses the indentation of the opening line only (so the
//!   output can continue a line that was already started);
//! - a negative `spaces_per_level` selects the compact single-line form
//!   `[ name = value name = value ]` with no trailing newline.
//!
//! In multi-line form each field goes on its own line, one level deeper
//! than the brackets, and the closing bracket is followed by a newline.

use std::fmt::{self, Display, Write};

/// Writes one bracketed block in the format described in the module docs.
pub struct Printer<'a> {
    out: &'a mut dyn Write,
    level: i32,
    spaces_per_level: i32,
    suppress_first_indent: bool,
}

impl<'a> Printer<'a> {
    pub fn new(out: &'a mut dyn Write, level: i32, spaces_per_level: i32) -> Self {
        Self {
            out,
            level: level.saturating_abs(),
            spaces_per_level,
            suppress_first_indent: level < 0,
        }
    }

    fn next_level(&self) -> i32 {
        self.level.saturating_add(1)
    }

    fn single_line(&self) -> bool {
        self.spaces_per_level < 0
    }

    fn indent(&mut self, level: i32) -> fmt::Result {
        if self.single_line() {
            return Ok(());
        }
        let width = usize::try_from(level.saturating_mul(self.spaces_per_level)).unwrap_or(0);
        write!(self.out, "{:width$}", "")
    }

    /// Open the block.
    pub fn start(&mut self) -> fmt::Result {
        if !self.suppress_first_indent {
            self.indent(self.level)?;
        }
        if self.single_line() {
            self.out.write_char('[')
        } else {
            self.out.write_str("[\n")
        }
    }

    /// A `name = value` line.
    pub fn field(&mut self, name: &str, value: &dyn Display) -> fmt::Result {
        if self.single_line() {
            write!(self.out, " {name} = {value}")
        } else {
            self.indent(self.next_level())?;
            writeln!(self.out, "{name} = {value}")
        }
    }

    /// An unnamed element.
    pub fn item(&mut self, value: &dyn Display) -> fmt::Result {
        if self.single_line() {
            write!(self.out, " {value}")
        } else {
            self.indent(self.next_level())?;
            writeln!(self.out, "{value}")
        }
    }

    /// A nested block introduced by `name = `. The closure receives the
    /// writer, the level and spaces-per-level to print the nested block with.
    pub fn nested_field<F>(&mut self, name: &str, print: F) -> fmt::Result
    where
        F: FnOnce(&mut dyn Write, i32, i32) -> fmt::Result,
    {
        if self.single_line() {
            write!(self.out, " {name} = ")?;
            print(&mut *self.out, 0, self.spaces_per_level)
        } else {
            self.indent(self.next_level())?;
            write!(self.out, "{name} = ")?;
            let level = -self.next_level();
            print(&mut *self.out, level, self.spaces_per_level)
        }
    }

    /// An unnamed nested block.
    pub fn nested_item<F>(&mut self, print: F) -> fmt::Result
    where
        F: FnOnce(&mut dyn Write, i32, i32) -> fmt::Result,
    {
        if self.single_line() {
            self.out.write_char(' ')?;
            print(&mut *self.out, 0, self.spaces_per_level)
        } else {
            let level = self.next_level();
            print(&mut *self.out, level, self.spaces_per_level)
        }
    }

    /// Close the block.
    pub fn end(&mut self) -> fmt::Result {
        if self.single_line() {
            self.out.write_str(" ]")
        } else {
            self.indent(self.level)?;
            self.out.write_str("]\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn block(out: &mut dyn Write, level: i32, spaces: i32) -> fmt::Result {
        let mut p = Printer::new(out, level, spaces);
        p.start()?;
        p.field("a", &1)?;
        p.nested_field("inner", |out, level, spaces| {
            let mut q = Printer::new(out, level, spaces);
            q.start()?;
            q.item(&"x")?;
            q.end()
        })?;
        p.end()
    }

    #[test]
    fn test_multi_line() {
        let mut s = String::new();
        block(&mut s, 1, 2).unwrap();
        assert_eq!(s, "  [\n    a = 1\n    inner = [\n      x\n    ]\n  ]\n");
    }

    #[test]
    fn test_negative_level_suppresses_first_indent() {
        let mut s = String::new();
        block(&mut s, -1, 2).unwrap();
        assert!(s.starts_with("[\n    a = 1\n"), "{s:?}");
        assert!(s.ends_with("\n  ]\n"), "{s:?}");
    }

    #[test]
    fn test_single_line() {
        let mut s = String::new();
        block(&mut s, 3, -1).unwrap();
        assert_eq!(s, "[ a = 1 inner = [ x ] ]");
    }

    #[test]
    fn test_nested_item() {
        let mut s = String::new();
        let mut p = Printer::new(&mut s, 0, 4);
        p.start().unwrap();
        p.nested_item(|out, level, spaces| {
            let mut q = Printer::new(out, level, spaces);
            q.start()?;
            q.end()
        })
        .unwrap();
        p.end().unwrap();
        assert_eq!(s, "[\n    [\n    ]\n]\n");
    }

    #[test]
    fn test_extreme_levels() {
        for level in [i32::MIN, i32::MIN + 1, i32::MAX] {
            let mut s = String::new();
            block(&mut s, level, 0).unwrap();
            assert_eq!(s, "[\na = 1\ninner = [\nx\n]\n]\n", "level {level}");

            let mut s = String::new();
            block(&mut s, level, -1).unwrap();
            assert_eq!(s, "[ a = 1 inner = [ x ] ]", "level {level}");
        }
    }
}
