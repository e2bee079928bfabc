//! The module containing the diagnostic dump facility.
//!
//! Registers and fields describe themselves to a [`DumpSink`] one line at a
//! time. A register line carries the raw value and is followed by one line per
//! field at the next level. The sink decides how the lines are rendered.

use alloc::string::String;
use core::fmt::Write;

use crate::bits::{Field, FieldKind};

/// The value part of one dumped line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, derive_more::Display)]
pub enum DumpValue {
    /// The raw value of a register.
    #[display("{_0:#018x}")]
    Hex(u64),
    /// A decoded flag.
    #[display("{_0}")]
    Bool(bool),
    /// A decoded multi-bit field.
    #[display("{_0:#x}")]
    Number(u64),
    /// A decoded value described in words.
    #[display("{_0}")]
    Text(&'static str),
    /// The register or field does not exist on this processor.
    #[display("<absent>")]
    Absent,
    /// A heading grouping the following lines.
    #[display("")]
    Section,
}

/// Receives dumped lines.
pub trait DumpSink {
    /// Receives one line. `level` is the nesting depth, 0 for a top level
    /// register.
    fn emit(&mut self, level: usize, label: &str, value: DumpValue);
}

impl<S: DumpSink + ?Sized> DumpSink for &mut S {
    fn emit(&mut self, level: usize, label: &str, value: DumpValue) {
        (**self).emit(level, label, value);
    }
}

/// Emits a register line followed by its decoded fields.
pub(crate) fn register<S: DumpSink + ?Sized>(
    sink: &mut S,
    level: usize,
    name: &str,
    raw: u64,
    fields: &[Field],
) {
    sink.emit(level, name, DumpValue::Hex(raw));
    for field in fields {
        subfield(sink, level + 1, field, raw);
    }
}

/// Emits one decoded field of `raw`.
pub(crate) fn subfield<S: DumpSink + ?Sized>(sink: &mut S, level: usize, field: &Field, raw: u64) {
    let value = match field.kind() {
        FieldKind::Flag => DumpValue::Bool(field.is_enabled(raw)),
        FieldKind::Range => DumpValue::Number(field.get(raw)),
    };
    sink.emit(level, field.name(), value);
}

/// Emits a line for a register or field that does not exist, if `verbose`.
pub(crate) fn absent<S: DumpSink + ?Sized>(sink: &mut S, level: usize, name: &str, verbose: bool) {
    if verbose {
        sink.emit(level, name, DumpValue::Absent);
    }
}

/// Writes lines through the `log` crate at the info level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl DumpSink for LogSink {
    fn emit(&mut self, level: usize, label: &str, value: DumpValue) {
        log::info!("{:indent$}{label}: {value}", "", indent = level * 2);
    }
}

/// Rendering options of [`TextSink`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextConfig {
    /// The number of spaces per nesting level.
    pub indent: usize,
    /// The column the values are aligned at.
    pub label_width: usize,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            indent: 2,
            label_width: 40,
        }
    }
}

/// Renders lines into a string, one line per [`DumpSink::emit`] call.
#[derive(Clone, Debug, Default)]
pub struct TextSink {
    config: TextConfig,
    text: String,
}

impl TextSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new(config: TextConfig) -> Self {
        Self {
            config,
            text: String::new(),
        }
    }

    /// The text rendered so far.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consumes the sink and returns the rendered text.
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }
}

impl DumpSink for TextSink {
    fn emit(&mut self, level: usize, label: &str, value: DumpValue) {
        let indent = level * self.config.indent;
        let width = self.config.label_width.saturating_sub(indent);
        let _ = writeln!(self.text, "{:indent$}{label:<width$} {value}", "");
    }
}

#[cfg(test)]
mod tests {
    use alloc::{string::ToString, vec, vec::Vec};

    use super::*;

    #[derive(Default)]
    struct Lines(Vec<(usize, String, DumpValue)>);

    impl DumpSink for Lines {
        fn emit(&mut self, level: usize, label: &str, value: DumpValue) {
            self.0.push((level, label.to_string(), value));
        }
    }

    #[test]
    fn register_is_followed_by_its_fields() {
        let fields = [
            Field::flag("lock_bit", 0),
            Field::flag("enable_vmx_outside_smx", 2),
            Field::range("senter_local_function_enables", 0x7f00, 8),
        ];
        let mut lines = Lines::default();
        register(&mut lines, 1, "ia32_feature_control", 0x0305, &fields);
        assert_eq!(
            lines.0,
            vec![
                (1, "ia32_feature_control".to_string(), DumpValue::Hex(0x0305)),
                (2, "lock_bit".to_string(), DumpValue::Bool(true)),
                (2, "enable_vmx_outside_smx".to_string(), DumpValue::Bool(true)),
                (2, "senter_local_function_enables".to_string(), DumpValue::Number(3)),
            ]
        );
    }

    #[test]
    fn absent_is_silent_unless_verbose() {
        let mut lines = Lines::default();
        absent(&mut lines, 0, "guest_pdpte0", false);
        assert!(lines.0.is_empty());
        absent(&mut lines, 0, "guest_pdpte0", true);
        assert_eq!(lines.0, vec![(0, "guest_pdpte0".to_string(), DumpValue::Absent)]);
    }

    #[test]
    fn text_rendering() {
        let mut sink = TextSink::new(TextConfig {
            indent: 2,
            label_width: 8,
        });
        sink.emit(0, "efer", DumpValue::Hex(0xd01));
        sink.emit(1, "lma", DumpValue::Bool(true));
        assert_eq!(sink.text(), "efer     0x0000000000000d01\n  lma    true\n");
    }
}
