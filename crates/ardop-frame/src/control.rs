//! Control-message parsing seam.
//!
//! The framer only delivers command lines; what a line means is up to the
//! session layer. [`ControlParser`] is the hook, with [`ControlMessage`] as a
//! minimal default that splits the command word from its arguments.

/// Turns one command line into a structured message.
pub trait ControlParser {
    type Message;

    fn parse(&self, line: &str) -> Self::Message;
}

impl<F, M> ControlParser for F
where
    F: Fn(&str) -> M,
{
    type Message = M;

    fn parse(&self, line: &str) -> M {
        self(line)
    }
}

/// A command word and whatever followed it on the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlMessage {
    /// Upper-cased command word, e.g. `NEWSTATE`.
    pub command: String,
    /// Remainder of the line after the first space, untouched.
    pub value: Option<String>,
}

impl ControlMessage {
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end();
        let (command, value) = match line.split_once(' ') {
            Some((command, rest)) => (command, Some(rest.trim_start().to_string())),
            None => (line, None),
        };
        Self {
            command: command.to_ascii_uppercase(),
            value: value.filter(|v| !v.is_empty()),
        }
    }

    /// Whitespace-separated arguments.
    pub fn args(&self) -> Vec<&str> {
        self.value
            .as_deref()
            .map(|v| v.split_whitespace().collect())
            .unwrap_or_default()
    }
}

/// Parser producing [`ControlMessage`] values.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultParser;

impl ControlParser for DefaultParser {
    type Message = ControlMessage;

    fn parse(&self, line: &str) -> ControlMessage {
        ControlMessage::parse(line)
    }
}
