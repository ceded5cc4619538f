use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("illegal segment '{0}'")]
pub struct IllegalSegment(pub String);

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Segment {
    Argument,
    Local,
    Static,
    Constant,
    This,
    That,
    Pointer,
    Temp,
}

impl Segment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Argument => "argument",
            Self::Local => "local",
            Self::Static => "static",
            Self::Constant => "constant",
            Self::This => "this",
            Self::That => "that",
            Self::Pointer => "pointer",
            Self::Temp => "temp",
        }
    }
}

impl FromStr for Segment {
    type Err = IllegalSegment;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "argument" => Ok(Segment::Argument),
            "local" => Ok(Segment::Local),
            "static" => Ok(Segment::Static),
            "constant" => Ok(Segment::Constant),
            "this" => Ok(Segment::This),
            "that" => Ok(Segment::That),
            "pointer" => Ok(Segment::Pointer),
            "temp" => Ok(Segment::Temp),
            _ => Err(IllegalSegment(s.to_owned())),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Command {
    // arithmetic commands (no arguments)
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
    Push { segment: Segment, index: u16 },
    Pop { segment: Segment, index: u16 },
    // labels are local to the function they appear in
    Label { name: String },
    Goto { label: String },
    IfGoto { label: String },
    Function { name: String, n_locals: u16 },
    Call { name: String, n_args: u16 },
    Return,
}

impl Command {
    pub fn push(segment: Segment, index: u16) -> Self {
        Self::Push { segment, index }
    }

    pub fn pop(segment: Segment, index: u16) -> Self {
        Self::Pop { segment, index }
    }

    pub fn label(name: impl Into<String>) -> Self {
        Self::Label { name: name.into() }
    }

    pub fn goto(label: impl Into<String>) -> Self {
        Self::Goto {
            label: label.into(),
        }
    }

    pub fn if_goto(label: impl Into<String>) -> Self {
        Self::IfGoto {
            label: label.into(),
        }
    }

    pub fn function(name: impl Into<String>, n_locals: u16) -> Self {
        Self::Function {
            name: name.into(),
            n_locals,
        }
    }

    pub fn call(name: impl Into<String>, n_args: u16) -> Self {
        Self::Call {
            name: name.into(),
            n_args,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Sub => write!(f, "sub"),
            Self::Neg => write!(f, "neg"),
            Self::Eq => write!(f, "eq"),
            Self::Gt => write!(f, "gt"),
            Self::Lt => write!(f, "lt"),
            Self::And => write!(f, "and"),
            Self::Or => write!(f, "or"),
            Self::Not => write!(f, "not"),
            Self::Push { segment, index } => write!(f, "push {} {}", segment, index),
            Self::Pop { segment, index } => write!(f, "pop {} {}", segment, index),
            Self::Label { name } => write!(f, "label {}", name),
            Self::Goto { label } => write!(f, "goto {}", label),
            Self::IfGoto { label } => write!(f, "if-goto {}", label),
            Self::Function { name, n_locals } => write!(f, "function {} {}", name, n_locals),
            Self::Call { name, n_args } => write!(f, "call {} {}", name, n_args),
            Self::Return => write!(f, "return"),
        }
    }
}

/// Renders commands the way they would appear in a .vm file
pub fn to_vm_text(commands: &[Command]) -> String {
    let mut text = String::new();
    for command in commands {
        text.push_str(&command.to_string());
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_names() {
        for segment in [
            Segment::Argument,
            Segment::Local,
            Segment::Static,
            Segment::Constant,
            Segment::This,
            Segment::That,
            Segment::Pointer,
            Segment::Temp,
        ] {
            assert_eq!(Ok(segment), segment.as_str().parse());
        }
        assert_eq!(
            Err(IllegalSegment("Local".to_owned())),
            "Local".parse::<Segment>()
        );
    }

    #[test]
    fn test_vm_text() {
        let commands = vec![
            Command::function("Main.main", 2),
            Command::push(Segment::Constant, 7),
            Command::if_goto("WHILE_END_0"),
            Command::call("Math.multiply", 2),
            Command::Return,
        ];
        assert_eq!(
            "function Main.main 2\npush constant 7\nif-goto WHILE_END_0\ncall Math.multiply 2\nreturn\n",
            to_vm_text(&commands)
        );
    }
}
