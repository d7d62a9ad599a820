//! Commands sent to the store and the replies it sends back.
//!
//! Only the shape needed for script caching is modelled: a command is
//! its argument vector, and a reply mirrors the store's reply kinds
//! (integer, status, bulk string, error, array, nil).

use std::fmt;

/// A single store command, e.g. `SCRIPT EXISTS <sha>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    args: Vec<String>,
}

impl Command {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `SCRIPT EXISTS <sha>...`
    pub fn script_exists<S: AsRef<str>>(hashes: &[S]) -> Self {
        let mut args = vec!["SCRIPT".to_string(), "EXISTS".to_string()];
        args.extend(hashes.iter().map(|h| h.as_ref().to_string()));
        Self { args }
    }

    /// `SCRIPT LOAD <source>`
    pub fn script_load(source: &str) -> Self {
        Self::new(["SCRIPT", "LOAD", source])
    }

    /// `SCRIPT FLUSH`
    pub fn script_flush() -> Self {
        Self::new(["SCRIPT", "FLUSH"])
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Command name plus subcommand, upper-cased (e.g. `"SCRIPT LOAD"`).
    pub fn name(&self) -> String {
        self.args
            .iter()
            .take(2)
            .map(|a| a.to_ascii_uppercase())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Command {
    /// Prints the command name only; script bodies stay out of logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// A reply from the store, one per command in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Nil,
    Integer(i64),
    /// Simple status line such as `OK`.
    Status(String),
    Bulk(String),
    /// Error reply embedded in the batch (the batch itself succeeded).
    Error(String),
    Array(Vec<Reply>),
}

impl Reply {
    /// Text payload of a status or bulk reply.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Reply::Status(s) | Reply::Bulk(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}
