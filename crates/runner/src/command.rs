//! Command resolution
//!
//! Turns the configured command string (which may embed arguments, e.g. `"go test"`)
//! and the extra flags string into an executable plus an ordered argument list.

use std::fmt;

/// Executable name plus ordered argument list, ready to spawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    /// Program to execute
    pub executable: String,
    /// Arguments in the order they are passed to the program
    pub arguments: Vec<String>,
}

impl ResolvedCommand {
    /// Resolve a command string and a flags string
    ///
    /// Both inputs are split on single spaces. The first token of `command` is the
    /// executable; its remaining tokens come first in `arguments`, followed by the
    /// tokens of `flags`. Empty tokens (blank flags, doubled spaces) are dropped, so
    /// an empty flags string contributes no arguments.
    ///
    /// Never fails: a blank command yields an empty executable, which callers
    /// should reject with [`ResolvedCommand::is_empty`].
    pub fn resolve(command: &str, flags: &str) -> Self {
        let mut tokens = split_tokens(command);
        let executable = tokens.next().unwrap_or_default();

        let arguments = tokens.chain(split_tokens(flags)).collect();

        Self {
            executable,
            arguments,
        }
    }

    /// True when there is no executable to run
    pub fn is_empty(&self) -> bool {
        self.executable.is_empty()
    }
}

impl fmt::Display for ResolvedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.executable)?;
        for arg in &self.arguments {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

fn split_tokens(input: &str) -> impl Iterator<Item = String> + '_ {
    input
        .split(' ')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}
