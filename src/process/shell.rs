//! Descriptor of the shell used to interpret command text.

/// A shell is a program plus the argv prefix that makes it execute one
/// command string, e.g. `sh` with `-c`. The command text itself is passed
/// as a single argument; the library never re-splits it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shell {
    program: String,
    options: Vec<String>,
}

impl Shell {
    pub fn new(program: impl Into<String>, options: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            options: options.into_iter().map(Into::into).collect(),
        }
    }

    /// The platform's conventional command interpreter.
    pub fn local() -> Self {
        #[cfg(windows)]
        {
            Self::new("cmd", ["/C"])
        }
        #[cfg(not(windows))]
        {
            Self::new("sh", ["-c"])
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Full argv for launching `command` under this shell.
    pub fn argv(&self, command: &str) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.options.len() + 2);
        argv.push(self.program.clone());
        argv.extend(self.options.iter().cloned());
        argv.push(command.to_string());
        argv
    }
}

impl std::fmt::Display for Shell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for opt in &self.options {
            write!(f, " {opt}")?;
        }
        Ok(())
    }
}
