//! Platform shell detection and argument escaping

use std::env;

/// How to hand a command line to the host's default shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellInfo {
    /// Shell executable
    pub program: String,
    /// Arguments placed before the command text
    pub args: Vec<String>,
    /// Which quoting rules forwarded arguments follow
    pub flavor: ShellFlavor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellFlavor {
    Posix,
    Cmd,
}

impl ShellInfo {
    /// Detect the current platform's shell
    pub fn current() -> Self {
        Self::for_os(env::consts::OS, env::var("ComSpec").ok())
    }

    /// Shell for the given OS, using `comspec` on Windows when set
    pub fn for_os(os: &str, comspec: Option<String>) -> Self {
        match os {
            "windows" => Self {
                program: comspec
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| "cmd.exe".to_string()),
                args: vec!["/d".to_string(), "/s".to_string(), "/c".to_string()],
                flavor: ShellFlavor::Cmd,
            },
            _ => Self {
                program: "sh".to_string(),
                args: vec!["-c".to_string()],
                flavor: ShellFlavor::Posix,
            },
        }
    }

    /// Append forwarded arguments to `command`, escaping each for this shell
    pub fn append_args(&self, command: &str, extra_args: &[String]) -> String {
        if extra_args.is_empty() {
            return command.to_string();
        }

        let escaped: Vec<String> = extra_args.iter().map(|a| self.escape(a)).collect();
        format!("{} {}", command, escaped.join(" "))
    }

    /// Quote a single argument so the shell passes it through verbatim
    pub fn escape(&self, arg: &str) -> String {
        match self.flavor {
            ShellFlavor::Posix => escape_posix(arg),
            ShellFlavor::Cmd => escape_cmd(arg),
        }
    }
}

fn escape_posix(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }

    let safe = arg
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c));
    if safe {
        return arg.to_string();
    }

    format!("'{}'", arg.replace('\'', "'\\''"))
}

/// Characters cmd.exe acts on before the target program sees its command line
const CMD_META: [char; 10] = ['(', ')', '%', '!', '^', '"', '<', '>', '&', '|'];

fn escape_cmd(arg: &str) -> String {
    if arg.is_empty() {
        return "\"\"".to_string();
    }

    if !arg.contains([' ', '\t']) && !arg.contains(CMD_META) {
        return arg.to_string();
    }

    // Quote for the program's argv parser first, then caret-escape the result so
    // cmd.exe neither splits on operators nor expands %VAR%.
    let quoted = quote_argv(arg);
    let mut escaped = String::with_capacity(quoted.len() * 2);
    for c in quoted.chars() {
        if CMD_META.contains(&c) {
            escaped.push('^');
        }
        escaped.push(c);
    }
    escaped
}

/// Wrap `arg` in double quotes using the Windows argv rules for backslashes
fn quote_argv(arg: &str) -> String {
    let mut quoted = String::from("\"");
    let mut backslashes = 0;

    for c in arg.chars() {
        match c {
            '\\' => backslashes += 1,
            '"' => {
                quoted.push_str(&"\\".repeat(backslashes * 2 + 1));
                backslashes = 0;
            }
            _ => {
                quoted.push_str(&"\\".repeat(backslashes));
                backslashes = 0;
            }
        }
        if c != '\\' {
            quoted.push(c);
        }
    }

    quoted.push_str(&"\\".repeat(backslashes * 2));
    quoted.push('"');
    quoted
}
