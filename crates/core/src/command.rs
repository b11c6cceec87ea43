//! Lifecycle command specifications
//!
//! A lifecycle command in a manifest may be written three ways:
//!
//! - a single string, run through a shell as-is
//! - an array of tokens, quoted and joined into one shell command
//! - an object of named commands, each of which is itself one of these shapes
//!
//! [`CommandSpec`] captures the shape and [`CommandSpec::normalize`] turns it
//! into a single shell string suitable for a `RUN` instruction.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::warn;

/// Separator between named commands: fail fast, continue on the next line.
const NAMED_COMMAND_JOIN: &str = " && \\\n";

/// One lifecycle command as declared in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CommandSpec {
    /// Field missing, null, or of an unsupported shape
    #[default]
    Absent,
    /// Shell command string
    Shell(String),
    /// Command tokens, e.g. `["pip", "install", "-e", "."]`
    Tokens(Vec<String>),
    /// Named commands in declaration order
    Named(IndexMap<String, CommandSpec>),
}

impl CommandSpec {
    /// Interpret a manifest value as a command.
    ///
    /// Values that are neither string, array, nor object degrade to
    /// [`CommandSpec::Absent`] with a warning. Scalar array elements
    /// (numbers, booleans) are stringified; nested arrays or objects inside a
    /// token list make the whole list unsupported.
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => CommandSpec::Absent,
            Some(Value::String(s)) => CommandSpec::Shell(s.clone()),
            Some(Value::Array(items)) => {
                let mut tokens = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) => tokens.push(s.clone()),
                        Value::Number(n) => tokens.push(n.to_string()),
                        Value::Bool(b) => tokens.push(b.to_string()),
                        other => {
                            warn!("Unsupported command token {}, ignoring command", other);
                            return CommandSpec::Absent;
                        }
                    }
                }
                CommandSpec::Tokens(tokens)
            }
            Some(Value::Object(map)) => CommandSpec::Named(
                map.iter()
                    .map(|(name, v)| (name.clone(), CommandSpec::from_value(Some(v))))
                    .collect(),
            ),
            Some(other) => {
                warn!("Unsupported command shape {}, ignoring command", other);
                CommandSpec::Absent
            }
        }
    }

    /// Whether the manifest declared nothing usable.
    pub fn is_absent(&self) -> bool {
        matches!(self, CommandSpec::Absent)
    }

    /// Whether every command text and token fits on one line.
    ///
    /// A line break inside a token or string, or a string ending in a
    /// backslash, would leak out of a shell-form `RUN` line. Such commands
    /// must be written in exec form instead.
    pub fn is_single_line(&self) -> bool {
        match self {
            CommandSpec::Absent => true,
            CommandSpec::Shell(cmd) => {
                !has_line_break(cmd) && !cmd.trim_end().ends_with('\\')
            }
            CommandSpec::Tokens(tokens) => tokens.iter().all(|t| !has_line_break(t)),
            CommandSpec::Named(commands) => commands.values().all(CommandSpec::is_single_line),
        }
    }

    /// Render this command as one shell string, or `None` if there is nothing
    /// to run.
    ///
    /// Empty strings and empty token lists count as nothing to run. Named
    /// commands are emitted in declaration order, each preceded by a
    /// `# <name>` line, joined with `&& \` continuations; entries that
    /// normalize to nothing are skipped.
    ///
    /// ```rust
    /// use hubpack_core::command::CommandSpec;
    /// use serde_json::json;
    ///
    /// let spec = CommandSpec::from_value(Some(&json!({"x": "echo 1", "y": "echo 2"})));
    /// assert_eq!(
    ///     spec.normalize().as_deref(),
    ///     Some("# x\necho 1 && \\\n# y\necho 2")
    /// );
    /// ```
    pub fn normalize(&self) -> Option<String> {
        match self {
            CommandSpec::Absent => None,
            CommandSpec::Shell(cmd) => (!cmd.trim().is_empty()).then(|| cmd.clone()),
            CommandSpec::Tokens(tokens) => {
                (!tokens.is_empty()).then(|| shell_words::join(tokens))
            }
            CommandSpec::Named(commands) => {
                let blocks: Vec<String> = commands
                    .iter()
                    .filter_map(|(name, spec)| {
                        spec.normalize()
                            .map(|cmd| format!("# {}\n{}", single_line(name), cmd))
                    })
                    .collect();
                (!blocks.is_empty()).then(|| blocks.join(NAMED_COMMAND_JOIN))
            }
        }
    }
}

/// Keep a command name on its comment line.
fn single_line(name: &str) -> String {
    name.replace(['\r', '\n'], " ")
}

fn has_line_break(text: &str) -> bool {
    text.contains(['\r', '\n'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize(value: Value) -> Option<String> {
        CommandSpec::from_value(Some(&value)).normalize()
    }

    #[test]
    fn test_string_passes_through() {
        assert_eq!(normalize(json!("echo 'hello'")).as_deref(), Some("echo 'hello'"));
    }

    #[test]
    fn test_tokens_joined_with_spaces() {
        assert_eq!(
            normalize(json!(["echo", "a", "b"])).as_deref(),
            Some("echo a b")
        );
    }

    #[test]
    fn test_tokens_are_quoted() {
        assert_eq!(
            normalize(json!(["echo", "hello world", "a;rm -rf /", ""])).as_deref(),
            Some("echo 'hello world' 'a;rm -rf /' ''")
        );
    }

    #[test]
    fn test_scalar_tokens_stringified() {
        assert_eq!(
            normalize(json!(["sleep", 5, true])).as_deref(),
            Some("sleep 5 true")
        );
    }

    #[test]
    fn test_named_commands_in_declaration_order() {
        assert_eq!(
            normalize(json!({"y": "echo 2", "x": "echo 1"})).as_deref(),
            Some("# y\necho 2 && \\\n# x\necho 1")
        );
    }

    #[test]
    fn test_named_commands_recurse_and_skip_empty() {
        let value = json!({
            "install": ["pip", "install", "-r", "requirements.txt"],
            "nothing": "",
            "nested": {"inner": "make"},
            "bad": 42
        });
        assert_eq!(
            normalize(value).as_deref(),
            Some("# install\npip install -r requirements.txt && \\\n# nested\n# inner\nmake")
        );
    }

    #[test]
    fn test_empty_shapes_are_absent() {
        assert_eq!(normalize(json!("")), None);
        assert_eq!(normalize(json!("   ")), None);
        assert_eq!(normalize(json!([])), None);
        assert_eq!(normalize(json!({})), None);
        assert_eq!(normalize(json!({"a": "", "b": null})), None);
    }

    #[test]
    fn test_unsupported_shapes_are_absent() {
        assert!(CommandSpec::from_value(Some(&json!(42))).is_absent());
        assert!(CommandSpec::from_value(Some(&json!(true))).is_absent());
        assert!(CommandSpec::from_value(Some(&json!(["ok", {"no": 1}]))).is_absent());
        assert!(CommandSpec::from_value(None).is_absent());
        assert!(CommandSpec::from_value(Some(&Value::Null)).is_absent());
    }

    #[test]
    fn test_single_line_detection() {
        let spec = |value: Value| CommandSpec::from_value(Some(&value));

        assert!(spec(json!("pip install -e .")).is_single_line());
        assert!(spec(json!(["echo", "a b", "c\\"])).is_single_line());
        assert!(spec(json!({"a": "make", "b": ["make", "test"]})).is_single_line());
        assert!(CommandSpec::Absent.is_single_line());

        assert!(!spec(json!(["echo", "a\nUSER root"])).is_single_line());
        assert!(!spec(json!("apt-get update\napt-get install -y jq")).is_single_line());
        assert!(!spec(json!("echo a\r")).is_single_line());
        assert!(!spec(json!("echo a \\  ")).is_single_line());
        assert!(!spec(json!({"ok": "make", "bad": ["echo", "x\ny"]})).is_single_line());
    }

    #[test]
    fn test_normalization_is_deterministic() {
        let value = json!({"a": ["echo", "x y"], "b": "true"});
        assert_eq!(normalize(value.clone()), normalize(value));
    }
}
