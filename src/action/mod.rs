//! The Action/command data model.
//!
//! An [`Action`] is an ordered list of named commands targeting one
//! identified object. Callers build actions with [`Action::append`] and
//! [`Action::insert`], submit them through the connection, and read any
//! per-command failures back with [`Action::execution_errors`].

use crate::errors::{DirectoryError, DirectoryResult};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, PoisonError};

/// Command names whose payload is a mapping of group-type to member list,
/// subject to the group-list splitting policy.
const GROUP_LIST_COMMANDS: &[&str] = &["add", "remove", "addRoles", "removeRoles"];

/// A single named operation with a payload: the smallest unit of
/// server-side work inside an [`Action`].
///
/// Serializes as a single-key JSON object, `{"name": payload}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    name: String,
    params: Value,
}

impl Command {
    /// Creates a command.
    pub fn new(name: impl Into<String>, params: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            params: params.into(),
        }
    }

    /// The command name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The command payload.
    pub fn params(&self) -> &Value {
        &self.params
    }

    /// The `{name: payload}` wire form.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert(self.name.clone(), self.params.clone());
        Value::Object(map)
    }
}

impl Serialize for Command {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.name, &self.params)?;
        map.end()
    }
}

/// A per-command error record as reported by the server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommandErrorRecord {
    /// Position of the owning action within the batch that was sent.
    pub index: usize,
    /// Position of the failing command within that action's command list.
    pub step: usize,
    /// Server error code.
    #[serde(rename = "errorCode")]
    pub error_code: String,
    /// Human-readable message, when the server supplies one.
    #[serde(default)]
    pub message: Option<String>,
}

/// A server error annotated with the command it maps to and the frame of
/// the action it targeted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionError {
    /// The offending command in its `{name: payload}` wire form.
    pub command: Value,
    /// The frame of the action the command belonged to.
    pub target: Map<String, Value>,
    /// Server error code.
    #[serde(rename = "errorCode")]
    pub error_code: String,
    /// Human-readable message, when the server supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

type ErrorSink = Arc<Mutex<Vec<ExecutionError>>>;

/// An ordered batch of commands targeting one identified object.
///
/// The frame (the key/value pairs identifying the target) is fixed at
/// construction; commands are added in execution order. Splitting an action
/// produces chunks that share the original's error sink, so
/// [`Action::execution_errors`] on the action the caller submitted reports
/// failures no matter which chunk they were sent in.
#[derive(Debug)]
pub struct Action {
    frame: Map<String, Value>,
    commands: Vec<Command>,
    has_insert: bool,
    errors: ErrorSink,
}

fn lock_errors(sink: &ErrorSink) -> std::sync::MutexGuard<'_, Vec<ExecutionError>> {
    sink.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Action {
    /// Creates an action with an empty frame.
    pub fn new() -> Self {
        Self {
            frame: Map::new(),
            commands: Vec::new(),
            has_insert: false,
            errors: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Adds a key/value pair identifying the target object.
    pub fn frame_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.frame.insert(key.into(), value.into());
        self
    }

    /// The frame identifying the target object.
    pub fn frame(&self) -> &Map<String, Value> {
        &self.frame
    }

    /// The commands in execution order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Number of commands.
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    /// Pushes `{name: params}` to the end of the command list.
    pub fn append(self, name: impl Into<String>, params: impl Into<Value>) -> Self {
        self.append_command(Command::new(name, params))
    }

    /// Pushes a prebuilt command to the end of the command list.
    pub fn append_command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    /// Places `{name: params}` at the head of the command list; previously
    /// appended commands shift right. At most one insert wins the head
    /// position: a second insert replaces the first rather than stacking.
    pub fn insert(self, name: impl Into<String>, params: impl Into<Value>) -> Self {
        self.insert_command(Command::new(name, params))
    }

    /// Like [`Action::insert`] with a prebuilt command.
    pub fn insert_command(mut self, command: Command) -> Self {
        if self.has_insert {
            self.commands[0] = command;
        } else {
            self.commands.insert(0, command);
            self.has_insert = true;
        }
        self
    }

    /// The wire form for transmission: the frame merged with
    /// `{"do": [commands...]}`. Pure; does not mutate the action.
    pub fn wire_dict(&self) -> Value {
        let mut map = self.frame.clone();
        map.insert(
            "do".to_string(),
            Value::Array(self.commands.iter().map(Command::to_value).collect()),
        );
        Value::Object(map)
    }

    /// A working copy that shares this action's error sink. Used by the
    /// executor so errors reported against the queued copy show up on the
    /// action the caller holds.
    pub(crate) fn share(&self) -> Action {
        Action {
            frame: self.frame.clone(),
            commands: self.commands.clone(),
            has_insert: self.has_insert,
            errors: Arc::clone(&self.errors),
        }
    }

    /// Partitions the commands into contiguous chunks of at most
    /// `max_commands`, each chunk a new action sharing this action's frame
    /// and error sink. Command order is preserved across chunks.
    pub fn split(&self, max_commands: usize) -> Vec<Action> {
        let size = max_commands.max(1);
        if self.commands.len() <= size {
            return vec![self.share()];
        }
        self.commands
            .chunks(size)
            .map(|chunk| Action {
                frame: self.frame.clone(),
                commands: chunk.to_vec(),
                has_insert: false,
                errors: Arc::clone(&self.errors),
            })
            .collect()
    }

    /// Maps a server error record back onto the command at its reported
    /// step and appends the annotated record to the error sink.
    pub fn report_command_error(&self, record: &CommandErrorRecord) -> DirectoryResult<()> {
        let command = self.commands.get(record.step).ok_or_else(|| {
            DirectoryError::client(format!(
                "error step {} out of range for action with {} commands",
                record.step,
                self.commands.len()
            ))
        })?;
        lock_errors(&self.errors).push(ExecutionError {
            command: command.to_value(),
            target: self.frame.clone(),
            error_code: record.error_code.clone(),
            message: record.message.clone(),
        });
        Ok(())
    }

    /// All annotated error records for this action, including errors
    /// reported against any chunk it was split into.
    pub fn execution_errors(&self) -> Vec<ExecutionError> {
        lock_errors(&self.errors).clone()
    }
}

impl Default for Action {
    fn default() -> Self {
        Self::new()
    }
}

/// Optional capability: actions carrying group-membership commands with
/// list payloads can slice oversized lists into multiple sequential
/// commands before ordinary command-count splitting applies.
pub trait GroupSplittable {
    /// Splits oversized group lists into commands of at most `max_members`
    /// entries each. Returns true if anything was split.
    fn maybe_split_groups(&mut self, max_members: usize) -> bool;
}

impl GroupSplittable for Action {
    fn maybe_split_groups(&mut self, max_members: usize) -> bool {
        let max = max_members.max(1);
        let mut split_any = false;
        let mut rebuilt = Vec::with_capacity(self.commands.len());
        for command in &self.commands {
            if !GROUP_LIST_COMMANDS.contains(&command.name()) {
                rebuilt.push(command.clone());
                continue;
            }
            // Payloads like {"remove": "all"} are not lists and pass through.
            let Some(lists) = command.params().as_object() else {
                rebuilt.push(command.clone());
                continue;
            };
            let mut slots: Vec<Map<String, Value>> = Vec::new();
            for (group_type, members) in lists {
                match members.as_array() {
                    Some(list) if !list.is_empty() => {
                        for (i, chunk) in list.chunks(max).enumerate() {
                            if slots.len() <= i {
                                slots.push(Map::new());
                            }
                            slots[i].insert(group_type.clone(), Value::Array(chunk.to_vec()));
                        }
                        if list.len() > max {
                            split_any = true;
                        }
                    }
                    _ => {
                        if slots.is_empty() {
                            slots.push(Map::new());
                        }
                        slots[0].insert(group_type.clone(), members.clone());
                    }
                }
            }
            if slots.is_empty() {
                slots.push(Map::new());
            }
            for slot in slots {
                rebuilt.push(Command::new(command.name(), Value::Object(slot)));
            }
        }
        self.commands = rebuilt;
        split_any
    }
}
