use crate::annotation::{AttributeMap, GeneAnnotation};
use crate::history::EditRecord;
use crate::store::CurationState;
use crate::transaction::{catalog, AccessPolicy, CurationService};
use serde_json::{json, Value};
use std::fs;

pub const DEFAULT_AUTHOR: &str = "anonymous";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Help,
    Summary,
    Show { entity_id: String },
    History { entity_id: String },
    Version { entity_id: String, steps_back: usize },
    Edit {
        entity_id: String,
        base_sequence_number: u64,
        payload: String,
        author: String,
    },
    Revert {
        entity_id: String,
        steps_back: usize,
        author: String,
    },
    ImportAnnotation { payload: String },
    SuggestKeys,
    LoadStore { path: String },
    SaveStore { path: String },
}

#[derive(Debug, Clone)]
pub struct ShellRunResult {
    pub state_changed: bool,
    pub output: Value,
}

impl ShellCommand {
    pub fn preview(&self) -> String {
        match self {
            Self::Help => "show shell command help".to_string(),
            Self::Summary => "show curated annotation summary".to_string(),
            Self::Show { entity_id } => format!("show current snapshot of '{entity_id}'"),
            Self::History { entity_id } => format!("show edit history of '{entity_id}'"),
            Self::Version {
                entity_id,
                steps_back,
            } => format!("show '{entity_id}' as of {steps_back} edit(s) ago"),
            Self::Edit {
                entity_id,
                base_sequence_number,
                author,
                ..
            } => format!(
                "submit edit of '{entity_id}' against version {base_sequence_number} as '{author}'"
            ),
            Self::Revert {
                entity_id,
                steps_back,
                author,
            } => format!("revert '{entity_id}' by {steps_back} edit(s) as '{author}'"),
            Self::ImportAnnotation { .. } => "import one annotation from JSON".to_string(),
            Self::SuggestKeys => "list suggested attribute keys".to_string(),
            Self::LoadStore { path } => format!("load store state from '{path}'"),
            Self::SaveStore { path } => format!("save store state to '{path}'"),
        }
    }

    pub fn is_state_mutating(&self) -> bool {
        matches!(
            self,
            Self::Edit { .. }
                | Self::Revert { .. }
                | Self::ImportAnnotation { .. }
                | Self::LoadStore { .. }
        )
    }
}

pub fn shell_help_text() -> &'static str {
    "Curator shell commands:\n\
help\n\
summary\n\
show ENTITY_ID\n\
history ENTITY_ID\n\
version ENTITY_ID STEPS_BACK\n\
edit ENTITY_ID BASE_SEQ <attributes-json-or-@file> [--author NAME]\n\
revert ENTITY_ID STEPS_BACK [--author NAME]\n\
import-annotation <annotation-json-or-@file>\n\
suggest-keys\n\
load-store PATH\n\
save-store PATH"
}

fn parse_json_payload(raw: &str) -> Result<String, String> {
    if let Some(path) = raw.strip_prefix('@') {
        fs::read_to_string(path).map_err(|e| format!("Could not read JSON file '{path}': {e}"))
    } else {
        Ok(raw.to_string())
    }
}

fn parse_author(tokens: &[String]) -> Result<(String, usize), String> {
    match tokens.first().map(String::as_str) {
        Some("--author") => match tokens.get(1) {
            Some(name) if !name.trim().is_empty() => Ok((name.clone(), 2)),
            _ => Err("Missing value after --author".to_string()),
        },
        Some(other) => Err(format!("Unknown argument '{other}'")),
        None => Ok((DEFAULT_AUTHOR.to_string(), 0)),
    }
}

fn parse_usize(raw: &str, what: &str) -> Result<usize, String> {
    raw.parse()
        .map_err(|_| format!("Invalid {what} '{raw}', expected a non-negative integer"))
}

fn token_error(command: &str) -> String {
    format!("Invalid '{command}' usage. Try: help")
}

pub fn parse_shell_tokens(tokens: &[String]) -> Result<ShellCommand, String> {
    if tokens.is_empty() {
        return Err("Missing shell command".to_string());
    }
    let cmd = tokens[0].as_str();
    match cmd {
        "help" | "-h" | "--help" => Ok(ShellCommand::Help),
        "summary" => {
            if tokens.len() == 1 {
                Ok(ShellCommand::Summary)
            } else {
                Err(token_error(cmd))
            }
        }
        "show" => {
            if tokens.len() == 2 {
                Ok(ShellCommand::Show {
                    entity_id: tokens[1].clone(),
                })
            } else {
                Err(token_error(cmd))
            }
        }
        "history" => {
            if tokens.len() == 2 {
                Ok(ShellCommand::History {
                    entity_id: tokens[1].clone(),
                })
            } else {
                Err(token_error(cmd))
            }
        }
        "version" => {
            if tokens.len() == 3 {
                Ok(ShellCommand::Version {
                    entity_id: tokens[1].clone(),
                    steps_back: parse_usize(&tokens[2], "steps_back")?,
                })
            } else {
                Err(token_error(cmd))
            }
        }
        "edit" => {
            if tokens.len() < 4 {
                return Err(token_error(cmd));
            }
            let (author, consumed) = parse_author(&tokens[4..])?;
            if 4 + consumed != tokens.len() {
                return Err(token_error(cmd));
            }
            Ok(ShellCommand::Edit {
                entity_id: tokens[1].clone(),
                base_sequence_number: tokens[2]
                    .parse()
                    .map_err(|_| format!("Invalid base sequence number '{}'", tokens[2]))?,
                payload: tokens[3].clone(),
                author,
            })
        }
        "revert" => {
            if tokens.len() < 3 {
                return Err(token_error(cmd));
            }
            let (author, consumed) = parse_author(&tokens[3..])?;
            if 3 + consumed != tokens.len() {
                return Err(token_error(cmd));
            }
            Ok(ShellCommand::Revert {
                entity_id: tokens[1].clone(),
                steps_back: parse_usize(&tokens[2], "steps_back")?,
                author,
            })
        }
        "import-annotation" => {
            if tokens.len() == 2 {
                Ok(ShellCommand::ImportAnnotation {
                    payload: tokens[1].clone(),
                })
            } else {
                Err(token_error(cmd))
            }
        }
        "suggest-keys" => {
            if tokens.len() == 1 {
                Ok(ShellCommand::SuggestKeys)
            } else {
                Err(token_error(cmd))
            }
        }
        "load-store" => {
            if tokens.len() == 2 {
                Ok(ShellCommand::LoadStore {
                    path: tokens[1].clone(),
                })
            } else {
                Err(token_error(cmd))
            }
        }
        "save-store" => {
            if tokens.len() == 2 {
                Ok(ShellCommand::SaveStore {
                    path: tokens[1].clone(),
                })
            } else {
                Err(token_error(cmd))
            }
        }
        other => Err(format!("Unknown shell command '{other}'. Try: help")),
    }
}

pub fn parse_shell_line(line: &str) -> Result<ShellCommand, String> {
    let tokens = split_shell_words(line)?;
    parse_shell_tokens(&tokens)
}

pub fn split_shell_words(line: &str) -> Result<Vec<String>, String> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mode {
        Normal,
        SingleQuoted,
        DoubleQuoted,
    }

    let mut out = Vec::new();
    let mut current = String::new();
    let mut mode = Mode::Normal;
    let mut chars = line.chars();

    while let Some(ch) = chars.next() {
        match mode {
            Mode::Normal => match ch {
                '\'' => mode = Mode::SingleQuoted,
                '"' => mode = Mode::DoubleQuoted,
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                }
                c if c.is_whitespace() => {
                    if !current.is_empty() {
                        out.push(current.clone());
                        current.clear();
                    }
                }
                _ => current.push(ch),
            },
            Mode::SingleQuoted => {
                if ch == '\'' {
                    mode = Mode::Normal;
                } else {
                    current.push(ch);
                }
            }
            Mode::DoubleQuoted => {
                if ch == '"' {
                    mode = Mode::Normal;
                } else if ch == '\\' {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                } else {
                    current.push(ch);
                }
            }
        }
    }

    if mode != Mode::Normal {
        return Err("Unterminated quoted string in shell command".to_string());
    }
    if !current.is_empty() {
        out.push(current);
    }
    if out.is_empty() {
        return Err("Empty shell command".to_string());
    }
    Ok(out)
}

fn history_json(records: &[EditRecord]) -> Value {
    let entries: Vec<Value> = records
        .iter()
        .rev()
        .map(|r| {
            json!({
                "sequence_number": r.sequence_number,
                "author": r.author,
                "timestamp_unix_ms": r.timestamp_unix_ms,
                "forward": r.forward,
                "inverse": r.inverse,
            })
        })
        .collect();
    json!({ "total_versions": records.len(), "records_newest_first": entries })
}

pub fn execute_shell_command<P: AccessPolicy>(
    service: &mut CurationService<P>,
    command: &ShellCommand,
) -> Result<ShellRunResult, String> {
    let result = match command {
        ShellCommand::Help => ShellRunResult {
            state_changed: false,
            output: json!({ "help": shell_help_text() }),
        },
        ShellCommand::Summary => {
            let entities: Vec<Value> = service
                .entity_ids()
                .iter()
                .map(|id| {
                    let snapshot = service.current_snapshot(id).map_err(|e| e.to_string())?;
                    let versions = service.history_len(id).map_err(|e| e.to_string())?;
                    Ok(json!({
                        "id": id,
                        "coordinates": snapshot.coordinates(),
                        "attribute_count": snapshot.attributes.len(),
                        "total_versions": versions,
                    }))
                })
                .collect::<Result<_, String>>()?;
            ShellRunResult {
                state_changed: false,
                output: json!({
                    "entity_count": entities.len(),
                    "entities": entities,
                }),
            }
        }
        ShellCommand::Show { entity_id } => {
            let snapshot = service
                .current_snapshot(entity_id)
                .map_err(|e| e.to_string())?;
            ShellRunResult {
                state_changed: false,
                output: json!({ "annotation": snapshot }),
            }
        }
        ShellCommand::History { entity_id } => {
            let records = service.history(entity_id).map_err(|e| e.to_string())?;
            ShellRunResult {
                state_changed: false,
                output: history_json(records),
            }
        }
        ShellCommand::Version {
            entity_id,
            steps_back,
        } => {
            let snapshot = service
                .snapshot_at(entity_id, *steps_back)
                .map_err(|e| e.to_string())?;
            let total = service.history_len(entity_id).map_err(|e| e.to_string())?;
            ShellRunResult {
                state_changed: false,
                output: json!({
                    "version_number": total - steps_back,
                    "total_versions": total,
                    "annotation": snapshot,
                }),
            }
        }
        ShellCommand::Edit {
            entity_id,
            base_sequence_number,
            payload,
            author,
        } => {
            let json_text = parse_json_payload(payload)?;
            let new_attributes: AttributeMap = serde_json::from_str(&json_text)
                .map_err(|e| format!("Invalid attributes JSON: {e}"))?;
            let record = service
                .submit_edit(entity_id, *base_sequence_number, new_attributes, author)
                .map_err(|e| e.to_string())?;
            ShellRunResult {
                state_changed: true,
                output: json!({ "record": record }),
            }
        }
        ShellCommand::Revert {
            entity_id,
            steps_back,
            author,
        } => {
            let record = service
                .revert_to_version(entity_id, *steps_back, author)
                .map_err(|e| e.to_string())?;
            ShellRunResult {
                state_changed: true,
                output: json!({ "record": record }),
            }
        }
        ShellCommand::ImportAnnotation { payload } => {
            let json_text = parse_json_payload(payload)?;
            let annotation: GeneAnnotation = serde_json::from_str(&json_text)
                .map_err(|e| format!("Invalid annotation JSON: {e}"))?;
            let entity_id = annotation.id.clone();
            service
                .import_annotation(annotation)
                .map_err(|e| e.to_string())?;
            ShellRunResult {
                state_changed: true,
                output: json!({ "message": format!("Imported annotation '{entity_id}'") }),
            }
        }
        ShellCommand::SuggestKeys => ShellRunResult {
            state_changed: false,
            output: json!({ "suggested_keys": catalog().suggestions() }),
        },
        ShellCommand::LoadStore { path } => {
            let state = CurationState::load_from_path(path).map_err(|e| e.to_string())?;
            service.replace_state(state);
            ShellRunResult {
                state_changed: true,
                output: json!({
                    "message": format!("Loaded store from '{path}'"),
                    "entity_count": service.entity_ids().len(),
                }),
            }
        }
        ShellCommand::SaveStore { path } => {
            service
                .state()
                .save_to_path(path)
                .map_err(|e| e.to_string())?;
            ShellRunResult {
                state_changed: false,
                output: json!({ "message": format!("Saved store to '{path}'") }),
            }
        }
    };
    Ok(result)
}
