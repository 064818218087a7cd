use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;

use super::models::Commit;
use crate::infrastructure::PanelError;
use crate::rpc::unwrap_envelope;

static FIELD_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\||\t").unwrap());

// 信封最多嵌套几层
const MAX_ENVELOPE_DEPTH: usize = 4;

/// Turns a raw history page into commits, newest first.
pub trait CommitDecoder: Send + Sync {
    fn decode(&self, raw: Value) -> Result<Vec<Commit>, PanelError>;
}

/// Handles every shape the history endpoint has been seen to return:
/// an array of commits, a single commit, `{commits: [...]}`, any of those
/// inside a correlation envelope, or delimited text lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCommitDecoder;

impl JsonCommitDecoder {
    fn decode_value(&self, raw: Value, depth: usize) -> Result<Vec<Commit>, PanelError> {
        match raw {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => Ok(items.into_iter().filter_map(Self::commit_from_item).collect()),
            Value::String(text) => Ok(parse_delimited(&text)),
            Value::Object(map) => {
                if let Some(error) = map.get("error").filter(|e| !e.is_null()) {
                    let message = error
                        .as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| error.to_string());
                    return Err(PanelError::backend("get commit history", message));
                }
                if map.contains_key("hash") {
                    return Ok(Self::commit_from_item(Value::Object(map))
                        .into_iter()
                        .collect());
                }
                if let Some(commits) = map.get("commits") {
                    return self.decode_value(commits.clone(), depth);
                }
                if map.len() == 1 && depth < MAX_ENVELOPE_DEPTH {
                    let inner = unwrap_envelope(Value::Object(map));
                    return self.decode_value(inner, depth + 1);
                }
                Err(PanelError::decode(
                    "get commit history",
                    "object has neither commits nor a hash",
                ))
            }
            other => Err(PanelError::decode(
                "get commit history",
                format!("unexpected value: {}", other),
            )),
        }
    }

    fn commit_from_item(item: Value) -> Option<Commit> {
        match item {
            Value::String(line) => parse_line(&line),
            other => match serde_json::from_value::<Commit>(other) {
                Ok(commit) if !commit.hash.is_empty() => Some(commit),
                Ok(_) => {
                    tracing::warn!("Skipping commit entry without hash");
                    None
                }
                Err(e) => {
                    tracing::warn!("Skipping malformed commit entry: {}", e);
                    None
                }
            },
        }
    }
}

impl CommitDecoder for JsonCommitDecoder {
    fn decode(&self, raw: Value) -> Result<Vec<Commit>, PanelError> {
        self.decode_value(raw, 0)
    }
}

/// `hash|author|date|message[|branch]`, tabs also accepted.
///
/// With more than five fields the surplus belongs to the message and the last
/// field is the branch.
fn parse_line(line: &str) -> Option<Commit> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let fields: Vec<&str> = FIELD_SEPARATOR.split(line).map(str::trim).collect();
    if fields.len() < 4 || fields[0].is_empty() {
        tracing::warn!("Skipping unparsable history line: {}", line);
        return None;
    }

    let mut commit = Commit::new(fields[0], fields[1], fields[2], fields[3]);
    if fields.len() > 4 {
        let last = fields.len() - 1;
        commit.message = fields[3..last].join("|");
        if !fields[last].is_empty() {
            commit.branch = Some(fields[last].to_string());
        }
    }
    Some(commit)
}

fn parse_delimited(text: &str) -> Vec<Commit> {
    let mut dated: Vec<_> = text
        .lines()
        .filter_map(parse_line)
        .map(|commit| (commit.parsed_date(), commit))
        .collect();
    // 文本格式不保证顺序，按日期降序重排，无法解析的排在最后
    dated.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(x), Some(y)) => y.cmp(x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    dated.into_iter().map(|(_, commit)| commit).collect()
}
