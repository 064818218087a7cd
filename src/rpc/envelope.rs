use serde_json::Value;
use uuid::Uuid;

/// 已知的响应负载字段，单键对象若使用这些键则不是信封
const PAYLOAD_KEYS: &[&str] = &[
    "error",
    "success",
    "message",
    "result",
    "status",
    // 提交与 rebase 步骤
    "commit",
    "commits",
    "hash",
    "author",
    "email",
    "date",
    "action",
    "conflicts",
    "currentStep",
    "file",
    "files",
    // rebase 状态
    "in_rebase",
    "rebase_type",
    "has_todo_content",
    "todo_content",
    "editor_status",
    "waiting_for_editor",
    "primary_file",
    // 工作区状态
    "branch",
    "is_dirty",
    "modified_files",
    "staged_files",
    "untracked_files",
    "raw_status",
    // 冲突内容
    "ours",
    "theirs",
    "merged",
];

/// Strips the single-key correlation envelope some backends put around every
/// response. Anything that is not an envelope is returned untouched.
pub fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(map) if map.len() == 1 => {
            let key = map.keys().next().cloned().unwrap_or_default();
            if is_envelope_key(&key) {
                map.into_iter()
                    .next()
                    .map(|(_, inner)| inner)
                    .unwrap_or(Value::Null)
            } else {
                Value::Object(map)
            }
        }
        other => other,
    }
}

fn is_envelope_key(key: &str) -> bool {
    if Uuid::parse_str(key).is_ok() {
        return true;
    }
    !key.is_empty() && !PAYLOAD_KEYS.contains(&key)
}
