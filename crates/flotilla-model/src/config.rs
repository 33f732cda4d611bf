//! Task file loading.
//!
//! The file extension selects the parser (`.json`, `.yaml`, `.yml`); after
//! parsing, every task is validated and its retry delay parsed exactly once,
//! so the engine never deals with raw duration strings.

use std::{collections::HashSet, fs, path::Path, time::Duration};

use crate::{
    error::{ModelError, ModelResult},
    task::Task,
};

/// Load and validate a task batch from a JSON or YAML file.
pub fn load_tasks(path: impl AsRef<Path>) -> ModelResult<Vec<Task>> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let raw = fs::read_to_string(path)?;
    let mut tasks: Vec<Task> = match ext.as_str() {
        "json" => serde_json::from_str(&raw)?,
        "yaml" | "yml" => serde_yaml::from_str(&raw)?,
        other => return Err(ModelError::UnsupportedExtension(other.to_string())),
    };

    finalize(&mut tasks)?;
    Ok(tasks)
}

/// Parse a human-readable delay such as `"2s"` or `"500ms"`.
///
/// An empty string is an error rather than a zero delay: a missing delay in
/// the task file is almost always a mistake.
pub fn parse_retry_delay(value: &str) -> ModelResult<Duration> {
    if value.is_empty() {
        return Err(ModelError::EmptyRetryDelay);
    }
    humantime::parse_duration(value).map_err(|e| ModelError::InvalidDuration {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn finalize(tasks: &mut [Task]) -> ModelResult<()> {
    let mut seen = HashSet::new();
    for task in tasks.iter_mut() {
        if !seen.insert(task.name.clone()) {
            return Err(ModelError::DuplicateTaskName(task.name.clone()));
        }
        if task.max_retries == 0 {
            return Err(ModelError::InvalidMaxRetries(task.name.clone()));
        }
        task.retry_delay_duration =
            parse_retry_delay(&task.retry_delay).map_err(|e| ModelError::InvalidRetryDelay {
                task: task.name.clone(),
                value: task.retry_delay.clone(),
                reason: e.to_string(),
            })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("failed to create temp task file");
        file.write_all(content.as_bytes())
            .expect("failed to write temp task file");
        file
    }

    const JSON_TASKS: &str = r#"[
        {
            "name": "scan-the-horizon",
            "shipsNamespace": "default",
            "type": "CrewGetPods",
            "maxRetries": 3,
            "retryDelay": "2s",
            "parameters": {"labelSelector": "app=web", "fieldSelector": "", "limit": 10}
        }
    ]"#;

    #[test]
    fn loads_json_tasks_and_parses_delay() {
        let file = write_file(".json", JSON_TASKS);
        let tasks = load_tasks(file.path()).expect("json batch should load");

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].name, "scan-the-horizon");
        assert_eq!(tasks[0].kind, "CrewGetPods");
        assert_eq!(tasks[0].retry_delay_duration, Duration::from_secs(2));
        assert_eq!(tasks[0].parameters.get_i64("limit").unwrap(), 10);
    }

    #[test]
    fn loads_yaml_tasks() {
        let yaml = r#"
- name: label-the-fleet
  shipsNamespace: crew
  type: CrewWriteLabelPods
  maxRetries: 2
  retryDelay: 500ms
  parameters:
    labelKey: fleet
    labelValue: alpha
"#;
        let file = write_file(".yaml", yaml);
        let tasks = load_tasks(file.path()).expect("yaml batch should load");

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].ships_namespace, "crew");
        assert_eq!(tasks[0].retry_delay_duration, Duration::from_millis(500));
    }

    #[test]
    fn rejects_unsupported_extension() {
        let file = write_file(".toml", "[]");
        let err = load_tasks(file.path()).unwrap_err();
        assert!(matches!(err, ModelError::UnsupportedExtension(_)));
    }

    #[test]
    fn rejects_empty_retry_delay() {
        let json = JSON_TASKS.replace("\"2s\"", "\"\"");
        let file = write_file(".json", &json);
        let err = load_tasks(file.path()).unwrap_err();
        assert!(matches!(err, ModelError::InvalidRetryDelay { .. }));
    }

    #[test]
    fn rejects_garbage_retry_delay() {
        let json = JSON_TASKS.replace("\"2s\"", "\"soon\"");
        let file = write_file(".json", &json);
        let err = load_tasks(file.path()).unwrap_err();
        assert!(matches!(err, ModelError::InvalidRetryDelay { .. }));
    }

    #[test]
    fn rejects_zero_max_retries() {
        let json = JSON_TASKS.replace("\"maxRetries\": 3", "\"maxRetries\": 0");
        let file = write_file(".json", &json);
        let err = load_tasks(file.path()).unwrap_err();
        assert!(matches!(err, ModelError::InvalidMaxRetries(_)));
    }

    #[test]
    fn rejects_duplicate_names() {
        let json = format!(
            "[{},{}]",
            JSON_TASKS.trim_start_matches('[').trim_end_matches(']'),
            JSON_TASKS.trim_start_matches('[').trim_end_matches(']')
        );
        let file = write_file(".json", &json);
        let err = load_tasks(file.path()).unwrap_err();
        assert!(matches!(err, ModelError::DuplicateTaskName(_)));
    }

    #[test]
    fn parse_retry_delay_accepts_common_forms() {
        assert_eq!(parse_retry_delay("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(
            parse_retry_delay("500ms").unwrap(),
            Duration::from_millis(500)
        );
        assert_eq!(parse_retry_delay("1m").unwrap(), Duration::from_secs(60));
    }

    #[test]
    fn parse_retry_delay_rejects_empty() {
        assert!(matches!(
            parse_retry_delay(""),
            Err(ModelError::EmptyRetryDelay)
        ));
    }
}
