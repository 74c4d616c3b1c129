// src/job_infos/schema.rs
//! Validation of untrusted job info submissions

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

use super::{ExperienceLevel, JobInfoData};

const REQUIRED: &str = "Required";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every rule violated by a submission; only meant for form rendering
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn fields(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.field.as_str()).collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn required_string(obj: &Map<String, Value>, field: &str, errors: &mut ValidationErrors) -> Option<String> {
    match obj.get(field) {
        None => {
            errors.push(field, REQUIRED);
            None
        }
        Some(Value::String(s)) if s.is_empty() => {
            errors.push(field, REQUIRED);
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            errors.push(field, format!("Expected string, received {}", type_name(other)));
            None
        }
    }
}

/// `title` must be present; it is either null or a non-empty string.
fn nullable_string(
    obj: &Map<String, Value>,
    field: &str,
    errors: &mut ValidationErrors,
) -> Option<Option<String>> {
    match obj.get(field) {
        None => {
            errors.push(field, REQUIRED);
            None
        }
        Some(Value::Null) => Some(None),
        Some(Value::String(s)) if s.is_empty() => {
            errors.push(field, "String must contain at least 1 character(s)");
            None
        }
        Some(Value::String(s)) => Some(Some(s.clone())),
        Some(other) => {
            errors.push(field, format!("Expected string, received {}", type_name(other)));
            None
        }
    }
}

fn experience_level(obj: &Map<String, Value>, errors: &mut ValidationErrors) -> Option<ExperienceLevel> {
    const FIELD: &str = "experience_level";

    let value = obj.get(FIELD).or_else(|| obj.get("experienceLevel"));
    let expected = ExperienceLevel::ALL
        .iter()
        .map(|level| format!("'{}'", level.as_str()))
        .collect::<Vec<_>>()
        .join(" | ");

    match value {
        None => {
            errors.push(FIELD, REQUIRED);
            None
        }
        Some(Value::String(s)) => match ExperienceLevel::parse(s) {
            Some(level) => Some(level),
            None => {
                errors.push(
                    FIELD,
                    format!("Invalid enum value. Expected {}, received '{}'", expected, s),
                );
                None
            }
        },
        Some(other) => {
            errors.push(
                FIELD,
                format!("Expected {}, received {}", expected, type_name(other)),
            );
            None
        }
    }
}

/// Validate a raw submission. Unknown keys are ignored; all violations
/// are reported together.
pub fn validate_job_info(input: &Value) -> Result<JobInfoData, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let Some(obj) = input.as_object() else {
        errors.push("_root", format!("Expected object, received {}", type_name(input)));
        return Err(errors);
    };

    let name = required_string(obj, "name", &mut errors);
    let title = nullable_string(obj, "title", &mut errors);
    let experience_level = experience_level(obj, &mut errors);
    let description = required_string(obj, "description", &mut errors);

    match (name, title, experience_level, description) {
        (Some(name), Some(title), Some(experience_level), Some(description)) => Ok(JobInfoData {
            name,
            title,
            experience_level,
            description,
        }),
        _ => Err(errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "name": "Backend",
            "title": null,
            "experience_level": "junior",
            "description": "Build APIs",
        })
    }

    #[test]
    fn test_valid_submission() {
        let data = validate_job_info(&valid()).unwrap();
        assert_eq!(data.name, "Backend");
        assert_eq!(data.title, None);
        assert_eq!(data.experience_level, ExperienceLevel::Junior);
        assert_eq!(data.description, "Build APIs");
    }

    #[test]
    fn test_camel_case_experience_level_and_extra_keys() {
        let input = json!({
            "name": "Platform",
            "title": "Staff Engineer",
            "experienceLevel": "senior",
            "description": "Own the platform",
            "id": "ignored",
        });
        let data = validate_job_info(&input).unwrap();
        assert_eq!(data.title.as_deref(), Some("Staff Engineer"));
        assert_eq!(data.experience_level, ExperienceLevel::Senior);
    }

    #[test]
    fn test_missing_required_fields() {
        let errors = validate_job_info(&json!({ "title": null, "experience_level": "junior" }))
            .unwrap_err();
        assert_eq!(errors.fields(), vec!["name", "description"]);
        assert!(errors.errors.iter().all(|e| e.message == "Required"));
    }

    #[test]
    fn test_empty_strings_rejected() {
        let mut input = valid();
        input["name"] = json!("");
        input["title"] = json!("");
        input["description"] = json!("");
        let errors = validate_job_info(&input).unwrap_err();
        assert_eq!(errors.fields(), vec!["name", "title", "description"]);
    }

    #[test]
    fn test_missing_title_is_not_null() {
        let mut input = valid();
        input.as_object_mut().unwrap().remove("title");
        let errors = validate_job_info(&input).unwrap_err();
        assert_eq!(errors.fields(), vec!["title"]);
    }

    #[test]
    fn test_unknown_experience_level() {
        let mut input = valid();
        input["experience_level"] = json!("expert");
        let errors = validate_job_info(&input).unwrap_err();
        assert_eq!(errors.fields(), vec!["experience_level"]);
        assert!(errors.errors[0].message.contains("received 'expert'"));

        input["experience_level"] = json!("Junior");
        assert!(validate_job_info(&input).is_err());
    }

    #[test]
    fn test_wrong_types() {
        let input = json!({
            "name": 42,
            "title": false,
            "experience_level": 1,
            "description": ["x"],
        });
        let errors = validate_job_info(&input).unwrap_err();
        assert_eq!(errors.errors.len(), 4);
        assert_eq!(errors.errors[0].message, "Expected string, received number");
    }

    #[test]
    fn test_non_object_input() {
        let errors = validate_job_info(&json!("nope")).unwrap_err();
        assert_eq!(errors.fields(), vec!["_root"]);
    }
}
