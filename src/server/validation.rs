//! Shape checks applied to POST bodies before they reach the store.
//!
//! The store merges whatever it is handed, so every rule about what a
//! collection may contain lives here.

use serde_json::Value;

use crate::models::{ExamType, JsonMap};

const MIN_AVERAGE: f64 = 0.0;
const MAX_AVERAGE: f64 = 100.0;

fn check_average(value: &Value, what: &str) -> Result<Option<f64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => match n.as_f64() {
            Some(v) if (MIN_AVERAGE..=MAX_AVERAGE).contains(&v) => Ok(Some(v)),
            _ => Err(format!(
                "{} must be between {} and {}",
                what, MIN_AVERAGE, MAX_AVERAGE
            )),
        },
        _ => Err(format!("{} must be a number", what)),
    }
}

/// Every value must be a string.
pub fn validate_users(data: &JsonMap) -> Result<(), String> {
    match data.iter().find(|(_, v)| !v.is_string()) {
        Some((username, _)) => Err(format!("Password for {} must be a string", username)),
        None => Ok(()),
    }
}

/// Check guesses and rename `comprehensive` keys to `compre`.
pub fn normalize_guesses(data: JsonMap) -> Result<JsonMap, String> {
    let mut out = JsonMap::new();
    for (username, courses) in data {
        let Value::Object(courses) = courses else {
            return Err(format!("Guesses for {} must be an object", username));
        };
        let mut normalized = JsonMap::new();
        for (course, guess) in courses {
            let Value::Object(guess) = guess else {
                return Err(format!("Guess for {}/{} must be an object", username, course));
            };
            let mut record = JsonMap::new();
            let mut predictions = 0;
            for (key, value) in guess {
                if key == "timestamp" {
                    if !value.is_string() && !value.is_null() {
                        return Err(format!("timestamp for {}/{} must be a string", username, course));
                    }
                    record.insert(key, value);
                    continue;
                }
                let exam: ExamType = key.parse()?;
                let what = format!("{} guess for {}/{}", exam, username, course);
                if check_average(&value, &what)?.is_some() {
                    predictions += 1;
                }
                record.insert(exam.as_str().to_string(), value);
            }
            if predictions == 0 {
                return Err(format!(
                    "Guess for {}/{} needs at least one prediction",
                    username, course
                ));
            }
            normalized.insert(course, Value::Object(record));
        }
        out.insert(username, Value::Object(normalized));
    }
    Ok(out)
}

/// Check results and rename `comprehensive` keys to `compre`.
pub fn normalize_results(data: JsonMap) -> Result<JsonMap, String> {
    let mut out = JsonMap::new();
    for (course, exams) in data {
        let Value::Object(exams) = exams else {
            return Err(format!("Results for {} must be an object", course));
        };
        let mut normalized = JsonMap::new();
        for (key, value) in exams {
            let exam: ExamType = key.parse()?;
            let what = format!("{} average for {}", exam, course);
            match check_average(&value, &what)? {
                Some(_) => {
                    normalized.insert(exam.as_str().to_string(), value);
                }
                None => return Err(format!("{} must be a number", what)),
            }
        }
        out.insert(course, Value::Object(normalized));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> JsonMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_users_must_be_strings() {
        assert!(validate_users(&map(json!({"alice": "pw"}))).is_ok());
        assert!(validate_users(&map(json!({"alice": 5}))).is_err());
    }

    #[test]
    fn test_results_normalize_comprehensive() {
        let out = normalize_results(map(json!({"cs-f111": {"midsem": 70, "comprehensive": 65.5}})))
            .unwrap();
        assert_eq!(out["cs-f111"], json!({"midsem": 70, "compre": 65.5}));
    }

    #[test]
    fn test_results_reject_out_of_range_and_unknown_exam() {
        assert!(normalize_results(map(json!({"cs-f111": {"midsem": 101}}))).is_err());
        assert!(normalize_results(map(json!({"cs-f111": {"midsem": -1}}))).is_err());
        assert!(normalize_results(map(json!({"cs-f111": {"final": 50}}))).is_err());
        assert!(normalize_results(map(json!({"cs-f111": 50}))).is_err());
        assert!(normalize_results(map(json!({"cs-f111": {"midsem": null}}))).is_err());
    }

    #[test]
    fn test_guesses_require_one_prediction() {
        let ok = normalize_guesses(map(json!({
            "alice": {"cs-f111": {"midsem": 72, "compre": null, "timestamp": "t"}}
        })))
        .unwrap();
        assert_eq!(
            ok["alice"]["cs-f111"],
            json!({"midsem": 72, "compre": null, "timestamp": "t"})
        );

        let err = normalize_guesses(map(json!({
            "alice": {"cs-f111": {"midsem": null, "compre": null}}
        })))
        .unwrap_err();
        assert!(err.contains("at least one prediction"));
    }

    #[test]
    fn test_guesses_reject_bad_shapes() {
        assert!(normalize_guesses(map(json!({"alice": 3}))).is_err());
        assert!(normalize_guesses(map(json!({"alice": {"cs-f111": "70"}}))).is_err());
        assert!(normalize_guesses(map(json!({"alice": {"cs-f111": {"midsem": "70"}}}))).is_err());
        assert!(normalize_guesses(map(json!({"alice": {"cs-f111": {"midsem": 120}}}))).is_err());
    }

    #[test]
    fn test_guesses_normalize_comprehensive() {
        let out = normalize_guesses(map(json!({
            "bob": {"math-f111": {"comprehensive": 60}}
        })))
        .unwrap();
        assert_eq!(out["bob"]["math-f111"], json!({"compre": 60}));
    }
}
