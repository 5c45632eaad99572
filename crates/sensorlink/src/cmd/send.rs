use sensorlink_frame::Command;
use serde_json::{Map, Value};

use crate::cmd::{request, SendArgs};
use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let params = match &args.json {
        Some(json) => parse_object(json)?,
        None => parse_params(&args.params)?,
    };
    let command = Command::with_params(args.command.as_str(), params);
    request::run(&args.conn, &command, format)
}

fn parse_object(json: &str) -> CliResult<Map<String, Value>> {
    match serde_json::from_str::<Value>(json) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(CliError::new(USAGE, "--json must be a JSON object")),
        Err(err) => Err(CliError::new(
            USAGE,
            format!("--json is not valid JSON: {err}"),
        )),
    }
}

/// `KEY=VALUE` pairs. VALUE is JSON when it parses as JSON (`1`, `true`,
/// `[1,2]`), otherwise a plain string.
fn parse_params(pairs: &[String]) -> CliResult<Map<String, Value>> {
    let mut params = Map::new();
    for pair in pairs {
        let Some((key, raw)) = pair.split_once('=') else {
            return Err(CliError::new(
                USAGE,
                format!("--param expects KEY=VALUE, got {pair:?}"),
            ));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(CliError::new(USAGE, format!("--param has an empty key: {pair:?}")));
        }
        let value =
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        params.insert(key.to_string(), value);
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn param_values_prefer_json() {
        let params = parse_params(&[
            "speed=128".to_string(),
            "direction=-1".to_string(),
            "label=fan".to_string(),
            "enabled=true".to_string(),
        ])
        .unwrap();
        assert_eq!(params["speed"], json!(128));
        assert_eq!(params["direction"], json!(-1));
        assert_eq!(params["label"], json!("fan"));
        assert_eq!(params["enabled"], json!(true));
    }

    #[test]
    fn malformed_params_are_usage_errors() {
        assert_eq!(parse_params(&["speed".to_string()]).unwrap_err().code, USAGE);
        assert_eq!(parse_params(&["=1".to_string()]).unwrap_err().code, USAGE);
        assert_eq!(parse_object("[1]").unwrap_err().code, USAGE);
        assert_eq!(parse_object("{").unwrap_err().code, USAGE);
    }

    #[test]
    fn json_object_becomes_params() {
        let params = parse_object(r#"{"state":1}"#).unwrap();
        assert_eq!(params["state"], json!(1));
    }
}
