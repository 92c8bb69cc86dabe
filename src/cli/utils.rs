use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Prints the outcome of a command: a JSON envelope for `--json`, otherwise
/// a check-marked line followed by any data fields.
pub fn output_success(output_format: OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    println!("{}", render_success(output_format, message, data.as_ref())?);
    Ok(())
}

fn render_success(output_format: OutputFormat, message: &str, data: Option<&Value>) -> anyhow::Result<String> {
    match output_format {
        OutputFormat::Json => {
            let mut envelope = json!({ "success": true, "message": message });
            if let Some(data) = data {
                envelope["data"] = data.clone();
            }
            Ok(serde_json::to_string_pretty(&envelope)?)
        }
        OutputFormat::Text => {
            let mut out = format!("✓ {}", message);
            if let Some(Value::Object(fields)) = data {
                for (key, value) in fields {
                    let value = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    out.push_str(&format!("\n  {}: {}", key, value));
                }
            }
            Ok(out)
        }
    }
}
