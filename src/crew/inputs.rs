use std::collections::BTreeMap;

use crate::error::{OrchestrationError, Result};

/// Named values substituted into `{placeholders}` of agent and task text
pub type Inputs = BTreeMap<String, String>;

pub fn inputs<I, K, V>(pairs: I) -> Inputs
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Replace every `{name}` with its input value.
///
/// Braces around anything that is not an identifier are copied through
/// unchanged, so JSON snippets in descriptions survive.
pub fn interpolate(template: &str, inputs: &Inputs) -> Result<String> {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        match after.find('}') {
            Some(close) if is_identifier(&after[..close]) => {
                let name = &after[..close];
                let value = inputs.get(name).ok_or_else(|| {
                    OrchestrationError::MissingInput(format!("template variable '{}' has no value", name))
                })?;
                output.push_str(value);
                rest = &after[close + 1..];
            }
            _ => {
                output.push('{');
                rest = after;
            }
        }
    }

    output.push_str(rest);
    Ok(output)
}
