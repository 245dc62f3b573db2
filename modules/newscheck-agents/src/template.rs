//! `{{slot}}` templates. `\{{` writes a literal `{{`.

use std::collections::HashMap;

use anyhow::{bail, Result};

enum Piece<'a> {
    Text(&'a str),
    Literal(&'static str),
    Slot(&'a str),
}

/// Split a template into literal text and slot references.
fn parse(template: &str) -> Result<Vec<Piece<'_>>> {
    let mut pieces = Vec::new();
    let mut rest = template;

    while !rest.is_empty() {
        let escape = rest.find("\\{{");
        let open = rest.find("{{");

        match (escape, open) {
            (Some(e), Some(o)) if e < o => {
                pieces.push(Piece::Text(&rest[..e]));
                pieces.push(Piece::Literal("{{"));
                rest = &rest[e + 3..];
            }
            (_, Some(o)) => {
                pieces.push(Piece::Text(&rest[..o]));
                let after = &rest[o + 2..];
                let Some(close) = after.find("}}") else {
                    bail!("Unclosed template slot: {{{{{}", after);
                };
                let name = after[..close].trim();
                if name.is_empty() {
                    bail!("Empty template slot");
                }
                pieces.push(Piece::Slot(name));
                rest = &after[close + 2..];
            }
            (_, None) => {
                pieces.push(Piece::Text(rest));
                rest = "";
            }
        }
    }

    Ok(pieces)
}

/// Slot names in order of appearance, duplicates included.
pub fn slots(template: &str) -> Result<Vec<String>> {
    Ok(parse(template)?
        .into_iter()
        .filter_map(|piece| match piece {
            Piece::Slot(name) => Some(name.to_string()),
            _ => None,
        })
        .collect())
}

/// Every slot in `required` must appear and no other slot may.
pub fn validate_template(template: &str, required: &[&str]) -> Result<()> {
    let found = slots(template)?;

    if let Some(unknown) = found.iter().find(|name| !required.contains(&name.as_str())) {
        bail!(
            "Unknown template slot: {{{{{}}}}}. Allowed slots: {:?}",
            unknown,
            required
        );
    }
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|slot| !found.iter().any(|name| name == slot))
        .collect();
    if !missing.is_empty() {
        bail!("Template is missing slots: {:?}", missing);
    }
    Ok(())
}

/// Substitute every slot in one pass. Values are inserted verbatim and never
/// re-scanned, so a value containing `{{` is safe.
pub fn render(template: &str, vars: &HashMap<&str, &str>) -> Result<String> {
    let mut result = String::with_capacity(template.len());
    for piece in parse(template)? {
        match piece {
            Piece::Text(text) => result.push_str(text),
            Piece::Literal(text) => result.push_str(text),
            Piece::Slot(name) => match vars.get(name) {
                Some(value) => result.push_str(value),
                None => bail!("No value for template slot {{{{{}}}}}", name),
            },
        }
    }
    Ok(result)
}
