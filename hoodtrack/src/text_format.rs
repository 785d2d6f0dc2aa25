use anyhow::{ensure, Context, Result};
use hashbrown::HashMap;

// Line-oriented, key-sectioned session text:
//
//   <key>:
//   <value>
//   <value>
//
// Blank lines end a section. This is the only persistence format the
// tracker speaks; the file is both machine state and something the player
// can edit by hand.

pub fn read_sections(text: &str) -> Result<HashMap<String, Vec<String>>> {
    let mut data: HashMap<String, Vec<String>> = HashMap::new();
    let mut category: Option<String> = None;
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            category = None;
            continue;
        }
        if let Some(key) = line.strip_suffix(':') {
            ensure!(!data.contains_key(key), "Duplicate section '{}'", key);
            data.insert(key.to_string(), vec![]);
            category = Some(key.to_string());
        } else {
            let key = category
                .as_ref()
                .with_context(|| format!("Value '{}' appears before any section", line))?;
            data.get_mut(key).unwrap().push(line.to_string());
        }
    }
    Ok(data)
}

// Priority keys first, remaining keys in sorted order so output is stable.
pub fn write_sections(data: &HashMap<String, Vec<String>>, priorities: &[&str]) -> String {
    let mut keys: Vec<&str> = priorities
        .iter()
        .copied()
        .filter(|k| data.contains_key(*k))
        .collect();
    let mut rest: Vec<&str> = data
        .keys()
        .map(String::as_str)
        .filter(|k| !priorities.contains(k))
        .collect();
    rest.sort_unstable();
    keys.extend(rest);

    let mut message = String::new();
    for key in keys {
        message.push_str(key);
        message.push_str(":\n");
        for value in &data[key] {
            message.push_str(value);
            message.push('\n');
        }
        message.push('\n');
    }
    message
}

// "<exit> goesto <destination>"
pub fn parse_goesto(line: &str) -> Result<(&str, &str)> {
    line.split_once(" goesto ")
        .with_context(|| format!("Expected '<exit> goesto <destination>', got '{}'", line))
}

pub fn format_goesto(exit: &str, destination: &str) -> String {
    format!("{} goesto {}", exit, destination)
}

// "<exit> pairswith <exit>"
pub fn parse_pairswith(line: &str) -> Option<(&str, &str)> {
    line.split_once(" pairswith ")
}

pub fn format_pairswith(exit: &str, partner: &str) -> String {
    format!("{} pairswith {}", exit, partner)
}
