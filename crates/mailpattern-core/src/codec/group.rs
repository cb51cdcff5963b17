//! Key-value configuration groups and the text file that stores them.
//!
//! The file format is a sequence of `[group]` sections of `key=value`
//! lines. Keys written before the first section belong to the unnamed
//! group. Lines starting with `#` or `;` are comments. Values escape
//! backslash, newline, tab and leading or trailing spaces.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A named set of string entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigGroup {
    name: String,
    entries: BTreeMap<String, String>,
}

impl ConfigGroup {
    /// Creates an empty group.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Group name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the value of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Sets `key` to `value`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Returns true if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keeps only the entries for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.entries.retain(|key, _| keep(key));
    }

    /// Reads a boolean entry. Accepts `true`/`false`, `yes`/`no`, `on`/`off`
    /// and `1`/`0`.
    #[must_use]
    pub fn read_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)?.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }

    /// Reads an unsigned integer entry.
    #[must_use]
    pub fn read_usize(&self, key: &str) -> Option<usize> {
        self.get(key)?.trim().parse().ok()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the group has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An ordered collection of groups, as stored in a configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    groups: Vec<ConfigGroup>,
}

impl ConfigFile {
    /// Creates an empty file.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses file contents.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigFile`] for an unterminated section header or a
    /// line that is neither a comment, a section nor a `key=value` entry.
    pub fn parse(text: &str) -> Result<Self> {
        let mut file = Self::new();
        let mut current = String::new();

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let name = rest.strip_suffix(']').ok_or_else(|| Error::ConfigFile {
                    line: line_no,
                    message: "Unterminated group header".to_string(),
                })?;
                current = unescape(name);
                file.group_entry(&current);
                continue;
            }

            let (key, value) = line.split_once('=').ok_or_else(|| Error::ConfigFile {
                line: line_no,
                message: format!("Expected key=value, got {line:?}"),
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(Error::ConfigFile {
                    line: line_no,
                    message: "Empty key".to_string(),
                });
            }
            file.group_entry(&current).set(key, unescape(value.trim()));
        }

        Ok(file)
    }

    /// Returns the named group.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&ConfigGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Returns the named group mutably.
    pub fn group_mut(&mut self, name: &str) -> Option<&mut ConfigGroup> {
        self.groups.iter_mut().find(|g| g.name == name)
    }

    /// Inserts a group, replacing any group with the same name in place.
    pub fn insert_group(&mut self, group: ConfigGroup) {
        if let Some(existing) = self.group_mut(&group.name) {
            *existing = group;
        } else {
            self.groups.push(group);
        }
    }

    /// Removes the named group.
    pub fn remove_group(&mut self, name: &str) -> Option<ConfigGroup> {
        let index = self.groups.iter().position(|g| g.name == name)?;
        Some(self.groups.remove(index))
    }

    /// Groups in file order.
    #[must_use]
    pub fn groups(&self) -> &[ConfigGroup] {
        &self.groups
    }

    /// Names of the groups in file order.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(ConfigGroup::name)
    }

    fn group_entry(&mut self, name: &str) -> &mut ConfigGroup {
        let index = match self.groups.iter().position(|g| g.name == name) {
            Some(index) => index,
            None => {
                self.groups.push(ConfigGroup::new(name));
                self.groups.len() - 1
            }
        };
        &mut self.groups[index]
    }
}

impl fmt::Display for ConfigFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The unnamed group has no header, so it must come first.
        let unnamed = self.groups.iter().filter(|g| g.name.is_empty());
        let named = self.groups.iter().filter(|g| !g.name.is_empty());

        let mut first = true;
        for group in unnamed.chain(named) {
            if group.name.is_empty() && group.is_empty() {
                continue;
            }
            if !first {
                writeln!(f)?;
            }
            first = false;
            if !group.name.is_empty() {
                writeln!(f, "[{}]", escape_group_name(&group.name))?;
            }
            for (key, value) in group.iter() {
                writeln!(f, "{key}={}", escape(value))?;
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for ConfigFile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);
    for (index, c) in value.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            ' ' if index == 0 || index == last => out.push_str("\\s"),
            _ => out.push(c),
        }
    }
    out
}

/// Group names also escape brackets so a header stays on one line and
/// ends at its last `]`.
fn escape_group_name(name: &str) -> String {
    escape(name).replace('[', "\\[").replace(']', "\\]")
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('s') => out.push(' '),
            Some(bracket @ ('[' | ']')) => out.push(bracket),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
