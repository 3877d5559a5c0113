//! Line-oriented parser for the plain-text `list sink-inputs` output.
//!
//! Only used to recover application names the structured listing left out.

use std::collections::HashMap;

use crate::normalize::clean_application_name;
use crate::patterns::patterns;

#[derive(Debug, Default)]
pub struct PlainSinkInputParser {
    names: HashMap<u32, String>,
    current: Option<u32>,
}

impl PlainSinkInputParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index → application name for every record that named itself.
    pub fn parse(text: &str) -> HashMap<u32, String> {
        let mut parser = Self::new();
        for line in text.lines() {
            parser.feed(line);
        }
        parser.finish()
    }

    pub fn feed(&mut self, line: &str) {
        let p = patterns();
        let line = line.trim();

        if let Some(caps) = p.sink_input_header.captures(line) {
            self.current = caps[1].parse().ok();
            return;
        }

        let Some(index) = self.current else {
            return;
        };

        // `(null)` counts as absent and never displaces a node.name fallback.
        if let Some(caps) = p.application_name.captures(line) {
            if let Some(name) = clean_application_name(&caps[1]) {
                self.names.insert(index, name);
            }
        } else if let Some(caps) = p.node_name.captures(line) {
            if let Some(name) = clean_application_name(&caps[1]) {
                self.names.entry(index).or_insert(name);
            }
        }
    }

    pub fn finish(self) -> HashMap<u32, String> {
        self.names
    }
}
