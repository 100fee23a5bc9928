//! Line parser for `KEY=VALUE` environment files
//!
//! Supports `#` comments, blank lines, `!{reference}` secret values and
//! double-quoted values that span several lines.

use regex::Regex;
use std::io::BufRead;
use tracing::debug;

use crate::env::snapshot::EnvSnapshot;
use crate::error::{Result, VaultenvError};

const COMMENT_TOKEN: char = '#';
const KV_SEPARATOR: char = '=';
const QUOTE: char = '"';
const EMPTY_SECRET: &str = "!{}";
const SECRET_PATTERN: &str = r"^!\{(?P<reference>.+)\}$";

/// Parser for environment sources.
///
/// Holds the compiled secret pattern; build it once and reuse it for every
/// source.
#[derive(Debug, Clone)]
pub struct EnvParser {
    secret_re: Regex,
}

impl EnvParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            secret_re: Regex::new(SECRET_PATTERN)?,
        })
    }

    /// Extract the reference from a whole `!{...}` value.
    ///
    /// Anything else, including secrets embedded in surrounding text, is not
    /// a reference.
    pub fn secret_reference<'a>(&self, value: &'a str) -> Option<&'a str> {
        self.secret_re
            .captures(value)
            .and_then(|caps| caps.name("reference"))
            .map(|m| m.as_str())
    }

    /// Classify a single value with no multiline handling.
    ///
    /// Used for values that come from somewhere other than a file, such as
    /// the process environment.
    pub fn classify_value(&self, snapshot: &mut EnvSnapshot, key: &str, value: &str) -> Result<()> {
        if value == EMPTY_SECRET {
            return Err(VaultenvError::malformed_line(
                format!("{}={}", key, value),
                "empty secret reference",
            ));
        }

        match self.secret_reference(value) {
            Some(reference) => snapshot.set_secret(key, reference),
            None => snapshot.set_plain(key, value),
        }
        Ok(())
    }

    pub fn parse_str(&self, input: &str) -> Result<EnvSnapshot> {
        let mut lines = LineParser::new(self);
        for line in input.lines() {
            lines.feed(line)?;
        }
        lines.finish()
    }

    /// Parse a buffered source line by line.
    ///
    /// `source_name` labels read failures, e.g. the file path.
    pub fn parse_reader<R: BufRead>(&self, reader: R, source_name: &str) -> Result<EnvSnapshot> {
        let mut lines = LineParser::new(self);
        for line in reader.lines() {
            let line = line.map_err(|e| VaultenvError::source_unavailable(source_name, e))?;
            lines.feed(&line)?;
        }
        lines.finish()
    }
}

#[derive(Debug)]
enum State {
    Ready,
    InMultiline {
        key: String,
        value: String,
        opening_line: String,
    },
}

/// Streaming state machine over the lines of one source.
struct LineParser<'p> {
    parser: &'p EnvParser,
    state: State,
    snapshot: EnvSnapshot,
}

impl<'p> LineParser<'p> {
    fn new(parser: &'p EnvParser) -> Self {
        Self {
            parser,
            state: State::Ready,
            snapshot: EnvSnapshot::new(),
        }
    }

    fn feed(&mut self, raw: &str) -> Result<()> {
        let line = raw.trim();
        if line.is_empty() {
            return Ok(());
        }

        match &mut self.state {
            State::InMultiline { key, value, .. } => {
                // Inside a quoted block every line is data, '#' included.
                if let Some(last) = line.strip_suffix(QUOTE) {
                    value.push_str(last);
                    let key = std::mem::take(key);
                    let value = std::mem::take(value);
                    debug!("Closed multiline value for {}", key);
                    self.snapshot.set_plain(key, value);
                    self.state = State::Ready;
                } else {
                    value.push_str(line);
                    value.push('\n');
                }
                Ok(())
            }
            State::Ready => {
                if line.starts_with(COMMENT_TOKEN) {
                    return Ok(());
                }
                self.assign(raw, line)
            }
        }
    }

    fn assign(&mut self, raw: &str, line: &str) -> Result<()> {
        let (key, value) = line
            .split_once(KV_SEPARATOR)
            .ok_or_else(|| VaultenvError::malformed_line(raw, "missing '=' separator"))?;

        let key = key.trim();
        let value = value.trim();
        if key.is_empty() {
            return Err(VaultenvError::malformed_line(raw, "empty key"));
        }
        if value == EMPTY_SECRET {
            return Err(VaultenvError::malformed_line(raw, "empty secret reference"));
        }

        if let Some(reference) = self.parser.secret_reference(value) {
            self.snapshot.set_secret(key, reference);
            return Ok(());
        }

        if value.starts_with(QUOTE) && !value.ends_with(QUOTE) {
            let mut seed = value[QUOTE.len_utf8()..].to_string();
            seed.push('\n');
            self.state = State::InMultiline {
                key: key.to_string(),
                value: seed,
                opening_line: raw.to_string(),
            };
            return Ok(());
        }

        self.snapshot.set_plain(key, value);
        Ok(())
    }

    /// End of input. An open multiline block is rejected.
    fn finish(self) -> Result<EnvSnapshot> {
        match self.state {
            State::Ready => Ok(self.snapshot),
            State::InMultiline { opening_line, .. } => Err(VaultenvError::malformed_line(
                opening_line,
                "unterminated multiline value",
            )),
        }
    }
}
