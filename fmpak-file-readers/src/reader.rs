use encoding_rs::WINDOWS_1252;
use std::{borrow::Cow, path::PathBuf, str};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Malformed map file at line {line_number} while in {scope} scope: {line}")]
    MalformedMapFile {
        line_number: usize,
        line: String,
        scope: String,
    },

    #[error("Unterminated block, map file ended in {scope} scope")]
    UnterminatedBlock { scope: String },

    #[error("Unbalanced scopes, file ended at scope level {scope_level}")]
    UnbalancedScopes { scope_level: i32 },

    #[error("Unable to read file {}", path.display())]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ReadError {
    /// Errors which abort the whole audit rather than skipping a single file.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ReadError::MalformedMapFile { .. } | ReadError::UnterminatedBlock { .. }
        )
    }
}

pub struct FmFileReader<'a> {
    text: Cow<'a, str>,
}

impl<'a> From<&'a Vec<u8>> for FmFileReader<'a> {
    fn from(vec: &'a Vec<u8>) -> Self {
        Self {
            text: decode_text(vec),
        }
    }
}

impl<'a> From<&'a [u8]> for FmFileReader<'a> {
    fn from(slice: &'a [u8]) -> Self {
        Self {
            text: decode_text(slice),
        }
    }
}

impl<'a> From<&'a str> for FmFileReader<'a> {
    fn from(text: &'a str) -> Self {
        Self {
            text: Cow::Borrowed(text),
        }
    }
}

fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    // Mission files are mostly ascii, but readables are often saved as cp1252
    match str::from_utf8(bytes) {
        Ok(s) => Cow::from(s.strip_prefix('\u{feff}').unwrap_or(s)),
        Err(_) => {
            let (decoded, _, _) = WINDOWS_1252.decode(bytes);
            decoded
        }
    }
}

impl<'a> FmFileReader<'a> {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Trimmed, non-empty lines along with their 1-based line number.
    pub fn lines(&self) -> impl Iterator<Item = (usize, &str)> {
        self.text
            .lines()
            .enumerate()
            .map(|(index, line)| (index + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty())
    }

    pub fn chars(&self) -> str::Chars<'_> {
        self.text.chars()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_trimmed_and_numbered() {
        let reader = FmFileReader::from("  first \n\n\tsecond\r\n");
        let lines: Vec<_> = reader.lines().collect();
        assert_eq!(lines, vec![(1, "first"), (3, "second")]);
    }

    #[test]
    fn invalid_utf8_falls_back_to_cp1252() {
        let bytes = b"caf\xe9".to_vec();
        let reader = FmFileReader::from(&bytes);
        assert_eq!(reader.text(), "caf\u{e9}");
    }

    #[test]
    fn byte_order_mark_is_skipped() {
        let bytes = "\u{feff}textures/a".as_bytes().to_vec();
        let reader = FmFileReader::from(&bytes);
        assert_eq!(reader.text(), "textures/a");
    }
}
