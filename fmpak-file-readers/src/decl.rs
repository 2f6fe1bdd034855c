use std::{iter::Peekable, str::Chars};

use crate::{
    reader::{FmFileReader, ReadError},
    wildcard::Wildcard,
    FmFile,
};

#[derive(Clone, Debug, Default)]
pub struct DeclReadOptions {
    /// When set, only identifiers directly following this prefix are kept.
    pub required_prefix: Option<String>,
    /// Declarations introduced by one of these prefixes are dropped.
    pub rejected_prefixes: Vec<String>,
    pub identifier_pattern: Option<Wildcard>,
}

impl DeclReadOptions {
    fn accepts(&self, prefix: Option<&str>, identifier: &str) -> bool {
        if let Some(required) = self.required_prefix.as_deref() {
            if prefix != Some(required) {
                return false;
            }
        }

        if let Some(prefix) = prefix {
            if self.rejected_prefixes.iter().any(|rejected| rejected == prefix) {
                return false;
            }
        }

        self.identifier_pattern
            .as_ref()
            .map_or(true, |pattern| pattern.matches(identifier))
    }
}

/// The top level identifiers declared by a material, skin, particle,
/// entityDef or xdata file, in file order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DeclFile(Vec<String>);

impl DeclFile {
    pub fn identifiers(&self) -> &[String] {
        &self.0
    }

    pub fn into_identifiers(self) -> Vec<String> {
        self.0
    }
}

struct DeclScanner<'a> {
    options: &'a DeclReadOptions,
    scope_level: i32,
    comment_level: Option<i32>,
    in_quotes: bool,
    buffer: String,
    line_tokens: Vec<String>,
    identifiers: Vec<String>,
}

impl<'a> DeclScanner<'a> {
    fn new(options: &'a DeclReadOptions) -> Self {
        Self {
            options,
            scope_level: 0,
            comment_level: None,
            in_quotes: false,
            buffer: String::new(),
            line_tokens: Vec::new(),
            identifiers: Vec::new(),
        }
    }

    fn flush_token(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        if self.scope_level == 0 && self.comment_level.is_none() {
            self.line_tokens.push(std::mem::take(&mut self.buffer));
        } else {
            self.buffer.clear();
        }
    }

    fn end_line(&mut self) {
        self.flush_token();
        self.in_quotes = false;

        let mut tokens = std::mem::take(&mut self.line_tokens).into_iter();
        let (prefix, identifier) = match (tokens.next(), tokens.next()) {
            (None, _) => return,
            (Some(identifier), None) => (None, identifier),
            (Some(prefix), Some(identifier)) => (Some(prefix), identifier),
        };

        if self.options.accepts(prefix.as_deref(), &identifier) {
            self.identifiers.push(identifier);
        } else {
            log::trace!(
                "Skipped declaration {} {}",
                prefix.as_deref().unwrap_or(""),
                identifier
            );
        }
    }

    fn scan_comment(&mut self, c: char, chars: &mut Peekable<Chars>) {
        match c {
            '*' if chars.peek() == Some(&'/') => {
                chars.next();
                self.scope_level -= 1;
                if Some(self.scope_level) == self.comment_level {
                    self.comment_level = None;
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                self.scope_level += 1;
            }
            '\n' => self.end_line(),
            _ => {}
        }
    }

    fn scan(&mut self, mut chars: Peekable<Chars>) -> Result<(), ReadError> {
        while let Some(c) = chars.next() {
            if self.comment_level.is_some() {
                self.scan_comment(c, &mut chars);
                continue;
            }

            if self.in_quotes {
                match c {
                    '"' => self.in_quotes = false,
                    '\n' => self.end_line(),
                    _ if self.scope_level == 0 => self.buffer.push(c),
                    _ => {}
                }
                continue;
            }

            match c {
                '"' => self.in_quotes = true,
                '/' if chars.peek() == Some(&'/') => {
                    while chars.peek().map_or(false, |c| *c != '\n') {
                        chars.next();
                    }
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    self.buffer.clear();
                    self.comment_level = Some(self.scope_level);
                    self.scope_level += 1;
                }
                '{' => {
                    self.flush_token();
                    self.scope_level += 1;
                }
                '}' => {
                    self.flush_token();
                    self.scope_level -= 1;
                    if self.scope_level < 0 {
                        return Err(ReadError::UnbalancedScopes {
                            scope_level: self.scope_level,
                        });
                    }
                    if self.scope_level == 0 {
                        // Closing a block also ends its declaration
                        self.end_line();
                    }
                }
                '\n' => self.end_line(),
                c if c.is_whitespace() => self.flush_token(),
                c if self.scope_level == 0 => self.buffer.push(c),
                _ => {}
            }
        }

        self.end_line();
        if self.scope_level != 0 || self.comment_level.is_some() {
            return Err(ReadError::UnbalancedScopes {
                scope_level: self.scope_level,
            });
        }

        Ok(())
    }
}

impl FmFile for DeclFile {
    type ReadOptions = DeclReadOptions;

    fn read(reader: FmFileReader, options: &Self::ReadOptions) -> Result<Self, anyhow::Error> {
        let mut scanner = DeclScanner::new(options);
        scanner.scan(reader.chars().peekable())?;
        Ok(DeclFile(scanner.identifiers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(text: &str, options: &DeclReadOptions) -> Result<Vec<String>, anyhow::Error> {
        DeclFile::read(FmFileReader::from(text), options).map(DeclFile::into_identifiers)
    }

    fn read_error(text: &str) -> ReadError {
        read(text, &DeclReadOptions::default())
            .unwrap_err()
            .downcast::<ReadError>()
            .expect("expected a ReadError")
    }

    #[test]
    fn material_identifier_before_block() {
        let text = "textures/stone/wall01\n{\n  diffusemap textures/stone/wall01_d\n}\n// unused comment\n";
        let identifiers = read(text, &DeclReadOptions::default()).unwrap();
        assert_eq!(identifiers, vec!["textures/stone/wall01"]);
    }

    #[test]
    fn identifiers_keep_file_order() {
        let text = "textures/b { qer_editorimage b }\ntextures/a\n{\n}\ntextures/c{}\n";
        let identifiers = read(text, &DeclReadOptions::default()).unwrap();
        assert_eq!(identifiers, vec!["textures/b", "textures/a", "textures/c"]);
    }

    #[test]
    fn declarations_sharing_a_line() {
        let text = "textures/a { } textures/b { }\nskin skins/red { a b } skin skins/blue { }\n";
        let identifiers = read(text, &DeclReadOptions::default()).unwrap();
        assert_eq!(
            identifiers,
            vec!["textures/a", "textures/b", "skins/red", "skins/blue"]
        );
    }

    #[test]
    fn prefix_is_stripped() {
        let text = "skin skins/chair_red\n{\n  textures/a textures/b\n}\n\nskin skins/chair_blue {\n}\n";
        let identifiers = read(text, &DeclReadOptions::default()).unwrap();
        assert_eq!(identifiers, vec!["skins/chair_red", "skins/chair_blue"]);
    }

    #[test]
    fn required_prefix_drops_other_declarations() {
        let options = DeclReadOptions {
            required_prefix: Some("entityDef".to_string()),
            ..Default::default()
        };
        let text = "model chair_model\n{\n  mesh models/chair.md5mesh\n}\nentityDef atdm:chair\n{\n  \"model\" \"chair_model\"\n}\nstray_identifier\n";
        let identifiers = read(text, &options).unwrap();
        assert_eq!(identifiers, vec!["atdm:chair"]);
    }

    #[test]
    fn rejected_prefix_drops_declaration() {
        let options = DeclReadOptions {
            rejected_prefixes: vec!["table".to_string()],
            ..Default::default()
        };
        let text = "table flicker { { 0.5, 1 } }\nmaterial textures/a\n{\n}\n";
        let identifiers = read(text, &options).unwrap();
        assert_eq!(identifiers, vec!["textures/a"]);
    }

    #[test]
    fn identifier_pattern_filters() {
        let options = DeclReadOptions {
            identifier_pattern: Some(Wildcard::new("textures/*").unwrap()),
            ..Default::default()
        };
        let text = "textures/a {}\nlights/round {}\n";
        let identifiers = read(text, &options).unwrap();
        assert_eq!(identifiers, vec!["textures/a"]);
    }

    #[test]
    fn block_comments_hide_declarations() {
        let text = "/* textures/old\n{\n}\n*/\ntextures/new\n{\n}\n";
        let identifiers = read(text, &DeclReadOptions::default()).unwrap();
        assert_eq!(identifiers, vec!["textures/new"]);
    }

    #[test]
    fn block_comments_nest() {
        let text = "/* outer /* inner */ still comment */ textures/a\n{\n  /* { */\n}\n";
        let identifiers = read(text, &DeclReadOptions::default()).unwrap();
        assert_eq!(identifiers, vec!["textures/a"]);
    }

    #[test]
    fn line_comment_ends_token() {
        let text = "textures/a// trailing\n{\n}\n";
        let identifiers = read(text, &DeclReadOptions::default()).unwrap();
        assert_eq!(identifiers, vec!["textures/a"]);
    }

    #[test]
    fn quoted_text_hides_comment_glyphs() {
        let text = "maps/test/readable\n{\n  \"page1_body\" : \"see http://example.org }\"\n}\nmaps/test/other\n{\n}\n";
        let identifiers = read(text, &DeclReadOptions::default()).unwrap();
        assert_eq!(identifiers, vec!["maps/test/readable", "maps/test/other"]);
    }

    #[test]
    fn unclosed_scope_is_unbalanced() {
        assert!(matches!(
            read_error("textures/a\n{\n  diffusemap a\n"),
            ReadError::UnbalancedScopes { scope_level: 1 }
        ));
    }

    #[test]
    fn unclosed_comment_is_unbalanced() {
        assert!(matches!(
            read_error("/* textures/a\n"),
            ReadError::UnbalancedScopes { .. }
        ));
    }

    #[test]
    fn stray_close_is_unbalanced() {
        assert!(matches!(
            read_error("textures/a\n}\n"),
            ReadError::UnbalancedScopes { scope_level: -1 }
        ));
    }

    #[test]
    fn empty_file_has_no_identifiers() {
        let identifiers = read("// nothing here\n\n", &DeclReadOptions::default()).unwrap();
        assert!(identifiers.is_empty());
    }
}
