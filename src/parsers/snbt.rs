//! Tokenizer and parser for the SNBT subset used by FTB Quests.
//!
//! The AST keeps the byte span of every string literal so translated text can be
//! spliced back without touching anything else in the file.

use std::ops::Range;

use crate::error::{CoreError, Result};
use crate::model::entry::TextEntry;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Colon,
    Comma,
    Semicolon,
    Str { value: String, quote: char },
    Word(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
    pub line: usize,
    pub column: usize,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '+')
}

struct Lexer<'a> {
    src: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer {
            src,
            chars: src.char_indices().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if let Some((_, c)) = next {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        next
    }

    fn error(&self, message: impl Into<String>) -> CoreError {
        CoreError::Snbt {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }

    fn tokens(mut self) -> Result<Vec<Token>> {
        let mut out = Vec::new();

        while let Some(&(start, c)) = self.chars.peek() {
            if c.is_whitespace() || c == '\u{feff}' {
                self.bump();
                continue;
            }

            let (line, column) = (self.line, self.column);
            let kind = match c {
                '{' | '}' | '[' | ']' | ':' | ',' | ';' => {
                    self.bump();
                    match c {
                        '{' => TokenKind::LBrace,
                        '}' => TokenKind::RBrace,
                        '[' => TokenKind::LBracket,
                        ']' => TokenKind::RBracket,
                        ':' => TokenKind::Colon,
                        ',' => TokenKind::Comma,
                        _ => TokenKind::Semicolon,
                    }
                }
                '"' | '\'' => self.string(c)?,
                c if is_word_char(c) => {
                    while matches!(self.chars.peek(), Some(&(_, w)) if is_word_char(w)) {
                        self.bump();
                    }
                    let end = self.chars.peek().map_or(self.src.len(), |&(i, _)| i);
                    TokenKind::Word(self.src[start..end].to_string())
                }
                other => return Err(self.error(format!("unexpected character {other:?}"))),
            };

            let end = self.chars.peek().map_or(self.src.len(), |&(i, _)| i);
            out.push(Token {
                kind,
                span: start..end,
                line,
                column,
            });
        }

        Ok(out)
    }

    fn string(&mut self, quote: char) -> Result<TokenKind> {
        self.bump();
        let mut value = String::new();

        loop {
            let Some((_, c)) = self.bump() else {
                return Err(self.error("unterminated string"));
            };
            match c {
                c if c == quote => break,
                '\\' => {
                    let Some((_, e)) = self.bump() else {
                        return Err(self.error("unterminated escape"));
                    };
                    match e {
                        '"' | '\'' | '\\' => value.push(e),
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        'b' => value.push('\u{8}'),
                        'f' => value.push('\u{c}'),
                        'u' => value.push(self.unicode_escape()?),
                        other => return Err(self.error(format!("unknown escape \\{other}"))),
                    }
                }
                c => value.push(c),
            }
        }

        Ok(TokenKind::Str { value, quote })
    }

    fn unicode_escape(&mut self) -> Result<char> {
        let mut code = 0u32;
        for _ in 0..4 {
            let digit = self
                .bump()
                .and_then(|(_, h)| h.to_digit(16))
                .ok_or_else(|| self.error("bad \\u escape"))?;
            code = code * 16 + digit;
        }
        char::from_u32(code).ok_or_else(|| self.error("bad \\u escape"))
    }
}

pub fn tokenize(src: &str) -> Result<Vec<Token>> {
    Lexer::new(src).tokens()
}

/// String literal with its location in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct StrLit {
    pub value: String,
    pub span: Range<usize>,
    pub quote: char,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Compound(Vec<(String, Value)>),
    List(Vec<Value>),
    Str(StrLit),
    Scalar(String),
}

impl Value {
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Compound(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(&s.value),
            _ => None,
        }
    }
}

/// Deepest compound/list nesting accepted. Quest files stay far below this.
pub const MAX_DEPTH: usize = 512;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    eof: (usize, usize),
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token> {
        let tok = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| self.error_at(None, "unexpected end of input"))?;
        self.pos += 1;
        Ok(tok)
    }

    fn error_at(&self, tok: Option<&Token>, message: impl Into<String>) -> CoreError {
        let (line, column) = tok.map_or(self.eof, |t| (t.line, t.column));
        CoreError::Snbt {
            line,
            column,
            message: message.into(),
        }
    }

    fn skip_commas(&mut self) {
        while matches!(self.peek(), Some(t) if t.kind == TokenKind::Comma) {
            self.pos += 1;
        }
    }

    fn value(&mut self) -> Result<Value> {
        let tok = self.next()?;
        let (line, column) = (tok.line, tok.column);
        if matches!(tok.kind, TokenKind::LBrace | TokenKind::LBracket) {
            return self.nested(&tok);
        }
        match tok.kind {
            TokenKind::Str { value, quote } => Ok(Value::Str(StrLit {
                value,
                span: tok.span,
                quote,
            })),
            TokenKind::Word(w) => Ok(Value::Scalar(w)),
            _ => Err(CoreError::Snbt {
                line,
                column,
                message: "expected a value".into(),
            }),
        }
    }

    fn nested(&mut self, open: &Token) -> Result<Value> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error_at(Some(open), format!("nested deeper than {MAX_DEPTH} levels")));
        }
        self.depth += 1;
        let value = if open.kind == TokenKind::LBrace {
            self.compound()
        } else {
            self.list()
        };
        self.depth -= 1;
        value
    }

    fn compound(&mut self) -> Result<Value> {
        let mut entries = Vec::new();
        loop {
            self.skip_commas();
            let tok = self.next()?;
            let key = match tok.kind {
                TokenKind::RBrace => return Ok(Value::Compound(entries)),
                TokenKind::Str { ref value, .. } => value.clone(),
                TokenKind::Word(ref w) => w.clone(),
                _ => return Err(self.error_at(Some(&tok), "expected a key")),
            };
            let colon = self.next()?;
            if colon.kind != TokenKind::Colon {
                return Err(self.error_at(Some(&colon), format!("expected ':' after {key}")));
            }
            let value = self.value()?;
            entries.push((key, value));
        }
    }

    fn list(&mut self) -> Result<Value> {
        // Typed arrays: [I; 1, 2, 3]
        if let (Some(Token { kind: TokenKind::Word(_), .. }), Some(Token { kind: TokenKind::Semicolon, .. })) =
            (self.tokens.get(self.pos), self.tokens.get(self.pos + 1))
        {
            self.pos += 2;
        }

        let mut items = Vec::new();
        loop {
            self.skip_commas();
            if matches!(self.peek(), Some(t) if t.kind == TokenKind::RBracket) {
                self.pos += 1;
                return Ok(Value::List(items));
            }
            items.push(self.value()?);
        }
    }
}

pub fn parse(src: &str) -> Result<Value> {
    let tokens = tokenize(src)?;
    let eof = tokens.last().map_or((1, 1), |t| (t.line, t.column + 1));
    let mut parser = Parser {
        tokens,
        pos: 0,
        eof,
        depth: 0,
    };
    let root = parser.value()?;
    if let Some(extra) = parser.peek() {
        return Err(parser.error_at(Some(extra), "trailing content after root value"));
    }
    Ok(root)
}

/// Keys whose string values are player-facing text. Covers the inline chapter
/// format and the `lang/*.snbt` key format of newer FTB Quests.
pub fn is_text_key(key: &str) -> bool {
    matches!(key, "title" | "subtitle" | "description")
        || key.ends_with(".title")
        || key.ends_with(".quest_subtitle")
        || key.ends_with(".quest_desc")
        || key.ends_with(".chapter_subtitle")
}

/// Collects translatable strings in document order.
pub fn extract(root: &Value) -> Vec<TextEntry> {
    let mut out = Vec::new();
    walk(root, &mut out);
    out
}

fn push(out: &mut Vec<TextEntry>, field: String, lit: &StrLit) {
    let mut e = TextEntry::new(format!("{}-{}", out.len() + 1, field), field, lit.value.clone());
    e.span = Some(lit.span.clone());
    e.quote = Some(lit.quote);
    out.push(e);
}

fn walk(value: &Value, out: &mut Vec<TextEntry>) {
    match value {
        Value::Compound(entries) => {
            for (key, v) in entries {
                if !is_text_key(key) {
                    walk(v, out);
                    continue;
                }
                match v {
                    Value::Str(lit) => push(out, key.clone(), lit),
                    Value::List(items) => {
                        for (i, item) in items.iter().enumerate() {
                            match item {
                                Value::Str(lit) => push(out, format!("{key}[{i}]"), lit),
                                other => walk(other, out),
                            }
                        }
                    }
                    other => walk(other, out),
                }
            }
        }
        Value::List(items) => items.iter().for_each(|v| walk(v, out)),
        Value::Str(_) | Value::Scalar(_) => {}
    }
}

/// Encodes `value` as a literal using `quote`.
pub fn quote_string(value: &str, quote: char) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CHAPTER: &str = r#"{
	id: "2F6A0C1B"
	group: ""
	order_index: 0
	filename: "getting_started"
	title: "Getting Started"
	default_quest_shape: ""
	quests: [
		{
			title: "&aFirst Steps"
			x: 0.0d
			y: 0.0d
			description: [
				"Punch a tree to collect some \"wood\"."
				""
				"Then craft a table."
			]
			id: "7B1C"
			tasks: [{
				id: "1A2B"
				type: "item"
				item: "minecraft:oak_log"
				count: 8L
			}]
			rewards: [{ id: "3C4D", type: "xp", xp: 10 }]
		}
	]
	images: [ ]
	tags: [I; 1, 2]
}
"#;

    #[test]
    fn tokenizes_punctuation_words_and_strings() {
        let toks = tokenize(r#"{a: 1.5d, b: 'x\'y'}"#).unwrap();
        let kinds: Vec<_> = toks.iter().map(|t| t.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::LBrace,
                TokenKind::Word("a".into()),
                TokenKind::Colon,
                TokenKind::Word("1.5d".into()),
                TokenKind::Comma,
                TokenKind::Word("b".into()),
                TokenKind::Colon,
                TokenKind::Str {
                    value: "x'y".into(),
                    quote: '\''
                },
                TokenKind::RBrace,
            ]
        );
        assert_eq!(toks[7].span, 13..19);
    }

    #[test]
    fn parses_chapter_without_commas() {
        let root = parse(CHAPTER).unwrap();
        assert_eq!(root.get("title").and_then(Value::as_str), Some("Getting Started"));
        assert_eq!(root.get("order_index"), Some(&Value::Scalar("0".into())));
        match root.get("quests") {
            Some(Value::List(q)) => assert_eq!(q.len(), 1),
            other => panic!("unexpected quests: {other:?}"),
        }
    }

    #[test]
    fn extracts_text_fields_in_document_order() {
        let entries = extract(&parse(CHAPTER).unwrap());
        let fields: Vec<_> = entries.iter().map(|e| (e.field.as_str(), e.original.as_str())).collect();
        assert_eq!(
            fields,
            vec![
                ("title", "Getting Started"),
                ("title", "&aFirst Steps"),
                ("description[0]", "Punch a tree to collect some \"wood\"."),
                ("description[1]", ""),
                ("description[2]", "Then craft a table."),
            ]
        );
        let span = entries[2].span.clone().unwrap();
        assert_eq!(&CHAPTER[span], r#""Punch a tree to collect some \"wood\".""#);
    }

    #[test]
    fn lang_snbt_keys_are_text() {
        let src = r#"{
	chapter.2F6A.title: "Basics"
	quest.7B1C.quest_desc: ["Line one", "Line two"]
	quest.7B1C.title: "Wood"
	file.0000.title: "My Pack"
}"#;
        let entries = extract(&parse(src).unwrap());
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[1].field, "quest.7B1C.quest_desc[0]");
    }

    #[test]
    fn errors_carry_position() {
        match parse("{\n  title: \"open\n") {
            Err(CoreError::Snbt { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected snbt error, got {other:?}"),
        }
        match parse("{ title: # }") {
            Err(CoreError::Snbt { line, column, .. }) => assert_eq!((line, column), (1, 10)),
            other => panic!("expected snbt error, got {other:?}"),
        }
        assert!(parse("{ a: 1 } }").is_err());
        assert!(parse("{ a 1 }").is_err());
    }

    #[test]
    fn deep_nesting_is_rejected() {
        match parse(&"[".repeat(100_000)) {
            Err(CoreError::Snbt { message, .. }) => assert!(message.contains("nested deeper")),
            other => panic!("expected snbt error, got {other:?}"),
        }

        let ok = format!("{}{}", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));
        assert!(parse(&ok).is_ok());
        let too_deep = format!("{}{}", "[".repeat(MAX_DEPTH + 1), "]".repeat(MAX_DEPTH + 1));
        assert!(parse(&too_deep).is_err());
    }

    #[test]
    fn escapes_round_trip() {
        let original = "Say \"hi\"\n\\o/";
        let lit = quote_string(original, '"');
        assert_eq!(lit, r#""Say \"hi\"\n\\o/""#);
        match &tokenize(&lit).unwrap()[0].kind {
            TokenKind::Str { value, .. } => assert_eq!(value, original),
            other => panic!("unexpected token {other:?}"),
        }
        assert_eq!(quote_string("it's", '\''), r"'it\'s'");
    }

    #[test]
    fn unicode_escapes_decode() {
        match &tokenize(r#""\u041a\u043e\u0442""#).unwrap()[0].kind {
            TokenKind::Str { value, .. } => assert_eq!(value, "Кот"),
            other => panic!("unexpected token {other:?}"),
        }
    }
}
