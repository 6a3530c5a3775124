use crate::directive::Directive;
use crate::error::{DiagnosticId, Diagnostics, Severity};
use crate::ir::ConstValue;
use crate::text::SourceLoc;
use crate::token::{Token, TokenList, RESERVED_WORDS};
use std::{iter::Peekable, str::Chars};

/// Tokenizes one translation unit.
/// Directive lines are recognized here and stored in the token list,
/// lexical errors are written into `diagnostics` immediately.
pub fn lex(source: &str, file: u32, diagnostics: &mut Diagnostics) -> TokenList {
    let mut lex = Lexer::new(source, file, diagnostics);
    source_file(&mut lex);
    lex.tokens
}

struct Lexer<'src, 'd> {
    cursor: u32,
    line: u32,
    file: u32,
    chars: Peekable<Chars<'src>>,
    tokens: TokenList,
    source: &'src str,
    diagnostics: &'d mut Diagnostics,
    /// only whitespace and comments seen since the last newline
    line_start: bool,
    /// any token or directive seen, `#version` must precede both
    past_first_statement: bool,
}

impl<'src, 'd> Lexer<'src, 'd> {
    fn new(source: &'src str, file: u32, diagnostics: &'d mut Diagnostics) -> Lexer<'src, 'd> {
        Lexer {
            cursor: 0,
            line: 1,
            file,
            chars: source.chars().peekable(),
            tokens: TokenList::new(source.len() / 4),
            source,
            diagnostics,
            line_start: true,
            past_first_statement: false,
        }
    }

    fn loc(&self) -> SourceLoc {
        SourceLoc::new(self.file, self.line)
    }

    fn start_range(&self) -> u32 {
        self.cursor
    }

    fn make_range(&self, start: u32) -> (u32, u32) {
        (start, self.cursor)
    }

    fn text(&self, start: u32) -> &'src str {
        &self.source[start as usize..self.cursor as usize]
    }

    fn at(&mut self, c: char) -> bool {
        self.peek() == Some(c)
    }

    fn at_next(&self, c: char) -> bool {
        self.peek_next() == Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.chars.clone();
        iter.next();
        iter.peek().copied()
    }

    fn bump(&mut self, c: char) {
        self.cursor += c.len_utf8() as u32;
        self.chars.next();
        if c == '\n' {
            self.line += 1;
            self.line_start = true;
        }
    }

    fn eat(&mut self, c: char) -> bool {
        if self.at(c) {
            self.bump(c);
            true
        } else {
            false
        }
    }

    fn add_token(&mut self, token: Token, loc: SourceLoc, start: u32) {
        let range = self.make_range(start);
        self.tokens.add_token(token, loc, range);
        self.line_start = false;
        self.past_first_statement = true;
    }

    fn add_literal(&mut self, token: Token, value: ConstValue, loc: SourceLoc, start: u32) {
        let range = self.make_range(start);
        self.tokens.add_literal(token, value, loc, range);
        self.line_start = false;
        self.past_first_statement = true;
    }
}

fn source_file(lex: &mut Lexer) {
    while lex.peek().is_some() {
        lex_whitespace(lex);

        if let Some(c) = lex.peek() {
            if c == '#' && lex.line_start {
                lex_directive(lex);
            } else if c.is_ascii_digit() || (c == '.' && lex.peek_next().is_some_and(|n| n.is_ascii_digit())) {
                lex_number(lex, c);
            } else if c.is_ascii_alphabetic() || c == '_' {
                lex_ident(lex, c);
            } else {
                lex_symbol(lex, c);
            }
        }
    }

    let loc = lex.loc();
    let end = lex.cursor;
    lex.tokens.add_token(Token::Eof, loc, (end, end));
    lex.tokens.add_token(Token::Eof, loc, (end, end));
}

fn lex_whitespace(lex: &mut Lexer) {
    while let Some(c) = lex.peek() {
        if c.is_ascii_whitespace() {
            lex.bump(c);
        } else if c == '/' && lex.at_next('/') {
            while let Some(c) = lex.peek() {
                if c == '\n' {
                    break;
                }
                lex.bump(c);
            }
        } else if c == '/' && lex.at_next('*') {
            let loc = lex.loc();
            let line_start = lex.line_start;
            lex.bump('/');
            lex.bump('*');

            let mut terminated = false;
            while let Some(c) = lex.peek() {
                lex.bump(c);
                if c == '*' && lex.eat('/') {
                    terminated = true;
                    break;
                }
            }
            if !terminated {
                lex.diagnostics.report(DiagnosticId::EofInComment, loc, "");
            }
            // a comment on a single line does not end the directive position
            if lex.loc().line == loc.line {
                lex.line_start = line_start;
            }
        } else {
            break;
        }
    }
}

fn lex_ident(lex: &mut Lexer, fc: char) {
    let loc = lex.loc();
    let start = lex.start_range();
    lex.bump(fc);

    while let Some(c) = lex.peek() {
        if c.is_ascii_alphanumeric() || c == '_' {
            lex.bump(c);
        } else {
            break;
        }
    }

    let string = lex.text(start);
    let token = match Token::as_keyword(string) {
        Some(keyword) => keyword,
        None => {
            if RESERVED_WORDS.contains(&string) {
                lex.diagnostics
                    .write_info(Severity::Error, loc, "Illegal use of reserved word", string, "");
            }
            Token::Ident
        }
    };
    lex.add_token(token, loc, start);
}

fn lex_symbol(lex: &mut Lexer, fc: char) {
    let loc = lex.loc();
    let start = lex.start_range();
    lex.bump(fc);

    let mut token = match Token::from_char(fc) {
        Some(sym) => sym,
        None => {
            let text = fc.to_string();
            lex.diagnostics.report(DiagnosticId::InvalidCharacter, loc, &text);
            return;
        }
    };

    if let Some(c) = lex.peek() {
        if let Some(sym) = Token::glue_double(c, token) {
            lex.bump(c);
            token = sym;

            if let Some(c) = lex.peek() {
                if let Some(sym) = Token::glue_triple(c, token) {
                    lex.bump(c);
                    token = sym;
                }
            }
        }
    }

    lex.add_token(token, loc, start);
}

fn lex_number(lex: &mut Lexer, fc: char) {
    let loc = lex.loc();
    let start = lex.start_range();

    if fc == '0' && matches!(lex.peek_next(), Some('x') | Some('X')) {
        lex.bump(fc);
        if let Some(x) = lex.peek() {
            lex.bump(x);
        }
        lex_integer(lex, loc, start, 16);
        return;
    }

    skip_num_digits(lex);
    let mut is_float = false;

    if lex.at('.') {
        lex.bump('.');
        skip_num_digits(lex);
        is_float = true;
    }
    if lex.at('e') || lex.at('E') {
        if let Some(e) = lex.peek() {
            lex.bump(e);
        }
        if let Some(sign) = lex.peek() {
            if sign == '+' || sign == '-' {
                lex.bump(sign);
            }
        }
        if !lex.peek().is_some_and(|c| c.is_ascii_digit()) {
            skip_ident_tail(lex);
            let text = lex.text(start);
            lex.diagnostics.report(DiagnosticId::InvalidNumber, loc, text);
            lex.add_literal(Token::FloatLit, ConstValue::Float(0.0), loc, start);
            return;
        }
        skip_num_digits(lex);
        is_float = true;
    }

    if is_float {
        lex_float(lex, loc, start);
    } else if fc == '0' && lex.text(start).len() > 1 {
        lex_integer(lex, loc, start, 8);
    } else {
        lex_integer(lex, loc, start, 10);
    }
}

fn skip_num_digits(lex: &mut Lexer) {
    while let Some(c) = lex.peek() {
        if !c.is_ascii_digit() {
            return;
        }
        lex.bump(c);
    }
}

/// consumes trailing identifier characters glued to a malformed number
fn skip_ident_tail(lex: &mut Lexer) {
    while let Some(c) = lex.peek() {
        if !(c.is_ascii_alphanumeric() || c == '_' || c == '.') {
            return;
        }
        lex.bump(c);
    }
}

fn lex_float(lex: &mut Lexer, loc: SourceLoc, start: u32) {
    if lex.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
        skip_ident_tail(lex);
        let text = lex.text(start);
        lex.diagnostics.report(DiagnosticId::InvalidNumber, loc, text);
        lex.add_literal(Token::FloatLit, ConstValue::Float(0.0), loc, start);
        return;
    }

    let text = lex.text(start);
    let value = match text.parse::<f32>() {
        Ok(value) if value.is_infinite() => {
            lex.diagnostics.report(DiagnosticId::FloatOverflow, loc, text);
            f32::MAX
        }
        Ok(value) => value,
        Err(_) => {
            lex.diagnostics.report(DiagnosticId::InvalidNumber, loc, text);
            0.0
        }
    };
    lex.add_literal(Token::FloatLit, ConstValue::Float(value), loc, start);
}

/// integers wrap into 32 bits, `0xFFFFFFFF` is `-1`
fn lex_integer(lex: &mut Lexer, loc: SourceLoc, start: u32, radix: u32) {
    let digits_start = match radix {
        16 => start as usize + 2,
        _ => start as usize,
    };
    while let Some(c) = lex.peek() {
        if !c.is_digit(radix.max(10)) && !(radix == 16 && c.is_ascii_hexdigit()) {
            break;
        }
        lex.bump(c);
    }

    let source = lex.source;
    let digits = &source[digits_start..lex.cursor as usize];
    let glued = lex.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
    if glued || digits.is_empty() || digits.chars().any(|c| !c.is_digit(radix)) {
        skip_ident_tail(lex);
        let text = lex.text(start);
        lex.diagnostics.report(DiagnosticId::InvalidNumber, loc, text);
        lex.add_literal(Token::IntLit, ConstValue::Int(0), loc, start);
        return;
    }

    let value = match u64::from_str_radix(digits, radix) {
        Ok(value) if value <= u32::MAX as u64 => value as u32 as i32,
        _ => {
            let text = lex.text(start);
            lex.diagnostics.report(DiagnosticId::IntegerOverflow, loc, text);
            i32::MAX
        }
    };
    lex.add_literal(Token::IntLit, ConstValue::Int(value), loc, start);
}

const UNSUPPORTED_DIRECTIVES: &[&str] =
    &["define", "undef", "if", "ifdef", "ifndef", "else", "elif", "endif", "line"];

fn lex_directive(lex: &mut Lexer) {
    let loc = lex.loc();
    lex.bump('#');
    let start = lex.start_range();

    while let Some(c) = lex.peek() {
        if c == '\n' {
            break;
        }
        lex.bump(c);
    }
    let at_eof = lex.peek().is_none();

    let mut text = lex.text(start);
    if let Some(comment) = text.find("//") {
        text = &text[..comment];
    }
    let words = directive_words(text);
    let first_statement = !lex.past_first_statement;
    lex.past_first_statement = true;

    let Some(&name) = words.first() else {
        return;
    };
    if at_eof {
        lex.diagnostics.report(DiagnosticId::EofInDirective, loc, name);
    }

    let directive = match name {
        "version" => directive_version(lex, loc, &words, first_statement),
        "extension" => directive_extension(lex, loc, &words),
        "pragma" => directive_pragma(lex, loc, &words),
        "error" => {
            let msg = text.trim_start().trim_start_matches("error").trim();
            Some(Directive::Error { msg: msg.to_string() })
        }
        _ if UNSUPPORTED_DIRECTIVES.contains(&name) => {
            lex.diagnostics.report(DiagnosticId::UnsupportedDirective, loc, name);
            None
        }
        _ => {
            lex.diagnostics.report(DiagnosticId::DirectiveInvalidName, loc, name);
            None
        }
    };

    if let Some(directive) = directive {
        log::trace!("directive at {}: {:?}", loc, directive);
        lex.tokens.add_directive(loc, directive);
    }
}

/// splits a directive line into identifier-like words and single punctuation
fn directive_words(text: &str) -> Vec<&str> {
    let mut words = Vec::new();
    let mut word_start = None;

    for (idx, c) in text.char_indices() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
            if word_start.is_none() {
                word_start = Some(idx);
            }
            continue;
        }
        if let Some(start) = word_start.take() {
            words.push(&text[start..idx]);
        }
        if !c.is_whitespace() {
            words.push(&text[idx..idx + c.len_utf8()]);
        }
    }
    if let Some(start) = word_start {
        words.push(&text[start..]);
    }
    words
}

fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn directive_version(
    lex: &mut Lexer,
    loc: SourceLoc,
    words: &[&str],
    first_statement: bool,
) -> Option<Directive> {
    if !first_statement {
        lex.diagnostics.report(DiagnosticId::VersionNotFirstStatement, loc, "version");
        return None;
    }
    match words {
        [_, number] => match number.parse::<i32>() {
            Ok(number) => Some(Directive::Version { number }),
            Err(_) => {
                lex.diagnostics.report(DiagnosticId::InvalidVersionNumber, loc, number);
                None
            }
        },
        [_] => {
            lex.diagnostics.report(DiagnosticId::InvalidVersionDirective, loc, "version");
            None
        }
        [_, _, unexpected, ..] => {
            lex.diagnostics.report(DiagnosticId::InvalidVersionDirective, loc, unexpected);
            None
        }
        [] => None,
    }
}

fn directive_extension(lex: &mut Lexer, loc: SourceLoc, words: &[&str]) -> Option<Directive> {
    match words {
        [_, name, ":", behavior] => {
            if !is_identifier(name) {
                lex.diagnostics.report(DiagnosticId::InvalidExtensionName, loc, name);
                return None;
            }
            if !is_identifier(behavior) {
                lex.diagnostics.report(DiagnosticId::InvalidExtensionDirective, loc, behavior);
                return None;
            }
            Some(Directive::Extension { name: name.to_string(), behavior: behavior.to_string() })
        }
        [_, name, ..] if !is_identifier(name) => {
            lex.diagnostics.report(DiagnosticId::InvalidExtensionName, loc, name);
            None
        }
        [_, _, unexpected, ..] if *unexpected != ":" => {
            lex.diagnostics.report(DiagnosticId::InvalidExtensionDirective, loc, unexpected);
            None
        }
        _ => {
            lex.diagnostics.report(DiagnosticId::InvalidExtensionDirective, loc, "extension");
            None
        }
    }
}

fn directive_pragma(lex: &mut Lexer, loc: SourceLoc, words: &[&str]) -> Option<Directive> {
    let (stdgl, rest) = match words {
        [_] => return None,
        [_, "STDGL", rest @ ..] => (true, rest),
        [_, rest @ ..] => (false, rest),
        [] => return None,
    };

    let pragma = |name: &str, value: &str| Directive::Pragma {
        name: name.to_string(),
        value: value.to_string(),
        stdgl,
    };
    match rest {
        [name] if is_identifier(name) => Some(pragma(name, "")),
        [name, "(", value, ")"] if is_identifier(name) => Some(pragma(name, value)),
        [] if stdgl => None,
        _ => {
            let name = rest.first().copied().unwrap_or("pragma");
            lex.diagnostics.report(DiagnosticId::UnrecognizedPragma, loc, name);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::T;

    fn tokens(source: &str) -> (TokenList, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let tokens = lex(source, 0, &mut diagnostics);
        (tokens, diagnostics)
    }

    fn kinds(list: &TokenList) -> Vec<Token> {
        (0..list.len()).map(|idx| list.token(idx)).collect()
    }

    #[test]
    fn keywords_symbols_and_lines() {
        let (list, diagnostics) = tokens("void main() {\n  x += 1.5;\n}");
        assert_eq!(diagnostics.num_errors(), 0);
        assert_eq!(
            kinds(&list),
            vec![
                T![void], T![ident], T!['('], T![')'], T!['{'],
                T![ident], T![+=], T![float_lit], T![;], T!['}'],
                T![eof], T![eof],
            ]
        );
        assert_eq!(list.loc(5).line, 2);
        assert_eq!(list.loc(9).line, 3);
        assert_eq!(&"void main() {\n  x += 1.5;\n}"[list.span(1)], "main");
        assert_eq!(list.literal(7), Some(ConstValue::Float(1.5)));
        assert_eq!(list.literal(6), None);
    }

    #[test]
    fn number_forms() {
        let (list, diagnostics) = tokens("10 010 0x1F 0xFFFFFFFF .5 1e2 2.");
        assert_eq!(diagnostics.num_errors(), 0);
        assert_eq!(list.literal(0), Some(ConstValue::Int(10)));
        assert_eq!(list.literal(1), Some(ConstValue::Int(8)));
        assert_eq!(list.literal(2), Some(ConstValue::Int(31)));
        assert_eq!(list.literal(3), Some(ConstValue::Int(-1)));
        assert_eq!(list.literal(4), Some(ConstValue::Float(0.5)));
        assert_eq!(list.literal(5), Some(ConstValue::Float(100.0)));
        assert_eq!(list.literal(6), Some(ConstValue::Float(2.0)));
    }

    #[test]
    fn malformed_numbers() {
        let (_, diagnostics) = tokens("09 1e 12abc 99999999999");
        assert_eq!(diagnostics.num_errors(), 4);
        assert!(diagnostics.info_log().contains("'09' : invalid number"));
        assert!(diagnostics.info_log().contains("'99999999999' : integer overflow"));
    }

    #[test]
    fn comments_keep_line_count() {
        let (list, diagnostics) = tokens("/* a\n b */ x // c\ny");
        assert_eq!(diagnostics.num_errors(), 0);
        assert_eq!(list.loc(0).line, 2);
        assert_eq!(list.loc(1).line, 3);

        let (_, diagnostics) = tokens("x /* open");
        assert_eq!(diagnostics.num_errors(), 1);
    }

    #[test]
    fn reserved_words_and_invalid_characters() {
        let (list, diagnostics) = tokens("float goto; @");
        assert_eq!(diagnostics.num_errors(), 2);
        assert_eq!(list.token(1), T![ident]);
        assert!(diagnostics.info_log().contains("'goto' : Illegal use of reserved word"));
        assert!(diagnostics.info_log().contains("'@' : invalid character"));
    }

    #[test]
    fn directives_are_stamped_with_token_index() {
        let source = "#version 100\n#extension GL_OES_standard_derivatives : enable\nfloat x;\n#pragma optimize(off)\n";
        let (list, diagnostics) = tokens(source);
        assert_eq!(diagnostics.num_errors(), 0);
        let directives = list.directives();
        assert_eq!(directives.len(), 3);
        assert_eq!(directives[0].0, 0);
        assert_eq!(directives[0].2, Directive::Version { number: 100 });
        assert_eq!(
            directives[1].2,
            Directive::Extension {
                name: "GL_OES_standard_derivatives".to_string(),
                behavior: "enable".to_string()
            }
        );
        assert_eq!(directives[2].0, 3);
        assert_eq!(directives[2].1.line, 4);
        assert_eq!(
            directives[2].2,
            Directive::Pragma { name: "optimize".to_string(), value: "off".to_string(), stdgl: false }
        );
    }

    #[test]
    fn directive_errors() {
        let (_, diagnostics) = tokens("float x;\n#version 100\n");
        assert!(diagnostics.info_log().contains("#version directive must occur before anything else"));

        let (_, diagnostics) = tokens("#define FOO 1\n#foo\n#extension : enable\n");
        assert_eq!(diagnostics.num_errors(), 3);
        assert!(diagnostics.info_log().contains("'define' : unsupported preprocessor directive"));
        assert!(diagnostics.info_log().contains("'foo' : invalid directive name"));

        let (list, diagnostics) = tokens("#pragma STDGL invariant(all)\n#error stop here\n");
        assert_eq!(diagnostics.num_errors(), 0);
        assert_eq!(
            list.directives()[0].2,
            Directive::Pragma { name: "invariant".to_string(), value: "all".to_string(), stdgl: true }
        );
        assert_eq!(list.directives()[1].2, Directive::Error { msg: "stop here".to_string() });
    }
}
