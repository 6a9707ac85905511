//! Tokenization of directive lines.
//!
//! A line holds one or more commands separated by `;` or newlines. Words are
//! split on blanks; `{...}` groups a word literally (braces nest) and
//! `"..."` groups a word with `\` escapes. A `#` where a command would start
//! comments out the rest of the line.

use thiserror::Error;

/// Represents a token resulting from lexical analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A single word of a command.
    Word(String),
    /// End of a command, `;` or a newline.
    Separator,
}

/// Errors that can occur during the lexical analysis process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexingError {
    /// A closing double quote was not found.
    #[error("missing close-quote")]
    UnfinishedQuote,
    /// A closing brace was not found.
    #[error("missing close-brace")]
    UnfinishedBrace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    ReadingQuote,
    ReadingBrace(usize), // nesting depth
    Comment,
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    // A quoted or braced word may be empty, so track that a word was opened.
    in_word: bool,
    buffer: String,
    // True when the last emitted token ends a command.
    at_command_start: bool,
}

impl LexingFSM {
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Start,
            in_word: false,
            buffer: String::new(),
            at_command_start: true,
        }
    }

    fn make_tokens(&mut self) -> Result<Vec<Token>, LexingError> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Start => self.handle_start(ch, &mut out),
                LexingState::ReadingWord => self.handle_word(ch, &mut out),
                LexingState::ReadingQuote => self.handle_quote(ch),
                LexingState::ReadingBrace(depth) => self.handle_brace(ch, depth),
                LexingState::Comment => {
                    if ch == '\n' {
                        self.state = LexingState::Start;
                    }
                }
            }
        }

        match self.state {
            LexingState::ReadingQuote => return Err(LexingError::UnfinishedQuote),
            LexingState::ReadingBrace(_) => return Err(LexingError::UnfinishedBrace),
            _ => {}
        }

        self.finish_word(&mut out);
        Ok(out)
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn handle_start(&mut self, ch: char, out: &mut Vec<Token>) {
        match ch {
            ' ' | '\t' | '\r' => {}
            ';' | '\n' => self.push_separator(out),
            '#' if self.at_command_start => self.state = LexingState::Comment,
            '"' => {
                self.in_word = true;
                self.state = LexingState::ReadingQuote;
            }
            '{' => {
                self.in_word = true;
                self.state = LexingState::ReadingBrace(1);
            }
            c => {
                self.in_word = true;
                self.buffer.push(c);
                self.state = LexingState::ReadingWord;
            }
        }
    }

    fn handle_word(&mut self, ch: char, out: &mut Vec<Token>) {
        match ch {
            ' ' | '\t' | '\r' => {
                self.finish_word(out);
                self.state = LexingState::Start;
            }
            ';' | '\n' => {
                self.finish_word(out);
                self.push_separator(out);
                self.state = LexingState::Start;
            }
            c => self.buffer.push(c),
        }
    }

    fn handle_quote(&mut self, ch: char) {
        match ch {
            '"' => self.state = LexingState::ReadingWord,
            '\\' => {
                if let Some(next) = self.read_char() {
                    self.buffer.push(match next {
                        'n' => '\n',
                        't' => '\t',
                        other => other,
                    });
                }
            }
            c => self.buffer.push(c),
        }
    }

    fn handle_brace(&mut self, ch: char, depth: usize) {
        match ch {
            '{' => {
                self.buffer.push(ch);
                self.state = LexingState::ReadingBrace(depth + 1);
            }
            '}' if depth == 1 => self.state = LexingState::ReadingWord,
            '}' => {
                self.buffer.push(ch);
                self.state = LexingState::ReadingBrace(depth - 1);
            }
            c => self.buffer.push(c),
        }
    }

    fn finish_word(&mut self, out: &mut Vec<Token>) {
        if self.in_word {
            out.push(Token::Word(std::mem::take(&mut self.buffer)));
            self.in_word = false;
            self.at_command_start = false;
        }
    }

    fn push_separator(&mut self, out: &mut Vec<Token>) {
        out.push(Token::Separator);
        self.at_command_start = true;
    }
}

/// Tokenize a directive line.
pub fn split_into_tokens(line: &str) -> Result<Vec<Token>, LexingError> {
    LexingFSM::new(line).make_tokens()
}

/// Split a directive line into commands, each a list of words.
///
/// Empty commands (`;;`, blank lines, comments) are dropped.
pub fn split_into_commands(line: &str) -> Result<Vec<Vec<String>>, LexingError> {
    let mut commands = Vec::new();
    let mut current = Vec::new();
    for token in split_into_tokens(line)? {
        match token {
            Token::Word(word) => current.push(word),
            Token::Separator => {
                if !current.is_empty() {
                    commands.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        commands.push(current);
    }
    Ok(commands)
}
