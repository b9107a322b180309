use std::fmt;

/// An error in the text of an expression or script, with where it happened.
/// Lines and columns are 1-based.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for SyntaxError {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenType {
    LeftParen,
    RightParen,

    // Anything unquoted: symbols, numbers, keywords.
    Word,

    // A quoted string. The token text has the quotes removed and escapes resolved.
    Str,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub token_type: TokenType,
    pub text: String,
    pub line: u32,
    pub column: u32,
}

impl Token {
    pub fn error(&self, message: &str) -> SyntaxError {
        SyntaxError {
            message: message.to_string(),
            line: self.line,
            column: self.column,
        }
    }
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || c == '(' || c == ')' || c == '"' || c == ';'
}

/// Splits text into tokens. Comments run from `;` to the end of the line.
pub fn scan(input: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut tokens = vec![];
    let mut chars = input.chars().peekable();
    let (mut line, mut column) = (1, 1);

    while let Some(&c) = chars.peek() {
        let (start_line, start_column) = (line, column);
        let mut advance = |c: char| {
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        };
        let token = |token_type, text: String| Token {
            token_type,
            text,
            line: start_line,
            column: start_column,
        };

        match c {
            ';' => {
                while let Some(&c) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    advance(c);
                    chars.next();
                }
            }
            c if c.is_whitespace() => {
                advance(c);
                chars.next();
            }
            '(' | ')' => {
                advance(c);
                chars.next();
                let token_type = if c == '(' {
                    TokenType::LeftParen
                } else {
                    TokenType::RightParen
                };
                tokens.push(token(token_type, c.to_string()));
            }
            '"' => {
                advance(c);
                chars.next();
                let mut text = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    advance(c);
                    match c {
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\\' => {
                            let Some(escaped) = chars.next() else {
                                break;
                            };
                            advance(escaped);
                            text.push(match escaped {
                                'n' => '\n',
                                't' => '\t',
                                other => other,
                            });
                        }
                        c => text.push(c),
                    }
                }
                let token = token(TokenType::Str, text);
                if !closed {
                    return Err(token.error("unterminated string"));
                }
                tokens.push(token);
            }
            _ => {
                let mut text = String::new();
                while let Some(&c) = chars.peek() {
                    if is_delimiter(c) {
                        break;
                    }
                    advance(c);
                    text.push(c);
                    chars.next();
                }
                tokens.push(token(TokenType::Word, text));
            }
        }
    }
    Ok(tokens)
}

/// A parsed s-expression. Every node keeps the token it started at, for error messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sexp {
    Word(Token),
    Str(Token),

    // The opening parenthesis, and the items.
    List(Token, Vec<Sexp>),
}

impl Sexp {
    pub fn token(&self) -> &Token {
        match self {
            Sexp::Word(token) | Sexp::Str(token) | Sexp::List(token, _) => token,
        }
    }

    pub fn error(&self, message: &str) -> SyntaxError {
        self.token().error(message)
    }

    pub fn as_word(&self) -> Option<&str> {
        match self {
            Sexp::Word(token) => Some(&token.text),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Sexp]> {
        match self {
            Sexp::List(_, items) => Some(items),
            _ => None,
        }
    }

    /// The head word and the arguments of a list like `(head arg ...)`.
    pub fn as_form(&self) -> Option<(&str, &[Sexp])> {
        let (head, args) = self.as_list()?.split_first()?;
        Some((head.as_word()?, args))
    }
}

impl fmt::Display for Sexp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Sexp::Word(token) => write!(f, "{}", token.text),
            Sexp::Str(token) => write!(f, "{:?}", token.text),
            Sexp::List(_, items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

struct Parser {
    tokens: std::iter::Peekable<std::vec::IntoIter<Token>>,
}

impl Parser {
    fn parse_sexp(&mut self, token: Token) -> Result<Sexp, SyntaxError> {
        match token.token_type {
            TokenType::Word => Ok(Sexp::Word(token)),
            TokenType::Str => Ok(Sexp::Str(token)),
            TokenType::RightParen => Err(token.error("unmatched right parenthesis")),
            TokenType::LeftParen => {
                let mut items = vec![];
                loop {
                    let Some(next) = self.tokens.next() else {
                        return Err(token.error("unmatched left parenthesis"));
                    };
                    if next.token_type == TokenType::RightParen {
                        return Ok(Sexp::List(token, items));
                    }
                    items.push(self.parse_sexp(next)?);
                }
            }
        }
    }
}

/// Parses every s-expression in the text.
pub fn parse(input: &str) -> Result<Vec<Sexp>, SyntaxError> {
    let mut parser = Parser {
        tokens: scan(input)?.into_iter().peekable(),
    };
    let mut answer = vec![];
    while let Some(token) = parser.tokens.next() {
        answer.push(parser.parse_sexp(token)?);
    }
    Ok(answer)
}

/// Parses text that must hold exactly one s-expression.
pub fn parse_one(input: &str) -> Result<Sexp, SyntaxError> {
    let mut items = parse(input)?;
    match items.len() {
        1 => Ok(items.remove(0)),
        0 => Err(SyntaxError {
            message: "expected an expression".to_string(),
            line: 1,
            column: 1,
        }),
        _ => Err(items[1].error("expected a single expression")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_positions() {
        let tokens = scan("(a\n  \"b c\") ; comment\n42").unwrap();
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["(", "a", "b c", ")", "42"]);
        assert_eq!((tokens[2].line, tokens[2].column), (2, 3));
        assert_eq!(tokens[2].token_type, TokenType::Str);
        assert_eq!((tokens[4].line, tokens[4].column), (3, 1));
    }

    #[test]
    fn test_parse_nested() {
        let items = parse("(f (g x) \"s\") y").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].to_string(), "(f (g x) \"s\")");
        let (head, args) = items[0].as_form().unwrap();
        assert_eq!(head, "f");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_parse_errors() {
        let err = parse("(a (b)").unwrap_err();
        assert_eq!((err.line, err.column), (1, 1));
        assert!(err.message.contains("left"));
        assert!(parse("a)").unwrap_err().message.contains("right"));
        assert!(scan("\"open").unwrap_err().message.contains("unterminated"));
        assert!(parse_one("a b").is_err());
        assert!(parse_one("").is_err());
    }
}
