//! Clause lexer.
//!
//! Clause text is untrusted. The lexer accepts words, numbers, string
//! literals and a fixed set of operators, keeps parentheses balanced and
//! rejects anything that could end or comment out the generated statement.

/// One lexical token of a clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    /// Identifier, keyword or function name.
    Word(String),
    /// Decoded content of a quoted string.
    Str(String),
    /// Unsigned numeric literal.
    Number(String),
    /// Operator or punctuation.
    Symbol(&'static str),
    /// A run of whitespace.
    Space,
}

impl Token {
    pub(crate) fn is_symbol(&self, symbol: &str) -> bool {
        matches!(self, Token::Symbol(s) if *s == symbol)
    }

    pub(crate) fn is_word(&self, word: &str) -> bool {
        matches!(self, Token::Word(w) if w.eq_ignore_ascii_case(word))
    }
}

const SYMBOLS: [&str; 17] = [
    "<>", "!=", "<=", ">=", "||", "=", "<", ">", "+", "-", "*", "/", "%", ",", "(", ")", ".",
];

/// Tokenizes one clause. Errors are messages for `InvalidClause`.
pub(crate) fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut tokens = Vec::new();
    let mut depth: usize = 0;

    let mut i = 0;
    while i < len {
        let c = chars[i];

        if c.is_whitespace() {
            while i < len && chars[i].is_whitespace() {
                i += 1;
            }
            tokens.push(Token::Space);
            continue;
        }

        if c == ';' {
            return Err("statement separators are not allowed".to_string());
        }
        if c == '#'
            || (i + 1 < len && c == '-' && chars[i + 1] == '-')
            || (i + 1 < len && c == '/' && chars[i + 1] == '*')
        {
            return Err("comments are not allowed".to_string());
        }

        if c == '\'' || c == '"' {
            let mut value = String::new();
            let mut closed = false;
            i += 1;
            while i < len {
                if chars[i] == c {
                    // A doubled quote is an escaped quote
                    if i + 1 < len && chars[i + 1] == c {
                        value.push(c);
                        i += 2;
                        continue;
                    }
                    closed = true;
                    i += 1;
                    break;
                }
                value.push(chars[i]);
                i += 1;
            }
            if !closed {
                return Err("unbalanced quotes".to_string());
            }
            tokens.push(Token::Str(value));
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < len && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Word(chars[start..i].iter().collect()));
            continue;
        }

        if c.is_ascii_digit() {
            let start = i;
            while i < len && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            if i < len && (chars[i].is_ascii_alphabetic() || chars[i] == '_') {
                return Err(format!(
                    "\"{}\" is not a valid number or identifier",
                    chars[start..=i].iter().collect::<String>()
                ));
            }
            tokens.push(Token::Number(chars[start..i].iter().collect()));
            continue;
        }

        let symbol = SYMBOLS.iter().find(|s| {
            s.chars()
                .enumerate()
                .all(|(k, sc)| i + k < len && chars[i + k] == sc)
        });
        match symbol {
            Some(&symbol) => {
                match symbol {
                    "(" => depth += 1,
                    ")" => {
                        depth = depth
                            .checked_sub(1)
                            .ok_or_else(|| "unbalanced parentheses".to_string())?;
                    }
                    _ => {}
                }
                i += symbol.len();
                tokens.push(Token::Symbol(symbol));
            }
            None => return Err(format!("unexpected character '{c}'")),
        }
    }

    if depth != 0 {
        return Err("unbalanced parentheses".to_string());
    }
    Ok(tokens)
}

/// Index of the first non-space token at or after `from`.
pub(crate) fn next_significant(tokens: &[Token], from: usize) -> usize {
    let mut i = from;
    while i < tokens.len() && tokens[i] == Token::Space {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_basic() {
        let tokens = tokenize("Year >= 1990 AND Books.Title <> 'It''s'").unwrap();
        let significant: Vec<&Token> = tokens.iter().filter(|t| **t != Token::Space).collect();
        assert_eq!(
            significant,
            vec![
                &Token::Word("Year".to_string()),
                &Token::Symbol(">="),
                &Token::Number("1990".to_string()),
                &Token::Word("AND".to_string()),
                &Token::Word("Books".to_string()),
                &Token::Symbol("."),
                &Token::Word("Title".to_string()),
                &Token::Symbol("<>"),
                &Token::Str("It's".to_string()),
            ]
        );
    }

    #[test]
    fn test_tokenize_rejects_escapes_from_clause() {
        assert!(tokenize("Year = 1; DROP TABLE Books").is_err());
        assert!(tokenize("Year = 1 -- trailing").is_err());
        assert!(tokenize("Year = 1 /* x */").is_err());
        assert!(tokenize("Year = 1 # x").is_err());
        assert!(tokenize("Title = 'open").is_err());
        assert!(tokenize("(Year = 1").is_err());
        assert!(tokenize("Year = 1)").is_err());
        assert!(tokenize("Year = `1`").is_err());
        assert!(tokenize("Year = 2abc").is_err());
    }

    #[test]
    fn test_separators_inside_strings_are_data() {
        let tokens = tokenize("Title = 'a; -- b /* c'").unwrap();
        assert_eq!(tokens.last(), Some(&Token::Str("a; -- b /* c".to_string())));
    }

    #[test]
    fn test_next_significant() {
        let tokens = tokenize("a   (").unwrap();
        assert_eq!(next_significant(&tokens, 1), 2);
        assert!(tokens[2].is_symbol("("));
        assert!(tokens[0].is_word("A"));
    }
}
