#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// Single-character group name
    Group(char),
    And, // *
    Or,  // |
    LParen,
    RParen,
}

/// Every character is a token; anything that is not `*`, `|`, `(` or `)` names a group.
pub fn tokenize(input: &str) -> Vec<Token> {
    input
        .chars()
        .map(|c| match c {
            '*' => Token::And,
            '|' => Token::Or,
            '(' => Token::LParen,
            ')' => Token::RParen,
            name => Token::Group(name),
        })
        .collect()
}
