//! Minimal DOT reader
//!
//! Accepts the subset of DOT used to describe causal graphs:
//! `digraph [name] { a -> b -> c; "quoted id"; x [attr=...]; }`.
//! Attribute lists are skipped and `//` or `#` comments run to end of line.

use super::CausalError;

/// Nodes and edges read from a DOT document, in order of appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedGraph {
    pub nodes: Vec<String>,
    pub edges: Vec<(String, String)>,
}

impl ParsedGraph {
    fn add_node(&mut self, name: &str) {
        if !self.nodes.iter().any(|n| n == name) {
            self.nodes.push(name.to_string());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Id(String),
    Arrow,
    Open,
    Close,
    Semi,
    Attributes,
}

fn tokenize(text: &str) -> Result<Vec<Token>, CausalError> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() || c == ',' => {
                chars.next();
            }
            '#' => {
                while chars.next().is_some_and(|c| c != '\n') {}
            }
            '/' => {
                chars.next();
                if chars.next() != Some('/') {
                    return Err(CausalError::GraphParse("unexpected '/'".to_string()));
                }
                while chars.next().is_some_and(|c| c != '\n') {}
            }
            '{' => {
                chars.next();
                tokens.push(Token::Open);
            }
            '}' => {
                chars.next();
                tokens.push(Token::Close);
            }
            ';' => {
                chars.next();
                tokens.push(Token::Semi);
            }
            '[' => {
                while chars.next().is_some_and(|c| c != ']') {}
                tokens.push(Token::Attributes);
            }
            '-' => {
                chars.next();
                if chars.next() != Some('>') {
                    return Err(CausalError::GraphParse(
                        "expected '->' (undirected edges are not allowed)".to_string(),
                    ));
                }
                tokens.push(Token::Arrow);
            }
            '"' => {
                chars.next();
                let mut id = String::new();
                loop {
                    match chars.next() {
                        Some('\\') => match chars.next() {
                            Some(escaped) => id.push(escaped),
                            None => break,
                        },
                        Some('"') => {
                            tokens.push(Token::Id(id));
                            break;
                        }
                        Some(other) => id.push(other),
                        None => {
                            return Err(CausalError::GraphParse(
                                "unterminated quoted identifier".to_string(),
                            ))
                        }
                    }
                }
            }
            c if c.is_alphanumeric() || c == '_' || c == '.' => {
                let mut id = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' || c == '.' {
                        id.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Id(id));
            }
            other => {
                return Err(CausalError::GraphParse(format!(
                    "unexpected character '{}'",
                    other
                )))
            }
        }
    }

    Ok(tokens)
}

/// Parses a `digraph` document.
pub fn parse_digraph(text: &str) -> Result<ParsedGraph, CausalError> {
    let tokens = tokenize(text)?;
    let mut iter = tokens.into_iter().peekable();

    match iter.next() {
        Some(Token::Id(keyword)) if keyword.eq_ignore_ascii_case("digraph") => {}
        _ => {
            return Err(CausalError::GraphParse(
                "graph must start with 'digraph'".to_string(),
            ))
        }
    }
    if let Some(Token::Id(_)) = iter.peek() {
        iter.next();
    }
    if iter.next() != Some(Token::Open) {
        return Err(CausalError::GraphParse("expected '{'".to_string()));
    }

    let mut graph = ParsedGraph::default();
    let mut chain: Vec<String> = Vec::new();
    let mut expecting_id = false;

    let flush = |graph: &mut ParsedGraph, chain: &mut Vec<String>| {
        for name in chain.iter() {
            graph.add_node(name);
        }
        for pair in chain.windows(2) {
            graph.edges.push((pair[0].clone(), pair[1].clone()));
        }
        chain.clear();
    };

    loop {
        match iter.next() {
            Some(Token::Id(name)) => {
                if !chain.is_empty() && !expecting_id {
                    flush(&mut graph, &mut chain);
                }
                chain.push(name);
                expecting_id = false;
            }
            Some(Token::Arrow) => {
                if chain.is_empty() || expecting_id {
                    return Err(CausalError::GraphParse(
                        "'->' must follow a node".to_string(),
                    ));
                }
                expecting_id = true;
            }
            Some(Token::Semi) | Some(Token::Attributes) => {
                if expecting_id {
                    return Err(CausalError::GraphParse(
                        "edge is missing its target".to_string(),
                    ));
                }
                flush(&mut graph, &mut chain);
            }
            Some(Token::Close) => {
                if expecting_id {
                    return Err(CausalError::GraphParse(
                        "edge is missing its target".to_string(),
                    ));
                }
                flush(&mut graph, &mut chain);
                break;
            }
            Some(Token::Open) => {
                return Err(CausalError::GraphParse(
                    "subgraphs are not supported".to_string(),
                ))
            }
            None => return Err(CausalError::GraphParse("expected '}'".to_string())),
        }
    }

    if iter.next().is_some() {
        return Err(CausalError::GraphParse(
            "unexpected content after '}'".to_string(),
        ));
    }

    Ok(graph)
}
