//! Configuration file parser
//!
//! The file is a list of `key = value` statements, optionally terminated
//! by `;`. Values are bare words or double-quoted strings, and `#` starts
//! a comment. `frontend` and `pem-file` also accept a `{ ... }` block of
//! nested statements:
//!
//! ```text
//! backend = "[127.0.0.1]:6086"
//! frontend = {
//!     host = "*"
//!     port = "443"
//!     pem-file = "/etc/tlsfront/site.pem"
//! }
//! ```
//!
//! Plain statements are handed to [`Configuration::validate`] one by one.

use log::{debug, warn};
use std::fs;
use std::io::{self, Read};
use std::path::Path;

use crate::config::cert::CertFile;
use crate::config::endpoint::parse_port;
use crate::config::error::{ConfigError, Result};
use crate::config::frontend::Frontend;
use crate::config::scalar::parse_bool;
use crate::config::types::{Configuration, Origin, Toggle, ValueSource};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Word(String),
    Str(String),
    Eq,
    Open,
    Close,
    Semi,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    tok: Tok,
    line: usize,
}

/// Parsed statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub key: String,
    pub value: Value,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Scalar(String),
    Block(Vec<Statement>),
}

fn is_bare(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '=' | '{' | '}' | ';' | '#' | '"')
}

fn unterminated(file: &str, line: usize) -> ConfigError {
    ConfigError::Syntax {
        file: file.to_string(),
        line,
        message: "unterminated string".to_string(),
    }
}

fn tokenize(text: &str, file: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    let mut line = 1;

    while let Some(c) = chars.next() {
        let tok = match c {
            '\n' => {
                line += 1;
                continue;
            }
            c if c.is_whitespace() => continue,
            '#' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        line += 1;
                        break;
                    }
                }
                continue;
            }
            '=' => Tok::Eq,
            '{' => Tok::Open,
            '}' => Tok::Close,
            ';' => Tok::Semi,
            '"' => {
                let start = line;
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(e @ ('"' | '\\')) => s.push(e),
                            Some(other) => {
                                if other == '\n' {
                                    line += 1;
                                }
                                s.push('\\');
                                s.push(other);
                            }
                            None => return Err(unterminated(file, start)),
                        },
                        Some(other) => {
                            if other == '\n' {
                                line += 1;
                            }
                            s.push(other);
                        }
                        None => return Err(unterminated(file, start)),
                    }
                }
                tokens.push(Token { tok: Tok::Str(s), line: start });
                continue;
            }
            c => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if !is_bare(next) {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                Tok::Word(word)
            }
        };
        tokens.push(Token { tok, line });
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    file: &'a str,
}

impl<'a> Parser<'a> {
    fn syntax(&self, line: usize, message: impl Into<String>) -> ConfigError {
        ConfigError::Syntax {
            file: self.file.to_string(),
            line,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn last_line(&self) -> usize {
        self.tokens.last().map_or(1, |t| t.line)
    }

    /// Statements up to the end of input, or up to `}` when `nested`
    fn statements(&mut self, nested: bool) -> Result<Vec<Statement>> {
        let mut out = Vec::new();

        loop {
            let Some(token) = self.next() else {
                if nested {
                    return Err(self.syntax(self.last_line(), "missing '}'"));
                }
                return Ok(out);
            };

            let key = match token.tok {
                Tok::Close if nested => return Ok(out),
                Tok::Semi => continue,
                Tok::Word(word) => word,
                other => {
                    return Err(self.syntax(token.line, format!("unexpected {:?}", other)))
                }
            };

            if !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
                return Err(self.syntax(token.line, format!("invalid key '{}'", key)));
            }

            match self.next() {
                Some(Token { tok: Tok::Eq, .. }) => {}
                _ => return Err(self.syntax(token.line, format!("expected '=' after '{}'", key))),
            }

            let value = match self.next() {
                Some(Token { tok: Tok::Word(v), .. }) | Some(Token { tok: Tok::Str(v), .. }) => {
                    Value::Scalar(v)
                }
                Some(Token { tok: Tok::Open, .. }) => Value::Block(self.statements(true)?),
                _ => return Err(self.syntax(token.line, format!("missing value for '{}'", key))),
            };

            if let Some(Token { tok: Tok::Semi, .. }) = self.peek() {
                self.pos += 1;
            }

            out.push(Statement {
                key,
                value,
                line: token.line,
            });
        }
    }
}

/// Parse configuration text into statements without applying them
pub fn parse_statements(text: &str, file: &str) -> Result<Vec<Statement>> {
    let tokens = tokenize(text, file)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        file,
    };
    parser.statements(false)
}

/// Read and apply a configuration file; `-` reads standard input
pub fn parse_file(path: &Path, config: &mut Configuration) -> Result<()> {
    let text = if path.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .map_err(|source| ConfigError::FileRead {
                path: path.to_path_buf(),
                source,
            })?;
        text
    } else {
        fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?
    };

    debug!("Parsing configuration file {}", path.display());
    parse_str(&text, &path.display().to_string(), config)
}

/// Apply configuration text; `file` is used in error messages
pub fn parse_str(text: &str, file: &str, config: &mut Configuration) -> Result<()> {
    for stmt in parse_statements(text, file)? {
        apply(&stmt, file, config)?;
    }
    Ok(())
}

fn apply(stmt: &Statement, file: &str, config: &mut Configuration) -> Result<()> {
    let origin = Origin::File {
        file,
        line: stmt.line,
    };

    match (stmt.key.as_str(), &stmt.value) {
        (_, Value::Scalar(value)) => config.validate(&stmt.key, value, origin),
        ("frontend", Value::Block(body)) => {
            let frontend = frontend_from_block(body, file)?;
            config
                .frontends
                .add(frontend)
                .map_err(|e| origin.wrap(&stmt.key, e))?;
            config.sources.insert("frontend", ValueSource::File);
            Ok(())
        }
        ("pem-file", Value::Block(body)) => {
            let cert = cert_from_block(body, file)?;
            config.certs.promote(cert);
            config.sources.insert("pem-file", ValueSource::File);
            Ok(())
        }
        (key, Value::Block(_)) => Err(ConfigError::Syntax {
            file: file.to_string(),
            line: stmt.line,
            message: format!("'{}' does not take a block", key),
        }),
    }
}

fn scalar<'s>(stmt: &'s Statement, file: &str) -> Result<&'s str> {
    match &stmt.value {
        Value::Scalar(v) => Ok(v.as_str()),
        Value::Block(_) => Err(ConfigError::Syntax {
            file: file.to_string(),
            line: stmt.line,
            message: format!("'{}' does not take a block", stmt.key),
        }),
    }
}

fn frontend_from_block(body: &[Statement], file: &str) -> Result<Frontend> {
    let mut frontend = Frontend::default();

    for stmt in body {
        let origin = Origin::File {
            file,
            line: stmt.line,
        };
        apply_frontend_key(&mut frontend, stmt, file).map_err(|e| match e {
            ConfigError::Syntax { .. } | ConfigError::InFile { .. } => e,
            other => origin.wrap(&stmt.key, other),
        })?;
    }

    Ok(frontend)
}

fn apply_frontend_key(frontend: &mut Frontend, stmt: &Statement, file: &str) -> Result<()> {
    if stmt.key == "pem-file" {
        let cert = match &stmt.value {
            Value::Scalar(path) => CertFile::verified(path.as_str())?,
            Value::Block(body) => cert_from_block(body, file)?,
        };
        frontend.add_cert(cert);
        return Ok(());
    }

    let value = scalar(stmt, file)?;
    match stmt.key.as_str() {
        "host" => {
            frontend.host = match value {
                "" | "*" => None,
                host => Some(host.to_string()),
            }
        }
        "port" => frontend.port = Some(parse_port(value)?),
        "match-global-certs" => frontend.match_global_certs = Toggle::from(parse_bool(value)?),
        "sni-nomatch-abort" => frontend.sni_nomatch_abort = Toggle::from(parse_bool(value)?),
        "prefer-server-ciphers" => {
            frontend.prefer_server_ciphers = Toggle::from(parse_bool(value)?)
        }
        "tls-protos" => frontend.tls_protos = Some(value.parse()?),
        "ciphers" if !value.is_empty() => frontend.ciphers = Some(value.to_string()),
        "ciphersuites" if !value.is_empty() => frontend.ciphersuites = Some(value.to_string()),
        "ciphers" | "ciphersuites" => {}
        "client-verify" => frontend.client_verify = Some(value.parse()?),
        "client-verify-ca" if !value.is_empty() => {
            frontend.client_verify_ca = Some(value.into())
        }
        "client-verify-ca" => {}
        other => warn!(
            "Ignoring unknown frontend key '{}' in configuration file '{}', line {}",
            other, file, stmt.line
        ),
    }
    Ok(())
}

fn cert_from_block(body: &[Statement], file: &str) -> Result<CertFile> {
    let mut cert = CertFile::new("");

    for stmt in body {
        let origin = Origin::File {
            file,
            line: stmt.line,
        };
        let value = scalar(stmt, file)?;
        match stmt.key.as_str() {
            "cert" => cert.filename = value.into(),
            "private-key" if !value.is_empty() => cert.private_key = Some(value.into()),
            "ocsp-resp-file" if !value.is_empty() => cert.ocsp_file = Some(value.into()),
            "private-key" | "ocsp-resp-file" => {}
            "ocsp-verify-staple" => {
                cert.ocsp_verify =
                    Toggle::from(parse_bool(value).map_err(|e| origin.wrap(&stmt.key, e))?)
            }
            other => warn!(
                "Ignoring unknown pem-file key '{}' in configuration file '{}', line {}",
                other, file, stmt.line
            ),
        }
    }

    let line = body.first().map_or(0, |s| s.line);
    cert.verify().map_err(|e| Origin::File { file, line }.wrap("pem-file", e))?;
    Ok(cert)
}
