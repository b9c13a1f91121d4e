//! # Vector Processing Module
//!
//! Minificazione SVG testuale basata su un tokenizer a espressioni regolari.
//!
//! ## Pipeline:
//! 1. Suddivide il markup in token: tag, testo, CDATA, commenti, istruzioni
//! 2. Verifica che il markup sia UTF-8, con radice `<svg>` e tag bilanciati
//! 3. Rimuove dichiarazione XML, commenti e blocchi `<metadata>`
//! 4. Comprime gli spazi dentro i tag e il testo composto solo da spazi
//!    tra un tag e l'altro
//!
//! Testo, sezioni CDATA e valori degli attributi vengono copiati byte per
//! byte. Il testo di `<text>`, `<style>`, `<script>` e degli elementi con
//! `xml:space="preserve"` non viene mai toccato.
//!
//! In caso di markup malformato l'adapter emette un warning e restituisce
//! i byte originali.

use crate::asset::Asset;
use crate::encoder::{AssetEncoder, WarningReporter};
use crate::error::OptimizeError;
use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// Elements whose character data is content, whitespace included
const TEXT_ELEMENTS: &[&str] = &["text", "tspan", "textPath", "tref", "title", "desc", "style", "script"];

/// Elements that can sit next to each other inside a run of text
const INLINE_TEXT_ELEMENTS: &[&str] = &["tspan", "textPath", "tref", "a"];

struct SvgPatterns {
    token: Regex,
    attribute_piece: Regex,
    xml_space: Regex,
}

impl SvgPatterns {
    fn get() -> &'static Self {
        static PATTERNS: OnceLock<SvgPatterns> = OnceLock::new();
        PATTERNS.get_or_init(|| {
            let compile = |pattern: &str| Regex::new(pattern).expect("static SVG pattern must compile");
            Self {
                token: compile(concat!(
                    r"(?s)<!\[CDATA\[.*?\]\]>",
                    r"|<!--.*?-->",
                    r"|<\?.*?\?>",
                    r"|<!DOCTYPE[^>\[]*(?:\[.*?\])?\s*>",
                    r#"|<(?P<close>/?)(?P<name>[A-Za-z_][\w:.\-]*)(?P<attrs>(?:[^<>"']|"[^"]*"|'[^']*')*?)(?P<selfclose>/?)>"#,
                )),
                attribute_piece: compile(r#""[^"]*"|'[^']*'|\s*=\s*|\s+|[^\s="']+"#),
                xml_space: compile(r#"(?:^|\s)xml:space\s*=\s*["'](preserve|default)["']"#),
            }
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Tag<'a> {
    name: &'a str,
    attributes: &'a str,
    closing: bool,
    self_closing: bool,
}

impl Tag<'_> {
    fn opens(&self) -> bool {
        !self.closing && !self.self_closing
    }

    /// Whether character data inside this element must be kept as is
    fn preserves_text(&self, inherited: bool) -> bool {
        let declared = SvgPatterns::get()
            .xml_space
            .captures(self.attributes)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str());

        match declared {
            Some("preserve") => true,
            Some(_) => false,
            None => inherited || TEXT_ELEMENTS.contains(&self.name),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Token<'a> {
    /// Character data between markup
    Text(&'a str),
    /// CDATA sections, DOCTYPE and processing instructions, copied as is
    Verbatim(&'a str),
    /// XML declaration and comments
    Dropped,
    Tag(Tag<'a>),
}

fn is_xml_declaration(raw: &str) -> bool {
    raw.strip_prefix("<?xml")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_whitespace() || c == '?')
}

fn tokenize(markup: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut last = 0;

    for caps in SvgPatterns::get().token.captures_iter(markup) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            tokens.push(Token::Text(&markup[last..whole.start()]));
        }
        last = whole.end();

        let raw = whole.as_str();
        let token = match caps.name("name") {
            Some(name) => Token::Tag(Tag {
                name: name.as_str(),
                attributes: caps.name("attrs").map_or("", |m| m.as_str()),
                closing: caps.name("close").is_some_and(|m| !m.is_empty()),
                self_closing: caps.name("selfclose").is_some_and(|m| !m.is_empty()),
            }),
            None if raw.starts_with("<!--") || is_xml_declaration(raw) => Token::Dropped,
            None => Token::Verbatim(raw),
        };
        tokens.push(token);
    }

    if last < markup.len() {
        tokens.push(Token::Text(&markup[last..]));
    }
    tokens
}

/// Collapses whitespace between attributes; quoted values are kept intact.
fn minify_attributes(attributes: &str) -> String {
    let mut out = String::with_capacity(attributes.len());
    let mut pending_space = false;

    for piece in SvgPatterns::get().attribute_piece.find_iter(attributes) {
        let piece = piece.as_str();
        if piece.contains('=') && !piece.starts_with(['"', '\'']) {
            out.push('=');
            pending_space = false;
        } else if piece.trim().is_empty() {
            pending_space = true;
        } else {
            if pending_space && !out.ends_with('=') {
                out.push(' ');
            }
            out.push_str(piece);
            pending_space = false;
        }
    }

    if !out.is_empty() && !out.starts_with(' ') {
        out.insert(0, ' ');
    }
    out
}

fn is_inline_tag(token: Option<&Token<'_>>) -> bool {
    matches!(token, Some(Token::Tag(tag)) if INLINE_TEXT_ELEMENTS.contains(&tag.name))
}

#[derive(Debug, Default, Clone)]
pub struct VectorProcessor;

impl VectorProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Shorter, equivalent serialization of an SVG document.
    pub fn minify(markup: &str) -> Result<String, OptimizeError> {
        let tokens = tokenize(markup);
        Self::validate(&tokens)?;

        let mut out = String::with_capacity(markup.len());
        // one entry per open element: does it preserve its text?
        let mut scopes: Vec<bool> = Vec::new();
        let mut metadata_depth = 0usize;

        for (index, token) in tokens.iter().enumerate() {
            if metadata_depth > 0 {
                if let Token::Tag(tag) = token {
                    if tag.name == "metadata" && tag.closing {
                        metadata_depth -= 1;
                    } else if tag.name == "metadata" && tag.opens() {
                        metadata_depth += 1;
                    }
                }
                continue;
            }

            match token {
                Token::Dropped => {}
                Token::Verbatim(raw) => out.push_str(raw),
                Token::Text(text) => {
                    let keep = !text.trim().is_empty()
                        || scopes.last().copied().unwrap_or(false)
                        || is_inline_tag(index.checked_sub(1).and_then(|i| tokens.get(i)))
                        || is_inline_tag(tokens.get(index + 1));
                    if keep {
                        out.push_str(text);
                    }
                }
                Token::Tag(tag) if tag.name == "metadata" => {
                    if tag.opens() {
                        metadata_depth = 1;
                    }
                }
                Token::Tag(tag) => {
                    out.push('<');
                    if tag.closing {
                        out.push('/');
                    }
                    out.push_str(tag.name);
                    out.push_str(&minify_attributes(tag.attributes));
                    if tag.self_closing {
                        out.push('/');
                    }
                    out.push('>');

                    if tag.closing {
                        scopes.pop();
                    } else if tag.opens() {
                        let inherited = scopes.last().copied().unwrap_or(false);
                        scopes.push(tag.preserves_text(inherited));
                    }
                }
            }
        }

        Ok(out)
    }

    /// Checks the document has an `<svg>` root and balanced tags.
    fn validate(tokens: &[Token<'_>]) -> Result<(), OptimizeError> {
        let mut stack: Vec<&str> = Vec::new();
        let mut root: Option<&str> = None;

        for token in tokens {
            let tag = match token {
                Token::Tag(tag) => tag,
                Token::Text(text) if text.contains('<') => {
                    return Err(OptimizeError::MalformedSvg("unterminated tag".to_string()));
                }
                _ => continue,
            };

            if tag.closing {
                match stack.pop() {
                    Some(open) if open == tag.name => {}
                    Some(open) => {
                        return Err(OptimizeError::MalformedSvg(format!(
                            "expected </{}> but found </{}>",
                            open, tag.name
                        )))
                    }
                    None => {
                        return Err(OptimizeError::MalformedSvg(format!(
                            "unexpected closing tag </{}>",
                            tag.name
                        )))
                    }
                }
                continue;
            }

            if root.is_none() {
                root = Some(tag.name);
            } else if stack.is_empty() {
                return Err(OptimizeError::MalformedSvg(format!(
                    "content after the root element: <{}>",
                    tag.name
                )));
            }

            if !tag.self_closing {
                stack.push(tag.name);
            }
        }

        if let Some(open) = stack.last() {
            return Err(OptimizeError::MalformedSvg(format!("unclosed tag <{}>", open)));
        }

        match root {
            Some("svg") => Ok(()),
            Some(other) => Err(OptimizeError::MalformedSvg(format!(
                "root element is <{}>, expected <svg>",
                other
            ))),
            None => Err(OptimizeError::MalformedSvg("no <svg> element".to_string())),
        }
    }
}

#[async_trait]
impl AssetEncoder for VectorProcessor {
    fn name(&self) -> &'static str {
        "vector"
    }

    async fn encode(&self, asset: &Asset, _quality: u8, warnings: &dyn WarningReporter) -> Vec<u8> {
        let result = std::str::from_utf8(&asset.data)
            .map_err(|e| OptimizeError::MalformedSvg(format!("not valid UTF-8: {}", e)))
            .and_then(Self::minify);

        match result {
            Ok(minified) => {
                debug!(
                    "Minified {}: {} -> {} bytes",
                    asset.relative_path.display(),
                    asset.data.len(),
                    minified.len()
                );
                minified.into_bytes()
            }
            Err(e) => {
                warnings.report(format!(
                    "{}: failed to minify SVG: {}",
                    asset.relative_path.display(),
                    e
                ));
                asset.data.clone()
            }
        }
    }
}
