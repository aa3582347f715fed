//! Shell command parsing for the validator, on top of tree-sitter-bash.
//!
//! Only plain commands joined by `|`, `&&`, `||` and `;` with file
//! redirections are understood. Substitutions and parameter expansions are
//! reported as flags so the caller can block them by name; any other shell
//! construct (subshells, loops, assignments, heredocs, background jobs) is
//! unsupported and the caller blocks it as unparseable.

use tree_sitter::{Node, Parser, Tree};

/// One pipeline or list element, e.g. the `grep -i foo` in `kubectl get pods | grep -i foo`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stage {
    pub words: Vec<String>,
    /// Targets of output redirections (`>`, `>>`, `&>`)
    pub output_targets: Vec<String>,
}

impl Stage {
    /// Program basename, lowercased (`/usr/bin/kubectl` -> `kubectl`)
    pub fn program(&self) -> Option<String> {
        self.words.first().map(|w| {
            w.rsplit('/')
                .next()
                .unwrap_or(w.as_str())
                .to_lowercase()
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCommand {
    pub stages: Vec<Stage>,
    /// `$(...)`, backticks or `<(...)`
    pub has_substitution: bool,
    /// `$VAR`, `${...}` or `$((...))` outside single quotes
    pub has_expansion: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    ControlCharacter,
    /// The grammar could not be loaded
    Grammar,
    /// Incomplete or malformed input (unbalanced quotes, dangling operators)
    Syntax,
    /// A shell construct outside the supported subset
    Unsupported(&'static str),
}

/// Operators allowed between stages
const SEPARATORS: &[&str] = &["|", "&&", "||", ";", ";;", "\n"];

/// Redirection operators that write to their destination
const WRITE_REDIRECTS: &[&str] = &[">", ">>", "&>", "&>>", ">|"];

fn parse_tree(input: &str) -> Result<Tree, ParseError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_bash::LANGUAGE.into())
        .map_err(|_| ParseError::Grammar)?;
    parser.parse(input, None).ok_or(ParseError::Syntax)
}

fn children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

fn unescape(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut chars = word.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

struct Builder<'s> {
    src: &'s str,
    parsed: ParsedCommand,
}

impl<'s> Builder<'s> {
    fn text(&self, node: Node<'_>) -> Result<&'s str, ParseError> {
        self.src
            .get(node.start_byte()..node.end_byte())
            .ok_or(ParseError::Syntax)
    }

    fn statement(&mut self, node: Node<'_>) -> Result<(), ParseError> {
        match node.kind() {
            "program" | "list" | "pipeline" => {
                for child in children(node) {
                    if child.is_named() {
                        self.statement(child)?;
                    } else if !SEPARATORS.contains(&child.kind()) {
                        return Err(ParseError::Unsupported(child.kind()));
                    }
                }
                Ok(())
            }
            "redirected_statement" => {
                let before = self.parsed.stages.len();
                let mut targets = Vec::new();
                for child in children(node) {
                    match child.kind() {
                        "file_redirect" => self.redirect(child, &mut targets)?,
                        _ if child.is_named() => self.statement(child)?,
                        other => return Err(ParseError::Unsupported(other)),
                    }
                }
                if self.parsed.stages.len() == before {
                    return Err(ParseError::Syntax);
                }
                if let Some(last) = self.parsed.stages.last_mut() {
                    last.output_targets.extend(targets);
                }
                Ok(())
            }
            "command" => {
                let stage = self.command(node)?;
                self.parsed.stages.push(stage);
                Ok(())
            }
            "comment" => Ok(()),
            other => Err(ParseError::Unsupported(other)),
        }
    }

    fn command(&mut self, node: Node<'_>) -> Result<Stage, ParseError> {
        let mut stage = Stage::default();
        for child in children(node) {
            match child.kind() {
                "command_name" => {
                    for name in children(child) {
                        let word = self.word(name)?;
                        stage.words.push(word);
                    }
                }
                "file_redirect" => self.redirect(child, &mut stage.output_targets)?,
                _ if child.is_named() => {
                    let word = self.word(child)?;
                    stage.words.push(word);
                }
                other => return Err(ParseError::Unsupported(other)),
            }
        }
        if stage.words.is_empty() {
            return Err(ParseError::Syntax);
        }
        Ok(stage)
    }

    fn redirect(&mut self, node: Node<'_>, targets: &mut Vec<String>) -> Result<(), ParseError> {
        let mut operator = "";
        let mut destination = String::new();
        for child in children(node) {
            if !child.is_named() {
                operator = child.kind();
            } else if child.kind() != "file_descriptor" {
                destination.push_str(&self.word(child)?);
            }
        }
        let duplicates_fd = matches!(operator, ">&" | "<&")
            && (destination == "-" || destination.chars().all(|c| c.is_ascii_digit()));
        if duplicates_fd {
            return Ok(());
        }
        if WRITE_REDIRECTS.contains(&operator) || operator == ">&" {
            if destination.is_empty() {
                return Err(ParseError::Syntax);
            }
            targets.push(destination);
        }
        Ok(())
    }

    /// Literal text of one argument; expansions and substitutions are kept
    /// verbatim and flagged
    fn word(&mut self, node: Node<'_>) -> Result<String, ParseError> {
        match node.kind() {
            "word" => Ok(unescape(self.text(node)?)),
            "number" => Ok(self.text(node)?.to_string()),
            "raw_string" => {
                let raw = self.text(node)?;
                raw.strip_prefix('\'')
                    .and_then(|s| s.strip_suffix('\''))
                    .map(str::to_string)
                    .ok_or(ParseError::Syntax)
            }
            "string" => {
                let mut out = String::new();
                for child in children(node) {
                    match child.kind() {
                        "\"" => {}
                        "string_content" => out.push_str(self.text(child)?),
                        _ if child.is_named() => out.push_str(&self.word(child)?),
                        other => return Err(ParseError::Unsupported(other)),
                    }
                }
                Ok(out)
            }
            "concatenation" => {
                let mut out = String::new();
                for child in children(node) {
                    if child.is_named() {
                        out.push_str(&self.word(child)?);
                    } else {
                        out.push_str(self.text(child)?);
                    }
                }
                Ok(out)
            }
            "simple_expansion" | "expansion" | "arithmetic_expansion" => {
                self.parsed.has_expansion = true;
                Ok(self.text(node)?.to_string())
            }
            "command_substitution" | "process_substitution" => {
                self.parsed.has_substitution = true;
                Ok(self.text(node)?.to_string())
            }
            other => Err(ParseError::Unsupported(other)),
        }
    }
}

/// Split a command line into pipeline/list stages.
pub fn parse(input: &str) -> Result<ParsedCommand, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    if input
        .chars()
        .any(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r'))
    {
        return Err(ParseError::ControlCharacter);
    }

    let tree = parse_tree(input)?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(ParseError::Syntax);
    }

    let mut builder = Builder {
        src: input,
        parsed: ParsedCommand::default(),
    };
    builder.statement(root)?;
    if builder.parsed.stages.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(builder.parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &Stage) -> Vec<&str> {
        s.words.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_pipeline_split() {
        let parsed = parse("kubectl get pods -A | grep -i web").unwrap();
        assert_eq!(parsed.stages.len(), 2);
        assert_eq!(words(&parsed.stages[0]), vec!["kubectl", "get", "pods", "-A"]);
        assert_eq!(parsed.stages[1].program().as_deref(), Some("grep"));
        assert!(!parsed.has_substitution);
        assert!(!parsed.has_expansion);
    }

    #[test]
    fn test_lists_split_into_stages() {
        let parsed = parse("kubectl get pods && kubectl get svc; kubectl get cm || true").unwrap();
        let programs: Vec<_> = parsed.stages.iter().filter_map(Stage::program).collect();
        assert_eq!(programs, vec!["kubectl", "kubectl", "kubectl", "true"]);
    }

    #[test]
    fn test_quotes_are_stripped() {
        let parsed = parse(r#"kubectl get pods | grep -i "web api" | awk '{print $1}'"#).unwrap();
        assert_eq!(words(&parsed.stages[1]), vec!["grep", "-i", "web api"]);
        assert_eq!(words(&parsed.stages[2]), vec!["awk", "{print $1}"]);
        assert!(!parsed.has_expansion);
    }

    #[test]
    fn test_redirect_targets() {
        let parsed = parse("kubectl get pods 2>/dev/null > out.txt").unwrap();
        assert_eq!(parsed.stages[0].output_targets, vec!["/dev/null", "out.txt"]);
        assert_eq!(words(&parsed.stages[0]), vec!["kubectl", "get", "pods"]);

        let parsed = parse("kubectl get pods 2>&1 | head").unwrap();
        assert!(parsed.stages[0].output_targets.is_empty());
    }

    #[test]
    fn test_substitution_detection() {
        assert!(parse("kubectl logs $(kubectl get pods -o name)").unwrap().has_substitution);
        assert!(parse("echo `id`").unwrap().has_substitution);
        assert!(!parse("echo '$(id)'").unwrap().has_substitution);
    }

    #[test]
    fn test_expansion_detection() {
        assert!(parse("kubectl ${VERB:-delete} pod web-1").unwrap().has_expansion);
        assert!(parse("kubectl $VERB pod web-1").unwrap().has_expansion);
        assert!(parse(r#"kubectl get pod "$POD""#).unwrap().has_expansion);
        assert!(!parse("kubectl get pod '$POD'").unwrap().has_expansion);
    }

    #[test]
    fn test_malformed_input() {
        assert_eq!(parse("   "), Err(ParseError::Empty));
        assert_eq!(parse("kubectl get 'pods"), Err(ParseError::Syntax));
        assert_eq!(parse("kubectl get pods |"), Err(ParseError::Syntax));
        assert_eq!(parse("kubectl\u{0}get"), Err(ParseError::ControlCharacter));
    }

    #[test]
    fn test_unsupported_constructs() {
        for input in [
            "(kubectl delete pod web-1)",
            "for p in a b; do kubectl get pod $p; done",
            "VERB=delete kubectl get pods",
        ] {
            assert!(matches!(parse(input), Err(ParseError::Unsupported(_))), "{input}");
        }
    }

    #[test]
    fn test_trailing_semicolon_allowed() {
        let parsed = parse("kubectl get pods;").unwrap();
        assert_eq!(parsed.stages.len(), 1);
    }
}
