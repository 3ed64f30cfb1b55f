//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Path queries.
//!
//! Supported grammar (JSON-style node identifiers, module names as
//! prefixes):
//!
//! ```text
//! path      := ('/' step)+
//! step      := ('*' | [prefix ':'] name) predicate*
//! predicate := '[' (field '=' literal | position) ']'
//! field     := [prefix ':'] name | '.' | '@' [prefix ':'] name
//! literal   := "'" chars "'" | '"' chars '"'
//! ```
//!
//! The first step must be module-qualified (or a wildcard). Unqualified
//! steps inherit the module of the previous step. Paths are checked against
//! the schema before being evaluated, so that a typo in a node name isn't
//! silently reported as an empty result.

use crate::context::Context;
use crate::data::{Data, DataTree};
use crate::error::{Error, Result};
use crate::iter::Set;
use crate::schema::{data_children, SchemaNode, SchemaNodeKind};
use crate::utils::{is_identifier, Binding};
use crate::value;

/// Path step.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Step {
    pub prefix: Option<String>,
    /// Node name, `None` for a wildcard.
    pub name: Option<String>,
    pub predicates: Vec<Predicate>,
}

/// Step predicate.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Predicate {
    /// `[n]`, 1-based.
    Position(usize),
    /// `[field='value']`.
    Equals { field: Field, value: String },
}

/// Left-hand side of an equality predicate.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Field {
    /// `.`: the node's own value.
    Current,
    /// Child node value.
    Child { prefix: Option<String>, name: String },
    /// Metadata (attribute) value.
    Meta { prefix: Option<String>, name: String },
}

struct Parser<'p> {
    path: &'p str,
    chars: Vec<char>,
    pos: usize,
}

// ===== parser =====

/// Parse a path expression.
pub(crate) fn parse(path: &str) -> Result<Vec<Step>> {
    let mut parser = Parser {
        path,
        chars: path.trim().chars().collect(),
        pos: 0,
    };
    let steps = parser.path()?;

    match steps.first() {
        Some(Step {
            prefix: None,
            name: Some(name),
            ..
        }) => Err(parser.error(&format!(
            "the first step \"{}\" must be module-qualified",
            name
        ))),
        _ => Ok(steps),
    }
}

impl Parser<'_> {
    fn error(&self, msg: &str) -> Error {
        Error::syntax(format!("Invalid path \"{}\": {}", self.path, msg))
    }

    fn unexpected(&self) -> Error {
        match self.chars.get(self.pos) {
            Some(c) => self.error(&format!(
                "unexpected character '{}' at position {}",
                c, self.pos
            )),
            None => self.error("unexpected end of expression"),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn path(&mut self) -> Result<Vec<Step>> {
        let mut steps = vec![];
        if self.chars.is_empty() {
            return Err(self.error("empty expression"));
        }
        while self.pos < self.chars.len() {
            if !self.eat('/') {
                return Err(self.unexpected());
            }
            steps.push(self.step()?);
        }
        Ok(steps)
    }

    fn step(&mut self) -> Result<Step> {
        let (prefix, name) = if self.eat('*') {
            (None, None)
        } else {
            let (prefix, name) = self.qualified_name()?;
            (prefix, Some(name))
        };

        let mut predicates = vec![];
        while self.eat('[') {
            self.skip_whitespace();
            predicates.push(self.predicate()?);
            self.skip_whitespace();
            if !self.eat(']') {
                return Err(self.unexpected());
            }
        }

        Ok(Step {
            prefix,
            name,
            predicates,
        })
    }

    fn predicate(&mut self) -> Result<Predicate> {
        if self.peek().is_some_and(|c| c.is_ascii_digit()) {
            let start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
            let digits = self.chars[start..self.pos].iter().collect::<String>();
            return match digits.parse::<usize>() {
                Ok(position) if position > 0 => {
                    Ok(Predicate::Position(position))
                }
                _ => {
                    Err(self.error(&format!("invalid position \"{}\"", digits)))
                }
            };
        }

        let field = if self.eat('.') {
            Field::Current
        } else if self.eat('@') {
            let (prefix, name) = self.qualified_name()?;
            Field::Meta { prefix, name }
        } else {
            let (prefix, name) = self.qualified_name()?;
            Field::Child { prefix, name }
        };

        self.skip_whitespace();
        if !self.eat('=') {
            return Err(self.unexpected());
        }
        self.skip_whitespace();
        let value = self.literal()?;
        Ok(Predicate::Equals { field, value })
    }

    fn literal(&mut self) -> Result<String> {
        let quote = match self.peek() {
            Some(quote @ ('\'' | '"')) => quote,
            _ => return Err(self.unexpected()),
        };
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|c| c != quote) {
            self.pos += 1;
        }
        if self.peek().is_none() {
            return Err(self.error("unterminated literal"));
        }
        let value = self.chars[start..self.pos].iter().collect();
        self.pos += 1;
        Ok(value)
    }

    fn identifier(&mut self) -> Result<String> {
        let start = self.pos;
        while self.peek().is_some_and(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
        }) {
            self.pos += 1;
        }
        let identifier = self.chars[start..self.pos].iter().collect::<String>();
        if !is_identifier(&identifier) {
            self.pos = start;
            return Err(self.unexpected());
        }
        Ok(identifier)
    }

    fn qualified_name(&mut self) -> Result<(Option<String>, String)> {
        let first = self.identifier()?;
        if self.eat(':') {
            let name = self.identifier()?;
            Ok((Some(first), name))
        } else {
            Ok((None, first))
        }
    }
}

// ===== schema resolution =====

/// Schema nodes that can appear as children of `parent` (top-level nodes for
/// `None`). Choice and case nodes are looked through.
fn child_candidates(
    ctx: &Context,
    parent: Option<usize>,
    module: Option<usize>,
    schema_mode: bool,
) -> Vec<usize> {
    let mut ids = vec![];
    match parent {
        None => {
            for (id, inner) in ctx.modules.iter().enumerate() {
                if module.is_some_and(|module| module != id) {
                    continue;
                }
                for first in [inner.data, inner.rpcs] {
                    ids.extend(
                        data_children(ctx, first).iter().map(|s| s.id()),
                    );
                }
                if schema_mode {
                    ids.extend(
                        data_children(ctx, inner.notifications)
                            .iter()
                            .map(|s| s.id()),
                    );
                }
            }
        }
        Some(parent) => {
            let snode = SchemaNode::from_id(ctx, parent);
            match snode.kind() {
                SchemaNodeKind::Rpc | SchemaNodeKind::Action
                    if !schema_mode =>
                {
                    let io = [snode.input(), snode.output()];
                    for io in io.into_iter().flatten() {
                        ids.extend(io.data_children().iter().map(|s| s.id()));
                    }
                }
                SchemaNodeKind::Rpc | SchemaNodeKind::Action => {
                    ids.extend(snode.children().map(|s| s.id()));
                }
                _ => {
                    ids.extend(snode.data_children().iter().map(|s| s.id()));
                    ids.extend(snode.actions().map(|s| s.id()));
                    if schema_mode {
                        ids.extend(snode.notifications().map(|s| s.id()));
                    }
                }
            }
        }
    }
    ids
}

/// Resolve the schema nodes selected by every step of a path.
fn resolve_schema(
    ctx: &Context,
    path: &str,
    steps: &[Step],
    schema_mode: bool,
) -> Result<Vec<Vec<usize>>> {
    let mut sets: Vec<Vec<usize>> = vec![];

    for (index, step) in steps.iter().enumerate() {
        let module = match &step.prefix {
            Some(prefix) => Some(ctx.module_id(prefix).ok_or_else(|| {
                Error::schema(format!(
                    "Module \"{}\" referenced in path \"{}\" not found",
                    prefix, path
                ))
            })?),
            None => None,
        };

        let parents = match index {
            0 => vec![None],
            _ => sets[index - 1].iter().copied().map(Some).collect(),
        };
        let mut set = vec![];
        for parent in &parents {
            // Unqualified names inherit the module of the parent.
            let module = module.or_else(|| parent.map(|p| ctx.nodes[p].module));
            for id in child_candidates(ctx, *parent, module, schema_mode) {
                let matches = match &step.name {
                    Some(name) => {
                        ctx.nodes[id].name == *name
                            && module.map_or(true, |module| {
                                ctx.nodes[id].module == module
                            })
                    }
                    None => module.map_or(true, |module| {
                        step.prefix.is_none() || ctx.nodes[id].module == module
                    }),
                };
                if matches && !set.contains(&id) {
                    set.push(id);
                }
            }
        }

        if let Some(name) = &step.name {
            if set.is_empty() && !parents.is_empty() {
                return Err(Error::schema(format!(
                    "Schema node \"{}\" referenced in path \"{}\" not found",
                    name, path
                )));
            }
        }

        for predicate in &step.predicates {
            if let Predicate::Equals {
                field: Field::Child { prefix, name },
                ..
            } = predicate
            {
                let field_module = match prefix {
                    Some(prefix) => Some(ctx.module_id(prefix).ok_or_else(|| {
                        Error::schema(format!(
                            "Module \"{}\" referenced in path \"{}\" not found",
                            prefix, path
                        ))
                    })?),
                    None => None,
                };
                let known = set.iter().any(|id| {
                    SchemaNode::from_id(ctx, *id)
                        .find_data_child(
                            field_module.or(Some(ctx.nodes[*id].module)),
                            name,
                        )
                        .is_some()
                });
                if !set.is_empty() && !known {
                    return Err(Error::schema(format!(
                        "Predicate field \"{}\" referenced in path \"{}\" \
                         not found",
                        name, path
                    )));
                }
            }
        }

        sets.push(set);
    }

    Ok(sets)
}

/// Find the schema nodes selected by a path.
pub(crate) fn find_schema<'a>(
    ctx: &'a Context,
    path: &str,
) -> Result<Set<'a, SchemaNode<'a>>> {
    let steps = parse(path)?;
    let mut sets = resolve_schema(ctx, path, &steps, true)?;
    let ids = sets.pop().unwrap_or_default();
    Ok(Set::new(ctx, ids))
}

/// Find the single schema node selected by a path.
pub(crate) fn find_schema_single<'a>(
    ctx: &'a Context,
    path: &str,
) -> Result<SchemaNode<'a>> {
    let mut set = find_schema(ctx, path)?;
    match (set.next(), set.next()) {
        (Some(snode), None) => Ok(snode),
        (None, _) => Err(Error::not_found(format!(
            "No schema node found for path \"{}\"",
            path
        ))),
        (Some(_), Some(_)) => Err(Error::not_found(format!(
            "Multiple schema nodes found for path \"{}\"",
            path
        ))),
    }
}

// ===== data evaluation =====

/// Find the data nodes selected by a path, in document order.
pub(crate) fn find_data(tree: &DataTree<'_>, path: &str) -> Result<Vec<usize>> {
    let ctx = tree.context();
    let steps = parse(path)?;
    let sets = resolve_schema(ctx, path, &steps, false)?;

    let mut seen = vec![false; tree.nodes.len()];
    let mut current: Vec<Option<usize>> = vec![None];
    for (step, set) in steps.iter().zip(&sets) {
        let mut next = vec![];
        for parent in &current {
            let candidates = tree
                .children_of(*parent)
                .into_iter()
                .filter(|id| set.contains(&tree.nodes[*id].schema))
                .collect::<Vec<_>>();
            for id in filter_predicates(tree, candidates, &step.predicates) {
                if !seen[id] {
                    seen[id] = true;
                    next.push(Some(id));
                }
            }
        }
        seen.iter_mut().for_each(|seen| *seen = false);
        current = next;
    }

    Ok(current.into_iter().flatten().collect())
}

fn filter_predicates(
    tree: &DataTree<'_>,
    mut candidates: Vec<usize>,
    predicates: &[Predicate],
) -> Vec<usize> {
    for predicate in predicates {
        candidates = match predicate {
            Predicate::Position(position) => candidates
                .get(position - 1)
                .map(|id| vec![*id])
                .unwrap_or_default(),
            Predicate::Equals { field, value } => candidates
                .into_iter()
                .filter(|id| field_matches(tree, *id, field, value))
                .collect(),
        };
    }
    candidates
}

fn field_matches(
    tree: &DataTree<'_>,
    id: usize,
    field: &Field,
    literal: &str,
) -> bool {
    let ctx = tree.context();
    match field {
        Field::Current => {
            let inner = &tree.nodes[id];
            value_matches(ctx, inner.schema, inner.value.as_deref(), literal)
        }
        Field::Child { prefix, name } => {
            let module = match prefix {
                Some(prefix) => ctx.module_id(prefix),
                None => Some(ctx.nodes[tree.nodes[id].schema].module),
            };
            tree.children_of(Some(id)).into_iter().any(|child| {
                let inner = &tree.nodes[child];
                let snode = &ctx.nodes[inner.schema];
                snode.name == *name
                    && Some(snode.module) == module
                    && value_matches(
                        ctx,
                        inner.schema,
                        inner.value.as_deref(),
                        literal,
                    )
            })
        }
        Field::Meta { prefix, name } => tree.nodes[id].meta.iter().any(|meta| {
            let matches_name = match prefix {
                Some(prefix) => meta.name == format!("{}:{}", prefix, name),
                None => meta.name.rsplit(':').next() == Some(name.as_str()),
            };
            matches_name && meta.value == literal
        }),
    }
}

/// Compare a stored canonical value with a path literal, canonicalizing the
/// literal when possible.
fn value_matches(
    ctx: &Context,
    schema: usize,
    stored: Option<&str>,
    literal: &str,
) -> bool {
    let Some(stored) = stored else {
        return false;
    };
    if stored == literal {
        return true;
    }
    let Some(ltype) = ctx.nodes[schema].leaf_type.as_ref() else {
        return false;
    };
    let resolve =
        |prefix: Option<&str>| prefix.and_then(|name| ctx.module_id(name));
    value::canonicalize(ctx, ltype, literal, &resolve)
        .is_ok_and(|canonical| canonical == stored)
}
