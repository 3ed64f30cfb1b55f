//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Schema compiler.
//!
//! Turns the generic statement tree of a module into compiled schema nodes
//! stored in the context arena. Groupings are instantiated, typedef chains
//! are flattened into leaf types, augments are applied to their targets and
//! nodes disabled by `if-feature` are left out.

use std::sync::Arc;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::logging;
use crate::schema::{
    DataValueType, IdentityInner, LeafType, ModuleInner, NodeFlags,
    Restriction, SchemaNodeInner, SchemaNodeKind,
};
use crate::utils::{is_identifier, split_prefix};
use crate::value;
use crate::yang::Stmt;

/// Nesting limit of groupings and typedefs (breaks definition cycles).
const MAX_DEPTH: usize = 64;

/// Lexical scope of a statement: the module used to resolve prefixes and the
/// chain of enclosing statements used to look up groupings and typedefs.
#[derive(Clone, Debug)]
struct Scope<'s> {
    module: usize,
    parents: Vec<&'s Stmt>,
}

/// Where a compiled node gets linked.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Place {
    Data(usize),
    Rpcs(usize),
    Notifications(usize),
    Child(usize),
    Actions(usize),
    Notifs(usize),
}

/// Properties inherited from the parent node.
#[derive(Clone, Copy, Debug)]
struct Inherit {
    /// Parent's config, `None` inside operations and notifications.
    config: Option<bool>,
    status: NodeFlags,
    operation: NodeFlags,
}

/// Where a grouping or typedef definition was found.
enum Definition<'s> {
    /// Defined in an enclosing statement, with the depth of that statement
    /// in the scope chain.
    Local(usize, &'s Stmt),
    /// Defined at the top level of another module.
    Foreign(usize),
}

struct Compiler<'c> {
    ctx: &'c mut Context,
    module: usize,
    depth: usize,
    /// Leaves whose leafref paths still need to be resolved, with the module
    /// used to resolve their prefixes.
    leafrefs: Vec<(usize, usize)>,
}

// ===== module loading =====

/// Latest revision of a parsed module.
pub(crate) fn latest_revision(stmt: &Stmt) -> Option<String> {
    stmt.all("revision")
        .filter_map(|revision| revision.arg.clone())
        .max()
}

/// Add a parsed module to the context.
pub(crate) fn add_module(
    ctx: &mut Context,
    stmt: Stmt,
    filepath: Option<String>,
    implement: bool,
    features: Option<&[&str]>,
) -> Result<usize> {
    if stmt.keyword == "submodule" {
        return Err(Error::schema(format!(
            "Submodule \"{}\" can't be loaded on its own, submodules are not \
             supported",
            stmt.arg.as_deref().unwrap_or("")
        )));
    }

    let name = stmt.arg()?.to_owned();
    if !is_identifier(&name) {
        return Err(Error::schema(format!("Invalid module name \"{}\"", name)));
    }
    let namespace = required_arg(&stmt, "namespace")?;
    let prefix = required_arg(&stmt, "prefix")?;
    if let Some(other) = ctx.modules.iter().find(|m| m.namespace == namespace) {
        return Err(Error::schema(format!(
            "Namespace \"{}\" of module \"{}\" is already used by module \
             \"{}\"",
            namespace, name, other.name
        )));
    }

    let stmt = Arc::new(stmt);
    let id = ctx.modules.len();
    ctx.modules.push(ModuleInner {
        name: name.clone(),
        revision: latest_revision(&stmt),
        namespace,
        prefix,
        filepath,
        organization: stmt.arg_of("organization").map(str::to_owned),
        contact: stmt.arg_of("contact").map(str::to_owned),
        description: stmt.arg_of("description").map(str::to_owned),
        reference: stmt.arg_of("reference").map(str::to_owned),
        implemented: false,
        features: stmt
            .all("feature")
            .filter_map(|feature| feature.arg.clone())
            .map(|feature| (feature, false))
            .collect(),
        imports: vec![],
        data: None,
        rpcs: None,
        notifications: None,
        stmt: stmt.clone(),
    });

    // Imports.
    for import in stmt.all("import") {
        let import_name = import.arg()?;
        let import_prefix = required_arg(import, "prefix")?;
        let revision = import.arg_of("revision-date");
        let import_id = ctx
            .load_module_id(import_name, revision, None, false)
            .map_err(|error| {
                Error::new(
                    error.errcode,
                    format!(
                        "Failed to import module \"{}\" from \"{}\": {}",
                        import_name, name, error
                    ),
                )
            })?;
        ctx.modules[id].imports.push((import_prefix, import_id));
    }
    if stmt.find("include").is_some() {
        return Err(Error::schema(format!(
            "Module \"{}\" includes submodules, which are not supported",
            name
        )));
    }

    compile_identities(ctx, id, &stmt)?;
    logging::verbose(&format!("Module \"{}\" parsed.", name));

    if implement {
        implement_module(ctx, id, features)?;
    }

    Ok(id)
}

fn required_arg(stmt: &Stmt, keyword: &str) -> Result<String> {
    match stmt.find(keyword) {
        Some(substmt) => Ok(substmt.arg()?.to_owned()),
        None => Err(Error::schema(format!(
            "Missing \"{}\" substatement in \"{}\"",
            keyword, stmt.keyword
        ))
        .with_line(stmt.line)),
    }
}

fn compile_identities(
    ctx: &mut Context,
    module: usize,
    stmt: &Stmt,
) -> Result<()> {
    let first = ctx.identities.len();
    for identity in stmt.all("identity") {
        let name = identity.arg()?;
        ctx.identities.push(IdentityInner {
            module,
            name: name.to_owned(),
            bases: vec![],
        });
    }

    for (index, identity) in stmt.all("identity").enumerate() {
        let mut bases = vec![];
        for base in identity.all("base") {
            bases.push(resolve_identity(ctx, module, base.arg()?)?);
        }
        ctx.identities[first + index].bases = bases;
    }

    // An identity must not be derived from itself.
    for id in first..ctx.identities.len() {
        if identity_derived_from(ctx, id, id) {
            return Err(Error::schema(format!(
                "Identity \"{}\" is derived from itself",
                ctx.identities[id].name
            )));
        }
    }

    Ok(())
}

/// Whether identity `id` is (transitively) derived from identity `base`.
pub(crate) fn identity_derived_from(
    ctx: &Context,
    id: usize,
    base: usize,
) -> bool {
    let mut stack = ctx.identities[id].bases.clone();
    let mut seen = vec![];
    while let Some(current) = stack.pop() {
        if current == base {
            return true;
        }
        if !seen.contains(&current) {
            seen.push(current);
            stack.extend(ctx.identities[current].bases.iter().copied());
        }
    }
    false
}

/// Resolve a module prefix in the scope of the given module.
pub(crate) fn resolve_prefix(
    ctx: &Context,
    module: usize,
    prefix: Option<&str>,
) -> Option<usize> {
    let inner = &ctx.modules[module];
    match prefix {
        None => Some(module),
        Some(prefix) if prefix == inner.prefix => Some(module),
        Some(prefix) => inner
            .imports
            .iter()
            .find(|(import_prefix, _)| import_prefix == prefix)
            .map(|(_, id)| *id),
    }
}

fn resolve_identity(ctx: &Context, module: usize, name: &str) -> Result<usize> {
    let (prefix, local) = split_prefix(name);
    let target = resolve_prefix(ctx, module, prefix).ok_or_else(|| {
        Error::schema(format!("Prefix of identity \"{}\" not found", name))
    })?;
    ctx.identities
        .iter()
        .position(|identity| {
            identity.module == target && identity.name == local
        })
        .ok_or_else(|| {
            Error::schema(format!("Identity \"{}\" not found", name))
        })
}

/// Compile the data definitions of a module and make it implemented.
pub(crate) fn implement_module(
    ctx: &mut Context,
    module: usize,
    features: Option<&[&str]>,
) -> Result<()> {
    ctx.modules[module].implemented = true;
    for feature in features.unwrap_or(&[]) {
        let inner = &mut ctx.modules[module];
        if *feature == "*" {
            inner.features.iter_mut().for_each(|(_, enabled)| *enabled = true);
            continue;
        }
        match inner.features.iter_mut().find(|(name, _)| name == feature) {
            Some((_, enabled)) => *enabled = true,
            None => {
                return Err(Error::schema(format!(
                    "Feature \"{}\" not found in module \"{}\"",
                    feature, inner.name
                )))
            }
        }
    }

    let root = ctx.modules[module].stmt.clone();
    let mut compiler = Compiler {
        ctx,
        module,
        depth: 0,
        leafrefs: vec![],
    };
    let scope = Scope {
        module,
        parents: vec![&root],
    };
    let inherit = Inherit {
        config: Some(true),
        status: NodeFlags::STATUS_CURR,
        operation: NodeFlags::empty(),
    };

    for stmt in &root.substmts {
        match stmt.keyword.as_str() {
            "rpc" => compiler.compile_stmt(
                stmt,
                &scope,
                Place::Rpcs(module),
                inherit,
            )?,
            "notification" => compiler.compile_stmt(
                stmt,
                &scope,
                Place::Notifications(module),
                inherit,
            )?,
            _ => compiler.compile_stmt(
                stmt,
                &scope,
                Place::Data(module),
                inherit,
            )?,
        }
    }
    for augment in root.all("augment") {
        compiler.compile_augment(augment, &scope, None)?;
    }
    compiler.resolve_leafrefs()?;

    logging::verbose(&format!(
        "Module \"{}\" implemented.",
        compiler.ctx.modules[module].name
    ));
    Ok(())
}

// ===== impl Scope =====

impl<'s> Scope<'s> {
    fn child(&self, stmt: &'s Stmt) -> Scope<'s> {
        let mut parents = self.parents.clone();
        parents.push(stmt);
        Scope {
            module: self.module,
            parents,
        }
    }
}

// ===== impl Compiler =====

impl Compiler<'_> {
    fn error(stmt: &Stmt, msg: String) -> Error {
        Error::schema(msg).with_line(stmt.line)
    }

    // ----- linking -----

    fn head(&self, place: Place) -> Option<usize> {
        match place {
            Place::Data(module) => self.ctx.modules[module].data,
            Place::Rpcs(module) => self.ctx.modules[module].rpcs,
            Place::Notifications(module) => {
                self.ctx.modules[module].notifications
            }
            Place::Child(parent) => self.ctx.nodes[parent].first_child,
            Place::Actions(parent) => self.ctx.nodes[parent].actions,
            Place::Notifs(parent) => self.ctx.nodes[parent].notifications,
        }
    }

    fn set_head(&mut self, place: Place, id: Option<usize>) {
        match place {
            Place::Data(module) => self.ctx.modules[module].data = id,
            Place::Rpcs(module) => self.ctx.modules[module].rpcs = id,
            Place::Notifications(module) => {
                self.ctx.modules[module].notifications = id
            }
            Place::Child(parent) => self.ctx.nodes[parent].first_child = id,
            Place::Actions(parent) => self.ctx.nodes[parent].actions = id,
            Place::Notifs(parent) => self.ctx.nodes[parent].notifications = id,
        }
    }

    fn siblings(&self, place: Place) -> Vec<usize> {
        let mut ids = vec![];
        let mut next = self.head(place);
        while let Some(id) = next {
            ids.push(id);
            next = self.ctx.nodes[id].next;
        }
        ids
    }

    /// Append a node to the end of the list selected by `place`.
    fn link(&mut self, place: Place, id: usize, stmt: &Stmt) -> Result<()> {
        let siblings = self.siblings(place);
        let name = &self.ctx.nodes[id].name;
        let module = self.ctx.nodes[id].module;
        if siblings.iter().any(|sibling| {
            let sibling = &self.ctx.nodes[*sibling];
            sibling.name == *name && sibling.module == module
        }) {
            return Err(Self::error(
                stmt,
                format!("Duplicate identifier \"{}\" of data definition", name),
            ));
        }

        self.ctx.nodes[id].parent = match place {
            Place::Child(parent)
            | Place::Actions(parent)
            | Place::Notifs(parent) => Some(parent),
            _ => None,
        };
        match siblings.last() {
            Some(last) => self.ctx.nodes[*last].next = Some(id),
            None => self.set_head(place, Some(id)),
        }
        Ok(())
    }

    /// Remove a node from the list it's linked into.
    fn unlink(&mut self, id: usize) {
        let parent = self.ctx.nodes[id].parent;
        let module = self.ctx.nodes[id].module;
        let places = match parent {
            Some(parent) => vec![
                Place::Child(parent),
                Place::Actions(parent),
                Place::Notifs(parent),
            ],
            None => vec![
                Place::Data(module),
                Place::Rpcs(module),
                Place::Notifications(module),
            ],
        };
        for place in places {
            let siblings = self.siblings(place);
            let index = siblings.iter().position(|sibling| *sibling == id);
            if let Some(index) = index {
                let next = self.ctx.nodes[id].next;
                match index {
                    0 => self.set_head(place, next),
                    _ => self.ctx.nodes[siblings[index - 1]].next = next,
                }
                self.ctx.nodes[id].next = None;
                break;
            }
        }
    }

    // ----- if-feature -----

    fn features_enabled(&self, stmt: &Stmt, scope: &Scope<'_>) -> Result<bool> {
        for if_feature in stmt.all("if-feature") {
            if !self.eval_if_feature(if_feature.arg()?, scope.module)
                .map_err(|error| error.with_line(if_feature.line))?
            {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn eval_if_feature(&self, expr: &str, module: usize) -> Result<bool> {
        let spaced = expr.replace('(', " ( ").replace(')', " ) ");
        let tokens = spaced.split_whitespace().collect::<Vec<_>>();
        let mut pos = 0;
        let value = self.if_feature_or(&tokens, &mut pos, module)?;
        if pos != tokens.len() {
            return Err(Error::schema(format!(
                "Invalid if-feature expression \"{}\"",
                expr
            )));
        }
        Ok(value)
    }

    fn if_feature_or(
        &self,
        tokens: &[&str],
        pos: &mut usize,
        module: usize,
    ) -> Result<bool> {
        let mut value = self.if_feature_and(tokens, pos, module)?;
        while tokens.get(*pos) == Some(&"or") {
            *pos += 1;
            let rhs = self.if_feature_and(tokens, pos, module)?;
            value = value || rhs;
        }
        Ok(value)
    }

    fn if_feature_and(
        &self,
        tokens: &[&str],
        pos: &mut usize,
        module: usize,
    ) -> Result<bool> {
        let mut value = self.if_feature_factor(tokens, pos, module)?;
        while tokens.get(*pos) == Some(&"and") {
            *pos += 1;
            let rhs = self.if_feature_factor(tokens, pos, module)?;
            value = value && rhs;
        }
        Ok(value)
    }

    fn if_feature_factor(
        &self,
        tokens: &[&str],
        pos: &mut usize,
        module: usize,
    ) -> Result<bool> {
        let token = tokens.get(*pos).copied().ok_or_else(|| {
            Error::schema("Unexpected end of if-feature expression")
        })?;
        *pos += 1;
        match token {
            "not" => Ok(!self.if_feature_factor(tokens, pos, module)?),
            "(" => {
                let value = self.if_feature_or(tokens, pos, module)?;
                if tokens.get(*pos) != Some(&")") {
                    return Err(Error::schema(
                        "Missing closing parenthesis in if-feature expression",
                    ));
                }
                *pos += 1;
                Ok(value)
            }
            _ => {
                let (prefix, name) = split_prefix(token);
                let target = resolve_prefix(self.ctx, module, prefix)
                    .ok_or_else(|| {
                        Error::schema(format!(
                            "Prefix of feature \"{}\" not found",
                            token
                        ))
                    })?;
                self.ctx.modules[target]
                    .features
                    .iter()
                    .find(|(feature, _)| feature == name)
                    .map(|(_, enabled)| *enabled)
                    .ok_or_else(|| {
                        Error::schema(format!(
                            "Feature \"{}\" not found",
                            token
                        ))
                    })
            }
        }
    }

    // ----- definitions lookup -----

    fn find_definition<'s>(
        &self,
        scope: &Scope<'s>,
        keyword: &str,
        reference: &str,
        stmt: &Stmt,
    ) -> Result<Definition<'s>> {
        let (prefix, name) = split_prefix(reference);
        let module = resolve_prefix(self.ctx, scope.module, prefix)
            .ok_or_else(|| {
                Self::error(
                    stmt,
                    format!(
                        "Prefix of {} \"{}\" not found",
                        keyword, reference
                    ),
                )
            })?;

        let is_def = |def: &&Stmt| {
            def.keyword == keyword && def.arg.as_deref() == Some(name)
        };
        if module != scope.module {
            let root = &self.ctx.modules[module].stmt;
            if root.substmts.iter().any(|def| is_def(&def)) {
                return Ok(Definition::Foreign(module));
            }
        } else {
            let parents = scope.parents.iter().copied().enumerate().rev();
            for (depth, parent) in parents {
                if let Some(def) = parent.substmts.iter().find(is_def) {
                    return Ok(Definition::Local(depth, def));
                }
            }
        }

        Err(Self::error(
            stmt,
            format!("{} \"{}\" not found", capitalize(keyword), reference),
        ))
    }

    // ----- data definitions -----

    fn compile_children<'s>(
        &mut self,
        stmt: &'s Stmt,
        scope: &Scope<'s>,
        place: Place,
        inherit: Inherit,
    ) -> Result<()> {
        for substmt in &stmt.substmts {
            self.compile_stmt(substmt, scope, place, inherit)?;
        }
        Ok(())
    }

    fn compile_stmt<'s>(
        &mut self,
        stmt: &'s Stmt,
        scope: &Scope<'s>,
        place: Place,
        inherit: Inherit,
    ) -> Result<()> {
        let is_choice = match place {
            Place::Child(parent) => {
                self.ctx.nodes[parent].kind == SchemaNodeKind::Choice
            }
            _ => false,
        };

        match stmt.keyword.as_str() {
            "container" | "leaf" | "leaf-list" | "list" | "anydata"
            | "anyxml" | "choice"
                if is_choice =>
            {
                // Shorthand case.
                if !self.features_enabled(stmt, scope)? {
                    return Ok(());
                }
                let mut case = SchemaNodeInner::new(
                    self.module,
                    SchemaNodeKind::Case,
                    stmt.arg()?,
                );
                case.flags = inherit.status
                    | inherit.operation
                    | match inherit.config {
                        Some(true) => NodeFlags::CONFIG_W,
                        Some(false) => NodeFlags::CONFIG_R,
                        None => NodeFlags::empty(),
                    };
                let case_id = self.ctx.nodes.len();
                self.ctx.nodes.push(case);
                self.link(place, case_id, stmt)?;
                let inherit = self.inherit_from(case_id, inherit);
                self.compile_data_node(
                    stmt,
                    scope,
                    Place::Child(case_id),
                    inherit,
                )?;
            }
            "container" | "leaf" | "leaf-list" | "list" | "anydata"
            | "anyxml" | "choice" | "case" => {
                self.compile_data_node(stmt, scope, place, inherit)?;
            }
            "uses" => self.compile_uses(stmt, scope, place, inherit)?,
            "rpc" | "action" => {
                let place = match place {
                    Place::Child(parent) => Place::Actions(parent),
                    _ => Place::Rpcs(self.module),
                };
                self.compile_operation(stmt, scope, place, inherit)?;
            }
            "notification" => {
                let place = match place {
                    Place::Child(parent) => Place::Notifs(parent),
                    _ => Place::Notifications(self.module),
                };
                self.compile_notification(stmt, scope, place, inherit)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Create and link a schema node with the properties common to all
    /// node kinds.
    fn new_node(
        &mut self,
        stmt: &Stmt,
        kind: SchemaNodeKind,
        place: Place,
        inherit: Inherit,
    ) -> Result<usize> {
        let name = stmt.arg()?;
        if !is_identifier(name) {
            return Err(Self::error(
                stmt,
                format!("Invalid identifier \"{}\"", name),
            ));
        }

        let mut node = SchemaNodeInner::new(self.module, kind, name);
        node.description = stmt.arg_of("description").map(str::to_owned);
        node.reference = stmt.arg_of("reference").map(str::to_owned);

        // Config.
        let mut flags = inherit.operation;
        if let Some(parent_config) = inherit.config {
            let config = match stmt.arg_of("config") {
                Some("true") => true,
                Some("false") => false,
                Some(value) => {
                    return Err(Self::error(
                        stmt,
                        format!("Invalid value \"{}\" of \"config\"", value),
                    ))
                }
                None => parent_config,
            };
            if config && !parent_config {
                return Err(Self::error(
                    stmt,
                    format!(
                        "Configuration node \"{}\" inside state data",
                        name
                    ),
                ));
            }
            flags |= if config {
                NodeFlags::CONFIG_W
            } else {
                NodeFlags::CONFIG_R
            };
        }

        // Status.
        flags |= match stmt.arg_of("status") {
            Some("current") => NodeFlags::STATUS_CURR,
            Some("deprecated") => NodeFlags::STATUS_DEPRC,
            Some("obsolete") => NodeFlags::STATUS_OBSLT,
            Some(value) => {
                return Err(Self::error(
                    stmt,
                    format!("Invalid value \"{}\" of \"status\"", value),
                ))
            }
            None => inherit.status,
        };
        if stmt.arg_of("mandatory") == Some("true") {
            flags |= NodeFlags::MAND_TRUE;
        }
        node.flags = flags;
        node.musts = restrictions(stmt, "must");
        node.whens = restrictions(stmt, "when");

        let id = self.ctx.nodes.len();
        self.ctx.nodes.push(node);
        self.link(place, id, stmt)?;
        Ok(id)
    }

    fn inherit_from(&self, id: usize, inherit: Inherit) -> Inherit {
        let flags = self.ctx.nodes[id].flags;
        let status = flags
            & (NodeFlags::STATUS_CURR
                | NodeFlags::STATUS_DEPRC
                | NodeFlags::STATUS_OBSLT);
        Inherit {
            config: inherit.config.map(|_| flags.contains(NodeFlags::CONFIG_W)),
            status,
            operation: inherit.operation,
        }
    }

    fn compile_data_node<'s>(
        &mut self,
        stmt: &'s Stmt,
        scope: &Scope<'s>,
        place: Place,
        inherit: Inherit,
    ) -> Result<()> {
        if !self.features_enabled(stmt, scope)? {
            return Ok(());
        }

        let kind = match stmt.keyword.as_str() {
            "container" => SchemaNodeKind::Container,
            "leaf" => SchemaNodeKind::Leaf,
            "leaf-list" => SchemaNodeKind::LeafList,
            "list" => SchemaNodeKind::List,
            "choice" => SchemaNodeKind::Choice,
            "case" => SchemaNodeKind::Case,
            "anydata" => SchemaNodeKind::AnyData,
            _ => SchemaNodeKind::AnyXml,
        };
        let id = self.new_node(stmt, kind, place, inherit)?;
        let scope = scope.child(stmt);
        let child_inherit = self.inherit_from(id, inherit);

        match kind {
            SchemaNodeKind::Container => {
                if stmt.find("presence").is_some() {
                    self.ctx.nodes[id].flags |= NodeFlags::PRESENCE;
                }
                self.compile_children(
                    stmt,
                    &scope,
                    Place::Child(id),
                    child_inherit,
                )?;
            }
            SchemaNodeKind::Leaf | SchemaNodeKind::LeafList => {
                self.compile_terminal(stmt, &scope, id)?;
            }
            SchemaNodeKind::List => {
                self.compile_children(
                    stmt,
                    &scope,
                    Place::Child(id),
                    child_inherit,
                )?;
                self.compile_elements(stmt, id)?;
                self.compile_list_keys(stmt, id)?;
            }
            SchemaNodeKind::Choice => {
                self.compile_children(
                    stmt,
                    &scope,
                    Place::Child(id),
                    child_inherit,
                )?;
                if let Some(default) = stmt.arg_of("default") {
                    let case = self
                        .siblings(Place::Child(id))
                        .into_iter()
                        .find(|case| self.ctx.nodes[*case].name == default)
                        .ok_or_else(|| {
                            Self::error(
                                stmt,
                                format!(
                                    "Default case \"{}\" not found",
                                    default
                                ),
                            )
                        })?;
                    if self.ctx.nodes[id].flags.contains(NodeFlags::MAND_TRUE) {
                        return Err(Self::error(
                            stmt,
                            "Choice with a default case can't be mandatory"
                                .to_owned(),
                        ));
                    }
                    self.ctx.nodes[id].default_case = Some(case);
                }
            }
            SchemaNodeKind::Case => {
                self.compile_children(
                    stmt,
                    &scope,
                    Place::Child(id),
                    child_inherit,
                )?;
            }
            _ => {}
        }

        Ok(())
    }

    fn compile_terminal(
        &mut self,
        stmt: &Stmt,
        scope: &Scope<'_>,
        id: usize,
    ) -> Result<()> {
        let type_stmt = stmt.find("type").ok_or_else(|| {
            Self::error(
                stmt,
                format!(
                    "Missing type of \"{}\"",
                    stmt.arg.as_deref().unwrap_or("")
                ),
            )
        })?;
        let ltype = self.compile_type(type_stmt, scope)?;
        let kind = self.ctx.nodes[id].kind;

        if has_leafref(&ltype) {
            self.leafrefs.push((id, scope.module));
        }

        // Defaults.
        let mut defaults = stmt
            .all("default")
            .filter_map(|default| default.arg.clone())
            .collect::<Vec<_>>();
        if kind == SchemaNodeKind::Leaf && defaults.len() > 1 {
            return Err(Self::error(
                stmt,
                "Multiple defaults of a leaf".to_owned(),
            ));
        }
        let mandatory = self.ctx.nodes[id].flags.contains(NodeFlags::MAND_TRUE);
        if mandatory && !defaults.is_empty() {
            return Err(Self::error(
                stmt,
                "Mandatory leaf can't have a default value".to_owned(),
            ));
        }
        if defaults.is_empty() && !mandatory {
            if let Some(default) = &ltype.default {
                defaults.push(default.clone());
            }
        }
        let mut canonical = vec![];
        for default in defaults {
            canonical.push(self.canonical_default(
                stmt,
                scope.module,
                &ltype,
                &default,
            )?);
        }

        let units = stmt
            .arg_of("units")
            .map(str::to_owned)
            .or_else(|| ltype.units.clone());
        let node = &mut self.ctx.nodes[id];
        if !canonical.is_empty() {
            node.flags |= NodeFlags::SET_DFLT;
        }
        node.defaults = canonical;
        node.units = units;
        node.leaf_type = Some(ltype);

        if kind == SchemaNodeKind::LeafList {
            self.compile_elements(stmt, id)?;
        }
        Ok(())
    }

    fn canonical_default(
        &self,
        stmt: &Stmt,
        module: usize,
        ltype: &LeafType,
        default: &str,
    ) -> Result<String> {
        // Leafref targets are not known yet.
        if ltype.base == DataValueType::LeafRef {
            return Ok(default.to_owned());
        }
        let ctx = &*self.ctx;
        let resolve =
            |prefix: Option<&str>| resolve_prefix(ctx, module, prefix);
        value::canonicalize(ctx, ltype, default, &resolve).map_err(|msg| {
            Self::error(
                stmt,
                format!("Invalid default value \"{}\": {}", default, msg),
            )
        })
    }

    /// min-elements, max-elements and ordered-by.
    fn compile_elements(&mut self, stmt: &Stmt, id: usize) -> Result<()> {
        let node = &mut self.ctx.nodes[id];
        if let Some(min) = stmt.arg_of("min-elements") {
            node.min_elements = min.parse().map_err(|_| {
                Self::error(stmt, format!("Invalid min-elements \"{}\"", min))
            })?;
            if node.min_elements > 0 {
                node.flags |= NodeFlags::MAND_TRUE;
            }
        }
        if let Some(max) = stmt.arg_of("max-elements") {
            node.max_elements = match max {
                "unbounded" => u32::MAX,
                _ => max.parse().map_err(|_| {
                    Self::error(
                        stmt,
                        format!("Invalid max-elements \"{}\"", max),
                    )
                })?,
            };
        }
        if node.min_elements > node.max_elements {
            return Err(Self::error(
                stmt,
                "min-elements is greater than max-elements".to_owned(),
            ));
        }
        if stmt.arg_of("ordered-by") == Some("user") {
            node.flags |= NodeFlags::ORDBY_USER;
        }
        Ok(())
    }

    fn compile_list_keys(&mut self, stmt: &Stmt, id: usize) -> Result<()> {
        let children = self.siblings(Place::Child(id));
        let config = self.ctx.nodes[id].flags.contains(NodeFlags::CONFIG_W);

        match stmt.arg_of("key") {
            Some(keys) => {
                let mut key_ids = vec![];
                for key in keys.split_whitespace() {
                    let (_, key) = split_prefix(key);
                    let key_id = children
                        .iter()
                        .copied()
                        .find(|child| self.ctx.nodes[*child].name == key)
                        .filter(|child| {
                            self.ctx.nodes[*child].kind == SchemaNodeKind::Leaf
                        })
                        .ok_or_else(|| {
                            Self::error(
                                stmt,
                                format!(
                                    "Key \"{}\" not found among the list \
                                     leaves",
                                    key
                                ),
                            )
                        })?;
                    if key_ids.contains(&key_id) {
                        return Err(Self::error(
                            stmt,
                            format!("Duplicate key \"{}\"", key),
                        ));
                    }
                    let key_node = &mut self.ctx.nodes[key_id];
                    key_node.flags |= NodeFlags::KEY | NodeFlags::MAND_TRUE;
                    key_node.flags.remove(NodeFlags::SET_DFLT);
                    key_node.defaults.clear();
                    key_ids.push(key_id);
                }
                self.ctx.nodes[id].keys = key_ids;
            }
            None if config => {
                return Err(Self::error(
                    stmt,
                    format!(
                        "Missing key in list \"{}\" representing \
                         configuration data",
                        self.ctx.nodes[id].name
                    ),
                ))
            }
            None => self.ctx.nodes[id].flags |= NodeFlags::KEYLESS,
        }

        for unique in stmt.all("unique") {
            let mut leaves = vec![];
            for path in unique.arg()?.split_whitespace() {
                let leaf = self
                    .resolve_descendant(Place::Child(id), path, 0)
                    .ok_or_else(|| {
                        Self::error(
                            unique,
                            format!("Unique leaf \"{}\" not found", path),
                        )
                    })?;
                leaves.push(leaf);
            }
            self.ctx.nodes[id].uniques.push(leaves);
        }

        Ok(())
    }

    fn compile_uses<'s>(
        &mut self,
        stmt: &'s Stmt,
        scope: &Scope<'s>,
        place: Place,
        inherit: Inherit,
    ) -> Result<()> {
        if !self.features_enabled(stmt, scope)? {
            return Ok(());
        }
        if self.depth >= MAX_DEPTH {
            return Err(Self::error(
                stmt,
                "Grouping nesting too deep".to_owned(),
            ));
        }

        let first = self.ctx.nodes.len();
        let reference = stmt.arg()?;
        self.depth += 1;
        match self.find_definition(scope, "grouping", reference, stmt)? {
            Definition::Local(depth, grouping) => {
                let mut grouping_scope = Scope {
                    module: scope.module,
                    parents: scope.parents[..=depth].to_vec(),
                };
                grouping_scope.parents.push(grouping);
                self.compile_children(
                    grouping,
                    &grouping_scope,
                    place,
                    inherit,
                )?;
            }
            Definition::Foreign(module) => {
                let root = self.ctx.modules[module].stmt.clone();
                let (_, name) = split_prefix(reference);
                if let Some(grouping) = root
                    .all("grouping")
                    .find(|grouping| grouping.arg.as_deref() == Some(name))
                {
                    let grouping_scope = Scope {
                        module,
                        parents: vec![&root, grouping],
                    };
                    self.compile_children(
                        grouping,
                        &grouping_scope,
                        place,
                        inherit,
                    )?;
                };
            }
        }
        self.depth -= 1;

        // Conditions of the uses apply to all instantiated nodes.
        let whens = restrictions(stmt, "when");
        let created = self
            .siblings(place)
            .into_iter()
            .filter(|id| *id >= first)
            .collect::<Vec<_>>();
        if !whens.is_empty() {
            for id in &created {
                self.ctx.nodes[*id].whens.extend(whens.iter().cloned());
            }
        }

        for refine in stmt.all("refine") {
            let path = refine.arg()?;
            let target = self
                .resolve_descendant(place, path, first)
                .ok_or_else(|| {
                    Self::error(
                        refine,
                        format!("Refine target \"{}\" not found", path),
                    )
                })?;
            self.apply_refine(refine, scope, target)?;
        }
        for augment in stmt.all("augment") {
            let path = augment.arg()?;
            let target = self
                .resolve_descendant(place, path, first)
                .ok_or_else(|| {
                    Self::error(
                        augment,
                        format!("Augment target \"{}\" not found", path),
                    )
                })?;
            self.compile_augment(augment, scope, Some(target))?;
        }

        Ok(())
    }

    /// Resolve a descendant schema node identifier among the nodes linked at
    /// `place` (only nodes with an id of at least `first` are considered for
    /// the first step).
    fn resolve_descendant(
        &self,
        place: Place,
        path: &str,
        first: usize,
    ) -> Option<usize> {
        let mut steps = path.split('/').filter(|step| !step.is_empty());
        let (_, name) = split_prefix(steps.next()?);
        let mut current = self
            .siblings(place)
            .into_iter()
            .filter(|id| *id >= first)
            .find(|id| self.ctx.nodes[*id].name == name)?;
        for step in steps {
            let (_, name) = split_prefix(step);
            current = self.schema_child(current, name)?;
        }
        Some(current)
    }

    /// Any schema child of a node (data children, actions, notifications,
    /// input and output).
    fn schema_child(&self, parent: usize, name: &str) -> Option<usize> {
        let node = &self.ctx.nodes[parent];
        [node.first_child, node.actions, node.notifications]
            .into_iter()
            .flat_map(|head| {
                let mut ids = vec![];
                let mut next = head;
                while let Some(id) = next {
                    ids.push(id);
                    next = self.ctx.nodes[id].next;
                }
                ids
            })
            .find(|id| self.ctx.nodes[*id].name == name)
    }

    fn apply_refine(
        &mut self,
        refine: &Stmt,
        scope: &Scope<'_>,
        target: usize,
    ) -> Result<()> {
        if !self.features_enabled(refine, scope)? {
            self.unlink(target);
            return Ok(());
        }

        let kind = self.ctx.nodes[target].kind;
        if let Some(description) = refine.arg_of("description") {
            self.ctx.nodes[target].description = Some(description.to_owned());
        }
        if let Some(reference) = refine.arg_of("reference") {
            self.ctx.nodes[target].reference = Some(reference.to_owned());
        }
        match refine.arg_of("config") {
            Some("false") => self.set_subtree_state(target),
            Some("true") => {
                let node = &mut self.ctx.nodes[target];
                node.flags.remove(NodeFlags::CONFIG_R);
                node.flags |= NodeFlags::CONFIG_W;
            }
            _ => {}
        }
        match refine.arg_of("mandatory") {
            Some("true") => {
                self.ctx.nodes[target].flags |= NodeFlags::MAND_TRUE
            }
            Some("false") => {
                self.ctx.nodes[target].flags.remove(NodeFlags::MAND_TRUE)
            }
            _ => {}
        }
        if refine.find("presence").is_some() {
            self.ctx.nodes[target].flags |= NodeFlags::PRESENCE;
        }
        if refine.find("min-elements").is_some()
            || refine.find("max-elements").is_some()
        {
            self.compile_elements(refine, target)?;
        }
        self.ctx.nodes[target].musts.extend(restrictions(refine, "must"));

        let defaults = refine
            .all("default")
            .filter_map(|default| default.arg.clone())
            .collect::<Vec<_>>();
        if !defaults.is_empty() {
            match kind {
                SchemaNodeKind::Choice => {
                    let case = self
                        .siblings(Place::Child(target))
                        .into_iter()
                        .find(|case| self.ctx.nodes[*case].name == defaults[0]);
                    self.ctx.nodes[target].default_case = case;
                }
                SchemaNodeKind::Leaf | SchemaNodeKind::LeafList => {
                    let ltype = self.ctx.nodes[target].leaf_type.clone();
                    if let Some(ltype) = ltype {
                        let mut canonical = vec![];
                        for default in &defaults {
                            canonical.push(self.canonical_default(
                                refine,
                                scope.module,
                                &ltype,
                                default,
                            )?);
                        }
                        let node = &mut self.ctx.nodes[target];
                        node.defaults = canonical;
                        node.flags |= NodeFlags::SET_DFLT;
                    }
                }
                _ => {
                    return Err(Self::error(
                        refine,
                        "Invalid refine of default value".to_owned(),
                    ))
                }
            }
        }

        Ok(())
    }

    fn set_subtree_state(&mut self, id: usize) {
        let node = &mut self.ctx.nodes[id];
        node.flags.remove(NodeFlags::CONFIG_W);
        node.flags |= NodeFlags::CONFIG_R;
        let mut next = node.first_child;
        while let Some(child) = next {
            self.set_subtree_state(child);
            next = self.ctx.nodes[child].next;
        }
    }

    fn compile_augment<'s>(
        &mut self,
        stmt: &'s Stmt,
        scope: &Scope<'s>,
        target: Option<usize>,
    ) -> Result<()> {
        if !self.features_enabled(stmt, scope)? {
            return Ok(());
        }

        let target = match target {
            Some(target) => target,
            None => self.resolve_augment_target(stmt, scope)?,
        };
        let target_node = &self.ctx.nodes[target];
        let kind = target_node.kind;
        if !matches!(
            kind,
            SchemaNodeKind::Container
                | SchemaNodeKind::List
                | SchemaNodeKind::Choice
                | SchemaNodeKind::Case
                | SchemaNodeKind::Input
                | SchemaNodeKind::Output
                | SchemaNodeKind::Notification
        ) {
            return Err(Self::error(
                stmt,
                format!(
                    "Augment target \"{}\" can't have children",
                    target_node.name
                ),
            ));
        }

        let flags = target_node.flags;
        let operation = flags
            & (NodeFlags::IS_INPUT | NodeFlags::IS_OUTPUT | NodeFlags::IS_NOTIF)
            | match kind {
                SchemaNodeKind::Input => NodeFlags::IS_INPUT,
                SchemaNodeKind::Output => NodeFlags::IS_OUTPUT,
                SchemaNodeKind::Notification => NodeFlags::IS_NOTIF,
                _ => NodeFlags::empty(),
            };
        let config = if operation.is_empty() {
            Some(!flags.contains(NodeFlags::CONFIG_R))
        } else {
            None
        };
        let inherit = Inherit {
            config,
            status: NodeFlags::STATUS_CURR,
            operation,
        };

        let first = self.ctx.nodes.len();
        let scope = scope.child(stmt);
        self.compile_children(stmt, &scope, Place::Child(target), inherit)?;

        let whens = restrictions(stmt, "when");
        if !whens.is_empty() {
            for id in self.siblings(Place::Child(target)) {
                if id >= first {
                    self.ctx.nodes[id].whens.extend(whens.iter().cloned());
                }
            }
        }
        Ok(())
    }

    fn resolve_augment_target(
        &mut self,
        stmt: &Stmt,
        scope: &Scope<'_>,
    ) -> Result<usize> {
        let path = stmt.arg()?;
        if !path.starts_with('/') {
            return Err(Self::error(
                stmt,
                format!("Invalid absolute augment target \"{}\"", path),
            ));
        }

        let mut current: Option<usize> = None;
        for step in path.split('/').skip(1) {
            let (prefix, name) = split_prefix(step);
            let module = resolve_prefix(self.ctx, scope.module, prefix)
                .ok_or_else(|| {
                    Self::error(
                        stmt,
                        format!("Prefix of \"{}\" not found", step),
                    )
                })?;
            let found = match current {
                None => {
                    // Augmenting a module implements it.
                    if !self.ctx.modules[module].implemented {
                        implement_module(self.ctx, module, None)?;
                    }
                    [
                        Place::Data(module),
                        Place::Rpcs(module),
                        Place::Notifications(module),
                    ]
                    .into_iter()
                    .flat_map(|place| self.siblings(place))
                    .find(|id| self.ctx.nodes[*id].name == name)
                }
                Some(parent) => self.schema_child(parent, name),
            };
            current = Some(found.ok_or_else(|| {
                Self::error(
                    stmt,
                    format!("Augment target node \"{}\" not found", path),
                )
            })?);
        }

        current.ok_or_else(|| {
            Self::error(stmt, "Empty augment target".to_owned())
        })
    }

    fn compile_operation<'s>(
        &mut self,
        stmt: &'s Stmt,
        scope: &Scope<'s>,
        place: Place,
        inherit: Inherit,
    ) -> Result<()> {
        if !self.features_enabled(stmt, scope)? {
            return Ok(());
        }

        let kind = match place {
            Place::Rpcs(_) => SchemaNodeKind::Rpc,
            _ => SchemaNodeKind::Action,
        };
        let op_inherit = Inherit {
            config: None,
            status: inherit.status,
            operation: NodeFlags::empty(),
        };
        let id = self.new_node(stmt, kind, place, op_inherit)?;
        let scope = scope.child(stmt);
        let status = self.inherit_from(id, op_inherit).status;

        for (keyword, kind, operation) in [
            ("input", SchemaNodeKind::Input, NodeFlags::IS_INPUT),
            ("output", SchemaNodeKind::Output, NodeFlags::IS_OUTPUT),
        ] {
            let mut node = SchemaNodeInner::new(self.module, kind, keyword);
            node.flags = status | operation;
            let io = self.ctx.nodes.len();
            self.ctx.nodes.push(node);
            self.link(Place::Child(id), io, stmt)?;

            if let Some(io_stmt) = stmt.find(keyword) {
                self.ctx.nodes[io].musts = restrictions(io_stmt, "must");
                let io_scope = scope.child(io_stmt);
                let io_inherit = Inherit {
                    config: None,
                    status,
                    operation,
                };
                self.compile_children(
                    io_stmt,
                    &io_scope,
                    Place::Child(io),
                    io_inherit,
                )?;
            }
        }
        Ok(())
    }

    fn compile_notification<'s>(
        &mut self,
        stmt: &'s Stmt,
        scope: &Scope<'s>,
        place: Place,
        inherit: Inherit,
    ) -> Result<()> {
        if !self.features_enabled(stmt, scope)? {
            return Ok(());
        }

        let notif_inherit = Inherit {
            config: None,
            status: inherit.status,
            operation: NodeFlags::empty(),
        };
        let id = self.new_node(
            stmt,
            SchemaNodeKind::Notification,
            place,
            notif_inherit,
        )?;
        let scope = scope.child(stmt);
        let child_inherit = Inherit {
            config: None,
            status: self.inherit_from(id, notif_inherit).status,
            operation: NodeFlags::IS_NOTIF,
        };
        self.compile_children(stmt, &scope, Place::Child(id), child_inherit)
    }

    // ----- types -----

    fn compile_type(
        &mut self,
        stmt: &Stmt,
        scope: &Scope<'_>,
    ) -> Result<LeafType> {
        let reference = stmt.arg()?;
        let (prefix, name) = split_prefix(reference);

        let builtin = match prefix {
            None => builtin_type(name),
            Some(_) => None,
        };
        let derived = builtin.is_none();
        let mut ltype = match builtin {
            Some(base) => LeafType::new(base),
            None => {
                if self.depth >= MAX_DEPTH {
                    return Err(Self::error(
                        stmt,
                        "Typedef nesting too deep".to_owned(),
                    ));
                }
                self.depth += 1;
                let ltype = self.compile_typedef(stmt, scope, reference);
                self.depth -= 1;
                let mut ltype = ltype?;
                ltype.name = Some(name.to_owned());
                ltype
            }
        };

        self.restrict_type(stmt, scope, &mut ltype, derived)?;
        Ok(ltype)
    }

    fn compile_typedef(
        &mut self,
        stmt: &Stmt,
        scope: &Scope<'_>,
        reference: &str,
    ) -> Result<LeafType> {
        let (_, name) = split_prefix(reference);
        match self.find_definition(scope, "typedef", reference, stmt)? {
            Definition::Local(depth, typedef) => {
                let mut typedef_scope = Scope {
                    module: scope.module,
                    parents: scope.parents[..=depth].to_vec(),
                };
                typedef_scope.parents.push(typedef);
                self.typedef_type(typedef, &typedef_scope)
            }
            Definition::Foreign(module) => {
                let root = self.ctx.modules[module].stmt.clone();
                let typedef = root
                    .all("typedef")
                    .find(|typedef| typedef.arg.as_deref() == Some(name))
                    .ok_or_else(|| {
                        Self::error(
                            stmt,
                            format!("Typedef \"{}\" not found", reference),
                        )
                    })?;
                let typedef_scope = Scope {
                    module,
                    parents: vec![&root, typedef],
                };
                self.typedef_type(typedef, &typedef_scope)
            }
        }
    }

    fn typedef_type(
        &mut self,
        typedef: &Stmt,
        scope: &Scope<'_>,
    ) -> Result<LeafType> {
        let type_stmt = typedef.find("type").ok_or_else(|| {
            Self::error(typedef, "Missing type of typedef".to_owned())
        })?;
        let mut ltype = self.compile_type(type_stmt, scope)?;
        if let Some(units) = typedef.arg_of("units") {
            ltype.units = Some(units.to_owned());
        }
        if let Some(default) = typedef.arg_of("default") {
            ltype.default = Some(self.canonical_default(
                typedef,
                scope.module,
                &ltype,
                default,
            )?);
        }
        Ok(ltype)
    }

    fn restrict_type(
        &mut self,
        stmt: &Stmt,
        scope: &Scope<'_>,
        ltype: &mut LeafType,
        derived: bool,
    ) -> Result<()> {
        use DataValueType as T;

        // Fraction digits come first, ranges of decimal64 depend on them.
        if let Some(digits) = stmt.find("fraction-digits") {
            if ltype.base != T::Dec64 || derived {
                return Err(Self::error(
                    stmt,
                    "Invalid fraction-digits restriction".to_owned(),
                ));
            }
            ltype.fraction_digits = match digits.arg()?.parse::<u8>() {
                Ok(digits) if (1..=18).contains(&digits) => digits,
                _ => {
                    return Err(Self::error(
                        digits,
                        "Invalid fraction-digits value".to_owned(),
                    ))
                }
            };
        }

        for substmt in &stmt.substmts {
            match substmt.keyword.as_str() {
                "range" => {
                    let bounds = value::type_bounds(ltype).ok_or_else(|| {
                        Self::error(
                            substmt,
                            "Invalid range restriction of a non-numeric type"
                                .to_owned(),
                        )
                    })?;
                    let current =
                        ltype.ranges.clone().unwrap_or_else(|| vec![bounds]);
                    let ranges = parse_intervals(substmt.arg()?, &current, |s| {
                        value::parse_number(ltype, s)
                    })
                    .map_err(|msg| Self::error(substmt, msg))?;
                    ltype.ranges = Some(ranges);
                }
                "length" => {
                    if !matches!(ltype.base, T::String | T::Binary) {
                        return Err(Self::error(
                            substmt,
                            "Invalid length restriction".to_owned(),
                        ));
                    }
                    let current = ltype
                        .lengths
                        .clone()
                        .map(|lengths| {
                            lengths
                                .into_iter()
                                .map(|(lo, hi)| (lo as i128, hi as i128))
                                .collect()
                        })
                        .unwrap_or_else(|| vec![(0, u64::MAX as i128)]);
                    let parse = |s: &str| s.parse::<u64>().ok().map(i128::from);
                    let lengths =
                        parse_intervals(substmt.arg()?, &current, parse)
                            .map_err(|msg| Self::error(substmt, msg))?;
                    ltype.lengths = Some(
                        lengths
                            .into_iter()
                            .map(|(lo, hi)| (lo as u64, hi as u64))
                            .collect(),
                    );
                }
                "pattern" => {
                    if ltype.base != T::String {
                        return Err(Self::error(
                            substmt,
                            "Invalid pattern restriction".to_owned(),
                        ));
                    }
                    let pattern = substmt.arg()?;
                    let invert =
                        substmt.arg_of("modifier") == Some("invert-match");
                    match value::compile_pattern(pattern) {
                        Ok(regex) => ltype.patterns.push((regex, invert)),
                        Err(error) => logging::warn(
                            &format!(
                                "Unsupported pattern \"{}\" ignored ({}).",
                                pattern, error
                            ),
                            None,
                        ),
                    }
                }
                "enum" => self.restrict_enum(substmt, scope, ltype, derived)?,
                "bit" => self.restrict_bit(substmt, scope, ltype, derived)?,
                "base" => {
                    if ltype.base != T::IdentityRef || derived {
                        return Err(Self::error(
                            substmt,
                            "Invalid base restriction".to_owned(),
                        ));
                    }
                    let base =
                        resolve_identity(self.ctx, scope.module, substmt.arg()?)
                            .map_err(|error| error.with_line(substmt.line))?;
                    ltype.bases.push(base);
                }
                "path" => {
                    if ltype.base != T::LeafRef || derived {
                        return Err(Self::error(
                            substmt,
                            "Invalid path restriction".to_owned(),
                        ));
                    }
                    ltype.leafref_path = Some(substmt.arg()?.to_owned());
                }
                "require-instance" => {
                    if !matches!(ltype.base, T::LeafRef | T::InstanceId) {
                        return Err(Self::error(
                            substmt,
                            "Invalid require-instance restriction".to_owned(),
                        ));
                    }
                    ltype.require_instance = substmt.arg()? == "true";
                }
                "type" => {
                    if ltype.base != T::Union || derived {
                        return Err(Self::error(
                            substmt,
                            "Invalid union member type".to_owned(),
                        ));
                    }
                    let member = self.compile_type(substmt, scope)?;
                    ltype.union_types.push(member);
                }
                _ => {}
            }
        }

        // A restricted enumeration or bits type keeps only the listed items.
        if derived {
            let enums = names_of(stmt, "enum");
            if !enums.is_empty() {
                ltype.enums.retain(|(name, _)| enums.contains(&name.as_str()));
            }
            let bits = names_of(stmt, "bit");
            if !bits.is_empty() {
                ltype.bits.retain(|(name, _)| bits.contains(&name.as_str()));
            }
        }

        if !derived {
            let missing = match ltype.base {
                T::Dec64 if ltype.fraction_digits == 0 => {
                    Some("fraction-digits")
                }
                T::Enum if ltype.enums.is_empty() => Some("enum"),
                T::Bits if ltype.bits.is_empty() => Some("bit"),
                T::IdentityRef if ltype.bases.is_empty() => Some("base"),
                T::LeafRef if ltype.leafref_path.is_none() => Some("path"),
                T::Union if ltype.union_types.is_empty() => Some("type"),
                _ => None,
            };
            if let Some(missing) = missing {
                return Err(Self::error(
                    stmt,
                    format!(
                        "Missing \"{}\" substatement of type \"{}\"",
                        missing,
                        stmt.arg()?
                    ),
                ));
            }
        }
        Ok(())
    }

    fn restrict_enum(
        &mut self,
        stmt: &Stmt,
        scope: &Scope<'_>,
        ltype: &mut LeafType,
        derived: bool,
    ) -> Result<()> {
        if ltype.base != DataValueType::Enum {
            return Err(Self::error(
                stmt,
                "Invalid enum restriction".to_owned(),
            ));
        }
        let name = stmt.arg()?;
        if !self.features_enabled(stmt, scope)? {
            ltype.enums.retain(|(enum_name, _)| enum_name != name);
            return Ok(());
        }

        let explicit = match stmt.arg_of("value") {
            Some(value) => Some(value.parse::<i64>().map_err(|_| {
                Self::error(stmt, format!("Invalid enum value \"{}\"", value))
            })?),
            None => None,
        };

        if derived {
            // Restriction of an enumeration: the enum must already exist.
            let existing = ltype
                .enums
                .iter()
                .find(|(enum_name, _)| enum_name == name)
                .map(|(_, value)| *value)
                .ok_or_else(|| {
                    Self::error(
                        stmt,
                        format!(
                            "Enum \"{}\" not defined in the base type",
                            name
                        ),
                    )
                })?;
            if explicit.is_some_and(|value| value != existing) {
                return Err(Self::error(
                    stmt,
                    format!("Enum \"{}\" value changed", name),
                ));
            }
            return Ok(());
        }

        if ltype.enums.iter().any(|(enum_name, _)| enum_name == name) {
            return Err(Self::error(
                stmt,
                format!("Duplicate enum \"{}\"", name),
            ));
        }
        let value = match explicit {
            Some(value) => value,
            None => match ltype.enums.iter().map(|(_, value)| *value).max() {
                Some(max) => max.checked_add(1).ok_or_else(|| {
                    Self::error(stmt, "Enum value overflow".to_owned())
                })?,
                None => 0,
            },
        };
        ltype.enums.push((name.to_owned(), value));
        Ok(())
    }

    fn restrict_bit(
        &mut self,
        stmt: &Stmt,
        scope: &Scope<'_>,
        ltype: &mut LeafType,
        derived: bool,
    ) -> Result<()> {
        if ltype.base != DataValueType::Bits {
            return Err(Self::error(stmt, "Invalid bit restriction".to_owned()));
        }
        let name = stmt.arg()?;
        if !self.features_enabled(stmt, scope)? {
            ltype.bits.retain(|(bit_name, _)| bit_name != name);
            return Ok(());
        }

        if derived {
            if !ltype.bits.iter().any(|(bit_name, _)| bit_name == name) {
                return Err(Self::error(
                    stmt,
                    format!("Bit \"{}\" not defined in the base type", name),
                ));
            }
            return Ok(());
        }

        if ltype.bits.iter().any(|(bit_name, _)| bit_name == name) {
            return Err(Self::error(
                stmt,
                format!("Duplicate bit \"{}\"", name),
            ));
        }
        let position = match stmt.arg_of("position") {
            Some(position) => position.parse::<u32>().map_err(|_| {
                Self::error(
                    stmt,
                    format!("Invalid bit position \"{}\"", position),
                )
            })?,
            None => ltype
                .bits
                .iter()
                .map(|(_, position)| *position)
                .max()
                .map_or(0, |max| max + 1),
        };
        ltype.bits.push((name.to_owned(), position));
        ltype.bits.sort_by_key(|(_, position)| *position);
        Ok(())
    }

    // ----- leafrefs -----

    fn resolve_leafrefs(&mut self) -> Result<()> {
        for (id, module) in std::mem::take(&mut self.leafrefs) {
            let Some(mut ltype) = self.ctx.nodes[id].leaf_type.take() else {
                continue;
            };
            let result = self.resolve_leafref_type(&mut ltype, id, module);
            self.ctx.nodes[id].leaf_type = Some(ltype);
            result?;
        }
        Ok(())
    }

    fn resolve_leafref_type(
        &self,
        ltype: &mut LeafType,
        id: usize,
        module: usize,
    ) -> Result<()> {
        for member in &mut ltype.union_types {
            self.resolve_leafref_type(member, id, module)?;
        }
        let Some(path) = ltype.leafref_path.clone() else {
            return Ok(());
        };
        if ltype.base != DataValueType::LeafRef {
            return Ok(());
        }

        match self.leafref_target(&path, id, module) {
            Ok(target) => {
                ltype.leafref_target = Some(target);
                Ok(())
            }
            Err(Some(error)) => Err(error),
            Err(None) => {
                logging::warn(
                    &format!(
                        "Target of leafref \"{}\" is in a non-implemented \
                         module, values are not checked.",
                        path
                    ),
                    None,
                );
                Ok(())
            }
        }
    }

    /// Resolve the target leaf of a leafref path. `Err(None)` means the
    /// target lives in a module that isn't implemented.
    fn leafref_target(
        &self,
        path: &str,
        id: usize,
        module: usize,
    ) -> std::result::Result<usize, Option<Error>> {
        let path = strip_predicates(path);
        let not_found = || {
            Some(Error::schema(format!(
                "Target of leafref \"{}\" in \"{}\" not found",
                path, self.ctx.nodes[id].name
            )))
        };

        let mut current: Option<usize> = Some(id);
        let mut steps = path.split('/');
        if path.starts_with('/') {
            current = None;
            steps.next();
        }
        let mut first = path.starts_with('/');
        for step in steps {
            let step = step.trim();
            match step {
                "" | "current()" | "." => continue,
                ".." => {
                    let node = current.ok_or_else(not_found)?;
                    current = self.data_parent(node);
                    if current.is_none() {
                        first = true;
                    }
                }
                _ => {
                    let (prefix, name) = split_prefix(step);
                    let step_module = resolve_prefix(self.ctx, module, prefix)
                        .ok_or_else(not_found)?;
                    let candidates = match current {
                        None if first => {
                            let target_module = match prefix {
                                Some(_) => step_module,
                                None => module,
                            };
                            if !self.ctx.modules[target_module].implemented {
                                return Err(None);
                            }
                            crate::schema::data_children(
                                self.ctx,
                                self.ctx.modules[target_module].data,
                            )
                            .into_iter()
                            .map(|snode| snode.id())
                            .collect::<Vec<_>>()
                        }
                        None => return Err(not_found()),
                        Some(node) => crate::schema::data_children(
                            self.ctx,
                            self.ctx.nodes[node].first_child,
                        )
                        .into_iter()
                        .map(|snode| snode.id())
                        .collect(),
                    };
                    first = false;
                    current = Some(
                        candidates
                            .into_iter()
                            .find(|candidate| {
                                self.ctx.nodes[*candidate].name == name
                            })
                            .ok_or_else(not_found)?,
                    );
                }
            }
        }

        let target = current.ok_or_else(not_found)?;
        match self.ctx.nodes[target].kind {
            SchemaNodeKind::Leaf | SchemaNodeKind::LeafList if target != id => {
                Ok(target)
            }
            _ => Err(not_found()),
        }
    }

    /// Closest ancestor present in data trees (skipping choice and case).
    fn data_parent(&self, id: usize) -> Option<usize> {
        let mut parent = self.ctx.nodes[id].parent;
        while let Some(id) = parent {
            match self.ctx.nodes[id].kind {
                SchemaNodeKind::Choice | SchemaNodeKind::Case => {
                    parent = self.ctx.nodes[id].parent
                }
                _ => return Some(id),
            }
        }
        None
    }
}

fn restrictions(stmt: &Stmt, keyword: &str) -> Vec<Restriction> {
    stmt.all(keyword)
        .map(|restriction| Restriction {
            condition: restriction.arg.clone().unwrap_or_default(),
            description: restriction.arg_of("description").map(str::to_owned),
            reference: restriction.arg_of("reference").map(str::to_owned),
            error_msg: restriction.arg_of("error-message").map(str::to_owned),
            error_apptag: restriction
                .arg_of("error-app-tag")
                .map(str::to_owned),
        })
        .collect()
}

fn names_of<'s>(stmt: &'s Stmt, keyword: &'s str) -> Vec<&'s str> {
    stmt.all(keyword).filter_map(|substmt| substmt.arg.as_deref()).collect()
}

fn has_leafref(ltype: &LeafType) -> bool {
    ltype.base == DataValueType::LeafRef
        || ltype.union_types.iter().any(has_leafref)
}

fn builtin_type(name: &str) -> Option<DataValueType> {
    let base = match name {
        "binary" => DataValueType::Binary,
        "bits" => DataValueType::Bits,
        "boolean" => DataValueType::Bool,
        "decimal64" => DataValueType::Dec64,
        "empty" => DataValueType::Empty,
        "enumeration" => DataValueType::Enum,
        "identityref" => DataValueType::IdentityRef,
        "instance-identifier" => DataValueType::InstanceId,
        "int8" => DataValueType::Int8,
        "int16" => DataValueType::Int16,
        "int32" => DataValueType::Int32,
        "int64" => DataValueType::Int64,
        "leafref" => DataValueType::LeafRef,
        "string" => DataValueType::String,
        "uint8" => DataValueType::Uint8,
        "uint16" => DataValueType::Uint16,
        "uint32" => DataValueType::Uint32,
        "uint64" => DataValueType::Uint64,
        "union" => DataValueType::Union,
        _ => return None,
    };
    Some(base)
}

/// Parse a range or length expression ("1..10 | 20 | 30..max"). Every
/// interval must be contained in the intervals currently allowed.
fn parse_intervals<F>(
    expr: &str,
    current: &[(i128, i128)],
    parse: F,
) -> std::result::Result<Vec<(i128, i128)>, String>
where
    F: Fn(&str) -> Option<i128>,
{
    let (Some(min), Some(max)) = (
        current.first().map(|(lo, _)| *lo),
        current.last().map(|(_, hi)| *hi),
    ) else {
        return Err("Empty base range".to_owned());
    };
    let bound = |s: &str| -> std::result::Result<i128, String> {
        match s.trim() {
            "min" => Ok(min),
            "max" => Ok(max),
            s => parse(s)
                .ok_or_else(|| format!("Invalid range bound \"{}\"", s)),
        }
    };

    let mut intervals: Vec<(i128, i128)> = vec![];
    for part in expr.split('|') {
        let (lo, hi) = match part.split_once("..") {
            Some((lo, hi)) => (bound(lo)?, bound(hi)?),
            None => {
                let value = bound(part)?;
                (value, value)
            }
        };
        if lo > hi {
            return Err(format!("Invalid range \"{}\"", part.trim()));
        }
        if let Some((_, prev_hi)) = intervals.last() {
            if lo <= *prev_hi {
                return Err(format!(
                    "Range \"{}\" is not in ascending order",
                    expr
                ));
            }
        }
        if !current
            .iter()
            .any(|(cur_lo, cur_hi)| lo >= *cur_lo && hi <= *cur_hi)
        {
            return Err(format!(
                "Range \"{}\" is not a restriction of the base type",
                part.trim()
            ));
        }
        intervals.push((lo, hi));
    }
    Ok(intervals)
}

/// Remove path predicates ("[...]"), quoted strings included.
fn strip_predicates(path: &str) -> String {
    let mut result = String::new();
    let mut depth = 0;
    let mut quote = None;
    for c in path.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') if depth > 0 => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth -= 1,
            (None, c) if depth == 0 && !c.is_whitespace() => result.push(c),
            _ => {}
        }
    }
    result
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intervals() {
        let base = [(0, 255)];
        let parse = |s: &str| s.parse::<i128>().ok();
        assert_eq!(
            parse_intervals("1..10 | 20 | 30..max", &base, parse),
            Ok(vec![(1, 10), (20, 20), (30, 255)])
        );
        assert!(parse_intervals("10..1", &base, parse).is_err());
        assert!(parse_intervals("0..300", &base, parse).is_err());
        assert!(parse_intervals("5..10 | 1..2", &base, parse).is_err());
    }

    #[test]
    fn predicates() {
        assert_eq!(
            strip_predicates(
                "/if:interfaces/if:interface[if:name = current()/../name]\
                 /if:type"
            ),
            "/if:interfaces/if:interface/if:type"
        );
        assert_eq!(strip_predicates("../../x[a='[b]']/y"), "../../x/y");
    }
}
