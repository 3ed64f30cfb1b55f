//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! YANG instance data.

use bitflags::bitflags;
use std::path::Path;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::iter::{
    Ancestors, MetadataList, NodeIterable, Set, Siblings, Traverse,
};
use crate::logging;
use crate::schema::{DataValue, SchemaModule, SchemaNode, SchemaNodeKind};
use crate::utils::*;
use crate::validate::{self, ValidateOptions};
use crate::xpath::{self, Field, Predicate};
use crate::{json, value, xml};

/// YANG data tree.
#[derive(Debug)]
pub struct DataTree<'a> {
    pub(crate) context: &'a Context,
    pub(crate) nodes: Vec<DataNodeInner>,
    pub(crate) first: Option<usize>,
}

/// YANG data node reference.
#[derive(Clone, Debug)]
pub struct DataNodeRef<'a, 'b> {
    tree: &'a DataTree<'b>,
    id: usize,
}

/// The structure provides information about metadata of a data element. Such
/// attributes must map to annotations as specified in RFC 7952. In XML, they
/// are represented as standard XML attributes. In JSON, they are represented
/// as JSON members starting with the '@' character.
#[derive(Clone, Debug)]
pub struct Metadata<'a> {
    list: &'a [MetaInner],
    index: usize,
}

/// Data node storage, owned by the data tree.
#[derive(Clone, Debug)]
pub(crate) struct DataNodeInner {
    pub schema: usize,
    /// Canonical value of terminal nodes, verbatim content of anydata.
    pub value: Option<String>,
    pub parent: Option<usize>,
    pub next: Option<usize>,
    pub prev: Option<usize>,
    pub first_child: Option<usize>,
    pub last_child: Option<usize>,
    pub meta: Vec<MetaInner>,
}

/// Metadata storage.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct MetaInner {
    /// Qualified name ("module:name").
    pub name: String,
    pub value: String,
}

/// Data input/output formats supported by yangtree.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DataFormat {
    /// XML instance data format.
    XML,
    /// JSON instance data format.
    JSON,
}

bitflags! {
    /// Data parser options.
    ///
    /// Exactly one parsing mode must be selected:
    /// - `DATA`: complete datastore content (configuration and state data),
    ///   validated according to all YANG rules.
    /// - `CONFIG`: configuration datastore content, state data are rejected.
    /// - `GET`: reply to a NETCONF `<get>` operation. Configuration and state
    ///   data, mandatory nodes and min-elements aren't checked.
    /// - `GET_CONFIG`: reply to a NETCONF `<get-config>` operation. Like `GET`
    ///   but state data are rejected.
    ///
    /// Default parser behavior:
    /// - data without matching schema node definition are skipped with a
    ///   warning.
    /// - list instances are checked whether they have all the keys, an error
    ///   is raised if not (also with `TRUSTED`).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct DataParserFlags: u32 {
        /// Complete datastore content.
        const DATA = 0x01;
        /// Configuration data only.
        const CONFIG = 0x02;
        /// Reply to a `<get>` operation.
        const GET = 0x04;
        /// Reply to a `<get-config>` operation.
        const GET_CONFIG = 0x08;
        /// Instead of silently ignoring data without schema definition raise
        /// an error.
        const STRICT = 0x10000;
        /// Data will be only parsed and no validation will be performed.
        const TRUSTED = 0x20000;
    }
}

bitflags! {
    /// Data validation options.
    ///
    /// Various options to change data validation behaviour, both for the parser
    /// and separate validation.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct DataValidationFlags: u32 {
        /// Consider state data not allowed and raise an error if they are
        /// found.
        const NO_STATE = 0x01;
        /// Validate only modules whose data actually exist.
        const PRESENT = 0x02;
    }
}

bitflags! {
    /// Data printer flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct DataPrinterFlags: u32 {
        /// Flag for printing also the (following) sibling nodes of the data
        /// node.
        const WITH_SIBLINGS = 0x01;
        /// Flag for output without indentation and formatting new lines.
        const SHRINK = 0x02;
        /// Preserve empty non-presence containers.
        const KEEP_EMPTY_CONT = 0x04;
    }
}

/// Methods common to data trees and data node references.
pub trait Data<'a> {
    #[doc(hidden)]
    fn context(&self) -> &'a Context {
        self.tree().context
    }

    #[doc(hidden)]
    fn tree(&self) -> &DataTree<'a>;

    /// Node printing starts from (`None` for empty trees).
    #[doc(hidden)]
    fn start(&self) -> Option<usize>;

    /// Search in the given data for instances of nodes matching the provided
    /// path.
    ///
    /// The expected format of the expression is JSON, meaning the first node
    /// in every path must have its module name as prefix or be the special
    /// `*` value for all the nodes. Paths are always absolute.
    ///
    /// A predicate matching nothing yields an empty set. Paths referencing
    /// unknown modules or nodes fail with a schema error.
    fn find(&self, path: &str) -> Result<Set<'_, DataNodeRef<'_, 'a>>> {
        let tree = self.tree();
        let ids = xpath::find_data(tree, path).inspect_err(logging::log_error)?;
        Ok(Set::new(tree, ids))
    }

    /// Search in the given data for a single node matching the provided path.
    ///
    /// Fails unless exactly one node matches.
    fn find_single(&self, path: &str) -> Result<DataNodeRef<'_, 'a>> {
        let tree = self.tree();
        let ids = xpath::find_data(tree, path).inspect_err(logging::log_error)?;
        match ids.as_slice() {
            [id] => Ok(DataNodeRef::from_id(tree, *id)),
            [] => Err(Error::not_found(format!(
                "No data node found for path \"{}\"",
                path
            ))),
            _ => Err(Error::not_found(format!(
                "Multiple data nodes found for path \"{}\"",
                path
            ))),
        }
    }

    /// Print data tree in the specified format to a `String`.
    fn print_string(
        &self,
        format: DataFormat,
        options: DataPrinterFlags,
    ) -> Result<String> {
        let tree = self.tree();
        let roots = match self.start() {
            Some(start)
                if options.contains(DataPrinterFlags::WITH_SIBLINGS) =>
            {
                DataNodeRef::from_id(tree, start)
                    .first_sibling()
                    .inclusive_siblings()
                    .map(|dnode| dnode.id)
                    .collect()
            }
            Some(start) => vec![start],
            None => vec![],
        };

        let output = match format {
            DataFormat::XML => xml::print(tree, &roots, options),
            DataFormat::JSON => json::print(tree, &roots, options),
        };
        Ok(output)
    }

    /// Print data tree in the specified format to a bytes vector.
    fn print_bytes(
        &self,
        format: DataFormat,
        options: DataPrinterFlags,
    ) -> Result<Vec<u8>> {
        self.print_string(format, options).map(String::into_bytes)
    }
}

// ===== impl DataParserFlags =====

impl DataParserFlags {
    const MODES: DataParserFlags = DataParserFlags::DATA
        .union(DataParserFlags::CONFIG)
        .union(DataParserFlags::GET)
        .union(DataParserFlags::GET_CONFIG);

    /// Check that exactly one parsing mode is selected.
    pub(crate) fn check(bits: u32) -> Result<DataParserFlags> {
        let options = DataParserFlags::from_bits(bits).ok_or_else(|| {
            Error::config(format!("Unknown data parser options 0x{:x}", bits))
        })?;
        match options.intersection(Self::MODES).bits().count_ones() {
            1 => Ok(options),
            0 => Err(Error::config("Missing data parser mode")),
            _ => Err(Error::config("Conflicting data parser modes")),
        }
    }

    /// Whether state data are rejected.
    pub(crate) fn no_state(&self) -> bool {
        self.intersects(DataParserFlags::CONFIG | DataParserFlags::GET_CONFIG)
    }

    /// Whether the data is an operation reply (incomplete datastore).
    pub(crate) fn is_reply(&self) -> bool {
        self.intersects(DataParserFlags::GET | DataParserFlags::GET_CONFIG)
    }
}

// ===== impl DataTree =====

impl<'a> DataTree<'a> {
    /// Create new empty data tree.
    pub fn new(context: &'a Context) -> DataTree<'a> {
        DataTree {
            context,
            nodes: vec![],
            first: None,
        }
    }

    /// Parse (and validate) input data as a YANG data tree.
    pub fn parse_file<P: AsRef<Path>>(
        context: &'a Context,
        path: P,
        format: DataFormat,
        options: DataParserFlags,
    ) -> Result<DataTree<'a>> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|error| {
                Error::from(error).with_path(path.display().to_string())
            })
            .inspect_err(logging::log_error)?;
        DataTree::parse_string(context, data, format, options)
    }

    /// Parse (and validate) input data as a YANG data tree.
    pub fn parse_string(
        context: &'a Context,
        data: impl AsRef<[u8]>,
        format: DataFormat,
        options: DataParserFlags,
    ) -> Result<DataTree<'a>> {
        DataTree::parse(context, data.as_ref(), format, options)
            .inspect_err(logging::log_error)
    }

    fn parse(
        context: &'a Context,
        data: &[u8],
        format: DataFormat,
        options: DataParserFlags,
    ) -> Result<DataTree<'a>> {
        let options = DataParserFlags::check(options.bits())?;
        let data = std::str::from_utf8(data).map_err(|error| {
            Error::format(format!("Invalid UTF-8 input: {}", error))
        })?;

        let mut tree = DataTree::new(context);
        match format {
            DataFormat::XML => xml::parse(&mut tree, data, options)?,
            DataFormat::JSON => json::parse(&mut tree, data, options)?,
        }

        if !options.contains(DataParserFlags::TRUSTED) {
            validate::validate(
                &tree,
                ValidateOptions {
                    no_state: options.no_state(),
                    present: false,
                    mandatory: !options.is_reply(),
                    leafrefs: !options.is_reply(),
                },
            )?;
        }

        Ok(tree)
    }

    /// Returns a reference to the fist top-level data node, unless the data
    /// tree is empty.
    pub fn reference<'b>(&'b self) -> Option<DataNodeRef<'b, 'a>> {
        DataNodeRef::from_id_opt(self, self.first)
    }

    /// Create a new node or modify existing one in the data tree based on a
    /// path.
    ///
    /// If path points to a list key and the list instance does not exist,
    /// the key value from the predicate is used and value is ignored. Also,
    /// if a leaf-list is being created and both a predicate is defined in
    /// path and value is set, the predicate is preferred.
    ///
    /// For key-less lists and state leaf-lists, positional predicates can be
    /// used. If no predicate is used for these nodes, they are always created.
    ///
    /// The output parameter can be used to change the behavior to ignore
    /// RPC/action input schema nodes and use only output ones.
    ///
    /// Returns the last created or modified node (if any).
    pub fn new_path(
        &mut self,
        path: &str,
        value: Option<&str>,
        output: bool,
    ) -> Result<Option<DataNodeRef<'_, 'a>>> {
        let mark = self.nodes.len();
        let last = self
            .new_path_id(path, value, output)
            .map_err(|error| {
                self.rollback(mark);
                match error.path {
                    Some(_) => error,
                    None => error.with_path(path),
                }
            })
            .inspect_err(logging::log_error)?;
        Ok(DataNodeRef::from_id_opt(self, last))
    }

    /// Drop all nodes created after the arena had `mark` entries.
    ///
    /// Nodes are only ever appended, so the created nodes form subtrees whose
    /// roots hang off older nodes (or the top level).
    fn rollback(&mut self, mark: usize) {
        let roots = (mark..self.nodes.len())
            .filter(|id| {
                self.nodes[*id].parent.map_or(true, |parent| parent < mark)
            })
            .collect::<Vec<_>>();
        for id in roots {
            self.unlink(id);
        }
        self.nodes.truncate(mark);
    }

    fn new_path_id(
        &mut self,
        path: &str,
        value: Option<&str>,
        output: bool,
    ) -> Result<Option<usize>> {
        let ctx = self.context;
        let steps = xpath::parse(path)?;
        let resolve =
            |prefix: Option<&str>| prefix.and_then(|name| ctx.module_id(name));
        let canonical = |snode: &SchemaNode<'_>, raw: &str| -> Result<String> {
            let ltype = snode.inner().leaf_type.as_ref().ok_or_else(|| {
                Error::schema(format!("Node \"{}\" has no type", snode.name()))
            })?;
            value::canonicalize(ctx, ltype, raw, &resolve)
                .map_err(Error::validation)
        };

        let mut parent: Option<usize> = None;
        let mut module: Option<usize> = None;
        let mut last = None;
        let count = steps.len();
        for (index, step) in steps.iter().enumerate() {
            let is_last = index + 1 == count;
            let name = step.name.as_deref().ok_or_else(|| {
                Error::syntax("Wildcard steps can't be used to create nodes")
            })?;
            if let Some(prefix) = &step.prefix {
                module = Some(ctx.module_id(prefix).ok_or_else(|| {
                    Error::schema(format!("Module \"{}\" not found", prefix))
                })?);
            }
            let module = module.ok_or_else(|| {
                Error::syntax("The first path step must be module-qualified")
            })?;
            let parent_schema = parent.map(|id| self.nodes[id].schema);
            let snode = schema_child(ctx, parent_schema, module, name, output)
                .ok_or_else(|| {
                    Error::schema(format!("Schema node \"{}\" not found", name))
                })?;

            let existing = self
                .children_of(parent)
                .into_iter()
                .filter(|id| self.nodes[*id].schema == snode.id())
                .collect::<Vec<_>>();

            let id = match snode.kind() {
                SchemaNodeKind::List => {
                    let mut keys = vec![];
                    let mut position = None;
                    for predicate in &step.predicates {
                        match predicate {
                            Predicate::Position(pos) => position = Some(*pos),
                            Predicate::Equals {
                                field: Field::Child { name, .. },
                                value,
                            } => {
                                let key = snode
                                    .list_keys()
                                    .find(|key| key.name() == name)
                                    .ok_or_else(|| {
                                        Error::schema(format!(
                                            "Key \"{}\" not found in list \
                                             \"{}\"",
                                            name,
                                            snode.name()
                                        ))
                                    })?;
                                keys.push((key.id(), canonical(&key, value)?));
                            }
                            _ => {
                                return Err(Error::syntax(
                                    "Invalid list instance predicate",
                                ))
                            }
                        }
                    }

                    if let Some(pos) = position {
                        existing.get(pos.wrapping_sub(1)).copied().ok_or_else(
                            || {
                                Error::not_found(format!(
                                    "List instance \"{}[{}]\" not found",
                                    snode.name(),
                                    pos
                                ))
                            },
                        )?
                    } else if snode.is_keyless_list() {
                        let id = self.insert(parent, snode.id(), None);
                        last = Some(id);
                        id
                    } else {
                        if keys.len() != snode.list_keys().count() {
                            return Err(Error::validation(format!(
                                "Missing key predicates of list \"{}\"",
                                snode.name()
                            )));
                        }
                        let has_key = |id: usize, key: usize, value: &String| {
                            self.children_of(Some(id)).into_iter().any(|child| {
                                let child = &self.nodes[child];
                                child.schema == key
                                    && child.value.as_ref() == Some(value)
                            })
                        };
                        let found = existing.iter().copied().find(|id| {
                            keys.iter()
                                .all(|(key, value)| has_key(*id, *key, value))
                        });
                        match found {
                            Some(id) => id,
                            None => {
                                let id = self.insert(parent, snode.id(), None);
                                for key in snode.list_keys() {
                                    let value = keys
                                        .iter()
                                        .find(|(id, _)| *id == key.id())
                                        .map(|(_, value)| value.clone());
                                    self.insert(Some(id), key.id(), value);
                                }
                                last = Some(id);
                                id
                            }
                        }
                    }
                }
                SchemaNodeKind::LeafList => {
                    if !is_last {
                        return Err(Error::syntax(format!(
                            "Leaf-list \"{}\" can't have children",
                            snode.name()
                        )));
                    }
                    let mut position = None;
                    let mut raw = value.map(str::to_owned);
                    for predicate in &step.predicates {
                        match predicate {
                            Predicate::Position(pos) => position = Some(*pos),
                            Predicate::Equals {
                                field: Field::Current,
                                value,
                            } => raw = Some(value.clone()),
                            _ => {
                                return Err(Error::syntax(
                                    "Invalid leaf-list instance predicate",
                                ))
                            }
                        }
                    }
                    let raw = raw.unwrap_or_default();
                    let value = canonical(&snode, &raw)?;
                    match position {
                        Some(pos) => {
                            let id = existing
                                .get(pos.wrapping_sub(1))
                                .copied()
                                .ok_or_else(|| {
                                    Error::not_found(format!(
                                        "Leaf-list instance \"{}[{}]\" not \
                                         found",
                                        snode.name(),
                                        pos
                                    ))
                                })?;
                            if self.nodes[id].value.as_ref() != Some(&value) {
                                self.nodes[id].value = Some(value);
                                last = Some(id);
                            }
                            id
                        }
                        None => {
                            let found = existing.iter().copied().find(|id| {
                                self.nodes[*id].value.as_ref() == Some(&value)
                            });
                            match found {
                                Some(id) if snode.is_config() => id,
                                _ => {
                                    let id = self.insert(
                                        parent,
                                        snode.id(),
                                        Some(value),
                                    );
                                    last = Some(id);
                                    id
                                }
                            }
                        }
                    }
                }
                SchemaNodeKind::Leaf => {
                    if !is_last {
                        return Err(Error::syntax(format!(
                            "Leaf \"{}\" can't have children",
                            snode.name()
                        )));
                    }
                    let value = canonical(&snode, value.unwrap_or_default())?;
                    match existing.first() {
                        Some(id) if snode.is_list_key() => {
                            if self.nodes[*id].value.as_ref() != Some(&value) {
                                return Err(Error::validation(format!(
                                    "Key \"{}\" of an existing list instance \
                                     can't be modified",
                                    snode.name()
                                )));
                            }
                            *id
                        }
                        Some(id) => {
                            if self.nodes[*id].value.as_ref() != Some(&value) {
                                self.nodes[*id].value = Some(value);
                                last = Some(*id);
                            }
                            *id
                        }
                        None => {
                            let id =
                                self.insert(parent, snode.id(), Some(value));
                            last = Some(id);
                            id
                        }
                    }
                }
                _ => match existing.first() {
                    Some(id) => *id,
                    None => {
                        let content = match snode.kind() {
                            SchemaNodeKind::AnyData
                            | SchemaNodeKind::AnyXml => {
                                value.map(str::to_owned)
                            }
                            _ => None,
                        };
                        let id = self.insert(parent, snode.id(), content);
                        last = Some(id);
                        id
                    }
                },
            };
            parent = Some(id);
        }

        Ok(last)
    }

    /// Remove a data node.
    pub fn remove(&mut self, path: &str) -> Result<()> {
        let id = self.find_single(path).inspect_err(logging::log_error)?.id;
        self.unlink(id);
        self.compact();
        Ok(())
    }

    /// Fully validate the data tree.
    pub fn validate(&mut self, options: DataValidationFlags) -> Result<()> {
        validate::validate(
            self,
            ValidateOptions {
                no_state: options.contains(DataValidationFlags::NO_STATE),
                present: options.contains(DataValidationFlags::PRESENT),
                mandatory: true,
                leafrefs: true,
            },
        )
        .inspect_err(logging::log_error)
    }

    /// Create a copy of the data tree.
    pub fn duplicate<'b>(&'b self) -> Result<DataTree<'a>> {
        let mut dup = DataTree::new(self.context);
        let mut next = self.first;
        while let Some(id) = next {
            dup.copy_subtree(self, id, None);
            next = self.nodes[id].next;
        }
        Ok(dup)
    }

    /// Returns an iterator over all elements in the data tree and its sibling
    /// trees (depth-first search algorithm).
    pub fn traverse<'b>(&'b self) -> impl Iterator<Item = DataNodeRef<'b, 'a>> {
        let top = Siblings::new(self.reference());
        top.flat_map(|dnode| dnode.traverse())
    }

    /// Returns all elements of the data tree and its sibling trees in
    /// depth-first order.
    pub fn tree_dfs<'b>(&'b self) -> Vec<DataNodeRef<'b, 'a>> {
        self.traverse().collect()
    }

    // ----- arena management -----

    /// Ids of the children of a node (of the top-level nodes for `None`).
    pub(crate) fn children_of(&self, parent: Option<usize>) -> Vec<usize> {
        let mut ids = vec![];
        let mut next = match parent {
            Some(parent) => self.nodes[parent].first_child,
            None => self.first,
        };
        while let Some(id) = next {
            ids.push(id);
            next = self.nodes[id].next;
        }
        ids
    }

    /// Append a new node to the children of `parent` (or to the top-level
    /// nodes).
    pub(crate) fn insert(
        &mut self,
        parent: Option<usize>,
        schema: usize,
        value: Option<String>,
    ) -> usize {
        let id = self.nodes.len();
        let prev = match parent {
            Some(parent) => self.nodes[parent].last_child,
            None => self.children_of(None).last().copied(),
        };
        self.nodes.push(DataNodeInner {
            schema,
            value,
            parent,
            next: None,
            prev,
            first_child: None,
            last_child: None,
            meta: vec![],
        });
        match prev {
            Some(prev) => self.nodes[prev].next = Some(id),
            None => match parent {
                Some(parent) => self.nodes[parent].first_child = Some(id),
                None => self.first = Some(id),
            },
        }
        if let Some(parent) = parent {
            self.nodes[parent].last_child = Some(id);
        }
        id
    }

    /// Detach a node (and its subtree) from the tree.
    pub(crate) fn unlink(&mut self, id: usize) {
        let DataNodeInner {
            parent, prev, next, ..
        } = self.nodes[id];
        match prev {
            Some(prev) => self.nodes[prev].next = next,
            None => match parent {
                Some(parent) => self.nodes[parent].first_child = next,
                None => self.first = next,
            },
        }
        match next {
            Some(next) => self.nodes[next].prev = prev,
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent].last_child = prev;
                }
            }
        }
        let node = &mut self.nodes[id];
        node.parent = None;
        node.prev = None;
        node.next = None;
    }

    /// Move the given children of a node to the front, in the given order.
    pub(crate) fn move_first(&mut self, parent: usize, ids: &[usize]) {
        for id in ids.iter().rev() {
            self.unlink(*id);
            let first = self.nodes[parent].first_child;
            let node = &mut self.nodes[*id];
            node.parent = Some(parent);
            node.next = first;
            match first {
                Some(first) => self.nodes[first].prev = Some(*id),
                None => self.nodes[parent].last_child = Some(*id),
            }
            self.nodes[parent].first_child = Some(*id);
        }
    }

    /// Copy a subtree of another tree, appending it to `parent`.
    pub(crate) fn copy_subtree(
        &mut self,
        source: &DataTree<'_>,
        id: usize,
        parent: Option<usize>,
    ) -> usize {
        let inner = &source.nodes[id];
        let copy = self.insert(parent, inner.schema, inner.value.clone());
        self.nodes[copy].meta = inner.meta.clone();
        for child in source.children_of(Some(id)) {
            self.copy_subtree(source, child, Some(copy));
        }
        copy
    }

    /// Drop unlinked nodes from the arena.
    fn compact(&mut self) {
        let mut compacted = DataTree::new(self.context);
        for id in self.children_of(None) {
            compacted.copy_subtree(self, id, None);
        }
        self.nodes = compacted.nodes;
        self.first = compacted.first;
    }
}

impl<'a> Data<'a> for DataTree<'a> {
    fn tree(&self) -> &DataTree<'a> {
        self
    }

    fn start(&self) -> Option<usize> {
        self.first
    }
}

/// Find the schema node of a data node named `name` from `module`.
///
/// Operation nodes (RPCs and actions) are looked up as well; their children
/// are taken from the input or the output, depending on `output`.
pub(crate) fn schema_child<'a>(
    ctx: &'a Context,
    parent: Option<usize>,
    module: usize,
    name: &str,
    output: bool,
) -> Option<SchemaNode<'a>> {
    match parent {
        None => {
            let inner = &ctx.modules[module];
            let find = |first| {
                crate::schema::find_data_child(ctx, first, Some(module), name)
            };
            find(inner.data).or_else(|| find(inner.rpcs))
        }
        Some(parent) => {
            let snode = SchemaNode::from_id(ctx, parent);
            let snode = match snode.kind() {
                SchemaNodeKind::Rpc | SchemaNodeKind::Action => {
                    match output {
                        true => snode.output(),
                        false => snode.input(),
                    }?
                }
                _ => snode,
            };
            snode.find_data_child(Some(module), name).or_else(|| {
                snode
                    .actions()
                    .find(|action| {
                        action.name() == name && action.inner().module == module
                    })
            })
        }
    }
}

// ===== parser helpers =====

/// Handle an element without schema definition: an error in strict mode,
/// otherwise it's skipped with a warning.
pub(crate) fn skip_unknown(
    options: DataParserFlags,
    msg: String,
    parent_path: Option<String>,
) -> Result<()> {
    if options.contains(DataParserFlags::STRICT) {
        let error = Error::validation(msg);
        return Err(match parent_path {
            Some(path) => error.with_path(path),
            None => error,
        });
    }
    logging::warn(&format!("{}, skipped.", msg), parent_path.as_deref());
    Ok(())
}

/// Check that an instance of the schema node may appear in parsed data.
pub(crate) fn check_parsed_node(
    options: DataParserFlags,
    snode: &SchemaNode<'_>,
    parent_path: Option<String>,
) -> Result<()> {
    let error = match snode.kind() {
        SchemaNodeKind::Rpc
        | SchemaNodeKind::Action
        | SchemaNodeKind::Notification => Some(format!(
            "Unexpected operation node \"{}\" in data",
            snode.name()
        )),
        _ if options.no_state() && snode.is_state() => Some(format!(
            "Unexpected state data node \"{}\" found",
            snode.name()
        )),
        _ => None,
    };
    match error {
        Some(msg) => {
            let error = Error::validation(msg);
            Err(match parent_path {
                Some(path) => error.with_path(path),
                None => error,
            })
        }
        None => Ok(()),
    }
}

/// Check that a parsed list instance has all its keys, moving them in front
/// of the other children.
pub(crate) fn finish_list(tree: &mut DataTree<'_>, id: usize) -> Result<()> {
    let ctx = tree.context;
    let snode = SchemaNode::from_id(ctx, tree.nodes[id].schema);
    let children = tree.children_of(Some(id));
    let mut keys = vec![];
    for key in snode.list_keys() {
        let instances = children
            .iter()
            .copied()
            .filter(|child| tree.nodes[*child].schema == key.id())
            .collect::<Vec<_>>();
        match instances.as_slice() {
            [instance] => keys.push(*instance),
            [] => {
                return Err(Error::validation(format!(
                    "List instance is missing its key \"{}\"",
                    key.name()
                ))
                .with_path(DataNodeRef::from_id(tree, id).path()))
            }
            _ => {
                return Err(Error::validation(format!(
                    "Duplicate instance of key \"{}\"",
                    key.name()
                ))
                .with_path(DataNodeRef::from_id(tree, id).path()))
            }
        }
    }
    tree.move_first(id, &keys);
    Ok(())
}

// ===== impl DataNodeRef =====

impl<'a, 'b> DataNodeRef<'a, 'b> {
    pub(crate) fn id(&self) -> usize {
        self.id
    }

    pub(crate) fn inner(&self) -> &'a DataNodeInner {
        &self.tree.nodes[self.id]
    }

    /// Schema definition of this node.
    pub fn schema(&self) -> SchemaNode<'b> {
        SchemaNode::from_id(self.tree.context, self.inner().schema)
    }

    /// Get the owner module of the data node. It is the module of the top-level
    /// schema node. Generally, in case of augments it is the target module,
    /// recursively, otherwise it is the module where the data node is defined.
    pub fn owner_module(&self) -> SchemaModule<'b> {
        let top = self
            .inclusive_ancestors()
            .last()
            .unwrap_or_else(|| self.clone());
        top.schema().module()
    }

    /// Returns the first child data node.
    pub fn child(&self) -> Option<DataNodeRef<'a, 'b>> {
        self.first_child()
    }

    /// Returns the parent data node.
    pub fn parent(&self) -> Option<DataNodeRef<'a, 'b>> {
        NodeIterable::parent(self)
    }

    /// Returns the next sibling data node.
    pub fn next_sibling(&self) -> Option<DataNodeRef<'a, 'b>> {
        NodeIterable::next_sibling(self)
    }

    /// Returns all nodes of the subtree rooted at this node in depth-first
    /// order, this node first.
    pub fn tree_dfs(&self) -> Vec<DataNodeRef<'a, 'b>> {
        self.traverse().collect()
    }

    /// Returns an iterator over the ancestor data nodes.
    pub fn ancestors(&self) -> Ancestors<'a, DataNodeRef<'a, 'b>> {
        let parent = self.parent();
        Ancestors::new(parent)
    }

    /// Returns an iterator over this data node and its ancestors.
    pub fn inclusive_ancestors(&self) -> Ancestors<'a, DataNodeRef<'a, 'b>> {
        Ancestors::new(Some(self.clone()))
    }

    /// Returns an iterator over the sibling data nodes.
    pub fn siblings(&self) -> Siblings<'a, DataNodeRef<'a, 'b>> {
        let sibling = self.next_sibling();
        Siblings::new(sibling)
    }

    /// Returns an iterator over this data node and its siblings.
    pub fn inclusive_siblings(&self) -> Siblings<'a, DataNodeRef<'a, 'b>> {
        Siblings::new(Some(self.clone()))
    }

    /// Returns an iterator over the child data nodes.
    pub fn children(&self) -> Siblings<'a, DataNodeRef<'a, 'b>> {
        let child = self.first_child();
        Siblings::new(child)
    }

    /// Returns an iterator over all elements in the data tree (depth-first
    /// search algorithm).
    pub fn traverse(&self) -> Traverse<'a, DataNodeRef<'a, 'b>> {
        Traverse::new(self.clone())
    }

    /// Returns an iterator over the keys of the list.
    pub fn list_keys(&self) -> impl Iterator<Item = DataNodeRef<'a, 'b>> {
        self.children().filter(|dnode| dnode.schema().is_list_key())
    }

    /// Returns an iterator over all metadata associated to this node.
    pub fn meta(&self) -> MetadataList<'a> {
        let list = self.inner().meta.as_slice();
        let meta = (!list.is_empty()).then_some(Metadata { list, index: 0 });
        MetadataList::new(meta)
    }

    /// Generate path of the given node.
    ///
    /// Key and leaf-list values are quoted with `'`, or with `"` when they
    /// contain `'`. Values holding both quote characters yield a path that
    /// [`Data::find`] rejects.
    pub fn path(&self) -> String {
        let mut segments = self
            .inclusive_ancestors()
            .map(|dnode| dnode.path_segment())
            .collect::<Vec<_>>();
        segments.reverse();
        segments.concat()
    }

    fn path_segment(&self) -> String {
        let snode = self.schema();
        let module = snode.module();
        let parent_module =
            self.parent().map(|parent| parent.schema().module());

        let mut segment = String::from("/");
        if parent_module.as_ref() != Some(&module) {
            segment.push_str(module.name());
            segment.push(':');
        }
        segment.push_str(snode.name());

        match snode.kind() {
            SchemaNodeKind::List if !snode.is_keyless_list() => {
                for key in snode.list_keys() {
                    let value = self
                        .children()
                        .find(|child| child.schema() == key)
                        .and_then(|child| child.inner().value.clone())
                        .unwrap_or_default();
                    segment.push_str(&format!(
                        "[{}={}]",
                        key.name(),
                        quote_literal(&value)
                    ));
                }
            }
            SchemaNodeKind::LeafList if snode.is_config() => {
                let value = self.inner().value.clone().unwrap_or_default();
                segment.push_str(&format!("[.={}]", quote_literal(&value)));
            }
            SchemaNodeKind::List | SchemaNodeKind::LeafList => {
                let position = self
                    .first_sibling()
                    .inclusive_siblings()
                    .take_while(|sibling| sibling != self)
                    .filter(|sibling| {
                        sibling.inner().schema == self.inner().schema
                    })
                    .count()
                    + 1;
                segment.push_str(&format!("[{}]", position));
            }
            _ => {}
        }
        segment
    }

    /// Returns the first of this node's siblings (possibly itself).
    pub(crate) fn first_sibling(&self) -> DataNodeRef<'a, 'b> {
        let first = match self.inner().parent {
            Some(parent) => self.tree.nodes[parent].first_child,
            None => self.tree.first,
        };
        DataNodeRef::from_id_opt(self.tree, first)
            .unwrap_or_else(|| self.clone())
    }

    /// Node's value (canonical string representation).
    pub fn value_canonical(&self) -> Option<String> {
        match self.schema().kind() {
            SchemaNodeKind::Leaf | SchemaNodeKind::LeafList => {
                self.inner().value.clone()
            }
            _ => None,
        }
    }

    /// Node's value (typed representation).
    pub fn value(&self) -> Option<DataValue> {
        let snode = self.schema();
        match snode.kind() {
            SchemaNodeKind::Leaf | SchemaNodeKind::LeafList => {
                let ltype = snode.inner().leaf_type.as_ref()?;
                let canonical = self.inner().value.as_deref()?;
                Some(value::typed_value(self.tree.context, ltype, canonical))
            }
            _ => None,
        }
    }

    /// Check whether a node value equals to its default one.
    pub fn is_default(&self) -> bool {
        let snode = self.schema();
        match snode.kind() {
            SchemaNodeKind::Leaf | SchemaNodeKind::LeafList => {
                let value = self.inner().value.as_deref();
                snode
                    .default_values_canonical()
                    .any(|default| Some(default) == value)
            }
            _ => false,
        }
    }

    /// Create a copy of the data subtree.
    ///
    /// When the `with_parents` parameter is set, duplicate also all the node
    /// parents. Keys are also duplicated for lists.
    pub fn duplicate(&self, with_parents: bool) -> Result<DataTree<'b>> {
        let mut dup = DataTree::new(self.tree.context);
        let mut parent = None;
        if with_parents {
            let mut ancestors = self.ancestors().collect::<Vec<_>>();
            ancestors.reverse();
            for ancestor in ancestors {
                let copy = dup.insert(parent, ancestor.inner().schema, None);
                for key in ancestor.list_keys() {
                    dup.copy_subtree(self.tree, key.id, Some(copy));
                }
                parent = Some(copy);
            }
        }
        dup.copy_subtree(self.tree, self.id, parent);
        Ok(dup)
    }
}

impl<'a> Data<'a> for DataNodeRef<'_, 'a> {
    fn tree(&self) -> &DataTree<'a> {
        self.tree
    }

    fn start(&self) -> Option<usize> {
        Some(self.id)
    }
}

impl<'a, 'b> Binding<'a> for DataNodeRef<'a, 'b> {
    type Container = DataTree<'b>;

    fn from_id(tree: &'a DataTree<'b>, id: usize) -> DataNodeRef<'a, 'b> {
        DataNodeRef { tree, id }
    }
}

impl<'a, 'b> NodeIterable<'a> for DataNodeRef<'a, 'b> {
    fn parent(&self) -> Option<DataNodeRef<'a, 'b>> {
        DataNodeRef::from_id_opt(self.tree, self.inner().parent)
    }

    fn next_sibling(&self) -> Option<DataNodeRef<'a, 'b>> {
        DataNodeRef::from_id_opt(self.tree, self.inner().next)
    }

    fn first_child(&self) -> Option<DataNodeRef<'a, 'b>> {
        DataNodeRef::from_id_opt(self.tree, self.inner().first_child)
    }
}

impl PartialEq for DataNodeRef<'_, '_> {
    fn eq(&self, other: &DataNodeRef<'_, '_>) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

// ===== impl Metadata =====

impl<'a> Metadata<'a> {
    /// Metadata name (qualified by the module name).
    pub fn name(&self) -> &'a str {
        &self.list[self.index].name
    }

    /// Metadata value representation.
    pub fn value(&self) -> &'a str {
        &self.list[self.index].value
    }

    /// Next metadata.
    #[doc(hidden)]
    pub(crate) fn next(&self) -> Option<Metadata<'a>> {
        let index = self.index + 1;
        (index < self.list.len()).then_some(Metadata {
            list: self.list,
            index,
        })
    }
}

impl PartialEq for Metadata<'_> {
    fn eq(&self, other: &Metadata<'_>) -> bool {
        std::ptr::eq(self.list, other.list) && self.index == other.index
    }
}
