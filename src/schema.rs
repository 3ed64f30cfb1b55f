//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! YANG schema data.

use bitflags::bitflags;
use regex::Regex;
use std::sync::Arc;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::iter::{Ancestors, NodeIterable, Set, Siblings, Traverse};
use crate::utils::Binding;
use crate::yang::Stmt;

/// Available YANG schema tree structures representing YANG module.
#[derive(Clone, Debug)]
pub struct SchemaModule<'a> {
    context: &'a Context,
    id: usize,
}

/// Schema input formats accepted by yangtree.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SchemaInputFormat {
    YANG,
    YIN,
}

/// Schema output formats supported by yangtree.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SchemaOutputFormat {
    /// Compiled data definitions in the YANG syntax.
    YANG,
    /// RFC 8340 tree diagram.
    TREE,
}

/// Schema path format.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SchemaPathFormat {
    /// Descriptive path format used in log messages.
    LOG,
    /// Similar to LOG except that schema-only nodes (choice, case) are
    /// skipped.
    DATA,
}

bitflags! {
    /// Schema printer flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct SchemaPrinterFlags: u32 {
        /// Flag for output without indentation and formatting new lines.
        const SHRINK = 0x02;
        /// Print only top-level/reference node information, do not print
        /// information from the substatements.
        const NO_SUBSTMT = 0x10;
    }
}

bitflags! {
    /// Compiled schema node flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub(crate) struct NodeFlags: u32 {
        const CONFIG_W = 0x0001;
        const CONFIG_R = 0x0002;
        const STATUS_CURR = 0x0004;
        const STATUS_DEPRC = 0x0008;
        const STATUS_OBSLT = 0x0010;
        const MAND_TRUE = 0x0020;
        const PRESENCE = 0x0040;
        const KEY = 0x0080;
        const KEYLESS = 0x0100;
        const ORDBY_USER = 0x0200;
        const SET_DFLT = 0x0400;
        const IS_INPUT = 0x0800;
        const IS_OUTPUT = 0x1000;
        const IS_NOTIF = 0x2000;
    }
}

/// Generic YANG schema node.
#[derive(Clone, Debug)]
pub struct SchemaNode<'a> {
    context: &'a Context,
    id: usize,
    kind: SchemaNodeKind,
}

/// YANG schema node kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SchemaNodeKind {
    Container,
    Case,
    Choice,
    Leaf,
    LeafList,
    List,
    AnyData,
    AnyXml,
    Rpc,
    Input,
    Output,
    Action,
    Notification,
}

/// YANG must substatement.
#[derive(Clone, Debug)]
pub struct SchemaStmtMust<'a> {
    raw: &'a Restriction,
}

/// YANG when substatement.
#[derive(Clone, Debug)]
pub struct SchemaStmtWhen<'a> {
    raw: &'a Restriction,
}

/// YANG leaf(-list) type.
#[derive(Clone, Debug)]
pub struct SchemaLeafType<'a> {
    context: &'a Context,
    raw: &'a LeafType,
}

/// YANG data value type.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum DataValueType {
    Unknown = 0,
    Binary = 1,
    Uint8 = 2,
    Uint16 = 3,
    Uint32 = 4,
    Uint64 = 5,
    String = 6,
    Bits = 7,
    Bool = 8,
    Dec64 = 9,
    Empty = 10,
    Enum = 11,
    IdentityRef = 12,
    InstanceId = 13,
    LeafRef = 14,
    Union = 15,
    Int8 = 16,
    Int16 = 17,
    Int32 = 18,
    Int64 = 19,
}

/// YANG data value.
#[derive(Clone, Debug, PartialEq)]
pub enum DataValue {
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Bool(bool),
    Empty,
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Other(String),
}

// ===== compiled schema storage =====

/// Compiled module, owned by the context.
#[derive(Clone, Debug)]
pub(crate) struct ModuleInner {
    pub name: String,
    pub revision: Option<String>,
    pub namespace: String,
    pub prefix: String,
    pub filepath: Option<String>,
    pub organization: Option<String>,
    pub contact: Option<String>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub implemented: bool,
    /// Declared features and whether they're enabled.
    pub features: Vec<(String, bool)>,
    /// Import prefixes and the modules they refer to.
    pub imports: Vec<(String, usize)>,
    pub data: Option<usize>,
    pub rpcs: Option<usize>,
    pub notifications: Option<usize>,
    /// Parsed module statement, used to resolve groupings and typedefs
    /// referenced from other modules.
    pub stmt: Arc<Stmt>,
}

/// Compiled schema node, owned by the context.
#[derive(Clone, Debug)]
pub(crate) struct SchemaNodeInner {
    pub module: usize,
    pub kind: SchemaNodeKind,
    pub name: String,
    pub flags: NodeFlags,
    pub parent: Option<usize>,
    pub next: Option<usize>,
    pub first_child: Option<usize>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub leaf_type: Option<LeafType>,
    pub units: Option<String>,
    /// Canonical default values (leaf, leaf-list).
    pub defaults: Vec<String>,
    pub default_case: Option<usize>,
    /// Key leaves of a list, in key order.
    pub keys: Vec<usize>,
    /// Unique constraints of a list (descendant leaf paths).
    pub uniques: Vec<Vec<usize>>,
    pub min_elements: u32,
    pub max_elements: u32,
    pub musts: Vec<Restriction>,
    pub whens: Vec<Restriction>,
    pub actions: Option<usize>,
    pub notifications: Option<usize>,
}

/// Compiled must or when statement.
#[derive(Clone, Debug, Default)]
pub(crate) struct Restriction {
    pub condition: String,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub error_msg: Option<String>,
    pub error_apptag: Option<String>,
}

/// Compiled YANG identity.
#[derive(Clone, Debug)]
pub(crate) struct IdentityInner {
    pub module: usize,
    pub name: String,
    pub bases: Vec<usize>,
}

/// Compiled leaf type with all restrictions of its typedef chain applied.
#[derive(Clone, Debug)]
pub(crate) struct LeafType {
    pub base: DataValueType,
    pub name: Option<String>,
    /// Value ranges (scaled by the fraction digits for decimal64).
    pub ranges: Option<Vec<(i128, i128)>>,
    pub lengths: Option<Vec<(u64, u64)>>,
    pub patterns: Vec<(Regex, bool)>,
    pub enums: Vec<(String, i64)>,
    pub bits: Vec<(String, u32)>,
    pub fraction_digits: u8,
    pub union_types: Vec<LeafType>,
    pub bases: Vec<usize>,
    pub leafref_path: Option<String>,
    pub leafref_target: Option<usize>,
    pub require_instance: bool,
    pub units: Option<String>,
    /// Default value inherited from a typedef.
    pub default: Option<String>,
}

impl SchemaNodeInner {
    pub fn new(module: usize, kind: SchemaNodeKind, name: &str) -> Self {
        SchemaNodeInner {
            module,
            kind,
            name: name.to_owned(),
            flags: NodeFlags::empty(),
            parent: None,
            next: None,
            first_child: None,
            description: None,
            reference: None,
            leaf_type: None,
            units: None,
            defaults: vec![],
            default_case: None,
            keys: vec![],
            uniques: vec![],
            min_elements: 0,
            max_elements: u32::MAX,
            musts: vec![],
            whens: vec![],
            actions: None,
            notifications: None,
        }
    }
}

impl LeafType {
    pub fn new(base: DataValueType) -> Self {
        LeafType {
            base,
            name: None,
            ranges: None,
            lengths: None,
            patterns: vec![],
            enums: vec![],
            bits: vec![],
            fraction_digits: 0,
            union_types: vec![],
            bases: vec![],
            leafref_path: None,
            leafref_target: None,
            require_instance: true,
            units: None,
            default: None,
        }
    }
}

// ===== impl SchemaModule =====

impl<'a> SchemaModule<'a> {
    fn inner(&self) -> &'a ModuleInner {
        &self.context.modules[self.id]
    }

    pub(crate) fn id(&self) -> usize {
        self.id
    }

    /// Name of the module.
    pub fn name(&self) -> &'a str {
        &self.inner().name
    }

    /// Revision of the module.
    pub fn revision(&self) -> Option<&'a str> {
        self.inner().revision.as_deref()
    }

    /// Namespace of the module.
    pub fn namespace(&self) -> &'a str {
        &self.inner().namespace
    }

    /// Prefix of the module.
    pub fn prefix(&self) -> &'a str {
        &self.inner().prefix
    }

    /// File path, if the schema was read from a file.
    pub fn filepath(&self) -> Option<&'a str> {
        self.inner().filepath.as_deref()
    }

    /// Party/company responsible for the module.
    pub fn organization(&self) -> Option<&'a str> {
        self.inner().organization.as_deref()
    }

    /// Contact information for the module.
    pub fn contact(&self) -> Option<&'a str> {
        self.inner().contact.as_deref()
    }

    /// Description of the module.
    pub fn description(&self) -> Option<&'a str> {
        self.inner().description.as_deref()
    }

    /// Cross-reference for the module.
    pub fn reference(&self) -> Option<&'a str> {
        self.inner().reference.as_deref()
    }

    /// Return true if the module is implemented, not just imported.
    pub fn is_implemented(&self) -> bool {
        self.inner().implemented
    }

    /// Get the current real status of the specified feature in the module.
    pub fn feature_value(&self, feature: &str) -> Result<bool> {
        self.inner()
            .features
            .iter()
            .find(|(name, _)| name == feature)
            .map(|(_, enabled)| *enabled)
            .ok_or_else(|| {
                Error::not_found(format!(
                    "Feature \"{}\" not found in module \"{}\"",
                    feature,
                    self.name()
                ))
            })
    }

    /// Print schema tree in the specified format into a string.
    pub fn print_string(
        &self,
        format: SchemaOutputFormat,
        options: SchemaPrinterFlags,
    ) -> Result<String> {
        Ok(crate::printer::print_module(self, format, options))
    }

    /// Returns an iterator over the top-level data nodes.
    pub fn data(&self) -> Siblings<'a, SchemaNode<'a>> {
        let data = SchemaNode::from_id_opt(self.context, self.inner().data);
        Siblings::new(data)
    }

    /// Returns an iterator over the list of RPCs.
    pub fn rpcs(&self) -> Siblings<'a, SchemaNode<'a>> {
        let rpcs = SchemaNode::from_id_opt(self.context, self.inner().rpcs);
        Siblings::new(rpcs)
    }

    /// Returns an iterator over the list of notifications.
    pub fn notifications(&self) -> Siblings<'a, SchemaNode<'a>> {
        let notifications =
            SchemaNode::from_id_opt(self.context, self.inner().notifications);
        Siblings::new(notifications)
    }

    /// Returns an iterator over all data nodes in the schema module
    /// (depth-first search algorithm).
    ///
    /// NOTE: augmentations from other modules are iterated over as part of
    /// the augmented module.
    pub fn traverse(&self) -> impl Iterator<Item = SchemaNode<'a>> {
        let data = self.data().flat_map(|snode| snode.traverse());
        let rpcs = self.rpcs().flat_map(|snode| snode.traverse());
        let notifications =
            self.notifications().flat_map(|snode| snode.traverse());
        data.chain(rpcs).chain(notifications)
    }
}

impl<'a> Binding<'a> for SchemaModule<'a> {
    type Container = Context;

    fn from_id(context: &'a Context, id: usize) -> SchemaModule<'a> {
        SchemaModule { context, id }
    }
}

impl PartialEq for SchemaModule<'_> {
    fn eq(&self, other: &SchemaModule<'_>) -> bool {
        std::ptr::eq(self.context, other.context) && self.id == other.id
    }
}

// ===== impl SchemaNode =====

impl<'a> SchemaNode<'a> {
    pub(crate) fn inner(&self) -> &'a SchemaNodeInner {
        &self.context.nodes[self.id]
    }

    pub(crate) fn id(&self) -> usize {
        self.id
    }

    #[doc(hidden)]
    fn check_flag(&self, flag: NodeFlags) -> bool {
        self.inner().flags.contains(flag)
    }

    /// Schema node module.
    pub fn module(&self) -> SchemaModule<'a> {
        SchemaModule::from_id(self.context, self.inner().module)
    }

    /// Returns the kind of the schema node.
    #[doc(alias = "nodetype")]
    pub fn kind(&self) -> SchemaNodeKind {
        self.kind
    }

    /// Schema node name.
    pub fn name(&self) -> &'a str {
        &self.inner().name
    }

    /// Description statement.
    pub fn description(&self) -> Option<&'a str> {
        self.inner().description.as_deref()
    }

    /// Reference statement.
    pub fn reference(&self) -> Option<&'a str> {
        self.inner().reference.as_deref()
    }

    /// Generate path of the node.
    pub fn path(&self, format: SchemaPathFormat) -> String {
        let mut nodes = self.inclusive_ancestors().collect::<Vec<_>>();
        nodes.reverse();

        let mut path = String::new();
        let mut module = None;
        for snode in nodes {
            if format == SchemaPathFormat::DATA && snode.is_schema_only() {
                continue;
            }
            path.push('/');
            if module != Some(snode.inner().module) {
                module = Some(snode.inner().module);
                path.push_str(snode.module().name());
                path.push(':');
            }
            path.push_str(snode.name());
        }
        path
    }

    /// Evaluate a path expression on the schema, returning all matching
    /// schema nodes.
    ///
    /// Absolute expressions are evaluated from the schema root. Predicates
    /// are checked against the schema but don't filter the result.
    pub fn find_xpath(&self, xpath: &str) -> Result<Set<'a, SchemaNode<'a>>> {
        crate::xpath::find_schema(self.context, xpath)
    }

    /// Get a schema node based on the given data path (JSON format).
    pub fn find_path(&self, path: &str) -> Result<SchemaNode<'a>> {
        crate::xpath::find_schema_single(self.context, path)
    }

    /// Returns whether the node is a configuration node.
    pub fn is_config(&self) -> bool {
        self.check_flag(NodeFlags::CONFIG_W)
    }

    /// Returns whether the node is a state node.
    pub fn is_state(&self) -> bool {
        self.check_flag(NodeFlags::CONFIG_R)
    }

    /// Returns whether the node's status is "current".
    pub fn is_status_current(&self) -> bool {
        self.check_flag(NodeFlags::STATUS_CURR)
    }

    /// Returns whether the node's status is "deprecated".
    pub fn is_status_deprecated(&self) -> bool {
        self.check_flag(NodeFlags::STATUS_DEPRC)
    }

    /// Returns whether the node's status is "obsolete".
    pub fn is_status_obsolete(&self) -> bool {
        self.check_flag(NodeFlags::STATUS_OBSLT)
    }

    /// Returns whether the node is mandatory.
    pub fn is_mandatory(&self) -> bool {
        self.check_flag(NodeFlags::MAND_TRUE)
    }

    /// Returns whether the node is a non-presence container.
    pub fn is_np_container(&self) -> bool {
        match self.kind {
            SchemaNodeKind::Container => !self.check_flag(NodeFlags::PRESENCE),
            _ => false,
        }
    }

    /// Returns whether the node is a list's key.
    pub fn is_list_key(&self) -> bool {
        self.check_flag(NodeFlags::KEY)
    }

    /// Returns whether the node is a keyless list.
    pub fn is_keyless_list(&self) -> bool {
        self.check_flag(NodeFlags::KEYLESS)
    }

    /// Returns whether the node is an user-ordered list or leaf-list.
    pub fn is_user_ordered(&self) -> bool {
        self.check_flag(NodeFlags::ORDBY_USER)
    }

    /// Returns whether the node appears only in the schema tree and not in the
    /// data tree.
    pub fn is_schema_only(&self) -> bool {
        matches!(self.kind(), SchemaNodeKind::Choice | SchemaNodeKind::Case)
    }

    /// Returns whether the node is in the subtree of an input statement.
    pub fn is_within_input(&self) -> bool {
        self.check_flag(NodeFlags::IS_INPUT)
    }

    /// Returns whether the node is in the subtree of an output statement.
    pub fn is_within_output(&self) -> bool {
        self.check_flag(NodeFlags::IS_OUTPUT)
    }

    /// Returns whether the node is in the subtree of a notification statement.
    pub fn is_within_notification(&self) -> bool {
        self.check_flag(NodeFlags::IS_NOTIF)
    }

    /// Returns whether a default value is set.
    pub fn has_default(&self) -> bool {
        self.check_flag(NodeFlags::SET_DFLT)
    }

    /// The default value of the leaf (canonical string representation).
    pub fn default_value_canonical(&self) -> Option<&'a str> {
        match self.kind {
            SchemaNodeKind::Leaf => {
                self.inner().defaults.first().map(String::as_str)
            }
            _ => None,
        }
    }

    /// The default value of the leaf (typed representation).
    pub fn default_value(&self) -> Option<DataValue> {
        let canonical = self.default_value_canonical()?;
        let ltype = self.inner().leaf_type.as_ref()?;
        Some(crate::value::typed_value(self.context, ltype, canonical))
    }

    /// The default values of the leaf-list (canonical string representation).
    pub fn default_values_canonical(&self) -> impl Iterator<Item = &'a str> {
        let defaults = match self.kind {
            SchemaNodeKind::LeafList => self.inner().defaults.as_slice(),
            _ => &[],
        };
        defaults.iter().map(String::as_str)
    }

    /// The default case of the choice.
    pub fn default_case(&self) -> Option<SchemaNode<'a>> {
        SchemaNode::from_id_opt(self.context, self.inner().default_case)
    }

    /// Type of the leaf(-list) node.
    pub fn leaf_type(&self) -> Option<SchemaLeafType<'a>> {
        let raw = self.inner().leaf_type.as_ref()?;
        Some(SchemaLeafType {
            context: self.context,
            raw,
        })
    }

    /// Units of the leaf(-list)'s type.
    pub fn units(&self) -> Option<&'a str> {
        self.inner().units.as_deref()
    }

    /// The min-elements constraint.
    pub fn min_elements(&self) -> Option<u32> {
        match self.kind {
            SchemaNodeKind::LeafList | SchemaNodeKind::List => {
                let min = self.inner().min_elements;
                if min != 0 {
                    Some(min)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// The max-elements constraint.
    pub fn max_elements(&self) -> Option<u32> {
        match self.kind {
            SchemaNodeKind::LeafList | SchemaNodeKind::List => {
                let max = self.inner().max_elements;
                if max != u32::MAX {
                    Some(max)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Array of must restrictions.
    pub fn musts(&self) -> impl Iterator<Item = SchemaStmtMust<'a>> {
        self.inner().musts.iter().map(|raw| SchemaStmtMust { raw })
    }

    /// Array of when statements.
    pub fn whens(&self) -> impl Iterator<Item = SchemaStmtWhen<'a>> {
        self.inner().whens.iter().map(|raw| SchemaStmtWhen { raw })
    }

    /// Array of actions.
    pub fn actions(&self) -> Siblings<'a, SchemaNode<'a>> {
        let node = SchemaNode::from_id_opt(self.context, self.inner().actions);
        Siblings::new(node)
    }

    /// Array of notifications.
    pub fn notifications(&self) -> Siblings<'a, SchemaNode<'a>> {
        let node =
            SchemaNode::from_id_opt(self.context, self.inner().notifications);
        Siblings::new(node)
    }

    /// RPC's input node.
    pub fn input(&self) -> Option<SchemaNode<'a>> {
        match self.kind {
            SchemaNodeKind::Rpc | SchemaNodeKind::Action => self
                .children()
                .find(|snode| snode.kind() == SchemaNodeKind::Input),
            _ => None,
        }
    }

    /// RPC's output node.
    pub fn output(&self) -> Option<SchemaNode<'a>> {
        match self.kind {
            SchemaNodeKind::Rpc | SchemaNodeKind::Action => self
                .children()
                .find(|snode| snode.kind() == SchemaNodeKind::Output),
            _ => None,
        }
    }

    /// Returns the first child node, or `None` for nodes without children.
    pub fn child(&self) -> Option<SchemaNode<'a>> {
        self.first_child()
    }

    /// Returns the parent node, or `None` for top-level nodes.
    pub fn parent(&self) -> Option<SchemaNode<'a>> {
        NodeIterable::parent(self)
    }

    /// Returns the next sibling node.
    pub fn next_sibling(&self) -> Option<SchemaNode<'a>> {
        NodeIterable::next_sibling(self)
    }

    /// Returns an iterator over the ancestor schema nodes.
    pub fn ancestors(&self) -> Ancestors<'a, SchemaNode<'a>> {
        let parent = self.parent();
        Ancestors::new(parent)
    }

    /// Returns an iterator over this schema node and its ancestors.
    pub fn inclusive_ancestors(&self) -> Ancestors<'a, SchemaNode<'a>> {
        Ancestors::new(Some(self.clone()))
    }

    /// Returns an iterator over the sibling schema nodes.
    pub fn siblings(&self) -> Siblings<'a, SchemaNode<'a>> {
        let sibling = self.next_sibling();
        Siblings::new(sibling)
    }

    /// Returns an iterator over this schema node and its siblings.
    pub fn inclusive_siblings(&self) -> Siblings<'a, SchemaNode<'a>> {
        Siblings::new(Some(self.clone()))
    }

    /// Returns an iterator over the child schema nodes, excluding action and
    /// notification nodes.
    pub fn children(&self) -> Siblings<'a, SchemaNode<'a>> {
        let child = self.first_child();
        Siblings::new(child)
    }

    /// Returns an iterator over all child schema nodes, including action and
    /// notification nodes.
    pub fn all_children(&self) -> impl Iterator<Item = SchemaNode<'a>> {
        self.children()
            .chain(self.actions())
            .chain(self.notifications())
    }

    /// Returns an iterator over all elements in the schema tree (depth-first
    /// search algorithm).
    pub fn traverse(&self) -> Traverse<'a, SchemaNode<'a>> {
        Traverse::new(self.clone())
    }

    /// Returns all elements of the schema subtree rooted at this node, in
    /// pre-order (the node itself first, then its descendants in declaration
    /// order).
    pub fn tree_dfs(&self) -> Vec<SchemaNode<'a>> {
        self.traverse().collect()
    }

    /// Returns an iterator over the keys of the list.
    pub fn list_keys(&self) -> impl Iterator<Item = SchemaNode<'a>> {
        let context = self.context;
        self.inner()
            .keys
            .iter()
            .map(move |id| SchemaNode::from_id(context, *id))
    }

    /// Returns the data children of this node, looking through schema-only
    /// nodes (choice and case).
    pub(crate) fn data_children(&self) -> Vec<SchemaNode<'a>> {
        data_children(self.context, self.inner().first_child)
    }

    /// Finds a data child by name and (optionally) module, looking through
    /// schema-only nodes.
    pub(crate) fn find_data_child(
        &self,
        module: Option<usize>,
        name: &str,
    ) -> Option<SchemaNode<'a>> {
        find_data_child(self.context, self.inner().first_child, module, name)
    }
}

/// Returns the data nodes among the given siblings, descending into choices
/// and cases.
pub(crate) fn data_children(
    context: &Context,
    first: Option<usize>,
) -> Vec<SchemaNode<'_>> {
    let mut nodes = vec![];
    for snode in Siblings::new(SchemaNode::from_id_opt(context, first)) {
        if snode.is_schema_only() {
            nodes.extend(data_children(context, snode.inner().first_child));
        } else {
            nodes.push(snode);
        }
    }
    nodes
}

/// Finds a data node among the given siblings, descending into choices and
/// cases.
pub(crate) fn find_data_child<'c>(
    context: &'c Context,
    first: Option<usize>,
    module: Option<usize>,
    name: &str,
) -> Option<SchemaNode<'c>> {
    data_children(context, first).into_iter().find(|snode| {
        snode.name() == name
            && module.map_or(true, |module| snode.inner().module == module)
    })
}

impl<'a> Binding<'a> for SchemaNode<'a> {
    type Container = Context;

    fn from_id(context: &'a Context, id: usize) -> SchemaNode<'a> {
        let kind = context.nodes[id].kind;
        SchemaNode { context, id, kind }
    }
}

impl<'a> NodeIterable<'a> for SchemaNode<'a> {
    fn parent(&self) -> Option<SchemaNode<'a>> {
        SchemaNode::from_id_opt(self.context, self.inner().parent)
    }

    fn next_sibling(&self) -> Option<SchemaNode<'a>> {
        SchemaNode::from_id_opt(self.context, self.inner().next)
    }

    fn first_child(&self) -> Option<SchemaNode<'a>> {
        SchemaNode::from_id_opt(self.context, self.inner().first_child)
    }
}

impl PartialEq for SchemaNode<'_> {
    fn eq(&self, other: &SchemaNode<'_>) -> bool {
        std::ptr::eq(self.context, other.context) && self.id == other.id
    }
}

// ===== impl SchemaStmtMust =====

impl<'a> SchemaStmtMust<'a> {
    /// XPath condition.
    pub fn condition(&self) -> &'a str {
        &self.raw.condition
    }

    /// description substatement.
    pub fn description(&self) -> Option<&'a str> {
        self.raw.description.as_deref()
    }

    /// reference substatement.
    pub fn reference(&self) -> Option<&'a str> {
        self.raw.reference.as_deref()
    }

    /// error-message substatement.
    pub fn error_msg(&self) -> Option<&'a str> {
        self.raw.error_msg.as_deref()
    }

    /// error-app-tag substatement.
    pub fn error_apptag(&self) -> Option<&'a str> {
        self.raw.error_apptag.as_deref()
    }
}

// ===== impl SchemaStmtWhen =====

impl<'a> SchemaStmtWhen<'a> {
    /// XPath condition.
    pub fn condition(&self) -> &'a str {
        &self.raw.condition
    }

    /// description substatement.
    pub fn description(&self) -> Option<&'a str> {
        self.raw.description.as_deref()
    }

    /// reference substatement.
    pub fn reference(&self) -> Option<&'a str> {
        self.raw.reference.as_deref()
    }
}

// ===== impl SchemaLeafType =====

impl<'a> SchemaLeafType<'a> {
    /// Returns the resolved base type.
    pub fn base_type(&self) -> DataValueType {
        self.raw.base
    }

    /// Returns the typedef name if it exists.
    pub fn typedef_name(&self) -> Option<String> {
        self.raw.name.clone()
    }

    /// Returns the real type of the leafref, corresponding to the first
    /// non-leafref in a possible chain of leafrefs.
    pub fn leafref_real_type(&self) -> Option<SchemaLeafType<'a>> {
        if self.base_type() != DataValueType::LeafRef {
            return None;
        }

        let raw = crate::value::leafref_real_type(self.context, self.raw)?;
        Some(SchemaLeafType {
            context: self.context,
            raw,
        })
    }

    /// Returns the leafref path, if this is a leafref type.
    pub fn leafref_path(&self) -> Option<&'a str> {
        self.raw.leafref_path.as_deref()
    }

    /// Returns the names and values of an enumeration type.
    pub fn enums(&self) -> impl Iterator<Item = (&'a str, i64)> {
        self.raw
            .enums
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
    }

    /// Returns the member types of a union type.
    pub fn union_types(&self) -> impl Iterator<Item = SchemaLeafType<'a>> {
        let context = self.context;
        self.raw
            .union_types
            .iter()
            .map(move |raw| SchemaLeafType { context, raw })
    }

    /// Returns the fraction digits of a decimal64 type.
    pub fn fraction_digits(&self) -> Option<u8> {
        match self.raw.base {
            DataValueType::Dec64 => Some(self.raw.fraction_digits),
            _ => None,
        }
    }
}
