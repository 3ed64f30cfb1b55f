//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! JSON encoding of instance data (RFC 7951).

use std::fmt;

use serde::de::{
    self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor,
};
use serde_json::{Map, Number, Value};

use crate::data::{
    self, Data, DataNodeRef, DataParserFlags, DataPrinterFlags, DataTree,
    MetaInner,
};
use crate::error::{Error, Result};
use crate::schema::{DataValue, SchemaNode, SchemaNodeKind};
use crate::utils::{split_prefix, Binding};
use crate::value;

// ===== parser =====

pub(crate) fn parse(
    tree: &mut DataTree<'_>,
    data: &str,
    options: DataParserFlags,
) -> Result<()> {
    let Document(document) = serde_json::from_str(data).map_err(|error| {
        Error::format(format!("Invalid JSON document: {}", error))
            .with_line(error.line() as u64)
    })?;
    let Value::Object(members) = document else {
        return Err(Error::format("JSON document must be an object"));
    };

    parse_members(tree, None, &members, options)
}

/// A JSON value whose objects have unique member names.
///
/// Plain `Value` deserialization keeps only the last of repeated members,
/// which would drop instance data without notice.
struct Document(Value);

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(DocumentVisitor).map(Document)
    }
}

struct DocumentVisitor;

impl<'de> Visitor<'de> for DocumentVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_bool<E>(self, value: bool) -> std::result::Result<Value, E> {
        Ok(Value::Bool(value))
    }

    fn visit_i64<E>(self, value: i64) -> std::result::Result<Value, E> {
        Ok(Value::from(value))
    }

    fn visit_u64<E>(self, value: u64) -> std::result::Result<Value, E> {
        Ok(Value::from(value))
    }

    fn visit_f64<E>(self, value: f64) -> std::result::Result<Value, E> {
        Ok(Number::from_f64(value).map_or(Value::Null, Value::Number))
    }

    fn visit_str<E>(self, value: &str) -> std::result::Result<Value, E> {
        Ok(Value::String(value.to_owned()))
    }

    fn visit_string<E>(self, value: String) -> std::result::Result<Value, E> {
        Ok(Value::String(value))
    }

    fn visit_unit<E>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut values = vec![];
        while let Some(Document(value)) = seq.next_element()? {
            values.push(value);
        }
        Ok(Value::Array(values))
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut members = Map::new();
        while let Some(name) = map.next_key::<String>()? {
            if members.contains_key(&name) {
                return Err(de::Error::custom(format!(
                    "duplicate member \"{}\"",
                    name
                )));
            }
            let Document(value) = map.next_value()?;
            members.insert(name, value);
        }
        Ok(Value::Object(members))
    }
}

fn parse_members(
    tree: &mut DataTree<'_>,
    parent: Option<usize>,
    members: &Map<String, Value>,
    options: DataParserFlags,
) -> Result<()> {
    let ctx = tree.context();
    let parent_path = parent.map(|id| DataNodeRef::from_id(&*tree, id).path());
    let parent_module =
        parent.map(|id| ctx.nodes[tree.nodes[id].schema].module);

    for (member, value) in members {
        // Annotations are attached once their nodes exist.
        if member.starts_with('@') {
            continue;
        }

        let (prefix, name) = split_prefix(member);
        let module = match prefix {
            Some(prefix) => ctx.module_id(prefix),
            None => match parent_module {
                Some(module) => Some(module),
                None => {
                    return Err(Error::format(format!(
                        "Top-level member \"{}\" isn't qualified by a \
                         module name",
                        member
                    )))
                }
            },
        };
        let Some(module) = module else {
            data::skip_unknown(
                options,
                format!(
                    "No module named \"{}\" in the context",
                    prefix.unwrap_or_default()
                ),
                parent_path.clone(),
            )?;
            continue;
        };
        if !ctx.modules[module].implemented {
            let error = Error::validation(format!(
                "Data of non-implemented module \"{}\"",
                ctx.modules[module].name
            ));
            return Err(match &parent_path {
                Some(path) => error.with_path(path.clone()),
                None => error,
            });
        }

        let parent_schema = parent.map(|id| tree.nodes[id].schema);
        let snode =
            data::schema_child(ctx, parent_schema, module, name, false);
        let Some(snode) = snode else {
            data::skip_unknown(
                options,
                format!(
                    "Node \"{}\" not found in the schema of module \"{}\"",
                    name, ctx.modules[module].name
                ),
                parent_path.clone(),
            )?;
            continue;
        };
        data::check_parsed_node(options, &snode, parent_path.clone())?;

        let instances = parse_member(tree, parent, &snode, value, options)?;
        if let Some(annotations) = members.get(&format!("@{}", member)) {
            parse_annotations(tree, &instances, annotations)?;
        }
    }

    if let (Some(parent), Some(annotations)) = (parent, members.get("@")) {
        parse_annotations(tree, &[parent], annotations)?;
    }

    Ok(())
}

fn invalid_value(
    tree: &DataTree<'_>,
    parent: Option<usize>,
    snode: &SchemaNode<'_>,
) -> Error {
    let error = Error::validation(format!(
        "Invalid JSON value of {} \"{}\"",
        kind_name(snode.kind()),
        snode.name()
    ));
    match parent {
        Some(parent) => {
            error.with_path(DataNodeRef::from_id(tree, parent).path())
        }
        None => error,
    }
}

fn kind_name(kind: SchemaNodeKind) -> &'static str {
    match kind {
        SchemaNodeKind::Container => "container",
        SchemaNodeKind::List => "list",
        SchemaNodeKind::Leaf => "leaf",
        SchemaNodeKind::LeafList => "leaf-list",
        SchemaNodeKind::AnyData => "anydata",
        SchemaNodeKind::AnyXml => "anyxml",
        _ => "node",
    }
}

/// Create the instances of one member, returning their ids.
fn parse_member(
    tree: &mut DataTree<'_>,
    parent: Option<usize>,
    snode: &SchemaNode<'_>,
    value: &Value,
    options: DataParserFlags,
) -> Result<Vec<usize>> {
    match snode.kind() {
        SchemaNodeKind::Container => {
            let Value::Object(members) = value else {
                return Err(invalid_value(tree, parent, snode));
            };
            let id = tree.insert(parent, snode.id(), None);
            parse_members(tree, Some(id), members, options)?;
            Ok(vec![id])
        }
        SchemaNodeKind::List => {
            let Value::Array(entries) = value else {
                return Err(invalid_value(tree, parent, snode));
            };
            let mut instances = vec![];
            for entry in entries {
                let Value::Object(members) = entry else {
                    return Err(invalid_value(tree, parent, snode));
                };
                let id = tree.insert(parent, snode.id(), None);
                parse_members(tree, Some(id), members, options)?;
                data::finish_list(tree, id)?;
                instances.push(id);
            }
            Ok(instances)
        }
        SchemaNodeKind::Leaf => {
            let id = parse_terminal(tree, parent, snode, value)?;
            Ok(vec![id])
        }
        SchemaNodeKind::LeafList => {
            let Value::Array(entries) = value else {
                return Err(invalid_value(tree, parent, snode));
            };
            entries
                .iter()
                .map(|entry| parse_terminal(tree, parent, snode, entry))
                .collect()
        }
        SchemaNodeKind::AnyData | SchemaNodeKind::AnyXml => {
            let id = tree.insert(parent, snode.id(), Some(value.to_string()));
            Ok(vec![id])
        }
        _ => Err(invalid_value(tree, parent, snode)),
    }
}

fn parse_terminal(
    tree: &mut DataTree<'_>,
    parent: Option<usize>,
    snode: &SchemaNode<'_>,
    value: &Value,
) -> Result<usize> {
    let ctx = tree.context();
    let raw = match value {
        Value::String(value) => value.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(value) => value.to_string(),
        Value::Array(entries)
            if matches!(entries.as_slice(), [Value::Null]) =>
        {
            String::new()
        }
        _ => return Err(invalid_value(tree, parent, snode)),
    };

    // Unqualified identities belong to the module of the leaf.
    let module = snode.module().id();
    let resolve = |prefix: Option<&str>| match prefix {
        Some(prefix) => ctx.module_id(prefix),
        None => Some(module),
    };
    let canonical = match snode.inner().leaf_type.as_ref() {
        Some(ltype) => value::canonicalize(ctx, ltype, &raw, &resolve)
            .map_err(|msg| {
                let error = Error::validation(msg);
                match parent {
                    Some(parent) => error.with_path(
                        DataNodeRef::from_id(&*tree, parent).path(),
                    ),
                    None => error,
                }
            })?,
        None => raw,
    };

    Ok(tree.insert(parent, snode.id(), Some(canonical)))
}

fn parse_annotations(
    tree: &mut DataTree<'_>,
    instances: &[usize],
    annotations: &Value,
) -> Result<()> {
    match annotations {
        Value::Object(members) => {
            for id in instances {
                add_metadata(tree, *id, members)?;
            }
            Ok(())
        }
        // Leaf-list annotations are matched by position.
        Value::Array(entries) => {
            for (id, entry) in instances.iter().zip(entries) {
                match entry {
                    Value::Object(members) => add_metadata(tree, *id, members)?,
                    Value::Null => {}
                    _ => {
                        return Err(Error::format(
                            "Invalid JSON metadata object",
                        ))
                    }
                }
            }
            Ok(())
        }
        _ => Err(Error::format("Invalid JSON metadata object")),
    }
}

fn add_metadata(
    tree: &mut DataTree<'_>,
    id: usize,
    members: &Map<String, Value>,
) -> Result<()> {
    for (name, value) in members {
        let (Some(_), _) = split_prefix(name) else {
            return Err(Error::format(format!(
                "Metadata \"{}\" isn't qualified by a module name",
                name
            )));
        };
        let value = match value {
            Value::String(value) => value.clone(),
            value => value.to_string(),
        };
        tree.nodes[id].meta.push(MetaInner {
            name: name.clone(),
            value,
        });
    }
    Ok(())
}

// ===== printer =====

pub(crate) fn print(
    tree: &DataTree<'_>,
    roots: &[usize],
    options: DataPrinterFlags,
) -> String {
    let dnodes = roots
        .iter()
        .map(|id| DataNodeRef::from_id(tree, *id))
        .collect::<Vec<_>>();
    // Printed roots are always qualified, even when nested in the tree.
    let mut members = Map::new();
    add_members(&dnodes, None, options, &mut members);
    let document = Value::Object(members);

    if options.contains(DataPrinterFlags::SHRINK) {
        document.to_string()
    } else {
        let mut output =
            serde_json::to_string_pretty(&document).unwrap_or_default();
        output.push('\n');
        output
    }
}

fn is_printable(
    dnode: &DataNodeRef<'_, '_>,
    options: DataPrinterFlags,
) -> bool {
    if dnode.schema().is_np_container()
        && !options.contains(DataPrinterFlags::KEEP_EMPTY_CONT)
    {
        return dnode.children().any(|child| is_printable(&child, options));
    }
    true
}

fn member_name(snode: &SchemaNode<'_>, parent_module: Option<usize>) -> String {
    let module = snode.module();
    if parent_module == Some(module.id()) {
        snode.name().to_owned()
    } else {
        format!("{}:{}", module.name(), snode.name())
    }
}

/// Add the members for a set of sibling nodes. Instances of lists and
/// leaf-lists are grouped at their first occurrence.
fn add_members(
    dnodes: &[DataNodeRef<'_, '_>],
    parent_module: Option<usize>,
    options: DataPrinterFlags,
    members: &mut Map<String, Value>,
) {
    let mut done: Vec<usize> = vec![];
    for dnode in dnodes {
        let snode = dnode.schema();
        if done.contains(&snode.id()) || !is_printable(dnode, options) {
            continue;
        }
        let name = member_name(&snode, parent_module);

        match snode.kind() {
            SchemaNodeKind::List | SchemaNodeKind::LeafList => {
                done.push(snode.id());
                let instances = dnodes
                    .iter()
                    .filter(|other| other.schema().id() == snode.id())
                    .collect::<Vec<_>>();
                let entries = instances
                    .iter()
                    .map(|instance| node_value(instance, options))
                    .collect::<Vec<_>>();
                members.insert(name.clone(), Value::Array(entries));

                if snode.kind() == SchemaNodeKind::LeafList
                    && instances
                        .iter()
                        .any(|instance| instance.meta().next().is_some())
                {
                    let annotations = instances
                        .iter()
                        .map(|instance| match metadata(instance) {
                            Some(meta) => Value::Object(meta),
                            None => Value::Null,
                        })
                        .collect();
                    members.insert(
                        format!("@{}", name),
                        Value::Array(annotations),
                    );
                }
            }
            _ => {
                members.insert(name.clone(), node_value(dnode, options));
                if matches!(
                    snode.kind(),
                    SchemaNodeKind::Leaf
                        | SchemaNodeKind::AnyData
                        | SchemaNodeKind::AnyXml
                ) {
                    if let Some(meta) = metadata(dnode) {
                        members
                            .insert(format!("@{}", name), Value::Object(meta));
                    }
                }
            }
        }
    }
}

fn metadata(dnode: &DataNodeRef<'_, '_>) -> Option<Map<String, Value>> {
    let meta = dnode
        .meta()
        .map(|meta| {
            let value = Value::String(meta.value().to_owned());
            (meta.name().to_owned(), value)
        })
        .collect::<Map<_, _>>();
    (!meta.is_empty()).then_some(meta)
}

fn node_value(dnode: &DataNodeRef<'_, '_>, options: DataPrinterFlags) -> Value {
    let ctx = dnode.context();
    let snode = dnode.schema();
    match snode.kind() {
        SchemaNodeKind::Leaf | SchemaNodeKind::LeafList => {
            let canonical = dnode.inner().value.as_deref().unwrap_or_default();
            match snode.inner().leaf_type.as_ref() {
                Some(ltype) => {
                    terminal_value(value::typed_value(ctx, ltype, canonical))
                }
                None => Value::String(canonical.to_owned()),
            }
        }
        SchemaNodeKind::AnyData | SchemaNodeKind::AnyXml => {
            let content = dnode.inner().value.as_deref().unwrap_or_default();
            serde_json::from_str(content)
                .unwrap_or_else(|_| Value::String(content.to_owned()))
        }
        _ => {
            let children = dnode.children().collect::<Vec<_>>();
            let mut members = Map::new();
            add_members(
                &children,
                Some(snode.module().id()),
                options,
                &mut members,
            );
            if let Some(meta) = metadata(dnode) {
                members.insert("@".to_owned(), Value::Object(meta));
            }
            Value::Object(members)
        }
    }
}

// 64-bit integers and decimal64 are encoded as strings.
fn terminal_value(value: DataValue) -> Value {
    match value {
        DataValue::Uint8(v) => Value::from(v),
        DataValue::Uint16(v) => Value::from(v),
        DataValue::Uint32(v) => Value::from(v),
        DataValue::Int8(v) => Value::from(v),
        DataValue::Int16(v) => Value::from(v),
        DataValue::Int32(v) => Value::from(v),
        DataValue::Uint64(v) => Value::String(v.to_string()),
        DataValue::Int64(v) => Value::String(v.to_string()),
        DataValue::Bool(v) => Value::Bool(v),
        DataValue::Empty => Value::Array(vec![Value::Null]),
        DataValue::Other(v) => Value::String(v),
    }
}
