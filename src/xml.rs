//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! XML encoding of instance data (RFC 7950, section 7).

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::context::Context;
use crate::data::{
    self, Data, DataNodeRef, DataParserFlags, DataPrinterFlags, DataTree,
    MetaInner,
};
use crate::error::{Error, Result};
use crate::schema::{DataValueType, SchemaNode, SchemaNodeKind};
use crate::utils::{split_prefix, xml_escape, xml_str, Binding, NamespaceStack};
use crate::value;

/// Open element during parsing.
enum Frame {
    /// Data node being built, with its text content.
    Node { id: usize, text: String },
    /// Anydata node, content kept verbatim from the given input position.
    AnyData { id: usize, start: usize, depth: usize },
    /// Skipped unknown element.
    Skip,
}

// ===== parser =====

pub(crate) fn parse(
    tree: &mut DataTree<'_>,
    data: &str,
    options: DataParserFlags,
) -> Result<()> {
    let ctx = tree.context();
    let mut reader = Reader::from_str(data);
    reader.config_mut().trim_text(false);

    let mut namespaces = NamespaceStack::default();
    let mut stack: Vec<Frame> = vec![];

    loop {
        let position = reader.buffer_position() as usize;
        let event = reader.read_event().map_err(|error| {
            Error::format(format!(
                "Invalid XML at position {}: {}",
                reader.error_position(),
                error
            ))
        })?;

        let in_anydata = matches!(stack.last(), Some(Frame::AnyData { .. }));
        match event {
            // Anydata content is kept verbatim.
            Event::Start(_) if in_anydata => {
                if let Some(Frame::AnyData { depth, .. }) = stack.last_mut() {
                    *depth += 1;
                }
            }
            Event::Empty(_) if in_anydata => {}
            Event::Start(start) => {
                let frame = open_element(
                    tree,
                    ctx,
                    &mut namespaces,
                    &stack,
                    &start,
                    options,
                )?;
                let frame = match frame {
                    Frame::AnyData { id, .. } => Frame::AnyData {
                        id,
                        start: reader.buffer_position() as usize,
                        depth: 0,
                    },
                    frame => frame,
                };
                stack.push(frame);
            }
            Event::Empty(start) => {
                let frame = open_element(
                    tree,
                    ctx,
                    &mut namespaces,
                    &stack,
                    &start,
                    options,
                )?;
                close_element(tree, ctx, &namespaces, frame, "")?;
                namespaces.pop();
            }
            Event::End(_) => {
                if let Some(Frame::AnyData { depth, .. }) = stack.last_mut() {
                    if *depth > 0 {
                        *depth -= 1;
                        continue;
                    }
                }
                let frame = stack.pop().ok_or_else(|| {
                    Error::format("Unexpected closing tag")
                })?;
                let content = match &frame {
                    Frame::AnyData { start, .. } => data
                        .get(*start..position)
                        .unwrap_or_default()
                        .trim()
                        .to_owned(),
                    _ => String::new(),
                };
                close_element(tree, ctx, &namespaces, frame, &content)?;
                namespaces.pop();
            }
            Event::Text(text) => {
                if let Some(Frame::Node { text: buffer, .. }) = stack.last_mut()
                {
                    let text = text
                        .unescape()
                        .map_err(|error| Error::format(error.to_string()))?;
                    buffer.push_str(&text);
                } else if stack.is_empty() {
                    let text = xml_str(&text)?;
                    if !text.trim().is_empty() {
                        return Err(Error::format(format!(
                            "Unexpected text \"{}\" outside of elements",
                            text.trim()
                        )));
                    }
                }
            }
            Event::CData(cdata) => {
                if let Some(Frame::Node { text: buffer, .. }) = stack.last_mut()
                {
                    buffer.push_str(xml_str(&cdata)?);
                }
            }
            Event::Eof => {
                if !stack.is_empty() {
                    return Err(Error::format("Unexpected end of XML document"));
                }
                break;
            }
            _ => {}
        }
    }

    Ok(())
}

fn module_by_namespace(ctx: &Context, namespace: &str) -> Option<usize> {
    ctx.modules.iter().position(|module| module.namespace == namespace)
}

fn open_element(
    tree: &mut DataTree<'_>,
    ctx: &Context,
    namespaces: &mut NamespaceStack,
    stack: &[Frame],
    start: &BytesStart<'_>,
    options: DataParserFlags,
) -> Result<Frame> {
    let attributes = namespaces.push(start)?;

    let parent = match stack.last() {
        Some(Frame::Node { id, .. }) => Some(*id),
        Some(Frame::Skip) | Some(Frame::AnyData { .. }) => {
            return Ok(Frame::Skip)
        }
        None => None,
    };
    let parent_path = parent.map(|id| DataNodeRef::from_id(&*tree, id).path());

    let qname = xml_str(start.name().as_ref())?.to_owned();
    if let (Some(id), Some(path)) = (parent, &parent_path) {
        let psnode = SchemaNode::from_id(ctx, tree.nodes[id].schema);
        if matches!(
            psnode.kind(),
            SchemaNodeKind::Leaf | SchemaNodeKind::LeafList
        ) {
            return Err(Error::validation(format!(
                "Child element \"{}\" inside terminal node \"{}\"",
                qname,
                psnode.name()
            ))
            .with_path(path.clone()));
        }
    }
    let (prefix, name) = split_prefix(&qname);
    let namespace = namespaces.resolve(prefix).ok_or_else(|| {
        Error::format(format!("Unknown XML prefix of element \"{}\"", qname))
    })?;
    let Some(module) = module_by_namespace(ctx, namespace) else {
        data::skip_unknown(
            options,
            format!(
                "No module with namespace \"{}\" in the context",
                namespace
            ),
            parent_path,
        )?;
        return Ok(Frame::Skip);
    };
    if !ctx.modules[module].implemented {
        let error = Error::validation(format!(
            "Data of non-implemented module \"{}\"",
            ctx.modules[module].name
        ));
        return Err(match parent_path {
            Some(path) => error.with_path(path),
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
            parent_path,
        )?;
        return Ok(Frame::Skip);
    };
    data::check_parsed_node(options, &snode, parent_path)?;

    let id = tree.insert(parent, snode.id(), None);
    for (key, value) in attributes {
        let (prefix, name) = split_prefix(&key);
        let module = prefix
            .and_then(|prefix| namespaces.resolve(Some(prefix)))
            .and_then(|namespace| module_by_namespace(ctx, namespace));
        match module {
            Some(module) => tree.nodes[id].meta.push(MetaInner {
                name: format!("{}:{}", ctx.modules[module].name, name),
                value,
            }),
            None => crate::logging::warn(
                &format!("Unknown attribute \"{}\" ignored.", key),
                Some(&DataNodeRef::from_id(&*tree, id).path()),
            ),
        }
    }

    Ok(match snode.kind() {
        SchemaNodeKind::AnyData | SchemaNodeKind::AnyXml => Frame::AnyData {
            id,
            start: 0,
            depth: 0,
        },
        _ => Frame::Node {
            id,
            text: String::new(),
        },
    })
}

fn close_element(
    tree: &mut DataTree<'_>,
    ctx: &Context,
    namespaces: &NamespaceStack,
    frame: Frame,
    anydata: &str,
) -> Result<()> {
    match frame {
        Frame::Skip => Ok(()),
        Frame::AnyData { id, .. } => {
            tree.nodes[id].value = Some(anydata.to_owned());
            Ok(())
        }
        Frame::Node { id, text } => {
            let snode = SchemaNode::from_id(ctx, tree.nodes[id].schema);
            match snode.kind() {
                SchemaNodeKind::Leaf | SchemaNodeKind::LeafList => {
                    let Some(ltype) = snode.inner().leaf_type.as_ref() else {
                        return Ok(());
                    };
                    // Prefixes are resolved with the element's declarations,
                    // still in scope.
                    let resolve = |prefix: Option<&str>| {
                        namespaces
                            .resolve(prefix)
                            .and_then(|namespace| {
                                module_by_namespace(ctx, namespace)
                            })
                    };
                    let value = value::canonicalize(ctx, ltype, &text, &resolve)
                        .map_err(|msg| {
                            let path = DataNodeRef::from_id(&*tree, id).path();
                            Error::validation(msg).with_path(path)
                        })?;
                    tree.nodes[id].value = Some(value);
                    Ok(())
                }
                SchemaNodeKind::List => data::finish_list(tree, id),
                _ => Ok(()),
            }
        }
    }
}

// ===== printer =====

pub(crate) fn print(
    tree: &DataTree<'_>,
    roots: &[usize],
    options: DataPrinterFlags,
) -> String {
    let mut output = String::new();
    for root in roots {
        // Printed roots always declare their namespace.
        let dnode = DataNodeRef::from_id(tree, *root);
        print_node(&dnode, None, 0, options, &mut output);
    }
    output
}

fn is_printable(
    dnode: &DataNodeRef<'_, '_>,
    options: DataPrinterFlags,
) -> bool {
    let snode = dnode.schema();
    if snode.is_np_container()
        && !options.contains(DataPrinterFlags::KEEP_EMPTY_CONT)
    {
        return dnode.children().any(|child| is_printable(&child, options));
    }
    true
}

fn print_node(
    dnode: &DataNodeRef<'_, '_>,
    parent_module: Option<usize>,
    depth: usize,
    options: DataPrinterFlags,
    output: &mut String,
) {
    if !is_printable(dnode, options) {
        return;
    }

    let ctx = dnode.context();
    let snode = dnode.schema();
    let module = snode.module();
    let shrink = options.contains(DataPrinterFlags::SHRINK);
    let indent = if shrink {
        String::new()
    } else {
        "  ".repeat(depth)
    };
    let newline = if shrink { "" } else { "\n" };

    output.push_str(&indent);
    output.push('<');
    output.push_str(snode.name());
    if parent_module != Some(module.id()) {
        output.push_str(&format!(
            " xmlns=\"{}\"",
            xml_escape(module.namespace())
        ));
    }

    // Metadata.
    let mut declared: Vec<usize> = vec![];
    for meta in dnode.meta() {
        let (meta_module, name) = split_prefix(meta.name());
        let meta_module = meta_module.and_then(|name| ctx.module_id(name));
        let Some(meta_module) = meta_module else {
            continue;
        };
        let inner = &ctx.modules[meta_module];
        if !declared.contains(&meta_module) {
            output.push_str(&format!(
                " xmlns:{}=\"{}\"",
                inner.prefix,
                xml_escape(&inner.namespace)
            ));
            declared.push(meta_module);
        }
        output.push_str(&format!(
            " {}:{}=\"{}\"",
            inner.prefix,
            name,
            xml_escape(meta.value())
        ));
    }

    match snode.kind() {
        SchemaNodeKind::Leaf | SchemaNodeKind::LeafList => {
            let value = dnode.inner().value.as_deref().unwrap_or_default();
            let (value, modules) = xml_value(ctx, &snode, value);
            for module in modules {
                if !declared.contains(&module) {
                    let inner = &ctx.modules[module];
                    output.push_str(&format!(
                        " xmlns:{}=\"{}\"",
                        inner.prefix,
                        xml_escape(&inner.namespace)
                    ));
                    declared.push(module);
                }
            }
            if value.is_empty() {
                output.push_str("/>");
            } else {
                output.push('>');
                output.push_str(&xml_escape(&value));
                output.push_str(&format!("</{}>", snode.name()));
            }
            output.push_str(newline);
        }
        SchemaNodeKind::AnyData | SchemaNodeKind::AnyXml => {
            match dnode.inner().value.as_deref().filter(|v| !v.is_empty()) {
                Some(content) => {
                    output.push('>');
                    output.push_str(content);
                    output.push_str(&format!("</{}>", snode.name()));
                }
                None => output.push_str("/>"),
            }
            output.push_str(newline);
        }
        _ => {
            let children = dnode
                .children()
                .filter(|child| is_printable(child, options))
                .collect::<Vec<_>>();
            if children.is_empty() {
                output.push_str("/>");
                output.push_str(newline);
                return;
            }
            output.push('>');
            output.push_str(newline);
            for child in children {
                print_node(
                    &child,
                    Some(module.id()),
                    depth + 1,
                    options,
                    output,
                );
            }
            output.push_str(&indent);
            output.push_str(&format!("</{}>", snode.name()));
            output.push_str(newline);
        }
    }
}

/// XML form of a canonical value: module names of identityref and
/// instance-identifier values are replaced by module prefixes, which must be
/// declared on the element.
fn xml_value(
    ctx: &Context,
    snode: &SchemaNode<'_>,
    value: &str,
) -> (String, Vec<usize>) {
    let Some(ltype) = snode.inner().leaf_type.as_ref() else {
        return (value.to_owned(), vec![]);
    };
    let ltype = value::leafref_real_type(ctx, ltype).unwrap_or(ltype);
    let has_base = |base: DataValueType| {
        ltype.base == base
            || ltype.union_types.iter().any(|member| member.base == base)
    };

    if has_base(DataValueType::IdentityRef) {
        if let (Some(module), name) = split_prefix(value) {
            if let Some(module) = ctx.module_id(module) {
                let prefix = &ctx.modules[module].prefix;
                return (format!("{}:{}", prefix, name), vec![module]);
            }
        }
    }
    if has_base(DataValueType::InstanceId) && value.starts_with('/') {
        let mut modules = vec![];
        let mut result = String::new();
        let mut token = String::new();
        let mut quote = None;
        for c in value.chars() {
            match quote {
                Some(q) => {
                    result.push(c);
                    if c == q {
                        quote = None;
                    }
                }
                None if c == '\'' || c == '"' => {
                    result.push_str(&token);
                    token.clear();
                    result.push(c);
                    quote = Some(c);
                }
                None if c == ':' => {
                    match ctx.module_id(&token) {
                        Some(module) => {
                            result.push_str(&ctx.modules[module].prefix);
                            if !modules.contains(&module) {
                                modules.push(module);
                            }
                        }
                        None => result.push_str(&token),
                    }
                    token.clear();
                    result.push(':');
                }
                None if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') => {
                    token.push(c)
                }
                None => {
                    result.push_str(&token);
                    token.clear();
                    result.push(c);
                }
            }
        }
        result.push_str(&token);
        return (result, modules);
    }

    (value.to_owned(), vec![])
}
