//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Schema printers: RFC 8340 tree diagrams and compiled YANG.

use crate::schema::{
    DataValueType, SchemaModule, SchemaNode, SchemaNodeKind,
    SchemaOutputFormat, SchemaPrinterFlags,
};

pub(crate) fn print_module(
    module: &SchemaModule<'_>,
    format: SchemaOutputFormat,
    options: SchemaPrinterFlags,
) -> String {
    match format {
        SchemaOutputFormat::TREE => print_tree(module, options),
        SchemaOutputFormat::YANG => print_yang(module, options),
    }
}

fn type_keyword(base: DataValueType) -> &'static str {
    match base {
        DataValueType::Unknown => "unknown",
        DataValueType::Binary => "binary",
        DataValueType::Uint8 => "uint8",
        DataValueType::Uint16 => "uint16",
        DataValueType::Uint32 => "uint32",
        DataValueType::Uint64 => "uint64",
        DataValueType::String => "string",
        DataValueType::Bits => "bits",
        DataValueType::Bool => "boolean",
        DataValueType::Dec64 => "decimal64",
        DataValueType::Empty => "empty",
        DataValueType::Enum => "enumeration",
        DataValueType::IdentityRef => "identityref",
        DataValueType::InstanceId => "instance-identifier",
        DataValueType::LeafRef => "leafref",
        DataValueType::Union => "union",
        DataValueType::Int8 => "int8",
        DataValueType::Int16 => "int16",
        DataValueType::Int32 => "int32",
        DataValueType::Int64 => "int64",
    }
}

/// Children of a node as shown by the printers: data definitions followed by
/// actions and notifications.
fn printed_children<'a>(snode: &SchemaNode<'a>) -> Vec<SchemaNode<'a>> {
    let mut children = match snode.kind() {
        SchemaNodeKind::Rpc | SchemaNodeKind::Action => snode
            .input()
            .into_iter()
            .chain(snode.output())
            .filter(|io| io.children().next().is_some())
            .collect(),
        _ => snode.children().collect::<Vec<_>>(),
    };
    children.extend(snode.actions());
    children.extend(snode.notifications());
    children
}

/// Node name, qualified when the node belongs to another module.
fn qualified_name(snode: &SchemaNode<'_>, module: &SchemaModule<'_>) -> String {
    let snode_module = snode.module();
    if snode_module == *module {
        snode.name().to_owned()
    } else {
        format!("{}:{}", snode_module.prefix(), snode.name())
    }
}

// ===== tree diagram =====

fn print_tree(
    module: &SchemaModule<'_>,
    options: SchemaPrinterFlags,
) -> String {
    let mut output = format!("module: {}\n", module.name());

    let data = module.data().collect::<Vec<_>>();
    print_tree_siblings(&data, module, "  ", options, &mut output);

    let rpcs = module.rpcs().collect::<Vec<_>>();
    if !rpcs.is_empty() {
        output.push_str("\n  rpcs:\n");
        print_tree_siblings(&rpcs, module, "    ", options, &mut output);
    }

    let notifications = module.notifications().collect::<Vec<_>>();
    if !notifications.is_empty() {
        output.push_str("\n  notifications:\n");
        let output = &mut output;
        print_tree_siblings(&notifications, module, "    ", options, output);
    }

    output
}

fn tree_flags(snode: &SchemaNode<'_>) -> &'static str {
    match snode.kind() {
        SchemaNodeKind::Rpc | SchemaNodeKind::Action => "-x",
        SchemaNodeKind::Notification => "-n",
        SchemaNodeKind::Case => "",
        SchemaNodeKind::Input => "-w",
        SchemaNodeKind::Output => "ro",
        _ if snode.is_within_input() => "-w",
        _ if snode.is_within_output() || snode.is_within_notification() => "ro",
        _ if snode.is_config() => "rw",
        _ => "ro",
    }
}

fn tree_label(snode: &SchemaNode<'_>, module: &SchemaModule<'_>) -> String {
    let name = qualified_name(snode, module);
    match snode.kind() {
        SchemaNodeKind::Choice if snode.is_mandatory() => format!("({})", name),
        SchemaNodeKind::Choice => format!("({})?", name),
        SchemaNodeKind::Case => format!(":({})", name),
        SchemaNodeKind::Container if !snode.is_np_container() => {
            format!("{}!", name)
        }
        SchemaNodeKind::List => {
            let keys = snode
                .list_keys()
                .map(|key| key.name().to_owned())
                .collect::<Vec<_>>();
            match keys.is_empty() {
                true => format!("{}*", name),
                false => format!("{}* [{}]", name, keys.join(" ")),
            }
        }
        SchemaNodeKind::LeafList => format!("{}*", name),
        SchemaNodeKind::Leaf | SchemaNodeKind::AnyData | SchemaNodeKind::AnyXml
            if !snode.is_mandatory() && !snode.is_list_key() =>
        {
            format!("{}?", name)
        }
        _ => name,
    }
}

fn tree_type(snode: &SchemaNode<'_>) -> Option<String> {
    match snode.kind() {
        SchemaNodeKind::AnyData => Some("anydata".to_owned()),
        SchemaNodeKind::AnyXml => Some("anyxml".to_owned()),
        SchemaNodeKind::Leaf | SchemaNodeKind::LeafList => {
            let ltype = snode.inner().leaf_type.as_ref()?;
            if ltype.base == DataValueType::LeafRef {
                if let Some(path) = &ltype.leafref_path {
                    return Some(format!("-> {}", path));
                }
            }
            Some(
                ltype
                    .name
                    .clone()
                    .unwrap_or_else(|| type_keyword(ltype.base).to_owned()),
            )
        }
        _ => None,
    }
}

fn print_tree_siblings(
    siblings: &[SchemaNode<'_>],
    module: &SchemaModule<'_>,
    prefix: &str,
    options: SchemaPrinterFlags,
    output: &mut String,
) {
    let labels = siblings
        .iter()
        .map(|snode| {
            let flags = tree_flags(snode);
            let head = match flags.is_empty() {
                true => "+--".to_owned(),
                false => format!("+--{} ", flags),
            };
            format!("{}{}", head, tree_label(snode, module))
        })
        .collect::<Vec<_>>();
    // Types of the siblings are aligned in one column.
    let width = labels
        .iter()
        .zip(siblings)
        .filter(|(_, snode)| tree_type(snode).is_some())
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0);

    for (index, (snode, label)) in siblings.iter().zip(&labels).enumerate() {
        let last = index + 1 == siblings.len();
        output.push_str(prefix);
        output.push_str(label);
        if let Some(ltype) = tree_type(snode) {
            let padding = match options.contains(SchemaPrinterFlags::SHRINK) {
                true => 1,
                false => width - label.chars().count() + 3,
            };
            output.push_str(&" ".repeat(padding));
            output.push_str(&ltype);
        }
        output.push('\n');

        let children = printed_children(snode);
        if !children.is_empty() {
            let indent = if last { "   " } else { "|  " };
            let prefix = format!("{}{}", prefix, indent);
            print_tree_siblings(&children, module, &prefix, options, output);
        }
    }
}

// ===== compiled YANG =====

struct YangWriter {
    output: String,
    shrink: bool,
    depth: usize,
}

impl YangWriter {
    fn line(&mut self, text: &str) {
        if self.shrink {
            if !self.output.is_empty() && !self.output.ends_with('{') {
                self.output.push(' ');
            }
        } else {
            self.output.push_str(&"  ".repeat(self.depth));
        }
        self.output.push_str(text);
        if !self.shrink {
            self.output.push('\n');
        }
    }

    fn open(&mut self, text: &str) {
        self.line(&format!("{} {{", text));
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.line("}");
    }
}

fn yang_quote(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\t', "\\t");
    format!("\"{}\"", escaped)
}

fn kind_keyword(kind: SchemaNodeKind) -> &'static str {
    match kind {
        SchemaNodeKind::Container => "container",
        SchemaNodeKind::Case => "case",
        SchemaNodeKind::Choice => "choice",
        SchemaNodeKind::Leaf => "leaf",
        SchemaNodeKind::LeafList => "leaf-list",
        SchemaNodeKind::List => "list",
        SchemaNodeKind::AnyData => "anydata",
        SchemaNodeKind::AnyXml => "anyxml",
        SchemaNodeKind::Rpc => "rpc",
        SchemaNodeKind::Input => "input",
        SchemaNodeKind::Output => "output",
        SchemaNodeKind::Action => "action",
        SchemaNodeKind::Notification => "notification",
    }
}

fn print_yang(
    module: &SchemaModule<'_>,
    options: SchemaPrinterFlags,
) -> String {
    let mut writer = YangWriter {
        output: String::new(),
        shrink: options.contains(SchemaPrinterFlags::SHRINK),
        depth: 0,
    };

    writer.open(&format!("module {}", module.name()));
    writer.line(&format!("namespace {};", yang_quote(module.namespace())));
    writer.line(&format!("prefix {};", module.prefix()));
    if let Some(revision) = module.revision() {
        writer.line(&format!("revision {};", revision));
    }

    let top = module
        .data()
        .chain(module.rpcs())
        .chain(module.notifications());
    for snode in top {
        if options.contains(SchemaPrinterFlags::NO_SUBSTMT) {
            writer.line(&format!(
                "{} {};",
                kind_keyword(snode.kind()),
                qualified_name(&snode, module)
            ));
        } else {
            print_yang_node(&snode, module, &mut writer);
        }
    }
    writer.close();

    writer.output
}

fn print_yang_node(
    snode: &SchemaNode<'_>,
    module: &SchemaModule<'_>,
    writer: &mut YangWriter,
) {
    let keyword = kind_keyword(snode.kind());
    let name = qualified_name(snode, module);
    if matches!(snode.kind(), SchemaNodeKind::Input | SchemaNodeKind::Output) {
        writer.open(keyword);
    } else {
        writer.open(&format!("{} {}", keyword, name));
    }

    if let Some(ltype) = snode.inner().leaf_type.as_ref() {
        let type_name = ltype
            .name
            .clone()
            .unwrap_or_else(|| type_keyword(ltype.base).to_owned());
        match (&ltype.leafref_path, ltype.base) {
            (Some(path), DataValueType::LeafRef) => {
                writer.open(&format!("type {}", type_name));
                writer.line(&format!("path {};", yang_quote(path)));
                writer.close();
            }
            (_, DataValueType::Enum) if ltype.name.is_none() => {
                writer.open(&format!("type {}", type_name));
                for (name, value) in &ltype.enums {
                    writer.open(&format!("enum {}", yang_quote(name)));
                    writer.line(&format!("value {};", value));
                    writer.close();
                }
                writer.close();
            }
            _ => writer.line(&format!("type {};", type_name)),
        }
        if let Some(units) = snode.units() {
            writer.line(&format!("units {};", yang_quote(units)));
        }
    }

    match snode.kind() {
        SchemaNodeKind::List => {
            let keys = snode
                .list_keys()
                .map(|key| key.name().to_owned())
                .collect::<Vec<_>>();
            if !keys.is_empty() {
                writer.line(&format!("key {};", yang_quote(&keys.join(" "))));
            }
        }
        SchemaNodeKind::Container if !snode.is_np_container() => {
            writer.line("presence \"\";");
        }
        _ => {}
    }

    let parent_config =
        snode.parent().map_or(true, |parent| parent.is_config());
    if !snode.is_config()
        && parent_config
        && !snode.is_within_input()
        && !snode.is_within_output()
        && !snode.is_within_notification()
        && !matches!(
            snode.kind(),
            SchemaNodeKind::Rpc
                | SchemaNodeKind::Action
                | SchemaNodeKind::Notification
                | SchemaNodeKind::Input
                | SchemaNodeKind::Output
                | SchemaNodeKind::Case
        )
    {
        writer.line("config false;");
    }
    if snode.is_mandatory()
        && matches!(
            snode.kind(),
            SchemaNodeKind::Leaf
                | SchemaNodeKind::Choice
                | SchemaNodeKind::AnyData
                | SchemaNodeKind::AnyXml
        )
    {
        writer.line("mandatory true;");
    }
    if let Some(min) = snode.min_elements() {
        writer.line(&format!("min-elements {};", min));
    }
    if let Some(max) = snode.max_elements() {
        writer.line(&format!("max-elements {};", max));
    }
    if snode.is_user_ordered() {
        writer.line("ordered-by user;");
    }
    for default in snode.default_values_canonical() {
        writer.line(&format!("default {};", yang_quote(default)));
    }
    if let Some(case) = snode.default_case() {
        writer.line(&format!("default {};", case.name()));
    }
    if snode.is_status_deprecated() {
        writer.line("status deprecated;");
    } else if snode.is_status_obsolete() {
        writer.line("status obsolete;");
    }
    if let Some(description) = snode.description() {
        writer.line(&format!("description {};", yang_quote(description)));
    }

    for child in printed_children(snode) {
        print_yang_node(&child, module, writer);
    }
    writer.close();
}
