//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Schema constraints of complete data trees.

use crate::data::{DataNodeRef, DataTree};
use crate::error::{Error, Result};
use crate::iter::Siblings;
use crate::schema::{DataValueType, SchemaNode, SchemaNodeKind};
use crate::utils::Binding;
use crate::value;

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct ValidateOptions {
    /// Reject state data.
    pub no_state: bool,
    /// Check mandatory nodes only of modules that have data.
    pub present: bool,
    /// Check mandatory nodes and min-elements.
    pub mandatory: bool,
    /// Check that leafrefs requiring an instance have one.
    pub leafrefs: bool,
}

pub(crate) fn validate(
    tree: &DataTree<'_>,
    options: ValidateOptions,
) -> Result<()> {
    let ctx = tree.context;

    // Top-level siblings.
    let top = tree.children_of(None);
    check_instances(tree, &top)?;
    if options.mandatory {
        for (module_id, module) in ctx.modules.iter().enumerate() {
            if !module.implemented {
                continue;
            }
            if options.present
                && !top.iter().any(|id| {
                    ctx.nodes[tree.nodes[*id].schema].module == module_id
                })
            {
                continue;
            }
            check_mandatory(tree, None, module.data, &top, options)?;
        }
    }

    for dnode in tree.traverse() {
        let snode = dnode.schema();
        if options.no_state && snode.is_state() {
            return Err(Error::validation(format!(
                "Unexpected state data node \"{}\" found",
                snode.name()
            ))
            .with_path(dnode.path()));
        }
        match snode.kind() {
            SchemaNodeKind::Container | SchemaNodeKind::List => {
                let children = tree.children_of(Some(dnode.id()));
                check_instances(tree, &children)?;
                if options.mandatory {
                    check_mandatory(
                        tree,
                        Some(dnode.id()),
                        snode.inner().first_child,
                        &children,
                        options,
                    )?;
                }
            }
            SchemaNodeKind::Leaf | SchemaNodeKind::LeafList
                if options.leafrefs =>
            {
                check_leafref(tree, &dnode)?;
            }
            _ => {}
        }
    }

    Ok(())
}

fn node_path(tree: &DataTree<'_>, id: usize) -> String {
    DataNodeRef::from_id(tree, id).path()
}

/// Path of an instance that would be created under the given parent.
fn missing_path(
    tree: &DataTree<'_>,
    parent: Option<usize>,
    snode: &SchemaNode<'_>,
) -> String {
    let ctx = tree.context;
    let parent_module =
        parent.map(|id| ctx.nodes[tree.nodes[id].schema].module);
    let prefix = match parent_module == Some(snode.inner().module) {
        true => String::new(),
        false => format!("{}:", snode.module().name()),
    };
    let parent_path = parent.map(|id| node_path(tree, id)).unwrap_or_default();
    format!("{}/{}{}", parent_path, prefix, snode.name())
}

fn instances_of(
    tree: &DataTree<'_>,
    siblings: &[usize],
    schema: usize,
) -> Vec<usize> {
    siblings
        .iter()
        .copied()
        .filter(|id| tree.nodes[*id].schema == schema)
        .collect()
}

// ===== instance constraints =====

/// Checks the instances among a set of siblings: duplicates, list keys,
/// unique statements, max-elements and choice cases.
fn check_instances(tree: &DataTree<'_>, siblings: &[usize]) -> Result<()> {
    let ctx = tree.context;
    let mut done: Vec<usize> = vec![];
    let mut cases: Vec<(usize, usize)> = vec![];

    for id in siblings {
        let schema = tree.nodes[*id].schema;
        let snode = SchemaNode::from_id(ctx, schema);

        // Cases of the enclosing choices.
        let mut current = snode.clone();
        while let Some(parent) = current.parent() {
            if parent.kind() == SchemaNodeKind::Case {
                if let Some(choice) = parent.parent() {
                    match cases.iter().find(|(c, _)| *c == choice.id()) {
                        Some((_, case)) if *case != parent.id() => {
                            return Err(Error::validation(format!(
                                "Data for more than one case of choice \"{}\"",
                                choice.name()
                            ))
                            .with_path(node_path(tree, *id)));
                        }
                        Some(_) => {}
                        None => cases.push((choice.id(), parent.id())),
                    }
                }
            }
            if !parent.is_schema_only() {
                break;
            }
            current = parent;
        }

        if done.contains(&schema) {
            continue;
        }
        done.push(schema);

        let instances = instances_of(tree, siblings, schema);
        match snode.kind() {
            SchemaNodeKind::List | SchemaNodeKind::LeafList => {
                let max = snode.inner().max_elements;
                if instances.len() as u64 > max as u64 {
                    return Err(Error::validation(format!(
                        "Too many \"{}\" instances",
                        snode.name()
                    ))
                    .with_path(node_path(tree, instances[instances.len() - 1]))
                    .with_apptag("too-many-elements"));
                }
                check_duplicates(tree, &snode, &instances)?;
                if snode.kind() == SchemaNodeKind::List {
                    check_uniques(tree, &snode, &instances)?;
                }
            }
            _ if instances.len() > 1 => {
                return Err(Error::validation(format!(
                    "Duplicate instance of \"{}\"",
                    snode.name()
                ))
                .with_path(node_path(tree, instances[1])));
            }
            _ => {}
        }
    }

    Ok(())
}

fn check_duplicates(
    tree: &DataTree<'_>,
    snode: &SchemaNode<'_>,
    instances: &[usize],
) -> Result<()> {
    // Keyless lists and state leaf-lists may have duplicate instances.
    let identity = |id: usize| -> Option<Vec<Option<String>>> {
        let dnode = DataNodeRef::from_id(tree, id);
        match snode.kind() {
            SchemaNodeKind::List if !snode.is_keyless_list() => Some(
                dnode
                    .list_keys()
                    .map(|key| key.inner().value.clone())
                    .collect(),
            ),
            SchemaNodeKind::LeafList if snode.is_config() => {
                Some(vec![dnode.inner().value.clone()])
            }
            _ => None,
        }
    };

    let mut seen = vec![];
    for id in instances {
        let Some(identity) = identity(*id) else {
            return Ok(());
        };
        if seen.contains(&identity) {
            return Err(Error::validation(format!(
                "Duplicate instance of \"{}\"",
                snode.name()
            ))
            .with_path(node_path(tree, *id)));
        }
        seen.push(identity);
    }
    Ok(())
}

fn check_uniques(
    tree: &DataTree<'_>,
    snode: &SchemaNode<'_>,
    instances: &[usize],
) -> Result<()> {
    for unique in &snode.inner().uniques {
        let mut seen: Vec<Vec<String>> = vec![];
        for id in instances {
            let dnode = DataNodeRef::from_id(tree, *id);
            let values = unique
                .iter()
                .map(|leaf| {
                    dnode
                        .traverse()
                        .find(|descendant| descendant.schema().id() == *leaf)
                        .and_then(|descendant| descendant.inner().value.clone())
                })
                .collect::<Option<Vec<_>>>();
            // Instances missing any of the leaves are exempt.
            let Some(values) = values else {
                continue;
            };
            if seen.contains(&values) {
                let names = unique
                    .iter()
                    .map(|leaf| tree.context.nodes[*leaf].name.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                return Err(Error::validation(format!(
                    "Unique data leaf(s) \"{}\" not satisfied",
                    names
                ))
                .with_path(dnode.path())
                .with_apptag("data-not-unique"));
            }
            seen.push(values);
        }
    }
    Ok(())
}

// ===== mandatory nodes =====

fn check_mandatory(
    tree: &DataTree<'_>,
    parent: Option<usize>,
    first: Option<usize>,
    siblings: &[usize],
    options: ValidateOptions,
) -> Result<()> {
    let ctx = tree.context;
    for snode in Siblings::new(SchemaNode::from_id_opt(ctx, first)) {
        // Conditional nodes aren't evaluated.
        if !snode.inner().whens.is_empty()
            || (options.no_state && snode.is_state())
        {
            continue;
        }

        match snode.kind() {
            SchemaNodeKind::Leaf
            | SchemaNodeKind::AnyData
            | SchemaNodeKind::AnyXml => {
                if snode.is_mandatory()
                    && instances_of(tree, siblings, snode.id()).is_empty()
                {
                    return Err(Error::validation(format!(
                        "Mandatory node \"{}\" instance does not exist",
                        snode.name()
                    ))
                    .with_path(missing_path(tree, parent, &snode)));
                }
            }
            SchemaNodeKind::List | SchemaNodeKind::LeafList => {
                let count = instances_of(tree, siblings, snode.id()).len();
                if (count as u32) < snode.inner().min_elements {
                    return Err(Error::validation(format!(
                        "Too few \"{}\" instances",
                        snode.name()
                    ))
                    .with_path(missing_path(tree, parent, &snode))
                    .with_apptag("too-few-elements"));
                }
            }
            // Descendants of absent non-presence containers are checked as
            // if the container existed.
            SchemaNodeKind::Container => {
                if snode.is_np_container()
                    && instances_of(tree, siblings, snode.id()).is_empty()
                {
                    let first = snode.inner().first_child;
                    check_mandatory(tree, parent, first, &[], options)?;
                }
            }
            SchemaNodeKind::Choice => {
                let case = snode.children().find(|case| {
                    siblings.iter().any(|id| {
                        SchemaNode::from_id(ctx, tree.nodes[*id].schema)
                            .ancestors()
                            .any(|ancestor| ancestor.id() == case.id())
                    })
                });
                match case {
                    Some(case) => check_mandatory(
                        tree,
                        parent,
                        case.inner().first_child,
                        siblings,
                        options,
                    )?,
                    None if snode.is_mandatory() => {
                        let error = Error::validation(format!(
                            "Mandatory choice \"{}\" data do not exist",
                            snode.name()
                        ));
                        return Err(match parent {
                            Some(parent) => {
                                error.with_path(node_path(tree, parent))
                            }
                            None => error,
                        });
                    }
                    None => {}
                }
            }
            _ => {}
        }
    }
    Ok(())
}

// ===== leafrefs =====

fn check_leafref(
    tree: &DataTree<'_>,
    dnode: &DataNodeRef<'_, '_>,
) -> Result<()> {
    let snode = dnode.schema();
    let Some(ltype) = snode.inner().leaf_type.as_ref() else {
        return Ok(());
    };
    if ltype.base != DataValueType::LeafRef || !ltype.require_instance {
        return Ok(());
    }
    let Some(target) = ltype.leafref_target else {
        return Ok(());
    };
    let Some(value) = dnode.inner().value.as_deref() else {
        return Ok(());
    };
    // Unresolvable leafref chains are not checked.
    if value::leafref_real_type(tree.context, ltype).is_none() {
        return Ok(());
    }

    let found = tree.traverse().any(|other| {
        other.schema().id() == target
            && other.inner().value.as_deref() == Some(value)
    });
    if !found {
        return Err(Error::validation(format!(
            "Invalid leafref value \"{}\" - no target instance \"{}\" with \
             the same value",
            value,
            ltype.leafref_path.as_deref().unwrap_or_default()
        ))
        .with_path(dnode.path())
        .with_apptag("instance-required"));
    }
    Ok(())
}
