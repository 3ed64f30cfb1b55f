//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! YIN (XML encoding of YANG) parser.
//!
//! YIN documents are converted into the same generic statement tree produced
//! by the YANG text parser.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{Error, Result};
use crate::utils::{split_prefix, xml_str, NamespaceStack};
use crate::yang::Stmt;

const YIN_NAMESPACE: &str = "urn:ietf:params:xml:ns:yang:yin:1";

/// How the argument of a statement is encoded in YIN.
enum YinArg {
    None,
    Attribute(&'static str),
    Element(&'static str),
}

// RFC 7950, section 13.1.
fn yin_argument(keyword: &str) -> YinArg {
    match keyword {
        "input" | "output" => YinArg::None,
        "contact" | "description" | "organization" | "reference" => {
            YinArg::Element("text")
        }
        "error-message" => YinArg::Element("value"),
        "anydata" | "anyxml" | "argument" | "base" | "bit" | "case"
        | "choice" | "container" | "enum" | "extension" | "feature"
        | "grouping" | "identity" | "if-feature" | "leaf" | "leaf-list"
        | "list" | "notification" | "rpc" | "action" | "type" | "typedef"
        | "units" | "uses" | "module" | "submodule" => {
            YinArg::Attribute("name")
        }
        "augment" | "deviation" | "refine" => YinArg::Attribute("target-node"),
        "belongs-to" | "import" | "include" => YinArg::Attribute("module"),
        "must" | "when" => YinArg::Attribute("condition"),
        "namespace" => YinArg::Attribute("uri"),
        "revision" | "revision-date" => YinArg::Attribute("date"),
        "unique" => YinArg::Attribute("tag"),
        _ => YinArg::Attribute("value"),
    }
}

/// Parse a YIN module into its statement tree.
pub(crate) fn parse(input: &str) -> Result<Stmt> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut namespaces = NamespaceStack::default();
    // Statements being built, plus whether each element is a YIN statement.
    let mut stack: Vec<Option<Stmt>> = vec![];
    // Pending argument element (its parent statement is on the stack top).
    let mut arg_text: Option<String> = None;
    let mut in_arg_element = false;
    let mut root = None;

    loop {
        let line = line_of(input, reader.buffer_position() as usize);
        let event = reader
            .read_event()
            .map_err(|error| Error::schema(format!("Invalid YIN: {}", error)))?;
        let is_empty = matches!(event, Event::Empty(_));
        match event {
            Event::Start(start) | Event::Empty(start) => {
                let attributes = namespaces.push(&start)?;
                let name = xml_str(start.name().as_ref())?.to_owned();
                let (prefix, local) = split_prefix(&name);
                let ns = namespaces.resolve(prefix).unwrap_or("");

                // Argument element of the enclosing statement?
                if let Some(Some(parent)) = stack.last() {
                    if let YinArg::Element(arg_name) =
                        yin_argument(&parent.keyword)
                    {
                        if ns == YIN_NAMESPACE && local == arg_name {
                            if is_empty {
                                namespaces.pop();
                                set_arg(&mut stack, String::new());
                            } else {
                                in_arg_element = true;
                                arg_text = Some(String::new());
                            }
                            continue;
                        }
                    }
                }

                let stmt = if ns == YIN_NAMESPACE {
                    let arg = match yin_argument(local) {
                        YinArg::Attribute(arg_name) => attributes
                            .iter()
                            .find(|(key, _)| key == arg_name)
                            .map(|(_, value)| value.clone()),
                        _ => None,
                    };
                    Some(Stmt {
                        keyword: local.to_owned(),
                        arg,
                        substmts: vec![],
                        line,
                    })
                } else {
                    // Extension instances are not interpreted.
                    None
                };
                stack.push(stmt);
                if is_empty {
                    namespaces.pop();
                    close(&mut stack, &mut root)?;
                }
            }
            Event::End(_) => {
                namespaces.pop();
                if in_arg_element {
                    in_arg_element = false;
                    let text = arg_text.take().unwrap_or_default();
                    set_arg(&mut stack, text);
                    continue;
                }
                close(&mut stack, &mut root)?;
            }
            Event::Text(text) if in_arg_element => {
                let text = text
                    .unescape()
                    .map_err(|error| Error::schema(error.to_string()))?;
                if let Some(arg) = arg_text.as_mut() {
                    arg.push_str(&text);
                }
            }
            Event::CData(data) if in_arg_element => {
                if let Some(arg) = arg_text.as_mut() {
                    arg.push_str(xml_str(&data)?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    match root {
        Some(stmt) => Ok(stmt),
        None => Err(Error::schema("Invalid YIN: missing module statement")),
    }
}

fn set_arg(stack: &mut [Option<Stmt>], text: String) {
    if let Some(Some(parent)) = stack.last_mut() {
        parent.arg = Some(text);
    }
}

fn close(stack: &mut Vec<Option<Stmt>>, root: &mut Option<Stmt>) -> Result<()> {
    let stmt = stack.pop().flatten();
    match (stmt, stack.last_mut()) {
        (Some(stmt), Some(Some(parent))) => parent.substmts.push(stmt),
        (Some(stmt), None) => {
            if stmt.keyword != "module" && stmt.keyword != "submodule" {
                return Err(Error::schema(format!(
                    "Invalid YIN: unexpected top-level element \"{}\"",
                    stmt.keyword
                )));
            }
            *root = Some(stmt);
        }
        _ => {}
    }
    Ok(())
}

fn line_of(input: &str, position: usize) -> u64 {
    let position = position.min(input.len());
    input.as_bytes()[..position]
        .iter()
        .filter(|&&b| b == b'\n')
        .count() as u64
        + 1
}
