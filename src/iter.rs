//
// Copyright (c) The yangtree Core Contributors
//
// See LICENSE for license details.
//

//! YANG iterators.

use crate::context::Context;
use crate::data::Metadata;
use crate::error::{Error, Result};
use crate::schema::SchemaModule;
use crate::utils::Binding;

/// Common methods used by multiple data and schema node iterators.
#[doc(hidden)]
pub trait NodeIterable<'a>: Sized + Clone + PartialEq + Binding<'a> {
    /// Returns the parent node.
    fn parent(&self) -> Option<Self>;

    /// Returns the next sibling node.
    fn next_sibling(&self) -> Option<Self>;

    /// Returns the fist child none.
    fn first_child(&self) -> Option<Self>;
}

/// Navigation on possibly absent nodes.
///
/// Implemented for `Option<T>` (the result of a navigation step) and for
/// `Result<Option<T>>` (the result of a chained navigation step), so that
/// lookups like `dnode.child().child().tree_dfs()` can be chained. Navigating
/// from an absent node fails with [`ErrorKind::NullTarget`] instead of
/// silently yielding another absent node.
///
/// [`ErrorKind::NullTarget`]: crate::ErrorKind::NullTarget
pub trait NodeNavigation<'a, T>
where
    T: NodeIterable<'a> + 'a,
{
    /// Returns the node this navigation step landed on.
    fn target(self) -> Result<T>;

    /// Returns the first child of the target node.
    fn child(self) -> Result<Option<T>>
    where
        Self: Sized,
    {
        Ok(self.target()?.first_child())
    }

    /// Returns the parent of the target node.
    fn parent(self) -> Result<Option<T>>
    where
        Self: Sized,
    {
        Ok(self.target()?.parent())
    }

    /// Returns the next sibling of the target node.
    fn next_sibling(self) -> Result<Option<T>>
    where
        Self: Sized,
    {
        Ok(self.target()?.next_sibling())
    }

    /// Returns all nodes of the subtree rooted at the target node, in
    /// pre-order.
    fn tree_dfs(self) -> Result<Vec<T>>
    where
        Self: Sized,
    {
        Ok(Traverse::new(self.target()?).collect())
    }
}

/// An iterator over the sibings of a node.
#[derive(Debug)]
pub struct Siblings<'a, T>
where
    T: NodeIterable<'a>,
{
    next: Option<T>,
    _marker: std::marker::PhantomData<&'a T>,
}

/// An iterator over the ancestors of a node.
#[derive(Debug)]
pub struct Ancestors<'a, T>
where
    T: NodeIterable<'a>,
{
    next: Option<T>,
    _marker: std::marker::PhantomData<&'a T>,
}

/// An iterator over all elements in a tree (depth-first search algorithm).
///
/// When traversing over schema trees, note that _actions_ and _notifications_
/// are ignored.
#[derive(Debug)]
pub struct Traverse<'a, T>
where
    T: NodeIterable<'a>,
{
    start: T,
    next: Option<T>,
    _marker: std::marker::PhantomData<&'a T>,
}

/// An ordered set of nodes, usually the result of a path query.
///
/// The set is a snapshot: it holds the node identities found at query time
/// and doesn't observe later changes to the tree (which the borrow checker
/// rules out anyway while the set is alive).
#[derive(Debug)]
pub struct Set<'a, T>
where
    T: NodeIterable<'a>,
{
    container: &'a T::Container,
    ids: std::vec::IntoIter<usize>,
}

/// An iterator over a list of schema modules.
#[derive(Debug)]
pub struct SchemaModules<'a> {
    context: &'a Context,
    index: usize,
}

/// An iterator over a list of metadata.
#[derive(Debug)]
pub struct MetadataList<'a> {
    next: Option<Metadata<'a>>,
}

// ===== impl NodeNavigation =====

impl<'a, T> NodeNavigation<'a, T> for Option<T>
where
    T: NodeIterable<'a> + 'a,
{
    fn target(self) -> Result<T> {
        self.ok_or_else(Error::null_target)
    }
}

impl<'a, T> NodeNavigation<'a, T> for Result<Option<T>>
where
    T: NodeIterable<'a> + 'a,
{
    fn target(self) -> Result<T> {
        self?.ok_or_else(Error::null_target)
    }
}

// ===== impl Siblings =====

impl<'a, T> Siblings<'a, T>
where
    T: NodeIterable<'a>,
{
    pub fn new(next: Option<T>) -> Siblings<'a, T> {
        Siblings {
            next,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<'a, T> Iterator for Siblings<'a, T>
where
    T: NodeIterable<'a>,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let ret = self.next.clone();
        if let Some(next) = &self.next {
            self.next = next.next_sibling();
        }
        ret
    }
}

// ===== impl Ancestors =====

impl<'a, T> Ancestors<'a, T>
where
    T: NodeIterable<'a>,
{
    pub fn new(next: Option<T>) -> Ancestors<'a, T> {
        Ancestors {
            next,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<'a, T> Iterator for Ancestors<'a, T>
where
    T: NodeIterable<'a>,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let node = self.next.clone();
        if let Some(next) = &self.next {
            self.next = next.parent();
        }
        node
    }
}

// ===== impl Traverse =====

impl<'a, T> Traverse<'a, T>
where
    T: NodeIterable<'a>,
{
    pub fn new(start: T) -> Traverse<'a, T> {
        let next = start.clone();

        Traverse {
            start,
            next: Some(next),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<'a, T> Iterator for Traverse<'a, T>
where
    T: NodeIterable<'a>,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let ret = self.next.clone();

        if let Some(next) = &mut self.next {
            // Select element for the next run - children first.
            if let Some(child) = next.first_child() {
                *next = child;
                return ret;
            }

            // Then siblings, climbing back up until the start node is
            // reached again.
            let mut current = next.clone();
            loop {
                if current == self.start {
                    self.next = None;
                    return ret;
                }
                if let Some(sibling) = current.next_sibling() {
                    *next = sibling;
                    return ret;
                }
                match current.parent() {
                    Some(parent) => current = parent,
                    None => {
                        self.next = None;
                        return ret;
                    }
                }
            }
        }
        ret
    }
}

// ===== impl Set =====

impl<'a, T> Set<'a, T>
where
    T: NodeIterable<'a>,
{
    pub fn new(container: &'a T::Container, ids: Vec<usize>) -> Set<'a, T> {
        Set {
            container,
            ids: ids.into_iter(),
        }
    }
}

impl<'a, T> Iterator for Set<'a, T>
where
    T: NodeIterable<'a>,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let id = self.ids.next()?;
        Some(T::from_id(self.container, id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}

impl<'a, T> ExactSizeIterator for Set<'a, T> where T: NodeIterable<'a> {}

// ===== impl SchemaModules =====

impl<'a> SchemaModules<'a> {
    pub fn new(context: &'a Context) -> SchemaModules<'a> {
        let index = 0;
        SchemaModules { context, index }
    }
}

impl<'a> Iterator for SchemaModules<'a> {
    type Item = SchemaModule<'a>;

    fn next(&mut self) -> Option<SchemaModule<'a>> {
        if self.index >= self.context.modules.len() {
            return None;
        }
        let module = SchemaModule::from_id(self.context, self.index);
        self.index += 1;
        Some(module)
    }
}

// ===== impl MetadataList =====

impl<'a> MetadataList<'a> {
    pub fn new(next: Option<Metadata<'a>>) -> MetadataList<'a> {
        MetadataList { next }
    }
}

impl<'a> Iterator for MetadataList<'a> {
    type Item = Metadata<'a>;

    fn next(&mut self) -> Option<Metadata<'a>> {
        let meta = self.next.clone();
        if let Some(next) = &self.next {
            self.next = next.next();
        }
        meta
    }
}
