//
// Copyright (c) The yangtree Core Contributors
//
// See LICENSE for license details.
//

//! YANG context.

use bitflags::bitflags;
use std::path::{Path, PathBuf};

use crate::compile;
use crate::error::{Error, Result};
use crate::iter::{SchemaModules, Set};
use crate::logging::{self, LogCallback, LoggingCallbackAlreadySet};
use crate::schema::{
    IdentityInner, ModuleInner, SchemaInputFormat, SchemaModule, SchemaNode,
    SchemaNodeInner,
};
use crate::utils::Binding;

/// Context of the YANG schemas.
///
/// The context holds all loaded modules and their compiled schema trees.
/// Schema nodes, modules and data trees borrow the context, so modules can
/// only be added while no such handle is alive.
#[derive(Debug)]
pub struct Context {
    pub(crate) modules: Vec<ModuleInner>,
    pub(crate) nodes: Vec<SchemaNodeInner>,
    pub(crate) identities: Vec<IdentityInner>,
    searchdirs: Vec<PathBuf>,
    options: ContextFlags,
    module_set_id: u16,
    /// Modules whose import is in progress (circular import detection).
    loading: Vec<String>,
}

bitflags! {
    /// Options to change context behavior.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ContextFlags: u16 {
        /// All the imported modules of the schema being parsed are implemented.
        const ALL_IMPLEMENTED = 0x01;

        /// Do not search for schemas in context's searchdirs neither in current
        /// working directory.
        const DISABLE_SEARCHDIRS = 0x08;

        /// Do not automatically search for schemas in current working
        /// directory, which is by default searched automatically (despite not
        /// recursively).
        const DISABLE_SEARCHDIR_CWD = 0x10;
    }
}

/// Arena state saved before a module load, restored when the load fails.
struct Snapshot {
    modules: Vec<ModuleInner>,
    nodes: Vec<SchemaNodeInner>,
    identities: Vec<IdentityInner>,
}

impl Context {
    /// Create yangtree context.
    ///
    /// Context is used to hold all information about schemas. Usually, the
    /// application is supposed to work with a single context in which
    /// yangtree is holding all schemas according to which the data trees
    /// will be processed and validated.
    pub fn new(options: ContextFlags) -> Result<Context> {
        Ok(Context {
            modules: vec![],
            nodes: vec![],
            identities: vec![],
            searchdirs: vec![],
            options,
            module_set_id: 0,
            loading: vec![],
        })
    }

    /// Set the log level to debug.
    pub fn set_log_level_trace(&self) {
        logging::set_log_level_trace();
    }

    /// Set the log level to verbose.
    pub fn set_log_level_debug(&self) {
        logging::set_log_level_debug();
    }

    /// Set the log level to warning (default).
    pub fn set_log_level_warn(&self) {
        logging::set_log_level_warn();
    }

    /// Set the log level to error.
    pub fn set_log_level_error(&self) {
        logging::set_log_level_error();
    }

    /// Register a custom logging callback.
    ///
    /// The callback is process-wide and can only be set once.
    pub fn init_logger<C>(
        &self,
        callback: C,
    ) -> std::result::Result<(), LoggingCallbackAlreadySet>
    where
        C: LogCallback,
    {
        logging::init_logger(callback)
    }

    /// Forward all messages to the `log` crate.
    pub fn init_default_logger(
        &self,
    ) -> std::result::Result<(), LoggingCallbackAlreadySet> {
        logging::init_logger(logging::DefaultLogger::default())
    }

    /// Add the search path into yangtree context.
    pub fn set_searchdir<P: AsRef<Path>>(
        &mut self,
        search_dir: P,
    ) -> Result<()> {
        let search_dir = search_dir.as_ref();
        if !search_dir.is_dir() {
            let error = Error::config(format!(
                "Given search directory \"{}\" does not exist",
                search_dir.display()
            ));
            logging::log_error(&error);
            return Err(error);
        }

        let search_dir = search_dir.to_path_buf();
        if !self.searchdirs.contains(&search_dir) {
            self.searchdirs.push(search_dir);
        }

        Ok(())
    }

    /// Clean the search path from the yangtree context.
    pub fn unset_searchdir<P: AsRef<Path>>(
        &mut self,
        search_dir: P,
    ) -> Result<()> {
        let search_dir = search_dir.as_ref();
        match self.searchdirs.iter().position(|dir| dir == search_dir) {
            Some(index) => {
                self.searchdirs.remove(index);
                Ok(())
            }
            None => {
                let error = Error::config(format!(
                    "Invalid search directory \"{}\"",
                    search_dir.display()
                ));
                logging::log_error(&error);
                Err(error)
            }
        }
    }

    /// Clean all search paths from the yangtree context.
    pub fn unset_searchdirs(&mut self) -> Result<()> {
        self.searchdirs.clear();
        Ok(())
    }

    /// Get the configured search paths.
    pub fn searchdirs(&self) -> impl Iterator<Item = &Path> {
        self.searchdirs.iter().map(PathBuf::as_path)
    }

    /// Get the currently set context's options.
    pub fn get_options(&self) -> ContextFlags {
        self.options
    }

    /// Set some of the context's options.
    pub fn set_options(&mut self, options: ContextFlags) -> Result<()> {
        self.options |= options;
        Ok(())
    }

    /// Unset some of the context's options.
    pub fn unset_options(&mut self, options: ContextFlags) -> Result<()> {
        self.options &= !options;
        Ok(())
    }

    /// Get current ID of the modules set.
    ///
    /// The ID changes every time a module is added or implemented.
    pub fn get_module_set_id(&self) -> u16 {
        self.module_set_id
    }

    /// Get YANG module of the given name and revision.
    ///
    /// Module names are unique in a context, so when the revision is not
    /// specified the module is returned whatever its revision is.
    pub fn get_module(
        &self,
        name: &str,
        revision: Option<&str>,
    ) -> Option<SchemaModule<'_>> {
        let id = self.module_id(name)?;
        if let Some(revision) = revision {
            if self.modules[id].revision.as_deref() != Some(revision) {
                return None;
            }
        }

        Some(SchemaModule::from_id(self, id))
    }

    /// Get the latest revision of the YANG module specified by its name.
    pub fn get_module_latest(&self, name: &str) -> Option<SchemaModule<'_>> {
        self.get_module(name, None)
    }

    /// Get the (only) implemented YANG module specified by its name.
    pub fn get_module_implemented(
        &self,
        name: &str,
    ) -> Option<SchemaModule<'_>> {
        self.get_module(name, None)
            .filter(|module| module.is_implemented())
    }

    /// YANG module of the given namespace and revision.
    pub fn get_module_ns(
        &self,
        ns: &str,
        revision: Option<&str>,
    ) -> Option<SchemaModule<'_>> {
        self.modules()
            .filter(|module| module.namespace() == ns)
            .find(|module| revision.is_none() || module.revision() == revision)
    }

    /// Get the (only) implemented YANG module specified by its namespace.
    pub fn get_module_implemented_ns(
        &self,
        ns: &str,
    ) -> Option<SchemaModule<'_>> {
        self.get_module_ns(ns, None)
            .filter(|module| module.is_implemented())
    }

    /// Get list of loaded modules.
    pub fn modules(&self) -> SchemaModules<'_> {
        SchemaModules::new(self)
    }

    /// Returns an iterator over all data nodes from all modules in the YANG
    /// context (depth-first search algorithm).
    pub fn traverse(&self) -> impl Iterator<Item = SchemaNode<'_>> {
        self.modules()
            .flat_map(|module| module.data())
            .flat_map(|snode| snode.traverse())
    }

    /// Try to find the model in the searchpaths and load it.
    ///
    /// The context itself is searched for the requested module first. When
    /// the module is already implemented it's returned as is and the
    /// `features` are ignored. A module that was only imported so far is
    /// implemented with the given features.
    ///
    /// If the revision is not specified, the latest revision is loaded.
    ///
    /// The `features` parameter lists the features to enable; `"*"` enables
    /// all of them.
    pub fn load_module(
        &mut self,
        name: &str,
        revision: Option<&str>,
        features: &[&str],
    ) -> Result<SchemaModule<'_>> {
        let result = self.with_rollback(|ctx| {
            ctx.load_module_id(name, revision, Some(features), true)
        });
        match result {
            Ok(id) => Ok(SchemaModule::from_id(self, id)),
            Err(error) => {
                logging::log_error(&error);
                Err(error)
            }
        }
    }

    /// Parse a YANG module from a string and add it to the context as an
    /// implemented module.
    pub fn parse_module_string(
        &mut self,
        data: impl AsRef<[u8]>,
        format: SchemaInputFormat,
        features: &[&str],
    ) -> Result<SchemaModule<'_>> {
        let result = self.with_rollback(|ctx| {
            let stmt = parse_schema(data.as_ref(), format)?;
            ctx.add_parsed_module(stmt, None, features)
        });
        match result {
            Ok(id) => Ok(SchemaModule::from_id(self, id)),
            Err(error) => {
                logging::log_error(&error);
                Err(error)
            }
        }
    }

    /// Parse a YANG module from a file and add it to the context as an
    /// implemented module.
    pub fn parse_module_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        format: SchemaInputFormat,
        features: &[&str],
    ) -> Result<SchemaModule<'_>> {
        let path = path.as_ref();
        let result = self.with_rollback(|ctx| {
            let data = std::fs::read(path)?;
            let stmt = parse_schema(&data, format)?;
            let filepath = path.display().to_string();
            ctx.add_parsed_module(stmt, Some(filepath), features)
        });
        match result {
            Ok(id) => Ok(SchemaModule::from_id(self, id)),
            Err(error) => {
                logging::log_error(&error);
                Err(error)
            }
        }
    }

    /// Evaluate a path expression on the schema trees of all modules.
    pub fn find_xpath(&self, path: &str) -> Result<Set<'_, SchemaNode<'_>>> {
        crate::xpath::find_schema(self, path).inspect_err(logging::log_error)
    }

    /// Get a schema node based on the given data path (JSON format).
    pub fn find_path(&self, path: &str) -> Result<SchemaNode<'_>> {
        crate::xpath::find_schema_single(self, path)
            .inspect_err(logging::log_error)
    }

    // ===== internal module management =====

    pub(crate) fn module_id(&self, name: &str) -> Option<usize> {
        self.modules.iter().position(|module| module.name == name)
    }

    /// Run a module load, restoring the previous context state on failure so
    /// that failed loads leave no partial modules behind.
    fn with_rollback<F>(&mut self, load: F) -> Result<usize>
    where
        F: FnOnce(&mut Context) -> Result<usize>,
    {
        let snapshot = Snapshot {
            modules: self.modules.clone(),
            nodes: self.nodes.clone(),
            identities: self.identities.clone(),
        };
        let module_count = self.modules.len();
        let implemented = self.implemented_count();

        match load(self) {
            Ok(id) => {
                if self.modules.len() != module_count
                    || self.implemented_count() != implemented
                {
                    self.module_set_id = self.module_set_id.wrapping_add(1);
                }
                Ok(id)
            }
            Err(error) => {
                self.modules = snapshot.modules;
                self.nodes = snapshot.nodes;
                self.identities = snapshot.identities;
                self.loading.clear();
                Err(error)
            }
        }
    }

    fn implemented_count(&self) -> usize {
        self.modules.iter().filter(|module| module.implemented).count()
    }

    fn add_parsed_module(
        &mut self,
        stmt: crate::yang::Stmt,
        filepath: Option<String>,
        features: &[&str],
    ) -> Result<usize> {
        let name = stmt.arg()?.to_owned();
        if let Some(id) = self.module_id(&name) {
            let revision = compile::latest_revision(&stmt);
            if self.modules[id].revision.as_deref() != revision.as_deref() {
                return Err(Error::schema(format!(
                    "Module \"{}\" already present in the context with a \
                     different revision",
                    name
                )));
            }
            if !self.modules[id].implemented {
                compile::implement_module(self, id, Some(features))?;
            }
            return Ok(id);
        }

        compile::add_module(self, stmt, filepath, true, Some(features))
    }

    /// Find a module in the context or load it from the search directories.
    pub(crate) fn load_module_id(
        &mut self,
        name: &str,
        revision: Option<&str>,
        features: Option<&[&str]>,
        implement: bool,
    ) -> Result<usize> {
        let implement =
            implement || self.options.contains(ContextFlags::ALL_IMPLEMENTED);

        if let Some(id) = self.module_id(name) {
            if let Some(revision) = revision {
                if self.modules[id].revision.as_deref() != Some(revision) {
                    return Err(Error::schema(format!(
                        "Module \"{}\" already present in the context with \
                         revision {}, can't load revision {}",
                        name,
                        self.modules[id].revision.as_deref().unwrap_or("none"),
                        revision
                    )));
                }
            }
            if implement && !self.modules[id].implemented {
                compile::implement_module(self, id, features)?;
            }
            return Ok(id);
        }

        if self.loading.iter().any(|loading| loading == name) {
            return Err(Error::schema(format!(
                "Circular import of module \"{}\"",
                name
            )));
        }

        let (path, format) = self.search_module(name, revision)?;
        logging::verbose(&format!(
            "Loading schema from \"{}\" file.",
            path.display()
        ));
        let data = std::fs::read(&path)?;
        let stmt = parse_schema(&data, format)?;
        if stmt.arg.as_deref() != Some(name) {
            return Err(Error::schema(format!(
                "Unexpected module \"{}\" parsed instead of \"{}\"",
                stmt.arg.as_deref().unwrap_or(""),
                name
            )));
        }
        if let Some(revision) = revision {
            if compile::latest_revision(&stmt).as_deref() != Some(revision) {
                return Err(Error::not_found(format!(
                    "Module \"{}@{}\" not found in the search directories",
                    name, revision
                )));
            }
        }

        self.loading.push(name.to_owned());
        let filepath = path.display().to_string();
        let result = compile::add_module(
            self,
            stmt,
            Some(filepath),
            implement,
            features,
        );
        self.loading.retain(|loading| loading != name);
        result
    }

    /// Find the schema file of a module in the search directories.
    fn search_module(
        &self,
        name: &str,
        revision: Option<&str>,
    ) -> Result<(PathBuf, SchemaInputFormat)> {
        let mut candidates = vec![];
        if !self.options.contains(ContextFlags::DISABLE_SEARCHDIRS) {
            for dir in &self.searchdirs {
                collect_candidates(dir, name, true, &mut candidates);
            }
            if !self.options.contains(ContextFlags::DISABLE_SEARCHDIR_CWD) {
                let cwd = Path::new(".");
                collect_candidates(cwd, name, false, &mut candidates);
            }
        }

        let candidate = match revision {
            Some(revision) => candidates
                .iter()
                .find(|candidate| {
                    candidate.revision.as_deref() == Some(revision)
                })
                .or_else(|| {
                    candidates
                        .iter()
                        .find(|candidate| candidate.revision.is_none())
                }),
            // Revisions sort lexicographically; files without a revision in
            // their name are the oldest.
            None => candidates.iter().reduce(latest_revision),
        };

        match candidate {
            Some(candidate) => {
                logging::debug(
                    &format!(
                        "Module \"{}\" found in \"{}\".",
                        name,
                        candidate.path.display()
                    ),
                    None,
                );
                Ok((candidate.path.clone(), candidate.format))
            }
            None => Err(Error::not_found(match revision {
                Some(revision) => format!(
                    "Module \"{}@{}\" not found in the search directories",
                    name, revision
                ),
                None => format!(
                    "Module \"{}\" not found in the search directories",
                    name
                ),
            })),
        }
    }
}

#[derive(Debug)]
struct Candidate {
    path: PathBuf,
    revision: Option<String>,
    format: SchemaInputFormat,
}

fn latest_revision<'c>(a: &'c Candidate, b: &'c Candidate) -> &'c Candidate {
    match (&a.revision, &b.revision) {
        (Some(ra), Some(rb)) if rb > ra => b,
        (None, Some(_)) => b,
        _ => a,
    }
}

/// Collect the schema files of the given module found in a directory.
fn collect_candidates(
    dir: &Path,
    name: &str,
    recursive: bool,
    candidates: &mut Vec<Candidate>,
) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) => {
            logging::warn(
                &format!(
                    "Unable to open directory \"{}\" ({}).",
                    dir.display(),
                    error
                ),
                None,
            );
            return;
        }
    };

    let mut entries = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .collect::<Vec<_>>();
    entries.sort();

    for path in entries {
        if path.is_dir() {
            if recursive {
                collect_candidates(&path, name, recursive, candidates);
            }
            continue;
        }

        let Some(file_name) = path.file_name().and_then(|name| name.to_str())
        else {
            continue;
        };
        let (stem, format) = if let Some(stem) = file_name.strip_suffix(".yang")
        {
            (stem, SchemaInputFormat::YANG)
        } else if let Some(stem) = file_name.strip_suffix(".yin") {
            (stem, SchemaInputFormat::YIN)
        } else {
            continue;
        };
        let (module, revision) = match stem.split_once('@') {
            Some((module, revision)) => (module, Some(revision.to_owned())),
            None => (stem, None),
        };
        if module == name {
            candidates.push(Candidate {
                path,
                revision,
                format,
            });
        }
    }
}

/// Parse a YANG or YIN document into its statement tree.
fn parse_schema(
    data: &[u8],
    format: SchemaInputFormat,
) -> Result<crate::yang::Stmt> {
    let data = std::str::from_utf8(data).map_err(|error| {
        Error::schema(format!("Invalid UTF-8 in schema: {}", error))
    })?;
    match format {
        SchemaInputFormat::YANG => crate::yang::parse(data),
        SchemaInputFormat::YIN => crate::yin::parse(data),
    }
}
