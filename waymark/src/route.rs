//! Route derivation from a handler's source location.
//!
//! The route is the handler's directory relative to the project root, under
//! the API root segment:
//!
//! ```text
//! src/api/catalog/list_products.rs, method marker  ->  /api/catalog/list_products
//! src/api/catalog/create.rs,        type marker    ->  /api/catalog
//! ```
//!
//! The project root is the nearest ancestor of the source file that holds a
//! `Cargo.toml`. A leading Cargo target directory (`src`, `tests`,
//! `examples`, `benches`) and a leading `api` segment are dropped before the
//! API root is added back. A `mod.rs` file stands for its directory.

use std::fs;
use std::path::{Component, Path, PathBuf};

use heck::ToSnakeCase;

use crate::error::DiscoveryError;
use crate::handler::HandlerType;
use crate::resolve::Resolution;

const MANIFEST: &str = "Cargo.toml";
const TARGET_DIRS: [&str; 4] = ["src", "tests", "examples", "benches"];
const SKIPPED_DIRS: [&str; 2] = ["target", "node_modules"];

#[derive(Debug, Clone)]
pub struct RouteDeriver {
    api_root: String,
    search_root: Option<PathBuf>,
}

impl Default for RouteDeriver {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteDeriver {
    pub fn new() -> Self {
        Self {
            api_root: "api".to_string(),
            search_root: None,
        }
    }

    /// Replaces the `api` root segment.
    pub fn with_api_root(mut self, api_root: impl Into<String>) -> Self {
        self.api_root = api_root.into().trim_matches('/').to_string();
        self
    }

    /// Directory searched when a recorded source path does not resolve.
    pub fn with_search_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.search_root = Some(root.into());
        self
    }

    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    /// Derives the route for a resolved handler type.
    pub fn derive(&self, ty: &HandlerType, resolution: Resolution) -> Result<String, DiscoveryError> {
        let file = self.locate_source(ty)?;
        self.route_for_file(&file, resolution)
    }

    /// Derives the route for a source file on disk.
    pub fn route_for_file(&self, file: &Path, resolution: Resolution) -> Result<String, DiscoveryError> {
        let root = find_project_root(file)?;
        let relative = file.strip_prefix(&root).unwrap_or(file);
        let (mut dirs, name) = split_relative(relative);

        if dirs
            .first()
            .is_some_and(|first| first.eq_ignore_ascii_case("api"))
        {
            dirs.remove(0);
        }

        let mut route = format!("/{}/{}", self.api_root, dirs.join("/"));
        if resolution == Resolution::MethodMarker {
            route.push('/');
            route.push_str(&name);
        }
        Ok(normalize_route(&route))
    }

    /// Finds the file a handler type was declared in.
    pub fn locate_source(&self, ty: &HandlerType) -> Result<PathBuf, DiscoveryError> {
        let recorded = Path::new(ty.source.file);

        if recorded.is_absolute() {
            if recorded.is_file() {
                return Ok(recorded.to_path_buf());
            }
        } else {
            let bases = self
                .search_root
                .iter()
                .map(PathBuf::as_path)
                .chain(Path::new(ty.source.manifest_dir).ancestors());
            for base in bases {
                let candidate = base.join(recorded);
                if candidate.is_file() {
                    return Ok(candidate);
                }
            }
        }

        self.search_source(ty, recorded)
    }

    fn search_source(&self, ty: &HandlerType, recorded: &Path) -> Result<PathBuf, DiscoveryError> {
        let root = match &self.search_root {
            Some(root) => root.clone(),
            None => find_project_root(Path::new(ty.source.manifest_dir).join(MANIFEST).as_path())?,
        };

        let mut names = Vec::new();
        if let Some(file_name) = recorded.file_name().and_then(|n| n.to_str()) {
            names.push(file_name.to_string());
        }
        names.push(format!("{}.rs", ty.name.to_snake_case()));

        let mut matches = Vec::new();
        collect_matches(&root, &names, &mut matches)?;
        matches.sort();

        match matches.len() {
            0 => Err(DiscoveryError::SourceNotFound {
                type_name: ty.type_path.to_string(),
                recorded: ty.source.file.to_string(),
            }),
            1 => Ok(matches.remove(0)),
            _ => disambiguate(ty, matches),
        }
    }
}

/// Nearest ancestor of `file` that contains a `Cargo.toml`.
pub fn find_project_root(file: &Path) -> Result<PathBuf, DiscoveryError> {
    let start = file.parent().unwrap_or(file);
    start
        .ancestors()
        .find(|dir| dir.join(MANIFEST).is_file())
        .map(Path::to_path_buf)
        .ok_or_else(|| DiscoveryError::ProjectRootNotFound {
            start: start.to_path_buf(),
        })
}

/// Splits a project-relative source path into directory segments and the
/// name that stands for the file.
pub fn split_relative(relative: &Path) -> (Vec<String>, String) {
    let mut segments: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    let file = segments.pop().unwrap_or_default();
    if segments
        .first()
        .is_some_and(|first| TARGET_DIRS.contains(&first.as_str()))
    {
        segments.remove(0);
    }

    let stem = Path::new(&file)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    if stem == "mod" {
        let name = segments.pop().unwrap_or_default();
        return (segments, name);
    }
    (segments, stem)
}

/// Collapses repeated slashes, trims a trailing slash and lowercases.
pub fn normalize_route(route: &str) -> String {
    let route = route.replace('\\', "/");
    let mut normalized = String::with_capacity(route.len() + 1);
    normalized.push('/');
    for segment in route.split('/').filter(|s| !s.is_empty()) {
        if normalized.len() > 1 {
            normalized.push('/');
        }
        normalized.push_str(segment);
    }
    normalized.to_lowercase()
}

fn collect_matches(dir: &Path, names: &[String], found: &mut Vec<PathBuf>) -> Result<(), DiscoveryError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();

        if entry.file_type()?.is_dir() {
            if file_name.starts_with('.') || SKIPPED_DIRS.contains(&&*file_name) {
                continue;
            }
            collect_matches(&path, names, found)?;
        } else if names.iter().any(|n| *n == file_name) {
            found.push(path);
        }
    }
    Ok(())
}

/// Picks the one match whose path ends with the module path fragment.
fn disambiguate(ty: &HandlerType, candidates: Vec<PathBuf>) -> Result<PathBuf, DiscoveryError> {
    let fragment: Vec<&str> = ty.source.module_path.split("::").skip(1).collect();

    let mut matching: Vec<&PathBuf> = candidates
        .iter()
        .filter(|path| !fragment.is_empty() && path_ends_with(path, &fragment))
        .collect();

    if matching.len() == 1 {
        return Ok(matching.remove(0).clone());
    }

    Err(DiscoveryError::AmbiguousSource {
        type_name: ty.type_path.to_string(),
        candidates,
    })
}

fn path_ends_with(path: &Path, fragment: &[&str]) -> bool {
    let without_ext = path.with_extension("");
    let mut segments: Vec<String> = without_ext
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if segments.last().is_some_and(|s| s == "mod") {
        segments.pop();
    }
    segments.len() >= fragment.len()
        && segments[segments.len() - fragment.len()..]
            .iter()
            .zip(fragment)
            .all(|(a, b)| a == b)
}
