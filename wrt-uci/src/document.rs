//! Decoded document tree
//!
//! ```text
//! Document
//! └── Package            "network"
//!     └── SectionGroup   "interface" / "device"
//!         └── Section    "wan" or position 0
//!             └── option → value
//! ```
//!
//! All maps keep first-insertion order so that rendering follows the dump.
//! A [`SectionGroup`] serializes as a map when `Named` and as a sequence when
//! `List`, which is what external renderers (YAML, JSON) expect.

use indexmap::IndexMap;
use serde::Serialize;
use std::ops::Index;

/// Packages of a dump, keyed by package name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Document {
    packages: IndexMap<String, Package>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, package: &str) -> Option<&Package> {
        self.packages.get(package)
    }

    pub fn packages(&self) -> impl Iterator<Item = (&str, &Package)> {
        self.packages.iter().map(|(name, package)| (name.as_str(), package))
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub(crate) fn package_mut(&mut self, package: &str) -> &mut Package {
        if !self.packages.contains_key(package) {
            self.packages.insert(package.to_string(), Package::default());
        }
        &mut self.packages[package]
    }
}

impl Index<&str> for Document {
    type Output = Package;

    fn index(&self, package: &str) -> &Package {
        self.get(package)
            .unwrap_or_else(|| panic!("no package named {:?}", package))
    }
}

/// Section groups of one package, keyed by section kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Package {
    groups: IndexMap<String, SectionGroup>,
}

impl Package {
    pub fn get(&self, kind: &str) -> Option<&SectionGroup> {
        self.groups.get(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Group for `kind`, created with `init` on first reference only.
    pub(crate) fn group_mut_or_insert_with<F>(&mut self, kind: &str, init: F) -> &mut SectionGroup
    where
        F: FnOnce() -> SectionGroup,
    {
        if !self.groups.contains_key(kind) {
            self.groups.insert(kind.to_string(), init());
        }
        &mut self.groups[kind]
    }
}

impl Index<&str> for Package {
    type Output = SectionGroup;

    fn index(&self, kind: &str) -> &SectionGroup {
        self.get(kind)
            .unwrap_or_else(|| panic!("no section kind {:?}", kind))
    }
}

/// All sections of one kind within a package.
///
/// The variant is chosen when the kind is first seen and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SectionGroup {
    /// Sections keyed by id, in first-appearance order
    Named(IndexMap<String, Section>),
    /// Anonymous sections in list order
    List(Vec<Section>),
}

impl SectionGroup {
    pub fn is_list(&self) -> bool {
        matches!(self, SectionGroup::List(_))
    }

    pub fn len(&self) -> usize {
        match self {
            SectionGroup::Named(sections) => sections.len(),
            SectionGroup::List(sections) => sections.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Section by key. Only `Named` groups have keys.
    pub fn get(&self, key: &str) -> Option<&Section> {
        match self {
            SectionGroup::Named(sections) => sections.get(key),
            SectionGroup::List(_) => None,
        }
    }

    /// Section by position, in either representation.
    pub fn get_index(&self, position: usize) -> Option<&Section> {
        match self {
            SectionGroup::Named(sections) => sections.get_index(position).map(|(_, s)| s),
            SectionGroup::List(sections) => sections.get(position),
        }
    }

    /// Sections in order, without their keys.
    pub fn sections(&self) -> Box<dyn Iterator<Item = &Section> + '_> {
        match self {
            SectionGroup::Named(sections) => Box::new(sections.values()),
            SectionGroup::List(sections) => Box::new(sections.iter()),
        }
    }
}

impl Index<&str> for SectionGroup {
    type Output = Section;

    fn index(&self, key: &str) -> &Section {
        self.get(key)
            .unwrap_or_else(|| panic!("no section keyed {:?}", key))
    }
}

impl Index<usize> for SectionGroup {
    type Output = Section;

    fn index(&self, position: usize) -> &Section {
        self.get_index(position)
            .unwrap_or_else(|| panic!("no section at position {}", position))
    }
}

/// Options of one section instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Section {
    options: IndexMap<String, String>,
}

impl Section {
    pub fn get(&self, option: &str) -> Option<&str> {
        self.options.get(option).map(String::as_str)
    }

    /// Set an option. A later assignment of the same option replaces the value.
    pub fn set(&mut self, option: &str, value: &str) {
        self.options.insert(option.to_string(), value.to_string());
    }

    pub fn options(&self) -> impl Iterator<Item = (&str, &str)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

impl Index<&str> for Section {
    type Output = str;

    fn index(&self, option: &str) -> &str {
        self.get(option)
            .unwrap_or_else(|| panic!("no option named {:?}", option))
    }
}

impl<K, V> FromIterator<(K, V)> for Section
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Section {
            options: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
