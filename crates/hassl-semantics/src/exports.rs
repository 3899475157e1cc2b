//! Cross-module export table
//!
//! Public declarations of already-analyzed modules, keyed by
//! `(package, kind, name)`. The table is a value: adding a module returns a
//! new table and leaves the old one untouched.

use std::collections::BTreeMap;
use std::fmt;

use crate::ir::{Alias, HolidaySet, Module, Schedule};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeclKind {
    Alias,
    Schedule,
    Holidays,
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeclKind::Alias => "alias",
            DeclKind::Schedule => "schedule",
            DeclKind::Holidays => "holidays",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExportKey {
    pub package: String,
    pub kind: DeclKind,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Export {
    Alias(Alias),
    Schedule(Schedule),
    Holidays(HolidaySet),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportTable {
    entries: BTreeMap<ExportKey, Export>,
}

impl ExportTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new table extended with the public declarations of `module`.
    pub fn with_module(&self, module: &Module) -> Self {
        let mut entries = self.entries.clone();
        let package = &module.package;

        for alias in module.aliases.values().filter(|a| !a.private) {
            entries.insert(
                ExportKey {
                    package: package.clone(),
                    kind: DeclKind::Alias,
                    name: alias.name.clone(),
                },
                Export::Alias(alias.clone()),
            );
        }
        for schedule in module.schedules.values().filter(|s| !s.private) {
            entries.insert(
                ExportKey {
                    package: package.clone(),
                    kind: DeclKind::Schedule,
                    name: schedule.name.name.clone(),
                },
                Export::Schedule(schedule.clone()),
            );
        }
        for set in module.holidays.values().filter(|h| !h.private) {
            entries.insert(
                ExportKey {
                    package: package.clone(),
                    kind: DeclKind::Holidays,
                    name: set.name.name.clone(),
                },
                Export::Holidays(set.clone()),
            );
        }

        Self { entries }
    }

    pub fn get(&self, package: &str, kind: DeclKind, name: &str) -> Option<&Export> {
        self.entries.get(&ExportKey {
            package: package.to_string(),
            kind,
            name: name.to_string(),
        })
    }

    /// Whether any public declaration of `package` is known
    pub fn has_package(&self, package: &str) -> bool {
        self.package_entries(package).next().is_some()
    }

    /// Public declarations of `package`, in key order
    pub fn package_entries<'a>(
        &'a self,
        package: &'a str,
    ) -> impl Iterator<Item = (&'a ExportKey, &'a Export)> + 'a {
        self.entries
            .iter()
            .filter(move |(key, _)| key.package == package)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
