//! Name and visibility resolution
//!
//! Builds the local scope of a module from its import directives and its own
//! declarations, then answers "what does this name refer to" for devices,
//! schedules and holiday sets.

use hassl_core::ast::{ImportForm, Program, Statement};
use hassl_core::EntityId;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::error::{SemanticError, SemanticResult};
use crate::exports::{DeclKind, Export, ExportTable};
use crate::ir::QualifiedName;

/// Names visible inside one module
#[derive(Debug, Clone)]
pub struct Scope<'a> {
    package: String,
    exports: &'a ExportTable,
    aliases: BTreeMap<String, EntityId>,
    schedules: BTreeMap<String, QualifiedName>,
    holidays: BTreeMap<String, QualifiedName>,
    /// `import pkg as m`: m -> pkg
    modules: BTreeMap<String, String>,
}

/// Build the scope for `program` against the already-known exports.
///
/// Imports are applied first, in statement order; the module's own
/// declarations are overlaid afterwards and shadow imported names.
pub fn resolve_scope<'a>(program: &Program, exports: &'a ExportTable) -> SemanticResult<Scope<'a>> {
    let mut scope = Scope {
        package: program.package.clone(),
        exports,
        aliases: BTreeMap::new(),
        schedules: BTreeMap::new(),
        holidays: BTreeMap::new(),
        modules: BTreeMap::new(),
    };

    for statement in &program.statements {
        if let Statement::Import(import) = statement {
            scope.apply_import(&import.package, &import.form)?;
        }
    }

    for statement in &program.statements {
        match statement {
            Statement::Alias(alias) => {
                let target = scope.resolve_entity(&alias.target)?;
                scope.aliases.insert(alias.name.clone(), target);
            }
            Statement::Schedule(schedule) => {
                scope.schedules.insert(
                    schedule.name.clone(),
                    QualifiedName::new(&program.package, &schedule.name),
                );
            }
            Statement::Holidays(set) => {
                scope.holidays.insert(
                    set.id.clone(),
                    QualifiedName::new(&program.package, &set.id),
                );
            }
            _ => {}
        }
    }

    debug!(
        package = %scope.package,
        aliases = scope.aliases.len(),
        schedules = scope.schedules.len(),
        "Resolved scope"
    );
    Ok(scope)
}

impl<'a> Scope<'a> {
    fn apply_import(&mut self, package: &str, form: &ImportForm) -> SemanticResult<()> {
        if !self.exports.has_package(package) {
            return Err(SemanticError::import(
                &self.package,
                format!("package '{package}' has no public declarations"),
            ));
        }

        match form {
            ImportForm::Glob => {
                let entries: Vec<(String, Export)> = self
                    .exports
                    .package_entries(package)
                    .map(|(key, export)| (key.name.clone(), export.clone()))
                    .collect();
                for (name, export) in entries {
                    self.bind(&name, &export);
                }
            }
            ImportForm::Select { items } => {
                for item in items {
                    let found: Vec<Export> = [DeclKind::Alias, DeclKind::Schedule, DeclKind::Holidays]
                        .into_iter()
                        .filter_map(|kind| self.exports.get(package, kind, &item.name).cloned())
                        .collect();
                    if found.is_empty() {
                        return Err(SemanticError::import(
                            &self.package,
                            format!("'{}' is not a public declaration of '{package}'", item.name),
                        ));
                    }
                    let local = item.rename.as_deref().unwrap_or(&item.name);
                    for export in &found {
                        self.bind(local, export);
                    }
                }
            }
            ImportForm::Module { alias } => {
                self.modules.insert(alias.clone(), package.to_string());
            }
        }
        Ok(())
    }

    fn bind(&mut self, local: &str, export: &Export) {
        match export {
            Export::Alias(alias) => {
                if let Some(previous) = self.aliases.insert(local.to_string(), alias.target.clone()) {
                    if previous != alias.target {
                        warn!(
                            package = %self.package,
                            name = local,
                            "Import rebinds alias from {} to {}",
                            previous,
                            alias.target
                        );
                    }
                }
            }
            Export::Schedule(schedule) => {
                self.schedules.insert(local.to_string(), schedule.name.clone());
            }
            Export::Holidays(set) => {
                self.holidays.insert(local.to_string(), set.name.clone());
            }
        }
    }

    /// Resolve a device reference.
    ///
    /// Accepts a bound alias, `m.alias` through a whole-module import, or a
    /// device identifier (which resolves to itself).
    pub fn resolve_entity(&self, name: &str) -> SemanticResult<EntityId> {
        if let Some(target) = self.aliases.get(name) {
            return Ok(target.clone());
        }

        if let Some((prefix, rest)) = name.split_once('.') {
            if let Some(package) = self.modules.get(prefix) {
                return match self.exports.get(package, DeclKind::Alias, rest) {
                    Some(Export::Alias(alias)) => Ok(alias.target.clone()),
                    _ => Err(SemanticError::import(
                        &self.package,
                        format!("'{rest}' is not a public alias of '{package}'"),
                    )),
                };
            }
        }

        name.parse::<EntityId>()
            .map_err(|_| SemanticError::name(&self.package, name))
    }

    /// Resolve a schedule reference to its qualified name.
    pub fn resolve_schedule(&self, name: &str) -> SemanticResult<QualifiedName> {
        self.resolve_decl(DeclKind::Schedule, &self.schedules, name)
    }

    /// Resolve a holiday set reference to its qualified name.
    pub fn resolve_holidays(&self, name: &str) -> SemanticResult<QualifiedName> {
        self.resolve_decl(DeclKind::Holidays, &self.holidays, name)
    }

    fn resolve_decl(
        &self,
        kind: DeclKind,
        bound: &BTreeMap<String, QualifiedName>,
        name: &str,
    ) -> SemanticResult<QualifiedName> {
        if let Some(qualified) = bound.get(name) {
            return Ok(qualified.clone());
        }

        if let Some((prefix, rest)) = name.split_once('.') {
            if let Some(package) = self.modules.get(prefix) {
                return match self.exports.get(package, kind, rest) {
                    Some(_) => Ok(QualifiedName::new(package, rest)),
                    None => Err(SemanticError::import(
                        &self.package,
                        format!("'{rest}' is not a public {kind} of '{package}'"),
                    )),
                };
            }
        }

        let qualified =
            QualifiedName::parse(name).ok_or_else(|| SemanticError::name(&self.package, name))?;
        let known = if qualified.package == self.package {
            bound.values().any(|q| q == &qualified)
        } else {
            self.exports
                .get(&qualified.package, kind, &qualified.name)
                .is_some()
        };
        if known {
            Ok(qualified)
        } else {
            Err(SemanticError::name(&self.package, name))
        }
    }
}
