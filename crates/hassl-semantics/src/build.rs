//! Multi-module build ordering
//!
//! Modules are analyzed leaves first so that every import finds the
//! exports it needs. Each module sees an export table containing exactly the
//! modules analyzed before it.

use hassl_core::ast::{Program, Statement};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use crate::analyzer::compile_module;
use crate::error::{SemanticError, SemanticResult};
use crate::exports::ExportTable;
use crate::ir::Module;

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unseen,
    Visiting,
    Done,
}

/// Package names of `programs` in dependency order, ties broken by name.
///
/// Imports of packages outside `programs` are ignored here; the resolver
/// reports them when the importing module is analyzed.
pub fn build_order(programs: &[Program]) -> SemanticResult<Vec<String>> {
    let mut edges: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for program in programs {
        if edges.contains_key(program.package.as_str()) {
            return Err(SemanticError::DuplicatePackageError {
                package: program.package.clone(),
            });
        }
        edges.insert(program.package.as_str(), BTreeSet::new());
    }
    for program in programs {
        let deps: BTreeSet<&str> = program
            .statements
            .iter()
            .filter_map(|s| match s {
                Statement::Import(import) => Some(import.package.as_str()),
                _ => None,
            })
            .filter(|pkg| edges.contains_key(pkg))
            .collect();
        edges.insert(program.package.as_str(), deps);
    }

    fn visit<'a>(
        node: &'a str,
        edges: &BTreeMap<&'a str, BTreeSet<&'a str>>,
        state: &mut BTreeMap<&'a str, VisitState>,
        stack: &mut Vec<&'a str>,
        order: &mut Vec<String>,
    ) -> SemanticResult<()> {
        state.insert(node, VisitState::Visiting);
        stack.push(node);

        for &dep in edges.get(node).into_iter().flatten() {
            match state.get(dep).copied().unwrap_or(VisitState::Unseen) {
                VisitState::Unseen => visit(dep, edges, state, stack, order)?,
                VisitState::Visiting => {
                    let start = stack.iter().position(|s| *s == dep).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        stack[start..].iter().map(|s| s.to_string()).collect();
                    cycle.push(dep.to_string());
                    return Err(SemanticError::CyclicImportError { cycle });
                }
                VisitState::Done => {}
            }
        }

        stack.pop();
        state.insert(node, VisitState::Done);
        order.push(node.to_string());
        Ok(())
    }

    let mut state: BTreeMap<&str, VisitState> =
        edges.keys().map(|k| (*k, VisitState::Unseen)).collect();
    let mut stack = Vec::new();
    let mut order = Vec::with_capacity(edges.len());

    let roots: Vec<&str> = edges.keys().copied().collect();
    for node in roots {
        if state.get(node) == Some(&VisitState::Unseen) {
            visit(node, &edges, &mut state, &mut stack, &mut order)?;
        }
    }

    Ok(order)
}

/// Analyze every program in dependency order.
///
/// Returns the modules in that order together with the final export table.
pub fn build(programs: &[Program]) -> SemanticResult<(Vec<Module>, ExportTable)> {
    let order = build_order(programs)?;
    debug!(order = ?order, "Build order");

    let by_package: BTreeMap<&str, &Program> =
        programs.iter().map(|p| (p.package.as_str(), p)).collect();

    let mut exports = ExportTable::new();
    let mut modules = Vec::with_capacity(order.len());
    for package in &order {
        let Some(program) = by_package.get(package.as_str()) else {
            continue;
        };
        let module = compile_module(program, &exports)?;
        exports = exports.with_module(&module);
        modules.push(module);
    }

    info!(
        modules = modules.len(),
        exports = exports.len(),
        "Analyzed all modules"
    );
    Ok((modules, exports))
}
