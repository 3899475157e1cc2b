//! Semantic analysis: syntax tree to IR
//!
//! Resolves every name through the module's [`Scope`], infers the property
//! set of each sync group from the domain table and parses all duration and
//! time literals. The input program is only borrowed; the IR is built fresh.

use hassl_core::ast::{
    self, ActionDecl, ClauseDecl, HolidaySetDecl, PeriodDecl, Program, QualifierDecl, RuleDecl,
    RuleItem, ScheduleClauseDecl, ScheduleDecl, Statement, SyncDecl, SyncKind,
};
use hassl_core::time::{parse_clock, parse_date};
use hassl_core::{domains, parse_duration, EntityId, LiteralError, MonthDay, Property, TimeSpec};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::error::{SemanticError, SemanticResult};
use crate::exports::ExportTable;
use crate::ir::{
    Action, Alias, Clause, Expr, HolidayRef, HolidaySet, Module, Operand, Period, QualifiedName,
    Qualifier, Rule, RuleCtrlEnd, Schedule, ScheduleClause, SyncGroup, Window,
};
use crate::resolver::{resolve_scope, Scope};

/// Resolve and analyze one module against the exports of its imports.
pub fn compile_module(program: &Program, exports: &ExportTable) -> SemanticResult<Module> {
    let scope = resolve_scope(program, exports)?;
    analyze(program, &scope)
}

/// Build the IR of `program` using an already-resolved scope.
pub fn analyze(program: &Program, scope: &Scope<'_>) -> SemanticResult<Module> {
    let analyzer = Analyzer::new(program, scope)?;

    let mut aliases = BTreeMap::new();
    let mut syncs = Vec::new();
    let mut rules = Vec::new();
    let mut schedules = BTreeMap::new();
    let mut holidays = BTreeMap::new();

    for statement in &program.statements {
        match statement {
            Statement::Import(_) => {}
            Statement::Alias(decl) => {
                let alias = Alias {
                    name: decl.name.clone(),
                    target: scope.resolve_entity(&decl.name)?,
                    package: program.package.clone(),
                    private: decl.private,
                };
                aliases.insert(decl.name.clone(), alias);
            }
            Statement::Sync(decl) => syncs.push(analyzer.sync(decl)?),
            Statement::Rule(decl) => rules.push(analyzer.rule(decl)?),
            Statement::Schedule(decl) => {
                let schedule = analyzer.schedule(decl)?;
                schedules.insert(schedule.name.clone(), schedule);
            }
            Statement::Holidays(decl) => {
                let set = analyzer.holidays(decl)?;
                holidays.insert(set.name.clone(), set);
            }
        }
    }

    debug!(
        package = %program.package,
        syncs = syncs.len(),
        rules = rules.len(),
        schedules = schedules.len(),
        "Analyzed module"
    );

    Ok(Module {
        package: program.package.clone(),
        aliases,
        syncs,
        rules,
        schedules,
        holidays,
    })
}

/// Property set synced by a group of `kind` over distinct `members`.
pub fn sync_properties(kind: SyncKind, members: &[EntityId]) -> BTreeSet<Property> {
    let per_member: Vec<BTreeSet<Property>> = members
        .iter()
        .map(|m| domains::domain_properties(m.domain()))
        .collect();

    match kind {
        SyncKind::Onoff => BTreeSet::from([Property::Onoff]),
        SyncKind::Dimmer => {
            let mut props = BTreeSet::from([Property::Onoff, Property::Brightness]);
            if !per_member.is_empty() && per_member.iter().all(|p| p.contains(&Property::ColorTemp))
            {
                props.insert(Property::ColorTemp);
            }
            props
        }
        SyncKind::Shared => {
            let mut iter = per_member.into_iter();
            let first = iter.next().unwrap_or_default();
            iter.fold(first, |acc, p| acc.intersection(&p).copied().collect())
        }
        SyncKind::All => {
            let mut counts: BTreeMap<Property, usize> = BTreeMap::new();
            for props in &per_member {
                for p in props {
                    *counts.entry(*p).or_default() += 1;
                }
            }
            counts
                .into_iter()
                .filter(|(_, n)| *n >= 2)
                .map(|(p, _)| p)
                .collect()
        }
    }
}

struct Analyzer<'p, 's> {
    package: &'p str,
    scope: &'p Scope<'s>,
    rule_names: BTreeSet<&'p str>,
}

impl<'p, 's> Analyzer<'p, 's> {
    fn new(program: &'p Program, scope: &'p Scope<'s>) -> SemanticResult<Self> {
        let package = program.package.as_str();
        let mut seen: BTreeSet<(&'static str, &str)> = BTreeSet::new();
        let mut rule_names = BTreeSet::new();

        for statement in &program.statements {
            let key = match statement {
                Statement::Import(_) => continue,
                Statement::Alias(d) => ("alias", d.name.as_str()),
                Statement::Sync(d) => ("sync", d.name.as_str()),
                Statement::Rule(d) => {
                    rule_names.insert(d.name.as_str());
                    ("rule", d.name.as_str())
                }
                Statement::Schedule(d) => ("schedule", d.name.as_str()),
                Statement::Holidays(d) => ("holidays", d.id.as_str()),
            };
            if !seen.insert(key) {
                return Err(SemanticError::DuplicateDeclarationError {
                    package: package.to_string(),
                    kind: key.0,
                    name: key.1.to_string(),
                });
            }
        }

        Ok(Self {
            package,
            scope,
            rule_names,
        })
    }

    fn literal<T>(&self, result: Result<T, LiteralError>) -> SemanticResult<T> {
        result.map_err(|e| SemanticError::literal(self.package, e))
    }

    fn sync(&self, decl: &SyncDecl) -> SemanticResult<SyncGroup> {
        let mut members: Vec<EntityId> = Vec::with_capacity(decl.members.len());
        for name in &decl.members {
            let id = self.scope.resolve_entity(name)?;
            if !members.contains(&id) {
                members.push(id);
            }
        }

        if members.len() < 2 {
            return Err(SemanticError::EmptySyncError {
                package: self.package.to_string(),
                sync: decl.name.clone(),
                found: members.len(),
            });
        }

        let mut invert = BTreeSet::new();
        for name in &decl.invert {
            let id = self.scope.resolve_entity(name)?;
            if !members.contains(&id) {
                return Err(SemanticError::InvertNotMemberError {
                    package: self.package.to_string(),
                    sync: decl.name.clone(),
                    entity: id.to_string(),
                });
            }
            invert.insert(id);
        }

        let properties = sync_properties(decl.sync_kind, &members);
        if properties.is_empty() {
            warn!(
                package = self.package,
                sync = %decl.name,
                "Sync has no property in common and will not generate anything"
            );
        }

        Ok(SyncGroup {
            name: decl.name.clone(),
            kind: decl.sync_kind,
            members,
            invert,
            properties,
        })
    }

    fn rule(&self, decl: &RuleDecl) -> SemanticResult<Rule> {
        let mut clauses = Vec::new();
        let mut schedule_uses = BTreeSet::new();
        let mut schedule_inline = Vec::new();

        for item in &decl.items {
            match item {
                RuleItem::Clause(clause) => clauses.push(self.clause(&decl.name, clause)?),
                RuleItem::ScheduleUse { names } => {
                    for name in names {
                        schedule_uses.insert(self.scope.resolve_schedule(name)?);
                    }
                }
                RuleItem::ScheduleInline { clauses } => {
                    for clause in clauses {
                        schedule_inline.push(self.schedule_clause(clause)?);
                    }
                }
            }
        }

        Ok(Rule {
            name: decl.name.clone(),
            clauses,
            schedule_uses,
            schedule_inline,
        })
    }

    fn clause(&self, rule: &str, decl: &ClauseDecl) -> SemanticResult<Clause> {
        if let ast::Expr::Operand {
            value: ast::Operand::Literal(lit),
        } = &decl.condition
        {
            warn!(
                package = self.package,
                rule,
                "Condition is the literal {:?} and always holds",
                lit
            );
        }

        let qualifier = match &decl.not_by {
            None => None,
            Some(QualifierDecl::This) => Some(Qualifier::This),
            Some(QualifierDecl::AnyHassl) => Some(Qualifier::AnyHassl),
            Some(QualifierDecl::Rule(name)) => Some(Qualifier::Rule(self.local_rule(name)?)),
        };

        Ok(Clause {
            condition: self.expr(&decl.condition)?,
            qualifier,
            actions: decl
                .actions
                .iter()
                .map(|a| self.action(a))
                .collect::<SemanticResult<_>>()?,
        })
    }

    /// A rule of this module, named bare or qualified by this package
    fn local_rule(&self, name: &str) -> SemanticResult<String> {
        let bare = name
            .strip_prefix(self.package)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(name);
        if self.rule_names.contains(bare) {
            Ok(bare.to_string())
        } else {
            Err(SemanticError::name(self.package, name))
        }
    }

    fn expr(&self, expr: &ast::Expr) -> SemanticResult<Expr> {
        Ok(match expr {
            ast::Expr::And { left, right } => {
                Expr::And(Box::new(self.expr(left)?), Box::new(self.expr(right)?))
            }
            ast::Expr::Or { left, right } => {
                Expr::Or(Box::new(self.expr(left)?), Box::new(self.expr(right)?))
            }
            ast::Expr::Not { operand } => Expr::Not(Box::new(self.expr(operand)?)),
            ast::Expr::Compare { op, left, right } => Expr::Compare {
                op: *op,
                left: self.operand(left)?,
                right: self.operand(right)?,
            },
            ast::Expr::Operand { value } => Expr::Operand(self.operand(value)?),
        })
    }

    fn operand(&self, operand: &ast::Operand) -> SemanticResult<Operand> {
        Ok(match operand {
            ast::Operand::Name(name) => Operand::Entity(self.scope.resolve_entity(name)?),
            ast::Operand::Literal(lit) => Operand::Literal(lit.clone()),
        })
    }

    fn action(&self, action: &ActionDecl) -> SemanticResult<Action> {
        Ok(match action {
            ActionDecl::Assign {
                target,
                state,
                r#for,
            } => Action::Assign {
                target: self.scope.resolve_entity(target)?,
                state: *state,
                duration: r#for
                    .as_deref()
                    .map(|d| self.literal(parse_duration(d)))
                    .transpose()?,
            },
            ActionDecl::AttrAssign {
                entity,
                attr,
                value,
            } => Action::AttrAssign {
                entity: self.scope.resolve_entity(entity)?,
                attr: attr.clone(),
                value: value.clone(),
            },
            ActionDecl::Wait {
                condition,
                r#for,
                then,
            } => Action::Wait {
                condition: self.expr(condition)?,
                duration: self.literal(parse_duration(r#for))?,
                then: then
                    .iter()
                    .map(|a| self.action(a))
                    .collect::<SemanticResult<_>>()?,
            },
            ActionDecl::RuleCtrl { op, rule, end } => Action::RuleCtrl {
                op: *op,
                rule: self.rule_target(rule)?,
                end: match end {
                    None => None,
                    Some(ast::RuleCtrlEnd::For(d)) => {
                        Some(RuleCtrlEnd::For(self.literal(parse_duration(d))?))
                    }
                    Some(ast::RuleCtrlEnd::Until(t)) => {
                        Some(RuleCtrlEnd::Until(self.literal(t.parse::<TimeSpec>())?))
                    }
                },
            },
            ActionDecl::Tag { name, value } => Action::Tag {
                name: name.clone(),
                value: value.clone(),
            },
        })
    }

    /// Target of `enable|disable rule NAME`: a local rule, or `pkg.rule`
    fn rule_target(&self, name: &str) -> SemanticResult<QualifiedName> {
        if !name.contains('.') {
            return self
                .local_rule(name)
                .map(|bare| QualifiedName::new(self.package, bare));
        }
        let qualified =
            QualifiedName::parse(name).ok_or_else(|| SemanticError::name(self.package, name))?;
        if qualified.package == self.package {
            self.local_rule(&qualified.name)
                .map(|bare| QualifiedName::new(self.package, bare))
        } else {
            Ok(qualified)
        }
    }

    fn schedule(&self, decl: &ScheduleDecl) -> SemanticResult<Schedule> {
        Ok(Schedule {
            name: QualifiedName::new(self.package, &decl.name),
            clauses: decl
                .clauses
                .iter()
                .map(|c| self.schedule_clause(c))
                .collect::<SemanticResult<_>>()?,
            private: decl.private,
        })
    }

    fn schedule_clause(&self, decl: &ScheduleClauseDecl) -> SemanticResult<ScheduleClause> {
        match decl {
            ScheduleClauseDecl::Legacy {
                op,
                from,
                to,
                until,
            } => {
                let end = match (to, until) {
                    (Some(to), Some(until)) => {
                        return Err(SemanticError::literal(
                            self.package,
                            LiteralError::Time(format!("to {to} until {until}")),
                        ))
                    }
                    (Some(end), None) | (None, Some(end)) => {
                        Some(self.literal(end.parse::<TimeSpec>())?)
                    }
                    (None, None) => None,
                };
                Ok(ScheduleClause::Legacy {
                    op: *op,
                    from: self.literal(from.parse::<TimeSpec>())?,
                    to: end,
                })
            }
            ScheduleClauseDecl::Window {
                period,
                days,
                start,
                end,
                holidays,
            } => Ok(ScheduleClause::Window(Window {
                period: period.as_ref().map(|p| self.period(p)).transpose()?,
                days: *days,
                start: self.literal(parse_clock(start))?,
                end: self.literal(parse_clock(end))?,
                holidays: holidays
                    .as_ref()
                    .map(|h| {
                        Ok::<_, SemanticError>(HolidayRef {
                            set: self.scope.resolve_holidays(&h.id)?,
                            mode: h.mode,
                        })
                    })
                    .transpose()?,
            })),
        }
    }

    fn period(&self, decl: &PeriodDecl) -> SemanticResult<Period> {
        Ok(match decl {
            PeriodDecl::Months { from, to } => {
                for month in [from, to] {
                    if !(1..=12).contains(month) {
                        return Err(SemanticError::literal(
                            self.package,
                            LiteralError::Date(format!("month {month}")),
                        ));
                    }
                }
                Period::Months {
                    from: *from,
                    to: *to,
                }
            }
            PeriodDecl::Dates { from, to } => Period::Dates {
                from: self.literal(from.parse::<MonthDay>())?,
                to: self.literal(to.parse::<MonthDay>())?,
            },
            PeriodDecl::Range { from, to } => Period::Range {
                from: self.literal(parse_date(from))?,
                to: self.literal(parse_date(to))?,
            },
        })
    }

    fn holidays(&self, decl: &HolidaySetDecl) -> SemanticResult<HolidaySet> {
        let dates = |list: &[String]| {
            list.iter()
                .map(|d| self.literal(parse_date(d)))
                .collect::<SemanticResult<Vec<_>>>()
        };
        Ok(HolidaySet {
            name: QualifiedName::new(self.package, &decl.id),
            country: decl.country.clone(),
            province: decl.province.clone(),
            add: dates(&decl.add)?,
            remove: dates(&decl.remove)?,
            workdays: decl.workdays.clone(),
            excludes: decl.excludes.clone(),
            private: decl.private,
        })
    }
}
