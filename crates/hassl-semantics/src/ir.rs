//! Intermediate representation
//!
//! Produced by the analyzer, read by the code generator. Every device
//! reference is a resolved [`EntityId`] and every literal is parsed, so a
//! consumer never sees a bare alias or a raw duration string.

use chrono::{NaiveDate, NaiveTime};
use hassl_core::ast::{
    CompareOp, DaySelector, ExcludeDay, HolidayMode, Literal, OnOff, RuleOp, ScheduleOp, SyncKind,
};
use hassl_core::{EntityId, MonthDay, Property, TimeSpec, Weekday};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

/// A declaration name qualified by its package (`std.shared.wake_hours`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    pub package: String,
    pub name: String,
}

impl QualifiedName {
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }

    /// Split `pkg.sub.name` at the last dot.
    pub fn parse(qualified: &str) -> Option<Self> {
        let (package, name) = qualified.rsplit_once('.')?;
        if package.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(package, name))
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.package, self.name)
    }
}

/// One analyzed module
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub package: String,
    /// Aliases declared by this module, by bare name
    pub aliases: BTreeMap<String, Alias>,
    pub syncs: Vec<SyncGroup>,
    pub rules: Vec<Rule>,
    /// Schedules declared by this module
    pub schedules: BTreeMap<QualifiedName, Schedule>,
    /// Holiday sets declared by this module
    pub holidays: BTreeMap<QualifiedName, HolidaySet>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub name: String,
    pub target: EntityId,
    pub package: String,
    pub private: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncGroup {
    pub name: String,
    pub kind: SyncKind,
    /// Distinct members in declaration order
    pub members: Vec<EntityId>,
    pub invert: BTreeSet<EntityId>,
    pub properties: BTreeSet<Property>,
}

impl SyncGroup {
    pub fn is_inverted(&self, member: &EntityId) -> bool {
        self.invert.contains(member)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub name: String,
    pub clauses: Vec<Clause>,
    pub schedule_uses: BTreeSet<QualifiedName>,
    pub schedule_inline: Vec<ScheduleClause>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub condition: Expr,
    pub qualifier: Option<Qualifier>,
    pub actions: Vec<Action>,
}

/// Which write origins may not retrigger a clause (`not_by`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Qualifier {
    /// Writes made by the clause's own rule
    This,
    /// Writes made by anything generated for the module
    AnyHassl,
    /// Writes made by the named local rule
    Rule(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Compare {
        op: CompareOp,
        left: Operand,
        right: Operand,
    },
    Operand(Operand),
}

impl Expr {
    /// Every device referenced by the expression, sorted and de-duplicated
    pub fn entities(&self) -> BTreeSet<EntityId> {
        let mut out = BTreeSet::new();
        self.collect_entities(&mut out);
        out
    }

    fn collect_entities(&self, out: &mut BTreeSet<EntityId>) {
        match self {
            Expr::And(l, r) | Expr::Or(l, r) => {
                l.collect_entities(out);
                r.collect_entities(out);
            }
            Expr::Not(e) => e.collect_entities(out),
            Expr::Compare { left, right, .. } => {
                for operand in [left, right] {
                    if let Operand::Entity(id) = operand {
                        out.insert(id.clone());
                    }
                }
            }
            Expr::Operand(Operand::Entity(id)) => {
                out.insert(id.clone());
            }
            Expr::Operand(Operand::Literal(_)) => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Entity(EntityId),
    Literal(Literal),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Assign {
        target: EntityId,
        state: OnOff,
        duration: Option<Duration>,
    },
    AttrAssign {
        entity: EntityId,
        attr: String,
        value: Literal,
    },
    Wait {
        condition: Expr,
        duration: Duration,
        then: Vec<Action>,
    },
    RuleCtrl {
        op: RuleOp,
        rule: QualifiedName,
        end: Option<RuleCtrlEnd>,
    },
    Tag {
        name: String,
        value: Literal,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleCtrlEnd {
    For(Duration),
    Until(TimeSpec),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub name: QualifiedName,
    pub clauses: Vec<ScheduleClause>,
    pub private: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleClause {
    /// Edge-driven: `from` switches the cell, `to` switches it back
    Legacy {
        op: ScheduleOp,
        from: TimeSpec,
        to: Option<TimeSpec>,
    },
    Window(Window),
}

/// A recurring daily interval, optionally restricted by period and holidays
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub period: Option<Period>,
    pub days: DaySelector,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub holidays: Option<HolidayRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Period {
    /// Inclusive month range, wrapping across the new year
    Months { from: u32, to: u32 },
    /// Inclusive recurring day range, wrapping across the new year
    Dates { from: MonthDay, to: MonthDay },
    /// Inclusive absolute date range
    Range { from: NaiveDate, to: NaiveDate },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolidayRef {
    pub set: QualifiedName,
    pub mode: HolidayMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolidaySet {
    pub name: QualifiedName,
    pub country: String,
    pub province: Option<String>,
    pub add: Vec<NaiveDate>,
    pub remove: Vec<NaiveDate>,
    pub workdays: Vec<Weekday>,
    pub excludes: Vec<ExcludeDay>,
    pub private: bool,
}
