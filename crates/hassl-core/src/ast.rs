//! Input syntax tree
//!
//! The front end hands over one [`Program`] per module: the package id and
//! an ordered statement list. Names are still unresolved and literals are
//! still strings; the analyzer turns this into the IR.
//!
//! The tree is serde-deserializable so that front-end output can be loaded
//! from YAML or JSON:
//!
//! ```yaml
//! package: home.kitchen
//! statements:
//!   - kind: alias
//!     name: a
//!     target: light.kitchen
//!   - kind: sync
//!     name: ksync
//!     sync_kind: shared
//!     members: [a, b]
//! ```

use serde::{Deserialize, Serialize};

use crate::time::Weekday;

/// One compilation unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub package: String,
    #[serde(default)]
    pub statements: Vec<Statement>,
}

/// Top-level statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Statement {
    Import(ImportDecl),
    Alias(AliasDecl),
    Sync(SyncDecl),
    Rule(RuleDecl),
    Schedule(ScheduleDecl),
    Holidays(HolidaySetDecl),
}

/// `import pkg.*`, `import pkg: a, b as c` or `import pkg as m`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDecl {
    pub package: String,
    #[serde(flatten)]
    pub form: ImportForm,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum ImportForm {
    Glob,
    Select { items: Vec<ImportItem> },
    Module { alias: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasDecl {
    pub name: String,
    pub target: String,
    #[serde(default)]
    pub private: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncKind {
    Onoff,
    Dimmer,
    Shared,
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncDecl {
    pub name: String,
    pub sync_kind: SyncKind,
    pub members: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invert: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDecl {
    pub name: String,
    #[serde(default)]
    pub items: Vec<RuleItem>,
}

/// Entry of a rule body, in source order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "item", rename_all = "snake_case")]
pub enum RuleItem {
    Clause(ClauseDecl),
    ScheduleUse { names: Vec<String> },
    ScheduleInline { clauses: Vec<ScheduleClauseDecl> },
}

/// `if (condition) [not_by ...] then actions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClauseDecl {
    pub condition: Expr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_by: Option<QualifierDecl>,
    pub actions: Vec<ActionDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualifierDecl {
    This,
    AnyHassl,
    Rule(String),
}

/// Condition expression with unresolved names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "expr", rename_all = "snake_case")]
pub enum Expr {
    And { left: Box<Expr>, right: Box<Expr> },
    Or { left: Box<Expr>, right: Box<Expr> },
    Not { operand: Box<Expr> },
    Compare {
        op: CompareOp,
        left: Operand,
        right: Operand,
    },
    Operand { value: Operand },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">=")]
    Ge,
}

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::Le => "<=",
            CompareOp::Ge => ">=",
        }
    }

    /// `<`, `>`, `<=` or `>=`
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            CompareOp::Lt | CompareOp::Gt | CompareOp::Le | CompareOp::Ge
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    /// Alias, module-qualified alias or device identifier
    Name(String),
    Literal(Literal),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Number(f64),
    State(OnOff),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnOff {
    On,
    Off,
}

impl OnOff {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnOff::On => "on",
            OnOff::Off => "off",
        }
    }

    pub fn inverse(&self) -> OnOff {
        match self {
            OnOff::On => OnOff::Off,
            OnOff::Off => OnOff::On,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOp {
    Enable,
    Disable,
}

/// How long a `rule_ctrl` lasts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCtrlEnd {
    For(String),
    Until(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionDecl {
    Assign {
        target: String,
        state: OnOff,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        r#for: Option<String>,
    },
    AttrAssign {
        entity: String,
        attr: String,
        value: Literal,
    },
    Wait {
        condition: Expr,
        r#for: String,
        then: Vec<ActionDecl>,
    },
    RuleCtrl {
        op: RuleOp,
        rule: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end: Option<RuleCtrlEnd>,
    },
    Tag {
        name: String,
        value: Literal,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDecl {
    pub name: String,
    pub clauses: Vec<ScheduleClauseDecl>,
    #[serde(default)]
    pub private: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleOp {
    Enable,
    Disable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum ScheduleClauseDecl {
    /// `enable|disable from T [to T | until T]`
    Legacy {
        op: ScheduleOp,
        from: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        until: Option<String>,
    },
    /// `[during P] on weekdays|weekends|daily HH:MM-HH:MM [except|only holidays H]`
    Window {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        period: Option<PeriodDecl>,
        #[serde(default)]
        days: DaySelector,
        start: String,
        end: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        holidays: Option<HolidayRefDecl>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "period", rename_all = "snake_case")]
pub enum PeriodDecl {
    Months { from: u32, to: u32 },
    Dates { from: String, to: String },
    Range { from: String, to: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaySelector {
    Weekdays,
    Weekends,
    #[default]
    Daily,
}

impl DaySelector {
    pub fn days(&self) -> &'static [Weekday] {
        match self {
            DaySelector::Weekdays => &Weekday::WORKWEEK,
            DaySelector::Weekends => &Weekday::WEEKEND,
            DaySelector::Daily => &Weekday::ALL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HolidayMode {
    #[default]
    Except,
    Only,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayRefDecl {
    pub id: String,
    #[serde(default)]
    pub mode: HolidayMode,
}

/// `holidays NAME: country=.., province=.., add=[..], remove=[..], workdays=[..], excludes=[..]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidaySetDecl {
    pub id: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(default)]
    pub add: Vec<String>,
    #[serde(default)]
    pub remove: Vec<String>,
    #[serde(default = "default_workdays")]
    pub workdays: Vec<Weekday>,
    #[serde(default = "default_excludes")]
    pub excludes: Vec<ExcludeDay>,
    #[serde(default)]
    pub private: bool,
}

fn default_workdays() -> Vec<Weekday> {
    Weekday::WORKWEEK.to_vec()
}

fn default_excludes() -> Vec<ExcludeDay> {
    vec![ExcludeDay::Sat, ExcludeDay::Sun, ExcludeDay::Holiday]
}

/// Entry of a workday sensor's `excludes` list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExcludeDay {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
    Holiday,
}

impl ExcludeDay {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExcludeDay::Mon => "mon",
            ExcludeDay::Tue => "tue",
            ExcludeDay::Wed => "wed",
            ExcludeDay::Thu => "thu",
            ExcludeDay::Fri => "fri",
            ExcludeDay::Sat => "sat",
            ExcludeDay::Sun => "sun",
            ExcludeDay::Holiday => "holiday",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_from_yaml() {
        let yaml = r#"
package: home
statements:
  - kind: import
    package: std.shared
    form: glob
  - kind: alias
    name: a
    target: light.kitchen
  - kind: sync
    name: ksync
    sync_kind: shared
    members: [a, b]
  - kind: rule
    name: motion_light
    items:
      - item: schedule_use
        names: [wake_hours]
      - item: clause
        condition:
          expr: compare
          op: "=="
          left: { name: motion }
          right: { literal: "on" }
        not_by: this
        actions:
          - action: assign
            target: a
            state: "on"
            for: 10m
"#;
        let program: Program = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(program.package, "home");
        assert_eq!(program.statements.len(), 4);
        assert!(matches!(
            &program.statements[0],
            Statement::Import(ImportDecl { form: ImportForm::Glob, .. })
        ));
        let Statement::Rule(rule) = &program.statements[3] else {
            panic!("expected rule");
        };
        let RuleItem::Clause(clause) = &rule.items[1] else {
            panic!("expected clause");
        };
        assert_eq!(clause.not_by, Some(QualifierDecl::This));
        assert!(matches!(
            &clause.condition,
            Expr::Compare {
                op: CompareOp::Eq,
                right: Operand::Literal(Literal::State(OnOff::On)),
                ..
            }
        ));
        assert!(matches!(
            &clause.actions[0],
            ActionDecl::Assign { r#for: Some(d), .. } if d == "10m"
        ));
    }

    #[test]
    fn test_literal_untagged_order() {
        let n: Literal = serde_json::from_str("42").unwrap();
        assert_eq!(n, Literal::Number(42.0));
        let s: Literal = serde_json::from_str("\"off\"").unwrap();
        assert_eq!(s, Literal::State(OnOff::Off));
        let t: Literal = serde_json::from_str("\"cozy\"").unwrap();
        assert_eq!(t, Literal::Str("cozy".into()));
    }

    #[test]
    fn test_holiday_defaults() {
        let h: HolidaySetDecl =
            serde_json::from_str(r#"{"id": "us", "country": "US"}"#).unwrap();
        assert_eq!(h.workdays, Weekday::WORKWEEK.to_vec());
        assert!(h.excludes.contains(&ExcludeDay::Holiday));
        let e: ExcludeDay = serde_json::from_str("\"holiday\"").unwrap();
        assert_eq!(e, ExcludeDay::Holiday);
    }
}
