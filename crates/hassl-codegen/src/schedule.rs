//! Schedule compiler
//!
//! A schedule is a boolean cell driven by three automations. `start` and
//! `end` fire on the clause boundaries and `maintain` fires on platform
//! start and every few minutes. All three recompute the cell from every
//! clause, so overlapping clauses and restarts mid-window settle the same
//! way.

use chrono::NaiveTime;
use hassl_automation::condition::{NotCondition, SunCondition, TimeCondition};
use hassl_automation::trigger::{
    HassEvent, HomeassistantTrigger, SunTrigger, TimePatternTrigger, TimeTrigger,
};
use hassl_automation::{AutomationConfig, Condition, ExecutionMode, Trigger};
use hassl_core::ast::{DaySelector, HolidayMode, ScheduleOp};
use hassl_core::{format_signed_hms, SunEvent, TimeSpec};
use hassl_script::action::{ChooseAction, ChooseOption};
use hassl_script::Action;
use hassl_semantics::ir::{Period, ScheduleClause, Window};
use tracing::trace;

use crate::naming::{self, GeneratedId};

/// Trigger firing at `spec`
pub fn time_trigger(spec: &TimeSpec) -> Trigger {
    match spec {
        TimeSpec::Clock(t) => Trigger::Time(TimeTrigger {
            id: None,
            at: *t,
        }),
        TimeSpec::Sun { event, offset_secs } => Trigger::Sun(SunTrigger {
            id: None,
            event: *event,
            offset: *offset_secs,
        }),
    }
}

fn clock_trigger(t: NaiveTime) -> Trigger {
    time_trigger(&TimeSpec::Clock(t))
}

fn offset(secs: i64) -> Option<String> {
    (secs != 0).then(|| format_signed_hms(secs))
}

fn after(spec: &TimeSpec) -> Condition {
    match spec {
        TimeSpec::Clock(t) => Condition::Time(TimeCondition {
            after: Some(*t),
            ..TimeCondition::default()
        }),
        TimeSpec::Sun { event, offset_secs } => Condition::Sun(SunCondition {
            after: Some(*event),
            after_offset: offset(*offset_secs),
            ..SunCondition::default()
        }),
    }
}

fn before(spec: &TimeSpec) -> Condition {
    match spec {
        TimeSpec::Clock(t) => Condition::Time(TimeCondition {
            before: Some(*t),
            ..TimeCondition::default()
        }),
        TimeSpec::Sun { event, offset_secs } => Condition::Sun(SunCondition {
            before: Some(*event),
            before_offset: offset(*offset_secs),
            ..SunCondition::default()
        }),
    }
}

// Rough seconds-of-day, used only to decide whether an interval with a sun
// endpoint wraps midnight.
fn approx_seconds(spec: &TimeSpec) -> i64 {
    use chrono::Timelike;
    match spec {
        TimeSpec::Clock(t) => i64::from(t.num_seconds_from_midnight()),
        TimeSpec::Sun { event, offset_secs } => {
            let base = match event {
                SunEvent::Sunrise => 6 * 3600,
                SunEvent::Sunset => 18 * 3600,
            };
            base + offset_secs
        }
    }
}

/// Condition holding between `from` and `to`, wrapping midnight when `to`
/// comes first.
pub fn between(from: &TimeSpec, to: &TimeSpec) -> Condition {
    match (from, to) {
        (TimeSpec::Clock(a), TimeSpec::Clock(b)) => Condition::Time(TimeCondition {
            after: Some(*a),
            before: Some(*b),
            weekday: Vec::new(),
        }),
        _ if approx_seconds(from) < approx_seconds(to) => {
            Condition::and(vec![after(from), before(to)])
        }
        _ => Condition::or(vec![after(from), before(to)]),
    }
}

/// Template condition for a period selector
pub fn period_condition(period: &Period) -> Condition {
    let range = |value: &str, from: String, to: String, wraps: bool| {
        let joiner = if wraps { "or" } else { "and" };
        format!("{{{{ {value} >= {from} {joiner} {value} <= {to} }}}}")
    };
    let template = match period {
        Period::Months { from, to } => range(
            "now().month",
            from.to_string(),
            to.to_string(),
            from > to,
        ),
        Period::Dates { from, to } => range(
            "(now().month * 100 + now().day)",
            from.ordinal().to_string(),
            to.ordinal().to_string(),
            from.ordinal() > to.ordinal(),
        ),
        Period::Range { from, to } => range(
            "now().strftime('%Y-%m-%d')",
            format!("'{}'", from.format("%Y-%m-%d")),
            format!("'{}'", to.format("%Y-%m-%d")),
            false,
        ),
    };
    Condition::template(template)
}

/// Condition holding while a window clause is active
pub fn window_condition(window: &Window) -> Condition {
    let weekday = match window.days {
        DaySelector::Daily => Vec::new(),
        days => days.days().to_vec(),
    };
    let mut parts = vec![Condition::Time(TimeCondition {
        after: Some(window.start),
        before: Some(window.end),
        weekday,
    })];

    if let Some(period) = &window.period {
        parts.push(period_condition(period));
    }
    if let Some(holidays) = &window.holidays {
        let sensor = naming::holiday_sensor(&holidays.set.package, &holidays.set.name);
        // The holiday sensor reads off on holidays.
        let state = match holidays.mode {
            HolidayMode::Except => "on",
            HolidayMode::Only => "off",
        };
        parts.push(Condition::state(sensor.entity_id(), state));
    }

    single_or(parts, Condition::and)
}

fn single_or(mut parts: Vec<Condition>, combine: fn(Vec<Condition>) -> Condition) -> Condition {
    if parts.len() == 1 {
        parts.remove(0)
    } else {
        combine(parts)
    }
}

/// Whether the schedule should currently read on, or `None` for an empty
/// schedule.
///
/// On iff some enabling clause is active (or there are none) and no
/// disabling clause is active. An open-ended legacy clause lasts until
/// midnight.
pub fn active_condition(clauses: &[ScheduleClause]) -> Option<Condition> {
    let mut enables = Vec::new();
    let mut disables = Vec::new();
    for clause in clauses {
        match clause {
            ScheduleClause::Legacy { op, from, to } => {
                let active = match to {
                    Some(to) => between(from, to),
                    None => after(from),
                };
                match op {
                    ScheduleOp::Enable => enables.push(active),
                    ScheduleOp::Disable => disables.push(active),
                }
            }
            ScheduleClause::Window(window) => enables.push(window_condition(window)),
        }
    }

    let blocked = (!disables.is_empty())
        .then(|| Condition::Not(NotCondition {
            conditions: disables,
        }));
    let enabled = (!enables.is_empty()).then(|| single_or(enables, Condition::or));

    match (enabled, blocked) {
        (Some(e), Some(b)) => Some(Condition::and(vec![e, b])),
        (Some(c), None) | (None, Some(c)) => Some(c),
        (None, None) => None,
    }
}

fn set_cell(cell: &GeneratedId, on: bool) -> Action {
    let service = if on {
        "input_boolean.turn_on"
    } else {
        "input_boolean.turn_off"
    };
    Action::service(service, cell.entity_id())
}

fn recompute(cell: &GeneratedId, active: &Condition) -> Action {
    Action::Choose(ChooseAction {
        alias: None,
        choose: vec![ChooseOption {
            conditions: vec![active.clone()],
            sequence: vec![set_cell(cell, true)],
        }],
        default: vec![set_cell(cell, false)],
    })
}

/// Start, end and maintain automations for the schedule `name` of
/// `package`, driving `cell`.
pub fn compile_schedule(
    package: &str,
    name: &str,
    cell: &GeneratedId,
    clauses: &[ScheduleClause],
    maintain_minutes: u32,
) -> Vec<AutomationConfig<Action>> {
    let Some(active) = active_condition(clauses) else {
        return Vec::new();
    };

    let mut start = AutomationConfig::new(
        naming::schedule_automation(package, name, "start"),
        ExecutionMode::Restart,
    );
    let mut end = AutomationConfig::new(
        naming::schedule_automation(package, name, "end"),
        ExecutionMode::Restart,
    );
    for (i, clause) in clauses.iter().enumerate() {
        let (from, to) = match clause {
            ScheduleClause::Legacy { from, to, .. } => {
                (time_trigger(from), to.as_ref().map(time_trigger))
            }
            ScheduleClause::Window(window) => {
                (clock_trigger(window.start), Some(clock_trigger(window.end)))
            }
        };
        start.triggers.push(from.with_id(format!("start_{i}")));
        if let Some(to) = to {
            end.triggers.push(to.with_id(format!("end_{i}")));
        }
    }

    start.actions.push(recompute(cell, &active));

    let maintain = AutomationConfig::new(
        naming::schedule_automation(package, name, "maintain"),
        ExecutionMode::Restart,
    )
    .trigger(Trigger::Homeassistant(HomeassistantTrigger {
        id: None,
        event: HassEvent::Start,
    }))
    .trigger(Trigger::TimePattern(TimePatternTrigger {
        id: None,
        hours: None,
        minutes: Some(format!("/{}", maintain_minutes.max(1))),
        seconds: None,
    }))
    .action(recompute(cell, &active));

    let mut out = vec![start];
    if !end.triggers.is_empty() {
        end.actions.push(recompute(cell, &active));
        out.push(end);
    }
    out.push(maintain);

    trace!(schedule = %name, automations = out.len(), "Compiled schedule");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use hassl_core::MonthDay;
    use hassl_semantics::ir::HolidayRef;
    use hassl_semantics::QualifiedName;
    use serde_json::json;

    fn clock(s: &str) -> TimeSpec {
        s.parse().unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_legacy_clock_window() {
        let clauses = vec![ScheduleClause::Legacy {
            op: ScheduleOp::Enable,
            from: clock("07:00"),
            to: Some(clock("23:00")),
        }];
        let cell = naming::schedule_cell("home", "wake_hours");
        let automations = compile_schedule("home", "wake_hours", &cell, &clauses, 1);

        let ids: Vec<&str> = automations.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "hassl_schedule__home__wake_hours__start",
                "hassl_schedule__home__wake_hours__end",
                "hassl_schedule__home__wake_hours__maintain",
            ]
        );

        let start = serde_json::to_value(&automations[0]).unwrap();
        assert_eq!(
            start["triggers"],
            json!([{"trigger": "time", "id": "start_0", "at": "07:00:00"}])
        );
        let end = serde_json::to_value(&automations[1]).unwrap();
        assert_eq!(end["triggers"][0]["at"], json!("23:00:00"));

        let maintain = serde_json::to_value(&automations[2]).unwrap();
        assert_eq!(maintain["triggers"][1], json!({"trigger": "time_pattern", "minutes": "/1"}));
        assert_eq!(
            maintain["actions"][0]["choose"][0]["conditions"][0],
            json!({"condition": "time", "after": "07:00:00", "before": "23:00:00"})
        );
    }

    #[test]
    fn test_sun_interval_wraps_midnight() {
        let wraps = between(&clock("sunset"), &clock("sunrise"));
        assert!(matches!(wraps, Condition::Or(_)));
        let daytime = between(&clock("sunrise+30m"), &clock("sunset-1h"));
        assert_eq!(
            serde_json::to_value(&daytime).unwrap(),
            json!({
                "condition": "and",
                "conditions": [
                    {"condition": "sun", "after": "sunrise", "after_offset": "00:30:00"},
                    {"condition": "sun", "before": "sunset", "before_offset": "-01:00:00"}
                ]
            })
        );
    }

    #[test]
    fn test_open_ended_clause_has_no_end_automation() {
        let clauses = vec![ScheduleClause::Legacy {
            op: ScheduleOp::Enable,
            from: clock("sunset"),
            to: None,
        }];
        let cell = naming::schedule_cell("home", "evening");
        let automations = compile_schedule("home", "evening", &cell, &clauses, 5);
        assert_eq!(automations.len(), 2);
        assert_eq!(
            serde_json::to_value(&automations[0]).unwrap()["triggers"][0],
            json!({"trigger": "sun", "id": "start_0", "event": "sunset"})
        );
        assert_eq!(
            serde_json::to_value(&automations[1]).unwrap()["triggers"][1]["minutes"],
            json!("/5")
        );
    }

    #[test]
    fn test_legacy_edges_recompute_combined_state() {
        let clauses = vec![
            ScheduleClause::Legacy {
                op: ScheduleOp::Enable,
                from: clock("06:00"),
                to: Some(clock("22:00")),
            },
            ScheduleClause::Legacy {
                op: ScheduleOp::Disable,
                from: clock("12:00"),
                to: Some(clock("13:00")),
            },
        ];
        let cell = naming::schedule_cell("home", "day");
        let automations = compile_schedule("home", "day", &cell, &clauses, 1);
        let start = serde_json::to_value(&automations[0]).unwrap();
        let end = serde_json::to_value(&automations[1]).unwrap();
        let maintain = serde_json::to_value(&automations[2]).unwrap();

        assert_eq!(
            start["triggers"][1],
            json!({"trigger": "time", "id": "start_1", "at": "12:00:00"})
        );
        // Every edge re-evaluates all clauses.
        assert_eq!(end["triggers"][1]["at"], json!("13:00:00"));
        assert_eq!(start["actions"], maintain["actions"]);
        assert_eq!(end["actions"], maintain["actions"]);
        assert_eq!(
            start["actions"][0]["default"],
            json!([{"service": "input_boolean.turn_off",
                    "target": {"entity_id": ["input_boolean.hassl_schedule__home__day"]}}])
        );
        assert_eq!(start["actions"][0]["choose"][0]["conditions"][0]["condition"], json!("and"));
    }

    #[test]
    fn test_disable_clause_blocks() {
        let clauses = vec![
            ScheduleClause::Legacy {
                op: ScheduleOp::Enable,
                from: clock("06:00"),
                to: Some(clock("22:00")),
            },
            ScheduleClause::Legacy {
                op: ScheduleOp::Disable,
                from: clock("12:00"),
                to: Some(clock("13:00")),
            },
        ];
        let Some(Condition::And(and)) = active_condition(&clauses) else {
            panic!("expected and");
        };
        assert!(matches!(&and.conditions[1], Condition::Not(n) if n.conditions.len() == 1));
    }

    #[test]
    fn test_window_with_period_and_holidays() {
        let window = Window {
            period: Some(Period::Months { from: 9, to: 6 }),
            days: DaySelector::Weekdays,
            start: t(8, 0),
            end: t(18, 0),
            holidays: Some(HolidayRef {
                set: QualifiedName::new("home", "us"),
                mode: HolidayMode::Except,
            }),
        };
        let value = serde_json::to_value(window_condition(&window)).unwrap();
        assert_eq!(
            value,
            json!({
                "condition": "and",
                "conditions": [
                    {"condition": "time", "after": "08:00:00", "before": "18:00:00",
                     "weekday": ["mon", "tue", "wed", "thu", "fri"]},
                    {"condition": "template",
                     "value_template": "{{ now().month >= 9 or now().month <= 6 }}"},
                    {"condition": "state", "entity_id": "binary_sensor.hassl_holidays_home_us",
                     "state": "on"}
                ]
            })
        );
    }

    #[test]
    fn test_period_templates() {
        let dates = Period::Dates {
            from: "12-01".parse::<MonthDay>().unwrap(),
            to: "01-15".parse::<MonthDay>().unwrap(),
        };
        assert_eq!(
            period_condition(&dates),
            Condition::template(
                "{{ (now().month * 100 + now().day) >= 1201 or (now().month * 100 + now().day) <= 115 }}"
            )
        );

        let range = Period::Range {
            from: NaiveDate::from_ymd_opt(2025, 12, 20).unwrap(),
            to: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
        };
        assert_eq!(
            period_condition(&range),
            Condition::template(
                "{{ now().strftime('%Y-%m-%d') >= '2025-12-20' and now().strftime('%Y-%m-%d') <= '2026-01-05' }}"
            )
        );
    }

    #[test]
    fn test_empty_schedule() {
        let cell = naming::schedule_cell("home", "none");
        assert!(compile_schedule("home", "none", &cell, &[], 1).is_empty());
    }
}
