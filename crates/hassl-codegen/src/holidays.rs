//! Holiday sets
//!
//! A set becomes two `workday` sensors. The holiday sensor treats every day
//! as a workday and excludes only holidays, so it reads `off` exactly on
//! holidays. The workday sensor carries the set's own calendar.

use hassl_core::ast::ExcludeDay;
use hassl_core::Weekday;
use hassl_semantics::ir::HolidaySet;

use crate::document::WorkdaySensor;
use crate::naming;

const PLATFORM: &str = "workday";

pub fn lower_holidays(set: &HolidaySet) -> [WorkdaySensor; 2] {
    let sensor = |name: String, workdays: Vec<Weekday>, excludes: Vec<ExcludeDay>| WorkdaySensor {
        platform: PLATFORM.to_string(),
        name,
        country: set.country.clone(),
        province: set.province.clone(),
        workdays,
        excludes,
        add_holidays: set.add.clone(),
        remove_holidays: set.remove.clone(),
    };

    let package = &set.name.package;
    let id = &set.name.name;
    [
        sensor(
            naming::holiday_sensor_name(package, id),
            Weekday::ALL.to_vec(),
            vec![ExcludeDay::Holiday],
        ),
        sensor(
            naming::workday_sensor_name(package, id),
            set.workdays.clone(),
            set.excludes.clone(),
        ),
    ]
}
