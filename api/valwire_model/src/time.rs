// Copyright 2015-2023 Swim Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use chrono::{Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::ModelError;

const MINUTES_PER_DAY: i32 = 24 * 60;
const NANOS_PER_MILLI: u32 = 1_000_000;

/// A date, a time of day or both. Times are held to millisecond precision and carry the
/// offset of their timezone from UTC. Values can only be created through the constructors,
/// which maintain the precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateTimeValue(Repr);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Repr {
    Date(NaiveDate),
    Time {
        time: NaiveTime,
        offset_minutes: i32,
    },
    DateTime {
        datetime: NaiveDateTime,
        offset_minutes: i32,
    },
}

/// The calendar components of a [`DateTimeValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateFields {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// The clock components of a [`DateTimeValue`]. The timezone offset is split into hours
/// and minutes, both carrying the sign of the offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeFields {
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub millisecond: u32,
    pub tz_hours: i32,
    pub tz_minutes: i32,
}

fn check_offset(offset_minutes: i32) -> Result<i32, ModelError> {
    if offset_minutes.abs() < MINUTES_PER_DAY {
        Ok(offset_minutes)
    } else {
        Err(ModelError::InvalidOffset(offset_minutes))
    }
}

fn make_date(fields: DateFields) -> Result<NaiveDate, ModelError> {
    let DateFields { year, month, day } = fields;
    NaiveDate::from_ymd_opt(year, month, day).ok_or(ModelError::InvalidDateTime)
}

fn make_time(fields: TimeFields) -> Result<(NaiveTime, i32), ModelError> {
    let TimeFields {
        hour,
        minute,
        second,
        millisecond,
        tz_hours,
        tz_minutes,
    } = fields;
    let time = NaiveTime::from_hms_milli_opt(hour, minute, second, millisecond)
        .ok_or(ModelError::InvalidDateTime)?;
    let offset = tz_hours
        .checked_mul(60)
        .and_then(|h| h.checked_add(tz_minutes))
        .ok_or(ModelError::InvalidDateTime)?;
    Ok((time, check_offset(offset)?))
}

fn truncate_to_millis(time: NaiveTime) -> NaiveTime {
    let millis = (time.nanosecond() / NANOS_PER_MILLI).min(999);
    time.with_nanosecond(millis * NANOS_PER_MILLI).unwrap_or(time)
}

impl DateTimeValue {
    pub fn date(year: i32, month: u32, day: u32) -> Result<Self, ModelError> {
        make_date(DateFields { year, month, day }).map(|date| DateTimeValue(Repr::Date(date)))
    }

    /// A time of day. Sub-millisecond precision is discarded.
    pub fn time(time: NaiveTime, offset_minutes: i32) -> Result<Self, ModelError> {
        Ok(DateTimeValue(Repr::Time {
            time: truncate_to_millis(time),
            offset_minutes: check_offset(offset_minutes)?,
        }))
    }

    /// A full date and time. Sub-millisecond precision is discarded.
    pub fn date_time(datetime: NaiveDateTime, offset_minutes: i32) -> Result<Self, ModelError> {
        let datetime = NaiveDateTime::new(datetime.date(), truncate_to_millis(datetime.time()));
        Ok(DateTimeValue(Repr::DateTime {
            datetime,
            offset_minutes: check_offset(offset_minutes)?,
        }))
    }

    /// Reassemble a value from its components. At least one of the two must be present.
    pub fn from_fields(
        date: Option<DateFields>,
        time: Option<TimeFields>,
    ) -> Result<Self, ModelError> {
        match (date, time) {
            (Some(date), None) => Ok(DateTimeValue(Repr::Date(make_date(date)?))),
            (None, Some(time)) => {
                let (time, offset_minutes) = make_time(time)?;
                Ok(DateTimeValue(Repr::Time {
                    time,
                    offset_minutes,
                }))
            }
            (Some(date), Some(time)) => {
                let date = make_date(date)?;
                let (time, offset_minutes) = make_time(time)?;
                Ok(DateTimeValue(Repr::DateTime {
                    datetime: NaiveDateTime::new(date, time),
                    offset_minutes,
                }))
            }
            (None, None) => Err(ModelError::InvalidDateTime),
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(self.0, Repr::Date(_))
    }

    pub fn is_time(&self) -> bool {
        matches!(self.0, Repr::Time { .. })
    }

    /// The calendar date, unless this is only a time of day.
    pub fn naive_date(&self) -> Option<NaiveDate> {
        match &self.0 {
            Repr::Date(date) => Some(*date),
            Repr::DateTime { datetime, .. } => Some(datetime.date()),
            Repr::Time { .. } => None,
        }
    }

    /// The time of day, unless this is only a date.
    pub fn naive_time(&self) -> Option<NaiveTime> {
        match &self.0 {
            Repr::Date(_) => None,
            Repr::Time { time, .. } => Some(*time),
            Repr::DateTime { datetime, .. } => Some(datetime.time()),
        }
    }

    pub fn date_fields(&self) -> Option<DateFields> {
        let date = match &self.0 {
            Repr::Date(date) => *date,
            Repr::DateTime { datetime, .. } => datetime.date(),
            Repr::Time { .. } => return None,
        };
        Some(DateFields {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        })
    }

    pub fn time_fields(&self) -> Option<TimeFields> {
        let (time, offset) = match &self.0 {
            Repr::Date(_) => return None,
            Repr::Time {
                time,
                offset_minutes,
            } => (*time, *offset_minutes),
            Repr::DateTime {
                datetime,
                offset_minutes,
            } => (datetime.time(), *offset_minutes),
        };
        Some(TimeFields {
            hour: time.hour(),
            minute: time.minute(),
            second: time.second(),
            millisecond: time.nanosecond() / NANOS_PER_MILLI,
            tz_hours: offset / 60,
            tz_minutes: offset % 60,
        })
    }

    /// The timezone offset, if this value has a time component.
    pub fn offset(&self) -> Option<FixedOffset> {
        match &self.0 {
            Repr::Date(_) => None,
            Repr::Time { offset_minutes, .. }
            | Repr::DateTime { offset_minutes, .. } => {
                FixedOffset::east_opt(*offset_minutes * 60)
            }
        }
    }
}
