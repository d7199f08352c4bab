use chrono::NaiveDate;

use crate::{Error, Result};

pub(crate) const COUNTDOWN_TARGET: &str = "2020/10/10";

pub(crate) const COUNTDOWN_TEMPLATE: &str = "<span>%-w</span> week%!w <span>%-d</span> day%!d \
     <span>%H</span> hr <span>%M</span> min <span>%S</span> sec";

/// Target date in `YYYY/MM/DD` form, taken as UTC midnight.
pub(crate) fn parse_target_date(raw: &str) -> Result<i64> {
    let date = NaiveDate::parse_from_str(raw, "%Y/%m/%d")
        .map_err(|err| Error::Wiring(format!("invalid countdown target {raw:?}: {err}")))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| Error::Wiring(format!("invalid countdown target {raw:?}")))?;
    Ok(midnight.and_utc().timestamp_millis())
}

/// A remaining duration broken into the units the directive template can
/// reference. Negative durations clamp to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CountdownPeriods {
    pub(crate) weeks: i64,
    pub(crate) days: i64,
    pub(crate) hours: i64,
    pub(crate) minutes: i64,
    pub(crate) seconds: i64,
}

impl CountdownPeriods {
    pub(crate) fn from_remaining_ms(remaining_ms: i64) -> Self {
        let total = remaining_ms.max(0) / 1000;
        Self {
            weeks: total / 604_800,
            days: (total / 86_400) % 7,
            hours: (total / 3_600) % 24,
            minutes: (total / 60) % 60,
            seconds: total % 60,
        }
    }

    fn value_for(&self, directive: &str) -> i64 {
        match directive {
            "w" => self.weeks,
            "d" => self.days,
            "H" => self.hours,
            "M" => self.minutes,
            "S" => self.seconds,
            _ => 0,
        }
    }
}

/// Expands `%`-directives in a countdown template. `%H` pads to two digits,
/// a `-` flag drops the padding, and a `!` flag emits a plural `s` when the
/// unit value is not one.
#[derive(Debug)]
pub(crate) struct DirectiveRenderer {
    re: fancy_regex::Regex,
}

impl DirectiveRenderer {
    pub(crate) fn new() -> Result<Self> {
        let re = fancy_regex::Regex::new(r"%([-!]*)([wdHMS])")
            .map_err(|err| Error::Wiring(format!("countdown directive pattern: {err}")))?;
        Ok(Self { re })
    }

    pub(crate) fn render(&self, template: &str, periods: &CountdownPeriods) -> Result<String> {
        let mut out = String::with_capacity(template.len());
        let mut last = 0usize;

        for captures in self.re.captures_iter(template) {
            let captures = captures
                .map_err(|err| Error::Wiring(format!("countdown directive scan: {err}")))?;
            let Some(whole) = captures.get(0) else {
                continue;
            };
            let flags = captures.get(1).map(|m| m.as_str()).unwrap_or("");
            let directive = captures.get(2).map(|m| m.as_str()).unwrap_or("");
            let value = periods.value_for(directive);

            out.push_str(&template[last..whole.start()]);
            if flags.contains('!') {
                if value != 1 {
                    out.push('s');
                }
            } else if flags.contains('-') {
                out.push_str(&value.to_string());
            } else {
                out.push_str(&format!("{value:02}"));
            }
            last = whole.end();
        }

        out.push_str(&template[last..]);
        Ok(out)
    }
}
