use std::error::Error as StdError;
use std::fmt;

mod bootstrap;
mod countdown;
mod dom;
mod html;
mod page;
mod reactions;
mod selector;
mod widgets;

#[cfg(test)]
mod tests;

pub use dom::NodeId;
pub use page::{Page, PendingTimer};
pub use widgets::{
    AxisLabels, AxisOptions, AxisPosition, BREAKPOINTS, Breakpoints, ChartKind, ChartOptions,
    ChartSeries, ChartSpec, CounterFormat, CounterRun, CountdownSpec, DatepickerSpec, HeadroomSpec,
    MapSpec, OnScreenSpec, PopoverSpec, ScrollRequest, SliceLabels, SliderSpec, SmoothScrollSpec,
    TooltipSpec, WidgetInstall,
};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    HtmlParse(String),
    UnsupportedSelector(String),
    SelectorNotFound(String),
    TypeMismatch {
        selector: String,
        expected: String,
        actual: String,
    },
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
    Wiring(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HtmlParse(msg) => write!(f, "html parse error: {msg}"),
            Self::UnsupportedSelector(selector) => write!(f, "unsupported selector: {selector}"),
            Self::SelectorNotFound(selector) => write!(f, "selector not found: {selector}"),
            Self::TypeMismatch {
                selector,
                expected,
                actual,
            } => write!(
                f,
                "type mismatch for {selector}: expected {expected}, actual {actual}"
            ),
            Self::AssertionFailed {
                selector,
                expected,
                actual,
                dom_snippet,
            } => write!(
                f,
                "assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}"
            ),
            Self::Wiring(msg) => write!(f, "wiring error: {msg}"),
        }
    }
}

impl StdError for Error {}

pub(crate) fn truncate_chars(value: &str, max_chars: usize) -> String {
    let mut it = value.chars();
    let mut out = String::new();
    for _ in 0..max_chars {
        let Some(ch) = it.next() else {
            return out;
        };
        out.push(ch);
    }
    if it.next().is_some() {
        out.push_str("...");
    }
    out
}
