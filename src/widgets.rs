use serde::Deserialize;

use crate::dom::NodeId;

/// Responsive breakpoints shared by the page wiring, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Breakpoints {
    pub sm: i64,
    pub md: i64,
    pub lg: i64,
    pub xl: i64,
}

pub const BREAKPOINTS: Breakpoints = Breakpoints {
    sm: 540,
    md: 720,
    lg: 960,
    xl: 1140,
};

/// Pin/unpin configuration attached to the main navbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadroomSpec {
    pub node: NodeId,
    pub offset: i64,
    pub tolerance_up: i64,
    pub tolerance_down: i64,
}

impl HeadroomSpec {
    pub(crate) fn for_node(node: NodeId) -> Self {
        Self {
            node,
            offset: 0,
            tolerance_up: 1,
            tolerance_down: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatepickerSpec {
    pub node: NodeId,
    pub disable_touch_keyboard: bool,
    pub autoclose: bool,
}

impl DatepickerSpec {
    pub(crate) fn for_node(node: NodeId) -> Self {
        Self {
            node,
            disable_touch_keyboard: true,
            autoclose: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TooltipSpec {
    pub node: NodeId,
}

/// Focus-triggered popover with a color-variant template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopoverSpec {
    pub node: NodeId,
    pub trigger: String,
    pub template: String,
}

pub(crate) fn popover_template(popover_class: &str) -> String {
    format!(
        "<div class=\"popover {popover_class}\" role=\"tooltip\"><div class=\"arrow\"></div><h3 class=\"popover-header\"></h3><div class=\"popover-body\"></div></div>"
    )
}

/// Range slider wired to a text display element.
#[derive(Debug, Clone, PartialEq)]
pub struct SliderSpec {
    pub node: NodeId,
    pub display: NodeId,
    pub start: f64,
    pub min: f64,
    pub max: f64,
    pub connect: [bool; 2],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnScreenSpec {
    pub node: NodeId,
    pub container: String,
    pub direction: String,
    pub tolerance: i64,
    pub throttle_ms: i64,
    pub toggle_class: String,
}

impl OnScreenSpec {
    pub(crate) fn for_node(node: NodeId) -> Self {
        Self {
            node,
            container: "window".to_string(),
            direction: "vertical".to_string(),
            tolerance: 200,
            throttle_ms: 50,
            toggle_class: "on-screen".to_string(),
        }
    }
}

/// World map widget configuration, including the session-count label hook.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSpec {
    pub node: NodeId,
    pub map: String,
    pub background_color: String,
    pub border_color: String,
    pub border_opacity: f64,
    pub border_width: i64,
    pub color: String,
    pub enable_zoom: bool,
    pub hover_color: String,
    pub hover_opacity: Option<f64>,
    pub normalize: String,
    pub scale_colors: Vec<String>,
    pub selected_color: String,
    pub selected_regions: Option<Vec<String>>,
    pub show_tooltip: bool,
}

impl MapSpec {
    pub(crate) fn world(node: NodeId) -> Self {
        Self {
            node,
            map: "world_en".to_string(),
            background_color: "#ffffff".to_string(),
            border_color: "#ffffff".to_string(),
            border_opacity: 0.0,
            border_width: 2,
            color: "#e9ecef".to_string(),
            enable_zoom: true,
            hover_color: "#0E1B48".to_string(),
            hover_opacity: None,
            normalize: "linear".to_string(),
            scale_colors: vec!["#b6d6ff".to_string(), "#005ace".to_string()],
            selected_color: "#0E1B48".to_string(),
            selected_regions: None,
            show_tooltip: true,
        }
    }
}

/// Ticking clock counting down to a target instant, rendered from a
/// directive template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountdownSpec {
    pub node: NodeId,
    pub target_ms: i64,
    pub template: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmoothScrollSpec {
    pub selector: String,
    pub speed_ms: i64,
    pub speed_as_duration: bool,
}

impl SmoothScrollSpec {
    pub(crate) fn anchors() -> Self {
        Self {
            selector: "a[href*=\"#\"]".to_string(),
            speed_ms: 500,
            speed_as_duration: true,
        }
    }
}

/// One animated scroll triggered by an anchor click.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollRequest {
    pub trigger: NodeId,
    pub target: NodeId,
    pub offset: f64,
    pub duration_ms: i64,
}

/// Number formatting options accepted as JSON in `data-options`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CounterFormat {
    pub use_easing: bool,
    pub use_grouping: bool,
    pub separator: String,
    pub decimal: String,
    pub prefix: String,
    pub suffix: String,
}

impl Default for CounterFormat {
    fn default() -> Self {
        Self {
            use_easing: true,
            use_grouping: true,
            separator: ",".to_string(),
            decimal: ".".to_string(),
            prefix: String::new(),
            suffix: String::new(),
        }
    }
}

/// One price counter animation from its current value to a target.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterRun {
    pub node: NodeId,
    pub from: f64,
    pub to: f64,
    pub decimals: usize,
    pub duration_ms: i64,
    pub format: CounterFormat,
}

impl CounterRun {
    pub fn start_text(&self) -> String {
        format_counter_value(self.from, self.decimals, &self.format)
    }

    pub fn final_text(&self) -> String {
        format_counter_value(self.to, self.decimals, &self.format)
    }
}

/// Renders a value the way the counter widget prints each frame: fixed
/// decimals, optional thousands grouping, prefix and suffix around the
/// signed number.
pub(crate) fn format_counter_value(value: f64, decimals: usize, format: &CounterFormat) -> String {
    if value.is_nan() {
        return format!("{}NaN{}", format.prefix, format.suffix);
    }

    let fixed = format!("{value:.decimals$}");
    let (sign, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let mut pieces = unsigned.splitn(2, '.');
    let int_part = pieces.next().unwrap_or("");
    let int_part = if format.use_grouping {
        group_thousands(int_part, &format.separator)
    } else {
        int_part.to_string()
    };
    let frac_part = match pieces.next() {
        Some(frac) => format!("{}{}", format.decimal, frac),
        None => String::new(),
    };

    format!(
        "{}{}{}{}{}",
        format.prefix, sign, int_part, frac_part, format.suffix
    )
}

fn group_thousands(digits: &str, separator: &str) -> String {
    let count = digits.chars().count();
    let mut out = String::with_capacity(digits.len() + separator.len() * (count / 3));
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (count - idx) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(ch);
    }
    out
}

/// `parseInt` semantics for data attributes: leading integer prefix, else
/// NaN.
pub(crate) fn js_parse_int(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else {
        return f64::NAN;
    };
    let trimmed = raw.trim_start();
    let (sign, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return f64::NAN;
    }
    match digits.parse::<f64>() {
        Ok(value) => sign * value,
        Err(_) => f64::NAN,
    }
}

/// `Number` coercion: a missing attribute is NaN, an empty one is zero.
pub(crate) fn js_number(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else {
        return f64::NAN;
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// Stringification matching script number-to-text coercion: integral values
/// print without a decimal point.
pub(crate) fn js_number_string(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        format!("{value}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartSeries {
    /// One row of points per series, for bar and line charts.
    Grid(Vec<Vec<f64>>),
    /// Flat slice values for pie charts.
    Slices(Vec<f64>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisPosition {
    Start,
    End,
}

/// Axis label interpolation applied before rendering tick text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisLabels {
    DollarsThousands,
    Millions,
}

impl AxisLabels {
    pub fn format(&self, value: f64) -> String {
        match self {
            AxisLabels::DollarsThousands => format!("${}k", js_number_string(value)),
            AxisLabels::Millions => format!("{}M", js_number_string(value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceLabels {
    Percent,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AxisOptions {
    pub position: Option<AxisPosition>,
    pub show_grid: Option<bool>,
    pub show_label: Option<bool>,
    pub offset: Option<i64>,
    pub labels: Option<AxisLabels>,
}

/// Chart configuration as passed to the renderer. Only the options a chart
/// sets are present; everything else stays at renderer defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartOptions {
    pub low: Option<f64>,
    pub high: Option<f64>,
    pub show_area: Option<bool>,
    pub full_width: Option<bool>,
    pub show_label: Option<bool>,
    pub donut: Option<bool>,
    pub donut_width: Option<i64>,
    pub donut_solid: Option<bool>,
    pub start_angle: Option<i64>,
    pub total: Option<f64>,
    pub axis_x: Option<AxisOptions>,
    pub axis_y: Option<AxisOptions>,
    pub slice_labels: Option<SliceLabels>,
    pub tooltip_plugin: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub node: NodeId,
    pub selector: String,
    pub kind: ChartKind,
    pub labels: Vec<String>,
    pub series: ChartSeries,
    pub options: ChartOptions,
}

impl ChartSpec {
    /// Slice label text for one value, or None when the chart has no label
    /// interpolation configured.
    pub fn slice_label(&self, value: f64) -> Option<String> {
        match self.options.slice_labels? {
            SliceLabels::Percent => {
                let ChartSeries::Slices(slices) = &self.series else {
                    return None;
                };
                let sum: f64 = slices.iter().sum();
                Some(format!("{}%", (value / sum * 100.0).round()))
            }
        }
    }
}

/// Everything the page wiring installed during `ready`, in install order.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetInstall {
    Headroom(HeadroomSpec),
    Datepicker(DatepickerSpec),
    Tooltip(TooltipSpec),
    Popover(PopoverSpec),
    Slider(SliderSpec),
    OnScreen(OnScreenSpec),
    Chart(ChartSpec),
    VectorMap(MapSpec),
    Countdown(CountdownSpec),
    SmoothScroll(SmoothScrollSpec),
}
