use chrono::Datelike;

use crate::countdown::{COUNTDOWN_TARGET, COUNTDOWN_TEMPLATE, DirectiveRenderer, parse_target_date};
use crate::dom::NodeId;
use crate::page::{CountdownState, HeadroomState, Page, SliderState};
use crate::reactions::Reaction;
use crate::selector::Selector;
use crate::widgets::{
    AxisLabels, AxisOptions, AxisPosition, BREAKPOINTS, ChartKind, ChartOptions, ChartSeries,
    ChartSpec, CountdownSpec, DatepickerSpec, HeadroomSpec, MapSpec, OnScreenSpec, PopoverSpec,
    SliceLabels, SliderSpec, SmoothScrollSpec, TooltipSpec, WidgetInstall, js_parse_int,
    js_number_string, popover_template,
};
use crate::{Error, Result};

pub(crate) const PRELOADER_DELAY_MS: i64 = 500;
pub(crate) const FADE_SLOW_MS: i64 = 600;
pub(crate) const DROPDOWN_CLOSE_DELAY_MS: i64 = 200;
pub(crate) const COPY_RESET_DELAY_MS: i64 = 1000;
pub(crate) const SCROLL_ANIMATE_MS: i64 = 600;
pub(crate) const COUNTDOWN_TICK_MS: i64 = 1000;

type InitStep = fn(&mut Page) -> Result<()>;

/// Wiring steps in document order. Each runs once per `ready`; a failing
/// step aborts the rest.
const INITIALIZERS: &[(&str, InitStep)] = &[
    ("preloader", wire_preloader),
    ("navbar-collapse", wire_navbar_collapse),
    ("dropdown-close", wire_dropdown_close),
    ("submenu-click", wire_submenu_click),
    ("hover-dropdowns", wire_hover_dropdowns),
    ("headroom", wire_headroom),
    ("data-styles", wire_data_styles),
    ("datepicker", wire_datepicker),
    ("tooltip", wire_tooltips),
    ("popover", wire_popovers),
    ("form-focus", wire_form_focus),
    ("price-counter", wire_price_counter),
    ("input-sliders", wire_input_sliders),
    ("on-screen", wire_on_screen),
    ("anchor-scroll", wire_anchor_scroll),
    ("charts", wire_charts),
    ("vector-map", wire_vector_map),
    ("countdown", wire_countdown),
    ("smooth-scroll", wire_smooth_scroll),
    ("character-count", wire_character_count),
    ("copy-docs", wire_copy_docs),
    ("current-year", wire_current_year),
];

pub(crate) fn run(page: &mut Page) -> Result<()> {
    for (name, step) in INITIALIZERS {
        page.trace_line(format!("[init] {name}"));
        step(page)?;
    }
    Ok(())
}

fn select_all(page: &Page, selector: &str) -> Result<Vec<NodeId>> {
    Ok(page.dom.query_all(&Selector::parse(selector)?))
}

fn wire_preloader(page: &mut Page) -> Result<()> {
    for node in select_all(page, ".preloader")? {
        page.schedule_timeout_reaction(node, Reaction::PreloaderFadeStart, PRELOADER_DELAY_MS);
        page.schedule_timeout_reaction(
            node,
            Reaction::PreloaderHide,
            PRELOADER_DELAY_MS + FADE_SLOW_MS,
        );
    }
    Ok(())
}

fn wire_navbar_collapse(page: &mut Page) -> Result<()> {
    for node in select_all(page, ".navbar-main .collapse")? {
        page.register(node, "hide.bs.collapse", Reaction::CollapseHiding);
        page.register(node, "hidden.bs.collapse", Reaction::CollapseHidden);
        page.register(node, "shown.bs.collapse", Reaction::CollapseShown);
    }
    Ok(())
}

fn wire_dropdown_close(page: &mut Page) -> Result<()> {
    for node in select_all(page, ".navbar-main .dropdown")? {
        page.register(node, "hide.bs.dropdown", Reaction::DropdownClosing);
    }
    Ok(())
}

fn wire_submenu_click(page: &mut Page) -> Result<()> {
    for node in select_all(page, ".dropdown-menu a.dropdown-toggle")? {
        page.register(node, "click", Reaction::SubmenuToggle);
    }
    Ok(())
}

/// Desktop-only hover behavior. The width check happens once at wiring
/// time, like the original page samples the window width on load.
fn wire_hover_dropdowns(page: &mut Page) -> Result<()> {
    if page.viewport_width < BREAKPOINTS.lg {
        return Ok(());
    }
    for node in select_all(page, ".nav-item.dropdown")? {
        page.register(node, "mouseenter", Reaction::NavItemHoverOpen);
        page.register(node, "mouseleave", Reaction::NavItemHoverClose);
    }
    for node in select_all(page, ".dropdown-menu a.dropdown-toggle")? {
        page.register(node, "mouseenter", Reaction::SubmenuToggle);
        page.register(node, "mouseleave", Reaction::SubmenuHoverLeave);
    }
    Ok(())
}

fn wire_headroom(page: &mut Page) -> Result<()> {
    if select_all(page, ".headroom")?.is_empty() {
        return Ok(());
    }
    let navbar = page
        .dom
        .query_first(&Selector::parse("#navbar-main")?)
        .ok_or_else(|| Error::Wiring("headroom requires #navbar-main".into()))?;
    page.dom.class_add(navbar, "headroom")?;

    let spec = HeadroomSpec::for_node(navbar);
    page.headroom = Some(HeadroomState {
        node: navbar,
        offset: spec.offset,
        tolerance_up: spec.tolerance_up,
        tolerance_down: spec.tolerance_down,
        last_y: 0.0,
    });
    page.installs.push(WidgetInstall::Headroom(spec));
    Ok(())
}

fn wire_data_styles(page: &mut Page) -> Result<()> {
    for node in select_all(page, "[data-background]")? {
        if let Some(value) = page.dom.attr(node, "data-background") {
            page.dom
                .style_set(node, "background-image", &format!("url({value})"))?;
        }
    }
    for node in select_all(page, "[data-background-color]")? {
        if let Some(value) = page.dom.attr(node, "data-background-color") {
            page.dom.style_set(node, "background-color", &value)?;
        }
    }
    for node in select_all(page, "[data-color]")? {
        if let Some(value) = page.dom.attr(node, "data-color") {
            page.dom.style_set(node, "color", &value)?;
        }
    }
    Ok(())
}

fn wire_datepicker(page: &mut Page) -> Result<()> {
    for node in select_all(page, ".datepicker")? {
        page.installs
            .push(WidgetInstall::Datepicker(DatepickerSpec::for_node(node)));
    }
    Ok(())
}

fn wire_tooltips(page: &mut Page) -> Result<()> {
    for node in select_all(page, "[data-toggle=\"tooltip\"]")? {
        page.installs.push(WidgetInstall::Tooltip(TooltipSpec { node }));
    }
    Ok(())
}

fn wire_popovers(page: &mut Page) -> Result<()> {
    for node in select_all(page, "[data-toggle=\"popover\"]")? {
        let color = page.dom.attr(node, "data-color").unwrap_or_default();
        let popover_class = if color.is_empty() {
            String::new()
        } else {
            format!("popover-{color}")
        };
        page.installs.push(WidgetInstall::Popover(PopoverSpec {
            node,
            trigger: "focus".to_string(),
            template: popover_template(&popover_class),
        }));
    }
    Ok(())
}

/// Registers the focused-state sync on every form control, then fires a
/// blur on each so groups around prefilled inputs start out highlighted.
fn wire_form_focus(page: &mut Page) -> Result<()> {
    let controls = select_all(page, ".form-control")?;
    for node in &controls {
        page.register(*node, "focus", Reaction::FormGroupFocusSync);
        page.register(*node, "blur", Reaction::FormGroupFocusSync);
    }
    for node in controls {
        page.dispatch_event(node, "blur")?;
    }
    Ok(())
}

fn wire_price_counter(page: &mut Page) -> Result<()> {
    if let Some(node) = page
        .dom
        .query_first(&Selector::parse("[data-toggle=\"price\"]")?)
    {
        page.register(node, "change", Reaction::PriceToggle);
    }
    Ok(())
}

fn wire_input_sliders(page: &mut Page) -> Result<()> {
    for container in select_all(page, ".input-slider-container")? {
        let slider = page
            .dom
            .query_all_from(container, &Selector::parse(".input-slider")?)
            .into_iter()
            .next()
            .ok_or_else(|| Error::Wiring("input-slider-container without .input-slider".into()))?;
        let display = page
            .dom
            .query_all_from(container, &Selector::parse(".range-slider-value")?)
            .into_iter()
            .next()
            .ok_or_else(|| {
                Error::Wiring("input-slider-container without .range-slider-value".into())
            })?;

        let min = js_parse_int(page.dom.attr(slider, "data-range-value-min").as_deref());
        let max = js_parse_int(page.dom.attr(slider, "data-range-value-max").as_deref());
        let start = js_parse_int(page.dom.attr(display, "data-range-value-low").as_deref());

        page.sliders.insert(
            slider,
            SliderState {
                value: start,
                min,
                max,
                display,
            },
        );
        page.register(slider, "update", Reaction::SliderEcho { display });
        page.installs.push(WidgetInstall::Slider(SliderSpec {
            node: slider,
            display,
            start,
            min,
            max,
            connect: [true, false],
        }));
        page.dispatch_event(slider, "update")?;
    }
    Ok(())
}

fn wire_on_screen(page: &mut Page) -> Result<()> {
    for node in select_all(page, "[data-toggle=\"on-screen\"]")? {
        page.installs
            .push(WidgetInstall::OnScreen(OnScreenSpec::for_node(node)));
    }
    Ok(())
}

fn wire_anchor_scroll(page: &mut Page) -> Result<()> {
    for node in select_all(page, "[data-toggle=\"scroll\"]")? {
        page.register(node, "click", Reaction::AnchorScroll);
    }
    Ok(())
}

fn wire_charts(page: &mut Page) -> Result<()> {
    const CHARTS: &[(&str, fn(NodeId) -> ChartSpec)] = &[
        (".ct-chart-ranking", chart_ranking),
        (".ct-chart-traffic-source", chart_traffic_source),
        (".ct-chart-sales-value", chart_sales_value),
        (".ct-chart-volumes", chart_volumes),
        (".ct-chart-app-ranking", chart_app_ranking),
        (".ct-chart-traffic-share", chart_traffic_share),
        (".ct-chart-traffic-share-2", chart_traffic_share_2),
        (".ct-chart-10", chart_10),
        (".ct-chart-distribution", chart_distribution),
    ];
    for (selector, build) in CHARTS {
        if let Some(node) = page.dom.query_first(&Selector::parse(selector)?) {
            page.installs.push(WidgetInstall::Chart(build(node)));
        }
    }
    Ok(())
}

fn wire_vector_map(page: &mut Page) -> Result<()> {
    if let Some(node) = page.dom.query_first(&Selector::parse("#vmap")?) {
        page.installs.push(WidgetInstall::VectorMap(MapSpec::world(node)));
    }
    Ok(())
}

fn wire_countdown(page: &mut Page) -> Result<()> {
    for node in select_all(page, "#clock")? {
        let renderer = DirectiveRenderer::new()?;
        let target_ms = parse_target_date(COUNTDOWN_TARGET)?;
        page.register(node, "update.countdown", Reaction::CountdownRender);
        let timer_id =
            page.schedule_interval_reaction(node, Reaction::CountdownTick, COUNTDOWN_TICK_MS);
        page.countdowns.insert(
            node,
            CountdownState {
                target_ms,
                timer_id,
                renderer,
            },
        );
        page.installs.push(WidgetInstall::Countdown(CountdownSpec {
            node,
            target_ms,
            template: COUNTDOWN_TEMPLATE.to_string(),
        }));
        page.countdown_tick(node)?;
    }
    Ok(())
}

fn wire_smooth_scroll(page: &mut Page) -> Result<()> {
    page.installs
        .push(WidgetInstall::SmoothScroll(SmoothScrollSpec::anchors()));
    Ok(())
}

fn wire_character_count(page: &mut Page) -> Result<()> {
    for node in select_all(page, "[data-bind-characters-target]")? {
        let Some(target_selector) = page.dom.attr(node, "data-bind-characters-target") else {
            continue;
        };
        let Some(display) = page.dom.query_first(&Selector::parse(&target_selector)?) else {
            continue;
        };
        let max = js_parse_int(page.dom.attr(node, "maxlength").as_deref());
        page.dom.set_text_content(display, &js_number_string(max))?;
        page.register(node, "keyup", Reaction::CharactersSync { display, max });
        page.register(node, "change", Reaction::CharactersSync { display, max });
    }
    Ok(())
}

fn wire_copy_docs(page: &mut Page) -> Result<()> {
    for node in select_all(page, ".copy-docs")? {
        page.register(node, "click", Reaction::CopyDocs);
    }
    Ok(())
}

fn wire_current_year(page: &mut Page) -> Result<()> {
    let wall_ms = page.wall_time_ms();
    let stamp = chrono::DateTime::from_timestamp_millis(wall_ms)
        .ok_or_else(|| Error::Wiring(format!("wall clock out of range: {wall_ms}")))?;
    let year = stamp.year().to_string();
    for node in select_all(page, ".current-year")? {
        page.dom.set_text_content(node, &year)?;
    }
    Ok(())
}

fn label_strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn week_labels() -> Vec<String> {
    label_strings(&["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"])
}

fn chart_ranking(node: NodeId) -> ChartSpec {
    ChartSpec {
        node,
        selector: ".ct-chart-ranking".to_string(),
        kind: ChartKind::Bar,
        labels: week_labels(),
        series: ChartSeries::Grid(vec![
            vec![5.0, 4.0, 3.0, 7.0, 5.0, 10.0, 3.0],
            vec![3.0, 2.0, 9.0, 5.0, 4.0, 6.0, 4.0],
        ]),
        options: ChartOptions {
            low: Some(0.0),
            show_area: Some(true),
            axis_x: Some(AxisOptions {
                position: Some(AxisPosition::End),
                ..AxisOptions::default()
            }),
            axis_y: Some(AxisOptions {
                show_grid: Some(false),
                show_label: Some(false),
                offset: Some(0),
                ..AxisOptions::default()
            }),
            tooltip_plugin: true,
            ..ChartOptions::default()
        },
    }
}

fn chart_traffic_source(node: NodeId) -> ChartSpec {
    ChartSpec {
        node,
        selector: ".ct-chart-traffic-source".to_string(),
        kind: ChartKind::Pie,
        labels: Vec::new(),
        series: ChartSeries::Slices(vec![80.0, 20.0, 10.0]),
        options: ChartOptions {
            low: Some(0.0),
            high: Some(8.0),
            full_width: Some(false),
            show_label: Some(false),
            slice_labels: Some(SliceLabels::Percent),
            tooltip_plugin: true,
            ..ChartOptions::default()
        },
    }
}

fn chart_sales_value(node: NodeId) -> ChartSpec {
    ChartSpec {
        node,
        selector: ".ct-chart-sales-value".to_string(),
        kind: ChartKind::Line,
        labels: week_labels(),
        series: ChartSeries::Grid(vec![vec![0.0, 10.0, 30.0, 50.0, 80.0, 50.0, 30.0]]),
        options: ChartOptions {
            low: Some(0.0),
            show_area: Some(true),
            full_width: Some(true),
            axis_x: Some(AxisOptions {
                position: Some(AxisPosition::End),
                show_grid: Some(false),
                ..AxisOptions::default()
            }),
            axis_y: Some(AxisOptions {
                show_grid: Some(true),
                show_label: Some(true),
                labels: Some(AxisLabels::DollarsThousands),
                ..AxisOptions::default()
            }),
            tooltip_plugin: true,
            ..ChartOptions::default()
        },
    }
}

fn chart_volumes(node: NodeId) -> ChartSpec {
    ChartSpec {
        node,
        selector: ".ct-chart-volumes".to_string(),
        kind: ChartKind::Line,
        labels: label_strings(&[
            "Mar 16", "Apr 16", "May 16", "Jun 16", "Jul 16", "Aug 16", "Sept 16",
        ]),
        series: ChartSeries::Grid(vec![
            vec![2.0, 5.0, 2.0, 3.0, 4.0, 6.0, 8.0],
            vec![5.0, 6.0, 5.0, 8.0, 12.0, 32.0, 28.0],
            vec![7.0, 12.0, 7.0, 3.0, 2.0, 7.0, 14.0],
            vec![10.0, 15.0, 13.0, 17.0, 14.0, 18.0, 20.0],
            vec![16.0, 18.0, 18.0, 20.0, 20.0, 20.0, 23.0],
        ]),
        options: ChartOptions {
            low: Some(0.0),
            show_area: Some(false),
            full_width: Some(true),
            axis_x: Some(AxisOptions {
                position: Some(AxisPosition::End),
                show_grid: Some(false),
                ..AxisOptions::default()
            }),
            axis_y: Some(AxisOptions {
                show_grid: Some(true),
                show_label: Some(true),
                labels: Some(AxisLabels::Millions),
                ..AxisOptions::default()
            }),
            tooltip_plugin: true,
            ..ChartOptions::default()
        },
    }
}

fn chart_app_ranking(node: NodeId) -> ChartSpec {
    ChartSpec {
        node,
        selector: ".ct-chart-app-ranking".to_string(),
        kind: ChartKind::Bar,
        labels: label_strings(&[
            "21 Apr", "21 Ap", "22 Ap", "23 Ap", "24 Ap", "25 Ap", "26 Ap",
        ]),
        series: ChartSeries::Grid(vec![
            vec![5.0, 4.0, 3.0, 7.0, 5.0, 10.0, 3.0],
            vec![2.0, 2.0, 1.0, 5.0, 3.0, 4.0, 2.0],
            vec![3.0, 2.0, 9.0, 5.0, 4.0, 6.0, 4.0],
        ]),
        options: ChartOptions {
            low: Some(0.0),
            show_area: Some(true),
            axis_x: Some(AxisOptions {
                position: Some(AxisPosition::End),
                ..AxisOptions::default()
            }),
            axis_y: Some(AxisOptions {
                show_grid: Some(false),
                show_label: Some(false),
                offset: Some(0),
                ..AxisOptions::default()
            }),
            tooltip_plugin: true,
            ..ChartOptions::default()
        },
    }
}

fn chart_traffic_share(node: NodeId) -> ChartSpec {
    ChartSpec {
        node,
        selector: ".ct-chart-traffic-share".to_string(),
        kind: ChartKind::Pie,
        labels: Vec::new(),
        series: ChartSeries::Slices(vec![30.0, 70.0]),
        options: ChartOptions {
            low: Some(0.0),
            high: Some(8.0),
            full_width: Some(true),
            show_label: Some(false),
            donut: Some(true),
            donut_width: Some(20),
            donut_solid: Some(true),
            start_angle: Some(50),
            slice_labels: Some(SliceLabels::Percent),
            tooltip_plugin: true,
            ..ChartOptions::default()
        },
    }
}

fn chart_traffic_share_2(node: NodeId) -> ChartSpec {
    ChartSpec {
        node,
        selector: ".ct-chart-traffic-share-2".to_string(),
        kind: ChartKind::Pie,
        labels: Vec::new(),
        series: ChartSeries::Slices(vec![51.5, 29.4, 9.10, 6.5, 3.5]),
        options: ChartOptions {
            low: Some(0.0),
            high: Some(8.0),
            full_width: Some(false),
            show_label: Some(false),
            donut: Some(true),
            donut_width: Some(40),
            slice_labels: Some(SliceLabels::Percent),
            tooltip_plugin: true,
            ..ChartOptions::default()
        },
    }
}

fn chart_10(node: NodeId) -> ChartSpec {
    ChartSpec {
        node,
        selector: ".ct-chart-10".to_string(),
        kind: ChartKind::Pie,
        labels: Vec::new(),
        series: ChartSeries::Slices(vec![20.0, 10.0, 30.0, 40.0]),
        options: ChartOptions {
            show_label: Some(true),
            donut: Some(true),
            donut_width: Some(60),
            donut_solid: Some(true),
            start_angle: Some(270),
            total: Some(200.0),
            tooltip_plugin: true,
            ..ChartOptions::default()
        },
    }
}

fn chart_distribution(node: NodeId) -> ChartSpec {
    ChartSpec {
        node,
        selector: ".ct-chart-distribution".to_string(),
        kind: ChartKind::Pie,
        labels: Vec::new(),
        series: ChartSeries::Slices(vec![30.0, 50.0, 20.0]),
        options: ChartOptions {
            low: Some(0.0),
            high: Some(8.0),
            full_width: Some(true),
            show_label: Some(true),
            donut: Some(true),
            donut_width: Some(70),
            donut_solid: Some(true),
            start_angle: Some(50),
            slice_labels: Some(SliceLabels::Percent),
            tooltip_plugin: true,
            ..ChartOptions::default()
        },
    }
}
