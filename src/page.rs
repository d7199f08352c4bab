use std::collections::HashMap;

use crate::bootstrap;
use crate::countdown::DirectiveRenderer;
use crate::dom::{Dom, NodeId};
use crate::html;
use crate::reactions::{EventState, Listener, ListenerStore, Reaction};
use crate::selector::Selector;
use crate::widgets::{ChartSpec, CounterRun, ScrollRequest, SliderSpec, WidgetInstall};
use crate::{Error, Result, truncate_chars};

/// Events delivered to the target only, never to its ancestors.
const NON_BUBBLING_EVENTS: &[&str] = &["mouseenter", "mouseleave", "focus", "blur"];

#[derive(Debug, Clone)]
struct ScheduledTask {
    id: i64,
    due_at: i64,
    order: i64,
    interval_ms: Option<i64>,
    target: NodeId,
    reaction: Reaction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTimer {
    pub id: i64,
    pub due_at: i64,
    pub order: i64,
    pub interval_ms: Option<i64>,
}

#[derive(Debug, Clone)]
pub(crate) struct SliderState {
    pub(crate) value: f64,
    pub(crate) min: f64,
    pub(crate) max: f64,
    pub(crate) display: NodeId,
}

#[derive(Debug)]
pub(crate) struct CountdownState {
    pub(crate) target_ms: i64,
    pub(crate) timer_id: i64,
    pub(crate) renderer: DirectiveRenderer,
}

#[derive(Debug, Clone)]
pub(crate) struct HeadroomState {
    pub(crate) node: NodeId,
    pub(crate) offset: i64,
    pub(crate) tolerance_up: i64,
    pub(crate) tolerance_down: i64,
    pub(crate) last_y: f64,
}

/// A loaded page plus the deterministic runtime around it: virtual clock,
/// timer queue, event dispatch, and the state the wiring installed.
#[derive(Debug)]
pub struct Page {
    pub(crate) dom: Dom,
    pub(crate) listeners: ListenerStore,
    task_queue: Vec<ScheduledTask>,
    now_ms: i64,
    wall_base_ms: i64,
    timer_step_limit: usize,
    next_timer_id: i64,
    next_task_order: i64,
    running_timer_id: Option<i64>,
    running_timer_canceled: bool,
    rng_state: u64,
    pub(crate) viewport_width: i64,
    scroll_y: f64,
    wired: bool,
    active_element: Option<NodeId>,
    hovered_element: Option<NodeId>,
    pub(crate) clipboard: Option<String>,
    pub(crate) installs: Vec<WidgetInstall>,
    pub(crate) counter_runs: Vec<CounterRun>,
    pub(crate) scroll_requests: Vec<ScrollRequest>,
    pub(crate) sliders: HashMap<NodeId, SliderState>,
    pub(crate) countdowns: HashMap<NodeId, CountdownState>,
    pub(crate) headroom: Option<HeadroomState>,
    trace: bool,
    trace_events: bool,
    trace_timers: bool,
    trace_logs: Vec<String>,
    trace_log_limit: usize,
    trace_to_stderr: bool,
}

impl Page {
    /// Parses markup without running the page wiring. Call [`Page::ready`]
    /// to wire it, or use [`Page::open`] for both at once.
    pub fn from_html(html_source: &str) -> Result<Self> {
        let dom = html::parse_html(html_source)?;
        Ok(Self {
            dom,
            listeners: ListenerStore::default(),
            task_queue: Vec::new(),
            now_ms: 0,
            wall_base_ms: 0,
            timer_step_limit: 10_000,
            next_timer_id: 1,
            next_task_order: 0,
            running_timer_id: None,
            running_timer_canceled: false,
            rng_state: 0x9E37_79B9_7F4A_7C15,
            viewport_width: 1280,
            scroll_y: 0.0,
            wired: false,
            active_element: None,
            hovered_element: None,
            clipboard: None,
            installs: Vec::new(),
            counter_runs: Vec::new(),
            scroll_requests: Vec::new(),
            sliders: HashMap::new(),
            countdowns: HashMap::new(),
            headroom: None,
            trace: false,
            trace_events: true,
            trace_timers: true,
            trace_logs: Vec::new(),
            trace_log_limit: 10_000,
            trace_to_stderr: true,
        })
    }

    pub fn open(html_source: &str) -> Result<Self> {
        let mut page = Self::from_html(html_source)?;
        page.ready()?;
        Ok(page)
    }

    /// Runs the page wiring once. A second call is a no-op, including after
    /// a wiring error: a failed step does not retry.
    pub fn ready(&mut self) -> Result<()> {
        if self.wired {
            return Ok(());
        }
        self.wired = true;
        bootstrap::run(self)
    }

    /// Viewport width sampled by the wiring when `ready` runs. Changing it
    /// afterwards does not rewire hover behavior.
    pub fn set_viewport_width(&mut self, width: i64) {
        self.viewport_width = width;
    }

    pub fn set_wall_time_ms(&mut self, wall_ms: i64) {
        self.wall_base_ms = wall_ms - self.now_ms;
    }

    pub fn set_wall_date(&mut self, year: i32, month: u32, day: u32) -> Result<()> {
        let date = chrono::NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            Error::Wiring(format!("invalid wall date {year:04}-{month:02}-{day:02}"))
        })?;
        let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(|| {
            Error::Wiring(format!("invalid wall date {year:04}-{month:02}-{day:02}"))
        })?;
        self.set_wall_time_ms(midnight.and_utc().timestamp_millis());
        Ok(())
    }

    pub fn now_ms(&self) -> i64 {
        self.now_ms
    }

    /// Wall-clock time in Unix milliseconds. Advancing the virtual clock
    /// advances the wall clock with it.
    pub fn wall_time_ms(&self) -> i64 {
        self.wall_base_ms + self.now_ms
    }

    pub fn set_random_seed(&mut self, seed: u64) {
        self.rng_state = if seed == 0 {
            0xA5A5_A5A5_A5A5_A5A5
        } else {
            seed
        };
    }

    pub fn set_timer_step_limit(&mut self, max_steps: usize) -> Result<()> {
        if max_steps == 0 {
            return Err(Error::Wiring(
                "set_timer_step_limit requires at least 1 step".into(),
            ));
        }
        self.timer_step_limit = max_steps;
        Ok(())
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace = enabled;
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        std::mem::take(&mut self.trace_logs)
    }

    pub fn set_trace_stderr(&mut self, enabled: bool) {
        self.trace_to_stderr = enabled;
    }

    pub fn set_trace_events(&mut self, enabled: bool) {
        self.trace_events = enabled;
    }

    pub fn set_trace_timers(&mut self, enabled: bool) {
        self.trace_timers = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::Wiring(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        self.trace_log_limit = max_entries;
        while self.trace_logs.len() > self.trace_log_limit {
            self.trace_logs.remove(0);
        }
        Ok(())
    }

    pub fn click(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.dom.disabled(target) {
            return Ok(());
        }

        let click_outcome = self.dispatch_event(target, "click")?;
        if click_outcome.default_prevented {
            return Ok(());
        }

        if self.is_checkbox(target) {
            let current = self.dom.checked(target)?;
            self.dom.set_checked(target, !current)?;
            self.dispatch_event(target, "input")?;
            self.dispatch_event(target, "change")?;
        }

        Ok(())
    }

    pub fn type_text(&mut self, selector: &str, text: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.dom.disabled(target) {
            return Ok(());
        }
        if self.dom.readonly(target) {
            return Ok(());
        }

        let tag = self
            .dom
            .tag_name(target)
            .ok_or_else(|| Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input or textarea".into(),
                actual: "non-element".into(),
            })?
            .to_ascii_lowercase();

        if tag != "input" && tag != "textarea" {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input or textarea".into(),
                actual: tag,
            });
        }

        self.dom.set_value(target, text)?;
        self.dispatch_event(target, "input")?;
        self.dispatch_event(target, "keyup")?;
        self.dispatch_event(target, "change")?;
        Ok(())
    }

    pub fn set_checked(&mut self, selector: &str, checked: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.dom.disabled(target) {
            return Ok(());
        }
        let tag = self
            .dom
            .tag_name(target)
            .unwrap_or_default()
            .to_ascii_lowercase();
        if tag != "input" {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input[type=checkbox]".into(),
                actual: tag,
            });
        }

        let kind = self
            .dom
            .attr(target, "type")
            .unwrap_or_else(|| "text".into())
            .to_ascii_lowercase();
        if kind != "checkbox" {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input[type=checkbox]".into(),
                actual: format!("input[type={kind}]"),
            });
        }

        let current = self.dom.checked(target)?;
        if current != checked {
            self.dom.set_checked(target, checked)?;
            self.dispatch_event(target, "input")?;
            self.dispatch_event(target, "change")?;
        }

        Ok(())
    }

    pub fn focus(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.focus_node(target)
    }

    pub fn blur(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.blur_node(target)
    }

    pub fn hover(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.move_pointer(Some(target))
    }

    pub fn unhover(&mut self) -> Result<()> {
        self.move_pointer(None)
    }

    pub fn dispatch(&mut self, selector: &str, event: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.dispatch_event(target, event)?;
        Ok(())
    }

    pub fn scroll_to(&mut self, y: f64) -> Result<()> {
        self.apply_scroll(y)
    }

    /// Moves a slider handle. The value clamps to the configured range and
    /// the slider fires its `update` event.
    pub fn slide(&mut self, selector: &str, value: f64) -> Result<()> {
        let target = self.select_one(selector)?;
        let Some(state) = self.sliders.get_mut(&target) else {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "range slider input".into(),
                actual: self
                    .dom
                    .tag_name(target)
                    .unwrap_or("non-element")
                    .to_string(),
            });
        };

        let mut next = value;
        if !next.is_nan() {
            if next < state.min {
                next = state.min;
            }
            if next > state.max {
                next = state.max;
            }
        }
        state.value = next;
        self.dispatch_event(target, "update")?;
        Ok(())
    }

    /// Hover label for a map region, with the session count drawn from the
    /// deterministic RNG.
    pub fn map_label(&mut self, region: &str) -> Result<String> {
        let installed = self
            .installs
            .iter()
            .any(|install| matches!(install, WidgetInstall::VectorMap(_)));
        if !installed {
            return Err(Error::Wiring("vector map not installed".into()));
        }
        let sessions = (self.next_random_f64() * 10_000.0).floor() as i64 + 1;
        Ok(format!("{region}: {sessions} session"))
    }

    pub fn clipboard_text(&self) -> Option<&str> {
        self.clipboard.as_deref()
    }

    pub fn scroll_y(&self) -> f64 {
        self.scroll_y
    }

    pub fn query(&self, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.dom.query_first(&Selector::parse(selector)?))
    }

    pub fn query_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        Ok(self.dom.query_all(&Selector::parse(selector)?))
    }

    pub fn text(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.text_content(target))
    }

    pub fn attr(&self, selector: &str, name: &str) -> Result<Option<String>> {
        let target = self.select_one(selector)?;
        Ok(self.dom.attr(target, name))
    }

    pub fn has_class(&self, selector: &str, class_name: &str) -> Result<bool> {
        let target = self.select_one(selector)?;
        self.dom.class_contains(target, class_name)
    }

    pub fn style(&self, selector: &str, property: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        self.dom.style_get(target, property)
    }

    pub fn value(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        self.dom.value(target)
    }

    pub fn checked(&self, selector: &str) -> Result<bool> {
        let target = self.select_one(selector)?;
        self.dom.checked(target)
    }

    pub fn assert_text(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.text_content(target);
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_value(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.value(target)?;
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_checked(&self, selector: &str, expected: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.checked(target)?;
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        let _ = self.select_one(selector)?;
        Ok(())
    }

    pub fn dump_dom(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.dump_node(target))
    }

    pub fn installs(&self) -> &[WidgetInstall] {
        &self.installs
    }

    pub fn charts(&self) -> Vec<&ChartSpec> {
        self.installs
            .iter()
            .filter_map(|install| match install {
                WidgetInstall::Chart(spec) => Some(spec),
                _ => None,
            })
            .collect()
    }

    pub fn chart(&self, selector: &str) -> Option<&ChartSpec> {
        self.charts()
            .into_iter()
            .find(|spec| spec.selector == selector)
    }

    pub fn sliders(&self) -> Vec<&SliderSpec> {
        self.installs
            .iter()
            .filter_map(|install| match install {
                WidgetInstall::Slider(spec) => Some(spec),
                _ => None,
            })
            .collect()
    }

    pub fn counter_runs(&self) -> &[CounterRun] {
        &self.counter_runs
    }

    pub fn scroll_requests(&self) -> &[ScrollRequest] {
        &self.scroll_requests
    }

    pub fn clear_timer(&mut self, timer_id: i64) -> bool {
        let existed = self.running_timer_id == Some(timer_id)
            || self.task_queue.iter().any(|task| task.id == timer_id);
        self.clear_timeout(timer_id);
        existed
    }

    pub fn clear_all_timers(&mut self) -> usize {
        let cleared = self.task_queue.len();
        self.task_queue.clear();
        if self.running_timer_id.is_some() {
            self.running_timer_canceled = true;
        }
        self.trace_timer_line(format!("[timer] clear_all cleared={cleared}"));
        cleared
    }

    pub fn pending_timers(&self) -> Vec<PendingTimer> {
        let mut timers = self
            .task_queue
            .iter()
            .map(|task| PendingTimer {
                id: task.id,
                due_at: task.due_at,
                order: task.order,
                interval_ms: task.interval_ms,
            })
            .collect::<Vec<_>>();
        timers.sort_by_key(|timer| (timer.due_at, timer.order));
        timers
    }

    pub fn advance_time(&mut self, delta_ms: i64) -> Result<()> {
        if delta_ms < 0 {
            return Err(Error::Wiring(
                "advance_time requires non-negative milliseconds".into(),
            ));
        }
        let from = self.now_ms;
        self.now_ms = self.now_ms.saturating_add(delta_ms);
        let ran = self.run_due_timers_internal()?;
        self.trace_timer_line(format!(
            "[timer] advance delta_ms={} from={} to={} ran_due={}",
            delta_ms, from, self.now_ms, ran
        ));
        Ok(())
    }

    pub fn advance_time_to(&mut self, target_ms: i64) -> Result<()> {
        if target_ms < self.now_ms {
            return Err(Error::Wiring(format!(
                "advance_time_to requires target >= now_ms (target={target_ms}, now_ms={})",
                self.now_ms
            )));
        }
        let from = self.now_ms;
        self.now_ms = target_ms;
        let ran = self.run_due_timers_internal()?;
        self.trace_timer_line(format!(
            "[timer] advance_to from={} to={} ran_due={}",
            from, self.now_ms, ran
        ));
        Ok(())
    }

    /// Runs every queued task, advancing the clock task by task. Errors out
    /// once the step limit is hit, which is how a runaway interval shows up.
    pub fn flush(&mut self) -> Result<()> {
        let from = self.now_ms;
        let ran = self.run_timer_queue(None, true)?;
        self.trace_timer_line(format!(
            "[timer] flush from={} to={} ran={}",
            from, self.now_ms, ran
        ));
        Ok(())
    }

    /// Runs the earliest queued task, jumping the clock to its due time.
    pub fn run_next_timer(&mut self) -> Result<bool> {
        let Some(next_idx) = self.next_task_index(None) else {
            self.trace_timer_line("[timer] run_next none".into());
            return Ok(false);
        };

        let task = self.task_queue.remove(next_idx);
        if task.due_at > self.now_ms {
            self.now_ms = task.due_at;
        }
        self.execute_timer_task(task)?;
        Ok(true)
    }

    /// Runs the earliest task already due, without touching the clock.
    pub fn run_next_due_timer(&mut self) -> Result<bool> {
        let Some(next_idx) = self.next_task_index(Some(self.now_ms)) else {
            self.trace_timer_line("[timer] run_next_due none".into());
            return Ok(false);
        };

        let task = self.task_queue.remove(next_idx);
        self.execute_timer_task(task)?;
        Ok(true)
    }

    pub fn run_due_timers(&mut self) -> Result<usize> {
        let ran = self.run_due_timers_internal()?;
        self.trace_timer_line(format!(
            "[timer] run_due now_ms={} ran={}",
            self.now_ms, ran
        ));
        Ok(ran)
    }

    fn run_due_timers_internal(&mut self) -> Result<usize> {
        self.run_timer_queue(Some(self.now_ms), false)
    }

    fn run_timer_queue(&mut self, due_limit: Option<i64>, advance_clock: bool) -> Result<usize> {
        let mut steps = 0usize;
        while let Some(next_idx) = self.next_task_index(due_limit) {
            steps += 1;
            if steps > self.timer_step_limit {
                return Err(self.timer_step_limit_error(self.timer_step_limit, steps, due_limit));
            }
            let task = self.task_queue.remove(next_idx);
            if advance_clock && task.due_at > self.now_ms {
                self.now_ms = task.due_at;
            }
            self.execute_timer_task(task)?;
        }
        Ok(steps)
    }

    fn timer_step_limit_error(
        &self,
        max_steps: usize,
        steps: usize,
        due_limit: Option<i64>,
    ) -> Error {
        let due_limit_desc = due_limit
            .map(|value| value.to_string())
            .unwrap_or_else(|| "none".into());

        let next_task_desc = self
            .next_task_index(due_limit)
            .and_then(|idx| self.task_queue.get(idx))
            .map(|task| {
                let interval_desc = task
                    .interval_ms
                    .map(|value| value.to_string())
                    .unwrap_or_else(|| "none".into());
                format!(
                    "id={},due_at={},order={},interval_ms={}",
                    task.id, task.due_at, task.order, interval_desc
                )
            })
            .unwrap_or_else(|| "none".into());

        Error::Wiring(format!(
            "flush exceeded max task steps (possible uncleared interval): limit={max_steps}, steps={steps}, now_ms={}, due_limit={}, pending_tasks={}, next_task={}",
            self.now_ms,
            due_limit_desc,
            self.task_queue.len(),
            next_task_desc
        ))
    }

    fn next_task_index(&self, due_limit: Option<i64>) -> Option<usize> {
        self.task_queue
            .iter()
            .enumerate()
            .filter(|(_, task)| {
                if let Some(limit) = due_limit {
                    task.due_at <= limit
                } else {
                    true
                }
            })
            .min_by_key(|(_, task)| (task.due_at, task.order))
            .map(|(idx, _)| idx)
    }

    fn execute_timer_task(&mut self, task: ScheduledTask) -> Result<()> {
        let interval_desc = task
            .interval_ms
            .map(|value| value.to_string())
            .unwrap_or_else(|| "none".into());
        self.trace_timer_line(format!(
            "[timer] run id={} due_at={} interval_ms={} now_ms={}",
            task.id, task.due_at, interval_desc, self.now_ms
        ));

        self.running_timer_id = Some(task.id);
        self.running_timer_canceled = false;
        let mut event = EventState::new("timeout", task.target);
        self.run_reaction(task.target, &task.reaction, &mut event)?;
        let canceled = self.running_timer_canceled;
        self.running_timer_id = None;
        self.running_timer_canceled = false;

        if let Some(interval_ms) = task.interval_ms {
            if !canceled {
                let delay_ms = interval_ms.max(0);
                let due_at = task.due_at.saturating_add(delay_ms);
                let order = self.next_task_order;
                self.next_task_order += 1;
                self.task_queue.push(ScheduledTask {
                    id: task.id,
                    due_at,
                    order,
                    interval_ms: Some(delay_ms),
                    target: task.target,
                    reaction: task.reaction,
                });
                self.trace_timer_line(format!(
                    "[timer] requeue id={} due_at={} interval_ms={}",
                    task.id, due_at, delay_ms
                ));
            }
        }

        Ok(())
    }

    pub(crate) fn schedule_timeout_reaction(
        &mut self,
        target: NodeId,
        reaction: Reaction,
        delay_ms: i64,
    ) -> i64 {
        let delay_ms = delay_ms.max(0);
        let due_at = self.now_ms + delay_ms;
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        let order = self.next_task_order;
        self.next_task_order += 1;
        self.task_queue.push(ScheduledTask {
            id,
            due_at,
            order,
            interval_ms: None,
            target,
            reaction,
        });
        self.trace_timer_line(format!(
            "[timer] schedule timeout id={} due_at={} delay_ms={}",
            id, due_at, delay_ms
        ));
        id
    }

    pub(crate) fn schedule_interval_reaction(
        &mut self,
        target: NodeId,
        reaction: Reaction,
        interval_ms: i64,
    ) -> i64 {
        let interval_ms = interval_ms.max(0);
        let due_at = self.now_ms + interval_ms;
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        let order = self.next_task_order;
        self.next_task_order += 1;
        self.task_queue.push(ScheduledTask {
            id,
            due_at,
            order,
            interval_ms: Some(interval_ms),
            target,
            reaction,
        });
        self.trace_timer_line(format!(
            "[timer] schedule interval id={} due_at={} interval_ms={}",
            id, due_at, interval_ms
        ));
        id
    }

    fn clear_timeout(&mut self, id: i64) {
        let before = self.task_queue.len();
        self.task_queue.retain(|task| task.id != id);
        let removed = before.saturating_sub(self.task_queue.len());
        let mut running_canceled = false;
        if self.running_timer_id == Some(id) {
            self.running_timer_canceled = true;
            running_canceled = true;
        }
        self.trace_timer_line(format!(
            "[timer] clear id={} removed={} running_canceled={}",
            id, removed, running_canceled
        ));
    }

    pub(crate) fn register(&mut self, node: NodeId, event: &str, reaction: Reaction) {
        self.listeners
            .add(node, event.to_string(), Listener { reaction });
    }

    pub(crate) fn dispatch_event(&mut self, target: NodeId, event_type: &str) -> Result<EventState> {
        let mut event = EventState::new(event_type, target);

        if NON_BUBBLING_EVENTS.contains(&event_type) {
            self.invoke_listeners(target, &mut event)?;
            self.trace_event_done(&event, "completed");
            return Ok(event);
        }

        let mut path = Vec::new();
        let mut cursor = Some(target);
        while let Some(node) = cursor {
            path.push(node);
            cursor = self.dom.parent(node);
        }

        // Target phase, then bubble through the ancestors.
        for node in path {
            event.current_target = node;
            self.invoke_listeners(node, &mut event)?;
            if event.propagation_stopped {
                self.trace_event_done(&event, "propagation_stopped");
                return Ok(event);
            }
        }

        self.trace_event_done(&event, "completed");
        Ok(event)
    }

    fn invoke_listeners(&mut self, node_id: NodeId, event: &mut EventState) -> Result<()> {
        let listeners = self.listeners.get(node_id, &event.event_type);
        for listener in listeners {
            if self.trace {
                let target_label = self.dom.node_label(event.target);
                let current_label = self.dom.node_label(event.current_target);
                self.trace_event_line(format!(
                    "[event] {} target={} current={} default_prevented={}",
                    event.event_type, target_label, current_label, event.default_prevented
                ));
            }
            self.run_reaction(node_id, &listener.reaction, event)?;
            if event.immediate_propagation_stopped {
                break;
            }
        }
        Ok(())
    }

    fn trace_event_done(&mut self, event: &EventState, outcome: &str) {
        if !(self.trace && self.trace_events) {
            return;
        }
        let target_label = self.dom.node_label(event.target);
        let current_label = self.dom.node_label(event.current_target);
        self.trace_event_line(format!(
            "[event] done {} target={} current={} outcome={} default_prevented={} propagation_stopped={} immediate_stopped={}",
            event.event_type,
            target_label,
            current_label,
            outcome,
            event.default_prevented,
            event.propagation_stopped,
            event.immediate_propagation_stopped
        ));
    }

    fn focus_node(&mut self, node: NodeId) -> Result<()> {
        if self.dom.disabled(node) {
            return Ok(());
        }

        if self.active_element == Some(node) {
            return Ok(());
        }

        if let Some(current) = self.active_element {
            self.blur_node(current)?;
        }

        self.active_element = Some(node);
        self.dispatch_event(node, "focusin")?;
        self.dispatch_event(node, "focus")?;
        Ok(())
    }

    fn blur_node(&mut self, node: NodeId) -> Result<()> {
        if self.active_element != Some(node) {
            return Ok(());
        }

        self.dispatch_event(node, "focusout")?;
        self.dispatch_event(node, "blur")?;
        self.active_element = None;
        Ok(())
    }

    fn move_pointer(&mut self, to: Option<NodeId>) -> Result<()> {
        if self.hovered_element == to {
            return Ok(());
        }
        let from_chain = self.hover_chain(self.hovered_element);
        let to_chain = self.hover_chain(to);
        self.hovered_element = to;

        // Leave fires innermost first, enter fires outermost first.
        for node in &from_chain {
            if !to_chain.contains(node) {
                self.dispatch_event(*node, "mouseleave")?;
            }
        }
        for node in to_chain.iter().rev() {
            if !from_chain.contains(node) {
                self.dispatch_event(*node, "mouseenter")?;
            }
        }
        Ok(())
    }

    fn hover_chain(&self, node: Option<NodeId>) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut cursor = node;
        while let Some(current) = cursor {
            if self.dom.element(current).is_some() {
                chain.push(current);
            }
            cursor = self.dom.parent(current);
        }
        chain
    }

    pub(crate) fn apply_scroll(&mut self, y: f64) -> Result<()> {
        let clamped = if y < 0.0 { 0.0 } else { y };
        self.scroll_y = clamped;
        self.trace_event_line(format!("[event] scroll y={clamped}"));
        self.headroom_on_scroll()
    }

    fn headroom_on_scroll(&mut self) -> Result<()> {
        let Some(state) = self.headroom.as_mut() else {
            return Ok(());
        };
        let node = state.node;
        let offset = state.offset as f64;
        let tolerance_up = state.tolerance_up as f64;
        let tolerance_down = state.tolerance_down as f64;
        let last = state.last_y;
        let y = self.scroll_y;
        state.last_y = y;

        let dy = y - last;
        let moved_down = dy > 0.0;
        let moved_up = dy < 0.0;

        if moved_down && y > offset && dy >= tolerance_down {
            self.dom.class_remove(node, "headroom--pinned")?;
            self.dom.class_add(node, "headroom--unpinned")?;
        } else if (moved_up && -dy >= tolerance_up) || y <= offset {
            self.dom.class_remove(node, "headroom--unpinned")?;
            self.dom.class_add(node, "headroom--pinned")?;
        }

        if y <= offset {
            self.dom.class_remove(node, "headroom--not-top")?;
            self.dom.class_add(node, "headroom--top")?;
        } else {
            self.dom.class_remove(node, "headroom--top")?;
            self.dom.class_add(node, "headroom--not-top")?;
        }

        Ok(())
    }

    pub(crate) fn countdown_tick(&mut self, node: NodeId) -> Result<()> {
        let Some(state) = self.countdowns.get(&node) else {
            return Ok(());
        };
        let timer_id = state.timer_id;
        let remaining = state.target_ms - self.wall_time_ms();
        // Whole seconds left, rounded up; zero means the target has passed.
        let secs_left = (remaining + 999).div_euclid(1000).max(0);

        if secs_left == 0 {
            self.clear_timer(timer_id);
            self.dispatch_event(node, "finish.countdown")?;
        } else {
            self.dispatch_event(node, "update.countdown")?;
        }
        Ok(())
    }

    fn is_checkbox(&self, node: NodeId) -> bool {
        self.dom
            .tag_name(node)
            .is_some_and(|tag| tag.eq_ignore_ascii_case("input"))
            && self
                .dom
                .attr(node, "type")
                .is_some_and(|kind| kind.eq_ignore_ascii_case("checkbox"))
    }

    fn select_one(&self, selector: &str) -> Result<NodeId> {
        let parsed = Selector::parse(selector)?;
        self.dom
            .query_first(&parsed)
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    fn node_snippet(&self, node_id: NodeId) -> String {
        truncate_chars(&self.dom.dump_node(node_id), 200)
    }

    fn next_random_f64(&mut self) -> f64 {
        // xorshift64*: simple deterministic PRNG for test runtime.
        let mut x = self.rng_state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.rng_state = if x == 0 { 0xA5A5_A5A5_A5A5_A5A5 } else { x };
        let out = x.wrapping_mul(0x2545_F491_4F6C_DD1D);
        // Convert top 53 bits to [0.0, 1.0).
        let mantissa = out >> 11;
        (mantissa as f64) * (1.0 / ((1u64 << 53) as f64))
    }

    fn trace_event_line(&mut self, line: String) {
        if self.trace && self.trace_events {
            self.trace_line(line);
        }
    }

    fn trace_timer_line(&mut self, line: String) {
        if self.trace && self.trace_timers {
            self.trace_line(line);
        }
    }

    pub(crate) fn trace_line(&mut self, line: String) {
        if self.trace {
            if self.trace_to_stderr {
                eprintln!("{line}");
            }
            if self.trace_logs.len() >= self.trace_log_limit {
                self.trace_logs.remove(0);
            }
            self.trace_logs.push(line);
        }
    }
}
