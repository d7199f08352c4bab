use std::collections::HashMap;

use crate::bootstrap::{COPY_RESET_DELAY_MS, DROPDOWN_CLOSE_DELAY_MS, SCROLL_ANIMATE_MS};
use crate::countdown::{COUNTDOWN_TEMPLATE, CountdownPeriods};
use crate::dom::NodeId;
use crate::html;
use crate::page::Page;
use crate::selector::Selector;
use crate::widgets::{CounterFormat, CounterRun, ScrollRequest, js_number, js_number_string};
use crate::{Error, Result, truncate_chars};

#[derive(Debug, Clone)]
pub(crate) struct EventState {
    pub(crate) event_type: String,
    pub(crate) target: NodeId,
    pub(crate) current_target: NodeId,
    pub(crate) default_prevented: bool,
    pub(crate) propagation_stopped: bool,
    pub(crate) immediate_propagation_stopped: bool,
}

impl EventState {
    pub(crate) fn new(event_type: &str, target: NodeId) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
            current_target: target,
            default_prevented: false,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Listener {
    pub(crate) reaction: Reaction,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct ListenerStore {
    map: HashMap<NodeId, HashMap<String, Vec<Listener>>>,
}

impl ListenerStore {
    pub(crate) fn add(&mut self, node_id: NodeId, event: String, listener: Listener) {
        self.map
            .entry(node_id)
            .or_default()
            .entry(event)
            .or_default()
            .push(listener);
    }

    pub(crate) fn get(&self, node_id: NodeId, event: &str) -> Vec<Listener> {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(event))
            .map(|listeners| listeners.to_vec())
            .unwrap_or_default()
    }
}

/// What a registered handler does when its event fires. Handlers are data,
/// interpreted by [`Page::run_reaction`]; the owner node is the element the
/// handler was registered on.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Reaction {
    /// Mark the navbar collapse as animating out and unlock page scrolling.
    CollapseHiding,
    CollapseHidden,
    CollapseShown,
    /// Flag the menus of a closing dropdown and schedule the flag removal.
    DropdownClosing,
    DropdownCloseExpire,
    /// Open or close a nested submenu from its toggle anchor.
    SubmenuToggle,
    SubmenuHoverLeave,
    NavItemHoverOpen,
    NavItemHoverClose,
    ClearOpenSubmenus,
    /// Keep the ancestor form-group `focused` class in sync with focus and
    /// content state.
    FormGroupFocusSync,
    /// Re-run all price counters toward the billing period price.
    PriceToggle,
    CounterSettle { text: String },
    SliderEcho { display: NodeId },
    AnchorScroll,
    CharactersSync { display: NodeId, max: f64 },
    CopyDocs,
    CopyRevert,
    CountdownRender,
    CountdownTick,
    PreloaderFadeStart,
    PreloaderHide,
}

impl Page {
    pub(crate) fn run_reaction(
        &mut self,
        owner: NodeId,
        reaction: &Reaction,
        event: &mut EventState,
    ) -> Result<()> {
        match reaction {
            Reaction::CollapseHiding => {
                self.dom.class_add(owner, "collapsing-out")?;
                self.set_page_overflow("initial")?;
            }
            Reaction::CollapseHidden => {
                self.dom.class_remove(owner, "collapsing-out")?;
            }
            Reaction::CollapseShown => {
                self.set_page_overflow("hidden")?;
            }
            Reaction::DropdownClosing => {
                let menus = self
                    .dom
                    .query_all_from(owner, &Selector::parse(".dropdown-menu")?);
                for menu in menus {
                    self.dom.class_add(menu, "close")?;
                }
                self.schedule_timeout_reaction(
                    owner,
                    Reaction::DropdownCloseExpire,
                    DROPDOWN_CLOSE_DELAY_MS,
                );
            }
            Reaction::DropdownCloseExpire => {
                let menus = self
                    .dom
                    .query_all_from(owner, &Selector::parse(".dropdown-menu")?);
                for menu in menus {
                    self.dom.class_remove(menu, "close")?;
                }
            }
            Reaction::SubmenuToggle => {
                let next = self.dom.next_element_sibling(owner);
                let next_shown = match next {
                    Some(sibling) => self.dom.class_contains(sibling, "show")?,
                    None => false,
                };
                if !next_shown {
                    let enclosing = self
                        .dom
                        .ancestors_matching(owner, &Selector::parse(".dropdown-menu")?)
                        .into_iter()
                        .next();
                    if let Some(menu) = enclosing {
                        for shown in self.dom.query_all_from(menu, &Selector::parse(".show")?) {
                            self.dom.class_remove(shown, "show")?;
                        }
                    }
                }

                if let Some(submenu) = next {
                    if self.dom.matches(submenu, &Selector::parse(".dropdown-menu")?) {
                        self.dom.class_toggle(submenu, "show")?;
                    }
                }

                // Registered per click, so repeated toggling stacks
                // duplicate cleanup handlers on the open nav item.
                let open_items = self
                    .dom
                    .ancestors_matching(owner, &Selector::parse("li.nav-item.dropdown.show")?);
                for item in open_items {
                    self.listeners.add(
                        item,
                        "hidden.bs.dropdown".to_string(),
                        Listener {
                            reaction: Reaction::ClearOpenSubmenus,
                        },
                    );
                }

                event.default_prevented = true;
                event.propagation_stopped = true;
            }
            Reaction::SubmenuHoverLeave => {
                self.dom.class_remove(owner, "show")?;
                let menus = self
                    .dom
                    .query_all_from(owner, &Selector::parse(".dropdown-menu")?);
                for menu in menus {
                    self.dom.class_remove(menu, "show")?;
                }
                self.dom.set_attr(owner, "aria-expanded", "false")?;
            }
            Reaction::NavItemHoverOpen => {
                let toggles = self
                    .dom
                    .children_matching(owner, &Selector::parse(".dropdown-toggle")?);
                for toggle in toggles {
                    self.dropdown_toggle(toggle)?;
                }
            }
            Reaction::NavItemHoverClose => {
                self.dom.class_remove(owner, "show")?;
                let menus = self
                    .dom
                    .query_all_from(owner, &Selector::parse(".dropdown-menu")?);
                for menu in menus {
                    self.dom.class_remove(menu, "show")?;
                }
                let toggles = self
                    .dom
                    .children_matching(owner, &Selector::parse(".dropdown-toggle")?);
                for toggle in toggles {
                    self.dom.set_attr(toggle, "aria-expanded", "false")?;
                }
            }
            Reaction::ClearOpenSubmenus => {
                let shown = self
                    .dom
                    .query_all(&Selector::parse(".dropdown-submenu .show")?);
                for node in shown {
                    self.dom.class_remove(node, "show")?;
                }
            }
            Reaction::FormGroupFocusSync => {
                let focused = event.event_type == "focus" || !self.dom.value(owner)?.is_empty();
                let groups = self
                    .dom
                    .ancestors_matching(owner, &Selector::parse(".form-group")?);
                for group in groups {
                    self.dom.class_set(group, "focused", focused)?;
                }
            }
            Reaction::PriceToggle => {
                self.run_price_toggle(owner)?;
            }
            Reaction::CounterSettle { text } => {
                self.dom.set_text_content(owner, text)?;
            }
            Reaction::SliderEcho { display } => {
                let Some(value) = self.sliders.get(&owner).map(|state| state.value) else {
                    return Ok(());
                };
                self.dom.set_text_content(*display, &format!("{value:.2}"))?;
            }
            Reaction::AnchorScroll => {
                self.run_anchor_scroll(owner, event)?;
            }
            Reaction::CharactersSync { display, max } => {
                let remaining = max - self.dom.value(owner)?.chars().count() as f64;
                self.dom
                    .set_text_content(*display, &js_number_string(remaining))?;
            }
            Reaction::CopyDocs => {
                self.run_copy_docs(owner)?;
            }
            Reaction::CopyRevert => {
                self.dom.set_text_content(owner, "Copy")?;
                self.dom.class_remove(owner, "copied")?;
            }
            Reaction::CountdownRender => {
                let Some(state) = self.countdowns.get(&owner) else {
                    return Ok(());
                };
                let remaining = state.target_ms - self.wall_time_ms();
                let periods = CountdownPeriods::from_remaining_ms(remaining);
                let markup = state.renderer.render(COUNTDOWN_TEMPLATE, &periods)?;
                self.dom.set_inner_html(owner, &markup)?;
            }
            Reaction::CountdownTick => {
                self.countdown_tick(owner)?;
            }
            Reaction::PreloaderFadeStart => {
                self.dom.style_set(owner, "opacity", "0")?;
            }
            Reaction::PreloaderHide => {
                self.dom.style_set(owner, "display", "none")?;
            }
        }

        Ok(())
    }

    /// Bootstrap-style dropdown toggle on a `.dropdown-toggle` element: the
    /// lifecycle events fire on the parent, and a prevented `show`/`hide`
    /// aborts the transition.
    pub(crate) fn dropdown_toggle(&mut self, toggle: NodeId) -> Result<()> {
        let Some(parent) = self.dom.parent_element(toggle) else {
            return Ok(());
        };
        let menus = self
            .dom
            .children_matching(parent, &Selector::parse(".dropdown-menu")?);
        let shown = match menus.first() {
            Some(menu) => self.dom.class_contains(*menu, "show")?,
            None => false,
        };

        if shown {
            let hide = self.dispatch_event(parent, "hide.bs.dropdown")?;
            if hide.default_prevented {
                return Ok(());
            }
            for menu in &menus {
                self.dom.class_remove(*menu, "show")?;
            }
            self.dom.class_remove(parent, "show")?;
            self.dom.set_attr(toggle, "aria-expanded", "false")?;
            self.dispatch_event(parent, "hidden.bs.dropdown")?;
        } else {
            let show = self.dispatch_event(parent, "show.bs.dropdown")?;
            if show.default_prevented {
                return Ok(());
            }
            for menu in &menus {
                self.dom.class_add(*menu, "show")?;
            }
            self.dom.class_add(parent, "show")?;
            self.dom.set_attr(toggle, "aria-expanded", "true")?;
            self.dispatch_event(parent, "shown.bs.dropdown")?;
        }

        Ok(())
    }

    fn set_page_overflow(&mut self, value: &str) -> Result<()> {
        for node in self.dom.query_all(&Selector::parse("html, body")?) {
            self.dom.style_set(node, "overflow", value)?;
        }
        Ok(())
    }

    fn run_price_toggle(&mut self, owner: NodeId) -> Result<()> {
        let checked = self.dom.checked(owner)?;
        let Some(target_selector) = self.dom.attr(owner, "data-target") else {
            return Ok(());
        };

        let targets = self.dom.query_all(&Selector::parse(&target_selector)?);
        for target in targets {
            let annual = js_number(self.dom.attr(target, "data-annual").as_deref());
            let monthly = js_number(self.dom.attr(target, "data-monthly").as_deref());

            let mut decimals = js_number(self.dom.attr(target, "data-decimals").as_deref());
            if decimals.is_nan() {
                decimals = 0.0;
            }
            let decimals = decimals.max(0.0) as usize;

            let duration_s = match self.dom.attr(target, "data-duration") {
                Some(raw) if !raw.is_empty() => js_number(Some(raw.as_str())),
                _ => 1.0,
            };
            let duration_ms = (duration_s * 1000.0) as i64;

            let format = match self.dom.attr(target, "data-options") {
                Some(raw) => serde_json::from_str::<CounterFormat>(&raw).map_err(|err| {
                    Error::Wiring(format!("invalid counter data-options JSON: {err}"))
                })?,
                None => CounterFormat::default(),
            };

            let (from, to) = if checked {
                (annual, monthly)
            } else {
                (monthly, annual)
            };
            if from.is_nan() || to.is_nan() {
                let label = self.dom.node_label(target);
                self.trace_line(format!(
                    "[widget] counter error target={label} start={from} end={to}"
                ));
                continue;
            }

            let run = CounterRun {
                node: target,
                from,
                to,
                decimals,
                duration_ms,
                format,
            };
            self.dom.set_text_content(target, &run.start_text())?;
            self.schedule_timeout_reaction(
                target,
                Reaction::CounterSettle {
                    text: run.final_text(),
                },
                duration_ms,
            );
            self.counter_runs.push(run);
        }

        Ok(())
    }

    fn run_anchor_scroll(&mut self, owner: NodeId, event: &mut EventState) -> Result<()> {
        let Some(hash) = self.dom.attr(owner, "href") else {
            return Ok(());
        };
        let target = self
            .dom
            .query_first(&Selector::parse(&hash)?)
            .ok_or_else(|| Error::Wiring(format!("scroll target not found: {hash}")))?;

        let offset_value = js_number(self.dom.attr(owner, "data-offset").as_deref());
        let offset = if offset_value.is_nan() {
            0.0
        } else {
            offset_value
        };

        let top = self.dom.offset_top(target)? as f64;
        self.scroll_requests.push(ScrollRequest {
            trigger: owner,
            target,
            offset,
            duration_ms: SCROLL_ANIMATE_MS,
        });
        self.apply_scroll(top - offset)?;
        event.default_prevented = true;
        Ok(())
    }

    fn run_copy_docs(&mut self, owner: NodeId) -> Result<()> {
        let mut copied = String::new();
        'search: for wrapper in self
            .dom
            .ancestors_matching(owner, &Selector::parse(".nav-wrapper")?)
        {
            for card in self
                .dom
                .siblings_matching(wrapper, &Selector::parse(".card")?)
            {
                let pane = self
                    .dom
                    .query_all_from(card, &Selector::parse(".tab-pane:last-of-type")?)
                    .into_iter()
                    .next();
                if let Some(pane) = pane {
                    let markup = self.dom.inner_html(pane)?;
                    copied = html::fragment_text(&markup)?.trim().to_string();
                    break 'search;
                }
            }
        }

        self.trace_line(format!("[widget] copy text={}", truncate_chars(&copied, 120)));
        self.clipboard = Some(copied);

        self.dom.set_text_content(owner, "Copied!")?;
        self.dom.class_add(owner, "copied")?;
        self.schedule_timeout_reaction(owner, Reaction::CopyRevert, COPY_RESET_DELAY_MS);
        Ok(())
    }
}
