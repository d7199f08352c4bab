use super::*;

#[test]
fn click_on_inner_content_bubbles_to_wired_ancestor() -> Result<()> {
    let html = r#"
        <a id='jump' href='#dest' data-toggle='scroll'><span id='inner'>Go</span></a>
        <div id='dest'></div>
        "#;

    let mut page = Page::open(html)?;
    page.click("#inner")?;
    assert_eq!(page.scroll_requests().len(), 1);
    Ok(())
}

#[test]
fn mouseenter_does_not_bubble_to_ancestors() -> Result<()> {
    let html = r#"
        <ul class='navbar-nav'>
            <li id='item' class='nav-item dropdown'>
                <a id='toggle' class='dropdown-toggle'>Menu</a>
                <div id='menu' class='dropdown-menu'><span id='deep'>entry</span></div>
            </li>
        </ul>
        "#;

    let mut page = Page::open(html)?;

    page.dispatch("#deep", "mouseenter")?;
    assert!(!page.has_class("#menu", "show")?);

    page.dispatch("#item", "mouseenter")?;
    assert!(page.has_class("#menu", "show")?);
    Ok(())
}

#[test]
fn pointer_moves_fire_enter_and_leave_along_the_chain() -> Result<()> {
    let html = r#"
        <ul class='navbar-nav'>
            <li id='first' class='nav-item dropdown'>
                <a class='dropdown-toggle'>One</a>
                <div id='menu-one' class='dropdown-menu'></div>
            </li>
            <li id='second' class='nav-item dropdown'>
                <a class='dropdown-toggle'>Two</a>
                <div id='menu-two' class='dropdown-menu'></div>
            </li>
        </ul>
        "#;

    let mut page = Page::open(html)?;

    page.hover("#first")?;
    assert!(page.has_class("#menu-one", "show")?);

    page.hover("#second")?;
    assert!(!page.has_class("#menu-one", "show")?);
    assert!(page.has_class("#menu-two", "show")?);

    page.unhover()?;
    assert!(!page.has_class("#menu-two", "show")?);
    Ok(())
}

#[test]
fn hovering_nested_content_enters_ancestors_first() -> Result<()> {
    let html = r#"
        <li id='item' class='nav-item dropdown'>
            <a class='dropdown-toggle'>Menu</a>
            <div id='menu' class='dropdown-menu'><a id='entry'>entry</a></div>
        </li>
        "#;

    let mut page = Page::open(html)?;
    page.hover("#entry")?;
    assert!(page.has_class("#menu", "show")?);
    assert!(page.has_class("#item", "show")?);
    Ok(())
}

#[test]
fn advance_time_runs_only_due_tasks() -> Result<()> {
    let html = r#"<html><body><div class='preloader'></div></body></html>"#;

    let mut page = Page::open(html)?;
    assert_eq!(page.pending_timers().len(), 2);

    page.advance_time(499)?;
    assert_eq!(page.style(".preloader", "opacity")?, "");
    assert_eq!(page.now_ms(), 499);

    page.advance_time(1)?;
    assert_eq!(page.style(".preloader", "opacity")?, "0");
    assert_eq!(page.style(".preloader", "display")?, "");
    assert_eq!(page.pending_timers().len(), 1);

    page.advance_time_to(1100)?;
    assert_eq!(page.style(".preloader", "display")?, "none");
    assert!(page.pending_timers().is_empty());
    Ok(())
}

#[test]
fn flush_advances_the_clock_task_by_task() -> Result<()> {
    let html = r#"<div class='preloader'></div>"#;

    let mut page = Page::open(html)?;
    page.flush()?;
    assert_eq!(page.now_ms(), 1100);
    assert_eq!(page.style(".preloader", "opacity")?, "0");
    assert_eq!(page.style(".preloader", "display")?, "none");
    Ok(())
}

#[test]
fn pending_timers_snapshot_is_due_ordered() -> Result<()> {
    let html = r#"<div class='preloader'></div>"#;

    let page = Page::open(html)?;
    let timers = page.pending_timers();
    assert_eq!(timers.len(), 2);
    assert_eq!(timers[0].due_at, 500);
    assert_eq!(timers[1].due_at, 1100);
    assert!(timers[0].order < timers[1].order);
    assert_eq!(timers[0].interval_ms, None);
    Ok(())
}

#[test]
fn clear_timer_cancels_one_pending_task() -> Result<()> {
    let html = r#"<div class='preloader'></div>"#;

    let mut page = Page::open(html)?;
    let first = page.pending_timers()[0].id;

    assert!(page.clear_timer(first));
    assert!(!page.clear_timer(first));
    assert_eq!(page.pending_timers().len(), 1);

    page.flush()?;
    assert_eq!(page.style(".preloader", "opacity")?, "");
    assert_eq!(page.style(".preloader", "display")?, "none");
    Ok(())
}

#[test]
fn clear_all_timers_empties_the_queue() -> Result<()> {
    let html = r#"<div class='preloader'></div>"#;

    let mut page = Page::open(html)?;
    assert_eq!(page.clear_all_timers(), 2);
    assert!(page.pending_timers().is_empty());

    page.flush()?;
    assert_eq!(page.now_ms(), 0);
    Ok(())
}

#[test]
fn stepping_runs_tasks_one_at_a_time() -> Result<()> {
    let html = r#"
        <div class='preloader'></div>
        <input id='billing' type='checkbox' data-toggle='price' data-target='#plan'>
        <span id='plan' data-annual='120' data-monthly='12' data-duration='0'>120</span>
        "#;

    let mut page = Page::open(html)?;
    assert_eq!(page.run_due_timers()?, 0);
    assert!(!page.run_next_due_timer()?);

    // A zero-duration counter settle lands on the queue already due.
    page.set_checked("#billing", true)?;
    assert_eq!(page.text("#plan")?, "120");
    assert!(page.run_next_due_timer()?);
    assert_eq!(page.now_ms(), 0);
    assert_eq!(page.text("#plan")?, "12");

    assert!(page.run_next_timer()?);
    assert_eq!(page.now_ms(), 500);
    assert_eq!(page.style(".preloader", "opacity")?, "0");
    assert!(page.run_next_timer()?);
    assert_eq!(page.now_ms(), 1100);
    assert_eq!(page.style(".preloader", "display")?, "none");
    assert!(!page.run_next_timer()?);
    assert_eq!(page.now_ms(), 1100);

    page.set_checked("#billing", false)?;
    assert_eq!(page.run_due_timers()?, 1);
    assert_eq!(page.now_ms(), 1100);
    assert_eq!(page.text("#plan")?, "120");
    Ok(())
}

#[test]
fn interval_requeues_from_its_due_time() -> Result<()> {
    let html = r#"<div id='clock'></div>"#;

    let mut page = Page::open(html)?;
    let timers = page.pending_timers();
    assert_eq!(timers.len(), 1);
    assert_eq!(timers[0].due_at, 1000);
    assert_eq!(timers[0].interval_ms, Some(1000));
    let id = timers[0].id;

    page.advance_time(1500)?;
    let timers = page.pending_timers();
    assert_eq!(timers.len(), 1);
    assert_eq!(timers[0].id, id);
    assert_eq!(timers[0].due_at, 2000);
    Ok(())
}

#[test]
fn runaway_interval_hits_the_step_limit() -> Result<()> {
    let html = r#"<div id='clock'></div>"#;

    let mut page = Page::open(html)?;
    page.set_timer_step_limit(50)?;

    let err = page.flush().unwrap_err();
    match err {
        Error::Wiring(msg) => {
            assert!(msg.contains("flush exceeded max task steps"));
            assert!(msg.contains("possible uncleared interval"));
            assert!(msg.contains("limit=50"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}

#[test]
fn clock_adjustments_validate_their_inputs() {
    let mut page = Page::from_html("<div></div>").unwrap();

    let err = page.advance_time(-1).unwrap_err();
    match err {
        Error::Wiring(msg) => {
            assert_eq!(msg, "advance_time requires non-negative milliseconds");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    page.advance_time(100).unwrap();
    let err = page.advance_time_to(50).unwrap_err();
    match err {
        Error::Wiring(msg) => {
            assert_eq!(
                msg,
                "advance_time_to requires target >= now_ms (target=50, now_ms=100)"
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let err = page.set_timer_step_limit(0).unwrap_err();
    match err {
        Error::Wiring(msg) => assert_eq!(msg, "set_timer_step_limit requires at least 1 step"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn trace_records_init_timer_and_event_lines() -> Result<()> {
    let html = r#"
        <div class='preloader'></div>
        <a id='jump' href='#dest' data-toggle='scroll'>Go</a>
        <div id='dest'></div>
        "#;

    let mut page = Page::from_html(html)?;
    page.enable_trace(true);
    page.set_trace_stderr(false);
    page.ready()?;
    page.click("#jump")?;
    page.advance_time(500)?;

    let logs = page.take_trace_logs();
    assert!(logs.iter().any(|line| line == "[init] preloader"));
    assert!(logs.iter().any(|line| line == "[init] current-year"));
    assert!(
        logs.iter()
            .any(|line| line.starts_with("[timer] schedule timeout id="))
    );
    assert!(logs.iter().any(|line| line.contains("[event] scroll y=0")));
    assert!(
        logs.iter()
            .any(|line| line.starts_with("[timer] advance delta_ms=500"))
    );
    assert!(page.take_trace_logs().is_empty());
    Ok(())
}

#[test]
fn trace_log_limit_keeps_only_recent_lines() -> Result<()> {
    let html = r#"<div class='preloader'></div>"#;

    let mut page = Page::from_html(html)?;
    page.enable_trace(true);
    page.set_trace_stderr(false);
    page.set_trace_log_limit(3)?;
    page.ready()?;
    page.flush()?;

    let logs = page.take_trace_logs();
    assert_eq!(logs.len(), 3);

    let err = page.set_trace_log_limit(0).unwrap_err();
    match err {
        Error::Wiring(msg) => assert_eq!(msg, "set_trace_log_limit requires at least 1 entry"),
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}

#[test]
fn disabling_event_traces_keeps_timer_lines() -> Result<()> {
    let html = r#"
        <a id='jump' href='#dest' data-toggle='scroll'>Go</a>
        <div id='dest'></div>
        <div class='preloader'></div>
        "#;

    let mut page = Page::from_html(html)?;
    page.enable_trace(true);
    page.set_trace_stderr(false);
    page.set_trace_events(false);
    page.ready()?;
    page.click("#jump")?;
    page.advance_time(500)?;

    let logs = page.take_trace_logs();
    assert!(logs.iter().all(|line| !line.starts_with("[event]")));
    assert!(logs.iter().any(|line| line.starts_with("[timer]")));
    Ok(())
}
