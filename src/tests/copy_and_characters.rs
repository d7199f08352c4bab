use super::*;

#[test]
fn copy_button_lifts_the_last_code_tab() -> Result<()> {
    let html = r#"
        <div class='docs'>
            <div class='nav-wrapper'>
                <button id='copy' class='copy-docs'>Copy</button>
            </div>
            <div class='card'>
                <div class='tab-pane'><pre>first sample</pre></div>
                <div class='tab-pane'>
                    <pre>&lt;div class="alert"&gt;Done&lt;/div&gt;</pre>
                </div>
            </div>
        </div>
        "#;

    let mut page = Page::open(html)?;

    page.click("#copy")?;
    assert_eq!(
        page.clipboard_text(),
        Some("<div class=\"alert\">Done</div>")
    );
    assert_eq!(page.text("#copy")?, "Copied!");
    assert!(page.has_class("#copy", "copied")?);

    page.advance_time(1000)?;
    assert_eq!(page.text("#copy")?, "Copy");
    assert!(!page.has_class("#copy", "copied")?);
    Ok(())
}

#[test]
fn copy_without_docs_still_reports_empty_text() -> Result<()> {
    let mut page = Page::open("<button id='copy' class='copy-docs'>Copy</button>")?;

    page.click("#copy")?;
    assert_eq!(page.clipboard_text(), Some(""));
    assert_eq!(page.text("#copy")?, "Copied!");

    page.advance_time(1000)?;
    assert_eq!(page.text("#copy")?, "Copy");
    Ok(())
}

#[test]
fn copy_trace_truncates_long_snippets() -> Result<()> {
    let snippet = "x".repeat(150);
    let html = format!(
        r#"
        <div class='nav-wrapper'>
            <button id='copy' class='copy-docs'>Copy</button>
        </div>
        <div class='card'>
            <div class='tab-pane'>{snippet}</div>
        </div>
        "#
    );

    let mut page = Page::open(&html)?;
    page.enable_trace(true);
    page.set_trace_stderr(false);

    page.click("#copy")?;
    assert_eq!(page.clipboard_text(), Some(snippet.as_str()));

    let expected = format!("[widget] copy text={}...", "x".repeat(120));
    let logs = page.take_trace_logs();
    assert!(
        logs.iter().any(|line| *line == expected),
        "missing truncated copy line in {logs:?}"
    );
    Ok(())
}

#[test]
fn character_counter_tracks_remaining_input() -> Result<()> {
    let html = r#"
        <textarea id='bio' maxlength='20' data-bind-characters-target='#bio-count'></textarea>
        <span id='bio-count'>old</span>
        "#;

    let mut page = Page::open(html)?;
    assert_eq!(page.text("#bio-count")?, "20");

    page.type_text("#bio", "hello")?;
    assert_eq!(page.text("#bio-count")?, "15");

    page.type_text("#bio", &"y".repeat(25))?;
    assert_eq!(page.text("#bio-count")?, "-5");
    Ok(())
}

#[test]
fn character_counter_without_maxlength_shows_nan() -> Result<()> {
    let html = r#"
        <textarea id='bio' data-bind-characters-target='#bio-count'></textarea>
        <span id='bio-count'></span>
        "#;

    let mut page = Page::open(html)?;
    assert_eq!(page.text("#bio-count")?, "NaN");

    page.type_text("#bio", "ab")?;
    assert_eq!(page.text("#bio-count")?, "NaN");
    Ok(())
}

#[test]
fn anchor_scroll_requests_an_animated_scroll() -> Result<()> {
    let html = r#"
        <a id='jump' href='#features' data-toggle='scroll' data-offset='80'>Go</a>
        <section id='features'></section>
        "#;

    let mut page = Page::open(html)?;
    page.scroll_to(500.0)?;

    page.click("#jump")?;
    let trigger = page.query("#jump")?;
    let target = page.query("#features")?;
    let [request] = page.scroll_requests() else {
        panic!("expected one scroll request, got {:?}", page.scroll_requests());
    };
    assert_eq!(Some(request.trigger), trigger);
    assert_eq!(Some(request.target), target);
    assert_eq!(request.offset, 80.0);
    assert_eq!(request.duration_ms, 600);
    assert_eq!(page.scroll_y(), 0.0);
    Ok(())
}

#[test]
fn anchor_scroll_to_a_missing_target_is_a_wiring_error() -> Result<()> {
    let html = r#"<a id='jump' href='#nowhere' data-toggle='scroll'>Go</a>"#;

    let mut page = Page::open(html)?;
    let err = page.click("#jump").unwrap_err();
    assert!(matches!(&err, Error::Wiring(msg) if msg == "scroll target not found: #nowhere"));
    Ok(())
}

#[test]
fn current_year_stamps_every_marker() -> Result<()> {
    let html = r#"
        <footer>
            <span id='a' class='current-year'>2008</span>
            <span id='b' class='current-year'></span>
        </footer>
        "#;

    let mut page = Page::from_html(html)?;
    page.set_wall_date(2024, 6, 1)?;
    page.ready()?;
    assert_eq!(page.text("#a")?, "2024");
    assert_eq!(page.text("#b")?, "2024");

    let default_clock = Page::open(html)?;
    assert_eq!(default_clock.text("#a")?, "1970");
    Ok(())
}
