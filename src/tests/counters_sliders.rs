use super::*;

use crate::widgets::format_counter_value;

#[test]
fn price_toggle_runs_counters_toward_the_billing_period() -> Result<()> {
    let html = r#"
        <input id='billing' type='checkbox' data-toggle='price' data-target='.price'>
        <span id='pro' class='price' data-annual='120' data-monthly='12'>120</span>
        <span id='team' class='price' data-annual='480' data-monthly='48'>480</span>
        "#;

    let mut page = Page::open(html)?;

    page.set_checked("#billing", true)?;
    assert_eq!(page.text("#pro")?, "120");
    assert_eq!(page.text("#team")?, "480");
    assert_eq!(page.counter_runs().len(), 2);
    assert_eq!(page.counter_runs()[0].from, 120.0);
    assert_eq!(page.counter_runs()[0].to, 12.0);
    assert_eq!(page.counter_runs()[0].duration_ms, 1000);

    page.advance_time(1000)?;
    assert_eq!(page.text("#pro")?, "12");
    assert_eq!(page.text("#team")?, "48");

    page.set_checked("#billing", false)?;
    page.advance_time(1000)?;
    assert_eq!(page.text("#pro")?, "120");
    assert_eq!(page.text("#team")?, "480");
    assert_eq!(page.counter_runs().len(), 4);
    Ok(())
}

#[test]
fn counters_honor_decimals_duration_and_json_options() -> Result<()> {
    let html = r#"
        <input id='billing' type='checkbox' data-toggle='price' data-target='#plan'>
        <span id='plan' data-annual='1200.5' data-monthly='120.4' data-decimals='1'
              data-duration='2' data-options='{"prefix":"$","suffix":"/mo","useEasing":false}'>old</span>
        "#;

    let mut page = Page::open(html)?;

    page.set_checked("#billing", true)?;
    assert_eq!(page.text("#plan")?, "$1,200.5/mo");

    let run = &page.counter_runs()[0];
    assert_eq!(run.decimals, 1);
    assert_eq!(run.duration_ms, 2000);
    assert!(!run.format.use_easing);
    assert!(run.format.use_grouping);
    assert_eq!(run.format.prefix, "$");
    assert_eq!(run.format.suffix, "/mo");
    assert_eq!(run.format.separator, ",");

    page.advance_time(1999)?;
    assert_eq!(page.text("#plan")?, "$1,200.5/mo");
    page.advance_time(1)?;
    assert_eq!(page.text("#plan")?, "$120.4/mo");
    Ok(())
}

#[test]
fn counter_text_formatting_covers_signs_grouping_and_nan() {
    let plain = CounterFormat::default();
    assert_eq!(format_counter_value(1234567.0, 0, &plain), "1,234,567");
    assert_eq!(format_counter_value(999.0, 0, &plain), "999");
    assert_eq!(format_counter_value(0.5, 2, &plain), "0.50");

    let dollars = CounterFormat {
        prefix: "$".to_string(),
        ..CounterFormat::default()
    };
    assert_eq!(format_counter_value(-1200.5, 2, &dollars), "$-1,200.50");

    let bare = CounterFormat {
        use_grouping: false,
        ..CounterFormat::default()
    };
    assert_eq!(format_counter_value(1200.5, 1, &bare), "1200.5");

    let euros = CounterFormat {
        use_grouping: true,
        separator: ".".to_string(),
        decimal: ",".to_string(),
        suffix: " EUR".to_string(),
        ..CounterFormat::default()
    };
    assert_eq!(format_counter_value(1200.5, 2, &euros), "1.200,50 EUR");

    let tagged = CounterFormat {
        prefix: "$".to_string(),
        suffix: "!".to_string(),
        ..CounterFormat::default()
    };
    assert_eq!(format_counter_value(f64::NAN, 2, &tagged), "$NaN!");
}

#[test]
fn invalid_counter_options_are_wiring_errors() -> Result<()> {
    let html = r#"
        <input id='billing' type='checkbox' data-toggle='price' data-target='#plan'>
        <span id='plan' data-annual='10' data-monthly='1' data-options='{broken'>10</span>
        "#;

    let mut page = Page::open(html)?;

    let err = page.set_checked("#billing", true).unwrap_err();
    assert!(
        matches!(&err, Error::Wiring(msg) if msg.starts_with("invalid counter data-options JSON:")),
        "unexpected error: {err}"
    );
    Ok(())
}

#[test]
fn counters_skip_targets_without_numeric_prices() -> Result<()> {
    let html = r#"
        <input id='billing' type='checkbox' data-toggle='price' data-target='.price'>
        <span id='plan' class='price' data-monthly='12'>120</span>
        "#;

    let mut page = Page::open(html)?;
    page.enable_trace(true);
    page.set_trace_stderr(false);

    page.set_checked("#billing", true)?;
    assert_eq!(page.text("#plan")?, "120");
    assert!(page.counter_runs().is_empty());
    assert!(page.pending_timers().is_empty());

    let logs = page.take_trace_logs();
    assert!(
        logs.iter()
            .any(|line| line == "[widget] counter error target=#plan start=NaN end=12"),
        "missing counter error in {logs:?}"
    );
    Ok(())
}

#[test]
fn only_the_first_price_toggle_reacts() -> Result<()> {
    let html = r#"
        <input id='first' type='checkbox' data-toggle='price' data-target='#p1'>
        <input id='second' type='checkbox' data-toggle='price' data-target='#p2'>
        <span id='p1' data-annual='10' data-monthly='1'>10</span>
        <span id='p2' data-annual='20' data-monthly='2'>20</span>
        "#;

    let mut page = Page::open(html)?;

    page.set_checked("#second", true)?;
    assert!(page.counter_runs().is_empty());
    assert_eq!(page.text("#p2")?, "20");

    page.set_checked("#first", true)?;
    assert_eq!(page.counter_runs().len(), 1);
    Ok(())
}

#[test]
fn sliders_initialize_then_clamp_and_echo() -> Result<()> {
    let html = r#"
        <div class='input-slider-container'>
            <div id='slider' class='input-slider'
                 data-range-value-min='100' data-range-value-max='500'></div>
            <span id='readout' class='range-slider-value' data-range-value-low='200'></span>
        </div>
        "#;

    let mut page = Page::open(html)?;
    assert_eq!(page.text("#readout")?, "200.00");

    page.slide("#slider", 350.5)?;
    assert_eq!(page.text("#readout")?, "350.50");

    page.slide("#slider", 9999.0)?;
    assert_eq!(page.text("#readout")?, "500.00");

    page.slide("#slider", -3.0)?;
    assert_eq!(page.text("#readout")?, "100.00");

    let sliders = page.sliders();
    let [slider] = sliders.as_slice() else {
        return Err(Error::Wiring("slider not installed".into()));
    };
    assert_eq!(slider.start, 200.0);
    assert_eq!(slider.min, 100.0);
    assert_eq!(slider.max, 500.0);
    assert_eq!(slider.connect, [true, false]);
    Ok(())
}

#[test]
fn slider_containers_must_hold_both_parts() {
    let missing_display = r#"
        <div class='input-slider-container'>
            <div class='input-slider' data-range-value-min='0' data-range-value-max='10'></div>
        </div>
        "#;
    let err = Page::open(missing_display).unwrap_err();
    assert!(
        matches!(&err, Error::Wiring(msg) if msg == "input-slider-container without .range-slider-value")
    );

    let missing_slider = r#"
        <div class='input-slider-container'>
            <span class='range-slider-value' data-range-value-low='5'></span>
        </div>
        "#;
    let err = Page::open(missing_slider).unwrap_err();
    assert!(
        matches!(&err, Error::Wiring(msg) if msg == "input-slider-container without .input-slider")
    );
}

#[test]
fn slide_rejects_non_slider_targets() -> Result<()> {
    let mut page = Page::open("<div id='plain'></div>")?;

    let err = page.slide("#plain", 10.0).unwrap_err();
    match err {
        Error::TypeMismatch {
            selector,
            expected,
            actual,
        } => {
            assert_eq!(selector, "#plain");
            assert_eq!(expected, "range slider input");
            assert_eq!(actual, "div");
        }
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}
