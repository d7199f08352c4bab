use page_wire::{Page, Result};

const LANDING_PAGE_HTML: &str = r#"
<html>
<body>
    <div class='preloader'><img src='loader.svg' alt='loading'></div>
    <header id='navbar-main' class='navbar navbar-main headroom'>
        <div id='navbar-collapse' class='collapse navbar-collapse'>
            <ul class='navbar-nav'>
                <li id='nav-pages' class='nav-item dropdown'>
                    <a id='pages-toggle' class='nav-link dropdown-toggle' href='#'>Pages</a>
                    <div id='pages-menu' class='dropdown-menu'>
                        <a class='dropdown-item' href='#features'>Features</a>
                    </div>
                </li>
            </ul>
        </div>
    </header>
    <section id='hero' data-background='img/hero.jpg'>
        <div id='clock'>soon</div>
    </section>
    <section id='features'></section>
    <footer><span class='current-year'>2008</span></footer>
</body>
</html>
"#;

#[test]
fn landing_page_boot_sequence_settles() -> Result<()> {
    let mut page = Page::from_html(LANDING_PAGE_HTML)?;
    page.set_wall_date(2020, 10, 3)?;
    page.ready()?;

    assert_eq!(page.text("#clock")?, "1 week 0 days 00 hr 00 min 00 sec");
    assert_eq!(page.text(".current-year")?, "2020");
    assert_eq!(page.style("#hero", "background-image")?, "url(img/hero.jpg)");

    page.advance_time(500)?;
    assert_eq!(page.style(".preloader", "opacity")?, "0");
    page.advance_time(600)?;
    assert_eq!(page.style(".preloader", "display")?, "none");
    assert_eq!(page.text("#clock")?, "0 weeks 6 days 23 hr 59 min 59 sec");
    Ok(())
}

#[test]
fn landing_page_navbar_reacts_to_hover_scroll_and_collapse() -> Result<()> {
    let mut page = Page::from_html(LANDING_PAGE_HTML)?;
    page.set_wall_date(2020, 10, 3)?;
    page.ready()?;

    page.hover("#pages-toggle")?;
    assert!(page.has_class("#pages-menu", "show")?);
    assert_eq!(
        page.attr("#pages-toggle", "aria-expanded")?.as_deref(),
        Some("true")
    );
    page.unhover()?;
    assert!(!page.has_class("#pages-menu", "show")?);

    page.scroll_to(300.0)?;
    assert!(page.has_class("#navbar-main", "headroom--unpinned")?);
    assert!(page.has_class("#navbar-main", "headroom--not-top")?);
    page.scroll_to(100.0)?;
    assert!(page.has_class("#navbar-main", "headroom--pinned")?);
    page.scroll_to(0.0)?;
    assert!(page.has_class("#navbar-main", "headroom--top")?);

    page.dispatch("#navbar-collapse", "shown.bs.collapse")?;
    assert_eq!(page.style("body", "overflow")?, "hidden");
    page.dispatch("#navbar-collapse", "hide.bs.collapse")?;
    assert!(page.has_class("#navbar-collapse", "collapsing-out")?);
    assert_eq!(page.style("body", "overflow")?, "initial");
    page.dispatch("#navbar-collapse", "hidden.bs.collapse")?;
    assert!(!page.has_class("#navbar-collapse", "collapsing-out")?);
    Ok(())
}

#[test]
fn narrow_viewport_keeps_touch_navigation() -> Result<()> {
    let html = r#"
        <ul class='navbar-nav'>
            <li id='item' class='nav-item dropdown'>
                <a class='dropdown-toggle' href='#'>Pages</a>
                <div id='pages-menu' class='dropdown-menu'>
                    <li class='dropdown-submenu'>
                        <a id='more-toggle' class='dropdown-item dropdown-toggle' href='#'>More</a>
                        <div id='more-menu' class='dropdown-menu'></div>
                    </li>
                </div>
            </li>
        </ul>
        "#;

    let mut page = Page::from_html(html)?;
    page.set_viewport_width(540);
    page.ready()?;

    page.hover("#item")?;
    assert!(!page.has_class("#pages-menu", "show")?);
    page.unhover()?;

    page.click("#more-toggle")?;
    assert!(page.has_class("#more-menu", "show")?);
    page.click("#more-toggle")?;
    assert!(!page.has_class("#more-menu", "show")?);
    Ok(())
}

#[test]
fn pricing_page_toggles_the_billing_period() -> Result<()> {
    let html = r#"
        <html>
        <body>
            <div class='custom-toggle'>
                <input id='billing-toggle' type='checkbox' data-toggle='price' data-target='.price'>
            </div>
            <span id='basic-price' class='price' data-annual='1200' data-monthly='100'
                  data-options='{"prefix":"$"}'>$1,200</span>
            <span id='team-price' class='price' data-annual='4800' data-monthly='400'
                  data-options='{"prefix":"$"}'>$4,800</span>
            <div id='contact' class='form-group'>
                <input id='email' class='form-control' type='email'>
            </div>
        </body>
        </html>
        "#;

    let mut page = Page::open(html)?;

    page.set_checked("#billing-toggle", true)?;
    assert_eq!(page.text("#basic-price")?, "$1,200");
    page.advance_time(1000)?;
    assert_eq!(page.text("#basic-price")?, "$100");
    assert_eq!(page.text("#team-price")?, "$400");

    page.set_checked("#billing-toggle", false)?;
    page.advance_time(1000)?;
    assert_eq!(page.text("#basic-price")?, "$1,200");
    assert_eq!(page.counter_runs().len(), 4);

    page.focus("#email")?;
    assert!(page.has_class("#contact", "focused")?);
    page.blur("#email")?;
    assert!(!page.has_class("#contact", "focused")?);
    Ok(())
}

#[test]
fn docs_page_copies_the_active_snippet() -> Result<()> {
    let html = r#"
        <html>
        <body>
            <div class='docs-section'>
                <div class='nav-wrapper'>
                    <ul class='nav'><li>HTML</li></ul>
                    <button id='copy' class='copy-docs' data-toggle='tooltip'>Copy</button>
                </div>
                <div class='card'>
                    <div class='tab-pane'>
                        <pre>&lt;button class="btn"&gt;Go&lt;/button&gt;</pre>
                    </div>
                </div>
            </div>
        </body>
        </html>
        "#;

    let mut page = Page::open(html)?;

    page.click("#copy")?;
    assert_eq!(page.clipboard_text(), Some("<button class=\"btn\">Go</button>"));
    assert_eq!(page.text("#copy")?, "Copied!");
    assert!(page.has_class("#copy", "copied")?);

    page.advance_time(1000)?;
    assert_eq!(page.text("#copy")?, "Copy");
    assert!(!page.has_class("#copy", "copied")?);
    Ok(())
}

#[test]
fn dashboard_page_installs_charts_and_the_map() -> Result<()> {
    let html = r#"
        <html>
        <body>
            <div class='card'><div class='ct-chart-sales-value'></div></div>
            <div class='card'><div class='ct-chart-traffic-share'></div></div>
            <div class='card' data-toggle='on-screen'><div id='vmap'></div></div>
            <input class='datepicker form-control' value='2020-10-01'>
        </body>
        </html>
        "#;

    let mut page = Page::open(html)?;

    assert_eq!(page.charts().len(), 2);
    let share = page
        .chart(".ct-chart-traffic-share")
        .ok_or_else(|| page_wire::Error::Wiring("traffic share chart missing".into()))?;
    assert_eq!(share.options.donut_width, Some(20));
    assert!(page.chart(".ct-chart-ranking").is_none());

    page.set_random_seed(42);
    let label = page.map_label("Portugal")?;
    assert!(label.starts_with("Portugal: "));
    assert!(label.ends_with(" session"));
    page.set_random_seed(42);
    assert_eq!(page.map_label("Portugal")?, label);
    Ok(())
}

#[test]
fn profile_page_synchronizes_form_widgets() -> Result<()> {
    let html = r#"
        <html>
        <body>
            <div class='input-slider-container'>
                <div id='budget' class='input-slider'
                     data-range-value-min='0' data-range-value-max='1000'></div>
                <span id='budget-value' class='range-slider-value' data-range-value-low='250'></span>
            </div>
            <textarea id='about' maxlength='160' data-bind-characters-target='#about-count'></textarea>
            <span id='about-count'></span>
            <a id='go-skills' href='#skills' data-toggle='scroll' data-offset='40'>Skills</a>
            <section id='skills'></section>
        </body>
        </html>
        "#;

    let mut page = Page::open(html)?;

    assert_eq!(page.text("#budget-value")?, "250.00");
    page.slide("#budget", 400.5)?;
    assert_eq!(page.text("#budget-value")?, "400.50");

    assert_eq!(page.text("#about-count")?, "160");
    page.type_text("#about", &"a".repeat(40))?;
    assert_eq!(page.text("#about-count")?, "120");

    page.click("#go-skills")?;
    assert_eq!(page.scroll_requests().len(), 1);
    assert_eq!(page.scroll_y(), 0.0);
    Ok(())
}
