use homepage_e2e::browser::chrome_available;
use homepage_e2e::scenarios::{self, blog, homepage, navigation, personal, routes};
use homepage_e2e::{CapturedError, Engine, Expectations, ScenarioError, TestSite};
use std::fs;

fn personal_site() -> TestSite {
    TestSite::fixture("personal-site")
}

fn template_site() -> TestSite {
    TestSite::fixture("template-site")
}

#[test_log::test]
fn every_scenario_passes_on_the_personal_site() {
    let expectations = Expectations::default();
    for scenario in scenarios::all() {
        let site = personal_site();
        if let Err(err) = scenario.run(&site, &expectations) {
            panic!(
                "{} failed: {err}\n{}",
                scenario.full_name(),
                site.log().render().join("\n")
            );
        }
    }
}

#[test_log::test]
fn home_and_blog_answer_200() {
    let site = personal_site();
    let home = site.get("/").unwrap();
    home.assert_ok();
    home.assert_contains("<title>Markus Smet | HomePage</title>");
    home.assert_not_contains("Sarah Johnson");

    site.get("/blog").unwrap().assert_ok();
    site.get("/homes/saas").unwrap().assert_status(404);
}

#[test_log::test]
fn template_still_shows_the_demo_owner() {
    let err = personal::placeholder_text_removed(&template_site(), &Expectations::default())
        .unwrap_err();
    match err {
        ScenarioError::Leak {
            selector, needle, ..
        } => {
            assert_eq!(selector, "main h1");
            assert_eq!(needle, "Sarah Johnson");
        }
        other => panic!("expected a leak, got {other}"),
    }
}

#[test_log::test]
fn demo_heading_is_a_leak_once_the_owner_is_gone() {
    let mut expectations = Expectations::default();
    expectations.checklist.forbidden_main_heading.clear();
    let err = personal::placeholder_text_removed(&template_site(), &expectations).unwrap_err();
    assert!(
        matches!(&err, ScenarioError::Leak { needle, .. } if needle == "PERSONAL WEB DEMO"),
        "{err}"
    );
}

#[test_log::test]
fn hidden_section_counts_as_missing() {
    let err = navigation::sections_present(&template_site(), &Expectations::default())
        .unwrap_err();
    assert!(
        matches!(&err, ScenarioError::Missing { selector, .. } if selector == "#projects"),
        "{err}"
    );
}

#[test_log::test]
fn template_nav_does_not_match_config() {
    let err = navigation::nav_links_match_config(&template_site(), &Expectations::default())
        .unwrap_err();
    match err {
        ScenarioError::Navigation { route, detail } => {
            assert_eq!(route, "/");
            assert!(detail.contains("#projects"), "{detail}");
        }
        other => panic!("expected a navigation failure, got {other}"),
    }
}

#[test_log::test]
fn template_footer_lacks_privacy_link() {
    let err = navigation::footer_links_match_config(&template_site(), &Expectations::default())
        .unwrap_err();
    assert!(
        matches!(&err, ScenarioError::Navigation { detail, .. } if detail.contains("Privacy Policy")),
        "{err}"
    );
}

#[test_log::test]
fn missing_script_surfaces_after_first_click() {
    let err = navigation::page_integrity_after_interaction(
        &template_site(),
        &Expectations::default(),
    )
    .unwrap_err();
    match err {
        ScenarioError::RuntimeErrors { action, errors } => {
            assert!(action.contains("\"/\""), "{action}");
            assert!(errors.iter().any(|e| matches!(
                e,
                CapturedError::Network { status: 404, url } if url.ends_with("/js/missing.js")
            )));
            assert!(errors.iter().any(|e| matches!(
                e,
                CapturedError::Console(m) if m.starts_with("Failed to load resource")
            )));
        }
        other => panic!("expected runtime errors, got {other}"),
    }
}

#[test_log::test]
fn template_still_serves_alternative_homes() {
    let err = routes::alternative_homes_disabled(&template_site(), &Expectations::default())
        .unwrap_err();
    match err {
        ScenarioError::Routing {
            route,
            expected,
            actual,
        } => {
            assert_eq!(route, "/homes/saas");
            assert_eq!(expected, 404);
            assert_eq!(actual, 200);
        }
        other => panic!("expected a routing failure, got {other}"),
    }
}

#[test_log::test]
fn empty_blog_has_no_posts() {
    let err = blog::blog_index_lists_posts(&template_site(), &Expectations::default())
        .unwrap_err();
    assert!(matches!(err, ScenarioError::Content { .. }), "{err}");
}

#[test_log::test]
fn template_title_matches_only_the_permissive_pattern() {
    let site = template_site();
    let mut expectations = Expectations::default();
    homepage::loads_without_errors(&site, &expectations).unwrap();

    expectations.checklist.title_pattern = "HomePage".to_string();
    let err = homepage::loads_without_errors(&site, &expectations).unwrap_err();
    assert!(matches!(err, ScenarioError::Content { .. }), "{err}");
}

#[test_log::test]
fn checks_are_idempotent() {
    let expectations = Expectations::default();
    for site in [personal_site(), template_site()] {
        let first = homepage::loads_without_errors(&site, &expectations).map_err(|e| e.to_string());
        let second =
            homepage::loads_without_errors(&site, &expectations).map_err(|e| e.to_string());
        assert_eq!(first, second);

        let first =
            routes::alternative_homes_disabled(&site, &expectations).map_err(|e| e.to_string());
        let second =
            routes::alternative_homes_disabled(&site, &expectations).map_err(|e| e.to_string());
        assert_eq!(first, second);
    }
}

#[test_log::test]
fn unreachable_site_is_an_http_error() {
    let site = TestSite::connect("http://127.0.0.1:9/").unwrap();
    let err = homepage::header_visible(&site, &Expectations::default()).unwrap_err();
    assert!(matches!(err, ScenarioError::Http { .. }), "{err}");
}

/// Serve `files` from a temporary directory
fn temp_site(
    files: &[(&str, &str)],
    engine: Engine,
) -> (tempfile::TempDir, TestSite) {
    let dir = tempfile::Builder::new()
        .prefix("homepage-e2e-")
        .tempdir()
        .expect("create temp dir");
    for (path, content) in files {
        let path = dir.path().join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    let site = TestSite::serve_dir(dir.path()).unwrap().with_engine(engine);
    (dir, site)
}

fn page(head: &str, body: &str) -> String {
    format!(
        "<!doctype html><html><head><title>Markus Smet | HomePage</title>{head}</head>\
         <body>{body}</body></html>"
    )
}

const HOME_NAV: &str = r#"<header><nav><a href="/">Home</a> <a href="/blog">Blog</a></nav></header>"#;

#[test_log::test]
fn nav_must_survive_a_later_click() {
    let home = page("", &format!("{HOME_NAV}<main><h1>Markus</h1></main>"));
    let blog = page("", "<main><p>Latest posts</p></main>");
    let (_dir, site) = temp_site(
        &[("index.html", &home), ("blog/index.html", &blog)],
        Engine::Static,
    );

    let err = navigation::page_integrity_after_interaction(&site, &Expectations::default())
        .unwrap_err();
    match err {
        ScenarioError::Missing { route, selector } => {
            assert_eq!(route, "/blog");
            assert_eq!(selector, "header nav");
        }
        other => panic!("expected the nav to go missing, got {other}"),
    }
}

#[test_log::test]
fn errors_on_a_later_page_name_the_click() {
    let home = page("", &format!("{HOME_NAV}<main><h1>Markus</h1></main>"));
    let blog = page(
        r#"<link rel="stylesheet" href="/css/blog.css">"#,
        &format!("{HOME_NAV}<main><p>Latest posts</p></main>"),
    );
    let (_dir, site) = temp_site(
        &[("index.html", &home), ("blog/index.html", &blog)],
        Engine::Static,
    );

    let err = navigation::page_integrity_after_interaction(&site, &Expectations::default())
        .unwrap_err();
    match err {
        ScenarioError::RuntimeErrors { action, errors } => {
            assert_eq!(action, "clicking \"/blog\" on /");
            assert!(errors.iter().any(|e| matches!(
                e,
                CapturedError::Network { status: 404, url } if url.ends_with("/css/blog.css")
            )));
        }
        other => panic!("expected runtime errors, got {other}"),
    }
    assert!(site.captured().iter().any(CapturedError::is_network));
}

/// Runs `check` only where Chrome can be launched
fn with_chrome(check: impl FnOnce()) {
    if chrome_available() {
        check();
    } else {
        eprintln!("Chrome not found, skipping");
    }
}

#[test_log::test]
fn chrome_reports_script_errors_from_clicks() {
    with_chrome(|| {
        let nav = r##"<header><nav>
            <a href="/">Home</a>
            <a href="#about" onclick="console.error('boom'); throw new Error('nav handler')">About</a>
        </nav></header>"##;
        let home = page("", &format!(r#"{nav}<main><section id="about">About</section></main>"#));
        let files = [("index.html", home.as_str())];

        let (_dir, site) = temp_site(&files, Engine::Static);
        navigation::page_integrity_after_interaction(&site, &Expectations::default())
            .expect("scripts never run in the static engine");

        let (_dir, site) = temp_site(&files, Engine::Chrome);
        let err = navigation::page_integrity_after_interaction(&site, &Expectations::default())
            .unwrap_err();
        match err {
            ScenarioError::RuntimeErrors { action, errors } => {
                assert_eq!(action, "clicking \"#about\" on /");
                assert!(errors.iter().any(|e| matches!(e, CapturedError::Console(m) if m == "boom")));
                assert!(errors.iter().any(
                    |e| matches!(e, CapturedError::Console(m) if m.starts_with("Uncaught") && m.contains("nav handler"))
                ));
            }
            other => panic!("expected runtime errors, got {other}"),
        }
    });
}

#[test_log::test]
fn chrome_applies_stylesheets_to_visibility() {
    with_chrome(|| {
        let body = r#"<main>
            <section id="about" class="gone">About</section>
            <section id="projects">Projects</section>
            <section id="testimonials">Kind words</section>
        </main>"#;
        let home = page("<style>.gone { display: none }</style>", body);
        let files = [("index.html", home.as_str())];

        let (_dir, site) = temp_site(&files, Engine::Static);
        navigation::sections_present(&site, &Expectations::default())
            .expect("stylesheets are not applied in the static engine");

        let (_dir, site) = temp_site(&files, Engine::Chrome);
        let err = navigation::sections_present(&site, &Expectations::default()).unwrap_err();
        assert!(
            matches!(&err, ScenarioError::Missing { selector, .. } if selector == "#about"),
            "{err}"
        );
    });
}

#[test_log::test]
fn chrome_sees_the_demo_owner_too() {
    with_chrome(|| {
        let site = template_site().with_engine(Engine::Chrome);
        let browser = site.browser().unwrap();
        assert_eq!(browser.engine(), Engine::Chrome);
        drop(browser);

        let err = personal::placeholder_text_removed(&site, &Expectations::default())
            .unwrap_err();
        assert!(
            matches!(&err, ScenarioError::Leak { needle, .. } if needle == "Sarah Johnson"),
            "{err}"
        );
    });
}
