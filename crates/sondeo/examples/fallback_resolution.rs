//! Example: fallback selectors and outcome classification
//!
//! Demonstrates: the login and member page objects against a scripted DOM
//! where the preferred selectors are missing, and the verdicts they produce.
//!
//! Run with: `cargo run --example fallback_resolution`

use sondeo::prelude::*;
use std::time::Duration;

#[tokio::main(flavor = "current_thread")]
async fn main() -> SondeoResult<()> {
    println!("=== Fallback Resolution Example ===\n");

    // 1. A login screen from an older Dolibarr: no #username / #login_button
    println!("1. Logging in on legacy markup...");
    let driver = MockDriver::new()
        .with_url("http://localhost:8080/")
        .with_element("input[name=\"username\"]", MockElement::visible())
        .with_element("input[name=\"password\"]", MockElement::visible())
        .with_element("input[type=\"submit\"][name=\"login\"]", MockElement::visible())
        .on_click(
            "input[type=\"submit\"][name=\"login\"]",
            MockEffect::new().navigate_to("http://localhost:8080/index.php?mainmenu=home"),
        );
    let timeouts = Timeouts::default()
        .with_candidate(Duration::from_millis(50))
        .with_signal(Duration::from_millis(200))
        .with_error_signal(Duration::from_millis(100));
    let ctx = PageContext::new(&driver, "http://localhost:8080").with_timeouts(timeouts);

    let login = LoginPage::new(&ctx);
    login.open().await?;
    let report = login.login(&Credentials::new("admin", "admin")).await?;
    for winner in &report.resolved {
        println!("   {} -> {} (candidate #{})", winner.field, winner.selector, winner.index);
    }
    println!("   verdict: {}", report.verdict);

    // 2. A member form that rejects an empty first name
    println!("\n2. Creating a member with an empty first name...");
    let driver = MockDriver::new()
        .with_element("input[name=\"morphy\"][value=\"phy\"]", MockElement::visible())
        .with_element("input[name=\"firstname\"]", MockElement::visible())
        .with_element("input[name=\"lastname\"]", MockElement::visible())
        .with_element("input[type=\"submit\"][name=\"add\"]", MockElement::visible())
        .on_click(
            "input[type=\"submit\"][name=\"add\"]",
            MockEffect::new().show(
                "div.error",
                MockElement::visible().with_text("El campo Nombre es obligatorio"),
            ),
        );
    let ctx = PageContext::new(&driver, "http://localhost:8080").with_timeouts(timeouts);
    let data = MemberData {
        first_name: Some(String::new()),
        last_name: Some("Pérez".to_string()),
        ..MemberData::default()
    };
    let report = MemberPage::new(&ctx).create_individual_member(&data).await?;
    println!("   phases: {:?}", report.phases);
    println!("   verdict: {} (passed: {})", report.verdict, report.passed);

    println!("\n=== Example Complete ===");
    Ok(())
}
