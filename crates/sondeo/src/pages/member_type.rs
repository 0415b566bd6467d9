//! Member type edit form.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{candidates, error_banner, form_gone, radio, success_banner};
use crate::classifier::{OutcomeSignal, SignalCheck, UnknownPolicy};
use crate::driver::SelectBy;
use crate::locator::CandidateSelector;
use crate::page_object::{
    run_operation, Choice, FieldBundle, FieldSpec, FieldValue, Operation, OperationReport,
    PageContext, PageObject,
};
use crate::result::SondeoResult;

const EDIT_PATH: &str = "/adherents/type.php";

/// Changes to a member type; absent fields keep their current value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberTypeEdit {
    /// "Activo" or "Cerrado"
    #[serde(alias = "estado")]
    pub status: Option<String>,
    /// "Individual", "Corporación" or "Ambos"
    #[serde(alias = "naturaleza")]
    pub nature: Option<String>,
    /// Subject to subscription
    #[serde(alias = "sujetoCotizacion")]
    pub subscription: Option<bool>,
    /// Compute the subscription amount automatically
    #[serde(alias = "calcularImporte")]
    pub auto_renew: Option<bool>,
    /// Subscription amount
    #[serde(alias = "importe")]
    pub amount: Option<FieldValue>,
    /// Duration unit label ("año", "mes", ...); blank leaves the unit as is
    #[serde(alias = "duracionTipo")]
    pub duration_unit: Option<String>,
    /// Duration in units
    #[serde(alias = "duracionValor")]
    pub duration_value: Option<FieldValue>,
    /// Members of this type may vote
    #[serde(alias = "votoAutorizado")]
    pub vote: Option<bool>,
}

impl MemberTypeEdit {
    /// As a field bundle
    #[must_use]
    pub fn to_bundle(&self) -> FieldBundle {
        FieldBundle::new()
            .with_opt("status", self.status.as_deref())
            .with_opt("nature", self.nature.as_deref())
            .with_opt("subscription", self.subscription)
            .with_opt("auto_renew", self.auto_renew)
            .with_opt("amount", self.amount.clone())
            .with_opt(
                "duration_unit",
                self.duration_unit.as_deref().filter(|u| !u.trim().is_empty()),
            )
            .with_opt("duration_value", self.duration_value.clone())
            .with_opt("vote", self.vote)
    }
}

/// Yes/no radio pair; `fallbacks` are the input names other Dolibarr
/// versions give the same control
fn yes_no(field: &str, control: &str, fallbacks: &[&str]) -> FieldSpec {
    let pair = |value: &str| {
        fallbacks.iter().fold(radio(control, value), |list, alt| {
            radio(alt, value)
                .candidates()
                .iter()
                .fold(list, |list, selector| list.or(selector.clone()))
        })
    };
    FieldSpec::radio(
        field,
        vec![
            Choice::new(["true", "1"], pair("1")),
            Choice::new(["false", "no", "0"], pair("0")),
        ],
    )
}

/// The Dolibarr member type card in edit mode
#[derive(Debug, Clone)]
pub struct MemberTypePage<'a> {
    ctx: PageContext<'a>,
    submit: CandidateSelector,
}

impl PageObject for MemberTypePage<'_> {
    fn url_pattern(&self) -> &str {
        EDIT_PATH
    }

    fn page_name(&self) -> &str {
        "member type"
    }
}

impl<'a> MemberTypePage<'a> {
    /// Bind the member type page to a context
    #[must_use]
    pub fn new(ctx: &PageContext<'a>) -> Self {
        Self {
            ctx: ctx.clone(),
            submit: candidates(
                "save button",
                "input[type=\"submit\"][name=\"update\"]",
                &[
                    "input.button[value*=\"Save\"]",
                    "input.button[value*=\"Modify\"]",
                    "input.button[value*=\"Guardar\"]",
                ],
            ),
        }
    }

    /// Edit URL of a member type
    #[must_use]
    pub fn edit_path(type_id: u32) -> String {
        format!("{EDIT_PATH}?action=edit&rowid={type_id}")
    }

    /// Load the edit form of a member type. Landing somewhere else is only
    /// logged; the first field lookup reports it properly.
    pub async fn open(&self, type_id: u32) -> SondeoResult<()> {
        self.ctx.goto(&Self::edit_path(type_id)).await?;
        let url = self.ctx.driver().current_url().await?;
        if !url.contains("type.php") || !url.contains("action=edit") {
            warn!(%url, type_id, "member type edit form did not load");
        }
        Ok(())
    }

    /// The edit operation. Saving leaves the browser on the type card, so an
    /// edit without any banner is taken as saved.
    #[must_use]
    pub fn edit_operation(&self) -> Operation {
        Operation::new("edit_member_type", self.page_name(), self.submit.clone())
            .field(
                FieldSpec::select(
                    "status",
                    candidates("status", "select[name=\"statut\"]", &["#statut"]),
                    SelectBy::Value,
                )
                .with_choices(vec![
                    Choice::new(["Activo", "Active", "Open", "1"], "1".to_string()),
                    Choice::new(["Cerrado", "Closed", "0"], "0".to_string()),
                ]),
            )
            .field(FieldSpec::radio(
                "nature",
                vec![
                    Choice::new(["phy", "Individual", "physical"], radio("morphy", "phy")),
                    Choice::new(
                        ["mor", "Corporación", "Corporacion", "Corporate", "moral"],
                        radio("morphy", "mor"),
                    ),
                    Choice::new(["", "Ambos", "Both"], radio("morphy", "")),
                ],
            ))
            .field(yes_no("subscription", "subscription", &[]))
            .field(
                yes_no("auto_renew", "auto_renew", &["caneditamount"])
                    .only_when("subscription", ["true"]),
            )
            .field(
                FieldSpec::input("amount", candidates("amount", "input[name=\"amount\"]", &["#amount"]))
                    .only_when("subscription", ["true"]),
            )
            .field(FieldSpec::select(
                "duration_unit",
                candidates(
                    "duration unit",
                    "select[name=\"duration_unit\"]",
                    &["#duration_unit"],
                ),
                SelectBy::Label,
            ))
            .field(FieldSpec::input(
                "duration_value",
                candidates(
                    "duration value",
                    "input[name=\"duration_value\"]",
                    &["#duration_value"],
                ),
            ))
            .field(yes_no("vote", "vote", &[]))
            .signal(error_banner(".error", &["div.error"]))
            .signal(success_banner())
            .signal(
                OutcomeSignal::success(
                    "left edit mode",
                    SignalCheck::UrlNotContains("action=edit".to_string()),
                )
                .with_priority(1),
            )
            .signal(form_gone(&self.submit))
            .with_policy(UnknownPolicy::Optimistic)
    }

    /// Save arbitrary member type fields on the open edit form
    pub async fn edit_fields(&self, bundle: &FieldBundle) -> SondeoResult<OperationReport> {
        run_operation(&self.ctx, &self.edit_operation(), bundle).await
    }

    /// Save member type changes on the open edit form
    pub async fn edit_member_type(&self, edit: &MemberTypeEdit) -> SondeoResult<OperationReport> {
        self.edit_fields(&edit.to_bundle()).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, MockEffect, MockElement, PageDriver};
    use crate::wait::Timeouts;
    use std::time::Duration;

    fn fast() -> Timeouts {
        Timeouts::default()
            .with_candidate(Duration::from_millis(100))
            .with_signal(Duration::from_millis(200))
            .with_error_signal(Duration::from_millis(100))
    }

    fn edit_form() -> MockDriver {
        let mut driver = MockDriver::new()
            .with_url("http://erp/adherents/type.php?action=edit&rowid=1")
            .with_element(
                "select[name=\"statut\"]",
                MockElement::visible().with_options([("1", "Activo"), ("0", "Cerrado")]),
            )
            .with_element(
                "select[name=\"duration_unit\"]",
                MockElement::visible().with_options([("y", "año"), ("m", "mes"), ("d", "día")]),
            )
            .with_element("input[name=\"amount\"]", MockElement::visible())
            .with_element("input[name=\"duration_value\"]", MockElement::visible())
            .with_element("input[type=\"submit\"][name=\"update\"]", MockElement::visible());
        for value in ["phy", "mor", ""] {
            driver = driver.with_element(
                format!("input[name=\"morphy\"][value=\"{value}\"]"),
                MockElement::visible(),
            );
        }
        for control in ["subscription", "caneditamount", "vote"] {
            for value in ["0", "1"] {
                driver = driver.with_element(
                    format!("input[name=\"{control}\"][value=\"{value}\"]"),
                    MockElement::visible(),
                );
            }
        }
        driver
    }

    #[test]
    fn test_edit_path() {
        assert_eq!(MemberTypePage::edit_path(7), "/adherents/type.php?action=edit&rowid=7");
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_only_touches_status() {
        let driver = edit_form();
        let ctx = PageContext::new(&driver, "http://erp").with_timeouts(fast());
        let edit: MemberTypeEdit = serde_json::from_str(r#"{"estado": "Cerrado"}"#).unwrap();
        let report = MemberTypePage::new(&ctx).edit_member_type(&edit).await.unwrap();
        assert_eq!(driver.value_of("select[name=\"statut\"]").as_deref(), Some("0"));
        let probed = driver.probed();
        assert!(probed.contains(&"select[name=\"statut\"]".to_string()));
        assert!(!probed
            .iter()
            .any(|s| ["morphy", "amount", "duration", "vote", "subscription"]
                .iter()
                .any(|other| s.contains(other))));
        assert_eq!(driver.history().iter().filter(|c| !c.starts_with("click:")).count(), 1);
        assert!(report.verdict.is_unknown());
        assert!(report.passed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_amount_gated_by_subscription() {
        let driver = edit_form().on_click(
            "input[type=\"submit\"][name=\"update\"]",
            MockEffect::new().navigate_to("http://erp/adherents/type.php?rowid=1"),
        );
        let ctx = PageContext::new(&driver, "http://erp").with_timeouts(fast());
        let edit = MemberTypeEdit {
            subscription: Some(false),
            auto_renew: Some(true),
            amount: Some(FieldValue::from(30u32)),
            nature: Some("Ambos".to_string()),
            duration_unit: Some("año".to_string()),
            duration_value: Some(FieldValue::from(1u32)),
            vote: Some(true),
            ..MemberTypeEdit::default()
        };
        let report = MemberTypePage::new(&ctx).edit_member_type(&edit).await.unwrap();
        assert!(driver.is_checked("input[name=\"subscription\"][value=\"0\"]"));
        assert!(driver.is_checked("input[name=\"morphy\"][value=\"\"]"));
        assert!(driver.is_checked("input[name=\"vote\"][value=\"1\"]"));
        assert!(!driver.was_called("fill:input[name=\"amount\"]"));
        assert!(!driver.was_called("check:input[name=\"caneditamount\"][value=\"1\"]=true"));
        assert_eq!(driver.value_of("select[name=\"duration_unit\"]").as_deref(), Some("y"));
        assert_eq!(driver.value_of("input[name=\"duration_value\"]").as_deref(), Some("1"));
        assert_eq!(report.verdict.to_string(), "success (left edit mode)");
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscription_enables_amount() {
        let driver = edit_form();
        let ctx = PageContext::new(&driver, "http://erp").with_timeouts(fast());
        let bundle = FieldBundle::new()
            .with("subscription", "Sí")
            .with("auto_renew", false)
            .with("amount", 25.5);
        MemberTypePage::new(&ctx).edit_fields(&bundle).await.unwrap();
        assert!(driver.is_checked("input[name=\"subscription\"][value=\"1\"]"));
        assert!(driver.is_checked("input[name=\"caneditamount\"][value=\"0\"]"));
        assert_eq!(driver.value_of("input[name=\"amount\"]").as_deref(), Some("25.5"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_renew_markup_preferred_over_caneditamount() {
        let mut driver = edit_form();
        for value in ["0", "1"] {
            driver.remove_element(format!("input[name=\"caneditamount\"][value=\"{value}\"]"));
            driver = driver.with_element(
                format!("input[name=\"auto_renew\"][value=\"{value}\"]"),
                MockElement::visible(),
            );
        }
        let ctx = PageContext::new(&driver, "http://erp").with_timeouts(fast());
        let bundle = FieldBundle::new()
            .with("subscription", true)
            .with("auto_renew", true);
        let report = MemberTypePage::new(&ctx).edit_fields(&bundle).await.unwrap();
        assert!(driver.is_checked("input[name=\"auto_renew\"][value=\"1\"]"));
        assert!(report
            .resolved
            .iter()
            .any(|r| r.selector == "input[name=\"auto_renew\"][value=\"1\"]" && r.index == 0));
        assert!(!driver.probed().iter().any(|s| s.contains("caneditamount")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_duration_unit_left_untouched() {
        let driver = edit_form();
        let ctx = PageContext::new(&driver, "http://erp").with_timeouts(fast());
        let edit: MemberTypeEdit =
            serde_json::from_str(r#"{"duracionTipo": "", "duracionValor": ""}"#).unwrap();
        let report = MemberTypePage::new(&ctx).edit_member_type(&edit).await.unwrap();
        assert!(!driver.was_called("select:select[name=\"duration_unit\"]"));
        assert_eq!(driver.value_of("input[name=\"duration_value\"]").as_deref(), Some(""));
        assert!(report.passed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_banner_fails_even_when_optimistic() {
        let driver = edit_form().on_click(
            "input[type=\"submit\"][name=\"update\"]",
            MockEffect::new().show("div.error", MockElement::visible().with_text("Label required")),
        );
        let ctx = PageContext::new(&driver, "http://erp").with_timeouts(fast());
        let bundle = FieldBundle::new().with("status", "Activo");
        let report = MemberTypePage::new(&ctx).edit_fields(&bundle).await.unwrap();
        assert!(report.verdict.is_failure());
        assert!(!report.passed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_loads_edit_url() {
        let driver = MockDriver::new();
        let ctx = PageContext::new(&driver, "http://erp").with_timeouts(fast());
        MemberTypePage::new(&ctx).open(3).await.unwrap();
        assert_eq!(
            driver.current_url().await.unwrap(),
            "http://erp/adherents/type.php?action=edit&rowid=3"
        );
    }
}
