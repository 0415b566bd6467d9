//! New third party form.

use serde::{Deserialize, Serialize};

use super::{candidates, error_banner, form_gone, name_marker, radio, record_id, success_banner};
use crate::locator::CandidateSelector;
use crate::page_object::{
    run_operation, Choice, FieldBundle, FieldSpec, FieldValue, NavigationPlan, NavigationRoute,
    Operation, OperationReport, PageContext, PageObject,
};
use crate::result::SondeoResult;

/// Values for a new third party; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThirdPartyData {
    /// Third party name
    #[serde(alias = "nombre")]
    pub name: Option<String>,
    /// Customer type label ("Cliente potencial", "Cliente", ...)
    #[serde(alias = "tipoCliente")]
    pub customer_type: Option<String>,
    /// Whether it is a supplier
    #[serde(alias = "proveedor")]
    pub supplier: Option<bool>,
}

impl ThirdPartyData {
    /// As a field bundle
    #[must_use]
    pub fn to_bundle(&self) -> FieldBundle {
        FieldBundle::new()
            .with_opt("name", self.name.as_deref())
            .with_opt("customer_type", self.customer_type.as_deref())
            .with_opt("supplier", self.supplier)
    }
}

/// The Dolibarr "New third party" card
#[derive(Debug, Clone)]
pub struct ThirdPartyPage<'a> {
    ctx: PageContext<'a>,
    submit: CandidateSelector,
}

impl PageObject for ThirdPartyPage<'_> {
    fn url_pattern(&self) -> &str {
        "/societe/card.php"
    }

    fn page_name(&self) -> &str {
        "third party"
    }
}

impl<'a> ThirdPartyPage<'a> {
    /// Bind the third party page to a context
    #[must_use]
    pub fn new(ctx: &PageContext<'a>) -> Self {
        Self {
            ctx: ctx.clone(),
            submit: candidates(
                "create button",
                "input[type=\"submit\"][name=\"create\"]",
                &[
                    "input.button[value*=\"Create\"]",
                    "input.button[value*=\"Crear\"]",
                ],
            ),
        }
    }

    fn navigation() -> NavigationPlan {
        NavigationPlan::direct("/societe/card.php?action=create&mainmenu=companies&leftmenu=")
            .step(candidates(
                "third parties menu",
                "a[href*=\"societe/index.php\"]",
                &[
                    "a[href*=\"mainmenu=companies\"]",
                    "a[href*=\"societe/list.php\"]",
                    "div#mainmenutd_companies a",
                ],
            ))
            .step(candidates(
                "new third party",
                "a[href*=\"card.php?action=create\"]",
                &[
                    "a.butAction:has-text(\"New third party\")",
                    "a.butAction:has-text(\"Nuevo tercero\")",
                    "a:has-text(\"New third party\")",
                ],
            ))
    }

    /// Open the new third party form through the menu, or its URL
    pub async fn open(&self) -> SondeoResult<NavigationRoute> {
        Self::navigation().navigate(&self.ctx).await
    }

    /// The create operation; `marker` is the name expected on the new card
    pub fn create_operation(&self, marker: Option<&str>) -> SondeoResult<Operation> {
        let mut operation = Operation::new("create_third_party", self.page_name(), self.submit.clone())
            .field(FieldSpec::input(
                "name",
                candidates("name", "input[name=\"name\"]", &["#name", "input[name=\"nom\"]"]),
            ))
            .field(FieldSpec::radio(
                "customer_type",
                vec![
                    Choice::new(
                        [
                            "2",
                            "Cliente potencial",
                            "Cliente potencial / Cliente",
                            "prospect",
                            "prospect / customer",
                        ],
                        radio("client", "2"),
                    ),
                    Choice::new(["1", "Cliente", "customer"], radio("client", "1")),
                    Choice::new(
                        ["0", "Ni cliente ni cliente potencial", "none", "neither"],
                        radio("client", "0"),
                    ),
                ],
            ))
            .field(FieldSpec::radio(
                "supplier",
                vec![
                    Choice::new(["true", "yes", "sí", "1"], radio("fournisseur", "1")),
                    Choice::new(["false", "no", "0"], radio("fournisseur", "0")),
                ],
            ))
            .signal(error_banner(".error", &["div.error"]))
            .signal(success_banner())
            .signal(record_id()?)
            .signal(form_gone(&self.submit));
        if let Some(signal) = marker.and_then(name_marker) {
            operation = operation.signal(signal);
        }
        Ok(operation)
    }

    /// Submit the form with arbitrary third party fields
    pub async fn create_third_party_fields(&self, bundle: &FieldBundle) -> SondeoResult<OperationReport> {
        let marker = bundle.get("name").map(FieldValue::as_text);
        let operation = self.create_operation(marker.as_deref())?;
        run_operation(&self.ctx, &operation, bundle).await
    }

    /// Create a third party
    pub async fn create_third_party(&self, data: &ThirdPartyData) -> SondeoResult<OperationReport> {
        self.create_third_party_fields(&data.to_bundle()).await
    }
}
