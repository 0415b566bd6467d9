//! Product card: creation and deletion.

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{candidates, error_banner, form_gone, name_marker, record_id, success_banner};
use crate::classifier::{OutcomeSignal, SignalCheck};
use crate::locator::CandidateSelector;
use crate::page_object::{
    run_operation, FieldBundle, FieldSpec, FieldValue, NavigationPlan, NavigationRoute, Operation,
    OperationReport, PageContext, PageObject,
};
use crate::result::{SondeoError, SondeoResult};

const CARD_PATH: &str = "/product/card.php";

/// Values for a new product; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductData {
    /// Product reference, unique per instance
    #[serde(alias = "ref", alias = "referencia")]
    pub reference: Option<String>,
    /// Product label
    #[serde(alias = "etiqueta")]
    pub label: Option<String>,
    /// Selling price
    #[serde(alias = "precio")]
    pub price: Option<FieldValue>,
}

impl ProductData {
    /// As a field bundle
    #[must_use]
    pub fn to_bundle(&self) -> FieldBundle {
        FieldBundle::new()
            .with_opt("reference", self.reference.as_deref())
            .with_opt("label", self.label.as_deref())
            .with_opt("price", self.price.clone())
    }
}

/// Product id carried by a product card URL
#[must_use]
pub fn product_id_in(url: &str) -> Option<u32> {
    Regex::new(r"/product/card\.php\?(?:.*&)?id=(\d+)")
        .ok()?
        .captures(url)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

/// The Dolibarr product card
#[derive(Debug, Clone)]
pub struct ProductPage<'a> {
    ctx: PageContext<'a>,
    create: CandidateSelector,
}

impl PageObject for ProductPage<'_> {
    fn url_pattern(&self) -> &str {
        CARD_PATH
    }

    fn page_name(&self) -> &str {
        "product"
    }
}

impl<'a> ProductPage<'a> {
    /// Bind the product page to a context
    #[must_use]
    pub fn new(ctx: &PageContext<'a>) -> Self {
        Self {
            ctx: ctx.clone(),
            create: candidates(
                "create button",
                "input[type=\"submit\"][name=\"create\"]",
                &[
                    "input[type=\"submit\"][name=\"add\"]",
                    "input[type=\"submit\"][value*=\"Create\"]",
                    "button:has-text(\"Create\")",
                    "input.button[value*=\"Crear\"]",
                ],
            ),
        }
    }

    fn navigation() -> NavigationPlan {
        NavigationPlan::direct("/product/card.php?action=create&type=0")
            .step(candidates(
                "products menu",
                "a[href*=\"mainmenu=products\"]",
                &["div#mainmenutd_products a", "a[href*=\"product/index.php\"]"],
            ))
            .step(candidates(
                "new product",
                "a[href*=\"product/card.php?action=create&type=0\"]",
                &[
                    "a[href*=\"product/card.php?leftmenu=product&action=create&type=0\"]",
                    "a:has-text(\"New product\")",
                    "a:has-text(\"Nuevo producto\")",
                ],
            ))
    }

    /// Open the new product form through the menu, or its URL
    pub async fn open(&self) -> SondeoResult<NavigationRoute> {
        Self::navigation().navigate(&self.ctx).await
    }

    /// Load the card of an existing product
    pub async fn open_card(&self, product_id: u32) -> SondeoResult<()> {
        self.ctx.goto(&format!("{CARD_PATH}?id={product_id}")).await
    }

    /// Product id of the card the browser is on
    pub async fn current_id(&self) -> SondeoResult<Option<u32>> {
        Ok(product_id_in(&self.ctx.driver().current_url().await?))
    }

    /// The create operation; `marker` is the reference expected on the new card
    pub fn create_operation(&self, marker: Option<&str>) -> SondeoResult<Operation> {
        let mut operation = Operation::new("create_product", self.page_name(), self.create.clone())
            .field(FieldSpec::input(
                "reference",
                candidates("reference", "input[name=\"ref\"]", &["#ref"]),
            ))
            .field(FieldSpec::input(
                "label",
                candidates("label", "input[name=\"label\"]", &["#label"]),
            ))
            .field(FieldSpec::input(
                "price",
                candidates("price", "input[name=\"price\"]", &["#price"]),
            ))
            .signal(error_banner(".error", &["div.error", ".errors"]))
            .signal(success_banner())
            .signal(record_id()?)
            .signal(form_gone(&self.create));
        if let Some(signal) = marker.and_then(name_marker) {
            operation = operation.signal(signal);
        }
        Ok(operation)
    }

    /// Submit the form with arbitrary product fields
    pub async fn create_product_fields(&self, bundle: &FieldBundle) -> SondeoResult<OperationReport> {
        let marker = bundle.get("reference").map(FieldValue::as_text);
        let operation = self.create_operation(marker.as_deref())?;
        run_operation(&self.ctx, &operation, bundle).await
    }

    /// Create a product
    pub async fn create_product(&self, data: &ProductData) -> SondeoResult<OperationReport> {
        self.create_product_fields(&data.to_bundle()).await
    }

    /// The delete operation on an open product card. Dolibarr asks for
    /// confirmation; a product it refuses to delete shows an error or a
    /// greyed out delete button instead.
    pub fn delete_operation(&self) -> SondeoResult<Operation> {
        let back_to_list = Regex::new(r"/product/list\.php").map_err(|e| SondeoError::InvalidSelector {
            message: e.to_string(),
        })?;
        Ok(Operation::new(
            "delete_product",
            self.page_name(),
            candidates(
                "delete button",
                "a[href*=\"action=delete\"]",
                &[
                    "a.butActionDelete",
                    "button:has-text(\"Delete\")",
                    "a:has-text(\"Delete\")",
                    "a:has-text(\"Eliminar\")",
                ],
            ),
        )
        .with_confirmation(candidates(
            "confirm button",
            "input[type=\"submit\"][name=\"confirm\"]",
            &[
                "button:has-text(\"Yes\")",
                "input[value=\"Yes\"]",
                "button:has-text(\"Sí\")",
            ],
        ))
        .signal(error_banner(".error", &["div.error", ".errors", ".warning"]))
        .signal(OutcomeSignal::failure(
            "delete refused",
            SignalCheck::ElementVisible(candidates(
                "refused delete button",
                "a.butActionRefused:has-text(\"Delete\")",
                &[
                    "span.butActionRefused:has-text(\"Delete\")",
                    "a.butActionRefused:has-text(\"Eliminar\")",
                ],
            )),
        ))
        .signal(success_banner())
        .signal(
            OutcomeSignal::success("back to product list", SignalCheck::UrlMatches(back_to_list))
                .with_priority(1),
        ))
    }

    /// Delete the product whose card is open
    pub async fn delete_product(&self) -> SondeoResult<OperationReport> {
        run_operation(&self.ctx, &self.delete_operation()?, &FieldBundle::new()).await
    }
}
