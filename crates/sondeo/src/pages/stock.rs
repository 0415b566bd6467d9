//! Stock screens: warehouses and stock corrections.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{candidates, error_banner, form_gone, name_marker, record_id, success_banner};
use crate::classifier::{OutcomeSignal, SignalCheck, UnknownPolicy};
use crate::driver::SelectBy;
use crate::page_object::{
    run_operation, Choice, FieldBundle, FieldSpec, FieldValue, NavigationPlan, NavigationRoute,
    Operation, OperationReport, PageContext, PageObject,
};
use crate::result::SondeoResult;

const WAREHOUSE_PATH: &str = "/product/stock/card.php";
const MASS_MOVE_PATH: &str = "/product/stock/massstockmove.php?init=1";

/// A stock correction on one product
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StockMovement {
    /// Warehouse label
    #[serde(alias = "almacen")]
    pub warehouse: Option<String>,
    /// "add" or "remove"
    #[serde(alias = "tipoMovimiento")]
    pub movement: Option<String>,
    /// Units moved
    #[serde(alias = "cantidad")]
    pub quantity: Option<FieldValue>,
    /// Unit purchase price
    #[serde(alias = "precio")]
    pub price: Option<FieldValue>,
}

impl StockMovement {
    /// As a field bundle
    #[must_use]
    pub fn to_bundle(&self) -> FieldBundle {
        FieldBundle::new()
            .with_opt("warehouse", self.warehouse.as_deref())
            .with_opt("movement", self.movement.as_deref())
            .with_opt("quantity", self.quantity.clone())
            .with_opt("price", self.price.clone())
    }
}

/// Values for a warehouse; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseData {
    /// Warehouse reference
    #[serde(alias = "ref", alias = "referencia")]
    pub reference: Option<String>,
    /// Short location name
    #[serde(alias = "ubicacion", alias = "lieu")]
    pub location: Option<String>,
    /// "Open" or "Closed"
    #[serde(alias = "estado")]
    pub status: Option<String>,
}

impl WarehouseData {
    /// As a field bundle
    #[must_use]
    pub fn to_bundle(&self) -> FieldBundle {
        FieldBundle::new()
            .with_opt("reference", self.reference.as_deref())
            .with_opt("location", self.location.as_deref())
            .with_opt("status", self.status.as_deref())
    }
}

/// Dolibarr stock screens
#[derive(Debug, Clone)]
pub struct StockPage<'a> {
    ctx: PageContext<'a>,
}

impl PageObject for StockPage<'_> {
    fn url_pattern(&self) -> &str {
        WAREHOUSE_PATH
    }

    fn page_name(&self) -> &str {
        "stock"
    }
}

fn warehouse_fields(operation: Operation) -> Operation {
    operation
        .field(FieldSpec::input(
            "reference",
            candidates(
                "reference",
                "input[name=\"libelle\"]",
                &["input[name=\"ref\"]", "input[name=\"label\"]"],
            ),
        ))
        .field(FieldSpec::input(
            "location",
            candidates("location", "input[name=\"lieu\"]", &["input[name=\"location\"]"]),
        ))
        .field(
            FieldSpec::select(
                "status",
                candidates("status", "select[name=\"statut\"]", &["#statut"]),
                SelectBy::Value,
            )
            .with_choices(vec![
                Choice::new(["Open", "Abierto", "1"], "1".to_string()),
                Choice::new(["Closed", "Cerrado", "0"], "0".to_string()),
            ]),
        )
        .signal(error_banner(".error", &["div.error", ".errors"]))
        .signal(success_banner())
}

impl<'a> StockPage<'a> {
    /// Bind the stock screens to a context
    #[must_use]
    pub fn new(ctx: &PageContext<'a>) -> Self {
        Self { ctx: ctx.clone() }
    }

    fn correction_navigation() -> NavigationPlan {
        NavigationPlan::direct(MASS_MOVE_PATH).step(candidates(
            "stock correction",
            "a:has-text(\"Correct stock\")",
            &[
                "a:has-text(\"Add stock\")",
                "a:has-text(\"Corriger stock\")",
                "a:has-text(\"Modifier stock\")",
                "a[href*=\"stock\"][href*=\"action=\"]",
                "a[href*=\"correction\"]",
            ],
        ))
    }

    /// Open the stock correction form of a product, or of the first product
    /// listed when `product_id` is `None`. Without a correction link the
    /// mass stock movement screen is loaded instead.
    pub async fn open_correction(&self, product_id: Option<u32>) -> SondeoResult<NavigationRoute> {
        match product_id {
            Some(id) => self.ctx.goto(&format!("/product/card.php?id={id}")).await?,
            None => {
                self.ctx.goto("/product/list.php?type=0").await?;
                let first = candidates(
                    "first product",
                    "a[href*=\"/product/card.php?id=\"]",
                    &["table.liste a[href*=\"card.php?id=\"]"],
                );
                match self.ctx.resolver().resolve(&first).await.into_handle() {
                    Some(link) => link.click().await?,
                    None => debug!("product list is empty"),
                }
            }
        }
        Self::correction_navigation().navigate(&self.ctx).await
    }

    /// The stock correction operation
    #[must_use]
    pub fn correction_operation(&self) -> Operation {
        let submit = candidates(
            "save button",
            "input[type=\"submit\"][name=\"save\"]",
            &[
                "input[type=\"submit\"][value*=\"Save\"]",
                "input[type=\"submit\"][value*=\"Enregistrer\"]",
                "button:has-text(\"Save\")",
            ],
        );
        Operation::new("correct_stock", self.page_name(), submit.clone())
            .field(FieldSpec::select(
                "warehouse",
                candidates(
                    "warehouse",
                    "select[name=\"idwarehouse\"]",
                    &[
                        "select[name=\"warehouse_id\"]",
                        "select[name=\"entrepot\"]",
                        "select[name=\"id_tw\"]",
                    ],
                ),
                SelectBy::Label,
            ))
            .field(
                FieldSpec::select(
                    "movement",
                    candidates("movement", "select[name=\"mouvement\"]", &[]),
                    SelectBy::Value,
                )
                .with_choices(vec![
                    Choice::new(["add", "entrada", "0"], "0".to_string()),
                    Choice::new(["remove", "salida", "1"], "1".to_string()),
                ]),
            )
            .field(FieldSpec::input(
                "quantity",
                candidates(
                    "quantity",
                    "input[name=\"nbpiece\"]",
                    &["input[name=\"qty\"]", "input[name=\"qtymouvement\"]"],
                ),
            ))
            .field(FieldSpec::input(
                "price",
                candidates(
                    "price",
                    "input[name=\"price\"]",
                    &["input[name=\"price_unit\"]", "input[name=\"unitprice\"]"],
                ),
            ))
            .signal(error_banner(".error", &["div.error", ".warning"]))
            .signal(success_banner())
            .signal(form_gone(&submit))
    }

    /// Submit the open correction form with arbitrary movement fields
    pub async fn correct_stock_fields(&self, bundle: &FieldBundle) -> SondeoResult<OperationReport> {
        run_operation(&self.ctx, &self.correction_operation(), bundle).await
    }

    /// Record a stock movement on the open correction form
    pub async fn correct_stock(&self, movement: &StockMovement) -> SondeoResult<OperationReport> {
        self.correct_stock_fields(&movement.to_bundle()).await
    }

    /// Open the new warehouse form through its link, or its URL
    pub async fn open_new_warehouse(&self) -> SondeoResult<NavigationRoute> {
        NavigationPlan::direct(format!("{WAREHOUSE_PATH}?action=create"))
            .step(candidates(
                "new warehouse",
                "a[href*=\"stock/card.php?action=create\"]",
                &["a:has-text(\"New warehouse\")", "a:has-text(\"Nuevo almacén\")"],
            ))
            .navigate(&self.ctx)
            .await
    }

    /// Load the edit form of a warehouse
    pub async fn open_warehouse_edit(&self, warehouse_id: u32) -> SondeoResult<()> {
        self.ctx
            .goto(&format!("{WAREHOUSE_PATH}?action=edit&id={warehouse_id}"))
            .await
    }

    /// The create warehouse operation; `marker` is the reference expected
    /// on the new card
    pub fn create_warehouse_operation(&self, marker: Option<&str>) -> SondeoResult<Operation> {
        let submit = candidates(
            "create button",
            "input[type=\"submit\"][name=\"add\"]",
            &[
                "role=button[name=\"Create\"]",
                "input[type=\"submit\"][value*=\"Create\"]",
                "input.button[value*=\"Crear\"]",
            ],
        );
        let mut operation = warehouse_fields(Operation::new(
            "create_warehouse",
            self.page_name(),
            submit.clone(),
        ))
        .signal(record_id()?)
        .signal(form_gone(&submit));
        if let Some(signal) = marker.and_then(name_marker) {
            operation = operation.signal(signal);
        }
        Ok(operation)
    }

    /// Create a warehouse on the open form
    pub async fn create_warehouse(&self, data: &WarehouseData) -> SondeoResult<OperationReport> {
        let bundle = data.to_bundle();
        let operation = self.create_warehouse_operation(data.reference.as_deref())?;
        run_operation(&self.ctx, &operation, &bundle).await
    }

    /// The edit warehouse operation. Like member type edits, a save with no
    /// banner counts as saved.
    #[must_use]
    pub fn edit_warehouse_operation(&self) -> Operation {
        let submit = candidates(
            "save button",
            "input[type=\"submit\"][name=\"save\"]",
            &[
                "input[type=\"submit\"][value*=\"Save\"]",
                "button:has-text(\"Save\")",
                "input.button[value*=\"Guardar\"]",
            ],
        );
        warehouse_fields(Operation::new("edit_warehouse", self.page_name(), submit.clone()))
            .signal(
                OutcomeSignal::success(
                    "left edit mode",
                    SignalCheck::UrlNotContains("action=edit".to_string()),
                )
                .with_priority(1),
            )
            .signal(form_gone(&submit))
            .with_policy(UnknownPolicy::Optimistic)
    }

    /// Save warehouse changes on the open edit form
    pub async fn edit_warehouse(&self, data: &WarehouseData) -> SondeoResult<OperationReport> {
        run_operation(&self.ctx, &self.edit_warehouse_operation(), &data.to_bundle()).await
    }
}
