//! New member form.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{candidates, error_banner, form_gone, name_marker, radio, record_id, success_banner};
use crate::driver::SelectBy;
use crate::locator::CandidateSelector;
use crate::page_object::{
    run_operation, Choice, FieldBundle, FieldSpec, NavigationPlan, NavigationRoute, Operation,
    OperationReport, PageContext, PageObject,
};
use crate::result::SondeoResult;

/// The form re-renders its name/company block after the nature radio changes
const NATURE_SETTLE: Duration = Duration::from_millis(500);

/// Legal nature of a member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberNature {
    /// A person (`morphy=phy`)
    Individual,
    /// A company (`morphy=mor`)
    Corporate,
}

impl MemberNature {
    /// Bundle value for the nature field
    #[must_use]
    pub const fn as_value(self) -> &'static str {
        match self {
            Self::Individual => "phy",
            Self::Corporate => "mor",
        }
    }
}

/// Values for a new member; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberData {
    /// Member type, by its label
    #[serde(alias = "tipo")]
    pub member_type: Option<String>,
    /// First name
    #[serde(alias = "nombre")]
    pub first_name: Option<String>,
    /// Last name
    #[serde(alias = "apellidos")]
    pub last_name: Option<String>,
    /// Company name
    #[serde(alias = "empresa")]
    pub company: Option<String>,
}

impl MemberData {
    /// As a field bundle for the given nature
    #[must_use]
    pub fn to_bundle(&self, nature: MemberNature) -> FieldBundle {
        FieldBundle::new()
            .with_opt("type", self.member_type.as_deref())
            .with("nature", nature.as_value())
            .with_opt("firstname", self.first_name.as_deref())
            .with_opt("lastname", self.last_name.as_deref())
            .with_opt("company", self.company.as_deref())
    }
}

/// The Dolibarr "New member" card
#[derive(Debug, Clone)]
pub struct MemberPage<'a> {
    ctx: PageContext<'a>,
    submit: CandidateSelector,
}

impl PageObject for MemberPage<'_> {
    fn url_pattern(&self) -> &str {
        "/adherents/card.php"
    }

    fn page_name(&self) -> &str {
        "member"
    }
}

impl<'a> MemberPage<'a> {
    /// Bind the member page to a context
    #[must_use]
    pub fn new(ctx: &PageContext<'a>) -> Self {
        Self {
            ctx: ctx.clone(),
            submit: candidates(
                "create button",
                "input[type=\"submit\"][name=\"add\"]",
                &[
                    "input.button[value*=\"Create\"]",
                    "input.button[value*=\"Crear\"]",
                ],
            ),
        }
    }

    fn navigation() -> NavigationPlan {
        NavigationPlan::direct("/adherents/card.php?action=create&mainmenu=members&leftmenu=")
            .step(candidates(
                "members menu",
                "a[href*=\"adherents/index.php\"]",
                &[
                    "a.tmenuimage[title*=\"Member\"]",
                    "div#mainmenutd_members a",
                    "a[href*=\"mainmenu=members\"]",
                ],
            ))
            .step(candidates(
                "new member",
                "a[href*=\"card.php?action=create\"]",
                &[
                    "a.butAction:has-text(\"New member\")",
                    "a.butAction:has-text(\"Nuevo\")",
                    "a:has-text(\"New member\")",
                ],
            ))
    }

    /// Open the new member form through the menu, or its URL
    pub async fn open(&self) -> SondeoResult<NavigationRoute> {
        Self::navigation().navigate(&self.ctx).await
    }

    /// The create operation; `marker` is the name expected on the new card
    pub fn create_operation(&self, marker: Option<&str>) -> SondeoResult<Operation> {
        let mut operation = Operation::new("create_member", self.page_name(), self.submit.clone())
            .field(FieldSpec::select(
                "type",
                candidates("member type", "select[name=\"typeid\"]", &["#typeid"]),
                SelectBy::Label,
            ))
            .field(
                FieldSpec::radio(
                    "nature",
                    vec![
                        Choice::new(["phy", "Individual", "physical"], radio("morphy", "phy")),
                        Choice::new(
                            ["mor", "Corporación", "Corporacion", "Corporate", "moral"],
                            radio("morphy", "mor"),
                        ),
                    ],
                )
                .with_settle(NATURE_SETTLE),
            )
            .field(FieldSpec::input(
                "firstname",
                candidates("first name", "input[name=\"firstname\"]", &["#firstname"]),
            ))
            .field(FieldSpec::input(
                "lastname",
                candidates("last name", "input[name=\"lastname\"]", &["#lastname"]),
            ))
            .field(FieldSpec::input(
                "company",
                candidates("company", "input[name=\"company\"]", &["#company", "input[name=\"societe\"]"]),
            ))
            .signal(error_banner(".error", &["div.error", ".warning"]))
            .signal(success_banner())
            .signal(record_id()?)
            .signal(form_gone(&self.submit));
        if let Some(signal) = marker.and_then(name_marker) {
            operation = operation.signal(signal);
        }
        Ok(operation)
    }

    /// Submit the form with arbitrary member fields
    pub async fn create_member(&self, bundle: &FieldBundle) -> SondeoResult<OperationReport> {
        let marker = ["lastname", "company"]
            .iter()
            .find_map(|f| bundle.get(f).map(crate::page_object::FieldValue::as_text));
        let operation = self.create_operation(marker.as_deref())?;
        run_operation(&self.ctx, &operation, bundle).await
    }

    /// Create a member of nature "individual"
    pub async fn create_individual_member(&self, data: &MemberData) -> SondeoResult<OperationReport> {
        self.create_member(&data.to_bundle(MemberNature::Individual))
            .await
    }

    /// Create a member of nature "corporate"
    pub async fn create_corporate_member(&self, data: &MemberData) -> SondeoResult<OperationReport> {
        self.create_member(&data.to_bundle(MemberNature::Corporate))
            .await
    }
}
