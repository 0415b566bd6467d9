//! Suite files
//!
//! A suite is a YAML document naming a list of cases. Each case runs one
//! page-object operation and states the outcome it expects:
//!
//! ```yaml
//! name: members
//! cases:
//!   - name: member without first name is rejected
//!     expect: failure
//!     step:
//!       action: create_individual_member
//!       data: { tipo: "Estándar", nombre: "", apellidos: "Pérez" }
//! ```

use serde::{Deserialize, Serialize};
use sondeo::pages::{
    Credentials, MemberData, MemberTypeEdit, ProductData, StockMovement, ThirdPartyData,
    WarehouseData,
};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{CliError, CliResult};

/// Outcome a case expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expect {
    /// The verdict passes under the operation's policy
    #[default]
    Pass,
    /// A success signal fired
    Success,
    /// A failure signal fired
    Failure,
    /// Nothing fired within the bounds
    Unknown,
    /// The verdict does not pass: a failure signal fired, or nothing did
    Rejected,
    /// The operation itself errored (unresolvable field, navigation)
    Error,
    /// Any outcome; the observation is only recorded
    Any,
}

impl fmt::Display for Expect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pass => "pass",
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Unknown => "unknown",
            Self::Rejected => "rejected",
            Self::Error => "error",
            Self::Any => "any",
        };
        f.write_str(name)
    }
}

/// The operation a case performs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Submit the login form; the configured account is used when absent
    Login {
        /// Credentials override
        #[serde(default)]
        credentials: Option<Credentials>,
    },
    /// Log out
    Logout,
    /// Create a member of nature "individual"
    CreateIndividualMember {
        /// Member values
        data: MemberData,
    },
    /// Create a member of nature "corporate"
    CreateCorporateMember {
        /// Member values
        data: MemberData,
    },
    /// Create a third party
    CreateThirdParty {
        /// Third party values
        data: ThirdPartyData,
    },
    /// Edit an existing member type
    EditMemberType {
        /// Row id of the member type
        type_id: u32,
        /// Fields to change
        data: MemberTypeEdit,
    },
    /// Create a product
    CreateProduct {
        /// Product values
        data: ProductData,
    },
    /// Create a product, optionally move stock into it, then delete it
    DeleteProduct {
        /// Product to create first
        product: ProductData,
        /// Stock entry recorded before the deletion
        #[serde(default)]
        stock: Option<StockMovement>,
    },
    /// Record a stock movement; the first listed product is used when no id
    /// is given
    CorrectStock {
        /// Row id of the product
        #[serde(default)]
        product_id: Option<u32>,
        /// Movement values
        data: StockMovement,
    },
    /// Create a warehouse
    CreateWarehouse {
        /// Warehouse values
        data: WarehouseData,
    },
    /// Edit an existing warehouse
    EditWarehouse {
        /// Row id of the warehouse
        warehouse_id: u32,
        /// Fields to change
        data: WarehouseData,
    },
}

impl Step {
    /// Action name as written in suite files
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::Login { .. } => "login",
            Self::Logout => "logout",
            Self::CreateIndividualMember { .. } => "create_individual_member",
            Self::CreateCorporateMember { .. } => "create_corporate_member",
            Self::CreateThirdParty { .. } => "create_third_party",
            Self::EditMemberType { .. } => "edit_member_type",
            Self::CreateProduct { .. } => "create_product",
            Self::DeleteProduct { .. } => "delete_product",
            Self::CorrectStock { .. } => "correct_stock",
            Self::CreateWarehouse { .. } => "create_warehouse",
            Self::EditWarehouse { .. } => "edit_warehouse",
        }
    }

    /// Whether the case needs a fresh session before it runs
    #[must_use]
    pub const fn needs_session(&self) -> bool {
        !matches!(self, Self::Login { .. })
    }
}

const fn default_login() -> bool {
    true
}

/// One case of a suite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Case {
    /// Case name, unique within the suite
    pub name: String,
    /// Expected outcome
    #[serde(default)]
    pub expect: Expect,
    /// Log in with the configured account before the step
    #[serde(default = "default_login")]
    pub login: bool,
    /// The operation
    pub step: Step,
}

impl Case {
    /// Whether the runner logs in before the step
    #[must_use]
    pub const fn logs_in_first(&self) -> bool {
        self.login && self.step.needs_session()
    }
}

/// A named list of cases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Suite {
    /// Suite name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
    /// Cases, run in order
    pub cases: Vec<Case>,
}

impl Suite {
    /// Parse a suite; `origin` names the source in errors
    pub fn from_yaml_str(yaml: &str, origin: &str) -> CliResult<Self> {
        let suite: Self =
            serde_yaml_ng::from_str(yaml).map_err(|e| CliError::suite(origin, e.to_string()))?;
        suite.validate(origin)?;
        Ok(suite)
    }

    /// Read and parse a suite file
    pub fn load(path: &Path) -> CliResult<Self> {
        let origin = path.display().to_string();
        let yaml = std::fs::read_to_string(path).map_err(|e| CliError::suite(&origin, e.to_string()))?;
        Self::from_yaml_str(&yaml, &origin)
    }

    fn validate(&self, origin: &str) -> CliResult<()> {
        if self.name.trim().is_empty() {
            return Err(CliError::suite(origin, "suite name must not be empty"));
        }
        if self.cases.is_empty() {
            return Err(CliError::suite(origin, "suite has no cases"));
        }
        let mut seen = HashSet::new();
        for case in &self.cases {
            if case.name.trim().is_empty() {
                return Err(CliError::suite(origin, "case name must not be empty"));
            }
            if !seen.insert(case.name.as_str()) {
                return Err(CliError::suite(
                    origin,
                    format!("duplicate case name '{}'", case.name),
                ));
            }
        }
        Ok(())
    }

    /// Cases whose name contains `filter`, or every case
    pub fn selected<'s>(&'s self, filter: Option<&'s str>) -> impl Iterator<Item = &'s Case> + 's {
        self.cases
            .iter()
            .filter(move |c| filter.map_or(true, |f| c.name.contains(f)))
    }
}

/// Expand directories into their `.yaml`/`.yml` files, sorted by name
pub fn collect_suite_files(paths: &[PathBuf]) -> CliResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(path)?
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|p| {
                    p.is_file()
                        && p.extension()
                            .is_some_and(|ext| ext == "yaml" || ext == "yml")
                })
                .collect();
            found.sort();
            files.extend(found);
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            return Err(CliError::suite(path.display().to_string(), "no such file or directory"));
        }
    }
    if files.is_empty() {
        return Err(CliError::invalid_argument("no suite files found"));
    }
    Ok(files)
}

/// Load every suite under `paths`
pub fn load_suites(paths: &[PathBuf]) -> CliResult<Vec<Suite>> {
    collect_suite_files(paths)?
        .iter()
        .map(|path| Suite::load(path))
        .collect()
}
