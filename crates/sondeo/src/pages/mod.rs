//! Dolibarr page objects.
//!
//! Each page declares candidate lists for its fields and the outcome signals
//! of its operations, then delegates to [`crate::page_object::run_operation`].
//! Markup differences between Dolibarr versions and locales are absorbed
//! here, inside the candidate lists, never by separate page variants.

mod login;
mod member;
mod member_type;
mod product;
mod stock;
mod third_party;

pub use login::{Credentials, LoginPage};
pub use member::{MemberData, MemberNature, MemberPage};
pub use member_type::{MemberTypeEdit, MemberTypePage};
pub use product::{product_id_in, ProductData, ProductPage};
pub use stock::{StockMovement, StockPage, WarehouseData};
pub use third_party::{ThirdPartyData, ThirdPartyPage};

use crate::classifier::{OutcomeSignal, SignalCheck};
use crate::locator::CandidateSelector;
use crate::result::SondeoResult;

/// Build a candidate list from a preferred selector and its fallbacks
pub(crate) fn candidates(name: &str, first: &str, fallbacks: &[&str]) -> CandidateSelector {
    fallbacks
        .iter()
        .fold(CandidateSelector::first(name, first), |c, s| c.or(*s))
}

/// `input[name="<field>"][value="<value>"]`, the radio markup Dolibarr uses
pub(crate) fn radio(field: &str, value: &str) -> CandidateSelector {
    CandidateSelector::first(
        format!("{field}={value}"),
        format!("input[name=\"{field}\"][value=\"{value}\"]"),
    )
    .or(format!("input[type=\"radio\"][name=\"{field}\"][value=\"{value}\"]"))
}

/// Error banner shown after a rejected submit
pub(crate) fn error_banner(first: &str, fallbacks: &[&str]) -> OutcomeSignal {
    OutcomeSignal::failure(
        "error banner",
        SignalCheck::ElementVisible(candidates("error banner", first, fallbacks)),
    )
}

/// Confirmation banner shown after a saved record
pub(crate) fn success_banner() -> OutcomeSignal {
    OutcomeSignal::success(
        "success banner",
        SignalCheck::ElementVisible(candidates("success banner", ".ok", &["div.ok", ".mesgs"])),
    )
    .with_priority(0)
}

/// Redirect to the card of a newly created record
pub(crate) fn record_id() -> SondeoResult<OutcomeSignal> {
    Ok(OutcomeSignal::success("record id in url", SignalCheck::new_record_id()?).with_priority(1))
}

/// The submit control of the originating form is gone
pub(crate) fn form_gone(submit: &CandidateSelector) -> OutcomeSignal {
    OutcomeSignal::success("form gone", SignalCheck::ElementGone(submit.clone())).with_priority(2)
}

/// The record card shows the name just entered
pub(crate) fn name_marker(name: &str) -> Option<OutcomeSignal> {
    let name = name.trim();
    (!name.is_empty()).then(|| {
        OutcomeSignal::success("name in title", SignalCheck::TitleContains(name.to_string()))
            .with_priority(3)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::classifier::Polarity;

    #[test]
    fn test_candidates_keep_order() {
        let c = candidates("x", "#a", &["#b", "#c"]);
        assert_eq!(c.described(), vec!["#a", "#b", "#c"]);
        assert_eq!(c.name(), "x");
        assert_eq!(candidates("y", "#only", &[]).described(), vec!["#only"]);
    }

    #[test]
    fn test_radio_markup() {
        let c = radio("morphy", "phy");
        assert_eq!(c.described()[0], "input[name=\"morphy\"][value=\"phy\"]");
        assert_eq!(c.name(), "morphy=phy");
    }

    #[test]
    fn test_signal_polarities() {
        assert_eq!(error_banner(".error", &[]).polarity(), Polarity::Failure);
        assert_eq!(success_banner().polarity(), Polarity::Success);
        assert_eq!(record_id().unwrap().priority(), 1);
        assert!(name_marker("  ").is_none());
        assert_eq!(name_marker("Acme").unwrap().priority(), 3);
    }
}
