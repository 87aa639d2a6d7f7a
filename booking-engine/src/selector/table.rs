//! Selector specs and the table of logical targets.
//!
//! The reservation site changes its markup without notice, so every
//! element the engine touches is named by a logical target and described
//! by an ordered list of locator strategies. Updating for a site change
//! means editing the table (or a JSON override file), not engine code.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::page::Locator;

use super::error::SelectorTableError;

/// Logical target names used by the booking engine.
pub mod targets {
    pub const POPUP_CLOSE: &str = "popup_close";

    pub const ORIGIN_INPUT: &str = "origin_input";
    pub const DESTINATION_INPUT: &str = "destination_input";
    pub const STATION_SUGGESTION: &str = "station_suggestion";
    pub const DATE_INPUT: &str = "date_input";
    pub const SEARCH_BUTTON: &str = "search_button";

    pub const RESULT_ENTRY: &str = "result_entry";
    pub const ENTRY_HEADING: &str = "entry_heading";
    pub const ENTRY_DEPARTURE: &str = "entry_departure";
    pub const ENTRY_ARRIVAL: &str = "entry_arrival";
    pub const ENTRY_DURATION: &str = "entry_duration";
    pub const ENTRY_DISTANCE: &str = "entry_distance";
    pub const ENTRY_CLASS_CELL: &str = "entry_class_cell";
    pub const CLASS_CELL_CODE: &str = "class_cell_code";
    pub const CLASS_CELL_STATUS: &str = "class_cell_status";

    /// Parameterized by `{train}` and `{class}`.
    pub const CLASS_OPTION: &str = "class_option";
    pub const CLASS_AVAILABILITY: &str = "class_availability";
    pub const BOOK_NOW: &str = "book_now";

    pub const LOGIN_BUTTON: &str = "login_button";
    pub const USERNAME_INPUT: &str = "username_input";
    pub const PASSWORD_INPUT: &str = "password_input";
    pub const CHALLENGE: &str = "challenge";
    pub const SIGN_IN_BUTTON: &str = "sign_in_button";
    pub const SESSION_EXPIRED: &str = "session_expired";

    pub const ADD_PASSENGER: &str = "add_passenger";
    pub const PASSENGER_NAME: &str = "passenger_name";
    pub const PASSENGER_AGE: &str = "passenger_age";
    pub const PASSENGER_GENDER: &str = "passenger_gender";
    pub const PASSENGER_BERTH: &str = "passenger_berth";
    pub const REQUIRED_FIELD: &str = "required_field";
    pub const PASSENGER_CONTINUE: &str = "passenger_continue";

    pub const PAYMENT_BUTTON: &str = "payment_button";
}

/// A logical target and its locator strategies in fallback order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorSpec {
    pub target: String,
    pub strategies: Vec<Locator>,
}

impl SelectorSpec {
    pub fn new(target: impl Into<String>, strategies: Vec<Locator>) -> Self {
        Self {
            target: target.into(),
            strategies,
        }
    }

    /// Substitute `{name}` placeholders in every strategy.
    pub fn bind(&self, params: &[(&str, &str)]) -> SelectorSpec {
        SelectorSpec {
            target: self.target.clone(),
            strategies: self.strategies.iter().map(|s| s.bind(params)).collect(),
        }
    }
}

/// All selector specs the engine knows, keyed by target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorTable {
    specs: BTreeMap<String, SelectorSpec>,
}

impl SelectorTable {
    /// An empty table.
    pub fn empty() -> Self {
        Self {
            specs: BTreeMap::new(),
        }
    }

    /// Insert or replace the strategies for `target`.
    pub fn with(mut self, target: &str, strategies: Vec<Locator>) -> Self {
        self.specs
            .insert(target.to_string(), SelectorSpec::new(target, strategies));
        self
    }

    /// Spec for `target`.
    ///
    /// An unknown target yields an empty spec, which the resolver refuses
    /// to retry.
    pub fn get(&self, target: &str) -> SelectorSpec {
        self.specs
            .get(target)
            .cloned()
            .unwrap_or_else(|| SelectorSpec::new(target, Vec::new()))
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Parse a JSON object mapping target names to strategy lists.
    pub fn from_json_str(json: &str) -> Result<Self, SelectorTableError> {
        let raw: BTreeMap<String, Vec<Locator>> = serde_json::from_str(json)?;
        let mut table = Self::empty();
        for (target, strategies) in raw {
            if strategies.is_empty() {
                return Err(SelectorTableError::Empty(target));
            }
            table = table.with(&target, strategies);
        }
        Ok(table)
    }

    /// Load overrides from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SelectorTableError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SelectorTableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Replace this table's entries with any present in `overrides`.
    pub fn merged(mut self, overrides: SelectorTable) -> Self {
        self.specs.extend(overrides.specs);
        self
    }
}

impl Default for SelectorTable {
    /// Strategies for the reservation site as last observed.
    fn default() -> Self {
        use targets::*;

        Self::empty()
            .with(
                POPUP_CLOSE,
                vec![
                    Locator::text_exact("button", "OK"),
                    Locator::attr_contains("button", "class", "close"),
                    Locator::attr_contains("span", "class", "close"),
                ],
            )
            .with(
                ORIGIN_INPUT,
                vec![
                    Locator::attr("input", "aria-controls", "pr_id_1_list"),
                    Locator::attr_contains("input", "placeholder", "From"),
                    Locator::attr("input", "id", "origin"),
                    Locator::position("input", 1),
                ],
            )
            .with(
                DESTINATION_INPUT,
                vec![
                    Locator::attr("input", "aria-controls", "pr_id_2_list"),
                    Locator::attr_contains("input", "placeholder", "To"),
                    Locator::attr("input", "id", "destination"),
                    Locator::position("input", 2),
                ],
            )
            .with(
                STATION_SUGGESTION,
                vec![
                    Locator::attr("li", "role", "option"),
                    Locator::attr_contains("li", "class", "ui-autocomplete-list-item"),
                ],
            )
            .with(
                DATE_INPUT,
                vec![
                    Locator::attr("input", "placeholder", "DD/MM/YYYY"),
                    Locator::attr("input", "id", "jDate"),
                    Locator::attr_contains("input", "class", "ui-calendar"),
                    Locator::position("input", 3),
                ],
            )
            .with(
                SEARCH_BUTTON,
                vec![
                    Locator::attr_contains("button", "class", "search_btn"),
                    Locator::text("button", "Search"),
                    Locator::attr("button", "type", "submit"),
                ],
            )
            .with(
                RESULT_ENTRY,
                vec![
                    Locator::attr_contains("div", "class", "bull-back"),
                    Locator::attr_contains("div", "class", "train-list-item"),
                    Locator::attr("div", "data-role", "train-result"),
                ],
            )
            .with(
                ENTRY_HEADING,
                vec![
                    Locator::attr_contains("div", "class", "train-heading"),
                    Locator::attr_contains("strong", "class", "train-name"),
                ],
            )
            .with(
                ENTRY_DEPARTURE,
                vec![
                    Locator::attr_contains("span", "class", "departure-time"),
                    Locator::attr("strong", "data-field", "departure"),
                ],
            )
            .with(
                ENTRY_ARRIVAL,
                vec![
                    Locator::attr_contains("span", "class", "arrival-time"),
                    Locator::attr("strong", "data-field", "arrival"),
                ],
            )
            .with(
                ENTRY_DURATION,
                vec![
                    Locator::attr_contains("span", "class", "duration"),
                    Locator::attr("span", "data-field", "duration"),
                ],
            )
            .with(
                ENTRY_DISTANCE,
                vec![
                    Locator::attr_contains("span", "class", "distance"),
                    Locator::attr("span", "data-field", "distance"),
                ],
            )
            .with(
                ENTRY_CLASS_CELL,
                vec![
                    Locator::attr_contains("div", "class", "pre-avl"),
                    Locator::attr_contains("td", "class", "class-cell"),
                ],
            )
            .with(
                CLASS_CELL_CODE,
                vec![
                    Locator::attr_contains("strong", "class", "class-code"),
                    Locator::position("strong", 1),
                ],
            )
            .with(
                CLASS_CELL_STATUS,
                vec![
                    Locator::attr_contains("span", "class", "avl-status"),
                    Locator::position("span", 1),
                ],
            )
            .with(
                CLASS_OPTION,
                vec![
                    Locator::attr("div", "id", "{train}-{class}"),
                    Locator::attr("td", "data-option", "{train}-{class}"),
                ],
            )
            .with(
                CLASS_AVAILABILITY,
                vec![
                    Locator::attr_contains("div", "class", "selected-avl-status"),
                    Locator::attr("span", "id", "avl-status"),
                ],
            )
            .with(
                BOOK_NOW,
                vec![
                    Locator::text("button", "Book Now"),
                    Locator::attr_contains("button", "class", "book-now"),
                    Locator::attr_contains("button", "class", "btnDefault"),
                ],
            )
            .with(
                LOGIN_BUTTON,
                vec![Locator::text("a", "LOGIN"), Locator::text("button", "Login")],
            )
            .with(
                USERNAME_INPUT,
                vec![
                    Locator::attr("input", "formcontrolname", "userid"),
                    Locator::attr("input", "placeholder", "User Name"),
                ],
            )
            .with(
                PASSWORD_INPUT,
                vec![
                    Locator::attr("input", "formcontrolname", "password"),
                    Locator::attr("input", "placeholder", "Password"),
                ],
            )
            .with(
                CHALLENGE,
                vec![
                    Locator::attr("input", "id", "captcha"),
                    Locator::attr_contains("img", "class", "captcha-img"),
                    Locator::attr_contains("div", "class", "g-recaptcha"),
                ],
            )
            .with(
                SIGN_IN_BUTTON,
                vec![
                    Locator::text("button", "SIGN IN"),
                    Locator::attr("button", "type", "submit"),
                ],
            )
            .with(
                SESSION_EXPIRED,
                vec![
                    Locator::attr_contains("div", "class", "session-expired"),
                    Locator::text("div", "Session Expired"),
                ],
            )
            .with(
                ADD_PASSENGER,
                vec![
                    Locator::text("a", "Add Passenger"),
                    Locator::text("span", "Add Passenger"),
                ],
            )
            .with(
                PASSENGER_NAME,
                vec![
                    Locator::attr("input", "formcontrolname", "passengerName"),
                    Locator::attr("input", "placeholder", "Name"),
                ],
            )
            .with(
                PASSENGER_AGE,
                vec![
                    Locator::attr("input", "formcontrolname", "passengerAge"),
                    Locator::attr("input", "placeholder", "Age"),
                ],
            )
            .with(
                PASSENGER_GENDER,
                vec![Locator::attr("select", "formcontrolname", "passengerGender")],
            )
            .with(
                PASSENGER_BERTH,
                vec![Locator::attr(
                    "select",
                    "formcontrolname",
                    "passengerBerthChoice",
                )],
            )
            .with(
                REQUIRED_FIELD,
                vec![
                    Locator::has_attr("required"),
                    Locator::Attribute {
                        tag: None,
                        name: "aria-required".to_string(),
                        value: Some("true".to_string()),
                        contains: false,
                    },
                ],
            )
            .with(
                PASSENGER_CONTINUE,
                vec![
                    Locator::text_exact("button", "Continue"),
                    Locator::attr("button", "type", "submit"),
                ],
            )
            .with(
                PAYMENT_BUTTON,
                vec![
                    Locator::text("button", "Make Payment"),
                    Locator::text("button", "Proceed to Pay"),
                    Locator::text("button", "Continue"),
                ],
            )
    }
}
