//! Action catalogue
//!
//! The closed set of Sheets operations the gateway exposes. Each entry names
//! its accepted methods, its required parameters, how it uses the request
//! body, and the translator that builds its upstream call.

use std::fmt;

use super::translate;
use super::ResolvedAction;
use crate::google::UpstreamRequest;

/// Route family an action belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Spreadsheets,
    Values,
}

impl Family {
    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Spreadsheets => "spreadsheets",
            Family::Values => "values",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ValuesGet,
    ValuesUpdate,
    ValuesAppend,
    ValuesClear,
    ValuesBatchGet,
    ValuesBatchUpdate,
    ValuesBatchClear,
    ValuesBatchGetByDataFilter,
    ValuesBatchUpdateByDataFilter,
    ValuesBatchClearByDataFilter,
    SpreadsheetsGet,
    SpreadsheetsCreate,
    SpreadsheetsBatchUpdate,
    SpreadsheetsGetByDataFilter,
    SheetsCopyTo,
    DeveloperMetadataGet,
    DeveloperMetadataSearch,
}

/// How an action consumes the inbound JSON body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyUse {
    /// Parameters only; nothing is forwarded
    None,
    /// Forwarded minus routing keys and options moved into the query
    Fields,
    /// The whole object is the upstream body and must be present
    Whole,
}

/// Translator entry point: resolved action plus the Sheets base URL.
pub type BuildFn = fn(&ResolvedAction, &str) -> UpstreamRequest;

pub struct ActionSpec {
    pub action: Action,
    pub family: Family,
    pub name: &'static str,
    pub methods: &'static [&'static str],
    pub required: &'static [&'static str],
    pub body: BodyUse,
    pub build: BuildFn,
}

impl ActionSpec {
    /// Qualified name, e.g. `values.batchGet`.
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.family, self.name)
    }

    pub fn allows(&self, method: &http::Method) -> bool {
        self.methods.iter().any(|m| *m == method.as_str())
    }
}

impl fmt::Debug for ActionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionSpec")
            .field("action", &self.action)
            .field("family", &self.family)
            .field("name", &self.name)
            .field("methods", &self.methods)
            .field("required", &self.required)
            .finish()
    }
}

const GET: &[&str] = &["GET"];
const POST: &[&str] = &["POST"];

pub static CATALOGUE: &[ActionSpec] = &[
    // ── values ──────────────────────────────────────────────────────────────
    ActionSpec {
        action: Action::ValuesGet,
        family: Family::Values,
        name: "get",
        methods: &["GET", "POST"],
        required: &["spreadsheetId", "range"],
        body: BodyUse::None,
        build: translate::values_get,
    },
    ActionSpec {
        action: Action::ValuesUpdate,
        family: Family::Values,
        name: "update",
        methods: &["PUT", "POST"],
        required: &["spreadsheetId", "range", "values"],
        body: BodyUse::Fields,
        build: translate::values_update,
    },
    ActionSpec {
        action: Action::ValuesAppend,
        family: Family::Values,
        name: "append",
        methods: POST,
        required: &["spreadsheetId", "range", "values"],
        body: BodyUse::Fields,
        build: translate::values_append,
    },
    ActionSpec {
        action: Action::ValuesClear,
        family: Family::Values,
        name: "clear",
        methods: POST,
        required: &["spreadsheetId", "range"],
        body: BodyUse::None,
        build: translate::values_clear,
    },
    ActionSpec {
        action: Action::ValuesBatchGet,
        family: Family::Values,
        name: "batchGet",
        methods: GET,
        required: &["spreadsheetId", "ranges"],
        body: BodyUse::None,
        build: translate::values_batch_get,
    },
    ActionSpec {
        action: Action::ValuesBatchUpdate,
        family: Family::Values,
        name: "batchUpdate",
        methods: POST,
        required: &["spreadsheetId", "data"],
        body: BodyUse::Fields,
        build: translate::values_batch_update,
    },
    ActionSpec {
        action: Action::ValuesBatchClear,
        family: Family::Values,
        name: "batchClear",
        methods: POST,
        required: &["spreadsheetId", "ranges"],
        body: BodyUse::Fields,
        build: translate::values_batch_clear,
    },
    ActionSpec {
        action: Action::ValuesBatchGetByDataFilter,
        family: Family::Values,
        name: "batchGetByDataFilter",
        methods: POST,
        required: &["spreadsheetId", "dataFilters"],
        body: BodyUse::Fields,
        build: translate::values_batch_get_by_data_filter,
    },
    ActionSpec {
        action: Action::ValuesBatchUpdateByDataFilter,
        family: Family::Values,
        name: "batchUpdateByDataFilter",
        methods: POST,
        required: &["spreadsheetId", "data"],
        body: BodyUse::Fields,
        build: translate::values_batch_update_by_data_filter,
    },
    ActionSpec {
        action: Action::ValuesBatchClearByDataFilter,
        family: Family::Values,
        name: "batchClearByDataFilter",
        methods: POST,
        required: &["spreadsheetId", "dataFilters"],
        body: BodyUse::Fields,
        build: translate::values_batch_clear_by_data_filter,
    },
    // ── spreadsheets ────────────────────────────────────────────────────────
    ActionSpec {
        action: Action::SpreadsheetsGet,
        family: Family::Spreadsheets,
        name: "get",
        methods: GET,
        required: &["spreadsheetId"],
        body: BodyUse::None,
        build: translate::spreadsheets_get,
    },
    ActionSpec {
        action: Action::SpreadsheetsCreate,
        family: Family::Spreadsheets,
        name: "create",
        methods: POST,
        required: &[],
        body: BodyUse::Whole,
        build: translate::spreadsheets_create,
    },
    ActionSpec {
        action: Action::SpreadsheetsBatchUpdate,
        family: Family::Spreadsheets,
        name: "batchUpdate",
        methods: POST,
        required: &["spreadsheetId", "requests"],
        body: BodyUse::Fields,
        build: translate::spreadsheets_batch_update,
    },
    ActionSpec {
        action: Action::SpreadsheetsGetByDataFilter,
        family: Family::Spreadsheets,
        name: "getByDataFilter",
        methods: POST,
        required: &["spreadsheetId", "dataFilters"],
        body: BodyUse::Fields,
        build: translate::spreadsheets_get_by_data_filter,
    },
    ActionSpec {
        action: Action::SheetsCopyTo,
        family: Family::Spreadsheets,
        name: "copyTo",
        methods: POST,
        required: &["spreadsheetId", "sheetId", "destinationSpreadsheetId"],
        body: BodyUse::Fields,
        build: translate::sheets_copy_to,
    },
    ActionSpec {
        action: Action::DeveloperMetadataGet,
        family: Family::Spreadsheets,
        name: "developerMetadata/get",
        methods: GET,
        required: &["spreadsheetId", "metadataId"],
        body: BodyUse::None,
        build: translate::developer_metadata_get,
    },
    ActionSpec {
        action: Action::DeveloperMetadataSearch,
        family: Family::Spreadsheets,
        name: "developerMetadata/search",
        methods: POST,
        required: &["spreadsheetId", "dataFilters"],
        body: BodyUse::Fields,
        build: translate::developer_metadata_search,
    },
];

/// Find an action by name within a family.
///
/// Accepts `get`, `values.get`, `developerMetadata/get` and
/// `developerMetadata.get`.
pub fn lookup(family: Family, name: &str) -> Option<&'static ActionSpec> {
    let name = name.trim().trim_matches('/');
    let name = match name.split_once('.') {
        Some((prefix, rest)) if prefix == family.as_str() => rest,
        _ => name,
    };
    let name = name.replacen("developerMetadata.", "developerMetadata/", 1);

    CATALOGUE
        .iter()
        .find(|spec| spec.family == family && spec.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn spec(action: Action) -> &'static ActionSpec {
        CATALOGUE.iter().find(|s| s.action == action).unwrap()
    }

    #[test]
    fn test_catalogue_is_closed_and_unique() {
        assert_eq!(CATALOGUE.len(), 17);
        let names: HashSet<String> = CATALOGUE.iter().map(|s| s.qualified()).collect();
        assert_eq!(names.len(), CATALOGUE.len());
        let actions: HashSet<Action> = CATALOGUE.iter().map(|s| s.action).collect();
        assert_eq!(actions.len(), CATALOGUE.len());
    }

    #[test]
    fn test_family_sizes() {
        let values = CATALOGUE.iter().filter(|s| s.family == Family::Values).count();
        let sheets = CATALOGUE.iter().filter(|s| s.family == Family::Spreadsheets).count();
        assert_eq!(values, 10);
        assert_eq!(sheets, 7);
    }

    #[test]
    fn test_lookup_forms() {
        assert_eq!(lookup(Family::Values, "get").unwrap().action, Action::ValuesGet);
        assert_eq!(lookup(Family::Values, "values.get").unwrap().action, Action::ValuesGet);
        assert_eq!(
            lookup(Family::Spreadsheets, "get").unwrap().action,
            Action::SpreadsheetsGet
        );
        assert_eq!(
            lookup(Family::Spreadsheets, "developerMetadata/get").unwrap().action,
            Action::DeveloperMetadataGet
        );
        assert_eq!(
            lookup(Family::Spreadsheets, "developerMetadata.search").unwrap().action,
            Action::DeveloperMetadataSearch
        );
        assert_eq!(
            lookup(Family::Spreadsheets, "spreadsheets.batchUpdate").unwrap().action,
            Action::SpreadsheetsBatchUpdate
        );
    }

    #[test]
    fn test_lookup_rejects_unknown_and_cross_family() {
        assert!(lookup(Family::Values, "delete").is_none());
        assert!(lookup(Family::Values, "create").is_none());
        assert!(lookup(Family::Values, "spreadsheets.get").is_none());
        assert!(lookup(Family::Spreadsheets, "append").is_none());
    }

    #[test]
    fn test_reads_never_declare_body_forwarding() {
        for spec in CATALOGUE.iter().filter(|s| s.methods == GET) {
            assert_eq!(spec.body, BodyUse::None, "{}", spec.qualified());
        }
    }

    #[test]
    fn test_method_rules() {
        assert!(spec(Action::ValuesUpdate).allows(&http::Method::PUT));
        assert!(!spec(Action::ValuesAppend).allows(&http::Method::GET));
        assert!(spec(Action::ValuesGet).allows(&http::Method::POST));
    }
}
