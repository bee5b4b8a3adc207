//! Query methods synthesized from view definitions.
//!
//! Every view declared in a definition source gets one [`QueryMethod`], registered in a
//! [`QueryRegistry`] under both its view name (`byName`) and its accessor name
//! (`findByName`). A query method executes its view on the store and flattens the result
//! rows down to their `value`s.
//!
//! # Error policy
//!
//! By default a failed view execution does not fail the call. The error is logged and
//! reported in [`QueryOutput::error`] next to an empty value list, so callers that only
//! look at [`QueryOutput::values`] keep working through transient view failures. Callers
//! that would rather see the failure as an `Err` opt into [`QueryErrorPolicy::Propagate`].

use serde::de::DeserializeOwned;
use serde_json::{Value, from_value};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, error, info};

use crate::{
    backend::{StoreBackend, ViewParams, ViewResult},
    design::ViewDefinitionSet,
    error::{DocumentStoreError, DocumentStoreResult},
};

/// What a query method does when the store fails to execute its view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryErrorPolicy {
    /// Log the failure and resolve to an empty value list carrying the error.
    #[default]
    ReturnEmpty,
    /// Return the failure as an `Err`.
    Propagate,
}

/// The normalized result of a query method.
#[derive(Debug, Default)]
pub struct QueryOutput {
    /// The `value` of every result row, in store order.
    pub values: Vec<Value>,
    /// The swallowed view failure, if any. `values` is empty whenever this is set.
    pub error: Option<DocumentStoreError>,
}

impl QueryOutput {
    fn from_rows(result: ViewResult) -> Self {
        Self {
            values: result
                .rows
                .into_iter()
                .map(|row| row.value)
                .collect(),
            error: None,
        }
    }

    fn failed(error: DocumentStoreError) -> Self {
        Self {
            values: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Turns a swallowed failure back into an `Err`.
    pub fn into_result(self) -> DocumentStoreResult<Vec<Value>> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.values),
        }
    }

    /// Deserializes every value into `T`.
    pub fn deserialize<T: DeserializeOwned>(self) -> DocumentStoreResult<Vec<T>> {
        self.into_result()?
            .into_iter()
            .map(|value| Ok(from_value::<T>(value)?))
            .collect()
    }
}

/// Derives the accessor name of a view: `find` followed by the view name with its first
/// character uppercased.
pub fn method_name(view: &str) -> String {
    let mut chars = view.chars();

    match chars.next() {
        Some(first) => format!("find{}{}", first.to_uppercase(), chars.as_str()),
        None => "find".to_string(),
    }
}

/// A query bound to one view of one collection's design document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryMethod {
    name: String,
    collection: String,
    view: String,
    policy: QueryErrorPolicy,
}

impl QueryMethod {
    pub fn new(collection: &str, view: &str, policy: QueryErrorPolicy) -> Self {
        Self {
            name: method_name(view),
            collection: collection.to_string(),
            view: view.to_string(),
            policy,
        }
    }

    /// Returns the accessor name, e.g. `findByName`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn view(&self) -> &str {
        &self.view
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn policy(&self) -> QueryErrorPolicy {
        self.policy
    }

    /// Executes the view.
    ///
    /// With no keys the view is executed without parameters; otherwise the keys are
    /// passed in order as the view's `keys` parameter.
    pub async fn invoke<B>(&self, backend: &B, keys: Vec<Value>) -> DocumentStoreResult<QueryOutput>
    where
        B: StoreBackend,
    {
        let params = if keys.is_empty() {
            None
        } else {
            Some(ViewParams::keys(keys))
        };

        debug!(collection = %self.collection, view = %self.view, "executing view");

        match backend
            .view(&self.collection, &self.view, params)
            .await
        {
            Ok(result) => Ok(QueryOutput::from_rows(result)),
            Err(err) => match self.policy {
                QueryErrorPolicy::ReturnEmpty => {
                    error!(
                        collection = %self.collection,
                        method = %self.name,
                        error = %err,
                        "view query failed, returning no rows"
                    );

                    Ok(QueryOutput::failed(err))
                }
                QueryErrorPolicy::Propagate => Err(err),
            },
        }
    }
}

/// The query methods installed for one collection.
#[derive(Debug, Clone, Default)]
pub struct QueryRegistry {
    by_view: BTreeMap<String, QueryMethod>,
    by_method: HashMap<String, String>,
}

impl QueryRegistry {
    /// Builds one query method per view in `views`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidDefinition`] if two views map to the same
    /// accessor name (for example `byName` and `ByName`).
    pub fn synthesize(
        views: &ViewDefinitionSet,
        collection: &str,
        policy: QueryErrorPolicy,
    ) -> DocumentStoreResult<Self> {
        let mut registry = Self::default();

        for view in views.keys() {
            let method = QueryMethod::new(collection, view, policy);

            if let Some(existing) = registry.by_method.get(method.name()) {
                return Err(DocumentStoreError::InvalidDefinition(format!(
                    "views `{existing}` and `{view}` both map to method {}",
                    method.name()
                )));
            }

            info!(collection, method = %method.name(), "creating query method");

            registry
                .by_method
                .insert(method.name().to_string(), view.clone());
            registry
                .by_view
                .insert(view.clone(), method);
        }

        Ok(registry)
    }

    /// Looks up a query method by view name.
    pub fn get(&self, view: &str) -> Option<&QueryMethod> {
        self.by_view.get(view)
    }

    /// Looks up a query method by accessor name.
    pub fn method(&self, name: &str) -> Option<&QueryMethod> {
        self.by_method
            .get(name)
            .and_then(|view| self.by_view.get(view))
    }

    /// Returns the accessor names of all installed methods, sorted by view name.
    pub fn method_names(&self) -> Vec<&str> {
        self.by_view
            .values()
            .map(QueryMethod::name)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_view.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_view.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn views(names: &[&str]) -> ViewDefinitionSet {
        names
            .iter()
            .map(|name| (name.to_string(), json!({ "map": "function(doc) {}" })))
            .collect()
    }

    #[test]
    fn method_names_capitalize_the_first_letter() {
        assert_eq!(method_name("all"), "findAll");
        assert_eq!(method_name("byName"), "findByName");
        assert_eq!(method_name("ByName"), "findByName");
        assert_eq!(method_name("émigré"), "findÉmigré");
    }

    #[test]
    fn synthesizes_one_method_per_view() {
        let registry =
            QueryRegistry::synthesize(&views(&["all", "byName"]), "people", QueryErrorPolicy::default())
                .unwrap();

        assert_eq!(registry.method_names(), vec!["findAll", "findByName"]);
        assert_eq!(registry.method("findByName").unwrap().view(), "byName");
        assert_eq!(registry.get("all").unwrap().collection(), "people");
        assert!(registry.method("findByEmail").is_none());
    }

    #[test]
    fn colliding_method_names_are_rejected() {
        let result =
            QueryRegistry::synthesize(&views(&["byName", "ByName"]), "people", QueryErrorPolicy::default());

        assert!(matches!(result, Err(DocumentStoreError::InvalidDefinition(_))));
    }

    #[test]
    fn swallowed_errors_keep_values_empty() {
        let output = QueryOutput::failed(DocumentStoreError::Backend("down".into()));

        assert!(output.values.is_empty());
        assert!(!output.is_ok());
        assert!(output.into_result().is_err());
    }
}
