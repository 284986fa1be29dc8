use crate::{
    common::condition::Condition,
    config::{self, SortOrder, SortSpec},
    error::{Error, Result},
    filter::{self, matcher, parse},
    pagination,
    resource::{self, record},
    shadow::{self, codec, inference, key},
    store::{Item, Page, Store},
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections;

/// Parameters of a paged find.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FindParams {
    /// Sort; the resource's default when absent.
    #[serde(default)]
    pub sort: Option<SortSpec>,
    /// Page size; capped by the configured maximum.
    #[serde(default)]
    pub limit: Option<usize>,
    /// Token of the previous page.
    #[serde(default)]
    pub next_token: Option<String>,
    /// Filters keyed by `field[:operator[:type]]`.
    #[serde(default)]
    pub filter: Option<Map<String, Value>>,
}

/// Page flags.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Another page may follow.
    pub has_next_page: bool,
    /// The page was requested with a token.
    pub has_previous_page: bool,
}

/// One page of documents.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FindOutput {
    /// Matching documents, in sort order.
    pub items: Vec<Value>,
    /// Page flags.
    pub page_info: PageInfo,
    /// Token of the next page, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

/// Shape of the filter value a range bound is built from.
fn filter_value(coerced: &filter::Coerced) -> Option<Value> {
    match coerced {
        filter::Coerced::String(text) => Some(Value::String(text.clone())),
        filter::Coerced::Number(number) => {
            serde_json::Number::from_f64(*number).map(Value::Number)
        }
        filter::Coerced::Date(datetime) => Some(Value::String(codec::format_datetime(datetime))),
        filter::Coerced::Boolean(flag) => Some(Value::Bool(*flag)),
    }
}

impl<S: Store> resource::Resource<'_, S> {
    /// One page of documents, sorted and filtered.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_shadow.find", skip_all, fields(resource = %self.name), err)
    )]
    pub async fn find(&self, params: FindParams) -> Result<FindOutput> {
        let sort = params.sort.unwrap_or_else(|| self.settings.sort.clone());
        self.check_sort_field(&sort.field)?;
        let filters = parse::parse_filters(&params.filter.unwrap_or_default())?;
        for filter in &filters {
            self.check_filter_field(&filter.field)?;
        }
        let limit = params
            .limit
            .unwrap_or(self.config.default_page_size)
            .clamp(1, self.config.max_page_size);
        let cursor = params
            .next_token
            .as_deref()
            .map(|token| self.check_cursor(pagination::decode(token)?, &sort.field))
            .transpose()?;
        let forward = sort.order == SortOrder::Asc;
        let mut output = if sort.field == shadow::ID_FIELD {
            self.find_by_id(&filters, limit, forward, cursor.as_ref())
                .await?
        } else {
            self.find_by_shadow(&sort.field, &filters, limit, forward, cursor.as_ref())
                .await?
        };
        output.page_info.has_previous_page = cursor.is_some();
        Ok(output)
    }

    /// The document `id`, if any.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_shadow.find_one", skip_all, fields(resource = %self.name, id = %id), err)
    )]
    pub async fn find_one(&self, id: &str) -> Result<Option<Value>> {
        Ok(self
            .fetch(id)
            .await?
            .map(|record| Value::Object(record.document)))
    }

    /// Documents of `ids` in input order; missing ids are skipped.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_shadow.find_many", skip_all, fields(resource = %self.name, records = ids.len()), err)
    )]
    pub async fn find_many(&self, ids: &[String]) -> Result<Vec<Value>> {
        let records = self.fetch_many(ids).await?;
        Ok(ids
            .iter()
            .filter_map(|id| records.get(id))
            .map(|record| Value::Object(record.document.clone()))
            .collect())
    }

    /// [`find`](Self::find) restricted to documents whose `target` equals `id`.
    pub async fn find_many_reference(
        &self,
        target: &str,
        id: Value,
        mut params: FindParams,
    ) -> Result<FindOutput> {
        if target.is_empty() {
            return Err(Error::Validation("reference target is empty".to_string()));
        }
        params
            .filter
            .get_or_insert_with(Map::new)
            .insert(target.to_string(), id);
        self.find(params).await
    }

    fn check_sort_field(&self, field: &str) -> Result<()> {
        if field == shadow::ID_FIELD {
            return Ok(());
        }
        if !shadow::is_shadowable_field(field)
            || field.contains('.')
            || field == self.config.partition_key_name
            || field == self.config.sort_key_name
        {
            return Err(Error::InvalidFilter(format!("cannot sort by {field:?}")));
        }
        if !self.settings.is_known_field(field) {
            return Err(Error::InvalidFilter(format!(
                "unknown sort field {field:?} for {}",
                self.name
            )));
        }
        Ok(())
    }

    fn check_filter_field(&self, field: &str) -> Result<()> {
        if field.starts_with(config::INTERNAL_PREFIX)
            || field == self.config.partition_key_name
            || field == self.config.sort_key_name
        {
            return Err(Error::InvalidFilter(format!("cannot filter by {field:?}")));
        }
        if !self.settings.is_known_field(field) {
            return Err(Error::InvalidFilter(format!(
                "unknown filter field {field:?} for {}",
                self.name
            )));
        }
        Ok(())
    }

    /// Accept a cursor only when it points into the key range being read.
    fn check_cursor(
        &self,
        cursor: pagination::Cursor,
        sort_field: &str,
    ) -> Result<pagination::Cursor> {
        if cursor.partition_key != self.name {
            return Err(Error::InvalidToken(format!(
                "token belongs to {:?}, not {:?}",
                cursor.partition_key, self.name
            )));
        }
        let prefix = if sort_field == shadow::ID_FIELD {
            key::MAIN_KEY_PREFIX.to_string()
        } else {
            key::field_prefix(sort_field)
        };
        if !cursor.sort_key.starts_with(&prefix) {
            return Err(Error::InvalidToken(format!(
                "token does not belong to a sort by {sort_field:?}"
            )));
        }
        Ok(cursor)
    }

    /// Page flags and token of a raw store page of `limit` rows.
    fn next_page(&self, page: &Page, limit: usize) -> (bool, Option<String>) {
        let sort_key = page
            .last_evaluated_key
            .as_ref()
            .and_then(|key| key.get(&self.config.sort_key_name))
            .and_then(Value::as_str);
        match sort_key {
            Some(sort_key) if page.items.len() == limit => {
                (true, Some(pagination::encode(&self.name, sort_key)))
            }
            _ => (false, None),
        }
    }

    fn documents(&self, items: Vec<Item>, filters: &[filter::Filter]) -> Result<Vec<Value>> {
        let mut documents = Vec::with_capacity(items.len());
        for item in items {
            let document = Value::Object(record::StoredRecord::from_item(item, self.config)?.document);
            if matcher::matches_all(&document, filters) {
                documents.push(document);
            }
        }
        Ok(documents)
    }

    async fn find_by_id(
        &self,
        filters: &[filter::Filter],
        limit: usize,
        forward: bool,
        cursor: Option<&pagination::Cursor>,
    ) -> Result<FindOutput> {
        let point = filters.iter().find_map(|filter| match (&filter.operator, &filter.coerced) {
            (filter::Operator::Eq, filter::Coerced::String(id)) if filter.field == shadow::ID_FIELD => {
                Some(id.as_str())
            }
            _ => None,
        });
        if let (Some(id), None) = (point, cursor) {
            crate::event!(debug, resource = %self.name, id, "point read");
            let items = match self.fetch(id).await? {
                Some(record) => vec![Value::Object(record.document)],
                None => Vec::new(),
            };
            return Ok(FindOutput {
                items: items
                    .into_iter()
                    .filter(|document| matcher::matches_all(document, filters))
                    .collect(),
                ..Default::default()
            });
        }
        crate::event!(debug, resource = %self.name, forward, limit, "main key range scan");
        let query = self.layout().query(
            Condition::BeginsWith(key::MAIN_KEY_PREFIX.to_string()),
            forward,
            limit,
            cursor.map(|cursor| cursor.sort_key.as_str()),
        );
        let page = self.call("query", self.store.query(query)).await?;
        let (has_next_page, next_token) = self.next_page(&page, limit);
        let items = self.documents(page.items, filters)?;
        Ok(FindOutput {
            items,
            page_info: PageInfo {
                has_next_page,
                has_previous_page: false,
            },
            next_token,
        })
    }

    async fn find_by_shadow(
        &self,
        field: &str,
        filters: &[filter::Filter],
        limit: usize,
        forward: bool,
        cursor: Option<&pagination::Cursor>,
    ) -> Result<FindOutput> {
        let condition = self.plan(field, filters);
        crate::event!(debug, resource = %self.name, field, ?condition, forward, limit, "shadow range scan");
        let query = self.layout().query(
            condition,
            forward,
            limit,
            cursor.map(|cursor| cursor.sort_key.as_str()),
        );
        let page = self.call("query", self.store.query(query)).await?;
        let (has_next_page, next_token) = self.next_page(&page, limit);
        let mut seen = collections::HashSet::new();
        let ids: Vec<String> = page
            .items
            .iter()
            .filter_map(|item| item.get(&self.config.sort_key_name))
            .filter_map(Value::as_str)
            .filter_map(key::owner_id)
            .filter(|id| seen.insert(*id))
            .map(str::to_string)
            .collect();
        let mut records = self.fetch_many(&ids).await?;
        let mut items = Vec::with_capacity(ids.len());
        for id in &ids {
            let Some(record) = records.remove(id) else {
                crate::event!(warn, resource = %self.name, id = %id, "skipping shadow record without a main record");
                continue;
            };
            let document = Value::Object(record.document);
            if matcher::matches_all(&document, filters) {
                items.push(document);
            }
        }
        Ok(FindOutput {
            items,
            page_info: PageInfo {
                has_next_page,
                has_previous_page: false,
            },
            next_token,
        })
    }

    /// Sort key condition of a scan over `field`, narrowed by the first filter on
    /// the same field that can be pushed down.
    fn plan(&self, field: &str, filters: &[filter::Filter]) -> Condition<Value> {
        filters
            .iter()
            .filter(|filter| filter.field == field)
            .find_map(|filter| self.pushdown(filter))
            .unwrap_or_else(|| Condition::BeginsWith(key::field_prefix(field)))
    }

    /// Key range holding every shadow record that can satisfy `filter`.
    ///
    /// Stored values are assumed to carry the filter's type, so only explicitly
    /// typed filters or filters on schema fields of that type qualify.
    fn pushdown(&self, filter: &filter::Filter) -> Option<Condition<Value>> {
        if !filter.operator.is_range_capable() {
            return None;
        }
        let field_type = filter.value_type.field_type();
        match self.settings.declared_type(&filter.field) {
            Some(declared) if declared != field_type => return None,
            Some(_) => {}
            None if !filter.explicit_type => return None,
            None => {}
        }
        let value = filter_value(&filter.coerced)?;
        if field_type == shadow::FieldType::String
            && self.settings.schema.is_none()
            && inference::infer(&value) != Some(shadow::FieldType::String)
        {
            return None;
        }
        let encoded = self.codec().encode(&value, field_type).ok()?;
        let field = filter.field.as_str();
        match filter.operator {
            filter::Operator::Eq => Some(Condition::BeginsWith(key::value_prefix(field, &encoded))),
            filter::Operator::Starts if field_type == shadow::FieldType::String => Some(
                Condition::BeginsWith(format!("{}{encoded}", key::field_prefix(field))),
            ),
            filter::Operator::Lt
            | filter::Operator::Lte
            | filter::Operator::Gt
            | filter::Operator::Gte
                if matches!(
                    field_type,
                    shadow::FieldType::Number
                        | shadow::FieldType::Datetime
                        | shadow::FieldType::Boolean
                ) =>
            {
                // Numbers are floored and datetimes truncated before encoding, so a
                // strict bound only skips the filter value's bucket for booleans.
                let exact = field_type == shadow::FieldType::Boolean;
                let mut lower = key::field_prefix(field);
                let mut upper = key::field_upper_bound(field);
                match filter.operator {
                    filter::Operator::Gte => lower = key::value_prefix(field, &encoded),
                    filter::Operator::Gt if exact => {
                        lower = key::value_upper_bound(field, &encoded)
                    }
                    filter::Operator::Gt => lower = key::value_prefix(field, &encoded),
                    filter::Operator::Lte => upper = key::value_upper_bound(field, &encoded),
                    filter::Operator::Lt if exact => upper = key::value_prefix(field, &encoded),
                    _ => upper = key::value_upper_bound(field, &encoded),
                }
                Some(Condition::Between(Value::String(lower), Value::String(upper)))
            }
            _ => None,
        }
    }
}
