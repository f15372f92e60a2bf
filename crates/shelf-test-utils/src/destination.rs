//! [`InMemoryDestination`]: a destination table held in memory.
//!
//! Every call is appended to a log so tests can assert on exactly which
//! destination calls a run issued. Failures are injected per column name,
//! per subject id or per record id. A null cell in an update clears it.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use shelf_core::{
    Cells, Column, ColumnSpec, Credentials, Destination, DestinationError, DestinationRecord,
    DestinationResult, PageRequest, RecordPage, RecordUpdate,
};
use shelf_schema::{CellValue, FieldKind, FieldProperty};
use shelf_store::TableRef;

/// One call received by the fake, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListRecords { page_token: Option<String> },
    InsertRecords { rows: Vec<Cells> },
    UpdateRecords { updates: Vec<RecordUpdate> },
    DeleteRecord { record_id: String },
    ListColumns,
    CreateColumn { name: String },
    UpdateColumn { column_id: String, spec: ColumnSpec },
}

impl Call {
    /// Calls that change destination state.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Call::ListRecords { .. } | Call::ListColumns)
    }
}

#[derive(Debug, Default)]
struct State {
    columns: Vec<Column>,
    records: Vec<DestinationRecord>,
    next_column: usize,
    next_record: usize,
    calls: Vec<Call>,
    failing_columns: HashSet<String>,
    failing_subjects: HashSet<String>,
    failing_deletes: HashSet<String>,
    fail_listing_after: Option<usize>,
    list_calls: usize,
    withheld_ids: usize,
}

impl State {
    fn column_id(&mut self) -> String {
        self.next_column += 1;
        format!("fld{:06}", self.next_column)
    }

    fn record_id(&mut self) -> String {
        self.next_record += 1;
        format!("rec{:06}", self.next_record)
    }

    fn touches_failing_subject(&self, cells: &Cells) -> bool {
        cells.values().any(|v| match v {
            CellValue::Text(s) => self.failing_subjects.contains(s.trim()),
            _ => false,
        })
    }
}

/// In-memory [`Destination`] with a call log and failure injection.
#[derive(Debug, Default)]
pub struct InMemoryDestination {
    state: Mutex<State>,
}

impl InMemoryDestination {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Add an existing column, returning its id.
    pub fn add_column(&self, name: &str, kind: FieldKind, property: FieldProperty) -> String {
        let mut state = self.state();
        let id = state.column_id();
        state.columns.push(Column {
            id: id.clone(),
            name: name.to_string(),
            type_code: kind.type_code(),
            property,
        });
        id
    }

    /// Add an existing row, returning its record id.
    pub fn seed_record(&self, cells: Cells) -> String {
        let mut state = self.state();
        let id = state.record_id();
        state.records.push(DestinationRecord::new(id.clone(), cells));
        id
    }

    /// Column creation fails for this logical name.
    pub fn fail_column(&self, name: &str) {
        self.state().failing_columns.insert(name.to_string());
    }

    /// Any insert or update batch carrying this subject id fails.
    pub fn fail_subject(&self, subject_id: &str) {
        self.state().failing_subjects.insert(subject_id.to_string());
    }

    pub fn fail_delete(&self, record_id: &str) {
        self.state().failing_deletes.insert(record_id.to_string());
    }

    /// The next insert stores every row but omits the last `count` ids.
    pub fn withhold_insert_ids(&self, count: usize) {
        self.state().withheld_ids = count;
    }

    /// Record listing fails once `pages` pages have been served.
    pub fn fail_listing_after(&self, pages: usize) {
        self.state().fail_listing_after = Some(pages);
    }

    pub fn columns(&self) -> Vec<Column> {
        self.state().columns.clone()
    }

    pub fn column_named(&self, name: &str) -> Option<Column> {
        self.state().columns.iter().find(|c| c.name == name).cloned()
    }

    pub fn records(&self) -> Vec<DestinationRecord> {
        self.state().records.clone()
    }

    pub fn record(&self, record_id: &str) -> Option<DestinationRecord> {
        self.state()
            .records
            .iter()
            .find(|r| r.record_id == record_id)
            .cloned()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.state().calls.iter().filter(|c| c.is_mutation()).count()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }
}

#[async_trait]
impl Destination for InMemoryDestination {
    async fn list_records(
        &self,
        _credentials: &Credentials,
        _table: &TableRef,
        page: PageRequest,
    ) -> DestinationResult<RecordPage> {
        let mut state = self.state();
        state.calls.push(Call::ListRecords {
            page_token: page.page_token.clone(),
        });
        if let Some(limit) = state.fail_listing_after
            && state.list_calls >= limit
        {
            return Err(DestinationError::transient("listing timed out"));
        }
        state.list_calls += 1;

        let offset = match &page.page_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| DestinationError::permanent(format!("bad page token {token}")))?,
            None => 0,
        };
        let end = (offset + page.page_size).min(state.records.len());
        let records = state.records.get(offset..end).unwrap_or_default().to_vec();
        let has_more = end < state.records.len();
        Ok(RecordPage {
            records,
            next_page_token: has_more.then(|| end.to_string()),
            has_more,
        })
    }

    async fn insert_records(
        &self,
        _credentials: &Credentials,
        _table: &TableRef,
        rows: Vec<Cells>,
    ) -> DestinationResult<Vec<String>> {
        let mut state = self.state();
        state.calls.push(Call::InsertRecords { rows: rows.clone() });
        if rows.iter().any(|r| state.touches_failing_subject(r)) {
            return Err(DestinationError::transient("rate limited"));
        }

        let mut ids = Vec::with_capacity(rows.len());
        for cells in rows {
            let id = state.record_id();
            state.records.push(DestinationRecord::new(id.clone(), cells));
            ids.push(id);
        }
        let withheld = std::mem::take(&mut state.withheld_ids);
        ids.truncate(ids.len().saturating_sub(withheld));
        Ok(ids)
    }

    async fn update_records(
        &self,
        _credentials: &Credentials,
        _table: &TableRef,
        updates: Vec<RecordUpdate>,
    ) -> DestinationResult<()> {
        let mut state = self.state();
        state.calls.push(Call::UpdateRecords {
            updates: updates.clone(),
        });

        let failing = updates.iter().any(|u| {
            state.touches_failing_subject(&u.cells)
                || state
                    .records
                    .iter()
                    .find(|r| r.record_id == u.record_id)
                    .is_some_and(|r| state.touches_failing_subject(&r.cells))
        });
        if failing {
            return Err(DestinationError::transient("rate limited"));
        }

        for update in updates {
            let record = state
                .records
                .iter_mut()
                .find(|r| r.record_id == update.record_id)
                .ok_or_else(|| DestinationError::permanent(format!("no record {}", update.record_id)))?;
            for (column, value) in update.cells {
                if value.is_null() {
                    record.cells.remove(&column);
                } else {
                    record.cells.insert(column, value);
                }
            }
        }
        Ok(())
    }

    async fn delete_record(
        &self,
        _credentials: &Credentials,
        _table: &TableRef,
        record_id: &str,
    ) -> DestinationResult<()> {
        let mut state = self.state();
        state.calls.push(Call::DeleteRecord {
            record_id: record_id.to_string(),
        });
        if state.failing_deletes.contains(record_id) {
            return Err(DestinationError::permanent("record locked"));
        }
        let before = state.records.len();
        state.records.retain(|r| r.record_id != record_id);
        if state.records.len() == before {
            return Err(DestinationError::permanent(format!("no record {record_id}")));
        }
        Ok(())
    }

    async fn list_columns(
        &self,
        _credentials: &Credentials,
        _table: &TableRef,
    ) -> DestinationResult<Vec<Column>> {
        let mut state = self.state();
        state.calls.push(Call::ListColumns);
        Ok(state.columns.clone())
    }

    async fn create_column(
        &self,
        _credentials: &Credentials,
        _table: &TableRef,
        spec: &ColumnSpec,
    ) -> DestinationResult<Column> {
        let mut state = self.state();
        state.calls.push(Call::CreateColumn {
            name: spec.name.clone(),
        });
        if state.failing_columns.contains(&spec.name) {
            return Err(DestinationError::transient(format!(
                "column {} rejected",
                spec.name
            )));
        }
        if state.columns.iter().any(|c| c.name == spec.name) {
            return Err(DestinationError::permanent(format!(
                "column {} already exists",
                spec.name
            )));
        }

        let column = Column {
            id: state.column_id(),
            name: spec.name.clone(),
            type_code: spec.type_code(),
            property: spec.property.clone(),
        };
        state.columns.push(column.clone());
        Ok(column)
    }

    async fn update_column(
        &self,
        _credentials: &Credentials,
        _table: &TableRef,
        column_id: &str,
        spec: &ColumnSpec,
    ) -> DestinationResult<Column> {
        let mut state = self.state();
        state.calls.push(Call::UpdateColumn {
            column_id: column_id.to_string(),
            spec: spec.clone(),
        });
        if state.failing_columns.contains(&spec.name) {
            return Err(DestinationError::transient(format!(
                "column {} rejected",
                spec.name
            )));
        }

        let column = state
            .columns
            .iter_mut()
            .find(|c| c.id == column_id)
            .ok_or_else(|| DestinationError::permanent(format!("no column {column_id}")))?;
        column.name.clone_from(&spec.name);
        column.type_code = spec.type_code();
        column.property = spec.property.clone();
        Ok(column.clone())
    }
}
