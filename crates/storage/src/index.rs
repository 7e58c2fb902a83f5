use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::{AllQuery, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Schema, Value, STORED, STRING, TEXT};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::RwLock;
use tracing::debug;

use crate::adapter::{StorageAdapter, StorageStats};
use crate::document::{Document, MetaValue};
use crate::error::{Result, StorageError};

/// Heap budget for the tantivy index writer.
const WRITER_HEAP_BYTES: usize = 50_000_000;

/// Ceiling on documents returned by `get_all`.
const GET_ALL_LIMIT: usize = 10_000;

/// Commit granularity for batch stores.
const BATCH_CHUNK: usize = 1000;

#[derive(Clone, Copy)]
struct DocFields {
    url: Field,
    title: Field,
    content: Field,
    doc_type: Field,
    created_at: Field,
    metadata: Field,
}

struct IndexState {
    writer: IndexWriter,
    reader: IndexReader,
    last_indexed: Option<DateTime<Utc>>,
}

/// Durable document store backed by a tantivy inverted index on disk.
///
/// `title` and `content` are indexed with positions, so the index itself can
/// answer phrase and single-field queries; `url` and `type` are raw terms for
/// exact lookup and filtering. Metadata is stored as one opaque JSON field
/// and never indexed, which keeps user keys from shadowing document
/// attributes.
pub struct TantivyStorage {
    path: PathBuf,
    schema: Schema,
    fields: DocFields,
    state: RwLock<Option<IndexState>>,
}

impl TantivyStorage {
    /// Opens the index at `path`, creating the directory and an empty index
    /// if none exists yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let (schema, fields) = build_schema();
        let state = open_state(&path, &schema)?;
        debug!(path = %path.display(), "opened tantivy index");
        Ok(Self {
            path,
            schema,
            fields,
            state: RwLock::new(Some(state)),
        })
    }

    fn to_tantivy(&self, doc: &Document) -> Result<TantivyDocument> {
        let mut tdoc = TantivyDocument::new();
        tdoc.add_text(self.fields.url, &doc.url);
        if !doc.title.is_empty() {
            tdoc.add_text(self.fields.title, &doc.title);
        }
        if !doc.content.is_empty() {
            tdoc.add_text(self.fields.content, &doc.content);
        }
        tdoc.add_text(self.fields.doc_type, &doc.doc_type);
        tdoc.add_text(self.fields.created_at, doc.created_at.to_rfc3339());
        if !doc.metadata.is_empty() {
            tdoc.add_text(self.fields.metadata, serde_json::to_string(&doc.metadata)?);
        }
        Ok(tdoc)
    }

    fn from_tantivy(&self, tdoc: &TantivyDocument) -> Result<Document> {
        let text = |field: Field| -> String {
            tdoc.get_first(field)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };

        let created_raw = text(self.fields.created_at);
        let created_at = DateTime::parse_from_rfc3339(&created_raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| {
                StorageError::InvalidDocument(format!("bad created_at '{created_raw}': {e}"))
            })?;

        let metadata: HashMap<String, MetaValue> = match tdoc
            .get_first(self.fields.metadata)
            .and_then(|v| v.as_str())
        {
            Some(raw) => serde_json::from_str(raw)?,
            None => HashMap::new(),
        };

        Ok(Document {
            url: text(self.fields.url),
            title: text(self.fields.title),
            content: text(self.fields.content),
            doc_type: text(self.fields.doc_type),
            created_at,
            metadata,
        })
    }

    /// Looks a document up by its exact URL term on an already-acquired
    /// searcher.
    fn lookup(
        &self,
        searcher: &tantivy::Searcher,
        url: &str,
    ) -> Result<Option<TantivyDocument>> {
        let query = TermQuery::new(
            Term::from_field_text(self.fields.url, url),
            IndexRecordOption::Basic,
        );
        let hits = searcher.search(&query, &TopDocs::with_limit(1))?;
        match hits.first() {
            Some((_, addr)) => Ok(Some(searcher.doc(*addr)?)),
            None => Ok(None),
        }
    }
}

fn build_schema() -> (Schema, DocFields) {
    let mut builder = Schema::builder();
    let url = builder.add_text_field("url", STRING | STORED);
    let title = builder.add_text_field("title", TEXT | STORED);
    let content = builder.add_text_field("content", TEXT | STORED);
    let doc_type = builder.add_text_field("type", STRING | STORED);
    let created_at = builder.add_text_field("created_at", STRING | STORED);
    let metadata = builder.add_text_field("metadata", STORED);
    let schema = builder.build();
    (
        schema,
        DocFields {
            url,
            title,
            content,
            doc_type,
            created_at,
            metadata,
        },
    )
}

fn open_state(path: &Path, schema: &Schema) -> Result<IndexState> {
    std::fs::create_dir_all(path)?;
    let dir = MmapDirectory::open(path).map_err(|e| StorageError::OpenDirectory(e.to_string()))?;
    let index = Index::open_or_create(dir, schema.clone())?;
    let writer = index.writer(WRITER_HEAP_BYTES)?;
    let reader = index
        .reader_builder()
        .reload_policy(ReloadPolicy::Manual)
        .try_into()?;
    Ok(IndexState {
        writer,
        reader,
        last_indexed: None,
    })
}

#[async_trait]
impl StorageAdapter for TantivyStorage {
    async fn store(&self, doc: Document) -> Result<()> {
        doc.validate()?;
        let tdoc = self.to_tantivy(&doc)?;
        let mut guard = self.state.write().await;
        let state = guard.as_mut().ok_or(StorageError::Closed)?;

        // Upsert: drop any previous revision of this URL in the same commit.
        state
            .writer
            .delete_term(Term::from_field_text(self.fields.url, &doc.url));
        state.writer.add_document(tdoc)?;
        state.writer.commit()?;
        state.reader.reload()?;
        state.last_indexed = Some(Utc::now());
        Ok(())
    }

    async fn batch_store(&self, docs: Vec<Document>) -> Result<()> {
        for doc in &docs {
            doc.validate()?;
        }
        let mut guard = self.state.write().await;
        let state = guard.as_mut().ok_or(StorageError::Closed)?;

        for chunk in docs.chunks(BATCH_CHUNK) {
            for doc in chunk {
                state
                    .writer
                    .delete_term(Term::from_field_text(self.fields.url, &doc.url));
                state.writer.add_document(self.to_tantivy(doc)?)?;
            }
            state.writer.commit()?;
        }
        state.reader.reload()?;
        state.last_indexed = Some(Utc::now());
        Ok(())
    }

    async fn get(&self, url: &str) -> Result<Document> {
        let guard = self.state.read().await;
        let state = guard.as_ref().ok_or(StorageError::Closed)?;
        let searcher = state.reader.searcher();
        match self.lookup(&searcher, url)? {
            Some(tdoc) => self.from_tantivy(&tdoc),
            None => Err(StorageError::DocumentNotFound(url.to_string())),
        }
    }

    async fn get_all(&self) -> Result<Vec<Document>> {
        let guard = self.state.read().await;
        let state = guard.as_ref().ok_or(StorageError::Closed)?;
        let searcher = state.reader.searcher();
        let hits = searcher.search(&AllQuery, &TopDocs::with_limit(GET_ALL_LIMIT))?;

        let mut docs = Vec::with_capacity(hits.len());
        for (_, addr) in hits {
            let tdoc: TantivyDocument = searcher.doc(addr)?;
            docs.push(self.from_tantivy(&tdoc)?);
        }
        Ok(docs)
    }

    async fn delete(&self, url: &str) -> Result<()> {
        let mut guard = self.state.write().await;
        let state = guard.as_mut().ok_or(StorageError::Closed)?;

        // Unlike the memory backend, deleting a URL that was never stored is
        // surfaced to the caller here.
        let searcher = state.reader.searcher();
        if self.lookup(&searcher, url)?.is_none() {
            return Err(StorageError::DocumentNotFound(url.to_string()));
        }

        state
            .writer
            .delete_term(Term::from_field_text(self.fields.url, url));
        state.writer.commit()?;
        state.reader.reload()?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut guard = self.state.write().await;
        if guard.is_none() {
            return Err(StorageError::Closed);
        }

        // The writer holds a lockfile and merge threads may still own file
        // handles; both must be gone before the directory can be removed.
        if let Some(state) = guard.take() {
            let IndexState { writer, reader, .. } = state;
            drop(reader);
            writer.wait_merging_threads()?;
        }
        std::fs::remove_dir_all(&self.path)?;
        *guard = Some(open_state(&self.path, &self.schema)?);
        debug!(path = %self.path.display(), "recreated empty index");
        Ok(())
    }

    async fn stats(&self) -> Result<StorageStats> {
        let guard = self.state.read().await;
        let state = guard.as_ref().ok_or(StorageError::Closed)?;
        let searcher = state.reader.searcher();
        Ok(StorageStats {
            document_count: searcher.num_docs(),
            last_indexed: state.last_indexed,
        })
    }

    async fn close(&self) -> Result<()> {
        let mut guard = self.state.write().await;
        if let Some(mut state) = guard.take() {
            state.writer.commit()?;
        }
        Ok(())
    }
}
