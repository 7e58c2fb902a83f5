use std::time::Instant;

use tracing::debug;

use crate::app::App;
use crate::output::{self, ListFormat};

pub async fn run(format: ListFormat) -> anyhow::Result<()> {
    let app = App::open()?;
    let metrics = app.registry.component("list");

    let started = Instant::now();
    let result = app.engine.list().await;
    metrics.observe_list_duration(started.elapsed().as_secs_f64());

    if let Ok(docs) = &result {
        metrics.set_indexed_documents(docs.len() as f64);
        debug!(count = docs.len(), "listed documents");
    }

    let close_result = app.close().await;
    let docs = result?;
    close_result?;

    output::print_documents(&docs, format)
}
