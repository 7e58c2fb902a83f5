use std::sync::Arc;

use crawler::DocumentWriter;
use metrics::Pusher;
use tracing::info;

use crate::app::App;

pub async fn run(url: &str, depth: usize) -> anyhow::Result<()> {
    let app = App::open()?;
    info!(url, depth, "starting crawl");

    let handler = Arc::new(DocumentWriter::new(Arc::clone(&app.storage)));
    let crawl_result = app.crawler.crawl(url, depth, Some(handler)).await;

    // Crawl metrics go out whether or not the crawl succeeded.
    Pusher::from_env("trawler")
        .push_best_effort(&app.registry)
        .await;

    let stats = app.storage.stats().await;
    let close_result = app.close().await;

    let report = crawl_result?;
    close_result?;

    println!(
        "Crawled {} pages in {:.1}s ({} errors)",
        report.pages_processed,
        report.duration.as_secs_f64(),
        report.errors
    );
    if let Ok(stats) = stats {
        println!("Index now holds {} documents", stats.document_count);
    }
    Ok(())
}
