use std::time::Instant;

use clap::ValueEnum;
use search::{QueryParser, SearchResults, SortField, SortSpec};
use tracing::debug;

use crate::app::App;
use crate::output::{self, SearchFormat};

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum SortByArg {
    Score,
    Date,
    Title,
}

impl From<SortByArg> for SortField {
    fn from(arg: SortByArg) -> Self {
        match arg {
            SortByArg::Score => SortField::Score,
            SortByArg::Date => SortField::Date,
            SortByArg::Title => SortField::Title,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum SortOrderArg {
    Asc,
    Desc,
}

pub struct SearchArgs {
    pub query: String,
    pub page: usize,
    pub limit: usize,
    pub format: SearchFormat,
    pub sort_by: SortByArg,
    pub sort_order: SortOrderArg,
}

pub async fn run(args: SearchArgs) -> anyhow::Result<()> {
    let app = App::open()?;
    let metrics = app.registry.component("search");

    let started = Instant::now();
    let result = execute(&app, &args).await;
    metrics.observe_search_duration(started.elapsed().as_secs_f64());

    match &result {
        Ok(results) => metrics.set_search_results(results.metadata.total as f64),
        Err(_) => metrics.inc_search_errors(),
    }

    let close_result = app.close().await;
    let results = result?;
    close_result?;

    output::print_search_results(&results, args.format)
}

async fn execute(app: &App, args: &SearchArgs) -> anyhow::Result<SearchResults> {
    let mut query = QueryParser::new().parse(&args.query)?;
    query.set_page(args.page);
    query.set_page_size(args.limit);
    query.sort = SortSpec {
        field: args.sort_by.into(),
        descending: matches!(args.sort_order, SortOrderArg::Desc),
    };
    debug!(?query.sort, page = query.page, page_size = query.page_size, "executing search");

    Ok(app.engine.search(&query).await?)
}
