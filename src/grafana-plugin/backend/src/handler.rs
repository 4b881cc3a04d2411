//! Execution of a validated query against the engines.

use anyhow::Context;
use futures::future::try_join_all;
use querier_sdk::{QuerierApi, TabularQuery, TraceRequest};
use transform::flame::{
    FLOW_LOG_DATABASE, L7_FLOW_LOG_TABLE, TRANSLATED_TAGS, TagTranslations, TracePayload,
    flame_series,
};
use transform::profiling::profile_series;
use transform::row::materialize;
use transform::sql::{bind_time_range, tracing_detail_sql};
use transform::tag_enum::{show_tag_values_sql, translate};
use serde_json::Value;
use transform::{RawResult, SeriesSink, TabularRequest, transform_tabular};

use crate::query::{AppQuery, ValidatedQuery};

/// Series metadata key holding the engine's debug payload.
const DEBUG_META_KEY: &str = "debug";

/// Panel time range in Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub from: i64,
    pub to: i64,
}

/// Run `query` and emit its series into `sink`. Returns the number of
/// series emitted.
pub async fn run_query<A, S>(
    api: &A,
    query: ValidatedQuery,
    range: TimeRange,
    sink: &mut S,
) -> anyhow::Result<usize>
where
    A: QuerierApi + ?Sized,
    S: SeriesSink,
{
    let sql = bind_time_range(&query.sql, range.from, range.to);

    match query.app {
        AppQuery::Default(mut panel) => {
            tracing::info!(db = %query.db, "running tabular query");
            let fetched = fetch(api, &sql, &query.db, &query.sources).await?;
            panel.meta.insert(DEBUG_META_KEY.to_string(), fetched.debug);
            let request = TabularRequest {
                sql,
                format_as: panel.format_as,
                alias: panel.alias,
                metrics: panel.metrics,
                show_metrics: panel.show_metrics,
            };
            Ok(transform_tabular(&fetched.raw, &request, &panel.meta, sink)?)
        }
        AppQuery::Profiling(mut panel) => {
            tracing::info!(db = %query.db, "running profiling query");
            let fetched = fetch(api, &sql, &query.db, &query.sources).await?;
            panel.meta.insert(DEBUG_META_KEY.to_string(), fetched.debug);
            sink.emit(profile_series(&fetched.raw, panel.meta)?)?;
            Ok(1)
        }
        AppQuery::TracingFlame { id, debug, meta } => {
            tracing::info!(%id, "running tracing flame query");
            let body = api
                .trace(&TraceRequest::new(id, range.from, range.to), debug)
                .await?;
            let Some(payload) = TracePayload::from_response(&body)? else {
                tracing::debug!("trace not found");
                return Ok(0);
            };

            let translations = fetch_translations(api, &query.sources).await?;
            let payload = payload.enrich(&translations);

            let detail_sql = tracing_detail_sql(&sql, &payload.span_ids());
            let fetched = fetch(api, &detail_sql, FLOW_LOG_DATABASE, &query.sources).await?;
            let detail_rows = materialize(&fetched.raw)?;

            sink.emit(flame_series(&payload, &detail_rows, meta)?)?;
            Ok(1)
        }
    }
}

/// Engine answer to one tabular query.
struct Fetched {
    raw: RawResult,
    debug: Value,
}

async fn fetch<A: QuerierApi + ?Sized>(
    api: &A,
    sql: &str,
    db: &str,
    sources: &str,
) -> anyhow::Result<Fetched> {
    let query = TabularQuery::new(sql).with_db(db).with_sources(sources);
    let response = api.query(&query).await?;
    let raw =
        RawResult::from_result(&response.result).context("malformed query engine result")?;
    Ok(Fetched {
        raw,
        debug: response.debug,
    })
}

async fn fetch_translations<A: QuerierApi + ?Sized>(
    api: &A,
    sources: &str,
) -> anyhow::Result<TagTranslations> {
    let lookups = TRANSLATED_TAGS.iter().map(|tag| async move {
        let query = TabularQuery::new(show_tag_values_sql(tag, L7_FLOW_LOG_TABLE))
            .with_db(FLOW_LOG_DATABASE)
            .with_sources(sources);
        let response = api.query(&query).await?;
        let mapping = translate(&response.result)
            .with_context(|| format!("malformed values for tag {tag}"))?;
        anyhow::Ok((tag.to_string(), mapping))
    });

    Ok(try_join_all(lookups).await?.into_iter().collect())
}
