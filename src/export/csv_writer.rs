//! CSV export.

use crate::content::{EnumerationStats, Post, PostsConnection};
use crate::context::RequestContext;
use crate::error::{ChannelStoreError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::io;
use tracing::debug;

/// Header row written before any post.
pub const CSV_HEADER: [&str; 5] = ["id", "createdAt", "parentPostID", "commandType", "content"];

pub(crate) fn created_at_utc(created_at: u64) -> Result<DateTime<Utc>> {
    i64::try_from(created_at)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .ok_or_else(|| {
            ChannelStoreError::export(format!("Timestamp out of range: {}", created_at))
        })
}

/// Renders a millisecond timestamp as RFC 3339 in UTC, e.g.
/// `2024-01-02T03:04:05.006Z`.
pub fn format_created_at(created_at: u64) -> Result<String> {
    created_at_utc(created_at).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn record(post: &Post) -> Result<[String; 5]> {
    Ok([
        post.id.to_string(),
        format_created_at(post.created_at)?,
        post.parent_post_id
            .map(|id| id.to_string())
            .unwrap_or_default(),
        post.command_type.clone(),
        post.content.source.clone(),
    ])
}

/// Writes the header and one row per emitted post to `out`.
///
/// The header is written even if the enumeration then fails. Rows written
/// before a failure stay written.
pub fn write_to_csv<W: io::Write>(
    connection: &PostsConnection<'_>,
    ctx: &RequestContext,
    out: W,
) -> Result<EnumerationStats> {
    let mut writer = ::csv::Writer::from_writer(out);
    writer.write_record(CSV_HEADER)?;

    let result = write_rows(connection, ctx, &mut writer);
    writer.flush()?;
    let stats = result?;

    debug!(
        channel = %connection.options().channel_slug,
        rows = stats.emitted,
        "Wrote CSV export"
    );
    Ok(stats)
}

fn write_rows<W: io::Write>(
    connection: &PostsConnection<'_>,
    ctx: &RequestContext,
    writer: &mut ::csv::Writer<W>,
) -> Result<EnumerationStats> {
    let mut stream = connection.stream(ctx)?;
    for post in stream.by_ref() {
        writer.write_record(record(&post?)?)?;
    }
    Ok(stream.stats())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_created_at() {
        assert_eq!(format_created_at(0).unwrap(), "1970-01-01T00:00:00.000Z");
        assert_eq!(
            format_created_at(1_704_164_645_006).unwrap(),
            "2024-01-02T03:04:05.006Z"
        );
    }

    #[test]
    fn test_format_created_at_out_of_range() {
        assert!(matches!(
            format_created_at(u64::MAX),
            Err(ChannelStoreError::Export(_))
        ));
    }
}
