use std::io::Write;
use std::path::{Path, PathBuf};

use rforge_stream::DataFrame;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{RecordError, Result};
use crate::reader::load_frames;

/// One CSV row; field names form the header `timestamp_us,channel_id,value`.
#[derive(Debug, Serialize)]
struct CsvRow {
    timestamp_us: u64,
    channel_id: u16,
    value: f64,
}

fn row_count(frames: &[DataFrame]) -> usize {
    frames.iter().map(|f| f.channels.len()).sum()
}

/// Write frames as CSV, one row per (frame, channel) in encounter order.
///
/// Returns the number of data rows. Zero rows is an error and nothing is
/// written.
pub fn write_csv<W: Write>(out: W, frames: &[DataFrame]) -> Result<usize> {
    write_rows(out, frames, None)
}

fn write_rows<W: Write>(
    out: W,
    frames: &[DataFrame],
    cancel: Option<&CancellationToken>,
) -> Result<usize> {
    if row_count(frames) == 0 {
        return Err(RecordError::NothingToExport);
    }
    let mut writer = csv::Writer::from_writer(out);
    let mut rows = 0usize;
    for frame in frames {
        for channel in &frame.channels {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(RecordError::Cancelled);
            }
            writer.serialize(CsvRow {
                timestamp_us: frame.timestamp_us,
                channel_id: channel.channel_id,
                value: channel.value,
            })?;
            rows += 1;
        }
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(rows)
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "export".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Export frames to a CSV file.
///
/// Rows go to a sibling `.tmp` file that is renamed into place only after
/// a complete write, so `path` never holds a partial export. Cancelling
/// `cancel` stops the export and removes the temporary file.
pub async fn export_csv(
    path: impl AsRef<Path>,
    frames: Vec<DataFrame>,
    cancel: CancellationToken,
) -> Result<usize> {
    let path = path.as_ref().to_path_buf();
    if row_count(&frames) == 0 {
        return Err(RecordError::NothingToExport);
    }
    let tmp = temp_sibling(&path);

    let task_path = path.clone();
    let task_tmp = tmp.clone();
    let joined = tokio::task::spawn_blocking(move || -> Result<usize> {
        let file =
            std::fs::File::create(&task_tmp).map_err(|e| RecordError::io(&task_tmp, e))?;
        let rows = write_rows(std::io::BufWriter::new(file), &frames, Some(&cancel))?;
        std::fs::rename(&task_tmp, &task_path).map_err(|e| RecordError::io(&task_path, e))?;
        Ok(rows)
    })
    .await;

    let result = joined.unwrap_or_else(|e| Err(RecordError::io(&path, std::io::Error::other(e))));
    match &result {
        Ok(rows) => info!(path = %path.display(), rows, "CSV export complete"),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "CSV export failed");
            let _ = tokio::fs::remove_file(&tmp).await;
        }
    }
    result
}

/// Replay a record file and export its frames to CSV.
pub async fn export_csv_from_record(
    record: impl AsRef<Path>,
    csv_path: impl AsRef<Path>,
    cancel: CancellationToken,
) -> Result<usize> {
    let frames = load_frames(record).await?;
    export_csv(csv_path, frames, cancel).await
}
