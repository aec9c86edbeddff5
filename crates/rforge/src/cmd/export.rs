use rforge_record::{export_csv_from_record, CancellationToken};

use crate::cmd::{runtime, ExportArgs};
use crate::exit::{record_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(serde::Serialize)]
struct ExportOutput<'a> {
    record: &'a str,
    csv: &'a str,
    rows: usize,
}

pub fn run(args: ExportArgs, format: OutputFormat) -> CliResult<i32> {
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    ctrlc::set_handler(move || on_signal.cancel())
        .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))?;

    let rows = runtime()?
        .block_on(export_csv_from_record(&args.record, &args.csv, cancel))
        .map_err(|err| record_error("export failed", err))?;

    let record = args.record.display().to_string();
    let csv = args.csv.display().to_string();
    match format {
        OutputFormat::Json => print_json(&ExportOutput {
            record: &record,
            csv: &csv,
            rows,
        }),
        _ => println!("exported {rows} rows from {record} to {csv}"),
    }
    Ok(SUCCESS)
}
