use rforge_record::load_frames;
use tracing::info;

use crate::cmd::{runtime, ReplayArgs};
use crate::exit::{record_error, CliResult, SUCCESS};
use crate::output::{print_data_frames, OutputFormat};

pub fn run(args: ReplayArgs, format: OutputFormat) -> CliResult<i32> {
    let frames = runtime()?
        .block_on(load_frames(&args.record))
        .map_err(|err| record_error("replay failed", err))?;
    info!(path = %args.record.display(), frames = frames.len(), "record replayed");
    print_data_frames(&frames, format);
    Ok(SUCCESS)
}
