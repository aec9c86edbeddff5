use rforge_record::load_frames;
use rforge_stream::channel_stats;

use crate::cmd::{runtime, StatsArgs};
use crate::exit::{record_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_stats, OutputFormat};

pub fn run(args: StatsArgs, format: OutputFormat) -> CliResult<i32> {
    let frames = runtime()?
        .block_on(load_frames(&args.record))
        .map_err(|err| record_error("stats failed", err))?;

    let tail = &frames[frames.len().saturating_sub(args.window)..];
    let stats = channel_stats(tail, args.channel).ok_or_else(|| {
        CliError::new(
            DATA_INVALID,
            format!(
                "channel {} has no samples in the last {} frames",
                args.channel, args.window
            ),
        )
    })?;
    print_stats(args.channel, args.window, &stats, format);
    Ok(SUCCESS)
}
