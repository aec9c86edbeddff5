use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use rforge_record::{load_frames, Playback};
use tracing::info;

use crate::cmd::{install_ctrlc_handler, runtime, PlayArgs};
use crate::exit::{record_error, CliError, CliResult, DATA_INVALID, INTERRUPTED, SUCCESS};
use crate::output::{print_data_frame, OutputFormat};

pub fn run(args: PlayArgs, format: OutputFormat) -> CliResult<i32> {
    let frames = runtime()?
        .block_on(load_frames(&args.record))
        .map_err(|err| record_error("play failed", err))?;
    if frames.is_empty() {
        return Err(CliError::new(
            DATA_INVALID,
            format!("{} holds no decodable frames", args.record.display()),
        ));
    }

    let running = install_ctrlc_handler()?;
    let tick = Duration::from_millis(args.tick_ms.max(1));
    let mut playback = Playback::new(frames);
    playback.set_speed(args.speed, Instant::now());
    playback.start(Instant::now());
    info!(
        path = %args.record.display(),
        frames = playback.len(),
        speed = playback.speed(),
        "playback started"
    );

    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        for frame in playback.tick(now) {
            print_data_frame(frame, format);
        }
        if playback.is_finished() {
            info!(frames = playback.emitted(), "playback finished");
            return Ok(SUCCESS);
        }
        let wait = playback.next_due_in(now).map_or(tick, |due| due.min(tick));
        std::thread::sleep(wait);
    }

    info!(
        emitted = playback.emitted(),
        remaining = playback.len() - playback.emitted(),
        "playback interrupted"
    );
    Ok(INTERRUPTED)
}
