use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::Duration;

use crate::cmd::{ConnectionArgs, MonitorArgs};
use crate::exit::{mixer_error, CliError, CliResult, INTERNAL, SUCCESS, TRANSPORT_ERROR};
use crate::output::{print_report, OutputFormat};

/// How often the loop wakes to check for Ctrl-C while no report arrives.
const POLL: Duration = Duration::from_millis(100);

pub fn run(args: MonitorArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let mixer = conn.mixer()?;
    mixer
        .select_channel(args.channel)
        .map_err(|err| mixer_error("invalid channel", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let monitor = mixer
        .monitor_levels()
        .map_err(|err| mixer_error("monitor failed to start", err))?;

    let mut printed = 0usize;
    let mut outcome = Ok(SUCCESS);

    while running.load(Ordering::SeqCst) {
        match monitor.reports().recv_timeout(POLL) {
            Ok(report) => {
                print_report(&report, format);
                printed = printed.saturating_add(1);
                if args.count.is_some_and(|count| printed >= count) {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                outcome = Err(CliError::new(
                    TRANSPORT_ERROR,
                    format!("level monitor could not reach {}", conn.remote),
                ));
                break;
            }
        }
    }

    monitor.stop();
    outcome
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
