use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use aidlink_client::{ImageFrame, TransmitError, ViewerListener};
use aidlink_frame::FrameConfig;
use tracing::{info, warn};

use crate::cmd::{parse_duration, ListenArgs};
use crate::exit::{transmit_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_image, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let read_timeout = parse_duration(&args.read_timeout)?;
    let frame_config = FrameConfig {
        read_timeout: (!read_timeout.is_zero()).then_some(read_timeout),
        ..FrameConfig::default()
    };
    let listener = ViewerListener::bind(args.bind.as_str())
        .map_err(|err| transmit_error("bind failed", err))?
        .with_frame_config(frame_config);
    let local = listener
        .local_addr()
        .map_err(|err| transmit_error("bind failed", err))?;
    info!(%local, "waiting for images");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone(), local)?;

    serve(&listener, &running, args.count, |frame, peer| {
        print_image(frame, peer, format)
    });
    Ok(SUCCESS)
}

/// Something that hands out one received image per call.
trait ImageSource {
    fn next_image(&self) -> Result<(SocketAddr, ImageFrame), TransmitError>;
}

impl ImageSource for ViewerListener {
    fn next_image(&self) -> Result<(SocketAddr, ImageFrame), TransmitError> {
        self.accept_image()
    }
}

/// Receive images until `count` have been handled or `running` is cleared.
///
/// A failed accept or an incomplete image is logged and skipped; the loop
/// keeps serving. Returns the number of images handled.
fn serve<S: ImageSource>(
    source: &S,
    running: &AtomicBool,
    count: Option<usize>,
    mut on_image: impl FnMut(&ImageFrame, SocketAddr),
) -> usize {
    let mut handled = 0usize;

    while running.load(Ordering::SeqCst) {
        let result = source.next_image();
        if !running.load(Ordering::SeqCst) {
            break;
        }

        match result {
            Ok((peer, frame)) => {
                on_image(&frame, peer);
                handled = handled.saturating_add(1);
            }
            Err(err) => {
                warn!(stage = %err.stage(), error = %err, "skipping transmitter");
                continue;
            }
        }

        if count.is_some_and(|count| handled >= count) {
            break;
        }
    }

    handled
}

/// Stop the accept loop on Ctrl-C. The handler connects to `local` once so a
/// blocked `accept` returns and sees the cleared flag.
fn install_ctrlc_handler(running: Arc<AtomicBool>, local: SocketAddr) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
        let _ = TcpStream::connect(local);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
