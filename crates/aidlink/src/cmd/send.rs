use std::fs;

use aidlink_client::{AuxFlags, ImageDescriptor, Transmitter};
use aidlink_frame::CHANNEL_COUNT;
use tracing::info;

use crate::cmd::SendArgs;
use crate::exit::{io_error, transmit_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_report, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = fs::read(&args.file)
        .map_err(|err| io_error(&format!("failed reading {}", args.file.display()), err))?;

    let mut transmitter = args.connect.transmitter()?;
    apply_adjustments(&mut transmitter, &args)?;

    let mut desc = ImageDescriptor::new(args.width, args.height, args.pixel_format.as_str(), &payload)
        .with_row_stride_bits(args.row_stride_bits);
    if let Some(name) = &args.name {
        desc = desc.with_name(name.as_str());
    }
    if let Some(notes) = &args.notes {
        desc = desc.with_notes(notes.as_str());
    }

    info!(
        file = %args.file.display(),
        bytes = payload.len(),
        host = transmitter.config().host(),
        port = transmitter.config().port,
        "sending image"
    );
    let report = transmitter
        .send(&desc)
        .map_err(|err| transmit_error("send failed", err))?;

    let label = args
        .name
        .clone()
        .unwrap_or_else(|| args.file.display().to_string());
    print_report(&label, &report, format);
    Ok(SUCCESS)
}

fn apply_adjustments(transmitter: &mut Transmitter, args: &SendArgs) -> CliResult<()> {
    if let Some(gain) = &args.gain {
        check_channel_list("--gain", gain)?;
        for (channel, value) in gain.iter().enumerate() {
            transmitter.set_gain(channel, *value);
        }
    }
    if let Some(bias) = &args.bias {
        check_channel_list("--bias", bias)?;
        for (channel, value) in bias.iter().enumerate() {
            transmitter.set_bias(channel, *value);
        }
    }
    if args.auto_gain_bias {
        transmitter.set_flags(AuxFlags::AUTO_GAIN_BIAS);
    }
    Ok(())
}

fn check_channel_list(flag: &str, values: &[f32]) -> CliResult<()> {
    if values.len() > CHANNEL_COUNT {
        return Err(CliError::new(
            USAGE,
            format!(
                "{flag} takes at most {CHANNEL_COUNT} values, got {}",
                values.len()
            ),
        ));
    }
    Ok(())
}
