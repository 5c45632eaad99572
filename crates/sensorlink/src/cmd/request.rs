use sensorlink_frame::{Command, LedState, MotorDirection};

use crate::cmd::ConnectionArgs;
use crate::exit::{client_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_reply, OutputFormat};

pub fn sensor() -> Command {
    Command::get_sensor_data()
}

pub fn status() -> Command {
    Command::get_status()
}

pub fn led(state: LedState) -> Command {
    Command::set_led(state)
}

pub fn motor(speed: u8, direction: MotorDirection) -> Command {
    Command::set_motor(speed, direction)
}

pub fn stop_motor() -> Command {
    Command::stop_motor()
}

/// Open the device, send one command, print its reply.
///
/// A reply carrying `{"error": ...}` is printed and then reported as a failure.
pub fn run(conn: &ConnectionArgs, command: &Command, format: OutputFormat) -> CliResult<i32> {
    let connection = conn.connect()?;
    let reply = connection
        .send_command(command)
        .map_err(|err| client_error(&format!("{} failed", command.name()), err))?;

    print_reply(connection.port_name(), command.name(), &reply, format);
    connection.close();

    match reply.device_error() {
        Some(message) => Err(CliError::new(
            DATA_INVALID,
            format!("device rejected {}: {message}", command.name()),
        )),
        None => Ok(SUCCESS),
    }
}

#[cfg(test)]
mod tests {
    use sensorlink_frame::encode;

    use super::*;

    #[test]
    fn shortcuts_build_firmware_commands() {
        assert_eq!(&encode(&sensor())[..], b"{\"command\":\"get_sensor_data\"}\n");
        assert_eq!(&encode(&led(LedState::Off))[..], b"{\"command\":\"set_led\",\"state\":0}\n");
        assert_eq!(
            &encode(&motor(200, MotorDirection::Reverse))[..],
            b"{\"command\":\"set_motor\",\"direction\":-1,\"speed\":200}\n"
        );
    }
}
