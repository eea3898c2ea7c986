use swd_transport::cable;
use swd_transport::command::Command;
use swd_transport::session::Session;

fn main() {
    env_logger::init();

    let cable = cable::new_from_string("jlink", 4_000_000).expect("cable");
    let mut session = Session::new(cable);

    // DP IDCODE read: start, APnDP=0, RnW=1, A=0, parity, stop, park
    let mut phases = [
        Command::request(0xa5),
        Command::turnaround_in(1),
        Command::ack(),
        Command::data_in(),
        Command::parity_in(),
        Command::turnaround_out(1),
    ];
    for cmd in phases.iter_mut() {
        if let Err(e) = session.dispatch(cmd) {
            println!("{} failed: {}", cmd.cmdtype, e);
            return;
        }
    }

    let log = session.log.read;
    println!("ack: {:03b}", log.ack);
    println!("idcode: {:08x} parity: {}", log.data, log.parity);
}
