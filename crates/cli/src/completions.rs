use clap::Command;
use clap_complete::Shell;
use std::io;

pub fn generate(shell: Shell, mut cmd: Command) {
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut io::stdout());
}
