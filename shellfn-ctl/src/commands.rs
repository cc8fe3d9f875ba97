use log::info;
use shellfn::shell::SHELL_EXIT_CODES;

pub fn list_exit_codes() {
    info!("Listing shell function exit codes");
    println!("Exit codes of shell functions:\n");

    for (status, key, message) in SHELL_EXIT_CODES {
        println!("  {:3}  {:22} {}", status, key, message);
    }

    println!();
    println!("A killed run exits with 130; other records exit with their exit status");
}
