use colored::Colorize;

fn main() {
    let command_line_interface = typesketch::cli::CommandLineInterface::load();
    if let Err(error) = command_line_interface.run() {
        eprintln!("{}", format!("error: {error:#}").red());
        std::process::exit(1);
    }
}
