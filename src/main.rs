use clap::Parser;
use passvault::cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Create { ref file } => passvault::cli::commands::create::execute(file),
        Commands::List { ref file } => passvault::cli::commands::list::execute(file),
        Commands::Show {
            ref file,
            ref title,
            show_password,
        } => passvault::cli::commands::show::execute(file, title, show_password),
        Commands::Add {
            ref file,
            ref title,
            ref group,
            ref user,
        } => passvault::cli::commands::add::execute(file, title, group.as_deref(), user.as_deref()),
    };

    if let Err(e) = result {
        passvault::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
