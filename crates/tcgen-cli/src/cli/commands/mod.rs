use super::args::{Cli, Command};

pub mod chunk;
pub mod generate;
pub mod template;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Generate(args) => generate::run(args).await,
        Command::Chunk(args) => chunk::run(args),
        Command::Template(args) => template::run(args),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(crate::exit_codes::SUCCESS)
        }
    }
}
