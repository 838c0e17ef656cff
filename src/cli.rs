use std::path::PathBuf;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(name = "meetmeet-controller")]
pub struct Args {
    #[structopt(
        short,
        parse(from_occurrences),
        help = "-v => Info, -vv => Debug, -vvv => Trace"
    )]
    pub verbose: u8,

    #[structopt(
        short,
        long,
        default_value = "config.toml",
        help = "Specify path to configuration file"
    )]
    pub config: PathBuf,

    #[structopt(
        short,
        long,
        parse(from_os_str),
        help = "logoutput or \"-\" for stdout"
    )]
    pub logoutput: Option<PathBuf>,
}

/// Parses the CLI-Arguments into [`Args`]
pub fn parse_args() -> Args {
    Args::from_args()
}
